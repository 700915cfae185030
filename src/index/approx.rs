//! Approximate inverted-file (IVF) index.
//!
//! L2-normalizes every vector, trains `nlist` centroids with a fixed-iteration
//! k-means once at least `nlist` vectors are present, and at query time scans
//! only the `nprobe` centroids nearest the query (plus their posting lists).
//! Below `nlist` vectors there isn't enough data to train a meaningful
//! quantizer, so this falls back to an exact flat inner-product scan —
//! mirroring FAISS's own `IndexFlatIP` fallback behavior for small
//! collections. No vector-search crate in the retrieval pack wraps this, so
//! centroid training and posting lists are hand-rolled here; seeding is
//! deterministic (first `nlist` vectors in input order), not randomized, so
//! two runs over the same input train identical centroids.

use crate::index::brute::cosine;
use crate::index::traits::VectorIndex;
use crate::model::types::Embedding;

const MAX_KMEANS_ITERS: usize = 25;

#[derive(Default)]
pub struct ApproxIndex {
    nlist: usize,
    nprobe: usize,
    vectors: Vec<Vec<f32>>,
    ids: Vec<String>,
    centroids: Vec<Vec<f32>>,
    assignments: Vec<usize>,
    trained: bool,
}

impl ApproxIndex {
    pub fn new(nlist: usize, nprobe: usize) -> Self {
        Self {
            nlist: nlist.max(1),
            nprobe: nprobe.max(1),
            ..Self::default()
        }
    }

    fn train(&mut self) {
        let dim = self.vectors.first().map(|v| v.len()).unwrap_or(0);
        if dim == 0 || self.vectors.len() < self.nlist {
            self.trained = false;
            return;
        }

        let mut centroids: Vec<Vec<f32>> = self.vectors[..self.nlist].to_vec();
        let mut assignments = vec![0usize; self.vectors.len()];

        for _ in 0..MAX_KMEANS_ITERS {
            let mut changed = false;
            for (i, v) in self.vectors.iter().enumerate() {
                let mut best = 0usize;
                let mut best_score = f32::MIN;
                for (c_idx, c) in centroids.iter().enumerate() {
                    let score = cosine(v, c);
                    if score > best_score {
                        best_score = score;
                        best = c_idx;
                    }
                }
                if assignments[i] != best {
                    changed = true;
                }
                assignments[i] = best;
            }

            let mut sums = vec![vec![0.0f32; dim]; self.nlist];
            let mut counts = vec![0usize; self.nlist];
            for (i, v) in self.vectors.iter().enumerate() {
                let cluster = assignments[i];
                counts[cluster] += 1;
                for (acc, value) in sums[cluster].iter_mut().zip(v) {
                    *acc += value;
                }
            }
            for (cluster, sum) in sums.into_iter().enumerate() {
                if counts[cluster] == 0 {
                    continue;
                }
                centroids[cluster] = sum.into_iter().map(|v| v / counts[cluster] as f32).collect();
            }

            if !changed {
                break;
            }
        }

        self.centroids = centroids;
        self.assignments = assignments;
        self.trained = true;
    }

    fn nearest_centroids(&self, vector: &[f32]) -> Vec<usize> {
        let mut scored: Vec<(usize, f32)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(i, c)| (i, cosine(vector, c)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(self.nprobe);
        scored.into_iter().map(|(i, _)| i).collect()
    }

    fn query_flat(&self, vector: &Embedding, k: usize) -> Vec<(String, f32)> {
        let mut scored: Vec<(String, f32)> = self
            .ids
            .iter()
            .zip(&self.vectors)
            .map(|(id, v)| (id.clone(), cosine(&vector.vector, v)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        scored
    }
}

fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        v.to_vec()
    } else {
        v.iter().map(|x| x / norm).collect()
    }
}

impl VectorIndex for ApproxIndex {
    fn build(&mut self, vectors: &[Embedding], ids: &[String]) {
        self.vectors = vectors.iter().map(|e| l2_normalize(&e.vector)).collect();
        self.ids = ids.to_vec();
        self.train();
    }

    fn query(&self, vector: &Embedding, k: usize) -> Vec<(String, f32)> {
        if !self.trained {
            return self.query_flat(vector, k);
        }
        let query_vec = l2_normalize(&vector.vector);
        let probe_clusters = self.nearest_centroids(&query_vec);

        let mut scored: Vec<(String, f32)> = self
            .assignments
            .iter()
            .enumerate()
            .filter(|(_, cluster)| probe_clusters.contains(cluster))
            .map(|(i, _)| (self.ids[i].clone(), cosine(&query_vec, &self.vectors[i])))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        scored
    }
}
