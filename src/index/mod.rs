//! Vector index: the `VectorIndex` contract and its two implementations.

pub mod approx;
pub mod brute;
pub mod traits;

pub use approx::ApproxIndex;
pub use brute::BruteIndex;
pub use traits::VectorIndex;
