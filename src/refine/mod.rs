//! Local peak models fitted to sampled responses.

pub mod quadfit;

pub use quadfit::QuadraticFit;
