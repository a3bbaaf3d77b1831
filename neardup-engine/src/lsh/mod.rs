//! LSH banding: parameter selection and the bucket index.

pub mod banding;
pub mod params;

pub use banding::BandingIndex;
pub use params::LshParams;
