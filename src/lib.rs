//! Dual-tree complex wavelet decomposition and reconstruction.
//!
//! This library implements the multi-resolution transform used as the
//! mathematical backbone for detail-band editing (denoising, sharpening,
//! local contrast) in a photo-processing pipeline. A single-channel pixel
//! buffer is decomposed into four parallel wavelet trees whose detail
//! coefficients are pairwise rotated into approximately analytic,
//! directionally selective subbands. Editing code may rewrite the detail
//! planes in place; [`DualTreeDecomposition::reconstruct`] then inverts the
//! transform back into a pixel buffer.
//!
//! # Example
//! ```rust
//! use dualtree::DualTreeDecomposition;
//!
//! let src = vec![128.0_f32; 64 * 64];
//! let mut dec = DualTreeDecomposition::new(&src, 64, 64, 4).unwrap();
//!
//! // Detail planes can be edited in place here, see `level_mut()`.
//!
//! let mut dst = vec![0.0_f32; 64 * 64];
//! dec.reconstruct(&mut dst).unwrap();
//! ```
//!
//! Coefficient planes hold unbounded `f32` transform values, not displayable
//! intensities. All working memory is owned by the decomposition; allocation
//! failure is fatal. The transform runs to completion on the calling thread,
//! using rayon data parallelism internally.

use thiserror::Error;

pub mod decompose;
pub mod filters;
pub mod level;
pub mod plane;

pub use decompose::DualTreeDecomposition;
pub use decompose::MAX_LEVELS;
pub use decompose::Tree;
pub use level::Subband;
pub use level::WaveletLevel;
pub use plane::Plane;
pub use plane::PlaneF32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DualTreeError {
  #[error("Image of {0}x{1} is too small to decompose")]
  InvalidDimensions(usize, usize),

  #[error("Buffer of {len} samples does not match a {width}x{height} image")]
  BufferMismatch { len: usize, width: usize, height: usize },

  #[error("Decomposition was already consumed by reconstruct()")]
  AlreadyReconstructed,
}

pub type Result<T> = std::result::Result<T, DualTreeError>;

#[cfg(test)]
pub(crate) fn init_test_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}
