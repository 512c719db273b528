// SPDX-License-Identifier: LGPL-2.1

//! Kingsbury Q-shift filter bank.
//!
//! The dual tree runs two real wavelet decompositions whose lowpass kernels
//! are time reverses of each other, giving the quarter-sample delay offset
//! that makes the combined coefficients approximately analytic. The bank is
//! derived once from the 10-tap orthonormal Q-shift lowpass prototype:
//! tree B lowpass is the reversal of tree A's, each tree's highpass is the
//! alternating-flip quadrature mirror of its own lowpass, and the synthesis
//! kernels are the time-reversed analysis kernels.

use lazy_static::lazy_static;

/// Tap count of the Q-shift kernels.
pub const QSHIFT_LEN: usize = 10;

/// Analysis anchor: the kernel element aligned with the input sample.
pub const QSHIFT_OFFSET: usize = 4;

/// Kingsbury Q-shift (06) orthonormal lowpass prototype, tree A.
const QSHIFT_LO_A: [f32; QSHIFT_LEN] = [
  0.03516384,
  0.0,
  -0.08832942,
  0.23389032,
  0.76027237,
  0.58751830,
  0.0,
  -0.11430184,
  0.0,
  0.0,
];

/// One tree's analysis and synthesis kernel set.
#[derive(Debug, Clone)]
pub struct WaveletFilter {
  pub anal_lo: [f32; QSHIFT_LEN],
  pub anal_hi: [f32; QSHIFT_LEN],
  pub synth_lo: [f32; QSHIFT_LEN],
  pub synth_hi: [f32; QSHIFT_LEN],
  pub offset: usize,
}

impl WaveletFilter {
  fn from_lowpass(lo: [f32; QSHIFT_LEN], offset: usize) -> Self {
    let hi = quadrature_mirror(&lo);
    Self {
      synth_lo: reversed(&lo),
      synth_hi: reversed(&hi),
      anal_lo: lo,
      anal_hi: hi,
      offset,
    }
  }

  /// Synthesis anchor implied by the time reversal of the analysis kernels.
  #[inline]
  pub fn synth_offset(&self) -> usize {
    QSHIFT_LEN - 1 - self.offset
  }
}

fn reversed(taps: &[f32; QSHIFT_LEN]) -> [f32; QSHIFT_LEN] {
  let mut rev = [0.0; QSHIFT_LEN];
  for (i, r) in rev.iter_mut().enumerate() {
    *r = taps[QSHIFT_LEN - 1 - i];
  }
  rev
}

/// Alternating-flip highpass of an orthonormal lowpass kernel.
fn quadrature_mirror(lo: &[f32; QSHIFT_LEN]) -> [f32; QSHIFT_LEN] {
  let mut hi = [0.0; QSHIFT_LEN];
  for (i, h) in hi.iter_mut().enumerate() {
    let tap = lo[QSHIFT_LEN - 1 - i];
    *h = if i % 2 == 0 { tap } else { -tap };
  }
  hi
}

/// The shared two-tree kernel set. Process-wide constant data.
pub struct FilterBank {
  pub tree_a: WaveletFilter,
  pub tree_b: WaveletFilter,
}

impl FilterBank {
  fn qshift() -> Self {
    Self {
      tree_a: WaveletFilter::from_lowpass(QSHIFT_LO_A, QSHIFT_OFFSET),
      tree_b: WaveletFilter::from_lowpass(reversed(&QSHIFT_LO_A), QSHIFT_OFFSET),
    }
  }

  /// Bank applied at the full-resolution level.
  ///
  /// Currently the same family as [`FilterBank::cascade`]; the two roles
  /// stay separate so a dedicated first-level family remains a local change.
  pub fn first_level() -> &'static FilterBank {
    &QSHIFT
  }

  /// Bank applied on every level below the first.
  pub fn cascade() -> &'static FilterBank {
    &QSHIFT
  }
}

lazy_static! {
  static ref QSHIFT: FilterBank = FilterBank::qshift();
}
