// SPDX-License-Identifier: LGPL-2.1

//! Single-level separable wavelet stage.
//!
//! One forward pass turns a parent plane into four half-resolution subband
//! planes: a decimating row filtering into a lo/hi intermediate pair,
//! followed by the same filtering along columns. The inverse pass is the
//! exact adjoint: upsample each subband by two per axis, convolve with the
//! time-reversed synthesis kernels and sum the four contributions into the
//! parent-resolution destination. Out-of-range taps wrap around the plane,
//! so analysis followed by synthesis restores the input exactly (up to
//! floating point) whenever every filtered extent is even.

use multiversion::multiversion;
use rayon::prelude::*;

use crate::filters::QSHIFT_LEN;
use crate::filters::WaveletFilter;
use crate::plane::PlaneF32;

/// Subband selector for one decomposition level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subband {
  /// Lowpass approximation; the input consumed by the next deeper level.
  Approx = 0,
  /// Detail along rows (highpass x, lowpass y).
  DetailH = 1,
  /// Detail along columns (lowpass x, highpass y).
  DetailV = 2,
  /// Diagonal detail (highpass on both axes).
  DetailD = 3,
}

impl Subband {
  /// The three detail planes, the operands of the dual-tree rotation.
  pub const DETAILS: [Subband; 3] = [Subband::DetailH, Subband::DetailV, Subband::DetailD];

  #[inline]
  pub fn index(self) -> usize {
    self as usize
  }
}

/// One node of a wavelet tree: four coefficient planes at half the parent
/// resolution per axis.
///
/// The planes are public on purpose: per-band editing code rewrites detail
/// coefficients in place between decomposition and reconstruction.
pub struct WaveletLevel {
  pub width: usize,
  pub height: usize,
  pub subbands: [PlaneF32; 4],
}

impl WaveletLevel {
  /// Decompose a `width` x `height` plane into the four child subbands.
  pub(crate) fn decompose(src: &[f32], width: usize, height: usize, row_filter: &WaveletFilter, col_filter: &WaveletFilter) -> Self {
    let child_w = width / 2;
    let child_h = height / 2;
    debug_assert!(child_w > 0 && child_h > 0, "degenerate level {}x{}", child_w, child_h);
    debug_assert_eq!(src.len(), width * height);

    // Decimate along x into a lowpass/highpass intermediate pair.
    let mut lo = PlaneF32::new(child_w, height);
    let mut hi = PlaneF32::new(child_w, height);
    analysis_rows(src, width, row_filter, &mut lo, &mut hi);

    // Decimate each intermediate along y.
    let mut approx = PlaneF32::new(child_w, child_h);
    let mut detail_h = PlaneF32::new(child_w, child_h);
    let mut detail_v = PlaneF32::new(child_w, child_h);
    let mut detail_d = PlaneF32::new(child_w, child_h);
    analysis_cols(&lo, col_filter, &mut approx, &mut detail_v);
    analysis_cols(&hi, col_filter, &mut detail_h, &mut detail_d);

    Self {
      width: child_w,
      height: child_h,
      subbands: [approx, detail_h, detail_v, detail_d],
    }
  }

  /// Reconstruct the `parent_w` x `parent_h` parent plane from the four
  /// subbands of this level, overwriting `dst`.
  pub(crate) fn reconstruct(&self, dst: &mut [f32], parent_w: usize, parent_h: usize, row_filter: &WaveletFilter, col_filter: &WaveletFilter) {
    debug_assert_eq!(dst.len(), parent_w * parent_h);

    // Undo the column decimation of both x branches first, then the rows.
    let mut lo = PlaneF32::new(self.width, parent_h);
    let mut hi = PlaneF32::new(self.width, parent_h);
    synthesis_cols(&self.subbands[0], &self.subbands[2], col_filter, &mut lo);
    synthesis_cols(&self.subbands[1], &self.subbands[3], col_filter, &mut hi);
    synthesis_rows(&lo, &hi, row_filter, dst, parent_w);
  }

  pub fn subband(&self, band: Subband) -> &PlaneF32 {
    &self.subbands[band.index()]
  }

  pub fn subband_mut(&mut self, band: Subband) -> &mut PlaneF32 {
    &mut self.subbands[band.index()]
  }

  /// The lowpass plane; for level `l` this is exactly the input of level
  /// `l + 1` of the same tree.
  pub fn approx(&self) -> &PlaneF32 {
    &self.subbands[Subband::Approx.index()]
  }
}

/// Decimating lo/hi analysis along x, one output row per input row.
#[multiversion(targets("x86_64+avx+avx2", "x86+sse", "aarch64+neon"))]
fn analysis_rows(src: &[f32], width: usize, filter: &WaveletFilter, lo: &mut PlaneF32, hi: &mut PlaneF32) {
  let half = lo.width;
  let n = width as isize;
  let offset = filter.offset as isize;

  lo.data
    .par_chunks_exact_mut(half)
    .zip(hi.data.par_chunks_exact_mut(half))
    .zip(src.par_chunks_exact(width))
    .for_each(|((lo_row, hi_row), src_row)| {
      for k in 0..half {
        let base = 2 * k as isize + offset;
        let mut l = 0.0;
        let mut h = 0.0;
        for j in 0..QSHIFT_LEN {
          let x = src_row[(base - j as isize).rem_euclid(n) as usize];
          l += filter.anal_lo[j] * x;
          h += filter.anal_hi[j] * x;
        }
        lo_row[k] = l;
        hi_row[k] = h;
      }
    });
}

/// Decimating lo/hi analysis along y. Output row `k` accumulates whole
/// input rows, which keeps the pass row-major and vectorizable.
#[multiversion(targets("x86_64+avx+avx2", "x86+sse", "aarch64+neon"))]
fn analysis_cols(src: &PlaneF32, filter: &WaveletFilter, lo: &mut PlaneF32, hi: &mut PlaneF32) {
  let width = src.width;
  let rows = src.height as isize;
  let offset = filter.offset as isize;

  lo.data
    .par_chunks_exact_mut(width)
    .zip(hi.data.par_chunks_exact_mut(width))
    .enumerate()
    .for_each(|(k, (lo_row, hi_row))| {
      lo_row.fill(0.0);
      hi_row.fill(0.0);
      let base = 2 * k as isize + offset;
      for j in 0..QSHIFT_LEN {
        let r = (base - j as isize).rem_euclid(rows) as usize;
        let src_row = &src.data[r * width..(r + 1) * width];
        let tap_lo = filter.anal_lo[j];
        let tap_hi = filter.anal_hi[j];
        for (x, s) in src_row.iter().enumerate() {
          lo_row[x] += tap_lo * s;
          hi_row[x] += tap_hi * s;
        }
      }
    });
}

/// Adjoint of [`analysis_cols`]: upsample the subband pair by two along y
/// and accumulate the synthesis convolution into `dst` rows.
#[multiversion(targets("x86_64+avx+avx2", "x86+sse", "aarch64+neon"))]
fn synthesis_cols(lo: &PlaneF32, hi: &PlaneF32, filter: &WaveletFilter, dst: &mut PlaneF32) {
  let width = dst.width;
  let rows = dst.height as isize;
  let half = lo.height;
  let synth_offset = filter.synth_offset() as isize;

  dst.data.par_chunks_exact_mut(width).enumerate().for_each(|(i, out_row)| {
    out_row.fill(0.0);
    let base = i as isize + synth_offset;
    for j in 0..QSHIFT_LEN {
      let t = (base - j as isize).rem_euclid(rows);
      if t % 2 != 0 {
        continue; // upsampled zero sample
      }
      let k = (t / 2) as usize;
      if k >= half {
        continue;
      }
      let tap_lo = filter.synth_lo[j];
      let tap_hi = filter.synth_hi[j];
      let lo_row = &lo.data[k * width..(k + 1) * width];
      let hi_row = &hi.data[k * width..(k + 1) * width];
      for x in 0..width {
        out_row[x] += tap_lo * lo_row[x] + tap_hi * hi_row[x];
      }
    }
  });
}

/// Adjoint of [`analysis_rows`]: upsample along x and sum the lo and hi
/// branch convolutions into the parent rows.
#[multiversion(targets("x86_64+avx+avx2", "x86+sse", "aarch64+neon"))]
fn synthesis_rows(lo: &PlaneF32, hi: &PlaneF32, filter: &WaveletFilter, dst: &mut [f32], width: usize) {
  let half = lo.width;
  let n = width as isize;
  let synth_offset = filter.synth_offset() as isize;

  dst
    .par_chunks_exact_mut(width)
    .zip(lo.data.par_chunks_exact(half))
    .zip(hi.data.par_chunks_exact(half))
    .for_each(|((out_row, lo_row), hi_row)| {
      for (i, out) in out_row.iter_mut().enumerate() {
        let base = i as isize + synth_offset;
        let mut acc = 0.0;
        for j in 0..QSHIFT_LEN {
          let t = (base - j as isize).rem_euclid(n);
          if t % 2 != 0 {
            continue;
          }
          let k = (t / 2) as usize;
          if k < half {
            acc += filter.synth_lo[j] * lo_row[k] + filter.synth_hi[j] * hi_row[k];
          }
        }
        *out = acc;
      }
    });
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::filters::FilterBank;

  fn test_pattern(width: usize, height: usize) -> Vec<f32> {
    (0..width * height).map(|i| 100.0 * ((i * i) as f32 * 0.013).sin() + 50.0).collect()
  }

  #[test]
  fn level_dimensions_halve() -> std::result::Result<(), Box<dyn std::error::Error>> {
    crate::init_test_logger();
    let bank = FilterBank::cascade();
    let src = test_pattern(16, 12);
    let level = WaveletLevel::decompose(&src, 16, 12, &bank.tree_a, &bank.tree_b);
    assert_eq!((level.width, level.height), (8, 6));
    for band in &level.subbands {
      assert_eq!(band.data.len(), 8 * 6);
    }
    Ok(())
  }

  #[test]
  fn single_stage_round_trip() -> std::result::Result<(), Box<dyn std::error::Error>> {
    crate::init_test_logger();
    let bank = FilterBank::cascade();
    // all four row/column kernel combinations must invert exactly
    for (row_filter, col_filter) in [
      (&bank.tree_a, &bank.tree_a),
      (&bank.tree_a, &bank.tree_b),
      (&bank.tree_b, &bank.tree_a),
      (&bank.tree_b, &bank.tree_b),
    ] {
      let src = test_pattern(32, 24);
      let level = WaveletLevel::decompose(&src, 32, 24, row_filter, col_filter);
      let mut restored = vec![0.0_f32; 32 * 24];
      level.reconstruct(&mut restored, 32, 24, row_filter, col_filter);
      let max_err = src.iter().zip(&restored).map(|(a, b)| (a - b).abs()).fold(0.0_f32, f32::max);
      assert!(max_err < 1e-3, "max error {}", max_err);
    }
    Ok(())
  }

  #[test]
  fn constant_input_has_silent_details() -> std::result::Result<(), Box<dyn std::error::Error>> {
    crate::init_test_logger();
    let bank = FilterBank::first_level();
    let src = vec![128.0_f32; 64 * 64];
    let level = WaveletLevel::decompose(&src, 64, 64, &bank.tree_a, &bank.tree_b);
    for band in Subband::DETAILS {
      let peak = level.subband(band).samples().iter().fold(0.0_f32, |m, v| m.max(v.abs()));
      assert!(peak < 1e-2, "{:?} peak {}", band, peak);
    }
    // lowpass gains sqrt(2) per axis
    let expected = 128.0 * 2.0;
    for v in level.approx().samples() {
      assert!((v - expected).abs() < 1e-2);
    }
    Ok(())
  }
}
