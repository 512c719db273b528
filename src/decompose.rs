// SPDX-License-Identifier: LGPL-2.1

//! Dual-tree decomposition and reconstruction controller.
//!
//! Four parallel wavelet tree chains are built level by level, one per
//! combination of row/column kernel choice. After construction the three
//! detail planes of corresponding levels are pairwise rotated by 45
//! degrees across the tree pairs (AA, BB) and (AB, BA), which gives the
//! coefficients their approximately analytic, directionally selective
//! behavior. Reconstruction applies the same rotation once more (the step
//! is its own inverse), cascades the synthesis filtering per tree and
//! averages the four full-resolution results.

use std::time::Instant;

use itertools::izip;
use num::traits::AsPrimitive;
use rayon::prelude::*;

use crate::DualTreeError;
use crate::Result;
use crate::filters::FilterBank;
use crate::filters::WaveletFilter;
use crate::level::Subband;
use crate::level::WaveletLevel;
use crate::plane::PlaneF32;

/// Hard ceiling for the decomposition depth. Deeper requests are clamped;
/// small images cap out earlier on their own.
pub const MAX_LEVELS: usize = 8;

/// Tree id: row-axis and column-axis kernel choice, one bit each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tree {
  /// Tree A kernels on both axes.
  AA = 0,
  /// Tree A rows, tree B columns.
  AB = 1,
  /// Tree B rows, tree A columns.
  BA = 2,
  /// Tree B kernels on both axes.
  BB = 3,
}

impl Tree {
  /// All four trees in plane-index order. Rotation combines the pairs
  /// (AA, BB) and (AB, BA).
  pub const ALL: [Tree; 4] = [Tree::AA, Tree::AB, Tree::BA, Tree::BB];

  #[inline]
  pub fn index(self) -> usize {
    self as usize
  }

  fn row_filter(self, bank: &FilterBank) -> &WaveletFilter {
    match self {
      Tree::AA | Tree::AB => &bank.tree_a,
      Tree::BA | Tree::BB => &bank.tree_b,
    }
  }

  fn col_filter(self, bank: &FilterBank) -> &WaveletFilter {
    match self {
      Tree::AA | Tree::BA => &bank.tree_a,
      Tree::AB | Tree::BB => &bank.tree_b,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
  Decomposed,
  Reconstructed,
}

/// A complete, rotated dual-tree decomposition of one image plane.
///
/// Between [`DualTreeDecomposition::new`] and
/// [`DualTreeDecomposition::reconstruct`] the detail planes may be edited
/// in place through [`DualTreeDecomposition::level_mut`]; every edit is
/// faithfully propagated into the reconstructed output. Reconstruction
/// consumes the coefficients (the rotation runs in place), so a second
/// `reconstruct` call is rejected.
pub struct DualTreeDecomposition {
  width: usize,
  height: usize,
  levels_total: usize,
  trees: [Vec<WaveletLevel>; 4],
  state: Lifecycle,
}

impl DualTreeDecomposition {
  /// Decompose a row-major `width` x `height` buffer into up to
  /// `max_levels` rotated levels per tree.
  ///
  /// `max_levels` is clamped into `1..=MAX_LEVELS`; the achieved depth may
  /// be smaller when a level's extent would degenerate to zero.
  pub fn new<T>(src: &[T], width: usize, height: usize, max_levels: usize) -> Result<Self>
  where
    T: Copy + AsPrimitive<f32>,
  {
    if width < 2 || height < 2 {
      return Err(DualTreeError::InvalidDimensions(width, height));
    }
    if src.len() != width * height {
      return Err(DualTreeError::BufferMismatch {
        len: src.len(),
        width,
        height,
      });
    }
    let levels = max_levels.clamp(1, MAX_LEVELS);
    if levels != max_levels {
      log::debug!("requested {} levels, clamped to {}", max_levels, levels);
    }
    let now = Instant::now();

    let source: Vec<f32> = src.iter().map(|v| v.as_()).collect();

    let mut trees: [Vec<WaveletLevel>; 4] = Default::default();
    trees.par_iter_mut().enumerate().for_each(|(t, chain)| {
      *chain = build_chain(&source, width, height, levels, Tree::ALL[t]);
    });
    let levels_total = trees[0].len();
    debug_assert!(trees.iter().all(|chain| chain.len() == levels_total));

    let mut decomposition = Self {
      width,
      height,
      levels_total,
      trees,
      state: Lifecycle::Decomposed,
    };
    decomposition.rotate_details();

    log::debug!(
      "dual-tree decompose {}x{}: {} levels, {:.5}s",
      width,
      height,
      levels_total,
      now.elapsed().as_secs_f32()
    );
    Ok(decomposition)
  }

  /// Invert the transform into `dst`, averaging the four tree outputs.
  ///
  /// Values are cast into `T` without rounding or clamping. The
  /// decomposition is consumed: further calls return
  /// [`DualTreeError::AlreadyReconstructed`].
  pub fn reconstruct<T>(&mut self, dst: &mut [T]) -> Result<()>
  where
    T: Copy + 'static,
    f32: AsPrimitive<T>,
  {
    if self.state != Lifecycle::Decomposed {
      return Err(DualTreeError::AlreadyReconstructed);
    }
    if dst.len() != self.width * self.height {
      return Err(DualTreeError::BufferMismatch {
        len: dst.len(),
        width: self.width,
        height: self.height,
      });
    }
    let now = Instant::now();

    // Undo the forward rotation, then cascade each tree back up.
    self.rotate_details();
    self.state = Lifecycle::Reconstructed;

    let first = FilterBank::first_level();
    let cascade = FilterBank::cascade();
    let (width, height) = (self.width, self.height);
    let outputs: Vec<PlaneF32> = self
      .trees
      .par_iter_mut()
      .enumerate()
      .map(|(t, chain)| {
        let tree = Tree::ALL[t];
        for lvl in (1..chain.len()).rev() {
          let (parents, children) = chain.split_at_mut(lvl);
          let parent = &mut parents[lvl - 1];
          let (parent_w, parent_h) = (parent.width, parent.height);
          children[0].reconstruct(
            parent.subband_mut(Subband::Approx).samples_mut(),
            parent_w,
            parent_h,
            tree.row_filter(cascade),
            tree.col_filter(cascade),
          );
        }
        let mut out = PlaneF32::new(width, height);
        chain[0].reconstruct(out.samples_mut(), width, height, tree.row_filter(first), tree.col_filter(first));
        out
      })
      .collect();

    // Collapse the four redundant trees into one real-valued image.
    for (out, p0, p1, p2, p3) in izip!(
      dst.iter_mut(),
      outputs[0].samples(),
      outputs[1].samples(),
      outputs[2].samples(),
      outputs[3].samples()
    ) {
      *out = (0.25 * (p0 + p1 + p2 + p3)).as_();
    }

    log::debug!("dual-tree reconstruct {}x{}: {:.5}s", width, height, now.elapsed().as_secs_f32());
    Ok(())
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }

  /// Achieved decomposition depth, `1..=MAX_LEVELS`.
  pub fn levels(&self) -> usize {
    self.levels_total
  }

  /// Coefficient access for one (level, tree) node.
  ///
  /// # Panics
  /// Panics if `lvl >= self.levels()`.
  pub fn level(&self, lvl: usize, tree: Tree) -> &WaveletLevel {
    &self.trees[tree.index()][lvl]
  }

  /// Mutable coefficient access, the editing seam for per-band processing.
  ///
  /// # Panics
  /// Panics if `lvl >= self.levels()`.
  pub fn level_mut(&mut self, lvl: usize, tree: Tree) -> &mut WaveletLevel {
    &mut self.trees[tree.index()][lvl]
  }

  /// Rotate the detail planes of both tree pairs on every level. Applying
  /// the rotation twice restores the original coefficients.
  fn rotate_details(&mut self) {
    let [t_aa, t_ab, t_ba, t_bb] = &mut self.trees;
    for (a, b) in t_aa.iter_mut().zip(t_bb.iter_mut()) {
      rotate_level_pair(a, b);
    }
    for (a, b) in t_ab.iter_mut().zip(t_ba.iter_mut()) {
      rotate_level_pair(a, b);
    }
  }
}

fn build_chain(source: &[f32], width: usize, height: usize, max_levels: usize, tree: Tree) -> Vec<WaveletLevel> {
  let first = FilterBank::first_level();
  let cascade = FilterBank::cascade();

  let mut chain = Vec::with_capacity(max_levels);
  chain.push(WaveletLevel::decompose(
    source,
    width,
    height,
    tree.row_filter(first),
    tree.col_filter(first),
  ));
  while chain.len() < max_levels {
    let parent = &chain[chain.len() - 1];
    if parent.width / 2 == 0 || parent.height / 2 == 0 {
      break; // next level would degenerate, stop growing deeper
    }
    let next = WaveletLevel::decompose(
      parent.approx().samples(),
      parent.width,
      parent.height,
      tree.row_filter(cascade),
      tree.col_filter(cascade),
    );
    chain.push(next);
  }
  chain
}

fn rotate_level_pair(a: &mut WaveletLevel, b: &mut WaveletLevel) {
  for band in Subband::DETAILS {
    rotate_pair(a.subband_mut(band).samples_mut(), b.subband_mut(band).samples_mut());
  }
}

/// 45 degree rotation of a detail-plane pair. Both inputs are read before
/// either is overwritten; under that ordering the step is its own inverse.
fn rotate_pair(a: &mut [f32], b: &mut [f32]) {
  debug_assert_eq!(a.len(), b.len());
  let root2 = std::f32::consts::SQRT_2;
  a.par_iter_mut().zip(b.par_iter_mut()).for_each(|(pa, pb)| {
    let sum = (*pa + *pb) / root2;
    *pb = (*pa - *pb) / root2;
    *pa = sum;
  });
}
