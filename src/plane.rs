use rayon::prelude::*;

/// Owned row-major plane of samples.
///
/// Used for coefficient subbands as well as full-resolution temporaries.
/// There is no stride or padding: rows are `width` samples, back to back.
#[derive(Clone)]
pub struct Plane<T> {
  pub width: usize,
  pub height: usize,
  pub data: Vec<T>,
}

pub type PlaneF32 = Plane<f32>;

impl<T> Plane<T>
where
  T: Copy + Default + Send,
{
  pub fn new(width: usize, height: usize) -> Self {
    let data = vec![T::default(); width * height];
    Self { data, width, height }
  }

  pub fn new_with(data: Vec<T>, width: usize, height: usize) -> Self {
    assert_eq!(data.len(), height * width);
    Self { data, width, height }
  }

  pub fn into_inner(self) -> Vec<T> {
    self.data
  }

  pub fn samples(&self) -> &[T] {
    &self.data
  }

  pub fn samples_mut(&mut self) -> &mut [T] {
    &mut self.data
  }

  pub fn rows(&self) -> std::slice::ChunksExact<'_, T> {
    self.data.chunks_exact(self.width)
  }

  pub fn rows_mut(&mut self) -> std::slice::ChunksExactMut<'_, T> {
    self.data.chunks_exact_mut(self.width)
  }

  #[inline(always)]
  pub fn at(&self, row: usize, col: usize) -> &T {
    #[cfg(debug_assertions)]
    {
      &self.data[row * self.width + col]
    }
    #[cfg(not(debug_assertions))]
    unsafe {
      self.data.get_unchecked(row * self.width + col)
    }
  }

  #[inline(always)]
  pub fn at_mut(&mut self, row: usize, col: usize) -> &mut T {
    #[cfg(debug_assertions)]
    {
      &mut self.data[row * self.width + col]
    }
    #[cfg(not(debug_assertions))]
    unsafe {
      self.data.get_unchecked_mut(row * self.width + col)
    }
  }

  pub fn fill(&mut self, value: T) {
    self.data.fill(value);
  }

  /// Apply `op` to every sample, in place.
  #[inline(always)]
  pub fn for_each<F>(&mut self, op: F)
  where
    F: Fn(T) -> T + Send + Sync,
  {
    self.data.par_iter_mut().for_each(|v| *v = op(*v));
  }
}

impl<T> Default for Plane<T>
where
  T: Default,
{
  fn default() -> Self {
    Self {
      width: 0,
      height: 0,
      data: Default::default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plane_rows_and_access() -> std::result::Result<(), Box<dyn std::error::Error>> {
    crate::init_test_logger();
    let mut plane = Plane::new_with((0..12_u32).collect(), 4, 3);
    assert_eq!(plane.rows().count(), 3);
    assert_eq!(*plane.at(2, 1), 9);
    *plane.at_mut(0, 3) = 99;
    assert_eq!(plane.data[3], 99);
    plane.for_each(|v| v + 1);
    assert_eq!(*plane.at(0, 0), 1);
    Ok(())
  }
}
