// SPDX-License-Identifier: LGPL-2.1

use dualtree::DualTreeDecomposition;
use dualtree::MAX_LEVELS;
use dualtree::Subband;
use dualtree::Tree;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn init_test_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}

fn random_image(width: usize, height: usize, seed: u64) -> Vec<f32> {
  let mut rng = StdRng::seed_from_u64(seed);
  (0..width * height).map(|_| rng.gen_range(0.0..256.0)).collect()
}

fn max_abs_diff(a: &[f32], b: &[f32]) -> f32 {
  a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f32::max)
}

fn l2_diff(a: &[f32], b: &[f32]) -> f64 {
  a.iter().zip(b).map(|(x, y)| ((x - y) as f64).powi(2)).sum::<f64>().sqrt()
}

#[test]
fn round_trip_all_depths() -> std::result::Result<(), Box<dyn std::error::Error>> {
  init_test_logger();
  for (width, height, seed) in [(64, 64, 1_u64), (128, 128, 2), (128, 64, 3)] {
    let src = random_image(width, height, seed);
    for levels in 1..=MAX_LEVELS {
      let mut dec = DualTreeDecomposition::new(&src, width, height, levels)?;
      let mut dst = vec![0.0_f32; width * height];
      dec.reconstruct(&mut dst)?;
      let err = max_abs_diff(&src, &dst);
      assert!(err < 0.5, "{}x{} levels {}: max error {}", width, height, levels, err);
    }
  }
  Ok(())
}

#[test]
fn constant_image_survives_untouched() -> std::result::Result<(), Box<dyn std::error::Error>> {
  init_test_logger();
  let src = vec![128.0_f32; 256 * 256];
  let mut dec = DualTreeDecomposition::new(&src, 256, 256, 4)?;
  assert_eq!(dec.levels(), 4);

  // a flat image produces silent detail planes on every level and tree
  for tree in Tree::ALL {
    for lvl in 0..dec.levels() {
      for band in Subband::DETAILS {
        let peak = dec
          .level(lvl, tree)
          .subband(band)
          .samples()
          .iter()
          .fold(0.0_f32, |m, v| m.max(v.abs()));
        assert!(peak < 0.05, "tree {:?} level {} {:?}: peak {}", tree, lvl, band, peak);
      }
    }
  }

  let mut dst = vec![0.0_f32; 256 * 256];
  dec.reconstruct(&mut dst)?;
  let err = max_abs_diff(&src, &dst);
  assert!(err < 0.1, "max error {}", err);
  Ok(())
}

#[test]
fn tiny_image_degenerates_gracefully() -> std::result::Result<(), Box<dyn std::error::Error>> {
  init_test_logger();
  let src = vec![9.0_f32; 9];
  let mut dec = DualTreeDecomposition::new(&src, 3, 3, MAX_LEVELS)?;
  assert!(dec.levels() < MAX_LEVELS);
  assert_eq!(dec.levels(), 1);
  for tree in Tree::ALL {
    let level = dec.level(0, tree);
    assert!(level.width > 0 && level.height > 0);
  }
  let mut dst = vec![0.0_f32; 9];
  dec.reconstruct(&mut dst)?;
  Ok(())
}

#[test]
fn depth_is_capped_by_size_and_ceiling() -> std::result::Result<(), Box<dyn std::error::Error>> {
  init_test_logger();
  let src = random_image(64, 64, 4);
  // 64 halves to zero after six levels
  let dec = DualTreeDecomposition::new(&src, 64, 64, 50)?;
  assert_eq!(dec.levels(), 6);
  // a 256 image could go deeper, the ceiling stops it
  let big = random_image(256, 256, 5);
  let dec = DualTreeDecomposition::new(&big, 256, 256, 50)?;
  assert_eq!(dec.levels(), MAX_LEVELS);
  // zero requests behave as one level
  let dec = DualTreeDecomposition::new(&src, 64, 64, 0)?;
  assert_eq!(dec.levels(), 1);
  Ok(())
}

#[test]
fn single_tree_zeroing_is_deterministic() -> std::result::Result<(), Box<dyn std::error::Error>> {
  init_test_logger();
  let src = random_image(128, 128, 6);

  let run = || -> std::result::Result<Vec<f32>, Box<dyn std::error::Error>> {
    let mut dec = DualTreeDecomposition::new(&src, 128, 128, 3)?;
    for tree in [Tree::AB, Tree::BA] {
      for lvl in 0..dec.levels() {
        for band in &mut dec.level_mut(lvl, tree).subbands {
          band.fill(0.0);
        }
      }
    }
    let mut dst = vec![0.0_f32; 128 * 128];
    dec.reconstruct(&mut dst)?;
    Ok(dst)
  };

  let first = run()?;
  let second = run()?;
  assert_eq!(first, second, "reconstruction must be bit-deterministic");

  // and the edit must actually change the output
  let mut dec = DualTreeDecomposition::new(&src, 128, 128, 3)?;
  let mut untouched = vec![0.0_f32; 128 * 128];
  dec.reconstruct(&mut untouched)?;
  assert!(max_abs_diff(&first, &untouched) > 1.0);
  Ok(())
}

#[test]
fn detail_scaling_acts_linearly() -> std::result::Result<(), Box<dyn std::error::Error>> {
  init_test_logger();
  let src = random_image(128, 128, 7);

  let reconstruct_scaled = |gain: f32| -> std::result::Result<Vec<f32>, Box<dyn std::error::Error>> {
    let mut dec = DualTreeDecomposition::new(&src, 128, 128, 3)?;
    for tree in Tree::ALL {
      let level = dec.level_mut(1, tree);
      for band in Subband::DETAILS {
        level.subband_mut(band).for_each(|v| v * gain);
      }
    }
    let mut dst = vec![0.0_f32; 128 * 128];
    dec.reconstruct(&mut dst)?;
    Ok(dst)
  };

  let base = reconstruct_scaled(1.0)?;
  let twice = reconstruct_scaled(2.0)?;
  let thrice = reconstruct_scaled(3.0)?;

  let e2 = l2_diff(&twice, &base);
  let e3 = l2_diff(&thrice, &base);
  assert!(e2 > 1.0, "scaling one level's details must perturb the output");
  let ratio = e3 / e2;
  assert!((ratio - 2.0).abs() < 0.1, "band response not linear: ratio {}", ratio);
  Ok(())
}

#[test]
fn integer_samples_round_trip() -> std::result::Result<(), Box<dyn std::error::Error>> {
  init_test_logger();
  let mut rng = StdRng::seed_from_u64(8);

  let src8: Vec<u8> = (0..64 * 64).map(|_| rng.r#gen()).collect();
  let mut dec = DualTreeDecomposition::new(&src8, 64, 64, 3)?;
  let mut dst8 = vec![0_u8; 64 * 64];
  dec.reconstruct(&mut dst8)?;
  for (a, b) in src8.iter().zip(&dst8) {
    assert!(a.abs_diff(*b) <= 1, "{} vs {}", a, b);
  }

  // 12 bit raw-style data
  let src16: Vec<u16> = (0..64 * 64).map(|_| rng.gen_range(0..4096)).collect();
  let mut dec = DualTreeDecomposition::new(&src16, 64, 64, 3)?;
  let mut dst16 = vec![0_u16; 64 * 64];
  dec.reconstruct(&mut dst16)?;
  for (a, b) in src16.iter().zip(&dst16) {
    assert!(a.abs_diff(*b) <= 1, "{} vs {}", a, b);
  }
  Ok(())
}
