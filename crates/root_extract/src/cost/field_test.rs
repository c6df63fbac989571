use super::*;

fn ramp() -> VoxelGrid<f32> {
  VoxelGrid::from_fn([4, 1, 1], |[x, _, _]| x as f32)
}

#[test]
fn test_cost_is_non_negative_and_normalized() {
  let intensity = ramp();
  let radius = VoxelGrid::filled_like(&intensity, 0.0_f32);
  let cost = compute_cost_field(&intensity, &radius, &CostParams::DEFAULT, &WorkerPool::global()).unwrap();

  let max = cost.max_value();
  assert!((max - 1.0).abs() < 1e-6);
  assert!(cost.as_slice().iter().all(|&c| c >= 0.0));
}

#[test]
fn test_brighter_is_cheaper() {
  let intensity = ramp();
  let radius = VoxelGrid::filled_like(&intensity, 0.0_f32);
  let cost = compute_cost_field(&intensity, &radius, &CostParams::DEFAULT, &WorkerPool::global()).unwrap();
  let values = cost.as_slice();
  for pair in values.windows(2) {
    assert!(pair[1] < pair[0], "cost should fall as intensity rises: {values:?}");
  }
  // Brightest voxel only pays the offset.
  assert!(values[3] < 1e-3);
}

#[test]
fn test_radius_weight_breaks_intensity_ties() {
  let intensity = VoxelGrid::filled([2, 1, 1], 1.0_f32);
  let mut radius = VoxelGrid::filled_like(&intensity, 1.0_f32);
  radius[[1, 0, 0]] = 3.0;
  let cost = compute_cost_field(&intensity, &radius, &CostParams::DEFAULT, &WorkerPool::global()).unwrap();
  assert!(cost[[1, 0, 0]] < cost[[0, 0, 0]]);

  let flat = CostParams::DEFAULT.with_radius_weight(0.0);
  let cost = compute_cost_field(&intensity, &radius, &flat, &WorkerPool::global()).unwrap();
  assert_eq!(cost[[1, 0, 0]], cost[[0, 0, 0]]);
}

#[test]
fn test_zero_input_is_uniform() {
  let intensity = VoxelGrid::filled([3, 3, 3], 0.0_f32);
  let radius = intensity.clone();
  let cost = compute_cost_field(&intensity, &radius, &CostParams::DEFAULT, &WorkerPool::global()).unwrap();
  assert!(cost.as_slice().iter().all(|&c| (c - 1.0).abs() < 1e-6));
}

#[test]
fn test_gap_band_is_scaled() {
  let intensity = ramp();
  let radius = VoxelGrid::filled_like(&intensity, 0.0_f32);
  let params = CostParams::DEFAULT.with_gap_fraction(0.2);
  let plain = compute_cost_field(&intensity, &radius, &CostParams::DEFAULT, &WorkerPool::global()).unwrap();
  let gapped = compute_cost_field(&intensity, &radius, &params, &WorkerPool::global()).unwrap();

  for (p, g) in plain.as_slice().iter().zip(gapped.as_slice()) {
    if *p >= gap_threshold(0.2) {
      assert!((g - p * GAP_COST_SCALE).abs() < 1e-5);
    } else {
      assert_eq!(p, g);
    }
  }
  // Darkest voxel has cost 1.0, inside the band.
  assert!((gapped[[0, 0, 0]] - GAP_COST_SCALE).abs() < 1e-4);
}

#[test]
fn test_shape_mismatch_rejected() {
  let intensity = ramp();
  let radius = VoxelGrid::filled([2, 2, 1], 0.0_f32);
  let err = compute_cost_field(&intensity, &radius, &CostParams::DEFAULT, &WorkerPool::global()).unwrap_err();
  assert!(err.is_input_error());
}

#[test]
fn test_thread_count_does_not_change_cost() {
  let intensity = VoxelGrid::from_fn([9, 7, 5], |[x, y, z]| ((x * 7 + y * 3 + z) % 11) as f32);
  let radius = VoxelGrid::from_fn([9, 7, 5], |[x, _, z]| (x % 3 + z % 2) as f32);
  let params = CostParams::DEFAULT.with_gap_fraction(0.2);

  let single = compute_cost_field(&intensity, &radius, &params, &WorkerPool::new(1)).unwrap();
  let multi = compute_cost_field(&intensity, &radius, &params, &WorkerPool::new(4)).unwrap();
  assert_eq!(single.as_slice(), multi.as_slice());
}
