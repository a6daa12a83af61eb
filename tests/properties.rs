use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use season_uncertainty::intervals::{bootstrap_mean_interval, wilson_interval};
use season_uncertainty::rate_uncertainty::poisson_rate_interval;
use season_uncertainty::robustness::{average_ranks, spearman_rho};

proptest! {
    #[test]
    fn wilson_bounds_bracket_the_proportion((n, k) in (1u64..500).prop_flat_map(|n| (Just(n), 0..=n))) {
        let est = wilson_interval(k, n, 1.96).unwrap();
        prop_assert!(0.0 <= est.lower);
        prop_assert!(est.lower <= est.point_estimate);
        prop_assert!(est.point_estimate <= est.upper);
        prop_assert!(est.upper <= 1.0);
    }

    #[test]
    fn wilson_narrows_as_games_grow((n, k) in (1u64..300).prop_flat_map(|n| (Just(n), 0..=n))) {
        let small = wilson_interval(k, n, 1.96).unwrap();
        let large = wilson_interval(4 * k, 4 * n, 1.96).unwrap();
        prop_assert!(large.width() <= small.width() + 1e-12);
    }

    #[test]
    fn bootstrap_stays_inside_sample_range(
        sample in prop::collection::vec(-50.0f64..50.0, 1..40),
        seed in any::<u64>(),
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let est = bootstrap_mean_interval(&sample, 200, 0.05, &mut rng).unwrap();
        let lo = sample.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = sample.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(est.lower <= est.upper);
        prop_assert!(est.lower >= lo - 1e-9);
        prop_assert!(est.upper <= hi + 1e-9);
    }

    #[test]
    fn poisson_rate_interval_is_non_negative(
        total in 0u64..200,
        games in 1u64..40,
        seed in any::<u64>(),
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let est = poisson_rate_interval(total, games, 200, 0.05, &mut rng).unwrap();
        prop_assert!(est.lower >= 0.0);
        prop_assert!(est.lower <= est.upper);
        prop_assert!((est.point_estimate - total as f64 / games as f64).abs() < 1e-12);
    }

    #[test]
    fn spearman_is_bounded_or_undefined(
        pairs in prop::collection::vec((0u32..20, 0u32..20), 0..30),
    ) {
        let xs: Vec<f64> = pairs.iter().map(|(x, _)| *x as f64).collect();
        let ys: Vec<f64> = pairs.iter().map(|(_, y)| *y as f64).collect();
        let rho = spearman_rho(&xs, &ys);
        prop_assert!(rho.is_nan() || (-1.0..=1.0).contains(&rho));
    }

    #[test]
    fn average_ranks_sum_is_triangular(values in prop::collection::vec(0u8..6, 0..50)) {
        let values: Vec<f64> = values.into_iter().map(f64::from).collect();
        let n = values.len() as f64;
        let total: f64 = average_ranks(&values).iter().sum();
        prop_assert!((total - n * (n + 1.0) / 2.0).abs() < 1e-9);
    }
}
