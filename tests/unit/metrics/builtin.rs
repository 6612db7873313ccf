//! Tests for the built-in distance metrics and their lower bounds

#[cfg(test)]
mod tests {
    use ndarray::{Array3, array};
    use photomosaic::colour::space::ColourSpace;
    use photomosaic::metrics::builtin::{Greyscale, LuvApprox, Norm};
    use photomosaic::metrics::registry::Metric;
    use photomosaic::spatial::buffer::{ChannelSummary, PixelBuffer};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_array(rng: &mut StdRng) -> Array3<f64> {
        Array3::from_shape_fn((4, 5, 3), |_| f64::from(rng.random_range(0u8..=255)))
    }

    fn summaries(a: &Array3<f64>, b: &Array3<f64>) -> [ChannelSummary; 2] {
        [a, b].map(|data| {
            PixelBuffer::new(data.clone(), ColourSpace::Rgb)
                .expect("three channels")
                .summary()
        })
    }

    // Tests the Euclidean norm on a hand-computed pair
    // Verified by dropping the square root
    #[test]
    fn test_norm_known_value() {
        let a = array![[[0.0, 0.0, 0.0]]];
        let b = array![[[3.0, 4.0, 0.0]]];
        let norm = Norm::euclidean();
        assert!((norm.distance(a.view(), b.view()) - 5.0).abs() < 1e-12);
        assert!((norm.distance(b.view(), a.view()) - 5.0).abs() < 1e-12);
        assert!(norm.distance(a.view(), a.view()).abs() < 1e-12);
    }

    // Tests other norm orders match their closed forms
    // Verified by using the Euclidean branch for every order
    #[test]
    fn test_norm_orders() {
        let a = array![[[1.0, 2.0, 3.0]]];
        let b = array![[[2.0, 4.0, 0.0]]];

        let manhattan = Norm::with_order(1.0).expect("valid order");
        assert!((manhattan.distance(a.view(), b.view()) - 6.0).abs() < 1e-12);

        let maximum = Norm::with_order(f64::INFINITY).expect("valid order");
        assert!((maximum.distance(a.view(), b.view()) - 3.0).abs() < 1e-12);

        let cubic = Norm::with_order(3.0).expect("valid order");
        let expected = 36.0f64.cbrt();
        assert!((cubic.distance(a.view(), b.view()) - expected).abs() < 1e-9);

        assert!(Norm::with_order(0.5).is_err());
        assert!(Norm::with_order(f64::NAN).is_err());
        assert!((Norm::default().order() - 2.0).abs() < f64::EPSILON);
    }

    // Tests greyscale compares only per-pixel channel means
    // Verified by summing channels without dividing by three
    #[test]
    fn test_greyscale_ignores_hue() {
        let red = array![[[90.0, 0.0, 0.0]]];
        let blue = array![[[0.0, 0.0, 90.0]]];
        let grey = array![[[60.0, 60.0, 60.0]]];

        assert!(Greyscale.distance(red.view(), blue.view()).abs() < 1e-12);
        assert!((Greyscale.distance(red.view(), grey.view()) - 30.0).abs() < 1e-12);
    }

    // Tests the redmean weighting on a single pixel
    // Verified by weighting green with 512 instead of 1024
    #[test]
    fn test_luv_approx_known_value() {
        let a = array![[[100.0, 50.0, 20.0]]];
        let b = array![[[60.0, 40.0, 30.0]]];
        // r = 80; w = 592 * 1600 + 1024 * 100 + 687 * 100
        let w = 592.0 * 1600.0 + 1024.0 * 100.0 + 687.0 * 100.0;
        assert!((LuvApprox.distance(a.view(), b.view()) - w).abs() < 1e-6);
        assert!(LuvApprox.lower_bound(&Default::default(), &Default::default()).is_none());
    }

    // Tests every metric is non-negative and zero on identical operands
    // Verified by returning signed differences
    #[test]
    fn test_metrics_non_negative() {
        let mut rng = StdRng::seed_from_u64(11);
        let metrics: [&dyn Metric; 3] = [&Greyscale, &Norm::euclidean(), &LuvApprox];
        for _ in 0..50 {
            let a = random_array(&mut rng);
            let b = random_array(&mut rng);
            for metric in metrics {
                assert!(metric.distance(a.view(), b.view()) >= 0.0);
                assert!(metric.distance(a.view(), a.view()).abs() < 1e-9);
            }
        }
    }

    // Tests lower bounds never exceed the exact distance
    // Verified by removing the sqrt(N) factor from the greyscale bound
    #[test]
    fn test_lower_bounds_hold() {
        let mut rng = StdRng::seed_from_u64(12);
        let norms = [1.0, 2.0, 3.0, f64::INFINITY].map(|p| Norm::with_order(p).expect("valid order"));
        for _ in 0..200 {
            let a = random_array(&mut rng);
            let b = random_array(&mut rng);
            let [sa, sb] = summaries(&a, &b);

            for norm in &norms {
                let bound = norm.lower_bound(&sa, &sb).expect("norm has a bound");
                assert!(bound <= norm.distance(a.view(), b.view()) + 1e-6);
            }
            let bound = Greyscale.lower_bound(&sa, &sb).expect("greyscale has a bound");
            assert!(bound <= Greyscale.distance(a.view(), b.view()) + 1e-6);
        }
    }
}
