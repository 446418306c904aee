//! Beta variates for Thompson sampling.

use rand::Rng;
use rand_distr::{Distribution, Gamma};

/// Draw one Beta(alpha, beta) sample as the ratio of two Gamma(shape, 1)
/// draws: `x / (x + y)`.
///
/// rand_distr's Gamma sampler is Marsaglia–Tsang, which is statistically
/// sound for the `shape >= 1` parameters the arm store guarantees.
/// Degenerate parameters fall back to 0.5 rather than panicking.
pub fn sample_beta<R: Rng + ?Sized>(rng: &mut R, alpha: f64, beta: f64) -> f64 {
    if !(alpha.is_finite() && beta.is_finite()) || alpha <= 0.0 || beta <= 0.0 {
        return 0.5;
    }
    let (Ok(gamma_a), Ok(gamma_b)) = (Gamma::new(alpha, 1.0), Gamma::new(beta, 1.0)) else {
        return 0.5;
    };
    let x: f64 = gamma_a.sample(rng);
    let y: f64 = gamma_b.sample(rng);
    if x + y == 0.0 {
        return 0.5;
    }
    x / (x + y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const N: usize = 20_000;

    fn moments(alpha: f64, beta: f64, seed: u64) -> (f64, f64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let samples: Vec<f64> = (0..N).map(|_| sample_beta(&mut rng, alpha, beta)).collect();
        let mean = samples.iter().sum::<f64>() / N as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / N as f64;
        (mean, var)
    }

    #[test]
    fn samples_stay_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let s = sample_beta(&mut rng, 3.0, 2.0);
            assert!((0.0..=1.0).contains(&s));
        }
    }

    // Goodness-of-fit by moment matching: empirical mean and variance of the
    // sampler must track the analytic Beta moments.
    #[test]
    fn sampler_matches_beta_moments() {
        for (i, (alpha, beta)) in [(1.0, 1.0), (2.0, 5.0), (51.0, 1.0), (5.0, 5.0)]
            .into_iter()
            .enumerate()
        {
            let (mean, var) = moments(alpha, beta, 1000 + i as u64);
            let expected_mean = alpha / (alpha + beta);
            let expected_var =
                alpha * beta / ((alpha + beta).powi(2) * (alpha + beta + 1.0));
            assert!(
                (mean - expected_mean).abs() < 0.01,
                "mean off for Beta({alpha},{beta}): got {mean}, want {expected_mean}"
            );
            assert!(
                (var - expected_var).abs() < 0.01,
                "variance off for Beta({alpha},{beta}): got {var}, want {expected_var}"
            );
        }
    }

    #[test]
    fn degenerate_parameters_fall_back_to_half() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(sample_beta(&mut rng, 0.0, 1.0), 0.5);
        assert_eq!(sample_beta(&mut rng, 1.0, -3.0), 0.5);
        assert_eq!(sample_beta(&mut rng, f64::NAN, 1.0), 0.5);
    }
}
