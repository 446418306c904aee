//! Fitness scoring for variant performance.

use adlift_common::PerformanceMetrics;

/// Weights over the normalized component scores. The defaults favor
/// conversions over clicks over revenue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitnessWeights {
    pub ctr: f64,
    pub cvr: f64,
    pub revenue: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            ctr: 0.3,
            cvr: 0.5,
            revenue: 0.2,
        }
    }
}

/// Collapse a metrics snapshot into a scalar fitness.
///
/// Component scores saturate at 1.0: a 10% CTR, a 20% CVR, and 1000 in
/// revenue each max out their term.
pub fn score(metrics: &PerformanceMetrics, weights: &FitnessWeights) -> f64 {
    let ctr_score = (metrics.ctr() * 10.0).min(1.0);
    let cvr_score = (metrics.cvr() * 5.0).min(1.0);
    let revenue_score = (metrics.revenue / 1000.0).min(1.0);

    weights.ctr * ctr_score + weights.cvr * cvr_score + weights.revenue * revenue_score
}
