//! Elitist parent selection.

/// A variant's id paired with its computed fitness.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredVariant {
    pub variant_id: String,
    pub fitness: f64,
}

/// Keep the top slice of the population as breeding stock.
///
/// Pool size is `max(2, floor(N * pool_pct / 100))`. Callers skip the cycle
/// outright when fewer than 2 variants exist.
pub fn select_parents(mut scored: Vec<ScoredVariant>, pool_pct: f64) -> Vec<ScoredVariant> {
    scored.sort_by(|a, b| {
        b.fitness
            .partial_cmp(&a.fitness)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let pool = ((scored.len() as f64 * pool_pct / 100.0).floor() as usize).max(2);
    scored.truncate(pool);
    scored
}
