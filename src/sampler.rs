use crate::types::{BiasRule, Region};
use geo::{Contains, Point, Rect};
use rand::Rng;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SamplingError {
    #[error("region {region:?} accepted {accepted} of {quota} points after {attempts} attempts")]
    QuotaUnsatisfied {
        region: String,
        accepted: usize,
        quota: usize,
        attempts: usize,
    },
}

impl BiasRule {
    /// Draws one candidate inside `bbox`. `U²` pushes mass toward the lower bound,
    /// `1 - U²` toward the upper bound.
    pub fn draw<R: Rng>(self, bbox: &Rect<f64>, rng: &mut R) -> Point<f64> {
        let (min, max) = (bbox.min(), bbox.max());

        let (tx, ty) = match self {
            BiasRule::Default => (uniform(rng), uniform(rng)),
            BiasRule::SouthWeighted => (uniform(rng), toward_min(rng)),
            BiasRule::NorthWeighted => (uniform(rng), toward_max(rng)),
            BiasRule::WestNorthWeighted => (toward_min(rng), toward_max(rng)),
        };

        Point::new(
            min.x + tx * (max.x - min.x),
            min.y + ty * (max.y - min.y),
        )
    }
}

fn uniform<R: Rng>(rng: &mut R) -> f64 {
    rng.gen::<f64>()
}

fn toward_min<R: Rng>(rng: &mut R) -> f64 {
    rng.gen::<f64>().powi(2)
}

fn toward_max<R: Rng>(rng: &mut R) -> f64 {
    1.0 - rng.gen::<f64>().powi(2)
}

/// Region name to bias rule. Names without an entry sample uniformly.
#[derive(Debug, Clone, Default)]
pub struct BiasTable(HashMap<String, BiasRule>);

impl BiasTable {
    pub fn new(rules: HashMap<String, BiasRule>) -> Self {
        Self(rules)
    }

    pub fn rule_for(&self, region_name: &str) -> BiasRule {
        self.0.get(region_name).copied().unwrap_or_default()
    }
}

/// Rejection sampling inside `region`: candidates come from `rule` over the
/// bounding box and are kept only when strictly inside the geometry.
pub fn sample<R: Rng>(
    region: &Region,
    quota: usize,
    rule: BiasRule,
    max_attempts: usize,
    rng: &mut R,
) -> Result<Vec<Point<f64>>, SamplingError> {
    let mut accepted = Vec::with_capacity(quota);
    let mut attempts = 0;

    while accepted.len() < quota {
        if attempts >= max_attempts {
            return Err(SamplingError::QuotaUnsatisfied {
                region: region.name.clone(),
                accepted: accepted.len(),
                quota,
                attempts,
            });
        }
        attempts += 1;

        let candidate = rule.draw(&region.bounds, rng);
        if region.geometry.contains(&candidate) {
            accepted.push(candidate);
        }
    }

    tracing::debug!(
        "Sampled {} points in {} after {} attempts ({:?})",
        quota,
        region.name,
        attempts,
        rule
    );
    Ok(accepted)
}
