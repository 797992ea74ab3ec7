use crate::config::SamplingConfig;
use crate::sampler::{sample, BiasTable, SamplingError};
use crate::temporal::tag;
use crate::types::{Region, SampledPoint};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

pub fn generate_points<R: Rng>(
    config: &SamplingConfig,
    regions: &[Region],
    day: NaiveDate,
    rng: &mut R,
) -> Result<Vec<SampledPoint>, SamplingError> {
    tracing::info!("Sampling {} regions, {} points each...", regions.len(), config.quota);

    let table = BiasTable::new(config.bias.clone());
    let max_attempts = config.quota.saturating_mul(config.max_attempts_per_point);

    // Seeds are drawn in region order so a fixed master seed reproduces the
    // same points however rayon schedules the regions.
    let jobs: Vec<(&Region, u64)> = regions.iter().map(|r| (r, rng.gen())).collect();

    let per_region: Vec<Vec<SampledPoint>> = jobs
        .into_par_iter()
        .map(|(region, seed)| -> Result<Vec<SampledPoint>, SamplingError> {
            let mut rng = StdRng::seed_from_u64(seed);
            let rule = table.rule_for(&region.name);
            let coords = sample(region, config.quota, rule, max_attempts, &mut rng)?;
            Ok(coords
                .into_iter()
                .map(|c| tag(&region.name, c, day, &mut rng))
                .collect())
        })
        .collect::<Result<_, _>>()?;

    let points: Vec<SampledPoint> = per_region.into_iter().flatten().collect();
    tracing::info!("Generated {} points total.", points.len());

    Ok(points)
}

/// Generates from `seed` when given, otherwise from OS entropy.
pub fn generate_seeded(
    config: &SamplingConfig,
    regions: &[Region],
    day: NaiveDate,
) -> Result<Vec<SampledPoint>, SamplingError> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    generate_points(config, regions, day, &mut rng)
}
