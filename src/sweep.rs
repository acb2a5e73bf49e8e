use crate::config::Config;
use crate::engine::Engine;
use crate::error::SimError;
use crate::stats::Outcome;
use anyhow::{Context, Result, bail};
use rand_chacha::ChaCha12Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Outcome of one point of the parameter sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub density: f64,
    pub prob_symptom: f64,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl SweepResult {
    pub fn peak_symptomatic(&self) -> usize {
        self.outcome.peak_symptomatic
    }
}

/// All sweep results with the points of highest and lowest peak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub results: Vec<SweepResult>,
    pub max: SweepResult,
    pub min: SweepResult,
}

impl SweepReport {
    /// Build the report, keeping the first point in case of ties.
    pub fn new(results: Vec<SweepResult>) -> Result<Self> {
        let Some(first) = results.first() else {
            bail!("sweep has no results");
        };

        let mut max = first;
        let mut min = first;
        for result in &results[1..] {
            if result.peak_symptomatic() > max.peak_symptomatic() {
                max = result;
            }
            if result.peak_symptomatic() < min.peak_symptomatic() {
                min = result;
            }
        }
        let (max, min) = (max.clone(), min.clone());

        Ok(Self { results, max, min })
    }
}

/// Parameter sweep over population density and symptom probability.
///
/// Every point runs an independent simulation to extinction. Points run in
/// parallel, each one on its own stream of the base generator, so the
/// results do not depend on scheduling.
pub struct Sweeper {
    cfg: Config,
    rng: ChaCha12Rng,
}

impl Sweeper {
    pub fn new(cfg: Config, rng: ChaCha12Rng) -> Result<Self> {
        cfg.validate().context("failed to validate config")?;
        Ok(Self { cfg, rng })
    }

    /// Sweep points in density-major order.
    pub fn points(&self) -> Vec<(f64, f64)> {
        let sweep = &self.cfg.sweep;
        sweep
            .densities
            .iter()
            .flat_map(|&density| {
                sweep
                    .prob_symptoms
                    .iter()
                    .map(move |&prob_symptom| (density, prob_symptom))
            })
            .collect()
    }

    /// Run every point of the sweep.
    pub fn perform_sweep(&self) -> Result<SweepReport> {
        let points = self.points();
        let n_points = points.len();
        let n_done = AtomicUsize::new(0);
        log::info!("sweeping {n_points} points");

        let results = points
            .par_iter()
            .enumerate()
            .map(|(i_point, &(density, prob_symptom))| {
                let result = self
                    .perform_point(i_point, density, prob_symptom)
                    .with_context(|| {
                        format!("failed to run density {density} and symptom probability {prob_symptom}")
                    })?;

                let n_done = n_done.fetch_add(1, Ordering::Relaxed) + 1;
                let progress = 100.0 * n_done as f64 / n_points as f64;
                log::info!("completed {progress:06.2}%");

                Ok(result)
            })
            .collect::<Result<Vec<_>>>()?;

        SweepReport::new(results)
    }

    fn perform_point(
        &self,
        i_point: usize,
        density: f64,
        prob_symptom: f64,
    ) -> Result<SweepResult> {
        let cfg = self.cfg.with_sweep_point(density, prob_symptom);
        let mut rng = self.rng.clone();
        rng.set_stream(i_point as u64);

        let outcome = match Engine::generate_initial_condition(cfg, rng) {
            Ok(mut engine) => engine.run(),
            Err(err) if err.downcast_ref::<SimError>().is_some() => {
                log::warn!("{err}, recording an empty run");
                Outcome::empty()
            }
            Err(err) => return Err(err).context("failed to generate initial condition"),
        };
        log::info!(
            "density {density:.2} and symptom probability {prob_symptom:.2}: \
             peak of {} symptomatic agents",
            outcome.peak_symptomatic
        );

        Ok(SweepResult {
            density,
            prob_symptom,
            outcome,
        })
    }
}
