use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// Every section falls back to its default when missing.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub grid: GridConfig,
    pub population: PopulationConfig,
    pub disease: DiseaseConfig,
    pub movement: MovementConfig,
    pub output: OutputConfig,
    pub sweep: SweepConfig,
}

/// Grid dimensions.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Number of rows.
    pub n_rows: usize,
    /// Number of columns.
    pub n_cols: usize,
}

/// Initial population.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PopulationConfig {
    /// Probability that a cell starts occupied.
    pub density: f64,
    /// Number of patient zeros.
    pub n_infected_init: usize,
}

/// Disease parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiseaseConfig {
    /// Daily probability that an infected agent develops symptoms.
    pub prob_symptom: f64,
    /// Fraction of symptomatic agents that die over the whole infection.
    pub mortality_rate: f64,
    /// Duration of the infection in days.
    pub infection_length: u32,
    /// Infection probability per adjacent contagious agent.
    pub contagion_factor: f64,
    /// Largest Chebyshev distance at which contagion is possible.
    pub contagion_radius: usize,
}

/// Movement parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MovementConfig {
    /// Steps per day of agents without symptoms.
    pub steps_healthy: usize,
    /// Steps per day of symptomatic agents.
    pub steps_symptomatic: usize,
    /// Move towards the least crowded empty cell instead of a random one.
    pub social_distancing: bool,
}

/// Output parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Number of days between grid snapshots.
    pub snapshot_interval: u32,
}

/// Parameter sweep values.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    /// Population densities to sweep.
    pub densities: Vec<f64>,
    /// Symptom probabilities to sweep.
    pub prob_symptoms: Vec<f64>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            n_rows: 30,
            n_cols: 40,
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            density: 0.9,
            n_infected_init: 4,
        }
    }
}

impl Default for DiseaseConfig {
    fn default() -> Self {
        Self {
            prob_symptom: 0.4,
            mortality_rate: 0.02,
            infection_length: 6,
            contagion_factor: 0.2,
            contagion_radius: 3,
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            steps_healthy: 5,
            steps_symptomatic: 1,
            social_distancing: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: 1,
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        let vals: Vec<_> = (1..10).map(|i| i as f64 / 10.0).collect();
        Self {
            densities: vals.clone(),
            prob_symptoms: vals,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Check that every parameter is within its admissible range.
    pub fn validate(&self) -> Result<()> {
        check_num(self.grid.n_rows, 1..=10_000).context("invalid number of rows")?;
        check_num(self.grid.n_cols, 1..=10_000).context("invalid number of columns")?;

        check_prob(self.population.density).context("invalid population density")?;
        check_num(self.population.n_infected_init, 0..=self.n_cells())
            .context("invalid initial number of infected agents")?;

        check_prob(self.disease.prob_symptom).context("invalid symptom probability")?;
        check_prob(self.disease.mortality_rate).context("invalid mortality rate")?;
        check_num(self.disease.infection_length, 1..=10_000)
            .context("invalid infection length")?;
        check_prob(self.disease.contagion_factor).context("invalid contagion factor")?;
        check_num(self.disease.contagion_radius, 0..=16).context("invalid contagion radius")?;

        check_num(self.movement.steps_healthy, 0..=100)
            .context("invalid number of healthy steps")?;
        check_num(self.movement.steps_symptomatic, 0..=100)
            .context("invalid number of symptomatic steps")?;

        check_num(self.output.snapshot_interval, 1..=10_000)
            .context("invalid snapshot interval")?;

        check_probs(&self.sweep.densities).context("invalid sweep densities")?;
        check_probs(&self.sweep.prob_symptoms).context("invalid sweep symptom probabilities")?;

        Ok(())
    }

    /// Total number of grid cells.
    pub fn n_cells(&self) -> usize {
        self.grid.n_rows * self.grid.n_cols
    }

    /// Copy of this configuration with the two swept parameters replaced.
    pub fn with_sweep_point(&self, density: f64, prob_symptom: f64) -> Self {
        let mut cfg = self.clone();
        cfg.population.density = density;
        cfg.disease.prob_symptom = prob_symptom;
        cfg
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_prob(prob: f64) -> Result<()> {
    check_num(prob, 0.0..=1.0)
}

fn check_probs(vec: &[f64]) -> Result<()> {
    if vec.is_empty() {
        bail!("vector must not be empty");
    }
    for (i_ele, &ele) in vec.iter().enumerate() {
        check_prob(ele).with_context(|| format!("invalid element {i_ele}"))?;
    }
    Ok(())
}
