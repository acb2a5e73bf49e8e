use crate::model::HealthState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of agents in each state on a given day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub susceptible: usize,
    pub infected: usize,
    pub symptomatic: usize,
    pub recovered: usize,
    pub dead: usize,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count states from an iterator.
    pub fn from_states<I: IntoIterator<Item = HealthState>>(states: I) -> Self {
        let mut tally = Self::new();
        for state in states {
            tally.add(state);
        }
        tally
    }

    pub fn add(&mut self, state: HealthState) {
        *self.count_mut(state) += 1;
    }

    pub fn count(&self, state: HealthState) -> usize {
        match state {
            HealthState::Susceptible => self.susceptible,
            HealthState::Infected => self.infected,
            HealthState::Symptomatic => self.symptomatic,
            HealthState::Recovered => self.recovered,
            HealthState::Dead => self.dead,
        }
    }

    pub fn total(&self) -> usize {
        HealthState::ALL.iter().map(|&state| self.count(state)).sum()
    }

    /// Agents that can still spread the disease.
    pub fn n_contagious(&self) -> usize {
        self.infected + self.symptomatic
    }

    /// Counts keyed by state name, in a fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        HealthState::ALL
            .iter()
            .map(move |&state| (state.name(), self.count(state)))
    }

    fn count_mut(&mut self, state: HealthState) -> &mut usize {
        match state {
            HealthState::Susceptible => &mut self.susceptible,
            HealthState::Infected => &mut self.infected,
            HealthState::Symptomatic => &mut self.symptomatic,
            HealthState::Recovered => &mut self.recovered,
            HealthState::Dead => &mut self.dead,
        }
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for (name, count) in self.iter() {
            write!(f, "{sep}{name}={count}")?;
            sep = " ";
        }
        Ok(())
    }
}

/// Tally of a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    pub day: u32,
    pub tally: Tally,
}

/// Daily history of a run and its running peak of symptomatic agents.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    history: Vec<DayRecord>,
    peak_symptomatic: usize,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, day: u32, tally: Tally) {
        self.peak_symptomatic = self.peak_symptomatic.max(tally.symptomatic);
        self.history.push(DayRecord { day, tally });
    }

    pub fn peak_symptomatic(&self) -> usize {
        self.peak_symptomatic
    }

    pub fn history(&self) -> &[DayRecord] {
        &self.history
    }
}

/// Final figures of a run that reached extinction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Days elapsed until extinction.
    pub days: u32,
    /// Number of agents, living and dead.
    pub population: usize,
    /// Largest number of simultaneously symptomatic agents.
    pub peak_symptomatic: usize,
    /// Percentage of agents that recovered, if there were any agents.
    pub pct_recovered: Option<f64>,
    /// Percentage of agents that died, if there were any agents.
    pub pct_dead: Option<f64>,
}

impl Outcome {
    pub fn new(days: u32, peak_symptomatic: usize, tally: &Tally) -> Self {
        // At extinction nobody is contagious, so this is the whole population.
        let n_agt = tally.recovered + tally.dead + tally.susceptible;
        let pct = |count: usize| {
            if n_agt == 0 {
                None
            } else {
                Some(100.0 * count as f64 / n_agt as f64)
            }
        };
        if n_agt == 0 {
            log::warn!("population is empty, percentages are undefined");
        }

        Self {
            days,
            population: tally.total(),
            peak_symptomatic,
            pct_recovered: pct(tally.recovered),
            pct_dead: pct(tally.dead),
        }
    }

    /// Outcome of a run without agents.
    pub fn empty() -> Self {
        Self::new(0, 0, &Tally::new())
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "extinct after {} days, peak of {} symptomatic agents",
            self.days, self.peak_symptomatic
        )?;
        match (self.pct_recovered, self.pct_dead) {
            (Some(pct_recovered), Some(pct_dead)) => write!(
                f,
                ", {pct_recovered:.2}% recovered and {pct_dead:.2}% died"
            ),
            _ => write!(f, ", no agents"),
        }
    }
}
