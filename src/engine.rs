use crate::agent::{Agent, Dynamics};
use crate::config::Config;
use crate::error::SimError;
use crate::grid::Grid;
use crate::model::{HealthState, Snapshot};
use crate::stats::{Outcome, Recorder, Tally};
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Bernoulli;

/// Whether a run must continue after a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Some agents are still contagious.
    Ongoing,
    /// Nobody is contagious anymore.
    Extinct,
}

/// Simulation engine.
///
/// Owns the grid, the agents and the random number generator, and advances
/// the epidemic one day at a time.
pub struct Engine {
    cfg: Config,
    dynamics: Dynamics,
    grid: Grid,
    agt_vec: Vec<Agent>,
    order: Vec<usize>,
    clock: u32,
    recorder: Recorder,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create a new `Engine` with the given configuration and a random initial state.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid, or a
    /// [`SimError::DegeneratePopulation`] if patient zeros are requested
    /// but no agent was placed.
    pub fn generate_initial_condition(cfg: Config, mut rng: ChaCha12Rng) -> Result<Self> {
        cfg.validate().context("failed to validate config")?;
        let dynamics = Dynamics::new(&cfg).context("failed to construct dynamics")?;

        let mut grid = Grid::new(cfg.grid.n_rows, cfg.grid.n_cols);
        let mut agt_vec = Vec::new();
        let occupied_dist = Bernoulli::new(cfg.population.density)?;
        for pos in grid.positions() {
            if occupied_dist.sample(&mut rng) {
                grid.place(pos, agt_vec.len());
                agt_vec.push(Agent::new(pos));
            }
        }

        let n_agt = agt_vec.len();
        let mut n_infected_init = cfg.population.n_infected_init;
        if n_infected_init > 0 && n_agt == 0 {
            bail!(SimError::DegeneratePopulation { n_infected_init });
        }
        if n_infected_init > n_agt {
            log::warn!("only {n_agt} agents for {n_infected_init} patient zeros, infecting all");
            n_infected_init = n_agt;
        }

        // Randomly pick distinct patient zeros.
        let i_agt_all: Vec<_> = (0..n_agt).collect();
        for &i_agt in i_agt_all.choose_multiple(&mut rng, n_infected_init) {
            agt_vec[i_agt].infect(dynamics.infection_length());
        }

        Ok(Self {
            cfg,
            dynamics,
            grid,
            agt_vec,
            order: i_agt_all,
            clock: 0,
            recorder: Recorder::new(),
            rng,
        })
    }

    /// Advance the simulation by one day.
    pub fn step(&mut self) -> Progress {
        self.clock += 1;

        // Update agents in a different order every day to avoid directional drift.
        self.order.shuffle(&mut self.rng);
        for &i_agt in &self.order {
            let mut agt = self.agt_vec[i_agt];
            agt.update(&mut self.grid, &self.agt_vec, &self.dynamics, &mut self.rng);
            debug_assert_eq!(self.grid.occupant(agt.pos()), Some(i_agt));
            self.agt_vec[i_agt] = agt;
        }

        let tally = self.tally();
        log::debug!("day {:5}: {tally}", self.clock);
        self.recorder.record(self.clock, tally);

        if tally.n_contagious() > 0 {
            Progress::Ongoing
        } else {
            Progress::Extinct
        }
    }

    /// Run until nobody is contagious, calling `on_day` after every day.
    pub fn run_with<F: FnMut(&Self)>(&mut self, mut on_day: F) -> Outcome {
        loop {
            let progress = self.step();
            on_day(self);
            if progress == Progress::Extinct {
                break;
            }
        }
        self.outcome()
    }

    /// Run until nobody is contagious.
    pub fn run(&mut self) -> Outcome {
        self.run_with(|_| {})
    }

    /// Final figures of the run so far.
    pub fn outcome(&self) -> Outcome {
        Outcome::new(self.clock, self.recorder.peak_symptomatic(), &self.tally())
    }

    /// Current number of agents in each state.
    pub fn tally(&self) -> Tally {
        Tally::from_states(self.agt_vec.iter().map(Agent::state))
    }

    /// Current occupancy of the grid.
    pub fn snapshot(&self) -> Snapshot {
        let cells = self
            .grid
            .positions()
            .map(|pos| self.grid.occupant(pos).map(|i_agt| self.agt_vec[i_agt].state()))
            .collect();
        Snapshot {
            day: self.clock,
            n_rows: self.grid.n_rows(),
            n_cols: self.grid.n_cols(),
            cells,
        }
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    pub fn clock(&self) -> u32 {
        self.clock
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn n_agents(&self) -> usize {
        self.agt_vec.len()
    }

    /// Number of agents ever infected, including patient zeros.
    pub fn n_ever_infected(&self) -> usize {
        self.agt_vec
            .iter()
            .filter(|agt| agt.state() != HealthState::Susceptible)
            .count()
    }
}
