//! Simulation data types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Epidemiological state of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Never infected, can be infected.
    Susceptible,
    /// Infected and contagious, without symptoms.
    Infected,
    /// Infected and contagious, with symptoms.
    Symptomatic,
    /// Immune, no longer contagious.
    Recovered,
    /// Killed by the disease.
    Dead,
}

impl HealthState {
    /// All states, in tally order.
    pub const ALL: [HealthState; 5] = [
        HealthState::Susceptible,
        HealthState::Infected,
        HealthState::Symptomatic,
        HealthState::Recovered,
        HealthState::Dead,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HealthState::Susceptible => "susceptible",
            HealthState::Infected => "infected",
            HealthState::Symptomatic => "symptomatic",
            HealthState::Recovered => "recovered",
            HealthState::Dead => "dead",
        }
    }

    /// Single character used in grid snapshots.
    pub fn symbol(self) -> char {
        match self {
            HealthState::Susceptible => 'S',
            HealthState::Infected => 'I',
            HealthState::Symptomatic => 'X',
            HealthState::Recovered => 'R',
            HealthState::Dead => 'D',
        }
    }

    pub fn is_contagious(self) -> bool {
        matches!(self, HealthState::Infected | HealthState::Symptomatic)
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Grid position as (row, column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Read-only view of the grid on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub day: u32,
    pub n_rows: usize,
    pub n_cols: usize,
    /// State of the occupant of each cell, in row-major order.
    pub cells: Vec<Option<HealthState>>,
}

impl Snapshot {
    pub fn state_at(&self, pos: Pos) -> Option<HealthState> {
        self.cells[pos.row * self.n_cols + pos.col]
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "day {}", self.day)?;
        for row in 0..self.n_rows {
            let line: String = (0..self.n_cols)
                .map(|col| self.state_at(Pos::new(row, col)))
                .map(|cell| cell.map_or('.', HealthState::symbol))
                .collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
