use thiserror::Error;

/// Conditions callers may want to tell apart from other failures.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("population is empty, cannot infect {n_infected_init} agents")]
    DegeneratePopulation { n_infected_init: usize },
}
