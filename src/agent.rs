//! Agents and their daily behavior.

use crate::config::Config;
use crate::grid::Grid;
use crate::model::{HealthState, Pos};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_distr::Bernoulli;

/// Per-day transition distributions and movement rules shared by all agents.
///
/// Built once per simulation from the [`Config`].
#[derive(Debug, Clone)]
pub struct Dynamics {
    infection_length: u32,
    symptom_dist: Bernoulli,
    death_dist: Bernoulli,
    /// One distribution per contagion ring, halving with each ring.
    contagion_dist_vec: Vec<Bernoulli>,
    steps_healthy: usize,
    steps_symptomatic: usize,
    social_distancing: bool,
}

impl Dynamics {
    pub fn new(cfg: &Config) -> Result<Self> {
        let disease = &cfg.disease;

        let symptom_dist =
            Bernoulli::new(disease.prob_symptom).context("invalid symptom probability")?;

        // The mortality rate covers the whole infection, so spread it over its days.
        let prob_death = disease.mortality_rate / disease.infection_length as f64;
        let death_dist = Bernoulli::new(prob_death).context("invalid death probability")?;

        let mut contagion_dist_vec = Vec::with_capacity(disease.contagion_radius + 1);
        let mut prob_contagion = disease.contagion_factor;
        for _ in 0..=disease.contagion_radius {
            contagion_dist_vec
                .push(Bernoulli::new(prob_contagion).context("invalid contagion probability")?);
            prob_contagion /= 2.0;
        }

        Ok(Self {
            infection_length: disease.infection_length,
            symptom_dist,
            death_dist,
            contagion_dist_vec,
            steps_healthy: cfg.movement.steps_healthy,
            steps_symptomatic: cfg.movement.steps_symptomatic,
            social_distancing: cfg.movement.social_distancing,
        })
    }

    pub fn infection_length(&self) -> u32 {
        self.infection_length
    }

    fn steps(&self, state: HealthState) -> usize {
        match state {
            HealthState::Susceptible | HealthState::Infected | HealthState::Recovered => {
                self.steps_healthy
            }
            HealthState::Symptomatic => self.steps_symptomatic,
            HealthState::Dead => 0,
        }
    }
}

/// Agent of the simulation.
///
/// `days_left` is only meaningful while the agent is contagious.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Agent {
    state: HealthState,
    pos: Pos,
    days_left: u32,
}

impl Agent {
    /// Create a susceptible agent at `pos`.
    pub fn new(pos: Pos) -> Self {
        Self {
            state: HealthState::Susceptible,
            pos,
            days_left: 0,
        }
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    #[cfg(test)]
    pub fn days_left(&self) -> u32 {
        self.days_left
    }

    /// Make the agent infected for a full infection.
    pub fn infect(&mut self, infection_length: u32) {
        self.state = HealthState::Infected;
        self.days_left = infection_length;
    }

    /// Advance the agent by one day.
    ///
    /// `agt_vec` is only read to know the state of neighbors; the entry of
    /// this agent in it may be stale.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        grid: &mut Grid,
        agt_vec: &[Agent],
        dynamics: &Dynamics,
        rng: &mut R,
    ) {
        if self.state == HealthState::Dead {
            return;
        }

        for _ in 0..dynamics.steps(self.state) {
            self.take_step(grid, dynamics, rng);
        }

        if self.state.is_contagious() {
            self.days_left = self.days_left.saturating_sub(1);
            if self.days_left == 0 {
                self.state = HealthState::Recovered;
            }
        }

        if self.state == HealthState::Infected && dynamics.symptom_dist.sample(rng) {
            self.state = HealthState::Symptomatic;
        }

        if self.state == HealthState::Symptomatic && dynamics.death_dist.sample(rng) {
            self.state = HealthState::Dead;
        }

        if self.state == HealthState::Susceptible {
            self.expose(grid, agt_vec, dynamics, rng);
        }
    }

    fn take_step<R: Rng + ?Sized>(
        &mut self,
        grid: &mut Grid,
        dynamics: &Dynamics,
        rng: &mut R,
    ) {
        let candidates: Vec<_> = grid.empty_neighbors(self.pos).collect();
        let target = if dynamics.social_distancing {
            choose_least_crowded(grid, &candidates, rng)
        } else {
            candidates.choose(rng).copied()
        };

        if let Some(target) = target {
            grid.move_occupant(self.pos, target);
            self.pos = target;
        }
    }

    fn expose<R: Rng + ?Sized>(
        &mut self,
        grid: &Grid,
        agt_vec: &[Agent],
        dynamics: &Dynamics,
        rng: &mut R,
    ) {
        let dist_vec = &dynamics.contagion_dist_vec;
        let n_contagious_vec = self.count_contagious_per_ring(grid, agt_vec, dist_vec.len());
        for (n_contagious, dist) in n_contagious_vec.into_iter().zip(dist_vec) {
            for _ in 0..n_contagious {
                let exposed = dist.sample(rng);
                if exposed && self.state == HealthState::Susceptible {
                    self.infect(dynamics.infection_length);
                }
            }
        }
    }

    /// Contagious agents within each ring radius, `0..n_rings`.
    ///
    /// Rings are full squares, so a contagious agent at distance `d` is
    /// counted in every ring of radius `d` or more.
    fn count_contagious_per_ring(
        &self,
        grid: &Grid,
        agt_vec: &[Agent],
        n_rings: usize,
    ) -> Vec<usize> {
        (0..n_rings)
            .map(|radius| {
                grid.occupants_within(self.pos, radius)
                    .filter(|&i_agt| agt_vec[i_agt].state.is_contagious())
                    .count()
            })
            .collect()
    }
}

/// Pick uniformly among the candidates with the most empty neighbors.
fn choose_least_crowded<R: Rng + ?Sized>(
    grid: &Grid,
    candidates: &[Pos],
    rng: &mut R,
) -> Option<Pos> {
    let counts: Vec<_> = candidates
        .iter()
        .map(|&pos| grid.count_empty_neighbors(pos))
        .collect();
    let max_count = counts.iter().copied().max()?;

    let best: Vec<_> = candidates
        .iter()
        .zip(&counts)
        .filter(|&(_, &count)| count == max_count)
        .map(|(&pos, _)| pos)
        .collect();

    best.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha12Rng;

    fn chebyshev(a: Pos, b: Pos) -> usize {
        a.row.abs_diff(b.row).max(a.col.abs_diff(b.col))
    }

    fn make_dynamics(edit: impl FnOnce(&mut Config)) -> Dynamics {
        let mut cfg = Config::default();
        edit(&mut cfg);
        Dynamics::new(&cfg).unwrap()
    }

    fn place(grid: &mut Grid, agt_vec: &mut Vec<Agent>, agt: Agent) -> usize {
        let i_agt = agt_vec.len();
        grid.place(agt.pos, i_agt);
        agt_vec.push(agt);
        i_agt
    }

    fn update(
        grid: &mut Grid,
        agt_vec: &mut [Agent],
        i_agt: usize,
        dynamics: &Dynamics,
        rng: &mut ChaCha12Rng,
    ) {
        let mut agt = agt_vec[i_agt];
        agt.update(grid, agt_vec, dynamics, rng);
        agt_vec[i_agt] = agt;
    }

    #[test]
    fn contagion_halves_per_ring() {
        let dynamics = make_dynamics(|cfg| {
            cfg.disease.contagion_factor = 0.8;
            cfg.disease.contagion_radius = 3;
        });
        let probs: Vec<_> = dynamics.contagion_dist_vec.iter().map(|d| d.p()).collect();
        assert_eq!(probs.len(), 4);
        for (prob, exp) in probs.iter().zip([0.8, 0.4, 0.2, 0.1]) {
            assert!((prob - exp).abs() < 1e-9, "{prob} != {exp}");
        }
    }

    #[test]
    fn symptomatic_agents_move_less() {
        let dynamics = make_dynamics(|cfg| cfg.disease.mortality_rate = 0.0);
        for seed in 0..32 {
            let mut rng = ChaCha12Rng::seed_from_u64(seed);
            let mut grid = Grid::new(11, 11);
            let mut agt_vec = Vec::new();
            let start = Pos::new(5, 5);

            let mut agt = Agent::new(start);
            agt.state = HealthState::Symptomatic;
            agt.days_left = 6;
            let i_agt = place(&mut grid, &mut agt_vec, agt);

            update(&mut grid, &mut agt_vec, i_agt, &dynamics, &mut rng);
            assert_eq!(chebyshev(start, agt_vec[i_agt].pos), 1);
            assert_eq!(grid.occupant(agt_vec[i_agt].pos), Some(i_agt));
            assert!(grid.is_empty(start));
        }
    }

    #[test]
    fn healthy_agents_move_up_to_five_steps() {
        let dynamics = make_dynamics(|_| {});
        for seed in 0..32 {
            let mut rng = ChaCha12Rng::seed_from_u64(seed);
            let mut grid = Grid::new(21, 21);
            let mut agt_vec = Vec::new();
            let start = Pos::new(10, 10);
            let i_agt = place(&mut grid, &mut agt_vec, Agent::new(start));

            update(&mut grid, &mut agt_vec, i_agt, &dynamics, &mut rng);
            assert!(chebyshev(start, agt_vec[i_agt].pos) <= 5);
            assert_eq!(grid.occupant(agt_vec[i_agt].pos), Some(i_agt));
        }
    }

    #[test]
    fn boxed_in_agents_stay_in_place() {
        let dynamics = make_dynamics(|_| {});
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let mut grid = Grid::new(3, 3);
        let mut agt_vec = Vec::new();
        for pos in grid.positions().collect::<Vec<_>>() {
            place(&mut grid, &mut agt_vec, Agent::new(pos));
        }

        update(&mut grid, &mut agt_vec, 4, &dynamics, &mut rng);
        assert_eq!(agt_vec[4].pos, Pos::new(1, 1));
    }

    #[test]
    fn social_distancing_picks_least_crowded_cell() {
        let dynamics = make_dynamics(|cfg| {
            cfg.movement.steps_healthy = 1;
            cfg.disease.contagion_factor = 0.0;
        });
        for seed in 0..32 {
            let mut rng = ChaCha12Rng::seed_from_u64(seed);
            let mut grid = Grid::new(1, 5);
            let mut agt_vec = Vec::new();
            place(&mut grid, &mut agt_vec, Agent::new(Pos::new(0, 0)));
            let i_agt = place(&mut grid, &mut agt_vec, Agent::new(Pos::new(0, 2)));

            // (0, 1) has no empty neighbors while (0, 3) has one.
            update(&mut grid, &mut agt_vec, i_agt, &dynamics, &mut rng);
            assert_eq!(agt_vec[i_agt].pos, Pos::new(0, 3));
        }
    }

    #[test]
    fn least_crowded_ties_are_broken_randomly() {
        let grid = Grid::new(1, 3);
        let candidates = [Pos::new(0, 0), Pos::new(0, 2)];
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        let picks: Vec<_> = (0..64)
            .filter_map(|_| choose_least_crowded(&grid, &candidates, &mut rng))
            .collect();
        assert!(picks.contains(&candidates[0]));
        assert!(picks.contains(&candidates[1]));
        assert_eq!(choose_least_crowded(&grid, &[], &mut rng), None);
    }

    #[test]
    fn random_walk_ignores_crowding() {
        let dynamics = make_dynamics(|cfg| {
            cfg.movement.steps_healthy = 1;
            cfg.movement.social_distancing = false;
            cfg.disease.contagion_factor = 0.0;
        });
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let mut n_left = 0;
        for _ in 0..64 {
            let mut grid = Grid::new(1, 5);
            let mut agt_vec = Vec::new();
            place(&mut grid, &mut agt_vec, Agent::new(Pos::new(0, 0)));
            let i_agt = place(&mut grid, &mut agt_vec, Agent::new(Pos::new(0, 2)));
            update(&mut grid, &mut agt_vec, i_agt, &dynamics, &mut rng);
            if agt_vec[i_agt].pos == Pos::new(0, 1) {
                n_left += 1;
            }
        }
        assert!(n_left > 0 && n_left < 64);
    }

    #[test]
    fn countdown_ends_in_recovery_before_onset() {
        let dynamics = make_dynamics(|cfg| {
            cfg.disease.prob_symptom = 1.0;
            cfg.disease.mortality_rate = 1.0;
            cfg.disease.infection_length = 1;
        });
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let mut grid = Grid::new(1, 1);
        let mut agt_vec = Vec::new();
        let mut agt = Agent::new(Pos::new(0, 0));
        agt.infect(dynamics.infection_length());
        let i_agt = place(&mut grid, &mut agt_vec, agt);

        update(&mut grid, &mut agt_vec, i_agt, &dynamics, &mut rng);
        assert_eq!(agt_vec[i_agt].state, HealthState::Recovered);
    }

    #[test]
    fn certain_onset_keeps_countdown() {
        let dynamics = make_dynamics(|cfg| {
            cfg.disease.prob_symptom = 1.0;
            cfg.disease.mortality_rate = 0.0;
        });
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let mut grid = Grid::new(1, 1);
        let mut agt_vec = Vec::new();
        let mut agt = Agent::new(Pos::new(0, 0));
        agt.infect(6);
        let i_agt = place(&mut grid, &mut agt_vec, agt);

        update(&mut grid, &mut agt_vec, i_agt, &dynamics, &mut rng);
        assert_eq!(agt_vec[i_agt].state, HealthState::Symptomatic);
        assert_eq!(agt_vec[i_agt].days_left, 5);
    }

    #[test]
    fn certain_death_is_final() {
        let dynamics = make_dynamics(|cfg| {
            cfg.disease.mortality_rate = 1.0;
            cfg.disease.infection_length = 1;
        });
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let mut grid = Grid::new(3, 3);
        let mut agt_vec = Vec::new();
        let mut agt = Agent::new(Pos::new(1, 1));
        agt.state = HealthState::Symptomatic;
        agt.days_left = 3;
        let i_agt = place(&mut grid, &mut agt_vec, agt);

        update(&mut grid, &mut agt_vec, i_agt, &dynamics, &mut rng);
        let dead = agt_vec[i_agt];
        assert_eq!(dead.state, HealthState::Dead);

        for _ in 0..8 {
            update(&mut grid, &mut agt_vec, i_agt, &dynamics, &mut rng);
            assert_eq!(agt_vec[i_agt], dead);
        }
    }

    #[test]
    fn adjacent_contagious_neighbor_infects_for_a_full_infection() {
        let dynamics = make_dynamics(|cfg| {
            cfg.disease.contagion_factor = 1.0;
            cfg.movement.steps_healthy = 0;
        });
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let mut grid = Grid::new(1, 2);
        let mut agt_vec = Vec::new();
        let i_agt = place(&mut grid, &mut agt_vec, Agent::new(Pos::new(0, 0)));
        let mut sick = Agent::new(Pos::new(0, 1));
        sick.infect(100);
        place(&mut grid, &mut agt_vec, sick);

        // Distance 1 is drawn in rings 1 to 3, so a day may pass without infection.
        for _ in 0..32 {
            update(&mut grid, &mut agt_vec, i_agt, &dynamics, &mut rng);
            if agt_vec[i_agt].state != HealthState::Susceptible {
                break;
            }
        }
        assert_eq!(agt_vec[i_agt].state, HealthState::Infected);
        assert_eq!(agt_vec[i_agt].days_left, dynamics.infection_length());
    }

    #[test]
    fn distant_contagious_agents_count_in_every_outer_ring() {
        let mut grid = Grid::new(1, 4);
        let mut agt_vec = Vec::new();
        let i_agt = place(&mut grid, &mut agt_vec, Agent::new(Pos::new(0, 0)));
        let mut sick = Agent::new(Pos::new(0, 2));
        sick.infect(100);
        place(&mut grid, &mut agt_vec, sick);
        let mut recovered = Agent::new(Pos::new(0, 1));
        recovered.state = HealthState::Recovered;
        place(&mut grid, &mut agt_vec, recovered);

        let counts = agt_vec[i_agt].count_contagious_per_ring(&grid, &agt_vec, 4);
        assert_eq!(counts, vec![0, 0, 1, 1]);
    }

    #[test]
    fn contagion_accumulates_over_rings() {
        let dynamics = make_dynamics(|cfg| {
            cfg.disease.contagion_factor = 1.0;
            cfg.disease.contagion_radius = 3;
            cfg.movement.steps_healthy = 0;
        });
        let mut rng = ChaCha12Rng::seed_from_u64(17);

        // At distance 2 the agent is drawn in ring 2 (p = 1/4) and ring 3 (p = 1/8).
        let n_trials = 20_000;
        let mut n_infected = 0;
        for _ in 0..n_trials {
            let mut grid = Grid::new(1, 4);
            let mut agt_vec = Vec::new();
            let i_agt = place(&mut grid, &mut agt_vec, Agent::new(Pos::new(0, 0)));
            let mut sick = Agent::new(Pos::new(0, 2));
            sick.infect(100);
            place(&mut grid, &mut agt_vec, sick);

            update(&mut grid, &mut agt_vec, i_agt, &dynamics, &mut rng);
            if agt_vec[i_agt].state == HealthState::Infected {
                n_infected += 1;
            }
        }

        let rate = n_infected as f64 / n_trials as f64;
        let exp = 1.0 - (1.0 - 0.25) * (1.0 - 0.125);
        assert!((rate - exp).abs() < 0.02, "{rate} != {exp}");
    }

    #[test]
    fn zero_contagion_never_infects() {
        let dynamics = make_dynamics(|cfg| cfg.disease.contagion_factor = 0.0);
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let mut grid = Grid::new(3, 3);
        let mut agt_vec = Vec::new();
        let i_agt = place(&mut grid, &mut agt_vec, Agent::new(Pos::new(1, 1)));
        for pos in [Pos::new(0, 0), Pos::new(0, 1), Pos::new(2, 2)] {
            let mut sick = Agent::new(pos);
            sick.infect(100);
            place(&mut grid, &mut agt_vec, sick);
        }

        for _ in 0..16 {
            update(&mut grid, &mut agt_vec, i_agt, &dynamics, &mut rng);
            assert_eq!(agt_vec[i_agt].state, HealthState::Susceptible);
        }
    }

    #[test]
    fn recovered_agents_are_never_reinfected() {
        let dynamics = make_dynamics(|cfg| cfg.disease.contagion_factor = 1.0);
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let mut grid = Grid::new(1, 2);
        let mut agt_vec = Vec::new();
        let mut agt = Agent::new(Pos::new(0, 0));
        agt.state = HealthState::Recovered;
        let i_agt = place(&mut grid, &mut agt_vec, agt);
        let mut sick = Agent::new(Pos::new(0, 1));
        sick.infect(100);
        place(&mut grid, &mut agt_vec, sick);

        for _ in 0..16 {
            update(&mut grid, &mut agt_vec, i_agt, &dynamics, &mut rng);
            assert_eq!(agt_vec[i_agt].state, HealthState::Recovered);
        }
    }
}
