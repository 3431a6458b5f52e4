use crate::config::Config;
use crate::model::{Agent, HealthState};
use anyhow::Result;
use rand::prelude::*;
use rand_distr::{Bernoulli, Normal};

/// Contact outcome and the per-agent draws made at infection time.
pub struct TransmissionModel {
    infection_dist: Bernoulli,
    asymptomatic_dist: Bernoulli,
    recovery_dist: Normal<f64>,
    min_recovery_duration: u32,
}

impl TransmissionModel {
    pub fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            infection_dist: Bernoulli::new(cfg.infection_rate)?,
            asymptomatic_dist: Bernoulli::new(cfg.asymptomatic_prob)?,
            recovery_dist: Normal::new(cfg.recovery_mean, cfg.recovery_sd)?,
            // Every infection spends at least one step infectious.
            min_recovery_duration: cfg.days_until_infectious.saturating_add(1),
        })
    }

    /// Decide whether a contact from an infectious `source` infects a susceptible `target`.
    ///
    /// Callers must filter states beforehand; other combinations are a logic error.
    pub fn attempt_transmission<R: Rng>(&self, source: &Agent, target: &Agent, rng: &mut R) -> bool {
        debug_assert!(source.state.is_infectious());
        debug_assert_eq!(target.state, HealthState::Susceptible);
        self.infection_dist.sample(rng)
    }

    /// Move `target` into incubation, drawing its fixed infection attributes.
    pub fn expose<R: Rng>(&self, target: &mut Agent, source_id: usize, day: usize, rng: &mut R) {
        target.state = HealthState::Exposed;
        target.days_in_state = 0;
        target.infected_by = Some(source_id);
        target.infection_day = Some(day);
        self.draw_attributes(target, rng);
    }

    /// Place `target` directly in an infectious state, already past incubation.
    pub fn seed<R: Rng>(&self, target: &mut Agent, days_until_infectious: u32, rng: &mut R) {
        self.draw_attributes(target, rng);
        target.state = if target.is_asymptomatic {
            HealthState::InfectiousAsymptomatic
        } else {
            HealthState::InfectiousSymptomatic
        };
        target.days_in_state = days_until_infectious;
        target.infected_by = None;
        target.infection_day = None;
    }

    fn draw_attributes<R: Rng>(&self, target: &mut Agent, rng: &mut R) {
        target.is_asymptomatic = self.asymptomatic_dist.sample(rng);
        let duration = self.recovery_dist.sample(rng).round();
        target.recovery_duration = duration.max(self.min_recovery_duration as f64) as u32;
    }
}
