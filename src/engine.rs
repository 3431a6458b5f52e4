use crate::config::Config;
use crate::error::SimError;
use crate::health::HealthStateMachine;
use crate::model::{Agent, Counts, HealthState};
use crate::report::Report;
use crate::spatial::SpatialIndex;
use crate::transmission::TransmissionModel;
use rand::{prelude::*, seq::index};
use rand_chacha::ChaCha12Rng;
use std::fmt::Write;

/// Simulation engine.
///
/// Owns the configuration, population, spatial index and random number
/// generator, and advances the outbreak one step at a time until it
/// terminates.
pub struct Engine {
    cfg: Config,
    agt_vec: Vec<Agent>,
    index: SpatialIndex,
    transmission: TransmissionModel,
    health: HealthStateMachine,
    rng: ChaCha12Rng,

    i_step: usize,
    report: Report,
    terminated: bool,

    i_agt_pending: Vec<bool>,
    exposures: Vec<(usize, usize)>,
    ranks: Vec<u8>,
}

impl Engine {
    /// Create a new `Engine` with a randomly placed population.
    ///
    /// # Errors
    /// Returns [`SimError::Configuration`] if the configuration is invalid.
    pub fn new(cfg: Config) -> Result<Self, SimError> {
        cfg.validate()?;

        let mut rng = match cfg.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()
                .map_err(|err| SimError::Configuration(format!("failed to seed rng: {err}")))?,
        };

        let index = SpatialIndex::generate(
            cfg.env_dim,
            cfg.pop_size,
            cfg.interaction_radius,
            &mut rng,
        )?;
        let transmission = TransmissionModel::new(&cfg)?;
        let health = HealthStateMachine::new(&cfg)?;

        let mut agt_vec: Vec<_> = (0..cfg.pop_size)
            .map(|i_agt| Agent::new(i_agt, index.pos(i_agt)))
            .collect();

        // Seeded agents are a random subset of the population.
        for i_agt in index::sample(&mut rng, cfg.pop_size, cfg.initially_infected) {
            transmission.seed(&mut agt_vec[i_agt], cfg.days_until_infectious, &mut rng);
        }

        let n_agt = cfg.pop_size;
        Ok(Self {
            cfg,
            agt_vec,
            index,
            transmission,
            health,
            rng,
            i_step: 0,
            report: Report::new(),
            terminated: false,
            i_agt_pending: vec![false; n_agt],
            exposures: Vec::new(),
            ranks: Vec::with_capacity(n_agt),
        })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agt_vec
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn into_report(self) -> Report {
        self.report
    }

    /// Number of steps performed so far.
    pub fn time_step_index(&self) -> usize {
        self.i_step
    }

    pub fn counts(&self) -> Counts {
        Counts::tally(&self.agt_vec)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Run the simulation until it terminates.
    ///
    /// With `time_steps > 0` exactly that many steps are performed; otherwise
    /// the run continues until no agent is exposed or infectious. Calling this
    /// again on a terminated run does nothing.
    ///
    /// # Errors
    /// Returns [`SimError::InvariantViolation`] if an internal consistency
    /// check fails. The run is aborted and cannot be resumed.
    pub fn run_sim(&mut self) -> Result<&Report, SimError> {
        if self.terminated {
            log::debug!("run already terminated after {} steps", self.i_step);
            return Ok(&self.report);
        }

        while !self.reached_end() {
            if let Err(error) = self.perform_step() {
                self.terminated = true;
                return Err(error);
            }
        }
        self.terminated = true;

        log::debug!("run terminated after {} steps", self.i_step);
        Ok(&self.report)
    }

    /// Perform a single step of the simulation.
    ///
    /// Transmission decisions and state advancement both observe the
    /// population as it was at the start of the step; new exposures are only
    /// applied once every agent has been advanced.
    pub fn perform_step(&mut self) -> Result<(), SimError> {
        self.ranks.clear();
        self.ranks.extend(self.agt_vec.iter().map(|agt| agt.state.rank()));

        // Decide transmissions.
        let n_contacts = self.select_transmissions();

        // Advance every agent once.
        for agt in self.agt_vec.iter_mut() {
            self.health.advance(agt, &mut self.rng);
        }

        // Apply the exposures decided above.
        for &(i_tgt, i_src) in &self.exposures {
            self.transmission
                .expose(&mut self.agt_vec[i_tgt], i_src, self.i_step, &mut self.rng);
            self.agt_vec[i_src].secondary_infections += 1;
            self.i_agt_pending[i_tgt] = false;
        }

        let counts = self.report.record(&self.agt_vec, n_contacts);
        self.check_invariants(&counts)?;

        log::trace!(
            "step {}: S {} E {} I {} R {} D {} contacts {}",
            self.i_step,
            counts.susceptible,
            counts.exposed,
            counts.infectious,
            counts.recovered,
            counts.dead,
            n_contacts
        );

        self.i_step += 1;
        Ok(())
    }

    fn select_transmissions(&mut self) -> usize {
        self.exposures.clear();
        let mut n_contacts = 0;

        for i_src in 0..self.agt_vec.len() {
            let state = self.agt_vec[i_src].state;
            if !state.is_infectious() {
                continue;
            }

            let n = self
                .cfg
                .contacts_per_step(state == HealthState::InfectiousSymptomatic);
            let contacts = self.index.sample_contacts(i_src, n, &mut self.rng);
            n_contacts += contacts.len();

            for i_tgt in contacts {
                // First successful transmission wins; later sources skip the target.
                let pending = self.i_agt_pending[i_tgt];
                if pending || self.agt_vec[i_tgt].state != HealthState::Susceptible {
                    continue;
                }
                let source = &self.agt_vec[i_src];
                let target = &self.agt_vec[i_tgt];
                if self
                    .transmission
                    .attempt_transmission(source, target, &mut self.rng)
                {
                    self.i_agt_pending[i_tgt] = true;
                    self.exposures.push((i_tgt, i_src));
                }
            }
        }

        n_contacts
    }

    fn reached_end(&self) -> bool {
        if self.cfg.time_steps > 0 {
            return self.i_step >= self.cfg.time_steps;
        }
        // The seeded infection guarantees a non-empty start, so this never
        // fires before the outbreak has had a chance to spread.
        self.i_step > 0 && self.counts().active() == 0
    }

    fn check_invariants(&self, counts: &Counts) -> Result<(), SimError> {
        if counts.total() != self.cfg.pop_size {
            return Err(self.violation(format!(
                "population count {} differs from pop_size {}",
                counts.total(),
                self.cfg.pop_size
            )));
        }

        if let Some(agt) = self
            .agt_vec
            .iter()
            .zip(&self.ranks)
            .find_map(|(agt, &rank)| (agt.state.rank() < rank).then_some(agt))
        {
            return Err(self.violation(format!(
                "agent {} moved backwards to {:?}",
                agt.id(),
                agt.state
            )));
        }

        Ok(())
    }

    fn violation(&self, reason: String) -> SimError {
        let mut dump = String::new();
        let _ = writeln!(dump, "{reason}");
        let _ = writeln!(dump, "{:?}", self.counts());
        for agt in &self.agt_vec {
            let _ = writeln!(dump, "{agt:?}");
        }
        SimError::InvariantViolation {
            step: self.i_step,
            dump,
        }
    }
}
