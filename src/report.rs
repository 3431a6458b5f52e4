use crate::model::{Agent, Counts};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-step aggregate series of a simulation.
///
/// Every series holds exactly one value per elapsed step.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub susceptible: Vec<usize>,
    pub exposed: Vec<usize>,
    pub infectious: Vec<usize>,
    pub recovered: Vec<usize>,
    pub dead: Vec<usize>,
    /// Effective reproduction number.
    pub r_naught: Vec<f64>,
    /// Contacts sampled during the step.
    pub contacts: Vec<usize>,
}

/// Headline values of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub n_steps: usize,
    pub peak_infectious: usize,
    pub peak_infectious_step: usize,
    pub peak_r_naught: f64,
    pub final_recovered: usize,
    pub final_dead: usize,
    pub never_infected: usize,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the aggregates of the population as it stands after a step.
    pub fn record(&mut self, agt_vec: &[Agent], n_contacts: usize) -> Counts {
        let counts = Counts::tally(agt_vec);
        self.susceptible.push(counts.susceptible);
        self.exposed.push(counts.exposed);
        self.infectious.push(counts.infectious);
        self.recovered.push(counts.recovered);
        self.dead.push(counts.dead);
        self.r_naught.push(compute_r_naught(agt_vec));
        self.contacts.push(n_contacts);
        counts
    }

    pub fn n_steps(&self) -> usize {
        self.r_naught.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r_naught.is_empty()
    }

    /// Metric name to per-step values, for printing or plotting.
    pub fn as_map(&self) -> BTreeMap<String, Vec<f64>> {
        let to_f64 =
            |vals: &[usize]| -> Vec<f64> { vals.iter().map(|&val| val as f64).collect() };
        BTreeMap::from([
            ("susceptible".to_string(), to_f64(&self.susceptible)),
            ("exposed".to_string(), to_f64(&self.exposed)),
            ("infectious".to_string(), to_f64(&self.infectious)),
            ("recovered".to_string(), to_f64(&self.recovered)),
            ("dead".to_string(), to_f64(&self.dead)),
            ("r_naught".to_string(), self.r_naught.clone()),
            ("contacts".to_string(), to_f64(&self.contacts)),
        ])
    }

    /// Largest effective reproduction number seen (`0` for an empty report).
    pub fn peak_r_naught(&self) -> f64 {
        self.r_naught.iter().copied().fold(0.0, f64::max)
    }

    pub fn summary(&self) -> Summary {
        let (peak_infectious_step, peak_infectious) = self
            .infectious
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0), |best, (step, val)| if val > best.1 { (step, val) } else { best });

        Summary {
            n_steps: self.n_steps(),
            peak_infectious,
            peak_infectious_step,
            peak_r_naught: self.peak_r_naught(),
            final_recovered: self.recovered.last().copied().unwrap_or(0),
            final_dead: self.dead.last().copied().unwrap_or(0),
            never_infected: self.susceptible.last().copied().unwrap_or(0),
        }
    }
}

/// Mean number of secondary infections over agents whose infectious period is over.
///
/// Seeded agents have no known source and are left out of the mean; the
/// infections they caused still count for the agents they infected. Returns
/// `0` while no such agent exists.
pub fn compute_r_naught(agt_vec: &[Agent]) -> f64 {
    let (n_resolved, n_secondary) = agt_vec
        .iter()
        .filter(|agt| agt.state.is_terminal() && agt.infected_by.is_some())
        .fold((0usize, 0u64), |(n, sum), agt| {
            (n + 1, sum + agt.secondary_infections as u64)
        });

    if n_resolved == 0 {
        return 0.0;
    }
    n_secondary as f64 / n_resolved as f64
}
