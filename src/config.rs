use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_value::Value;
use std::{collections::BTreeMap, fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file or from a generic key/value mapping and validated
/// before use. Unrecognized keys are ignored; missing required keys are an error.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of steps to run (`0` runs until the outbreak dies out).
    pub time_steps: usize,
    /// Side length of the square spatial area.
    pub env_dim: usize,
    /// Number of agents.
    pub pop_size: usize,
    /// Number of agents seeded as infectious at step 0.
    pub initially_infected: usize,

    /// Contacts sampled per infectious agent per step.
    pub interaction_rate: usize,
    /// Per-contact transmission probability.
    pub infection_rate: f64,
    /// Probability an infectious period ends in death.
    pub mortality_rate: f64,

    /// Mean of the recovery-duration distribution (in steps).
    pub recovery_mean: f64,
    /// Standard deviation of the recovery-duration distribution.
    pub recovery_sd: f64,

    /// Probability a newly exposed agent is asymptomatic.
    pub asymptomatic_prob: f64,
    /// Incubation length before an exposed agent becomes infectious.
    pub days_until_infectious: u32,

    /// Seed of the random number generator (OS entropy if absent).
    #[serde(default)]
    pub seed: Option<u64>,
    /// Maximum contact distance (whole population if absent).
    #[serde(default)]
    pub interaction_radius: Option<f64>,
    /// Contacts per step of symptomatic agents (`interaction_rate` if absent).
    #[serde(default)]
    pub symptomatic_interaction_rate: Option<usize>,
}

impl Config {
    /// Load a [`Config`] from a TOML file.
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

    /// Build a [`Config`] from a generic configuration mapping.
    pub fn from_map(map: BTreeMap<String, Value>) -> Result<Self> {
        let value = Value::Map(
            map.into_iter()
                .map(|(key, val)| (Value::String(key), val))
                .collect(),
        );

        let config: Config = value
            .deserialize_into()
            .context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Contacts per step for an infectious agent with the given symptoms.
    pub fn contacts_per_step(&self, symptomatic: bool) -> usize {
        match (symptomatic, self.symptomatic_interaction_rate) {
            (true, Some(rate)) => rate,
            _ => self.interaction_rate,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_num(self.env_dim, 1..).context("invalid environment dimension")?;
        check_num(self.pop_size, 1..).context("invalid population size")?;
        check_num(self.initially_infected, 0..=self.pop_size)
            .context("invalid number of initially infected agents")?;

        check_num(self.infection_rate, 0.0..=1.0).context("invalid infection rate")?;
        check_num(self.mortality_rate, 0.0..=1.0).context("invalid mortality rate")?;
        check_num(self.asymptomatic_prob, 0.0..=1.0)
            .context("invalid asymptomatic probability")?;

        check_num(self.recovery_mean, 0.0..f64::INFINITY).context("invalid recovery mean")?;
        check_num(self.recovery_sd, 0.0..f64::INFINITY)
            .context("invalid recovery standard deviation")?;

        if let Some(radius) = self.interaction_radius {
            if !(radius > 0.0 && radius.is_finite()) {
                bail!("interaction radius must be positive and finite, but is {radius}");
            }
        }

        // A run bounded only by extinction needs an outbreak to begin with.
        if self.time_steps == 0 && self.initially_infected == 0 {
            bail!("time_steps = 0 requires at least one initially infected agent");
        }

        Ok(())
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
