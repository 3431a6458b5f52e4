use std::fmt::{self, Display};

/// Errors produced by the simulation core.
#[derive(Debug)]
pub enum SimError {
    /// A parameter is missing, out of range, or the combination of parameters
    /// would not define a terminating run. Raised at construction only.
    Configuration(String),

    /// An internal consistency check failed mid-run. Not recoverable; the
    /// dump holds the full population state at the failing step.
    InvariantViolation { step: usize, dump: String },
}

impl SimError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, SimError::Configuration(_))
    }
}

impl From<anyhow::Error> for SimError {
    fn from(error: anyhow::Error) -> Self {
        SimError::Configuration(format!("{error:#}"))
    }
}

impl std::error::Error for SimError {}

impl Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimError::Configuration(msg) => write!(f, "configuration error: {msg}"),
            SimError::InvariantViolation { step, dump } => {
                write!(f, "invariant violated at step {step}:\n{dump}")
            }
        }
    }
}
