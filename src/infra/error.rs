use std::error::Error;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum SimError {
    TooFewAgents { count: usize },
    InvalidHealthProfile { selector: u32 },
    InvalidAnimosityProfile { selector: u32 },
    UnknownPolicy { name: String },
    UnknownEstimator { name: String },
    /// The network estimator was requested but the crate was built without `rl`
    EstimatorUnavailable,
    StateSpaceTooLarge { states: u128, limit: u128 },
    InvalidParameter { name: &'static str, value: String },
    /// The network checkpoint could not be written
    ModelPersistence(String),
    Io(io::Error),
}

impl fmt::Display for SimError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimError::TooFewAgents { count } => {
                write!(formatter, "at least 2 agents are required (got {count})")
            }
            SimError::InvalidHealthProfile { selector } => {
                write!(formatter, "invalid starting health profile {selector} (expected 1-4)")
            }
            SimError::InvalidAnimosityProfile { selector } => {
                write!(formatter, "invalid animosity profile {selector} (expected 1-3)")
            }
            SimError::UnknownPolicy { name } => {
                write!(formatter, "unknown policy kind '{name}'")
            }
            SimError::UnknownEstimator { name } => {
                write!(formatter, "unknown value estimator '{name}'")
            }
            SimError::EstimatorUnavailable => write!(
                formatter,
                "network estimator requires building with --features rl"
            ),
            SimError::StateSpaceTooLarge { states, limit } => write!(
                formatter,
                "tabular state space has {states} states (limit {limit})"
            ),
            SimError::InvalidParameter { name, value } => {
                write!(formatter, "invalid value '{value}' for {name}")
            }
            SimError::ModelPersistence(reason) => {
                write!(formatter, "failed to save model: {reason}")
            }
            SimError::Io(err) => write!(formatter, "i/o error: {err}"),
        }
    }
}

impl Error for SimError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SimError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for SimError {
    fn from(err: io::Error) -> Self {
        SimError::Io(err)
    }
}

pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mentions_offending_value() {
        let err = SimError::TooFewAgents { count: 1 };
        assert!(err.to_string().contains("got 1"));

        let err = SimError::InvalidParameter {
            name: "SIM_ALPHA",
            value: "abc".to_string(),
        };
        assert!(err.to_string().contains("SIM_ALPHA"));
    }

    #[test]
    fn test_io_error_has_source() {
        let err = SimError::from(io::Error::other("disk full"));
        assert!(err.source().is_some());
    }
}
