use std::fmt;
use std::str::FromStr;

use super::error::SimError;

/// Index of an agent in the flat agent registry
pub type AgentId = usize;

/// Identifier in the padded action range `[0, 3N+2)`
pub type ActionId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Random,
    Heuristic,
    Learned,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Random => "random",
            PolicyKind::Heuristic => "heuristic",
            PolicyKind::Learned => "learned",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(PolicyKind::Random),
            "heuristic" => Ok(PolicyKind::Heuristic),
            "learned" | "rl" => Ok(PolicyKind::Learned),
            other => Err(SimError::UnknownPolicy {
                name: other.to_string(),
            }),
        }
    }
}

/// Starting health layout for all seats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthProfile {
    Full,
    Low,
    Random,
    /// First half of the seats start low, the rest full
    HalfLow,
}

impl HealthProfile {
    pub fn from_selector(selector: u32) -> Result<Self, SimError> {
        match selector {
            1 => Ok(HealthProfile::Full),
            2 => Ok(HealthProfile::Low),
            3 => Ok(HealthProfile::Random),
            4 => Ok(HealthProfile::HalfLow),
            _ => Err(SimError::InvalidHealthProfile { selector }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimosityProfile {
    High,
    Low,
    Random,
}

impl AnimosityProfile {
    pub fn from_selector(selector: u32) -> Result<Self, SimError> {
        match selector {
            1 => Ok(AnimosityProfile::High),
            2 => Ok(AnimosityProfile::Low),
            3 => Ok(AnimosityProfile::Random),
            _ => Err(SimError::InvalidAnimosityProfile { selector }),
        }
    }
}

/// Which realization of the shared value function to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorKind {
    Tabular,
    Network,
}

impl FromStr for EstimatorKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tabular" | "table" => Ok(EstimatorKind::Tabular),
            "network" | "dqn" => Ok(EstimatorKind::Network),
            other => Err(SimError::UnknownEstimator {
                name: other.to_string(),
            }),
        }
    }
}
