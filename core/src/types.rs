//! Shared primitive types used across the engine.

use crate::error::{DisputeError, DisputeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable, unique identifier for an account snapshot.
pub type AccountId = String;

/// The consumer whose report is being disputed.
pub type UserId = String;

/// One of the three independent reporting agencies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Bureau {
    Equifax,
    Experian,
    TransUnion,
}

impl Bureau {
    pub const ALL: [Bureau; 3] = [Bureau::Equifax, Bureau::Experian, Bureau::TransUnion];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bureau::Equifax    => "equifax",
            Bureau::Experian   => "experian",
            Bureau::TransUnion => "trans_union",
        }
    }

    /// Lenient parse: case, spaces and punctuation are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "equifax" | "efx" | "eq"        => Some(Bureau::Equifax),
            "experian" | "exp" | "ex"       => Some(Bureau::Experian),
            "transunion" | "tu" | "tuc"     => Some(Bureau::TransUnion),
            _ => None,
        }
    }
}

impl fmt::Display for Bureau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An escalation phase. Serialized as the bare number 1, 2 or 3.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(into = "u8", try_from = "u8")]
pub enum Round {
    One,
    Two,
    Three,
}

impl Round {
    pub fn number(&self) -> u8 {
        match self {
            Round::One   => 1,
            Round::Two   => 2,
            Round::Three => 3,
        }
    }

    /// Checked conversion from an untyped round number.
    pub fn from_number(n: i64) -> DisputeResult<Round> {
        u8::try_from(n)
            .ok()
            .and_then(|n| Round::try_from(n).ok())
            .ok_or(DisputeError::InvalidRound(n))
    }

    /// The round whose outcomes feed this one, if any.
    pub fn previous(&self) -> Option<Round> {
        match self {
            Round::One   => None,
            Round::Two   => Some(Round::One),
            Round::Three => Some(Round::Two),
        }
    }
}

impl From<Round> for u8 {
    fn from(round: Round) -> u8 {
        round.number()
    }
}

impl TryFrom<u8> for Round {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Round::One),
            2 => Ok(Round::Two),
            3 => Ok(Round::Three),
            other => Err(format!("round must be 1, 2 or 3, got {other}")),
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bureau_parse_is_lenient() {
        assert_eq!(Bureau::parse("TransUnion"), Some(Bureau::TransUnion));
        assert_eq!(Bureau::parse("Trans Union"), Some(Bureau::TransUnion));
        assert_eq!(Bureau::parse(" EXPERIAN "), Some(Bureau::Experian));
        assert_eq!(Bureau::parse("efx"), Some(Bureau::Equifax));
        assert_eq!(Bureau::parse("innovis"), None);
    }

    #[test]
    fn round_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Round::Two).unwrap(), "2");
        let r: Round = serde_json::from_str("3").unwrap();
        assert_eq!(r, Round::Three);
        assert!(serde_json::from_str::<Round>("4").is_err());
    }

    #[test]
    fn round_numbers_are_checked() {
        assert_eq!(Round::from_number(1).unwrap(), Round::One);
        assert!(matches!(Round::from_number(0), Err(DisputeError::InvalidRound(0))));
        assert!(matches!(Round::from_number(-3), Err(DisputeError::InvalidRound(-3))));
    }
}
