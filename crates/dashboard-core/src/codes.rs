//! Wire codes for tournament status and bot difficulty.
//!
//! The tournament service sends these either as the backing integer of its
//! enum or as the enum's name. Both shapes are collapsed into the canonical
//! Rust enum during deserialization, so nothing past the boundary ever has to
//! look at the raw representation again. Unknown values fall back to the
//! enum's default instead of failing the whole payload.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::lenient::integral;

/// A status or difficulty exactly as it appeared on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum WireCode {
    Code(i64),
    Name(String),
}

impl WireCode {
    /// Integers (and integral floats like `3.0`) are codes, strings are
    /// names. Any other shape is `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| integral(value)?.as_i64())
                .map(WireCode::Code),
            Value::String(s) => Some(WireCode::Name(s.clone())),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for WireCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        WireCode::from_value(&value)
            .ok_or_else(|| D::Error::custom(format!("expected a code or a name, got {value}")))
    }
}

/// Reads a wire code without ever failing: `null` and unusable shapes are
/// `None`.
pub(crate) fn lenient_code<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<WireCode>, D::Error> {
    Ok(WireCode::from_value(&Value::deserialize(deserializer)?))
}

impl From<i64> for WireCode {
    fn from(code: i64) -> Self {
        WireCode::Code(code)
    }
}

impl From<&str> for WireCode {
    fn from(name: &str) -> Self {
        WireCode::Name(name.to_string())
    }
}

/// Overall state of the tournament as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TournamentStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

impl TournamentStatus {
    pub const ALL: [TournamentStatus; 4] = [
        TournamentStatus::Idle,
        TournamentStatus::Running,
        TournamentStatus::Paused,
        TournamentStatus::Completed,
    ];

    /// Codes 0..=3; anything else is `Idle`.
    pub fn from_code(code: i64) -> Self {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i))
            .copied()
            .unwrap_or_default()
    }

    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(name))
            .copied()
            .unwrap_or_default()
    }

    pub fn from_wire(code: &WireCode) -> Self {
        match code {
            WireCode::Code(c) => Self::from_code(*c),
            WireCode::Name(n) => Self::from_name(n),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TournamentStatus::Idle => "idle",
            TournamentStatus::Running => "running",
            TournamentStatus::Paused => "paused",
            TournamentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TournamentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = lenient_code(deserializer)?;
        Ok(code.map(|c| Self::from_wire(&c)).unwrap_or_default())
    }
}

/// Bot strength tier, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Easy,
    Normal,
    Medium,
    Hard,
    Harder,
    VeryHard,
    Expert,
    Master,
    Grandmaster,
    Legend,
}

impl Difficulty {
    pub const ALL: [Difficulty; 11] = [
        Difficulty::Beginner,
        Difficulty::Easy,
        Difficulty::Normal,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Harder,
        Difficulty::VeryHard,
        Difficulty::Expert,
        Difficulty::Master,
        Difficulty::Grandmaster,
        Difficulty::Legend,
    ];

    /// Codes are 1-based on the wire (1 = beginner … 11 = legend).
    pub fn from_code(code: i64) -> Self {
        code.checked_sub(1)
            .and_then(|c| usize::try_from(c).ok())
            .and_then(|i| Self::ALL.get(i))
            .copied()
            .unwrap_or_default()
    }

    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(name))
            .copied()
            .unwrap_or_default()
    }

    pub fn from_wire(code: &WireCode) -> Self {
        match code {
            WireCode::Code(c) => Self::from_code(*c),
            WireCode::Name(n) => Self::from_name(n),
        }
    }

    pub fn code(self) -> i64 {
        self as i64 + 1
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Harder => "harder",
            Difficulty::VeryHard => "veryHard",
            Difficulty::Expert => "expert",
            Difficulty::Master => "master",
            Difficulty::Grandmaster => "grandmaster",
            Difficulty::Legend => "legend",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = lenient_code(deserializer)?;
        Ok(code.map(|c| Self::from_wire(&c)).unwrap_or_default())
    }
}
