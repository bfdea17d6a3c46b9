//! Canonical wind-farm identifiers.
//!
//! Farms are referred to in many shapes ("3", "WF3", "wp3", "wind farm 3").
//! All of them normalize to a single `SubjectId` rendered as `wf{n}`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WindfarmError;

/// Label used for portfolio-level (aggregate) records.
pub const PORTFOLIO_LABEL: &str = "portfolio";

/// Prefixes stripped before the farm number is parsed. Longest first.
const SUBJECT_PREFIXES: &[&str] = &["wind farm", "wind_farm", "windfarm", "farm", "wf", "wp"];

/// Canonical wind-farm identifier (`wf1`, `wf2`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(u8);

impl SubjectId {
    /// Create a subject from its farm number. Farm numbers start at 1.
    pub fn new(number: u8) -> Option<Self> {
        (number >= 1).then_some(Self(number))
    }

    /// Normalize any accepted spelling to a canonical subject.
    ///
    /// Returns `None` for text that does not name a farm number.
    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_ascii_lowercase();
        let mut rest = lower.as_str();
        for prefix in SUBJECT_PREFIXES {
            if let Some(stripped) = rest.strip_prefix(prefix) {
                rest = stripped;
                break;
            }
        }

        let digits = rest.trim_start_matches(|c: char| matches!(c, ' ' | '_' | '-' | '#'));
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        digits.parse::<u8>().ok().and_then(Self::new)
    }

    /// Farm number.
    pub fn number(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wf{}", self.0)
    }
}

impl FromStr for SubjectId {
    type Err = WindfarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| WindfarmError::InvalidInput(format!("not a wind farm id: {s:?}")))
    }
}

impl TryFrom<String> for SubjectId {
    type Error = WindfarmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SubjectId> for String {
    fn from(value: SubjectId) -> Self {
        value.to_string()
    }
}

/// Display label for an optional subject; `None` is the portfolio.
pub fn subject_label(subject: Option<&SubjectId>) -> String {
    subject
        .map(ToString::to_string)
        .unwrap_or_else(|| PORTFOLIO_LABEL.to_string())
}
