//! Severity table
//!
//! Ranks the seven diagnostic categories. Several categories share a rank,
//! so the rank (not the variant) is what thresholds compare.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Diagnostic category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Severity {
    /// Driver internals
    Debug,
    /// Outgoing resource request (verbose only)
    Request,
    /// Incoming resource response (verbose only)
    Response,
    /// General progress
    #[default]
    Info,
    /// Console output and alerts raised by the page itself
    Message,
    /// Recoverable failure
    Warn,
    /// Timeouts and assertion failures
    Error,
}

impl Severity {
    /// Every category, lowest rank first.
    pub const ALL: [Severity; 7] = [
        Severity::Debug,
        Severity::Request,
        Severity::Response,
        Severity::Info,
        Severity::Message,
        Severity::Warn,
        Severity::Error,
    ];

    /// Numeric rank (higher = more severe).
    pub fn rank(self) -> u8 {
        match self {
            Severity::Debug | Severity::Request | Severity::Response => 1,
            Severity::Info | Severity::Message => 2,
            Severity::Warn => 3,
            Severity::Error => 4,
        }
    }

    /// Whether an event of this category passes `threshold`.
    pub fn admitted_by(self, threshold: Severity) -> bool {
        should_emit(self.rank(), threshold.rank())
    }

    /// Upper-case name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Request => "REQUEST",
            Severity::Response => "RESPONSE",
            Severity::Info => "INFO",
            Severity::Message => "MESSAGE",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }

    /// Parse a category name, falling back to `Info` for anything
    /// unrecognized. Used on the emission path, which must never fail.
    pub fn parse_lenient(name: &str) -> Severity {
        name.parse().unwrap_or(Severity::Info)
    }
}

/// True iff `event_rank` is at or above `threshold_rank`.
pub fn should_emit(event_rank: u8, threshold_rank: u8) -> bool {
    event_rank >= threshold_rank
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Severity::Debug),
            "REQUEST" => Ok(Severity::Request),
            "RESPONSE" => Ok(Severity::Response),
            "INFO" => Ok(Severity::Info),
            "MESSAGE" => Ok(Severity::Message),
            "WARN" | "WARNING" => Ok(Severity::Warn),
            "ERROR" => Ok(Severity::Error),
            other => Err(Error::configuration(format!("Unknown log level: {}", other))),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        severity.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_ranks() {
        assert_eq!(Severity::Debug.rank(), Severity::Request.rank());
        assert_eq!(Severity::Request.rank(), Severity::Response.rank());
        assert_eq!(Severity::Info.rank(), Severity::Message.rank());
        assert!(Severity::Warn.rank() > Severity::Info.rank());
        assert!(Severity::Error.rank() > Severity::Warn.rank());
    }

    #[test]
    fn test_ranks_are_monotonic() {
        let ranks: Vec<u8> = Severity::ALL.iter().map(|s| s.rank()).collect();
        assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_threshold_admission() {
        for event in Severity::ALL {
            for threshold in Severity::ALL {
                assert_eq!(
                    event.admitted_by(threshold),
                    event.rank() >= threshold.rank(),
                    "{} against {}",
                    event,
                    threshold
                );
            }
        }
        assert!(Severity::Message.admitted_by(Severity::Info));
        assert!(!Severity::Debug.admitted_by(Severity::Info));
        assert!(Severity::Request.admitted_by(Severity::Debug));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("warn".parse::<Severity>().unwrap(), Severity::Warn);
        assert_eq!("Response".parse::<Severity>().unwrap(), Severity::Response);
        assert!("verbose".parse::<Severity>().is_err());
    }

    #[test]
    fn test_parse_lenient_falls_back_to_info() {
        assert_eq!(Severity::parse_lenient("nonsense"), Severity::Info);
        assert_eq!(Severity::parse_lenient("error"), Severity::Error);
    }

    #[test]
    fn test_serde_uses_names() {
        let json = serde_json::to_string(&Severity::Warn).unwrap();
        assert_eq!(json, "\"WARN\"");
        let parsed: Severity = serde_json::from_str("\"debug\"").unwrap();
        assert_eq!(parsed, Severity::Debug);
    }
}
