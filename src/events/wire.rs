//! # Events written by subnet processes.
//!
//! Each line a subnet prints to stdout is one JSON object with a `type` tag:
//!
//! ```text
//! {"type":"activity:started"}
//! {"type":"activity:info","message":"Module Runtime: measured 12 retrievals"}
//! {"type":"activity:error","message":"...","subnet":"spark"}
//! {"type":"jobs-completed","total":42}
//! ```
//!
//! Unknown `type` values decode to [`SubnetEvent::Unknown`].

use serde::Deserialize;
use serde_json::Value;

/// One decoded subnet event.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum SubnetEvent {
    #[serde(rename = "activity:started")]
    Started,
    #[serde(rename = "activity:info")]
    Info {
        message: String,
        #[serde(default)]
        subnet: Option<String>,
    },
    #[serde(rename = "activity:error")]
    Error {
        message: String,
        #[serde(default)]
        subnet: Option<String>,
    },
    /// Absolute counter of jobs the subnet completed since it started.
    #[serde(rename = "jobs-completed")]
    JobsCompleted { total: u64 },
    #[serde(other)]
    Unknown,
}

/// Why a line could not be turned into a [`SubnetEvent`].
#[derive(Debug)]
pub enum LineError {
    /// Not JSON at all.
    Malformed(serde_json::Error),
    /// JSON, but not a valid event (missing tag, wrong payload shape).
    Invalid(Value, serde_json::Error),
}

/// Parses one output line.
pub fn parse_line(line: &str) -> Result<SubnetEvent, LineError> {
    let value: Value = serde_json::from_str(line).map_err(LineError::Malformed)?;
    SubnetEvent::deserialize(&value).map_err(|e| LineError::Invalid(value, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_types() {
        assert_eq!(
            parse_line(r#"{"type":"activity:started"}"#).unwrap(),
            SubnetEvent::Started
        );
        assert_eq!(
            parse_line(r#"{"type":"jobs-completed","total":5}"#).unwrap(),
            SubnetEvent::JobsCompleted { total: 5 }
        );
        assert_eq!(
            parse_line(r#"{"type":"activity:info","message":"hi","subnet":"spark"}"#).unwrap(),
            SubnetEvent::Info {
                message: "hi".into(),
                subnet: Some("spark".into())
            }
        );
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        assert_eq!(
            parse_line(r#"{"type":"peer-count","value":3}"#).unwrap(),
            SubnetEvent::Unknown
        );
    }

    #[test]
    fn distinguishes_garbage_from_bad_payload() {
        assert!(matches!(parse_line("not json"), Err(LineError::Malformed(_))));
        assert!(matches!(
            parse_line(r#"{"type":"jobs-completed","total":-1}"#),
            Err(LineError::Invalid(..))
        ));
        assert!(matches!(parse_line("42"), Err(LineError::Invalid(..))));
        assert!(matches!(
            parse_line(r#"{"message":"no tag"}"#),
            Err(LineError::Invalid(..))
        ));
    }
}
