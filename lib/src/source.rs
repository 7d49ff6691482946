/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

// Subset of the alert record returned from
// GET /api/v2/alert

use std::{collections::BTreeMap, convert::Infallible, fmt::Display, str::FromStr};

use serde::Deserialize;
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::error::Error;

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SourceAlert {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Trigger window in minutes.
    #[serde(default = "default_minutes")]
    pub minutes: u64,
    #[serde(default)]
    pub additional_information: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(flatten)]
    pub condition: ConditionForm,
}

fn default_minutes() -> u64 {
    5
}

/// The two condition shapes the source platform emits. Older records
/// carry one free-text boolean expression; newer ones declare named
/// sub-queries plus per-severity threshold expressions. The structured
/// shape is tried first since such records may also carry a generated
/// `condition` string.
#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum ConditionForm {
    Structured {
        #[serde(rename = "alertSources")]
        alert_sources: Vec<AlertSource>,
        #[serde(default)]
        conditions: BTreeMap<SeverityLabel, String>,
    },
    FreeText {
        #[serde(default)]
        condition: String,
    },
}

#[derive(Deserialize, Clone, Debug)]
pub struct AlertSource {
    pub name: String,
    pub query: String,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum Status {
    One(String),
    Many(Vec<String>),
}

impl SourceAlert {
    /// Administrative-skip check: a snoozed alert must not produce a
    /// rule at all.
    pub fn is_snoozed(&self) -> bool {
        match &self.status {
            Some(Status::One(s)) => is_snooze_marker(s),
            Some(Status::Many(ss)) => ss.iter().any(|s| is_snooze_marker(s)),
            None => false,
        }
    }
}

fn is_snooze_marker(s: &str) -> bool {
    s.to_ascii_lowercase().contains("snoozed")
}

#[derive(
    SerializeDisplay, DeserializeFromStr, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug,
)]
pub enum Severity {
    Severe,
    Warn,
    Info,
    Smoke,
}

impl FromStr for Severity {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "severe" => Ok(Self::Severe),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "smoke" => Ok(Self::Smoke),
            _ => Err(Error::InvalidSeverity(s.to_string())),
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Severe => write!(f, "severe"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Smoke => write!(f, "smoke"),
        }
    }
}

/// Key of the structured `conditions` map. The source platform emits
/// the four known severities, but custom labels occur in exported data
/// and must not invalidate the record; they are kept verbatim. The
/// derived ordering sorts known severities (severest first) before any
/// custom label.
#[derive(
    SerializeDisplay, DeserializeFromStr, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Debug,
)]
pub enum SeverityLabel {
    Known(Severity),
    Other(String),
}

impl FromStr for SeverityLabel {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<Severity>() {
            Ok(severity) => Self::Known(severity),
            Err(_) => Self::Other(s.to_string()),
        })
    }
}

impl Display for SeverityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known(severity) => severity.fmt(f),
            Self::Other(label) => write!(f, "{label}"),
        }
    }
}
