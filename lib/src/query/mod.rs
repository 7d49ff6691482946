/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

mod functions;
mod influxql;
mod promql;
mod selector;

use std::{fmt::Display, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::error::Error;

pub use functions::{AggregateFn, WindowFn};
pub use selector::MetricSelector;

/// Target query language. The display form doubles as the datasource
/// type identifier in the rule sink's wire format.
#[derive(
    SerializeDisplay, DeserializeFromStr, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug,
)]
pub enum Dialect {
    Prometheus,
    InfluxDb,
}

impl FromStr for Dialect {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prometheus" => Ok(Self::Prometheus),
            "influxdb" => Ok(Self::InfluxDb),
            _ => Err(Error::InvalidDialect(s.to_string())),
        }
    }
}

impl Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prometheus => write!(f, "prometheus"),
            Self::InfluxDb => write!(f, "influxdb"),
        }
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct TranslatedQuery {
    pub dialect: Dialect,
    pub text: String,
}

/// Translate one source expression into the chosen dialect. Always
/// produces a string: input without a recognizable selector degrades to
/// a commented marker in the dialect's comment syntax.
pub fn translate(expr: &str, dialect: Dialect) -> TranslatedQuery {
    let text = match dialect {
        Dialect::Prometheus => promql::translate(expr),
        Dialect::InfluxDb => influxql::translate(expr),
    };
    TranslatedQuery { dialect, text }
}
