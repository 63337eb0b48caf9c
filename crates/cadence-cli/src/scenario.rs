//! Scenario step parsing
//!
//! Steps are written as colon-separated fields whose first field is the gap
//! in milliseconds since the previous step.

use std::str::FromStr;
use std::time::Duration;

use crate::error::CliError;

fn parse_ms(step: &str, field: &str) -> Result<u64, CliError> {
    field
        .trim()
        .parse()
        .map_err(|_| CliError::scenario(step, format!("'{}' is not a millisecond count", field)))
}

/// `GAP_MS:VALUE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputStep {
    pub gap: Duration,
    pub value: String,
}

impl FromStr for InputStep {
    type Err = CliError;

    fn from_str(step: &str) -> Result<Self, Self::Err> {
        let (gap, value) = step
            .split_once(':')
            .ok_or_else(|| CliError::scenario(step, "expected GAP_MS:VALUE"))?;
        Ok(Self {
            gap: Duration::from_millis(parse_ms(step, gap)?),
            value: value.to_string(),
        })
    }
}

/// `GAP_MS:RESOURCE:LATENCY_MS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestStep {
    pub gap: Duration,
    pub resource: String,
    pub latency_ms: u64,
}

impl FromStr for RequestStep {
    type Err = CliError;

    fn from_str(step: &str) -> Result<Self, Self::Err> {
        let mut fields = step.splitn(3, ':');
        let (Some(gap), Some(resource), Some(latency)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(CliError::scenario(step, "expected GAP_MS:RESOURCE:LATENCY_MS"));
        };
        if resource.is_empty() {
            return Err(CliError::scenario(step, "resource name is empty"));
        }

        Ok(Self {
            gap: Duration::from_millis(parse_ms(step, gap)?),
            resource: resource.to_string(),
            latency_ms: parse_ms(step, latency)?,
        })
    }
}

/// Parse every step, stopping at the first malformed one
pub fn parse_steps<T: FromStr<Err = CliError>>(steps: &[String]) -> Result<Vec<T>, CliError> {
    steps.iter().map(|step| step.parse()).collect()
}
