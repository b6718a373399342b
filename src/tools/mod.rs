/// Tool handlers exposed over MCP
///
/// Each tool takes a `*Params` struct deserialized from the call arguments
/// and returns a `*Response` that is serialized back to the client. The
/// parameter structs derive `JsonSchema` so `tools/list` can publish them.

pub mod daily;
pub mod plan;
pub mod query;
pub mod time;
pub mod weekly;

pub use daily::*;
pub use plan::*;
pub use query::*;
pub use time::*;
pub use weekly::*;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::domain::time_utils::MAX_WEEK_NUMBER;
use crate::domain::DomainError;
use crate::service::{ServiceError, WeekSpec};

/// A week given either as a bare number or as text ("3", "current", "this_week")
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum WeekArg {
    Number(u32),
    Text(String),
}

impl WeekArg {
    pub fn to_spec(&self) -> Result<WeekSpec, ServiceError> {
        match self {
            WeekArg::Number(0) => Err(invalid("week numbers start at 1")),
            WeekArg::Number(n) if *n > MAX_WEEK_NUMBER => Err(invalid(format!(
                "week {} is past the last supported week {}",
                n, MAX_WEEK_NUMBER
            ))),
            WeekArg::Number(n) => Ok(WeekSpec::Number(*n)),
            WeekArg::Text(text) => Ok(text.parse::<WeekSpec>()?),
        }
    }
}

/// The week argument, or the current week when omitted
fn week_or_current(week: Option<&WeekArg>) -> Result<WeekSpec, ServiceError> {
    week.map_or(Ok(WeekSpec::Current), WeekArg::to_spec)
}

fn invalid(message: impl Into<String>) -> ServiceError {
    ServiceError::Domain(DomainError::Validation {
        message: message.into(),
    })
}

fn parse_id<T>(raw: &str, parse: impl FnOnce(&str) -> Result<T, uuid::Error>) -> Result<T, ServiceError> {
    parse(raw).map_err(|e| invalid(format!("Invalid task id '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_week_arg_accepts_numbers_and_terms() {
        let number: WeekArg = serde_json::from_str("2").unwrap();
        assert_eq!(number.to_spec().unwrap(), WeekSpec::Number(2));

        let text: WeekArg = serde_json::from_str("\"this_week\"").unwrap();
        assert_eq!(text.to_spec().unwrap(), WeekSpec::Current);

        assert!(WeekArg::Number(0).to_spec().is_err());
        assert!(WeekArg::Number(100_000_000).to_spec().is_err());
        assert!(WeekArg::Text("4000000000".to_string()).to_spec().is_err());
        assert_eq!(week_or_current(None).unwrap(), WeekSpec::Current);
    }
}
