//! HTTP Handlers
//!
//! Request handlers for all HTTP endpoints.

pub mod audit;
pub mod auth;
pub mod billing;
pub mod expenses;
pub mod forms;
pub mod health;
pub mod permits;
pub mod tenants;
pub mod timesheets;
pub mod tools;
pub mod users;

use crate::shared::error::AppError;
use crate::shared::snowflake;

/// Parse a snowflake path or query parameter
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<i64, AppError> {
    snowflake::from_string(raw).map_err(|_| AppError::BadRequest(format!("Invalid {} ID", what)))
}

/// Parse an optional snowflake query parameter
pub(crate) fn parse_opt_id(raw: Option<&str>, what: &str) -> Result<Option<i64>, AppError> {
    raw.map(|r| parse_id(r, what)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("175928847299117063", "form").unwrap(), 175928847299117063);
        assert!(matches!(parse_id("abc", "form"), Err(AppError::BadRequest(m)) if m == "Invalid form ID"));
        assert_eq!(parse_opt_id(None, "user").unwrap(), None);
    }
}
