use crate::{
    db::error::{DbError, DbResult},
    models::EventStatus,
};

/// `?, ?, ?` with `count` placeholders, for `IN (...)` clauses.
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Parse an event status string from the database, returning a DbError on failure
pub fn parse_status(s: &str) -> DbResult<EventStatus> {
    s.parse()
        .map_err(|e: String| DbError::Internal(format!("Invalid status in database: {}", e)))
}

/// Convert a stored day count, rejecting values outside `u32`.
pub fn parse_days(column: &str, value: i64) -> DbResult<u32> {
    u32::try_from(value)
        .map_err(|_| DbError::Internal(format!("Invalid {} in database: {}", column, value)))
}
