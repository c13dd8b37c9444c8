use std::str::FromStr;

use uuid::Uuid;

use crate::db::error::{DbError, DbResult};

/// Parse a UUID string from the database, returning a DbError on failure
pub fn parse_uuid(s: &str) -> DbResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DbError::Internal(format!("Invalid UUID in database: {}", e)))
}

/// Parse a nullable UUID reference column. Empty strings count as NULL.
pub fn parse_optional_uuid(s: Option<String>) -> DbResult<Option<Uuid>> {
    match s.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => parse_uuid(s).map(Some),
    }
}

/// Parse a status column stored as its string representation.
pub fn parse_enum<T>(s: &str) -> DbResult<T>
where
    T: FromStr<Err = String>,
{
    s.parse().map_err(DbError::Internal)
}
