//! Store Interface
//!
//! The dispatcher never touches SQL for writes directly; it calls one of the
//! operations below. Each operation is atomic with respect to every other
//! caller, so two connections logging in as the same new user cannot both
//! register it.

use std::fmt;
use thiserror::Error;

/// Errors reported by a store.
///
/// The `Display` text is what clients see after `ERROR: `.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The underlying database rejected a statement or query
    #[error("{0}")]
    Database(String),

    /// A query was not read-only
    #[error("only read-only queries are allowed")]
    NotReadOnly,

    /// The store's connection lock was poisoned by a panicking caller
    #[error("store unavailable")]
    Poisoned,
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Known user, password matched; a session was opened
    Accepted,
    /// Unknown user; it was registered and a session was opened
    Registered,
    /// Known user, password did not match; nothing was written
    Rejected,
}

impl LoginOutcome {
    /// Returns true if a session was opened.
    pub fn is_success(&self) -> bool {
        !matches!(self, LoginOutcome::Rejected)
    }
}

/// A single column value returned by a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Clients parse missing logout times as "None"
            Value::Null => f.write_str("None"),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Real(r) => f.write_str(&format_real(*r)),
            Value::Text(s) => f.write_str(s),
            Value::Blob(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

/// Renders a float in repr form: shortest round-trip digits, fixed notation
/// for exponents in `-4..16`, otherwise `d.ddde+XX` with a signed, at least
/// two-digit exponent.
fn format_real(r: f64) -> String {
    if r.is_nan() {
        return "nan".to_string();
    }
    if r.is_infinite() {
        return if r > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    // `{:e}` yields the shortest digits, e.g. "-1.2345e20"
    let sci = format!("{:e}", r);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    if (-4..16).contains(&exp) {
        let body = if exp < 0 {
            format!("0.{}{}", "0".repeat((-exp - 1) as usize), digits)
        } else {
            let int_len = exp as usize + 1;
            if digits.len() <= int_len {
                format!("{}{}.0", digits, "0".repeat(int_len - digits.len()))
            } else {
                format!("{}.{}", &digits[..int_len], &digits[int_len..])
            }
        };
        format!("{}{}", sign, body)
    } else {
        let exp_sign = if exp < 0 { '-' } else { '+' };
        format!("{}{}e{}{:02}", sign, mantissa, exp_sign, exp.abs())
    }
}

/// One row of a query result, in column order.
pub type Row = Vec<Value>;

/// Counters describing store activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Sessions opened (accepted + registered logins)
    pub sessions_opened: u64,
    /// Users created on first login
    pub users_registered: u64,
    /// Logins refused for a wrong password
    pub logins_rejected: u64,
    /// Sessions closed by logout
    pub sessions_closed: u64,
    /// Files recorded
    pub files_recorded: u64,
    /// Queries executed
    pub queries: u64,
}

/// Persistence operations needed by the command dispatcher.
///
/// Timestamps are passed in by the caller so the store stays deterministic
/// under test.
pub trait Store: Send + Sync {
    /// Verifies `password` for `username`, registering the user if unseen,
    /// and opens a login session stamped `at` on success.
    fn login(&self, username: &str, password: &str, at: &str) -> StoreResult<LoginOutcome>;

    /// Closes the most recent open session for `username`.
    ///
    /// Returns the number of sessions closed (0 or 1).
    fn logout(&self, username: &str, at: &str) -> StoreResult<usize>;

    /// Records an uploaded file.
    fn add_file(&self, username: &str, filename: &str, at: &str) -> StoreResult<()>;

    /// Runs a read-only query and returns every row.
    fn query(&self, sql: &str) -> StoreResult<Vec<Row>>;

    /// Returns a snapshot of activity counters.
    fn stats(&self) -> StoreStats;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "None");
        assert_eq!(Value::Integer(-7).to_string(), "-7");
        assert_eq!(Value::Real(1.0).to_string(), "1.0");
        assert_eq!(Value::Real(0.25).to_string(), "0.25");
        assert_eq!(Value::Real(-1.5).to_string(), "-1.5");
        assert_eq!(Value::Text("a b".into()).to_string(), "a b");
        assert_eq!(Value::Blob(b"raw".to_vec()).to_string(), "raw");
    }

    #[test]
    fn test_real_formatting() {
        assert_eq!(format_real(123.456), "123.456");
        assert_eq!(format_real(-0.0), "-0.0");
        assert_eq!(format_real(1e15), "1000000000000000.0");
        assert_eq!(format_real(1e16), "1e+16");
        assert_eq!(format_real(1e20), "1e+20");
        assert_eq!(format_real(1.5e300), "1.5e+300");
        assert_eq!(format_real(0.0001), "0.0001");
        assert_eq!(format_real(1e-5), "1e-05");
        assert_eq!(format_real(-2.5e-7), "-2.5e-07");
        assert_eq!(format_real(f64::INFINITY), "inf");
        assert_eq!(format_real(f64::NAN), "nan");
    }

    #[test]
    fn test_login_outcome() {
        assert!(LoginOutcome::Accepted.is_success());
        assert!(LoginOutcome::Registered.is_success());
        assert!(!LoginOutcome::Rejected.is_success());
    }

    #[test]
    fn test_error_display_is_detail() {
        let err = StoreError::Database("no such table: nope".into());
        assert_eq!(err.to_string(), "no such table: nope");
    }
}
