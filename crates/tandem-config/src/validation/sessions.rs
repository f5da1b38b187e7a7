//! Session code and password hashing bounds.

use crate::schema::TandemConfig;

use super::helpers::validate_range;

pub(crate) fn validate_sessions(errors: &mut Vec<String>, config: &TandemConfig) {
    validate_range(
        errors,
        "sessions.code_attempts",
        u64::from(config.sessions.code_attempts),
        1,
        1000,
    );
    validate_range(
        errors,
        "sessions.password_iterations",
        u64::from(config.sessions.password_iterations),
        1000,
        1_000_000,
    );
}
