use bazaar_core::error::CoreError;

/// Engine-level error type returned by every operation.
///
/// Wraps [`CoreError`] for domain errors and adds storage, configuration,
/// and password hashing failures. Callers branch on [`EngineError::kind`]
/// rather than on message text.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A domain-level error from `bazaar_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An environment variable held an unparseable value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The password hasher failed (not a wrong password).
    #[error("Password hashing failed: {0}")]
    Password(String),
}

/// Convenience type alias for engine return values.
pub type EngineResult<T> = Result<T, EngineError>;

/// Caller-visible error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Permission,
    NotFound,
    Duplicate,
    InvalidState,
    Unauthorized,
    System,
}

impl EngineError {
    /// Classify this error.
    ///
    /// - Unique violations on a `uq_` constraint are `Duplicate`.
    /// - `RowNotFound` is `NotFound`.
    /// - Every other storage failure is `System`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Core(core) => match core {
                CoreError::NotFound { .. } => ErrorKind::NotFound,
                CoreError::Validation(_) => ErrorKind::Validation,
                CoreError::Conflict(_) => ErrorKind::Duplicate,
                CoreError::InvalidState(_) => ErrorKind::InvalidState,
                CoreError::Unauthorized(_) => ErrorKind::Unauthorized,
                CoreError::Forbidden(_) => ErrorKind::Permission,
                CoreError::Internal(_) => ErrorKind::System,
            },
            EngineError::Database(err) => classify_sqlx_error(err),
            EngineError::Config(_) | EngineError::Password(_) => ErrorKind::System,
        }
    }
}

fn classify_sqlx_error(err: &sqlx::Error) -> ErrorKind {
    match err {
        sqlx::Error::RowNotFound => ErrorKind::NotFound,
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505")
                && db_err.constraint().is_some_and(|c| c.starts_with("uq_"))
            {
                ErrorKind::Duplicate
            } else {
                ErrorKind::System
            }
        }
        _ => ErrorKind::System,
    }
}

/// Map a unique violation on `constraint` to a [`CoreError::Conflict`] with
/// a readable message; pass every other error through.
pub(crate) fn conflict_on(
    constraint: &str,
    message: &str,
) -> impl FnOnce(sqlx::Error) -> EngineError {
    let constraint = constraint.to_string();
    let message = message.to_string();
    move |err| match &err {
        sqlx::Error::Database(db_err)
            if db_err.code().as_deref() == Some("23505")
                && db_err.constraint() == Some(constraint.as_str()) =>
        {
            EngineError::Core(CoreError::Conflict(message))
        }
        _ => EngineError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_variants_map_to_kinds() {
        let cases = [
            (CoreError::Validation("x".into()), ErrorKind::Validation),
            (CoreError::Forbidden("x".into()), ErrorKind::Permission),
            (CoreError::Conflict("x".into()), ErrorKind::Duplicate),
            (CoreError::InvalidState("x".into()), ErrorKind::InvalidState),
            (CoreError::Unauthorized("x".into()), ErrorKind::Unauthorized),
            (CoreError::Internal("x".into()), ErrorKind::System),
            (
                CoreError::NotFound {
                    entity: "Listing",
                    id: 1,
                },
                ErrorKind::NotFound,
            ),
        ];
        for (core, kind) in cases {
            assert_eq!(EngineError::from(core).kind(), kind);
        }
    }

    #[test]
    fn row_not_found_is_not_found() {
        assert_eq!(
            EngineError::from(sqlx::Error::RowNotFound).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn other_storage_errors_are_system() {
        assert_eq!(
            EngineError::from(sqlx::Error::PoolTimedOut).kind(),
            ErrorKind::System
        );
        assert_eq!(EngineError::Config("bad".into()).kind(), ErrorKind::System);
    }

    #[test]
    fn validation_message_is_surfaced_verbatim() {
        let err = EngineError::from(CoreError::Validation("Title must not be empty".into()));
        assert_eq!(err.to_string(), "Validation failed: Title must not be empty");
    }
}
