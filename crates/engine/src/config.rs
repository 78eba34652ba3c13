use bazaar_core::login_guard::{
    LockoutPolicy, DEFAULT_ATTEMPT_WINDOW_MINS, DEFAULT_BLOCK_DURATION_MINS,
    DEFAULT_MAX_FAILED_ATTEMPTS,
};
use chrono::Duration;

use crate::error::{EngineError, EngineResult};

/// Retention windows for the cleanup routine, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionConfig {
    pub activity_log_days: i64,
    pub failed_login_days: i64,
    pub read_notification_days: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            activity_log_days: 90,
            failed_login_days: 30,
            read_notification_days: 180,
        }
    }
}

/// Engine configuration, injected at construction time.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Login-attempt guard thresholds.
    pub lockout: LockoutPolicy,
    /// Cleanup retention windows.
    pub retention: RetentionConfig,
    /// Active listings published longer ago than this expire.
    pub listing_max_age_days: i64,
    /// Minimum password length at registration.
    pub min_password_length: usize,
    /// Maximum listings expired per sweep transaction.
    pub expiry_batch_size: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lockout: LockoutPolicy::default(),
            retention: RetentionConfig::default(),
            listing_max_age_days: 30,
            min_password_length: 8,
            expiry_batch_size: 500,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default |
    /// |--------------------------------|---------|
    /// | `LOGIN_MAX_FAILED_ATTEMPTS`    | `5`     |
    /// | `LOGIN_BLOCK_DURATION_MINS`    | `15`    |
    /// | `LOGIN_ATTEMPT_WINDOW_MINS`    | `60`    |
    /// | `ACTIVITY_LOG_RETENTION_DAYS`  | `90`    |
    /// | `FAILED_LOGIN_RETENTION_DAYS`  | `30`    |
    /// | `NOTIFICATION_RETENTION_DAYS`  | `180`   |
    /// | `LISTING_MAX_AGE_DAYS`         | `30`    |
    /// | `MIN_PASSWORD_LENGTH`          | `8`     |
    /// | `EXPIRY_BATCH_SIZE`            | `500`   |
    pub fn from_env() -> EngineResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let threshold: i32 = parse_or(
            &lookup,
            "LOGIN_MAX_FAILED_ATTEMPTS",
            DEFAULT_MAX_FAILED_ATTEMPTS,
        )?;
        let block_mins: i64 = parse_or(
            &lookup,
            "LOGIN_BLOCK_DURATION_MINS",
            DEFAULT_BLOCK_DURATION_MINS,
        )?;
        let window_mins: i64 = parse_or(
            &lookup,
            "LOGIN_ATTEMPT_WINDOW_MINS",
            DEFAULT_ATTEMPT_WINDOW_MINS,
        )?;

        let defaults = RetentionConfig::default();
        let retention = RetentionConfig {
            activity_log_days: parse_or(
                &lookup,
                "ACTIVITY_LOG_RETENTION_DAYS",
                defaults.activity_log_days,
            )?,
            failed_login_days: parse_or(
                &lookup,
                "FAILED_LOGIN_RETENTION_DAYS",
                defaults.failed_login_days,
            )?,
            read_notification_days: parse_or(
                &lookup,
                "NOTIFICATION_RETENTION_DAYS",
                defaults.read_notification_days,
            )?,
        };

        let config = Self {
            lockout: LockoutPolicy {
                threshold,
                block_duration: minutes("LOGIN_BLOCK_DURATION_MINS", block_mins)?,
                attempt_window: minutes("LOGIN_ATTEMPT_WINDOW_MINS", window_mins)?,
            },
            retention,
            listing_max_age_days: parse_or(&lookup, "LISTING_MAX_AGE_DAYS", 30)?,
            min_password_length: parse_or(&lookup, "MIN_PASSWORD_LENGTH", 8)?,
            expiry_batch_size: parse_or(&lookup, "EXPIRY_BATCH_SIZE", 500)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every value is in range.
    ///
    /// Durations must be positive and at most [`MAX_DAYS`] long, so that
    /// timestamp arithmetic on them cannot overflow.
    pub fn validate(&self) -> EngineResult<()> {
        if self.lockout.threshold < 1 {
            return Err(EngineError::Config(
                "LOGIN_MAX_FAILED_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        let max = Duration::days(MAX_DAYS);
        for (key, value) in [
            ("LOGIN_BLOCK_DURATION_MINS", self.lockout.block_duration),
            ("LOGIN_ATTEMPT_WINDOW_MINS", self.lockout.attempt_window),
        ] {
            if value <= Duration::zero() || value > max {
                return Err(out_of_range(key));
            }
        }
        for (key, days) in [
            ("ACTIVITY_LOG_RETENTION_DAYS", self.retention.activity_log_days),
            ("FAILED_LOGIN_RETENTION_DAYS", self.retention.failed_login_days),
            ("NOTIFICATION_RETENTION_DAYS", self.retention.read_notification_days),
            ("LISTING_MAX_AGE_DAYS", self.listing_max_age_days),
        ] {
            if !(1..=MAX_DAYS).contains(&days) {
                return Err(out_of_range(key));
            }
        }
        if self.min_password_length == 0 {
            return Err(out_of_range("MIN_PASSWORD_LENGTH"));
        }
        if self.expiry_batch_size < 1 {
            return Err(out_of_range("EXPIRY_BATCH_SIZE"));
        }
        Ok(())
    }
}

/// Upper bound for every configured duration: 100 years.
pub const MAX_DAYS: i64 = 36_500;

fn minutes(key: &str, mins: i64) -> EngineResult<Duration> {
    if !(1..=MAX_DAYS * 24 * 60).contains(&mins) {
        return Err(out_of_range(key));
    }
    Ok(Duration::minutes(mins))
}

fn out_of_range(key: &str) -> EngineError {
    EngineError::Config(format!("{key} is out of range"))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> EngineResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| EngineError::Config(format!("{key} has invalid value '{raw}'"))),
    }
}
