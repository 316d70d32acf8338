//! # Harness Configuration
//!
//! All durations are carried as milliseconds so the same struct deserializes
//! from TOML and renders back without unit juggling. Missing keys fall back
//! to the defaults below.
//!
//! ```toml
//! [lock_ordering]
//! timeout_ms = 1000
//! grace_delay_ms = 500
//!
//! [visibility]
//! warm_up_ms = 200
//! ```

use crate::domain::{HarnessError, HarnessKind, HarnessResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Lock Ordering
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Settings for the lock-ordering harness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockOrderingConfig {
    /// Upper bound for the whole run
    pub timeout_ms: u64,

    /// How long to wait for both tasks to block before snapshotting
    pub grace_delay_ms: u64,

    /// How long a task waits on a resource or the rendezvous before giving up
    pub acquire_bound_ms: u64,

    /// Registry polling period while waiting for the rendezvous
    pub poll_interval_ms: u64,

    /// Force both tasks to hold their first resource before either requests
    /// its second
    pub use_barrier: bool,
}

impl Default for LockOrderingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            grace_delay_ms: 500,
            acquire_bound_ms: 10_000,
            poll_interval_ms: 5,
            use_barrier: true,
        }
    }
}

impl LockOrderingConfig {
    /// Run timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Snapshot grace delay
    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms)
    }

    /// Per-acquisition bound
    pub fn acquire_bound(&self) -> Duration {
        Duration::from_millis(self.acquire_bound_ms)
    }

    /// Registry polling period
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Set the run timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the grace delay
    #[must_use]
    pub fn with_grace_delay(mut self, grace: Duration) -> Self {
        self.grace_delay_ms = duration_ms(grace);
        self
    }

    /// Set the acquisition bound
    #[must_use]
    pub fn with_acquire_bound(mut self, bound: Duration) -> Self {
        self.acquire_bound_ms = duration_ms(bound);
        self
    }

    /// Set the registry polling period
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = duration_ms(interval);
        self
    }

    /// Enable or disable the rendezvous barrier
    #[must_use]
    pub fn with_barrier(mut self, use_barrier: bool) -> Self {
        self.use_barrier = use_barrier;
        self
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Visibility
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Settings for the visibility harness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    /// How long to wait for the consumer, measured from harness start
    pub timeout_ms: u64,

    /// How long the producer increments before raising the flag
    pub warm_up_ms: u64,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            warm_up_ms: 200,
        }
    }
}

impl VisibilityConfig {
    /// Run timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Producer warm-up
    pub fn warm_up(&self) -> Duration {
        Duration::from_millis(self.warm_up_ms)
    }

    /// Set the run timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the producer warm-up
    #[must_use]
    pub fn with_warm_up(mut self, warm_up: Duration) -> Self {
        self.warm_up_ms = duration_ms(warm_up);
        self
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Driver
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Settings for the sequential driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Slack added to a harness timeout before the driver gives up on it
    pub grace_margin_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { grace_margin_ms: 250 }
    }
}

impl DriverConfig {
    /// Hard-timeout slack
    pub fn grace_margin(&self) -> Duration {
        Duration::from_millis(self.grace_margin_ms)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Root
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Complete harness configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    /// Lock-ordering harness
    pub lock_ordering: LockOrderingConfig,
    /// Visibility harness
    pub visibility: VisibilityConfig,
    /// Driver
    pub driver: DriverConfig,
}

impl HazardConfig {
    /// Parse a TOML document
    ///
    /// # Errors
    /// - `Config`: malformed TOML or wrong field types
    pub fn from_toml_str(content: &str) -> HarnessResult<Self> {
        toml::from_str(content).map_err(|e| HarnessError::Config(e.to_string()))
    }

    /// Load a TOML file
    ///
    /// Values are not checked here; see [`HazardConfig::sanitized`].
    ///
    /// # Errors
    /// - `Config`: unreadable file or malformed TOML
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Reject values that would make a run meaningless
    ///
    /// # Errors
    /// - `Config`: a timeout, bound or poll interval is zero
    pub fn validate(&self) -> HarnessResult<()> {
        match self.clone().sanitized().1.into_iter().next() {
            Some(problem) => Err(problem),
            None => Ok(()),
        }
    }

    /// Reset every invalid field to its default, keeping the rest
    ///
    /// Returns the repaired config and one `Config` error per reset field.
    #[must_use]
    pub fn sanitized(mut self) -> (Self, Vec<HarnessError>) {
        let defaults = Self::default();
        let mut problems = Vec::new();
        let mut repair = |field: &str, value: &mut u64, fallback: u64| {
            if *value == 0 {
                problems.push(HarnessError::Config(format!(
                    "{} must be greater than zero",
                    field
                )));
                *value = fallback;
            }
        };

        repair(
            "lock_ordering.timeout_ms",
            &mut self.lock_ordering.timeout_ms,
            defaults.lock_ordering.timeout_ms,
        );
        repair(
            "lock_ordering.acquire_bound_ms",
            &mut self.lock_ordering.acquire_bound_ms,
            defaults.lock_ordering.acquire_bound_ms,
        );
        repair(
            "lock_ordering.poll_interval_ms",
            &mut self.lock_ordering.poll_interval_ms,
            defaults.lock_ordering.poll_interval_ms,
        );
        repair(
            "visibility.timeout_ms",
            &mut self.visibility.timeout_ms,
            defaults.visibility.timeout_ms,
        );

        (self, problems)
    }

    /// Timeout configured for a harness
    pub fn timeout_for(&self, kind: HarnessKind) -> Duration {
        match kind {
            HarnessKind::LockOrdering => self.lock_ordering.timeout(),
            HarnessKind::Visibility => self.visibility.timeout(),
        }
    }

    /// Apply one timeout to every harness
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.lock_ordering = self.lock_ordering.with_timeout(timeout);
        self.visibility = self.visibility.with_timeout(timeout);
        self
    }
}

/// Whole milliseconds, saturating at `u64::MAX`
pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_demonstration_delays() {
        let config = HazardConfig::default();
        assert_eq!(config.lock_ordering.grace_delay(), Duration::from_millis(500));
        assert_eq!(config.visibility.timeout(), Duration::from_millis(1000));
        assert_eq!(config.visibility.warm_up(), Duration::from_millis(200));
        assert!(config.lock_ordering.use_barrier);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = HazardConfig::from_toml_str(
            r#"
            [visibility]
            warm_up_ms = 50

            [driver]
            grace_margin_ms = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.visibility.warm_up_ms, 50);
        assert_eq!(config.visibility.timeout_ms, 1000);
        assert_eq!(config.driver.grace_margin_ms, 10);
        assert_eq!(config.lock_ordering, LockOrderingConfig::default());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let result = HazardConfig::from_toml_str("[visibility]\nwarm_up_ms = \"soon\"");
        assert!(matches!(result, Err(HarnessError::Config(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = HazardConfig::default().with_timeout(Duration::ZERO);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("lock_ordering.timeout_ms"));
    }

    #[test]
    fn test_timeout_override_applies_to_both() {
        let config = HazardConfig::default().with_timeout(Duration::from_millis(2000));
        assert_eq!(config.timeout_for(HarnessKind::LockOrdering), Duration::from_millis(2000));
        assert_eq!(config.timeout_for(HarnessKind::Visibility), Duration::from_millis(2000));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = HazardConfig::load(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(HarnessError::Config(_))));
    }

    #[test]
    fn test_duration_ms_truncates_and_saturates() {
        assert_eq!(duration_ms(Duration::from_micros(1500)), 1);
        assert_eq!(duration_ms(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_sanitized_resets_only_invalid_fields() {
        let mut config = HazardConfig::default().with_timeout(Duration::ZERO);
        config.lock_ordering.use_barrier = false;
        config.visibility.warm_up_ms = 50;

        let (repaired, problems) = config.sanitized();

        assert_eq!(problems.len(), 2);
        assert_eq!(repaired.lock_ordering.timeout_ms, 1000);
        assert_eq!(repaired.visibility.timeout_ms, 1000);
        assert!(!repaired.lock_ordering.use_barrier);
        assert_eq!(repaired.visibility.warm_up_ms, 50);
        assert!(repaired.validate().is_ok());
    }
}
