//! Per-run context handed to every workflow component

use chrono::{DateTime, Local, NaiveDate};
use tracing::Span;

use crate::config::Config;
use crate::driver::{RetryPolicy, Waiter};

/// Configuration, clock and log span of one rotation run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: Config,
    /// Reference date for every expiration computation in the run
    pub today: NaiveDate,
    pub started_at: DateTime<Local>,
    pub dry_run: bool,
    span: Span,
}

impl RunContext {
    pub fn new(config: Config, dry_run: bool) -> Self {
        let started_at = Local::now();
        Self::at(config, started_at, dry_run)
    }

    /// Context pinned to a given start time
    pub fn at(config: Config, started_at: DateTime<Local>, dry_run: bool) -> Self {
        let span = tracing::info_span!("run", started = %started_at.format("%Y-%m-%d %H:%M:%S"), dry_run);
        Self {
            config,
            today: started_at.date_naive(),
            started_at,
            dry_run,
            span,
        }
    }

    /// Root span; per-account spans are created as its children
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn waiter(&self) -> Waiter {
        Waiter::new(
            self.config.waits.timeout(),
            self.config.waits.poll_interval(),
        )
    }

    pub fn alert_waiter(&self) -> Waiter {
        self.waiter().with_timeout(self.config.waits.alert_timeout())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.config.waits.retry_attempts,
            self.config.waits.retry_delay(),
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    /// Context on a fixed date with near-zero waits
    pub fn test_context(today: NaiveDate) -> RunContext {
        let mut config = Config::sample();
        config.waits.timeout_secs = 0;
        config.waits.poll_interval_ms = 1;
        config.waits.retry_attempts = 2;
        config.waits.retry_delay_ms = 1;

        let noon = today
            .and_hms_opt(12, 0, 0)
            .and_then(|dt| Local.from_local_datetime(&dt).single())
            .unwrap();
        RunContext::at(config, noon, false)
    }

    #[test]
    fn test_today_matches_start() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let ctx = test_context(today);
        assert_eq!(ctx.today, today);
        assert!(!ctx.dry_run);
    }

    #[test]
    fn test_waiters_follow_config() {
        let ctx = RunContext::new(Config::sample(), true);
        assert_eq!(ctx.waiter().timeout(), Duration::from_secs(10));
        assert_eq!(ctx.alert_waiter().timeout(), Duration::from_secs(3));
        assert_eq!(ctx.retry_policy().attempts(), 3);
    }
}
