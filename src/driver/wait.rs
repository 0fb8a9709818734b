use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::browser_driver::{BrowserDriver, ElementRef, Locator, Scope};
use crate::error::DriverError;

/// Readiness an element must reach before a wait succeeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Attached to the DOM
    Present,
    /// Attached and displayed
    Visible,
    /// Displayed and enabled
    Clickable,
}

/// Polls a condition until it holds or a fixed timeout expires
#[derive(Debug, Clone, Copy)]
pub struct Waiter {
    timeout: Duration,
    poll_interval: Duration,
}

impl Waiter {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Same polling cadence with a different timeout
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Poll `probe` until it yields a value.
    ///
    /// Transient driver errors count as "not yet"; any other error ends the wait.
    pub async fn until<T, F, Fut>(&self, what: &str, mut probe: F) -> Result<T, DriverError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, DriverError>>,
    {
        let deadline = Instant::now() + self.timeout;
        loop {
            match probe().await {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(e) if e.is_transient() => debug!("Still waiting for {}: {}", what, e),
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Err(DriverError::Timeout {
                    what: what.to_string(),
                    timeout: self.timeout,
                });
            }
            sleep(self.poll_interval).await;
        }
    }

    /// First element under `scope` matching `locator` that satisfies `condition`
    pub async fn element(
        &self,
        driver: &dyn BrowserDriver,
        scope: &Scope,
        locator: &Locator,
        condition: Condition,
    ) -> Result<ElementRef, DriverError> {
        let what = locator.to_string();
        self.until(&what, || probe_element(driver, scope, locator, condition))
            .await
    }

    /// Every element matching `locator`, once at least one is present
    pub async fn elements(
        &self,
        driver: &dyn BrowserDriver,
        scope: &Scope,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, DriverError> {
        let what = locator.to_string();
        self.until(&what, || probe_elements(driver, scope, locator))
            .await
    }

    /// Wait until no element matching `locator` is displayed
    pub async fn gone(
        &self,
        driver: &dyn BrowserDriver,
        scope: &Scope,
        locator: &Locator,
    ) -> Result<(), DriverError> {
        let what = format!("{} to disappear", locator);
        self.until(&what, || probe_gone(driver, scope, locator))
            .await
    }
}

async fn probe_element(
    driver: &dyn BrowserDriver,
    scope: &Scope,
    locator: &Locator,
    condition: Condition,
) -> Result<Option<ElementRef>, DriverError> {
    for element in driver.find_all(scope, locator).await? {
        if satisfies(driver, &element, condition).await? {
            return Ok(Some(element));
        }
    }
    Ok(None)
}

async fn probe_elements(
    driver: &dyn BrowserDriver,
    scope: &Scope,
    locator: &Locator,
) -> Result<Option<Vec<ElementRef>>, DriverError> {
    let found = driver.find_all(scope, locator).await?;
    Ok((!found.is_empty()).then_some(found))
}

async fn probe_gone(
    driver: &dyn BrowserDriver,
    scope: &Scope,
    locator: &Locator,
) -> Result<Option<()>, DriverError> {
    for element in driver.find_all(scope, locator).await? {
        if driver.is_displayed(&element).await? {
            return Ok(None);
        }
    }
    Ok(Some(()))
}

async fn satisfies(
    driver: &dyn BrowserDriver,
    element: &ElementRef,
    condition: Condition,
) -> Result<bool, DriverError> {
    match condition {
        Condition::Present => Ok(true),
        Condition::Visible => driver.is_displayed(element).await,
        Condition::Clickable => {
            Ok(driver.is_displayed(element).await? && driver.is_enabled(element).await?)
        }
    }
}

/// Fixed-delay retry used for multi-step UI operations that may race a page refresh
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Run `operation` until it succeeds or the attempts are used up
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.attempts => {
                    warn!(
                        "{} failed (attempt {}/{}): {:#}",
                        what, attempt, self.attempts, e
                    );
                    attempt += 1;
                    sleep(self.delay).await;
                }
                Err(e) => {
                    return Err(e.context(format!("{} failed after {} attempts", what, attempt)))
                }
            }
        }
    }
}
