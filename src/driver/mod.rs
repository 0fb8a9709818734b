//! Browser automation driver
//!
//! This module provides the driver abstraction the console pages are written
//! against, a W3C WebDriver implementation and the bounded wait/retry helpers.

mod browser_driver;
mod wait;
mod webdriver;

pub use browser_driver::{BrowserDriver, ElementRef, Locator, Scope, ShadowRef};
pub use wait::{Condition, RetryPolicy, Waiter};
pub use webdriver::{capabilities, WebDriverClient};

/// Browser type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserType {
    Chrome,
    Firefox,
}

impl std::str::FromStr for BrowserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chrome" | "chromium" => Ok(BrowserType::Chrome),
            "firefox" => Ok(BrowserType::Firefox),
            _ => Err(format!("Unknown browser: {}. Supported: chrome, firefox", s)),
        }
    }
}

/// Type alias for driver trait object
pub type DriverInstance = Box<dyn BrowserDriver>;
