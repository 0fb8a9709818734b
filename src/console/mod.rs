//! Vendor console pages
//!
//! This module provides the page-level abstraction the workflow runs against
//! and its browser-backed implementation.

mod console_page;
pub mod selectors;
mod web_console;

#[cfg(test)]
pub(crate) mod testing;

pub use console_page::ConsolePage;
pub use web_console::WebConsole;

/// Type alias for console trait object
pub type ConsoleInstance = Box<dyn ConsolePage>;
