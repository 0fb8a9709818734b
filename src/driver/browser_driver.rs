use serde_json::{json, Value};
use std::borrow::Cow;

use crate::error::DriverError;

/// W3C web element identifier key
pub(crate) const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
/// W3C shadow root identifier key
pub(crate) const SHADOW_KEY: &str = "shadow-6066-11e4-a52e-4f735466cecf";

/// Handle to an element in the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(pub String);

/// Handle to an element's shadow root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowRef(pub String);

impl ElementRef {
    /// JSON form used when passing the element as a script argument
    pub fn to_json(&self) -> Value {
        json!({ ELEMENT_KEY: self.0 })
    }
}

/// How to find an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(Cow<'static, str>),
    XPath(Cow<'static, str>),
}

impl Locator {
    pub const fn css(selector: &'static str) -> Self {
        Locator::Css(Cow::Borrowed(selector))
    }

    pub const fn xpath(expression: &'static str) -> Self {
        Locator::XPath(Cow::Borrowed(expression))
    }

    /// W3C `using` strategy name
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Css(_) => "css selector",
            Locator::XPath(_) => "xpath",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Locator::Css(s) | Locator::XPath(s) => s,
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.value())
    }
}

/// Search root for an element lookup: the whole document, the subtree of an
/// element, or an element's shadow root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Document,
    Element(ElementRef),
    Shadow(ShadowRef),
}

/// Trait for browser automation drivers (WebDriver, CDP, test doubles)
#[async_trait::async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Load a URL in the current window
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// URL of the current page
    async fn current_url(&self) -> Result<String, DriverError>;

    /// All elements under `scope` matching `locator`, possibly empty
    async fn find_all(&self, scope: &Scope, locator: &Locator) -> Result<Vec<ElementRef>, DriverError>;

    /// Shadow root attached to an element, if any
    async fn shadow_root(&self, element: &ElementRef) -> Result<Option<ShadowRef>, DriverError>;

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError>;

    async fn clear(&self, element: &ElementRef) -> Result<(), DriverError>;

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), DriverError>;

    /// Rendered text of an element
    async fn text(&self, element: &ElementRef) -> Result<String, DriverError>;

    /// Property or attribute value, `None` when neither is set
    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>, DriverError>;

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool, DriverError>;

    async fn is_enabled(&self, element: &ElementRef) -> Result<bool, DriverError>;

    /// Run a synchronous script in the page
    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, DriverError>;

    async fn delete_all_cookies(&self) -> Result<(), DriverError>;

    async fn maximize_window(&self) -> Result<(), DriverError>;

    /// End the browser session
    async fn quit(&self) -> Result<(), DriverError>;

    /// Get the driver name for display purposes
    fn driver_name(&self) -> &'static str;
}
