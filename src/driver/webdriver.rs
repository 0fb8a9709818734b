use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use super::browser_driver::{BrowserDriver, ElementRef, Locator, Scope, ShadowRef, ELEMENT_KEY, SHADOW_KEY};
use super::BrowserType;
use crate::error::DriverError;

/// W3C WebDriver client bound to a single browser session
pub struct WebDriverClient {
    client: Client,
    endpoint: String,
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct WebDriverResponse<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct WebDriverFailure {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// Session capabilities for the configured browser
pub fn capabilities(browser: BrowserType, headless: bool) -> Value {
    match browser {
        BrowserType::Chrome => {
            let mut args = vec!["--disable-gpu", "--window-size=1920,1080"];
            if headless {
                args.push("--headless=new");
            }
            json!({
                "capabilities": {
                    "alwaysMatch": {
                        "browserName": "chrome",
                        "goog:chromeOptions": { "args": args }
                    }
                }
            })
        }
        BrowserType::Firefox => {
            let args: Vec<&str> = if headless { vec!["-headless"] } else { vec![] };
            json!({
                "capabilities": {
                    "alwaysMatch": {
                        "browserName": "firefox",
                        "moz:firefoxOptions": { "args": args }
                    }
                }
            })
        }
    }
}

impl WebDriverClient {
    /// Start a new browser session on a WebDriver server
    pub async fn connect(
        endpoint: &str,
        capabilities: Value,
        request_timeout: Duration,
    ) -> Result<Self, DriverError> {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        info!("Starting browser session via {}", endpoint);

        let client = Client::builder().timeout(request_timeout).build()?;

        let response = client
            .post(format!("{}/session", endpoint))
            .json(&capabilities)
            .send()
            .await?;
        let session: NewSession = decode(response).await?;

        debug!("Browser session {} started", session.session_id);
        Ok(Self {
            client,
            endpoint,
            session_id: session.session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub(crate) fn session_url(&self, path: &str) -> String {
        if path.is_empty() {
            format!("{}/session/{}", self.endpoint, self.session_id)
        } else {
            format!(
                "{}/session/{}/{}",
                self.endpoint,
                self.session_id,
                path.trim_start_matches('/')
            )
        }
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, DriverError> {
        let url = self.session_url(path);
        debug!("WebDriver {} {}", method, url);

        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(&body);
        } else if method == Method::POST {
            request = request.json(&json!({}));
        }

        let response = request.send().await?;
        decode(response).await
    }

    async fn get(&self, path: &str) -> Result<Value, DriverError> {
        self.command(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, DriverError> {
        self.command(Method::POST, path, Some(body)).await
    }

    fn element_path(element: &ElementRef, suffix: &str) -> String {
        format!("element/{}/{}", element.0, suffix)
    }
}

/// Unwrap the `value` envelope, mapping W3C error bodies to `DriverError::Command`
async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, DriverError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return match serde_json::from_str::<WebDriverResponse<WebDriverFailure>>(&body) {
            Ok(failure) => Err(DriverError::Command {
                status: status.as_u16(),
                error: failure.value.error,
                message: failure.value.message,
            }),
            Err(_) => Err(DriverError::Protocol(format!(
                "status {} with body {}",
                status, body
            ))),
        };
    }

    serde_json::from_str::<WebDriverResponse<T>>(&body)
        .map(|r| r.value)
        .map_err(|e| DriverError::Protocol(format!("{}: {}", e, body)))
}

fn reference(value: &Value, key: &str) -> Result<String, DriverError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DriverError::Protocol(format!("missing {} in {}", key, value)))
}

fn string_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[async_trait::async_trait]
impl BrowserDriver for WebDriverClient {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        debug!("Navigating to {}", url);
        self.post("url", json!({ "url": url })).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let value = self.get("url").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DriverError::Protocol(format!("url is not a string: {}", value)))
    }

    async fn find_all(&self, scope: &Scope, locator: &Locator) -> Result<Vec<ElementRef>, DriverError> {
        let path = match scope {
            Scope::Document => "elements".to_string(),
            Scope::Element(element) => Self::element_path(element, "elements"),
            Scope::Shadow(shadow) => {
                // Shadow roots only support CSS lookups
                if matches!(locator, Locator::XPath(_)) {
                    return Err(DriverError::UnsupportedLocator(locator.to_string()));
                }
                format!("shadow/{}/elements", shadow.0)
            }
        };

        let value = self
            .post(
                &path,
                json!({ "using": locator.strategy(), "value": locator.value() }),
            )
            .await?;

        let items = value
            .as_array()
            .ok_or_else(|| DriverError::Protocol(format!("expected element list, got {}", value)))?;

        items
            .iter()
            .map(|item| reference(item, ELEMENT_KEY).map(ElementRef))
            .collect()
    }

    async fn shadow_root(&self, element: &ElementRef) -> Result<Option<ShadowRef>, DriverError> {
        match self.get(&Self::element_path(element, "shadow")).await {
            Ok(value) => Ok(Some(ShadowRef(reference(&value, SHADOW_KEY)?))),
            Err(DriverError::Command { error, .. }) if error == "no such shadow root" => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError> {
        self.post(&Self::element_path(element, "click"), json!({}))
            .await?;
        Ok(())
    }

    async fn clear(&self, element: &ElementRef) -> Result<(), DriverError> {
        self.post(&Self::element_path(element, "clear"), json!({}))
            .await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        self.post(&Self::element_path(element, "value"), json!({ "text": text }))
            .await?;
        Ok(())
    }

    async fn text(&self, element: &ElementRef) -> Result<String, DriverError> {
        let value = self.get(&Self::element_path(element, "text")).await?;
        Ok(string_value(value).unwrap_or_default())
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>, DriverError> {
        // Properties reflect live input values; fall back to the markup attribute
        let property = self
            .get(&Self::element_path(element, &format!("property/{}", name)))
            .await?;
        if let Some(value) = string_value(property) {
            return Ok(Some(value));
        }

        let attribute = self
            .get(&Self::element_path(element, &format!("attribute/{}", name)))
            .await?;
        Ok(string_value(attribute))
    }

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool, DriverError> {
        let value = self.get(&Self::element_path(element, "displayed")).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&self, element: &ElementRef) -> Result<bool, DriverError> {
        let value = self.get(&Self::element_path(element, "enabled")).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, DriverError> {
        self.post("execute/sync", json!({ "script": script, "args": args }))
            .await
    }

    async fn delete_all_cookies(&self) -> Result<(), DriverError> {
        self.command(Method::DELETE, "cookie", None).await?;
        Ok(())
    }

    async fn maximize_window(&self) -> Result<(), DriverError> {
        self.post("window/maximize", json!({})).await?;
        Ok(())
    }

    async fn quit(&self) -> Result<(), DriverError> {
        info!("Closing browser session {}", self.session_id);
        self.command(Method::DELETE, "", None).await?;
        Ok(())
    }

    fn driver_name(&self) -> &'static str {
        "W3C WebDriver"
    }
}
