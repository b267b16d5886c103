//! In-memory capability implementations for tests and examples
//!
//! [`MockDriver`] records every invocation and can be scripted to fail on
//! specific selectors or URLs, answer element-presence probes, return queued
//! script results, and trip a cancellation signal after a fixed number of
//! calls (for exercising cooperative cancellation mid-run).

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{CredentialLookup, Driver, DriverError, LookupError, TemplateLookup};
use crate::engine::CancellationSignal;
use crate::workflow::ActionDefinition;

#[derive(Default)]
struct MockState {
    calls: Vec<String>,
    fail_selectors: HashSet<String>,
    fail_urls: HashSet<String>,
    absent_selectors: HashSet<String>,
    script_results: VecDeque<Value>,
    current_url: Option<String>,
    cancel_after: Option<(usize, CancellationSignal)>,
}

/// Scriptable driver that records calls instead of touching a browser
#[derive(Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make click/type on this selector fail with `ElementNotFound`
    pub async fn fail_on_selector(&self, selector: &str) {
        self.state
            .lock()
            .await
            .fail_selectors
            .insert(selector.to_string());
    }

    /// Make navigation to this URL fail
    pub async fn fail_on_url(&self, url: &str) {
        self.state.lock().await.fail_urls.insert(url.to_string());
    }

    /// Make `element_present` report false for this selector
    pub async fn mark_absent(&self, selector: &str) {
        self.state
            .lock()
            .await
            .absent_selectors
            .insert(selector.to_string());
    }

    /// Queue a result for the next `evaluate_script` call; once the queue is
    /// empty, scripts evaluate to `false`
    pub async fn push_script_result(&self, value: Value) {
        self.state.lock().await.script_results.push_back(value);
    }

    /// Set the cancellation signal once `calls` driver invocations completed
    pub async fn cancel_after(&self, calls: usize, signal: CancellationSignal) {
        self.state.lock().await.cancel_after = Some((calls, signal));
    }

    /// Everything the driver was asked to do, in order
    pub async fn calls(&self) -> Vec<String> {
        self.state.lock().await.calls.clone()
    }

    async fn record(&self, call: String) {
        let mut state = self.state.lock().await;
        state.calls.push(call);
        if let Some((threshold, signal)) = &state.cancel_after {
            if state.calls.len() >= *threshold {
                signal.cancel();
            }
        }
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.record(format!("navigate {url}")).await;
        let mut state = self.state.lock().await;
        if state.fail_urls.contains(url) {
            return Err(DriverError::NavigationFailed(url.to_string()));
        }
        state.current_url = Some(url.to_string());
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        self.record(format!("click {selector}")).await;
        if self.state.lock().await.fail_selectors.contains(selector) {
            return Err(DriverError::ElementNotFound(selector.to_string()));
        }
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), DriverError> {
        self.record(format!("type {selector} {text}")).await;
        if self.state.lock().await.fail_selectors.contains(selector) {
            return Err(DriverError::ElementNotFound(selector.to_string()));
        }
        Ok(())
    }

    async fn wait(&self, seconds: f64) -> Result<(), DriverError> {
        // Virtual wait: recorded but never slept, so tests stay fast
        self.record(format!("wait {seconds}")).await;
        Ok(())
    }

    async fn screenshot(&self, path: &str) -> Result<(), DriverError> {
        self.record(format!("screenshot {path}")).await;
        Ok(())
    }

    async fn element_present(&self, selector: &str) -> Result<bool, DriverError> {
        self.record(format!("element_present {selector}")).await;
        Ok(!self.state.lock().await.absent_selectors.contains(selector))
    }

    async fn evaluate_script(&self, code: &str) -> Result<Value, DriverError> {
        self.record(format!("evaluate_script {code}")).await;
        Ok(self
            .state
            .lock()
            .await
            .script_results
            .pop_front()
            .unwrap_or(Value::Bool(false)))
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self
            .state
            .lock()
            .await
            .current_url
            .clone()
            .unwrap_or_else(|| "about:blank".to_string()))
    }
}

/// In-memory credential store keyed by (credential name, field)
#[derive(Debug, Clone, Default)]
pub struct MockCredentials {
    entries: HashMap<(String, String), String>,
}

impl MockCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, field: &str, value: &str) {
        self.entries
            .insert((name.to_string(), field.to_string()), value.to_string());
    }
}

#[async_trait]
impl CredentialLookup for MockCredentials {
    async fn resolve(&self, name: &str, field: &str) -> Result<String, LookupError> {
        self.entries
            .get(&(name.to_string(), field.to_string()))
            .cloned()
            .ok_or_else(|| LookupError::NotFound(format!("credential {name}.{field}")))
    }
}

/// In-memory template store mapping names to stored definitions
#[derive(Debug, Clone, Default)]
pub struct MockTemplates {
    templates: HashMap<String, Vec<ActionDefinition>>,
}

impl MockTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, actions: Vec<ActionDefinition>) {
        self.templates.insert(name.to_string(), actions);
    }
}

#[async_trait]
impl TemplateLookup for MockTemplates {
    async fn resolve(&self, name: &str) -> Result<Vec<ActionDefinition>, LookupError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(format!("template {name}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let driver = MockDriver::new();
        driver.navigate("https://example.com").await.unwrap();
        driver.click("#btn").await.unwrap();

        assert_eq!(
            driver.calls().await,
            vec!["navigate https://example.com", "click #btn"]
        );
        assert_eq!(driver.current_url().await.unwrap(), "https://example.com");
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let driver = MockDriver::new();
        driver.fail_on_selector("#broken").await;

        let err = driver.click("#broken").await.unwrap_err();
        assert_eq!(err.kind(), "element_not_found");
    }

    #[tokio::test]
    async fn test_element_presence_and_scripts() {
        let driver = MockDriver::new();
        driver.mark_absent("#gone").await;
        driver.push_script_result(json!(42)).await;

        assert!(driver.element_present("#here").await.unwrap());
        assert!(!driver.element_present("#gone").await.unwrap());
        assert_eq!(driver.evaluate_script("answer()").await.unwrap(), json!(42));
        // queue drained: scripts now evaluate to false
        assert_eq!(
            driver.evaluate_script("answer()").await.unwrap(),
            json!(false)
        );
    }

    #[tokio::test]
    async fn test_cancel_after_calls() {
        let driver = MockDriver::new();
        let signal = CancellationSignal::new();
        driver.cancel_after(2, signal.clone()).await;

        driver.click("#a").await.unwrap();
        assert!(!signal.is_cancelled());
        driver.click("#b").await.unwrap();
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_credential_lookup() {
        let mut creds = MockCredentials::new();
        creds.insert("gmail", "username", "alice@example.com");

        assert_eq!(
            creds.resolve("gmail", "username").await.unwrap(),
            "alice@example.com"
        );
        assert!(creds.resolve("gmail", "password").await.is_err());
    }

    #[tokio::test]
    async fn test_template_lookup_miss() {
        let templates = MockTemplates::new();
        assert!(matches!(
            templates.resolve("missing").await,
            Err(LookupError::NotFound(_))
        ));
    }
}
