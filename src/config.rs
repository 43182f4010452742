//! Engine, transport and per-open configuration.

use std::{sync::Arc, time::Duration};

use reqwest::cookie::Jar;

use crate::{constants::DEFAULT_USER_AGENT, metrics::Tags};

fn validate_tags(tags: &Tags) -> Result<(), String> {
    if tags.keys().any(|key| key.trim().is_empty()) {
        return Err("Tag names cannot be empty".to_string());
    }
    Ok(())
}

/// Settings shared by every session an [Engine][crate::Engine] opens.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Return connect failures as `Err` instead of a failed
    /// [ResponseSummary][crate::ResponseSummary].
    pub throw: bool,
    /// Capacity of the channel between the reader task and the control loop.
    pub channel_capacity: usize,
    /// Tags added to every sample, before the per-open tags.
    pub tags: Tags,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            throw: false,
            channel_capacity: 16,
            tags: Tags::new(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect-failure policy.
    #[must_use]
    pub fn throw(mut self, throw: bool) -> Self {
        self.throw = throw;
        self
    }

    /// Set the reader channel capacity.
    #[must_use]
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Add a tag applied to every session.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error message string if any field has an invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.channel_capacity == 0 {
            return Err("Channel capacity must be > 0".to_string());
        }
        validate_tags(&self.tags)
    }
}

/// How the HTTP client is built. All sessions of one engine share it, except that a per-open
/// cookie jar gets its own client.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Default `User-Agent`, request headers can override it.
    pub user_agent: String,
    pub connect_timeout: Option<Duration>,
    /// TLS settings. ALPN is always forced to `http/1.1`.
    pub tls: Option<Arc<rustls::ClientConfig>>,
    /// Jar used when the open call does not bring its own. A fresh one is created when unset.
    pub cookie_jar: Option<Arc<Jar>>,
    /// Never keep idle connections around for later sessions.
    pub no_connection_reuse: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: None,
            tls: None,
            cookie_jar: None,
            no_connection_reuse: false,
        }
    }
}

impl TransportConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn tls(mut self, tls: Arc<rustls::ClientConfig>) -> Self {
        self.tls = Some(tls);
        self
    }

    #[must_use]
    pub fn cookie_jar(mut self, jar: Arc<Jar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    #[must_use]
    pub fn no_connection_reuse(mut self, no_reuse: bool) -> Self {
        self.no_connection_reuse = no_reuse;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error message string if any field has an invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if http::HeaderValue::from_str(&self.user_agent).is_err() {
            return Err("User agent is not a valid header value".to_string());
        }
        if self.connect_timeout.is_some_and(|t| t.is_zero()) {
            return Err("Connect timeout must be > 0".to_string());
        }
        Ok(())
    }
}

/// Per-open options.
///
/// `method` and `body` are trimmed when the request is built. An empty method means `GET`, an
/// empty body sends none.
#[derive(Clone, Debug, Default)]
pub struct OpenParams {
    /// Header name and value pairs, later pairs replace earlier ones with the same name.
    pub headers: Vec<(String, String)>,
    pub tags: Tags,
    /// Cookie jar for this session only.
    pub jar: Option<Arc<Jar>>,
    pub method: String,
    pub body: String,
}

impl OpenParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn jar(mut self, jar: Arc<Jar>) -> Self {
        self.jar = Some(jar);
        self
    }

    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Validate the options that do not depend on the request.
    ///
    /// Bad methods or header values are reported when the request is built, as connect failures.
    ///
    /// # Errors
    ///
    /// Returns an error message string if any field has an invalid value.
    pub fn validate(&self) -> Result<(), String> {
        validate_tags(&self.tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let engine = EngineConfig::default();
        assert!(!engine.throw);
        assert_eq!(engine.channel_capacity, 16);
        assert!(engine.tags.is_empty());

        let transport = TransportConfig::default();
        assert!(transport.user_agent.starts_with("sseload/"));
        assert!(transport.connect_timeout.is_none());
        assert!(transport.tls.is_none());
        assert!(transport.cookie_jar.is_none());
        assert!(!transport.no_connection_reuse);

        let params = OpenParams::default();
        assert!(params.headers.is_empty());
        assert!(params.method.is_empty());
        assert!(params.body.is_empty());
        assert!(params.jar.is_none());
    }

    #[test]
    fn test_builder_chain() {
        let engine = EngineConfig::new()
            .throw(true)
            .channel_capacity(4)
            .tag("scenario", "smoke");
        assert!(engine.throw);
        assert_eq!(engine.channel_capacity, 4);
        assert_eq!(engine.tags["scenario"], "smoke");

        let transport = TransportConfig::new()
            .user_agent("probe/1.0")
            .connect_timeout(Duration::from_secs(3))
            .no_connection_reuse(true);
        assert_eq!(transport.user_agent, "probe/1.0");
        assert_eq!(transport.connect_timeout, Some(Duration::from_secs(3)));
        assert!(transport.no_connection_reuse);

        let params = OpenParams::new()
            .method(" POST ")
            .body(r#"{"ping": true}"#)
            .header("Authorization", "Bearer token")
            .header("Authorization", "Bearer other")
            .tag("my_tag", "value");
        assert_eq!(params.method, " POST ");
        assert_eq!(params.headers.len(), 2);
        assert_eq!(params.tags["my_tag"], "value");
    }

    #[test]
    fn test_validate() {
        assert!(EngineConfig::default().validate().is_ok());
        assert!(TransportConfig::default().validate().is_ok());
        assert!(OpenParams::default().validate().is_ok());

        assert!(EngineConfig::new().channel_capacity(0).validate().is_err());
        assert!(EngineConfig::new().tag(" ", "x").validate().is_err());

        assert!(
            TransportConfig::new()
                .user_agent("bad\nagent")
                .validate()
                .is_err()
        );
        assert!(
            TransportConfig::new()
                .connect_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );

        assert!(OpenParams::new().tag("", "x").validate().is_err());
    }
}
