/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Method/header/timeout/retry engine behind webhook, Slack, Teams and Loki
//! (spec.md §4.7). Grounded on `aurowora-log_loki`'s `ureq`-based request
//! construction in `lib.rs::Loki::start`/`task.rs::LokiTask::new`, simplified
//! from its exponential-backoff dead-letter queue to the spec's fixed-delay
//! retry loop (spec.md §8 "HTTP transport retry" scenario).

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::str::FromStr;
use std::thread::sleep;
use std::time::Duration;
use url::Url;

/// One of the five methods this transport may speak (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(Error::InvalidMethod(other.to_owned())),
        }
    }
}

/// Builder for `HttpTransport`, validated at `build()` (spec.md §4.7
/// "Constructor-validated").
pub struct HttpTransportBuilder {
    method: HttpMethod,
    headers: HashMap<String, String>,
    timeout_secs: u64,
    retries: u32,
    retry_delay: Duration,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            method: HttpMethod::Post,
            headers: HashMap::new(),
            timeout_secs: 30,
            retries: 0,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl HttpTransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn build(mut self) -> Result<HttpTransport> {
        if !(1..=300).contains(&self.timeout_secs) {
            return Err(Error::InvalidTimeout(self.timeout_secs));
        }
        if self.retries > 10 {
            return Err(Error::InvalidRetries(self.retries));
        }
        self.headers
            .entry("Content-Type".to_owned())
            .or_insert_with(|| "application/json".to_owned());

        Ok(HttpTransport {
            method: self.method,
            headers: self.headers,
            timeout: Duration::from_secs(self.timeout_secs),
            retries: self.retries,
            retry_delay: self.retry_delay,
        })
    }
}

/// The shared HTTP engine behind the webhook/Slack/Teams/Loki handlers.
pub struct HttpTransport {
    method: HttpMethod,
    headers: HashMap<String, String>,
    timeout: Duration,
    retries: u32,
    retry_delay: Duration,
}

impl HttpTransport {
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::new()
    }

    /// Sends `payload` to `url`, retrying on failure up to `retries` times
    /// with a fixed `retry_delay` between attempts (spec.md §4.7 "send").
    /// Returns `true` iff an attempt received a 2xx/3xx response.
    pub fn send(&self, url: &str, payload: &[u8]) -> bool {
        let parsed = match Url::parse(url) {
            Ok(u) => u,
            Err(_) => return false,
        };

        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();

        let attempts = self.retries + 1;
        for attempt in 0..attempts {
            let mut request = agent.request_url(self.method.as_str(), &parsed);
            for (k, v) in &self.headers {
                request = request.set(k, v);
            }

            let result = request.send_bytes(payload);
            let success = match &result {
                Ok(resp) => (200..400).contains(&resp.status()),
                Err(ureq::Error::Status(code, _)) => (200..400).contains(code),
                Err(ureq::Error::Transport(_)) => false,
            };

            if success {
                return true;
            }
            if attempt + 1 < attempts {
                sleep(self.retry_delay);
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_timeout() {
        assert!(HttpTransport::builder().timeout_secs(0).build().is_err());
        assert!(HttpTransport::builder().timeout_secs(301).build().is_err());
    }

    #[test]
    fn rejects_too_many_retries() {
        assert!(HttpTransport::builder().retries(11).build().is_err());
    }

    #[test]
    fn default_content_type_is_added_when_absent() {
        let t = HttpTransport::builder().build().unwrap();
        assert_eq!(t.headers.get("Content-Type").unwrap(), "application/json");
    }

    #[test]
    fn explicit_content_type_is_preserved() {
        let t = HttpTransport::builder().header("Content-Type", "text/plain").build().unwrap();
        assert_eq!(t.headers.get("Content-Type").unwrap(), "text/plain");
    }

    #[test]
    fn send_fails_fast_on_invalid_url() {
        let t = HttpTransport::builder().retries(5).build().unwrap();
        assert!(!t.send("not a url", b"{}"));
    }
}
