//! JSON-over-HTTPS POST with bounded retries, shared by the provider clients

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::LlmError;

/// Exponential backoff: `base`, `2 * base`, `4 * base`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub retries: u32,
    pub base: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            retries: 3,
            base: Duration::from_secs(1),
        }
    }
}

impl Backoff {
    /// Wait before retry number `retry` (1-based)
    pub fn delay(&self, retry: u32) -> Duration {
        self.base * 2u32.saturating_pow(retry.saturating_sub(1))
    }
}

/// One provider endpoint with its fixed headers
pub struct Transport {
    http: Client,
    url: String,
    headers: HeaderMap,
    timeout: Duration,
    backoff: Backoff,
    transient: fn(u16) -> bool,
}

impl Transport {
    pub fn new(url: String, headers: HeaderMap, timeout: Duration, transient: fn(u16) -> bool) -> Result<Self, LlmError> {
        debug!(%url, ?timeout, "Transport::new: called");
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url,
            headers,
            timeout,
            backoff: Backoff::default(),
            transient,
        })
    }

    /// POST `body` and decode the reply
    ///
    /// Network failures, timeouts and transient statuses are retried with
    /// backoff. A 429 ends the call at once with [`LlmError::RateLimited`].
    pub async fn post<T: DeserializeOwned>(&self, body: &serde_json::Value) -> Result<T, LlmError> {
        let mut last = None;
        for attempt in 0..=self.backoff.retries {
            if attempt > 0 {
                let delay = self.backoff.delay(attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, url = %self.url, "Transport::post: backing off");
                tokio::time::sleep(delay).await;
            }

            let sent = self
                .http
                .post(self.url.as_str())
                .headers(self.headers.clone())
                .json(body)
                .send()
                .await;
            let response = match sent {
                Ok(response) => response,
                Err(e) => {
                    let err = if e.is_timeout() {
                        LlmError::Timeout(self.timeout)
                    } else {
                        LlmError::Network(e)
                    };
                    debug!(attempt, error = %err, "Transport::post: send failed");
                    last = Some(err);
                    continue;
                }
            };

            let status = response.status().as_u16();
            if response.status().is_success() {
                debug!(status, "Transport::post: ok");
                return Ok(response.json::<T>().await?);
            }

            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let err = LlmError::from_status(status, response.text().await.unwrap_or_default(), retry_after);

            let retry = (self.transient)(status) && !matches!(err, LlmError::RateLimited { .. });
            if !retry || attempt == self.backoff.retries {
                debug!(status, attempt, "Transport::post: giving up");
                return Err(err);
            }
            last = Some(err);
        }

        Err(last.unwrap_or_else(|| LlmError::InvalidResponse("request was never sent".to_string())))
    }
}

/// Header map from fixed name/value pairs; a value that is not valid header
/// text (such as a key with a newline) is reported as a bad key
pub fn headers(pairs: &[(&'static str, &str)]) -> Result<HeaderMap, LlmError> {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        let value = HeaderValue::from_str(value)
            .map_err(|_| LlmError::MissingApiKey(format!("{name} header value is not valid header text")))?;
        map.insert(HeaderName::from_static(*name), value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay(1), Duration::from_secs(1));
        assert_eq!(backoff.delay(2), Duration::from_secs(2));
        assert_eq!(backoff.delay(3), Duration::from_secs(4));
    }

    #[test]
    fn test_headers_reject_control_characters() {
        let map = headers(&[("x-api-key", "abc"), ("content-type", "application/json")]).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["x-api-key"], "abc");

        assert!(matches!(
            headers(&[("x-api-key", "bad\nkey")]),
            Err(LlmError::MissingApiKey(_))
        ));
    }
}
