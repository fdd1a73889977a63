/// JSON retrieval with bounded retry and exponential backoff.
///
/// Each attempt is a plain HTTP GET. A non-2xx status, a transport failure,
/// or a body that is not valid JSON all count as a failed attempt. After the
/// last permitted attempt the fetcher gives up and returns `None`; callers
/// never see an error.
///
/// # Injection
/// The transport (`JsonSource`) and the sleep function are parameters so
/// the retry schedule can be tested without a network or real delays.
/// The crawler binary passes the blocking reqwest client and
/// `std::thread::sleep`.

use std::time::Duration;

use serde_json::Value;

use crate::logging;
use crate::model::FetchError;

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Something that can GET a URL and return its body as parsed JSON.
pub trait JsonSource {
    fn get_json(&self, url: &str) -> Result<Value, FetchError>;
}

impl JsonSource for reqwest::blocking::Client {
    fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let response = self
            .get(url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response
            .text()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

/// Builds the blocking HTTP client used for upstream requests.
pub fn build_client(request_timeout: Duration) -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .timeout(request_timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// How many times to retry and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// Wait before the second attempt. Doubles for each later attempt.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self { max_retries, initial_backoff }
    }

    /// Delay after failed attempt `attempt` (0-based): `initial * 2^attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_backoff.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(500))
    }
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// Fetches `url` as JSON, retrying per `policy` and sleeping via `sleep`.
///
/// Returns `None` once every attempt has failed. The last failure is logged
/// at a level chosen by `logging::log_fetch_failure`.
pub fn fetch_with_retry<S, F>(
    source: &S,
    url: &str,
    policy: &RetryPolicy,
    mut sleep: F,
) -> Option<Value>
where
    S: JsonSource + ?Sized,
    F: FnMut(Duration),
{
    let mut attempt: u32 = 0;
    loop {
        match source.get_json(url) {
            Ok(json) => return Some(json),
            Err(err) => {
                if attempt >= policy.max_retries {
                    logging::log_fetch_failure(url, attempt + 1, &err);
                    return None;
                }
                let delay = policy.backoff_for(attempt);
                logging::debug(
                    logging::Stage::Fetch,
                    Some(url),
                    &format!(
                        "attempt {} failed ({}), retrying in {} ms",
                        attempt + 1,
                        err,
                        delay.as_millis()
                    ),
                );
                sleep(delay);
                attempt += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
