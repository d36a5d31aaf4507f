//! HTTP plumbing shared by the catalog, detail, and page fetchers.
//!
//! All three endpoints live behind the same service, so client construction,
//! bearer auth, and the bounded-retry policy are defined once here.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::warn;
use url::Url;

use crate::error::{LyricatError, Result};
use crate::limit::RateLimiter;

/// User-Agent string for all outbound requests.
pub const USER_AGENT: &str = concat!("lyricat/", env!("CARGO_PKG_VERSION"));

/// Attempts per request before a transport error surfaces.
const MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between retries.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// Build the standard HTTP client: user agent, redirect cap, request timeout.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| LyricatError::Transport(format!("failed to build HTTP client: {e}")))
}

/// GET a URL with rate limiting and bounded retry on transport failures.
///
/// 5xx and 429 responses retry with exponential backoff; other non-success
/// statuses fail immediately.
pub async fn get_with_retry(
    client: &Client,
    url: &Url,
    access_token: Option<&str>,
    limiter: &RateLimiter,
) -> Result<String> {
    let mut last_err = None;

    for attempt in 0..MAX_ATTEMPTS {
        if attempt > 0 {
            let delay = RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
            warn!(%url, attempt, delay_ms = delay.as_millis() as u64, "retrying request");
            tokio::time::sleep(delay).await;
        }

        limiter.acquire().await;

        let mut request = client.get(url.as_str());
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response.text().await.map_err(|e| {
                        LyricatError::Transport(format!("{url}: body read failed: {e}"))
                    });
                }
                if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    last_err = Some(LyricatError::Transport(format!("{url}: HTTP {status}")));
                    continue;
                }
                return Err(LyricatError::Transport(format!("{url}: HTTP {status}")));
            }
            Err(e) => {
                last_err = Some(LyricatError::Transport(format!("{url}: {e}")));
            }
        }
    }

    Err(last_err.unwrap_or_else(|| LyricatError::Transport(format!("{url}: request failed"))))
}
