use crate::error::CrawlError;
use crate::limiter::RateLimiter;
use crate::util::jitter;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const MY_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const MAX_ATTEMPTS: u32 = 6;
const INITIAL_BACKOFF: Duration = Duration::from_millis(400);
const BACKOFF_MULTIPLIER: f64 = 1.9;
const MAX_BACKOFF: Duration = Duration::from_secs(6);
const MAX_RETRY_AFTER: Duration = Duration::from_secs(10);

/// Robust GET with retries, jittered backoff, and `Retry-After` honoring. Every request
/// first goes through the shared rate limiter.
pub struct Fetcher {
    client: Client,
    limiter: Arc<RateLimiter>,
    referer: String,
}

impl Fetcher {
    pub fn new(limiter: Arc<RateLimiter>, referer: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            limiter,
            referer: referer.into(),
        })
    }

    /// Fetches `url`, returning `None` if every attempt fails. Never propagates an error:
    /// callers record the code with empty fields on failure, per the crawler's
    /// never-abort-on-fetch-failure policy.
    pub async fn get_text(&self, url: &str) -> Option<String> {
        let mut backoff = INITIAL_BACKOFF;

        for attempt in 1..=MAX_ATTEMPTS {
            self.limiter.acquire(1).await;

            let result = self
                .client
                .get(url)
                .header(USER_AGENT, MY_USER_AGENT)
                .header(ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
                .header(ACCEPT_LANGUAGE, "en-AU,en;q=0.9")
                .header(REFERER, self.referer.as_str())
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => match resp.text().await {
                    Ok(body) if !body.trim().is_empty() => return Some(body),
                    Ok(_) => {
                        warn!("[backoff] empty body from {url} (attempt {attempt})");
                    }
                    Err(e) => {
                        warn!("[backoff] failed to decode body from {url}: {e}");
                    }
                },
                Ok(resp) if is_throttled(resp.status().as_u16()) => {
                    let status = resp.status().as_u16();
                    let retry_after = resp
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .map(|secs| Duration::from_secs(secs).min(MAX_RETRY_AFTER));
                    let pause = retry_after.unwrap_or(backoff);
                    let err = CrawlError::Throttled { url: url.to_string(), status };
                    warn!("[backoff] {err}, cooling off {pause:?}");
                    self.limiter.cooloff(jitter(pause)).await;
                }
                Ok(resp) => {
                    warn!(
                        "[backoff] non-success status {} from {url} (attempt {attempt})",
                        resp.status()
                    );
                }
                Err(source) => {
                    let err = CrawlError::Transport { url: url.to_string(), source };
                    warn!("[backoff] {err} (attempt {attempt})");
                }
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(jitter(backoff)).await;
                backoff = Duration::from_secs_f64(
                    (backoff.as_secs_f64() * BACKOFF_MULTIPLIER).min(MAX_BACKOFF.as_secs_f64()),
                );
            }
        }

        None
    }
}

fn is_throttled(status: u16) -> bool {
    matches!(status, 429 | 403 | 503)
}
