use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use lurker_api::{Error, Transport, DEFAULT_RPS};

use crate::RateLimiter;

/// Every outbound call funnels through here: acquire the current rate
/// limiter, run the transport call, count the completion.
pub struct Gateway {
    transport: Arc<dyn Transport>,
    limiter: Mutex<Arc<RateLimiter>>,
    completed: AtomicU64,
}

impl Gateway {
    pub fn new(transport: Arc<dyn Transport>) -> Gateway {
        Gateway {
            transport,
            limiter: Mutex::new(Arc::new(RateLimiter::new(DEFAULT_RPS))),
            completed: AtomicU64::new(0),
        }
    }

    pub async fn call(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, Error> {
        // A call keeps the limiter it started against; swapping the limit
        // mid-flight does not migrate parked callers (see set_rate_limit).
        let limiter = self.current_limiter();
        limiter.acquire().await;
        let resp = self.transport.call(method, params).await?;
        self.completed.fetch_add(1, Ordering::Relaxed);
        Ok(resp)
    }

    /// `call`, decoding the payload into `R`.
    pub async fn fetch<R>(&self, method: &str, params: &[(&str, String)]) -> Result<R, Error>
    where
        R: serde::de::DeserializeOwned,
    {
        let value = self.call(method, params).await?;
        serde_json::from_value(value)
            .map_err(|err| Error::Unknown(format!("decoding {method} response: {err}")))
    }

    /// Replace the rate limiter with a fresh one running at `rps`.
    ///
    /// Replace, not mutate: the old window history is discarded, and callers
    /// already parked in the old instance finish against its stale window.
    /// `rps == 0` falls back to the default limit instead of failing.
    pub fn set_rate_limit(&self, rps: u32) {
        let rps = match rps {
            0 => {
                tracing::warn!(fallback = DEFAULT_RPS, "invalid rate limit 0, using default");
                DEFAULT_RPS
            }
            rps => rps,
        };
        *self.limiter.lock().expect("limiter slot poisoned") = Arc::new(RateLimiter::new(rps));
    }

    pub fn rate_limit(&self) -> u32 {
        self.current_limiter().limit()
    }

    /// Calls completed since the last counter reset.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Zero the completed-call counter at the start of an operation, so
    /// observers see counts relative to that operation only.
    pub fn reset_completed(&self) {
        self.completed.store(0, Ordering::Relaxed);
    }

    /// Callers currently parked waiting for admission.
    pub fn queued_calls(&self) -> usize {
        self.current_limiter().queued_calls()
    }

    fn current_limiter(&self) -> Arc<RateLimiter> {
        self.limiter.lock().expect("limiter slot poisoned").clone()
    }
}
