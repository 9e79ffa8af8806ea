use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use tokio::time::Instant;

/// Substituted for the window span when it is exactly zero, so the observed
/// rate stays finite after an instant burst.
const ZERO_SPAN: f64 = 0.000_001;

/// Floor for the park duration when pacing alone yields nothing to wait for;
/// the window then simply has to age before anyone can be admitted.
const MIN_PARK: Duration = Duration::from_millis(1);

/// Sliding-window admission control: at most `limit` completed calls per
/// rolling second, shared by every concurrent caller of one gateway.
///
/// The window holds the `limit` most recent admission timestamps. While it is
/// not full yet the observed rate is by definition under the limit, so a cold
/// limiter admits a burst of up to `limit` callers instantly.
pub struct RateLimiter {
    limit: u32,
    window: Mutex<VecDeque<Instant>>,
    queued: AtomicUsize,
}

impl RateLimiter {
    pub fn new(limit: u32) -> RateLimiter {
        assert!(limit > 0, "rate limit must be positive");
        RateLimiter {
            limit,
            window: Mutex::new(VecDeque::with_capacity(limit as usize)),
            queued: AtomicUsize::new(0),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Callers currently parked in `acquire`, for progress reporting.
    pub fn queued_calls(&self) -> usize {
        self.queued.load(Ordering::Relaxed)
    }

    /// Suspend until admitting the caller keeps the completed-call rate at or
    /// below `limit` per second, then record the admission timestamp.
    ///
    /// The admission check and the window update happen under a single lock
    /// acquisition, with no suspension point in between: no other task can
    /// observe the window mid-update.
    pub async fn acquire(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
        loop {
            let park = {
                let mut window = self.window.lock().expect("rate limiter window poisoned");
                let now = Instant::now();
                match self.park_duration(&window, now) {
                    Some(park) => Some(park),
                    None => {
                        if window.len() == self.limit as usize {
                            window.pop_front();
                        }
                        window.push_back(now);
                        self.queued.fetch_sub(1, Ordering::Relaxed);
                        None
                    }
                }
            };
            match park {
                Some(park) => tokio::time::sleep(park).await,
                None => return,
            }
        }
    }

    /// How long a caller should park before re-probing, or `None` to admit.
    fn park_duration(&self, window: &VecDeque<Instant>, now: Instant) -> Option<Duration> {
        if window.len() < self.limit as usize {
            return None;
        }
        let oldest = *window.front().expect("window is full");
        let mut span = (now - oldest).as_secs_f64();
        if span == 0.0 {
            span = ZERO_SPAN;
        }
        let observed = self.limit as f64 / span;
        if observed < self.limit as f64 {
            return None;
        }

        // Space parked callers 1/limit apart from each other and from the most
        // recent admission, so queue depth directly paces the retries. Once a
        // caller has waited out its pacing share, all that is left is for the
        // oldest stamp to age out of the one-second window.
        let newest = *window.back().expect("window is full");
        let elapsed = (now - newest).as_secs_f64();
        let interval = 1.0 / self.limit as f64;
        let paced = self.queued.load(Ordering::Relaxed) as f64 * interval - elapsed;
        if paced > 0.0 {
            Some(Duration::from_secs_f64(paced))
        } else {
            Some(Duration::from_secs_f64(1.0 - span).max(MIN_PARK))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn cold_limiter_admits_burst_instantly() {
        let limiter = RateLimiter::new(3);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(Instant::now() - start, Duration::ZERO);
        assert_eq!(limiter.queued_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn window_never_exceeds_limit() {
        let limiter = RateLimiter::new(3);
        let mut admitted = Vec::new();
        for _ in 0..10 {
            limiter.acquire().await;
            admitted.push(Instant::now());
        }
        // Any 4 consecutive admissions must span more than a second.
        for (i, later) in admitted.iter().enumerate().skip(3) {
            assert!(
                *later - admitted[i - 3] >= Duration::from_secs(1),
                "admissions {} and {} are {:?} apart",
                i - 3,
                i,
                *later - admitted[i - 3],
            );
        }
        assert_eq!(limiter.queued_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn racing_callers_all_get_admitted() {
        let limiter = Arc::new(RateLimiter::new(2));
        let admitted = futures::future::join_all((0..7).map(|_| {
            let limiter = limiter.clone();
            async move {
                limiter.acquire().await;
                Instant::now()
            }
        }))
        .await;
        assert_eq!(admitted.len(), 7);
        assert_eq!(limiter.queued_calls(), 0);

        let mut admitted = admitted;
        admitted.sort();
        for (i, later) in admitted.iter().enumerate().skip(2) {
            assert!(*later - admitted[i - 2] >= Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn queued_gauge_tracks_parked_callers() {
        let limiter = Arc::new(RateLimiter::new(1));
        limiter.acquire().await;

        let parked = tokio::spawn({
            let limiter = limiter.clone();
            async move { limiter.acquire().await }
        });
        tokio::task::yield_now().await;
        assert_eq!(limiter.queued_calls(), 1);

        parked.await.expect("parked caller panicked");
        assert_eq!(limiter.queued_calls(), 0);
    }
}
