use std::time::Duration;

use crate::Gateway;

/// Receives the gateway counters roughly once per second while a fan-out
/// operation is running. The consumer decides how to render them.
pub trait ProgressObserver {
    fn on_progress(&self, completed: u64, queued: usize);
}

/// Observer for callers that do not track progress.
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _completed: u64, _queued: usize) {}
}

/// Drive `fut` to completion, reporting the gateway counters to `observer`
/// once per second until it resolves.
///
/// The ticker only reads counters; it never goes through the rate limiter and
/// so never consumes any of the request budget it reports on.
pub(crate) async fn observed<F>(
    gateway: &Gateway,
    observer: &dyn ProgressObserver,
    fut: F,
) -> F::Output
where
    F: std::future::Future,
{
    tokio::pin!(fut);
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick of an interval fires immediately.
    tick.tick().await;
    loop {
        tokio::select! {
            out = &mut fut => return out,
            _ = tick.tick() => observer.on_progress(gateway.completed(), gateway.queued_calls()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lurker_api::{Error, Transport};
    use std::sync::{Arc, Mutex};

    struct Echo;

    #[async_trait]
    impl Transport for Echo {
        async fn call(
            &self,
            _method: &str,
            _params: &[(&str, String)],
        ) -> Result<serde_json::Value, Error> {
            Ok(serde_json::json!(1))
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(u64, usize)>>);

    impl ProgressObserver for Recorder {
        fn on_progress(&self, completed: u64, queued: usize) {
            self.0.lock().unwrap().push((completed, queued));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reports_once_per_second_until_done() {
        let gateway = Gateway::new(Arc::new(Echo));
        let recorder = Recorder::default();

        let out = observed(&gateway, &recorder, async {
            tokio::time::sleep(Duration::from_millis(3500)).await;
            42
        })
        .await;

        assert_eq!(out, 42);
        assert_eq!(recorder.0.lock().unwrap().len(), 3);
    }
}
