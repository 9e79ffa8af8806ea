mod gateway;
pub use gateway::Gateway;

mod http;
pub use http::HttpTransport;

mod limiter;
pub use limiter::RateLimiter;

mod progress;
pub use progress::{NoProgress, ProgressObserver};

mod session;
pub use session::{Session, SweepStats};

pub mod api {
    pub use lurker_api::*;
}
