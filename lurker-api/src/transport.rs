use async_trait::async_trait;

use crate::Error;

/// One outbound call against the remote API.
///
/// `params` are the method's form parameters; implementations add the access
/// credential and protocol version themselves. On success the returned value
/// is the payload inside the success envelope, with the envelope stripped.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, method: &str, params: &[(&str, String)])
        -> Result<serde_json::Value, Error>;
}
