use async_trait::async_trait;
use lurker_api::{Error, Transport};

pub const API_URL: &str = "https://api.vk.com/method/";
pub const API_VERSION: &str = "5.131";

/// [`Transport`] over HTTP: form-POST to `{base}{method}`, credential and
/// protocol version as query parameters.
///
/// The token is optional at construction; a tokenless transport fails every
/// call with [`Error::MissingToken`] instead of failing up front, so a session
/// can come up without credentials and still report why calls do not work.
pub struct HttpTransport {
    client: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(token: Option<String>) -> HttpTransport {
        HttpTransport::with_base(API_URL, token)
    }

    pub fn with_base(base: impl Into<String>, token: Option<String>) -> HttpTransport {
        HttpTransport {
            client: reqwest::Client::new(),
            base: base.into(),
            token,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, Error> {
        let token = self.token.as_deref().ok_or(Error::MissingToken)?;
        let body: serde_json::Value = self
            .client
            .post(format!("{}{}", self.base, method))
            .query(&[("access_token", token), ("v", API_VERSION)])
            .form(params)
            .send()
            .await
            .map_err(Error::network)?
            .json()
            .await
            .map_err(Error::network)?;

        if let Some(err) = body.get("error") {
            return Err(Error::parse_payload(err));
        }
        match body.get("response") {
            Some(response) => Ok(response.clone()),
            None => Err(Error::Unknown(body.to_string())),
        }
    }
}
