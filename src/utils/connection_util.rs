use std::time::Duration;

use log::debug;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::error::ExchangeError;
use crate::utils::key_util::Credentials;
use crate::utils::message_util::{build_query, build_signed_query, timestamp_ms};

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

pub fn build_http_client(timeout: Duration) -> anyhow::Result<Client> {
    let connector = native_tls::TlsConnector::builder().build()?;
    let client = Client::builder()
        .use_preconfigured_tls(connector)
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()?;
    Ok(client)
}

/// Shared REST session against the futures API: one HTTP client, one key.
pub struct RestConnection {
    http: Client,
    base_url: Url,
    credentials: Credentials,
    recv_window_ms: u64,
}

impl RestConnection {
    pub fn new(http: Client, base_url: Url, credentials: Credentials, recv_window_ms: u64) -> Self {
        Self {
            http,
            base_url,
            credentials,
            recv_window_ms,
        }
    }

    fn endpoint(&self, path: &str, query: &str) -> Result<Url, ExchangeError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| ExchangeError::Request(format!("{}: {}", path, e)))?;
        if !query.is_empty() {
            url.set_query(Some(query));
        }
        Ok(url)
    }

    pub async fn get_public<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let url = self.endpoint(path, &build_query(params))?;
        debug!("GET {}", url);
        let response = self.http.get(url).send().await?;
        decode_response(response).await
    }

    /// Sends a signed request; all parameters travel in the query string.
    pub async fn send_signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let query = build_signed_query(
            &self.credentials.signer,
            params,
            self.recv_window_ms,
            timestamp_ms(),
        )?;
        let url = self.endpoint(path, &query)?;
        debug!("{} {} (signed)", method, path);

        let response = self
            .http
            .request(method, url)
            .header("X-MBX-APIKEY", &self.credentials.api_key)
            .send()
            .await?;
        decode_response(response).await
    }
}

async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, ExchangeError> {
    let status = response.status();
    let body = response.text().await?;
    debug!("Response {}: {}", status, body);

    if !status.is_success() {
        return Err(api_error(status.as_u16(), &body));
    }
    serde_json::from_str(&body).map_err(|e| ExchangeError::Decode(format!("{}: {}", e, body)))
}

fn api_error(status: u16, body: &str) -> ExchangeError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(err) => ExchangeError::Api {
            status,
            code: err.code,
            msg: err.msg,
        },
        Err(_) => ExchangeError::Api {
            status,
            code: 0,
            msg: body.to_string(),
        },
    }
}
