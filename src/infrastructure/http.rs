use crate::domain::payment::{InitiationResponse, PaymentRequest, StatusQuery, StatusResponse};
use crate::domain::ports::PaymentGateway;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub const REQUEST_PATH: &str = "/api/payments/request";
pub const STATUS_PATH: &str = "/api/payments/status";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Talks to the platform's payments API over HTTP.
///
/// Holds no credentials. The caller's bearer token comes with each call and
/// is attached to that request only.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(PaymentError::Config(format!(
                "gateway url must start with http:// or https://, got '{base_url}'"
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Builds a JSON `POST` to `path`, authorised with `token` if given.
    pub fn build_request<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> RequestBuilder {
        let builder = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn post<B, T>(&self, path: &str, body: &B, token: Option<&str>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .build_request(path, body, token)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        debug!(%path, %status, len = bytes.len(), "gateway responded");

        // The API reports business failures as JSON even on 4xx/5xx.
        match serde_json::from_slice(&bytes) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(PaymentError::Http {
                status: status.as_u16(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn request_payment(&self, request: &PaymentRequest, token: Option<&str>) -> Result<InitiationResponse> {
        self.post(REQUEST_PATH, request, token).await
    }

    async fn check_status(&self, query: &StatusQuery, token: Option<&str>) -> Result<StatusResponse> {
        self.post(STATUS_PATH, query, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::access::{RequestContext, Role};
    use crate::domain::payment::Amount;
    use crate::domain::phone::PhoneNumber;

    fn gateway() -> HttpGateway {
        HttpGateway::new("https://tickets.example.rw/", DEFAULT_TIMEOUT).unwrap()
    }

    fn query() -> StatusQuery {
        StatusQuery {
            request_transaction_id: "REQ-1".to_string(),
            intouchpay_transaction_id: "ITP-1".to_string(),
        }
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = HttpGateway::new("tickets.example.rw", DEFAULT_TIMEOUT).err().unwrap();
        assert!(matches!(err, PaymentError::Config(_)));
    }

    #[test]
    fn test_request_carries_explicit_token() {
        let request = PaymentRequest {
            phone_number: PhoneNumber::parse("250788123456").unwrap(),
            amount: Amount::new(6000).unwrap(),
            description: "Ticket".to_string(),
        };

        let built = gateway()
            .build_request(REQUEST_PATH, &request, Some("abc123"))
            .build()
            .unwrap();

        assert_eq!(built.method(), reqwest::Method::POST);
        assert_eq!(built.url().as_str(), "https://tickets.example.rw/api/payments/request");
        assert_eq!(built.headers()["authorization"], "Bearer abc123");
        assert_eq!(built.headers()["content-type"], "application/json");

        let body: serde_json::Value =
            serde_json::from_slice(built.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body["phoneNumber"], "250788123456");
        assert_eq!(body["amount"], 6000);
    }

    #[test]
    fn test_requests_without_token_are_anonymous() {
        let built = gateway()
            .build_request(STATUS_PATH, &query(), None)
            .build()
            .unwrap();

        assert!(built.headers().get("authorization").is_none());
        let body: serde_json::Value =
            serde_json::from_slice(built.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body["requestTransactionId"], "REQ-1");
        assert_eq!(body["intouchpayTransactionId"], "ITP-1");
    }

    #[test]
    fn test_each_caller_sends_its_own_token() {
        let gateway = gateway();
        let alice = RequestContext::new(Role::Client, Some("alice-token".to_string()));
        let ops = RequestContext::new(Role::Team, Some("ops-token".to_string()));

        let first = gateway
            .build_request(STATUS_PATH, &query(), alice.token())
            .build()
            .unwrap();
        let second = gateway
            .build_request(STATUS_PATH, &query(), ops.token())
            .build()
            .unwrap();

        assert_eq!(first.headers()["authorization"], "Bearer alice-token");
        assert_eq!(second.headers()["authorization"], "Bearer ops-token");
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_transport_error() {
        let gateway = HttpGateway::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();

        let err = gateway.check_status(&query(), Some("abc123")).await.unwrap_err();
        assert!(matches!(err, PaymentError::Transport(_)));
    }
}
