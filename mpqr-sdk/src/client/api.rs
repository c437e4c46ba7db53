//! Provider API client (this system → provider).
//!
//! Stateless apart from the shared connection pool: credentials are passed
//! into every call, so one client serves any number of accounts and picks
//! up credential reloads without being rebuilt.

use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use super::ClientError;
use crate::config::PaymentOrderCredentials;
use crate::objects::merchant_order::{MerchantOrder, MerchantOrderSearch};
use crate::objects::qr_order::{CreateQrOrderRequest, CreateQrOrderResponse};

/// Typed HTTP client for the provider's in-store and merchant order APIs.
#[derive(Debug, Clone, Default)]
pub struct MercadoPagoClient {
    http: Client,
}

impl MercadoPagoClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Issue an authenticated request and return the decoded JSON body.
    ///
    /// * Status 400 and above fails with [`ClientError::ProviderApi`]; the
    ///   raw body is logged.
    /// * An empty body yields an empty JSON object.
    /// * Network failures and timeouts fail with [`ClientError::Transport`].
    ///
    /// `segments` are appended to the base URL one path segment each, so an
    /// identifier can never leave its segment.
    ///
    /// The credentials' timeout applies to the whole call. Nothing is retried.
    pub async fn request(
        &self,
        credentials: &PaymentOrderCredentials,
        method: Method,
        segments: &[&str],
        payload: Option<&Value>,
        query: &[(&str, &str)],
    ) -> Result<Value, ClientError> {
        let url = endpoint_url(credentials.api_base_url()?, segments)?;
        let endpoint = url.path().to_owned();

        let mut request = self
            .http
            .request(method.clone(), url)
            .bearer_auth(&credentials.access_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .timeout(credentials.timeout);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(payload) = payload {
            request = request.body(serde_json::to_vec(payload)?);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.as_u16() >= 400 {
            error!(
                %method,
                %endpoint,
                status = status.as_u16(),
                body = %body,
                "Provider API error"
            );
            return Err(ClientError::ProviderApi {
                status_code: status.as_u16(),
                body,
            });
        }

        debug!(%method, %endpoint, status = status.as_u16(), "Provider API call succeeded");

        if body.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// `POST /instore/orders/qr/seller/collectors/.../qrs` – create a QR order.
    pub async fn create_qr_order(
        &self,
        credentials: &PaymentOrderCredentials,
        order: &CreateQrOrderRequest,
    ) -> Result<CreateQrOrderResponse, ClientError> {
        let payload = serde_json::to_value(order)?;
        let segments = credentials.qr_order_segments();
        let body = self
            .request(credentials, Method::POST, &segments, Some(&payload), &[])
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    /// `GET /merchant_orders/{id}` – fetch one merchant order.
    pub async fn get_merchant_order(
        &self,
        credentials: &PaymentOrderCredentials,
        merchant_order_id: &str,
    ) -> Result<MerchantOrder, ClientError> {
        let body = self
            .request(
                credentials,
                Method::GET,
                &["merchant_orders", merchant_order_id],
                None,
                &[],
            )
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    /// `GET /merchant_orders/search` – merchant orders for a correlation key,
    /// newest first.
    pub async fn search_merchant_orders(
        &self,
        credentials: &PaymentOrderCredentials,
        external_reference: &str,
    ) -> Result<MerchantOrderSearch, ClientError> {
        let query = [
            ("external_reference", external_reference),
            ("sort", "date_created"),
            ("criteria", "desc"),
        ];
        let body = self
            .request(
                credentials,
                Method::GET,
                &["merchant_orders", "search"],
                None,
                &query,
            )
            .await?;
        Ok(serde_json::from_value(body)?)
    }
}

/// Append `segments` to `base`, keeping any path prefix the base carries.
///
/// Each segment is percent-encoded on its own: `/`, `?` and `#` inside an
/// identifier stay part of that segment.
fn endpoint_url(mut base: Url, segments: &[&str]) -> Result<Url, ClientError> {
    base.path_segments_mut()
        .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn credentials(server: &MockServer) -> PaymentOrderCredentials {
        PaymentOrderCredentials::new("TEST-token", "123", "STORE1", "POS1")
            .with_base_url(server.base_url().parse().unwrap())
    }

    #[tokio::test]
    async fn test_bearer_token_and_query_are_sent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/merchant_orders/search")
                    .header("Authorization", "Bearer TEST-token")
                    .query_param("external_reference", "SO042")
                    .query_param("sort", "date_created")
                    .query_param("criteria", "desc");
                then.status(200)
                    .json_body(json!({"elements": [{"id": 7, "order_status": "paid"}], "total": 1}));
            })
            .await;

        let page = MercadoPagoClient::new()
            .search_merchant_orders(&credentials(&server), "SO042")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(page.into_latest().and_then(|order| order.id), Some(7));
    }

    #[tokio::test]
    async fn test_error_status_keeps_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/merchant_orders/1");
                then.status(401).body(r#"{"message":"invalid token"}"#);
            })
            .await;

        let err = MercadoPagoClient::new()
            .get_merchant_order(&credentials(&server), "1")
            .await
            .unwrap_err();

        match err {
            ClientError::ProviderApi { status_code, body } => {
                assert_eq!(status_code, 401);
                assert!(body.contains("invalid token"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_not_found_is_detectable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/merchant_orders/404");
                then.status(404);
            })
            .await;

        let err = MercadoPagoClient::new()
            .get_merchant_order(&credentials(&server), "404")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn test_empty_body_is_empty_object() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/empty");
                then.status(200);
            })
            .await;

        let body = MercadoPagoClient::new()
            .request(&credentials(&server), Method::POST, &["empty"], None, &[])
            .await
            .unwrap();
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/merchant_orders/slow");
                then.status(200)
                    .delay(Duration::from_secs(2))
                    .json_body(json!({}));
            })
            .await;

        let creds = credentials(&server).with_timeout(Duration::from_millis(100));
        let err = MercadoPagoClient::new()
            .get_merchant_order(&creds, "slow")
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_create_order_posts_to_topology_path() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/instore/orders/qr/seller/collectors/123/stores/STORE1/pos/POS1/qrs")
                    .header("content-type", "application/json")
                    .json_body_partial(r#"{"external_reference": "SO042", "total_amount": 10.0}"#);
                then.status(201)
                    .json_body(json!({"qr_data": "000201...", "in_store_order_id": "abc-1"}));
            })
            .await;

        let order = CreateQrOrderRequest {
            external_reference: "SO042".into(),
            notification_url: None,
            title: "SO042".into(),
            description: "SO042".into(),
            total_amount: rust_decimal::Decimal::new(10, 0),
            items: vec![],
        };
        let response = MercadoPagoClient::new()
            .create_qr_order(&credentials(&server), &order)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.qr_data.as_deref(), Some("000201..."));
        assert_eq!(response.in_store_order_id.as_deref(), Some("abc-1"));
    }

    #[test]
    fn test_endpoint_url_keeps_prefix() {
        for base in ["https://proxy.internal/mp/", "https://proxy.internal/mp"] {
            let url = endpoint_url(base.parse().unwrap(), &["merchant_orders", "1"]).unwrap();
            assert_eq!(url.as_str(), "https://proxy.internal/mp/merchant_orders/1");
        }
        let url = endpoint_url(
            "https://api.mercadopago.com/".parse().unwrap(),
            &["merchant_orders", "search"],
        )
        .unwrap();
        assert_eq!(url.as_str(), "https://api.mercadopago.com/merchant_orders/search");
    }

    #[test]
    fn test_endpoint_url_encodes_identifiers() {
        let base: Url = "https://api.mercadopago.com/".parse().unwrap();
        let url = endpoint_url(base.clone(), &["merchant_orders", "../users/me"]).unwrap();
        assert_eq!(url.path(), "/merchant_orders/..%2Fusers%2Fme");
        assert_eq!(url.query(), None);

        let url = endpoint_url(base, &["merchant_orders", "1?x=y#top"]).unwrap();
        assert_eq!(url.path(), "/merchant_orders/1%3Fx=y%23top");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_endpoint_url_rejects_opaque_base() {
        let base: Url = "mailto:payments@example.com".parse().unwrap();
        let err = endpoint_url(base, &["merchant_orders"]).unwrap_err();
        assert!(matches!(err, ClientError::Url(_)));
    }

    #[tokio::test]
    async fn test_merchant_order_id_cannot_reach_other_endpoints() {
        let server = MockServer::start_async().await;
        let other = server
            .mock_async(|when, then| {
                when.method(GET).path("/users/me");
                then.status(200).json_body(json!({"id": 1}));
            })
            .await;
        let merchant_order = server
            .mock_async(|when, then| {
                when.method(GET).path_contains("/merchant_orders/");
                then.status(200).json_body(json!({"id": 5}));
            })
            .await;

        let client = MercadoPagoClient::new();
        for id in ["../users/me", "1?x=y", "2#top"] {
            let order = client
                .get_merchant_order(&credentials(&server), id)
                .await
                .unwrap();
            assert_eq!(order.id, Some(5), "id {id:?}");
        }

        assert_eq!(other.hits_async().await, 0);
        assert_eq!(merchant_order.hits_async().await, 3);
    }

    #[tokio::test]
    async fn test_base_url_prefix_is_kept() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/mp/merchant_orders/1");
                then.status(200).json_body(json!({"id": 1}));
            })
            .await;

        let creds = PaymentOrderCredentials::new("TEST-token", "123", "STORE1", "POS1")
            .with_base_url(format!("{}/mp/", server.base_url()).parse().unwrap());
        let order = MercadoPagoClient::new()
            .get_merchant_order(&creds, "1")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(order.id, Some(1));
    }
}
