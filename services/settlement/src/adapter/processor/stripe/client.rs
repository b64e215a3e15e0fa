use std::result::Result;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use hyper::Method;
use serde::de::DeserializeOwned;
use serde::ser::Serialize;
use tokio_native_tls::TlsConnector;

use carshare_common::logging::AppLogContext;

use super::super::base_client::{BaseClient, BaseClientError, BaseClientErrorReason};

const API_VERSION: &str = "v1";

pub(super) struct AppStripeClient {
    secret_key: String,
    _base_client: BaseClient,
}

impl AppStripeClient {
    pub(super) async fn try_build(
        logctx: Arc<AppLogContext>,
        secure_connector: &TlsConnector,
        host: String,
        port: u16,
        secret_key: String,
    ) -> Result<Self, BaseClientError> {
        let _base_client = BaseClient::try_build(logctx, secure_connector, host, port).await?;
        Ok(Self {
            secret_key,
            _base_client,
        })
    }

    // Stripe endpoints consume form-urlencoded bodies, the response is
    // always a JSON document
    pub(super) async fn execute_form<D, S>(
        &mut self,
        resource_path: &str,
        method: Method,
        body_obj: &S,
        mut headers: Vec<(HeaderName, HeaderValue)>,
    ) -> Result<D, BaseClientError>
    where
        D: DeserializeOwned + Send + 'static,
        S: Serialize + Send + 'static,
    {
        let value = format!("Bearer {}", self.secret_key.as_str());
        let pairs = [
            (
                AUTHORIZATION,
                HeaderValue::from_str(value.as_str()).map_err(|_e| BaseClientError {
                    reason: BaseClientErrorReason::HttpRequest(
                        "auth-header-parse-fail".to_string(),
                    ),
                })?,
            ),
            (ACCEPT, HeaderValue::from_str("application/json").unwrap()),
            (
                CONTENT_TYPE,
                HeaderValue::from_str("application/x-www-form-urlencoded").unwrap(),
            ),
        ];
        headers.extend(pairs.into_iter());
        let body = {
            let serial = serde_qs::to_string(body_obj).map_err(|e| BaseClientError {
                reason: BaseClientErrorReason::SerialiseFailure(e.to_string()),
            })?;
            Full::new(Bytes::from(serial))
        };
        let uri = "/".to_string() + API_VERSION + resource_path;
        let (raw, status) = self
            ._base_client
            .execute_form(uri.as_str(), method, body, headers)
            .await?;
        if status.is_success() {
            serde_json::from_slice::<D>(raw.as_slice()).map_err(|e| BaseClientError {
                reason: BaseClientErrorReason::DeserialiseFailure(
                    Box::new(e.to_string()),
                    status.as_u16(),
                ),
            })
        } else {
            let body_text = String::from_utf8(raw).unwrap_or("non-utf8-response".to_string());
            Err(BaseClientError {
                reason: BaseClientErrorReason::DeserialiseFailure(
                    Box::new(body_text),
                    status.as_u16(),
                ),
            })
        }
    } // end of fn execute_form
} // end of impl AppStripeClient
