mod client;
mod mock;
mod resources;

use std::boxed::Box;
use std::result::Result;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use hyper::header::{HeaderName, HeaderValue};
use hyper::Method;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio_native_tls::{native_tls, TlsConnector as TlsConnectorWrapper};

use carshare_common::api::dto::CurrencyDto;
use carshare_common::confidentiality::AbstractConfidentiality;
use carshare_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use self::client::AppStripeClient;
use self::resources::{
    CreatePaymentIntent, CreateRefund, CreateTransferReversal, LastPaymentError, PaymentIntent,
    PaymentIntentMetadata, PaymentIntentStatus, RefundResource, RefundStatus,
    StripeApiErrorEnvelope, TransferReversal,
};
use super::{
    AppProcessorErrorReason, AppProcessorRefundRequest, AppProcessorRefundResult,
    AppProcessorReversalRequest, AppProcessorReversalResult, BaseClientError,
    BaseClientErrorReason,
};
pub(super) use mock::MockProcessorStripeCtx;

use crate::model::{ChargeAttemptModel, ChargeAttemptState};

const HEADER_NAME_IDEMPOTENCY: &str = "Idempotency-Key";

#[async_trait]
pub(super) trait AbstStripeContext: Send + Sync {
    async fn capture_fee(
        &self,
        attempt: &ChargeAttemptModel,
    ) -> Result<ChargeAttemptState, AppProcessorErrorReason>;

    async fn refund_capture(
        &self,
        req: AppProcessorRefundRequest,
    ) -> Result<AppProcessorRefundResult, AppProcessorErrorReason>;

    async fn reverse_transfer(
        &self,
        req: AppProcessorReversalRequest,
    ) -> Result<AppProcessorReversalResult, AppProcessorErrorReason>;
}

pub(super) struct AppProcessorStripeCtx {
    host: String,
    port: u16,
    secure_connector: TlsConnectorWrapper,
    api_key: String,
    logctx: Arc<AppLogContext>,
}

fn amount_to_minor_unit(
    amount: &Decimal,
    currency: &CurrencyDto,
) -> Result<i64, AppProcessorErrorReason> {
    let scale = currency.amount_fraction_scale();
    let shifted = amount
        .checked_mul(Decimal::from(10i64.pow(scale)))
        .ok_or(AppProcessorErrorReason::AmountPrecision(format!(
            "minor-unit-overflow: {amount}"
        )))?;
    if shifted.fract() != Decimal::ZERO {
        // the caller rounds to currency precision before reaching the
        // processor, extra fraction digits mean a programming error
        return Err(AppProcessorErrorReason::AmountPrecision(format!(
            "fraction-beyond-scale: {amount}, {currency}"
        )));
    }
    shifted
        .to_i64()
        .ok_or(AppProcessorErrorReason::AmountPrecision(format!(
            "minor-unit-overflow: {amount}"
        )))
}

fn decline_reason(detail: Option<&LastPaymentError>) -> String {
    let code = detail.and_then(|d| d.code.clone());
    let message = detail.and_then(|d| d.message.clone());
    match (code, message) {
        (Some(c), Some(m)) => format!("{c}: {m}"),
        (Some(c), None) => c,
        (None, Some(m)) => m,
        (None, None) => "declined-without-detail".to_string(),
    }
}

impl AppProcessorStripeCtx {
    pub(super) fn try_build(
        host: &str,
        port: u16,
        confidential_path: &str,
        cfdntl: Arc<Box<dyn AbstractConfidentiality>>,
        logctx: Arc<AppLogContext>,
    ) -> Result<Self, AppProcessorErrorReason> {
        let serial = cfdntl
            .try_get_payload(confidential_path)
            .map_err(|_e| AppProcessorErrorReason::MissingCredential)?;
        let api_key = serde_json::from_str::<String>(serial.as_str())
            .map_err(|_e| AppProcessorErrorReason::CredentialCorrupted)?;
        let secure_connector = {
            let mut builder = native_tls::TlsConnector::builder();
            builder.min_protocol_version(Some(native_tls::Protocol::Tlsv12));
            let c = builder
                .build()
                .map_err(|e| BaseClientError { reason: e.into() })?;
            c.into()
        };
        Ok(Self {
            host: host.to_string(),
            port,
            secure_connector,
            api_key,
            logctx,
        })
    } // end of fn try-build

    async fn _acquire_client(&self) -> Result<AppStripeClient, AppProcessorErrorReason> {
        let c = AppStripeClient::try_build(
            self.logctx.clone(),
            &self.secure_connector,
            self.host.clone(),
            self.port,
            self.api_key.clone(),
        )
        .await?;
        Ok(c)
    }

    fn _idempotency_header(token: &str) -> Vec<(HeaderName, HeaderValue)> {
        vec![(
            // header-name from-static does not allow uppercase word
            HeaderName::from_bytes(HEADER_NAME_IDEMPOTENCY.as_bytes()).unwrap(),
            HeaderValue::from_str(token).unwrap(),
        )]
    }

    fn _map_payment_intent(pi: PaymentIntent) -> ChargeAttemptState {
        match pi.status {
            PaymentIntentStatus::succeeded => ChargeAttemptState::Succeeded {
                gateway_charge_id: pi.id,
                completed_time: Utc::now(),
            },
            PaymentIntentStatus::requires_action => {
                ChargeAttemptState::RequiresAction { intent_ref: pi.id }
            }
            PaymentIntentStatus::requires_payment_method
            | PaymentIntentStatus::requires_confirmation
            | PaymentIntentStatus::canceled => ChargeAttemptState::Failed {
                decline_reason: decline_reason(pi.last_payment_error.as_ref()),
            },
            PaymentIntentStatus::processing | PaymentIntentStatus::requires_capture => {
                ChargeAttemptState::Unresolved { intent_ref: pi.id }
            }
        }
    }
} // end of impl AppProcessorStripeCtx

#[async_trait]
impl AbstStripeContext for AppProcessorStripeCtx {
    async fn capture_fee(
        &self,
        attempt: &ChargeAttemptModel,
    ) -> Result<ChargeAttemptState, AppProcessorErrorReason> {
        let _logctx = &self.logctx;
        let token_serial = attempt.meta.token().to_string();
        app_log_event!(_logctx, AppLogLevel::DEBUG, "charge-token: {token_serial}");
        let body_obj = CreatePaymentIntent {
            amount: amount_to_minor_unit(&attempt.amount, &attempt.currency)?,
            currency: attempt.currency.to_string().to_lowercase(),
            customer: attempt.meta.customer_ref().to_string(),
            payment_method: attempt.meta.instrument_ref().to_string(),
            confirm: true,
            off_session: true,
            description: format!(
                "carshare trip settlement, booking {}",
                attempt.meta.booking_id()
            ),
            metadata: PaymentIntentMetadata {
                booking_id: attempt.meta.booking_id(),
                charge_token: token_serial.clone(),
                retry: attempt.meta.attempt_nr() > 1,
                retry_attempt: attempt.meta.attempt_nr(),
                original_charge_token: attempt.meta.origin_token().map(|t| t.to_string()),
            },
        };
        let mut _client = self._acquire_client().await?;
        let hdrs = Self::_idempotency_header(token_serial.as_str());
        let result = _client
            .execute_form::<PaymentIntent, CreatePaymentIntent>(
                "/payment_intents",
                Method::POST,
                &body_obj,
                hdrs,
            )
            .await;
        match result {
            Ok(pi) => Ok(Self::_map_payment_intent(pi)),
            Err(BaseClientError {
                reason: BaseClientErrorReason::DeserialiseFailure(body, 402u16),
            }) => {
                // payment-required status, the card was declined, surfaced
                // to callers as outcome data instead of an error
                let parsed = serde_json::from_str::<StripeApiErrorEnvelope>(body.as_str())
                    .map_err(|e| AppProcessorErrorReason::CorruptedResponse(e.to_string()))?;
                let mut reason = parsed.error.code.unwrap_or("card-declined".to_string());
                if let Some(m) = parsed.error.message {
                    reason = format!("{reason}: {m}");
                }
                app_log_event!(_logctx, AppLogLevel::INFO, "decline: {reason}");
                Ok(ChargeAttemptState::Failed {
                    decline_reason: reason,
                })
            }
            Err(e) => Err(e.into()),
        }
    } // end of fn capture_fee

    async fn refund_capture(
        &self,
        req: AppProcessorRefundRequest,
    ) -> Result<AppProcessorRefundResult, AppProcessorErrorReason> {
        let body_obj = CreateRefund {
            payment_intent: req.charge_ref.clone(),
            amount: amount_to_minor_unit(&req.amount, &req.currency)?,
            reason: req.reason.clone(),
        };
        let mut _client = self._acquire_client().await?;
        let hdrs = Self::_idempotency_header(req.idempotency_token.as_str());
        let rfd = _client
            .execute_form::<RefundResource, CreateRefund>("/refunds", Method::POST, &body_obj, hdrs)
            .await?;
        match rfd.status {
            RefundStatus::succeeded | RefundStatus::pending => Ok(AppProcessorRefundResult {
                refund_id: rfd.id,
                amount: req.amount,
            }),
            ref _declined => Err(AppProcessorErrorReason::RefundRejected(format!(
                "{:?}",
                rfd.status
            ))),
        }
    } // end of fn refund_capture

    async fn reverse_transfer(
        &self,
        req: AppProcessorReversalRequest,
    ) -> Result<AppProcessorReversalResult, AppProcessorErrorReason> {
        let body_obj = CreateTransferReversal {
            amount: amount_to_minor_unit(&req.amount, &req.currency)?,
        };
        let resource_path = format!("/transfers/{}/reversals", req.transfer_id);
        let mut _client = self._acquire_client().await?;
        let hdrs = Self::_idempotency_header(req.idempotency_token.as_str());
        let rvs = _client
            .execute_form::<TransferReversal, CreateTransferReversal>(
                resource_path.as_str(),
                Method::POST,
                &body_obj,
                hdrs,
            )
            .await?;
        Ok(AppProcessorReversalResult {
            reversal_id: rvs.id,
            amount: req.amount,
        })
    } // end of fn reverse_transfer
} // end of impl AppProcessorStripeCtx
