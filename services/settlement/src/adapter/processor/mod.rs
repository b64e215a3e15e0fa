mod base_client;
mod stripe;

use std::boxed::Box;
use std::marker::{Send, Sync};
use std::result::Result;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use carshare_common::api::dto::CurrencyDto;
use carshare_common::confidentiality::AbstractConfidentiality;
use carshare_common::config::App3rdPartyCfg;
use carshare_common::logging::AppLogContext;

pub use self::base_client::{BaseClientError, BaseClientErrorReason};
use self::stripe::{AbstStripeContext, AppProcessorStripeCtx, MockProcessorStripeCtx};
use crate::model::{ChargeAttemptModel, ChargeAttemptState};

#[derive(Debug)]
pub enum AppProcessorErrorReason {
    InvalidConfig,
    MissingCredential,
    CredentialCorrupted,
    NotSupport,
    LowLvlNet(BaseClientError),
    AmountPrecision(String),
    CorruptedResponse(String),
    // the gateway refused to create the secondary money movement, note a
    // card decline on capture is NOT an error, it comes back as data in
    // the attempt state
    RefundRejected(String),
    ReversalRejected(String),
}

#[derive(Debug)]
pub enum AppProcessorFnLabel {
    TryBuild,
    CaptureFee,
    RefundCapture,
    ReverseTransfer,
}

#[derive(Debug)]
pub struct AppProcessorError {
    pub reason: AppProcessorErrorReason,
    pub fn_label: AppProcessorFnLabel,
}

pub struct AppProcessorCaptureResult {
    pub state: ChargeAttemptState,
    pub amount: Decimal,
}

pub struct AppProcessorRefundRequest {
    pub charge_ref: String,
    pub amount: Decimal,
    pub currency: CurrencyDto,
    pub reason: String,
    pub idempotency_token: String,
}
pub struct AppProcessorRefundResult {
    pub refund_id: String,
    pub amount: Decimal,
}

pub struct AppProcessorReversalRequest {
    pub transfer_id: String,
    pub amount: Decimal,
    pub currency: CurrencyDto,
    pub idempotency_token: String,
}
pub struct AppProcessorReversalResult {
    pub reversal_id: String,
    pub amount: Decimal,
}

impl From<BaseClientError> for AppProcessorErrorReason {
    fn from(value: BaseClientError) -> Self {
        Self::LowLvlNet(value)
    }
}

#[async_trait]
pub trait AbstractPaymentProcessor: Send + Sync {
    async fn capture_fee(
        &self,
        attempt: &ChargeAttemptModel,
    ) -> Result<AppProcessorCaptureResult, AppProcessorError>;

    async fn refund_capture(
        &self,
        req: AppProcessorRefundRequest,
    ) -> Result<AppProcessorRefundResult, AppProcessorError>;

    async fn reverse_transfer(
        &self,
        req: AppProcessorReversalRequest,
    ) -> Result<AppProcessorReversalResult, AppProcessorError>;
}

struct AppProcessorContext {
    _stripe: Box<dyn AbstStripeContext>,
    _logctx: Arc<AppLogContext>,
}

impl AppProcessorContext {
    fn new(
        cfgs3pt: Vec<Arc<App3rdPartyCfg>>,
        cfdntl: Arc<Box<dyn AbstractConfidentiality>>,
        _logctx: Arc<AppLogContext>,
    ) -> Result<Self, AppProcessorError> {
        let mut errors = Vec::new();
        let mut result_stripe = None;
        cfgs3pt
            .into_iter()
            .map(|c| match c.as_ref() {
                App3rdPartyCfg::dev {
                    name,
                    host,
                    port,
                    confidentiality_path,
                } => {
                    if result_stripe.is_none() && name.as_str().to_lowercase() == "stripe" {
                        result_stripe = AppProcessorStripeCtx::try_build(
                            host.as_str(),
                            *port,
                            confidentiality_path.as_str(),
                            cfdntl.clone(),
                            _logctx.clone(),
                        )
                        .map_err(|e| errors.push(e))
                        .ok()
                        .map(|c| Box::new(c) as Box<dyn AbstStripeContext>);
                    }
                }
                App3rdPartyCfg::test { name, data_src: _ } => {
                    if result_stripe.is_none() && name.as_str().to_lowercase() == "stripe" {
                        result_stripe = Some(MockProcessorStripeCtx::build());
                    }
                }
            })
            .count();
        if errors.is_empty() {
            if let Some(_stripe) = result_stripe {
                Ok(Self { _logctx, _stripe })
            } else {
                Err(AppProcessorError {
                    reason: AppProcessorErrorReason::InvalidConfig,
                    fn_label: AppProcessorFnLabel::TryBuild,
                })
            }
        } else {
            Err(AppProcessorError {
                reason: errors.remove(0),
                fn_label: AppProcessorFnLabel::TryBuild,
            })
        }
    } // end of fn new
} // end of impl AppProcessorContext

#[async_trait]
impl AbstractPaymentProcessor for AppProcessorContext {
    async fn capture_fee(
        &self,
        attempt: &ChargeAttemptModel,
    ) -> Result<AppProcessorCaptureResult, AppProcessorError> {
        self._stripe
            .capture_fee(attempt)
            .await
            .map(|state| AppProcessorCaptureResult {
                state,
                amount: attempt.amount,
            })
            .map_err(|reason| AppProcessorError {
                reason,
                fn_label: AppProcessorFnLabel::CaptureFee,
            })
    }

    async fn refund_capture(
        &self,
        req: AppProcessorRefundRequest,
    ) -> Result<AppProcessorRefundResult, AppProcessorError> {
        self._stripe
            .refund_capture(req)
            .await
            .map_err(|reason| AppProcessorError {
                reason,
                fn_label: AppProcessorFnLabel::RefundCapture,
            })
    }

    async fn reverse_transfer(
        &self,
        req: AppProcessorReversalRequest,
    ) -> Result<AppProcessorReversalResult, AppProcessorError> {
        self._stripe
            .reverse_transfer(req)
            .await
            .map_err(|reason| AppProcessorError {
                reason,
                fn_label: AppProcessorFnLabel::ReverseTransfer,
            })
    }
} // end of impl AppProcessorContext

pub(crate) fn app_processor_context(
    cfg_3pt: &Option<Vec<Arc<App3rdPartyCfg>>>,
    cfdntl: Arc<Box<dyn AbstractConfidentiality>>,
    logctx: Arc<AppLogContext>,
) -> Result<Box<dyn AbstractPaymentProcessor>, AppProcessorError> {
    let _cfg_3pt = cfg_3pt.as_ref().cloned().ok_or(AppProcessorError {
        reason: AppProcessorErrorReason::InvalidConfig,
        fn_label: AppProcessorFnLabel::TryBuild,
    })?;
    let proc = AppProcessorContext::new(_cfg_3pt, cfdntl, logctx)?;
    Ok(Box::new(proc))
}
