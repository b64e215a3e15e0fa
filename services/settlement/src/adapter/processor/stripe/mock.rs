use std::boxed::Box;
use std::result::Result;

use async_trait::async_trait;
use chrono::Utc;

use super::super::{
    AppProcessorErrorReason, AppProcessorRefundRequest, AppProcessorRefundResult,
    AppProcessorReversalRequest, AppProcessorReversalResult,
};
use super::AbstStripeContext;
use crate::model::{ChargeAttemptModel, ChargeAttemptState};

// TODO, conditional compilation for test
pub(crate) struct MockProcessorStripeCtx;

impl MockProcessorStripeCtx {
    pub(crate) fn build() -> Box<dyn AbstStripeContext> {
        Box::new(Self)
    }
}

#[async_trait]
impl AbstStripeContext for MockProcessorStripeCtx {
    async fn capture_fee(
        &self,
        attempt: &ChargeAttemptModel,
    ) -> Result<ChargeAttemptState, AppProcessorErrorReason> {
        let token_serial = attempt.meta.token().to_string();
        Ok(ChargeAttemptState::Succeeded {
            gateway_charge_id: format!("pi_mock_{token_serial}"),
            completed_time: Utc::now(),
        })
    }

    async fn refund_capture(
        &self,
        req: AppProcessorRefundRequest,
    ) -> Result<AppProcessorRefundResult, AppProcessorErrorReason> {
        Ok(AppProcessorRefundResult {
            refund_id: format!("re_mock_{}", req.idempotency_token),
            amount: req.amount,
        })
    }

    async fn reverse_transfer(
        &self,
        req: AppProcessorReversalRequest,
    ) -> Result<AppProcessorReversalResult, AppProcessorErrorReason> {
        Ok(AppProcessorReversalResult {
            reversal_id: format!("trr_mock_{}", req.idempotency_token),
            amount: req.amount,
        })
    }
} // end of impl MockProcessorStripeCtx
