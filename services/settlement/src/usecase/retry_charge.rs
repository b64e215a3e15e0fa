use std::boxed::Box;
use std::result::Result;
use std::sync::Arc;

use chrono::Utc;

use carshare_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::adapter::event::{AbstractEventStreamCtx, AppSettlementEvent};
use crate::adapter::processor::{AbstractPaymentProcessor, AppProcessorError};
use crate::adapter::repository::{AbstractSettlementRepo, AppRepoError};
use crate::api::web::dto::{ChargeRetryReqDto, TripSettleRespDto};
use crate::auth::{AppAuthPermissionCode, AppAuthedClaim};
use crate::model::{
    ChargeAttemptModel, ChargeModelError, PaymentOutcome, SettlementStatusModel,
};

pub enum RetryChargeUcError {
    PermissionDenied(u32),
    MissingSettlement(u32),
    ChargeGuard(ChargeModelError),
    DataStore(AppRepoError),
    ExternalProcessor(AppProcessorError),
}

pub struct RetryChargeUseCase {
    pub repo: Box<dyn AbstractSettlementRepo>,
    pub processors: Arc<Box<dyn AbstractPaymentProcessor>>,
    pub evtstream: Arc<Box<dyn AbstractEventStreamCtx>>,
    pub logctx: Arc<AppLogContext>,
}

impl RetryChargeUseCase {
    pub async fn execute(
        self,
        booking_id: u32,
        authed_claim: AppAuthedClaim,
        req: ChargeRetryReqDto,
    ) -> Result<TripSettleRespDto, RetryChargeUcError> {
        if !authed_claim.contains_permission(AppAuthPermissionCode::can_retry_charge) {
            return Err(RetryChargeUcError::PermissionDenied(authed_claim.profile));
        }
        let ChargeRetryReqDto {
            customer_id,
            payment_method_id,
            has_open_disputes,
        } = req;
        let (_trip_end_time, breakdown, _status) = self
            .repo
            .fetch_settlement(booking_id)
            .await
            .map_err(RetryChargeUcError::DataStore)?
            .ok_or(RetryChargeUcError::MissingSettlement(booking_id))?;
        let prev_attempts = self
            .repo
            .fetch_attempts(booking_id)
            .await
            .map_err(RetryChargeUcError::DataStore)?;
        // the new attempt references the prior attempt token and bumps the
        // monotonic counter, guarded against a lineage which already
        // captured funds
        let mut attempt =
            ChargeAttemptModel::retry(prev_attempts.as_slice(), customer_id, payment_method_id)
                .map_err(RetryChargeUcError::ChargeGuard)?;

        let capture = self
            .processors
            .capture_fee(&attempt)
            .await
            .map_err(RetryChargeUcError::ExternalProcessor)?;
        attempt.update_state(capture.state);

        let outcome = PaymentOutcome::from(&attempt.state);
        let status =
            SettlementStatusModel::resolve(breakdown.total, Some(outcome), has_open_disputes);
        self.repo
            .create_attempt(&attempt, &status)
            .await
            .map_err(RetryChargeUcError::DataStore)?;

        let evt = AppSettlementEvent::TripSettled {
            schema_ver: AppSettlementEvent::schema_version(),
            booking_id,
            total: breakdown.total.to_string(),
            payment_status: status.payment.label().to_string(),
            time: Utc::now(),
        };
        if let Err(_e) = self.evtstream.publish(evt).await {
            let logctx_p = &self.logctx;
            app_log_event!(
                logctx_p,
                AppLogLevel::WARNING,
                "booking: {booking_id}, retry-event-dropped"
            );
        }
        Ok(TripSettleRespDto {
            booking_id,
            outcome: (&attempt).into(),
            breakdown: (&breakdown).into(),
            status: (&status).into(),
        })
    } // end of fn execute
} // end of impl RetryChargeUseCase
