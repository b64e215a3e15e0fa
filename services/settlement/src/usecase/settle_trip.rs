use std::boxed::Box;
use std::result::Result;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use carshare_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::adapter::event::{AbstractEventStreamCtx, AppSettlementEvent};
use crate::adapter::processor::{AbstractPaymentProcessor, AppProcessorError};
use crate::adapter::repository::{AbstractSettlementRepo, AppRepoError};
use crate::api::web::dto::{
    ChargeOutcomeDto, PaymentReqErrorDto, TripSettleErrorDto, TripSettleReqDto, TripSettleRespDto,
};
use crate::auth::{AppAuthPermissionCode, AppAuthedClaim};
use crate::model::{
    ChargeAttemptModel, ChargeBreakdownModel, ChargeModelError, PaymentOutcome, RatePlanModel,
    SettlementStatusModel, TripTelemetryModel,
};

pub enum SettleTripUcError {
    PermissionDenied(u32),
    ClientBadRequest(Box<TripSettleErrorDto>),
    DataStore(AppRepoError),
    ExternalProcessor(AppProcessorError),
}

pub struct SettleTripUseCase {
    pub repo: Box<dyn AbstractSettlementRepo>,
    pub processors: Arc<Box<dyn AbstractPaymentProcessor>>,
    pub evtstream: Arc<Box<dyn AbstractEventStreamCtx>>,
    pub logctx: Arc<AppLogContext>,
}

impl SettleTripUseCase {
    pub async fn execute(
        self,
        booking_id: u32,
        authed_claim: AppAuthedClaim,
        req: TripSettleReqDto,
    ) -> Result<TripSettleRespDto, SettleTripUcError> {
        if !authed_claim.contains_permission(AppAuthPermissionCode::can_settle_trip) {
            return Err(SettleTripUcError::PermissionDenied(authed_claim.profile));
        }
        let TripSettleReqDto {
            telemetry: d_tlm,
            rate_plan: d_rate,
            customer_id,
            payment_method_id,
            has_open_disputes,
        } = req;
        let tlm = TripTelemetryModel::try_from(d_tlm).map_err(|es| {
            let detail = TripSettleErrorDto {
                telemetry: Some(es.into_iter().map(Into::into).collect()),
                ..Default::default()
            };
            SettleTripUcError::ClientBadRequest(Box::new(detail))
        })?;
        let rate = RatePlanModel::try_from(d_rate).map_err(|es| {
            let detail = TripSettleErrorDto {
                rate_plan: Some(es.into_iter().map(Into::into).collect()),
                ..Default::default()
            };
            SettleTripUcError::ClientBadRequest(Box::new(detail))
        })?;
        let breakdown = ChargeBreakdownModel::from((&tlm, &rate));
        let logctx_p = &self.logctx;
        for anomaly in breakdown.anomalies.iter() {
            app_log_event!(
                logctx_p,
                AppLogLevel::WARNING,
                "booking: {booking_id}, telemetry-anomaly: {:?}",
                anomaly
            );
        }
        let trip_end_time = *tlm.trip_end_time();

        if breakdown.total == Decimal::ZERO {
            // nothing is owed, the decision table closes the booking out
            // without any gateway traffic
            let status = SettlementStatusModel::resolve(Decimal::ZERO, None, has_open_disputes);
            self.repo
                .create_settlement(booking_id, trip_end_time, &breakdown, &status)
                .await
                .map_err(SettleTripUcError::DataStore)?;
            self._emit_settled_event(booking_id, &breakdown, &status).await;
            return Ok(TripSettleRespDto {
                booking_id,
                breakdown: (&breakdown).into(),
                outcome: ChargeOutcomeDto::NotRequired,
                status: (&status).into(),
            });
        }

        let prev_attempts = self
            .repo
            .fetch_attempts(booking_id)
            .await
            .map_err(SettleTripUcError::DataStore)?;
        ChargeAttemptModel::ensure_none_captured(prev_attempts.as_slice()).map_err(|e| {
            let detail = TripSettleErrorDto {
                payment: Some(PaymentReqErrorDto::from(e)),
                ..Default::default()
            };
            SettleTripUcError::ClientBadRequest(Box::new(detail))
        })?;

        let build_result = ChargeAttemptModel::first(
            booking_id,
            trip_end_time,
            customer_id,
            payment_method_id,
            breakdown.total,
            breakdown.currency.clone(),
        );
        let mut attempt = match build_result {
            Ok(v) => v,
            Err(e) => {
                // local validation failure, a synchronous `failed` outcome
                // before any gateway call
                return self
                    ._local_failure(booking_id, tlm, breakdown, has_open_disputes, e)
                    .await;
            }
        };

        let capture = self
            .processors
            .capture_fee(&attempt)
            .await
            .map_err(SettleTripUcError::ExternalProcessor)?;
        attempt.update_state(capture.state);

        let outcome = PaymentOutcome::from(&attempt.state);
        let status = SettlementStatusModel::resolve(
            breakdown.total,
            Some(outcome),
            has_open_disputes,
        );
        self.repo
            .create_settlement(booking_id, trip_end_time, &breakdown, &status)
            .await
            .map_err(SettleTripUcError::DataStore)?;
        self.repo
            .create_attempt(&attempt, &status)
            .await
            .map_err(SettleTripUcError::DataStore)?;
        self._emit_settled_event(booking_id, &breakdown, &status).await;
        Ok(TripSettleRespDto {
            booking_id,
            outcome: (&attempt).into(),
            breakdown: (&breakdown).into(),
            status: (&status).into(),
        })
    } // end of fn execute

    async fn _local_failure(
        self,
        booking_id: u32,
        tlm: TripTelemetryModel,
        breakdown: ChargeBreakdownModel,
        has_open_disputes: bool,
        cause: ChargeModelError,
    ) -> Result<TripSettleRespDto, SettleTripUcError> {
        let logctx_p = &self.logctx;
        app_log_event!(
            logctx_p,
            AppLogLevel::WARNING,
            "booking: {booking_id}, local-capture-reject: {:?}",
            cause
        );
        let status = SettlementStatusModel::resolve(
            breakdown.total,
            Some(PaymentOutcome::Failed),
            has_open_disputes,
        );
        self.repo
            .create_settlement(booking_id, *tlm.trip_end_time(), &breakdown, &status)
            .await
            .map_err(SettleTripUcError::DataStore)?;
        let error = match cause {
            ChargeModelError::EmptyCustomerRef => "empty-customer-ref".to_string(),
            ChargeModelError::EmptyInstrumentRef => "empty-instrument-ref".to_string(),
            ChargeModelError::NonPositiveAmount(amt) => format!("non-positive-amount: {amt}"),
            _others => "capture-precondition".to_string(),
        };
        Ok(TripSettleRespDto {
            booking_id,
            outcome: ChargeOutcomeDto::Failed { error },
            breakdown: (&breakdown).into(),
            status: (&status).into(),
        })
    } // end of fn _local_failure

    async fn _emit_settled_event(
        &self,
        booking_id: u32,
        breakdown: &ChargeBreakdownModel,
        status: &SettlementStatusModel,
    ) {
        let evt = AppSettlementEvent::TripSettled {
            schema_ver: AppSettlementEvent::schema_version(),
            booking_id,
            total: breakdown.total.to_string(),
            payment_status: status.payment.label().to_string(),
            time: Utc::now(),
        };
        // the settlement already committed, a broken broker never rolls
        // it back
        if let Err(_e) = self.evtstream.publish(evt).await {
            let logctx_p = &self.logctx;
            app_log_event!(
                logctx_p,
                AppLogLevel::WARNING,
                "booking: {booking_id}, settle-event-dropped"
            );
        }
    }
} // end of impl SettleTripUseCase
