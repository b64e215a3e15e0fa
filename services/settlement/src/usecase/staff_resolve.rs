use std::boxed::Box;
use std::result::Result;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use carshare_common::api::dto::CurrencyDto;
use carshare_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::adapter::event::{AbstractEventStreamCtx, AppSettlementEvent};
use crate::adapter::processor::{AbstractPaymentProcessor, AppProcessorError};
use crate::adapter::repository::{AbstractSettlementRepo, AppRepoError};
use crate::api::web::dto::{AdjustReqDto, ChargeOutcomeDto, StaffResolveRespDto, WaiveReqDto};
use crate::auth::{AppAuthPermissionCode, AppAuthedClaim};
use crate::model::{
    AdjustmentRecordModel, ChargeAttemptModel, ChargeAttemptState, ChargeModelError,
    PaymentOutcome, ResolutionModelError, SettlementStatusModel, StaffResolutionAction,
    WaiveRecordModel,
};

pub enum StaffResolveUcError {
    PermissionDenied(u32),
    MissingSettlement(u32),
    Resolution(Vec<ResolutionModelError>),
    ChargeGuard(ChargeModelError),
    DataStore(AppRepoError),
    ExternalProcessor(AppProcessorError),
}

pub struct StaffResolveUseCase {
    pub repo: Box<dyn AbstractSettlementRepo>,
    pub processors: Arc<Box<dyn AbstractPaymentProcessor>>,
    pub evtstream: Arc<Box<dyn AbstractEventStreamCtx>>,
    pub logctx: Arc<AppLogContext>,
}

// outcome of capturing the residual amount of a partial waive or a
// non-zero adjustment
enum ResidualCapture {
    NotNeeded,
    Done(Box<ChargeAttemptModel>),
}

impl StaffResolveUseCase {
    pub async fn execute_waive(
        self,
        booking_id: u32,
        authed_claim: AppAuthedClaim,
        req: WaiveReqDto,
    ) -> Result<StaffResolveRespDto, StaffResolveUcError> {
        if !authed_claim.contains_permission(AppAuthPermissionCode::can_waive_charges) {
            return Err(StaffResolveUcError::PermissionDenied(authed_claim.profile));
        }
        let staff_id = authed_claim.profile;
        let (trip_end_time, breakdown, _status) = self
            .repo
            .fetch_settlement(booking_id)
            .await
            .map_err(StaffResolveUcError::DataStore)?
            .ok_or(StaffResolveUcError::MissingSettlement(booking_id))?;
        let arg = (
            booking_id,
            breakdown.total,
            breakdown.currency.clone(),
            req.percentage,
            req.reason,
            staff_id,
        );
        let rec = WaiveRecordModel::try_from(arg)
            .map_err(|e| StaffResolveUcError::Resolution(vec![e]))?;
        // the waive itself is pure bookkeeping, no gateway call moves
        // any money for the waived part
        self.repo
            .save_waive(&rec)
            .await
            .map_err(StaffResolveUcError::DataStore)?;

        let action = if rec.full_waive() || rec.remaining_amount() == Decimal::ZERO {
            StaffResolutionAction::Waive
        } else {
            StaffResolutionAction::PartialWaive
        };
        let capture_result = if matches!(action, StaffResolutionAction::PartialWaive) {
            self._residual_capture(
                booking_id,
                trip_end_time,
                req.customer_id,
                req.payment_method_id,
                rec.remaining_amount(),
                breakdown.currency.clone(),
            )
            .await?
        } else {
            ResidualCapture::NotNeeded
        };
        let (status, outcome_dto) = self
            ._conclude(booking_id, action, rec.remaining_amount(), capture_result)
            .await?;
        self._emit_resolution_event(booking_id, "waive", rec.remaining_amount(), staff_id)
            .await;
        Ok(StaffResolveRespDto {
            booking_id,
            action: "waive".to_string(),
            original_amount: rec.original_amount().to_string(),
            waived_amount: Some(rec.waived_amount().to_string()),
            remaining_amount: Some(rec.remaining_amount().to_string()),
            adjusted_total: None,
            outcome: outcome_dto,
            status: (&status).into(),
        })
    } // end of fn execute_waive

    pub async fn execute_adjust(
        self,
        booking_id: u32,
        authed_claim: AppAuthedClaim,
        req: AdjustReqDto,
    ) -> Result<StaffResolveRespDto, StaffResolveUcError> {
        if !authed_claim.contains_permission(AppAuthPermissionCode::can_adjust_charges) {
            return Err(StaffResolveUcError::PermissionDenied(authed_claim.profile));
        }
        let staff_id = authed_claim.profile;
        let (trip_end_time, breakdown, _status) = self
            .repo
            .fetch_settlement(booking_id)
            .await
            .map_err(StaffResolveUcError::DataStore)?
            .ok_or(StaffResolveUcError::MissingSettlement(booking_id))?;
        let arg = (booking_id, &breakdown, req.lines, req.reason, staff_id);
        let rec =
            AdjustmentRecordModel::try_from(arg).map_err(StaffResolveUcError::Resolution)?;
        self.repo
            .save_adjustment(&rec)
            .await
            .map_err(StaffResolveUcError::DataStore)?;

        let adjusted_total = rec.adjusted_total();
        let capture_result = if adjusted_total == Decimal::ZERO {
            // the record alone documents the outcome, charging zero is
            // explicitly not a thing
            ResidualCapture::NotNeeded
        } else {
            self._residual_capture(
                booking_id,
                trip_end_time,
                req.customer_id,
                req.payment_method_id,
                adjusted_total,
                breakdown.currency.clone(),
            )
            .await?
        };
        let (status, outcome_dto) = self
            ._conclude(
                booking_id,
                StaffResolutionAction::Adjust,
                adjusted_total,
                capture_result,
            )
            .await?;
        self._emit_resolution_event(booking_id, "adjust", adjusted_total, staff_id)
            .await;
        Ok(StaffResolveRespDto {
            booking_id,
            action: "adjust".to_string(),
            original_amount: rec.original_total().to_string(),
            waived_amount: None,
            remaining_amount: None,
            adjusted_total: Some(adjusted_total.to_string()),
            outcome: outcome_dto,
            status: (&status).into(),
        })
    } // end of fn execute_adjust

    #[rustfmt::skip]
    async fn _residual_capture(
        &self,
        booking_id: u32,
        trip_end_time: DateTime<Utc>,
        customer_id: Option<String>,
        payment_method_id: Option<String>,
        amount: Decimal,
        currency: CurrencyDto,
    ) -> Result<ResidualCapture, StaffResolveUcError> {
        let (customer_ref, instrument_ref) = match (customer_id, payment_method_id) {
            (Some(c), Some(i)) => (c, i),
            _missing => {
                let e = ResolutionModelError::MissingInstrument;
                return Err(StaffResolveUcError::Resolution(vec![e]));
            }
        };
        let prev_attempts = self
            .repo
            .fetch_attempts(booking_id)
            .await
            .map_err(StaffResolveUcError::DataStore)?;
        let mut attempt = ChargeAttemptModel::next(
            prev_attempts.as_slice(), booking_id, trip_end_time,
            customer_ref, instrument_ref, amount, currency,
        )
        .map_err(StaffResolveUcError::ChargeGuard)?;
        let capture = self
            .processors
            .capture_fee(&attempt)
            .await
            .map_err(StaffResolveUcError::ExternalProcessor)?;
        attempt.update_state(capture.state);
        Ok(ResidualCapture::Done(Box::new(attempt)))
    } // end of fn _residual_capture

    // The staff action is the authority which closes the loop, the
    // terminal-success triple applies whenever no residual capture is
    // needed or the residual capture succeeded. A declined residual
    // capture falls back onto the ordinary decision-table row instead.
    async fn _conclude(
        &self,
        booking_id: u32,
        action: StaffResolutionAction,
        residual_amount: Decimal,
        capture_result: ResidualCapture,
    ) -> Result<(SettlementStatusModel, Option<ChargeOutcomeDto>), StaffResolveUcError> {
        match capture_result {
            ResidualCapture::NotNeeded => {
                let status = SettlementStatusModel::resolve_staff(action);
                self.repo
                    .update_status(booking_id, &status)
                    .await
                    .map_err(StaffResolveUcError::DataStore)?;
                Ok((status, None))
            }
            ResidualCapture::Done(attempt) => {
                let status = if matches!(attempt.state, ChargeAttemptState::Succeeded { .. }) {
                    SettlementStatusModel::resolve_staff(action)
                } else {
                    let outcome = PaymentOutcome::from(&attempt.state);
                    SettlementStatusModel::resolve(residual_amount, Some(outcome), false)
                };
                self.repo
                    .create_attempt(&attempt, &status)
                    .await
                    .map_err(StaffResolveUcError::DataStore)?;
                Ok((status, Some(attempt.as_ref().into())))
            }
        }
    } // end of fn _conclude

    async fn _emit_resolution_event(
        &self,
        booking_id: u32,
        action: &str,
        remaining: Decimal,
        staff_id: u32,
    ) {
        let evt = AppSettlementEvent::ChargesResolved {
            schema_ver: AppSettlementEvent::schema_version(),
            booking_id,
            action: action.to_string(),
            remaining: remaining.to_string(),
            staff_id,
            time: Utc::now(),
        };
        if let Err(_e) = self.evtstream.publish(evt).await {
            let logctx_p = &self.logctx;
            app_log_event!(
                logctx_p,
                AppLogLevel::WARNING,
                "booking: {booking_id}, resolution-event-dropped"
            );
        }
    }
} // end of impl StaffResolveUseCase
