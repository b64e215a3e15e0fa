use std::boxed::Box;
use std::result::Result;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use carshare_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::adapter::event::{AbstractEventStreamCtx, AppSettlementEvent};
use crate::adapter::processor::{
    AbstractPaymentProcessor, AppProcessorError, AppProcessorRefundRequest,
    AppProcessorReversalRequest, AppProcessorReversalResult,
};
use crate::adapter::repository::{AbstractRefundRepo, AppRepoError};
use crate::api::web::dto::{RefundProcessRespDto, TransferReversalRespDto};
use crate::auth::{AppAuthPermissionCode, AppAuthedClaim};
use crate::model::{
    BookingLedgerModel, RefundModelError, RefundRequestModel, RefundRequestState,
    SettlementStatusModel,
};

pub enum ProcessRefundUcError {
    PermissionDenied(u32),
    MissingRequest(u32, DateTime<Utc>),
    MissingLedger(u32),
    Precondition(RefundModelError),
    DataStore(AppRepoError),
    // the primary refund never went through, the request stays APPROVED
    // and the whole operation is safely retriable
    RefundFailed(AppProcessorError),
}

pub struct ProcessRefundUseCase {
    pub repo: Box<dyn AbstractRefundRepo>,
    pub processors: Arc<Box<dyn AbstractPaymentProcessor>>,
    pub evtstream: Arc<Box<dyn AbstractEventStreamCtx>>,
    pub logctx: Arc<AppLogContext>,
}

impl ProcessRefundUseCase {
    pub async fn execute(
        self,
        booking_id: u32,
        req_time: DateTime<Utc>,
        authed_claim: AppAuthedClaim,
    ) -> Result<RefundProcessRespDto, ProcessRefundUcError> {
        if !authed_claim.contains_permission(AppAuthPermissionCode::can_process_refund) {
            return Err(ProcessRefundUcError::PermissionDenied(authed_claim.profile));
        }
        let logctx_p = &self.logctx;
        let mut req_m = self
            .repo
            .fetch_request(booking_id, req_time)
            .await
            .map_err(ProcessRefundUcError::DataStore)?
            .ok_or(ProcessRefundUcError::MissingRequest(booking_id, req_time))?;
        req_m
            .ensure_processable()
            .map_err(ProcessRefundUcError::Precondition)?;

        let mut ledger = self
            .repo
            .fetch_ledger(booking_id)
            .await
            .map_err(ProcessRefundUcError::DataStore)?
            .ok_or(ProcessRefundUcError::MissingLedger(booking_id))?;
        let charge_ref = ledger
            .charge_ref()
            .map_err(ProcessRefundUcError::Precondition)?
            .to_string();
        let amount = req_m.amount_requested();
        // remaining-refundable is re-checked right before the gateway,
        // multiple processed requests must never exceed the capture
        ledger
            .ensure_refundable(amount)
            .map_err(ProcessRefundUcError::Precondition)?;

        let refund_result = self
            .processors
            .refund_capture(AppProcessorRefundRequest {
                charge_ref,
                amount,
                currency: ledger.currency().clone(),
                reason: req_m.reason().to_string(),
                idempotency_token: req_m.token().to_string(),
            })
            .await
            .map_err(ProcessRefundUcError::RefundFailed)?;

        // reversing the host share is best-effort relative to the refund
        // which already went through, a failure at here is recorded for
        // manual follow-up and never fails the request
        let (reversal, reversal_error) = self._try_reverse_share(&req_m, &ledger).await;

        let coverage = ledger
            .apply_refund(amount)
            .map_err(ProcessRefundUcError::Precondition)?;
        req_m
            .mark_processed(
                refund_result.refund_id.clone(),
                reversal.as_ref().map(|r| r.reversal_id.clone()),
            )
            .map_err(ProcessRefundUcError::Precondition)?;
        let status = SettlementStatusModel::resolve_refund(coverage);
        let reversed_amount = reversal.as_ref().map(|r| r.amount);
        self.repo
            .finalize_process(&req_m, &ledger, reversed_amount, &status)
            .await
            .map_err(ProcessRefundUcError::DataStore)?;

        let evt = AppSettlementEvent::RefundProcessed {
            schema_ver: AppSettlementEvent::schema_version(),
            booking_id,
            amount: amount.to_string(),
            refund_txn_id: refund_result.refund_id.clone(),
            reversal_txn_id: reversal.as_ref().map(|r| r.reversal_id.clone()),
            time: Utc::now(),
        };
        if let Err(_e) = self.evtstream.publish(evt).await {
            app_log_event!(
                logctx_p,
                AppLogLevel::WARNING,
                "booking: {booking_id}, refund-event-dropped"
            );
        }
        let process_time = match req_m.state() {
            RefundRequestState::Processed { process_time, .. } => *process_time,
            _others => Utc::now(),
        };
        app_log_event!(
            logctx_p,
            AppLogLevel::INFO,
            "booking: {booking_id}, refund-processed: {}, at: {process_time}",
            refund_result.refund_id.as_str()
        );
        Ok(RefundProcessRespDto {
            request_id: req_m.token().to_string(),
            booking_id,
            refund_txn_id: refund_result.refund_id,
            amount: amount.to_string(),
            reversal: reversal.map(|r| TransferReversalRespDto {
                reversal_id: r.reversal_id,
                amount: r.amount.to_string(),
            }),
            reversal_error,
            status: (&status).into(),
        })
    } // end of fn execute

    async fn _try_reverse_share(
        &self,
        req_m: &RefundRequestModel,
        ledger: &BookingLedgerModel,
    ) -> (Option<AppProcessorReversalResult>, Option<String>) {
        if !req_m.reverse_host_transfer() {
            return (None, None);
        }
        let amount = req_m.amount_requested();
        let share = match ledger.reversal_share(amount) {
            Some(v) => v,
            None => {
                return (None, None);
            } // not a split payment, or a share too small to claw back
        };
        let split = match ledger.host_split() {
            Some(v) => v,
            None => {
                return (None, None);
            }
        };
        let result = self
            .processors
            .reverse_transfer(AppProcessorReversalRequest {
                transfer_id: split.transfer_id.clone(),
                amount: share,
                currency: ledger.currency().clone(),
                idempotency_token: format!("{}-rvs", req_m.token()),
            })
            .await;
        match result {
            Ok(v) => (Some(v), None),
            Err(e) => {
                let logctx_p = &self.logctx;
                app_log_event!(
                    logctx_p,
                    AppLogLevel::WARNING,
                    "booking: {}, transfer-reversal-failed: {:?}",
                    ledger.booking_id(),
                    e
                );
                (None, Some(format!("{:?}", e.reason)))
            }
        }
    } // end of fn _try_reverse_share
} // end of impl ProcessRefundUseCase
