mod process_refund;
mod retry_charge;
mod review_refund;
mod settle_trip;

use std::boxed::Box;
use std::result::Result;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use carshare_common::error::AppErrorCode;

use settlement::adapter::event::{
    AbstractEventStreamCtx, AppEventPublishError, AppSettlementEvent,
};
use settlement::adapter::processor::{
    AbstractPaymentProcessor, AppProcessorCaptureResult, AppProcessorError, AppProcessorErrorReason,
    AppProcessorFnLabel, AppProcessorRefundRequest, AppProcessorRefundResult,
    AppProcessorReversalRequest, AppProcessorReversalResult,
};
use settlement::adapter::repository::{
    AbstractRefundRepo, AbstractSettlementRepo, AppRepoError, AppRepoErrorDetail,
    AppRepoErrorFnLabel,
};
use settlement::model::{
    AdjustmentRecordModel, BookingLedgerModel, ChargeAttemptModel, ChargeAttemptState,
    ChargeBreakdownModel, RefundRequestModel, SettlementStatusModel, WaiveRecordModel,
};

pub(crate) fn ut_repo_err(fn_label: AppRepoErrorFnLabel) -> AppRepoError {
    AppRepoError {
        fn_label,
        code: AppErrorCode::Unknown,
        detail: AppRepoErrorDetail::Unknown,
    }
}

pub(crate) fn ut_processor_err(fn_label: AppProcessorFnLabel) -> AppProcessorError {
    AppProcessorError {
        reason: AppProcessorErrorReason::NotSupport,
        fn_label,
    }
}

type SettlementSnapshot = (DateTime<Utc>, ChargeBreakdownModel, SettlementStatusModel);

pub(crate) struct MockSettlementRepo {
    _fetch_settlement: Mutex<Option<SettlementSnapshot>>,
    _fetch_attempts: Mutex<Option<Vec<ChargeAttemptModel>>>,
    _create_settlement_res: Mutex<Option<Result<(), AppRepoError>>>,
    _create_attempt_res: Mutex<Option<Result<(), AppRepoError>>>,
    _update_status_res: Mutex<Option<Result<(), AppRepoError>>>,
    _save_waive_res: Mutex<Option<Result<(), AppRepoError>>>,
    _save_adjustment_res: Mutex<Option<Result<(), AppRepoError>>>,
}

impl MockSettlementRepo {
    #[rustfmt::skip]
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn build(
        fetch_settlement: Option<SettlementSnapshot>,
        fetch_attempts: Option<Vec<ChargeAttemptModel>>,
        create_settlement_res: Option<Result<(), AppRepoError>>,
        create_attempt_res: Option<Result<(), AppRepoError>>,
        update_status_res: Option<Result<(), AppRepoError>>,
        save_waive_res: Option<Result<(), AppRepoError>>,
        save_adjustment_res: Option<Result<(), AppRepoError>>,
    ) -> Box<dyn AbstractSettlementRepo> {
        let obj = Self {
            _fetch_settlement: Mutex::new(fetch_settlement),
            _fetch_attempts: Mutex::new(fetch_attempts),
            _create_settlement_res: Mutex::new(create_settlement_res),
            _create_attempt_res: Mutex::new(create_attempt_res),
            _update_status_res: Mutex::new(update_status_res),
            _save_waive_res: Mutex::new(save_waive_res),
            _save_adjustment_res: Mutex::new(save_adjustment_res),
        };
        Box::new(obj)
    }
}

#[async_trait]
impl AbstractSettlementRepo for MockSettlementRepo {
    async fn create_settlement(
        &self,
        _booking_id: u32,
        _trip_end_time: DateTime<Utc>,
        _breakdown: &ChargeBreakdownModel,
        _status: &SettlementStatusModel,
    ) -> Result<(), AppRepoError> {
        self._create_settlement_res
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(ut_repo_err(AppRepoErrorFnLabel::CreateSettlement)))
    }

    async fn fetch_settlement(
        &self,
        _booking_id: u32,
    ) -> Result<Option<SettlementSnapshot>, AppRepoError> {
        let d = self._fetch_settlement.lock().unwrap().take();
        Ok(d)
    }

    async fn update_status(
        &self,
        _booking_id: u32,
        _status: &SettlementStatusModel,
    ) -> Result<(), AppRepoError> {
        self._update_status_res
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(ut_repo_err(AppRepoErrorFnLabel::UpdateStatus)))
    }

    async fn create_attempt(
        &self,
        _attempt: &ChargeAttemptModel,
        _status: &SettlementStatusModel,
    ) -> Result<(), AppRepoError> {
        self._create_attempt_res
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(ut_repo_err(AppRepoErrorFnLabel::CreateAttempt)))
    }

    async fn fetch_attempts(
        &self,
        _booking_id: u32,
    ) -> Result<Vec<ChargeAttemptModel>, AppRepoError> {
        let d = self._fetch_attempts.lock().unwrap().take();
        Ok(d.unwrap_or_default())
    }

    async fn save_waive(&self, _rec: &WaiveRecordModel) -> Result<(), AppRepoError> {
        self._save_waive_res
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(ut_repo_err(AppRepoErrorFnLabel::SaveWaiveRecord)))
    }

    async fn save_adjustment(&self, _rec: &AdjustmentRecordModel) -> Result<(), AppRepoError> {
        self._save_adjustment_res
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(ut_repo_err(AppRepoErrorFnLabel::SaveAdjustmentRecord)))
    }
} // end of impl MockSettlementRepo

pub(crate) struct MockRefundRepo {
    _fetch_request: Mutex<Option<RefundRequestModel>>,
    _fetch_ledger: Mutex<Option<BookingLedgerModel>>,
    _create_request_res: Mutex<Option<Result<(), AppRepoError>>>,
    _update_review_res: Mutex<Option<Result<(), AppRepoError>>>,
    _finalize_res: Mutex<Option<Result<(), AppRepoError>>>,
}

impl MockRefundRepo {
    pub(crate) fn build(
        fetch_request: Option<RefundRequestModel>,
        fetch_ledger: Option<BookingLedgerModel>,
        create_request_res: Option<Result<(), AppRepoError>>,
        update_review_res: Option<Result<(), AppRepoError>>,
        finalize_res: Option<Result<(), AppRepoError>>,
    ) -> Box<dyn AbstractRefundRepo> {
        let obj = Self {
            _fetch_request: Mutex::new(fetch_request),
            _fetch_ledger: Mutex::new(fetch_ledger),
            _create_request_res: Mutex::new(create_request_res),
            _update_review_res: Mutex::new(update_review_res),
            _finalize_res: Mutex::new(finalize_res),
        };
        Box::new(obj)
    }
}

#[async_trait]
impl AbstractRefundRepo for MockRefundRepo {
    async fn create_request(&self, _req: &RefundRequestModel) -> Result<(), AppRepoError> {
        self._create_request_res
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(ut_repo_err(AppRepoErrorFnLabel::CreateRefundReq)))
    }

    async fn fetch_request(
        &self,
        _booking_id: u32,
        _req_time: DateTime<Utc>,
    ) -> Result<Option<RefundRequestModel>, AppRepoError> {
        let d = self._fetch_request.lock().unwrap().take();
        Ok(d)
    }

    async fn update_review(&self, _req: &RefundRequestModel) -> Result<(), AppRepoError> {
        self._update_review_res
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(ut_repo_err(AppRepoErrorFnLabel::UpdateRefundReview)))
    }

    async fn fetch_ledger(
        &self,
        _booking_id: u32,
    ) -> Result<Option<BookingLedgerModel>, AppRepoError> {
        let d = self._fetch_ledger.lock().unwrap().take();
        Ok(d)
    }

    async fn finalize_process(
        &self,
        _req: &RefundRequestModel,
        _ledger: &BookingLedgerModel,
        _reversed_amount: Option<Decimal>,
        _status: &SettlementStatusModel,
    ) -> Result<(), AppRepoError> {
        self._finalize_res
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(ut_repo_err(AppRepoErrorFnLabel::FinalizeRefund)))
    }
} // end of impl MockRefundRepo

type MockCaptureSeq = Vec<Result<ChargeAttemptState, AppProcessorError>>;

pub(crate) struct MockPaymentProcessor {
    _capture_states: Mutex<MockCaptureSeq>,
    _refund_res: Mutex<Option<Result<AppProcessorRefundResult, AppProcessorError>>>,
    _reversal_res: Mutex<Option<Result<AppProcessorReversalResult, AppProcessorError>>>,
}

impl MockPaymentProcessor {
    pub(crate) fn build(
        capture_states: Option<MockCaptureSeq>,
        refund_res: Option<Result<AppProcessorRefundResult, AppProcessorError>>,
        reversal_res: Option<Result<AppProcessorReversalResult, AppProcessorError>>,
    ) -> Arc<Box<dyn AbstractPaymentProcessor>> {
        let obj = Self {
            _capture_states: Mutex::new(capture_states.unwrap_or_default()),
            _refund_res: Mutex::new(refund_res),
            _reversal_res: Mutex::new(reversal_res),
        };
        Arc::new(Box::new(obj))
    }
}

#[async_trait]
impl AbstractPaymentProcessor for MockPaymentProcessor {
    async fn capture_fee(
        &self,
        attempt: &ChargeAttemptModel,
    ) -> Result<AppProcessorCaptureResult, AppProcessorError> {
        let mut guard = self._capture_states.lock().unwrap();
        if guard.is_empty() {
            // the test did not expect any gateway traffic at all
            return Err(ut_processor_err(AppProcessorFnLabel::CaptureFee));
        }
        guard.remove(0).map(|state| AppProcessorCaptureResult {
            state,
            amount: attempt.amount,
        })
    }

    async fn refund_capture(
        &self,
        _req: AppProcessorRefundRequest,
    ) -> Result<AppProcessorRefundResult, AppProcessorError> {
        self._refund_res
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(ut_processor_err(AppProcessorFnLabel::RefundCapture)))
    }

    async fn reverse_transfer(
        &self,
        _req: AppProcessorReversalRequest,
    ) -> Result<AppProcessorReversalResult, AppProcessorError> {
        self._reversal_res
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(ut_processor_err(AppProcessorFnLabel::ReverseTransfer)))
    }
} // end of impl MockPaymentProcessor

struct MockEventStream;

pub(crate) fn ut_setup_eventstream() -> Arc<Box<dyn AbstractEventStreamCtx>> {
    Arc::new(Box::new(MockEventStream))
}

#[async_trait]
impl AbstractEventStreamCtx for MockEventStream {
    async fn publish(&self, _evt: AppSettlementEvent) -> Result<(), AppEventPublishError> {
        Ok(())
    }
}
