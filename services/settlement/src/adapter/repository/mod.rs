mod mariadb;

use std::boxed::Box;
use std::result::Result;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use carshare_common::error::AppErrorCode;

use self::mariadb::{MariadbRefundRepo, MariadbSettlementRepo};
use super::datastore::{AppDStoreError, AppDataStoreContext};
use crate::model::{
    AdjustmentRecordModel, BookingLedgerModel, ChargeAttemptModel, ChargeBreakdownModel,
    RefundRequestModel, SettlementStatusModel, WaiveRecordModel,
};

#[derive(Debug)]
pub enum AppRepoErrorFnLabel {
    InitSettlementRepo,
    InitRefundRepo,
    CreateSettlement,
    FetchSettlement,
    UpdateStatus,
    CreateAttempt,
    FetchAttempts,
    SaveWaiveRecord,
    SaveAdjustmentRecord,
    CreateRefundReq,
    FetchRefundReq,
    UpdateRefundReview,
    FetchLedger,
    FinalizeRefund,
}

#[derive(Debug)]
pub enum AppRepoErrorDetail {
    DataStore(AppDStoreError),
    DatabaseQuery(String),
    DatabaseExec(String),
    DatabaseTxStart(String),
    DatabaseTxCommit(String),
    DataRowParse(String),
    // the guarded UPDATE matched no row, e.g. the request left the
    // expected state in between
    ConstraintViolated(String),
    Unknown,
}

#[derive(Debug)]
pub struct AppRepoError {
    pub fn_label: AppRepoErrorFnLabel,
    pub code: AppErrorCode,
    pub detail: AppRepoErrorDetail,
}

#[async_trait]
pub trait AbstractSettlementRepo: Send + Sync {
    async fn create_settlement(
        &self,
        booking_id: u32,
        trip_end_time: DateTime<Utc>,
        breakdown: &ChargeBreakdownModel,
        status: &SettlementStatusModel,
    ) -> Result<(), AppRepoError>;

    #[allow(clippy::type_complexity)]
    async fn fetch_settlement(
        &self,
        booking_id: u32,
    ) -> Result<Option<(DateTime<Utc>, ChargeBreakdownModel, SettlementStatusModel)>, AppRepoError>;

    async fn update_status(
        &self,
        booking_id: u32,
        status: &SettlementStatusModel,
    ) -> Result<(), AppRepoError>;

    // persists the attempt record, the resolved status triple, and (on a
    // captured attempt) the ledger capture row in one transaction
    async fn create_attempt(
        &self,
        attempt: &ChargeAttemptModel,
        status: &SettlementStatusModel,
    ) -> Result<(), AppRepoError>;

    async fn fetch_attempts(&self, booking_id: u32)
        -> Result<Vec<ChargeAttemptModel>, AppRepoError>;

    async fn save_waive(&self, rec: &WaiveRecordModel) -> Result<(), AppRepoError>;

    async fn save_adjustment(&self, rec: &AdjustmentRecordModel) -> Result<(), AppRepoError>;
}

#[async_trait]
pub trait AbstractRefundRepo: Send + Sync {
    async fn create_request(&self, req: &RefundRequestModel) -> Result<(), AppRepoError>;

    async fn fetch_request(
        &self,
        booking_id: u32,
        req_time: DateTime<Utc>,
    ) -> Result<Option<RefundRequestModel>, AppRepoError>;

    async fn update_review(&self, req: &RefundRequestModel) -> Result<(), AppRepoError>;

    async fn fetch_ledger(
        &self,
        booking_id: u32,
    ) -> Result<Option<BookingLedgerModel>, AppRepoError>;

    // the PROCESSED transition, the ledger refunded total, the optional
    // host-balance decrement and the booking status commit atomically,
    // money never moves without the ledger reflecting it
    async fn finalize_process(
        &self,
        req: &RefundRequestModel,
        ledger: &BookingLedgerModel,
        reversed_amount: Option<Decimal>,
        status: &SettlementStatusModel,
    ) -> Result<(), AppRepoError>;
}

pub async fn app_repo_settlement(
    dstore: Arc<AppDataStoreContext>,
) -> Result<Box<dyn AbstractSettlementRepo>, AppRepoError> {
    let repo = MariadbSettlementRepo::new(dstore)?;
    Ok(Box::new(repo))
}

pub async fn app_repo_refund(
    dstore: Arc<AppDataStoreContext>,
) -> Result<Box<dyn AbstractRefundRepo>, AppRepoError> {
    let repo = MariadbRefundRepo::new(dstore)?;
    Ok(Box::new(repo))
}
