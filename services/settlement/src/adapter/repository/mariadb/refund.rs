use std::result::Result;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mysql_async::prelude::{FromValue, Query, Queryable, WithParams};
use mysql_async::{Conn, IsolationLevel, Params, Row, TxOpts};
use rust_decimal::Decimal;

use carshare_common::api::dto::CurrencyDto;
use carshare_common::error::AppErrorCode;
use carshare_common::logging::{app_log_event, AppLogLevel};

use super::super::{AbstractRefundRepo, AppRepoError, AppRepoErrorDetail, AppRepoErrorFnLabel};
use super::settlement::upsert_status_stmt_params;
use super::{inner_into_parts, raw_column_to_datetime, DATETIME_FMT_P3F};
use crate::adapter::datastore::{AppDStoreMariaDB, AppDataStoreContext};
use crate::model::{
    BookingLedgerModel, HostSplitModel, RefundRequestModel, RefundRequestState,
    SettlementStatusModel,
};

struct InsertRefundReqArgs(String, Params);
struct FetchRefundReqArgs(String, Params);
struct UpdateReviewArgs(String, Params);
struct FetchLedgerArgs(String, Params);

inner_into_parts!(InsertRefundReqArgs);
inner_into_parts!(FetchRefundReqArgs);
inner_into_parts!(UpdateReviewArgs);
inner_into_parts!(FetchLedgerArgs);

#[rustfmt::skip]
type LedgerRowType = (
    Option<String>, Decimal, Decimal, String,
    Option<u32>, Option<String>, Option<Decimal>,
);

impl<'a> From<&'a RefundRequestModel> for InsertRefundReqArgs {
    #[rustfmt::skip]
    fn from(req: &'a RefundRequestModel) -> Self {
        let stmt = "INSERT INTO `refund_request`(`booking_id`,`req_time`,`amount`,\
            `currency`,`reason`,`requester_id`,`requester_role`,`review_notes`,\
            `reverse_transfer`,`state`) VALUES (?,?,?,?,?,?,?,?,?,?)"
            .to_string();
        let (requester_id, requester_role) = req.requester();
        let arg = vec![
            req.booking_id().into(),
            req.req_time().format(DATETIME_FMT_P3F).to_string().into(),
            req.amount_requested().into(),
            req.currency().to_string().into(),
            req.reason().into(),
            requester_id.into(),
            requester_role.into(),
            req.review_notes().cloned().into(),
            req.reverse_host_transfer().into(),
            req.state().label().into(),
        ];
        Self(stmt, Params::Positional(arg))
    }
}

impl From<(u32, DateTime<Utc>)> for FetchRefundReqArgs {
    fn from(value: (u32, DateTime<Utc>)) -> Self {
        let stmt = "SELECT `booking_id`,`req_time`,`amount`,`currency`,`reason`,\
            `requester_id`,`requester_role`,`review_notes`,`reverse_transfer`,`state`,\
            `reviewer_id`,`review_time`,`refund_txn_id`,`reversal_txn_id`,`process_time` \
            FROM `refund_request` WHERE `booking_id`=? AND `req_time`=?"
            .to_string();
        let t = value.1.format(DATETIME_FMT_P3F).to_string();
        let arg = vec![value.0.into(), t.into()];
        Self(stmt, Params::Positional(arg))
    }
}

impl<'a> From<&'a RefundRequestModel> for UpdateReviewArgs {
    #[rustfmt::skip]
    fn from(req: &'a RefundRequestModel) -> Self {
        // the guard on the PENDING state keeps a concurrent second review
        // from silently overwriting the first decision
        let stmt = "UPDATE `refund_request` SET `state`=?,`reviewer_id`=?,\
            `review_time`=?,`review_notes`=? WHERE `booking_id`=? AND `req_time`=? \
            AND `state`='PENDING'"
            .to_string();
        let (reviewer_id, review_time) = match req.state() {
            RefundRequestState::Approved { reviewer_id, review_time }
            | RefundRequestState::Rejected { reviewer_id, review_time } => {
                (Some(*reviewer_id), Some(review_time.format(DATETIME_FMT_P3F).to_string()))
            }
            _others => (None, None),
        };
        let arg = vec![
            req.state().label().into(),
            reviewer_id.into(),
            review_time.into(),
            req.review_notes().cloned().into(),
            req.booking_id().into(),
            req.req_time().format(DATETIME_FMT_P3F).to_string().into(),
        ];
        Self(stmt, Params::Positional(arg))
    }
}

impl From<u32> for FetchLedgerArgs {
    fn from(booking_id: u32) -> Self {
        let stmt = "SELECT `charge_id`,`captured_total`,`refunded_total`,`currency`,\
            `host_id`,`transfer_id`,`host_transferred` FROM `booking_ledger` \
            WHERE `booking_id`=?"
            .to_string();
        Self(stmt, Params::Positional(vec![booking_id.into()]))
    }
}

pub(crate) struct MariadbRefundRepo {
    _dstore: Arc<AppDStoreMariaDB>,
}

impl MariadbRefundRepo {
    pub(crate) fn new(ds: Arc<AppDataStoreContext>) -> Result<Self, AppRepoError> {
        ds.mariadb(None)
            .map(|found| Self { _dstore: found })
            .ok_or(AppRepoError {
                fn_label: AppRepoErrorFnLabel::InitRefundRepo,
                code: AppErrorCode::MissingDataStore,
                detail: AppRepoErrorDetail::Unknown,
            })
    }

    #[rustfmt::skip]
    fn _map_log_err_common(
        &self,
        code: AppErrorCode,
        detail: AppRepoErrorDetail,
        fn_label: AppRepoErrorFnLabel,
    ) -> AppRepoError {
        let e = AppRepoError { fn_label, code, detail };
        let logctx = self._dstore.log_context();
        app_log_event!(logctx, AppLogLevel::ERROR, "{:?}", e);
        e
    }

    async fn _acquire_conn(&self, fn_label: AppRepoErrorFnLabel) -> Result<Conn, AppRepoError> {
        self._dstore.acquire().await.map_err(|e| {
            self._map_log_err_common(
                AppErrorCode::DatabaseServerBusy,
                AppRepoErrorDetail::DataStore(e),
                fn_label,
            )
        })
    }

    fn _row_take<T: FromValue>(
        row: &mut Row,
        idx: usize,
    ) -> Result<T, (AppErrorCode, AppRepoErrorDetail)> {
        row.take_opt::<T, usize>(idx)
            .and_then(|r| r.ok())
            .ok_or((
                AppErrorCode::DataCorruption,
                AppRepoErrorDetail::DataRowParse(format!("refund-req-column: {idx}")),
            ))
    }

    #[rustfmt::skip]
    fn _parse_request_row(
        mut row: Row,
    ) -> Result<RefundRequestModel, (AppErrorCode, AppRepoErrorDetail)> {
        let booking_id = Self::_row_take::<u32>(&mut row, 0)?;
        let req_time = raw_column_to_datetime(Self::_row_take(&mut row, 1)?, 3)?;
        let amount = Self::_row_take::<Decimal>(&mut row, 2)?;
        let currency_raw = Self::_row_take::<String>(&mut row, 3)?;
        let reason = Self::_row_take::<String>(&mut row, 4)?;
        let requester_id = Self::_row_take::<u32>(&mut row, 5)?;
        let requester_role = Self::_row_take::<String>(&mut row, 6)?;
        let review_notes = Self::_row_take::<Option<String>>(&mut row, 7)?;
        let reverse_transfer = Self::_row_take::<bool>(&mut row, 8)?;
        let state_label = Self::_row_take::<String>(&mut row, 9)?;
        let state = match state_label.as_str() {
            "PENDING" => RefundRequestState::Pending,
            "APPROVED" | "REJECTED" => {
                let reviewer_id = Self::_row_take::<u32>(&mut row, 10)?;
                let review_time = raw_column_to_datetime(Self::_row_take(&mut row, 11)?, 3)?;
                if state_label.as_str() == "APPROVED" {
                    RefundRequestState::Approved { reviewer_id, review_time }
                } else {
                    RefundRequestState::Rejected { reviewer_id, review_time }
                }
            }
            "PROCESSED" => {
                let refund_txn_id = Self::_row_take::<String>(&mut row, 12)?;
                let reversal_txn_id = Self::_row_take::<Option<String>>(&mut row, 13)?;
                let process_time = raw_column_to_datetime(Self::_row_take(&mut row, 14)?, 3)?;
                RefundRequestState::Processed {
                    refund_txn_id, reversal_txn_id, process_time,
                }
            }
            _others => {
                return Err((
                    AppErrorCode::DataCorruption,
                    AppRepoErrorDetail::DataRowParse(format!("refund-req-state: {state_label}")),
                ));
            }
        };
        let m = RefundRequestModel::from((
            booking_id, req_time, amount, CurrencyDto::from(&currency_raw), reason,
            requester_id, requester_role, review_notes, reverse_transfer, state,
        ));
        Ok(m)
    } // end of fn _parse_request_row
} // end of impl MariadbRefundRepo

#[async_trait]
impl AbstractRefundRepo for MariadbRefundRepo {
    async fn create_request(&self, req: &RefundRequestModel) -> Result<(), AppRepoError> {
        let mut conn = self
            ._acquire_conn(AppRepoErrorFnLabel::CreateRefundReq)
            .await?;
        let (stmt, params) = InsertRefundReqArgs::from(req).into_parts();
        let result = conn.exec_iter(stmt, params).await.map_err(|e| {
            self._map_log_err_common(
                AppErrorCode::RemoteDbServerFailure,
                AppRepoErrorDetail::DatabaseExec(e.to_string()),
                AppRepoErrorFnLabel::CreateRefundReq,
            )
        })?;
        let num_affected = result.affected_rows();
        if num_affected == 1u64 {
            Ok(())
        } else {
            let msg = format!("rows-affected: {num_affected}");
            Err(self._map_log_err_common(
                AppErrorCode::DataCorruption,
                AppRepoErrorDetail::DatabaseExec(msg),
                AppRepoErrorFnLabel::CreateRefundReq,
            ))
        }
    }

    async fn fetch_request(
        &self,
        booking_id: u32,
        req_time: DateTime<Utc>,
    ) -> Result<Option<RefundRequestModel>, AppRepoError> {
        let mut conn = self
            ._acquire_conn(AppRepoErrorFnLabel::FetchRefundReq)
            .await?;
        let (stmt, params) = FetchRefundReqArgs::from((booking_id, req_time)).into_parts();
        let maybe_row = stmt
            .with(params)
            .first::<Row, &mut Conn>(&mut conn)
            .await
            .map_err(|e| {
                self._map_log_err_common(
                    AppErrorCode::RemoteDbServerFailure,
                    AppRepoErrorDetail::DatabaseQuery(e.to_string()),
                    AppRepoErrorFnLabel::FetchRefundReq,
                )
            })?;
        match maybe_row {
            Some(row) => {
                let m = Self::_parse_request_row(row).map_err(|(code, detail)| {
                    self._map_log_err_common(code, detail, AppRepoErrorFnLabel::FetchRefundReq)
                })?;
                Ok(Some(m))
            }
            None => Ok(None),
        }
    }

    async fn update_review(&self, req: &RefundRequestModel) -> Result<(), AppRepoError> {
        let mut conn = self
            ._acquire_conn(AppRepoErrorFnLabel::UpdateRefundReview)
            .await?;
        let (stmt, params) = UpdateReviewArgs::from(req).into_parts();
        let result = conn.exec_iter(stmt, params).await.map_err(|e| {
            self._map_log_err_common(
                AppErrorCode::RemoteDbServerFailure,
                AppRepoErrorDetail::DatabaseExec(e.to_string()),
                AppRepoErrorFnLabel::UpdateRefundReview,
            )
        })?;
        let num_affected = result.affected_rows();
        if num_affected == 1u64 {
            Ok(())
        } else {
            let msg = format!("review-raced, rows-affected: {num_affected}");
            Err(self._map_log_err_common(
                AppErrorCode::InvalidInput,
                AppRepoErrorDetail::ConstraintViolated(msg),
                AppRepoErrorFnLabel::UpdateRefundReview,
            ))
        }
    }

    async fn fetch_ledger(
        &self,
        booking_id: u32,
    ) -> Result<Option<BookingLedgerModel>, AppRepoError> {
        let mut conn = self._acquire_conn(AppRepoErrorFnLabel::FetchLedger).await?;
        let (stmt, params) = FetchLedgerArgs::from(booking_id).into_parts();
        let maybe_row = stmt
            .with(params)
            .first::<LedgerRowType, &mut Conn>(&mut conn)
            .await
            .map_err(|e| {
                self._map_log_err_common(
                    AppErrorCode::RemoteDbServerFailure,
                    AppRepoErrorDetail::DatabaseQuery(e.to_string()),
                    AppRepoErrorFnLabel::FetchLedger,
                )
            })?;
        let row = match maybe_row {
            Some(v) => v,
            None => {
                return Ok(None);
            }
        };
        #[rustfmt::skip]
        let (charge_id, captured_total, refunded_total, currency_raw,
             host_id, transfer_id, host_transferred) = row;
        let host_split = match (host_id, transfer_id, host_transferred) {
            (Some(host_id), Some(transfer_id), Some(amount_transferred)) => Some(HostSplitModel {
                host_id,
                transfer_id,
                amount_transferred,
            }),
            _not_split => None,
        };
        let m = BookingLedgerModel::from((
            booking_id,
            charge_id,
            captured_total,
            refunded_total,
            CurrencyDto::from(&currency_raw),
            host_split,
        ));
        Ok(Some(m))
    } // end of fn fetch_ledger

    async fn finalize_process(
        &self,
        req: &RefundRequestModel,
        ledger: &BookingLedgerModel,
        reversed_amount: Option<Decimal>,
        status: &SettlementStatusModel,
    ) -> Result<(), AppRepoError> {
        let (refund_txn_id, reversal_txn_id, process_time) = match req.state() {
            RefundRequestState::Processed {
                refund_txn_id,
                reversal_txn_id,
                process_time,
            } => (
                refund_txn_id.clone(),
                reversal_txn_id.clone(),
                process_time.format(DATETIME_FMT_P3F).to_string(),
            ),
            _others => {
                let msg = format!("finalize-on-state: {}", req.state().label());
                return Err(self._map_log_err_common(
                    AppErrorCode::InvalidInput,
                    AppRepoErrorDetail::ConstraintViolated(msg),
                    AppRepoErrorFnLabel::FinalizeRefund,
                ));
            }
        };
        let mut conn = self
            ._acquire_conn(AppRepoErrorFnLabel::FinalizeRefund)
            .await?;
        let mut options = TxOpts::default();
        // read-committed suffices, every statement below is guarded by
        // explicit row predicates
        options.with_isolation_level(IsolationLevel::ReadCommitted);
        let mut tx = conn.start_transaction(options).await.map_err(|e| {
            self._map_log_err_common(
                AppErrorCode::RemoteDbServerFailure,
                AppRepoErrorDetail::DatabaseTxStart(e.to_string()),
                AppRepoErrorFnLabel::FinalizeRefund,
            )
        })?;
        {
            let stmt = "UPDATE `refund_request` SET `state`='PROCESSED',`refund_txn_id`=?,\
                `reversal_txn_id`=?,`process_time`=? WHERE `booking_id`=? AND `req_time`=? \
                AND `state`='APPROVED'";
            let arg = vec![
                refund_txn_id.into(),
                reversal_txn_id.into(),
                process_time.into(),
                req.booking_id().into(),
                req.req_time().format(DATETIME_FMT_P3F).to_string().into(),
            ];
            let result = tx
                .exec_iter(stmt, Params::Positional(arg))
                .await
                .map_err(|e| {
                    self._map_log_err_common(
                        AppErrorCode::RemoteDbServerFailure,
                        AppRepoErrorDetail::DatabaseExec(e.to_string()),
                        AppRepoErrorFnLabel::FinalizeRefund,
                    )
                })?;
            if result.affected_rows() != 1u64 {
                // the request left APPROVED in between, dropping the tx
                // rolls every statement back
                let msg = format!("process-raced, rows-affected: {}", result.affected_rows());
                return Err(self._map_log_err_common(
                    AppErrorCode::InvalidInput,
                    AppRepoErrorDetail::ConstraintViolated(msg),
                    AppRepoErrorFnLabel::FinalizeRefund,
                ));
            }
        }
        {
            let stmt = "UPDATE `booking_ledger` SET `refunded_total`=? WHERE `booking_id`=?";
            let arg = vec![ledger.refunded_total().into(), ledger.booking_id().into()];
            let _result = tx
                .exec_iter(stmt, Params::Positional(arg))
                .await
                .map_err(|e| {
                    self._map_log_err_common(
                        AppErrorCode::RemoteDbServerFailure,
                        AppRepoErrorDetail::DatabaseExec(e.to_string()),
                        AppRepoErrorFnLabel::FinalizeRefund,
                    )
                })?;
        }
        if let (Some(amount), Some(split)) = (reversed_amount, ledger.host_split()) {
            let stmt = "INSERT INTO `host_balance`(`host_id`,`balance`) VALUES (?,?) \
                ON DUPLICATE KEY UPDATE `balance`=`balance`-?";
            let neg = -amount;
            let arg = vec![split.host_id.into(), neg.into(), amount.into()];
            let _result = tx
                .exec_iter(stmt, Params::Positional(arg))
                .await
                .map_err(|e| {
                    self._map_log_err_common(
                        AppErrorCode::RemoteDbServerFailure,
                        AppRepoErrorDetail::DatabaseExec(e.to_string()),
                        AppRepoErrorFnLabel::FinalizeRefund,
                    )
                })?;
        }
        {
            let (stmt, params) = upsert_status_stmt_params(req.booking_id(), status);
            let _result = tx.exec_iter(stmt, params).await.map_err(|e| {
                self._map_log_err_common(
                    AppErrorCode::RemoteDbServerFailure,
                    AppRepoErrorDetail::DatabaseExec(e.to_string()),
                    AppRepoErrorFnLabel::FinalizeRefund,
                )
            })?;
        }
        tx.commit().await.map_err(|e| {
            self._map_log_err_common(
                AppErrorCode::RemoteDbServerFailure,
                AppRepoErrorDetail::DatabaseTxCommit(e.to_string()),
                AppRepoErrorFnLabel::FinalizeRefund,
            )
        })
    } // end of fn finalize_process
} // end of impl AbstractRefundRepo for MariadbRefundRepo
