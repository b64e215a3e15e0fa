use std::result::Result;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use mysql_async::prelude::{Query, Queryable, WithParams};
use mysql_async::{Conn, IsolationLevel, Params, TxOpts, Value as MySqlVal};
use rust_decimal::Decimal;

use carshare_common::api::dto::CurrencyDto;
use carshare_common::error::AppErrorCode;
use carshare_common::logging::{app_log_event, AppLogLevel};
use carshare_common::util::hex_to_octet;

use super::super::{
    AbstractSettlementRepo, AppRepoError, AppRepoErrorDetail, AppRepoErrorFnLabel,
};
use super::{inner_into_parts, raw_column_to_datetime, DATETIME_FMT_P3F};
use crate::adapter::datastore::{AppDStoreMariaDB, AppDataStoreContext};
use crate::model::{
    AdjustmentRecordModel, ChargeAttemptMetaModel, ChargeAttemptModel, ChargeAttemptState,
    ChargeBreakdownModel, ChargeToken, DamageChargeModel, DamageEntryModel, DamageKind,
    FuelChargeModel, LateChargeModel, LifecycleStatus, MileageChargeModel, PaymentStatus,
    SettlementStatusModel, VerificationStatus, WaiveRecordModel,
};

struct InsertSettlementArgs(Vec<(String, Vec<Params>)>);
struct FetchSettlementArgs(String, Params);
struct FetchDamageLinesArgs(String, Params);
struct FetchStatusArgs(String, Params);
struct UpsertStatusArgs(String, Params);
struct InsertAttemptArgs(Vec<(String, Vec<Params>)>);
struct FetchAttemptsArgs(String, Params);
struct InsertWaiveArgs(String, Params);
struct InsertAdjustmentArgs(Vec<(String, Vec<Params>)>);

inner_into_parts!(FetchSettlementArgs);
inner_into_parts!(FetchDamageLinesArgs);
inner_into_parts!(FetchStatusArgs);
inner_into_parts!(UpsertStatusArgs);
inner_into_parts!(FetchAttemptsArgs);
inner_into_parts!(InsertWaiveArgs);

#[rustfmt::skip]
type SettlementRowType = (
    MySqlVal, u32, u32, u32, Decimal, u8,
    Decimal, u32, Decimal, Decimal, String, Decimal,
);
type DamageLineRowType = (String, Decimal);
type StatusRowType = (String, String, String);
#[rustfmt::skip]
type AttemptRowType = (
    u32, MySqlVal, u8, Option<String>, String, String,
    Decimal, String, String, Option<String>, MySqlVal, MySqlVal,
);

pub(super) fn upsert_status_stmt_params(
    booking_id: u32,
    status: &SettlementStatusModel,
) -> (String, Params) {
    let stmt = "INSERT INTO `booking_status`(`booking_id`,`lifecycle`,`verification`,`payment`) \
         VALUES (?,?,?,?) ON DUPLICATE KEY UPDATE `lifecycle`=?,`verification`=?,`payment`=?"
        .to_string();
    let (l, v, p) = (
        status.lifecycle.label(),
        status.verification.label(),
        status.payment.label(),
    );
    let arg = vec![
        booking_id.into(),
        l.into(),
        v.into(),
        p.into(),
        l.into(),
        v.into(),
        p.into(),
    ];
    (stmt, Params::Positional(arg))
}

#[rustfmt::skip]
fn parse_status_row(row: StatusRowType) -> Result<SettlementStatusModel, (AppErrorCode, AppRepoErrorDetail)> {
    let (l_raw, v_raw, p_raw) = row;
    let lifecycle = LifecycleStatus::parse_label(l_raw.as_str());
    let verification = VerificationStatus::parse_label(v_raw.as_str());
    let payment = PaymentStatus::parse_label(p_raw.as_str());
    match (lifecycle, verification, payment) {
        (Some(lifecycle), Some(verification), Some(payment)) => Ok(SettlementStatusModel {
            lifecycle, verification, payment,
        }),
        _at_least_one_unknown => Err((
            AppErrorCode::DataCorruption,
            AppRepoErrorDetail::DataRowParse(format!("status-labels: {l_raw}, {v_raw}, {p_raw}")),
        )),
    }
}

// column pair (state, state_detail) plus the nullable state-time column
fn attempt_state_to_columns(
    state: &ChargeAttemptState,
) -> (&'static str, Option<String>, Option<String>) {
    match state {
        ChargeAttemptState::Initialized => (state.label(), None, None),
        ChargeAttemptState::Succeeded {
            gateway_charge_id,
            completed_time,
        } => (
            state.label(),
            Some(gateway_charge_id.clone()),
            Some(completed_time.format(DATETIME_FMT_P3F).to_string()),
        ),
        ChargeAttemptState::Failed { decline_reason } => {
            (state.label(), Some(decline_reason.clone()), None)
        }
        ChargeAttemptState::RequiresAction { intent_ref } => {
            (state.label(), Some(intent_ref.clone()), None)
        }
        ChargeAttemptState::Unresolved { intent_ref } => {
            (state.label(), Some(intent_ref.clone()), None)
        }
    }
}

#[rustfmt::skip]
fn attempt_state_from_columns(
    label: String,
    detail: Option<String>,
    state_time: MySqlVal,
) -> Result<ChargeAttemptState, (AppErrorCode, AppRepoErrorDetail)> {
    let out = match label.as_str() {
        "initialized" => ChargeAttemptState::Initialized,
        "succeeded" => {
            let completed_time = raw_column_to_datetime(state_time, 3)?;
            ChargeAttemptState::Succeeded {
                gateway_charge_id: detail.unwrap_or_default(),
                completed_time,
            }
        }
        "failed" => ChargeAttemptState::Failed {
            decline_reason: detail.unwrap_or_default(),
        },
        "requires-action" => ChargeAttemptState::RequiresAction {
            intent_ref: detail.unwrap_or_default(),
        },
        "unresolved" => ChargeAttemptState::Unresolved {
            intent_ref: detail.unwrap_or_default(),
        },
        _others => {
            return Err((
                AppErrorCode::DataCorruption,
                AppRepoErrorDetail::DataRowParse(format!("attempt-state: {label}")),
            ));
        }
    };
    Ok(out)
}

impl<'a, 'b> From<(u32, DateTime<Utc>, &'a ChargeBreakdownModel, &'b SettlementStatusModel)>
    for InsertSettlementArgs
{
    #[rustfmt::skip]
    fn from(
        value: (u32, DateTime<Utc>, &'a ChargeBreakdownModel, &'b SettlementStatusModel),
    ) -> Self {
        let (booking_id, trip_end_time, breakdown, status) = value;
        let mut entries = Vec::new();
        {
            let stmt = "INSERT INTO `trip_settlement`(`booking_id`,`trip_end_time`,\
                `mileage_used`,`mileage_included`,`mileage_overage`,`mileage_charge`,\
                `fuel_shortfall`,`fuel_charge`,`late_hours`,`late_charge`,\
                `damage_charge`,`currency`,`total`) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?)"
                .to_string();
            let t = trip_end_time.format(DATETIME_FMT_P3F).to_string();
            let arg = vec![
                booking_id.into(), t.into(),
                breakdown.mileage.miles_used.into(),
                breakdown.mileage.miles_included.into(),
                breakdown.mileage.miles_overage.into(),
                breakdown.mileage.charge.into(),
                breakdown.fuel.shortfall_quarters.into(),
                breakdown.fuel.charge.into(),
                breakdown.late.hours_late.into(),
                breakdown.late.charge.into(),
                breakdown.damage.charge.into(),
                breakdown.currency.to_string().into(),
                breakdown.total.into(),
            ];
            entries.push((stmt, vec![Params::Positional(arg)]));
        }
        if !breakdown.damage.entries.is_empty() {
            let stmt = "INSERT INTO `settlement_damage_line`(`booking_id`,`seq`,\
                `kind`,`cost`) VALUES (?,?,?,?)"
                .to_string();
            let params_iter = breakdown.damage.entries.iter().enumerate()
                .map(|(seq, d)| {
                    let arg = vec![
                        booking_id.into(), (seq as u16).into(),
                        d.kind.label().into(), d.cost.into(),
                    ];
                    Params::Positional(arg)
                })
                .collect::<Vec<_>>();
            entries.push((stmt, params_iter));
        }
        {
            let (stmt, params) = upsert_status_stmt_params(booking_id, status);
            entries.push((stmt, vec![params]));
        }
        Self(entries)
    } // end of fn from
} // end of impl From for InsertSettlementArgs

impl From<u32> for FetchSettlementArgs {
    fn from(booking_id: u32) -> Self {
        let stmt = "SELECT `trip_end_time`,`mileage_used`,`mileage_included`,\
            `mileage_overage`,`mileage_charge`,`fuel_shortfall`,`fuel_charge`,\
            `late_hours`,`late_charge`,`damage_charge`,`currency`,`total` \
            FROM `trip_settlement` WHERE `booking_id`=?"
            .to_string();
        Self(stmt, Params::Positional(vec![booking_id.into()]))
    }
}
impl From<u32> for FetchDamageLinesArgs {
    fn from(booking_id: u32) -> Self {
        let stmt = "SELECT `kind`,`cost` FROM `settlement_damage_line` \
            WHERE `booking_id`=? ORDER BY `seq` ASC"
            .to_string();
        Self(stmt, Params::Positional(vec![booking_id.into()]))
    }
}
impl From<u32> for FetchStatusArgs {
    fn from(booking_id: u32) -> Self {
        let stmt = "SELECT `lifecycle`,`verification`,`payment` FROM `booking_status` \
            WHERE `booking_id`=?"
            .to_string();
        Self(stmt, Params::Positional(vec![booking_id.into()]))
    }
}

impl<'a> From<(u32, &'a SettlementStatusModel)> for UpsertStatusArgs {
    fn from(value: (u32, &'a SettlementStatusModel)) -> Self {
        let (stmt, params) = upsert_status_stmt_params(value.0, value.1);
        Self(stmt, params)
    }
}

impl<'a, 'b> From<(&'a ChargeAttemptModel, &'b SettlementStatusModel)> for InsertAttemptArgs {
    #[rustfmt::skip]
    fn from(value: (&'a ChargeAttemptModel, &'b SettlementStatusModel)) -> Self {
        let (attempt, status) = value;
        let booking_id = attempt.meta.booking_id();
        let mut entries = Vec::new();
        {
            let stmt = "INSERT INTO `charge_attempt`(`booking_id`,`trip_end_time`,\
                `attempt_nr`,`origin_token`,`customer_ref`,`instrument_ref`,`amount`,\
                `currency`,`state`,`state_detail`,`state_time`,`create_time`) \
                VALUES (?,?,?,?,?,?,?,?,?,?,?,?)"
                .to_string();
            let (s_label, s_detail, s_time) = attempt_state_to_columns(&attempt.state);
            let arg = vec![
                booking_id.into(),
                attempt.meta.trip_end_time().format(DATETIME_FMT_P3F).to_string().into(),
                attempt.meta.attempt_nr().into(),
                attempt.meta.origin_token().map(|t| t.to_string()).into(),
                attempt.meta.customer_ref().into(),
                attempt.meta.instrument_ref().into(),
                attempt.amount.into(),
                attempt.currency.to_string().into(),
                s_label.into(),
                s_detail.into(),
                s_time.into(),
                attempt.meta.create_time().format(DATETIME_FMT_P3F).to_string().into(),
            ];
            entries.push((stmt, vec![Params::Positional(arg)]));
        }
        {
            let (stmt, params) = upsert_status_stmt_params(booking_id, status);
            entries.push((stmt, vec![params]));
        }
        if let ChargeAttemptState::Succeeded { gateway_charge_id, .. } = &attempt.state {
            // captured funds land on the booking ledger in the same
            // transaction as the attempt record
            let stmt = "INSERT INTO `booking_ledger`(`booking_id`,`charge_id`,\
                `captured_total`,`refunded_total`,`currency`) VALUES (?,?,?,0,?) \
                ON DUPLICATE KEY UPDATE `charge_id`=?,`captured_total`=?"
                .to_string();
            let arg = vec![
                booking_id.into(),
                gateway_charge_id.as_str().into(),
                attempt.amount.into(),
                attempt.currency.to_string().into(),
                gateway_charge_id.as_str().into(),
                attempt.amount.into(),
            ];
            entries.push((stmt, vec![Params::Positional(arg)]));
        }
        Self(entries)
    } // end of fn from
} // end of impl From for InsertAttemptArgs

impl From<u32> for FetchAttemptsArgs {
    fn from(booking_id: u32) -> Self {
        let stmt = "SELECT `booking_id`,`trip_end_time`,`attempt_nr`,`origin_token`,\
            `customer_ref`,`instrument_ref`,`amount`,`currency`,`state`,`state_detail`,\
            `state_time`,`create_time` FROM `charge_attempt` WHERE `booking_id`=? \
            ORDER BY `attempt_nr` ASC"
            .to_string();
        Self(stmt, Params::Positional(vec![booking_id.into()]))
    }
}

impl<'a> From<&'a WaiveRecordModel> for InsertWaiveArgs {
    #[rustfmt::skip]
    fn from(rec: &'a WaiveRecordModel) -> Self {
        let stmt = "INSERT INTO `charge_waive_record`(`booking_id`,`create_time`,\
            `original_amount`,`percentage`,`waived_amount`,`remaining_amount`,\
            `reason`,`staff_id`) VALUES (?,?,?,?,?,?,?,?)"
            .to_string();
        let arg = vec![
            rec.booking_id().into(),
            rec.create_time().format(DATETIME_FMT_P3F).to_string().into(),
            rec.original_amount().into(),
            rec.percentage().into(),
            rec.waived_amount().into(),
            rec.remaining_amount().into(),
            rec.reason().into(),
            rec.staff_id().into(),
        ];
        Self(stmt, Params::Positional(arg))
    }
}

impl<'a> From<&'a AdjustmentRecordModel> for InsertAdjustmentArgs {
    #[rustfmt::skip]
    fn from(rec: &'a AdjustmentRecordModel) -> Self {
        let mut entries = Vec::new();
        let t = rec.create_time().format(DATETIME_FMT_P3F).to_string();
        {
            let stmt = "INSERT INTO `charge_adjust_record`(`booking_id`,`create_time`,\
                `reason`,`staff_id`) VALUES (?,?,?,?)"
                .to_string();
            let arg = vec![
                rec.booking_id().into(), t.as_str().into(),
                rec.reason().into(), rec.staff_id().into(),
            ];
            entries.push((stmt, vec![Params::Positional(arg)]));
        }
        {
            let stmt = "INSERT INTO `charge_adjust_line`(`booking_id`,`create_time`,\
                `line_label`,`original_amount`,`adjusted_amount`,`included`) \
                VALUES (?,?,?,?,?,?)"
                .to_string();
            let params_iter = rec.lines().iter()
                .map(|l| {
                    let arg = vec![
                        rec.booking_id().into(), t.as_str().into(),
                        l.label.label().into(), l.original_amount.into(),
                        l.adjusted_amount.into(), l.included.into(),
                    ];
                    Params::Positional(arg)
                })
                .collect::<Vec<_>>();
            entries.push((stmt, params_iter));
        }
        Self(entries)
    }
} // end of impl From for InsertAdjustmentArgs

pub(crate) struct MariadbSettlementRepo {
    _dstore: Arc<AppDStoreMariaDB>,
}

impl MariadbSettlementRepo {
    pub(crate) fn new(ds: Arc<AppDataStoreContext>) -> Result<Self, AppRepoError> {
        ds.mariadb(None)
            .map(|found| Self { _dstore: found })
            .ok_or(AppRepoError {
                fn_label: AppRepoErrorFnLabel::InitSettlementRepo,
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

    async fn _run_batch_in_tx(
        &self,
        conn: &mut Conn,
        entries: Vec<(String, Vec<Params>)>,
        fn_label: fn() -> AppRepoErrorFnLabel,
    ) -> Result<(), AppRepoError> {
        let mut options = TxOpts::default();
        options.with_isolation_level(IsolationLevel::RepeatableRead);
        let mut tx = conn.start_transaction(options).await.map_err(|e| {
            self._map_log_err_common(
                AppErrorCode::RemoteDbServerFailure,
                AppRepoErrorDetail::DatabaseTxStart(e.to_string()),
                fn_label(),
            )
        })?;
        for (stmt, params_iter) in entries {
            tx.exec_batch(stmt, params_iter).await.map_err(|e| {
                self._map_log_err_common(
                    AppErrorCode::RemoteDbServerFailure,
                    AppRepoErrorDetail::DatabaseExec(e.to_string()),
                    fn_label(),
                )
            })?;
        }
        tx.commit().await.map_err(|e| {
            self._map_log_err_common(
                AppErrorCode::RemoteDbServerFailure,
                AppRepoErrorDetail::DatabaseTxCommit(e.to_string()),
                fn_label(),
            )
        })
    } // end of fn _run_batch_in_tx

    #[rustfmt::skip]
    fn _parse_attempt_row(row: AttemptRowType)
        -> Result<ChargeAttemptModel, (AppErrorCode, AppRepoErrorDetail)>
    {
        let (booking_id, trip_end_raw, attempt_nr, origin_raw, customer_ref,
             instrument_ref, amount, currency_raw, state_label, state_detail,
             state_time, create_raw) = row;
        let trip_end_time = raw_column_to_datetime(trip_end_raw, 3)?;
        let create_time = raw_column_to_datetime(create_raw, 3)?;
        let origin_token = match origin_raw {
            Some(hexa) => {
                let octets = hex_to_octet(hexa.as_str()).map_err(|(code, msg)| {
                    (code, AppRepoErrorDetail::DataRowParse(msg))
                })?;
                let t = ChargeToken::try_from(octets).map_err(|(code, msg)| {
                    (code, AppRepoErrorDetail::DataRowParse(msg))
                })?;
                Some(t)
            }
            None => None,
        };
        let state = attempt_state_from_columns(state_label, state_detail, state_time)?;
        let meta = ChargeAttemptMetaModel::from((
            booking_id, trip_end_time, attempt_nr, origin_token,
            customer_ref, instrument_ref, create_time,
        ));
        Ok(ChargeAttemptModel {
            meta, amount,
            currency: CurrencyDto::from(&currency_raw),
            state,
        })
    } // end of fn _parse_attempt_row
} // end of impl MariadbSettlementRepo

#[async_trait]
impl AbstractSettlementRepo for MariadbSettlementRepo {
    async fn create_settlement(
        &self,
        booking_id: u32,
        trip_end_time: DateTime<Utc>,
        breakdown: &ChargeBreakdownModel,
        status: &SettlementStatusModel,
    ) -> Result<(), AppRepoError> {
        let args = InsertSettlementArgs::from((booking_id, trip_end_time, breakdown, status));
        let mut conn = self
            ._acquire_conn(AppRepoErrorFnLabel::CreateSettlement)
            .await?;
        self._run_batch_in_tx(&mut conn, args.0, || AppRepoErrorFnLabel::CreateSettlement)
            .await
    }

    async fn fetch_settlement(
        &self,
        booking_id: u32,
    ) -> Result<Option<(DateTime<Utc>, ChargeBreakdownModel, SettlementStatusModel)>, AppRepoError>
    {
        let mut conn = self
            ._acquire_conn(AppRepoErrorFnLabel::FetchSettlement)
            .await?;
        let (stmt, params) = FetchSettlementArgs::from(booking_id).into_parts();
        let maybe_row = stmt
            .with(params)
            .first::<SettlementRowType, &mut Conn>(&mut conn)
            .await
            .map_err(|e| {
                self._map_log_err_common(
                    AppErrorCode::RemoteDbServerFailure,
                    AppRepoErrorDetail::DatabaseQuery(e.to_string()),
                    AppRepoErrorFnLabel::FetchSettlement,
                )
            })?;
        let row = match maybe_row {
            Some(v) => v,
            None => {
                return Ok(None);
            }
        };
        let (stmt, params) = FetchDamageLinesArgs::from(booking_id).into_parts();
        let damage_rows = stmt
            .with(params)
            .fetch::<DamageLineRowType, &mut Conn>(&mut conn)
            .await
            .map_err(|e| {
                self._map_log_err_common(
                    AppErrorCode::RemoteDbServerFailure,
                    AppRepoErrorDetail::DatabaseQuery(e.to_string()),
                    AppRepoErrorFnLabel::FetchSettlement,
                )
            })?;
        let (stmt, params) = FetchStatusArgs::from(booking_id).into_parts();
        let status_row = stmt
            .with(params)
            .first::<StatusRowType, &mut Conn>(&mut conn)
            .await
            .map_err(|e| {
                self._map_log_err_common(
                    AppErrorCode::RemoteDbServerFailure,
                    AppRepoErrorDetail::DatabaseQuery(e.to_string()),
                    AppRepoErrorFnLabel::FetchSettlement,
                )
            })?
            .ok_or_else(|| self._map_log_err_common(
                AppErrorCode::DataCorruption,
                AppRepoErrorDetail::DataRowParse("status-row-missing".to_string()),
                AppRepoErrorFnLabel::FetchSettlement,
            ))?;

        #[rustfmt::skip]
        let (trip_end_raw, miles_used, miles_included, miles_overage, mileage_charge,
             shortfall_quarters, fuel_charge, hours_late, late_charge, damage_charge,
             currency_raw, total) = row;
        let trip_end_time = raw_column_to_datetime(trip_end_raw, 3).map_err(|(code, detail)| {
            self._map_log_err_common(code, detail, AppRepoErrorFnLabel::FetchSettlement)
        })?;
        let mut damage_entries = Vec::new();
        for (kind_raw, cost) in damage_rows {
            let kind = DamageKind::parse_label(kind_raw.as_str()).ok_or_else(|| {
                self._map_log_err_common(
                    AppErrorCode::DataCorruption,
                    AppRepoErrorDetail::DataRowParse(format!("damage-kind: {kind_raw}")),
                    AppRepoErrorFnLabel::FetchSettlement,
                )
            })?;
            damage_entries.push(DamageEntryModel { kind, cost });
        }
        let status = parse_status_row(status_row).map_err(|(code, detail)| {
            self._map_log_err_common(code, detail, AppRepoErrorFnLabel::FetchSettlement)
        })?;
        let breakdown = ChargeBreakdownModel::from((
            MileageChargeModel {
                miles_used,
                miles_included,
                miles_overage,
                charge: mileage_charge,
            },
            FuelChargeModel {
                shortfall_quarters,
                charge: fuel_charge,
            },
            LateChargeModel {
                hours_late,
                charge: late_charge,
            },
            DamageChargeModel {
                entries: damage_entries,
                charge: damage_charge,
            },
            CurrencyDto::from(&currency_raw),
            total,
        ));
        Ok(Some((trip_end_time, breakdown, status)))
    } // end of fn fetch_settlement

    async fn update_status(
        &self,
        booking_id: u32,
        status: &SettlementStatusModel,
    ) -> Result<(), AppRepoError> {
        let mut conn = self._acquire_conn(AppRepoErrorFnLabel::UpdateStatus).await?;
        let (stmt, params) = UpsertStatusArgs::from((booking_id, status)).into_parts();
        let _result = conn.exec_iter(stmt, params).await.map_err(|e| {
            self._map_log_err_common(
                AppErrorCode::RemoteDbServerFailure,
                AppRepoErrorDetail::DatabaseExec(e.to_string()),
                AppRepoErrorFnLabel::UpdateStatus,
            )
        })?;
        Ok(())
    }

    async fn create_attempt(
        &self,
        attempt: &ChargeAttemptModel,
        status: &SettlementStatusModel,
    ) -> Result<(), AppRepoError> {
        let args = InsertAttemptArgs::from((attempt, status));
        let mut conn = self._acquire_conn(AppRepoErrorFnLabel::CreateAttempt).await?;
        self._run_batch_in_tx(&mut conn, args.0, || AppRepoErrorFnLabel::CreateAttempt)
            .await
    }

    async fn fetch_attempts(
        &self,
        booking_id: u32,
    ) -> Result<Vec<ChargeAttemptModel>, AppRepoError> {
        let mut conn = self._acquire_conn(AppRepoErrorFnLabel::FetchAttempts).await?;
        let (stmt, params) = FetchAttemptsArgs::from(booking_id).into_parts();
        let mut row_stream = stmt
            .with(params)
            .stream::<AttemptRowType, &mut Conn>(&mut conn)
            .await
            .map_err(|e| {
                self._map_log_err_common(
                    AppErrorCode::RemoteDbServerFailure,
                    AppRepoErrorDetail::DatabaseQuery(e.to_string()),
                    AppRepoErrorFnLabel::FetchAttempts,
                )
            })?;
        let mut out = Vec::new();
        while let Some(result) = row_stream.next().await {
            let row = result.map_err(|e| {
                self._map_log_err_common(
                    AppErrorCode::RemoteDbServerFailure,
                    AppRepoErrorDetail::DatabaseQuery(e.to_string()),
                    AppRepoErrorFnLabel::FetchAttempts,
                )
            })?;
            let m = Self::_parse_attempt_row(row).map_err(|(code, detail)| {
                self._map_log_err_common(code, detail, AppRepoErrorFnLabel::FetchAttempts)
            })?;
            out.push(m);
        }
        Ok(out)
    }

    async fn save_waive(&self, rec: &WaiveRecordModel) -> Result<(), AppRepoError> {
        let mut conn = self
            ._acquire_conn(AppRepoErrorFnLabel::SaveWaiveRecord)
            .await?;
        let (stmt, params) = InsertWaiveArgs::from(rec).into_parts();
        let result = conn.exec_iter(stmt, params).await.map_err(|e| {
            self._map_log_err_common(
                AppErrorCode::RemoteDbServerFailure,
                AppRepoErrorDetail::DatabaseExec(e.to_string()),
                AppRepoErrorFnLabel::SaveWaiveRecord,
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
                AppRepoErrorFnLabel::SaveWaiveRecord,
            ))
        }
    }

    async fn save_adjustment(&self, rec: &AdjustmentRecordModel) -> Result<(), AppRepoError> {
        let args = InsertAdjustmentArgs::from(rec);
        let mut conn = self
            ._acquire_conn(AppRepoErrorFnLabel::SaveAdjustmentRecord)
            .await?;
        self._run_batch_in_tx(&mut conn, args.0, || AppRepoErrorFnLabel::SaveAdjustmentRecord)
            .await
    }
} // end of impl AbstractSettlementRepo for MariadbSettlementRepo
