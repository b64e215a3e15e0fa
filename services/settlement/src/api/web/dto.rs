use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use carshare_common::api::dto::CurrencyDto;

use crate::model::{
    ChargeAttemptModel, ChargeAttemptState, ChargeBreakdownModel, ChargeModelError,
    RatePlanModelError, RefundModelError, RefundRequestModel, ResolutionModelError,
    SettlementStatusModel, TelemetryAnomaly, TelemetryModelError,
};

#[derive(Deserialize, Serialize, Clone, Copy)]
pub enum FuelLevelDto {
    Empty,
    Quarter,
    Half,
    ThreeQuarters,
    Full,
}

#[derive(Deserialize, Serialize, Clone, Copy)]
pub enum DamageKindDto {
    BodyScratch,
    Dent,
    GlassCrack,
    InteriorStain,
    MissingAccessory,
    MechanicalWear,
}

#[derive(Deserialize, Serialize)]
pub struct DamageEntryDto {
    pub kind: DamageKindDto,
    // amounts are sent as strings, converted to decimal type internally
    pub cost: String,
}

#[derive(Deserialize)]
pub struct TripTelemetryDto {
    pub odometer_start: u32,
    pub odometer_end: u32,
    pub fuel_start: Option<FuelLevelDto>,
    pub fuel_end: Option<FuelLevelDto>,
    pub scheduled_return: DateTime<FixedOffset>,
    pub actual_return: DateTime<FixedOffset>,
    pub duration_days: u32,
    pub damages: Vec<DamageEntryDto>,
}

#[derive(Deserialize)]
pub struct RatePlanDto {
    pub miles_included_per_day: u32,
    pub per_mile_fee: String,
    pub full_tank_fee: String,
    pub late_fee_per_hour: String,
    pub currency: CurrencyDto,
}

#[derive(Deserialize)]
pub struct TripSettleReqDto {
    pub telemetry: TripTelemetryDto,
    pub rate_plan: RatePlanDto,
    pub customer_id: String,
    pub payment_method_id: String,
    pub has_open_disputes: bool,
}

#[derive(Deserialize)]
pub struct ChargeRetryReqDto {
    pub customer_id: String,
    pub payment_method_id: String,
    pub has_open_disputes: bool,
}

#[derive(Deserialize)]
pub struct WaiveReqDto {
    pub percentage: u16,
    pub reason: String,
    // payment instrument for capturing the residual amount of a partial
    // waive, ignored on a full waive
    pub customer_id: Option<String>,
    pub payment_method_id: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Copy)]
pub enum ChargeLineLabelDto {
    Mileage,
    Fuel,
    Late,
    Damage,
}

#[derive(Deserialize)]
pub struct AdjustLineReqDto {
    pub line: ChargeLineLabelDto,
    pub adjusted_amount: String,
    pub included: bool,
}

#[derive(Deserialize)]
pub struct AdjustReqDto {
    pub lines: Vec<AdjustLineReqDto>,
    pub reason: String,
    pub customer_id: Option<String>,
    pub payment_method_id: Option<String>,
}

#[derive(Deserialize)]
pub struct RefundRequestDto {
    pub amount: String,
    pub reason: String,
    pub reverse_host_transfer: bool,
}

#[derive(Deserialize, Clone, Copy)]
pub enum RefundReviewDecisionDto {
    Approve,
    Reject,
}

#[derive(Deserialize)]
pub struct RefundReviewReqDto {
    pub decision: RefundReviewDecisionDto,
    pub notes: Option<String>,
}

// ---- response DTOs ----

#[derive(Serialize)]
pub struct MileageChargeRespDto {
    pub miles_used: u32,
    pub miles_included: u32,
    pub miles_overage: u32,
    pub charge: String,
}
#[derive(Serialize)]
pub struct FuelChargeRespDto {
    pub shortfall_quarters: u8,
    pub charge: String,
}
#[derive(Serialize)]
pub struct LateChargeRespDto {
    pub hours_late: u32,
    pub charge: String,
}
#[derive(Serialize)]
pub struct DamageChargeRespDto {
    pub entries: Vec<DamageEntryDto>,
    pub charge: String,
}

#[derive(Serialize)]
#[serde(tag = "type")]
pub enum TelemetryAnomalyDto {
    OdometerRollback { start: u32, end: u32 },
    FuelReadingMissing,
}

#[derive(Serialize)]
pub struct ChargeBreakdownRespDto {
    pub mileage: MileageChargeRespDto,
    pub fuel: FuelChargeRespDto,
    pub late: LateChargeRespDto,
    pub damage: DamageChargeRespDto,
    pub currency: CurrencyDto,
    pub total: String,
    pub anomalies: Vec<TelemetryAnomalyDto>,
}

#[derive(Serialize, PartialEq, Debug)]
pub struct SettlementStatusDto {
    pub lifecycle: String,
    pub verification: String,
    pub payment: String,
}

#[derive(Serialize)]
#[serde(tag = "status")]
pub enum ChargeOutcomeDto {
    Succeeded {
        charge_token: String,
        gateway_charge_id: String,
        amount: String,
    },
    Failed {
        error: String,
    },
    RequiresAction {
        intent_ref: String,
    },
    Unresolved {
        intent_ref: String,
    },
    // zero-amount settlement, no capture was ever required
    NotRequired,
}

#[derive(Serialize)]
pub struct TripSettleRespDto {
    pub booking_id: u32,
    pub breakdown: ChargeBreakdownRespDto,
    pub outcome: ChargeOutcomeDto,
    pub status: SettlementStatusDto,
}

#[derive(Serialize)]
#[serde(tag = "reason")]
pub enum TelemetryErrorDto {
    InvalidDuration { given: u32 },
    DamageCostParse { kind: DamageKindDto, given: String },
    NegativeDamageCost { kind: DamageKindDto, given: String },
}

#[derive(Serialize)]
#[serde(tag = "reason")]
pub enum RatePlanErrorDto {
    AmountParse { field: String, given: String },
    NegativeAmount { field: String, given: String },
    UnknownCurrency,
}

#[derive(Serialize)]
#[serde(tag = "reason")]
pub enum PaymentReqErrorDto {
    EmptyCustomerRef,
    EmptyInstrumentRef,
    NonPositiveAmount { given: String },
    AlreadyCaptured { gateway_charge_id: String },
    MissingOriginAttempt,
    AttemptNumOverflow { last: u8 },
    CorruptedToken { detail: String },
}

#[derive(Serialize, Default)]
pub struct TripSettleErrorDto {
    pub telemetry: Option<Vec<TelemetryErrorDto>>,
    pub rate_plan: Option<Vec<RatePlanErrorDto>>,
    pub payment: Option<PaymentReqErrorDto>,
}

#[derive(Serialize)]
#[serde(tag = "reason")]
pub enum ResolutionErrorDto {
    PercentOutOfRange { given: u16 },
    AmountParse { line: ChargeLineLabelDto, given: String },
    NegativeAmount { line: ChargeLineLabelDto, given: String },
    ExceedsOriginal { line: ChargeLineLabelDto, original: String, adjusted: String },
    DuplicateLine { line: ChargeLineLabelDto },
    EmptyResolution,
    EmptyReason,
    MissingInstrument,
    MissingSettlement,
}

#[derive(Serialize)]
pub struct StaffResolveRespDto {
    pub booking_id: u32,
    pub action: String,
    pub original_amount: String,
    pub waived_amount: Option<String>,
    pub remaining_amount: Option<String>,
    pub adjusted_total: Option<String>,
    pub outcome: Option<ChargeOutcomeDto>,
    pub status: SettlementStatusDto,
}

#[derive(Serialize)]
pub struct RefundRequestRespDto {
    pub request_id: String,
    pub booking_id: u32,
    pub amount: String,
    pub currency: CurrencyDto,
    pub state: String,
    pub req_time: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct TransferReversalRespDto {
    pub reversal_id: String,
    pub amount: String,
}

#[derive(Serialize)]
pub struct RefundProcessRespDto {
    pub request_id: String,
    pub booking_id: u32,
    pub refund_txn_id: String,
    pub amount: String,
    pub reversal: Option<TransferReversalRespDto>,
    // recorded for manual follow-up, the request is still processed
    pub reversal_error: Option<String>,
    pub status: SettlementStatusDto,
}

#[derive(Serialize)]
#[serde(tag = "reason")]
pub enum RefundErrorDto {
    InvalidStateShift { from: String, to: String },
    AlreadyProcessed { refund_txn_id: String },
    ExceedsRefundable { requested: String, remaining: String },
    MissingCapture,
    AmountParse { given: String },
    NonPositiveAmount { given: String },
    EmptyReason,
    MissingRequest,
    MissingLedger,
}

#[derive(Serialize)]
pub struct ChargeAttemptRespDto {
    pub charge_token: String,
    pub attempt_nr: u8,
    pub origin_token: Option<String>,
    pub amount: String,
    pub state: String,
    pub gateway_charge_id: Option<String>,
    pub decline_reason: Option<String>,
    pub create_time: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct SettlementRefreshRespDto {
    pub booking_id: u32,
    pub breakdown: ChargeBreakdownRespDto,
    pub status: SettlementStatusDto,
    pub attempts: Vec<ChargeAttemptRespDto>,
}

// ---- conversions from domain models ----

impl From<&ChargeBreakdownModel> for ChargeBreakdownRespDto {
    fn from(value: &ChargeBreakdownModel) -> Self {
        let entries = value
            .damage
            .entries
            .iter()
            .map(|d| DamageEntryDto {
                kind: d.kind.into(),
                cost: d.cost.to_string(),
            })
            .collect::<Vec<_>>();
        let anomalies = value
            .anomalies
            .iter()
            .map(|a| match a {
                TelemetryAnomaly::OdometerRollback { start, end } => {
                    TelemetryAnomalyDto::OdometerRollback {
                        start: *start,
                        end: *end,
                    }
                }
                TelemetryAnomaly::FuelReadingMissing => TelemetryAnomalyDto::FuelReadingMissing,
            })
            .collect::<Vec<_>>();
        Self {
            mileage: MileageChargeRespDto {
                miles_used: value.mileage.miles_used,
                miles_included: value.mileage.miles_included,
                miles_overage: value.mileage.miles_overage,
                charge: value.mileage.charge.to_string(),
            },
            fuel: FuelChargeRespDto {
                shortfall_quarters: value.fuel.shortfall_quarters,
                charge: value.fuel.charge.to_string(),
            },
            late: LateChargeRespDto {
                hours_late: value.late.hours_late,
                charge: value.late.charge.to_string(),
            },
            damage: DamageChargeRespDto {
                entries,
                charge: value.damage.charge.to_string(),
            },
            currency: value.currency.clone(),
            total: value.total.to_string(),
            anomalies,
        }
    } // end of fn from
} // end of impl From for ChargeBreakdownRespDto

impl From<&SettlementStatusModel> for SettlementStatusDto {
    fn from(value: &SettlementStatusModel) -> Self {
        Self {
            lifecycle: value.lifecycle.label().to_string(),
            verification: value.verification.label().to_string(),
            payment: value.payment.label().to_string(),
        }
    }
}

impl From<&ChargeAttemptModel> for ChargeOutcomeDto {
    fn from(value: &ChargeAttemptModel) -> Self {
        match &value.state {
            ChargeAttemptState::Succeeded {
                gateway_charge_id, ..
            } => Self::Succeeded {
                charge_token: value.meta.token().to_string(),
                gateway_charge_id: gateway_charge_id.clone(),
                amount: value.amount.to_string(),
            },
            ChargeAttemptState::Failed { decline_reason } => Self::Failed {
                error: decline_reason.clone(),
            },
            ChargeAttemptState::RequiresAction { intent_ref } => Self::RequiresAction {
                intent_ref: intent_ref.clone(),
            },
            ChargeAttemptState::Unresolved { intent_ref } => Self::Unresolved {
                intent_ref: intent_ref.clone(),
            },
            ChargeAttemptState::Initialized => Self::Unresolved {
                intent_ref: String::new(),
            },
        }
    }
}

impl From<&ChargeAttemptModel> for ChargeAttemptRespDto {
    fn from(value: &ChargeAttemptModel) -> Self {
        let (gateway_charge_id, decline_reason) = match &value.state {
            ChargeAttemptState::Succeeded {
                gateway_charge_id, ..
            } => (Some(gateway_charge_id.clone()), None),
            ChargeAttemptState::Failed { decline_reason } => (None, Some(decline_reason.clone())),
            _others => (None, None),
        };
        Self {
            charge_token: value.meta.token().to_string(),
            attempt_nr: value.meta.attempt_nr(),
            origin_token: value.meta.origin_token().map(|t| t.to_string()),
            amount: value.amount.to_string(),
            state: value.state.label().to_string(),
            gateway_charge_id,
            decline_reason,
            create_time: *value.meta.create_time(),
        }
    }
}

impl From<&RefundRequestModel> for RefundRequestRespDto {
    fn from(value: &RefundRequestModel) -> Self {
        Self {
            request_id: value.token().to_string(),
            booking_id: value.booking_id(),
            amount: value.amount_requested().to_string(),
            currency: value.currency().clone(),
            state: value.state().label().to_string(),
            req_time: *value.req_time(),
        }
    }
}

impl From<TelemetryModelError> for TelemetryErrorDto {
    fn from(value: TelemetryModelError) -> Self {
        match value {
            TelemetryModelError::InvalidDuration(given) => Self::InvalidDuration { given },
            TelemetryModelError::DamageCostParse(kind, given, _detail) => Self::DamageCostParse {
                kind: kind.into(),
                given,
            },
            TelemetryModelError::NegativeDamageCost(kind, given) => Self::NegativeDamageCost {
                kind: kind.into(),
                given: given.to_string(),
            },
        }
    }
}

impl From<RatePlanModelError> for RatePlanErrorDto {
    fn from(value: RatePlanModelError) -> Self {
        match value {
            RatePlanModelError::AmountParse(field, given, _detail) => Self::AmountParse {
                field: field.to_string(),
                given,
            },
            RatePlanModelError::NegativeAmount(field, given) => Self::NegativeAmount {
                field: field.to_string(),
                given: given.to_string(),
            },
            RatePlanModelError::UnknownCurrency => Self::UnknownCurrency,
        }
    }
}

impl From<ChargeModelError> for PaymentReqErrorDto {
    fn from(value: ChargeModelError) -> Self {
        match value {
            ChargeModelError::EmptyCustomerRef => Self::EmptyCustomerRef,
            ChargeModelError::EmptyInstrumentRef => Self::EmptyInstrumentRef,
            ChargeModelError::NonPositiveAmount(given) => Self::NonPositiveAmount {
                given: given.to_string(),
            },
            ChargeModelError::AlreadyCaptured { gateway_charge_id } => {
                Self::AlreadyCaptured { gateway_charge_id }
            }
            ChargeModelError::MissingOriginAttempt(_id) => Self::MissingOriginAttempt,
            ChargeModelError::AttemptNumOverflow(last) => Self::AttemptNumOverflow { last },
            ChargeModelError::TokenDecode(_code, detail) => Self::CorruptedToken { detail },
        }
    }
}

impl From<ResolutionModelError> for ResolutionErrorDto {
    fn from(value: ResolutionModelError) -> Self {
        match value {
            ResolutionModelError::PercentOutOfRange(given) => Self::PercentOutOfRange { given },
            ResolutionModelError::AmountParse(line, given, _detail) => Self::AmountParse {
                line: line.into(),
                given,
            },
            ResolutionModelError::NegativeAmount(line, given) => Self::NegativeAmount {
                line: line.into(),
                given: given.to_string(),
            },
            ResolutionModelError::ExceedsOriginal {
                line,
                original,
                adjusted,
            } => Self::ExceedsOriginal {
                line: line.into(),
                original: original.to_string(),
                adjusted: adjusted.to_string(),
            },
            ResolutionModelError::DuplicateLine(line) => Self::DuplicateLine { line: line.into() },
            ResolutionModelError::EmptyResolution => Self::EmptyResolution,
            ResolutionModelError::EmptyReason => Self::EmptyReason,
            ResolutionModelError::MissingInstrument => Self::MissingInstrument,
        }
    }
}

impl From<RefundModelError> for RefundErrorDto {
    fn from(value: RefundModelError) -> Self {
        match value {
            RefundModelError::InvalidStateShift { from, to } => Self::InvalidStateShift {
                from: from.to_string(),
                to: to.to_string(),
            },
            RefundModelError::AlreadyProcessed { refund_txn_id } => {
                Self::AlreadyProcessed { refund_txn_id }
            }
            RefundModelError::ExceedsRefundable {
                requested,
                remaining,
            } => Self::ExceedsRefundable {
                requested: requested.to_string(),
                remaining: remaining.to_string(),
            },
            RefundModelError::MissingCapture(_id) => Self::MissingCapture,
            RefundModelError::AmountParse(given, _detail) => Self::AmountParse { given },
            RefundModelError::NonPositiveAmount(given) => Self::NonPositiveAmount {
                given: given.to_string(),
            },
            RefundModelError::EmptyReason => Self::EmptyReason,
        }
    }
}
