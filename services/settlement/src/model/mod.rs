mod adjust;
mod charge;
mod refund;
mod status;
mod telemetry;

pub use adjust::{
    AdjustmentLineModel, AdjustmentRecordModel, ChargeLineLabel, ResolutionModelError,
    WaiveRecordModel,
};
pub use charge::{
    ChargeAttemptMetaModel, ChargeAttemptModel, ChargeAttemptState, ChargeBreakdownModel,
    ChargeModelError, ChargeToken, DamageChargeModel, FuelChargeModel, LateChargeModel,
    MileageChargeModel, TelemetryAnomaly,
};
pub use refund::{
    BookingLedgerModel, HostSplitModel, RefundModelError, RefundRequestModel, RefundRequestState,
};
pub use status::{
    LifecycleStatus, PaymentOutcome, PaymentStatus, RefundCoverage, SettlementStatusModel,
    StaffResolutionAction, VerificationStatus,
};
pub use telemetry::{
    DamageEntryModel, DamageKind, FuelLevel, RatePlanModel, RatePlanModelError,
    TelemetryModelError, TripTelemetryModel,
};
