mod adjust;
pub(crate) mod refund;
mod status;

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use rust_decimal::Decimal;

use carshare_common::api::dto::CurrencyDto;

use settlement::api::web::dto::{
    DamageEntryDto, DamageKindDto, FuelLevelDto, RatePlanDto, TripTelemetryDto,
};
use settlement::model::{
    ChargeBreakdownModel, DamageChargeModel, FuelChargeModel, LateChargeModel, MileageChargeModel,
};

pub(crate) fn ut_scheduled_return() -> DateTime<FixedOffset> {
    Utc.with_ymd_and_hms(2024, 1, 4, 10, 0, 0).unwrap().into()
}

#[rustfmt::skip]
pub(crate) fn ut_default_rate_plan() -> RatePlanDto {
    RatePlanDto {
        miles_included_per_day: 200,
        per_mile_fee: "0.45".to_string(),
        full_tank_fee: "300".to_string(),
        late_fee_per_hour: "50".to_string(),
        currency: CurrencyDto::USD,
    }
}

#[rustfmt::skip]
pub(crate) fn ut_setup_telemetry_dto(
    odo: (u32, u32),
    fuel: (Option<FuelLevelDto>, Option<FuelLevelDto>),
    minutes_late: i64,
    duration_days: u32,
    damages: Vec<(DamageKindDto, &str)>,
) -> TripTelemetryDto {
    let scheduled_return = ut_scheduled_return();
    let actual_return = scheduled_return + Duration::minutes(minutes_late);
    let damages = damages.into_iter()
        .map(|(kind, cost)| DamageEntryDto { kind, cost: cost.to_string() })
        .collect::<Vec<_>>();
    TripTelemetryDto {
        odometer_start: odo.0,
        odometer_end: odo.1,
        fuel_start: fuel.0,
        fuel_end: fuel.1,
        scheduled_return,
        actual_return,
        duration_days,
        damages,
    }
}

// assemble a breakdown without walking through telemetry, for tests which
// only care about the amounts
#[rustfmt::skip]
pub(crate) fn ut_setup_breakdown_direct(
    mileage_charge: (i64, u32),
    fuel_charge: (i64, u32),
    late_charge: (i64, u32),
    damage_charge: (i64, u32),
) -> ChargeBreakdownModel {
    let mileage = Decimal::new(mileage_charge.0, mileage_charge.1);
    let fuel = Decimal::new(fuel_charge.0, fuel_charge.1);
    let late = Decimal::new(late_charge.0, late_charge.1);
    let damage = Decimal::new(damage_charge.0, damage_charge.1);
    let total = (mileage + fuel + late + damage).round_dp(2);
    ChargeBreakdownModel::from((
        MileageChargeModel {
            miles_used: 0, miles_included: 0, miles_overage: 0, charge: mileage,
        },
        FuelChargeModel { shortfall_quarters: 0, charge: fuel },
        LateChargeModel { hours_late: 0, charge: late },
        DamageChargeModel { entries: Vec::new(), charge: damage },
        CurrencyDto::USD,
        total,
    ))
}
