use std::result::Result;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use carshare_common::api::dto::CurrencyDto;

use crate::api::web::dto::{
    DamageEntryDto, DamageKindDto, FuelLevelDto, RatePlanDto, TripTelemetryDto,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuelLevel {
    Empty,
    Quarter,
    Half,
    ThreeQuarters,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageKind {
    BodyScratch,
    Dent,
    GlassCrack,
    InteriorStain,
    MissingAccessory,
    MechanicalWear,
}

#[derive(Debug, Clone)]
pub struct DamageEntryModel {
    pub kind: DamageKind,
    pub cost: Decimal,
}

pub struct TripTelemetryModel {
    _odometer_start: u32,
    _odometer_end: u32,
    _fuel_start: Option<FuelLevel>,
    _fuel_end: Option<FuelLevel>,
    _scheduled_return: DateTime<Utc>,
    _actual_return: DateTime<Utc>,
    _duration_days: u32,
    _damages: Vec<DamageEntryModel>,
}

// pricing snapshot of the rented vehicle, replicated from the listing at
// booking time so later price edits never change a finished trip
pub struct RatePlanModel {
    pub miles_included_per_day: u32,
    pub per_mile_fee: Decimal,
    pub full_tank_fee: Decimal,
    pub late_fee_per_hour: Decimal,
    pub currency: CurrencyDto,
}

#[derive(Debug)]
pub enum TelemetryModelError {
    InvalidDuration(u32),
    DamageCostParse(DamageKind, String, String),
    NegativeDamageCost(DamageKind, Decimal),
}

#[derive(Debug)]
pub enum RatePlanModelError {
    AmountParse(&'static str, String, String),
    NegativeAmount(&'static str, Decimal),
    UnknownCurrency,
}

impl FuelLevel {
    // position on the discrete gauge scale, number of quarter tanks
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Quarter => 1,
            Self::Half => 2,
            Self::ThreeQuarters => 3,
            Self::Full => 4,
        }
    }
    pub(crate) const GAUGE_STEPS: u8 = 4;
}

impl From<FuelLevelDto> for FuelLevel {
    fn from(value: FuelLevelDto) -> Self {
        match value {
            FuelLevelDto::Empty => Self::Empty,
            FuelLevelDto::Quarter => Self::Quarter,
            FuelLevelDto::Half => Self::Half,
            FuelLevelDto::ThreeQuarters => Self::ThreeQuarters,
            FuelLevelDto::Full => Self::Full,
        }
    }
}
impl From<FuelLevel> for FuelLevelDto {
    fn from(value: FuelLevel) -> Self {
        match value {
            FuelLevel::Empty => Self::Empty,
            FuelLevel::Quarter => Self::Quarter,
            FuelLevel::Half => Self::Half,
            FuelLevel::ThreeQuarters => Self::ThreeQuarters,
            FuelLevel::Full => Self::Full,
        }
    }
}

impl From<DamageKindDto> for DamageKind {
    fn from(value: DamageKindDto) -> Self {
        match value {
            DamageKindDto::BodyScratch => Self::BodyScratch,
            DamageKindDto::Dent => Self::Dent,
            DamageKindDto::GlassCrack => Self::GlassCrack,
            DamageKindDto::InteriorStain => Self::InteriorStain,
            DamageKindDto::MissingAccessory => Self::MissingAccessory,
            DamageKindDto::MechanicalWear => Self::MechanicalWear,
        }
    }
}
impl From<DamageKind> for DamageKindDto {
    fn from(value: DamageKind) -> Self {
        match value {
            DamageKind::BodyScratch => Self::BodyScratch,
            DamageKind::Dent => Self::Dent,
            DamageKind::GlassCrack => Self::GlassCrack,
            DamageKind::InteriorStain => Self::InteriorStain,
            DamageKind::MissingAccessory => Self::MissingAccessory,
            DamageKind::MechanicalWear => Self::MechanicalWear,
        }
    }
}

impl DamageKind {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::BodyScratch => "body-scratch",
            Self::Dent => "dent",
            Self::GlassCrack => "glass-crack",
            Self::InteriorStain => "interior-stain",
            Self::MissingAccessory => "missing-accessory",
            Self::MechanicalWear => "mechanical-wear",
        }
    }
    pub(crate) fn parse_label(raw: &str) -> Option<Self> {
        let found = match raw {
            "body-scratch" => Self::BodyScratch,
            "dent" => Self::Dent,
            "glass-crack" => Self::GlassCrack,
            "interior-stain" => Self::InteriorStain,
            "missing-accessory" => Self::MissingAccessory,
            "mechanical-wear" => Self::MechanicalWear,
            _others => {
                return None;
            }
        };
        Some(found)
    }
}

impl TryFrom<DamageEntryDto> for DamageEntryModel {
    type Error = TelemetryModelError;
    fn try_from(value: DamageEntryDto) -> Result<Self, Self::Error> {
        let DamageEntryDto { kind, cost } = value;
        let kind = DamageKind::from(kind);
        let cost = Decimal::from_str(cost.as_str())
            .map_err(|e| TelemetryModelError::DamageCostParse(kind, cost, e.to_string()))?;
        if cost.is_sign_negative() {
            return Err(TelemetryModelError::NegativeDamageCost(kind, cost));
        }
        Ok(Self { kind, cost })
    }
}

impl TryFrom<TripTelemetryDto> for TripTelemetryModel {
    type Error = Vec<TelemetryModelError>;

    fn try_from(value: TripTelemetryDto) -> Result<Self, Self::Error> {
        let TripTelemetryDto {
            odometer_start,
            odometer_end,
            fuel_start,
            fuel_end,
            scheduled_return,
            actual_return,
            duration_days,
            damages: d_damages,
        } = value;
        let mut errs = Vec::new();
        if duration_days == 0 {
            errs.push(TelemetryModelError::InvalidDuration(duration_days));
        }
        let damages = d_damages
            .into_iter()
            .filter_map(|d| DamageEntryModel::try_from(d).map_err(|e| errs.push(e)).ok())
            .collect::<Vec<_>>();
        if errs.is_empty() {
            Ok(Self {
                _odometer_start: odometer_start,
                _odometer_end: odometer_end,
                _fuel_start: fuel_start.map(FuelLevel::from),
                _fuel_end: fuel_end.map(FuelLevel::from),
                _scheduled_return: scheduled_return.to_utc(),
                _actual_return: actual_return.to_utc(),
                _duration_days: duration_days,
                _damages: damages,
            })
        } else {
            Err(errs)
        }
    } // end of fn try-from
} // end of impl TryFrom for TripTelemetryModel

impl TripTelemetryModel {
    pub fn odometer(&self) -> (u32, u32) {
        (self._odometer_start, self._odometer_end)
    }
    pub fn fuel_gauge(&self) -> (Option<FuelLevel>, Option<FuelLevel>) {
        (self._fuel_start, self._fuel_end)
    }
    pub fn return_times(&self) -> (&DateTime<Utc>, &DateTime<Utc>) {
        (&self._scheduled_return, &self._actual_return)
    }
    pub fn trip_end_time(&self) -> &DateTime<Utc> {
        &self._actual_return
    }
    pub fn duration_days(&self) -> u32 {
        self._duration_days
    }
    pub fn damages(&self) -> &Vec<DamageEntryModel> {
        &self._damages
    }
} // end of impl TripTelemetryModel

macro_rules! parse_rate_amount {
    ($dst_errs: ident, $given: expr, $label: literal) => {{
        match Decimal::from_str($given.as_str()) {
            Ok(v) => {
                if v.is_sign_negative() {
                    $dst_errs.push(RatePlanModelError::NegativeAmount($label, v));
                    Decimal::ZERO
                } else {
                    v
                }
            }
            Err(e) => {
                $dst_errs.push(RatePlanModelError::AmountParse(
                    $label,
                    $given,
                    e.to_string(),
                ));
                Decimal::ZERO
            }
        }
    }};
}

impl TryFrom<RatePlanDto> for RatePlanModel {
    type Error = Vec<RatePlanModelError>;

    fn try_from(value: RatePlanDto) -> Result<Self, Self::Error> {
        let RatePlanDto {
            miles_included_per_day,
            per_mile_fee,
            full_tank_fee,
            late_fee_per_hour,
            currency,
        } = value;
        let mut errs = Vec::new();
        let per_mile_fee = parse_rate_amount!(errs, per_mile_fee, "per-mile-fee");
        let full_tank_fee = parse_rate_amount!(errs, full_tank_fee, "full-tank-fee");
        let late_fee_per_hour = parse_rate_amount!(errs, late_fee_per_hour, "late-fee-per-hour");
        if matches!(currency, CurrencyDto::Unknown) {
            errs.push(RatePlanModelError::UnknownCurrency);
        }
        if errs.is_empty() {
            Ok(Self {
                miles_included_per_day,
                per_mile_fee,
                full_tank_fee,
                late_fee_per_hour,
                currency,
            })
        } else {
            Err(errs)
        }
    } // end of fn try-from
} // end of impl TryFrom for RatePlanModel
