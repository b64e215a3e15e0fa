use std::result::Result;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use carshare_common::api::dto::CurrencyDto;

use super::ChargeBreakdownModel;
use crate::api::web::dto::{AdjustLineReqDto, ChargeLineLabelDto};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeLineLabel {
    Mileage,
    Fuel,
    Late,
    Damage,
}

#[derive(Debug)]
pub enum ResolutionModelError {
    PercentOutOfRange(u16),
    AmountParse(ChargeLineLabel, String, String),
    NegativeAmount(ChargeLineLabel, Decimal),
    ExceedsOriginal {
        line: ChargeLineLabel,
        original: Decimal,
        adjusted: Decimal,
    },
    DuplicateLine(ChargeLineLabel),
    EmptyResolution,
    EmptyReason,
    // the residual amount needs a capture but no payment instrument
    // reference came with the staff action
    MissingInstrument,
}

/// audit artifact of a staff waive decision, never a payment action
/// by itself
pub struct WaiveRecordModel {
    _booking_id: u32,
    _original_amount: Decimal,
    _percentage: u8,
    _waived_amount: Decimal,
    _remaining_amount: Decimal,
    _reason: String,
    _staff_id: u32,
    _create_time: DateTime<Utc>,
}

pub struct AdjustmentLineModel {
    pub label: ChargeLineLabel,
    pub original_amount: Decimal,
    pub adjusted_amount: Decimal,
    pub included: bool,
}

/// per-line staff decision over a charge breakdown, append-only
pub struct AdjustmentRecordModel {
    _booking_id: u32,
    _lines: Vec<AdjustmentLineModel>,
    _reason: String,
    _staff_id: u32,
    _create_time: DateTime<Utc>,
}

impl ChargeLineLabel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mileage => "mileage",
            Self::Fuel => "fuel",
            Self::Late => "late",
            Self::Damage => "damage",
        }
    }
}

impl From<ChargeLineLabelDto> for ChargeLineLabel {
    fn from(value: ChargeLineLabelDto) -> Self {
        match value {
            ChargeLineLabelDto::Mileage => Self::Mileage,
            ChargeLineLabelDto::Fuel => Self::Fuel,
            ChargeLineLabelDto::Late => Self::Late,
            ChargeLineLabelDto::Damage => Self::Damage,
        }
    }
}
impl From<ChargeLineLabel> for ChargeLineLabelDto {
    fn from(value: ChargeLineLabel) -> Self {
        match value {
            ChargeLineLabel::Mileage => Self::Mileage,
            ChargeLineLabel::Fuel => Self::Fuel,
            ChargeLineLabel::Late => Self::Late,
            ChargeLineLabel::Damage => Self::Damage,
        }
    }
}

impl ChargeBreakdownModel {
    pub(crate) fn line_amount(&self, label: ChargeLineLabel) -> Decimal {
        match label {
            ChargeLineLabel::Mileage => self.mileage.charge,
            ChargeLineLabel::Fuel => self.fuel.charge,
            ChargeLineLabel::Late => self.late.charge,
            ChargeLineLabel::Damage => self.damage.charge,
        }
    }
}

#[rustfmt::skip]
type WaiveCvtArgs = (u32, Decimal, CurrencyDto, u16, String, u32);

impl TryFrom<WaiveCvtArgs> for WaiveRecordModel {
    type Error = ResolutionModelError;

    /// the percentage is validated BEFORE any amount is derived, an
    /// out-of-range value never produces partially-computed figures
    #[rustfmt::skip]
    fn try_from(value: WaiveCvtArgs) -> Result<Self, Self::Error> {
        let (booking_id, original_amount, currency, pct_raw, reason, staff_id) = value;
        if pct_raw > 100u16 {
            return Err(ResolutionModelError::PercentOutOfRange(pct_raw));
        }
        if reason.trim().is_empty() {
            return Err(ResolutionModelError::EmptyReason);
        }
        let percentage = pct_raw as u8;
        let waived_amount = (original_amount * Decimal::new(percentage as i64, 2))
            .round_dp_with_strategy(
                currency.amount_fraction_scale(),
                RoundingStrategy::MidpointAwayFromZero,
            );
        // remaining is derived by subtraction so the two parts always
        // reassemble to the original amount exactly
        let remaining_amount = original_amount - waived_amount;
        Ok(Self {
            _booking_id: booking_id,
            _original_amount: original_amount,
            _percentage: percentage,
            _waived_amount: waived_amount,
            _remaining_amount: remaining_amount,
            _reason: reason,
            _staff_id: staff_id,
            _create_time: Utc::now(),
        })
    } // end of fn try-from
} // end of impl TryFrom for WaiveRecordModel

impl WaiveRecordModel {
    pub fn booking_id(&self) -> u32 {
        self._booking_id
    }
    pub fn original_amount(&self) -> Decimal {
        self._original_amount
    }
    pub fn percentage(&self) -> u8 {
        self._percentage
    }
    pub fn waived_amount(&self) -> Decimal {
        self._waived_amount
    }
    pub fn remaining_amount(&self) -> Decimal {
        self._remaining_amount
    }
    pub fn reason(&self) -> &str {
        self._reason.as_str()
    }
    pub fn staff_id(&self) -> u32 {
        self._staff_id
    }
    pub fn create_time(&self) -> &DateTime<Utc> {
        &self._create_time
    }
    pub fn full_waive(&self) -> bool {
        self._percentage == 100u8
    }
} // end of impl WaiveRecordModel

impl AdjustmentLineModel {
    fn try_from_req(
        breakdown: &ChargeBreakdownModel,
        d: AdjustLineReqDto,
    ) -> Result<Self, ResolutionModelError> {
        let label = ChargeLineLabel::from(d.line);
        let original_amount = breakdown.line_amount(label);
        let adjusted_amount = Decimal::from_str(d.adjusted_amount.as_str()).map_err(|e| {
            ResolutionModelError::AmountParse(label, d.adjusted_amount, e.to_string())
        })?;
        if adjusted_amount.is_sign_negative() {
            return Err(ResolutionModelError::NegativeAmount(label, adjusted_amount));
        }
        if adjusted_amount > original_amount {
            return Err(ResolutionModelError::ExceedsOriginal {
                line: label,
                original: original_amount,
                adjusted: adjusted_amount,
            });
        }
        Ok(Self {
            label,
            original_amount,
            adjusted_amount,
            included: d.included,
        })
    }
}

#[rustfmt::skip]
type AdjustmentCvtArgs<'a> = (
    u32, &'a ChargeBreakdownModel, Vec<AdjustLineReqDto>, String, u32,
);

impl<'a> TryFrom<AdjustmentCvtArgs<'a>> for AdjustmentRecordModel {
    type Error = Vec<ResolutionModelError>;

    fn try_from(value: AdjustmentCvtArgs<'a>) -> Result<Self, Self::Error> {
        let (booking_id, breakdown, d_lines, reason, staff_id) = value;
        let mut errs = Vec::new();
        if d_lines.is_empty() {
            errs.push(ResolutionModelError::EmptyResolution);
        }
        let mut seen: Vec<ChargeLineLabel> = Vec::new();
        let lines = d_lines
            .into_iter()
            .filter_map(|d| {
                AdjustmentLineModel::try_from_req(breakdown, d)
                    .and_then(|m| {
                        if seen.contains(&m.label) {
                            Err(ResolutionModelError::DuplicateLine(m.label))
                        } else {
                            seen.push(m.label);
                            Ok(m)
                        }
                    })
                    .map_err(|e| errs.push(e))
                    .ok()
            })
            .collect::<Vec<_>>();
        if errs.is_empty() {
            Ok(Self {
                _booking_id: booking_id,
                _lines: lines,
                _reason: reason,
                _staff_id: staff_id,
                _create_time: Utc::now(),
            })
        } else {
            Err(errs)
        }
    } // end of fn try-from
} // end of impl TryFrom for AdjustmentRecordModel

impl AdjustmentRecordModel {
    pub fn booking_id(&self) -> u32 {
        self._booking_id
    }
    pub fn lines(&self) -> &Vec<AdjustmentLineModel> {
        &self._lines
    }
    pub fn reason(&self) -> &str {
        self._reason.as_str()
    }
    pub fn staff_id(&self) -> u32 {
        self._staff_id
    }
    pub fn create_time(&self) -> &DateTime<Utc> {
        &self._create_time
    }

    pub fn original_total(&self) -> Decimal {
        self._lines.iter().map(|l| l.original_amount).sum()
    }
    pub fn adjusted_total(&self) -> Decimal {
        self._lines
            .iter()
            .filter(|l| l.included)
            .map(|l| l.adjusted_amount)
            .sum()
    }
    pub fn total_adjustment(&self) -> Decimal {
        self.original_total() - self.adjusted_total()
    }
} // end of impl AdjustmentRecordModel
