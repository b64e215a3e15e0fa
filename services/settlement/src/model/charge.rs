use std::result::Result;

use chrono::offset::LocalResult;
use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use carshare_common::api::dto::CurrencyDto;
use carshare_common::error::AppErrorCode;

use super::{DamageEntryModel, FuelLevel, RatePlanModel, TripTelemetryModel};

mod token_inner {
    pub const NBYTES: usize = 10;
    pub(super) mod encoding {
        // bit length for each encoded token field
        pub const BOOKING_ID: u8 = 32;
        pub const T_YEAR: u8 = 14;
        pub const T_MONTH: u8 = 4;
        pub const T_DAY: u8 = 5;
        pub const T_HOUR: u8 = 5;
        pub const T_MINUTE: u8 = 6;
        pub const T_SECOND: u8 = 6;
        pub const SEQ: u8 = 8;
    }
}

/// idempotency token, derived from the booking, the trip-end event time
/// and a monotonic sequence number, a caller-side retry after network
/// timeout reproduces exactly the same octets
#[derive(Clone)]
pub struct ChargeToken(pub [u8; token_inner::NBYTES]);

#[derive(Debug)]
pub enum TelemetryAnomaly {
    OdometerRollback { start: u32, end: u32 },
    FuelReadingMissing,
}

pub struct MileageChargeModel {
    pub miles_used: u32,
    pub miles_included: u32,
    pub miles_overage: u32,
    pub charge: Decimal,
}
pub struct FuelChargeModel {
    // number of quarter tanks short at return, zero when the reading
    // was never captured
    pub shortfall_quarters: u8,
    pub charge: Decimal,
}
pub struct LateChargeModel {
    pub hours_late: u32,
    pub charge: Decimal,
}
pub struct DamageChargeModel {
    pub entries: Vec<DamageEntryModel>,
    pub charge: Decimal,
}

pub struct ChargeBreakdownModel {
    pub mileage: MileageChargeModel,
    pub fuel: FuelChargeModel,
    pub late: LateChargeModel,
    pub damage: DamageChargeModel,
    pub currency: CurrencyDto,
    pub total: Decimal,
    pub anomalies: Vec<TelemetryAnomaly>,
}

#[derive(Debug, Clone)]
pub enum ChargeAttemptState {
    Initialized,
    Succeeded {
        gateway_charge_id: String,
        completed_time: DateTime<Utc>,
    },
    Failed {
        decline_reason: String,
    },
    // the processor demands an extra customer step (e.g. a strong-customer
    // -authentication challenge), terminal for this attempt, a follow-up
    // is a brand-new attempt in the same lineage
    RequiresAction {
        intent_ref: String,
    },
    Unresolved {
        intent_ref: String,
    },
}

#[derive(Debug)]
pub enum ChargeModelError {
    EmptyCustomerRef,
    EmptyInstrumentRef,
    NonPositiveAmount(Decimal),
    AlreadyCaptured { gateway_charge_id: String },
    MissingOriginAttempt(u32),
    AttemptNumOverflow(u8),
    TokenDecode(AppErrorCode, String),
}

pub struct ChargeAttemptMetaModel {
    _booking_id: u32,
    _trip_end_time: DateTime<Utc>,
    _attempt_nr: u8,
    // token of the attempt this one retries, `None` on the first attempt
    _origin_token: Option<ChargeToken>,
    _customer_ref: String,
    _instrument_ref: String,
    _create_time: DateTime<Utc>,
}

pub struct ChargeAttemptModel {
    pub meta: ChargeAttemptMetaModel,
    pub amount: Decimal,
    pub currency: CurrencyDto,
    pub state: ChargeAttemptState,
}

impl MileageChargeModel {
    fn calculate(
        tlm: &TripTelemetryModel,
        rate: &RatePlanModel,
        anomalies: &mut Vec<TelemetryAnomaly>,
    ) -> Self {
        let (odo_start, odo_end) = tlm.odometer();
        if odo_end < odo_start {
            // odometer rolled over or the capture device misreported,
            // clamp instead of billing a negative distance
            anomalies.push(TelemetryAnomaly::OdometerRollback {
                start: odo_start,
                end: odo_end,
            });
        }
        let miles_used = odo_end.saturating_sub(odo_start);
        let miles_included = rate
            .miles_included_per_day
            .saturating_mul(tlm.duration_days());
        let miles_overage = miles_used.saturating_sub(miles_included);
        let charge = Decimal::from(miles_overage) * rate.per_mile_fee;
        Self {
            miles_used,
            miles_included,
            miles_overage,
            charge,
        }
    }
}

impl FuelChargeModel {
    fn calculate(
        tlm: &TripTelemetryModel,
        rate: &RatePlanModel,
        anomalies: &mut Vec<TelemetryAnomaly>,
    ) -> Self {
        let shortfall_quarters = match tlm.fuel_gauge() {
            (Some(lvl_start), Some(lvl_end)) => lvl_start.rank().saturating_sub(lvl_end.rank()),
            _at_least_one_missing => {
                // the reading was never captured, treated as no shortfall
                // rather than an error
                anomalies.push(TelemetryAnomaly::FuelReadingMissing);
                0u8
            }
        };
        let fraction =
            Decimal::from(shortfall_quarters) / Decimal::from(FuelLevel::GAUGE_STEPS);
        let charge = fraction * rate.full_tank_fee;
        Self {
            shortfall_quarters,
            charge,
        }
    }
}

impl LateChargeModel {
    fn calculate(tlm: &TripTelemetryModel, rate: &RatePlanModel) -> Self {
        let (scheduled, actual) = tlm.return_times();
        let secs_late = (*actual - *scheduled).num_seconds();
        let hours_late = if secs_late > 0 {
            ((secs_late + 3599) / 3600) as u32
        } else {
            0u32 // returned early or exactly on time
        };
        let charge = Decimal::from(hours_late) * rate.late_fee_per_hour;
        Self { hours_late, charge }
    }
}

impl DamageChargeModel {
    fn calculate(tlm: &TripTelemetryModel) -> Self {
        // pass-through, the assessment workflow supplies itemized costs,
        // nothing is derived at here
        let entries = tlm.damages().clone();
        let charge = entries.iter().map(|d| d.cost).sum::<Decimal>();
        Self { entries, charge }
    }
}

impl<'a, 'b> From<(&'a TripTelemetryModel, &'b RatePlanModel)> for ChargeBreakdownModel {
    fn from(value: (&'a TripTelemetryModel, &'b RatePlanModel)) -> Self {
        let (tlm, rate) = value;
        let mut anomalies = Vec::new();
        let mileage = MileageChargeModel::calculate(tlm, rate, &mut anomalies);
        let fuel = FuelChargeModel::calculate(tlm, rate, &mut anomalies);
        let late = LateChargeModel::calculate(tlm, rate);
        let damage = DamageChargeModel::calculate(tlm);
        let raw_total = mileage.charge + fuel.charge + late.charge + damage.charge;
        // rounding happens once on the total, rounding each line item
        // separately would compound the error
        let total = raw_total.round_dp_with_strategy(
            rate.currency.amount_fraction_scale(),
            RoundingStrategy::MidpointAwayFromZero,
        );
        Self {
            mileage,
            fuel,
            late,
            damage,
            currency: rate.currency.clone(),
            total,
            anomalies,
        }
    } // end of fn from
} // end of impl From for ChargeBreakdownModel

#[rustfmt::skip]
type BreakdownCvtArgs = (
    MileageChargeModel, FuelChargeModel, LateChargeModel,
    DamageChargeModel, CurrencyDto, Decimal,
);

impl From<BreakdownCvtArgs> for ChargeBreakdownModel {
    #[rustfmt::skip]
    fn from(value: BreakdownCvtArgs) -> Self {
        let (mileage, fuel, late, damage, currency, total) = value;
        // anomaly flags are settle-time warnings, they are not rebuilt
        // from persisted rows
        Self {
            mileage, fuel, late, damage, currency, total,
            anomalies: Vec::new(),
        }
    }
}

impl ChargeAttemptState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
            Self::RequiresAction { .. } => "requires-action",
            Self::Unresolved { .. } => "unresolved",
        }
    }
    pub(crate) fn captured(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

impl ChargeAttemptMetaModel {
    fn new(
        booking_id: u32,
        trip_end_time: DateTime<Utc>,
        attempt_nr: u8,
        origin_token: Option<ChargeToken>,
        customer_ref: String,
        instrument_ref: String,
    ) -> Result<Self, ChargeModelError> {
        if customer_ref.is_empty() {
            return Err(ChargeModelError::EmptyCustomerRef);
        }
        if instrument_ref.is_empty() {
            return Err(ChargeModelError::EmptyInstrumentRef);
        }
        Ok(Self {
            _booking_id: booking_id,
            _trip_end_time: trip_end_time,
            _attempt_nr: attempt_nr,
            _origin_token: origin_token,
            _customer_ref: customer_ref,
            _instrument_ref: instrument_ref,
            _create_time: Utc::now(),
        })
    }

    pub fn token(&self) -> ChargeToken {
        ChargeToken::encode(self._booking_id, self._trip_end_time, self._attempt_nr)
    }
    pub fn booking_id(&self) -> u32 {
        self._booking_id
    }
    pub fn trip_end_time(&self) -> &DateTime<Utc> {
        &self._trip_end_time
    }
    pub fn attempt_nr(&self) -> u8 {
        self._attempt_nr
    }
    pub fn origin_token(&self) -> Option<&ChargeToken> {
        self._origin_token.as_ref()
    }
    pub fn customer_ref(&self) -> &str {
        self._customer_ref.as_str()
    }
    pub fn instrument_ref(&self) -> &str {
        self._instrument_ref.as_str()
    }
    pub fn create_time(&self) -> &DateTime<Utc> {
        &self._create_time
    }
} // end of impl ChargeAttemptMetaModel

#[rustfmt::skip]
type AttemptMetaCvtArgs = (
    u32, DateTime<Utc>, u8, Option<ChargeToken>, String, String, DateTime<Utc>,
);

impl From<AttemptMetaCvtArgs> for ChargeAttemptMetaModel {
    #[rustfmt::skip]
    fn from(value: AttemptMetaCvtArgs) -> Self {
        let (_booking_id, _trip_end_time, _attempt_nr, _origin_token,
             _customer_ref, _instrument_ref, _create_time) = value;
        Self {
            _booking_id, _trip_end_time, _attempt_nr, _origin_token,
            _customer_ref, _instrument_ref, _create_time,
        }
    }
}

impl ChargeAttemptModel {
    #[rustfmt::skip]
    pub fn first(
        booking_id: u32, trip_end_time: DateTime<Utc>, customer_ref: String,
        instrument_ref: String, amount: Decimal, currency: CurrencyDto,
    ) -> Result<Self, ChargeModelError> {
        if amount <= Decimal::ZERO {
            return Err(ChargeModelError::NonPositiveAmount(amount));
        }
        let meta = ChargeAttemptMetaModel::new(
            booking_id, trip_end_time, 1u8, None, customer_ref, instrument_ref,
        )?;
        Ok(Self {
            meta, amount, currency,
            state: ChargeAttemptState::Initialized,
        })
    }

    /// next attempt in the booking lineage for an arbitrary amount,
    /// refused once any prior attempt against the booking captured funds
    #[rustfmt::skip]
    pub fn next(
        prev_attempts: &[Self], booking_id: u32, trip_end_time: DateTime<Utc>,
        customer_ref: String, instrument_ref: String, amount: Decimal,
        currency: CurrencyDto,
    ) -> Result<Self, ChargeModelError> {
        Self::ensure_none_captured(prev_attempts)?;
        if amount <= Decimal::ZERO {
            return Err(ChargeModelError::NonPositiveAmount(amount));
        }
        let last = prev_attempts.iter().max_by_key(|a| a.meta.attempt_nr());
        let (nxt_nr, origin) = if let Some(l) = last {
            let n = l.meta.attempt_nr()
                .checked_add(1)
                .ok_or(ChargeModelError::AttemptNumOverflow(l.meta.attempt_nr()))?;
            (n, Some(l.meta.token()))
        } else {
            (1u8, None)
        };
        let meta = ChargeAttemptMetaModel::new(
            booking_id, trip_end_time, nxt_nr, origin, customer_ref, instrument_ref,
        )?;
        Ok(Self {
            meta, amount, currency,
            state: ChargeAttemptState::Initialized,
        })
    } // end of fn next

    /// build a follow-up attempt in the same lineage, refused once any
    /// prior attempt against the booking has captured funds
    #[rustfmt::skip]
    pub fn retry(
        prev_attempts: &[Self], customer_ref: String, instrument_ref: String,
    ) -> Result<Self, ChargeModelError> {
        Self::ensure_none_captured(prev_attempts)?;
        let last = prev_attempts.iter().max_by_key(|a| a.meta.attempt_nr());
        let last = match last {
            Some(v) => v,
            None => {
                return Err(ChargeModelError::MissingOriginAttempt(0));
            }
        };
        let nxt_nr = last
            .meta
            .attempt_nr()
            .checked_add(1)
            .ok_or(ChargeModelError::AttemptNumOverflow(last.meta.attempt_nr()))?;
        if last.amount <= Decimal::ZERO {
            return Err(ChargeModelError::NonPositiveAmount(last.amount));
        }
        let meta = ChargeAttemptMetaModel::new(
            last.meta.booking_id(), *last.meta.trip_end_time(), nxt_nr,
            Some(last.meta.token()), customer_ref, instrument_ref,
        )?;
        Ok(Self {
            meta,
            amount: last.amount,
            currency: last.currency.clone(),
            state: ChargeAttemptState::Initialized,
        })
    } // end of fn retry

    pub fn ensure_none_captured(attempts: &[Self]) -> Result<(), ChargeModelError> {
        let found = attempts.iter().find(|a| a.state.captured());
        if let Some(a) = found {
            let gateway_charge_id = match &a.state {
                ChargeAttemptState::Succeeded {
                    gateway_charge_id, ..
                } => gateway_charge_id.clone(),
                _others => String::new(),
            };
            Err(ChargeModelError::AlreadyCaptured { gateway_charge_id })
        } else {
            Ok(())
        }
    }

    pub fn update_state(&mut self, new_state: ChargeAttemptState) {
        if !self.state.captured() {
            self.state = new_state;
        } // a succeeded attempt is terminal
    }
} // end of impl ChargeAttemptModel

impl TryFrom<Vec<u8>> for ChargeToken {
    type Error = (AppErrorCode, String);
    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let v = value
            .try_into()
            .map_err(|orig| (AppErrorCode::DataCorruption, format!("{:?}", orig)))?;
        Ok(Self(v))
    }
}

impl std::fmt::Display for ChargeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hexa = self.0.iter().fold(String::new(), |mut dst, num| {
            dst += format!("{:02x}", num).as_str();
            dst
        });
        f.write_str(hexa.as_str())
    }
}

impl ChargeToken {
    pub fn encode(booking_id: u32, t: DateTime<Utc>, seq: u8) -> Self {
        let given = [
            (booking_id, token_inner::encoding::BOOKING_ID),
            (t.year_ce().1, token_inner::encoding::T_YEAR),
            (t.month(), token_inner::encoding::T_MONTH),
            (t.day(), token_inner::encoding::T_DAY),
            (t.hour(), token_inner::encoding::T_HOUR),
            (t.minute(), token_inner::encoding::T_MINUTE),
            (t.second(), token_inner::encoding::T_SECOND),
            (seq as u32, token_inner::encoding::SEQ),
        ];
        let inner = Self::compact_bitvec(given);
        Self(inner.try_into().unwrap())
    }

    fn compact_bitvec(data: [(u32, u8); 8]) -> Vec<u8> {
        let nbits_req = data.iter().map(|(_, sz)| *sz as usize).sum::<usize>();
        let nbits_limit = token_inner::NBYTES << 3;
        assert!(nbits_limit >= nbits_req);
        let mut out: Vec<u8> = Vec::new();
        let mut nbit_avail_last = 0u8; // range 0 to 7
        data.into_iter()
            .map(|(mut v, mut sz)| {
                assert!(32u8 >= sz);
                assert!(8 > nbit_avail_last);
                v <<= 32u8.saturating_sub(sz);
                if nbit_avail_last > 0 {
                    let nbit_shift = nbit_avail_last.min(sz);
                    let nbit_rsv_last = 32u8.saturating_sub(nbit_avail_last);
                    let v0 = (v >> nbit_rsv_last) as u8;
                    v <<= nbit_shift;
                    let mut last = out.pop().unwrap();
                    last = (last & Self::bitmask_msb8(nbit_avail_last)) | v0;
                    out.push(last);
                    sz = if nbit_shift == sz {
                        nbit_avail_last = nbit_avail_last.saturating_sub(sz);
                        0
                    } else {
                        sz.saturating_sub(nbit_avail_last)
                    };
                }
                let lastbyte_incomplete = (sz & 0x7u8) != 0;
                let nbytes_add = (sz >> 3) + (lastbyte_incomplete as u8);
                let v_bytes = v.to_be_bytes(); // always convert to big-endian value
                let (adding, _discarding) = v_bytes.split_at(nbytes_add as usize);
                out.extend(adding);
                if sz > 0 {
                    nbit_avail_last = ((lastbyte_incomplete as u8) << 3).saturating_sub(sz & 0x7u8);
                }
            })
            .count();
        out
    } // end of fn compact_bitvec

    fn bitmask_msb8(n: u8) -> u8 {
        0xffu8 << n
    }

    pub fn decode(self) -> Result<(u32, DateTime<Utc>, u8), ChargeModelError> {
        let fields_len = [
            token_inner::encoding::BOOKING_ID,
            token_inner::encoding::T_YEAR,
            token_inner::encoding::T_MONTH,
            token_inner::encoding::T_DAY,
            token_inner::encoding::T_HOUR,
            token_inner::encoding::T_MINUTE,
            token_inner::encoding::T_SECOND,
            token_inner::encoding::SEQ,
        ];
        let elms = Self::extract_bitvec(self.0, fields_len);
        let booking_id = elms[0];
        let seq = elms[7] as u8;
        let result =
            Utc.with_ymd_and_hms(elms[1] as i32, elms[2], elms[3], elms[4], elms[5], elms[6]);
        match result {
            LocalResult::Single(t) => Ok((booking_id, t, seq)),
            LocalResult::Ambiguous(_t0, _t1) => Err(ChargeModelError::TokenDecode(
                AppErrorCode::DataCorruption,
                "ambiguous-time".to_string(),
            )),
            LocalResult::None => Err(ChargeModelError::TokenDecode(
                AppErrorCode::DataCorruption,
                "invalid-time-serial".to_string(),
            )),
        }
    }

    fn extract_bitvec(given: [u8; token_inner::NBYTES], fields_len: [u8; 8]) -> [u32; 8] {
        let mut out = [0u32; 8];
        let mut bit_idx = 0usize;
        for (i, len) in fields_len.into_iter().enumerate() {
            let mut value = 0u32;
            let mut nbits_remaining = len as usize;
            while nbits_remaining > 0 {
                let octet_idx = bit_idx >> 3;
                let bit_offset = bit_idx & 0x7;
                let bits_in_current_octet = std::cmp::min(nbits_remaining, 8 - bit_offset);
                let mask = ((1 << bits_in_current_octet) - 1) as u8;
                let extracted_bits =
                    (given[octet_idx] >> (8 - bit_offset - bits_in_current_octet)) & mask;
                value = (value << bits_in_current_octet) | extracted_bits as u32;
                nbits_remaining -= bits_in_current_octet;
                bit_idx += bits_in_current_octet;
            }
            out[i] = value;
        }
        out
    }
} // end of impl ChargeToken
