use std::result::Result;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;

use carshare_common::api::dto::CurrencyDto;

use super::{ChargeToken, RefundCoverage};
use crate::api::web::dto::RefundRequestDto;

#[derive(Debug)]
pub enum RefundModelError {
    InvalidStateShift {
        from: &'static str,
        to: &'static str,
    },
    // processing is idempotent per request, a second run over an already
    // processed request reports the original transaction instead of
    // moving money again
    AlreadyProcessed {
        refund_txn_id: String,
    },
    ExceedsRefundable {
        requested: Decimal,
        remaining: Decimal,
    },
    MissingCapture(u32),
    AmountParse(String, String),
    NonPositiveAmount(Decimal),
    EmptyReason,
}

#[derive(Debug, Clone)]
pub enum RefundRequestState {
    Pending,
    Approved {
        reviewer_id: u32,
        review_time: DateTime<Utc>,
    },
    Rejected {
        reviewer_id: u32,
        review_time: DateTime<Utc>,
    },
    Processed {
        refund_txn_id: String,
        reversal_txn_id: Option<String>,
        process_time: DateTime<Utc>,
    },
}

pub struct RefundRequestModel {
    _booking_id: u32,
    // request creation time truncated to whole seconds, together with the
    // booking id it uniquely identifies one request
    _req_time: DateTime<Utc>,
    _amount_req: Decimal,
    _currency: CurrencyDto,
    _reason: String,
    _requester_id: u32,
    _requester_role: String,
    _review_notes: Option<String>,
    _reverse_host_transfer: bool,
    _state: RefundRequestState,
}

/// share of one captured payment which was paid out to the hosting
/// marketplace participant at settlement time
#[derive(Debug, Clone)]
pub struct HostSplitModel {
    pub host_id: u32,
    pub transfer_id: String,
    pub amount_transferred: Decimal,
}

pub struct BookingLedgerModel {
    _booking_id: u32,
    _charge_id: Option<String>,
    _captured_total: Decimal,
    _refunded_total: Decimal,
    _currency: CurrencyDto,
    _host_split: Option<HostSplitModel>,
}

impl RefundRequestState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved { .. } => "APPROVED",
            Self::Rejected { .. } => "REJECTED",
            Self::Processed { .. } => "PROCESSED",
        }
    }
}

#[rustfmt::skip]
type RefundReqCvtArgs = (u32, RefundRequestDto, CurrencyDto, u32, String);

impl TryFrom<RefundReqCvtArgs> for RefundRequestModel {
    type Error = RefundModelError;

    #[rustfmt::skip]
    fn try_from(value: RefundReqCvtArgs) -> Result<Self, Self::Error> {
        let (booking_id, d, currency, requester_id, requester_role) = value;
        let amount_req = Decimal::from_str(d.amount.as_str())
            .map_err(|e| RefundModelError::AmountParse(d.amount, e.to_string()))?;
        if amount_req <= Decimal::ZERO {
            return Err(RefundModelError::NonPositiveAmount(amount_req));
        }
        if d.reason.trim().is_empty() {
            return Err(RefundModelError::EmptyReason);
        }
        Ok(Self {
            _booking_id: booking_id,
            _req_time: Utc::now().trunc_subsecs(0),
            _amount_req: amount_req,
            _currency: currency,
            _reason: d.reason,
            _requester_id: requester_id,
            _requester_role: requester_role,
            _review_notes: None,
            _reverse_host_transfer: d.reverse_host_transfer,
            _state: RefundRequestState::Pending,
        })
    } // end of fn try-from
} // end of impl TryFrom for RefundRequestModel

impl RefundRequestModel {
    pub fn booking_id(&self) -> u32 {
        self._booking_id
    }
    pub fn req_time(&self) -> &DateTime<Utc> {
        &self._req_time
    }
    pub fn token(&self) -> ChargeToken {
        ChargeToken::encode(self._booking_id, self._req_time, 0u8)
    }
    pub fn amount_requested(&self) -> Decimal {
        self._amount_req
    }
    pub fn currency(&self) -> &CurrencyDto {
        &self._currency
    }
    pub fn reason(&self) -> &str {
        self._reason.as_str()
    }
    pub fn requester(&self) -> (u32, &str) {
        (self._requester_id, self._requester_role.as_str())
    }
    pub fn review_notes(&self) -> Option<&String> {
        self._review_notes.as_ref()
    }
    pub fn reverse_host_transfer(&self) -> bool {
        self._reverse_host_transfer
    }
    pub fn state(&self) -> &RefundRequestState {
        &self._state
    }

    pub fn approve(&mut self, reviewer_id: u32, notes: Option<String>) -> Result<(), RefundModelError> {
        if matches!(self._state, RefundRequestState::Pending) {
            self._review_notes = notes;
            self._state = RefundRequestState::Approved {
                reviewer_id,
                review_time: Utc::now().trunc_subsecs(0),
            };
            Ok(())
        } else {
            Err(RefundModelError::InvalidStateShift {
                from: self._state.label(),
                to: "APPROVED",
            })
        }
    }

    pub fn reject(&mut self, reviewer_id: u32, notes: Option<String>) -> Result<(), RefundModelError> {
        if matches!(self._state, RefundRequestState::Pending) {
            self._review_notes = notes;
            self._state = RefundRequestState::Rejected {
                reviewer_id,
                review_time: Utc::now().trunc_subsecs(0),
            };
            Ok(())
        } else {
            Err(RefundModelError::InvalidStateShift {
                from: self._state.label(),
                to: "REJECTED",
            })
        }
    }

    /// precondition gate run before ANY gateway traffic
    pub fn ensure_processable(&self) -> Result<(), RefundModelError> {
        match &self._state {
            RefundRequestState::Approved { .. } => Ok(()),
            RefundRequestState::Processed { refund_txn_id, .. } => {
                Err(RefundModelError::AlreadyProcessed {
                    refund_txn_id: refund_txn_id.clone(),
                })
            }
            _others => Err(RefundModelError::InvalidStateShift {
                from: self._state.label(),
                to: "PROCESSED",
            }),
        }
    }

    pub fn mark_processed(
        &mut self,
        refund_txn_id: String,
        reversal_txn_id: Option<String>,
    ) -> Result<(), RefundModelError> {
        self.ensure_processable()?;
        self._state = RefundRequestState::Processed {
            refund_txn_id,
            reversal_txn_id,
            process_time: Utc::now().trunc_subsecs(0),
        };
        Ok(())
    }
} // end of impl RefundRequestModel

#[rustfmt::skip]
type RefundReqDecomposedArgs = (
    u32, DateTime<Utc>, Decimal, CurrencyDto, String,
    u32, String, Option<String>, bool, RefundRequestState,
);

impl From<RefundReqDecomposedArgs> for RefundRequestModel {
    #[rustfmt::skip]
    fn from(value: RefundReqDecomposedArgs) -> Self {
        let (_booking_id, _req_time, _amount_req, _currency, _reason,
             _requester_id, _requester_role, _review_notes,
             _reverse_host_transfer, _state) = value;
        Self {
            _booking_id, _req_time, _amount_req, _currency, _reason,
            _requester_id, _requester_role, _review_notes,
            _reverse_host_transfer, _state,
        }
    }
}

#[rustfmt::skip]
type LedgerCvtArgs = (
    u32, Option<String>, Decimal, Decimal, CurrencyDto, Option<HostSplitModel>,
);

impl From<LedgerCvtArgs> for BookingLedgerModel {
    #[rustfmt::skip]
    fn from(value: LedgerCvtArgs) -> Self {
        let (_booking_id, _charge_id, _captured_total, _refunded_total,
             _currency, _host_split) = value;
        Self {
            _booking_id, _charge_id, _captured_total, _refunded_total,
            _currency, _host_split,
        }
    }
}

impl BookingLedgerModel {
    pub fn booking_id(&self) -> u32 {
        self._booking_id
    }
    pub fn captured_total(&self) -> Decimal {
        self._captured_total
    }
    pub fn refunded_total(&self) -> Decimal {
        self._refunded_total
    }
    pub fn currency(&self) -> &CurrencyDto {
        &self._currency
    }
    pub fn host_split(&self) -> Option<&HostSplitModel> {
        self._host_split.as_ref()
    }

    /// no refund is possible without an original capture reference
    pub fn charge_ref(&self) -> Result<&str, RefundModelError> {
        self._charge_id
            .as_deref()
            .filter(|_| self._captured_total > Decimal::ZERO)
            .ok_or(RefundModelError::MissingCapture(self._booking_id))
    }

    pub fn remaining_refundable(&self) -> Decimal {
        self._captured_total - self._refunded_total
    }

    pub fn ensure_refundable(&self, requested: Decimal) -> Result<(), RefundModelError> {
        let remaining = self.remaining_refundable();
        if requested > remaining {
            Err(RefundModelError::ExceedsRefundable {
                requested,
                remaining,
            })
        } else {
            Ok(())
        }
    }

    /// flat proportion of the refunded amount over the captured total,
    /// applied to what was actually transferred out to the host, platform
    /// commission never took part in the transfer so it is structurally
    /// excluded from the reversible base
    pub fn reversal_share(&self, refund_amount: Decimal) -> Option<Decimal> {
        self._host_split.as_ref().and_then(|split| {
            let ratio = refund_amount.checked_div(self._captured_total)?;
            let share = split.amount_transferred.checked_mul(ratio)?;
            let share = share.trunc_with_scale(self._currency.amount_fraction_scale());
            if share > Decimal::ZERO {
                Some(share)
            } else {
                None
            }
        })
    }

    /// accumulate one processed refund, reports whether the booking is
    /// now fully or partially refunded
    pub fn apply_refund(&mut self, amount: Decimal) -> Result<RefundCoverage, RefundModelError> {
        self.ensure_refundable(amount)?;
        self._refunded_total += amount;
        let coverage = if self._refunded_total >= self._captured_total {
            RefundCoverage::Full
        } else {
            RefundCoverage::Partial
        };
        Ok(coverage)
    }
} // end of impl BookingLedgerModel
