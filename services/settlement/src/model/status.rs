use rust_decimal::Decimal;

use super::ChargeAttemptState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStatus {
    Pending,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    PendingCharges,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
    PaymentFailed,
    PendingCharges,
    ChargesPaid,
    ChargesWaived,
    PartialPaid,
    AdjustedPaid,
    Refunded,
    PartialRefund,
}

/// outcome of the most recent capture attempt as seen by the caller,
/// the only payment input the decision table accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
    RequiresAction,
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffResolutionAction {
    Waive,
    PartialWaive,
    Adjust,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundCoverage {
    Full,
    Partial,
}

/// the three fields are always derived together from one decision table,
/// call sites never assign any of them individually, so they cannot
/// drift out of sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementStatusModel {
    pub lifecycle: LifecycleStatus,
    pub verification: VerificationStatus,
    pub payment: PaymentStatus,
}

impl From<&ChargeAttemptState> for PaymentOutcome {
    fn from(value: &ChargeAttemptState) -> Self {
        match value {
            ChargeAttemptState::Succeeded { .. } => Self::Succeeded,
            ChargeAttemptState::Failed { .. } => Self::Failed,
            ChargeAttemptState::RequiresAction { .. } => Self::RequiresAction,
            ChargeAttemptState::Initialized | ChargeAttemptState::Unresolved { .. } => {
                Self::Unresolved
            }
        }
    }
}

impl LifecycleStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
    pub(crate) fn parse_label(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" => Some(Self::Pending),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _others => None,
        }
    }
}
impl VerificationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::PendingCharges => "PENDING_CHARGES",
            Self::Completed => "COMPLETED",
        }
    }
    pub(crate) fn parse_label(raw: &str) -> Option<Self> {
        match raw {
            "PENDING_CHARGES" => Some(Self::PendingCharges),
            "COMPLETED" => Some(Self::Completed),
            _others => None,
        }
    }
}
impl PaymentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Paid => "PAID",
            Self::PaymentFailed => "PAYMENT_FAILED",
            Self::PendingCharges => "PENDING_CHARGES",
            Self::ChargesPaid => "CHARGES_PAID",
            Self::ChargesWaived => "CHARGES_WAIVED",
            Self::PartialPaid => "PARTIAL_PAID",
            Self::AdjustedPaid => "ADJUSTED_PAID",
            Self::Refunded => "REFUNDED",
            Self::PartialRefund => "PARTIAL_REFUND",
        }
    }
    #[rustfmt::skip]
    pub(crate) fn parse_label(raw: &str) -> Option<Self> {
        match raw {
            "PAID" => Some(Self::Paid),
            "PAYMENT_FAILED" => Some(Self::PaymentFailed),
            "PENDING_CHARGES" => Some(Self::PendingCharges),
            "CHARGES_PAID" => Some(Self::ChargesPaid),
            "CHARGES_WAIVED" => Some(Self::ChargesWaived),
            "PARTIAL_PAID" => Some(Self::PartialPaid),
            "ADJUSTED_PAID" => Some(Self::AdjustedPaid),
            "REFUNDED" => Some(Self::Refunded),
            "PARTIAL_REFUND" => Some(Self::PartialRefund),
            _others => None,
        }
    }
}

impl SettlementStatusModel {
    #[rustfmt::skip]
    fn build(
        lifecycle: LifecycleStatus, verification: VerificationStatus, payment: PaymentStatus,
    ) -> Self {
        Self { lifecycle, verification, payment }
    }

    /// total decision table, first match wins, every input combination
    /// maps to exactly one triple
    pub fn resolve(
        charge_total: Decimal,
        outcome: Option<PaymentOutcome>,
        has_open_disputes: bool,
    ) -> Self {
        if charge_total == Decimal::ZERO {
            Self::build(
                LifecycleStatus::Completed,
                VerificationStatus::Completed,
                PaymentStatus::Paid,
            )
        } else if has_open_disputes {
            // an open dispute always takes precedence, even over a
            // successful gateway outcome already in hand
            Self::build(
                LifecycleStatus::Pending,
                VerificationStatus::PendingCharges,
                PaymentStatus::PendingCharges,
            )
        } else {
            match outcome {
                Some(PaymentOutcome::Succeeded) => Self::build(
                    LifecycleStatus::Completed,
                    VerificationStatus::Completed,
                    PaymentStatus::ChargesPaid,
                ),
                Some(PaymentOutcome::Failed) => Self::build(
                    LifecycleStatus::Pending,
                    VerificationStatus::PendingCharges,
                    PaymentStatus::PaymentFailed,
                ),
                Some(PaymentOutcome::RequiresAction)
                | Some(PaymentOutcome::Unresolved)
                | None => Self::build(
                    LifecycleStatus::Pending,
                    VerificationStatus::PendingCharges,
                    PaymentStatus::PendingCharges,
                ),
            }
        }
    } // end of fn resolve

    /// staff-mediated entry point, the staff action itself is the
    /// authority which closes the loop, lifecycle / verification are
    /// terminal-success regardless of amount
    pub fn resolve_staff(action: StaffResolutionAction) -> Self {
        let payment = match action {
            StaffResolutionAction::Waive => PaymentStatus::ChargesWaived,
            StaffResolutionAction::PartialWaive => PaymentStatus::PartialPaid,
            StaffResolutionAction::Adjust => PaymentStatus::AdjustedPaid,
        };
        Self::build(
            LifecycleStatus::Completed,
            VerificationStatus::Completed,
            payment,
        )
    }

    pub fn resolve_refund(coverage: RefundCoverage) -> Self {
        match coverage {
            // refunded in full, the booking is closed out entirely
            RefundCoverage::Full => Self::build(
                LifecycleStatus::Cancelled,
                VerificationStatus::Completed,
                PaymentStatus::Refunded,
            ),
            RefundCoverage::Partial => Self::build(
                LifecycleStatus::Completed,
                VerificationStatus::Completed,
                PaymentStatus::PartialRefund,
            ),
        }
    }
} // end of impl SettlementStatusModel
