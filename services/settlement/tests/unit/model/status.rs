use rust_decimal::Decimal;

use settlement::model::{
    LifecycleStatus, PaymentOutcome, PaymentStatus, RefundCoverage, SettlementStatusModel,
    StaffResolutionAction, VerificationStatus,
};

#[rustfmt::skip]
fn ut_expect(
    l: LifecycleStatus, v: VerificationStatus, p: PaymentStatus,
) -> SettlementStatusModel {
    SettlementStatusModel { lifecycle: l, verification: v, payment: p }
}

#[test]
fn decision_table_totality() {
    // every combination maps to exactly one defined triple, no panic and
    // no unhandled branch anywhere in the input space
    let totals = [Decimal::ZERO, Decimal::new(12550, 2)];
    let outcomes = [
        None,
        Some(PaymentOutcome::Succeeded),
        Some(PaymentOutcome::Failed),
        Some(PaymentOutcome::RequiresAction),
        Some(PaymentOutcome::Unresolved),
    ];
    let disputes = [false, true];
    let mut num_combos = 0usize;
    for total in totals {
        for outcome in outcomes {
            for dispute in disputes {
                let triple = SettlementStatusModel::resolve(total, outcome, dispute);
                let expect = if total == Decimal::ZERO {
                    ut_expect(
                        LifecycleStatus::Completed,
                        VerificationStatus::Completed,
                        PaymentStatus::Paid,
                    )
                } else if dispute {
                    ut_expect(
                        LifecycleStatus::Pending,
                        VerificationStatus::PendingCharges,
                        PaymentStatus::PendingCharges,
                    )
                } else {
                    match outcome {
                        Some(PaymentOutcome::Succeeded) => ut_expect(
                            LifecycleStatus::Completed,
                            VerificationStatus::Completed,
                            PaymentStatus::ChargesPaid,
                        ),
                        Some(PaymentOutcome::Failed) => ut_expect(
                            LifecycleStatus::Pending,
                            VerificationStatus::PendingCharges,
                            PaymentStatus::PaymentFailed,
                        ),
                        _pending_like => ut_expect(
                            LifecycleStatus::Pending,
                            VerificationStatus::PendingCharges,
                            PaymentStatus::PendingCharges,
                        ),
                    }
                };
                assert_eq!(triple, expect);
                num_combos += 1;
            }
        }
    }
    assert_eq!(num_combos, 20);
} // end of fn decision_table_totality

#[test]
fn zero_total_takes_precedence_over_everything() {
    let triple = SettlementStatusModel::resolve(
        Decimal::ZERO,
        Some(PaymentOutcome::Failed),
        true,
    );
    assert_eq!(triple.payment, PaymentStatus::Paid);
    assert_eq!(triple.lifecycle, LifecycleStatus::Completed);
}

#[test]
fn dispute_overrides_successful_outcome() {
    let triple = SettlementStatusModel::resolve(
        Decimal::new(9000, 2),
        Some(PaymentOutcome::Succeeded),
        true,
    );
    assert_eq!(triple.payment, PaymentStatus::PendingCharges);
    assert_eq!(triple.lifecycle, LifecycleStatus::Pending);
    assert_eq!(triple.verification, VerificationStatus::PendingCharges);
}

#[test]
fn staff_resolution_rows() {
    let cases = [
        (StaffResolutionAction::Waive, PaymentStatus::ChargesWaived),
        (StaffResolutionAction::PartialWaive, PaymentStatus::PartialPaid),
        (StaffResolutionAction::Adjust, PaymentStatus::AdjustedPaid),
    ];
    for (action, expect_payment) in cases {
        let triple = SettlementStatusModel::resolve_staff(action);
        assert_eq!(triple.lifecycle, LifecycleStatus::Completed);
        assert_eq!(triple.verification, VerificationStatus::Completed);
        assert_eq!(triple.payment, expect_payment);
    }
}

#[test]
fn refund_rows() {
    let triple = SettlementStatusModel::resolve_refund(RefundCoverage::Full);
    assert_eq!(triple.lifecycle, LifecycleStatus::Cancelled);
    assert_eq!(triple.verification, VerificationStatus::Completed);
    assert_eq!(triple.payment, PaymentStatus::Refunded);
    let triple = SettlementStatusModel::resolve_refund(RefundCoverage::Partial);
    assert_eq!(triple.lifecycle, LifecycleStatus::Completed);
    assert_eq!(triple.payment, PaymentStatus::PartialRefund);
}

#[test]
fn status_labels_unique() {
    let samples = [
        PaymentStatus::Paid,
        PaymentStatus::PaymentFailed,
        PaymentStatus::PendingCharges,
        PaymentStatus::ChargesPaid,
        PaymentStatus::ChargesWaived,
        PaymentStatus::PartialPaid,
        PaymentStatus::AdjustedPaid,
        PaymentStatus::Refunded,
        PaymentStatus::PartialRefund,
    ];
    let mut seen = Vec::new();
    for s in samples {
        let label = s.label();
        assert!(!seen.contains(&label));
        seen.push(label);
    }
}
