use std::str::FromStr;

use rust_decimal::Decimal;

use carshare_common::api::dto::CurrencyDto;

use settlement::api::web::dto::RefundRequestDto;
use settlement::model::{
    BookingLedgerModel, HostSplitModel, RefundCoverage, RefundModelError, RefundRequestModel,
    RefundRequestState,
};

pub(crate) fn ut_setup_refund_request(
    booking_id: u32,
    amount: &str,
    reverse_host_transfer: bool,
) -> RefundRequestModel {
    let d = RefundRequestDto {
        amount: amount.to_string(),
        reason: "vehicle malfunction mid-trip".to_string(),
        reverse_host_transfer,
    };
    let arg = (
        booking_id,
        d,
        CurrencyDto::USD,
        4471u32,
        "guest-support".to_string(),
    );
    RefundRequestModel::try_from(arg).unwrap()
}

#[rustfmt::skip]
pub(crate) fn ut_setup_ledger(
    booking_id: u32,
    charge_id: Option<&str>,
    captured: &str,
    refunded: &str,
    host_split: Option<(u32, &str, &str)>,
) -> BookingLedgerModel {
    let host_split = host_split.map(|(host_id, transfer_id, amount)| HostSplitModel {
        host_id,
        transfer_id: transfer_id.to_string(),
        amount_transferred: Decimal::from_str(amount).unwrap(),
    });
    BookingLedgerModel::from((
        booking_id,
        charge_id.map(|s| s.to_string()),
        Decimal::from_str(captured).unwrap(),
        Decimal::from_str(refunded).unwrap(),
        CurrencyDto::USD,
        host_split,
    ))
}

#[test]
fn request_review_transitions() {
    let mut m = ut_setup_refund_request(310u32, "120.00", false);
    assert!(matches!(m.state(), RefundRequestState::Pending));
    m.approve(9981u32, Some("verified with host".to_string())).unwrap();
    assert!(matches!(m.state(), RefundRequestState::Approved { .. }));
    // a second review decision on the same request is refused
    let result = m.reject(9982u32, None);
    if let Err(RefundModelError::InvalidStateShift { from, to }) = result {
        assert_eq!(from, "APPROVED");
        assert_eq!(to, "REJECTED");
    } else {
        assert!(false);
    }
}

#[test]
fn request_reject_is_terminal() {
    let mut m = ut_setup_refund_request(311u32, "85.00", false);
    m.reject(9981u32, Some("no fault found".to_string())).unwrap();
    assert!(matches!(m.state(), RefundRequestState::Rejected { .. }));
    let result = m.approve(9981u32, None);
    assert!(matches!(
        result,
        Err(RefundModelError::InvalidStateShift { .. })
    ));
    let result = m.ensure_processable();
    assert!(matches!(
        result,
        Err(RefundModelError::InvalidStateShift { .. })
    ));
}

#[test]
fn request_process_requires_approval() {
    let mut m = ut_setup_refund_request(312u32, "85.00", false);
    let result = m.ensure_processable();
    if let Err(RefundModelError::InvalidStateShift { from, to }) = result {
        assert_eq!(from, "PENDING");
        assert_eq!(to, "PROCESSED");
    } else {
        assert!(false);
    }
    m.approve(9981u32, None).unwrap();
    m.mark_processed("re_90ak1".to_string(), None).unwrap();
    // terminal and idempotent, a re-run reports the original transaction
    let result = m.ensure_processable();
    if let Err(RefundModelError::AlreadyProcessed { refund_txn_id }) = result {
        assert_eq!(refund_txn_id.as_str(), "re_90ak1");
    } else {
        assert!(false);
    }
}

#[test]
fn request_validation() {
    let d = RefundRequestDto {
        amount: "-5".to_string(),
        reason: "x".to_string(),
        reverse_host_transfer: false,
    };
    let arg = (1u32, d, CurrencyDto::USD, 4471u32, "guest-support".to_string());
    let result = RefundRequestModel::try_from(arg);
    assert!(matches!(result, Err(RefundModelError::NonPositiveAmount(_))));

    let d = RefundRequestDto {
        amount: "1e".to_string(),
        reason: "x".to_string(),
        reverse_host_transfer: false,
    };
    let arg = (1u32, d, CurrencyDto::USD, 4471u32, "guest-support".to_string());
    let result = RefundRequestModel::try_from(arg);
    assert!(matches!(result, Err(RefundModelError::AmountParse(_, _))));
}

#[test]
fn ledger_requires_capture_reference() {
    let ledger = ut_setup_ledger(313u32, None, "0", "0", None);
    let result = ledger.charge_ref();
    if let Err(RefundModelError::MissingCapture(booking_id)) = result {
        assert_eq!(booking_id, 313u32);
    } else {
        assert!(false);
    }
    let ledger = ut_setup_ledger(313u32, Some("pi_881click"), "300.00", "0", None);
    assert_eq!(ledger.charge_ref().unwrap(), "pi_881click");
}

#[test]
fn ledger_refund_monotonicity() {
    let mut ledger = ut_setup_ledger(314u32, Some("pi_0ccc1"), "100.00", "0", None);
    let amount = Decimal::from_str("30.00").unwrap();
    for _round in 0..3 {
        let coverage = ledger.apply_refund(amount).unwrap();
        assert_eq!(coverage, RefundCoverage::Partial);
    }
    assert_eq!(ledger.remaining_refundable(), Decimal::from_str("10.00").unwrap());
    // the fourth round would exceed the captured total, refused before
    // any money moves
    let result = ledger.apply_refund(amount);
    if let Err(RefundModelError::ExceedsRefundable { requested, remaining }) = result {
        assert_eq!(requested, amount);
        assert_eq!(remaining, Decimal::from_str("10.00").unwrap());
    } else {
        assert!(false);
    }
    let coverage = ledger
        .apply_refund(Decimal::from_str("10.00").unwrap())
        .unwrap();
    assert_eq!(coverage, RefundCoverage::Full);
    assert_eq!(ledger.remaining_refundable(), Decimal::ZERO);
}

#[test]
fn ledger_reversal_share_proportional() {
    let split = Some((6602u32, "tr_77zu0", "240.00"));
    let ledger = ut_setup_ledger(315u32, Some("pi_5d01x"), "300.00", "0", split);
    // refunding half claws back half of what was transferred out
    let share = ledger
        .reversal_share(Decimal::from_str("150.00").unwrap())
        .unwrap();
    assert_eq!(share, Decimal::from_str("120.00").unwrap());
    let share = ledger
        .reversal_share(Decimal::from_str("300.00").unwrap())
        .unwrap();
    assert_eq!(share, Decimal::from_str("240.00").unwrap());
    // the platform commission (60.00 at here) never joins the reversible
    // base
    assert!(share < ledger.captured_total());
}

#[test]
fn ledger_reversal_share_absent_without_split() {
    let ledger = ut_setup_ledger(316u32, Some("pi_5d01x"), "300.00", "0", None);
    let result = ledger.reversal_share(Decimal::from_str("150.00").unwrap());
    assert!(result.is_none());
}
