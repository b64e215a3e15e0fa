use std::str::FromStr;

use rust_decimal::Decimal;

use settlement::adapter::processor::{
    AppProcessorErrorReason, AppProcessorFnLabel, AppProcessorRefundResult,
    AppProcessorReversalResult,
};
use settlement::auth::AppAuthPermissionCode;
use settlement::model::{RefundModelError, RefundRequestModel};
use settlement::usecase::{ProcessRefundUcError, ProcessRefundUseCase};

use super::super::model::refund::{ut_setup_ledger, ut_setup_refund_request};
use super::super::{ut_setup_auth_claim, ut_setup_logctx};
use super::{ut_processor_err, ut_setup_eventstream, MockPaymentProcessor, MockRefundRepo};

fn ut_setup_approved_request(
    booking_id: u32,
    amount: &str,
    reverse: bool,
) -> RefundRequestModel {
    let mut m = ut_setup_refund_request(booking_id, amount, reverse);
    m.approve(9981u32, Some("validated against trip report".to_string()))
        .unwrap();
    m
}

#[rustfmt::skip]
fn ut_setup_usecase(
    repo: Box<dyn settlement::adapter::repository::AbstractRefundRepo>,
    refund_res: Option<Result<AppProcessorRefundResult, settlement::adapter::processor::AppProcessorError>>,
    reversal_res: Option<Result<AppProcessorReversalResult, settlement::adapter::processor::AppProcessorError>>,
) -> ProcessRefundUseCase {
    ProcessRefundUseCase {
        repo,
        processors: MockPaymentProcessor::build(None, refund_res, reversal_res),
        evtstream: ut_setup_eventstream(),
        logctx: ut_setup_logctx(),
    }
}

#[actix_web::test]
async fn full_refund_with_split_reversal() {
    let mock_booking_id = 5501u32;
    let req_m = ut_setup_approved_request(mock_booking_id, "300.00", true);
    let req_time = *req_m.req_time();
    let ledger = ut_setup_ledger(
        mock_booking_id,
        Some("pi_cap300"),
        "300.00",
        "0",
        Some((6602u32, "tr_77zu0", "240.00")),
    );
    let repo = MockRefundRepo::build(Some(req_m), Some(ledger), None, None, Some(Ok(())));
    let refund_res = Ok(AppProcessorRefundResult {
        refund_id: "re_full300".to_string(),
        amount: Decimal::from_str("300.00").unwrap(),
    });
    let reversal_res = Ok(AppProcessorReversalResult {
        reversal_id: "trr_back240".to_string(),
        amount: Decimal::from_str("240.00").unwrap(),
    });
    let uc = ut_setup_usecase(repo, Some(refund_res), Some(reversal_res));
    let claim = ut_setup_auth_claim(606u32, vec![AppAuthPermissionCode::can_process_refund]);
    let result = uc.execute(mock_booking_id, req_time, claim).await;
    assert!(result.is_ok());
    if let Ok(resp) = result {
        assert_eq!(resp.refund_txn_id.as_str(), "re_full300");
        assert_eq!(resp.amount.as_str(), "300.00");
        let reversal = resp.reversal.unwrap();
        assert_eq!(reversal.reversal_id.as_str(), "trr_back240");
        assert_eq!(reversal.amount.as_str(), "240.00");
        assert!(resp.reversal_error.is_none());
        // fully refunded, booking closed out and cancelled
        assert_eq!(resp.status.lifecycle.as_str(), "CANCELLED");
        assert_eq!(resp.status.payment.as_str(), "REFUNDED");
    }
} // end of fn full_refund_with_split_reversal

#[actix_web::test]
async fn partial_refund_marks_partial() {
    let mock_booking_id = 5502u32;
    let req_m = ut_setup_approved_request(mock_booking_id, "100.00", true);
    let req_time = *req_m.req_time();
    let ledger = ut_setup_ledger(
        mock_booking_id,
        Some("pi_cap300"),
        "300.00",
        "0",
        Some((6602u32, "tr_77zu0", "240.00")),
    );
    let repo = MockRefundRepo::build(Some(req_m), Some(ledger), None, None, Some(Ok(())));
    let refund_res = Ok(AppProcessorRefundResult {
        refund_id: "re_part100".to_string(),
        amount: Decimal::from_str("100.00").unwrap(),
    });
    let reversal_res = Ok(AppProcessorReversalResult {
        reversal_id: "trr_back80".to_string(),
        amount: Decimal::from_str("80.00").unwrap(),
    });
    let uc = ut_setup_usecase(repo, Some(refund_res), Some(reversal_res));
    let claim = ut_setup_auth_claim(606u32, vec![AppAuthPermissionCode::can_process_refund]);
    let result = uc.execute(mock_booking_id, req_time, claim).await;
    assert!(result.is_ok());
    if let Ok(resp) = result {
        assert_eq!(resp.status.lifecycle.as_str(), "COMPLETED");
        assert_eq!(resp.status.payment.as_str(), "PARTIAL_REFUND");
        let reversal = resp.reversal.unwrap();
        // one third refunded claws back one third of the transferred share
        assert_eq!(reversal.amount.as_str(), "80.00");
    }
}

#[actix_web::test]
async fn reversal_failure_still_processed() {
    let mock_booking_id = 5503u32;
    let req_m = ut_setup_approved_request(mock_booking_id, "150.00", true);
    let req_time = *req_m.req_time();
    let ledger = ut_setup_ledger(
        mock_booking_id,
        Some("pi_cap300"),
        "300.00",
        "0",
        Some((6602u32, "tr_77zu0", "240.00")),
    );
    let repo = MockRefundRepo::build(Some(req_m), Some(ledger), None, None, Some(Ok(())));
    let refund_res = Ok(AppProcessorRefundResult {
        refund_id: "re_half150".to_string(),
        amount: Decimal::from_str("150.00").unwrap(),
    });
    let reversal_res = Err(ut_processor_err(AppProcessorFnLabel::ReverseTransfer));
    let uc = ut_setup_usecase(repo, Some(refund_res), Some(reversal_res));
    let claim = ut_setup_auth_claim(606u32, vec![AppAuthPermissionCode::can_process_refund]);
    let result = uc.execute(mock_booking_id, req_time, claim).await;
    // the primary refund went through, the reversal failure is follow-up
    // data, never a hard failure
    assert!(result.is_ok());
    if let Ok(resp) = result {
        assert_eq!(resp.refund_txn_id.as_str(), "re_half150");
        assert!(resp.reversal.is_none());
        assert!(resp.reversal_error.is_some());
        assert_eq!(resp.status.payment.as_str(), "PARTIAL_REFUND");
    }
}

#[actix_web::test]
async fn refund_failure_keeps_request_retriable() {
    let mock_booking_id = 5504u32;
    let req_m = ut_setup_approved_request(mock_booking_id, "150.00", false);
    let req_time = *req_m.req_time();
    let ledger = ut_setup_ledger(mock_booking_id, Some("pi_cap300"), "300.00", "0", None);
    // finalize must never run at here, the mock errors out when touched
    let repo = MockRefundRepo::build(Some(req_m), Some(ledger), None, None, None);
    let refund_res = Err(ut_processor_err(AppProcessorFnLabel::RefundCapture));
    let uc = ut_setup_usecase(repo, Some(refund_res), None);
    let claim = ut_setup_auth_claim(606u32, vec![AppAuthPermissionCode::can_process_refund]);
    let result = uc.execute(mock_booking_id, req_time, claim).await;
    if let Err(ProcessRefundUcError::RefundFailed(e)) = result {
        assert!(matches!(e.reason, AppProcessorErrorReason::NotSupport));
    } else {
        assert!(false);
    }
}

#[actix_web::test]
async fn process_requires_approved_state() {
    let mock_booking_id = 5505u32;
    let req_m = ut_setup_refund_request(mock_booking_id, "150.00", false);
    let req_time = *req_m.req_time();
    let repo = MockRefundRepo::build(Some(req_m), None, None, None, None);
    let uc = ut_setup_usecase(repo, None, None);
    let claim = ut_setup_auth_claim(606u32, vec![AppAuthPermissionCode::can_process_refund]);
    let result = uc.execute(mock_booking_id, req_time, claim).await;
    if let Err(ProcessRefundUcError::Precondition(e)) = result {
        assert!(matches!(e, RefundModelError::InvalidStateShift { .. }));
    } else {
        assert!(false);
    }
}

#[actix_web::test]
async fn process_idempotent_after_done() {
    let mock_booking_id = 5506u32;
    let mut req_m = ut_setup_approved_request(mock_booking_id, "150.00", false);
    req_m.mark_processed("re_done".to_string(), None).unwrap();
    let req_time = *req_m.req_time();
    let repo = MockRefundRepo::build(Some(req_m), None, None, None, None);
    let uc = ut_setup_usecase(repo, None, None);
    let claim = ut_setup_auth_claim(606u32, vec![AppAuthPermissionCode::can_process_refund]);
    let result = uc.execute(mock_booking_id, req_time, claim).await;
    if let Err(ProcessRefundUcError::Precondition(RefundModelError::AlreadyProcessed {
        refund_txn_id,
    })) = result
    {
        assert_eq!(refund_txn_id.as_str(), "re_done");
    } else {
        assert!(false);
    }
}

#[actix_web::test]
async fn process_rejects_over_refunding() {
    let mock_booking_id = 5507u32;
    let req_m = ut_setup_approved_request(mock_booking_id, "200.00", false);
    let req_time = *req_m.req_time();
    // 280 of the 300 captured already went back in earlier requests
    let ledger = ut_setup_ledger(mock_booking_id, Some("pi_cap300"), "300.00", "280.00", None);
    let repo = MockRefundRepo::build(Some(req_m), Some(ledger), None, None, None);
    let uc = ut_setup_usecase(repo, None, None);
    let claim = ut_setup_auth_claim(606u32, vec![AppAuthPermissionCode::can_process_refund]);
    let result = uc.execute(mock_booking_id, req_time, claim).await;
    if let Err(ProcessRefundUcError::Precondition(RefundModelError::ExceedsRefundable {
        requested,
        remaining,
    })) = result
    {
        assert_eq!(requested, Decimal::from_str("200.00").unwrap());
        assert_eq!(remaining, Decimal::from_str("20.00").unwrap());
    } else {
        assert!(false);
    }
}

#[actix_web::test]
async fn process_requires_prior_capture() {
    let mock_booking_id = 5508u32;
    let req_m = ut_setup_approved_request(mock_booking_id, "50.00", false);
    let req_time = *req_m.req_time();
    let ledger = ut_setup_ledger(mock_booking_id, None, "0", "0", None);
    let repo = MockRefundRepo::build(Some(req_m), Some(ledger), None, None, None);
    let uc = ut_setup_usecase(repo, None, None);
    let claim = ut_setup_auth_claim(606u32, vec![AppAuthPermissionCode::can_process_refund]);
    let result = uc.execute(mock_booking_id, req_time, claim).await;
    if let Err(ProcessRefundUcError::Precondition(RefundModelError::MissingCapture(id))) = result {
        assert_eq!(id, mock_booking_id);
    } else {
        assert!(false);
    }
}
