use settlement::api::web::dto::{RefundRequestDto, RefundReviewDecisionDto, RefundReviewReqDto};
use settlement::auth::AppAuthPermissionCode;
use settlement::model::RefundModelError;
use settlement::usecase::{
    CreateRefundReqUseCase, RefundReviewUcError, ReviewRefundUseCase,
};

use super::super::model::refund::{ut_setup_ledger, ut_setup_refund_request};
use super::super::ut_setup_auth_claim;
use super::MockRefundRepo;

#[actix_web::test]
async fn create_request_happy_path() {
    let mock_booking_id = 6601u32;
    let ledger = ut_setup_ledger(mock_booking_id, Some("pi_cap300"), "300.00", "0", None);
    let repo = MockRefundRepo::build(None, Some(ledger), Some(Ok(())), None, None);
    let uc = CreateRefundReqUseCase { repo };
    let claim = ut_setup_auth_claim(707u32, vec![AppAuthPermissionCode::can_create_refund_req]);
    let d = RefundRequestDto {
        amount: "120.00".to_string(),
        reason: "trip cut short by breakdown".to_string(),
        reverse_host_transfer: true,
    };
    let result = uc
        .execute(mock_booking_id, claim, "guest-support".to_string(), d)
        .await;
    assert!(result.is_ok());
    if let Ok(resp) = result {
        assert_eq!(resp.booking_id, mock_booking_id);
        assert_eq!(resp.state.as_str(), "PENDING");
        assert_eq!(resp.amount.as_str(), "120.00");
        assert_eq!(resp.request_id.len(), 20);
    }
}

#[actix_web::test]
async fn create_request_rejects_over_asking() {
    let mock_booking_id = 6602u32;
    let ledger = ut_setup_ledger(mock_booking_id, Some("pi_cap300"), "300.00", "250.00", None);
    let repo = MockRefundRepo::build(None, Some(ledger), None, None, None);
    let uc = CreateRefundReqUseCase { repo };
    let claim = ut_setup_auth_claim(707u32, vec![AppAuthPermissionCode::can_create_refund_req]);
    let d = RefundRequestDto {
        amount: "60.00".to_string(),
        reason: "partial day lost".to_string(),
        reverse_host_transfer: false,
    };
    let result = uc
        .execute(mock_booking_id, claim, "guest-support".to_string(), d)
        .await;
    assert!(matches!(
        result,
        Err(RefundReviewUcError::Precondition(
            RefundModelError::ExceedsRefundable { .. }
        ))
    ));
}

#[actix_web::test]
async fn create_request_requires_capture() {
    let mock_booking_id = 6603u32;
    let ledger = ut_setup_ledger(mock_booking_id, None, "0", "0", None);
    let repo = MockRefundRepo::build(None, Some(ledger), None, None, None);
    let uc = CreateRefundReqUseCase { repo };
    let claim = ut_setup_auth_claim(707u32, vec![AppAuthPermissionCode::can_create_refund_req]);
    let d = RefundRequestDto {
        amount: "60.00".to_string(),
        reason: "partial day lost".to_string(),
        reverse_host_transfer: false,
    };
    let result = uc
        .execute(mock_booking_id, claim, "guest-support".to_string(), d)
        .await;
    assert!(matches!(
        result,
        Err(RefundReviewUcError::Precondition(
            RefundModelError::MissingCapture(_)
        ))
    ));
}

#[actix_web::test]
async fn review_approve_then_reject_refused() {
    let mock_booking_id = 6604u32;
    let req_m = ut_setup_refund_request(mock_booking_id, "120.00", false);
    let req_time = *req_m.req_time();
    let repo = MockRefundRepo::build(Some(req_m), None, None, Some(Ok(())), None);
    let uc = ReviewRefundUseCase { repo };
    let claim = ut_setup_auth_claim(808u32, vec![AppAuthPermissionCode::can_review_refund]);
    let d = RefundReviewReqDto {
        decision: RefundReviewDecisionDto::Approve,
        notes: Some("host confirmed the malfunction".to_string()),
    };
    let result = uc.execute(mock_booking_id, req_time, claim, d).await;
    assert!(result.is_ok());
    if let Ok(resp) = result {
        assert_eq!(resp.state.as_str(), "APPROVED");
    }

    // replay the review over the already approved request
    let mut req_m = ut_setup_refund_request(mock_booking_id, "120.00", false);
    req_m.approve(808u32, None).unwrap();
    let repo = MockRefundRepo::build(Some(req_m), None, None, None, None);
    let uc = ReviewRefundUseCase { repo };
    let claim = ut_setup_auth_claim(808u32, vec![AppAuthPermissionCode::can_review_refund]);
    let d = RefundReviewReqDto {
        decision: RefundReviewDecisionDto::Reject,
        notes: None,
    };
    let result = uc.execute(mock_booking_id, req_time, claim, d).await;
    assert!(matches!(
        result,
        Err(RefundReviewUcError::Precondition(
            RefundModelError::InvalidStateShift { .. }
        ))
    ));
}

#[actix_web::test]
async fn review_missing_request() {
    let mock_booking_id = 6605u32;
    let repo = MockRefundRepo::build(None, None, None, None, None);
    let uc = ReviewRefundUseCase { repo };
    let claim = ut_setup_auth_claim(808u32, vec![AppAuthPermissionCode::can_review_refund]);
    let d = RefundReviewReqDto {
        decision: RefundReviewDecisionDto::Reject,
        notes: None,
    };
    let result = uc
        .execute(mock_booking_id, chrono::Utc::now(), claim, d)
        .await;
    assert!(matches!(
        result,
        Err(RefundReviewUcError::MissingRequest(_, _))
    ));
}
