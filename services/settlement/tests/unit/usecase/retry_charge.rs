use std::str::FromStr;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use carshare_common::api::dto::CurrencyDto;

use settlement::api::web::dto::{ChargeOutcomeDto, ChargeRetryReqDto};
use settlement::auth::AppAuthPermissionCode;
use settlement::model::{ChargeAttemptModel, ChargeAttemptState, ChargeModelError};
use settlement::usecase::{try_parse_request_token, RetryChargeUcError, RetryChargeUseCase};

use super::super::model::ut_setup_breakdown_direct;
use super::super::{ut_setup_auth_claim, ut_setup_logctx};
use super::{ut_setup_eventstream, MockPaymentProcessor, MockSettlementRepo};

type CaptureSeq = Vec<
    Result<ChargeAttemptState, settlement::adapter::processor::AppProcessorError>,
>;

#[rustfmt::skip]
fn ut_setup_prior_attempt(booking_id: u32, outcome: ChargeAttemptState) -> ChargeAttemptModel {
    let trip_end = Utc.with_ymd_and_hms(2024, 1, 4, 15, 0, 0).unwrap();
    let mut m = ChargeAttemptModel::first(
        booking_id, trip_end, "cus_39g1".to_string(), "pm_70suv11".to_string(),
        Decimal::new(56550, 2), CurrencyDto::USD,
    ).unwrap();
    m.update_state(outcome);
    m
}

#[rustfmt::skip]
fn ut_setup_usecase(
    repo: Box<dyn settlement::adapter::repository::AbstractSettlementRepo>,
    capture_states: Option<CaptureSeq>,
) -> RetryChargeUseCase {
    RetryChargeUseCase {
        repo,
        processors: MockPaymentProcessor::build(capture_states, None, None),
        evtstream: ut_setup_eventstream(),
        logctx: ut_setup_logctx(),
    }
}

fn ut_retry_req() -> ChargeRetryReqDto {
    ChargeRetryReqDto {
        customer_id: "cus_39g1".to_string(),
        payment_method_id: "pm_backup77".to_string(),
        has_open_disputes: false,
    }
}

#[actix_web::test]
async fn retry_after_decline_succeeds() {
    let mock_booking_id = 2310u32;
    let prior = ut_setup_prior_attempt(
        mock_booking_id,
        ChargeAttemptState::Failed {
            decline_reason: "card_declined".to_string(),
        },
    );
    let prior_token = prior.meta.token().to_string();
    let snapshot = (
        *prior.meta.trip_end_time(),
        ut_setup_breakdown_direct((31550, 2), (0, 0), (25000, 2), (0, 0)),
        settlement::model::SettlementStatusModel::resolve(
            Decimal::new(56550, 2),
            Some(settlement::model::PaymentOutcome::Failed),
            false,
        ),
    );
    let repo = MockSettlementRepo::build(
        Some(snapshot), Some(vec![prior]), None, Some(Ok(())), None, None, None,
    );
    let capture = ChargeAttemptState::Succeeded {
        gateway_charge_id: "pi_retry_ok".to_string(),
        completed_time: Utc::now(),
    };
    let uc = ut_setup_usecase(repo, Some(vec![Ok(capture)]));
    let claim = ut_setup_auth_claim(81u32, vec![AppAuthPermissionCode::can_retry_charge]);
    let result = uc.execute(mock_booking_id, claim, ut_retry_req()).await;
    assert!(result.is_ok());
    if let Ok(resp) = result {
        if let ChargeOutcomeDto::Succeeded { charge_token, amount, .. } = resp.outcome {
            // the new attempt carries the incremented counter in its own
            // token, with the original attempt referenced in the lineage
            let (booking_id, _t, seq) = try_parse_request_token(charge_token.as_str()).unwrap();
            assert_eq!(booking_id, mock_booking_id);
            assert_eq!(seq, 2u8);
            assert_ne!(charge_token, prior_token);
            let amt = Decimal::from_str(amount.as_str()).unwrap();
            assert_eq!(amt, Decimal::new(56550, 2));
        } else {
            assert!(false);
        }
        assert_eq!(resp.status.payment.as_str(), "CHARGES_PAID");
    }
} // end of fn retry_after_decline_succeeds

#[actix_web::test]
async fn retry_rejected_once_captured() {
    let mock_booking_id = 2311u32;
    let prior = ut_setup_prior_attempt(
        mock_booking_id,
        ChargeAttemptState::Succeeded {
            gateway_charge_id: "pi_already".to_string(),
            completed_time: Utc::now(),
        },
    );
    let snapshot = (
        *prior.meta.trip_end_time(),
        ut_setup_breakdown_direct((31550, 2), (0, 0), (25000, 2), (0, 0)),
        settlement::model::SettlementStatusModel::resolve(
            Decimal::new(56550, 2),
            Some(settlement::model::PaymentOutcome::Succeeded),
            false,
        ),
    );
    let repo = MockSettlementRepo::build(
        Some(snapshot), Some(vec![prior]), None, None, None, None, None,
    );
    let uc = ut_setup_usecase(repo, None);
    let claim = ut_setup_auth_claim(81u32, vec![AppAuthPermissionCode::can_retry_charge]);
    let result = uc.execute(mock_booking_id, claim, ut_retry_req()).await;
    assert!(result.is_err());
    if let Err(RetryChargeUcError::ChargeGuard(e)) = result {
        if let ChargeModelError::AlreadyCaptured { gateway_charge_id } = e {
            assert_eq!(gateway_charge_id.as_str(), "pi_already");
        } else {
            assert!(false);
        }
    } else {
        assert!(false);
    }
}

#[actix_web::test]
async fn retry_missing_settlement() {
    let mock_booking_id = 2312u32;
    let repo = MockSettlementRepo::build(None, None, None, None, None, None, None);
    let uc = ut_setup_usecase(repo, None);
    let claim = ut_setup_auth_claim(81u32, vec![AppAuthPermissionCode::can_retry_charge]);
    let result = uc.execute(mock_booking_id, claim, ut_retry_req()).await;
    if let Err(RetryChargeUcError::MissingSettlement(booking_id)) = result {
        assert_eq!(booking_id, mock_booking_id);
    } else {
        assert!(false);
    }
}

#[actix_web::test]
async fn retry_without_any_prior_attempt() {
    let mock_booking_id = 2313u32;
    let snapshot = (
        Utc.with_ymd_and_hms(2024, 1, 4, 15, 0, 0).unwrap(),
        ut_setup_breakdown_direct((31550, 2), (0, 0), (25000, 2), (0, 0)),
        settlement::model::SettlementStatusModel::resolve(Decimal::new(56550, 2), None, false),
    );
    let repo = MockSettlementRepo::build(
        Some(snapshot), Some(Vec::new()), None, None, None, None, None,
    );
    let uc = ut_setup_usecase(repo, None);
    let claim = ut_setup_auth_claim(81u32, vec![AppAuthPermissionCode::can_retry_charge]);
    let result = uc.execute(mock_booking_id, claim, ut_retry_req()).await;
    assert!(matches!(
        result,
        Err(RetryChargeUcError::ChargeGuard(
            ChargeModelError::MissingOriginAttempt(_)
        ))
    ));
}
