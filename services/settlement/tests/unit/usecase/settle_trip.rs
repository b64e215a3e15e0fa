use std::str::FromStr;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use carshare_common::api::dto::CurrencyDto;

use settlement::api::web::dto::{
    ChargeOutcomeDto, FuelLevelDto, SettlementStatusDto, TripSettleReqDto,
};
use settlement::auth::AppAuthPermissionCode;
use settlement::model::{ChargeAttemptModel, ChargeAttemptState};
use settlement::usecase::{SettleTripUcError, SettleTripUseCase};

use super::super::{ut_setup_auth_claim, ut_setup_logctx};
use super::super::model::{ut_default_rate_plan, ut_setup_telemetry_dto};
use super::{ut_setup_eventstream, MockPaymentProcessor, MockSettlementRepo};

fn ut_expect_status(l: &str, v: &str, p: &str) -> SettlementStatusDto {
    SettlementStatusDto {
        lifecycle: l.to_string(),
        verification: v.to_string(),
        payment: p.to_string(),
    }
}

#[rustfmt::skip]
fn ut_setup_settle_req(
    odo_end: u32, minutes_late: i64, customer_id: &str,
    has_open_disputes: bool,
) -> TripSettleReqDto {
    let fuel = (Some(FuelLevelDto::Full), Some(FuelLevelDto::Full));
    TripSettleReqDto {
        telemetry: ut_setup_telemetry_dto((50000, odo_end), fuel, minutes_late, 3, Vec::new()),
        rate_plan: ut_default_rate_plan(),
        customer_id: customer_id.to_string(),
        payment_method_id: "pm_70suv11".to_string(),
        has_open_disputes,
    }
}

#[rustfmt::skip]
fn ut_setup_usecase(
    repo: Box<dyn settlement::adapter::repository::AbstractSettlementRepo>,
    capture_states: Option<Vec<Result<ChargeAttemptState, settlement::adapter::processor::AppProcessorError>>>,
) -> SettleTripUseCase {
    SettleTripUseCase {
        repo,
        processors: MockPaymentProcessor::build(capture_states, None, None),
        evtstream: ut_setup_eventstream(),
        logctx: ut_setup_logctx(),
    }
}

#[actix_web::test]
async fn zero_total_skips_gateway() {
    let mock_booking_id = 1280u32;
    // clean return, nothing owed, the processor mock would error out on
    // any capture call
    let repo = MockSettlementRepo::build(None, None, Some(Ok(())), None, None, None, None);
    let uc = ut_setup_usecase(repo, None);
    let claim = ut_setup_auth_claim(77u32, vec![AppAuthPermissionCode::can_settle_trip]);
    let req = ut_setup_settle_req(50500, -10, "cus_39g1", false);
    let result = uc.execute(mock_booking_id, claim, req).await;
    assert!(result.is_ok());
    if let Ok(resp) = result {
        assert!(matches!(resp.outcome, ChargeOutcomeDto::NotRequired));
        let total = Decimal::from_str(resp.breakdown.total.as_str()).unwrap();
        assert_eq!(total, Decimal::ZERO);
        let expect = ut_expect_status("COMPLETED", "COMPLETED", "PAID");
        assert_eq!(resp.status, expect);
    }
}

#[actix_web::test]
async fn capture_succeeded() {
    let mock_booking_id = 1281u32;
    let repo =
        MockSettlementRepo::build(None, Some(Vec::new()), Some(Ok(())), Some(Ok(())), None, None, None);
    let capture = ChargeAttemptState::Succeeded {
        gateway_charge_id: "pi_88valet".to_string(),
        completed_time: Utc.with_ymd_and_hms(2024, 1, 4, 16, 2, 0).unwrap(),
    };
    let uc = ut_setup_usecase(repo, Some(vec![Ok(capture)]));
    let claim = ut_setup_auth_claim(77u32, vec![AppAuthPermissionCode::can_settle_trip]);
    let req = ut_setup_settle_req(50800, 0, "cus_39g1", false);
    let result = uc.execute(mock_booking_id, claim, req).await;
    assert!(result.is_ok());
    if let Ok(resp) = result {
        if let ChargeOutcomeDto::Succeeded {
            gateway_charge_id,
            amount,
            charge_token,
        } = resp.outcome
        {
            assert_eq!(gateway_charge_id.as_str(), "pi_88valet");
            assert_eq!(Decimal::from_str(amount.as_str()).unwrap(), Decimal::new(9000, 2));
            assert!(!charge_token.is_empty());
        } else {
            assert!(false);
        }
        let expect = ut_expect_status("COMPLETED", "COMPLETED", "CHARGES_PAID");
        assert_eq!(resp.status, expect);
    }
} // end of fn capture_succeeded

#[actix_web::test]
async fn capture_declined_routes_to_pending() {
    let mock_booking_id = 1282u32;
    let repo =
        MockSettlementRepo::build(None, Some(Vec::new()), Some(Ok(())), Some(Ok(())), None, None, None);
    let capture = ChargeAttemptState::Failed {
        decline_reason: "card_declined: insufficient funds".to_string(),
    };
    let uc = ut_setup_usecase(repo, Some(vec![Ok(capture)]));
    let claim = ut_setup_auth_claim(77u32, vec![AppAuthPermissionCode::can_settle_trip]);
    let req = ut_setup_settle_req(50800, 0, "cus_39g1", false);
    let result = uc.execute(mock_booking_id, claim, req).await;
    assert!(result.is_ok());
    if let Ok(resp) = result {
        if let ChargeOutcomeDto::Failed { error } = resp.outcome {
            assert!(error.contains("card_declined"));
        } else {
            assert!(false);
        }
        let expect = ut_expect_status("PENDING", "PENDING_CHARGES", "PAYMENT_FAILED");
        assert_eq!(resp.status, expect);
    }
}

#[actix_web::test]
async fn open_dispute_overrides_success() {
    let mock_booking_id = 1283u32;
    let repo =
        MockSettlementRepo::build(None, Some(Vec::new()), Some(Ok(())), Some(Ok(())), None, None, None);
    let capture = ChargeAttemptState::Succeeded {
        gateway_charge_id: "pi_2copper".to_string(),
        completed_time: Utc::now(),
    };
    let uc = ut_setup_usecase(repo, Some(vec![Ok(capture)]));
    let claim = ut_setup_auth_claim(77u32, vec![AppAuthPermissionCode::can_settle_trip]);
    let req = ut_setup_settle_req(50800, 0, "cus_39g1", true);
    let result = uc.execute(mock_booking_id, claim, req).await;
    assert!(result.is_ok());
    if let Ok(resp) = result {
        let expect = ut_expect_status("PENDING", "PENDING_CHARGES", "PENDING_CHARGES");
        assert_eq!(resp.status, expect);
    }
}

#[actix_web::test]
async fn local_validation_fails_without_gateway() {
    let mock_booking_id = 1284u32;
    let repo = MockSettlementRepo::build(None, Some(Vec::new()), Some(Ok(())), None, None, None, None);
    // empty customer reference, the processor mock stays untouched
    let uc = ut_setup_usecase(repo, None);
    let claim = ut_setup_auth_claim(77u32, vec![AppAuthPermissionCode::can_settle_trip]);
    let req = ut_setup_settle_req(50800, 0, "", false);
    let result = uc.execute(mock_booking_id, claim, req).await;
    assert!(result.is_ok());
    if let Ok(resp) = result {
        if let ChargeOutcomeDto::Failed { error } = resp.outcome {
            assert_eq!(error.as_str(), "empty-customer-ref");
        } else {
            assert!(false);
        }
        let expect = ut_expect_status("PENDING", "PENDING_CHARGES", "PAYMENT_FAILED");
        assert_eq!(resp.status, expect);
    }
}

#[actix_web::test]
async fn duplicate_capture_rejected_before_gateway() {
    let mock_booking_id = 1285u32;
    let trip_end = Utc.with_ymd_and_hms(2024, 1, 4, 15, 0, 0).unwrap();
    let mut prior = ChargeAttemptModel::first(
        mock_booking_id,
        trip_end,
        "cus_39g1".to_string(),
        "pm_70suv11".to_string(),
        Decimal::new(9000, 2),
        CurrencyDto::USD,
    )
    .unwrap();
    prior.update_state(ChargeAttemptState::Succeeded {
        gateway_charge_id: "pi_1st".to_string(),
        completed_time: Utc::now(),
    });
    let repo = MockSettlementRepo::build(None, Some(vec![prior]), None, None, None, None, None);
    let uc = ut_setup_usecase(repo, None);
    let claim = ut_setup_auth_claim(77u32, vec![AppAuthPermissionCode::can_settle_trip]);
    let req = ut_setup_settle_req(50800, 0, "cus_39g1", false);
    let result = uc.execute(mock_booking_id, claim, req).await;
    assert!(result.is_err());
    if let Err(SettleTripUcError::ClientBadRequest(detail)) = result {
        assert!(detail.payment.is_some());
    } else {
        assert!(false);
    }
}

#[actix_web::test]
async fn telemetry_validation_error() {
    let mock_booking_id = 1286u32;
    let repo = MockSettlementRepo::build(None, None, None, None, None, None, None);
    let uc = ut_setup_usecase(repo, None);
    let claim = ut_setup_auth_claim(77u32, vec![AppAuthPermissionCode::can_settle_trip]);
    let mut req = ut_setup_settle_req(50800, 0, "cus_39g1", false);
    req.telemetry.duration_days = 0;
    let result = uc.execute(mock_booking_id, claim, req).await;
    assert!(result.is_err());
    if let Err(SettleTripUcError::ClientBadRequest(detail)) = result {
        let es = detail.telemetry.unwrap();
        assert_eq!(es.len(), 1);
    } else {
        assert!(false);
    }
}

#[actix_web::test]
async fn permission_denied() {
    let mock_booking_id = 1287u32;
    let repo = MockSettlementRepo::build(None, None, None, None, None, None, None);
    let uc = ut_setup_usecase(repo, None);
    let claim = ut_setup_auth_claim(78u32, Vec::new());
    let req = ut_setup_settle_req(50800, 0, "cus_39g1", false);
    let result = uc.execute(mock_booking_id, claim, req).await;
    if let Err(SettleTripUcError::PermissionDenied(usr_id)) = result {
        assert_eq!(usr_id, 78u32);
    } else {
        assert!(false);
    }
}
