use actix_web::http::header::ContentType;
use actix_web::web::{Data as WebData, Json as ExtJson, Path as ExtPath};
use actix_web::{HttpResponse, Result as ActixResult};

use carshare_common::logging::{app_log_event, AppLogLevel};

use super::dto::{
    ChargeAttemptRespDto, ChargeRetryReqDto, SettlementRefreshRespDto, TripSettleReqDto,
};
use crate::adapter::repository::app_repo_settlement;
use crate::auth::AppAuthedClaim;
use crate::usecase::{
    RetryChargeUcError, RetryChargeUseCase, SettleTripUcError, SettleTripUseCase,
};
use crate::AppSharedState;

pub(super) async fn settle_trip(
    path: ExtPath<u32>,
    ExtJson(req_body): ExtJson<TripSettleReqDto>,
    authed_claim: AppAuthedClaim,
    shr_state: WebData<AppSharedState>,
) -> ActixResult<HttpResponse> {
    let booking_id = path.into_inner();
    let logctx = shr_state.log_context();
    let logctx_p = &logctx;
    app_log_event!(logctx_p, AppLogLevel::DEBUG, "settle-trip-api: {booking_id}");

    let repo = match app_repo_settlement(shr_state.datastore()).await {
        Ok(v) => v,
        Err(e) => {
            app_log_event!(logctx_p, AppLogLevel::ERROR, "repo-init-error {:?}", e);
            let resp = HttpResponse::ServiceUnavailable()
                .append_header(ContentType::plaintext())
                .body("");
            return Ok(resp);
        }
    };
    let uc = SettleTripUseCase {
        repo,
        processors: shr_state.processor_context(),
        evtstream: shr_state.eventstream(),
        logctx: logctx.clone(),
    };
    let resp = match uc.execute(booking_id, authed_claim, req_body).await {
        Ok(v) => {
            let body_serial = serde_json::to_vec(&v).unwrap();
            HttpResponse::Ok()
                .append_header(ContentType::json())
                .body(body_serial)
        }
        Err(uce) => match uce {
            SettleTripUcError::PermissionDenied(usr_id) => {
                app_log_event!(logctx_p, AppLogLevel::WARNING, "denied-usr: {usr_id}");
                HttpResponse::Forbidden().finish()
            }
            SettleTripUcError::ClientBadRequest(detail) => {
                let body = serde_json::to_vec(&detail).unwrap();
                HttpResponse::BadRequest()
                    .append_header(ContentType::json())
                    .body(body)
            }
            SettleTripUcError::ExternalProcessor(e) => {
                app_log_event!(logctx_p, AppLogLevel::ERROR, "{:?}", e);
                HttpResponse::ServiceUnavailable().finish()
            }
            SettleTripUcError::DataStore(e) => {
                app_log_event!(logctx_p, AppLogLevel::ERROR, "{:?}", e);
                HttpResponse::InternalServerError().finish()
            }
        }, // analyze error type, give different error response
    }; // end of use-case execution
    Ok(resp)
} // end of fn settle_trip

pub(super) async fn retry_trip_charge(
    path: ExtPath<u32>,
    ExtJson(req_body): ExtJson<ChargeRetryReqDto>,
    authed_claim: AppAuthedClaim,
    shr_state: WebData<AppSharedState>,
) -> ActixResult<HttpResponse> {
    let booking_id = path.into_inner();
    let logctx = shr_state.log_context();
    let logctx_p = &logctx;
    app_log_event!(logctx_p, AppLogLevel::DEBUG, "retry-charge-api: {booking_id}");

    let repo = match app_repo_settlement(shr_state.datastore()).await {
        Ok(v) => v,
        Err(e) => {
            app_log_event!(logctx_p, AppLogLevel::ERROR, "repo-init-error {:?}", e);
            return Ok(HttpResponse::ServiceUnavailable().finish());
        }
    };
    let uc = RetryChargeUseCase {
        repo,
        processors: shr_state.processor_context(),
        evtstream: shr_state.eventstream(),
        logctx: logctx.clone(),
    };
    let resp = match uc.execute(booking_id, authed_claim, req_body).await {
        Ok(v) => {
            let body_serial = serde_json::to_vec(&v).unwrap();
            HttpResponse::Ok()
                .append_header(ContentType::json())
                .body(body_serial)
        }
        Err(uce) => match uce {
            RetryChargeUcError::PermissionDenied(usr_id) => {
                app_log_event!(logctx_p, AppLogLevel::WARNING, "denied-usr: {usr_id}");
                HttpResponse::Forbidden().finish()
            }
            RetryChargeUcError::MissingSettlement(_id) => HttpResponse::NotFound().finish(),
            RetryChargeUcError::ChargeGuard(e) => {
                let detail = super::dto::PaymentReqErrorDto::from(e);
                let body = serde_json::to_vec(&detail).unwrap();
                HttpResponse::Conflict()
                    .append_header(ContentType::json())
                    .body(body)
            }
            RetryChargeUcError::ExternalProcessor(e) => {
                app_log_event!(logctx_p, AppLogLevel::ERROR, "{:?}", e);
                HttpResponse::ServiceUnavailable().finish()
            }
            RetryChargeUcError::DataStore(e) => {
                app_log_event!(logctx_p, AppLogLevel::ERROR, "{:?}", e);
                HttpResponse::InternalServerError().finish()
            }
        },
    };
    Ok(resp)
} // end of fn retry_trip_charge

pub(super) async fn refresh_settlement_status(
    path: ExtPath<u32>,
    _authed_claim: AppAuthedClaim,
    shr_state: WebData<AppSharedState>,
) -> ActixResult<HttpResponse> {
    let booking_id = path.into_inner();
    let logctx = shr_state.log_context();
    let logctx_p = &logctx;

    let repo = match app_repo_settlement(shr_state.datastore()).await {
        Ok(v) => v,
        Err(e) => {
            app_log_event!(logctx_p, AppLogLevel::ERROR, "repo-init-error {:?}", e);
            return Ok(HttpResponse::ServiceUnavailable().finish());
        }
    };
    let found = match repo.fetch_settlement(booking_id).await {
        Ok(v) => v,
        Err(e) => {
            app_log_event!(logctx_p, AppLogLevel::ERROR, "{:?}", e);
            return Ok(HttpResponse::InternalServerError().finish());
        }
    };
    let (_trip_end_time, breakdown, status) = match found {
        Some(v) => v,
        None => {
            return Ok(HttpResponse::NotFound().finish());
        }
    };
    let attempts = match repo.fetch_attempts(booking_id).await {
        Ok(ms) => ms
            .iter()
            .map(ChargeAttemptRespDto::from)
            .collect::<Vec<_>>(),
        Err(e) => {
            app_log_event!(logctx_p, AppLogLevel::ERROR, "{:?}", e);
            return Ok(HttpResponse::InternalServerError().finish());
        }
    };
    let out = SettlementRefreshRespDto {
        booking_id,
        breakdown: (&breakdown).into(),
        status: (&status).into(),
        attempts,
    };
    let body_serial = serde_json::to_vec(&out).unwrap();
    let resp = HttpResponse::Ok()
        .append_header(ContentType::json())
        .body(body_serial);
    Ok(resp)
} // end of fn refresh_settlement_status
