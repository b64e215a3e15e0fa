use actix_web::http::header::ContentType;
use actix_web::web::{Data as WebData, Json as ExtJson, Path as ExtPath};
use actix_web::{HttpResponse, Result as ActixResult};
use chrono::{DateTime, Utc};

use carshare_common::logging::{app_log_event, AppLogLevel};

use super::dto::{RefundErrorDto, RefundRequestDto, RefundReviewReqDto};
use crate::adapter::repository::app_repo_refund;
use crate::auth::AppAuthedClaim;
use crate::usecase::{
    try_parse_request_token, CreateRefundReqUseCase, ProcessRefundUcError, ProcessRefundUseCase,
    RefundReviewUcError, ReviewRefundUseCase,
};
use crate::AppSharedState;

const REQUESTER_ROLE_SUPPORT: &str = "guest-support";

fn _decode_req_token(serial: &str) -> Option<(u32, DateTime<Utc>)> {
    try_parse_request_token(serial)
        .map(|(booking_id, req_time, _seq)| (booking_id, req_time))
        .ok()
}

fn _review_err_response(logctx: &std::sync::Arc<carshare_common::logging::AppLogContext>, uce: RefundReviewUcError) -> HttpResponse {
    match uce {
        RefundReviewUcError::PermissionDenied(usr_id) => {
            app_log_event!(logctx, AppLogLevel::WARNING, "denied-usr: {usr_id}");
            HttpResponse::Forbidden().finish()
        }
        RefundReviewUcError::MissingRequest(_id, _t) => HttpResponse::NotFound().finish(),
        RefundReviewUcError::MissingLedger(_id) => HttpResponse::NotFound().finish(),
        RefundReviewUcError::Precondition(e) => {
            let detail = RefundErrorDto::from(e);
            let body = serde_json::to_vec(&detail).unwrap();
            HttpResponse::Conflict()
                .append_header(ContentType::json())
                .body(body)
        }
        RefundReviewUcError::DataStore(e) => {
            app_log_event!(logctx, AppLogLevel::ERROR, "{:?}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub(super) async fn create_refund_request(
    path: ExtPath<u32>,
    ExtJson(req_body): ExtJson<RefundRequestDto>,
    authed_claim: AppAuthedClaim,
    shr_state: WebData<AppSharedState>,
) -> ActixResult<HttpResponse> {
    let booking_id = path.into_inner();
    let logctx = shr_state.log_context();
    let logctx_p = &logctx;
    app_log_event!(logctx_p, AppLogLevel::DEBUG, "create-refund-api: {booking_id}");

    let repo = match app_repo_refund(shr_state.datastore()).await {
        Ok(v) => v,
        Err(e) => {
            app_log_event!(logctx_p, AppLogLevel::ERROR, "repo-init-error {:?}", e);
            return Ok(HttpResponse::ServiceUnavailable().finish());
        }
    };
    let uc = CreateRefundReqUseCase { repo };
    let result = uc
        .execute(
            booking_id,
            authed_claim,
            REQUESTER_ROLE_SUPPORT.to_string(),
            req_body,
        )
        .await;
    let resp = match result {
        Ok(v) => {
            let body_serial = serde_json::to_vec(&v).unwrap();
            HttpResponse::Created()
                .append_header(ContentType::json())
                .body(body_serial)
        }
        Err(uce) => _review_err_response(&logctx, uce),
    };
    Ok(resp)
} // end of fn create_refund_request

pub(super) async fn review_refund_request(
    path: ExtPath<String>,
    ExtJson(req_body): ExtJson<RefundReviewReqDto>,
    authed_claim: AppAuthedClaim,
    shr_state: WebData<AppSharedState>,
) -> ActixResult<HttpResponse> {
    let req_token = path.into_inner();
    let logctx = shr_state.log_context();
    let logctx_p = &logctx;
    app_log_event!(logctx_p, AppLogLevel::DEBUG, "review-refund-api: {req_token}");

    let (booking_id, req_time) = match _decode_req_token(req_token.as_str()) {
        Some(v) => v,
        None => {
            return Ok(HttpResponse::BadRequest().finish());
        }
    };
    let repo = match app_repo_refund(shr_state.datastore()).await {
        Ok(v) => v,
        Err(e) => {
            app_log_event!(logctx_p, AppLogLevel::ERROR, "repo-init-error {:?}", e);
            return Ok(HttpResponse::ServiceUnavailable().finish());
        }
    };
    let uc = ReviewRefundUseCase { repo };
    let resp = match uc.execute(booking_id, req_time, authed_claim, req_body).await {
        Ok(v) => {
            let body_serial = serde_json::to_vec(&v).unwrap();
            HttpResponse::Ok()
                .append_header(ContentType::json())
                .body(body_serial)
        }
        Err(uce) => _review_err_response(&logctx, uce),
    };
    Ok(resp)
} // end of fn review_refund_request

pub(super) async fn process_refund_request(
    path: ExtPath<String>,
    authed_claim: AppAuthedClaim,
    shr_state: WebData<AppSharedState>,
) -> ActixResult<HttpResponse> {
    let req_token = path.into_inner();
    let logctx = shr_state.log_context();
    let logctx_p = &logctx;
    app_log_event!(logctx_p, AppLogLevel::DEBUG, "process-refund-api: {req_token}");

    let (booking_id, req_time) = match _decode_req_token(req_token.as_str()) {
        Some(v) => v,
        None => {
            return Ok(HttpResponse::BadRequest().finish());
        }
    };
    let repo = match app_repo_refund(shr_state.datastore()).await {
        Ok(v) => v,
        Err(e) => {
            app_log_event!(logctx_p, AppLogLevel::ERROR, "repo-init-error {:?}", e);
            return Ok(HttpResponse::ServiceUnavailable().finish());
        }
    };
    let uc = ProcessRefundUseCase {
        repo,
        processors: shr_state.processor_context(),
        evtstream: shr_state.eventstream(),
        logctx: logctx.clone(),
    };
    let resp = match uc.execute(booking_id, req_time, authed_claim).await {
        Ok(v) => {
            let body_serial = serde_json::to_vec(&v).unwrap();
            HttpResponse::Ok()
                .append_header(ContentType::json())
                .body(body_serial)
        }
        Err(uce) => match uce {
            ProcessRefundUcError::PermissionDenied(usr_id) => {
                app_log_event!(logctx_p, AppLogLevel::WARNING, "denied-usr: {usr_id}");
                HttpResponse::Forbidden().finish()
            }
            ProcessRefundUcError::MissingRequest(_id, _t) => HttpResponse::NotFound().finish(),
            ProcessRefundUcError::MissingLedger(_id) => HttpResponse::NotFound().finish(),
            ProcessRefundUcError::Precondition(e) => {
                let detail = RefundErrorDto::from(e);
                let body = serde_json::to_vec(&detail).unwrap();
                HttpResponse::Conflict()
                    .append_header(ContentType::json())
                    .body(body)
            }
            ProcessRefundUcError::RefundFailed(e) => {
                // the request is still APPROVED, the caller may retry once
                // the gateway recovers
                app_log_event!(logctx_p, AppLogLevel::ERROR, "{:?}", e);
                HttpResponse::BadGateway().finish()
            }
            ProcessRefundUcError::DataStore(e) => {
                app_log_event!(logctx_p, AppLogLevel::ERROR, "{:?}", e);
                HttpResponse::InternalServerError().finish()
            }
        },
    };
    Ok(resp)
} // end of fn process_refund_request
