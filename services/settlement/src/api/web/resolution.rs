use actix_web::http::header::ContentType;
use actix_web::web::{Data as WebData, Json as ExtJson, Path as ExtPath};
use actix_web::{HttpResponse, Result as ActixResult};

use carshare_common::logging::{app_log_event, AppLogLevel};

use super::dto::{AdjustReqDto, PaymentReqErrorDto, ResolutionErrorDto, WaiveReqDto};
use crate::adapter::repository::app_repo_settlement;
use crate::auth::AppAuthedClaim;
use crate::usecase::{StaffResolveUcError, StaffResolveUseCase};
use crate::AppSharedState;

enum StaffResolveAction {
    Waive(WaiveReqDto),
    Adjust(AdjustReqDto),
}

async fn _run_staff_resolution(
    booking_id: u32,
    action: StaffResolveAction,
    authed_claim: AppAuthedClaim,
    shr_state: WebData<AppSharedState>,
) -> ActixResult<HttpResponse> {
    let logctx = shr_state.log_context();
    let logctx_p = &logctx;

    let repo = match app_repo_settlement(shr_state.datastore()).await {
        Ok(v) => v,
        Err(e) => {
            app_log_event!(logctx_p, AppLogLevel::ERROR, "repo-init-error {:?}", e);
            return Ok(HttpResponse::ServiceUnavailable().finish());
        }
    };
    let uc = StaffResolveUseCase {
        repo,
        processors: shr_state.processor_context(),
        evtstream: shr_state.eventstream(),
        logctx: logctx.clone(),
    };
    let result = match action {
        StaffResolveAction::Waive(req) => uc.execute_waive(booking_id, authed_claim, req).await,
        StaffResolveAction::Adjust(req) => uc.execute_adjust(booking_id, authed_claim, req).await,
    };
    let resp = match result {
        Ok(v) => {
            let body_serial = serde_json::to_vec(&v).unwrap();
            HttpResponse::Ok()
                .append_header(ContentType::json())
                .body(body_serial)
        }
        Err(uce) => match uce {
            StaffResolveUcError::PermissionDenied(usr_id) => {
                app_log_event!(logctx_p, AppLogLevel::WARNING, "denied-usr: {usr_id}");
                HttpResponse::Forbidden().finish()
            }
            StaffResolveUcError::MissingSettlement(_id) => HttpResponse::NotFound().finish(),
            StaffResolveUcError::Resolution(es) => {
                let detail = es
                    .into_iter()
                    .map(ResolutionErrorDto::from)
                    .collect::<Vec<_>>();
                let body = serde_json::to_vec(&detail).unwrap();
                HttpResponse::BadRequest()
                    .append_header(ContentType::json())
                    .body(body)
            }
            StaffResolveUcError::ChargeGuard(e) => {
                let detail = PaymentReqErrorDto::from(e);
                let body = serde_json::to_vec(&detail).unwrap();
                HttpResponse::Conflict()
                    .append_header(ContentType::json())
                    .body(body)
            }
            StaffResolveUcError::ExternalProcessor(e) => {
                app_log_event!(logctx_p, AppLogLevel::ERROR, "{:?}", e);
                HttpResponse::ServiceUnavailable().finish()
            }
            StaffResolveUcError::DataStore(e) => {
                app_log_event!(logctx_p, AppLogLevel::ERROR, "{:?}", e);
                HttpResponse::InternalServerError().finish()
            }
        },
    };
    Ok(resp)
} // end of fn _run_staff_resolution

pub(super) async fn waive_trip_charges(
    path: ExtPath<u32>,
    ExtJson(req_body): ExtJson<WaiveReqDto>,
    authed_claim: AppAuthedClaim,
    shr_state: WebData<AppSharedState>,
) -> ActixResult<HttpResponse> {
    let booking_id = path.into_inner();
    let logctx = shr_state.log_context();
    app_log_event!(logctx, AppLogLevel::DEBUG, "waive-api: {booking_id}");
    _run_staff_resolution(
        booking_id,
        StaffResolveAction::Waive(req_body),
        authed_claim,
        shr_state,
    )
    .await
}

pub(super) async fn adjust_trip_charges(
    path: ExtPath<u32>,
    ExtJson(req_body): ExtJson<AdjustReqDto>,
    authed_claim: AppAuthedClaim,
    shr_state: WebData<AppSharedState>,
) -> ActixResult<HttpResponse> {
    let booking_id = path.into_inner();
    let logctx = shr_state.log_context();
    app_log_event!(logctx, AppLogLevel::DEBUG, "adjust-api: {booking_id}");
    _run_staff_resolution(
        booking_id,
        StaffResolveAction::Adjust(req_body),
        authed_claim,
        shr_state,
    )
    .await
}
