use std::boxed::Box;
use std::future::Future;
use std::pin::Pin;
use std::result::Result;
use std::sync::Arc;

use actix_http::body::BoxBody;
use actix_http::{HttpMessage, Payload, StatusCode};
use actix_web::dev::ServiceRequest;
use actix_web::error::{Error as ActixError, ResponseError};
use actix_web::web::Data as WebData;
use actix_web::{FromRequest, HttpRequest, HttpResponse};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode as jwt_decode, decode_header, Validation as JwtValidation};
use serde::{Deserialize, Serialize};

use carshare_common::auth::{jsn_validate_ap_code, quota_matcode_deserialize_error};

use super::keystore::{AbstractAuthKeystore, AuthKeystoreError};
use crate::{app_meta, AppSharedState};

#[allow(non_camel_case_types)]
type KEYSTORE_TYPE = Arc<Box<dyn AbstractAuthKeystore>>;

#[derive(Debug, Clone)]
pub enum AuthJwtError {
    MissingKeystore,
    MissingAuthedClaim,
    KeystoreFailure(AuthKeystoreError),
    VerifyFailure(JwtErrorKind),
}

#[allow(non_camel_case_types)]
#[derive(Deserialize, Serialize, PartialEq, Clone, Copy)]
pub enum AppAuthPermissionCode {
    can_settle_trip,
    can_retry_charge,
    can_waive_charges,
    can_adjust_charges,
    can_create_refund_req,
    can_review_refund,
    can_process_refund,
}

#[derive(Clone, Copy, PartialEq)]
pub enum AppAuthQuotaMatCode {
    NumRefundReqsPerBooking,
}

#[derive(Deserialize, Serialize)]
pub struct AppAuthClaimPermission {
    #[serde(deserialize_with = "AppAuthedClaim::_jsn_validate_ap_code")]
    pub app_code: u8,
    pub codename: AppAuthPermissionCode,
}
#[derive(Deserialize, Serialize)]
pub struct AppAuthClaimQuota {
    #[serde(deserialize_with = "AppAuthedClaim::_jsn_validate_ap_code")]
    pub app_code: u8,
    pub mat_code: AppAuthQuotaMatCode,
    pub maxnum: u32,
}
#[derive(Deserialize, Serialize)]
pub struct AppAuthedClaim {
    pub profile: u32,
    pub iat: i64,
    pub exp: i64,
    pub aud: Vec<String>,
    pub perms: Vec<AppAuthClaimPermission>,
    pub quota: Vec<AppAuthClaimQuota>,
}

impl Serialize for AppAuthQuotaMatCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let raw = match self {
            Self::NumRefundReqsPerBooking => 1u8,
        };
        serializer.serialize_u8(raw)
    }
}
impl<'de> Deserialize<'de> for AppAuthQuotaMatCode {
    fn deserialize<D>(raw: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let val = u8::deserialize(raw)?;
        match val {
            1u8 => Ok(Self::NumRefundReqsPerBooking),
            _others => Err(quota_matcode_deserialize_error::<D>(val, (1u8, 1u8))),
        }
    }
}

impl AppAuthedClaim {
    fn _jsn_validate_ap_code<'de, D>(raw: D) -> Result<u8, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        jsn_validate_ap_code(raw, app_meta::RESOURCE_QUOTA_AP_CODE, app_meta::LABAL)
    }

    pub fn contains_permission(&self, code: AppAuthPermissionCode) -> bool {
        self.perms
            .iter()
            .any(|p| p.app_code == app_meta::RESOURCE_QUOTA_AP_CODE && p.codename == code)
    }

    pub fn quota_limit(&self, mat_code: AppAuthQuotaMatCode) -> u32 {
        self.quota
            .iter()
            .find(|q| q.app_code == app_meta::RESOURCE_QUOTA_AP_CODE && q.mat_code == mat_code)
            .map(|q| q.maxnum)
            .unwrap_or(0u32)
    }
} // end of impl AppAuthedClaim

impl std::fmt::Display for AuthJwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::MissingKeystore => "missing-keystore".to_string(),
            Self::MissingAuthedClaim => "missing-authed-claim".to_string(),
            Self::KeystoreFailure(e) => format!("keystore-failure: {:?}", e),
            Self::VerifyFailure(k) => format!("verify-failure: {:?}", k),
        };
        f.write_str(label.as_str())
    }
}
impl ResponseError for AuthJwtError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
    fn error_response(&self) -> HttpResponse<BoxBody> {
        HttpResponse::Unauthorized().finish()
    }
}

fn _verify_token(keystore: KEYSTORE_TYPE, token: &str) -> Result<AppAuthedClaim, AuthJwtError> {
    let header = decode_header(token).map_err(|e| AuthJwtError::VerifyFailure(e.into_kind()))?;
    let (key, algorithm) = keystore
        .resolve(header.kid.as_deref())
        .map_err(AuthJwtError::KeystoreFailure)?;
    let mut validation = JwtValidation::new(algorithm);
    validation.set_audience(keystore.audience());
    let decoded = jwt_decode::<AppAuthedClaim>(token, &key, &validation)
        .map_err(|e| AuthJwtError::VerifyFailure(e.into_kind()))?;
    Ok(decoded.claims)
}

// middleware entry wired with `actix-web-httpauth`, the verified claim
// is parked in request extensions for extractors downstream
pub async fn validate_jwt(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (ActixError, ServiceRequest)> {
    let maybe_keystore = req
        .app_data::<WebData<AppSharedState>>()
        .map(|shr_state| shr_state.auth_keystore());
    let keystore = match maybe_keystore {
        Some(v) => v,
        None => {
            return Err((AuthJwtError::MissingKeystore.into(), req));
        }
    };
    match _verify_token(keystore, credentials.token()) {
        Ok(claim) => {
            let _discarded = req.extensions_mut().insert(claim);
            Ok(req)
        }
        Err(e) => Err((e.into(), req)),
    }
}

impl FromRequest for AppAuthedClaim {
    type Error = ActixError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;
    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = if let Some(v) = req.extensions_mut().remove::<Self>() {
            Ok(v)
        } else {
            Err(AuthJwtError::MissingAuthedClaim.into())
        };
        Box::pin(async move { result })
    }
}
