pub mod dto;
mod refund;
mod resolution;
mod settlement;

use std::collections::HashMap;

use actix_http::Method;
use actix_web::Route;

use self::refund::{create_refund_request, process_refund_request, review_refund_request};
use self::resolution::{adjust_trip_charges, waive_trip_charges};
use self::settlement::{refresh_settlement_status, retry_trip_charge, settle_trip};

pub struct AppRouteTable {
    pub version: String,
    pub entries: HashMap<String, Route>,
} // note, figure out how do multiple versions of API endpoints co-exist

impl AppRouteTable {
    pub fn get(ver_req: &str) -> Self {
        let (version, entries) = match ver_req {
            "0.1.0" => (format!("v{ver_req}"), Self::v0_1_0_entries()),
            _others => (String::new(), HashMap::new()),
        };
        Self { version, entries }
    }
    fn v0_1_0_entries() -> HashMap<String, Route> {
        let data = [
            (
                "settle_trip".to_string(),
                Route::new().method(Method::POST).to(settle_trip),
            ),
            (
                "retry_trip_charge".to_string(),
                Route::new().method(Method::POST).to(retry_trip_charge),
            ),
            (
                "refresh_settlement_status".to_string(),
                Route::new()
                    .method(Method::GET)
                    .to(refresh_settlement_status),
            ),
            (
                "waive_trip_charges".to_string(),
                Route::new().method(Method::PATCH).to(waive_trip_charges),
            ),
            (
                "adjust_trip_charges".to_string(),
                Route::new().method(Method::PATCH).to(adjust_trip_charges),
            ),
            (
                "create_refund_request".to_string(),
                Route::new().method(Method::POST).to(create_refund_request),
            ),
            (
                "review_refund_request".to_string(),
                Route::new().method(Method::PATCH).to(review_refund_request),
            ),
            (
                "process_refund_request".to_string(),
                Route::new()
                    .method(Method::POST)
                    .to(process_refund_request),
            ),
        ];
        HashMap::from(data)
    }
} // end of impl AppRouteTable
