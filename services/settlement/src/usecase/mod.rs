mod process_refund;
mod retry_charge;
mod review_refund;
mod settle_trip;
mod staff_resolve;

use chrono::{DateTime, Utc};

use carshare_common::error::AppErrorCode;
use carshare_common::util::hex_to_octet;

use crate::model::ChargeToken;

pub use process_refund::{ProcessRefundUcError, ProcessRefundUseCase};
pub use retry_charge::{RetryChargeUcError, RetryChargeUseCase};
pub use review_refund::{CreateRefundReqUseCase, RefundReviewUcError, ReviewRefundUseCase};
pub use settle_trip::{SettleTripUcError, SettleTripUseCase};
pub use staff_resolve::{StaffResolveUcError, StaffResolveUseCase};

// refund requests are addressed by the same hex token scheme as charge
// attempts, booking id and creation time packed together
pub fn try_parse_request_token(
    serial: &str,
) -> Result<(u32, DateTime<Utc>, u8), (AppErrorCode, String)> {
    let octets = hex_to_octet(serial)?;
    let token = ChargeToken::try_from(octets)?;
    token
        .decode()
        .map_err(|e| (AppErrorCode::InvalidInput, format!("{:?}", e)))
}
