use std::boxed::Box;
use std::result::Result;

use chrono::{DateTime, Utc};

use crate::adapter::repository::{AbstractRefundRepo, AppRepoError};
use crate::api::web::dto::{
    RefundRequestDto, RefundRequestRespDto, RefundReviewDecisionDto, RefundReviewReqDto,
};
use crate::auth::{AppAuthPermissionCode, AppAuthedClaim};
use crate::model::{RefundModelError, RefundRequestModel};

pub enum RefundReviewUcError {
    PermissionDenied(u32),
    MissingRequest(u32, DateTime<Utc>),
    MissingLedger(u32),
    Precondition(RefundModelError),
    DataStore(AppRepoError),
}

pub struct CreateRefundReqUseCase {
    pub repo: Box<dyn AbstractRefundRepo>,
}

impl CreateRefundReqUseCase {
    pub async fn execute(
        self,
        booking_id: u32,
        authed_claim: AppAuthedClaim,
        requester_role: String,
        req: RefundRequestDto,
    ) -> Result<RefundRequestRespDto, RefundReviewUcError> {
        if !authed_claim.contains_permission(AppAuthPermissionCode::can_create_refund_req) {
            return Err(RefundReviewUcError::PermissionDenied(authed_claim.profile));
        }
        let ledger = self
            .repo
            .fetch_ledger(booking_id)
            .await
            .map_err(RefundReviewUcError::DataStore)?
            .ok_or(RefundReviewUcError::MissingLedger(booking_id))?;
        ledger
            .charge_ref()
            .map_err(RefundReviewUcError::Precondition)?;
        let arg = (
            booking_id,
            req,
            ledger.currency().clone(),
            authed_claim.profile,
            requester_role,
        );
        let m = RefundRequestModel::try_from(arg).map_err(RefundReviewUcError::Precondition)?;
        // over-asking is refused up front, even though the same invariant
        // is enforced again right before processing
        ledger
            .ensure_refundable(m.amount_requested())
            .map_err(RefundReviewUcError::Precondition)?;
        self.repo
            .create_request(&m)
            .await
            .map_err(RefundReviewUcError::DataStore)?;
        Ok(RefundRequestRespDto::from(&m))
    } // end of fn execute
} // end of impl CreateRefundReqUseCase

pub struct ReviewRefundUseCase {
    pub repo: Box<dyn AbstractRefundRepo>,
}

impl ReviewRefundUseCase {
    pub async fn execute(
        self,
        booking_id: u32,
        req_time: DateTime<Utc>,
        authed_claim: AppAuthedClaim,
        req: RefundReviewReqDto,
    ) -> Result<RefundRequestRespDto, RefundReviewUcError> {
        if !authed_claim.contains_permission(AppAuthPermissionCode::can_review_refund) {
            return Err(RefundReviewUcError::PermissionDenied(authed_claim.profile));
        }
        let mut m = self
            .repo
            .fetch_request(booking_id, req_time)
            .await
            .map_err(RefundReviewUcError::DataStore)?
            .ok_or(RefundReviewUcError::MissingRequest(booking_id, req_time))?;
        let reviewer_id = authed_claim.profile;
        match req.decision {
            RefundReviewDecisionDto::Approve => m
                .approve(reviewer_id, req.notes)
                .map_err(RefundReviewUcError::Precondition)?,
            RefundReviewDecisionDto::Reject => m
                .reject(reviewer_id, req.notes)
                .map_err(RefundReviewUcError::Precondition)?,
        }
        self.repo
            .update_review(&m)
            .await
            .map_err(RefundReviewUcError::DataStore)?;
        Ok(RefundRequestRespDto::from(&m))
    } // end of fn execute
} // end of impl ReviewRefundUseCase
