mod amqp;
mod mock;

use std::boxed::Box;
use std::marker::{Send, Sync};
use std::result::Result;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use carshare_common::confidentiality::AbstractConfidentiality;
use carshare_common::config::AppEventStreamCfg;
use carshare_common::logging::AppLogContext;

use amqp::AppAmqpEventStreamCtx;
pub use mock::MockEventStreamCtx;

pub enum AppEventFnLabel {
    InitCtx,
    AcquireChannel,
    Publish,
}
pub enum AppEventErrorReason {
    NotSupport,
    InvalidCredential,
    CorruptedCredential,
    SysIo(std::io::ErrorKind, String),
    LowLevelConn(String),
    InvalidRoute(String),
    InternalConfig(String),
    CorruptedPayload(String),
    PublishConfirm(String),
}
pub struct AppEventPublishError {
    pub fn_label: AppEventFnLabel,
    pub reason: AppEventErrorReason,
}

const EVENT_SCHEMA_VERSION: u8 = 1;

/// closed, versioned record set for every event kind this service emits,
/// consumers never receive free-form payloads
#[derive(Serialize)]
#[serde(tag = "kind")]
pub enum AppSettlementEvent {
    TripSettled {
        schema_ver: u8,
        booking_id: u32,
        total: String,
        payment_status: String,
        time: DateTime<Utc>,
    },
    ChargesResolved {
        schema_ver: u8,
        booking_id: u32,
        action: String,
        remaining: String,
        staff_id: u32,
        time: DateTime<Utc>,
    },
    RefundProcessed {
        schema_ver: u8,
        booking_id: u32,
        amount: String,
        refund_txn_id: String,
        reversal_txn_id: Option<String>,
        time: DateTime<Utc>,
    },
}

impl AppSettlementEvent {
    pub fn schema_version() -> u8 {
        EVENT_SCHEMA_VERSION
    }
    pub(crate) fn route(&self) -> &'static str {
        match self {
            Self::TripSettled { .. } => "settlement.trip",
            Self::ChargesResolved { .. } => "settlement.resolution",
            Self::RefundProcessed { .. } => "settlement.refund",
        }
    }
}

// Events are fire-and-forget side channels, a publish failure must be
// logged by the caller and never rolls back nor blocks the settlement
// transaction which already committed.
#[async_trait]
pub trait AbstractEventStreamCtx: Send + Sync {
    async fn publish(&self, evt: AppSettlementEvent) -> Result<(), AppEventPublishError>;
}

pub(crate) fn build_context(
    cfg: &AppEventStreamCfg,
    cfdntl: Arc<Box<dyn AbstractConfidentiality>>,
    logctx: Arc<AppLogContext>,
) -> Result<Box<dyn AbstractEventStreamCtx>, AppEventPublishError> {
    match cfg {
        AppEventStreamCfg::AMQP(c) => {
            let obj = AppAmqpEventStreamCtx::try_build(c, cfdntl, logctx)?;
            Ok(Box::new(obj))
        }
        AppEventStreamCfg::dummy => {
            let obj = MockEventStreamCtx::build(logctx);
            Ok(obj)
        }
    }
}
