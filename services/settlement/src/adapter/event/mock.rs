use std::boxed::Box;
use std::result::Result;
use std::sync::Arc;

use async_trait::async_trait;

use carshare_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use super::{AbstractEventStreamCtx, AppEventPublishError, AppSettlementEvent};

// stand-in for environments without a message broker, events are dumped
// to the log stream only
pub struct MockEventStreamCtx {
    _logctx: Arc<AppLogContext>,
}

impl MockEventStreamCtx {
    pub fn build(logctx: Arc<AppLogContext>) -> Box<dyn AbstractEventStreamCtx> {
        Box::new(Self { _logctx: logctx })
    }
}

#[async_trait]
impl AbstractEventStreamCtx for MockEventStreamCtx {
    async fn publish(&self, evt: AppSettlementEvent) -> Result<(), AppEventPublishError> {
        let _logctx = &self._logctx;
        let serial = serde_json::to_string(&evt).unwrap_or("corrupted-event".to_string());
        app_log_event!(_logctx, AppLogLevel::INFO, "event-discarded: {serial}");
        Ok(())
    }
}
