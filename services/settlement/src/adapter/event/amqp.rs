use std::boxed::Box;
use std::result::Result;
use std::sync::Arc;

use deadpool_lapin::{Config as DeadpConfig, Pool, PoolConfig, Runtime, Timeouts as DeadpTimeouts};
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions};
use lapin::protocol::basic::AMQPProperties;
use lapin::publisher_confirm::Confirmation;
use lapin::types::FieldTable;
use lapin::{Channel, Error as LapinError, ExchangeKind};
use serde::Deserialize;

use carshare_common::confidentiality::AbstractConfidentiality;
use carshare_common::config::{AppAmqpBindingCfg, AppAmqpCfg};
use carshare_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::app_meta;

use super::{
    AbstractEventStreamCtx, AppEventErrorReason, AppEventFnLabel, AppEventPublishError,
    AppSettlementEvent,
};

#[allow(clippy::upper_case_acronyms)]
#[derive(Deserialize)]
struct SECRET {
    host: String,
    port: u16,
    username: String,
    password: String,
}

pub(super) struct AppAmqpEventStreamCtx {
    _logctx: Arc<AppLogContext>,
    _pool: Pool,
    _binding_cfg: Arc<Vec<AppAmqpBindingCfg>>,
}

impl From<LapinError> for AppEventErrorReason {
    fn from(value: LapinError) -> Self {
        match value {
            LapinError::IOError(ioe) => Self::SysIo(ioe.kind(), ioe.to_string()),
            LapinError::ParsingError(e) => Self::CorruptedPayload(e.to_string()),
            LapinError::SerialisationError(e) => Self::CorruptedPayload(e.to_string()),
            LapinError::ChannelsLimitReached => Self::InternalConfig("channel-limit".to_string()),
            LapinError::InvalidChannel(num) => {
                Self::InternalConfig(format!("invalid-channel: {num}"))
            }
            LapinError::InvalidConnectionState(state) => {
                Self::LowLevelConn(format!("conn-state: {:?}", state))
            }
            LapinError::InvalidChannelState(state) => {
                Self::LowLevelConn(format!("channel-state: {:?}", state))
            }
            LapinError::ProtocolError(e) => Self::LowLevelConn(e.to_string()),
            LapinError::MissingHeartbeatError => {
                Self::LowLevelConn("amqp-no-heartbeat".to_string())
            }
            LapinError::InvalidProtocolVersion(ver) => {
                Self::LowLevelConn(format!("amqp-version: {ver}"))
            }
            _ => Self::NotSupport,
        }
    }
} // end of impl AppEventErrorReason

impl AppAmqpEventStreamCtx {
    pub(super) fn try_build(
        cfg: &AppAmqpCfg,
        cfdntl: Arc<Box<dyn AbstractConfidentiality>>,
        logctx: Arc<AppLogContext>,
    ) -> Result<Self, AppEventPublishError> {
        let secret = {
            let serial = cfdntl
                .try_get_payload(cfg.confidential_path.as_str())
                .map_err(|_e| Self::_map_err_init(AppEventErrorReason::InvalidCredential))?;
            serde_json::from_str::<SECRET>(serial.as_str())
                .map_err(|_e| Self::_map_err_init(AppEventErrorReason::CorruptedCredential))?
        };
        let url = format!(
            "amqp://{}:{}@{}:{}/{}",
            secret.username, secret.password, secret.host, secret.port, cfg.attributes.vhost,
        );
        let timeout_secs = std::time::Duration::new(cfg.attributes.timeout_secs as u64, 0);
        let pool_cfg = PoolConfig {
            max_size: cfg.attributes.max_channels as usize,
            timeouts: DeadpTimeouts {
                wait: Some(timeout_secs),
                create: Some(timeout_secs),
                recycle: None,
            },
            ..Default::default()
        };
        let d_cfg = DeadpConfig {
            url: Some(url),
            pool: Some(pool_cfg),
            ..Default::default()
        };
        let _pool = d_cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Self::_map_err_init(AppEventErrorReason::InternalConfig(e.to_string())))?;
        Ok(Self {
            _logctx: logctx,
            _pool,
            _binding_cfg: cfg.bindings.clone(),
        })
    } // end of fn try-build

    fn _map_err_init(reason: AppEventErrorReason) -> AppEventPublishError {
        AppEventPublishError {
            fn_label: AppEventFnLabel::InitCtx,
            reason,
        }
    }
    fn _map_err_publish(reason: AppEventErrorReason) -> AppEventPublishError {
        AppEventPublishError {
            fn_label: AppEventFnLabel::Publish,
            reason,
        }
    }

    fn try_get_binding<'a>(
        src: &'a [AppAmqpBindingCfg],
        given_route: &str,
    ) -> Result<&'a AppAmqpBindingCfg, AppEventPublishError> {
        src.iter()
            .find(|c| c.routing_key.as_str() == given_route)
            .ok_or(Self::_map_err_publish(AppEventErrorReason::InvalidRoute(
                given_route.to_string(),
            )))
    }

    async fn _acquire_channel(&self) -> Result<Channel, AppEventPublishError> {
        let conn = self._pool.get().await.map_err(|e| AppEventPublishError {
            fn_label: AppEventFnLabel::AcquireChannel,
            reason: AppEventErrorReason::LowLevelConn(e.to_string()),
        })?;
        let chn = conn.create_channel().await.map_err(|e| AppEventPublishError {
            fn_label: AppEventFnLabel::AcquireChannel,
            reason: e.into(),
        })?;
        chn.confirm_select(ConfirmSelectOptions { nowait: false })
            .await // do confirm every time when the channel is open
            .map_err(|e| AppEventPublishError {
                fn_label: AppEventFnLabel::AcquireChannel,
                reason: e.into(),
            })?;
        Ok(chn)
    }

    fn convert_confirm_to_error(value: Confirmation) -> Result<(), AppEventErrorReason> {
        let detail = match value {
            Confirmation::NotRequested => {
                // implicitly mean `confirm-select` does not take effect
                Some("amqp-confirm-failure".to_string())
            }
            Confirmation::Nack(_msg) => Some("amqp-unexpected-nack".to_string()),
            Confirmation::Ack(msg) => msg.map(|r| {
                format!(
                    "acker: {:?}, reply-code: {:?}, reply-detail: {:?}",
                    r.acker, r.reply_code, r.reply_text
                )
            }),
        };
        detail.map_or_else(|| Ok(()), |d| Err(AppEventErrorReason::PublishConfirm(d)))
    }
} // end of impl AppAmqpEventStreamCtx

#[async_trait::async_trait]
impl AbstractEventStreamCtx for AppAmqpEventStreamCtx {
    async fn publish(&self, evt: AppSettlementEvent) -> Result<(), AppEventPublishError> {
        let _logctx = &self._logctx;
        let route = evt.route();
        let bind_cfg = Self::try_get_binding(self._binding_cfg.as_ref(), route)?;
        let payload = serde_json::to_vec(&evt)
            .map_err(|e| Self::_map_err_publish(AppEventErrorReason::CorruptedPayload(e.to_string())))?;
        let _chn = self._acquire_channel().await?;
        if bind_cfg.ensure_declare {
            let options = ExchangeDeclareOptions {
                durable: bind_cfg.durable,
                ..Default::default()
            };
            _chn.exchange_declare(
                bind_cfg.exchange.as_str(),
                ExchangeKind::Topic,
                options,
                FieldTable::default(),
            )
            .await
            .map_err(|e| Self::_map_err_publish(e.into()))?;
        }
        let now = chrono::Utc::now();
        let properties = AMQPProperties::default()
            .with_app_id(app_meta::LABAL.into())
            .with_content_encoding("utf-8".into())
            .with_content_type("application/json".into())
            .with_delivery_mode(if bind_cfg.durable { 2 } else { 1 })
            .with_timestamp(now.timestamp() as u64);
        // To create a responsive application, the message broker has to
        // return unroutable messages whenever the given routing key goes
        // wrong.
        let confirm = _chn
            .basic_publish(
                bind_cfg.exchange.as_str(),
                bind_cfg.routing_key.as_str(),
                BasicPublishOptions {
                    mandatory: true,
                    immediate: false,
                },
                &payload,
                properties,
            )
            .await
            .map_err(|e| Self::_map_err_publish(e.into()))?
            .await
            .map_err(|e| Self::_map_err_publish(e.into()))?;
        app_log_event!(_logctx, AppLogLevel::DEBUG, "publish-confirm: {:?}", confirm);
        Self::convert_confirm_to_error(confirm).map_err(Self::_map_err_publish)
    } // end of fn publish
} // end of impl AppAmqpEventStreamCtx
