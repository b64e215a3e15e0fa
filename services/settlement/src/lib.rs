pub mod adapter;
pub mod api;
pub mod auth;
pub mod model;
pub mod network;
pub mod usecase;

use std::result::Result;
use std::sync::Arc;

use carshare_common::confidentiality::{self, AbstractConfidentiality};
use carshare_common::config::AppConfig;
use carshare_common::error::AppConfidentialityError;
use carshare_common::logging::AppLogContext;

use crate::adapter::datastore::{AppDStoreError, AppDataStoreContext};
use crate::adapter::event::{self, AbstractEventStreamCtx, AppEventPublishError};
use crate::adapter::processor::{
    app_processor_context, AbstractPaymentProcessor, AppProcessorError,
};
use crate::auth::{AbstractAuthKeystore, AppAuthKeystore, AuthKeystoreError};

pub mod app_meta {
    pub const LABAL: &str = "settlement";
    pub const RESOURCE_QUOTA_AP_CODE: u8 = 6;
}

pub mod hard_limit {
    pub const MAX_DB_CONNECTIONS: u32 = 1800u32;
    pub const MAX_SECONDS_DB_IDLE: u16 = 360u16;
}

pub struct AppSharedState {
    _config: Arc<AppConfig>,
    _log_ctx: Arc<AppLogContext>,
    _cfdntl: Arc<Box<dyn AbstractConfidentiality>>,
    _dstore: Arc<AppDataStoreContext>,
    _processors: Arc<Box<dyn AbstractPaymentProcessor>>,
    _evtstream: Arc<Box<dyn AbstractEventStreamCtx>>,
    _auth_keys: Arc<Box<dyn AbstractAuthKeystore>>,
}

#[derive(Debug)]
pub enum ShrStateInitProgress {
    Confidentiality,
    DataStore,
    EventStream,
    ExternalProcessor,
    AuthKeystore,
}

#[derive(Debug)]
pub struct ShrStateInitError {
    pub progress: ShrStateInitProgress,
}

impl From<AppConfidentialityError> for ShrStateInitError {
    fn from(_value: AppConfidentialityError) -> Self {
        Self {
            progress: ShrStateInitProgress::Confidentiality,
        }
    }
}
impl From<AppDStoreError> for ShrStateInitError {
    fn from(_value: AppDStoreError) -> Self {
        Self {
            progress: ShrStateInitProgress::DataStore,
        }
    }
}
impl From<AppEventPublishError> for ShrStateInitError {
    fn from(_value: AppEventPublishError) -> Self {
        Self {
            progress: ShrStateInitProgress::EventStream,
        }
    }
}
impl From<AppProcessorError> for ShrStateInitError {
    fn from(_value: AppProcessorError) -> Self {
        Self {
            progress: ShrStateInitProgress::ExternalProcessor,
        }
    }
}
impl From<AuthKeystoreError> for ShrStateInitError {
    fn from(_value: AuthKeystoreError) -> Self {
        Self {
            progress: ShrStateInitProgress::AuthKeystore,
        }
    }
}

impl AppSharedState {
    pub fn new(cfg: AppConfig) -> Result<Self, ShrStateInitError> {
        let logctx = {
            let lc = AppLogContext::new(&cfg.basepath, &cfg.api_server.logging);
            Arc::new(lc)
        };
        let _cfdntl = {
            let c = confidentiality::build_context(&cfg)?;
            Arc::new(c)
        };
        let _dstore = {
            let d = AppDataStoreContext::new(
                &cfg.api_server.data_store,
                _cfdntl.clone(),
                logctx.clone(),
            )?;
            Arc::new(d)
        };
        let _evtstream = {
            let es = event::build_context(
                &cfg.api_server.event_stream,
                _cfdntl.clone(),
                logctx.clone(),
            )?;
            Arc::new(es)
        };
        let _processors = {
            let proc = app_processor_context(
                &cfg.api_server.third_parties,
                _cfdntl.clone(),
                logctx.clone(),
            )?;
            Arc::new(proc)
        };
        let _auth_keys = {
            let ks = AppAuthKeystore::try_build(&cfg.api_server.auth, _cfdntl.clone())?;
            let obj: Box<dyn AbstractAuthKeystore> = Box::new(ks);
            Arc::new(obj)
        };
        Ok(Self {
            _config: Arc::new(cfg),
            _log_ctx: logctx,
            _cfdntl,
            _dstore,
            _evtstream,
            _processors,
            _auth_keys,
        })
    } // end of fn new

    pub fn datastore(&self) -> Arc<AppDataStoreContext> {
        self._dstore.clone()
    }
    pub fn processor_context(&self) -> Arc<Box<dyn AbstractPaymentProcessor>> {
        self._processors.clone()
    }
    pub fn eventstream(&self) -> Arc<Box<dyn AbstractEventStreamCtx>> {
        self._evtstream.clone()
    }
    pub fn auth_keystore(&self) -> Arc<Box<dyn AbstractAuthKeystore>> {
        self._auth_keys.clone()
    }
    pub fn log_context(&self) -> Arc<AppLogContext> {
        self._log_ctx.clone()
    }
    pub fn config(&self) -> Arc<AppConfig> {
        self._config.clone()
    }
} // end of impl AppSharedState

impl Clone for AppSharedState {
    fn clone(&self) -> Self {
        Self {
            _config: self._config.clone(),
            _log_ctx: self._log_ctx.clone(),
            _cfdntl: self._cfdntl.clone(),
            _dstore: self._dstore.clone(),
            _evtstream: self._evtstream.clone(),
            _processors: self._processors.clone(),
            _auth_keys: self._auth_keys.clone(),
        }
    }
}
