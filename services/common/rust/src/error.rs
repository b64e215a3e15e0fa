use std::fmt::Debug;

#[derive(Debug, Clone, PartialEq)]
pub enum AppErrorCode {
    Unknown,
    NotImplemented,
    MissingSysBasePath,
    MissingAppBasePath,
    MissingSecretPath,
    MissingConfigPath,
    MissingDataStore,
    InvalidJsonFormat,
    InvalidVersion,
    InvalidRouteConfig,
    MissingAliasLogHdlerCfg,
    MissingAliasLoggerCfg,
    NoRouteApiServerCfg,
    NoLogHandlerCfg,
    NoLoggerCfg,
    NoHandlerInLoggerCfg,
    InvalidHandlerLoggerCfg,
    EmptyInputData, // for internal server error, do NOT dump detail to http response
    InvalidInput,   // for frontend client error
    CryptoFailure,
    EventPublishFailure,
    NoConfidentialityCfg,
    NoDatabaseCfg,
    RemoteDbServerFailure,
    ExceedingMaxLimit,
    DatabaseServerBusy,
    DataTableNotExist,
    DataCorruption,
    IOerror(std::io::ErrorKind),
} // end of AppErrorCode

#[derive(Debug)]
pub struct AppCfgError {
    pub code: AppErrorCode,
    pub detail: Option<String>,
}

#[derive(Debug)]
pub struct AppConfidentialityError {
    pub code: AppErrorCode,
    pub detail: String,
}
