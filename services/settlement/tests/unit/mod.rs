mod model;
mod usecase;

use std::sync::Arc;

use carshare_common::config::{AppBasepathCfg, AppLogHandlerCfg, AppLoggerCfg, AppLoggingCfg};
use carshare_common::constant::logging::{Destination, Level};
use carshare_common::logging::AppLogContext;

use settlement::app_meta;
use settlement::auth::{AppAuthClaimPermission, AppAuthPermissionCode, AppAuthedClaim};

pub(crate) fn ut_setup_logctx() -> Arc<AppLogContext> {
    let basepath = AppBasepathCfg {
        system: "/tmp".to_string(),
        service: "/tmp".to_string(),
    };
    let cfg = AppLoggingCfg {
        handlers: vec![AppLogHandlerCfg {
            min_level: Level::WARNING,
            destination: Destination::CONSOLE,
            alias: Arc::new("console-ut".to_string()),
            path: None,
        }],
        loggers: Vec::new(),
    };
    Arc::new(AppLogContext::new(&basepath, &cfg))
}

pub(crate) fn ut_setup_auth_claim(
    usr_id: u32,
    codenames: Vec<AppAuthPermissionCode>,
) -> AppAuthedClaim {
    let perms = codenames
        .into_iter()
        .map(|codename| AppAuthClaimPermission {
            app_code: app_meta::RESOURCE_QUOTA_AP_CODE,
            codename,
        })
        .collect::<Vec<_>>();
    AppAuthedClaim {
        profile: usr_id,
        iat: 1704800000i64,
        exp: 1704800000i64 + 3600,
        aud: vec![app_meta::LABAL.to_string()],
        perms,
        quota: Vec::new(),
    }
}
