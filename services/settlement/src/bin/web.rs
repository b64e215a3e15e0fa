use std::collections::HashMap;
use std::env;

use actix_web::rt;
use actix_web::web::Data as WebData;

use carshare_common::config::{AppCfgHardLimit, AppCfgInitArgs, AppConfig};
use carshare_common::constant::env_vars::EXPECTED_LABELS;

use settlement::api::web::AppRouteTable;
use settlement::network::{app_web_service, net_server_listener};
use settlement::{hard_limit, AppSharedState};

fn main() {
    let cfg = {
        let iter = env::vars().filter(|(k, _v)| EXPECTED_LABELS.contains(&k.as_str()));
        let env_var_map = HashMap::from_iter(iter);
        let limit = AppCfgHardLimit {
            num_db_conns: hard_limit::MAX_DB_CONNECTIONS,
            seconds_db_idle: hard_limit::MAX_SECONDS_DB_IDLE,
        };
        let args = AppCfgInitArgs { env_var_map, limit };
        AppConfig::new(args).expect("app-config-load-failure")
    };
    let listen_cfg = &cfg.api_server.listen;
    let (host, port) = (listen_cfg.host.clone(), listen_cfg.port);
    let api_version = listen_cfg.api_version.clone();
    let num_workers = cfg.api_server.num_workers as usize;
    let cfg_routes = listen_cfg
        .routes
        .iter()
        .map(|r| (r.path.clone(), r.handler.clone()))
        .collect::<Vec<_>>();

    let shr_state = AppSharedState::new(cfg).expect("shared-state-init-failure");
    /*
     * `App` instance is created on each server worker thread. To share
     * the same data between all `App` instances, initialize the data
     * outside the factory closure in `HttpServer::new(F)`, clone the
     * data you need to move into the closure, by doing so, the function
     * variable is automatically treated as `Fn()` type instead of
     * `FnOnce()` type.
     *
     * https://docs.rs/actix-web/latest/actix_web/struct.App.html#shared-mutable-state
     * */
    let app_init = move || {
        let route_table = AppRouteTable::get(api_version.as_str());
        let (app, num_applied) = app_web_service(route_table, cfg_routes.clone());
        if num_applied == 0 {
            // TODO, logging error, actix-web does not consider to handle
            // error returned from this callback
        }
        app.app_data(WebData::new(shr_state.clone()))
    };
    let ht_srv = net_server_listener(app_init, host.as_str(), port).workers(num_workers);
    let runner = rt::System::new();
    let _result = runner.block_on(ht_srv.run());
}
