use coverage::{
    listener::ListenerRef,
    server::{PipelineConfig, Server},
};
use device::DeviceConfig;
use storage::StorageConfig;
use web::{start_web_server, WebConfig, WebState};

#[tokio::main]
async fn main() {
    env_logger::init();

    // store and pipeline
    let storage = StorageConfig::from_env().open();
    log::info!("keeping points in {}", storage.path().display());
    let server = Server::start(storage, PipelineConfig::from_env()).await;

    // device
    let listener = match DeviceConfig::from_env() {
        Some(config) => server.listener(config.listener()),
        None => {
            log::warn!("DEVICE_ADDRESS is not set, running without a device");
            ListenerRef::idle()
        }
    };

    // ctrl-c
    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("shutting down");
                shutdown.cancel();
            }
            Err(why) => log::error!("could not listen for ctrl-c: {}", why),
        }
    });

    // web server
    let config = WebConfig::from_env();
    let state = WebState::new(&server, listener, config.send_timeout);
    if let Err(why) = start_web_server(state, &config, server.shutdown_token()).await {
        log::error!("web server failed: {}", why);
    }

    server.shutdown().await;
}
