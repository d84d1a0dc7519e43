use espn_feed::EspnClient;
use espn_feed::relay::{self, RelayConfig};
use log::{info, warn};
use scorecast::app_settings::AppSettings;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    better_panic::install();

    let settings = AppSettings::load();
    env_logger::Builder::new()
        .filter_level(settings.log_level)
        .parse_env("RUST_LOG")
        .init();
    for warning in &settings.warnings {
        warn!("{warning}");
    }
    if let Some(origin) = &settings.relay_origin {
        warn!("relaying to {origin} instead of ESPN");
    }

    let app = relay::router(
        EspnClient::with_timeout(settings.timeout),
        RelayConfig { league: settings.league, origin_override: settings.relay_origin },
    );
    let listener = TcpListener::bind(settings.relay_bind).await?;
    info!("espn relay listening on {}", settings.relay_bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("relay shutting down");
        })
        .await?;

    Ok(())
}
