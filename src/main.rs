mod app;
mod draw;
mod state;

use crate::app::App;
use scorecast::app_settings::AppSettings;
use crate::state::messages::{NetworkRequest, NetworkResponse};
use crate::state::network::NetworkWorker;
use crate::state::refresher::PeriodicRefresher;
use crate::state::tracker::LiveTracker;
use espn_feed::{EspnClient, FreshnessCache, LiveResource, Poller};
use log::{info, warn};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if handle_cli_args() {
        return Ok(());
    }

    better_panic::install();

    let settings = AppSettings::load();
    env_logger::Builder::new()
        .filter_level(settings.log_level)
        .parse_env("RUST_LOG")
        .init();
    for warning in &settings.warnings {
        warn!("{warning}");
    }

    let cache = FreshnessCache::new(EspnClient::with_timeout(settings.timeout));
    let scoreboard = settings.scoreboard();
    let scoreboard = LiveResource::new(
        "scoreboard",
        scoreboard.url(settings.league),
        scoreboard.default_ttl(),
    );

    let (network_req_tx, network_req_rx) = mpsc::channel::<NetworkRequest>(100);
    let (network_resp_tx, network_resp_rx) = mpsc::channel::<NetworkResponse>(100);

    // Network thread
    let network_worker =
        NetworkWorker::new(cache.clone(), scoreboard, network_req_rx, network_resp_tx.clone());
    let network_task = tokio::spawn(network_worker.run());

    // Periodic scoreboard pass
    let periodic_updater = PeriodicRefresher::new(network_req_tx.clone(), settings.scoreboard_every);
    let periodic_task = tokio::spawn(periodic_updater.run());

    let tracker = LiveTracker::new(Poller::new(cache), &settings, network_resp_tx);

    info!(
        "tracking {} live games, scoreboard every {:?}",
        settings.league.label(),
        settings.scoreboard_every
    );
    let _ = network_req_tx.send(NetworkRequest::ReloadScoreboard).await;

    let mut app = App::new(settings);
    main_loop(&mut app, &tracker, network_resp_rx).await;

    tracker.shutdown();
    network_task.abort();
    periodic_task.abort();

    Ok(())
}

fn handle_cli_args() -> bool {
    let mut args = std::env::args().skip(1);
    let Some(arg) = args.next() else {
        return false;
    };

    match arg.as_str() {
        "-h" | "--help" => {
            println!("{}", usage_text());
            true
        }
        "-V" | "--version" => {
            println!("scorecast {}", env!("CARGO_PKG_VERSION"));
            true
        }
        _ => {
            eprintln!("Unknown argument: {arg}\n\n{}", usage_text());
            std::process::exit(2);
        }
    }
}

fn usage_text() -> &'static str {
    "scorecast - live football scores from ESPN, one line per update

Usage:
  scorecast
  scorecast --help
  scorecast --version

Environment:
  SCORECAST_LEAGUE            nfl | college-football (default nfl)
  SCORECAST_WEEK              Scoreboard week (default: current)
  SCORECAST_SCOREBOARD_SECS   Scoreboard refresh cadence (default 60)
  SCORECAST_POLL_BASE_SECS    Live poll interval with few games live (default 15)
  SCORECAST_TIMEOUT_SECS      Upstream request timeout (default 10)
  SCORECAST_SUSPENDED_GAMES   Comma separated event ids never polled
  SCORECAST_LOG               Log level (default info; RUST_LOG overrides)"
}

async fn main_loop(
    app: &mut App,
    tracker: &LiveTracker,
    mut network_responses: mpsc::Receiver<NetworkResponse>,
) {
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(response) = network_responses.recv() => {
                handle_network_response(response, app, tracker);
            }
            _ = &mut shutdown => {
                info!("shutting down");
                break;
            }
        }
    }
}

fn handle_network_response(response: NetworkResponse, app: &mut App, tracker: &LiveTracker) {
    match response {
        NetworkResponse::ScoreboardLoaded { games, stale } => {
            tracker.sync(&games);
            app.on_scoreboard_loaded(games, stale);
            draw::draw_board(app, tracker.tracked().len());
        }
        NetworkResponse::GameUpdated { game_id, update } => {
            if let Some(line) = app.on_game_updated(&game_id, update) {
                draw::draw_line(line);
            }
        }
        NetworkResponse::Error { message } => {
            app.on_error(message);
        }
    }
}
