//! HTTP relay for ESPN endpoints that browsers cannot call directly.
//!
//! Each route takes one id query parameter, performs a single upstream GET
//! and forwards the status and JSON body.

use crate::client::{EspnClient, FetchError};
use crate::espn::{League, Resource};
use axum::extract::Query;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::{debug, warn};
use serde_json::{Value, json};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct RelayRoute {
    pub path: &'static str,
    pub param: &'static str,
    pub missing_message: &'static str,
    upstream: fn(String) -> Resource,
}

pub const BOXSCORE: RelayRoute = RelayRoute {
    path: "/api/espn-boxscore",
    param: "event",
    missing_message: "No event id",
    upstream: |event_id| Resource::Boxscore { event_id },
};

pub const BOXSCORE_CDN: RelayRoute = RelayRoute {
    path: "/api/espn-boxscore-cdn",
    param: "gameId",
    missing_message: "Missing gameId",
    upstream: |game_id| Resource::BoxscoreCdn { game_id },
};

#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    pub league: League,
    /// Replaces scheme and host of every upstream URL. Used to point the
    /// relay at a mirror or a local test server.
    pub origin_override: Option<String>,
}

impl RelayConfig {
    fn upstream_url(&self, route: &RelayRoute, id: String) -> String {
        let url = (route.upstream)(id).url(self.league);
        match &self.origin_override {
            Some(origin) => rebase(&url, origin),
            None => url,
        }
    }
}

pub fn router(client: EspnClient, config: RelayConfig) -> Router {
    [BOXSCORE, BOXSCORE_CDN]
        .into_iter()
        .fold(Router::new(), |router, route| {
            let client = client.clone();
            let config = config.clone();
            router.route(
                route.path,
                get(move |Query(params): Query<HashMap<String, String>>| async move {
                    relay(&client, &config, &route, &params).await
                }),
            )
        })
        .route("/healthz", get(|| async { "ok" }))
}

async fn relay(
    client: &EspnClient,
    config: &RelayConfig,
    route: &RelayRoute,
    params: &HashMap<String, String>,
) -> Response {
    let Some(id) = params.get(route.param).map(|s| s.trim()).filter(|s| !s.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, route.missing_message);
    };
    if !is_valid_id(id) {
        return error_response(StatusCode::BAD_REQUEST, &format!("Invalid {}", route.param));
    }

    let url = config.upstream_url(route, id.to_owned());
    debug!("relaying {} -> {url}", route.path);

    match client.get_json(&url).await {
        Ok(body) => ([(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")], Json(body)).into_response(),
        Err(FetchError::HttpStatus { status, body, .. }) => {
            warn!("upstream answered {status} for {url}");
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            match body {
                Some(body) => (status, Json(Value::clone(&body))).into_response(),
                None => error_response(status, "ESPN error"),
            }
        }
        Err(e) => {
            warn!("relay failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn is_valid_id(id: &str) -> bool {
    id.len() <= 32 && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn rebase(url: &str, origin: &str) -> String {
    let after_scheme = url.find("://").map(|i| i + 3).unwrap_or(0);
    let path_start = url[after_scheme..]
        .find('/')
        .map(|i| after_scheme + i)
        .unwrap_or(url.len());
    format!("{}{}", origin.trim_end_matches('/'), &url[path_start..])
}
