#![allow(dead_code)]

use adsieve::config::{Config, FilterListConfig};
use adsieve::engine::FilterList;
use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

#[derive(Clone)]
enum Reply {
    Full(StatusCode, String),
    /// Sends `Content-Length` for more than the body, then drops the connection.
    Truncated(String),
}

#[derive(Default)]
struct ServerState {
    lists: Mutex<HashMap<String, Reply>>,
    hits: Mutex<HashMap<String, usize>>,
    delay: Duration,
}

/// Local HTTP server publishing filter lists at `/lists/<name>`.
pub struct FilterServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
}

impl FilterServer {
    pub async fn start() -> Self {
        Self::start_with_delay(Duration::ZERO).await
    }

    /// Every response is held back by `delay`, widening startup races.
    pub async fn start_with_delay(delay: Duration) -> Self {
        let state = Arc::new(ServerState {
            delay,
            ..Default::default()
        });
        let app = Router::new()
            .route("/lists/:name", get(serve_list))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn publish(&self, name: &str, body: &str) {
        self.respond(name, StatusCode::OK, body);
    }

    pub fn respond(&self, name: &str, status: StatusCode, body: &str) {
        self.state
            .lists
            .lock()
            .unwrap()
            .insert(name.to_string(), Reply::Full(status, body.to_string()));
    }

    /// Serves the start of a list and then resets mid-body.
    pub fn truncate(&self, name: &str, partial: &str) {
        self.state
            .lists
            .lock()
            .unwrap()
            .insert(name.to_string(), Reply::Truncated(partial.to_string()));
    }

    pub fn url(&self, name: &str) -> String {
        format!("http://{}/lists/{}", self.addr, name)
    }

    pub fn hits(&self, name: &str) -> usize {
        self.state.hits.lock().unwrap().get(name).copied().unwrap_or(0)
    }
}

async fn serve_list(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Response {
    *state.hits.lock().unwrap().entry(name.clone()).or_default() += 1;
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    let reply = state.lists.lock().unwrap().get(&name).cloned();
    match reply {
        Some(Reply::Full(status, body)) => (status, body).into_response(),
        Some(Reply::Truncated(partial)) => {
            let declared = partial.len() + 4096;
            let chunks = futures::stream::iter(vec![
                Ok(Bytes::from(partial)),
                Err(std::io::Error::other("connection reset")),
            ]);
            Response::builder()
                .header(header::CONTENT_LENGTH, declared)
                .body(Body::from_stream(chunks))
                .unwrap()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Defaults, with every configured list served by `server` and cached under `data_dir`.
pub fn config_for(server: &FilterServer, data_dir: &std::path::Path, names: &[&str]) -> Config {
    let mut config = Config::default();
    config.data_dir = data_dir.to_path_buf();
    config.filters.lists = names
        .iter()
        .map(|name| {
            (
                name.to_string(),
                FilterListConfig {
                    url: server.url(name),
                    file_name: format!("{name}.txt"),
                    label: None,
                    enabled: true,
                },
            )
        })
        .collect();
    config.logging.decision_log_sinks = vec!["memory".to_string()];
    config.stats.enable = false;
    config
}

pub fn filter_list(server: &FilterServer, dir: &std::path::Path, name: &str) -> FilterList {
    FilterList {
        name: name.to_string(),
        label: name.to_string(),
        url: server.url(name),
        path: dir.join(format!("{name}.txt")),
        max_age: Duration::from_secs(7 * 24 * 3600),
        enabled: true,
    }
}

pub fn age_file(path: &std::path::Path, by: Duration) {
    std::fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() - by)
        .unwrap();
}
