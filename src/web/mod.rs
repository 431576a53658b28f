mod assets;

use std::{
    convert::Infallible,
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{info, warn};

use crate::{
    config::GameConfig,
    events::{Notification, NotificationSink},
    game::{Game, GameBuilder, GameView, Input},
    persistence::{FileStore, WinnerRecord},
};

/// Forwards every notification to connected browsers as JSON.
struct BroadcastSink {
    tx: broadcast::Sender<String>,
}

impl NotificationSink for BroadcastSink {
    fn notify(&mut self, notification: Notification) {
        if let Ok(payload) = serde_json::to_string(&notification) {
            // No subscribers is fine.
            let _ = self.tx.send(payload);
        }
    }
}

#[derive(Clone)]
struct AppState {
    game: Arc<Mutex<Game>>,
    broadcaster: broadcast::Sender<String>,
}

impl AppState {
    fn game(&self) -> Result<MutexGuard<'_, Game>, StatusCode> {
        self.game
            .lock()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    }
}

#[derive(Serialize)]
struct InputResponse {
    ok: bool,
    error: Option<String>,
    view: GameView,
}

pub struct WebServerConfig {
    pub game: GameConfig,
    pub store_dir: PathBuf,
    pub host: String,
    pub port: u16,
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        game,
        store_dir,
        host,
        port,
    } = config;

    let frame_ms = game.frame_interval_ms;
    let (tx, _) = broadcast::channel::<String>(512);
    let game = GameBuilder::new(game)
        .with_store(FileStore::new(&store_dir))
        .with_sink(BroadcastSink { tx: tx.clone() })
        .build()
        .context("Failed to start game")?;
    let game = Arc::new(Mutex::new(game));

    let driver = game.clone();
    tokio::spawn(async move {
        let started = Instant::now();
        let mut advanced_ms = 0_u64;
        let mut interval = tokio::time::interval(Duration::from_millis(frame_ms));
        loop {
            interval.tick().await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            let Ok(mut game) = driver.lock() else {
                warn!("game lock poisoned, stopping clock");
                break;
            };
            game.advance(elapsed_ms.saturating_sub(advanced_ms));
            advanced_ms = elapsed_ms;
        }
    });

    let state = AppState {
        game,
        broadcaster: tx,
    };

    let router = Router::new()
        .route("/", get(static_asset))
        .route("/styles.css", get(static_asset))
        .route("/app.js", get(static_asset))
        .route("/api/state", get(latest_state))
        .route("/api/input", post(submit_input))
        .route("/api/winners", get(winners))
        .route("/api/events", get(stream_events))
        .with_state(state);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("Invalid listen address {host}:{port}"))?;

    info!(%addr, store = %store_dir.display(), "web_ui_live");
    println!("Qumara live at http://{addr} (Ctrl+C to stop)");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down web UI");
}

async fn static_asset(uri: Uri) -> Response {
    match assets::lookup(uri.path()) {
        Some(asset) => ([(header::CONTENT_TYPE, asset.content_type)], asset.body).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn latest_state(State(state): State<AppState>) -> Result<Json<GameView>, StatusCode> {
    let game = state.game()?;
    Ok(Json(game.view()))
}

async fn submit_input(
    State(state): State<AppState>,
    Json(input): Json<Input>,
) -> Result<Json<InputResponse>, StatusCode> {
    let mut game = state.game()?;
    let result = game.handle(input);
    Ok(Json(InputResponse {
        ok: result.is_ok(),
        error: result.err().map(|err| err.to_string()),
        view: game.view(),
    }))
}

async fn winners(
    State(state): State<AppState>,
) -> Result<Json<Vec<WinnerRecord>>, (StatusCode, String)> {
    let game = state
        .game()
        .map_err(|status| (status, "game unavailable".to_string()))?;
    game.winners()
        .map(Json)
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
}

async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}
