//! Purpose: Provide the HTTP/JSON surface over the hero store.
//! Exports: `ServeConfig`, `serve`.
//! Role: Axum-based server exposing CRUD and suggestions for browser clients.
//! Invariants: JSON envelopes and error kinds stay stable across releases.
//! Invariants: Loopback-only unless explicitly allowed.
//! Notes: The store lives in process memory; mutations vanish with the process.

use axum::extract::{DefaultBodyLimit, Path as AxumPath, Query, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::IntoFuture;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use tokio::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use herodex::api::{
    AssetRef, Error, ErrorKind, Hero, HeroSource, HeroStore, Publisher, ensure_hero_id,
    open_source,
};

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub asset: AssetRef,
    pub allow_non_loopback: bool,
    pub max_body_bytes: u64,
    pub cors_allowed_origins: Vec<String>,
}

struct AppState {
    store: RwLock<HeroStore>,
    source: Box<dyn HeroSource + Send + Sync>,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    init_tracing();

    let max_body_bytes: usize = config
        .max_body_bytes
        .try_into()
        .map_err(|_| Error::new(ErrorKind::Usage).with_message("--max-body-bytes is too large"))?;
    let cors = cors_layer(&config.cors_allowed_origins)?;

    let state = Arc::new(AppState {
        store: RwLock::new(HeroStore::new()),
        source: open_source(&config.asset)?,
    });

    let mut app = Router::new()
        .route("/healthz", get(healthz))
        .route("/v0/heroes", get(list_heroes).post(add_hero))
        .route(
            "/v0/heroes/:id",
            get(get_hero).put(update_hero).delete(delete_hero),
        )
        .route("/v0/suggest", get(suggest_heroes))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http());
    if let Some(cors) = cors {
        app = app.layer(cors);
    }
    let app = app.with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("server failed")
                    .with_source(err)
            })?;
        }
        _ = shutdown_signal() => {
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("server failed")
                        .with_source(err)
                })?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    Ok(())
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => addr.is_loopback(),
    }
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if !is_loopback(config.bind.ip()) && !config.allow_non_loopback {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("non-loopback bind requires explicit opt-in")
            .with_hint("Re-run with --allow-non-loopback or use a loopback address."));
    }

    if config.max_body_bytes == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes must be greater than zero")
            .with_hint("Use a positive value like 65536."));
    }

    cors_layer(&config.cors_allowed_origins)?;

    Ok(())
}

fn cors_layer(origins: &[String]) -> Result<Option<CorsLayer>, Error> {
    if origins.is_empty() {
        return Ok(None);
    }
    if origins.iter().any(|origin| origin == "*") {
        return Ok(Some(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        ));
    }
    let mut values = Vec::new();
    for origin in origins {
        let value = HeaderValue::from_str(origin).map_err(|_| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid cors origin: {origin}"))
                .with_hint("Use a full origin like http://localhost:4200, or *.")
        })?;
        values.push(value);
    }
    Ok(Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(values))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(Any),
    ))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        signal.recv().await;
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

/// Request body for create/update. The id is optional: POST ignores it and
/// PUT takes the id from the path.
#[derive(Debug, Deserialize)]
struct HeroPayload {
    #[serde(default)]
    id: String,
    superhero: String,
    publisher: Publisher,
    #[serde(default)]
    alter_ego: String,
    #[serde(default)]
    first_appearance: String,
    #[serde(default)]
    characters: String,
    #[serde(default)]
    alt_img: Option<String>,
}

impl HeroPayload {
    fn into_hero(self, id: String) -> Hero {
        Hero {
            id,
            superhero: self.superhero,
            publisher: self.publisher,
            alter_ego: self.alter_ego,
            first_appearance: self.first_appearance,
            characters: self.characters,
            alt_img: self.alt_img,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SuggestQuery {
    q: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

async fn healthz() -> Response {
    json_response(json!({ "ok": true }))
}

async fn list_heroes(State(state): State<Arc<AppState>>) -> Response {
    match loaded_heroes(&state) {
        Ok(heroes) => json_response(json!({ "heroes": heroes })),
        Err(err) => error_response(err),
    }
}

async fn get_hero(State(state): State<Arc<AppState>>, AxumPath(id): AxumPath<String>) -> Response {
    match find_hero(&state, &id) {
        Ok(hero) => json_response(json!({ "hero": hero })),
        Err(err) => error_response(err),
    }
}

async fn add_hero(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<HeroPayload>,
) -> Response {
    let result = write_store(&state).map(|mut store| {
        store.load_from_source(state.source.as_ref());
        store.add(payload.into_hero(String::new()))
    });
    match result {
        Ok(hero) => json_response(json!({ "hero": hero })),
        Err(err) => error_response(err),
    }
}

async fn update_hero(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Json(payload): Json<HeroPayload>,
) -> Response {
    match apply_update(&state, id, payload) {
        Ok(hero) => json_response(json!({ "hero": hero })),
        Err(err) => error_response(err),
    }
}

async fn delete_hero(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    let result = ensure_hero_id(&id).and_then(|()| {
        let mut store = write_store(&state)?;
        store.load_from_source(state.source.as_ref());
        Ok(store.delete_by_id(&id))
    });
    match result {
        Ok(deleted) => json_response(json!({ "deleted": deleted, "id": id })),
        Err(err) => error_response(err),
    }
}

async fn suggest_heroes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SuggestQuery>,
) -> Response {
    let needle = query.q.unwrap_or_default();
    let result = write_store(&state).map(|mut store| {
        store.load_from_source(state.source.as_ref());
        store.suggest(&needle)
    });
    match result {
        Ok(heroes) => json_response(json!({ "heroes": heroes })),
        Err(err) => error_response(err),
    }
}

fn loaded_heroes(state: &AppState) -> Result<Vec<Hero>, Error> {
    let mut store = write_store(state)?;
    Ok(store.load_from_source(state.source.as_ref()))
}

fn find_hero(state: &AppState, id: &str) -> Result<Hero, Error> {
    ensure_hero_id(id)?;
    let mut store = write_store(state)?;
    store.load_from_source(state.source.as_ref());
    store.find_by_id(id).ok_or_else(|| {
        Error::new(ErrorKind::NotFound)
            .with_message("hero not found")
            .with_id(id)
            .with_hint("GET /v0/heroes for the full list.")
    })
}

fn apply_update(state: &AppState, id: String, payload: HeroPayload) -> Result<Hero, Error> {
    ensure_hero_id(&id)?;
    if !payload.id.is_empty() && payload.id != id {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("body id conflicts with path id")
            .with_id(id));
    }
    let mut store = write_store(state)?;
    store.load_from_source(state.source.as_ref());
    store.update_checked(payload.into_hero(id))
}

fn write_store(state: &AppState) -> Result<RwLockWriteGuard<'_, HeroStore>, Error> {
    state
        .store
        .write()
        .map_err(|_| Error::new(ErrorKind::Internal).with_message("hero store lock poisoned"))
}

fn json_response(payload: serde_json::Value) -> Response {
    let mut response = Json(payload).into_response();
    response
        .headers_mut()
        .insert("herodex-version", HeaderValue::from_static("0"));
    response
}

fn error_response(err: Error) -> Response {
    let status = match err.kind() {
        ErrorKind::Usage => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Fetch | ErrorKind::Parse => StatusCode::BAD_GATEWAY,
        ErrorKind::Io | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ErrorEnvelope {
        error: ErrorBody {
            kind: format!("{:?}", err.kind()),
            message: err.message().unwrap_or("error").to_string(),
            hint: err.hint().map(str::to_string),
            path: err.path().map(|path| path.to_string_lossy().to_string()),
            id: err.id().map(str::to_string),
        },
    };
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert("herodex-version", HeaderValue::from_static("0"));
    response
}
