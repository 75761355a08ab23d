use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use content::ContentLibrary;
use newsletter::ConvertKitClient;
use shared::{
    domain::Slug,
    error::{ApiError, ErrorCode},
    protocol::{
        AppearancesFeed, ContentSummary, EventPage, HomePage, PostPage, PostSummary, TalkPage,
        WorkshopPage,
    },
};
use site_api::{
    all_appearances, content_page, event_page, home_page, list_posts, list_talks,
    list_workshops, post_page, subscribe, talk_page, workshop_page, ApiContext,
};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url};

const MAX_SUBSCRIBE_BODY_BYTES: usize = 16 * 1024;

type HttpResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let content = ContentLibrary::load(&settings.content_dir).with_context(|| {
        format!(
            "failed to load content from '{}'",
            settings.content_dir.display()
        )
    })?;
    let newsletter = ConvertKitClient::new(settings.newsletter_config())
        .context("failed to build newsletter client")?;

    let api = ApiContext::new(storage, content, Arc::new(newsletter));
    let app = build_router(Arc::new(AppState { api }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/", get(http_home))
        .route("/talks", get(http_list_talks))
        .route("/talks/:slug", get(http_talk))
        .route("/workshops", get(http_list_workshops))
        .route("/workshops/:slug", get(http_workshop))
        .route("/appearances", get(http_appearances))
        .route("/appearances/:slug", get(http_event))
        .route("/posts", get(http_list_posts))
        .route("/posts/*slug", get(http_post))
        .route("/pages/:slug", get(http_page))
        .route(
            "/subscribe",
            post(http_subscribe).layer(RequestBodyLimitLayer::new(MAX_SUBSCRIBE_BODY_BYTES)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_error_status(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: ApiError) -> (StatusCode, Json<ApiError>) {
    (api_error_status(err.code), Json(err))
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, StatusCode> {
    state.api.storage.health_check().await.map_err(|error| {
        error!(%error, "health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    Ok("ok")
}

async fn http_home(State(state): State<Arc<AppState>>) -> Json<HomePage> {
    Json(home_page(&state.api))
}

async fn http_list_talks(State(state): State<Arc<AppState>>) -> HttpResult<Vec<ContentSummary>> {
    list_talks(&state.api).await.map(Json).map_err(reject)
}

async fn http_talk(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> HttpResult<TalkPage> {
    talk_page(&state.api, &Slug::new(slug), Utc::now())
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_list_workshops(
    State(state): State<Arc<AppState>>,
) -> HttpResult<Vec<ContentSummary>> {
    list_workshops(&state.api).await.map(Json).map_err(reject)
}

async fn http_workshop(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> HttpResult<WorkshopPage> {
    workshop_page(&state.api, &Slug::new(slug), Utc::now())
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_appearances(State(state): State<Arc<AppState>>) -> HttpResult<AppearancesFeed> {
    all_appearances(&state.api, Utc::now())
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_event(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> HttpResult<EventPage> {
    event_page(&state.api, &Slug::new(slug))
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_list_posts(State(state): State<Arc<AppState>>) -> Json<Vec<PostSummary>> {
    Json(list_posts(&state.api))
}

async fn http_post(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> HttpResult<PostPage> {
    post_page(&state.api, &slug).map(Json).map_err(reject)
}

async fn http_page(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> HttpResult<PostPage> {
    content_page(&state.api, &slug).map(Json).map_err(reject)
}

/// Plain-text replies: `OK`, or the validation message with a 400.
async fn http_subscribe(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match subscribe(&state.api, &body).await {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(err) => (api_error_status(err.code), err.message).into_response(),
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
