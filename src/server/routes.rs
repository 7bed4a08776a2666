use super::error::AppError;
use super::AppContext;
use crate::config::Application;
use crate::urls::{RequestKind, SourceMedia};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::collections::HashMap;
use std::time::Instant;

const PLAYLIST_CONTENT_TYPE: &str = "application/x-mpegURL";
const SEGMENT_CONTENT_TYPE: &str = "video/MP2T";

/// Cache administration routes, nested under `/api`.
pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/cache/invalidate", get(invalidate_cache))
        .route("/cache/stats", get(cache_stats))
        .route("/metrics", get(metrics))
}

/// Drop one cached source (`?key=<source path>`) or the whole cache.
async fn invalidate_cache(
    State(ctx): State<AppContext>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    match params.get("key") {
        Some(key) => {
            let removed = ctx.service.cache().remove(key);
            tracing::info!(key = %key, removed, "Invalidated cached metadata");
        }
        None => {
            ctx.service.cache().clear();
            tracing::info!("Cleared metadata cache");
        }
    }
    StatusCode::OK
}

async fn cache_stats(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(ctx.service.cache().stats())
}

/// GET /api/metrics -- Prometheus-format metrics.
async fn metrics(State(ctx): State<AppContext>) -> impl IntoResponse {
    let body = ctx.metrics.render(&ctx.service.cache().stats());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

/// Split `/<app>/<rest>` into the application id and the rest of the path.
fn split_app(path: &str) -> (&str, &str) {
    let path = path.strip_prefix('/').unwrap_or(path);
    match path.find('/') {
        Some(i) => (&path[..i], &path[i..]),
        None => (path, ""),
    }
}

fn cache_control(max_age: Option<u64>) -> Option<HeaderValue> {
    match max_age? {
        0 => Some(HeaderValue::from_static("no-cache")),
        secs => HeaderValue::from_str(&format!("public, max-age={secs}")).ok(),
    }
}

fn with_body(content_type: &'static str, cache: Option<HeaderValue>, body: impl Into<Body>) -> Response {
    let mut response = Response::new(body.into());
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Some(value) = cache {
        response.headers_mut().insert(header::CACHE_CONTROL, value);
    }
    response
}

/// Every request outside `/api` and `/health`: `/<app>/<folder>/<media>/<file>`.
///
/// Each request is timed into the request duration histogram.
pub async fn media_request(State(ctx): State<AppContext>, method: Method, uri: Uri) -> Response {
    let started = Instant::now();
    let (app_id, rest) = split_app(uri.path());
    let kind = RequestKind::classify(rest);

    let known_app = ctx.config.application(app_id);
    let (app_label, kind_label) = match (&known_app, method == Method::GET) {
        (None, _) => ("", "app_unknown"),
        (Some(_), false) => (app_id, "unknown"),
        (Some(_), true) => (app_id, kind.metric_label()),
    };

    let response = match known_app {
        None => {
            tracing::debug!(app = app_id, "Request for unknown application");
            (StatusCode::NOT_FOUND, "unknown app").into_response()
        }
        Some(_) if method != Method::GET => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        Some(app) => serve_media(&ctx, &app, rest, uri.query(), kind)
            .await
            .unwrap_or_else(IntoResponse::into_response),
    };

    ctx.metrics
        .record_request(response.status(), app_label, kind_label, started.elapsed());
    response
}

async fn serve_media(
    ctx: &AppContext,
    app: &Application,
    rest: &str,
    query: Option<&str>,
    kind: RequestKind,
) -> Result<Response, AppError> {
    let url = match query {
        Some(query) => format!("{rest}?{query}"),
        None => rest.to_string(),
    };
    let media = SourceMedia::parse(&app.id, &url);
    tracing::debug!(app = %app.id, url = %url, ?kind, "Media request");

    let cache = &ctx.config.server.cache_control;
    let response = match kind {
        RequestKind::MasterPlaylist => {
            let playlist = ctx.service.master_playlist(app, &media).await?;
            with_body(PLAYLIST_CONTENT_TYPE, cache_control(cache.playlist_max_age), playlist)
        }
        RequestKind::VariantPlaylist => {
            let playlist = ctx
                .service
                .variant_playlist(app, &media, &media.filename)
                .await?;
            with_body(PLAYLIST_CONTENT_TYPE, cache_control(cache.playlist_max_age), playlist)
        }
        RequestKind::Segment => {
            let segment = ctx.service.segment(app, &media, &media.filename).await?;
            with_body(SEGMENT_CONTENT_TYPE, cache_control(cache.segment_max_age), segment)
        }
        RequestKind::Metadata => {
            let info = ctx.service.metadata_info(app, &media).await?;
            Json(info.as_ref()).into_response()
        }
        RequestKind::Unknown => (StatusCode::NOT_FOUND, "unknown request").into_response(),
    };

    Ok(response)
}
