//! Literal static asset serving ahead of route dispatch.

use std::path::{Component, Path, PathBuf};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::state::AppState;

/// Maps a request path onto a file below `root`, rejecting anything that is
/// not a plain relative path.
fn asset_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = Path::new(request_path.trim_start_matches('/'));
    if relative.as_os_str().is_empty()
        || !relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

/// Serves `GET`/`HEAD` requests naming an existing file under the static root;
/// everything else continues to the router.
pub async fn serve_static(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !matches!(*request.method(), Method::GET | Method::HEAD) {
        return next.run(request).await;
    }

    let root = Path::new(&state.config.static_files.root);
    let Some(candidate) = asset_path(root, request.uri().path()) else {
        return next.run(request).await;
    };

    match tokio::fs::metadata(&candidate).await {
        Ok(metadata) if metadata.is_file() => {}
        _ => return next.run(request).await,
    }

    match ServeDir::new(root).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}
