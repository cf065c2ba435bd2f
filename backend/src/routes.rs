use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, get, web};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{
    AppState,
    error::AppError,
    models::page::Viewer,
    store::SpaceSnapshot,
    treefilter,
};

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(
        web::scope("/rest/treefilter/1.0")
            .service(get_children_recursive)
            .service(get_children)
            .service(get_page),
    );
}

#[get("/healthz")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "treefilter-backend",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilteredPathQuery {
    space_id: Option<String>,
    parent: Option<String>,
    current: Option<String>,
    label: Option<String>,
}

/// Initial page load: the path from `parent` down to `current`.
#[get("/getchildrenrecursive")]
async fn get_children_recursive(
    req: HttpRequest,
    query: web::Query<FilteredPathQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let FilteredPathQuery {
        space_id,
        parent,
        current,
        label,
    } = query.into_inner();
    let space_id = parse_space_id(space_id.as_deref())?;
    let parent = required(parent, "parent")?;
    let viewer = request_viewer(&req, &state);

    let snapshot = load_snapshot(&state, space_id).await?;
    let nodes = treefilter::filtered_path(
        &snapshot,
        &viewer,
        &parent,
        current.as_deref(),
        label.as_deref().unwrap_or(""),
    )?;

    debug!(space_id, parent = %parent, viewer = %viewer, nodes = nodes.len(), "built filtered path");
    Ok(HttpResponse::Ok().json(nodes))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChildrenQuery {
    space_id: Option<String>,
    parent: Option<String>,
    parent_link: Option<String>,
    label: Option<String>,
}

/// Lazy expansion of one collapsed node.
#[get("/getchildren")]
async fn get_children(
    req: HttpRequest,
    query: web::Query<ChildrenQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let ChildrenQuery {
        space_id,
        parent,
        parent_link,
        label,
    } = query.into_inner();
    let space_id = parse_space_id(space_id.as_deref())?;
    let parent = required(parent, "parent")?;
    let viewer = request_viewer(&req, &state);

    let snapshot = load_snapshot(&state, space_id).await?;
    let nodes = treefilter::direct_children(
        &snapshot,
        &viewer,
        &parent,
        parent_link.as_deref().unwrap_or(""),
        label.as_deref().unwrap_or(""),
    )?;

    debug!(space_id, parent = %parent, viewer = %viewer, nodes = nodes.len(), "built direct children");
    Ok(HttpResponse::Ok().json(nodes))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageQuery {
    space_id: Option<String>,
    page_title: Option<String>,
    label: Option<String>,
}

#[get("/getpage")]
async fn get_page(
    req: HttpRequest,
    query: web::Query<PageQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let PageQuery {
        space_id,
        page_title,
        label,
    } = query.into_inner();
    let space_id = parse_space_id(space_id.as_deref())?;
    let title = required(page_title, "pageTitle")?;
    let viewer = request_viewer(&req, &state);

    let snapshot = load_snapshot(&state, space_id).await?;
    let node = treefilter::page_node(&snapshot, &viewer, &title, label.as_deref().unwrap_or(""))?;

    Ok(HttpResponse::Ok().json(node))
}

fn parse_space_id(value: Option<&str>) -> Result<i64, AppError> {
    let raw = value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::BadRequest("query parameter spaceId is required".into()))?;
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::BadRequest(format!("invalid spaceId: {raw}"))),
    }
}

/// Titles are matched verbatim, so only blank values are rejected.
fn required(value: Option<String>, name: &str) -> Result<String, AppError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("query parameter {name} is required")))
}

fn request_viewer(req: &HttpRequest, state: &AppState) -> Viewer {
    Viewer::from_header(
        req.headers()
            .get(state.viewer_header.as_str())
            .and_then(|value| value.to_str().ok()),
    )
}

async fn load_snapshot(state: &AppState, space_id: i64) -> Result<Arc<SpaceSnapshot>, AppError> {
    state
        .repository
        .load_space(space_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("space {space_id}")))
}
