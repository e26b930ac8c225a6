use crate::calc::CalcError;
use crate::db;
use crate::ipc::error::respond;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

use super::params::{db_err, required_str};

fn handle_health(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, CalcError> {
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
    }))
}

fn handle_workspace_select(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, CalcError> {
    let path = PathBuf::from(required_str(req, "path")?);
    let conn = db::open_db(&path).map_err(|e| db_err("db_open_failed", e))?;

    // Fail at open time rather than on the first report if the stored scale
    // no longer forms a partition.
    super::grading::load_scale(&conn)?;

    tracing::info!(workspace = %path.display(), "workspace opened");
    state.workspace = Some(path.clone());
    state.db = Some(conn);
    Ok(json!({ "workspacePath": path.to_string_lossy() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "health" => handle_health(state, req),
        "workspace.select" => handle_workspace_select(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, result))
}
