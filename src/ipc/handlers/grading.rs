use crate::calc::{round_off_2_decimal, CalcError};
use crate::db;
use crate::grading::{clamp_percentage, default_bands, GradingBand, GradingScale};
use crate::ipc::error::respond;
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

use super::params::db_err;

pub const SCALE_KEY: &str = "grading.scale";

/// The one scale every grading path reads. A stored scale that no longer
/// validates is a hard error, never a silent fallback to the default.
pub fn load_scale(conn: &Connection) -> Result<GradingScale, CalcError> {
    let stored =
        db::settings_get_json(conn, SCALE_KEY).map_err(|e| db_err("db_query_failed", e))?;
    let Some(raw) = stored else {
        return Ok(GradingScale::default());
    };
    serde_json::from_value::<GradingScale>(raw).map_err(|e| {
        CalcError::new(
            "scale_integrity",
            format!("stored grading scale is invalid: {}", e),
        )
    })
}

fn scale_json(scale: &GradingScale, is_default: bool) -> serde_json::Value {
    json!({
        "bands": scale.bands(),
        "version": scale.version(),
        "isDefault": is_default,
    })
}

fn handle_scale_get(
    state: &mut AppState,
    _req: &Request,
) -> Result<serde_json::Value, CalcError> {
    let conn = state.conn()?;
    let scale = load_scale(conn)?;
    let is_default = scale == GradingScale::default();
    Ok(scale_json(&scale, is_default))
}

fn store_scale(conn: &Connection, scale: &GradingScale) -> Result<(), CalcError> {
    let value = serde_json::to_value(scale)
        .map_err(|e| CalcError::new("bad_params", e.to_string()))?;
    db::settings_set_json(conn, SCALE_KEY, &value).map_err(|e| db_err("db_update_failed", e))
}

fn handle_scale_set(state: &mut AppState, req: &Request) -> Result<serde_json::Value, CalcError> {
    let conn = state.conn()?;
    let Some(raw_bands) = req.params.get("bands") else {
        return Err(CalcError::new("bad_params", "missing bands"));
    };
    let bands: Vec<GradingBand> = serde_json::from_value(raw_bands.clone())
        .map_err(|e| CalcError::new("bad_params", format!("bands: {}", e)))?;
    let scale = GradingScale::new(bands)
        .map_err(|e| CalcError::new("bad_params", e.to_string()))?;

    store_scale(conn, &scale)?;
    tracing::info!(
        bands = scale.bands().len(),
        version = %scale.version(),
        "grading scale replaced"
    );
    Ok(scale_json(&scale, scale == GradingScale::default()))
}

fn handle_scale_reset(
    state: &mut AppState,
    _req: &Request,
) -> Result<serde_json::Value, CalcError> {
    let conn = state.conn()?;
    let scale = GradingScale::new(default_bands())?;
    store_scale(conn, &scale)?;
    tracing::info!(version = %scale.version(), "grading scale reset to default");
    Ok(scale_json(&scale, true))
}

fn handle_grade(state: &mut AppState, req: &Request) -> Result<serde_json::Value, CalcError> {
    let conn = state.conn()?;
    let Some(percentage) = req.params.get("percentage").and_then(|v| v.as_f64()) else {
        return Err(CalcError::new("bad_params", "percentage must be a number"));
    };
    let scale = load_scale(conn)?;
    let p = round_off_2_decimal(clamp_percentage(percentage));
    let g = scale.grade(p)?;
    Ok(json!({
        "percentage": p,
        "grade": g.grade,
        "points": g.points,
        "scaleVersion": scale.version(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "grading.scale.get" => handle_scale_get(state, req),
        "grading.scale.set" => handle_scale_set(state, req),
        "grading.scale.reset" => handle_scale_reset(state, req),
        "grading.grade" => handle_grade(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, result))
}
