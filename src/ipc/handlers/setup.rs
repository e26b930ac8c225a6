use crate::calc::{AssessmentPolicy, CalcError};
use crate::db;
use crate::ipc::error::respond;
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Map, Value};

use super::params::db_err;

#[derive(Clone, Copy)]
enum SetupSection {
    Assessment,
    Reports,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "assessment" => Some(Self::Assessment),
            "reports" => Some(Self::Reports),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Assessment => "setup.assessment",
            Self::Reports => "setup.reports",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Assessment => json!({
            "weights": { "opener": 1.0, "midterm": 1.0, "endterm": 1.0 },
            "rankingMode": "competition",
            "meanPrecision": 2
        }),
        SetupSection::Reports => json!({
            "showGeneratedAt": true
        }),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_bool(v: &Value, key: &str) -> Result<bool, String> {
    v.as_bool().ok_or_else(|| format!("{} must be boolean", key))
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_weight(v: &Value, key: &str) -> Result<f64, String> {
    let w = v
        .as_f64()
        .ok_or_else(|| format!("weights.{} must be a number", key))?;
    if !w.is_finite() || w < 0.0 {
        return Err(format!("weights.{} must be >= 0", key));
    }
    Ok(w)
}

/// Applies a partial weights object on top of the current one. The merged
/// weights must not all be zero.
fn merge_weights(current: &mut Value, patch: &Value) -> Result<(), String> {
    let Some(patch) = patch.as_object() else {
        return Err("weights must be an object".into());
    };
    if !current.is_object() {
        *current = default_section(SetupSection::Assessment)["weights"].clone();
    }
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match k.as_str() {
            "opener" | "midterm" | "endterm" => {
                obj.insert(k.clone(), Value::from(parse_weight(v, k)?));
            }
            _ => return Err(format!("unknown weights field: {}", k)),
        }
    }
    let sum: f64 = ["opener", "midterm", "endterm"]
        .iter()
        .filter_map(|k| obj.get(*k).and_then(|v| v.as_f64()))
        .sum();
    if sum <= 0.0 {
        return Err("at least one exam weight must be > 0".into());
    }
    Ok(())
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Assessment => match k.as_str() {
                "weights" => {
                    let slot = obj.entry(k.clone()).or_insert(Value::Null);
                    merge_weights(slot, v)?;
                }
                "rankingMode" => {
                    let s = v
                        .as_str()
                        .ok_or_else(|| "rankingMode must be string".to_string())?
                        .trim()
                        .to_ascii_lowercase();
                    if s != "competition" && s != "dense" {
                        return Err("rankingMode must be one of: competition, dense".into());
                    }
                    obj.insert(k.clone(), Value::String(s));
                }
                "meanPrecision" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 0, 4)?));
                }
                _ => return Err(format!("unknown assessment field: {}", k)),
            },
            SetupSection::Reports => match k.as_str() {
                "showGeneratedAt" => {
                    obj.insert(k.clone(), Value::Bool(parse_bool(v, k)?));
                }
                _ => return Err(format!("unknown reports field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> Result<Value, CalcError> {
    let mut current = default_section(section);
    let saved = db::settings_get_json(conn, section.key())
        .map_err(|e| db_err("db_query_failed", e))?;
    if let Some(saved_obj) = saved.as_ref().and_then(|v| v.as_object()) {
        // Best-effort apply: a malformed historical value must not block reports.
        let mut merged = current.clone();
        match merge_section_patch(section, &mut merged, saved_obj) {
            Ok(()) => current = merged,
            Err(msg) => {
                tracing::warn!(key = section.key(), "ignoring stored setup section: {}", msg)
            }
        }
    }
    Ok(current)
}

pub fn load_assessment_policy(conn: &rusqlite::Connection) -> Result<AssessmentPolicy, CalcError> {
    let section = load_section(conn, SetupSection::Assessment)?;
    serde_json::from_value(section).map_err(|e| {
        CalcError::new(
            "db_query_failed",
            format!("assessment settings unreadable: {}", e),
        )
    })
}

#[derive(Debug, Clone, Copy)]
pub struct ReportsSettings {
    pub show_generated_at: bool,
}

pub fn load_reports_settings(conn: &rusqlite::Connection) -> Result<ReportsSettings, CalcError> {
    let section = load_section(conn, SetupSection::Reports)?;
    Ok(ReportsSettings {
        show_generated_at: section
            .get("showGeneratedAt")
            .and_then(|v| v.as_bool())
            .unwrap_or(true),
    })
}

fn handle_setup_get(state: &mut AppState, _req: &Request) -> Result<Value, CalcError> {
    let conn = state.conn()?;
    let assessment = load_section(conn, SetupSection::Assessment)?;
    let reports = load_section(conn, SetupSection::Reports)?;
    Ok(json!({
        "assessment": assessment,
        "reports": reports
    }))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> Result<Value, CalcError> {
    let conn = state.conn()?;
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return Err(CalcError::new("bad_params", "missing section"));
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return Err(CalcError::new("bad_params", "unknown section")
            .with_details(json!({ "section": section_raw })));
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return Err(CalcError::new("bad_params", "patch must be an object"));
    };

    let mut current = load_section(conn, section)?;
    merge_section_patch(section, &mut current, patch_obj)
        .map_err(|msg| CalcError::new("bad_params", msg))?;
    db::settings_set_json(conn, section.key(), &current)
        .map_err(|e| db_err("db_update_failed", e))?;
    tracing::info!(key = section.key(), "setup section updated");
    Ok(json!({ "ok": true, "section": current }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "setup.get" => handle_setup_get(state, req),
        "setup.update" => handle_setup_update(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, result))
}
