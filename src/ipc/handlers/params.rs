use crate::calc::{CalcError, ExamType};
use crate::ipc::types::Request;
use serde_json::json;

pub fn required_str(req: &Request, key: &str) -> Result<String, CalcError> {
    match req.params.get(key).and_then(|v| v.as_str()).map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(CalcError::new("bad_params", format!("missing {}", key))),
    }
}

/// Absent, null and blank strings all read as `None`.
pub fn optional_str(req: &Request, key: &str) -> Result<Option<String>, CalcError> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => {
            let Some(s) = v.as_str() else {
                return Err(CalcError::new(
                    "bad_params",
                    format!("{} must be a string", key),
                ));
            };
            let t = s.trim();
            Ok(if t.is_empty() { None } else { Some(t.to_string()) })
        }
    }
}

pub fn required_exam_type(req: &Request, key: &str) -> Result<ExamType, CalcError> {
    let raw = required_str(req, key)?;
    ExamType::parse(&raw).ok_or_else(|| {
        CalcError::new(
            "bad_params",
            format!("{} must be one of: Opener, Midterm, Endterm", key),
        )
        .with_details(json!({ key: raw }))
    })
}

pub fn optional_exam_type(req: &Request, key: &str) -> Result<Option<ExamType>, CalcError> {
    match optional_str(req, key)? {
        None => Ok(None),
        Some(_) => required_exam_type(req, key).map(Some),
    }
}

pub fn db_err(code: &str, e: anyhow::Error) -> CalcError {
    CalcError::new(code, e.to_string())
}
