use crate::calc::{grade_entries, grade_entry, validate_raw_mark, CalcError, RawMarkEntry};
use crate::db::{self, MarkQuery, UpsertOutcome};
use crate::ipc::error::respond;
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

use super::grading::load_scale;
use super::params::{db_err, optional_exam_type, optional_str, required_exam_type, required_str};

const BULK_UPSERT_MAX_ENTRIES: usize = 5000;

fn parse_entry(raw: &Value) -> Result<RawMarkEntry, CalcError> {
    serde_json::from_value::<RawMarkEntry>(raw.clone())
        .map_err(|e| CalcError::new("bad_params", format!("invalid mark entry: {}", e)))
}

fn handle_upsert(state: &mut AppState, req: &Request) -> Result<Value, CalcError> {
    let conn = state.conn()?;
    let Some(raw) = req.params.get("entry") else {
        return Err(CalcError::new("bad_params", "missing entry"));
    };
    let entry = parse_entry(raw)?;
    validate_raw_mark(&entry)?;

    let scale = load_scale(conn)?;
    let outcome = db::upsert_mark(conn, &entry).map_err(|e| db_err("db_insert_failed", e))?;
    tracing::info!(
        student_id = %entry.student_id,
        subject_id = %entry.subject_id,
        exam_type = entry.exam_type.as_str(),
        outcome = outcome.as_str(),
        "mark upserted"
    );

    Ok(json!({
        "outcome": outcome.as_str(),
        "entry": grade_entry(&scale, &entry)?,
    }))
}

/// Validates the whole batch first; nothing is written unless every entry
/// passes. Writes share one transaction.
fn handle_bulk_upsert(state: &mut AppState, req: &Request) -> Result<Value, CalcError> {
    let Some(raw_entries) = req.params.get("entries").and_then(|v| v.as_array()) else {
        return Err(CalcError::new("bad_params", "entries must be an array"));
    };
    if raw_entries.len() > BULK_UPSERT_MAX_ENTRIES {
        return Err(CalcError::new(
            "bad_params",
            format!("at most {} entries per batch", BULK_UPSERT_MAX_ENTRIES),
        )
        .with_details(json!({ "count": raw_entries.len() })));
    }

    let mut entries: Vec<RawMarkEntry> = Vec::with_capacity(raw_entries.len());
    let mut rejected: Vec<Value> = Vec::new();
    for (index, raw) in raw_entries.iter().enumerate() {
        match parse_entry(raw).and_then(|e| validate_raw_mark(&e).map(|_| e)) {
            Ok(e) => entries.push(e),
            Err(e) => rejected.push(json!({
                "index": index,
                "message": e.message,
                "details": e.details,
            })),
        }
    }
    if !rejected.is_empty() {
        return Err(CalcError::new(
            "bad_params",
            format!("{} of {} entries rejected", rejected.len(), raw_entries.len()),
        )
        .with_details(json!({ "rejected": rejected })));
    }

    let conn = state.conn_mut()?;
    let tx = conn
        .transaction()
        .map_err(|e| CalcError::new("db_tx_failed", e.to_string()))?;
    let mut created = 0_usize;
    let mut updated = 0_usize;
    for e in &entries {
        match db::upsert_mark(&tx, e).map_err(|e| db_err("db_insert_failed", e))? {
            UpsertOutcome::Created => created += 1,
            UpsertOutcome::Updated => updated += 1,
        }
    }
    tx.commit()
        .map_err(|e| CalcError::new("db_commit_failed", e.to_string()))?;

    tracing::info!(created, updated, "bulk mark upsert committed");
    Ok(json!({ "created": created, "updated": updated }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> Result<Value, CalcError> {
    let conn = state.conn()?;
    let student_id = required_str(req, "studentId")?;
    let subject_id = required_str(req, "subjectId")?;
    let term_id = required_str(req, "termId")?;
    let academic_year = required_str(req, "academicYear")?;
    let exam_type = required_exam_type(req, "examType")?;

    let deleted = db::delete_mark(
        conn,
        &student_id,
        &subject_id,
        &term_id,
        &academic_year,
        exam_type,
    )
    .map_err(|e| db_err("db_delete_failed", e))?;
    if !deleted {
        return Err(CalcError::new("not_found", "mark entry not found").with_details(json!({
            "studentId": student_id,
            "subjectId": subject_id,
            "termId": term_id,
            "academicYear": academic_year,
            "examType": exam_type.as_str(),
        })));
    }
    tracing::info!(student_id = %student_id, subject_id = %subject_id, "mark deleted");
    Ok(json!({ "deleted": true }))
}

/// Graded view of stored marks; percentage/grade/points come from the scale
/// read in the same transaction.
fn handle_list(state: &mut AppState, req: &Request) -> Result<Value, CalcError> {
    let conn = state.conn()?;
    let q = MarkQuery {
        class_id: optional_str(req, "classId")?,
        term_id: required_str(req, "termId")?,
        academic_year: optional_str(req, "academicYear")?,
        exam_type: optional_exam_type(req, "examType")?,
        student_id: optional_str(req, "studentId")?,
    };
    if q.class_id.is_none() && q.student_id.is_none() {
        return Err(CalcError::new(
            "bad_params",
            "classId or studentId is required",
        ));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| CalcError::new("db_tx_failed", e.to_string()))?;
    let scale = load_scale(&tx)?;
    let raw = db::query_marks(&tx, &q).map_err(|e| db_err("db_query_failed", e))?;
    tx.commit()
        .map_err(|e| CalcError::new("db_commit_failed", e.to_string()))?;

    let graded = grade_entries(&scale, &raw)?;
    Ok(json!({
        "entries": graded,
        "scaleVersion": scale.version(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "marks.upsert" => handle_upsert(state, req),
        "marks.bulkUpsert" => handle_bulk_upsert(state, req),
        "marks.delete" => handle_delete(state, req),
        "marks.list" => handle_list(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, result))
}
