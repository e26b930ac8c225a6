use crate::calc::{AssessmentPolicy, CalcError, ExamType, RawMarkEntry};
use crate::db::{self, MarkQuery};
use crate::grading::GradingScale;
use crate::ipc::error::respond;
use crate::ipc::types::{AppState, Request};
use crate::report::{self, ReportContext};
use rusqlite::Connection;
use serde_json::{json, Value};

use super::grading::load_scale;
use super::params::{db_err, optional_str, required_exam_type, required_str};
use super::setup::{load_assessment_policy, load_reports_settings};

/// Marks plus the configuration they are graded under, read in one
/// transaction so a concurrent upsert or scale change cannot split a report.
struct Snapshot {
    scale: GradingScale,
    policy: AssessmentPolicy,
    show_generated_at: bool,
    entries: Vec<RawMarkEntry>,
}

/// `q` is `None` when there is no class to read marks for; the snapshot
/// then carries configuration only.
fn take_snapshot(conn: &Connection, q: Option<&MarkQuery>) -> Result<Snapshot, CalcError> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| CalcError::new("db_tx_failed", e.to_string()))?;
    let scale = load_scale(&tx)?;
    let policy = load_assessment_policy(&tx)?;
    let reports = load_reports_settings(&tx)?;
    let entries = match q {
        Some(q) => db::query_marks(&tx, q).map_err(|e| db_err("db_query_failed", e))?,
        None => Vec::new(),
    };
    tx.commit()
        .map_err(|e| CalcError::new("db_commit_failed", e.to_string()))?;
    Ok(Snapshot {
        scale,
        policy,
        show_generated_at: reports.show_generated_at,
        entries,
    })
}

impl Snapshot {
    fn context<'a>(
        &'a self,
        class_id: Option<&'a str>,
        term_id: &'a str,
        academic_year: Option<&'a str>,
    ) -> ReportContext<'a> {
        ReportContext {
            class_id,
            term_id,
            academic_year,
            scale: &self.scale,
            policy: &self.policy,
            generated_at: self
                .show_generated_at
                .then(|| chrono::Utc::now().to_rfc3339()),
        }
    }
}

fn class_query(class_id: &str, term_id: &str, academic_year: Option<&str>) -> MarkQuery {
    MarkQuery {
        class_id: Some(class_id.to_string()),
        term_id: term_id.to_string(),
        academic_year: academic_year.map(|s| s.to_string()),
        exam_type: None,
        student_id: None,
    }
}

/// Picks the class a student is ranked in. An explicit `classId` wins;
/// otherwise it comes from the student's own entries for the term.
fn resolve_student_class(
    conn: &Connection,
    req: &Request,
    student_id: &str,
    term_id: &str,
    academic_year: Option<&str>,
) -> Result<Option<String>, CalcError> {
    if let Some(class_id) = optional_str(req, "classId")? {
        return Ok(Some(class_id));
    }
    let mut classes = db::classes_for_student(conn, student_id, term_id, academic_year)
        .map_err(|e| db_err("db_query_failed", e))?;
    match classes.len() {
        0 => Ok(None),
        1 => Ok(classes.pop()),
        _ => Err(CalcError::new(
            "ambiguous_enrollment",
            "student has marks in more than one class for this term; pass classId",
        )
        .with_details(json!({ "studentId": student_id, "classIds": classes }))),
    }
}

fn to_value<T: serde::Serialize>(v: &T) -> Result<Value, CalcError> {
    serde_json::to_value(v).map_err(|e| CalcError::new("serialize_failed", e.to_string()))
}

fn handle_class_results(state: &mut AppState, req: &Request) -> Result<Value, CalcError> {
    let conn = state.conn()?;
    let class_id = required_str(req, "classId")?;
    let term_id = required_str(req, "termId")?;
    let exam_type = required_exam_type(req, "examType")?;
    let academic_year = optional_str(req, "academicYear")?;

    let mut q = class_query(&class_id, &term_id, academic_year.as_deref());
    q.exam_type = Some(exam_type);
    let snap = take_snapshot(conn, Some(&q))?;
    let ctx = snap.context(Some(class_id.as_str()), &term_id, academic_year.as_deref());
    let marklist = report::class_marklist(&ctx, exam_type, &snap.entries)?;

    tracing::info!(
        class_id = %class_id,
        term_id = %term_id,
        exam_type = exam_type.as_str(),
        students = marklist.rows.len(),
        "class marklist computed"
    );
    to_value(&marklist)
}

fn handle_class_final(state: &mut AppState, req: &Request) -> Result<Value, CalcError> {
    let conn = state.conn()?;
    let class_id = required_str(req, "classId")?;
    let term_id = required_str(req, "termId")?;
    let academic_year = optional_str(req, "academicYear")?;

    let q = class_query(&class_id, &term_id, academic_year.as_deref());
    let snap = take_snapshot(conn, Some(&q))?;
    let ctx = snap.context(Some(class_id.as_str()), &term_id, academic_year.as_deref());
    let final_report = report::class_final_report(&ctx, &snap.entries)?;

    tracing::info!(
        class_id = %class_id,
        term_id = %term_id,
        students = final_report.rows.len(),
        "class final report computed"
    );
    to_value(&final_report)
}

fn handle_student_results(state: &mut AppState, req: &Request) -> Result<Value, CalcError> {
    let conn = state.conn()?;
    let student_id = required_str(req, "studentId")?;
    let term_id = required_str(req, "termId")?;
    let exam_type: ExamType = required_exam_type(req, "examType")?;
    let academic_year = optional_str(req, "academicYear")?;

    let class_id =
        resolve_student_class(conn, req, &student_id, &term_id, academic_year.as_deref())?;
    let q = class_id.as_deref().map(|c| {
        let mut q = class_query(c, &term_id, academic_year.as_deref());
        q.exam_type = Some(exam_type);
        q
    });
    let snap = take_snapshot(conn, q.as_ref())?;
    let ctx = snap.context(class_id.as_deref(), &term_id, academic_year.as_deref());
    let marklist = report::student_marklist(&ctx, &student_id, exam_type, &snap.entries)?;

    tracing::info!(
        student_id = %student_id,
        term_id = %term_id,
        exam_type = exam_type.as_str(),
        "student marklist computed"
    );
    to_value(&marklist)
}

fn handle_student_final(state: &mut AppState, req: &Request) -> Result<Value, CalcError> {
    let conn = state.conn()?;
    let student_id = required_str(req, "studentId")?;
    let term_id = required_str(req, "termId")?;
    let academic_year = optional_str(req, "academicYear")?;

    let class_id =
        resolve_student_class(conn, req, &student_id, &term_id, academic_year.as_deref())?;
    let q = class_id
        .as_deref()
        .map(|c| class_query(c, &term_id, academic_year.as_deref()));
    let snap = take_snapshot(conn, q.as_ref())?;
    let ctx = snap.context(class_id.as_deref(), &term_id, academic_year.as_deref());
    let final_report = report::student_final_report(&ctx, &student_id, &snap.entries)?;

    tracing::info!(
        student_id = %student_id,
        term_id = %term_id,
        position = ?final_report.position,
        "student final report computed"
    );
    to_value(&final_report)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "reports.classResults" => handle_class_results(state, req),
        "reports.classFinal" => handle_class_final(state, req),
        "reports.studentResults" => handle_student_results(state, req),
        "reports.studentFinal" => handle_student_final(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, result))
}
