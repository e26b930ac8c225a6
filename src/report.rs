use crate::calc::{
    aggregate_term, grade_entries, round_off, round_off_2_decimal, summarize, summarize_all,
    AssessmentPolicy, CalcError, ExamType, FinalSubjectResult, GradedEntry, RankingMode,
    RawMarkEntry, StudentTermSummary,
};
use crate::grading::GradingScale;
use crate::rank::{
    assign_positions, compare_positions, position_of, rank_class, rank_subjects,
    subject_position_of, ClassPosition, RankKey, RankScope, SubjectPosition,
};
use serde::Serialize;
use std::collections::BTreeSet;

/// Everything a report needs besides the marks themselves. All of it is read
/// from one snapshot so grades and ranks agree with each other.
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    /// `None` when a student has no class to be ranked in.
    pub class_id: Option<&'a str>,
    pub term_id: &'a str,
    pub academic_year: Option<&'a str>,
    pub scale: &'a GradingScale,
    pub policy: &'a AssessmentPolicy,
    pub generated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub class_id: Option<String>,
    pub term_id: String,
    pub academic_year: Option<String>,
    pub exam_type: RankScope,
    pub scale_version: String,
    pub ranking_mode: RankingMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

impl ReportContext<'_> {
    fn meta(&self, scope: RankScope) -> ReportMeta {
        ReportMeta {
            class_id: self.class_id.map(str::to_string),
            term_id: self.term_id.to_string(),
            academic_year: self.academic_year.map(|s| s.to_string()),
            exam_type: scope,
            scale_version: self.scale.version(),
            ranking_mode: self.policy.ranking_mode,
            generated_at: self.generated_at.clone(),
        }
    }

    fn display_mean(&self, mean: Option<f64>) -> Option<f64> {
        mean.map(|m| round_off(m, self.policy.mean_precision))
    }
}

fn distinct_subjects(entries: &[RawMarkEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.subject_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Rows are listed best position first; unranked rows go last, by id.
fn row_order<T>(rows: &mut [T], key: impl Fn(&T) -> (Option<u32>, String)) {
    rows.sort_by(|a, b| {
        let (pa, ia) = key(a);
        let (pb, ib) = key(b);
        compare_positions(pa, pb).then_with(|| ia.cmp(&ib))
    });
}

/// Intermediate results shared by the class and student variants.
struct Computed {
    subjects: Vec<String>,
    graded: Vec<GradedEntry>,
    results: Vec<FinalSubjectResult>,
    summaries: Vec<StudentTermSummary>,
    positions: Vec<ClassPosition>,
    subject_positions: Vec<SubjectPosition>,
}

fn compute(
    ctx: &ReportContext<'_>,
    scope: RankScope,
    entries: &[RawMarkEntry],
) -> Result<Computed, CalcError> {
    let in_scope: Vec<RawMarkEntry> = entries
        .iter()
        .filter(|e| ctx.class_id == Some(e.class_id.as_str()) && e.term_id == ctx.term_id)
        .filter(|e| {
            ctx.academic_year
                .map(|y| e.academic_year == y)
                .unwrap_or(true)
        })
        .filter(|e| match scope {
            RankScope::Exam(t) => e.exam_type == t,
            RankScope::Final => true,
        })
        .cloned()
        .collect();

    let graded = grade_entries(ctx.scale, &in_scope)?;
    let results = aggregate_term(ctx.scale, &ctx.policy.weights, &graded)?;
    let summaries = summarize_all(ctx.scale, ctx.term_id, &results)?;
    let positions = rank_class(
        ctx.class_id.unwrap_or_default(),
        ctx.term_id,
        scope,
        &summaries,
        ctx.policy.ranking_mode,
    );
    let subject_positions = rank_subjects(&results, ctx.policy.ranking_mode);

    Ok(Computed {
        subjects: distinct_subjects(&in_scope),
        graded,
        results,
        summaries,
        positions,
        subject_positions,
    })
}

// ----- class marklist (one exam type) -----

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarklistCell {
    pub marks_obtained: f64,
    pub out_of: f64,
    pub percentage: f64,
    pub grade: String,
    pub points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub subject_position: Option<u32>,
    pub subject_out_of: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarklistRow {
    pub student_id: String,
    /// Aligned with `ClassMarklist::subjects`; `None` where nothing was entered.
    pub cells: Vec<Option<MarklistCell>>,
    pub total_marks: f64,
    pub total_points: i64,
    pub average_percentage: Option<f64>,
    pub mean_grade_point: Option<f64>,
    pub overall_grade: Option<String>,
    pub position: Option<u32>,
    pub out_of: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub subject_id: String,
    pub entry_count: usize,
    pub total: f64,
    pub mean: Option<f64>,
    pub mean_grade: Option<String>,
    pub position: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassMarklist {
    #[serde(flatten)]
    pub meta: ReportMeta,
    pub subjects: Vec<String>,
    pub rows: Vec<MarklistRow>,
    pub subject_summaries: Vec<SubjectSummary>,
}

fn marklist_cell(computed: &Computed, student_id: &str, subject_id: &str) -> Option<MarklistCell> {
    let g = computed
        .graded
        .iter()
        .rev()
        .find(|g| g.entry.student_id == student_id && g.entry.subject_id == subject_id)?;
    let sp = subject_position_of(&computed.subject_positions, subject_id, student_id);
    Some(MarklistCell {
        marks_obtained: g.entry.marks_obtained,
        out_of: g.entry.out_of,
        percentage: g.percentage,
        grade: g.grade.clone(),
        points: g.points,
        comment: g.entry.comment.clone(),
        subject_position: sp.map(|p| p.position),
        subject_out_of: sp.map(|p| p.out_of),
    })
}

fn subject_summaries(
    ctx: &ReportContext<'_>,
    computed: &Computed,
) -> Result<Vec<SubjectSummary>, CalcError> {
    let mut out = Vec::with_capacity(computed.subjects.len());
    let mut ranked: Vec<(String, RankKey)> = Vec::new();
    for subject_id in &computed.subjects {
        let finals: Vec<f64> = computed
            .results
            .iter()
            .filter(|r| &r.subject_id == subject_id)
            .map(|r| r.final_percentage)
            .collect();
        let total: f64 = finals.iter().sum();
        let mean = if finals.is_empty() {
            None
        } else {
            Some(round_off_2_decimal(total / finals.len() as f64))
        };
        let mean_grade = match mean {
            Some(m) => Some(ctx.scale.grade(m)?.grade),
            None => None,
        };
        if let Some(m) = mean {
            ranked.push((
                subject_id.clone(),
                RankKey {
                    primary: m,
                    secondary: 0.0,
                },
            ));
        }
        out.push(SubjectSummary {
            subject_id: subject_id.clone(),
            entry_count: finals.len(),
            total: round_off_2_decimal(total),
            mean,
            mean_grade,
            position: None,
        });
    }

    for placement in assign_positions(ranked, ctx.policy.ranking_mode) {
        if let Some(s) = out.iter_mut().find(|s| s.subject_id == placement.id) {
            s.position = Some(placement.position);
        }
    }
    Ok(out)
}

fn marklist_row(
    ctx: &ReportContext<'_>,
    computed: &Computed,
    summary: &StudentTermSummary,
) -> MarklistRow {
    let student_id = summary.student_id.as_str();
    let pos = position_of(&computed.positions, student_id);
    MarklistRow {
        student_id: student_id.to_string(),
        cells: computed
            .subjects
            .iter()
            .map(|subject_id| marklist_cell(computed, student_id, subject_id))
            .collect(),
        total_marks: summary.total_marks,
        total_points: summary.total_points,
        average_percentage: summary.average_percentage,
        mean_grade_point: ctx.display_mean(summary.mean_grade_point),
        overall_grade: summary.overall_grade.clone(),
        position: pos.map(|p| p.position),
        out_of: computed.positions.len() as u32,
    }
}

pub fn class_marklist(
    ctx: &ReportContext<'_>,
    exam_type: ExamType,
    entries: &[RawMarkEntry],
) -> Result<ClassMarklist, CalcError> {
    let scope = RankScope::Exam(exam_type);
    let computed = compute(ctx, scope, entries)?;

    let mut rows: Vec<MarklistRow> = computed
        .summaries
        .iter()
        .map(|s| marklist_row(ctx, &computed, s))
        .collect();
    row_order(&mut rows, |r| (r.position, r.student_id.clone()));

    Ok(ClassMarklist {
        meta: ctx.meta(scope),
        subject_summaries: subject_summaries(ctx, &computed)?,
        subjects: computed.subjects,
        rows,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentMarklistLine {
    pub subject_id: String,
    #[serde(flatten)]
    pub cell: MarklistCell,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentMarklist {
    #[serde(flatten)]
    pub meta: ReportMeta,
    pub student_id: String,
    pub subjects: Vec<StudentMarklistLine>,
    pub total_marks: f64,
    pub total_points: i64,
    pub average_percentage: Option<f64>,
    pub mean_grade_point: Option<f64>,
    pub overall_grade: Option<String>,
    pub position: Option<u32>,
    pub out_of: u32,
}

/// One student's sitting, ranked against the whole class.
pub fn student_marklist(
    ctx: &ReportContext<'_>,
    student_id: &str,
    exam_type: ExamType,
    class_entries: &[RawMarkEntry],
) -> Result<StudentMarklist, CalcError> {
    let scope = RankScope::Exam(exam_type);
    let computed = compute(ctx, scope, class_entries)?;
    let summary = summarize(ctx.scale, student_id, ctx.term_id, &computed.results)?;
    let row = marklist_row(ctx, &computed, &summary);

    let subjects = computed
        .subjects
        .iter()
        .zip(row.cells)
        .filter_map(|(subject_id, cell)| {
            cell.map(|cell| StudentMarklistLine {
                subject_id: subject_id.clone(),
                cell,
            })
        })
        .collect();

    Ok(StudentMarklist {
        meta: ctx.meta(scope),
        student_id: student_id.to_string(),
        subjects,
        total_marks: row.total_marks,
        total_points: row.total_points,
        average_percentage: row.average_percentage,
        mean_grade_point: row.mean_grade_point,
        overall_grade: row.overall_grade,
        position: row.position,
        out_of: row.out_of,
    })
}

// ----- final report (whole term) -----

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalCell {
    pub opener: Option<f64>,
    pub midterm: Option<f64>,
    pub endterm: Option<f64>,
    pub final_percentage: f64,
    pub grade: String,
    pub points: i64,
    pub subject_position: Option<u32>,
    pub subject_out_of: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalRow {
    pub student_id: String,
    /// Aligned with `ClassFinalReport::subjects`.
    pub cells: Vec<Option<FinalCell>>,
    pub total_marks: f64,
    pub total_points: i64,
    pub average_percentage: Option<f64>,
    pub mean_grade_point: Option<f64>,
    pub overall_grade: Option<String>,
    pub overall_points: Option<i64>,
    pub subject_count: usize,
    pub position: Option<u32>,
    pub out_of: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassFinalReport {
    #[serde(flatten)]
    pub meta: ReportMeta,
    pub subjects: Vec<String>,
    pub rows: Vec<FinalRow>,
    pub subject_summaries: Vec<SubjectSummary>,
}

fn final_cell(computed: &Computed, student_id: &str, subject_id: &str) -> Option<FinalCell> {
    let r = computed
        .results
        .iter()
        .find(|r| r.student_id == student_id && r.subject_id == subject_id)?;
    let sp = subject_position_of(&computed.subject_positions, subject_id, student_id);
    Some(FinalCell {
        opener: r.breakdown.opener,
        midterm: r.breakdown.midterm,
        endterm: r.breakdown.endterm,
        final_percentage: r.final_percentage,
        grade: r.grade.clone(),
        points: r.points,
        subject_position: sp.map(|p| p.position),
        subject_out_of: sp.map(|p| p.out_of),
    })
}

fn final_row(
    ctx: &ReportContext<'_>,
    computed: &Computed,
    summary: &StudentTermSummary,
) -> FinalRow {
    let student_id = summary.student_id.as_str();
    let pos = position_of(&computed.positions, student_id);
    FinalRow {
        student_id: student_id.to_string(),
        cells: computed
            .subjects
            .iter()
            .map(|subject_id| final_cell(computed, student_id, subject_id))
            .collect(),
        total_marks: summary.total_marks,
        total_points: summary.total_points,
        average_percentage: summary.average_percentage,
        mean_grade_point: ctx.display_mean(summary.mean_grade_point),
        overall_grade: summary.overall_grade.clone(),
        overall_points: summary.overall_points,
        subject_count: summary.subject_count,
        position: pos.map(|p| p.position),
        out_of: computed.positions.len() as u32,
    }
}

pub fn class_final_report(
    ctx: &ReportContext<'_>,
    entries: &[RawMarkEntry],
) -> Result<ClassFinalReport, CalcError> {
    let computed = compute(ctx, RankScope::Final, entries)?;

    let mut rows: Vec<FinalRow> = computed
        .summaries
        .iter()
        .map(|s| final_row(ctx, &computed, s))
        .collect();
    row_order(&mut rows, |r| (r.position, r.student_id.clone()));

    Ok(ClassFinalReport {
        meta: ctx.meta(RankScope::Final),
        subject_summaries: subject_summaries(ctx, &computed)?,
        subjects: computed.subjects,
        rows,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFinalLine {
    pub subject_id: String,
    #[serde(flatten)]
    pub cell: FinalCell,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFinalReport {
    #[serde(flatten)]
    pub meta: ReportMeta,
    pub student_id: String,
    pub subjects: Vec<StudentFinalLine>,
    pub total_marks: f64,
    pub total_points: i64,
    pub average_percentage: Option<f64>,
    pub mean_grade_point: Option<f64>,
    pub overall_grade: Option<String>,
    pub overall_points: Option<i64>,
    pub position: Option<u32>,
    pub out_of: u32,
}

/// A report card for one student: rows are subjects, the position is taken
/// from the whole class.
pub fn student_final_report(
    ctx: &ReportContext<'_>,
    student_id: &str,
    class_entries: &[RawMarkEntry],
) -> Result<StudentFinalReport, CalcError> {
    let computed = compute(ctx, RankScope::Final, class_entries)?;
    let summary = summarize(ctx.scale, student_id, ctx.term_id, &computed.results)?;
    let row = final_row(ctx, &computed, &summary);

    let subjects = computed
        .subjects
        .iter()
        .zip(row.cells)
        .filter_map(|(subject_id, cell)| {
            cell.map(|cell| StudentFinalLine {
                subject_id: subject_id.clone(),
                cell,
            })
        })
        .collect();

    Ok(StudentFinalReport {
        meta: ctx.meta(RankScope::Final),
        student_id: student_id.to_string(),
        subjects,
        total_marks: row.total_marks,
        total_points: row.total_points,
        average_percentage: row.average_percentage,
        mean_grade_point: row.mean_grade_point,
        overall_grade: row.overall_grade,
        overall_points: row.overall_points,
        position: row.position,
        out_of: row.out_of,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::ExamWeights;

    fn raw(student: &str, subject: &str, exam: ExamType, marks: f64) -> RawMarkEntry {
        RawMarkEntry {
            student_id: student.to_string(),
            subject_id: subject.to_string(),
            class_id: "form3e".to_string(),
            term_id: "t2".to_string(),
            academic_year: "2024".to_string(),
            exam_type: exam,
            marks_obtained: marks,
            out_of: 100.0,
            comment: None,
            entered_by: "tch-9".to_string(),
        }
    }

    fn ctx<'a>(scale: &'a GradingScale, policy: &'a AssessmentPolicy) -> ReportContext<'a> {
        ReportContext {
            class_id: Some("form3e"),
            term_id: "t2",
            academic_year: None,
            scale,
            policy,
            generated_at: None,
        }
    }

    fn class_entries() -> Vec<RawMarkEntry> {
        vec![
            raw("amina", "math", ExamType::Opener, 70.0),
            raw("amina", "math", ExamType::Midterm, 65.0),
            raw("amina", "math", ExamType::Endterm, 80.0),
            raw("amina", "eng", ExamType::Endterm, 66.0),
            raw("brian", "math", ExamType::Opener, 40.0),
            raw("brian", "math", ExamType::Endterm, 50.0),
            raw("brian", "eng", ExamType::Midterm, 0.0),
            raw("chao", "eng", ExamType::Endterm, 90.0),
            // Other class, must not leak in.
            raw("dora", "math", ExamType::Endterm, 99.0),
        ]
        .into_iter()
        .map(|mut e| {
            if e.student_id == "dora" {
                e.class_id = "form3w".to_string();
            }
            e
        })
        .collect()
    }

    #[test]
    fn class_final_report_blends_and_ranks() {
        let scale = GradingScale::default();
        let policy = AssessmentPolicy::default();
        let report = class_final_report(&ctx(&scale, &policy), &class_entries()).expect("report");

        assert_eq!(report.subjects, vec!["eng".to_string(), "math".to_string()]);
        let order: Vec<(&str, Option<u32>)> = report
            .rows
            .iter()
            .map(|r| (r.student_id.as_str(), r.position))
            .collect();
        // chao: A(12) -> 12.0; amina: B(9) + B+(10) -> 9.5; brian: E(1) + C-(5) -> 3.0
        assert_eq!(
            order,
            vec![("chao", Some(1)), ("amina", Some(2)), ("brian", Some(3))]
        );
        assert!(report.rows.iter().all(|r| r.out_of == 3));

        let amina = &report.rows[1];
        let math = amina.cells[1].as_ref().expect("math cell");
        assert_eq!(math.final_percentage, 71.67);
        assert_eq!(math.grade, "B+");
        assert_eq!(amina.mean_grade_point, Some(9.5));
        assert_eq!(amina.overall_grade.as_deref(), Some("B+"));

        // chao sat no math: placeholder, not zero.
        assert!(report.rows[0].cells[1].is_none());
        // brian's 0 in English is a real zero.
        let brian_eng = report.rows[2].cells[0].as_ref().expect("eng cell");
        assert_eq!(brian_eng.midterm, Some(0.0));
        assert_eq!(brian_eng.opener, None);
    }

    #[test]
    fn marklist_is_scoped_to_one_sitting() {
        let scale = GradingScale::default();
        let policy = AssessmentPolicy::default();
        let list = class_marklist(&ctx(&scale, &policy), ExamType::Endterm, &class_entries())
            .expect("marklist");

        let ids: Vec<&str> = list.rows.iter().map(|r| r.student_id.as_str()).collect();
        // brian has no Endterm English, but Endterm math counts.
        assert_eq!(ids, vec!["chao", "amina", "brian"]);
        let amina = &list.rows[1];
        assert_eq!(amina.total_marks, 146.0);
        assert_eq!(amina.average_percentage, Some(73.0));
        assert_eq!(amina.position, Some(2));

        let eng = list
            .subject_summaries
            .iter()
            .find(|s| s.subject_id == "eng")
            .expect("eng summary");
        assert_eq!(eng.entry_count, 2);
        assert_eq!(eng.total, 156.0);
        assert_eq!(eng.mean, Some(78.0));
        assert_eq!(eng.position, Some(1));

        let json = serde_json::to_value(&list).expect("json");
        assert_eq!(json["examType"], "Endterm");
        assert!(json["rows"][2]["cells"][0].is_null());
    }

    #[test]
    fn student_report_uses_class_context() {
        let scale = GradingScale::default();
        let policy = AssessmentPolicy::default();
        let report = student_final_report(&ctx(&scale, &policy), "amina", &class_entries())
            .expect("report");
        assert_eq!(report.position, Some(2));
        assert_eq!(report.out_of, 3);
        assert_eq!(report.subjects.len(), 2);
        assert_eq!(report.subjects[1].subject_id, "math");
        assert_eq!(report.subjects[1].cell.subject_position, Some(1));
    }

    #[test]
    fn student_without_entries_gets_na() {
        let scale = GradingScale::default();
        let policy = AssessmentPolicy::default();
        let report = student_final_report(&ctx(&scale, &policy), "nobody", &class_entries())
            .expect("report");
        assert!(report.subjects.is_empty());
        assert_eq!(report.overall_grade, None);
        assert_eq!(report.position, None);
        assert_eq!(report.out_of, 3);

        let json = serde_json::to_value(&report).expect("json");
        assert!(json["overallGrade"].is_null());
    }

    #[test]
    fn unenrolled_student_reports_null_class() {
        let scale = GradingScale::default();
        let policy = AssessmentPolicy::default();
        let mut context = ctx(&scale, &policy);
        context.class_id = None;
        let report =
            student_final_report(&context, "amina", &class_entries()).expect("report");
        assert!(report.subjects.is_empty());
        assert_eq!(report.position, None);
        assert_eq!(report.out_of, 0);

        let json = serde_json::to_value(&report).expect("json");
        assert!(json["classId"].is_null());
        assert_eq!(json["studentId"], "amina");
    }

    #[test]
    fn student_marklist_lists_only_entered_subjects() {
        let scale = GradingScale::default();
        let policy = AssessmentPolicy::default();
        let list = student_marklist(
            &ctx(&scale, &policy),
            "brian",
            ExamType::Midterm,
            &class_entries(),
        )
        .expect("marklist");
        assert_eq!(list.subjects.len(), 1);
        assert_eq!(list.subjects[0].cell.marks_obtained, 0.0);
        assert_eq!(list.overall_grade.as_deref(), Some("E"));
        assert_eq!((list.position, list.out_of), (Some(2), 2));
    }

    #[test]
    fn mean_is_rounded_only_for_display() {
        let scale = GradingScale::default();
        let policy = AssessmentPolicy {
            weights: ExamWeights::default(),
            ranking_mode: RankingMode::Competition,
            mean_precision: 1,
        };
        let entries = vec![
            raw("a", "x", ExamType::Endterm, 82.0),
            raw("a", "y", ExamType::Endterm, 82.0),
            raw("a", "z", ExamType::Endterm, 1.0),
        ];
        let report = class_final_report(&ctx(&scale, &policy), &entries).expect("report");
        assert_eq!(report.rows[0].mean_grade_point, Some(8.3));
    }

    #[test]
    fn raising_a_mark_never_worsens_position() {
        let scale = GradingScale::default();
        let policy = AssessmentPolicy::default();
        let mut last = u32::MAX;
        for marks in (0..=100).step_by(5) {
            let mut entries = class_entries();
            entries.push(raw("brian", "eng", ExamType::Endterm, marks as f64));
            let report = student_final_report(&ctx(&scale, &policy), "brian", &entries)
                .expect("report");
            let pos = report.position.expect("ranked");
            assert!(pos <= last, "position worsened to {} at {}", pos, marks);
            last = pos;
        }
    }

    #[test]
    fn repeated_assembly_is_identical() {
        let scale = GradingScale::default();
        let policy = AssessmentPolicy::default();
        let a = class_final_report(&ctx(&scale, &policy), &class_entries()).expect("a");
        let b = class_final_report(&ctx(&scale, &policy), &class_entries()).expect("b");
        assert_eq!(
            serde_json::to_value(&a).expect("a json"),
            serde_json::to_value(&b).expect("b json")
        );
    }
}
