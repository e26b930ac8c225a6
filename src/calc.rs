use crate::grading::{clamp_percentage, GradingScale, ScaleError};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Half-away-from-zero rounding to `decimals` places.
pub fn round_off(x: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (x * factor).round() / factor
}

pub fn round_off_2_decimal(x: f64) -> f64 {
    round_off(x, 2)
}

#[derive(Debug, Clone, Serialize)]
pub struct CalcError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CalcError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<ScaleError> for CalcError {
    fn from(e: ScaleError) -> Self {
        CalcError::new(e.code(), e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ExamType {
    Opener,
    Midterm,
    Endterm,
}

impl ExamType {
    pub const ALL: [ExamType; 3] = [ExamType::Opener, ExamType::Midterm, ExamType::Endterm];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "opener" => Some(Self::Opener),
            "midterm" => Some(Self::Midterm),
            "endterm" => Some(Self::Endterm),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opener => "Opener",
            Self::Midterm => "Midterm",
            Self::Endterm => "Endterm",
        }
    }
}

/// Accepts any casing, same as request params.
impl<'de> Deserialize<'de> for ExamType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ExamType::parse(&raw).ok_or_else(|| {
            de::Error::unknown_variant(&raw, &["Opener", "Midterm", "Endterm"])
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMarkEntry {
    pub student_id: String,
    pub subject_id: String,
    pub class_id: String,
    pub term_id: String,
    pub academic_year: String,
    pub exam_type: ExamType,
    pub marks_obtained: f64,
    pub out_of: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub entered_by: String,
}

/// Ingestion gate for submitted marks. Entries that pass can be graded
/// without further checks.
pub fn validate_raw_mark(entry: &RawMarkEntry) -> Result<(), CalcError> {
    let ids = [
        ("studentId", &entry.student_id),
        ("subjectId", &entry.subject_id),
        ("classId", &entry.class_id),
        ("termId", &entry.term_id),
        ("academicYear", &entry.academic_year),
        ("enteredBy", &entry.entered_by),
    ];
    for (key, value) in ids {
        if value.trim().is_empty() {
            return Err(CalcError::new("bad_params", format!("{} must not be empty", key)));
        }
    }
    if !entry.marks_obtained.is_finite() || !entry.out_of.is_finite() {
        return Err(CalcError::new("bad_params", "marks must be finite numbers")
            .with_details(serde_json::json!({
                "marksObtained": entry.marks_obtained.to_string(),
                "outOf": entry.out_of.to_string(),
            })));
    }
    if entry.out_of <= 0.0 {
        return Err(CalcError::new("bad_params", "outOf must be > 0")
            .with_details(serde_json::json!({ "outOf": entry.out_of })));
    }
    if entry.marks_obtained < 0.0 {
        return Err(CalcError::new("bad_params", "negative marks are not allowed")
            .with_details(serde_json::json!({ "marksObtained": entry.marks_obtained })));
    }
    if entry.marks_obtained > entry.out_of {
        return Err(
            CalcError::new("bad_params", "marksObtained must not exceed outOf").with_details(
                serde_json::json!({
                    "marksObtained": entry.marks_obtained,
                    "outOf": entry.out_of,
                }),
            ),
        );
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedEntry {
    #[serde(flatten)]
    pub entry: RawMarkEntry,
    pub percentage: f64,
    pub grade: String,
    pub points: i64,
}

pub fn percentage_of(marks_obtained: f64, out_of: f64) -> f64 {
    if out_of <= 0.0 {
        return 0.0;
    }
    round_off_2_decimal(clamp_percentage(100.0 * marks_obtained / out_of))
}

pub fn grade_entry(scale: &GradingScale, entry: &RawMarkEntry) -> Result<GradedEntry, CalcError> {
    let percentage = percentage_of(entry.marks_obtained, entry.out_of);
    let g = scale.grade(percentage)?;
    Ok(GradedEntry {
        entry: entry.clone(),
        percentage,
        grade: g.grade,
        points: g.points,
    })
}

pub fn grade_entries(
    scale: &GradingScale,
    entries: &[RawMarkEntry],
) -> Result<Vec<GradedEntry>, CalcError> {
    entries.iter().map(|e| grade_entry(scale, e)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamWeights {
    pub opener: f64,
    pub midterm: f64,
    pub endterm: f64,
}

impl Default for ExamWeights {
    fn default() -> Self {
        Self {
            opener: 1.0,
            midterm: 1.0,
            endterm: 1.0,
        }
    }
}

impl ExamWeights {
    pub fn get(&self, exam_type: ExamType) -> f64 {
        match exam_type {
            ExamType::Opener => self.opener,
            ExamType::Midterm => self.midterm,
            ExamType::Endterm => self.endterm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingMode {
    /// 1, 1, 3, 4
    #[default]
    Competition,
    /// 1, 1, 2, 3
    Dense,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentPolicy {
    pub weights: ExamWeights,
    pub ranking_mode: RankingMode,
    pub mean_precision: u32,
}

impl Default for AssessmentPolicy {
    fn default() -> Self {
        Self {
            weights: ExamWeights::default(),
            ranking_mode: RankingMode::Competition,
            mean_precision: 2,
        }
    }
}

/// Per-exam percentages feeding a term final. `None` means the sitting was
/// not entered, which is different from a 0%.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    pub opener: Option<f64>,
    pub midterm: Option<f64>,
    pub endterm: Option<f64>,
}

impl Breakdown {
    pub fn get(&self, exam_type: ExamType) -> Option<f64> {
        match exam_type {
            ExamType::Opener => self.opener,
            ExamType::Midterm => self.midterm,
            ExamType::Endterm => self.endterm,
        }
    }

    fn set(&mut self, exam_type: ExamType, percentage: f64) {
        match exam_type {
            ExamType::Opener => self.opener = Some(percentage),
            ExamType::Midterm => self.midterm = Some(percentage),
            ExamType::Endterm => self.endterm = Some(percentage),
        }
    }

    /// Weighted mean over the sittings that are present. Falls back to equal
    /// weights when every present sitting carries weight 0.
    pub fn blend(&self, weights: &ExamWeights) -> Option<f64> {
        let present: Vec<(ExamType, f64)> = ExamType::ALL
            .iter()
            .filter_map(|t| self.get(*t).map(|p| (*t, p)))
            .collect();
        if present.is_empty() {
            return None;
        }

        let mut sum = 0.0_f64;
        let mut denom = 0.0_f64;
        for (t, p) in &present {
            let w = weights.get(*t);
            if w > 0.0 {
                sum += p * w;
                denom += w;
            }
        }
        if denom > 0.0 {
            return Some(sum / denom);
        }

        let equal: f64 = present.iter().map(|(_, p)| p).sum();
        Some(equal / present.len() as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalSubjectResult {
    pub student_id: String,
    pub subject_id: String,
    pub term_id: String,
    pub breakdown: Breakdown,
    pub final_percentage: f64,
    pub grade: String,
    pub points: i64,
}

/// Blends one student's graded sittings for one subject into a term final.
///
/// When a sitting appears more than once the later entry in `entries` wins.
/// Returns `Ok(None)` for an empty slice.
pub fn aggregate_subject(
    scale: &GradingScale,
    weights: &ExamWeights,
    entries: &[GradedEntry],
) -> Result<Option<FinalSubjectResult>, CalcError> {
    let Some(first) = entries.first() else {
        return Ok(None);
    };
    let key = (
        &first.entry.student_id,
        &first.entry.subject_id,
        &first.entry.term_id,
    );
    let mut breakdown = Breakdown::default();
    for e in entries {
        if (&e.entry.student_id, &e.entry.subject_id, &e.entry.term_id) != key {
            return Err(CalcError::new(
                "bad_params",
                "entries span more than one student/subject/term",
            )
            .with_details(serde_json::json!({
                "expected": [key.0, key.1, key.2],
                "found": [e.entry.student_id, e.entry.subject_id, e.entry.term_id],
            })));
        }
        breakdown.set(e.entry.exam_type, e.percentage);
    }

    let Some(blended) = breakdown.blend(weights) else {
        return Ok(None);
    };
    let final_percentage = round_off_2_decimal(clamp_percentage(blended));
    let g = scale.grade(final_percentage)?;

    Ok(Some(FinalSubjectResult {
        student_id: first.entry.student_id.clone(),
        subject_id: first.entry.subject_id.clone(),
        term_id: first.entry.term_id.clone(),
        breakdown,
        final_percentage,
        grade: g.grade,
        points: g.points,
    }))
}

/// Groups graded entries by student and subject and aggregates each group.
/// Output is ordered by `(studentId, subjectId)`.
pub fn aggregate_term(
    scale: &GradingScale,
    weights: &ExamWeights,
    entries: &[GradedEntry],
) -> Result<Vec<FinalSubjectResult>, CalcError> {
    let mut groups: BTreeMap<(String, String, String), Vec<GradedEntry>> = BTreeMap::new();
    for e in entries {
        groups
            .entry((
                e.entry.student_id.clone(),
                e.entry.subject_id.clone(),
                e.entry.term_id.clone(),
            ))
            .or_default()
            .push(e.clone());
    }

    let mut out = Vec::with_capacity(groups.len());
    for group in groups.values() {
        if let Some(result) = aggregate_subject(scale, weights, group)? {
            out.push(result);
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTermSummary {
    pub student_id: String,
    pub term_id: String,
    pub total_marks: f64,
    pub total_points: i64,
    pub average_percentage: Option<f64>,
    /// Unrounded; ranking and the overall grade both read this value.
    pub mean_grade_point: Option<f64>,
    pub overall_grade: Option<String>,
    pub overall_points: Option<i64>,
    pub subject_count: usize,
}

impl StudentTermSummary {
    pub fn has_results(&self) -> bool {
        self.subject_count > 0
    }
}

/// Folds one student's subject finals for a term. Results belonging to other
/// students are ignored.
pub fn summarize(
    scale: &GradingScale,
    student_id: &str,
    term_id: &str,
    results: &[FinalSubjectResult],
) -> Result<StudentTermSummary, CalcError> {
    let mine: Vec<&FinalSubjectResult> = results
        .iter()
        .filter(|r| r.student_id == student_id)
        .collect();

    if mine.is_empty() {
        return Ok(StudentTermSummary {
            student_id: student_id.to_string(),
            term_id: term_id.to_string(),
            total_marks: 0.0,
            total_points: 0,
            average_percentage: None,
            mean_grade_point: None,
            overall_grade: None,
            overall_points: None,
            subject_count: 0,
        });
    }

    let subject_count = mine.len();
    let total_marks: f64 = mine.iter().map(|r| r.final_percentage).sum();
    let total_points: i64 = mine.iter().map(|r| r.points).sum();
    let mean_grade_point = total_points as f64 / subject_count as f64;
    let overall = scale.grade_for_points(mean_grade_point)?;

    Ok(StudentTermSummary {
        student_id: student_id.to_string(),
        term_id: term_id.to_string(),
        total_marks: round_off_2_decimal(total_marks),
        total_points,
        average_percentage: Some(round_off_2_decimal(total_marks / subject_count as f64)),
        mean_grade_point: Some(mean_grade_point),
        overall_grade: Some(overall.grade),
        overall_points: Some(overall.points),
        subject_count,
    })
}

/// One summary per distinct student in `results`, ordered by student id.
pub fn summarize_all(
    scale: &GradingScale,
    term_id: &str,
    results: &[FinalSubjectResult],
) -> Result<Vec<StudentTermSummary>, CalcError> {
    let mut student_ids: Vec<&str> = results.iter().map(|r| r.student_id.as_str()).collect();
    student_ids.sort_unstable();
    student_ids.dedup();
    student_ids
        .into_iter()
        .map(|id| summarize(scale, id, term_id, results))
        .collect()
}
