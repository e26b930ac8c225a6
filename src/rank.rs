use crate::calc::{ExamType, FinalSubjectResult, RankingMode, StudentTermSummary};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Metric values closer than this are treated as tied.
const TIE_EPSILON: f64 = 1e-9;

/// Which sitting a table ranks: a single exam type or the blended term final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankScope {
    Exam(ExamType),
    Final,
}

impl RankScope {
    pub fn as_str(self) -> &'static str {
        match self {
            RankScope::Exam(t) => t.as_str(),
            RankScope::Final => "final",
        }
    }
}

impl Serialize for RankScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankKey {
    pub primary: f64,
    pub secondary: f64,
}

impl RankKey {
    fn ties_with(&self, other: &RankKey) -> bool {
        (self.primary - other.primary).abs() <= TIE_EPSILON
            && (self.secondary - other.secondary).abs() <= TIE_EPSILON
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub id: String,
    pub position: u32,
}

/// Orders candidates best first and numbers them.
///
/// Sort is descending on `primary`, then `secondary`, then ascending on id so
/// equal inputs always come out in the same order. Tied keys share a
/// position; the mode decides what the next distinct key gets.
pub fn assign_positions(mut items: Vec<(String, RankKey)>, mode: RankingMode) -> Vec<Placement> {
    items.sort_by(|(a_id, a), (b_id, b)| {
        b.primary
            .total_cmp(&a.primary)
            .then_with(|| b.secondary.total_cmp(&a.secondary))
            .then_with(|| a_id.cmp(b_id))
    });

    let mut out: Vec<Placement> = Vec::with_capacity(items.len());
    let mut prev: Option<(RankKey, u32)> = None;
    let mut distinct: u32 = 0;
    for (idx, (id, key)) in items.into_iter().enumerate() {
        let position = match prev {
            Some((prev_key, prev_pos)) if prev_key.ties_with(&key) => prev_pos,
            _ => {
                distinct += 1;
                match mode {
                    RankingMode::Competition => idx as u32 + 1,
                    RankingMode::Dense => distinct,
                }
            }
        };
        prev = Some((key, position));
        out.push(Placement { id, position });
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPosition {
    pub class_id: String,
    pub term_id: String,
    pub exam_type: RankScope,
    pub student_id: String,
    pub position: u32,
    pub out_of: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPosition {
    pub subject_id: String,
    pub student_id: String,
    pub position: u32,
    pub out_of: u32,
}

fn summary_key(scope: RankScope, s: &StudentTermSummary) -> Option<RankKey> {
    let primary = match scope {
        RankScope::Exam(_) => s.average_percentage?,
        RankScope::Final => s.mean_grade_point?,
    };
    Some(RankKey {
        primary,
        secondary: s.total_marks,
    })
}

/// Class positions for every student with at least one result. Students
/// without results are left out of both the table and `outOf`.
pub fn rank_class(
    class_id: &str,
    term_id: &str,
    scope: RankScope,
    summaries: &[StudentTermSummary],
    mode: RankingMode,
) -> Vec<ClassPosition> {
    let candidates: Vec<(String, RankKey)> = summaries
        .iter()
        .filter(|s| s.has_results())
        .filter_map(|s| summary_key(scope, s).map(|k| (s.student_id.clone(), k)))
        .collect();
    let out_of = candidates.len() as u32;

    assign_positions(candidates, mode)
        .into_iter()
        .map(|p| ClassPosition {
            class_id: class_id.to_string(),
            term_id: term_id.to_string(),
            exam_type: scope,
            student_id: p.id,
            position: p.position,
            out_of,
        })
        .collect()
}

/// Per-subject positions by `finalPercentage`, each subject ranked only among
/// the students who have a result for it. Ordered by subject, then position.
pub fn rank_subjects(results: &[FinalSubjectResult], mode: RankingMode) -> Vec<SubjectPosition> {
    let mut by_subject: BTreeMap<&str, Vec<(String, RankKey)>> = BTreeMap::new();
    for r in results {
        by_subject
            .entry(r.subject_id.as_str())
            .or_default()
            .push((
                r.student_id.clone(),
                RankKey {
                    primary: r.final_percentage,
                    secondary: 0.0,
                },
            ));
    }

    let mut out = Vec::new();
    for (subject_id, candidates) in by_subject {
        let out_of = candidates.len() as u32;
        for p in assign_positions(candidates, mode) {
            out.push(SubjectPosition {
                subject_id: subject_id.to_string(),
                student_id: p.id,
                position: p.position,
                out_of,
            });
        }
    }
    out
}

pub fn position_of<'a>(positions: &'a [ClassPosition], student_id: &str) -> Option<&'a ClassPosition> {
    positions.iter().find(|p| p.student_id == student_id)
}

pub fn subject_position_of<'a>(
    positions: &'a [SubjectPosition],
    subject_id: &str,
    student_id: &str,
) -> Option<&'a SubjectPosition> {
    positions
        .iter()
        .find(|p| p.subject_id == subject_id && p.student_id == student_id)
}

pub fn compare_positions(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
