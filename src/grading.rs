use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Tolerance used when checking that consecutive bands meet exactly.
const BAND_EDGE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingBand {
    pub min_percentage: f64,
    pub max_percentage: f64,
    pub grade: String,
    pub points: i64,
}

impl GradingBand {
    fn new(min_percentage: f64, max_percentage: f64, grade: &str, points: i64) -> Self {
        Self {
            min_percentage,
            max_percentage,
            grade: grade.to_string(),
            points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub grade: String,
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScaleError {
    #[error("grading scale has no bands")]
    Empty,
    #[error("band {index} has non-finite bounds")]
    NonFinite { index: usize },
    #[error("first band must start at 0 (starts at {0})")]
    BadStart(f64),
    #[error("last band must end at 100 (ends at {0})")]
    BadEnd(f64),
    #[error("band {index} is empty or inverted: [{min}, {max})")]
    Inverted { index: usize, min: f64, max: f64 },
    #[error("band {index} starts at {next_min} but the previous band ends at {prev_max}")]
    Discontinuous {
        index: usize,
        prev_max: f64,
        next_min: f64,
    },
    #[error("band {index} has an empty grade label")]
    EmptyGrade { index: usize },
    #[error("grade {0:?} appears in more than one band")]
    DuplicateGrade(String),
    #[error("points value {0} appears in more than one band")]
    DuplicatePoints(i64),
    #[error("no grading band covers {0}%")]
    NoBand(f64),
}

impl ScaleError {
    /// Lookup misses mean a stored scale broke its own partition; everything
    /// else is a rejected definition.
    pub fn code(&self) -> &'static str {
        match self {
            ScaleError::NoBand(_) => "scale_integrity",
            _ => "bad_params",
        }
    }
}

/// Ordered partition of `[0, 100]` into grade bands.
///
/// Constructed only through [`GradingScale::new`] (or deserialization, which
/// routes through it), so every instance satisfies the partition invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<GradingBand>", into = "Vec<GradingBand>")]
pub struct GradingScale {
    bands: Vec<GradingBand>,
}

impl TryFrom<Vec<GradingBand>> for GradingScale {
    type Error = ScaleError;

    fn try_from(bands: Vec<GradingBand>) -> Result<Self, Self::Error> {
        GradingScale::new(bands)
    }
}

impl From<GradingScale> for Vec<GradingBand> {
    fn from(scale: GradingScale) -> Self {
        scale.bands
    }
}

impl Default for GradingScale {
    fn default() -> Self {
        Self {
            bands: default_bands(),
        }
    }
}

/// 12-band E..A letter scale, points 1..12.
pub fn default_bands() -> Vec<GradingBand> {
    vec![
        GradingBand::new(0.0, 30.0, "E", 1),
        GradingBand::new(30.0, 35.0, "D-", 2),
        GradingBand::new(35.0, 40.0, "D", 3),
        GradingBand::new(40.0, 45.0, "D+", 4),
        GradingBand::new(45.0, 50.0, "C-", 5),
        GradingBand::new(50.0, 55.0, "C", 6),
        GradingBand::new(55.0, 60.0, "C+", 7),
        GradingBand::new(60.0, 65.0, "B-", 8),
        GradingBand::new(65.0, 70.0, "B", 9),
        GradingBand::new(70.0, 75.0, "B+", 10),
        GradingBand::new(75.0, 80.0, "A-", 11),
        GradingBand::new(80.0, 100.0, "A", 12),
    ]
}

/// Pulls a percentage into `[0, 100]`. NaN is treated as 0.
pub fn clamp_percentage(p: f64) -> f64 {
    if p.is_nan() {
        return 0.0;
    }
    p.clamp(0.0, 100.0)
}

impl GradingScale {
    pub fn new(mut bands: Vec<GradingBand>) -> Result<Self, ScaleError> {
        if bands.is_empty() {
            return Err(ScaleError::Empty);
        }
        for (index, b) in bands.iter().enumerate() {
            if !b.min_percentage.is_finite() || !b.max_percentage.is_finite() {
                return Err(ScaleError::NonFinite { index });
            }
        }
        bands.sort_by(|a, b| a.min_percentage.total_cmp(&b.min_percentage));

        let first = &bands[0];
        if first.min_percentage.abs() > BAND_EDGE_EPSILON {
            return Err(ScaleError::BadStart(first.min_percentage));
        }
        let last = &bands[bands.len() - 1];
        if (last.max_percentage - 100.0).abs() > BAND_EDGE_EPSILON {
            return Err(ScaleError::BadEnd(last.max_percentage));
        }

        let mut grades: Vec<String> = Vec::with_capacity(bands.len());
        let mut points: Vec<i64> = Vec::with_capacity(bands.len());
        for (index, b) in bands.iter().enumerate() {
            if b.max_percentage <= b.min_percentage {
                return Err(ScaleError::Inverted {
                    index,
                    min: b.min_percentage,
                    max: b.max_percentage,
                });
            }
            if index > 0 {
                let prev_max = bands[index - 1].max_percentage;
                if (prev_max - b.min_percentage).abs() > BAND_EDGE_EPSILON {
                    return Err(ScaleError::Discontinuous {
                        index,
                        prev_max,
                        next_min: b.min_percentage,
                    });
                }
            }
            let label = b.grade.trim();
            if label.is_empty() {
                return Err(ScaleError::EmptyGrade { index });
            }
            if grades.iter().any(|g| g == label) {
                return Err(ScaleError::DuplicateGrade(label.to_string()));
            }
            if points.contains(&b.points) {
                return Err(ScaleError::DuplicatePoints(b.points));
            }
            grades.push(label.to_string());
            points.push(b.points);
        }

        // Edges within tolerance are snapped so lookups, which compare
        // exactly, see a partition with no gaps.
        let last = bands.len() - 1;
        bands[0].min_percentage = 0.0;
        bands[last].max_percentage = 100.0;
        for i in 0..bands.len() {
            if i > 0 {
                bands[i].min_percentage = bands[i - 1].max_percentage;
            }
            bands[i].grade = bands[i].grade.trim().to_string();
        }
        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[GradingBand] {
        &self.bands
    }

    /// Looks up the band for `percentage` (clamped to `[0, 100]`).
    ///
    /// Bands are closed below and open above, except the last band which
    /// also includes its upper bound.
    pub fn grade(&self, percentage: f64) -> Result<Grade, ScaleError> {
        let p = clamp_percentage(percentage);
        let last = self.bands.len().saturating_sub(1);
        for (i, b) in self.bands.iter().enumerate() {
            let below_upper = if i == last {
                p <= b.max_percentage
            } else {
                p < b.max_percentage
            };
            if p >= b.min_percentage && below_upper {
                return Ok(Grade {
                    grade: b.grade.clone(),
                    points: b.points,
                });
            }
        }
        Err(ScaleError::NoBand(p))
    }

    /// Band whose points value is nearest to `points` rounded to an integer.
    /// Equidistant candidates resolve to the lower points value.
    pub fn grade_for_points(&self, points: f64) -> Result<Grade, ScaleError> {
        let target = points.round();
        self.bands
            .iter()
            .min_by(|a, b| {
                let da = (a.points as f64 - target).abs();
                let db = (b.points as f64 - target).abs();
                da.total_cmp(&db).then(a.points.cmp(&b.points))
            })
            .map(|b| Grade {
                grade: b.grade.clone(),
                points: b.points,
            })
            .ok_or(ScaleError::Empty)
    }

    /// SHA-256 over the canonical JSON band list, hex encoded.
    pub fn version(&self) -> String {
        // Bands are plain numbers and strings; serde_json only fails on
        // non-string map keys or a failing custom Serialize, so this is total.
        let bytes = serde_json::to_vec(&self.bands).unwrap_or_default();
        let digest = Sha256::digest(&bytes);
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
