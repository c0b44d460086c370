use anomscope_core::{
    AnomalyRecord, DEFAULT_TOP_LIMIT, SummaryRecord, TOP_LIMITS, field_text, format_value,
    to_number,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ViewError;

const ROWS_ALIASES: &[&str] = &["rows", "n_rows"];
const MEAN_ALIASES: &[&str] = &["cost_mean", "mean"];
const MEDIAN_ALIASES: &[&str] = &["cost_median", "median"];
const MAX_ALIASES: &[&str] = &["cost_max", "max"];
const IQR_UPPER_ALIASES: &[&str] = &["IQR_upper_bound", "iqr_upper_bound", "iqrUpper"];
const IQR_COUNT_ALIASES: &[&str] = &["IQR anomalies count", "iqr_anomalies_count", "iqr_count"];
const Z_COUNT_ALIASES: &[&str] = &[
    "Z-score anomalies count",
    "zscore_anomalies_count",
    "z_count",
];

/// Size of the top-N slice, restricted to the offered magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TopLimit(u32);

impl TopLimit {
    pub fn new(limit: u32) -> Result<Self, ViewError> {
        if TOP_LIMITS.contains(&limit) {
            Ok(Self(limit))
        } else {
            Err(ViewError::InvalidLimit(limit))
        }
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }

    pub fn all() -> impl Iterator<Item = TopLimit> {
        TOP_LIMITS.into_iter().map(Self)
    }
}

impl Default for TopLimit {
    fn default() -> Self {
        Self(DEFAULT_TOP_LIMIT)
    }
}

impl TryFrom<u32> for TopLimit {
    type Error = ViewError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TopLimit> for u32 {
    fn from(limit: TopLimit) -> Self {
        limit.0
    }
}

impl std::str::FromStr for TopLimit {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = value
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid limit '{}'", value.trim()))?;
        Self::new(parsed).map_err(|err| err.to_string())
    }
}

/// Which method subset of the filtered rows a view presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Focus {
    #[default]
    All,
    Iqr,
    Z,
}

impl Focus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Iqr => "iqr",
            Self::Z => "z",
        }
    }

    pub fn includes(self, method: &str) -> bool {
        match self {
            Self::All => true,
            Self::Iqr => is_iqr_method(method),
            Self::Z => is_z_method(method),
        }
    }
}

impl std::str::FromStr for Focus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "iqr" => Ok(Self::Iqr),
            "z" => Ok(Self::Z),
            other => Err(format!(
                "invalid focus '{other}', expected one of: all, iqr, z"
            )),
        }
    }
}

/// Exact match after uppercasing.
pub fn is_iqr_method(method: &str) -> bool {
    method.to_uppercase() == "IQR"
}

/// Substring match after uppercasing: "Z", "ZSCORE" and "z-score" all count.
/// Intentionally looser than [`is_iqr_method`].
pub fn is_z_method(method: &str) -> bool {
    method.to_uppercase().contains('Z')
}

pub fn method_subset(
    records: &[AnomalyRecord],
    indices: &[usize],
    method_field: &str,
    focus: Focus,
) -> Vec<usize> {
    if focus == Focus::All {
        return indices.to_vec();
    }
    indices
        .iter()
        .copied()
        .filter(|index| focus.includes(&field_text(&records[*index], method_field)))
        .collect()
}

/// First `limit` entries, or all of them when fewer exist.
pub fn top_slice<T>(sorted: &[T], limit: TopLimit) -> &[T] {
    &sorted[..sorted.len().min(limit.get())]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

/// Rank-labelled chart points. Costs that do not coerce plot as zero.
pub fn series<'a>(
    slice: impl IntoIterator<Item = &'a AnomalyRecord>,
    cost_field: &str,
) -> Vec<SeriesPoint> {
    slice
        .into_iter()
        .enumerate()
        .map(|(position, record)| SeriesPoint {
            label: format!("#{}", position + 1),
            value: to_number(record.get(cost_field)).unwrap_or(0.0),
        })
        .collect()
}

/// Headline statistics, each taken from the first summary alias present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub rows: Value,
    pub mean: Option<Value>,
    pub median: Option<Value>,
    pub max: Option<Value>,
    pub iqr_upper_bound: Option<Value>,
    pub iqr_count: Option<Value>,
    pub z_count: Option<Value>,
}

impl Kpis {
    /// Row count falls back to `record_count` when the summary has none.
    pub fn from_summary(summary: &SummaryRecord, record_count: usize) -> Self {
        let pick = |aliases: &[&str]| summary.first_present(aliases).cloned();
        Self {
            rows: pick(ROWS_ALIASES).unwrap_or_else(|| Value::from(record_count)),
            mean: pick(MEAN_ALIASES),
            median: pick(MEDIAN_ALIASES),
            max: pick(MAX_ALIASES),
            iqr_upper_bound: pick(IQR_UPPER_ALIASES),
            iqr_count: pick(IQR_COUNT_ALIASES),
            z_count: pick(Z_COUNT_ALIASES),
        }
    }

    /// Display label and formatted value per headline card.
    pub fn cards(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Rows", format_value(Some(&self.rows))),
            ("Mean", format_value(self.mean.as_ref())),
            ("Median", format_value(self.median.as_ref())),
            ("Max", format_value(self.max.as_ref())),
            (
                "IQR Upper Bound",
                format_value(self.iqr_upper_bound.as_ref()),
            ),
            (
                "Anomalies (IQR / Z)",
                format!(
                    "{} / {}",
                    format_value(self.iqr_count.as_ref()),
                    format_value(self.z_count.as_ref())
                ),
            ),
        ]
    }
}
