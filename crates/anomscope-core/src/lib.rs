use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

mod text;
mod value;

pub use text::{field_text, locale_compare, stringify};
pub use value::{PLACEHOLDER, display_cell, format_number, format_value, to_number};

/// One row of detector output. Keys vary by export; values are JSON scalars.
pub type AnomalyRecord = Map<String, Value>;

pub const COST_FALLBACK_FIELD: &str = "price_amt";
pub const METHOD_FALLBACK_FIELD: &str = "anomaly_method";
pub const COST_COLUMN_KEY: &str = "cost_column";

/// Top-N slice sizes offered to viewers.
pub const TOP_LIMITS: [u32; 5] = [10, 20, 50, 100, 200];
pub const DEFAULT_TOP_LIMIT: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(rename_all = "snake_case")]
pub enum SemanticRole {
    Cost,
    Method,
    State,
    ProviderType,
    PlaceOfService,
    ProcedureCode,
    ProcedureDescription,
    ProviderId,
}

impl SemanticRole {
    pub const ALL: [SemanticRole; 8] = [
        Self::Cost,
        Self::Method,
        Self::State,
        Self::ProviderType,
        Self::PlaceOfService,
        Self::ProcedureCode,
        Self::ProcedureDescription,
        Self::ProviderId,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cost => "cost",
            Self::Method => "method",
            Self::State => "state",
            Self::ProviderType => "provider_type",
            Self::PlaceOfService => "place_of_service",
            Self::ProcedureCode => "procedure_code",
            Self::ProcedureDescription => "procedure_description",
            Self::ProviderId => "provider_id",
        }
    }

    /// Column heading used by tabular views.
    pub fn label(self) -> &'static str {
        match self {
            Self::Cost => "Cost",
            Self::Method => "Method",
            Self::State => "State",
            Self::ProviderType => "Provider Type",
            Self::PlaceOfService => "Place of Service",
            Self::ProcedureCode => "HCPCS",
            Self::ProcedureDescription => "HCPCS Description",
            Self::ProviderId => "NPI",
        }
    }

    /// Ordered field-name aliases; earlier entries win.
    pub fn builtin_candidates(self) -> &'static [&'static str] {
        match self {
            Self::Cost => &[
                "avg_mdcr_pymt_amt",
                "avg_mdcr_stdzd_amt",
                "avg_mdcr_alowd_amt",
                "avg_sbmtd_chrg_amt",
                "price_amt",
            ],
            Self::Method => &["anomaly_method", "method", "flag"],
            Self::State => &["rndrng_prvdr_state_abrvtn", "state", "provider_state"],
            Self::ProviderType => &["rndrng_prvdr_type", "provider_type"],
            Self::PlaceOfService => &[
                "place_of_srvc_label",
                "place_of_srvc",
                "pos",
                "place_of_service",
            ],
            Self::ProcedureCode => &["hcpcs_cd", "hcpcs_code"],
            Self::ProcedureDescription => &["hcpcs_desc", "hcpcs_description"],
            Self::ProviderId => &["rndrng_npi", "npi"],
        }
    }
}

impl std::str::FromStr for SemanticRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "cost" => Ok(Self::Cost),
            "method" => Ok(Self::Method),
            "state" => Ok(Self::State),
            "provider_type" => Ok(Self::ProviderType),
            "place_of_service" => Ok(Self::PlaceOfService),
            "procedure_code" => Ok(Self::ProcedureCode),
            "procedure_description" => Ok(Self::ProcedureDescription),
            "provider_id" => Ok(Self::ProviderId),
            other => Err(format!(
                "invalid semantic role '{other}', expected one of: cost, method, state, \
                 provider_type, place_of_service, procedure_code, procedure_description, provider_id"
            )),
        }
    }
}

/// Aggregate statistics exported next to the anomaly rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummaryRecord(Map<String, Value>);

impl SummaryRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Non-object payloads carry no statistics.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self(fields),
            _ => Self::default(),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// First alias holding a non-null value.
    pub fn first_present(&self, aliases: &[&str]) -> Option<&Value> {
        aliases
            .iter()
            .filter_map(|alias| self.0.get(*alias))
            .find(|value| !value.is_null())
    }

    /// Cost column the exporter declared, if any.
    pub fn cost_column(&self) -> Option<&str> {
        self.0
            .get(COST_COLUMN_KEY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// Result of fetching the optional grouped-statistics resource.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GroupOutcome {
    Present(Value),
    #[default]
    Absent,
}

impl GroupOutcome {
    pub fn from_value(value: Value) -> Self {
        if value.is_null() {
            Self::Absent
        } else {
            Self::Present(value)
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }

    pub fn pretty(&self) -> Option<String> {
        self.as_value()
            .map(|value| serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable snapshot of one load. Replaced wholesale, never mutated.
#[derive(Debug, Clone)]
pub struct Dataset {
    id: DatasetId,
    records: Arc<[AnomalyRecord]>,
    summary: Arc<SummaryRecord>,
    groups: Arc<GroupOutcome>,
}

impl Dataset {
    pub fn new(records: Vec<AnomalyRecord>, summary: SummaryRecord, groups: GroupOutcome) -> Self {
        let id = dataset_fingerprint(&records, &summary);
        Self {
            id,
            records: records.into(),
            summary: Arc::new(summary),
            groups: Arc::new(groups),
        }
    }

    pub fn id(&self) -> &DatasetId {
        &self.id
    }

    pub fn records(&self) -> &[AnomalyRecord] {
        &self.records
    }

    pub fn summary(&self) -> &SummaryRecord {
        &self.summary
    }

    pub fn groups(&self) -> &GroupOutcome {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Anomalies payloads that are not arrays load as empty; non-object rows
/// become records with no fields.
pub fn records_from_value(value: Value) -> Vec<AnomalyRecord> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(fields) => fields,
                _ => AnomalyRecord::new(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub fn dataset_fingerprint(records: &[AnomalyRecord], summary: &SummaryRecord) -> DatasetId {
    let mut hasher = blake3::Hasher::new();
    for record in records {
        // Serializing string-keyed JSON maps cannot fail.
        let _ = serde_json::to_writer(&mut hasher, record);
        hasher.update(b"\n");
    }
    hasher.update(b"\x1e");
    let _ = serde_json::to_writer(&mut hasher, summary);
    DatasetId(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> AnomalyRecord {
        match value {
            Value::Object(fields) => fields,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn semantic_role_round_trips_through_str() {
        for role in SemanticRole::ALL {
            let parsed: SemanticRole = role.as_str().parse().expect("parse role");
            assert_eq!(parsed, role);
        }
        assert!("zip".parse::<SemanticRole>().is_err());
    }

    #[test]
    fn summary_first_present_skips_missing_and_null_aliases() {
        let summary = SummaryRecord::from_value(json!({
            "cost_mean": null,
            "mean": 12.5,
            "median": 3
        }));

        assert_eq!(
            summary.first_present(&["cost_mean", "mean"]),
            Some(&json!(12.5))
        );
        assert_eq!(summary.first_present(&["cost_max", "max"]), None);
    }

    #[test]
    fn summary_from_non_object_is_empty() {
        let summary = SummaryRecord::from_value(json!([1, 2, 3]));
        assert!(summary.fields().is_empty());
        assert_eq!(summary.cost_column(), None);
    }

    #[test]
    fn cost_column_ignores_blank_strings() {
        let blank = SummaryRecord::from_value(json!({ "cost_column": "  " }));
        assert_eq!(blank.cost_column(), None);

        let declared = SummaryRecord::from_value(json!({ "cost_column": "avg_mdcr_alowd_amt" }));
        assert_eq!(declared.cost_column(), Some("avg_mdcr_alowd_amt"));
    }

    #[test]
    fn group_outcome_treats_null_as_absent() {
        assert_eq!(GroupOutcome::from_value(Value::Null), GroupOutcome::Absent);
        let present = GroupOutcome::from_value(json!({ "top_iqr_groups": [] }));
        assert!(present.is_present());
        assert!(present.pretty().expect("pretty").contains("top_iqr_groups"));
    }

    #[test]
    fn records_from_value_normalizes_non_arrays_and_rows() {
        assert!(records_from_value(json!({ "rows": 3 })).is_empty());
        assert!(records_from_value(Value::Null).is_empty());

        let rows = records_from_value(json!([{ "cost": 1 }, 7, { "cost": 2 }]));
        assert_eq!(rows.len(), 3);
        assert!(rows[1].is_empty());
    }

    #[test]
    fn dataset_fingerprint_tracks_content() {
        let first = Dataset::new(
            vec![record(json!({ "cost": 10 }))],
            SummaryRecord::default(),
            GroupOutcome::Absent,
        );
        let same = Dataset::new(
            vec![record(json!({ "cost": 10 }))],
            SummaryRecord::default(),
            GroupOutcome::Absent,
        );
        let changed = Dataset::new(
            vec![record(json!({ "cost": 11 }))],
            SummaryRecord::default(),
            GroupOutcome::Absent,
        );

        assert_eq!(first.id(), same.id());
        assert_ne!(first.id(), changed.id());
        assert_eq!(first.id().short().len(), 12);
    }
}
