use std::collections::BTreeMap;

use anomscope_config::SchemaConfig;
use anomscope_core::{
    AnomalyRecord, COST_FALLBACK_FIELD, METHOD_FALLBACK_FIELD, SemanticRole, SummaryRecord,
};
use serde::{Deserialize, Serialize};

/// Roles counted by the context-coverage check.
pub const CONTEXT_ROLES: [SemanticRole; 4] = [
    SemanticRole::State,
    SemanticRole::ProviderType,
    SemanticRole::PlaceOfService,
    SemanticRole::ProcedureCode,
];

/// Ordered candidate field names per semantic role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    candidates: BTreeMap<SemanticRole, Vec<String>>,
}

impl AliasTable {
    pub fn builtin() -> Self {
        let candidates = SemanticRole::ALL
            .into_iter()
            .map(|role| {
                let names = role
                    .builtin_candidates()
                    .iter()
                    .map(|name| (*name).to_owned())
                    .collect();
                (role, names)
            })
            .collect();
        Self { candidates }
    }

    /// Built-in candidates followed by configured extras, duplicates dropped.
    pub fn with_config(config: &SchemaConfig) -> Self {
        let mut table = Self::builtin();
        for role in SemanticRole::ALL {
            let names = table.candidates.entry(role).or_default();
            for extra in config.extra_aliases(role) {
                if !names.contains(extra) {
                    names.push(extra.clone());
                }
            }
        }
        table
    }

    pub fn candidates(&self, role: SemanticRole) -> &[String] {
        self.candidates
            .get(&role)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// First candidate present as a key in `sample`. Presence counts even when the
/// value is null.
pub fn pick_key<'a, S: AsRef<str>>(
    sample: Option<&AnomalyRecord>,
    candidates: &'a [S],
) -> Option<&'a str> {
    let sample = sample?;
    candidates
        .iter()
        .map(AsRef::as_ref)
        .find(|candidate| sample.contains_key(*candidate))
}

/// Concrete field name per semantic role, resolved once per dataset from its
/// first record. Later records are assumed to share that key set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolvedSchema {
    pub cost: Option<String>,
    pub method: Option<String>,
    pub state: Option<String>,
    pub provider_type: Option<String>,
    pub place_of_service: Option<String>,
    pub procedure_code: Option<String>,
    pub procedure_description: Option<String>,
    pub provider_id: Option<String>,
}

impl ResolvedSchema {
    pub fn resolve(
        records: &[AnomalyRecord],
        summary: &SummaryRecord,
        aliases: &AliasTable,
    ) -> Self {
        let sample = records.first();
        let pick = |role| pick_key(sample, aliases.candidates(role)).map(str::to_owned);

        Self {
            cost: summary
                .cost_column()
                .map(str::to_owned)
                .or_else(|| pick(SemanticRole::Cost)),
            method: pick(SemanticRole::Method),
            state: pick(SemanticRole::State),
            provider_type: pick(SemanticRole::ProviderType),
            place_of_service: pick(SemanticRole::PlaceOfService),
            procedure_code: pick(SemanticRole::ProcedureCode),
            procedure_description: pick(SemanticRole::ProcedureDescription),
            provider_id: pick(SemanticRole::ProviderId),
        }
    }

    pub fn field(&self, role: SemanticRole) -> Option<&str> {
        let field = match role {
            SemanticRole::Cost => &self.cost,
            SemanticRole::Method => &self.method,
            SemanticRole::State => &self.state,
            SemanticRole::ProviderType => &self.provider_type,
            SemanticRole::PlaceOfService => &self.place_of_service,
            SemanticRole::ProcedureCode => &self.procedure_code,
            SemanticRole::ProcedureDescription => &self.procedure_description,
            SemanticRole::ProviderId => &self.provider_id,
        };
        field.as_deref()
    }

    /// Field used for ordering and charting.
    pub fn cost_field(&self) -> &str {
        self.cost.as_deref().unwrap_or(COST_FALLBACK_FIELD)
    }

    pub fn method_field(&self) -> &str {
        self.method.as_deref().unwrap_or(METHOD_FALLBACK_FIELD)
    }

    pub fn context_coverage(&self) -> usize {
        CONTEXT_ROLES
            .into_iter()
            .filter(|role| self.field(*role).is_some())
            .count()
    }

    pub fn unresolved_roles(&self) -> Vec<SemanticRole> {
        SemanticRole::ALL
            .into_iter()
            .filter(|role| self.field(*role).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn record(value: Value) -> AnomalyRecord {
        match value {
            Value::Object(fields) => fields,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn pick_key_returns_first_candidate_in_list_order() {
        let sample = record(json!({ "method": "Z", "anomaly_method": "IQR" }));
        let candidates = ["anomaly_method", "method", "flag"];

        assert_eq!(pick_key(Some(&sample), &candidates), Some("anomaly_method"));
    }

    #[test]
    fn pick_key_counts_null_values_as_present() {
        let sample = record(json!({ "hcpcs_code": null }));
        assert_eq!(
            pick_key(Some(&sample), &["hcpcs_cd", "hcpcs_code"]),
            Some("hcpcs_code")
        );
    }

    #[test]
    fn pick_key_without_sample_or_match_is_unresolved() {
        let sample = record(json!({ "other": 1 }));
        assert_eq!(pick_key(None, &["cost"]), None);
        assert_eq!(pick_key(Some(&sample), &["cost", "price"]), None);
        assert_eq!(pick_key::<&str>(Some(&sample), &[]), None);
    }

    #[test]
    fn resolve_uses_only_the_first_record() {
        let records = vec![
            record(json!({ "price_amt": 1, "state": "CA" })),
            record(json!({ "avg_mdcr_pymt_amt": 2, "provider_type": "Cardiology" })),
        ];

        let schema =
            ResolvedSchema::resolve(&records, &SummaryRecord::default(), &AliasTable::builtin());

        assert_eq!(schema.cost.as_deref(), Some("price_amt"));
        assert_eq!(schema.state.as_deref(), Some("state"));
        assert_eq!(schema.provider_type, None);
        assert_eq!(schema.context_coverage(), 1);
    }

    #[test]
    fn summary_cost_column_overrides_candidates() {
        let records = vec![record(json!({ "avg_mdcr_pymt_amt": 2, "custom_cost": 9 }))];
        let summary = SummaryRecord::from_value(json!({ "cost_column": "custom_cost" }));

        let schema = ResolvedSchema::resolve(&records, &summary, &AliasTable::builtin());

        assert_eq!(schema.cost_field(), "custom_cost");
    }

    #[test]
    fn empty_dataset_falls_back_to_default_fields() {
        let schema = ResolvedSchema::resolve(&[], &SummaryRecord::default(), &AliasTable::builtin());

        assert_eq!(schema.cost, None);
        assert_eq!(schema.cost_field(), COST_FALLBACK_FIELD);
        assert_eq!(schema.method_field(), METHOD_FALLBACK_FIELD);
        assert_eq!(schema.unresolved_roles().len(), SemanticRole::ALL.len());
    }

    #[test]
    fn configured_aliases_extend_builtin_candidates() {
        let mut config = SchemaConfig::default();
        config.aliases.insert(
            "cost".to_owned(),
            vec!["allowed_amount".to_owned(), "price_amt".to_owned()],
        );
        let table = AliasTable::with_config(&config);

        let cost = table.candidates(SemanticRole::Cost);
        assert_eq!(cost.last().map(String::as_str), Some("allowed_amount"));
        assert_eq!(
            cost.iter().filter(|name| name.as_str() == "price_amt").count(),
            1
        );

        let records = vec![record(json!({ "allowed_amount": 3 }))];
        let schema = ResolvedSchema::resolve(&records, &SummaryRecord::default(), &table);
        assert_eq!(schema.cost.as_deref(), Some("allowed_amount"));
    }
}
