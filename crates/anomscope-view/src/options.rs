use std::collections::BTreeSet;

use anomscope_core::{AnomalyRecord, SemanticRole, locale_compare, stringify};
use serde::Serialize;
use serde_json::Value;

use crate::schema::ResolvedSchema;

/// Roles that carry a categorical filter.
pub const CATEGORICAL_ROLES: [SemanticRole; 3] = [
    SemanticRole::State,
    SemanticRole::ProviderType,
    SemanticRole::PlaceOfService,
];

/// Distinct non-blank values of `field`, in locale order. An unresolved field
/// has no values.
pub fn unique_values(records: &[AnomalyRecord], field: Option<&str>) -> Vec<String> {
    let Some(field) = field else {
        return Vec::new();
    };

    let distinct: BTreeSet<String> = records
        .iter()
        .filter_map(|record| match record.get(field) {
            None | Some(Value::Null) => None,
            Some(value) => Some(stringify(value)),
        })
        .filter(|text| !text.trim().is_empty())
        .collect();

    let mut values: Vec<String> = distinct.into_iter().collect();
    values.sort_by(|left, right| locale_compare(left, right));
    values
}

/// Recognized choices for each categorical filter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FilterOptions {
    pub state: Vec<String>,
    pub provider_type: Vec<String>,
    pub place_of_service: Vec<String>,
}

impl FilterOptions {
    pub fn from_records(records: &[AnomalyRecord], schema: &ResolvedSchema) -> Self {
        Self {
            state: unique_values(records, schema.state.as_deref()),
            provider_type: unique_values(records, schema.provider_type.as_deref()),
            place_of_service: unique_values(records, schema.place_of_service.as_deref()),
        }
    }

    pub fn for_role(&self, role: SemanticRole) -> &[String] {
        match role {
            SemanticRole::State => &self.state,
            SemanticRole::ProviderType => &self.provider_type,
            SemanticRole::PlaceOfService => &self.place_of_service,
            _ => &[],
        }
    }
}
