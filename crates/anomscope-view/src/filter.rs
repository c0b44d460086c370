use anomscope_core::{AnomalyRecord, SemanticRole, field_text};
use serde::{Deserialize, Serialize};

use crate::ViewError;
use crate::options::FilterOptions;
use crate::schema::ResolvedSchema;

const ALL_TOKEN: &str = "ALL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MethodFilter {
    #[default]
    All,
    Iqr,
    Z,
}

impl MethodFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => ALL_TOKEN,
            Self::Iqr => "IQR",
            Self::Z => "Z",
        }
    }

    /// Case-insensitive exact match on the record's method text.
    pub fn matches(self, method: &str) -> bool {
        match self {
            Self::All => true,
            selected => method.to_uppercase() == selected.as_str(),
        }
    }
}

impl std::str::FromStr for MethodFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(Self::All),
            "IQR" => Ok(Self::Iqr),
            "Z" => Ok(Self::Z),
            _ => Err(format!(
                "invalid method '{}', expected one of: all, iqr, z",
                value.trim()
            )),
        }
    }
}

/// A categorical selector: `All` bypasses the dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    #[default]
    All,
    Value(String),
}

impl Selection {
    pub fn from_option(value: Option<String>) -> Self {
        match value {
            Some(value) if value != ALL_TOKEN => Self::Value(value),
            _ => Self::All,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Value(value) => Some(value),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// Current filter selections. Active selectors combine with logical AND.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FilterState {
    pub method: MethodFilter,
    pub state: Selection,
    pub provider_type: Selection,
    pub place_of_service: Selection,
}

impl FilterState {
    pub fn selection(&self, role: SemanticRole) -> &Selection {
        const BYPASS: &Selection = &Selection::All;
        match role {
            SemanticRole::State => &self.state,
            SemanticRole::ProviderType => &self.provider_type,
            SemanticRole::PlaceOfService => &self.place_of_service,
            _ => BYPASS,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.method == MethodFilter::All
            && self.state.is_all()
            && self.provider_type.is_all()
            && self.place_of_service.is_all()
    }

    /// Rejects selections outside the option set of their role. A role with
    /// no resolved field accepts only `All`.
    pub fn validate(
        &self,
        schema: &ResolvedSchema,
        options: &FilterOptions,
    ) -> Result<(), ViewError> {
        for role in crate::options::CATEGORICAL_ROLES {
            let Some(value) = self.selection(role).value() else {
                continue;
            };
            if schema.field(role).is_none() {
                return Err(ViewError::FilterDisabled(role.as_str()));
            }
            if !options.for_role(role).iter().any(|option| option == value) {
                return Err(ViewError::UnknownOption {
                    role: role.as_str(),
                    value: value.to_owned(),
                });
            }
        }
        Ok(())
    }

    pub fn matches(&self, record: &AnomalyRecord, schema: &ResolvedSchema) -> bool {
        if self.method != MethodFilter::All
            && !self.method.matches(&field_text(record, schema.method_field()))
        {
            return false;
        }

        crate::options::CATEGORICAL_ROLES.into_iter().all(|role| {
            match (schema.field(role), self.selection(role).value()) {
                (Some(field), Some(expected)) => field_text(record, field) == expected,
                _ => true,
            }
        })
    }
}

/// Indices of records passing every active selector, in input order.
pub fn filter_indices(
    records: &[AnomalyRecord],
    schema: &ResolvedSchema,
    filters: &FilterState,
) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| filters.matches(record, schema))
        .map(|(index, _)| index)
        .collect()
}

pub fn filter_records<'a>(
    records: &'a [AnomalyRecord],
    schema: &ResolvedSchema,
    filters: &FilterState,
) -> Vec<&'a AnomalyRecord> {
    records
        .iter()
        .filter(|record| filters.matches(record, schema))
        .collect()
}
