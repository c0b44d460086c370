use anomscope_core::{AnomalyRecord, SemanticRole, display_cell, format_value};
use serde::Serialize;

use crate::schema::ResolvedSchema;

/// Context columns in display order; only resolved roles are shown.
const CONTEXT_COLUMNS: [SemanticRole; 6] = [
    SemanticRole::ProviderId,
    SemanticRole::State,
    SemanticRole::ProviderType,
    SemanticRole::PlaceOfService,
    SemanticRole::ProcedureCode,
    SemanticRole::ProcedureDescription,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableColumn {
    pub key: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DetailTable {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<Vec<String>>,
}

pub fn detail_table<'a>(
    slice: impl IntoIterator<Item = &'a AnomalyRecord>,
    schema: &ResolvedSchema,
) -> DetailTable {
    let context: Vec<(SemanticRole, &str)> = CONTEXT_COLUMNS
        .into_iter()
        .filter_map(|role| schema.field(role).map(|field| (role, field)))
        .collect();
    let cost_field = schema.cost_field();
    let method_field = schema.method_field();

    let mut columns = Vec::with_capacity(context.len() + 3);
    columns.push(TableColumn {
        key: "rank".to_owned(),
        title: "#".to_owned(),
    });
    for (role, _) in &context {
        columns.push(TableColumn {
            key: role.as_str().to_owned(),
            title: role.label().to_owned(),
        });
    }
    columns.push(TableColumn {
        key: SemanticRole::Cost.as_str().to_owned(),
        title: cost_field.to_owned(),
    });
    columns.push(TableColumn {
        key: SemanticRole::Method.as_str().to_owned(),
        title: SemanticRole::Method.label().to_owned(),
    });

    let rows = slice
        .into_iter()
        .enumerate()
        .map(|(position, record)| {
            let mut cells = Vec::with_capacity(columns.len());
            cells.push((position + 1).to_string());
            for (_, field) in &context {
                cells.push(display_cell(record.get(*field)));
            }
            cells.push(format_value(record.get(cost_field)));
            cells.push(display_cell(record.get(method_field)));
            cells
        })
        .collect();

    DetailTable { columns, rows }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn detail_table_shows_only_resolved_context_columns() {
        let schema = ResolvedSchema {
            cost: Some("avg_mdcr_pymt_amt".to_owned()),
            method: Some("anomaly_method".to_owned()),
            state: Some("state".to_owned()),
            procedure_code: Some("hcpcs_cd".to_owned()),
            ..ResolvedSchema::default()
        };
        let record = match json!({
            "avg_mdcr_pymt_amt": 12345.678,
            "anomaly_method": "IQR",
            "state": null,
            "hcpcs_cd": "99213"
        }) {
            Value::Object(fields) => fields,
            _ => unreachable!(),
        };

        let table = detail_table([&record], &schema);

        let titles: Vec<&str> = table.columns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["#", "State", "HCPCS", "avg_mdcr_pymt_amt", "Method"]
        );
        assert_eq!(table.rows, vec![vec!["1", "-", "99213", "12,345.68", "IQR"]]);
    }

    #[test]
    fn missing_method_renders_placeholder() {
        let schema = ResolvedSchema::default();
        let record = AnomalyRecord::new();

        let table = detail_table([&record], &schema);

        assert_eq!(table.columns.len(), 3);
        assert_eq!(table.rows[0], vec!["1", "-", "-"]);
    }
}
