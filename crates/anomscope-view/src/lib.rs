mod aggregate;
mod filter;
mod memo;
mod options;
mod pipeline;
mod schema;
mod sort;
mod table;

use thiserror::Error;

pub use aggregate::{
    Focus, Kpis, SeriesPoint, TopLimit, is_iqr_method, is_z_method, method_subset, series,
    top_slice,
};
pub use filter::{FilterState, MethodFilter, Selection, filter_indices, filter_records};
pub use memo::{Memo, MemoStats};
pub use options::{CATEGORICAL_ROLES, FilterOptions, unique_values};
pub use pipeline::{
    AnomalyView, LoadState, Phase, Pipeline, QualityChecks, ViewCacheStats, ViewSnapshot,
    ViewState,
};
pub use schema::{AliasTable, CONTEXT_ROLES, ResolvedSchema, pick_key};
pub use sort::{MISSING_COST_KEY, cost_sort_key, sort_indices_by_cost, sort_records_by_cost};
pub use table::{DetailTable, TableColumn, detail_table};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("limit {0} is not one of 10, 20, 50, 100, 200")]
    InvalidLimit(u32),
    #[error("'{value}' is not a known {role} option")]
    UnknownOption { role: &'static str, value: String },
    #[error("{0} filter is unavailable: no matching field in this dataset")]
    FilterDisabled(&'static str),
}
