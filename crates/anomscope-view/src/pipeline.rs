use std::sync::Arc;

use anomscope_core::{AnomalyRecord, Dataset, DatasetId, SemanticRole};
use anomscope_source::{DataSource, LoadError, LoadOptions, load_dataset};
use serde::Serialize;

use crate::ViewError;
use crate::aggregate::{Focus, Kpis, SeriesPoint, TopLimit, method_subset, series, top_slice};
use crate::filter::{FilterState, filter_indices};
use crate::memo::{Memo, MemoStats};
use crate::options::FilterOptions;
use crate::schema::{AliasTable, ResolvedSchema};
use crate::sort::sort_indices_by_cost;
use crate::table::{DetailTable, detail_table};

/// Inputs the derived view depends on besides the dataset itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct ViewState {
    pub filters: FilterState,
    pub limit: TopLimit,
    pub focus: Focus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityChecks {
    pub loaded_records: usize,
    pub cost_field: String,
    pub context_columns: usize,
    pub context_columns_total: usize,
}

/// Everything a presentation layer needs for one view state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSnapshot {
    pub dataset_id: DatasetId,
    pub state: ViewState,
    pub schema: ResolvedSchema,
    pub cost_field: String,
    pub kpis: Kpis,
    pub filtered_count: usize,
    pub focus_count: usize,
    pub iqr_count: usize,
    pub z_count: usize,
    pub top: Vec<AnomalyRecord>,
    pub series: Vec<SeriesPoint>,
    pub table: DetailTable,
    pub quality: QualityChecks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewCacheStats {
    pub schema: MemoStats,
    pub options: MemoStats,
    pub ordered: MemoStats,
    pub focused: MemoStats,
    pub kpis: MemoStats,
}

/// Memoized derivations over one loaded dataset. Every stage is keyed by the
/// dataset fingerprint plus the part of the view state it reads, so changing
/// the limit alone never re-filters or re-sorts.
#[derive(Debug)]
pub struct AnomalyView {
    dataset: Dataset,
    aliases: AliasTable,
    schema: Memo<DatasetId, ResolvedSchema>,
    options: Memo<DatasetId, FilterOptions>,
    ordered: Memo<(DatasetId, FilterState), Vec<usize>>,
    focused: Memo<(DatasetId, FilterState, Focus), Vec<usize>>,
    kpis: Memo<DatasetId, Kpis>,
}

impl AnomalyView {
    pub fn new(dataset: Dataset, aliases: AliasTable) -> Self {
        Self {
            dataset,
            aliases,
            schema: Memo::new("schema"),
            options: Memo::new("options"),
            ordered: Memo::new("filter_sort"),
            focused: Memo::new("focus"),
            kpis: Memo::new("kpis"),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Swaps in a freshly loaded dataset; stale cache entries miss on the new id.
    pub fn replace_dataset(&mut self, dataset: Dataset) {
        self.dataset = dataset;
    }

    pub fn schema(&mut self) -> Arc<ResolvedSchema> {
        let dataset = &self.dataset;
        let aliases = &self.aliases;
        self.schema.get_or_compute(dataset.id().clone(), || {
            let schema = ResolvedSchema::resolve(dataset.records(), dataset.summary(), aliases);
            log_resolution(dataset, &schema);
            schema
        })
    }

    pub fn options(&mut self) -> Arc<FilterOptions> {
        let schema = self.schema();
        let dataset = &self.dataset;
        self.options.get_or_compute(dataset.id().clone(), || {
            FilterOptions::from_records(dataset.records(), &schema)
        })
    }

    pub fn kpis(&mut self) -> Arc<Kpis> {
        let dataset = &self.dataset;
        self.kpis.get_or_compute(dataset.id().clone(), || {
            Kpis::from_summary(dataset.summary(), dataset.len())
        })
    }

    /// Record indices passing `filters`, ordered by descending cost.
    pub fn ordered(&mut self, filters: &FilterState) -> Arc<Vec<usize>> {
        let schema = self.schema();
        let dataset = &self.dataset;
        self.ordered
            .get_or_compute((dataset.id().clone(), filters.clone()), || {
                let records = dataset.records();
                let filtered = filter_indices(records, &schema, filters);
                sort_indices_by_cost(records, &filtered, schema.cost_field())
            })
    }

    fn focused(&mut self, filters: &FilterState, focus: Focus) -> Arc<Vec<usize>> {
        let ordered = self.ordered(filters);
        let schema = self.schema();
        let dataset = &self.dataset;
        self.focused
            .get_or_compute((dataset.id().clone(), filters.clone(), focus), || {
                method_subset(dataset.records(), &ordered, schema.method_field(), focus)
            })
    }

    pub fn derive(&mut self, state: &ViewState) -> Result<ViewSnapshot, ViewError> {
        let schema = self.schema();
        let options = self.options();
        state.filters.validate(&schema, &options)?;

        let ordered = self.ordered(&state.filters);
        let focused = self.focused(&state.filters, state.focus);
        let kpis = self.kpis();

        let records = self.dataset.records();
        let iqr_count = method_subset(records, &ordered, schema.method_field(), Focus::Iqr).len();
        let z_count = method_subset(records, &ordered, schema.method_field(), Focus::Z).len();

        let slice: Vec<&AnomalyRecord> = top_slice(&focused, state.limit)
            .iter()
            .map(|index| &records[*index])
            .collect();

        Ok(ViewSnapshot {
            dataset_id: self.dataset.id().clone(),
            state: state.clone(),
            cost_field: schema.cost_field().to_owned(),
            kpis: (*kpis).clone(),
            filtered_count: ordered.len(),
            focus_count: focused.len(),
            iqr_count,
            z_count,
            series: series(slice.iter().copied(), schema.cost_field()),
            table: detail_table(slice.iter().copied(), &schema),
            top: slice.into_iter().cloned().collect(),
            quality: QualityChecks {
                loaded_records: records.len(),
                cost_field: schema.cost_field().to_owned(),
                context_columns: schema.context_coverage(),
                context_columns_total: crate::schema::CONTEXT_ROLES.len(),
            },
            schema: (*schema).clone(),
        })
    }

    pub fn cache_stats(&self) -> ViewCacheStats {
        ViewCacheStats {
            schema: self.schema.stats(),
            options: self.options.stats(),
            ordered: self.ordered.stats(),
            focused: self.focused.stats(),
            kpis: self.kpis.stats(),
        }
    }
}

fn log_resolution(dataset: &Dataset, schema: &ResolvedSchema) {
    for role in SemanticRole::ALL {
        match schema.field(role) {
            Some(field) => tracing::debug!(role = role.as_str(), field, "resolved field"),
            None => tracing::debug!(role = role.as_str(), "no matching field"),
        }
    }
    if schema.cost.is_none() && !dataset.is_empty() {
        tracing::warn!(
            fallback = schema.cost_field(),
            "no cost field matched the first record, sorting by fallback field"
        );
    }

    let missing_context: Vec<&str> = schema
        .unresolved_roles()
        .into_iter()
        .filter(|role| crate::schema::CONTEXT_ROLES.contains(role))
        .map(SemanticRole::as_str)
        .collect();
    if !missing_context.is_empty() && !dataset.is_empty() {
        tracing::warn!(
            roles = %missing_context.join(","),
            coverage = schema.context_coverage(),
            "context columns unresolved; their filters are disabled"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Loading,
    Ready,
    Failed,
}

#[derive(Debug)]
pub enum LoadState {
    Loading,
    Ready(Box<AnomalyView>),
    Failed(LoadError),
}

impl LoadState {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Loading => Phase::Loading,
            Self::Ready(_) => Phase::Ready,
            Self::Failed(_) => Phase::Failed,
        }
    }
}

/// Load sequence: `Loading` until both required resources arrive, then
/// `Ready`, or `Failed` if either of them cannot be fetched or decoded.
#[derive(Debug)]
pub struct Pipeline {
    aliases: AliasTable,
    state: LoadState,
}

impl Pipeline {
    pub fn new(aliases: AliasTable) -> Self {
        Self {
            aliases,
            state: LoadState::Loading,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Restarts from `Loading` and replaces any previous dataset wholesale.
    pub async fn load(&mut self, source: &dyn DataSource, options: LoadOptions) -> Phase {
        self.state = LoadState::Loading;
        self.state = match load_dataset(source, options).await {
            Ok(dataset) => {
                LoadState::Ready(Box::new(AnomalyView::new(dataset, self.aliases.clone())))
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load anomaly dataset");
                LoadState::Failed(err)
            }
        };
        self.phase()
    }

    pub fn view_mut(&mut self) -> Option<&mut AnomalyView> {
        match &mut self.state {
            LoadState::Ready(view) => Some(view.as_mut()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LoadError> {
        match &self.state {
            LoadState::Failed(err) => Some(err),
            _ => None,
        }
    }
}
