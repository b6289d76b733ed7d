use std::sync::Arc;

use common::config;
use common::query::DimensionFilter;
use indexmap::IndexSet;

use crate::physical_plan::expressions::aggregate::AggregationFunction;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryOptions {
    /// Maximum number of documents per block handed to an executor.
    pub batch_size: usize,
    /// Allows the planner to pick a star-tree when one fits the query.
    pub use_star_tree: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::from(&config::Query::default())
    }
}

impl From<&config::Query> for QueryOptions {
    fn from(cfg: &config::Query) -> Self {
        Self {
            batch_size: cfg.batch_size,
            use_star_tree: cfg.use_star_tree,
        }
    }
}

impl QueryOptions {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_star_tree(mut self, use_star_tree: bool) -> Self {
        self.use_star_tree = use_star_tree;
        self
    }
}

/// Keyless aggregation query over a single segment: the aggregation functions in output order,
/// the conjunction of dimension filters, and execution options.
#[derive(Clone, Debug, Default)]
pub struct QueryContext {
    aggregation_functions: Vec<Arc<dyn AggregationFunction>>,
    filters: Vec<DimensionFilter>,
    options: QueryOptions,
}

impl QueryContext {
    pub fn new(
        aggregation_functions: Vec<Arc<dyn AggregationFunction>>,
        filters: Vec<DimensionFilter>,
        options: QueryOptions,
    ) -> Self {
        Self {
            aggregation_functions,
            filters,
            options,
        }
    }

    pub fn aggregation_functions(&self) -> &[Arc<dyn AggregationFunction>] {
        &self.aggregation_functions
    }

    pub fn filters(&self) -> &[DimensionFilter] {
        &self.filters
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Columns the aggregation functions read, deduplicated, in first-use order.
    pub fn projected_columns(&self) -> Vec<String> {
        self.aggregation_functions
            .iter()
            .filter_map(|f| f.column().map(str::to_string))
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use common::query::AggregateFunction;

    use super::*;
    use crate::physical_plan::expressions::aggregate::create_aggregation_function;

    #[test]
    fn test_projected_columns() -> crate::Result<()> {
        let ctx = QueryContext::new(
            vec![
                create_aggregation_function(AggregateFunction::Count, None)?,
                create_aggregation_function(AggregateFunction::Sum, Some("revenue".to_string()))?,
                create_aggregation_function(AggregateFunction::Max, Some("clicks".to_string()))?,
                create_aggregation_function(AggregateFunction::Avg, Some("revenue".to_string()))?,
            ],
            vec![],
            QueryOptions::default(),
        );

        assert_eq!(ctx.projected_columns(), vec![
            "revenue".to_string(),
            "clicks".to_string()
        ]);
        Ok(())
    }

    #[test]
    fn test_options_from_config() {
        let cfg = config::Query {
            batch_size: 16,
            use_star_tree: false,
        };
        let opts = QueryOptions::from(&cfg);
        assert_eq!(opts.batch_size, 16);
        assert!(!opts.use_star_tree);
        assert!(opts.with_star_tree(true).use_star_tree);
    }
}
