use std::sync::Arc;

use common::query::DimensionFilter;
use storage::Segment;
use storage::StarTree;
use tracing::debug;

use crate::context::QueryContext;
use crate::error::Result;
use crate::physical_plan::aggregate::AggregationInfo;
use crate::physical_plan::aggregate::AggregationOperator;
use crate::physical_plan::expressions::aggregate::AggregationFunction;
use crate::physical_plan::project::SegmentProjectOperator;
use crate::physical_plan::star_tree_project::StarTreeProjectOperator;

/// Whether the tree answers the query exactly: every function has its metric precomputed and
/// every filter is on a tree dimension.
pub fn is_fit_for_star_tree(
    tree: &StarTree,
    functions: &[Arc<dyn AggregationFunction>],
    filters: &[DimensionFilter],
) -> bool {
    let metrics_fit = functions.iter().all(|f| {
        f.star_tree_metric()
            .is_some_and(|metric| tree.metric_id(&metric).is_some())
    });
    let filters_fit = filters
        .iter()
        .all(|filter| tree.dimension_id(&filter.column).is_some());

    metrics_fit && filters_fit
}

/// First star-tree of the segment that fits the query, if star-trees are enabled.
pub fn select_star_tree(segment: &Segment, ctx: &QueryContext) -> Option<Arc<StarTree>> {
    if !ctx.options().use_star_tree {
        return None;
    }

    segment
        .star_trees()
        .iter()
        .find(|tree| is_fit_for_star_tree(tree, ctx.aggregation_functions(), ctx.filters()))
        .cloned()
}

pub fn build_aggregation_operator(
    ctx: Arc<QueryContext>,
    segment: &Segment,
) -> Result<AggregationOperator> {
    let columns = ctx.projected_columns();
    let filters = ctx.filters().to_vec();
    let batch_size = ctx.options().batch_size;

    let info = match select_star_tree(segment, &ctx) {
        Some(tree) => {
            debug!(segment = segment.name(), "aggregating with star-tree");
            let project =
                StarTreeProjectOperator::try_new(tree.clone(), columns, filters, batch_size)?;
            AggregationInfo::with_star_tree(Box::new(project), tree)
        }
        None => {
            debug!(segment = segment.name(), "aggregating with segment scan");
            let project = SegmentProjectOperator::try_new(segment, columns, filters, batch_size)?;
            AggregationInfo::new(Box::new(project))
        }
    };

    Ok(AggregationOperator::new(ctx, info, segment.num_docs()))
}

#[cfg(test)]
mod tests {
    use common::query::AggregateFunction;
    use common::query::FilterOperation;
    use storage::star_tree::MetricPair;
    use storage::star_tree::StarTreeConfig;
    use storage::test_util::segment_from_markdown;

    use super::*;
    use crate::context::QueryOptions;
    use crate::physical_plan::expressions::aggregate::create_aggregation_function;

    fn segment() -> Segment {
        let data = r#"
| country(i64) | device(i64) | revenue(f64) |
|--------------|-------------|--------------|
| 1            | 1           | 10           |
| 2            | 1           | 20           |
| 2            | 2           | 30           |
"#;
        let mut segment = segment_from_markdown("seg", data).unwrap();
        let cfg = StarTreeConfig::new(vec!["country".to_string()], vec![
            MetricPair::count_star(),
            MetricPair::with_column(AggregateFunction::Sum, "revenue"),
        ]);
        segment.build_star_tree(cfg).unwrap();
        segment
    }

    fn ctx(
        functions: Vec<(AggregateFunction, Option<&str>)>,
        filters: Vec<DimensionFilter>,
        use_star_tree: bool,
    ) -> Result<QueryContext> {
        let functions = functions
            .into_iter()
            .map(|(f, col)| create_aggregation_function(f, col.map(str::to_string)))
            .collect::<Result<Vec<_>>>()?;
        Ok(QueryContext::new(
            functions,
            filters,
            QueryOptions::default().with_star_tree(use_star_tree),
        ))
    }

    #[test]
    fn test_select() -> Result<()> {
        let segment = segment();
        let country = DimensionFilter::new("country", FilterOperation::Eq(2));
        let device = DimensionFilter::new("device", FilterOperation::Eq(2));

        let fits = ctx(
            vec![
                (AggregateFunction::Count, None),
                (AggregateFunction::Sum, Some("revenue")),
            ],
            vec![country.clone()],
            true,
        )?;
        assert!(select_star_tree(&segment, &fits).is_some());

        let disabled = ctx(vec![(AggregateFunction::Count, None)], vec![], false)?;
        assert!(select_star_tree(&segment, &disabled).is_none());

        let missing_metric = ctx(vec![(AggregateFunction::Max, Some("revenue"))], vec![], true)?;
        assert!(select_star_tree(&segment, &missing_metric).is_none());

        let distinct = ctx(
            vec![(AggregateFunction::DistinctCount, Some("revenue"))],
            vec![],
            true,
        )?;
        assert!(select_star_tree(&segment, &distinct).is_none());

        let not_dimension = ctx(vec![(AggregateFunction::Count, None)], vec![device], true)?;
        assert!(select_star_tree(&segment, &not_dimension).is_none());
        Ok(())
    }

    #[test]
    fn test_build_operator() -> Result<()> {
        let segment = segment();
        let with_tree = ctx(vec![(AggregateFunction::Count, None)], vec![], true)?;
        let op = build_aggregation_operator(Arc::new(with_tree), &segment)?;
        assert!(op.is_use_star_tree());
        assert_eq!(op.explain().children[0].name, "StarTreeProject");

        let scan = ctx(vec![(AggregateFunction::Count, None)], vec![], false)?;
        let op = build_aggregation_operator(Arc::new(scan), &segment)?;
        assert!(!op.is_use_star_tree());
        assert_eq!(op.explain().children[0].name, "Project");
        Ok(())
    }
}
