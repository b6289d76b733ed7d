use std::sync::Arc;
use std::time::Instant;

use common::types::METRIC_QUERY_AGGREGATIONS_TOTAL;
use common::types::METRIC_QUERY_AGGREGATION_TIME_SECONDS;
use common::types::METRIC_QUERY_DOCS_SCANNED_TOTAL;
use metrics::counter;
use metrics::histogram;
use storage::StarTree;
use tracing::debug;

use crate::context::QueryContext;
use crate::error::QueryError;
use crate::error::Result;
use crate::physical_plan::executor::create_executor;
use crate::physical_plan::explain::to_upper_camel_case;
use crate::physical_plan::explain::ExplainNode;
use crate::physical_plan::expressions::aggregate::AggregationFunction;
use crate::physical_plan::results::AggregationResultsBlock;
use crate::physical_plan::ExecutionStatistics;
use crate::physical_plan::ProjectOperator;

const EXPLAIN_NAME: &str = "AGGREGATE";

/// Block source for an aggregation plus the star-tree it walks, if any.
#[derive(Debug)]
pub struct AggregationInfo {
    project_operator: Box<dyn ProjectOperator>,
    star_tree: Option<Arc<StarTree>>,
}

impl AggregationInfo {
    pub fn new(project_operator: Box<dyn ProjectOperator>) -> Self {
        Self {
            project_operator,
            star_tree: None,
        }
    }

    pub fn with_star_tree(project_operator: Box<dyn ProjectOperator>, tree: Arc<StarTree>) -> Self {
        Self {
            project_operator,
            star_tree: Some(tree),
        }
    }

    pub fn is_use_star_tree(&self) -> bool {
        self.star_tree.is_some()
    }
}

/// Aggregation without group-by over a single segment.
///
/// Single use: [AggregationOperator::next_block] drains the block source once and fails on any
/// further call.
#[derive(Debug)]
pub struct AggregationOperator {
    query_context: Arc<QueryContext>,
    aggregation_functions: Vec<Arc<dyn AggregationFunction>>,
    project_operator: Box<dyn ProjectOperator>,
    star_tree: Option<Arc<StarTree>>,
    num_total_docs: usize,
    num_docs_scanned: usize,
    is_consumed: bool,
}

impl AggregationOperator {
    pub fn new(
        query_context: Arc<QueryContext>,
        aggregation_info: AggregationInfo,
        num_total_docs: usize,
    ) -> Self {
        Self {
            aggregation_functions: query_context.aggregation_functions().to_vec(),
            query_context,
            project_operator: aggregation_info.project_operator,
            star_tree: aggregation_info.star_tree,
            num_total_docs,
            num_docs_scanned: 0,
            is_consumed: false,
        }
    }

    pub fn next_block(&mut self) -> Result<AggregationResultsBlock> {
        if self.is_consumed {
            return Err(QueryError::Execution(
                "aggregation operator has already produced its result".to_string(),
            ));
        }
        self.is_consumed = true;

        let start_time = Instant::now();
        let mut executor = create_executor(&self.aggregation_functions, self.star_tree.clone())?;
        let executor_name = executor.name();
        debug!(
            executor = executor_name,
            functions = self.aggregation_functions.len(),
            "aggregating segment"
        );

        while let Some(block) = self.project_operator.next_block()? {
            self.num_docs_scanned += block.num_docs();
            executor.aggregate(&block)?;
        }

        let results = executor.result();
        let elapsed = start_time.elapsed();
        debug!(
            executor = executor_name,
            docs_scanned = self.num_docs_scanned,
            total_docs = self.num_total_docs,
            ?elapsed,
            "segment aggregated"
        );
        histogram!(METRIC_QUERY_AGGREGATION_TIME_SECONDS, "executor" => executor_name)
            .record(elapsed);
        counter!(METRIC_QUERY_AGGREGATIONS_TOTAL, "executor" => executor_name).increment(1);
        counter!(METRIC_QUERY_DOCS_SCANNED_TOTAL).increment(self.num_docs_scanned as u64);

        AggregationResultsBlock::try_new(
            self.aggregation_functions.clone(),
            results,
            self.query_context.clone(),
        )
    }

    pub fn child_operators(&self) -> Vec<&dyn ProjectOperator> {
        vec![self.project_operator.as_ref()]
    }

    pub fn is_use_star_tree(&self) -> bool {
        self.star_tree.is_some()
    }

    pub fn execution_statistics(&self) -> ExecutionStatistics {
        let num_docs_scanned = self.num_docs_scanned as u64;
        let num_entries_scanned_in_filter = self
            .project_operator
            .execution_statistics()
            .num_entries_scanned_in_filter;
        let num_entries_scanned_post_filter =
            num_docs_scanned * self.project_operator.num_columns_projected() as u64;

        ExecutionStatistics::new(
            num_docs_scanned,
            num_entries_scanned_in_filter,
            num_entries_scanned_post_filter,
            self.num_total_docs as u64,
        )
    }

    fn aggregation_strings(&self) -> Vec<String> {
        self.aggregation_functions
            .iter()
            .map(|f| f.to_explain_string())
            .collect()
    }

    pub fn explain(&self) -> ExplainNode {
        let mut node = ExplainNode::new(to_upper_camel_case(EXPLAIN_NAME));
        let aggregations = self.aggregation_strings();
        if !aggregations.is_empty() {
            node = node.with_string_list("aggregations", aggregations);
        }

        node.with_child(self.project_operator.explain())
    }

    pub fn to_explain_string(&self) -> String {
        let aggregations = self.aggregation_strings();
        if aggregations.is_empty() {
            return EXPLAIN_NAME.to_string();
        }

        format!("{EXPLAIN_NAME}(aggregations:{})", aggregations.join(", "))
    }
}
