pub use context::QueryContext;
pub use context::QueryOptions;
pub use error::Result;
use common::types::METRIC_QUERY_AGGREGATIONS_TOTAL;
use common::types::METRIC_QUERY_AGGREGATION_TIME_SECONDS;
use common::types::METRIC_QUERY_DOCS_SCANNED_TOTAL;
use common::types::METRIC_QUERY_STAR_TREE_FALLBACK_LEAVES_TOTAL;
use common::types::METRIC_QUERY_STAR_TREE_NODES_TOTAL;
use common::types::METRIC_STORE_STAR_TREE_BUILD_TIME_SECONDS;
use metrics::describe_counter;
use metrics::describe_histogram;
use metrics::Unit;

pub mod context;
pub mod error;
pub mod physical_plan;

pub fn describe_metrics() {
    describe_histogram!(
        METRIC_QUERY_AGGREGATION_TIME_SECONDS,
        Unit::Seconds,
        "time to aggregate a single segment"
    );
    describe_counter!(
        METRIC_QUERY_AGGREGATIONS_TOTAL,
        Unit::Count,
        "number of segment aggregations"
    );
    describe_counter!(
        METRIC_QUERY_DOCS_SCANNED_TOTAL,
        Unit::Count,
        "documents scanned by aggregations, a pre-aggregated star-tree node counts as one"
    );
    describe_counter!(
        METRIC_QUERY_STAR_TREE_NODES_TOTAL,
        Unit::Count,
        "star-tree nodes merged from pre-aggregates"
    );
    describe_counter!(
        METRIC_QUERY_STAR_TREE_FALLBACK_LEAVES_TOTAL,
        Unit::Count,
        "star-tree leaves scanned document by document"
    );
    describe_histogram!(
        METRIC_STORE_STAR_TREE_BUILD_TIME_SECONDS,
        Unit::Seconds,
        "star-tree build time"
    );
}
