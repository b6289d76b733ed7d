// maximum number of documents a value block source puts into one block
pub const DEFAULT_BATCH_SIZE: usize = 10_000;
pub const DEFAULT_MAX_LEAF_RECORDS: usize = 10_000;

pub const METRIC_QUERY_AGGREGATION_TIME_SECONDS: &str = "query.aggregation_time_seconds";
pub const METRIC_QUERY_AGGREGATIONS_TOTAL: &str = "query.aggregations_total";
pub const METRIC_QUERY_DOCS_SCANNED_TOTAL: &str = "query.docs_scanned_total";
pub const METRIC_QUERY_STAR_TREE_NODES_TOTAL: &str = "query.star_tree_nodes_total";
pub const METRIC_QUERY_STAR_TREE_FALLBACK_LEAVES_TOTAL: &str =
    "query.star_tree_fallback_leaves_total";
pub const METRIC_STORE_STAR_TREE_BUILD_TIME_SECONDS: &str = "store.star_tree_build_time_seconds";
