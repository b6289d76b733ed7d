use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::array::Int64Array;
use arrow::datatypes::DataType;
use arrow::datatypes::Field;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use common::query::AggregateFunction;
use common::query::Bound;
use common::query::DimensionFilter;
use common::query::FilterOperation;
use datafusion_common::ScalarValue;
use query::error::QueryError;
use query::physical_plan::planner::build_aggregation_operator;
use query::physical_plan::expressions::aggregate::create_aggregation_function;
use query::physical_plan::ExecutionStatistics;
use query::QueryContext;
use query::QueryOptions;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use storage::star_tree::MetricPair;
use storage::star_tree::NodeId;
use storage::star_tree::NodeValue;
use storage::star_tree::PartialAggregate;
use storage::star_tree::StarTreeConfig;
use storage::star_tree::StarTreeNode;
use storage::test_util::segment_from_markdown;
use storage::Segment;
use storage::StarTree;
use tracing_test::traced_test;

fn context(
    functions: &[(AggregateFunction, Option<&str>)],
    filters: Vec<DimensionFilter>,
    options: QueryOptions,
) -> anyhow::Result<Arc<QueryContext>> {
    let functions = functions
        .iter()
        .map(|(f, col)| create_aggregation_function(*f, col.map(str::to_string)))
        .collect::<query::Result<Vec<_>>>()?;

    Ok(Arc::new(QueryContext::new(functions, filters, options)))
}

fn run(segment: &Segment, ctx: Arc<QueryContext>) -> anyhow::Result<Vec<ScalarValue>> {
    let mut op = build_aggregation_operator(ctx, segment)?;
    Ok(op.next_block()?.final_results()?)
}

fn three_docs() -> anyhow::Result<Segment> {
    let data = r#"
| country(i64) | clicks(i64) |
|--------------|-------------|
| 1            | 10          |
| 2            | 20          |
| 2            | 30          |
"#;
    segment_from_markdown("three", data)
}

#[traced_test]
#[test]
fn test_scan_count() -> anyhow::Result<()> {
    let segment = three_docs()?;
    let ctx = context(
        &[(AggregateFunction::Count, Some("clicks"))],
        vec![],
        QueryOptions::default(),
    )?;
    let mut op = build_aggregation_operator(ctx, &segment)?;
    assert!(!op.is_use_star_tree());

    let res = op.next_block()?;
    assert_eq!(res.final_results()?, vec![ScalarValue::Int64(Some(3))]);
    assert_eq!(op.execution_statistics(), ExecutionStatistics::new(3, 0, 3, 3));
    Ok(())
}

#[traced_test]
#[test]
fn test_star_tree_root_count() -> anyhow::Result<()> {
    let mut segment = three_docs()?;
    segment.build_star_tree(StarTreeConfig::new(vec!["country".to_string()], vec![
        MetricPair::count_star(),
    ]))?;
    let ctx = context(
        &[(AggregateFunction::Count, None)],
        vec![],
        QueryOptions::default(),
    )?;
    let mut op = build_aggregation_operator(ctx, &segment)?;
    assert!(op.is_use_star_tree());

    let res = op.next_block()?;
    assert_eq!(res.final_results()?, vec![ScalarValue::Int64(Some(3))]);
    // one node merge, no documents
    assert_eq!(op.execution_statistics(), ExecutionStatistics::new(1, 0, 0, 3));
    Ok(())
}

const METRIC_FUNCTIONS: [(AggregateFunction, Option<&str>); 6] = [
    (AggregateFunction::Count, None),
    (AggregateFunction::Count, Some("m")),
    (AggregateFunction::Sum, Some("m")),
    (AggregateFunction::Min, Some("m")),
    (AggregateFunction::Max, Some("m")),
    (AggregateFunction::Avg, Some("m")),
];

fn random_documents(rng: &mut StdRng, rows: usize) -> anyhow::Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("a", DataType::Int64, false),
        Field::new("b", DataType::Int64, false),
        Field::new("c", DataType::Int64, false),
        Field::new("m", DataType::Int64, true),
    ]));
    let dim = |rng: &mut StdRng, card: i64| -> ArrayRef {
        Arc::new(Int64Array::from(
            (0..rows).map(|_| rng.gen_range(0..card)).collect::<Vec<_>>(),
        ))
    };
    let a = dim(&mut *rng, 5);
    let b = dim(&mut *rng, 4);
    let c = dim(&mut *rng, 3);
    // integer metric values keep float sums exact in any order
    let m: ArrayRef = Arc::new(Int64Array::from(
        (0..rows)
            .map(|_| rng.gen_bool(0.9).then(|| rng.gen_range(-100..1000)))
            .collect::<Vec<_>>(),
    ));

    Ok(RecordBatch::try_new(schema, vec![a, b, c, m])?)
}

fn random_filters(rng: &mut StdRng) -> Vec<DimensionFilter> {
    let mut filters = vec![];
    for (col, card) in [("a", 5), ("b", 4), ("c", 3)] {
        let op = match rng.gen_range(0..6) {
            0 => FilterOperation::Eq(rng.gen_range(0..card)),
            1 => FilterOperation::NotEq(rng.gen_range(0..card)),
            2 => FilterOperation::In(vec![rng.gen_range(0..card), rng.gen_range(0..card)]),
            3 => FilterOperation::NotIn(vec![rng.gen_range(0..card)]),
            4 => FilterOperation::Range {
                lower: Some(Bound::inclusive(1)),
                upper: Some(Bound::exclusive(card)),
            },
            _ => continue,
        };
        filters.push(DimensionFilter::new(col, op));
    }

    filters
}

#[traced_test]
#[test]
fn test_cross_strategy_equivalence() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    let metrics = METRIC_FUNCTIONS
        .iter()
        .map(|(f, col)| MetricPair::new(*f, col.map(str::to_string)))
        .collect::<Vec<_>>();
    let dims = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let configs = vec![
        StarTreeConfig::new(dims.clone(), metrics.clone()).with_max_leaf_records(1),
        StarTreeConfig::new(dims.clone(), metrics.clone()).with_max_leaf_records(16),
        StarTreeConfig::new(dims.clone(), metrics.clone())
            .with_max_leaf_records(4)
            .with_skip_star_node_creation(vec!["a".to_string(), "c".to_string()]),
    ];

    for (i, cfg) in configs.into_iter().enumerate() {
        let docs = random_documents(&mut rng, 500)?;
        let mut segment = Segment::new(format!("random_{i}"), docs);
        segment.build_star_tree(cfg)?;

        for _ in 0..20 {
            let filters = random_filters(&mut rng);
            let batch_size = rng.gen_range(1..64);
            let options = QueryOptions::default().with_batch_size(batch_size);

            let scan_ctx = context(
                &METRIC_FUNCTIONS,
                filters.clone(),
                options.clone().with_star_tree(false),
            )?;
            let tree_ctx = context(&METRIC_FUNCTIONS, filters.clone(), options)?;

            let mut tree_op = build_aggregation_operator(tree_ctx, &segment)?;
            assert!(tree_op.is_use_star_tree());
            let expected = run(&segment, scan_ctx)?;
            let actual = tree_op.next_block()?.final_results()?;
            assert_eq!(actual, expected, "segment {i}, filters {filters:?}");
        }
    }

    Ok(())
}

fn synthetic_tree_segment() -> anyhow::Result<Segment> {
    let data = r#"
| d(i64) | v(i64) |
|--------|--------|
| 1      | 1      |
| 1      | 2      |
| 2      | 3      |
"#;
    let segment = segment_from_markdown("synthetic", data)?;
    let node = |level, value, start_doc, end_doc, count, sum, children| StarTreeNode {
        level,
        value,
        start_doc,
        end_doc,
        aggregates: vec![PartialAggregate::Count(count), PartialAggregate::Sum(sum)],
        children,
        star_child: None,
    };
    // root and its children cover the same documents
    let nodes = vec![
        node(0, NodeValue::Root, 0, 3, 3, 6., vec![NodeId(1), NodeId(2)]),
        node(1, NodeValue::Value(1), 0, 2, 2, 3., vec![]),
        node(1, NodeValue::Value(2), 2, 3, 1, 3., vec![]),
    ];
    let tree = StarTree::from_parts(
        vec!["d".to_string()],
        vec![
            MetricPair::count_star(),
            MetricPair::new(AggregateFunction::Sum, Some("v".to_string())),
        ],
        nodes,
        segment.documents().clone(),
    );

    Ok(segment.with_star_tree(tree))
}

#[traced_test]
#[test]
fn test_no_double_counting() -> anyhow::Result<()> {
    let segment = synthetic_tree_segment()?;
    let functions = [
        (AggregateFunction::Count, None),
        (AggregateFunction::Sum, Some("v")),
    ];
    let cases = vec![
        vec![],
        vec![DimensionFilter::new("d", FilterOperation::In(vec![1, 2]))],
        vec![DimensionFilter::new("d", FilterOperation::Eq(2))],
    ];

    for filters in cases {
        let expected = run(
            &segment,
            context(
                &functions,
                filters.clone(),
                QueryOptions::default().with_star_tree(false),
            )?,
        )?;
        let actual = run(
            &segment,
            context(&functions, filters.clone(), QueryOptions::default())?,
        )?;
        assert_eq!(actual, expected, "filters {filters:?}");
    }

    Ok(())
}

#[traced_test]
#[test]
fn test_order_preservation() -> anyhow::Result<()> {
    let segment = three_docs()?;
    let forward = [
        (AggregateFunction::Max, Some("clicks")),
        (AggregateFunction::Count, None),
        (AggregateFunction::Sum, Some("clicks")),
    ];
    let mut backward = forward;
    backward.reverse();

    let a = run(&segment, context(&forward, vec![], QueryOptions::default())?)?;
    let mut b = run(&segment, context(&backward, vec![], QueryOptions::default())?)?;
    b.reverse();
    assert_eq!(a, b);
    assert_eq!(a, vec![
        ScalarValue::Float64(Some(30.)),
        ScalarValue::Int64(Some(3)),
        ScalarValue::Float64(Some(60.)),
    ]);
    Ok(())
}

#[traced_test]
#[test]
fn test_empty_segment() -> anyhow::Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("d", DataType::Int64, false),
        Field::new("v", DataType::Int64, true),
    ]));
    let segment = Segment::new("empty", RecordBatch::new_empty(schema));
    let ctx = context(
        &[
            (AggregateFunction::Count, None),
            (AggregateFunction::Sum, Some("v")),
            (AggregateFunction::Min, Some("v")),
            (AggregateFunction::Avg, Some("v")),
            (AggregateFunction::DistinctCount, Some("v")),
        ],
        vec![],
        QueryOptions::default(),
    )?;
    let mut op = build_aggregation_operator(ctx, &segment)?;

    assert_eq!(op.next_block()?.final_results()?, vec![
        ScalarValue::Int64(Some(0)),
        ScalarValue::Float64(Some(0.)),
        ScalarValue::Float64(None),
        ScalarValue::Float64(None),
        ScalarValue::Int64(Some(0)),
    ]);
    assert_eq!(op.execution_statistics(), ExecutionStatistics::new(0, 0, 0, 0));
    Ok(())
}

#[traced_test]
#[test]
fn test_filter_excludes_everything() -> anyhow::Result<()> {
    let segment = three_docs()?;
    let ctx = context(
        &[(AggregateFunction::Count, None), (AggregateFunction::Max, Some("clicks"))],
        vec![DimensionFilter::new("country", FilterOperation::Eq(9))],
        QueryOptions::default(),
    )?;
    let mut op = build_aggregation_operator(ctx, &segment)?;
    let res = op.next_block()?;

    assert_eq!(res.final_results()?, vec![
        ScalarValue::Int64(Some(0)),
        ScalarValue::Float64(None)
    ]);
    assert_eq!(op.execution_statistics(), ExecutionStatistics::new(0, 3, 0, 3));
    assert_eq!(res.to_record_batch()?.num_rows(), 1);
    Ok(())
}

#[traced_test]
#[test]
fn test_post_filter_entries_invariant() -> anyhow::Result<()> {
    let mut segment = three_docs()?;
    segment.build_star_tree(
        StarTreeConfig::new(vec!["country".to_string()], vec![
            MetricPair::count_star(),
            MetricPair::new(AggregateFunction::Sum, Some("clicks".to_string())),
        ])
        .with_max_leaf_records(1),
    )?;
    let functions = [
        (AggregateFunction::Sum, Some("clicks")),
        (AggregateFunction::Count, None),
    ];

    for batch_size in 1..5 {
        for use_star_tree in [false, true] {
            let options = QueryOptions::default()
                .with_batch_size(batch_size)
                .with_star_tree(use_star_tree);
            let ctx = context(&functions, vec![], options)?;
            let mut op = build_aggregation_operator(ctx, &segment)?;
            op.next_block()?;
            let stats = op.execution_statistics();
            let columns = op.child_operators()[0].num_columns_projected() as u64;
            assert_eq!(
                stats.num_entries_scanned_post_filter,
                stats.num_docs_scanned * columns
            );
            assert_eq!(stats.num_total_docs, 3);
        }
    }

    Ok(())
}

#[test]
fn test_explain() -> anyhow::Result<()> {
    let segment = three_docs()?;
    let op = build_aggregation_operator(
        context(
            &[(AggregateFunction::Count, None), (AggregateFunction::Sum, Some("clicks"))],
            vec![],
            QueryOptions::default(),
        )?,
        &segment,
    )?;
    assert_eq!(
        op.to_explain_string(),
        "AGGREGATE(aggregations:count(*), sum(clicks))"
    );
    assert_eq!(
        op.explain().to_string(),
        "Aggregate(aggregations: [count(*), sum(clicks)])\n  Project(segment: three, columns: [clicks], batchSize: 10000)\n"
    );

    let op = build_aggregation_operator(context(&[], vec![], QueryOptions::default())?, &segment)?;
    assert_eq!(op.to_explain_string(), "AGGREGATE");
    assert!(op.explain().attribute("aggregations").is_none());
    Ok(())
}

#[traced_test]
#[test]
fn test_index_consistency_fault() -> anyhow::Result<()> {
    let segment = synthetic_tree_segment()?;
    let tree = segment.star_trees()[0].clone();
    let mut nodes = (0..tree.num_nodes())
        .map(|i| tree.node(NodeId(i)).cloned())
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| anyhow::anyhow!("missing node"))?;
    // sum partial replaced by a count
    nodes[1].aggregates[1] = PartialAggregate::Count(3);
    let broken = StarTree::from_parts(
        tree.dimensions().to_vec(),
        tree.metrics().to_vec(),
        nodes,
        tree.documents().clone(),
    );
    let segment = Segment::new("broken", segment.documents().clone()).with_star_tree(broken);

    let ctx = context(
        &[(AggregateFunction::Sum, Some("v"))],
        vec![DimensionFilter::new("d", FilterOperation::Eq(1))],
        QueryOptions::default(),
    )?;
    let mut op = build_aggregation_operator(ctx, &segment)?;
    assert!(op.is_use_star_tree());
    assert!(matches!(op.next_block(), Err(QueryError::StarTree(_))));
    Ok(())
}

#[traced_test]
#[test]
fn test_misplaced_child_is_fatal() -> anyhow::Result<()> {
    let data = r#"
| a(i64) | b(i64) |
|--------|--------|
| 1      | 1      |
| 1      | 2      |
| 1      | 3      |
"#;
    let segment = segment_from_markdown("misplaced", data)?;
    // the a = 1 child is marked as if it also bound b
    let nodes = vec![
        StarTreeNode {
            level: 0,
            value: NodeValue::Root,
            start_doc: 0,
            end_doc: 3,
            aggregates: vec![PartialAggregate::Count(3)],
            children: vec![NodeId(1)],
            star_child: None,
        },
        StarTreeNode {
            level: 2,
            value: NodeValue::Value(1),
            start_doc: 0,
            end_doc: 3,
            aggregates: vec![PartialAggregate::Count(3)],
            children: vec![],
            star_child: None,
        },
    ];
    let tree = StarTree::from_parts(
        vec!["a".to_string(), "b".to_string()],
        vec![MetricPair::count_star()],
        nodes,
        segment.documents().clone(),
    );
    let segment = segment.with_star_tree(tree);

    let ctx = context(
        &[(AggregateFunction::Count, None)],
        vec![
            DimensionFilter::new("a", FilterOperation::Eq(1)),
            DimensionFilter::new("b", FilterOperation::Eq(2)),
        ],
        QueryOptions::default(),
    )?;
    let mut op = build_aggregation_operator(ctx, &segment)?;
    assert!(op.is_use_star_tree());
    assert!(matches!(op.next_block(), Err(QueryError::StarTree(_))));
    Ok(())
}

#[traced_test]
#[test]
fn test_upstream_fault() -> anyhow::Result<()> {
    let data = r#"
| d(f64) | v(i64) |
|--------|--------|
| 1      | 1      |
"#;
    let segment = segment_from_markdown("float_dimension", data)?;
    let ctx = context(
        &[(AggregateFunction::Count, None)],
        vec![DimensionFilter::new("d", FilterOperation::Eq(1))],
        QueryOptions::default(),
    )?;
    let mut op = build_aggregation_operator(ctx, &segment)?;
    assert!(matches!(op.next_block(), Err(QueryError::Execution(_))));
    Ok(())
}

#[traced_test]
#[test]
fn test_single_use() -> anyhow::Result<()> {
    let segment = three_docs()?;
    let ctx = context(
        &[(AggregateFunction::Count, None)],
        vec![],
        QueryOptions::default(),
    )?;
    let mut op = build_aggregation_operator(ctx, &segment)?;
    op.next_block()?;
    assert!(matches!(op.next_block(), Err(QueryError::Execution(_))));
    assert_eq!(op.execution_statistics().num_docs_scanned, 3);
    Ok(())
}
