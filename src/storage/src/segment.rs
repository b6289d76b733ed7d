use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use tracing::debug;

use crate::error::Result;
use crate::star_tree::StarTree;
use crate::star_tree::StarTreeBuilder;
use crate::star_tree::StarTreeConfig;

/// Immutable partition of a table: its documents and the star-trees built over them.
#[derive(Debug, Clone)]
pub struct Segment {
    name: String,
    documents: RecordBatch,
    star_trees: Vec<Arc<StarTree>>,
}

impl Segment {
    pub fn new(name: impl Into<String>, documents: RecordBatch) -> Self {
        Self {
            name: name.into(),
            documents,
            star_trees: vec![],
        }
    }

    pub fn with_star_tree(mut self, tree: StarTree) -> Self {
        self.star_trees.push(Arc::new(tree));
        self
    }

    /// Builds a star-tree over the segment documents and attaches it.
    pub fn build_star_tree(&mut self, config: StarTreeConfig) -> Result<()> {
        let tree = StarTreeBuilder::new(config).build(&self.documents)?;
        debug!(segment = self.name, nodes = tree.num_nodes(), "star-tree attached");
        self.star_trees.push(Arc::new(tree));

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> SchemaRef {
        self.documents.schema()
    }

    pub fn documents(&self) -> &RecordBatch {
        &self.documents
    }

    pub fn num_docs(&self) -> usize {
        self.documents.num_rows()
    }

    pub fn star_trees(&self) -> &[Arc<StarTree>] {
        &self.star_trees
    }
}
