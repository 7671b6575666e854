//! Outcome of an edge projection pass

use imagegraph_graph::GraphError;

/// Which declared slot of a build config a reference came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSlot {
    /// Position in the build config's input list
    Input(usize),

    /// The build output
    Output,
}

impl std::fmt::Display for ReferenceSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input(index) => write!(f, "input #{index}"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// A build config reference that could not be mapped to a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    /// Unique name of the build config
    pub build_config: String,

    /// Where the reference was declared
    pub slot: ReferenceSlot,

    /// Declared kind
    pub kind: String,

    /// Declared name
    pub name: String,

    /// Why it could not be resolved
    pub reason: String,
}

/// Counts and problems from running projectors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    /// Edges newly inserted (duplicates are not counted)
    pub edges_added: usize,

    /// References skipped because they could not be resolved
    pub unresolved: Vec<UnresolvedReference>,

    /// Edge insertions the graph rejected
    pub errors: Vec<GraphError>,
}

impl Projection {
    /// Account for one `Graph::add_edge` result
    pub(crate) fn record(&mut self, result: Result<bool, GraphError>) {
        match result {
            Ok(true) => self.edges_added += 1,
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(error = %err, "edge rejected during projection");
                self.errors.push(err);
            }
        }
    }

    /// Fold another pass into this one
    pub fn merge(&mut self, other: Projection) {
        self.edges_added += other.edges_added;
        self.unresolved.extend(other.unresolved);
        self.errors.extend(other.errors);
    }

    /// True when every reference resolved and every edge was accepted
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts_only_new_edges() {
        let mut projection = Projection::default();
        projection.record(Ok(true));
        projection.record(Ok(false));
        projection.record(Err(GraphError::MissingNode("ImageStream|ns/x".to_string())));

        assert_eq!(projection.edges_added, 1);
        assert_eq!(projection.errors.len(), 1);
        assert!(!projection.is_clean());
    }

    #[test]
    fn merge_accumulates() {
        let mut first = Projection { edges_added: 2, ..Default::default() };
        let second = Projection {
            edges_added: 3,
            unresolved: vec![UnresolvedReference {
                build_config: "BuildConfig|ns/app".to_string(),
                slot: ReferenceSlot::Input(1),
                kind: "Git".to_string(),
                name: "repo".to_string(),
                reason: "unsupported kind".to_string(),
            }],
            errors: Vec::new(),
        };

        first.merge(second);
        assert_eq!(first.edges_added, 5);
        assert_eq!(first.unresolved.len(), 1);
        assert_eq!(first.unresolved[0].slot.to_string(), "input #1");
    }
}
