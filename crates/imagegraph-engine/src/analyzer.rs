//! Full analysis pipeline: graph, projection, detectors, config

use imagegraph_core::{Config, Marker};
use imagegraph_graph::{build_graph, Graph, Inventory, Node, NodeKind};
use tracing::{debug, info};

use crate::build_edges::add_all_input_output_edges;
use crate::circular::find_circular_builds;
use crate::image_edges::add_all_image_stream_ref_edges;
use crate::projection::Projection;
use crate::unpushable::find_unpushable_build_configs;

/// Run both projectors in dependency order
///
/// The image stream projector must see the views the build projector creates.
pub fn project_edges(graph: &mut Graph) -> Projection {
    let mut projection = add_all_input_output_edges(graph);
    projection.merge(add_all_image_stream_ref_edges(graph));
    projection
}

/// Result of analyzing one inventory
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Fully projected graph
    pub graph: Graph,

    /// Markers after allowlist and severity overrides
    pub markers: Vec<Marker>,

    /// What projection added and skipped
    pub projection: Projection,
}

impl Analysis {
    pub fn build_config_count(&self) -> usize {
        self.graph.nodes_of_kind(NodeKind::BuildConfig).len()
    }
}

/// Runs the enabled detectors over an inventory
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: Config,
}

impl Analyzer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build and project the graph, then run detectors on it
    pub fn analyze(&self, inventory: &Inventory) -> Analysis {
        let mut graph = build_graph(inventory);
        let projection = project_edges(&mut graph);
        let markers = self.detect(&graph);

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            markers = markers.len(),
            unresolved = projection.unresolved.len(),
            "analysis complete"
        );

        Analysis {
            graph,
            markers,
            projection,
        }
    }

    /// Run the enabled detectors on an already projected graph
    pub fn detect(&self, graph: &Graph) -> Vec<Marker> {
        let mut markers = Vec::new();
        if self.config.detectors.unpushable {
            markers.extend(find_unpushable_build_configs(graph));
        }
        if self.config.detectors.circular {
            markers.extend(find_circular_builds(graph));
        }

        markers
            .into_iter()
            .filter(|marker| !self.is_allowlisted(graph, marker))
            .map(|mut marker| {
                marker.severity = self.config.severity.get_severity(marker.key, marker.severity);
                marker
            })
            .collect()
    }

    fn is_allowlisted(&self, graph: &Graph, marker: &Marker) -> bool {
        let skipped = match graph.find(&marker.node).and_then(|id| graph.node(id)) {
            Some(Node::BuildConfig(bc)) => {
                let build_config = format!("{}/{}", bc.namespace(), bc.name());
                self.config.allowlist.is_build_config_skipped(&build_config)
            }
            _ => false,
        };
        if skipped {
            debug!(node = %marker.node, key = %marker.key, "marker suppressed by allowlist");
        }
        skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagegraph_core::{MarkerKey, Severity};
    use pretty_assertions::assert_eq;

    fn inventory() -> Inventory {
        Inventory::from_yaml_str(
            r#"
buildConfigs:
  - metadata: { namespace: ns, name: orphan }
    spec:
      output:
        to: { kind: ImageStreamTag, name: "missing:latest" }
  - metadata: { namespace: ns, name: loop }
    spec:
      strategy:
        from: { kind: ImageStreamTag, name: "loop:latest" }
      output:
        to: { kind: ImageStreamTag, name: "loop:latest" }
imageStreams:
  - metadata: { namespace: ns, name: loop }
    status:
      dockerImageRepository: 172.30.0.1:5000/ns/loop
"#,
        )
        .unwrap()
    }

    fn keys(markers: &[Marker]) -> Vec<MarkerKey> {
        markers.iter().map(|m| m.key).collect()
    }

    #[test]
    fn runs_detectors_in_order() {
        let analysis = Analyzer::default().analyze(&inventory());

        assert_eq!(
            keys(&analysis.markers),
            vec![MarkerKey::MissingImageStreamErr, MarkerKey::CircularBuildErr]
        );
        assert_eq!(analysis.build_config_count(), 2);
        assert!(analysis.projection.is_clean());
    }

    #[test]
    fn disabled_detectors_do_not_run() {
        let config = Config::from_toml("[detectors]\ncircular = false\n").unwrap();
        let analysis = Analyzer::new(config).analyze(&inventory());
        assert_eq!(keys(&analysis.markers), vec![MarkerKey::MissingImageStreamErr]);
    }

    #[test]
    fn allowlisted_build_configs_are_silent() {
        let config = Config::from_toml("[allowlist]\nskip_build_configs = [\"ns/orph*\"]\n").unwrap();
        let analysis = Analyzer::new(config).analyze(&inventory());
        assert_eq!(keys(&analysis.markers), vec![MarkerKey::CircularBuildErr]);
    }

    #[test]
    fn severity_overrides_apply() {
        let config =
            Config::from_toml("[severity.overrides]\nCircularBuildErr = \"warning\"\n").unwrap();
        let analysis = Analyzer::new(config).analyze(&inventory());

        let circular = analysis
            .markers
            .iter()
            .find(|m| m.key == MarkerKey::CircularBuildErr)
            .unwrap();
        assert_eq!(circular.severity, Severity::Warning);
    }

    #[test]
    fn analysis_is_repeatable() {
        let analyzer = Analyzer::default();
        let first = analyzer.analyze(&inventory());
        let second = analyzer.analyze(&inventory());

        assert_eq!(first.markers, second.markers);
        assert_eq!(first.graph.edge_count(), second.graph.edge_count());
    }
}
