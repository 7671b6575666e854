//! Build configs whose output can never be pushed
//!
//! A build pushing to an image stream tag needs the stream to exist and the
//! stream needs a registry address. Outputs to external pull specs are not
//! checked.

use imagegraph_core::{Marker, MarkerKey};
use imagegraph_graph::{EdgeKind, Graph, ImageStreamNode, Node, NodeId, NodeKind};

/// Report every build config whose output image stream is missing or has no registry
pub fn find_unpushable_build_configs(graph: &Graph) -> Vec<Marker> {
    graph
        .nodes_of_kind(NodeKind::BuildConfig)
        .into_iter()
        .filter_map(|bc| check_build_config(graph, bc))
        .collect()
}

fn check_build_config(graph: &Graph, bc: NodeId) -> Option<Marker> {
    let output = graph.successors(bc, EdgeKind::BuildOutput).first().copied()?;
    let Some(Node::ImageStreamTag(tag)) = graph.node(output) else {
        return None;
    };

    let anchor = graph.name_of(graph.top_level_container(bc))?;
    let bc_label = graph.node(bc)?.identity();
    let output_name = graph.name_of(output)?;
    let stream_label = format!("{}/{}", tag.namespace, tag.stream);
    let tag_label = format!("{stream_label}:{}", tag.tag);

    let marker = match output_stream(graph, output) {
        None => Marker::error(MarkerKey::MissingImageStreamErr, anchor)
            .with_message(format!(
                "build config {bc_label} pushes to {tag_label}, but image stream {stream_label} does not exist"
            ))
            .with_suggestion(format!("Create image stream {stream_label}")),
        Some(stream) if stream.public_repository().is_none() => {
            Marker::error(MarkerKey::MissingRequiredRegistryErr, anchor)
                .with_message(format!(
                    "build config {bc_label} pushes to {tag_label}, but image stream {stream_label} has no registry address"
                ))
                .with_suggestion("Deploy the cluster image registry so image streams receive a pull address")
        }
        Some(_) => return None,
    };

    Some(marker.with_related(output_name))
}

fn output_stream(graph: &Graph, output: NodeId) -> Option<&ImageStreamNode> {
    graph
        .successors(output, EdgeKind::ImageStreamRef)
        .into_iter()
        .find_map(|id| match graph.node(id) {
            Some(Node::ImageStream(stream)) => Some(stream),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project_edges;
    use imagegraph_core::Severity;
    use imagegraph_graph::{build_graph, Inventory};
    use pretty_assertions::assert_eq;

    fn markers(yaml: &str) -> Vec<Marker> {
        let mut graph = build_graph(&Inventory::from_yaml_str(yaml).unwrap());
        project_edges(&mut graph);
        find_unpushable_build_configs(&graph)
    }

    const BUILD: &str = r#"
buildConfigs:
  - metadata: { namespace: ns, name: app }
    spec:
      output:
        to: { kind: ImageStreamTag, name: "app:latest" }
"#;

    #[test]
    fn stream_without_registry() {
        let yaml = format!("{BUILD}imageStreams:\n  - metadata: {{ namespace: ns, name: app }}\n");
        let found = markers(&yaml);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, MarkerKey::MissingRequiredRegistryErr);
        assert_eq!(found[0].severity, Severity::Error);
        assert_eq!(found[0].node, "BuildConfig|ns/app");
        assert_eq!(found[0].related_nodes, vec!["ImageStreamTag|ns/app:latest"]);
    }

    #[test]
    fn missing_stream() {
        let found = markers(BUILD);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, MarkerKey::MissingImageStreamErr);
        assert!(found[0].message.as_deref().unwrap_or_default().contains("ns/app does not exist"));
    }

    #[test]
    fn stream_with_registry_is_pushable() {
        let yaml = format!(
            "{BUILD}imageStreams:\n  - metadata: {{ namespace: ns, name: app }}\n    status:\n      dockerImageRepository: 172.30.0.1:5000/ns/app\n"
        );
        assert!(markers(&yaml).is_empty());
    }

    #[test]
    fn external_outputs_and_missing_outputs_are_skipped() {
        let found = markers(
            r#"
buildConfigs:
  - metadata: { namespace: ns, name: external }
    spec:
      output:
        to: { kind: DockerImage, name: "quay.io/ns/app:latest" }
  - metadata: { namespace: ns, name: none }
    spec:
      strategy:
        from: { kind: DockerImage, name: centos }
"#,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn one_marker_per_offending_build_config() {
        let found = markers(
            r#"
buildConfigs:
  - metadata: { namespace: ns, name: first }
    spec:
      output:
        to: { kind: ImageStreamTag, name: "gone:latest" }
  - metadata: { namespace: ns, name: second }
    spec:
      output:
        to: { kind: ImageStreamTag, name: "gone:v2" }
"#,
        );

        let anchors: Vec<&str> = found.iter().map(|m| m.node.as_str()).collect();
        assert_eq!(anchors, vec!["BuildConfig|ns/first", "BuildConfig|ns/second"]);
    }
}
