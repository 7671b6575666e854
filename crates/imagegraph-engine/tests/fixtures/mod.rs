//! Test fixtures for analysis integration tests
//!
//! Each YAML file next to this module is an inventory snapshot describing
//! one scenario. Helpers here load them and run the projectors so tests can
//! go straight to the detectors.

use std::path::PathBuf;

use imagegraph_engine::project_edges;
use imagegraph_graph::{build_graph, Graph, Inventory};

/// Path of a fixture file
pub fn path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Load a fixture inventory
pub fn inventory(name: &str) -> Inventory {
    Inventory::from_file(&path(name)).unwrap_or_else(|err| panic!("fixture {name}: {err}"))
}

/// Load a fixture and return its fully projected graph
pub fn projected_graph(name: &str) -> Graph {
    let mut graph = build_graph(&inventory(name));
    let projection = project_edges(&mut graph);
    assert!(projection.errors.is_empty(), "fixture {name}: {:?}", projection.errors);
    graph
}

/// A straight chain of `length` build configs, each consuming the previous output
pub fn chain_inventory(length: usize) -> Inventory {
    let mut yaml = String::from("buildConfigs:\n");
    for i in 0..length {
        let from = if i == 0 {
            "{ kind: DockerImage, name: centos }".to_string()
        } else {
            format!("{{ kind: ImageStreamTag, name: \"step-{}:latest\" }}", i - 1)
        };
        yaml.push_str(&format!(
            "  - metadata: {{ namespace: chain, name: step-{i} }}\n    spec:\n      strategy:\n        from: {from}\n      output:\n        to: {{ kind: ImageStreamTag, name: \"step-{i}:latest\" }}\n"
        ));
    }
    yaml.push_str("imageStreams:\n");
    for i in 0..length {
        yaml.push_str(&format!(
            "  - metadata: {{ namespace: chain, name: step-{i} }}\n    status:\n      dockerImageRepository: 172.30.0.1:5000/chain/step-{i}\n"
        ));
    }

    Inventory::from_yaml_str(&yaml).unwrap_or_else(|err| panic!("chain inventory: {err}"))
}
