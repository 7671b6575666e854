//! Cluster inventory parsing and graph construction
//!
//! This crate handles:
//! - Parsing inventory snapshots (build configs, image streams, images)
//! - Parsing image pull specs and digests
//! - The typed node/edge graph the analysis runs on
//! - Building that graph from an inventory

pub mod inventory;
pub mod reference;
pub mod node;
pub mod graph;
pub mod builder;

pub use inventory::{BuildConfig, Image, ImageStream, Inventory, InventoryError, ObjectMeta, ObjectReference, MANAGED_ANNOTATION};
pub use reference::{Digest, DockerImageReference, ReferenceError};
pub use node::{unique_name, BuildConfigNode, DockerImageNode, ImageNode, ImageStreamImageNode, ImageStreamNode, ImageStreamTagNode, Node, NodeKind};
pub use graph::{Edge, EdgeKind, Graph, GraphError, NodeId};
pub use builder::build_graph;
