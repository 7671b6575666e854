//! ImageGraph engine - edge projection and detectors
//!
//! This crate implements the analysis on top of the graph:
//! - Build input/output edge projection
//! - Image stream reference edge projection
//! - Unpushable build detection
//! - Circular build detection
//! - Registry repository enumeration

pub mod projection;
pub mod build_edges;
pub mod image_edges;
pub mod unpushable;
pub mod circular;
pub mod repository;
pub mod analyzer;

pub use projection::{Projection, ReferenceSlot, UnresolvedReference};
pub use build_edges::{add_all_input_output_edges, add_input_output_edges, resolve_image_reference, ResolveError};
pub use image_edges::add_all_image_stream_ref_edges;
pub use unpushable::find_unpushable_build_configs;
pub use circular::{circular_build_groups, find_circular_builds, BuildDependencies};
pub use repository::{ImageRepository, RepositoryError};
pub use analyzer::{project_edges, Analysis, Analyzer};
