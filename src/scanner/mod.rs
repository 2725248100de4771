pub mod manifest_builder;

pub use manifest_builder::{build_manifest, generate, write_manifest, GenerateSummary};
