//! geotf Core
//!
//! Provider-agnostic building blocks for a declarative infrastructure provider:
//! attribute values, resource schemas and validation, composite identifiers,
//! plan diffing and the `Provider` contract the plugin transport drives.

pub mod differ;
pub mod identifier;
pub mod provider;
pub mod resource;
pub mod schema;
