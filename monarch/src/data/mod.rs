//! Structured-data collaborators: `json` is a concrete wrapper over
//! `serde_json`; `jsonld` is a trait boundary only, since context
//! expansion needs a real processor the ambient stack doesn't carry.

pub mod json;
pub mod jsonld;

pub use json::{from_value, to_value, Json};
pub use jsonld::JsonLdProcessor;
