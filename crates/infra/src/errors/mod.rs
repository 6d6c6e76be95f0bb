//! Infrastructure error plumbing
//!
//! External crate errors are converted into [`oplink_domain::OplinkError`]
//! through the [`InfraError`] newtype so the domain crate never depends on
//! `toml`, `serde_json` or the metric primitives directly.

pub mod conversions;

pub use conversions::{to_oplink, InfraError};
