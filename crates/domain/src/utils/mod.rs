//! Domain utility helpers

pub mod serde;
