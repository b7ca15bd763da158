//! Data model for the device / operation / image catalog.
//!
//! Identifiers are plain strings sliced out of object keys; the only
//! serialized entity is [`catalog::ImagePair`].

pub mod catalog;
