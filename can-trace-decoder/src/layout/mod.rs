//! Payload layouts and the layout interpreter
//!
//! [`field`] holds the declarative layout tree and its validation,
//! [`decoder`] walks a payload along such a tree.

pub mod decoder;
pub mod field;

pub use decoder::{decode_payload, LayoutDecoder};
pub use field::{max_depth, validate_layout, LayoutField};
