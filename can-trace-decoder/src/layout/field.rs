//! Declarative payload layout
//!
//! A layout is an ordered list of [`LayoutField`]s. In the JSON document each
//! field is an object tagged by `"type"`:
//!
//! ```json
//! { "type": "FIXED",   "length": 2, "name": "LEN" }
//! { "type": "DYNAMIC", "length": 1, "name": "TIME" }
//! { "type": "BLOCK",   "length": 1, "name": "GROUP", "subfields": [ ... ] }
//! ```
//!
//! For `DYNAMIC` and `BLOCK`, `length` is the width of the unsigned
//! length/count prefix, not of the value.

use crate::types::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One entry of a payload layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum LayoutField {
    /// `length` bytes stored verbatim
    Fixed { length: usize, name: String },

    /// `length`-byte count `n`, then `n` value bytes
    Dynamic { length: usize, name: String },

    /// `length`-byte repeat count `k`, then `subfields` applied `k` times
    Block {
        length: usize,
        name: String,
        subfields: Vec<LayoutField>,
    },
}

impl LayoutField {
    pub fn fixed(length: usize, name: impl Into<String>) -> Self {
        LayoutField::Fixed {
            length,
            name: name.into(),
        }
    }

    pub fn dynamic(length: usize, name: impl Into<String>) -> Self {
        LayoutField::Dynamic {
            length,
            name: name.into(),
        }
    }

    pub fn block(length: usize, name: impl Into<String>, subfields: Vec<LayoutField>) -> Self {
        LayoutField::Block {
            length,
            name: name.into(),
            subfields,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LayoutField::Fixed { name, .. }
            | LayoutField::Dynamic { name, .. }
            | LayoutField::Block { name, .. } => name,
        }
    }

    /// Declared byte length (value width for FIXED, prefix width otherwise)
    pub fn length(&self) -> usize {
        match self {
            LayoutField::Fixed { length, .. }
            | LayoutField::Dynamic { length, .. }
            | LayoutField::Block { length, .. } => *length,
        }
    }

    /// Fewest payload bytes this field can consume
    pub fn min_encoded_len(&self) -> usize {
        self.length()
    }

    /// Nesting depth: 1 for a leaf, 1 + deepest subfield for a block
    pub fn depth(&self) -> usize {
        match self {
            LayoutField::Block { subfields, .. } => 1 + max_depth(subfields),
            _ => 1,
        }
    }
}

/// Deepest nesting level of a layout (0 for an empty layout)
pub fn max_depth(layout: &[LayoutField]) -> usize {
    layout.iter().map(LayoutField::depth).max().unwrap_or(0)
}

/// Fewest payload bytes one pass over `layout` can consume
pub fn min_encoded_len(layout: &[LayoutField]) -> usize {
    layout.iter().map(LayoutField::min_encoded_len).sum()
}

/// Check a layout tree for structural errors
///
/// Every field needs a non-empty name unique among its siblings and a
/// positive length; every block needs at least one subfield.
pub fn validate_layout(layout: &[LayoutField]) -> Result<(), ConfigError> {
    if layout.is_empty() {
        return Err(ConfigError::EmptyLayout);
    }
    validate_level(layout, "layout root")
}

fn validate_level(fields: &[LayoutField], scope: &str) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for (index, field) in fields.iter().enumerate() {
        let name = field.name();
        if name.trim().is_empty() {
            return Err(ConfigError::EmptyName {
                scope: scope.to_string(),
                index,
            });
        }
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateName {
                name: name.to_string(),
                scope: scope.to_string(),
            });
        }
        if field.length() == 0 {
            return Err(ConfigError::ZeroLength {
                name: name.to_string(),
            });
        }

        if let LayoutField::Block { subfields, .. } = field {
            if subfields.is_empty() {
                return Err(ConfigError::EmptyBlock {
                    name: name.to_string(),
                });
            }
            validate_level(subfields, &format!("block '{}'", name))?;
        }
    }

    Ok(())
}
