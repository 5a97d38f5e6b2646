//! Target column types and source type mapping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod type_map;

pub use type_map::{classify, is_guid_family, map_type, TypeMapping};

/// Column type accepted by a DCR stream declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    String,
    Int,
    Long,
    Real,
    Boolean,
    Datetime,
    Dynamic,
}

impl TargetType {
    /// Every variant, in declaration order.
    pub const ALL: [TargetType; 7] = [
        TargetType::String,
        TargetType::Int,
        TargetType::Long,
        TargetType::Real,
        TargetType::Boolean,
        TargetType::Datetime,
        TargetType::Dynamic,
    ];

    /// Wire name used in stream declarations.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::String => "string",
            TargetType::Int => "int",
            TargetType::Long => "long",
            TargetType::Real => "real",
            TargetType::Boolean => "boolean",
            TargetType::Datetime => "datetime",
            TargetType::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = String;

    /// Strict parse of a wire name; use [`map_type`] for lenient mapping.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("'{}' is not a target column type", s))
    }
}
