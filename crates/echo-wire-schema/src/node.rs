// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Raw schema nodes as produced by the upstream parser.
//!
//! These mirror the JSON document one-to-one and carry no semantics of their
//! own. Keys are snake_case; the camelCase spellings are accepted as aliases.
//! Every field key is optional here so that the validator, not serde, decides
//! which omissions are errors.

use std::fmt;

use serde::Deserialize;

use crate::types::Signedness;

/// One declared name in the schema document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SchemaNode {
    /// Enum declaration.
    Enum(EnumNode),
    /// Alias declaration.
    Alias(AliasNode),
    /// Struct declaration.
    Struct(StructNode),
}

impl SchemaNode {
    /// Declared name.
    pub fn name(&self) -> &str {
        match self {
            Self::Enum(n) => &n.name,
            Self::Alias(n) => &n.name,
            Self::Struct(n) => &n.name,
        }
    }
}

/// Enum node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnumNode {
    /// Enum name.
    pub name: String,
    /// Width in bytes of the underlying integer.
    pub width: u64,
    /// Signedness of the underlying integer.
    #[serde(default)]
    pub signedness: Signedness,
    /// Members in declaration order.
    #[serde(default)]
    pub values: Vec<EnumValueNode>,
    /// Optional documentation.
    #[serde(default, alias = "comments")]
    pub comment: Option<String>,
}

/// Enum member node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnumValueNode {
    /// Member name.
    pub name: String,
    /// Member value.
    pub value: Scalar,
    /// Optional documentation.
    #[serde(default, alias = "comments")]
    pub comment: Option<String>,
}

/// Alias node: exactly one of `width` or `array_size`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AliasNode {
    /// Alias name.
    pub name: String,
    /// Integer width in bytes.
    #[serde(default)]
    pub width: Option<u64>,
    /// Integer signedness (unsigned when omitted).
    #[serde(default)]
    pub signedness: Option<Signedness>,
    /// Byte-array length.
    #[serde(default, alias = "arraySize")]
    pub array_size: Option<u64>,
    /// Rendering hint for byte arrays.
    #[serde(default, alias = "printHint")]
    pub print_hint: Option<String>,
    /// Optional documentation.
    #[serde(default, alias = "comments")]
    pub comment: Option<String>,
}

/// Struct node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StructNode {
    /// Struct name.
    pub name: String,
    /// Optional documentation.
    #[serde(default, alias = "comments")]
    pub comment: Option<String>,
    /// Struct-level disposition; only `"abstract"` is meaningful.
    #[serde(default)]
    pub disposition: Option<String>,
    /// Fields in serialization order.
    #[serde(default)]
    pub fields: Vec<FieldNode>,
}

/// Field node; presence of keys is validated later.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[allow(missing_docs)]
pub struct FieldNode {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub disposition: Option<String>,
    #[serde(default)]
    pub size: Option<Scalar>,
    #[serde(default)]
    pub value: Option<Scalar>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default, alias = "conditionOperation")]
    pub condition_operation: Option<String>,
    #[serde(default, alias = "conditionValue")]
    pub condition_value: Option<Scalar>,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default, alias = "headerTypeField")]
    pub header_type_field: Option<String>,
    #[serde(default, alias = "headerVersionField")]
    pub header_version_field: Option<String>,
    #[serde(default)]
    pub align: Option<Scalar>,
    #[serde(default)]
    pub version: Option<Scalar>,
    #[serde(default, alias = "comments")]
    pub comment: Option<String>,
}

/// A number or a string, as schema values may be either.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Non-negative integer literal.
    Unsigned(u64),
    /// Negative integer literal.
    Signed(i64),
    /// Name, expression, or digit string.
    Text(String),
}

impl Scalar {
    /// Integer value, accepting decimal and `0x` digit strings.
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Self::Unsigned(v) => Some(i128::from(*v)),
            Self::Signed(v) => Some(i128::from(*v)),
            Self::Text(s) => parse_int(s.trim()),
        }
    }

    /// Text value, when the scalar is not numeric.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) if parse_int(s.trim()).is_none() => Some(s.trim()),
            _ => None,
        }
    }
}

fn parse_int(s: &str) -> Option<i128> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i128::from_str_radix(hex, 16).ok();
    }
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Signed(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Self::Unsigned(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

/// Parses a JSON array of schema nodes.
///
/// # Errors
///
/// Returns the underlying [`serde_json::Error`] when the document is not a
/// well-formed node list.
pub fn parse_nodes(json: &str) -> Result<Vec<SchemaNode>, serde_json::Error> {
    serde_json::from_str(json)
}
