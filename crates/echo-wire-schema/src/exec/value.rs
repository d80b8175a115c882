// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Dynamic values the interpreter encodes and decodes.

use std::collections::BTreeMap;

use serde::Serialize;

/// A field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Integer or enum value.
    Int(i128),
    /// Raw bytes of a byte alias.
    #[serde(serialize_with = "hex_bytes")]
    Bytes(Vec<u8>),
    /// Struct value.
    Record(Record),
    /// Vector value.
    List(Vec<Value>),
}

fn hex_bytes<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

impl Value {
    /// Integer payload.
    pub const fn as_int(&self) -> Option<i128> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Record payload.
    pub const fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// List payload.
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Bytes(_) => "bytes",
            Self::Record(_) => "record",
            Self::List(_) => "list",
        }
    }
}

impl From<i128> for Value {
    fn from(v: i128) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Int(i128::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(i128::from(v))
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Self::Record(v)
    }
}

impl From<Vec<Self>> for Value {
    fn from(v: Vec<Self>) -> Self {
        Self::List(v)
    }
}

/// Struct instance: a type name plus named field values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Struct name.
    #[serde(rename = "$type")]
    pub type_name: String,
    /// Field values by name.
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    /// Empty record of `type_name`.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style [`Record::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a field.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Field value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Value at a member path through nested records.
    pub fn at_path(&self, path: &[String]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let value = self.get(first)?;
        if rest.is_empty() {
            Some(value)
        } else {
            value.as_record()?.at_path(rest)
        }
    }
}
