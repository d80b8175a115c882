// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Reference interpreter for derived plans.
//!
//! Executes [`crate::codec::CodecPlan`]s over dynamic [`Value`]s so the
//! round-trip and size properties of a schema can be checked without
//! rendering code for a target language.

mod buffer;
mod run;
mod value;

use thiserror::Error;

pub use buffer::{Reader, Writer};
pub use run::Interpreter;
pub use value::{Record, Value};

/// Interpreter failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecError {
    /// Read past the end of the input.
    #[error("wanted {wanted} byte(s) at offset {offset}, input too short")]
    OutOfBounds {
        /// Read offset.
        offset: usize,
        /// Bytes requested.
        wanted: usize,
    },
    /// `decode` left input unconsumed.
    #[error("{count} trailing byte(s) after message")]
    TrailingBytes {
        /// Unconsumed byte count.
        count: usize,
    },
    /// A field needed by the plan has no value.
    #[error("struct '{struct_name}' has no value for field '{field}'")]
    MissingField {
        /// Struct being processed.
        struct_name: String,
        /// Missing field.
        field: String,
    },
    /// A value has the wrong shape for its field.
    #[error("field '{field}' expects {expected}, found {found}")]
    TypeMismatch {
        /// Field.
        field: String,
        /// Expected shape.
        expected: String,
        /// Supplied shape.
        found: String,
    },
    /// An integer does not fit its wire type.
    #[error("value {value} does not fit '{type_name}'")]
    OutOfRange {
        /// Wire type or field.
        type_name: String,
        /// Offending value.
        value: i128,
    },
    /// A byte alias value has the wrong length.
    #[error("field '{field}' expects {expected} byte(s), found {found}")]
    BadByteLength {
        /// Field.
        field: String,
        /// Alias size.
        expected: usize,
        /// Supplied length.
        found: usize,
    },
    /// A reserved field carries an unexpected value.
    #[error("reserved field '{field}' holds {found}, expected {expected}")]
    ReservedMismatch {
        /// Reserved field.
        field: String,
        /// Required value.
        expected: i128,
        /// Decoded value.
        found: i128,
    },
    /// No struct registered for a decoded discriminator.
    #[error("no struct registered for ({group}, version {version}, {id})")]
    UnknownDiscriminator {
        /// Discriminator enum.
        group: String,
        /// Decoded version (0 when the header has none).
        version: u64,
        /// Decoded discriminator.
        id: i128,
    },
    /// An `array_sized` region disagrees with its stored byte length.
    #[error("array '{field}' occupies {actual} byte(s) but its length field says {declared}")]
    ByteLengthMismatch {
        /// `array_sized` field.
        field: String,
        /// Stored byte length.
        declared: i128,
        /// Bytes actually written.
        actual: usize,
    },
    /// Arrays sharing a length field, or a fixed-count array, disagree
    /// with the count.
    #[error("field '{field}' has {found} element(s), expected {expected}")]
    LengthMismatch {
        /// Array or length field.
        field: String,
        /// Required count.
        expected: usize,
        /// Supplied count.
        found: usize,
    },
    /// A vector element consumed no input.
    #[error("element of '{field}' consumed no bytes")]
    NoProgress {
        /// Vector field.
        field: String,
    },
    /// No plan for a struct name.
    #[error("struct '{0}' has no plan")]
    UnknownStruct(String),
    /// No header binding for a group.
    #[error("group '{0}' has no header binding")]
    UnknownGroup(String),
}
