// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Derived operation lists.
//!
//! A [`CodecPlan`] is the whole output of derivation for one struct. It is
//! target-neutral: every step names its field, the disposition it came
//! from, and the types involved, so a renderer never re-derives semantics.

use serde::Serialize;

use crate::model::{ArrayCount, Condition, DispositionKind, ReservedValue};
use crate::types::Repr;

/// Non-struct value with a fixed wire representation.
///
/// Serialized as `{ "type_name": "Amount", "repr": "int", "primitive": "uint64" }`
/// for integers, or `{ .., "repr": "bytes", "len": 4 }` for byte aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leaf {
    /// Type name as declared in the schema (primitive, enum, or alias), kept
    /// so a renderer can name the generated field type.
    pub type_name: String,
    /// How the value is laid out: a little-endian integer of a given width
    /// and signedness, or a raw run of bytes.
    #[serde(flatten)]
    pub repr: Repr,
}

/// Element of a vector field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Element {
    /// Fixed-width leaf; every element occupies `repr.width()` bytes.
    Leaf(Leaf),
    /// Struct element, encoded back to back with its own plan.
    Struct {
        /// Name of the element struct, looked up in the same compilation.
        type_name: String,
    },
}

/// One branch of a union slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnionMember {
    /// Member field name; the decoded value is stored under it.
    pub field: String,
    /// Predicate over the condition field that makes this branch live.
    pub guard: Condition,
    /// What the slot's leading bytes hold when this branch is live.
    pub element: Element,
}

/// One operation bound to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step<Op> {
    /// Field (or union slot) the step belongs to.
    pub field: String,
    /// Disposition the step was derived from.
    pub disposition: DispositionKind,
    /// Presence predicate; the step is skipped when it does not hold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard: Option<Condition>,
    /// Operation.
    pub op: Op,
}

/// Size-computation operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SizeOp {
    /// Constant byte count.
    Fixed {
        /// Wire width of the field.
        bytes: usize,
    },
    /// Size of a nested struct value.
    Nested {
        /// Nested struct whose size plan is run on the field's value.
        type_name: String,
    },
    /// Sum of the live elements' sizes.
    Array {
        /// Element shape.
        element: Element,
    },
    /// Value of the region's byte-length field.
    ByteLength {
        /// Earlier integer field holding the region size, padding included.
        length_field: String,
    },
    /// Sum of the trailing elements' sizes.
    Fill {
        /// Element shape.
        element: Element,
    },
    /// Fixed size of a union slot.
    Union {
        /// Width of the widest member; every branch occupies this much.
        bytes: usize,
    },
}

/// Serialization operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EncodeOp {
    /// Write a stored leaf.
    Leaf {
        /// Width and encoding of the value.
        leaf: Leaf,
    },
    /// Write the live length of the arrays this field counts.
    Length {
        /// Integer shape of the count on the wire.
        leaf: Leaf,
        /// Arrays counted by this field; all must have the same length.
        arrays: Vec<String>,
    },
    /// Write a byte-length field, computing it from the region when absent.
    ByteLength {
        /// Integer shape of the byte count on the wire.
        leaf: Leaf,
        /// `array_sized` field the length covers.
        array: String,
        /// Alignment each element is padded to, counted from the region
        /// start.
        #[serde(skip_serializing_if = "Option::is_none")]
        align: Option<u64>,
    },
    /// Write a nested struct with its own plan.
    Nested {
        /// Nested struct name.
        type_name: String,
        /// `inline` fields carry no name of their own in the schema; the
        /// bytes are the same either way.
        inline: bool,
    },
    /// Write a reserved value.
    Reserved {
        /// Integer shape of the reserved slot.
        leaf: Leaf,
        /// Constant to write, or the field whose encoded size is written.
        value: ReservedValue,
    },
    /// Write every element of a counted vector.
    Array {
        /// Element shape.
        element: Element,
        /// Fixed count, or the length field that precedes the vector.
        count: ArrayCount,
    },
    /// Write each polymorphic element followed by its alignment padding.
    ArraySized {
        /// Byte-length field the written region must match.
        length_field: String,
        /// Padding boundary after every element, last one included.
        #[serde(skip_serializing_if = "Option::is_none")]
        align: Option<u64>,
    },
    /// Write every element with no count prefix.
    Fill {
        /// Element shape.
        element: Element,
    },
    /// Write the first live member, zero padded to the slot size.
    Union {
        /// Slot width.
        bytes: usize,
        /// Branches in declaration order; the first live one wins.
        members: Vec<UnionMember>,
    },
}

/// Deserialization operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DecodeOp {
    /// Read a stored leaf.
    Leaf {
        /// Width and encoding of the value.
        leaf: Leaf,
    },
    /// Read an array length into scratch; it is not stored.
    Length {
        /// Integer shape of the count.
        leaf: Leaf,
    },
    /// Read a nested struct.
    Nested {
        /// Nested struct name.
        type_name: String,
        /// Mirrors [`EncodeOp::Nested::inline`].
        inline: bool,
    },
    /// Read a reserved value and compare it with the expected constant.
    Reserved {
        /// Integer shape of the reserved slot.
        leaf: Leaf,
        /// Expected value; `None` for `sizeof`, checked by a later step.
        #[serde(skip_serializing_if = "Option::is_none")]
        expect: Option<i128>,
    },
    /// Compare a decoded `sizeof` reservation with its target's size.
    CheckSizeOf {
        /// Reserved field.
        reserved: String,
        /// Field whose size it carries.
        target: String,
    },
    /// Read a counted vector.
    Array {
        /// Element shape.
        element: Element,
        /// Fixed count, or the scratch length read earlier.
        count: ArrayCount,
    },
    /// Read polymorphic elements until the byte region is consumed.
    ArraySized {
        /// Byte-length field bounding the region.
        length_field: String,
        /// Header struct peeked before each element.
        header: String,
        /// Discriminator member of the header.
        type_field: String,
        /// Version member of the header.
        #[serde(skip_serializing_if = "Option::is_none")]
        version_field: Option<String>,
        /// Factory group of the discriminator.
        group: String,
        /// Padding skipped after every element.
        #[serde(skip_serializing_if = "Option::is_none")]
        align: Option<u64>,
    },
    /// Read elements until the buffer ends.
    Fill {
        /// Element shape.
        element: Element,
    },
    /// Read a union slot as raw bytes; its condition field comes later.
    Union {
        /// Slot width.
        bytes: usize,
    },
    /// Decode the live branch of a union slot.
    ResolveUnion {
        /// Branches in declaration order.
        members: Vec<UnionMember>,
    },
}

/// Value a field takes when the caller leaves it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Initializer {
    /// Member path from the struct, through inline fields, e.g.
    /// `["EntityHeader", "type"]`.
    pub path: Vec<String>,
    /// Discriminator id or version written there.
    pub value: i128,
}

/// Everything derived for one struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodecPlan {
    /// Struct the plans belong to.
    pub struct_name: String,
    /// Discriminator defaults applied on encode.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub initializers: Vec<Initializer>,
    /// Steps summing the encoded size of a value.
    pub size: Vec<Step<SizeOp>>,
    /// Steps writing a value, in wire order.
    pub serialize: Vec<Step<EncodeOp>>,
    /// Steps reading a value, in wire order plus deferred checks.
    pub deserialize: Vec<Step<DecodeOp>>,
}

impl CodecPlan {
    /// Wire fields each plan visits, in order, excluding deferred decode
    /// steps.
    pub fn wire_fields(&self) -> [Vec<&str>; 3] {
        let size = self.size.iter().map(|s| s.field.as_str()).collect();
        let serialize = self.serialize.iter().map(|s| s.field.as_str()).collect();
        let deserialize = self
            .deserialize
            .iter()
            .filter(|s| {
                !matches!(
                    s.op,
                    DecodeOp::CheckSizeOf { .. } | DecodeOp::ResolveUnion { .. }
                )
            })
            .map(|s| s.field.as_str())
            .collect();
        [size, serialize, deserialize]
    }
}
