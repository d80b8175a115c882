// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Validated intermediate model: structs, fields, and dispositions.
//!
//! Unlike [`crate::node`], every value here has already passed the field
//! checks. A [`Field`] carries exactly the data its [`Disposition`] needs.

use std::collections::BTreeMap;

use serde::Serialize;

/// Whether a struct can be instantiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructKind {
    /// Concrete struct.
    Normal,
    /// Shared header shape; never instantiated directly.
    Abstract,
}

/// Named enum member with its resolved value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumMember {
    /// Member name.
    pub name: String,
    /// Member value, already range-checked against the enum's width.
    pub value: i128,
}

/// Group and discriminator a concrete struct is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Discriminator enum (the group).
    pub group: String,
    /// Discriminator member; its value is what the header's type field
    /// carries on the wire.
    pub id: EnumMember,
}

/// Header struct that carries a group's discriminator on the wire.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct HeaderBinding {
    /// Header struct name.
    pub header: String,
    /// Member of the header holding the discriminator.
    pub type_field: String,
    /// Member of the header holding the version, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_field: Option<String>,
}

/// Equality operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    /// `equals`
    Equals,
    /// `not equals`
    NotEquals,
}

impl ConditionOp {
    /// Parses the schema spelling.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "equals" => Some(Self::Equals),
            "not equals" | "not_equals" => Some(Self::NotEquals),
            _ => None,
        }
    }

    /// Applies the operator.
    pub fn holds(self, lhs: i128, rhs: i128) -> bool {
        match self {
            Self::Equals => lhs == rhs,
            Self::NotEquals => lhs != rhs,
        }
    }
}

/// Presence predicate over an integer field of the same struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Condition {
    /// Field whose value is tested.
    pub field: String,
    /// `equals` or `not equals`.
    pub op: ConditionOp,
    /// Resolved right-hand side.
    pub value: i128,
    /// Right-hand side as written (enum member or literal).
    pub literal: String,
}

impl Condition {
    /// Evaluates the predicate against the condition field's value.
    pub fn holds(&self, lhs: i128) -> bool {
        self.op.holds(lhs, self.value)
    }
}

/// Value assigned to a `const` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstValue {
    /// Integer literal.
    Int {
        /// Literal value; never written to the wire.
        value: i128,
    },
    /// Enum member.
    Enum {
        /// Member name.
        member: String,
        /// Member value.
        value: i128,
    },
}

impl ConstValue {
    /// Integer value.
    pub const fn value(&self) -> i128 {
        match self {
            Self::Int { value } | Self::Enum { value, .. } => *value,
        }
    }
}

/// Value a `reserved` field must carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReservedValue {
    /// Integer literal.
    Int {
        /// Literal value.
        value: i128,
    },
    /// Enum member of the reserved field's enum type.
    Enum {
        /// Member name.
        member: String,
        /// Member value.
        value: i128,
    },
    /// Encoded size of another field of the same struct.
    SizeOf {
        /// Field whose size is stored.
        field: String,
    },
}

/// Element count of an `array` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArrayCount {
    /// Fixed element count.
    Literal {
        /// Number of elements; no count is written.
        count: u64,
    },
    /// Count carried by an earlier integer field.
    Field {
        /// Length field name. It is derived from the array on encode and
        /// not stored in decoded records.
        field: String,
    },
}

/// Layout data of an `array_sized` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArraySized {
    /// Earlier field holding the region's total byte length.
    pub length_field: String,
    /// Header struct peeked before each element.
    pub header: String,
    /// Discriminator member of the header.
    pub type_field: String,
    /// Version member of the header, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_field: Option<String>,
    /// Element alignment in bytes, relative to the region start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<u64>,
}

/// Role a field plays in the wire layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum Disposition {
    /// Ordinary field, written where it is declared.
    Plain,
    /// Compile-time constant; no bytes on the wire.
    Const(ConstValue),
    /// Another struct embedded without a name of its own.
    Inline,
    /// Filler whose value is fixed by the schema and checked on decode.
    Reserved(ReservedValue),
    /// Homogeneous vector with a known count.
    Array(ArrayCount),
    /// Polymorphic vector bounded by a byte length.
    ArraySized(ArraySized),
    /// Vector consuming the rest of the buffer.
    ArrayFill,
}

impl Disposition {
    /// Tag without payload.
    pub const fn kind(&self) -> DispositionKind {
        match self {
            Self::Plain => DispositionKind::Plain,
            Self::Const(_) => DispositionKind::Const,
            Self::Inline => DispositionKind::Inline,
            Self::Reserved(_) => DispositionKind::Reserved,
            Self::Array(_) => DispositionKind::Array,
            Self::ArraySized(_) => DispositionKind::ArraySized,
            Self::ArrayFill => DispositionKind::ArrayFill,
        }
    }
}

/// Disposition tag attached to every derived codec step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispositionKind {
    /// See [`Disposition::Plain`].
    Plain,
    /// See [`Disposition::Const`].
    Const,
    /// See [`Disposition::Inline`].
    Inline,
    /// See [`Disposition::Reserved`].
    Reserved,
    /// See [`Disposition::Array`].
    Array,
    /// See [`Disposition::ArraySized`].
    ArraySized,
    /// See [`Disposition::ArrayFill`].
    ArrayFill,
    /// Shared slot of a union condition group.
    Union,
}

/// One validated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    /// Field name (an inline field is named after its type).
    pub name: String,
    /// Declared type: element type for vectors.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Layout role, with the data that role needs.
    #[serde(flatten)]
    pub disposition: Disposition,
    /// Presence predicate; an absent field takes no bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    /// Optional documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Field {
    /// Whether this is an unconditioned plain field.
    pub fn is_plain(&self) -> bool {
        self.disposition == Disposition::Plain && self.condition.is_none()
    }
}

/// How a set of fields sharing one condition field is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupLayout {
    /// Each member is present or absent on its own.
    Independent,
    /// Members share one fixed-size slot; at most one is live.
    Union,
}

/// Conditioned fields grouped by their condition field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionGroup {
    /// Shared condition field.
    pub condition_field: String,
    /// Members in declaration order.
    pub members: Vec<String>,
    /// Independent or union.
    pub layout: GroupLayout,
}

/// One validated struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Struct {
    /// Unique struct name.
    pub name: String,
    /// Normal or abstract. Abstract structs get plans but no factory entry.
    pub kind: StructKind,
    /// Fields in serialization order.
    pub fields: Vec<Field>,
    /// Group and discriminator the struct declares itself. Version-family
    /// members borrow theirs when the factory is built; see
    /// [`crate::factory::FactoryRegistry::identity`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    /// Version within the group, from `struct_type` or the version const.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// Header declared by a `struct_type` entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderBinding>,
    /// Fields that only carry an array's length, mapped to those arrays.
    pub length_fields: BTreeMap<String, Vec<String>>,
    /// Condition groups in order of first member.
    pub groups: Vec<ConditionGroup>,
    /// Optional documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Struct {
    /// Field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declaration index of a field.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Union group a field belongs to.
    pub fn union_of(&self, field: &str) -> Option<&ConditionGroup> {
        self.groups
            .iter()
            .find(|g| g.layout == GroupLayout::Union && g.members.iter().any(|m| m == field))
    }

    /// Whether the field's value is derived from an array's live length.
    pub fn is_length_field(&self, field: &str) -> bool {
        self.length_fields.contains_key(field)
    }
}
