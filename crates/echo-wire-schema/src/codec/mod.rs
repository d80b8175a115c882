// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Codec derivation engine.
//!
//! One traversal ([`walk`]) visits a struct's fields in declaration order
//! and dispatches on disposition. The size, serialize, and deserialize
//! visitors plug into it and differ only in the operation they emit, so the
//! three plans cannot disagree about which fields are on the wire.

mod decode;
mod encode;
mod plan;
mod size;

use thiserror::Error;

use crate::model::{
    ArrayCount, ArraySized, Disposition, DispositionKind, Field, GroupLayout, ReservedValue, Struct,
};
use crate::schema::Schema;
use crate::types::TypeKind;

pub use decode::DecodeVisitor;
pub use encode::EncodeVisitor;
pub use plan::{
    CodecPlan, DecodeOp, Element, EncodeOp, Initializer, Leaf, SizeOp, Step, UnionMember,
};
pub use size::SizeVisitor;

/// Failures while deriving a plan from a validated schema.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeriveError {
    /// A field type is neither a leaf nor a declared struct.
    #[error("field '{field}' of struct '{struct_name}' has unresolvable type '{type_name}'")]
    UnknownType {
        /// Owning struct.
        struct_name: String,
        /// Field.
        field: String,
        /// Offending type.
        type_name: String,
    },
    /// A union slot has no fixed size.
    #[error("union slot '{slot}' of struct '{struct_name}' has no fixed size")]
    UnionNotFixed {
        /// Owning struct.
        struct_name: String,
        /// First member of the slot.
        slot: String,
    },
    /// The discriminator group of an `array_sized` header cannot be found.
    #[error(
        "header '{header}' of '{field}' in struct '{struct_name}' has no enum field '{type_field}'"
    )]
    HeaderUnresolved {
        /// Owning struct.
        struct_name: String,
        /// `array_sized` field.
        field: String,
        /// Header struct.
        header: String,
        /// Discriminator member.
        type_field: String,
    },
    /// The struct is not part of the schema.
    #[error("struct '{0}' not declared")]
    UnknownStruct(String),
}

/// Union slot computed once per struct and shared by every visitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionSlot {
    /// Slot name: its first member.
    pub name: String,
    /// Declaration index of the first member.
    pub position: usize,
    /// Condition field shared by the members.
    pub condition_field: String,
    /// Slot size in bytes.
    pub bytes: usize,
    /// Branches in declaration order.
    pub members: Vec<UnionMember>,
}

/// Per-disposition emission hooks driven by [`walk`].
///
/// Const fields never reach a visitor. Union members reach it once, as
/// their shared slot.
pub trait FieldVisitor {
    /// Operation type the visitor emits.
    type Op;

    /// Plain field with a leaf type.
    fn leaf(&mut self, field: &Field, leaf: Leaf) -> Self::Op;
    /// Plain or inline field with a struct type.
    fn nested(&mut self, field: &Field) -> Self::Op;
    /// `reserved` field.
    fn reserved(&mut self, field: &Field, leaf: Leaf, value: &ReservedValue) -> Self::Op;
    /// `array` field.
    fn array(&mut self, field: &Field, element: Element, count: &ArrayCount) -> Self::Op;
    /// `array_sized` field; `group` is the header's discriminator enum.
    fn array_sized(&mut self, field: &Field, layout: &ArraySized, group: &str) -> Self::Op;
    /// `array_fill` field.
    fn fill(&mut self, field: &Field, element: Element) -> Self::Op;
    /// Union slot.
    fn union(&mut self, slot: &UnionSlot) -> Self::Op;
    /// Steps to append once the field at `position` has been visited.
    fn after(&mut self, _position: usize) -> Vec<Step<Self::Op>> {
        Vec::new()
    }
}

/// Resolves a type name into a vector element shape.
pub fn element(schema: &Schema, owner: &str, field: &Field) -> Result<Element, DeriveError> {
    if let Some(repr) = schema.types().repr(&field.type_name) {
        return Ok(Element::Leaf(Leaf {
            type_name: field.type_name.clone(),
            repr,
        }));
    }
    if schema.get(&field.type_name).is_some() {
        return Ok(Element::Struct {
            type_name: field.type_name.clone(),
        });
    }
    Err(DeriveError::UnknownType {
        struct_name: owner.to_owned(),
        field: field.name.clone(),
        type_name: field.type_name.clone(),
    })
}

/// Computes the union slots of a struct.
pub fn union_slots(schema: &Schema, strukt: &Struct) -> Result<Vec<UnionSlot>, DeriveError> {
    let mut slots = Vec::new();
    for group in strukt.groups.iter().filter(|g| g.layout == GroupLayout::Union) {
        let Some(first) = group.members.first() else {
            continue;
        };
        let bytes = schema
            .union_size(strukt, group)
            .ok_or_else(|| DeriveError::UnionNotFixed {
                struct_name: strukt.name.clone(),
                slot: first.clone(),
            })?;
        let mut members = Vec::with_capacity(group.members.len());
        for name in &group.members {
            let Some(field) = strukt.field(name) else {
                continue;
            };
            let Some(guard) = field.condition.clone() else {
                continue;
            };
            members.push(UnionMember {
                field: name.clone(),
                guard,
                element: element(schema, &strukt.name, field)?,
            });
        }
        slots.push(UnionSlot {
            name: first.clone(),
            position: strukt.position(first).unwrap_or_default(),
            condition_field: group.condition_field.clone(),
            bytes,
            members,
        });
    }
    Ok(slots)
}

/// Discriminator enum of an `array_sized` header.
fn header_group(
    schema: &Schema,
    strukt: &Struct,
    field: &Field,
    layout: &ArraySized,
) -> Result<String, DeriveError> {
    schema
        .member(&layout.header, &layout.type_field)
        .filter(|f| matches!(schema.types().resolve(&f.type_name), TypeKind::Enum(_)))
        .map(|f| f.type_name.clone())
        .ok_or_else(|| DeriveError::HeaderUnresolved {
            struct_name: strukt.name.clone(),
            field: field.name.clone(),
            header: layout.header.clone(),
            type_field: layout.type_field.clone(),
        })
}

/// Drives a visitor over the wire fields of `strukt`.
pub fn walk<V: FieldVisitor>(
    schema: &Schema,
    strukt: &Struct,
    slots: &[UnionSlot],
    visitor: &mut V,
) -> Result<Vec<Step<V::Op>>, DeriveError> {
    let mut steps = Vec::with_capacity(strukt.fields.len());
    for (position, field) in strukt.fields.iter().enumerate() {
        if strukt.union_of(&field.name).is_some() {
            if let Some(slot) = slots.iter().find(|s| s.position == position) {
                steps.push(Step {
                    field: slot.name.clone(),
                    disposition: DispositionKind::Union,
                    guard: None,
                    op: visitor.union(slot),
                });
            }
        } else if let Some(op) = visit_field(schema, strukt, field, visitor)? {
            steps.push(Step {
                field: field.name.clone(),
                disposition: field.disposition.kind(),
                guard: field.condition.clone(),
                op,
            });
        }
        steps.extend(visitor.after(position));
    }
    Ok(steps)
}

fn visit_field<V: FieldVisitor>(
    schema: &Schema,
    strukt: &Struct,
    field: &Field,
    visitor: &mut V,
) -> Result<Option<V::Op>, DeriveError> {
    let op = match &field.disposition {
        Disposition::Const(_) => return Ok(None),
        Disposition::Plain | Disposition::Inline => match element(schema, &strukt.name, field)? {
            Element::Leaf(leaf) => visitor.leaf(field, leaf),
            Element::Struct { .. } => visitor.nested(field),
        },
        Disposition::Reserved(value) => match element(schema, &strukt.name, field)? {
            Element::Leaf(leaf) => visitor.reserved(field, leaf, value),
            Element::Struct { type_name } => {
                return Err(DeriveError::UnknownType {
                    struct_name: strukt.name.clone(),
                    field: field.name.clone(),
                    type_name,
                })
            }
        },
        Disposition::Array(count) => {
            let element = element(schema, &strukt.name, field)?;
            visitor.array(field, element, count)
        }
        Disposition::ArraySized(layout) => {
            let group = header_group(schema, strukt, field, layout)?;
            visitor.array_sized(field, layout, &group)
        }
        Disposition::ArrayFill => {
            let element = element(schema, &strukt.name, field)?;
            visitor.fill(field, element)
        }
    };
    Ok(Some(op))
}

/// Derives the three plans of one struct.
///
/// # Errors
///
/// Returns a [`DeriveError`] when a type, union slot, or header cannot be
/// resolved against the frozen schema.
pub fn derive_plan(
    schema: &Schema,
    struct_name: &str,
    initializers: Vec<Initializer>,
) -> Result<CodecPlan, DeriveError> {
    let strukt = schema
        .get(struct_name)
        .ok_or_else(|| DeriveError::UnknownStruct(struct_name.to_owned()))?;
    let slots = union_slots(schema, strukt)?;
    let size = walk(schema, strukt, &slots, &mut SizeVisitor)?;
    let serialize = walk(schema, strukt, &slots, &mut EncodeVisitor::new(strukt))?;
    let deserialize = walk(schema, strukt, &slots, &mut DecodeVisitor::new(strukt, &slots))?;
    Ok(CodecPlan {
        struct_name: strukt.name.clone(),
        initializers,
        size,
        serialize,
        deserialize,
    })
}
