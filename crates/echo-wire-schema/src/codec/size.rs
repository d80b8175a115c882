// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Size visitor.

use super::{Element, FieldVisitor, Leaf, SizeOp, UnionSlot};
use crate::model::{ArrayCount, ArraySized, Field, ReservedValue};

/// Emits [`SizeOp`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct SizeVisitor;

impl FieldVisitor for SizeVisitor {
    type Op = SizeOp;

    fn leaf(&mut self, _field: &Field, leaf: Leaf) -> SizeOp {
        SizeOp::Fixed {
            bytes: leaf.repr.width(),
        }
    }

    fn nested(&mut self, field: &Field) -> SizeOp {
        SizeOp::Nested {
            type_name: field.type_name.clone(),
        }
    }

    fn reserved(&mut self, _field: &Field, leaf: Leaf, _value: &ReservedValue) -> SizeOp {
        SizeOp::Fixed {
            bytes: leaf.repr.width(),
        }
    }

    fn array(&mut self, _field: &Field, element: Element, _count: &ArrayCount) -> SizeOp {
        SizeOp::Array { element }
    }

    fn array_sized(&mut self, _field: &Field, layout: &ArraySized, _group: &str) -> SizeOp {
        SizeOp::ByteLength {
            length_field: layout.length_field.clone(),
        }
    }

    fn fill(&mut self, _field: &Field, element: Element) -> SizeOp {
        SizeOp::Fill { element }
    }

    fn union(&mut self, slot: &UnionSlot) -> SizeOp {
        SizeOp::Union { bytes: slot.bytes }
    }
}
