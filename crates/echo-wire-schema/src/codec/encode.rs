// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Serialize visitor.

use std::collections::BTreeMap;

use super::{Element, EncodeOp, FieldVisitor, Leaf, UnionSlot};
use crate::model::{ArrayCount, ArraySized, Disposition, Field, ReservedValue, Struct};

/// Emits [`EncodeOp`]s.
#[derive(Debug, Clone)]
pub struct EncodeVisitor {
    counts: BTreeMap<String, Vec<String>>,
    byte_lengths: BTreeMap<String, (String, Option<u64>)>,
}

impl EncodeVisitor {
    /// Prepares the visitor for `strukt`.
    pub fn new(strukt: &Struct) -> Self {
        let byte_lengths = strukt
            .fields
            .iter()
            .filter_map(|f| match &f.disposition {
                Disposition::ArraySized(layout) => {
                    Some((layout.length_field.clone(), (f.name.clone(), layout.align)))
                }
                _ => None,
            })
            .collect();
        Self {
            counts: strukt.length_fields.clone(),
            byte_lengths,
        }
    }
}

impl FieldVisitor for EncodeVisitor {
    type Op = EncodeOp;

    fn leaf(&mut self, field: &Field, leaf: Leaf) -> EncodeOp {
        if let Some(arrays) = self.counts.get(&field.name) {
            return EncodeOp::Length {
                leaf,
                arrays: arrays.clone(),
            };
        }
        match self.byte_lengths.get(&field.name) {
            Some((array, align)) => EncodeOp::ByteLength {
                leaf,
                array: array.clone(),
                align: *align,
            },
            None => EncodeOp::Leaf { leaf },
        }
    }

    fn nested(&mut self, field: &Field) -> EncodeOp {
        EncodeOp::Nested {
            type_name: field.type_name.clone(),
            inline: field.disposition == Disposition::Inline,
        }
    }

    fn reserved(&mut self, _field: &Field, leaf: Leaf, value: &ReservedValue) -> EncodeOp {
        EncodeOp::Reserved {
            leaf,
            value: value.clone(),
        }
    }

    fn array(&mut self, _field: &Field, element: Element, count: &ArrayCount) -> EncodeOp {
        EncodeOp::Array {
            element,
            count: count.clone(),
        }
    }

    fn array_sized(&mut self, _field: &Field, layout: &ArraySized, _group: &str) -> EncodeOp {
        EncodeOp::ArraySized {
            length_field: layout.length_field.clone(),
            align: layout.align,
        }
    }

    fn fill(&mut self, _field: &Field, element: Element) -> EncodeOp {
        EncodeOp::Fill { element }
    }

    fn union(&mut self, slot: &UnionSlot) -> EncodeOp {
        EncodeOp::Union {
            bytes: slot.bytes,
            members: slot.members.clone(),
        }
    }
}
