// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deserialize visitor.
//!
//! Two checks cannot run where their field sits: a union slot is decoded
//! before its condition field, and a `sizeof` reservation may precede its
//! target. Both are scheduled as deferred steps placed after the last field
//! they depend on.

use std::collections::{BTreeMap, BTreeSet};

use super::{DecodeOp, Element, FieldVisitor, Leaf, Step, UnionSlot};
use crate::model::{
    ArrayCount, ArraySized, Disposition, DispositionKind, Field, ReservedValue, Struct,
};

/// Emits [`DecodeOp`]s and the deferred checks.
#[derive(Debug, Clone)]
pub struct DecodeVisitor {
    counts: BTreeSet<String>,
    deferred: BTreeMap<usize, Vec<Step<DecodeOp>>>,
}

impl DecodeVisitor {
    /// Prepares the visitor and schedules deferred steps for `strukt`.
    pub fn new(strukt: &Struct, slots: &[UnionSlot]) -> Self {
        let mut deferred: BTreeMap<usize, Vec<Step<DecodeOp>>> = BTreeMap::new();
        let resolved_at = |slot: &UnionSlot| {
            strukt
                .position(&slot.condition_field)
                .map_or(slot.position, |p| p.max(slot.position))
        };
        for slot in slots {
            deferred.entry(resolved_at(slot)).or_default().push(Step {
                field: slot.name.clone(),
                disposition: DispositionKind::Union,
                guard: None,
                op: DecodeOp::ResolveUnion {
                    members: slot.members.clone(),
                },
            });
        }
        for (position, field) in strukt.fields.iter().enumerate() {
            let Disposition::Reserved(ReservedValue::SizeOf { field: target }) = &field.disposition
            else {
                continue;
            };
            let target_ready = slots
                .iter()
                .find(|s| s.members.iter().any(|m| &m.field == target))
                .map(resolved_at)
                .or_else(|| strukt.position(target))
                .unwrap_or(position);
            deferred
                .entry(position.max(target_ready))
                .or_default()
                .push(Step {
                    field: field.name.clone(),
                    disposition: DispositionKind::Reserved,
                    guard: field.condition.clone(),
                    op: DecodeOp::CheckSizeOf {
                        reserved: field.name.clone(),
                        target: target.clone(),
                    },
                });
        }
        Self {
            counts: strukt.length_fields.keys().cloned().collect(),
            deferred,
        }
    }
}

impl FieldVisitor for DecodeVisitor {
    type Op = DecodeOp;

    fn leaf(&mut self, field: &Field, leaf: Leaf) -> DecodeOp {
        if self.counts.contains(&field.name) {
            DecodeOp::Length { leaf }
        } else {
            DecodeOp::Leaf { leaf }
        }
    }

    fn nested(&mut self, field: &Field) -> DecodeOp {
        DecodeOp::Nested {
            type_name: field.type_name.clone(),
            inline: field.disposition == Disposition::Inline,
        }
    }

    fn reserved(&mut self, _field: &Field, leaf: Leaf, value: &ReservedValue) -> DecodeOp {
        let expect = match value {
            ReservedValue::Int { value } | ReservedValue::Enum { value, .. } => Some(*value),
            ReservedValue::SizeOf { .. } => None,
        };
        DecodeOp::Reserved { leaf, expect }
    }

    fn array(&mut self, _field: &Field, element: Element, count: &ArrayCount) -> DecodeOp {
        DecodeOp::Array {
            element,
            count: count.clone(),
        }
    }

    fn array_sized(&mut self, _field: &Field, layout: &ArraySized, group: &str) -> DecodeOp {
        DecodeOp::ArraySized {
            length_field: layout.length_field.clone(),
            header: layout.header.clone(),
            type_field: layout.type_field.clone(),
            version_field: layout.version_field.clone(),
            group: group.to_owned(),
            align: layout.align,
        }
    }

    fn fill(&mut self, _field: &Field, element: Element) -> DecodeOp {
        DecodeOp::Fill { element }
    }

    fn union(&mut self, slot: &UnionSlot) -> DecodeOp {
        DecodeOp::Union { bytes: slot.bytes }
    }

    fn after(&mut self, position: usize) -> Vec<Step<DecodeOp>> {
        self.deferred.remove(&position).unwrap_or_default()
    }
}
