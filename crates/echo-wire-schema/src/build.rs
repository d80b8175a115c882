// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Two-pass IR builder.
//!
//! Pass 1 registers every enum and alias and reserves every struct name, so
//! fields may reference structs declared later in the document. Pass 2 turns
//! each struct node into a [`Struct`], failing fast on the first rejected
//! field of that struct.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::check::{
    check_array, check_array_fill, check_array_sized, check_condition, check_const, check_inline,
    check_plain, check_reserved, check_sizeof_target, check_struct_type, resolve_condition,
    CheckContext, DispositionTag, FieldError, FieldErrorKind, Member, MemberIndex,
    PendingCondition, StructType,
};
use crate::compile::CompileOptions;
use crate::model::{
    ArrayCount, ConditionGroup, ConstValue, Disposition, EnumMember, Field, GroupLayout,
    HeaderBinding, Identity, ReservedValue, Struct, StructKind,
};
use crate::node::{AliasNode, EnumNode, SchemaNode, StructNode};
use crate::schema::Schema;
use crate::types::{
    AliasDef, AliasLayout, EnumDef, EnumValue, Primitive, RegistryError, TypeRegistry,
};

/// Schema under construction: the type registry from pass 1 plus the
/// struct nodes waiting for pass 2.
#[derive(Debug)]
pub struct SchemaBuilder<'a> {
    options: &'a CompileOptions,
    types: TypeRegistry,
    pending: Vec<&'a StructNode>,
}

impl<'a> SchemaBuilder<'a> {
    /// Pass 1: registers enums and aliases and reserves struct names.
    ///
    /// Every node is visited even after a failure so that all duplicate or
    /// malformed definitions are reported together.
    ///
    /// # Errors
    ///
    /// Returns every [`RegistryError`] raised by the registry.
    pub fn declare(
        nodes: &'a [SchemaNode],
        options: &'a CompileOptions,
    ) -> Result<Self, Vec<RegistryError>> {
        let mut types = TypeRegistry::new();
        let mut pending = Vec::new();
        let mut errors = Vec::new();
        for node in nodes {
            let result = match node {
                SchemaNode::Enum(n) => enum_def(n).and_then(|def| types.register_enum(def)),
                SchemaNode::Alias(n) => alias_def(n).and_then(|def| types.register_alias(def)),
                SchemaNode::Struct(n) => types.register_struct(&n.name).map(|()| pending.push(n)),
            };
            if let Err(err) = result {
                warn!(decl = node.name(), %err, "declaration rejected");
                errors.push(err);
            }
        }
        if errors.is_empty() {
            Ok(Self {
                options,
                types,
                pending,
            })
        } else {
            Err(errors)
        }
    }

    /// Registry populated by pass 1.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Pass 2: builds every struct and freezes the result.
    ///
    /// Each struct stops at its first failing field. With
    /// [`CompileOptions::fail_fast`] the whole pass stops there too;
    /// otherwise the remaining structs are still built so their failures
    /// are reported in the same run.
    ///
    /// # Errors
    ///
    /// Returns the collected [`FieldError`]s.
    pub fn build(self) -> Result<Schema, Vec<FieldError>> {
        let mut structs = Vec::with_capacity(self.pending.len());
        let mut errors = Vec::new();
        for node in &self.pending {
            match build_struct(&self.types, node, self.options) {
                Ok(strukt) => {
                    debug!(strukt = %strukt.name, fields = strukt.fields.len(), "struct built");
                    structs.push(strukt);
                }
                Err(err) => {
                    errors.push(err);
                    if self.options.fail_fast {
                        break;
                    }
                }
            }
        }
        if errors.is_empty() {
            Ok(Schema::new(self.types, structs))
        } else {
            Err(errors)
        }
    }
}

fn enum_def(node: &EnumNode) -> Result<EnumDef, RegistryError> {
    let primitive = Primitive::from_layout(node.width, node.signedness).ok_or_else(|| {
        RegistryError::InvalidWidth {
            name: node.name.clone(),
            width: node.width,
        }
    })?;
    let values = node
        .values
        .iter()
        .map(|v| {
            let value = v.value.as_int().ok_or_else(|| RegistryError::EnumValueInvalid {
                enum_name: node.name.clone(),
                member: v.name.clone(),
                value: v.value.to_string(),
            })?;
            Ok(EnumValue {
                name: v.name.clone(),
                value,
                comment: v.comment.clone(),
            })
        })
        .collect::<Result<Vec<_>, RegistryError>>()?;
    Ok(EnumDef {
        name: node.name.clone(),
        primitive,
        values,
        comment: node.comment.clone(),
    })
}

fn alias_def(node: &AliasNode) -> Result<AliasDef, RegistryError> {
    let layout = match (node.width, node.array_size) {
        (Some(width), None) => {
            let primitive = Primitive::from_layout(width, node.signedness.unwrap_or_default())
                .ok_or_else(|| RegistryError::InvalidWidth {
                    name: node.name.clone(),
                    width,
                })?;
            AliasLayout::Int { primitive }
        }
        (None, Some(size)) => AliasLayout::Bytes {
            size: usize::try_from(size).map_err(|_| RegistryError::AliasLayoutInvalid {
                name: node.name.clone(),
            })?,
            print_hint: node.print_hint.clone(),
        },
        _ => {
            return Err(RegistryError::AliasLayoutInvalid {
                name: node.name.clone(),
            })
        }
    };
    Ok(AliasDef {
        name: node.name.clone(),
        layout,
        comment: node.comment.clone(),
    })
}

/// Builds one struct against a populated registry.
///
/// # Errors
///
/// Returns the first [`FieldError`] found in declaration order; conditions
/// and `sizeof` targets are resolved after the last field.
pub fn build_struct(
    types: &TypeRegistry,
    node: &StructNode,
    options: &CompileOptions,
) -> Result<Struct, FieldError> {
    let struct_name = node.name.as_str();
    let mut members = MemberIndex::default();
    let mut fields: Vec<Field> = Vec::with_capacity(node.fields.len());
    let mut conditions: Vec<(usize, PendingCondition)> = Vec::new();
    let mut struct_type: Option<StructType> = None;
    let mut fill: Option<String> = None;

    let kind = match node.disposition.as_deref() {
        None => StructKind::Normal,
        Some("abstract") => StructKind::Abstract,
        Some(other) => {
            let ctx = CheckContext {
                struct_name,
                types,
                members: &members,
            };
            return Err(ctx.fail(
                None,
                FieldErrorKind::StructDispositionInvalid,
                format_args!("struct disposition '{other}' unknown"),
            ));
        }
    };

    for raw in &node.fields {
        let ctx = CheckContext {
            struct_name,
            types,
            members: &members,
        };
        let tag = match raw.disposition.as_deref() {
            None => None,
            Some(text) => Some(DispositionTag::parse(text).ok_or_else(|| {
                ctx.fail(
                    raw.name.as_deref(),
                    FieldErrorKind::DispositionInvalid,
                    format_args!(
                        "disposition '{text}' unknown for field '{}'",
                        raw.name.as_deref().unwrap_or("<unnamed>")
                    ),
                )
            })?),
        };
        if tag == Some(DispositionTag::StructType) {
            if struct_type.is_some() {
                return Err(ctx.fail(
                    None,
                    FieldErrorKind::DispositionInvalid,
                    "more than one struct_type entry",
                ));
            }
            struct_type = Some(check_struct_type(&ctx, raw, &options.default_header_type_field)?);
            continue;
        }
        if let Some(last) = &fill {
            return Err(ctx.fail(
                raw.name.as_deref(),
                FieldErrorKind::ArrayFillNotLast,
                format_args!("array_fill field '{last}' must be the last field"),
            ));
        }
        let field = match tag {
            None => check_plain(&ctx, raw)?,
            Some(DispositionTag::Const) => check_const(&ctx, raw)?,
            Some(DispositionTag::Inline) => check_inline(&ctx, raw)?,
            Some(DispositionTag::Reserved) => check_reserved(&ctx, raw)?,
            Some(DispositionTag::Array) => check_array(&ctx, raw)?,
            Some(DispositionTag::ArraySized) => check_array_sized(&ctx, raw)?,
            Some(DispositionTag::ArrayFill) => check_array_fill(&ctx, raw)?,
            Some(DispositionTag::StructType) => continue,
        };
        let pending = raw
            .condition
            .as_deref()
            .map(|c| check_condition(&ctx, raw, c))
            .transpose()?;
        if field.disposition == Disposition::ArrayFill {
            fill = Some(field.name.clone());
        }
        members.insert(
            &field.name,
            Member {
                order: fields.len(),
                type_name: field.type_name.clone(),
                plain: field.disposition == Disposition::Plain && pending.is_none(),
            },
        );
        if let Some(pending) = pending {
            conditions.push((fields.len(), pending));
        }
        fields.push(field);
    }

    let ctx = CheckContext {
        struct_name,
        types,
        members: &members,
    };
    for (idx, pending) in &conditions {
        let condition = resolve_condition(&ctx, &fields[*idx].name, pending)?;
        fields[*idx].condition = Some(condition);
    }
    for field in &fields {
        if let Disposition::Reserved(ReservedValue::SizeOf { field: target }) = &field.disposition {
            check_sizeof_target(&ctx, &field.name, target)?;
        }
    }

    let (identity, version, header) = discriminator(&fields, struct_type, options);
    let length_fields = length_fields(&fields);
    let groups = condition_groups(&fields, &members);

    Ok(Struct {
        name: node.name.clone(),
        kind,
        fields,
        identity,
        version,
        header,
        length_fields,
        groups,
        comment: node.comment.clone(),
    })
}

/// Explicit `struct_type` metadata wins; otherwise the const-name
/// convention supplies group, discriminator, and version.
fn discriminator(
    fields: &[Field],
    struct_type: Option<StructType>,
    options: &CompileOptions,
) -> (Option<Identity>, Option<u64>, Option<HeaderBinding>) {
    let const_named = |name: &str| {
        fields.iter().find_map(|f| match &f.disposition {
            Disposition::Const(value) if f.name == name => Some((f, value)),
            _ => None,
        })
    };
    let convention_identity = const_named(&options.type_const).and_then(|(f, value)| match value {
        ConstValue::Enum { member, value } => Some(Identity {
            group: f.type_name.clone(),
            id: EnumMember {
                name: member.clone(),
                value: *value,
            },
        }),
        ConstValue::Int { .. } => None,
    });
    let convention_version = const_named(&options.version_const)
        .and_then(|(_, value)| u64::try_from(value.value()).ok());

    match struct_type {
        Some(st) => (
            Some(st.identity),
            st.version.or(convention_version),
            st.header,
        ),
        None => (convention_identity, convention_version, None),
    }
}

fn length_fields(fields: &[Field]) -> BTreeMap<String, Vec<String>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for field in fields {
        if let Disposition::Array(ArrayCount::Field { field: size }) = &field.disposition {
            map.entry(size.clone()).or_default().push(field.name.clone());
        }
    }
    map
}

/// Groups conditioned fields by condition field. A group whose condition
/// field comes after its first member is a union: a reader meets the
/// members before it can evaluate the predicate. This holds for a group of
/// one as well: a lone field conditioned on a later field still gets a
/// fixed slot, since its presence is unknown until that field is read.
fn condition_groups(fields: &[Field], members: &MemberIndex) -> Vec<ConditionGroup> {
    let mut groups: Vec<ConditionGroup> = Vec::new();
    for (pos, field) in fields.iter().enumerate() {
        let Some(condition) = &field.condition else {
            continue;
        };
        if matches!(field.disposition, Disposition::Const(_)) {
            continue;
        }
        if let Some(group) = groups
            .iter_mut()
            .find(|g| g.condition_field == condition.field)
        {
            group.members.push(field.name.clone());
            continue;
        }
        let declared_after = members
            .get(&condition.field)
            .is_some_and(|m| m.order > pos);
        groups.push(ConditionGroup {
            condition_field: condition.field.clone(),
            members: vec![field.name.clone()],
            layout: if declared_after {
                GroupLayout::Union
            } else {
                GroupLayout::Independent
            },
        });
    }
    groups
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::node::parse_nodes;

    fn build(json: &str) -> Result<Schema, Vec<FieldError>> {
        let nodes = parse_nodes(json).unwrap();
        let options = CompileOptions::default();
        SchemaBuilder::declare(&nodes, &options).unwrap().build()
    }

    #[test]
    fn forward_struct_references_are_legal() {
        let schema = build(
            r#"[
              {"kind": "struct", "name": "Outer", "fields": [{"name": "inner", "type": "Inner"}]},
              {"kind": "struct", "name": "Inner", "fields": [{"name": "x", "type": "uint8"}]}
            ]"#,
        )
        .unwrap();
        assert_eq!(schema.fixed_size("Outer"), Some(1));
    }

    #[test]
    fn array_length_field_is_recorded() {
        let schema = build(
            r#"[{"kind": "struct", "name": "S", "fields": [
                {"name": "count", "type": "uint8"},
                {"name": "items", "type": "uint16", "disposition": "array", "size": "count"}
            ]}]"#,
        )
        .unwrap();
        let s = schema.get("S").unwrap();
        assert_eq!(s.length_fields.get("count"), Some(&vec!["items".to_owned()]));
    }

    #[test]
    fn union_chosen_when_condition_field_follows() {
        let schema = build(
            r#"[
              {"kind": "enum", "name": "Shape", "width": 1, "values": [
                {"name": "CIRCLE", "value": 1}, {"name": "SQUARE", "value": 2}]},
              {"kind": "struct", "name": "S", "fields": [
                {"name": "radius", "type": "uint32", "condition": "shape",
                 "condition_operation": "equals", "condition_value": "CIRCLE"},
                {"name": "side", "type": "uint16", "condition": "shape",
                 "condition_operation": "equals", "condition_value": "SQUARE"},
                {"name": "shape", "type": "Shape"},
                {"name": "extra", "type": "uint8", "condition": "shape",
                 "condition_operation": "not equals", "condition_value": 1}
              ]}
            ]"#,
        )
        .unwrap();
        let s = schema.get("S").unwrap();
        assert_eq!(s.groups.len(), 1);
        assert_eq!(s.groups[0].layout, GroupLayout::Union);
        assert_eq!(s.groups[0].members, vec!["radius", "side", "extra"]);
        assert_eq!(s.field("side").unwrap().condition.as_ref().unwrap().value, 2);
    }

    #[test]
    fn const_convention_sets_identity() {
        let schema = build(
            r#"[
              {"kind": "enum", "name": "TransactionType", "width": 2, "values": [
                {"name": "TRANSFER", "value": 16724}]},
              {"kind": "struct", "name": "Transfer", "fields": [
                {"name": "TRANSACTION_TYPE", "type": "TransactionType", "disposition": "const", "value": "TRANSFER"},
                {"name": "TRANSACTION_VERSION", "type": "uint8", "disposition": "const", "value": 1},
                {"name": "amount", "type": "uint64"}
              ]}
            ]"#,
        )
        .unwrap();
        let s = schema.get("Transfer").unwrap();
        let identity = s.identity.as_ref().unwrap();
        assert_eq!(identity.group, "TransactionType");
        assert_eq!(identity.id.value, 16724);
        assert_eq!(s.version, Some(1));
    }

    #[test]
    fn pass_one_reports_every_duplicate() {
        let nodes = parse_nodes(
            r#"[
              {"kind": "alias", "name": "A", "width": 1},
              {"kind": "alias", "name": "A", "width": 2},
              {"kind": "struct", "name": "B", "fields": []},
              {"kind": "enum", "name": "B", "width": 1, "values": []}
            ]"#,
        )
        .unwrap();
        let options = CompileOptions::default();
        let errors = SchemaBuilder::declare(&nodes, &options).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
