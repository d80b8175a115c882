// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-field validation rules.
//!
//! One check function per disposition. Each takes the struct being built,
//! the raw field node, and read-only views of the type registry and of the
//! members declared so far. Checks never mutate anything and never panic;
//! they return the resolved piece or a [`FieldError`] whose
//! [`FieldErrorKind`] names the violated rule.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::model::{
    ArrayCount, ArraySized, Condition, ConditionOp, ConstValue, Disposition, EnumMember, Field,
    HeaderBinding, Identity, ReservedValue,
};
use crate::node::{FieldNode, Scalar};
use crate::types::{TypeKind, TypeRegistry};

/// Closed taxonomy of first-pass field failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldErrorKind {
    /// Field has no `type` key.
    TypeMissing,
    /// `type` names nothing the registry knows (or the wrong sort of thing).
    TypeUnknown,
    /// Field has no `name` key.
    NameMissing,
    /// Name already used by an earlier field.
    NameRedefined,
    /// `disposition` is not a recognised keyword.
    DispositionInvalid,
    /// `condition` without `condition_operation`.
    ConditionOperatorMissing,
    /// `condition_operation` is neither `equals` nor `not equals`.
    ConditionOperatorUnknown,
    /// `condition` without `condition_value`.
    ConditionValueMissing,
    /// `condition` names no field of this struct, or a field that cannot be tested.
    ConditionFieldUnknown,
    /// `condition_value` is neither a number nor a member of the field's enum.
    ConditionValueNotNumericNorEnum,
    /// `reserved` without `value`.
    ReservedValueMissing,
    /// `reserved` value is neither a number, an enum member, nor `sizeof <field>`.
    ReservedValueNotNumericNorEnum,
    /// `sizeof <field>` names no field of this struct.
    ReservedSizeOfUnknown,
    /// `inline` type is not a declared struct.
    InlineTypeUnknown,
    /// `const` without `value`.
    ConstValueMissing,
    /// `const` value kind does not match its declared type.
    ConstValueTypeMismatch,
    /// `const` value is text that is not a member of the declared enum.
    ConstValueNotNumericNorEnum,
    /// Literal does not fit the field's integer width.
    ValueOutOfRange,
    /// `array` without `size`.
    ArraySizeMissing,
    /// Size names no earlier unconditioned plain field (or is negative).
    ArraySizeUnknown,
    /// Size field is not an integer primitive or integer alias.
    ArraySizeNotIntegerType,
    /// `array_sized` with neither `header` nor `type`.
    ArraySizedHeaderMissing,
    /// `array_sized` without `header_type_field`.
    ArraySizedHeaderTypeFieldMissing,
    /// `array_sized` without `size`.
    ArraySizedSizeMissing,
    /// `align` is zero or not a power of two.
    ArraySizedAlignInvalid,
    /// `array_fill` element type is unknown.
    ArrayFillTypeUnknown,
    /// A field follows an `array_fill`.
    ArrayFillNotLast,
    /// Struct-level disposition other than `abstract`.
    StructDispositionInvalid,
    /// `struct_type` without `value`.
    StructTypeValueMissing,
    /// `struct_type` value or version does not resolve.
    StructTypeValueUnknown,
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A rejected field, with enough context to point at it.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[error("{kind}: {message}")]
pub struct FieldError {
    /// Struct being built.
    pub struct_name: String,
    /// Field name, when the node had one.
    pub field: Option<String>,
    /// Violated rule.
    pub kind: FieldErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// A member already seen while walking a struct's fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Declaration index.
    pub order: usize,
    /// Declared type.
    pub type_name: String,
    /// Whether the member is an unconditioned plain field.
    pub plain: bool,
}

/// Members of the struct under construction, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemberIndex {
    members: BTreeMap<String, Member>,
}

impl MemberIndex {
    /// Records a member; returns `false` if the name was taken.
    pub fn insert(&mut self, name: &str, member: Member) -> bool {
        if self.members.contains_key(name) {
            return false;
        }
        self.members.insert(name.to_owned(), member);
        true
    }

    /// Member by name.
    pub fn get(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    /// Whether a member exists.
    pub fn contains(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }
}

/// Recognised `disposition` keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispositionTag {
    /// `const`
    Const,
    /// `inline`
    Inline,
    /// `reserved`
    Reserved,
    /// `array`
    Array,
    /// `array_sized` / `array sized`
    ArraySized,
    /// `array_fill` / `array fill`
    ArrayFill,
    /// `struct_type`: discriminator metadata, not a wire field.
    StructType,
}

impl DispositionTag {
    /// Parses a disposition keyword.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "const" => Some(Self::Const),
            "inline" => Some(Self::Inline),
            "reserved" => Some(Self::Reserved),
            "array" => Some(Self::Array),
            "array_sized" | "array sized" => Some(Self::ArraySized),
            "array_fill" | "array fill" => Some(Self::ArrayFill),
            "struct_type" => Some(Self::StructType),
            _ => None,
        }
    }
}

/// Condition keys that passed the syntactic checks; resolved once every
/// member of the struct is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCondition {
    /// Condition field name.
    pub field: String,
    /// Operator.
    pub op: ConditionOp,
    /// Right-hand side as written.
    pub value: Scalar,
}

/// Discriminator metadata read from a `struct_type` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructType {
    /// Group and member.
    pub identity: Identity,
    /// Version, when given.
    pub version: Option<u64>,
    /// Header binding, when given.
    pub header: Option<HeaderBinding>,
}

/// Read-only view handed to every check.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    /// Struct being built.
    pub struct_name: &'a str,
    /// Frozen type registry from pass 1.
    pub types: &'a TypeRegistry,
    /// Members declared so far (all members when resolving conditions).
    pub members: &'a MemberIndex,
}

impl CheckContext<'_> {
    pub(crate) fn fail(
        &self,
        field: Option<&str>,
        kind: FieldErrorKind,
        detail: impl fmt::Display,
    ) -> FieldError {
        FieldError {
            struct_name: self.struct_name.to_owned(),
            field: field.map(str::to_owned),
            kind,
            message: format!("{detail} in struct '{}'", self.struct_name),
        }
    }

    fn require_name(&self, node: &FieldNode, what: &str) -> Result<String, FieldError> {
        let name = node.name.as_deref().ok_or_else(|| {
            self.fail(
                None,
                FieldErrorKind::NameMissing,
                format_args!("missing 'name' key for {what} field"),
            )
        })?;
        self.fresh_name(name)
    }

    fn fresh_name(&self, name: &str) -> Result<String, FieldError> {
        if self.members.contains(name) {
            return Err(self.fail(
                Some(name),
                FieldErrorKind::NameRedefined,
                format_args!("field '{name}' declared more than once"),
            ));
        }
        Ok(name.to_owned())
    }

    fn require_type<'n>(
        &self,
        node: &'n FieldNode,
        name: Option<&str>,
    ) -> Result<&'n str, FieldError> {
        node.type_name.as_deref().ok_or_else(|| {
            let label = name.map_or_else(String::new, |n| format!(" '{n}'"));
            self.fail(
                name,
                FieldErrorKind::TypeMissing,
                format_args!("missing 'type' key for field{label}"),
            )
        })
    }

    /// Resolves an earlier unconditioned integer field used as a length.
    fn length_field(&self, owner: &str, size: &str) -> Result<String, FieldError> {
        let member = self
            .members
            .get(size)
            .filter(|m| m.plain)
            .ok_or_else(|| {
                self.fail(
                    Some(owner),
                    FieldErrorKind::ArraySizeUnknown,
                    format_args!(
                        "size '{size}' of '{owner}' is not an earlier unconditioned plain field"
                    ),
                )
            })?;
        if !self.types.is_integer(&member.type_name) {
            return Err(self.fail(
                Some(owner),
                FieldErrorKind::ArraySizeNotIntegerType,
                format_args!(
                    "size field '{size}' of '{owner}' has non-integer type '{}'",
                    member.type_name
                ),
            ));
        }
        Ok(size.to_owned())
    }
}

fn field(name: String, type_name: &str, disposition: Disposition, node: &FieldNode) -> Field {
    Field {
        name,
        type_name: type_name.to_owned(),
        disposition,
        condition: None,
        comment: node.comment.clone(),
    }
}

/// Checks a field without a disposition.
pub fn check_plain(ctx: &CheckContext<'_>, node: &FieldNode) -> Result<Field, FieldError> {
    let name = ctx.require_name(node, "plain")?;
    let ty = ctx.require_type(node, Some(&name))?;
    if ctx.types.resolve(ty) == TypeKind::Unknown {
        return Err(ctx.fail(
            Some(&name),
            FieldErrorKind::TypeUnknown,
            format_args!("type '{ty}' of field '{name}' is unknown"),
        ));
    }
    Ok(field(name, ty, Disposition::Plain, node))
}

/// Checks the syntactic part of a field's condition keys.
pub fn check_condition(
    ctx: &CheckContext<'_>,
    node: &FieldNode,
    condition: &str,
) -> Result<PendingCondition, FieldError> {
    let name = node.name.as_deref();
    let label = name.unwrap_or("<unnamed>");
    let op_text = node.condition_operation.as_deref().ok_or_else(|| {
        ctx.fail(
            name,
            FieldErrorKind::ConditionOperatorMissing,
            format_args!("condition operator not defined for conditional field '{label}'"),
        )
    })?;
    let op = ConditionOp::parse(op_text).ok_or_else(|| {
        ctx.fail(
            name,
            FieldErrorKind::ConditionOperatorUnknown,
            format_args!("condition operator '{op_text}' not valid for field '{label}'"),
        )
    })?;
    let value = node.condition_value.clone().ok_or_else(|| {
        ctx.fail(
            name,
            FieldErrorKind::ConditionValueMissing,
            format_args!("condition value not defined for conditional field '{label}'"),
        )
    })?;
    Ok(PendingCondition {
        field: condition.to_owned(),
        op,
        value,
    })
}

/// Resolves a condition against the complete member set of its struct.
pub fn resolve_condition(
    ctx: &CheckContext<'_>,
    owner: &str,
    pending: &PendingCondition,
) -> Result<Condition, FieldError> {
    let target = &pending.field;
    let member = ctx.members.get(target).ok_or_else(|| {
        ctx.fail(
            Some(owner),
            FieldErrorKind::ConditionFieldUnknown,
            format_args!("condition variable '{target}' of field '{owner}' not defined"),
        )
    })?;
    if !member.plain || ctx.types.int_repr(&member.type_name).is_none() {
        return Err(ctx.fail(
            Some(owner),
            FieldErrorKind::ConditionFieldUnknown,
            format_args!(
                "condition variable '{target}' of field '{owner}' is not an unconditioned integer or enum field"
            ),
        ));
    }
    let value = match (pending.value.as_int(), ctx.types.enum_def(&member.type_name)) {
        (Some(v), _) => Some(v),
        (None, Some(e)) => pending.value.as_text().and_then(|t| e.value_of(t)),
        (None, None) => None,
    };
    let value = value.ok_or_else(|| {
        ctx.fail(
            Some(owner),
            FieldErrorKind::ConditionValueNotNumericNorEnum,
            format_args!(
                "condition value '{}' of field '{owner}' is neither numeric nor a member of '{}'",
                pending.value, member.type_name
            ),
        )
    })?;
    Ok(Condition {
        field: target.clone(),
        op: pending.op,
        value,
        literal: pending.value.to_string(),
    })
}

/// Checks a `const` field.
pub fn check_const(ctx: &CheckContext<'_>, node: &FieldNode) -> Result<Field, FieldError> {
    let name = ctx.require_name(node, "const")?;
    let ty = ctx.require_type(node, Some(&name))?;
    let raw = node.value.as_ref().ok_or_else(|| {
        ctx.fail(
            Some(&name),
            FieldErrorKind::ConstValueMissing,
            format_args!("'value' key missing for const field '{name}'"),
        )
    })?;
    let resolved = ctx.types.resolve(ty);
    let value = match (raw.as_int(), resolved) {
        (_, TypeKind::Unknown) => {
            return Err(ctx.fail(
                Some(&name),
                FieldErrorKind::TypeUnknown,
                format_args!("type '{ty}' of const field '{name}' is unknown"),
            ))
        }
        (Some(v), TypeKind::Primitive(_) | TypeKind::Alias(_)) if ctx.types.is_integer(ty) => {
            let width = ctx.types.int_repr(ty);
            if !width.is_some_and(|p| p.contains(v)) {
                return Err(ctx.fail(
                    Some(&name),
                    FieldErrorKind::ValueOutOfRange,
                    format_args!("value {v} of const field '{name}' does not fit '{ty}'"),
                ));
            }
            ConstValue::Int { value: v }
        }
        (Some(v), _) => {
            return Err(ctx.fail(
                Some(&name),
                FieldErrorKind::ConstValueTypeMismatch,
                format_args!("value '{v}' and type '{ty}' mismatch for const field '{name}'"),
            ))
        }
        (None, TypeKind::Enum(e)) => {
            let member = raw.as_text().unwrap_or_default();
            let value = e.value_of(member).ok_or_else(|| {
                ctx.fail(
                    Some(&name),
                    FieldErrorKind::ConstValueNotNumericNorEnum,
                    format_args!(
                        "value '{raw}' of const field '{name}' is not numeric nor a member of '{ty}'"
                    ),
                )
            })?;
            ConstValue::Enum {
                member: member.to_owned(),
                value,
            }
        }
        (None, _) => {
            return Err(ctx.fail(
                Some(&name),
                FieldErrorKind::ConstValueNotNumericNorEnum,
                format_args!("value '{raw}' of const field '{name}' is not numeric"),
            ))
        }
    };
    Ok(field(name, ty, Disposition::Const(value), node))
}

/// Checks an `inline` field. The field takes its type's name unless named.
pub fn check_inline(ctx: &CheckContext<'_>, node: &FieldNode) -> Result<Field, FieldError> {
    let ty = ctx.require_type(node, node.name.as_deref())?;
    if !ctx.types.is_struct(ty) {
        return Err(ctx.fail(
            node.name.as_deref(),
            FieldErrorKind::InlineTypeUnknown,
            format_args!("inline type '{ty}' is not a declared struct"),
        ));
    }
    let name = ctx.fresh_name(node.name.as_deref().unwrap_or(ty))?;
    Ok(field(name, ty, Disposition::Inline, node))
}

/// Checks a `reserved` field. `sizeof` targets are resolved after the
/// struct is complete.
pub fn check_reserved(ctx: &CheckContext<'_>, node: &FieldNode) -> Result<Field, FieldError> {
    let name = ctx.require_name(node, "reserved")?;
    let ty = ctx.require_type(node, Some(&name))?;
    let Some(width) = ctx.types.int_repr(ty) else {
        return Err(ctx.fail(
            Some(&name),
            FieldErrorKind::TypeUnknown,
            format_args!("type '{ty}' of reserved field '{name}' is not an integer type"),
        ));
    };
    let raw = node.value.as_ref().ok_or_else(|| {
        ctx.fail(
            Some(&name),
            FieldErrorKind::ReservedValueMissing,
            format_args!("'value' key missing for reserved field '{name}'"),
        )
    })?;
    let not_numeric = || {
        ctx.fail(
            Some(&name),
            FieldErrorKind::ReservedValueNotNumericNorEnum,
            format_args!("value '{raw}' of reserved field '{name}' is not numeric nor enum"),
        )
    };
    let value = if let Some(v) = raw.as_int() {
        if !width.contains(v) {
            return Err(ctx.fail(
                Some(&name),
                FieldErrorKind::ValueOutOfRange,
                format_args!("value {v} of reserved field '{name}' does not fit '{ty}'"),
            ));
        }
        ReservedValue::Int { value: v }
    } else {
        let text = raw.as_text().ok_or_else(not_numeric)?;
        let words: Vec<&str> = text.split_whitespace().collect();
        match words.as_slice() {
            ["sizeof", target] => ReservedValue::SizeOf {
                field: (*target).to_owned(),
            },
            [member] => {
                let value = ctx
                    .types
                    .enum_def(ty)
                    .and_then(|e| e.value_of(member))
                    .ok_or_else(not_numeric)?;
                ReservedValue::Enum {
                    member: (*member).to_owned(),
                    value,
                }
            }
            _ => return Err(not_numeric()),
        }
    };
    Ok(field(name, ty, Disposition::Reserved(value), node))
}

/// Checks a `sizeof` target once every member is known.
pub fn check_sizeof_target(
    ctx: &CheckContext<'_>,
    owner: &str,
    target: &str,
) -> Result<(), FieldError> {
    if ctx.members.contains(target) {
        return Ok(());
    }
    Err(ctx.fail(
        Some(owner),
        FieldErrorKind::ReservedSizeOfUnknown,
        format_args!("'sizeof {target}' of reserved field '{owner}' names no field"),
    ))
}

/// Checks an `array` field.
pub fn check_array(ctx: &CheckContext<'_>, node: &FieldNode) -> Result<Field, FieldError> {
    let name = ctx.require_name(node, "array")?;
    let ty = ctx.require_type(node, Some(&name))?;
    if ctx.types.resolve(ty) == TypeKind::Unknown {
        return Err(ctx.fail(
            Some(&name),
            FieldErrorKind::TypeUnknown,
            format_args!("element type '{ty}' of array '{name}' is unknown"),
        ));
    }
    let size = node.size.as_ref().ok_or_else(|| {
        ctx.fail(
            Some(&name),
            FieldErrorKind::ArraySizeMissing,
            format_args!("array '{name}' missing 'size' key"),
        )
    })?;
    let count = match (size.as_int(), size.as_text()) {
        (Some(n), _) => {
            let count = u64::try_from(n).map_err(|_| {
                ctx.fail(
                    Some(&name),
                    FieldErrorKind::ArraySizeUnknown,
                    format_args!("array '{name}' has negative size {n}"),
                )
            })?;
            ArrayCount::Literal { count }
        }
        (None, Some(text)) => ArrayCount::Field {
            field: ctx.length_field(&name, text)?,
        },
        (None, None) => {
            return Err(ctx.fail(
                Some(&name),
                FieldErrorKind::ArraySizeUnknown,
                format_args!("array '{name}' size '{size}' not understood"),
            ))
        }
    };
    Ok(field(name, ty, Disposition::Array(count), node))
}

/// Checks an `array_sized` field. Whether the header exists and declares the
/// discriminator is a cross-struct fact left to the dependency pass.
pub fn check_array_sized(ctx: &CheckContext<'_>, node: &FieldNode) -> Result<Field, FieldError> {
    let name = ctx.require_name(node, "array_sized")?;
    let header = node
        .header
        .as_deref()
        .or(node.type_name.as_deref())
        .ok_or_else(|| {
            ctx.fail(
                Some(&name),
                FieldErrorKind::ArraySizedHeaderMissing,
                format_args!("array_sized '{name}' missing 'header' key"),
            )
        })?;
    let type_field = node.header_type_field.as_deref().ok_or_else(|| {
        ctx.fail(
            Some(&name),
            FieldErrorKind::ArraySizedHeaderTypeFieldMissing,
            format_args!("array_sized '{name}' missing 'header_type_field' key"),
        )
    })?;
    let size = node.size.as_ref().ok_or_else(|| {
        ctx.fail(
            Some(&name),
            FieldErrorKind::ArraySizedSizeMissing,
            format_args!("array_sized '{name}' missing 'size' key"),
        )
    })?;
    let Some(size) = size.as_text() else {
        return Err(ctx.fail(
            Some(&name),
            FieldErrorKind::ArraySizeUnknown,
            format_args!("array_sized '{name}' size must name a byte-length field"),
        ));
    };
    let length_field = ctx.length_field(&name, size)?;
    let align = match &node.align {
        None => None,
        Some(raw) => {
            let align = raw
                .as_int()
                .and_then(|a| u64::try_from(a).ok())
                .filter(|a| a.is_power_of_two())
                .ok_or_else(|| {
                    ctx.fail(
                        Some(&name),
                        FieldErrorKind::ArraySizedAlignInvalid,
                        format_args!("array_sized '{name}' alignment '{raw}' is not a power of two"),
                    )
                })?;
            Some(align)
        }
    };
    let element = node.type_name.as_deref().unwrap_or(header);
    let layout = ArraySized {
        length_field,
        header: header.to_owned(),
        type_field: type_field.to_owned(),
        version_field: node.header_version_field.clone(),
        align,
    };
    Ok(field(name, element, Disposition::ArraySized(layout), node))
}

/// Checks an `array_fill` field. Its position is checked by the builder.
pub fn check_array_fill(ctx: &CheckContext<'_>, node: &FieldNode) -> Result<Field, FieldError> {
    let name = ctx.require_name(node, "array_fill")?;
    let ty = ctx.require_type(node, Some(&name))?;
    if ctx.types.resolve(ty) == TypeKind::Unknown {
        return Err(ctx.fail(
            Some(&name),
            FieldErrorKind::ArrayFillTypeUnknown,
            format_args!("type '{ty}' of array_fill field '{name}' is unknown"),
        ));
    }
    Ok(field(name, ty, Disposition::ArrayFill, node))
}

/// Checks a `struct_type` entry: `type` is the group enum, `value` the
/// discriminator member.
pub fn check_struct_type(
    ctx: &CheckContext<'_>,
    node: &FieldNode,
    default_type_field: &str,
) -> Result<StructType, FieldError> {
    let ty = ctx.require_type(node, node.name.as_deref())?;
    let Some(group) = ctx.types.enum_def(ty) else {
        return Err(ctx.fail(
            None,
            FieldErrorKind::TypeUnknown,
            format_args!("struct_type group '{ty}' is not an enum"),
        ));
    };
    let raw = node.value.as_ref().ok_or_else(|| {
        ctx.fail(
            None,
            FieldErrorKind::StructTypeValueMissing,
            "struct_type missing 'value' key",
        )
    })?;
    let member = match raw.as_int() {
        Some(v) => group.member_of(v),
        None => raw
            .as_text()
            .and_then(|t| group.value_of(t).and_then(|v| group.member_of(v))),
    };
    let unknown = |what: &Scalar| {
        ctx.fail(
            None,
            FieldErrorKind::StructTypeValueUnknown,
            format_args!("struct_type value '{what}' does not resolve in '{ty}'"),
        )
    };
    let member = member.ok_or_else(|| unknown(raw))?;
    let value = group.value_of(member).ok_or_else(|| unknown(raw))?;
    let version = match &node.version {
        None => None,
        Some(v) => Some(
            v.as_int()
                .and_then(|n| u64::try_from(n).ok())
                .ok_or_else(|| unknown(v))?,
        ),
    };
    let header = node.header.as_ref().map(|h| HeaderBinding {
        header: h.clone(),
        type_field: node
            .header_type_field
            .clone()
            .unwrap_or_else(|| default_type_field.to_owned()),
        version_field: node.header_version_field.clone(),
    });
    Ok(StructType {
        identity: Identity {
            group: group.name.clone(),
            id: EnumMember {
                name: member.to_owned(),
                value,
            },
        },
        version,
        header,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{EnumDef, EnumValue, Primitive};

    fn registry() -> TypeRegistry {
        let mut types = TypeRegistry::new();
        types
            .register_enum(EnumDef {
                name: "Kind".into(),
                primitive: Primitive::Uint8,
                values: vec![
                    EnumValue {
                        name: "A".into(),
                        value: 1,
                        comment: None,
                    },
                    EnumValue {
                        name: "B".into(),
                        value: 2,
                        comment: None,
                    },
                ],
                comment: None,
            })
            .unwrap();
        types.register_struct("Inner").unwrap();
        types
    }

    fn node(name: &str, ty: &str) -> FieldNode {
        FieldNode {
            name: Some(name.into()),
            type_name: Some(ty.into()),
            ..FieldNode::default()
        }
    }

    #[test]
    fn const_accepts_enum_member_and_rejects_mismatch() {
        let types = registry();
        let members = MemberIndex::default();
        let ctx = CheckContext {
            struct_name: "S",
            types: &types,
            members: &members,
        };
        let mut n = node("K", "Kind");
        n.value = Some(Scalar::from("B"));
        let f = check_const(&ctx, &n).unwrap();
        assert_eq!(
            f.disposition,
            Disposition::Const(ConstValue::Enum {
                member: "B".into(),
                value: 2
            })
        );

        n.value = Some(Scalar::Unsigned(2));
        assert_eq!(
            check_const(&ctx, &n).unwrap_err().kind,
            FieldErrorKind::ConstValueTypeMismatch
        );

        n.value = Some(Scalar::from("C"));
        assert_eq!(
            check_const(&ctx, &n).unwrap_err().kind,
            FieldErrorKind::ConstValueNotNumericNorEnum
        );
    }

    #[test]
    fn array_size_must_be_earlier_plain_integer() {
        let types = registry();
        let mut members = MemberIndex::default();
        members.insert(
            "count",
            Member {
                order: 0,
                type_name: "uint16".into(),
                plain: true,
            },
        );
        members.insert(
            "kind",
            Member {
                order: 1,
                type_name: "Kind".into(),
                plain: true,
            },
        );
        let ctx = CheckContext {
            struct_name: "S",
            types: &types,
            members: &members,
        };
        let mut n = node("items", "uint8");
        n.disposition = Some("array".into());
        n.size = Some(Scalar::from("count"));
        assert!(check_array(&ctx, &n).is_ok());
        n.size = Some(Scalar::from("kind"));
        assert_eq!(
            check_array(&ctx, &n).unwrap_err().kind,
            FieldErrorKind::ArraySizeNotIntegerType
        );
        n.size = Some(Scalar::from("later"));
        assert_eq!(
            check_array(&ctx, &n).unwrap_err().kind,
            FieldErrorKind::ArraySizeUnknown
        );
        n.size = None;
        assert_eq!(
            check_array(&ctx, &n).unwrap_err().kind,
            FieldErrorKind::ArraySizeMissing
        );
    }

    #[test]
    fn reserved_parses_sizeof_and_rejects_text() {
        let types = registry();
        let members = MemberIndex::default();
        let ctx = CheckContext {
            struct_name: "S",
            types: &types,
            members: &members,
        };
        let mut n = node("pad", "uint32");
        n.value = Some(Scalar::from("sizeof body"));
        let f = check_reserved(&ctx, &n).unwrap();
        assert_eq!(
            f.disposition,
            Disposition::Reserved(ReservedValue::SizeOf {
                field: "body".into()
            })
        );
        n.value = Some(Scalar::from("zero"));
        assert_eq!(
            check_reserved(&ctx, &n).unwrap_err().kind,
            FieldErrorKind::ReservedValueNotNumericNorEnum
        );
    }

    #[test]
    fn disposition_keywords() {
        assert_eq!(DispositionTag::parse("array sized"), Some(DispositionTag::ArraySized));
        assert_eq!(DispositionTag::parse("array_fill"), Some(DispositionTag::ArrayFill));
        assert_eq!(DispositionTag::parse("not_a_real_disposition"), None);
    }
}
