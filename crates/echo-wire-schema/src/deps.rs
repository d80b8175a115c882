// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cross-struct dependency checks.
//!
//! Runs over the frozen [`Schema`], after every struct has been declared and
//! built, because a header struct may be declared after the struct that
//! names it.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::model::{Disposition, Field, GroupLayout, HeaderBinding, Struct};
use crate::schema::Schema;
use crate::types::TypeKind;

/// Closed taxonomy of second-pass failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DependencyErrorKind {
    /// The named header struct does not exist.
    HeaderNotDeclared,
    /// The header does not declare the discriminator field.
    TypeFieldNotDeclared,
    /// The header does not declare the named version field.
    VersionFieldNotDeclared,
    /// The header's discriminator field is not enum-typed.
    TypeFieldNotEnum,
    /// A union member has no fixed wire size.
    UnionMemberNotFixedSize,
    /// A struct embeds itself, directly or through other structs, without
    /// a vector in between, so its layout never ends.
    RecursiveLayout,
}

impl fmt::Display for DependencyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A cross-struct reference that does not hold.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[error("{kind}: {message}")]
pub struct DependencyError {
    /// Struct that holds the reference.
    pub struct_name: String,
    /// Field (or `struct_type`) that holds the reference.
    pub field: String,
    /// Violated rule.
    pub kind: DependencyErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Checks every header reference, union group, and embedding chain in the
/// schema.
pub fn check_dependencies(schema: &Schema) -> Vec<DependencyError> {
    let mut errors = Vec::new();
    for strukt in schema.structs() {
        for field in &strukt.fields {
            if let Disposition::ArraySized(layout) = &field.disposition {
                let binding = HeaderBinding {
                    header: layout.header.clone(),
                    type_field: layout.type_field.clone(),
                    version_field: layout.version_field.clone(),
                };
                if let Err(err) = check_header(schema, strukt, &field.name, &binding) {
                    errors.push(err);
                }
            }
        }
        if let Some(binding) = &strukt.header {
            if let Err(err) = check_header(schema, strukt, "struct_type", binding) {
                errors.push(err);
            }
        }
        errors.extend(check_unions(schema, strukt));
        errors.extend(check_containment(schema, strukt));
    }
    debug!(errors = errors.len(), "dependency pass finished");
    errors
}

/// Confirms a header struct exists and declares the discriminator (and
/// version) fields. Members reached through `inline` fields count.
pub fn check_header(
    schema: &Schema,
    owner: &Struct,
    field: &str,
    binding: &HeaderBinding,
) -> Result<(), DependencyError> {
    let fail = |kind, message: String| DependencyError {
        struct_name: owner.name.clone(),
        field: field.to_owned(),
        kind,
        message: format!("{message} (referenced by '{field}' in struct '{}')", owner.name),
    };
    let header = &binding.header;
    if schema.get(header).is_none() {
        return Err(fail(
            DependencyErrorKind::HeaderNotDeclared,
            format!("header '{header}' not declared"),
        ));
    }
    let type_field = &binding.type_field;
    let Some(discriminator) = schema.member(header, type_field) else {
        return Err(fail(
            DependencyErrorKind::TypeFieldNotDeclared,
            format!("field '{type_field}' not declared in header '{header}'"),
        ));
    };
    if !matches!(schema.types().resolve(&discriminator.type_name), TypeKind::Enum(_)) {
        return Err(fail(
            DependencyErrorKind::TypeFieldNotEnum,
            format!(
                "field '{type_field}' in header '{header}' has type '{}', not an enum",
                discriminator.type_name
            ),
        ));
    }
    if let Some(version_field) = &binding.version_field {
        if schema.member(header, version_field).is_none() {
            return Err(fail(
                DependencyErrorKind::VersionFieldNotDeclared,
                format!("field '{version_field}' not declared in header '{header}'"),
            ));
        }
    }
    Ok(())
}

fn check_unions(schema: &Schema, strukt: &Struct) -> Vec<DependencyError> {
    strukt
        .groups
        .iter()
        .filter(|g| g.layout == GroupLayout::Union)
        .flat_map(|g| g.members.iter())
        .filter_map(|member| {
            let field = strukt.field(member)?;
            let shaped = matches!(field.disposition, Disposition::Plain | Disposition::Inline);
            if shaped && schema.field_fixed_size(field).is_some() {
                return None;
            }
            Some(DependencyError {
                struct_name: strukt.name.clone(),
                field: member.clone(),
                kind: DependencyErrorKind::UnionMemberNotFixedSize,
                message: format!(
                    "union member '{member}' in struct '{}' must be a fixed-size plain or inline field",
                    strukt.name
                ),
            })
        })
        .collect()
}

/// Plain and inline struct fields are stored by value; vectors are not.
fn embeds(schema: &Schema, field: &Field) -> bool {
    matches!(field.disposition, Disposition::Plain | Disposition::Inline)
        && schema.get(&field.type_name).is_some()
}

/// Chain of embedded struct names leading from `from` to `target`.
fn embedding_chain(
    schema: &Schema,
    from: &str,
    target: &str,
    seen: &mut BTreeSet<String>,
) -> Option<Vec<String>> {
    if from == target {
        return Some(vec![from.to_owned()]);
    }
    if !seen.insert(from.to_owned()) {
        return None;
    }
    schema
        .get(from)?
        .fields
        .iter()
        .filter(|f| embeds(schema, f))
        .find_map(|f| {
            let mut chain = embedding_chain(schema, &f.type_name, target, seen)?;
            chain.insert(0, from.to_owned());
            Some(chain)
        })
}

fn check_containment(schema: &Schema, strukt: &Struct) -> Option<DependencyError> {
    let mut seen = BTreeSet::new();
    strukt
        .fields
        .iter()
        .filter(|f| embeds(schema, f))
        .find_map(|field| {
            let chain = embedding_chain(schema, &field.type_name, &strukt.name, &mut seen)?;
            Some(DependencyError {
                struct_name: strukt.name.clone(),
                field: field.name.clone(),
                kind: DependencyErrorKind::RecursiveLayout,
                message: format!(
                    "struct '{}' contains itself through '{}' ({} -> {})",
                    strukt.name,
                    field.name,
                    strukt.name,
                    chain.join(" -> ")
                ),
            })
        })
}
