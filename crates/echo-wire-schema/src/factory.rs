// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Polymorphic factory registry.
//!
//! Maps `group → version → discriminator → struct` for every concrete
//! struct that carries an identity, and remembers which header struct
//! carries each group's discriminator on the wire.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::compile::CompileOptions;
use crate::model::{Disposition, HeaderBinding, Identity, StructKind};
use crate::schema::Schema;

/// Factory registry construction failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FactoryError {
    /// Two concrete structs claim the same `(group, version, id)` triple.
    #[error(
        "duplicate discriminator ({group}, version {version}, {id}): '{existing}' and '{duplicate}'"
    )]
    DuplicateDiscriminator {
        /// Discriminator enum.
        group: String,
        /// Version.
        version: u64,
        /// Discriminator value.
        id: i128,
        /// Struct registered first.
        existing: String,
        /// Struct rejected.
        duplicate: String,
    },
}

/// One registered struct, flattened for printing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactoryEntry {
    /// Discriminator enum.
    pub group: String,
    /// Version.
    pub version: u64,
    /// Discriminator value.
    pub id: i128,
    /// Discriminator member name, when the value names one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
    /// Registered struct.
    pub struct_name: String,
}

/// Decodes the header of a group from the front of a buffer.
///
/// The registry owns no codec; the caller supplies one.
pub trait HeaderDecoder {
    /// Decoder failure.
    type Error;

    /// Returns the discriminator and, when the binding names one, the
    /// version read from `buffer`.
    fn decode_header(
        &self,
        binding: &HeaderBinding,
        buffer: &[u8],
    ) -> Result<(i128, Option<u64>), Self::Error>;
}

type VersionTable = BTreeMap<u64, BTreeMap<i128, String>>;

/// Frozen `group → version → id → struct` table.
#[derive(Debug, Clone, Default)]
pub struct FactoryRegistry {
    table: BTreeMap<String, VersionTable>,
    headers: BTreeMap<String, HeaderBinding>,
    members: BTreeMap<(String, i128), String>,
    identities: BTreeMap<String, Identity>,
}

impl FactoryRegistry {
    /// Builds the registry from a validated schema.
    ///
    /// Abstract structs are skipped. A struct with a version but no
    /// identity borrows the identity of its version family's base struct
    /// (its name without the trailing digits) when
    /// [`CompileOptions::version_family_fallback`] is on.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::DuplicateDiscriminator`] on the first
    /// colliding triple.
    pub fn build(schema: &Schema, options: &CompileOptions) -> Result<Self, FactoryError> {
        let mut registry = Self::default();
        for strukt in schema.structs() {
            if strukt.kind == StructKind::Abstract {
                continue;
            }
            let identity = match (&strukt.identity, strukt.version) {
                (Some(identity), _) => identity.clone(),
                (None, Some(_)) if options.version_family_fallback => {
                    match family_identity(schema, &strukt.name) {
                        Some(identity) => identity,
                        None => {
                            warn!(
                                strukt = %strukt.name,
                                "version family base not found; struct not registered"
                            );
                            continue;
                        }
                    }
                }
                (None, _) => continue,
            };
            let version = strukt.version.unwrap_or(0);
            registry.insert(&identity, version, &strukt.name)?;
            if let Some(binding) = &strukt.header {
                registry.bind_header(&identity.group, binding);
            }
            registry.identities.insert(strukt.name.clone(), identity);
        }
        for strukt in schema.structs() {
            for field in &strukt.fields {
                let Disposition::ArraySized(layout) = &field.disposition else {
                    continue;
                };
                let Some(group) = schema.member(&layout.header, &layout.type_field) else {
                    continue;
                };
                let binding = HeaderBinding {
                    header: layout.header.clone(),
                    type_field: layout.type_field.clone(),
                    version_field: layout.version_field.clone(),
                };
                let group = group.type_name.clone();
                registry.bind_header(&group, &binding);
            }
        }
        Ok(registry)
    }

    fn insert(
        &mut self,
        identity: &Identity,
        version: u64,
        struct_name: &str,
    ) -> Result<(), FactoryError> {
        let ids = self
            .table
            .entry(identity.group.clone())
            .or_default()
            .entry(version)
            .or_default();
        if let Some(existing) = ids.get(&identity.id.value) {
            return Err(FactoryError::DuplicateDiscriminator {
                group: identity.group.clone(),
                version,
                id: identity.id.value,
                existing: existing.clone(),
                duplicate: struct_name.to_owned(),
            });
        }
        ids.insert(identity.id.value, struct_name.to_owned());
        self.members
            .insert((identity.group.clone(), identity.id.value), identity.id.name.clone());
        debug!(
            group = %identity.group,
            version,
            id = %identity.id.name,
            strukt = struct_name,
            "factory entry registered"
        );
        Ok(())
    }

    fn bind_header(&mut self, group: &str, binding: &HeaderBinding) {
        match self.headers.get(group) {
            Some(existing) if existing != binding => {
                warn!(
                    group,
                    kept = %existing.header,
                    ignored = %binding.header,
                    "conflicting header bindings; keeping the first"
                );
            }
            Some(_) => {}
            None => {
                self.headers.insert(group.to_owned(), binding.clone());
            }
        }
    }

    /// Struct registered under `(group, version, id)`.
    pub fn resolve(&self, group: &str, version: u64, id: i128) -> Option<&str> {
        self.table
            .get(group)?
            .get(&version)?
            .get(&id)
            .map(String::as_str)
    }

    /// Group and discriminator `struct_name` was registered under,
    /// including one borrowed from its version family's base.
    pub fn identity(&self, struct_name: &str) -> Option<&Identity> {
        self.identities.get(struct_name)
    }

    /// Header binding of `group`.
    pub fn header(&self, group: &str) -> Option<&HeaderBinding> {
        self.headers.get(group)
    }

    /// Whether any struct is registered under `group`.
    pub fn has_group(&self, group: &str) -> bool {
        self.table.contains_key(group)
    }

    /// Decodes `group`'s header from the front of `buffer` and resolves the
    /// concrete struct. A header without a version field resolves at
    /// version 0. `Ok(None)` when the group has no header or the triple is
    /// unregistered.
    ///
    /// # Errors
    ///
    /// Propagates the decoder's error.
    pub fn resolve_from_header<D: HeaderDecoder>(
        &self,
        decoder: &D,
        buffer: &[u8],
        group: &str,
    ) -> Result<Option<&str>, D::Error> {
        let Some(binding) = self.header(group) else {
            return Ok(None);
        };
        let (id, version) = decoder.decode_header(binding, buffer)?;
        Ok(self.resolve(group, version.unwrap_or(0), id))
    }

    /// Every registered struct, ordered by group, version, and id.
    pub fn entries(&self) -> Vec<FactoryEntry> {
        self.table
            .iter()
            .flat_map(|(group, versions)| {
                versions.iter().flat_map(move |(version, ids)| {
                    ids.iter().map(move |(id, struct_name)| FactoryEntry {
                        group: group.clone(),
                        version: *version,
                        id: *id,
                        member: self.members.get(&(group.clone(), *id)).cloned(),
                        struct_name: struct_name.clone(),
                    })
                })
            })
            .collect()
    }
}

/// Identity of the base struct of a version family: `Transfer2` falls back
/// to `Transfer`'s group and id.
fn family_identity(schema: &Schema, name: &str) -> Option<Identity> {
    let base = name.trim_end_matches(|c: char| c.is_ascii_digit());
    if base.len() == name.len() {
        return None;
    }
    schema.get(base)?.identity.clone()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::build::SchemaBuilder;
    use crate::node::parse_nodes;

    fn schema(json: &str) -> Schema {
        let nodes = parse_nodes(json).unwrap();
        let options = CompileOptions::default();
        SchemaBuilder::declare(&nodes, &options)
            .unwrap()
            .build()
            .unwrap()
    }

    const FAMILY: &str = r#"[
      {"kind": "enum", "name": "TransactionType", "width": 2, "values": [
        {"name": "TRANSFER", "value": 16724}]},
      {"kind": "struct", "name": "Transfer", "fields": [
        {"name": "TRANSACTION_TYPE", "type": "TransactionType", "disposition": "const", "value": "TRANSFER"},
        {"name": "TRANSACTION_VERSION", "type": "uint8", "disposition": "const", "value": 1},
        {"name": "amount", "type": "uint64"}]},
      {"kind": "struct", "name": "Transfer2", "fields": [
        {"name": "TRANSACTION_VERSION", "type": "uint8", "disposition": "const", "value": 2},
        {"name": "amount", "type": "uint64"},
        {"name": "fee", "type": "uint64"}]}
    ]"#;

    #[test]
    fn version_family_borrows_base_identity() {
        let schema = schema(FAMILY);
        let registry = FactoryRegistry::build(&schema, &CompileOptions::default()).unwrap();
        assert_eq!(registry.resolve("TransactionType", 1, 16724), Some("Transfer"));
        assert_eq!(registry.resolve("TransactionType", 2, 16724), Some("Transfer2"));
        assert_eq!(registry.entries().len(), 2);
        assert_eq!(
            registry.identity("Transfer2").map(|i| i.id.name.as_str()),
            Some("TRANSFER")
        );
        assert!(schema.get("Transfer2").unwrap().identity.is_none());
    }

    #[test]
    fn fallback_can_be_disabled() {
        let schema = schema(FAMILY);
        let options = CompileOptions {
            version_family_fallback: false,
            ..CompileOptions::default()
        };
        let registry = FactoryRegistry::build(&schema, &options).unwrap();
        assert_eq!(registry.resolve("TransactionType", 2, 16724), None);
        assert!(registry.identity("Transfer2").is_none());
    }

    #[test]
    fn family_base_is_name_without_digits() {
        let schema = schema(FAMILY);
        assert!(family_identity(&schema, "Transfer2").is_some());
        assert!(family_identity(&schema, "Transfer").is_none());
        assert!(family_identity(&schema, "Other7").is_none());
    }
}
