// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Compile driver: schema nodes in, plans and factory table out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::build::SchemaBuilder;
use crate::check::FieldError;
use crate::codec::{derive_plan, CodecPlan, DeriveError, Initializer};
use crate::deps::{check_dependencies, DependencyError};
use crate::exec::Interpreter;
use crate::factory::{FactoryError, FactoryRegistry};
use crate::model::{HeaderBinding, Struct};
use crate::node::SchemaNode;
use crate::schema::Schema;
use crate::types::{RegistryError, TypeKind};

/// Policy knobs of the compile driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Const field whose enum value is a struct's discriminator.
    pub type_const: String,
    /// Const field holding a struct's version.
    pub version_const: String,
    /// Header discriminator field assumed when a `struct_type` entry omits it.
    pub default_header_type_field: String,
    /// Header version field assumed when initializing discriminators.
    pub default_header_version_field: String,
    /// Lets versioned structs borrow their family base's identity.
    pub version_family_fallback: bool,
    /// Stop at the first failing struct.
    pub fail_fast: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            type_const: "TRANSACTION_TYPE".to_owned(),
            version_const: "TRANSACTION_VERSION".to_owned(),
            default_header_type_field: "type".to_owned(),
            default_header_version_field: "version".to_owned(),
            version_family_fallback: true,
            fail_fast: false,
        }
    }
}

/// Phase that rejected the schema, with every diagnostic it collected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    /// Pass 1: type registry.
    #[error("{} type registry error(s)", .0.len())]
    Registry(Vec<RegistryError>),
    /// Pass 2: field checks.
    #[error("{} field error(s)", .0.len())]
    Fields(Vec<FieldError>),
    /// Dependency pass.
    #[error("{} dependency error(s)", .0.len())]
    Dependencies(Vec<DependencyError>),
    /// Factory registry construction.
    #[error(transparent)]
    Factory(#[from] FactoryError),
    /// Plan derivation.
    #[error(transparent)]
    Derive(#[from] DeriveError),
}

impl CompileError {
    /// Every collected message, one per failure.
    pub fn diagnostics(&self) -> Vec<String> {
        match self {
            Self::Registry(errors) => errors.iter().map(ToString::to_string).collect(),
            Self::Fields(errors) => errors.iter().map(ToString::to_string).collect(),
            Self::Dependencies(errors) => errors.iter().map(ToString::to_string).collect(),
            Self::Factory(err) => vec![err.to_string()],
            Self::Derive(err) => vec![err.to_string()],
        }
    }
}

/// Frozen result of a successful compile.
#[derive(Debug, Clone)]
pub struct Compilation {
    /// Validated struct arena.
    pub schema: Schema,
    /// Polymorphic dispatch table.
    pub factory: FactoryRegistry,
    /// Plans keyed by struct name.
    pub plans: BTreeMap<String, CodecPlan>,
}

impl Compilation {
    /// Plan of one struct.
    pub fn plan(&self, name: &str) -> Option<&CodecPlan> {
        self.plans.get(name)
    }

    /// Reference interpreter over this compilation.
    pub fn interpreter(&self) -> Interpreter<'_> {
        Interpreter::new(&self.schema, &self.factory, &self.plans)
    }
}

/// Runs every phase in order, each on the frozen output of the last.
///
/// # Errors
///
/// Returns the first phase that failed, carrying every diagnostic that
/// phase collected.
#[instrument(skip_all, fields(nodes = nodes.len()))]
pub fn compile(
    nodes: &[SchemaNode],
    options: &CompileOptions,
) -> Result<Compilation, CompileError> {
    let builder = SchemaBuilder::declare(nodes, options).map_err(CompileError::Registry)?;
    info!(
        enums = builder.types().enums().count(),
        aliases = builder.types().aliases().count(),
        "types registered"
    );
    let schema = builder.build().map_err(CompileError::Fields)?;
    info!(structs = schema.structs().len(), "structs built");

    let dependencies = check_dependencies(&schema);
    if !dependencies.is_empty() {
        return Err(CompileError::Dependencies(dependencies));
    }

    let factory = FactoryRegistry::build(&schema, options)?;
    info!(entries = factory.entries().len(), "factory registry built");

    let mut plans = BTreeMap::new();
    for strukt in schema.structs() {
        let initializers = initializers(&schema, &factory, strukt, options);
        plans.insert(strukt.name.clone(), derive_plan(&schema, &strukt.name, initializers)?);
    }
    info!(plans = plans.len(), "plans derived");

    Ok(Compilation {
        schema,
        factory,
        plans,
    })
}

/// Discriminator defaults: the struct's registered id written into its
/// header's type field (and version into the version field) when the caller
/// leaves them out. The id comes from the factory so version-family members
/// get their base's discriminator.
fn initializers(
    schema: &Schema,
    factory: &FactoryRegistry,
    strukt: &Struct,
    options: &CompileOptions,
) -> Vec<Initializer> {
    let Some(identity) = factory.identity(&strukt.name) else {
        return Vec::new();
    };
    let binding = strukt
        .header
        .clone()
        .or_else(|| factory.header(&identity.group).cloned())
        .unwrap_or_else(|| HeaderBinding {
            header: strukt.name.clone(),
            type_field: options.default_header_type_field.clone(),
            version_field: Some(options.default_header_version_field.clone()),
        });

    let mut out = Vec::new();
    if let Some(path) = schema.member_path(&strukt.name, &binding.type_field) {
        let typed_as_group = schema
            .member(&strukt.name, &binding.type_field)
            .is_some_and(|f| {
                f.type_name == identity.group
                    && matches!(schema.types().resolve(&f.type_name), TypeKind::Enum(_))
            });
        if typed_as_group {
            out.push(Initializer {
                path,
                value: identity.id.value,
            });
        }
    }
    if let (Some(version), Some(field)) = (strukt.version, &binding.version_field) {
        let path = schema
            .member(&strukt.name, field)
            .filter(|f| f.is_plain() && schema.types().is_integer(&f.type_name))
            .and_then(|_| schema.member_path(&strukt.name, field));
        if let Some(path) = path {
            out.push(Initializer {
                path,
                value: i128::from(version),
            });
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::node::parse_nodes;

    #[test]
    fn options_fill_missing_keys_from_defaults() {
        let options: CompileOptions = serde_json::from_str(r#"{"fail_fast": true}"#).unwrap();
        assert!(options.fail_fast);
        assert_eq!(options.type_const, "TRANSACTION_TYPE");
        assert!(options.version_family_fallback);
    }

    #[test]
    fn header_fields_get_initializers() {
        let nodes = parse_nodes(
            r#"[
              {"kind": "enum", "name": "Kind", "width": 1, "values": [{"name": "PING", "value": 3}]},
              {"kind": "struct", "name": "Header", "disposition": "abstract", "fields": [
                {"name": "type", "type": "Kind"}, {"name": "version", "type": "uint8"}]},
              {"kind": "struct", "name": "Ping", "fields": [
                {"disposition": "struct_type", "type": "Kind", "value": "PING", "version": 4,
                 "header": "Header", "header_version_field": "version"},
                {"type": "Header", "disposition": "inline"},
                {"name": "nonce", "type": "uint32"}]}
            ]"#,
        )
        .unwrap();
        let compiled = compile(&nodes, &CompileOptions::default()).unwrap();
        let plan = compiled.plan("Ping").unwrap();
        assert_eq!(
            plan.initializers,
            vec![
                Initializer {
                    path: vec!["Header".into(), "type".into()],
                    value: 3
                },
                Initializer {
                    path: vec!["Header".into(), "version".into()],
                    value: 4
                },
            ]
        );
        assert_eq!(compiled.factory.resolve("Kind", 4, 3), Some("Ping"));
    }

    #[test]
    fn diagnostics_list_every_field_error() {
        let nodes = parse_nodes(
            r#"[
              {"kind": "struct", "name": "A", "fields": [{"name": "x", "type": "nope"}]},
              {"kind": "struct", "name": "B", "fields": [{"name": "y"}]}
            ]"#,
        )
        .unwrap();
        let err = compile(&nodes, &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::Fields(ref e) if e.len() == 2));
        assert_eq!(err.diagnostics().len(), 2);
    }
}
