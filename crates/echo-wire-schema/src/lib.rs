// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! echo-wire-schema: schema compiler core for binary wire formats.
//!
//! Takes parsed schema nodes (enums, aliases, structs), validates them into a
//! frozen struct arena, and derives per-struct size / serialize / deserialize
//! operation lists plus a polymorphic factory table that maps
//! `(group, version, discriminator)` to a concrete struct. A reference
//! interpreter executes the derived plans so schemas can be round-tripped
//! without a target-language renderer.
#![forbid(unsafe_code)]

/// Pass 1 and pass 2 of IR construction.
pub mod build;
/// Per-disposition field checks.
pub mod check;
pub mod codec;
pub mod compile;
pub mod deps;
pub mod exec;
pub mod factory;
pub mod model;
/// Raw schema nodes as they arrive from the parser.
pub mod node;
pub mod schema;
/// Primitive, enum, and alias registry.
pub mod types;

// Re-exports for stable public API
/// Validator taxonomy.
pub use check::{FieldError, FieldErrorKind};
/// Derived plans.
pub use codec::{derive_plan, CodecPlan, DecodeOp, DeriveError, EncodeOp, SizeOp, Step};
/// Compile driver.
pub use compile::{compile, Compilation, CompileError, CompileOptions};
/// Cross-struct checks.
pub use deps::{check_dependencies, DependencyError, DependencyErrorKind};
/// Reference interpreter.
pub use exec::{ExecError, Interpreter, Record, Value};
/// Polymorphic dispatch table.
pub use factory::{FactoryEntry, FactoryError, FactoryRegistry, HeaderDecoder};
/// Schema input.
pub use node::{parse_nodes, SchemaNode};
/// Frozen struct arena.
pub use schema::Schema;
/// Type registry.
pub use types::{Primitive, RegistryError, TypeRegistry};
