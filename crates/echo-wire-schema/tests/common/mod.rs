// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use echo_wire_schema::{
    compile, parse_nodes, Compilation, CompileError, CompileOptions, FieldErrorKind, Record, Value,
};

/// Compiles a JSON node list with default options, panicking on failure.
pub fn compile_ok(json: &str) -> Compilation {
    let nodes = parse_nodes(json).expect("schema json parses");
    compile(&nodes, &CompileOptions::default()).expect("schema compiles")
}

/// Compiles a JSON node list with default options, returning the failure.
pub fn compile_err(json: &str) -> CompileError {
    let nodes = parse_nodes(json).expect("schema json parses");
    match compile(&nodes, &CompileOptions::default()) {
        Ok(_) => panic!("schema unexpectedly compiled"),
        Err(err) => err,
    }
}

/// Kind of the single field error a one-struct schema fails with.
pub fn field_error_kind(json: &str) -> FieldErrorKind {
    match compile_err(json) {
        CompileError::Fields(errors) => {
            assert_eq!(errors.len(), 1, "expected one field error, got {errors:?}");
            errors[0].kind
        }
        other => panic!("expected field errors, got {other:?}"),
    }
}

/// Wraps field JSON in a one-struct schema that also declares `Kind`.
pub fn one_struct(fields: &str) -> String {
    format!(
        r#"[
          {{"kind": "enum", "name": "Kind", "width": 1, "values": [
            {{"name": "A", "value": 1}}, {{"name": "B", "value": 2}}]}},
          {{"kind": "struct", "name": "S", "fields": [{fields}]}}
        ]"#
    )
}

pub fn int(v: i128) -> Value {
    Value::Int(v)
}

pub fn ints(values: &[i128]) -> Value {
    Value::List(values.iter().copied().map(Value::Int).collect())
}

pub fn records(values: Vec<Record>) -> Value {
    Value::List(values.into_iter().map(Value::Record).collect())
}

/// Envelope schema: polymorphic transactions behind a shared abstract
/// header, packed into an aligned byte region.
pub const ENTITIES: &str = r#"[
  {"kind": "enum", "name": "EntityType", "width": 2, "values": [
    {"name": "TRANSFER", "value": 16724},
    {"name": "AGGREGATE", "value": 16705},
    {"name": "NOTE", "value": 16718}]},
  {"kind": "alias", "name": "Amount", "width": 8},
  {"kind": "alias", "name": "Address", "array_size": 4, "print_hint": "hex"},
  {"kind": "struct", "name": "EntityHeader", "disposition": "abstract", "fields": [
    {"name": "type", "type": "EntityType"},
    {"name": "version", "type": "uint8"}]},
  {"kind": "struct", "name": "Transfer", "fields": [
    {"name": "TRANSACTION_TYPE", "type": "EntityType", "disposition": "const", "value": "TRANSFER"},
    {"name": "TRANSACTION_VERSION", "type": "uint8", "disposition": "const", "value": 1},
    {"type": "EntityHeader", "disposition": "inline"},
    {"name": "recipient", "type": "Address"},
    {"name": "amount", "type": "Amount"}]},
  {"kind": "struct", "name": "Note", "fields": [
    {"name": "TRANSACTION_TYPE", "type": "EntityType", "disposition": "const", "value": "NOTE"},
    {"name": "TRANSACTION_VERSION", "type": "uint8", "disposition": "const", "value": 1},
    {"type": "EntityHeader", "disposition": "inline"},
    {"name": "text_size", "type": "uint8"},
    {"name": "text", "type": "uint8", "disposition": "array", "size": "text_size"}]},
  {"kind": "struct", "name": "Aggregate", "fields": [
    {"name": "TRANSACTION_TYPE", "type": "EntityType", "disposition": "const", "value": "AGGREGATE"},
    {"name": "TRANSACTION_VERSION", "type": "uint8", "disposition": "const", "value": 1},
    {"type": "EntityHeader", "disposition": "inline"},
    {"name": "payload_size", "type": "uint32"},
    {"name": "aggregate_reserved_1", "type": "uint8", "disposition": "reserved", "value": 0},
    {"name": "transactions", "type": "EntityHeader", "disposition": "array_sized",
     "size": "payload_size", "header": "EntityHeader", "header_type_field": "type",
     "header_version_field": "version", "align": 8}]}
]"#;

/// Inline header record carrying a discriminator and version.
pub fn header(id: i128, version: i128) -> Record {
    Record::new("EntityHeader")
        .with("type", id)
        .with("version", version)
}

pub fn transfer(recipient: [u8; 4], amount: i128) -> Record {
    Record::new("Transfer")
        .with("EntityHeader", header(16724, 1))
        .with("recipient", recipient.to_vec())
        .with("amount", amount)
}

pub fn note(text: &[i128]) -> Record {
    Record::new("Note")
        .with("EntityHeader", header(16718, 1))
        .with("text", ints(text))
}
