// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
mod common;

use common::{compile_err, compile_ok};
use echo_wire_schema::{CompileError, DependencyError, DependencyErrorKind, Record, Value};

fn dependency_errors(json: &str) -> Vec<DependencyError> {
    match compile_err(json) {
        CompileError::Dependencies(errors) => errors,
        other => panic!("expected dependency errors, got {other:?}"),
    }
}

fn container(header_fields: &str, array_field: &str) -> String {
    format!(
        r#"[
          {{"kind": "enum", "name": "Kind", "width": 1, "values": [{{"name": "A", "value": 1}}]}},
          {{"kind": "struct", "name": "Head", "disposition": "abstract", "fields": [{header_fields}]}},
          {{"kind": "struct", "name": "Box", "fields": [
            {{"name": "bytes", "type": "uint16"}},
            {array_field}]}}
        ]"#
    )
}

#[test]
fn header_must_declare_the_type_field() {
    let errors = dependency_errors(&container(
        r#"{"name": "version", "type": "uint8"}"#,
        r#"{"name": "items", "disposition": "array_sized", "size": "bytes",
            "header": "Head", "header_type_field": "type"}"#,
    ));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, DependencyErrorKind::TypeFieldNotDeclared);
    assert_eq!(errors[0].struct_name, "Box");
    assert_eq!(errors[0].field, "items");
}

#[test]
fn header_must_be_declared() {
    let errors = dependency_errors(&container(
        r#"{"name": "type", "type": "Kind"}"#,
        r#"{"name": "items", "disposition": "array_sized", "size": "bytes",
            "header": "Ghost", "header_type_field": "type"}"#,
    ));
    assert_eq!(errors[0].kind, DependencyErrorKind::HeaderNotDeclared);
}

#[test]
fn named_version_field_must_exist() {
    let errors = dependency_errors(&container(
        r#"{"name": "type", "type": "Kind"}"#,
        r#"{"name": "items", "disposition": "array_sized", "size": "bytes",
            "header": "Head", "header_type_field": "type", "header_version_field": "rev"}"#,
    ));
    assert_eq!(errors[0].kind, DependencyErrorKind::VersionFieldNotDeclared);
}

#[test]
fn type_field_must_be_enum_typed() {
    let errors = dependency_errors(&container(
        r#"{"name": "type", "type": "uint8"}"#,
        r#"{"name": "items", "disposition": "array_sized", "size": "bytes",
            "header": "Head", "header_type_field": "type"}"#,
    ));
    assert_eq!(errors[0].kind, DependencyErrorKind::TypeFieldNotEnum);
}

#[test]
fn header_members_may_come_through_inline_fields() {
    compile_ok(
        r#"[
          {"kind": "enum", "name": "Kind", "width": 1, "values": [{"name": "A", "value": 1}]},
          {"kind": "struct", "name": "Tag", "fields": [{"name": "type", "type": "Kind"}]},
          {"kind": "struct", "name": "Head", "disposition": "abstract", "fields": [
            {"name": "size", "type": "uint16"},
            {"type": "Tag", "disposition": "inline"}]},
          {"kind": "struct", "name": "Box", "fields": [
            {"name": "bytes", "type": "uint16"},
            {"name": "items", "disposition": "array_sized", "size": "bytes",
             "header": "Head", "header_type_field": "type"}]}
        ]"#,
    );
}

#[test]
fn header_may_be_declared_after_its_user() {
    compile_ok(
        r#"[
          {"kind": "struct", "name": "Box", "fields": [
            {"name": "bytes", "type": "uint16"},
            {"name": "items", "disposition": "array_sized", "size": "bytes",
             "header": "Head", "header_type_field": "type"}]},
          {"kind": "enum", "name": "Kind", "width": 1, "values": [{"name": "A", "value": 1}]},
          {"kind": "struct", "name": "Head", "disposition": "abstract", "fields": [
            {"name": "type", "type": "Kind"}]}
        ]"#,
    );
}

#[test]
fn struct_type_headers_are_checked_too() {
    let errors = dependency_errors(
        r#"[
          {"kind": "enum", "name": "Kind", "width": 1, "values": [{"name": "A", "value": 1}]},
          {"kind": "struct", "name": "Ping", "fields": [
            {"disposition": "struct_type", "type": "Kind", "value": "A", "header": "Nowhere"},
            {"name": "nonce", "type": "uint32"}]}
        ]"#,
    );
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, DependencyErrorKind::HeaderNotDeclared);
    assert_eq!(errors[0].field, "struct_type");
}

#[test]
fn union_members_need_a_fixed_size() {
    let errors = dependency_errors(
        r#"[
          {"kind": "enum", "name": "Kind", "width": 1, "values": [
            {"name": "A", "value": 1}, {"name": "B", "value": 2}]},
          {"kind": "struct", "name": "Blob", "fields": [
            {"name": "rest", "type": "uint8", "disposition": "array_fill"}]},
          {"kind": "struct", "name": "S", "fields": [
            {"name": "small", "type": "uint16", "condition": "k",
             "condition_operation": "equals", "condition_value": "A"},
            {"name": "blob", "type": "Blob", "condition": "k",
             "condition_operation": "equals", "condition_value": "B"},
            {"name": "k", "type": "Kind"}]}
        ]"#,
    );
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, DependencyErrorKind::UnionMemberNotFixedSize);
    assert_eq!(errors[0].field, "blob");
}

#[test]
fn every_broken_reference_is_reported() {
    let errors = dependency_errors(
        r#"[
          {"kind": "enum", "name": "Kind", "width": 1, "values": [{"name": "A", "value": 1}]},
          {"kind": "struct", "name": "One", "fields": [
            {"name": "n", "type": "uint8"},
            {"name": "xs", "disposition": "array_sized", "size": "n",
             "header": "Missing", "header_type_field": "type"}]},
          {"kind": "struct", "name": "Two", "fields": [
            {"name": "n", "type": "uint8"},
            {"name": "ys", "disposition": "array_sized", "size": "n",
             "header": "One", "header_type_field": "type"}]}
        ]"#,
    );
    let kinds: Vec<_> = errors.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            DependencyErrorKind::HeaderNotDeclared,
            DependencyErrorKind::TypeFieldNotDeclared
        ]
    );
}

#[test]
fn struct_may_not_embed_itself() {
    let errors = dependency_errors(
        r#"[
          {"kind": "struct", "name": "Node", "fields": [
            {"name": "tag", "type": "uint8"},
            {"name": "next", "type": "Node"}]}
        ]"#,
    );
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, DependencyErrorKind::RecursiveLayout);
    assert_eq!(errors[0].struct_name, "Node");
    assert_eq!(errors[0].field, "next");
    assert!(errors[0].message.contains("Node -> Node"), "{}", errors[0].message);
}

#[test]
fn embedding_cycles_are_reported_for_every_member() {
    let errors = dependency_errors(
        r#"[
          {"kind": "struct", "name": "Outer", "fields": [{"name": "inner", "type": "Inner"}]},
          {"kind": "struct", "name": "Inner", "fields": [
            {"name": "n", "type": "uint8"},
            {"type": "Outer", "disposition": "inline"}]}
        ]"#,
    );
    let found: Vec<_> = errors
        .iter()
        .map(|e| (e.kind, e.struct_name.as_str(), e.field.as_str()))
        .collect();
    assert_eq!(
        found,
        vec![
            (DependencyErrorKind::RecursiveLayout, "Outer", "inner"),
            (DependencyErrorKind::RecursiveLayout, "Inner", "Outer"),
        ]
    );
}

#[test]
fn vectors_break_embedding_cycles() {
    let compiled = compile_ok(
        r#"[
          {"kind": "struct", "name": "Tree", "fields": [
            {"name": "n", "type": "uint8"},
            {"name": "children", "type": "Tree", "disposition": "array", "size": "n"}]}
        ]"#,
    );
    let interp = compiled.interpreter();
    let leaf = Record::new("Tree").with("children", Value::List(Vec::new()));
    let root = Record::new("Tree").with("children", Value::List(vec![Value::Record(leaf)]));
    let bytes = interp.encode(&root).expect("encode");
    assert_eq!(bytes, [1, 0]);
    assert_eq!(interp.decode("Tree", &bytes).expect("decode"), root);
}
