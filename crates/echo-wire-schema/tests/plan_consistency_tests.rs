// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
mod common;

use common::{compile_ok, ENTITIES};
use echo_wire_schema::codec::Initializer;
use echo_wire_schema::model::DispositionKind;
use echo_wire_schema::{DecodeOp, EncodeOp, SizeOp};

const MIXED: &str = r#"[
  {"kind": "enum", "name": "Mode", "width": 1, "values": [
    {"name": "OFF", "value": 0}, {"name": "ON", "value": 1}]},
  {"kind": "struct", "name": "Inner", "fields": [{"name": "x", "type": "int32"}]},
  {"kind": "struct", "name": "Mixed", "fields": [
    {"name": "MAGIC", "type": "uint16", "disposition": "const", "value": "0xCAFE"},
    {"name": "alt", "type": "Inner", "condition": "mode",
     "condition_operation": "equals", "condition_value": "ON"},
    {"name": "raw", "type": "uint32", "condition": "mode",
     "condition_operation": "equals", "condition_value": "OFF"},
    {"name": "mode", "type": "Mode"},
    {"name": "check", "type": "uint8", "disposition": "reserved", "value": "sizeof tail"},
    {"name": "n", "type": "uint8"},
    {"name": "values", "type": "Inner", "disposition": "array", "size": "n"},
    {"name": "tail", "type": "uint8", "disposition": "array_fill"}]}
]"#;

#[test]
fn plans_visit_the_same_wire_fields() {
    for json in [ENTITIES, MIXED] {
        let compiled = compile_ok(json);
        for plan in compiled.plans.values() {
            let [size, serialize, deserialize] = plan.wire_fields();
            assert_eq!(size, serialize, "{}", plan.struct_name);
            assert_eq!(size, deserialize, "{}", plan.struct_name);
        }
    }
}

#[test]
fn const_fields_never_reach_the_wire() {
    let compiled = compile_ok(MIXED);
    let plan = compiled.plan("Mixed").expect("plan");
    let [size, ..] = plan.wire_fields();
    assert_eq!(size, vec!["alt", "mode", "check", "n", "values", "tail"]);
    assert!(plan.serialize.iter().all(|s| s.field != "MAGIC"));
}

#[test]
fn deferred_decode_steps_follow_their_inputs() {
    let compiled = compile_ok(MIXED);
    let plan = compiled.plan("Mixed").expect("plan");
    let order: Vec<_> = plan.deserialize.iter().map(|s| s.field.as_str()).collect();
    assert_eq!(
        order,
        vec!["alt", "mode", "alt", "check", "n", "values", "tail", "check"]
    );
    assert!(matches!(plan.deserialize[0].op, DecodeOp::Union { bytes: 4 }));
    assert!(matches!(
        &plan.deserialize[2].op,
        DecodeOp::ResolveUnion { members } if members.len() == 2
    ));
    assert!(matches!(
        &plan.deserialize[3].op,
        DecodeOp::Reserved { expect: None, .. }
    ));
    assert!(matches!(
        &plan.deserialize[7].op,
        DecodeOp::CheckSizeOf { reserved, target } if reserved == "check" && target == "tail"
    ));
    assert!(matches!(&plan.deserialize[4].op, DecodeOp::Length { .. }));
}

#[test]
fn union_slot_takes_its_widest_member() {
    let compiled = compile_ok(MIXED);
    let plan = compiled.plan("Mixed").expect("plan");
    let slot = &plan.serialize[0];
    assert_eq!(slot.disposition, DispositionKind::Union);
    assert!(slot.guard.is_none());
    let EncodeOp::Union { bytes, members } = &slot.op else {
        panic!("expected union op, got {:?}", slot.op);
    };
    assert_eq!(*bytes, 4);
    let names: Vec<_> = members.iter().map(|m| m.field.as_str()).collect();
    assert_eq!(names, vec!["alt", "raw"]);
    assert!(matches!(plan.size[0].op, SizeOp::Union { bytes: 4 }));
}

#[test]
fn length_fields_are_written_from_live_arrays() {
    let compiled = compile_ok(MIXED);
    let plan = compiled.plan("Mixed").expect("plan");
    let n = plan
        .serialize
        .iter()
        .find(|s| s.field == "n")
        .expect("length step");
    assert!(matches!(&n.op, EncodeOp::Length { arrays, .. } if arrays == &["values"]));

    let compiled = compile_ok(ENTITIES);
    let plan = compiled.plan("Aggregate").expect("plan");
    let payload = plan
        .serialize
        .iter()
        .find(|s| s.field == "payload_size")
        .expect("byte length step");
    assert!(matches!(
        &payload.op,
        EncodeOp::ByteLength { array, align: Some(8), .. } if array == "transactions"
    ));
    assert!(matches!(
        plan.size.last().map(|s| &s.op),
        Some(SizeOp::ByteLength { length_field }) if length_field == "payload_size"
    ));
}

#[test]
fn discriminator_defaults_reach_through_inline_headers() {
    let compiled = compile_ok(ENTITIES);
    let plan = compiled.plan("Note").expect("plan");
    assert_eq!(
        plan.initializers,
        vec![
            Initializer {
                path: vec!["EntityHeader".into(), "type".into()],
                value: 16718,
            },
            Initializer {
                path: vec!["EntityHeader".into(), "version".into()],
                value: 1,
            },
        ]
    );
    assert!(compiled
        .plan("EntityHeader")
        .expect("abstract structs still get plans")
        .initializers
        .is_empty());
}

#[test]
fn plans_serialize_with_tagged_ops() {
    let compiled = compile_ok(ENTITIES);
    let plan = compiled.plan("Aggregate").expect("plan");
    let json = serde_json::to_value(plan).expect("serialize");
    assert_eq!(json["struct_name"], "Aggregate");
    let ops: Vec<_> = json["deserialize"]
        .as_array()
        .expect("steps")
        .iter()
        .map(|s| s["op"]["op"].as_str().unwrap_or_default().to_owned())
        .collect();
    assert_eq!(ops, vec!["nested", "leaf", "reserved", "array_sized"]);
    assert_eq!(json["deserialize"][3]["op"]["group"], "EntityType");
    assert_eq!(json["deserialize"][3]["op"]["align"], 8);
    assert_eq!(json["serialize"][1]["disposition"], "plain");
}
