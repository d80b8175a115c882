// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Plan execution.

use std::borrow::Cow;
use std::collections::BTreeMap;

use tracing::debug;

use super::{ExecError, Reader, Record, Value, Writer};
use crate::codec::{CodecPlan, DecodeOp, Element, EncodeOp, Leaf, SizeOp, Step};
use crate::factory::{FactoryRegistry, HeaderDecoder};
use crate::model::{ArrayCount, Condition, Disposition, HeaderBinding, ReservedValue, Struct};
use crate::schema::Schema;
use crate::types::Repr;

/// Discriminator defaults keyed by member path.
type Defaults = Vec<(Vec<String>, i128)>;

/// Executes the plans of one compilation.
#[derive(Debug, Clone, Copy)]
pub struct Interpreter<'c> {
    schema: &'c Schema,
    factory: &'c FactoryRegistry,
    plans: &'c BTreeMap<String, CodecPlan>,
}

/// A struct value being sized or encoded.
struct Frame<'a> {
    strukt: &'a Struct,
    plan: &'a CodecPlan,
    record: &'a Record,
    defaults: Defaults,
}

impl<'a> Frame<'a> {
    fn missing(&self, field: &str) -> ExecError {
        ExecError::MissingField {
            struct_name: self.strukt.name.clone(),
            field: field.to_owned(),
        }
    }

    fn default_of(&self, name: &str) -> Option<i128> {
        self.defaults
            .iter()
            .find(|(path, _)| matches!(path.as_slice(), [only] if only == name))
            .map(|(_, value)| *value)
    }

    fn child_defaults(&self, field: &str) -> Defaults {
        self.defaults
            .iter()
            .filter_map(|(path, value)| match path.split_first() {
                Some((head, rest)) if head == field && !rest.is_empty() => {
                    Some((rest.to_vec(), *value))
                }
                _ => None,
            })
            .collect()
    }

    fn value(&self, name: &str) -> Result<Cow<'a, Value>, ExecError> {
        if let Some(value) = self.record.get(name) {
            return Ok(Cow::Borrowed(value));
        }
        self.default_of(name)
            .map(|v| Cow::Owned(Value::Int(v)))
            .ok_or_else(|| self.missing(name))
    }

    fn list(&self, name: &str) -> Result<&'a [Value], ExecError> {
        let value = self.record.get(name).ok_or_else(|| self.missing(name))?;
        value.as_list().ok_or_else(|| mismatch(name, "list", value))
    }

    /// Shared live length of the arrays a length field counts.
    fn live_length(&self, arrays: &[String]) -> Result<usize, ExecError> {
        let mut shared: Option<usize> = None;
        for array in arrays {
            let Some(value) = self.record.get(array) else {
                continue;
            };
            let len = value
                .as_list()
                .ok_or_else(|| mismatch(array, "list", value))?
                .len();
            match shared {
                Some(expected) if expected != len => {
                    return Err(ExecError::LengthMismatch {
                        field: array.clone(),
                        expected,
                        found: len,
                    })
                }
                _ => shared = Some(len),
            }
        }
        Ok(shared.unwrap_or(0))
    }

    /// Nested record; an absent one is synthesized when defaults reach
    /// into it.
    fn nested(&self, field: &str, type_name: &str) -> Result<Cow<'a, Record>, ExecError> {
        match self.record.get(field) {
            Some(Value::Record(record)) => Ok(Cow::Borrowed(record)),
            Some(other) => Err(mismatch(field, "record", other)),
            None if !self.child_defaults(field).is_empty() => {
                Ok(Cow::Owned(Record::new(type_name)))
            }
            None => Err(self.missing(field)),
        }
    }
}

fn mismatch(field: &str, expected: &str, found: &Value) -> ExecError {
    ExecError::TypeMismatch {
        field: field.to_owned(),
        expected: expected.to_owned(),
        found: found.kind().to_owned(),
    }
}

fn to_int(n: usize) -> i128 {
    i128::try_from(n).unwrap_or(i128::MAX)
}

/// `total + more`; an overflowing size is reported against `field`.
fn grow(total: usize, more: usize, field: &str) -> Result<usize, ExecError> {
    total.checked_add(more).ok_or_else(|| ExecError::OutOfRange {
        type_name: field.to_owned(),
        value: to_int(total).saturating_add(to_int(more)),
    })
}

fn to_count(field: &str, value: i128) -> Result<usize, ExecError> {
    usize::try_from(value).map_err(|_| ExecError::OutOfRange {
        type_name: field.to_owned(),
        value,
    })
}

/// Zero bytes needed after `offset` to reach the next `align` boundary.
fn padding(offset: usize, align: Option<u64>) -> usize {
    align
        .and_then(|a| usize::try_from(a).ok())
        .filter(|a| *a > 1)
        .map_or(0, |a| (a - offset % a) % a)
}

fn byte_length_of<'s>(strukt: &'s Struct, name: &str) -> Option<(&'s str, Option<u64>)> {
    strukt.fields.iter().find_map(|f| match &f.disposition {
        Disposition::ArraySized(layout) if layout.length_field == name => {
            Some((f.name.as_str(), layout.align))
        }
        _ => None,
    })
}

fn write_leaf(w: &mut Writer, leaf: &Leaf, field: &str, value: &Value) -> Result<(), ExecError> {
    match (leaf.repr, value) {
        (Repr::Int { primitive }, Value::Int(n)) => w.write_int(primitive, *n),
        (Repr::Bytes { len }, Value::Bytes(bytes)) => {
            if bytes.len() != len {
                return Err(ExecError::BadByteLength {
                    field: field.to_owned(),
                    expected: len,
                    found: bytes.len(),
                });
            }
            w.write_bytes(bytes);
            Ok(())
        }
        (Repr::Int { .. }, other) => Err(mismatch(field, "int", other)),
        (Repr::Bytes { len }, other) => Err(mismatch(field, &format!("{len} bytes"), other)),
    }
}

fn read_leaf(reader: &mut Reader<'_>, leaf: &Leaf) -> Result<Value, ExecError> {
    match leaf.repr {
        Repr::Int { primitive } => reader.read_int(primitive).map(Value::Int),
        Repr::Bytes { len } => reader.take(len).map(|b| Value::Bytes(b.to_vec())),
    }
}

fn read_int_leaf(reader: &mut Reader<'_>, leaf: &Leaf, field: &str) -> Result<i128, ExecError> {
    match leaf.repr {
        Repr::Int { primitive } => reader.read_int(primitive),
        Repr::Bytes { .. } => Err(ExecError::TypeMismatch {
            field: field.to_owned(),
            expected: "int".to_owned(),
            found: "bytes".to_owned(),
        }),
    }
}

impl<'c> Interpreter<'c> {
    /// Interpreter over a frozen compilation.
    pub const fn new(
        schema: &'c Schema,
        factory: &'c FactoryRegistry,
        plans: &'c BTreeMap<String, CodecPlan>,
    ) -> Self {
        Self {
            schema,
            factory,
            plans,
        }
    }

    fn lookup(&self, type_name: &str) -> Result<(&'c Struct, &'c CodecPlan), ExecError> {
        let schema: &'c Schema = self.schema;
        let plans: &'c BTreeMap<String, CodecPlan> = self.plans;
        match (schema.get(type_name), plans.get(type_name)) {
            (Some(strukt), Some(plan)) => Ok((strukt, plan)),
            _ => Err(ExecError::UnknownStruct(type_name.to_owned())),
        }
    }

    fn frame<'a>(
        &self,
        type_name: &str,
        record: &'a Record,
        inherited: Defaults,
    ) -> Result<Frame<'a>, ExecError>
    where
        'c: 'a,
    {
        let (strukt, plan) = self.lookup(type_name)?;
        if record.type_name != type_name {
            return Err(ExecError::TypeMismatch {
                field: type_name.to_owned(),
                expected: type_name.to_owned(),
                found: record.type_name.clone(),
            });
        }
        let mut defaults = inherited;
        defaults.extend(
            plan.initializers
                .iter()
                .map(|init| (init.path.clone(), init.value)),
        );
        Ok(Frame {
            strukt,
            plan,
            record,
            defaults,
        })
    }

    /// Integer value of a field as the encoder sees it: consts, then live
    /// array lengths for length fields, then the record, then defaults,
    /// then a computed `array_sized` byte length.
    fn int_of(&self, frame: &Frame<'_>, name: &str) -> Result<i128, ExecError> {
        if let Some(Disposition::Const(value)) = frame.strukt.field(name).map(|f| &f.disposition) {
            return Ok(value.value());
        }
        if let Some(arrays) = frame.strukt.length_fields.get(name) {
            return frame.live_length(arrays).map(to_int);
        }
        if let Some(value) = frame.record.get(name) {
            return value.as_int().ok_or_else(|| mismatch(name, "int", value));
        }
        if let Some(value) = frame.default_of(name) {
            return Ok(value);
        }
        if let Some((array, align)) = byte_length_of(frame.strukt, name) {
            let items = frame.list(array)?;
            return self.region_len(array, items, align).map(to_int);
        }
        Err(frame.missing(name))
    }

    fn guard_holds(&self, frame: &Frame<'_>, guard: Option<&Condition>) -> Result<bool, ExecError> {
        match guard {
            None => Ok(true),
            Some(condition) => Ok(condition.holds(self.int_of(frame, &condition.field)?)),
        }
    }

    /// Bytes an `array_sized` region occupies, padding included.
    fn region_len(
        &self,
        field: &str,
        items: &[Value],
        align: Option<u64>,
    ) -> Result<usize, ExecError> {
        let mut total = 0usize;
        for item in items {
            let record = item.as_record().ok_or_else(|| mismatch(field, "record", item))?;
            let size = self.size_struct(&record.type_name, record, Vec::new())?;
            total = grow(total, size, field)?;
            total = grow(total, padding(total, align), field)?;
        }
        Ok(total)
    }

    /// Encoded size of `record`.
    pub fn size(&self, record: &Record) -> Result<usize, ExecError> {
        self.size_struct(&record.type_name, record, Vec::new())
    }

    fn size_struct(
        &self,
        type_name: &str,
        record: &Record,
        inherited: Defaults,
    ) -> Result<usize, ExecError> {
        let frame = self.frame(type_name, record, inherited)?;
        let mut total = 0usize;
        for step in &frame.plan.size {
            if self.guard_holds(&frame, step.guard.as_ref())? {
                total = grow(total, self.step_size(&frame, step)?, &step.field)?;
            }
        }
        Ok(total)
    }

    fn step_size(&self, frame: &Frame<'_>, step: &Step<SizeOp>) -> Result<usize, ExecError> {
        let field = step.field.as_str();
        match &step.op {
            SizeOp::Fixed { bytes } | SizeOp::Union { bytes } => Ok(*bytes),
            SizeOp::Nested { type_name } => {
                let record = frame.nested(field, type_name)?;
                self.size_struct(type_name, &record, frame.child_defaults(field))
            }
            SizeOp::Array { element } | SizeOp::Fill { element } => {
                frame.list(field)?.iter().try_fold(0usize, |total, item| {
                    grow(total, self.element_size(element, field, item)?, field)
                })
            }
            SizeOp::ByteLength { length_field } => {
                to_count(length_field, self.int_of(frame, length_field)?)
            }
        }
    }

    fn element_size(
        &self,
        element: &Element,
        field: &str,
        value: &Value,
    ) -> Result<usize, ExecError> {
        match element {
            Element::Leaf(leaf) => Ok(leaf.repr.width()),
            Element::Struct { type_name } => {
                let record = value.as_record().ok_or_else(|| mismatch(field, "record", value))?;
                self.size_struct(type_name, record, Vec::new())
            }
        }
    }

    /// Encoded size of one field of the frame's record; 0 when absent.
    fn field_size(&self, frame: &Frame<'_>, target: &str) -> Result<usize, ExecError> {
        if frame.strukt.union_of(target).is_some() {
            let Some(field) = frame.strukt.field(target) else {
                return Ok(0);
            };
            let live = frame.record.get(target).is_some()
                && self.guard_holds(frame, field.condition.as_ref())?;
            if !live {
                return Ok(0);
            }
            return self
                .schema
                .field_fixed_size(field)
                .ok_or_else(|| frame.missing(target));
        }
        match frame.plan.size.iter().find(|s| s.field == target) {
            Some(step) if self.guard_holds(frame, step.guard.as_ref())? => {
                self.step_size(frame, step)
            }
            _ => Ok(0),
        }
    }

    /// Serializes `record` with the plan of its struct.
    pub fn encode(&self, record: &Record) -> Result<Vec<u8>, ExecError> {
        let mut w = Writer::default();
        self.encode_struct(&mut w, &record.type_name, record, Vec::new())?;
        Ok(w.into_vec())
    }

    fn encode_struct(
        &self,
        w: &mut Writer,
        type_name: &str,
        record: &Record,
        inherited: Defaults,
    ) -> Result<(), ExecError> {
        let frame = self.frame(type_name, record, inherited)?;
        for step in &frame.plan.serialize {
            if self.guard_holds(&frame, step.guard.as_ref())? {
                self.encode_step(w, &frame, step)?;
            }
        }
        Ok(())
    }

    fn encode_step(
        &self,
        w: &mut Writer,
        frame: &Frame<'_>,
        step: &Step<EncodeOp>,
    ) -> Result<(), ExecError> {
        let field = step.field.as_str();
        match &step.op {
            EncodeOp::Leaf { leaf } => {
                let value = frame.value(field)?;
                write_leaf(w, leaf, field, &value)
            }
            EncodeOp::Length { leaf, arrays } => {
                let len = frame.live_length(arrays)?;
                write_leaf(w, leaf, field, &Value::Int(to_int(len)))
            }
            EncodeOp::ByteLength { leaf, array, align } => {
                let len = match frame.record.get(field) {
                    Some(value) => value.as_int().ok_or_else(|| mismatch(field, "int", value))?,
                    None => to_int(self.region_len(array, frame.list(array)?, *align)?),
                };
                write_leaf(w, leaf, field, &Value::Int(len))
            }
            EncodeOp::Nested { type_name, .. } => {
                let record = frame.nested(field, type_name)?;
                self.encode_struct(w, type_name, &record, frame.child_defaults(field))
            }
            EncodeOp::Reserved { leaf, value } => {
                let value = match value {
                    ReservedValue::Int { value } | ReservedValue::Enum { value, .. } => *value,
                    ReservedValue::SizeOf { field: target } => {
                        to_int(self.field_size(frame, target)?)
                    }
                };
                write_leaf(w, leaf, field, &Value::Int(value))
            }
            EncodeOp::Array { element, count } => {
                let items = frame.list(field)?;
                if let ArrayCount::Literal { count } = count {
                    let expected = to_count(field, i128::from(*count))?;
                    if items.len() != expected {
                        return Err(ExecError::LengthMismatch {
                            field: field.to_owned(),
                            expected,
                            found: items.len(),
                        });
                    }
                }
                items
                    .iter()
                    .try_for_each(|item| self.write_element(w, element, field, item))
            }
            EncodeOp::ArraySized {
                length_field,
                align,
            } => {
                let start = w.len();
                for item in frame.list(field)? {
                    let record = item.as_record().ok_or_else(|| mismatch(field, "record", item))?;
                    self.encode_struct(w, &record.type_name, record, Vec::new())?;
                    w.write_zeros(padding(w.len() - start, *align));
                }
                let actual = w.len() - start;
                match frame.record.get(length_field).and_then(Value::as_int) {
                    Some(declared) if declared != to_int(actual) => {
                        Err(ExecError::ByteLengthMismatch {
                            field: field.to_owned(),
                            declared,
                            actual,
                        })
                    }
                    _ => Ok(()),
                }
            }
            EncodeOp::Fill { element } => frame
                .list(field)?
                .iter()
                .try_for_each(|item| self.write_element(w, element, field, item)),
            EncodeOp::Union { bytes, members } => {
                let mut slot = Writer::default();
                for member in members {
                    if member.guard.holds(self.int_of(frame, &member.guard.field)?) {
                        let value = frame.value(&member.field)?;
                        self.write_element(&mut slot, &member.element, &member.field, &value)?;
                        break;
                    }
                }
                if slot.len() > *bytes {
                    return Err(ExecError::LengthMismatch {
                        field: field.to_owned(),
                        expected: *bytes,
                        found: slot.len(),
                    });
                }
                let used = slot.len();
                w.write_bytes(&slot.into_vec());
                w.write_zeros(*bytes - used);
                Ok(())
            }
        }
    }

    fn write_element(
        &self,
        w: &mut Writer,
        element: &Element,
        field: &str,
        value: &Value,
    ) -> Result<(), ExecError> {
        match element {
            Element::Leaf(leaf) => write_leaf(w, leaf, field, value),
            Element::Struct { type_name } => {
                let record = value.as_record().ok_or_else(|| mismatch(field, "record", value))?;
                self.encode_struct(w, type_name, record, Vec::new())
            }
        }
    }

    /// Decodes a whole buffer as `type_name`.
    ///
    /// # Errors
    ///
    /// [`ExecError::TrailingBytes`] when the message ends before the buffer.
    pub fn decode(&self, type_name: &str, bytes: &[u8]) -> Result<Record, ExecError> {
        let (record, used) = self.decode_prefix(type_name, bytes)?;
        if used != bytes.len() {
            return Err(ExecError::TrailingBytes {
                count: bytes.len() - used,
            });
        }
        Ok(record)
    }

    /// Decodes `type_name` from the front of `bytes`, returning the record
    /// and the bytes consumed.
    pub fn decode_prefix(
        &self,
        type_name: &str,
        bytes: &[u8],
    ) -> Result<(Record, usize), ExecError> {
        let mut reader = Reader::new(bytes);
        let record = self.decode_struct(type_name, &mut reader)?;
        Ok((record, reader.position()))
    }

    /// Decodes a whole buffer whose concrete struct is chosen by `group`'s
    /// header.
    pub fn decode_any(&self, group: &str, bytes: &[u8]) -> Result<Record, ExecError> {
        let binding = self
            .factory
            .header(group)
            .ok_or_else(|| ExecError::UnknownGroup(group.to_owned()))?;
        let Some(name) = self.factory.resolve_from_header(self, bytes, group)? else {
            let (id, version) = self.decode_header(binding, bytes)?;
            return Err(ExecError::UnknownDiscriminator {
                group: group.to_owned(),
                version: version.unwrap_or(0),
                id,
            });
        };
        debug!(group, strukt = name, "dispatched from header");
        self.decode(name, bytes)
    }

    fn decode_struct(&self, type_name: &str, reader: &mut Reader<'_>) -> Result<Record, ExecError> {
        let (strukt, plan) = self.lookup(type_name)?;
        let missing = |field: &str| ExecError::MissingField {
            struct_name: strukt.name.clone(),
            field: field.to_owned(),
        };
        let mut record = Record::new(type_name);
        let mut scope: BTreeMap<&str, i128> = strukt
            .fields
            .iter()
            .filter_map(|f| match &f.disposition {
                Disposition::Const(value) => Some((f.name.as_str(), value.value())),
                _ => None,
            })
            .collect();
        let mut slots: BTreeMap<&str, &[u8]> = BTreeMap::new();

        for step in &plan.deserialize {
            if let Some(guard) = &step.guard {
                let lhs = scope
                    .get(guard.field.as_str())
                    .copied()
                    .ok_or_else(|| missing(guard.field.as_str()))?;
                if !guard.holds(lhs) {
                    continue;
                }
            }
            let field = step.field.as_str();
            match &step.op {
                DecodeOp::Leaf { leaf } => {
                    let value = read_leaf(reader, leaf)?;
                    if let Value::Int(n) = value {
                        scope.insert(field, n);
                    }
                    record.insert(field, value);
                }
                DecodeOp::Length { leaf } => {
                    scope.insert(field, read_int_leaf(reader, leaf, field)?);
                }
                DecodeOp::Nested { type_name, .. } => {
                    let child = self.decode_struct(type_name, reader)?;
                    record.insert(field, child);
                }
                DecodeOp::Reserved { leaf, expect } => {
                    let found = read_int_leaf(reader, leaf, field)?;
                    if let Some(expected) = *expect {
                        if expected != found {
                            return Err(ExecError::ReservedMismatch {
                                field: field.to_owned(),
                                expected,
                                found,
                            });
                        }
                    }
                    scope.insert(field, found);
                }
                DecodeOp::CheckSizeOf { reserved, target } => {
                    let found = scope
                        .get(reserved.as_str())
                        .copied()
                        .ok_or_else(|| missing(reserved.as_str()))?;
                    let frame = Frame {
                        strukt,
                        plan,
                        record: &record,
                        defaults: Vec::new(),
                    };
                    let expected = to_int(self.field_size(&frame, target)?);
                    if expected != found {
                        return Err(ExecError::ReservedMismatch {
                            field: reserved.clone(),
                            expected,
                            found,
                        });
                    }
                }
                DecodeOp::Array { element, count } => {
                    let count = match count {
                        ArrayCount::Literal { count } => to_count(field, i128::from(*count))?,
                        ArrayCount::Field { field: length } => {
                            let n = scope
                                .get(length.as_str())
                                .copied()
                                .ok_or_else(|| missing(length.as_str()))?;
                            to_count(length, n)?
                        }
                    };
                    let mut items = Vec::with_capacity(count.min(reader.remaining()));
                    for _ in 0..count {
                        items.push(self.read_element(reader, element)?);
                    }
                    record.insert(field, items);
                }
                DecodeOp::ArraySized {
                    length_field,
                    header,
                    type_field,
                    version_field,
                    group,
                    align,
                } => {
                    let declared = scope
                        .get(length_field.as_str())
                        .copied()
                        .ok_or_else(|| missing(length_field.as_str()))?;
                    let mut region = reader.sub(to_count(length_field, declared)?)?;
                    let binding = HeaderBinding {
                        header: header.clone(),
                        type_field: type_field.clone(),
                        version_field: version_field.clone(),
                    };
                    let mut items = Vec::new();
                    while region.remaining() > 0 {
                        let before = region.position();
                        let (id, version) = self.decode_header(&binding, region.rest())?;
                        let version = version.unwrap_or(0);
                        let name = self.factory.resolve(group, version, id).ok_or_else(|| {
                            ExecError::UnknownDiscriminator {
                                group: group.clone(),
                                version,
                                id,
                            }
                        })?;
                        items.push(Value::Record(self.decode_struct(name, &mut region)?));
                        region.skip(padding(region.position(), *align))?;
                        if region.position() == before {
                            return Err(ExecError::NoProgress {
                                field: field.to_owned(),
                            });
                        }
                    }
                    record.insert(field, items);
                }
                DecodeOp::Fill { element } => {
                    let mut items = Vec::new();
                    while reader.remaining() > 0 {
                        let before = reader.position();
                        items.push(self.read_element(reader, element)?);
                        if reader.position() == before {
                            return Err(ExecError::NoProgress {
                                field: field.to_owned(),
                            });
                        }
                    }
                    record.insert(field, items);
                }
                DecodeOp::Union { bytes } => {
                    slots.insert(field, reader.take(*bytes)?);
                }
                DecodeOp::ResolveUnion { members } => {
                    let raw = slots.get(field).copied().ok_or_else(|| missing(field))?;
                    for member in members {
                        let lhs = scope
                            .get(member.guard.field.as_str())
                            .copied()
                            .ok_or_else(|| missing(member.guard.field.as_str()))?;
                        if member.guard.holds(lhs) {
                            let value = self.read_element(&mut Reader::new(raw), &member.element)?;
                            if let Value::Int(n) = value {
                                scope.insert(member.field.as_str(), n);
                            }
                            record.insert(member.field.as_str(), value);
                            break;
                        }
                    }
                }
            }
        }
        Ok(record)
    }

    fn read_element(&self, reader: &mut Reader<'_>, element: &Element) -> Result<Value, ExecError> {
        match element {
            Element::Leaf(leaf) => read_leaf(reader, leaf),
            Element::Struct { type_name } => {
                self.decode_struct(type_name, reader).map(Value::Record)
            }
        }
    }

    fn header_int(&self, header: &str, record: &Record, field: &str) -> Result<i128, ExecError> {
        self.schema
            .member_path(header, field)
            .and_then(|path| record.at_path(&path).and_then(Value::as_int))
            .ok_or_else(|| ExecError::MissingField {
                struct_name: header.to_owned(),
                field: field.to_owned(),
            })
    }
}

impl HeaderDecoder for Interpreter<'_> {
    type Error = ExecError;

    fn decode_header(
        &self,
        binding: &HeaderBinding,
        buffer: &[u8],
    ) -> Result<(i128, Option<u64>), ExecError> {
        let (record, _) = self.decode_prefix(&binding.header, buffer)?;
        let id = self.header_int(&binding.header, &record, &binding.type_field)?;
        let version = binding
            .version_field
            .as_deref()
            .map(|field| {
                let value = self.header_int(&binding.header, &record, field)?;
                u64::try_from(value).map_err(|_| ExecError::OutOfRange {
                    type_name: field.to_owned(),
                    value,
                })
            })
            .transpose()?;
        Ok((id, version))
    }
}
