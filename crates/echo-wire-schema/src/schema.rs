// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Frozen schema: the read-only struct arena handed to later phases.
//!
//! Structs reference each other by name, possibly cyclically. The arena
//! stores them in declaration order and resolves names through an index, so
//! nothing holds a pointer into another struct.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{ArrayCount, ConditionGroup, Disposition, Field, GroupLayout, Struct};
use crate::types::TypeRegistry;

/// Stable handle of a struct in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StructId(usize);

/// Validated structs plus the type registry they were checked against.
#[derive(Debug, Clone)]
pub struct Schema {
    types: TypeRegistry,
    structs: Vec<Struct>,
    index: BTreeMap<String, StructId>,
}

impl Schema {
    pub(crate) fn new(types: TypeRegistry, structs: Vec<Struct>) -> Self {
        let index = structs
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), StructId(i)))
            .collect();
        Self {
            types,
            structs,
            index,
        }
    }

    /// Type registry.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Structs in declaration order.
    pub fn structs(&self) -> &[Struct] {
        &self.structs
    }

    /// Handle of the struct called `name`.
    pub fn id(&self, name: &str) -> Option<StructId> {
        self.index.get(name).copied()
    }

    /// Struct behind a handle.
    pub fn by_id(&self, id: StructId) -> Option<&Struct> {
        self.structs.get(id.0)
    }

    /// Struct by name.
    pub fn get(&self, name: &str) -> Option<&Struct> {
        self.id(name).and_then(|id| self.by_id(id))
    }

    /// Encoded size of a type when it does not depend on values; `None` for
    /// variable-length or self-referential layouts.
    pub fn fixed_size(&self, type_name: &str) -> Option<usize> {
        self.fixed_size_guarded(type_name, &mut BTreeSet::new())
    }

    /// Encoded size of one field regardless of its condition.
    pub fn field_fixed_size(&self, field: &Field) -> Option<usize> {
        self.field_size_guarded(field, &mut BTreeSet::new())
    }

    /// Slot size of a union group: its widest member.
    pub fn union_size(&self, owner: &Struct, group: &ConditionGroup) -> Option<usize> {
        self.union_size_guarded(owner, group, &mut BTreeSet::new())
    }

    fn fixed_size_guarded<'a>(
        &'a self,
        ty: &'a str,
        visiting: &mut BTreeSet<&'a str>,
    ) -> Option<usize> {
        if let Some(repr) = self.types.repr(ty) {
            return Some(repr.width());
        }
        let strukt = self.get(ty)?;
        if !visiting.insert(ty) {
            return None;
        }
        let size = self.struct_size_guarded(strukt, visiting);
        visiting.remove(ty);
        size
    }

    fn struct_size_guarded<'a>(
        &'a self,
        strukt: &'a Struct,
        visiting: &mut BTreeSet<&'a str>,
    ) -> Option<usize> {
        let mut total = 0usize;
        for group in strukt.groups.iter().filter(|g| g.layout == GroupLayout::Union) {
            total = total.checked_add(self.union_size_guarded(strukt, group, visiting)?)?;
        }
        for field in &strukt.fields {
            let in_union = strukt.union_of(&field.name).is_some();
            if in_union || matches!(field.disposition, Disposition::Const(_)) {
                continue;
            }
            if field.condition.is_some() {
                return None;
            }
            total = total.checked_add(self.field_size_guarded(field, visiting)?)?;
        }
        Some(total)
    }

    fn union_size_guarded<'a>(
        &'a self,
        owner: &'a Struct,
        group: &ConditionGroup,
        visiting: &mut BTreeSet<&'a str>,
    ) -> Option<usize> {
        let mut widest = 0usize;
        for member in &group.members {
            let field = owner.field(member)?;
            widest = widest.max(self.field_size_guarded(field, visiting)?);
        }
        Some(widest)
    }

    fn field_size_guarded<'a>(
        &'a self,
        field: &'a Field,
        visiting: &mut BTreeSet<&'a str>,
    ) -> Option<usize> {
        match &field.disposition {
            Disposition::Const(_) => Some(0),
            Disposition::Plain | Disposition::Inline | Disposition::Reserved(_) => {
                self.fixed_size_guarded(&field.type_name, visiting)
            }
            Disposition::Array(ArrayCount::Literal { count }) => {
                let each = self.fixed_size_guarded(&field.type_name, visiting)?;
                each.checked_mul(usize::try_from(*count).ok()?)
            }
            Disposition::Array(ArrayCount::Field { .. })
            | Disposition::ArraySized(_)
            | Disposition::ArrayFill => None,
        }
    }

    /// Path to `field` inside `struct_name`, descending through inline
    /// members when it is not a direct member.
    pub fn member_path(&self, struct_name: &str, field: &str) -> Option<Vec<String>> {
        self.member_path_guarded(struct_name, field, &mut BTreeSet::new())
    }

    fn member_path_guarded<'a>(
        &'a self,
        struct_name: &'a str,
        field: &str,
        visiting: &mut BTreeSet<&'a str>,
    ) -> Option<Vec<String>> {
        let strukt = self.get(struct_name)?;
        if strukt.field(field).is_some() {
            return Some(vec![field.to_owned()]);
        }
        if !visiting.insert(struct_name) {
            return None;
        }
        let found = strukt
            .fields
            .iter()
            .filter(|f| f.disposition == Disposition::Inline)
            .find_map(|inline| {
                let mut rest = self.member_path_guarded(&inline.type_name, field, visiting)?;
                rest.insert(0, inline.name.clone());
                Some(rest)
            });
        visiting.remove(struct_name);
        found
    }

    /// The field a member path ends at.
    pub fn member(&self, struct_name: &str, field: &str) -> Option<&Field> {
        let path = self.member_path(struct_name, field)?;
        let mut owner = self.get(struct_name)?;
        let (last, hops) = path.split_last()?;
        for hop in hops {
            owner = self.get(&owner.field(hop)?.type_name)?;
        }
        owner.field(last)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::StructKind;

    fn plain(name: &str, ty: &str) -> Field {
        Field {
            name: name.into(),
            type_name: ty.into(),
            disposition: Disposition::Plain,
            condition: None,
            comment: None,
        }
    }

    fn strukt(name: &str, fields: Vec<Field>) -> Struct {
        Struct {
            name: name.into(),
            kind: StructKind::Normal,
            fields,
            identity: None,
            version: None,
            header: None,
            length_fields: BTreeMap::new(),
            groups: Vec::new(),
            comment: None,
        }
    }

    fn schema(structs: Vec<Struct>) -> Schema {
        let mut types = TypeRegistry::new();
        for s in &structs {
            types.register_struct(&s.name).unwrap();
        }
        Schema::new(types, structs)
    }

    #[test]
    fn fixed_size_sums_nested_structs() {
        let header = strukt("Header", vec![plain("type", "uint16"), plain("version", "uint8")]);
        let mut inline = plain("Header", "Header");
        inline.disposition = Disposition::Inline;
        let body = strukt("Body", vec![inline, plain("amount", "uint64")]);
        let schema = schema(vec![header, body]);
        assert_eq!(schema.fixed_size("Header"), Some(3));
        assert_eq!(schema.fixed_size("Body"), Some(11));
        assert_eq!(
            schema.member_path("Body", "version"),
            Some(vec!["Header".to_owned(), "version".to_owned()])
        );
        assert_eq!(schema.member("Body", "type").map(|f| f.type_name.as_str()), Some("uint16"));
    }

    #[test]
    fn self_reference_has_no_fixed_size() {
        let node = strukt("Node", vec![plain("next", "Node")]);
        let schema = schema(vec![node]);
        assert_eq!(schema.fixed_size("Node"), None);
        assert_eq!(schema.member_path("Node", "missing"), None);
    }
}
