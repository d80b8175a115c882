// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Type registry: primitives, enums, and aliases keyed by name.
//!
//! Every later phase asks the registry what a type name means. Names are
//! global: an enum, an alias, and a struct may not share a name, and none of
//! them may shadow a primitive.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed-width little-endian integer primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    /// Signed 8-bit integer.
    Int8,
    /// Unsigned 8-bit integer.
    Uint8,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    Uint16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    Uint64,
}

impl Primitive {
    /// All primitives, narrowest first.
    pub const ALL: [Self; 8] = [
        Self::Int8,
        Self::Uint8,
        Self::Int16,
        Self::Uint16,
        Self::Int32,
        Self::Uint32,
        Self::Int64,
        Self::Uint64,
    ];

    /// Schema spelling of the primitive (`"uint16"`, ...).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Uint8 => "uint8",
            Self::Int16 => "int16",
            Self::Uint16 => "uint16",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
        }
    }

    /// Parses a schema type name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Picks the primitive for a byte width and signedness.
    pub fn from_layout(width: u64, signedness: Signedness) -> Option<Self> {
        let signed = signedness == Signedness::Signed;
        Self::ALL
            .into_iter()
            .find(|p| p.width() as u64 == width && p.is_signed() == signed)
    }

    /// Encoded width in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 => 4,
            Self::Int64 | Self::Uint64 => 8,
        }
    }

    /// Whether values are two's-complement signed.
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    /// Smallest representable value.
    pub fn min_value(self) -> i128 {
        match self {
            Self::Int8 => i128::from(i8::MIN),
            Self::Int16 => i128::from(i16::MIN),
            Self::Int32 => i128::from(i32::MIN),
            Self::Int64 => i128::from(i64::MIN),
            Self::Uint8 | Self::Uint16 | Self::Uint32 | Self::Uint64 => 0,
        }
    }

    /// Largest representable value.
    pub fn max_value(self) -> i128 {
        match self {
            Self::Int8 => i128::from(i8::MAX),
            Self::Uint8 => i128::from(u8::MAX),
            Self::Int16 => i128::from(i16::MAX),
            Self::Uint16 => i128::from(u16::MAX),
            Self::Int32 => i128::from(i32::MAX),
            Self::Uint32 => i128::from(u32::MAX),
            Self::Int64 => i128::from(i64::MAX),
            Self::Uint64 => i128::from(u64::MAX),
        }
    }

    /// Whether `value` fits this primitive.
    pub fn contains(self, value: i128) -> bool {
        (self.min_value()..=self.max_value()).contains(&value)
    }
}

/// Integer signedness as written in schema nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signedness {
    /// Two's-complement signed.
    Signed,
    /// Unsigned (the default).
    #[default]
    Unsigned,
}

/// One named member of an enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumValue {
    /// Member name.
    pub name: String,
    /// Member value.
    pub value: i128,
    /// Optional documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Enum definition: an integer primitive plus named values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumDef {
    /// Enum name.
    pub name: String,
    /// Underlying integer representation.
    pub primitive: Primitive,
    /// Members in declaration order; names are unique.
    pub values: Vec<EnumValue>,
    /// Optional documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl EnumDef {
    /// Value of the member called `member`.
    pub fn value_of(&self, member: &str) -> Option<i128> {
        self.values
            .iter()
            .find(|v| v.name == member)
            .map(|v| v.value)
    }

    /// First member carrying `value`.
    pub fn member_of(&self, value: i128) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.value == value)
            .map(|v| v.name.as_str())
    }
}

/// Wire layout of an alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum AliasLayout {
    /// Alias of an integer primitive.
    Int {
        /// Underlying primitive.
        primitive: Primitive,
    },
    /// Fixed-size opaque byte array.
    Bytes {
        /// Byte count.
        size: usize,
        /// Rendering hint for printers (`"hex"`, `"base32"`, ...).
        #[serde(skip_serializing_if = "Option::is_none")]
        print_hint: Option<String>,
    },
}

/// Alias definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasDef {
    /// Alias name.
    pub name: String,
    /// Wire layout.
    #[serde(flatten)]
    pub layout: AliasLayout,
    /// Optional documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Wire representation of a non-struct type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "repr", rename_all = "snake_case")]
pub enum Repr {
    /// Little-endian integer.
    Int {
        /// Integer primitive.
        primitive: Primitive,
    },
    /// Raw bytes of a fixed length.
    Bytes {
        /// Byte count.
        len: usize,
    },
}

impl Repr {
    /// Encoded width in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::Int { primitive } => primitive.width(),
            Self::Bytes { len } => len,
        }
    }
}

/// What a type name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind<'a> {
    /// Built-in integer.
    Primitive(Primitive),
    /// Registered enum.
    Enum(&'a EnumDef),
    /// Registered alias.
    Alias(&'a AliasDef),
    /// Declared struct.
    Struct,
    /// Nothing by that name.
    Unknown,
}

/// Errors raised while populating the registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A name was defined more than once (or shadows a primitive).
    #[error("duplicate definition of `{name}`")]
    DuplicateDefinition {
        /// The repeated name.
        name: String,
    },
    /// An enum repeats a member name.
    #[error("enum `{enum_name}` declares member `{member}` twice")]
    DuplicateEnumValue {
        /// Enum being registered.
        enum_name: String,
        /// Repeated member.
        member: String,
    },
    /// A member value does not fit the enum's width.
    #[error("enum `{enum_name}` member `{member}` value {value} does not fit its width")]
    EnumValueOutOfRange {
        /// Enum being registered.
        enum_name: String,
        /// Offending member.
        member: String,
        /// Offending value.
        value: String,
    },
    /// A member value is not an integer literal.
    #[error("enum `{enum_name}` member `{member}` has non-integer value `{value}`")]
    EnumValueInvalid {
        /// Enum being registered.
        enum_name: String,
        /// Offending member.
        member: String,
        /// Value as written.
        value: String,
    },
    /// Width/signedness pair with no matching primitive.
    #[error("`{name}` has invalid integer width {width}")]
    InvalidWidth {
        /// Enum or alias name.
        name: String,
        /// Declared width in bytes.
        width: u64,
    },
    /// Alias declares neither or both of `width` and `array_size`.
    #[error("alias `{name}` must declare exactly one of `width` or `array_size`")]
    AliasLayoutInvalid {
        /// Alias name.
        name: String,
    },
}

/// Name → definition lookup shared by every compiler phase.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    enums: BTreeMap<String, EnumDef>,
    aliases: BTreeMap<String, AliasDef>,
    structs: BTreeSet<String>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(&self, name: &str) -> Result<(), RegistryError> {
        if Primitive::from_name(name).is_some()
            || self.enums.contains_key(name)
            || self.aliases.contains_key(name)
            || self.structs.contains(name)
        {
            return Err(RegistryError::DuplicateDefinition {
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    /// Registers an enum.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateDefinition`] when the name is taken,
    /// [`RegistryError::DuplicateEnumValue`] for a repeated member, and
    /// [`RegistryError::EnumValueOutOfRange`] when a value overflows the width.
    pub fn register_enum(&mut self, def: EnumDef) -> Result<(), RegistryError> {
        self.claim(&def.name)?;
        let mut seen = BTreeSet::new();
        for value in &def.values {
            if !seen.insert(value.name.as_str()) {
                return Err(RegistryError::DuplicateEnumValue {
                    enum_name: def.name.clone(),
                    member: value.name.clone(),
                });
            }
            if !def.primitive.contains(value.value) {
                return Err(RegistryError::EnumValueOutOfRange {
                    enum_name: def.name.clone(),
                    member: value.name.clone(),
                    value: value.value.to_string(),
                });
            }
        }
        self.enums.insert(def.name.clone(), def);
        Ok(())
    }

    /// Registers an alias.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateDefinition`] when the name is taken.
    pub fn register_alias(&mut self, def: AliasDef) -> Result<(), RegistryError> {
        self.claim(&def.name)?;
        self.aliases.insert(def.name.clone(), def);
        Ok(())
    }

    /// Reserves a struct name so fields anywhere may reference it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateDefinition`] when the name is taken.
    pub fn register_struct(&mut self, name: &str) -> Result<(), RegistryError> {
        self.claim(name)?;
        self.structs.insert(name.to_owned());
        Ok(())
    }

    /// Whether `name` is a built-in integer.
    pub fn is_primitive(name: &str) -> bool {
        Primitive::from_name(name).is_some()
    }

    /// Resolves a type name.
    pub fn resolve(&self, name: &str) -> TypeKind<'_> {
        if let Some(p) = Primitive::from_name(name) {
            TypeKind::Primitive(p)
        } else if let Some(e) = self.enums.get(name) {
            TypeKind::Enum(e)
        } else if let Some(a) = self.aliases.get(name) {
            TypeKind::Alias(a)
        } else if self.structs.contains(name) {
            TypeKind::Struct
        } else {
            TypeKind::Unknown
        }
    }

    /// Enum by name.
    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.get(name)
    }

    /// Whether `name` is a declared struct.
    pub fn is_struct(&self, name: &str) -> bool {
        self.structs.contains(name)
    }

    /// Wire representation of a primitive, enum, or alias.
    pub fn repr(&self, name: &str) -> Option<Repr> {
        match self.resolve(name) {
            TypeKind::Primitive(primitive) => Some(Repr::Int { primitive }),
            TypeKind::Enum(e) => Some(Repr::Int {
                primitive: e.primitive,
            }),
            TypeKind::Alias(a) => Some(match &a.layout {
                AliasLayout::Int { primitive } => Repr::Int {
                    primitive: *primitive,
                },
                AliasLayout::Bytes { size, .. } => Repr::Bytes { len: *size },
            }),
            TypeKind::Struct | TypeKind::Unknown => None,
        }
    }

    /// Integer primitive behind `name`, if it is a primitive, enum, or
    /// integer alias.
    pub fn int_repr(&self, name: &str) -> Option<Primitive> {
        match self.repr(name)? {
            Repr::Int { primitive } => Some(primitive),
            Repr::Bytes { .. } => None,
        }
    }

    /// Whether `name` may hold an array length: an integer primitive or an
    /// integer alias.
    pub fn is_integer(&self, name: &str) -> bool {
        match self.resolve(name) {
            TypeKind::Primitive(_) => true,
            TypeKind::Alias(a) => matches!(a.layout, AliasLayout::Int { .. }),
            TypeKind::Enum(_) | TypeKind::Struct | TypeKind::Unknown => false,
        }
    }

    /// Registered enums in name order.
    pub fn enums(&self) -> impl Iterator<Item = &EnumDef> {
        self.enums.values()
    }

    /// Registered aliases in name order.
    pub fn aliases(&self) -> impl Iterator<Item = &AliasDef> {
        self.aliases.values()
    }
}
