//! Dual-Tag Field Mapper
//!
//! Resource types describe their fields once, in a static descriptor table.
//! Each descriptor may carry a *wire* tag (the key used in API payloads) and a
//! *configuration* tag (the key used for import/export). The two tags are
//! independent: a field can appear in one representation and not the other,
//! and the keys differ (`SecretName` on the wire, `secret_name` in config).
//!
//! The generic routines here walk those tables, so no resource type writes its
//! own serializer:
//!
//! - [`to_wire_map`] / [`to_config_map`] encode an object
//! - [`from_map`] / [`from_config_map`] populate an object
//! - [`flatten`] merges nested mappings into a single level

use crate::error::{Result, VaultError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// How a field is stored on its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A plain value read with [`FieldMap::get`] and written with [`FieldMap::set`]
    Scalar,
    /// A sub-structure encoded as its own object
    Nested,
    /// A list of sub-structures encoded as an array of objects
    NestedList,
    /// An embedded sub-structure whose keys are merged into the owner's map.
    /// Embedded structures are expected to hold scalar fields only.
    Flatten,
}

/// Key and emptiness policy of one representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub key: &'static str,
    pub omit_empty: bool,
}

/// Which of the two representations to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repr {
    Wire,
    Config,
}

/// Static descriptor of one field
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub wire: Option<Tag>,
    pub config: Option<Tag>,
}

impl Field {
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            wire: None,
            config: None,
        }
    }

    pub const fn scalar(name: &'static str) -> Self {
        Self::new(name, FieldKind::Scalar)
    }

    pub const fn nested(name: &'static str) -> Self {
        Self::new(name, FieldKind::Nested)
    }

    pub const fn nested_list(name: &'static str) -> Self {
        Self::new(name, FieldKind::NestedList)
    }

    pub const fn flatten(name: &'static str) -> Self {
        Self::new(name, FieldKind::Flatten)
    }

    /// Wire key, always emitted
    pub const fn wire(self, key: &'static str) -> Self {
        Self {
            wire: Some(Tag {
                key,
                omit_empty: false,
            }),
            ..self
        }
    }

    /// Wire key, skipped when the value is empty
    pub const fn wire_omit_empty(self, key: &'static str) -> Self {
        Self {
            wire: Some(Tag {
                key,
                omit_empty: true,
            }),
            ..self
        }
    }

    /// Configuration key, always emitted
    pub const fn config(self, key: &'static str) -> Self {
        Self {
            config: Some(Tag {
                key,
                omit_empty: false,
            }),
            ..self
        }
    }

    /// Configuration key, skipped when the value is empty
    pub const fn config_omit_empty(self, key: &'static str) -> Self {
        Self {
            config: Some(Tag {
                key,
                omit_empty: true,
            }),
            ..self
        }
    }

    pub fn tag(&self, repr: Repr) -> Option<Tag> {
        match repr {
            Repr::Wire => self.wire,
            Repr::Config => self.config,
        }
    }
}

/// Access to a type's fields by descriptor name
///
/// Implementors return a static descriptor table from [`fields`](Self::fields)
/// and answer the accessors for the names listed there. Accessors for kinds a
/// type does not use can keep their defaults.
pub trait FieldMap {
    fn fields(&self) -> &'static [Field];

    /// Current value of a scalar field
    fn get(&self, name: &str) -> Value {
        let _ = name;
        Value::Null
    }

    /// Assign a scalar field, failing on a type mismatch
    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let _ = value;
        Err(unknown_field(name))
    }

    /// Nested or flattened sub-structure, `None` when absent
    fn nested(&self, name: &str) -> Option<&dyn FieldMap> {
        let _ = name;
        None
    }

    /// Mutable sub-structure, created on demand for optional members
    fn nested_mut(&mut self, name: &str) -> Option<&mut dyn FieldMap> {
        let _ = name;
        None
    }

    fn nested_list(&self, name: &str) -> Vec<&dyn FieldMap> {
        let _ = name;
        Vec::new()
    }

    /// Replace a list of sub-structures with `len` default entries and hand
    /// them out for population
    fn nested_list_mut(&mut self, name: &str, len: usize) -> Vec<&mut dyn FieldMap> {
        let _ = (name, len);
        Vec::new()
    }
}

/// Encode a scalar for [`FieldMap::get`]
pub fn encode_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Decode a scalar for [`FieldMap::set`]; mismatched JSON types are an error
pub fn decode_value<T: DeserializeOwned>(name: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| VaultError::field(name, e))
}

pub fn unknown_field(name: &str) -> VaultError {
    VaultError::field(name, "no such field")
}

/// Go-style emptiness: null, false, zero, empty string, empty array, empty object
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Serialize the wire-tagged fields of an object into an API payload
pub fn to_wire_map(obj: &dyn FieldMap) -> Map<String, Value> {
    encode(obj, Repr::Wire)
}

/// Serialize the configuration-tagged fields of an object
///
/// Fields without a configuration tag are never emitted, whatever their value.
pub fn to_config_map(obj: &dyn FieldMap) -> Map<String, Value> {
    encode(obj, Repr::Config)
}

/// Populate an object from a decoded API mapping
///
/// Keys missing from the mapping, and explicit nulls, leave the field as is.
pub fn from_map(map: &Map<String, Value>, obj: &mut dyn FieldMap) -> Result<()> {
    decode(map, obj, Repr::Wire)
}

/// Populate an object from a configuration mapping
pub fn from_config_map(map: &Map<String, Value>, obj: &mut dyn FieldMap) -> Result<()> {
    decode(map, obj, Repr::Config)
}

/// Merge nested mappings into one flat mapping
///
/// Keys are assumed unique across nesting levels. On a collision the value
/// visited last wins.
pub fn flatten(nested: &Value) -> Result<Map<String, Value>> {
    let Value::Object(_) = nested else {
        return Err(VaultError::field("<root>", "not a valid input, must be a map"));
    };

    let mut flat = Map::new();
    flatten_into(&mut flat, nested.clone());
    Ok(flat)
}

fn flatten_into(flat: &mut Map<String, Value>, nested: Value) {
    let Value::Object(map) = nested else {
        return;
    };

    for (key, value) in map {
        match value {
            Value::Object(_) => flatten_into(flat, value),
            other => {
                flat.insert(key, other);
            }
        }
    }
}

fn encode(obj: &dyn FieldMap, repr: Repr) -> Map<String, Value> {
    let mut out = Map::new();

    for field in obj.fields() {
        let tag = match (field.kind, field.tag(repr)) {
            (FieldKind::Flatten, _) => {
                if let Some(inner) = obj.nested(field.name) {
                    flatten_into(&mut out, Value::Object(encode(inner, repr)));
                }
                continue;
            }
            (_, Some(tag)) => tag,
            (_, None) => continue,
        };

        let value = match field.kind {
            FieldKind::Nested => obj
                .nested(field.name)
                .map(|inner| Value::Object(encode(inner, repr)))
                .unwrap_or(Value::Null),
            FieldKind::NestedList => Value::Array(
                obj.nested_list(field.name)
                    .into_iter()
                    .map(|inner| Value::Object(encode(inner, repr)))
                    .collect(),
            ),
            _ => obj.get(field.name),
        };

        if tag.omit_empty && is_empty(&value) {
            continue;
        }
        out.insert(tag.key.to_string(), value);
    }

    out
}

fn decode(map: &Map<String, Value>, obj: &mut dyn FieldMap, repr: Repr) -> Result<()> {
    for field in obj.fields() {
        let tag = match (field.kind, field.tag(repr)) {
            (FieldKind::Flatten, _) => {
                if let Some(inner) = obj.nested_mut(field.name) {
                    decode(map, inner, repr)?;
                }
                continue;
            }
            (_, Some(tag)) => tag,
            (_, None) => continue,
        };

        let Some(value) = map.get(tag.key) else {
            continue;
        };
        if value.is_null() {
            continue;
        }

        match field.kind {
            FieldKind::Nested => {
                let Value::Object(inner_map) = value else {
                    return Err(VaultError::field(tag.key, "expected an object"));
                };
                if let Some(inner) = obj.nested_mut(field.name) {
                    decode(inner_map, inner, repr)?;
                }
            }
            FieldKind::NestedList => {
                let Value::Array(items) = value else {
                    return Err(VaultError::field(tag.key, "expected an array"));
                };
                let inners = obj.nested_list_mut(field.name, items.len());
                for (item, inner) in items.iter().zip(inners) {
                    let Value::Object(item_map) = item else {
                        return Err(VaultError::field(tag.key, "expected an array of objects"));
                    };
                    decode(item_map, inner, repr)?;
                }
            }
            _ => obj.set(field.name, value.clone()).map_err(|e| match e {
                VaultError::Field { message, .. } => VaultError::field(tag.key, message),
                other => other,
            })?,
        }
    }

    Ok(())
}
