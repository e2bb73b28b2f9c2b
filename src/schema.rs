//! The JSON Schema (draft 2020-12) data model.
//!
//! A schema is either the literal `true`, the literal `false`, or an
//! object schema. The literals have canonical object forms (`true` is the
//! empty object, `false` is `{"not": {}}`): serialization collapses a
//! vacuous object to `true` and an object whose only content is an empty
//! `not` to `false`, so the wire form round-trips.
//!
//! Deep copying is plain [`Clone`]: every field has value semantics,
//! including the open-ended JSON leaves carried as [`serde_json::Value`].

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

use crate::pointer::unescape;

/// A single JSON Schema type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Null,
    Boolean,
    Object,
    Array,
    Number,
    Integer,
    String,
}

/// The value of the `type` keyword: one tag or a set of tags.
///
/// Deserializes from either a bare tag or an array of tags; a singleton
/// serializes back as the bare tag so `{"type":"string"}` round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeSet(pub Vec<Type>);

impl From<Type> for TypeSet {
    fn from(t: Type) -> Self {
        TypeSet(vec![t])
    }
}

impl Serialize for TypeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.len() == 1 {
            self.0[0].serialize(serializer)
        } else {
            let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
            for t in &self.0 {
                seq.serialize_element(t)?;
            }
            seq.end()
        }
    }
}

impl<'de> Deserialize<'de> for TypeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TypeSetVisitor;

        impl<'de> Visitor<'de> for TypeSetVisitor {
            type Value = TypeSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a type name or an array of type names")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<TypeSet, E> {
                let t = Type::deserialize(de::value::StrDeserializer::new(v))?;
                Ok(TypeSet(vec![t]))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<TypeSet, A::Error> {
                let mut types = Vec::new();
                while let Some(t) = seq.next_element()? {
                    types.push(t);
                }
                Ok(TypeSet(types))
            }
        }

        deserializer.deserialize_any(TypeSetVisitor)
    }
}

/// A JSON Schema document or subschema.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// The literal `true` schema, accepting every instance.
    True,
    /// The literal `false` schema, rejecting every instance.
    False,
    /// An object schema.
    Object(Box<ObjectSchema>),
}

impl Default for Schema {
    fn default() -> Self {
        Schema::True
    }
}

/// The keyword members of an object schema. Absent means unconstrained.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectSchema {
    // Core identifiers
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(rename = "$vocabulary", skip_serializing_if = "BTreeMap::is_empty")]
    pub vocabulary: BTreeMap<String, bool>,
    #[serde(rename = "$id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "$dynamicRef", skip_serializing_if = "Option::is_none")]
    pub dynamic_ref: Option<String>,
    #[serde(rename = "$anchor", skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    #[serde(rename = "$dynamicAnchor", skip_serializing_if = "Option::is_none")]
    pub dynamic_anchor: Option<String>,
    #[serde(rename = "$defs", skip_serializing_if = "BTreeMap::is_empty")]
    pub defs: BTreeMap<String, Schema>,
    #[serde(rename = "$comment", skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    // Applying subschemas with logic
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Schema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Schema>>,

    // Applying subschemas conditionally
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub if_: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub then: Option<Box<Schema>>,
    #[serde(rename = "else", skip_serializing_if = "Option::is_none")]
    pub else_: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dependent_schemas: BTreeMap<String, Schema>,

    // Applying subschemas to arrays
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prefix_items: Vec<Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unevaluated_items: Option<Box<Schema>>,

    // Applying subschemas to objects
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub pattern_properties: BTreeMap<String, Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_names: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unevaluated_properties: Option<Box<Schema>>,

    // Content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_schema: Option<Box<Schema>>,

    // Validation
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub types: Option<TypeSet>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_: Option<Vec<Value>>,
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_: Option<Value>,

    // Validation for numbers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<Number>,

    // Validation for strings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    // Validation for arrays
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_contains: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_contains: Option<u64>,

    // Validation for objects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dependent_required: BTreeMap<String, Vec<String>>,

    // Basic metadata annotations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(rename = "readOnly", skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(rename = "writeOnly", skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<Value>>,
}

impl ObjectSchema {
    fn has_metadata(&self) -> bool {
        self.schema.is_some()
            || !self.vocabulary.is_empty()
            || self.id.is_some()
            || self.reference.is_some()
            || self.dynamic_ref.is_some()
            || self.anchor.is_some()
            || self.dynamic_anchor.is_some()
            || !self.defs.is_empty()
            || self.comment.is_some()
            || self.title.is_some()
            || self.description.is_some()
            || self.default.is_some()
            || self.deprecated.is_some()
            || self.read_only.is_some()
            || self.write_only.is_some()
            || self.examples.is_some()
    }

    fn has_applicators_besides_not(&self) -> bool {
        !self.all_of.is_empty()
            || !self.any_of.is_empty()
            || !self.one_of.is_empty()
            || self.if_.is_some()
            || self.then.is_some()
            || self.else_.is_some()
            || !self.dependent_schemas.is_empty()
            || !self.prefix_items.is_empty()
            || self.items.is_some()
            || self.contains.is_some()
            || self.unevaluated_items.is_some()
            || !self.properties.is_empty()
            || !self.pattern_properties.is_empty()
            || self.additional_properties.is_some()
            || self.property_names.is_some()
            || self.unevaluated_properties.is_some()
            || self.content_schema.is_some()
    }

    fn has_validators(&self) -> bool {
        self.types.is_some()
            || self.enum_.is_some()
            || self.const_.is_some()
            || self.multiple_of.is_some()
            || self.maximum.is_some()
            || self.exclusive_maximum.is_some()
            || self.minimum.is_some()
            || self.exclusive_minimum.is_some()
            || self.max_length.is_some()
            || self.min_length.is_some()
            || self.pattern.is_some()
            || self.max_items.is_some()
            || self.min_items.is_some()
            || self.unique_items.is_some()
            || self.max_contains.is_some()
            || self.min_contains.is_some()
            || self.max_properties.is_some()
            || self.min_properties.is_some()
            || !self.required.is_empty()
            || !self.dependent_required.is_empty()
    }

    /// Whether this object is empty of metadata, applicators and
    /// validators, making it equivalent to the literal `true` schema.
    pub fn is_vacuous(&self) -> bool {
        self.not.is_none()
            && !self.has_metadata()
            && !self.has_applicators_besides_not()
            && !self.has_validators()
    }

    fn is_false_shape(&self) -> bool {
        self.not.as_deref().is_some_and(Schema::is_true)
            && !self.has_metadata()
            && !self.has_applicators_besides_not()
            && !self.has_validators()
    }
}

impl Schema {
    /// Wraps an [`ObjectSchema`].
    pub fn object(obj: ObjectSchema) -> Schema {
        Schema::Object(Box::new(obj))
    }

    /// The canonical object form of the `false` literal, `{"not": {}}`.
    pub fn false_object() -> Schema {
        Schema::object(ObjectSchema {
            not: Some(Box::new(Schema::object(ObjectSchema::default()))),
            ..ObjectSchema::default()
        })
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self {
            Schema::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectSchema> {
        match self {
            Schema::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Whether this schema accepts every instance: the `true` literal, or
    /// an object empty of metadata, applicators and validators.
    pub fn is_true(&self) -> bool {
        match self {
            Schema::True => true,
            Schema::False => false,
            Schema::Object(obj) => obj.is_vacuous(),
        }
    }

    /// Whether this schema rejects every instance: the `false` literal, or
    /// an object whose only content is a `not` that is itself empty.
    pub fn is_false(&self) -> bool {
        match self {
            Schema::False => true,
            Schema::True => false,
            Schema::Object(obj) => obj.is_false_shape(),
        }
    }

    /// The `$id` of this schema, if declared non-empty.
    pub fn id(&self) -> Option<&str> {
        self.as_object()?.id.as_deref().filter(|s| !s.is_empty())
    }

    /// The `$anchor` of this schema, if declared non-empty.
    pub fn anchor(&self) -> Option<&str> {
        self.as_object()?
            .anchor
            .as_deref()
            .filter(|s| !s.is_empty())
    }

    /// The `$ref` of this schema, if declared non-empty.
    pub fn reference(&self) -> Option<&str> {
        self.as_object()?
            .reference
            .as_deref()
            .filter(|s| !s.is_empty())
    }

    /// Structural lookup of the subschema at an in-resource JSON pointer.
    ///
    /// Follows the applicator keyword grammar without dereferencing any
    /// `$ref`. Returns `None` for pointers that do not name a schema slot.
    pub fn at_pointer(&self, pointer: &str) -> Option<&Schema> {
        let segments = unescape(pointer);
        let mut current = self;
        let mut i = 0;

        while i < segments.len() {
            let obj = current.as_object()?;
            let segment = segments[i].as_str();
            match segment {
                "not" => current = obj.not.as_deref()?,
                "if" => current = obj.if_.as_deref()?,
                "then" => current = obj.then.as_deref()?,
                "else" => current = obj.else_.as_deref()?,
                "items" => current = obj.items.as_deref()?,
                "contains" => current = obj.contains.as_deref()?,
                "additionalProperties" => current = obj.additional_properties.as_deref()?,
                "propertyNames" => current = obj.property_names.as_deref()?,
                "unevaluatedItems" => current = obj.unevaluated_items.as_deref()?,
                "unevaluatedProperties" => current = obj.unevaluated_properties.as_deref()?,
                "contentSchema" => current = obj.content_schema.as_deref()?,
                "allOf" | "anyOf" | "oneOf" | "prefixItems" => {
                    let col = match segment {
                        "allOf" => &obj.all_of,
                        "anyOf" => &obj.any_of,
                        "oneOf" => &obj.one_of,
                        _ => &obj.prefix_items,
                    };
                    let index: usize = segments.get(i + 1)?.parse().ok()?;
                    current = col.get(index)?;
                    i += 1;
                }
                "$defs" | "dependentSchemas" | "properties" | "patternProperties" => {
                    let col = match segment {
                        "$defs" => &obj.defs,
                        "dependentSchemas" => &obj.dependent_schemas,
                        "properties" => &obj.properties,
                        _ => &obj.pattern_properties,
                    };
                    current = col.get(segments.get(i + 1)?.as_str())?;
                    i += 1;
                }
                _ => return None,
            }
            i += 1;
        }

        Some(current)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("<unserializable schema>"),
        }
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Schema::True => serializer.serialize_bool(true),
            Schema::False => serializer.serialize_bool(false),
            Schema::Object(obj) => {
                if obj.is_vacuous() {
                    serializer.serialize_bool(true)
                } else if obj.is_false_shape() {
                    serializer.serialize_bool(false)
                } else {
                    obj.serialize(serializer)
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = Schema;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a boolean or a schema object")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Schema, E> {
                Ok(if v { Schema::True } else { Schema::False })
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Schema, A::Error> {
                let obj = ObjectSchema::deserialize(de::value::MapAccessDeserializer::new(map))?;
                Ok(Schema::Object(Box::new(obj)))
            }
        }

        deserializer.deserialize_any(SchemaVisitor)
    }
}
