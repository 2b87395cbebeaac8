//! Response DTO projection
//!
//! A [`DtoSpec`] declares the shape a successful response is reduced to.
//! Projection keeps only declared fields, coerces primitives where it can,
//! fills absent fields with zero values (or omits them when optional) and maps
//! "array of" specs over every element.

use crate::error::{DefinitionError, DtoShapeError};
use crate::value::{as_integer, parse_number, type_name};
use serde_json::{Map, Value};

/// Primitive coercion target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// JSON string; numbers and booleans are stringified
    String,
    /// JSON number; numeric strings are parsed
    Number,
    /// Integral JSON number
    Integer,
    /// JSON boolean; `"true"`/`"false"` are parsed
    Boolean,
    /// Any value, passed through untouched
    Any,
}

impl Primitive {
    fn zero(self) -> Value {
        match self {
            Self::String => Value::String(String::new()),
            Self::Number | Self::Integer => Value::from(0),
            Self::Boolean => Value::Bool(false),
            Self::Any => Value::Null,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Any => "any",
        }
    }

    fn coerce(self, raw: Value, path: &str) -> Result<Value, DtoShapeError> {
        let coerced = match (self, &raw) {
            (Self::Any, _)
            | (Self::String, Value::String(_))
            | (Self::Number, Value::Number(_))
            | (Self::Boolean, Value::Bool(_)) => Some(raw.clone()),
            (Self::String, Value::Number(number)) => Some(Value::String(number.to_string())),
            (Self::String, Value::Bool(flag)) => Some(Value::String(flag.to_string())),
            (Self::Number, Value::String(text)) => parse_number(text).map(Value::Number),
            (Self::Integer, Value::Number(number)) => as_integer(number).map(Value::from),
            (Self::Integer, Value::String(text)) => parse_number(text)
                .as_ref()
                .and_then(as_integer)
                .map(Value::from),
            (Self::Boolean, Value::String(text)) => match text.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        };

        coerced.ok_or_else(|| DtoShapeError {
            path: path.to_string(),
            expected: self.name(),
            found: type_name(&raw),
        })
    }
}

/// One declared output field
#[derive(Debug, Clone)]
pub struct DtoField {
    name: String,
    spec: DtoSpec,
    optional: bool,
}

impl DtoField {
    /// Field name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether an absent value is omitted rather than zero-filled
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.optional
    }
}

/// Declared shape of an object
#[derive(Debug, Clone, Default)]
pub struct ObjectSpec {
    fields: Vec<DtoField>,
}

impl ObjectSpec {
    /// Object with no fields
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Declare a field, zero-filled when absent
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, spec: impl Into<DtoSpec>) -> Self {
        self.fields.push(DtoField {
            name: name.into(),
            spec: spec.into(),
            optional: false,
        });
        self
    }

    /// Declare a field omitted when absent
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, spec: impl Into<DtoSpec>) -> Self {
        self.fields.push(DtoField {
            name: name.into(),
            spec: spec.into(),
            optional: true,
        });
        self
    }

    /// Declared fields
    #[must_use]
    pub fn fields(&self) -> &[DtoField] {
        &self.fields
    }
}

/// Declared response shape
#[derive(Debug, Clone)]
pub enum DtoSpec {
    /// A coerced primitive
    Primitive(Primitive),
    /// A mapping of output fields
    Object(ObjectSpec),
    /// Project every element of a sequence
    ArrayOf(Box<DtoSpec>),
}

impl From<Primitive> for DtoSpec {
    fn from(primitive: Primitive) -> Self {
        Self::Primitive(primitive)
    }
}

impl From<ObjectSpec> for DtoSpec {
    fn from(object: ObjectSpec) -> Self {
        Self::Object(object)
    }
}

impl DtoSpec {
    /// Wrap a spec as "array of"
    pub fn array_of(spec: impl Into<Self>) -> Self {
        Self::ArrayOf(Box::new(spec.into()))
    }

    /// Parse a declaration
    ///
    /// - `"string"`, `"number"`, `"integer"`, `"boolean"`, `"any"`: primitives
    /// - `{ "field": <decl> }`: objects; a key ending in `?` is optional
    /// - `[<decl>]`: array of; `[]` is an array of anything
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::InvalidDeclaration`] for unknown tags, arrays
    /// with more than one element or scalar declarations that are not strings.
    pub fn from_declaration(declaration: &Value) -> Result<Self, DefinitionError> {
        match declaration {
            Value::String(tag) => {
                let primitive = match tag.as_str() {
                    "string" => Primitive::String,
                    "number" => Primitive::Number,
                    "int" | "integer" => Primitive::Integer,
                    "boolean" => Primitive::Boolean,
                    "any" => Primitive::Any,
                    other => {
                        return Err(DefinitionError::InvalidDeclaration(format!(
                            "unknown DTO primitive {other:?}"
                        )));
                    },
                };
                Ok(Self::Primitive(primitive))
            },
            Value::Array(items) => match items.as_slice() {
                [] => Ok(Self::array_of(Primitive::Any)),
                [item] => Ok(Self::array_of(Self::from_declaration(item)?)),
                _ => Err(DefinitionError::InvalidDeclaration(
                    "array DTO declarations take exactly one element spec".to_string(),
                )),
            },
            Value::Object(entries) => {
                let mut object = ObjectSpec::new();
                for (key, value) in entries {
                    let spec = Self::from_declaration(value)?;
                    object = match key.strip_suffix('?') {
                        Some(name) => object.optional(name, spec),
                        None => object.field(key.clone(), spec),
                    };
                }
                Ok(Self::Object(object))
            },
            other => Err(DefinitionError::InvalidDeclaration(format!(
                "DTO declaration cannot be {}",
                type_name(other)
            ))),
        }
    }

    fn zero(&self) -> Value {
        match self {
            Self::Primitive(primitive) => primitive.zero(),
            Self::Object(object) => {
                let fields = object
                    .fields
                    .iter()
                    .filter(|field| !field.optional)
                    .map(|field| (field.name.clone(), field.spec.zero()))
                    .collect();
                Value::Object(fields)
            },
            Self::ArrayOf(_) => Value::Array(Vec::new()),
        }
    }
}

/// Shape `raw` according to `spec`
///
/// # Errors
///
/// Returns [`DtoShapeError`] when a value cannot be coerced to its declared
/// shape, e.g. a scalar where a sequence is declared.
pub fn project(raw: Value, spec: &DtoSpec) -> Result<Value, DtoShapeError> {
    project_at(raw, spec, "$")
}

/// Shape `raw`, or pass it through unchanged when no spec is declared
///
/// # Errors
///
/// See [`project`].
pub fn project_optional(raw: Value, spec: Option<&DtoSpec>) -> Result<Value, DtoShapeError> {
    match spec {
        Some(spec) => project(raw, spec),
        None => Ok(raw),
    }
}

fn project_at(raw: Value, spec: &DtoSpec, path: &str) -> Result<Value, DtoShapeError> {
    match spec {
        DtoSpec::Primitive(primitive) => primitive.coerce(raw, path),
        DtoSpec::ArrayOf(element) => match raw {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| project_at(item, element, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Err(DtoShapeError {
                path: path.to_string(),
                expected: "array",
                found: type_name(&other),
            }),
        },
        DtoSpec::Object(object) => match raw {
            Value::Object(mut fields) => {
                let mut shaped = Map::new();
                for field in &object.fields {
                    match fields.remove(&field.name).filter(|value| !value.is_null()) {
                        Some(value) => {
                            let projected = project_at(value, &field.spec, &format!("{path}.{}", field.name))?;
                            shaped.insert(field.name.clone(), projected);
                        },
                        None if field.optional => {},
                        None => {
                            shaped.insert(field.name.clone(), field.spec.zero());
                        },
                    }
                }
                Ok(Value::Object(shaped))
            },
            other => Err(DtoShapeError {
                path: path.to_string(),
                expected: "object",
                found: type_name(&other),
            }),
        },
    }
}
