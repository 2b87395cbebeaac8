//! Payload assembly
//!
//! A [`PayloadDef`] declares which caller-supplied fields an endpoint accepts,
//! how each is validated and where it goes: a URL path slot, the query string,
//! a header or the JSON body. [`PayloadDef::assemble`] runs the rule engine on
//! every declared field and partitions the results. Keys the definition does
//! not declare are dropped.

use crate::error::{DefinitionError, FailureReason, FieldError, ValidationErrors};
use crate::rule::{self, RuleSet, RuleSpec};
use crate::value::{scalar_to_string, type_name};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// A JSON object payload
pub type Payload = serde_json::Map<String, Value>;

/// Where a field's value is placed in the outgoing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    /// A key of the JSON body
    Body,
    /// A query-string parameter
    Query,
    /// A request header
    Header,
    /// The nth path placeholder (zero-based)
    Path(usize),
}

/// One declared payload field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    location: Location,
    rules: RuleSet,
}

impl FieldSpec {
    /// Declare a field at a location with no rules
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self {
            name: name.into(),
            location,
            rules: RuleSet::default(),
        }
    }

    /// Field sent in the JSON body
    pub fn body(name: impl Into<String>) -> Self {
        Self::new(name, Location::Body)
    }

    /// Field sent as a query parameter
    pub fn query(name: impl Into<String>) -> Self {
        Self::new(name, Location::Query)
    }

    /// Field sent as a header
    pub fn header(name: impl Into<String>) -> Self {
        Self::new(name, Location::Header)
    }

    /// Field substituted into path slot `index`
    pub fn path(name: impl Into<String>, index: usize) -> Self {
        Self::new(name, Location::Path(index))
    }

    /// Append a rule
    #[must_use]
    pub fn rule(mut self, rule: RuleSpec) -> Self {
        self.rules.push(rule);
        self
    }

    /// Replace the rule set
    #[must_use]
    pub fn rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Field name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Destination of the field
    #[must_use]
    pub const fn location(&self) -> Location {
        self.location
    }

    /// Validation rules
    #[must_use]
    pub const fn rule_set(&self) -> &RuleSet {
        &self.rules
    }
}

/// Validated values partitioned by destination
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledPayload {
    /// Rendered path slot values, indexed by slot
    pub path: Vec<String>,
    /// Query parameters in field declaration order; arrays expand to repeated keys
    pub query: Vec<(String, String)>,
    /// Header values
    pub headers: BTreeMap<String, String>,
    /// JSON body fields
    pub body: Payload,
}

/// The declared fields of one endpoint, in declaration order
#[derive(Debug, Clone, Default)]
pub struct PayloadDef {
    fields: Vec<FieldSpec>,
}

impl PayloadDef {
    /// Empty definition
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append a field
    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Append every field of another definition
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.fields.extend(other.fields);
        self
    }

    /// Declared fields
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Parse a declaration object
    ///
    /// ```json
    /// { "id": { "path": 0, "rules": ["int", { "required": true }] },
    ///   "limit": { "query": true, "rules": "int" } }
    /// ```
    ///
    /// `serde_json` objects iterate in key order unless `preserve_order` is enabled,
    /// so path slots must carry explicit indices.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::InvalidDeclaration`] for a field that names no
    /// location, more than one location, or malformed rules.
    pub fn from_declaration(declaration: &Value) -> Result<Self, DefinitionError> {
        let Value::Object(entries) = declaration else {
            return Err(DefinitionError::InvalidDeclaration(format!(
                "payload definition must be an object, found {}",
                type_name(declaration)
            )));
        };

        let mut def = Self::new();
        for (name, spec) in entries {
            let invalid = |reason: &str| DefinitionError::InvalidDeclaration(format!("field {name:?}: {reason}"));
            let Value::Object(spec) = spec else {
                return Err(invalid("declaration must be an object"));
            };

            let mut locations = Vec::new();
            for key in ["body", "query", "header"] {
                if spec.get(key).and_then(Value::as_bool) == Some(true) {
                    locations.push(match key {
                        "body" => Location::Body,
                        "query" => Location::Query,
                        _ => Location::Header,
                    });
                }
            }
            match spec.get("path") {
                Some(Value::Number(index)) => {
                    let index = index
                        .as_u64()
                        .and_then(|index| usize::try_from(index).ok())
                        .ok_or_else(|| invalid("path index must be a non-negative integer"))?;
                    locations.push(Location::Path(index));
                },
                Some(Value::Bool(true)) => return Err(invalid("path fields need an explicit index")),
                _ => {},
            }

            let location = match locations.as_slice() {
                [location] => *location,
                [] => return Err(invalid("no location declared")),
                _ => return Err(invalid("more than one location declared")),
            };
            let rules = match spec.get("rules") {
                Some(rules) => RuleSet::from_declaration(rules)?,
                None => RuleSet::default(),
            };
            def = def.field(FieldSpec::new(name.clone(), location).rules(rules));
        }
        Ok(def)
    }

    /// Check the definition and return how many path slots it declares
    ///
    /// # Errors
    ///
    /// Duplicate field names, duplicate path indices and gaps in the path
    /// numbering are [`DefinitionError`]s.
    pub fn check(&self, endpoint: &str) -> Result<usize, DefinitionError> {
        let mut names = BTreeSet::new();
        let mut slots = BTreeSet::new();

        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(DefinitionError::DuplicateField {
                    endpoint: endpoint.to_string(),
                    field: field.name.clone(),
                });
            }
            if let Location::Path(index) = field.location {
                if !slots.insert(index) {
                    return Err(DefinitionError::DuplicatePathIndex {
                        endpoint: endpoint.to_string(),
                        index,
                    });
                }
            }
        }

        if let Some(missing) = (0..slots.len()).find(|index| !slots.contains(index)) {
            return Err(DefinitionError::PathIndexGap {
                endpoint: endpoint.to_string(),
                missing,
            });
        }
        Ok(slots.len())
    }

    /// Validate `payload` and partition it by location
    ///
    /// Fields are processed in declaration order. With `validate` off the rule
    /// engine is skipped and values are placed as supplied. A path slot left
    /// empty is reported as a field failure either way.
    ///
    /// # Errors
    ///
    /// Returns every field failure at once.
    pub fn assemble(&self, payload: &Payload, validate: bool) -> Result<AssembledPayload, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut assembled = AssembledPayload::default();
        let mut path: BTreeMap<usize, String> = BTreeMap::new();

        for field in &self.fields {
            let supplied = payload.get(&field.name);
            let value = if validate {
                match rule::validate(supplied, &field.rules, &field.name) {
                    Ok(value) => value,
                    Err(error) => {
                        errors.push(error);
                        continue;
                    },
                }
            } else {
                supplied.filter(|value| !value.is_null()).cloned()
            };

            let Some(value) = value else {
                if let Location::Path(index) = field.location {
                    errors.push(FieldError {
                        field: field.name.clone(),
                        rule: "path",
                        reason: FailureReason::UnfilledPathSlot { index },
                    });
                }
                continue;
            };

            match field.location {
                Location::Path(index) => match scalar_to_string(&value) {
                    Some(rendered) => {
                        path.insert(index, rendered);
                    },
                    None => errors.push(FieldError {
                        field: field.name.clone(),
                        rule: "path",
                        reason: FailureReason::TypeMismatch {
                            expected: "scalar",
                            found: type_name(&value),
                        },
                    }),
                },
                Location::Query => push_query(&mut assembled.query, &field.name, &value),
                Location::Header => {
                    let rendered = scalar_to_string(&value).unwrap_or_else(|| value.to_string());
                    assembled.headers.insert(field.name.clone(), rendered);
                },
                Location::Body => {
                    assembled.body.insert(field.name.clone(), value);
                },
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        assembled.path = path.into_values().collect();
        Ok(assembled)
    }
}

fn push_query(query: &mut Vec<(String, String)>, name: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                let rendered = scalar_to_string(item).unwrap_or_else(|| item.to_string());
                query.push((name.to_string(), rendered));
            }
        },
        other => {
            let rendered = scalar_to_string(other).unwrap_or_else(|| other.to_string());
            query.push((name.to_string(), rendered));
        },
    }
}
