//! Rule engine
//!
//! Validates and coerces a single field value against an ordered list of
//! [`RuleSpec`]s. Rules are evaluated left to right and evaluation stops at
//! the first failure.
//!
//! A rule is a kind check (`string`, `number`, a regex, a custom predicate, ...)
//! plus optional modifiers: `required`, `min`/`max`/`equal` bounds and the
//! [`Measurement`] those bounds apply to.
//!
//! # Example
//!
//! ```
//! use karman_core::rule::{validate, Measurement, RuleSet, RuleSpec};
//! use serde_json::json;
//!
//! let rules = RuleSet::all([
//!     RuleSpec::string(),
//!     RuleSpec::any().required().min(1.0).measure(Measurement::Length),
//! ]);
//!
//! assert!(validate(Some(&json!("alice")), &rules, "username").is_ok());
//! assert!(validate(Some(&json!("")), &rules, "username").is_err());
//! assert!(validate(None, &rules, "username").is_err());
//! ```

use crate::error::{DefinitionError, FailureReason, FieldError};
use crate::value::{as_integer, parse_number, type_name};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// What a rule's bounds are compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measurement {
    /// Character count of a string or element count of an array
    Length,
    /// The numeric value itself
    Value,
    /// Number of keys of an object (or elements of an array)
    Count,
}

impl Measurement {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::Value => "value",
            Self::Count => "count",
        }
    }

    /// Measurement used when a rule declares bounds but no measurement
    const fn infer(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) | Value::Array(_) => Some(Self::Length),
            Value::Number(_) => Some(Self::Value),
            Value::Object(_) => Some(Self::Count),
            Value::Null | Value::Bool(_) => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn measure(self, value: &Value) -> Result<f64, FailureReason> {
        match (self, value) {
            (Self::Length, Value::String(text)) => Ok(text.chars().count() as f64),
            (Self::Length | Self::Count, Value::Array(items)) => Ok(items.len() as f64),
            (Self::Count, Value::Object(fields)) => Ok(fields.len() as f64),
            (Self::Value, Value::Number(number)) => number.as_f64().ok_or(FailureReason::TypeMismatch {
                expected: "number",
                found: "number",
            }),
            (Self::Length, other) => Err(FailureReason::TypeMismatch {
                expected: "string or array",
                found: type_name(other),
            }),
            (Self::Count, other) => Err(FailureReason::TypeMismatch {
                expected: "object or array",
                found: type_name(other),
            }),
            (Self::Value, other) => Err(FailureReason::TypeMismatch {
                expected: "number",
                found: type_name(other),
            }),
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Predicate = dyn Fn(&Value) -> Result<(), String> + Send + Sync;

/// A user-supplied predicate
///
/// The engine never looks inside; it only sees pass or fail plus an explanation.
#[derive(Clone)]
pub struct CustomRule {
    name: Arc<str>,
    check: Arc<Predicate>,
}

impl CustomRule {
    /// Name shown in `Debug` output
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// The type check a rule performs
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// No type check; used for descriptor-only rules
    Any,
    /// A JSON string
    String,
    /// A number; numeric strings are coerced
    Number,
    /// An integral number; integral numeric strings are coerced
    Integer,
    /// A boolean; `"true"`/`"false"` are coerced
    Boolean,
    /// A JSON array
    Array,
    /// A JSON object
    Object,
    /// JSON `null`
    Null,
    /// A string matching a regular expression
    Pattern(Regex),
    /// A custom predicate
    Custom(CustomRule),
}

impl RuleKind {
    /// Tag reported in [`FieldError::rule`]
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
            Self::Pattern(_) => "pattern",
            Self::Custom(_) => "custom",
        }
    }

    fn check(&self, value: Value) -> Result<Value, FailureReason> {
        let mismatch = |expected: &'static str, value: &Value| FailureReason::TypeMismatch {
            expected,
            found: type_name(value),
        };

        match self {
            Self::Any => Ok(value),
            Self::String => match value {
                Value::String(_) => Ok(value),
                other => Err(mismatch("string", &other)),
            },
            Self::Number => match value {
                Value::Number(_) => Ok(value),
                Value::String(ref text) => parse_number(text)
                    .map(Value::Number)
                    .ok_or_else(|| mismatch("number", &value)),
                other => Err(mismatch("number", &other)),
            },
            Self::Integer => {
                let number = match &value {
                    Value::Number(number) => Some(number.clone()),
                    Value::String(text) => parse_number(text),
                    _ => None,
                };
                number
                    .as_ref()
                    .and_then(as_integer)
                    .map(Value::from)
                    .ok_or_else(|| mismatch("integer", &value))
            },
            Self::Boolean => match value {
                Value::Bool(_) => Ok(value),
                Value::String(ref text) if text == "true" => Ok(Value::Bool(true)),
                Value::String(ref text) if text == "false" => Ok(Value::Bool(false)),
                other => Err(mismatch("boolean", &other)),
            },
            Self::Array => match value {
                Value::Array(_) => Ok(value),
                other => Err(mismatch("array", &other)),
            },
            Self::Object => match value {
                Value::Object(_) => Ok(value),
                other => Err(mismatch("object", &other)),
            },
            Self::Null => match value {
                Value::Null => Ok(value),
                other => Err(mismatch("null", &other)),
            },
            Self::Pattern(regex) => match &value {
                Value::String(text) if regex.is_match(text) => Ok(value),
                Value::String(_) => Err(FailureReason::PatternMismatch {
                    pattern: regex.as_str().to_string(),
                }),
                other => Err(mismatch("string", other)),
            },
            Self::Custom(rule) => (rule.check)(&value)
                .map(|()| value)
                .map_err(FailureReason::Custom),
        }
    }
}

/// One rule: a kind check plus modifiers
#[derive(Debug, Clone)]
pub struct RuleSpec {
    kind: RuleKind,
    required: bool,
    check_absent: bool,
    min: Option<f64>,
    max: Option<f64>,
    equal: Option<f64>,
    measurement: Option<Measurement>,
}

impl RuleSpec {
    /// A rule with the given kind and no modifiers
    #[must_use]
    pub const fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            required: false,
            check_absent: false,
            min: None,
            max: None,
            equal: None,
            measurement: None,
        }
    }

    /// Descriptor-only rule, no type check
    #[must_use]
    pub const fn any() -> Self {
        Self::new(RuleKind::Any)
    }

    /// Value must be a string
    #[must_use]
    pub const fn string() -> Self {
        Self::new(RuleKind::String)
    }

    /// Value must be a number
    #[must_use]
    pub const fn number() -> Self {
        Self::new(RuleKind::Number)
    }

    /// Value must be an integer
    #[must_use]
    pub const fn integer() -> Self {
        Self::new(RuleKind::Integer)
    }

    /// Value must be a boolean
    #[must_use]
    pub const fn boolean() -> Self {
        Self::new(RuleKind::Boolean)
    }

    /// Value must be an array
    #[must_use]
    pub const fn array() -> Self {
        Self::new(RuleKind::Array)
    }

    /// Value must be an object
    #[must_use]
    pub const fn object() -> Self {
        Self::new(RuleKind::Object)
    }

    /// Value must be `null`
    #[must_use]
    pub const fn null() -> Self {
        Self::new(RuleKind::Null)
    }

    /// Value must be a string matching `pattern`
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::InvalidDeclaration`] if the regex does not compile.
    pub fn pattern(pattern: &str) -> Result<Self, DefinitionError> {
        Regex::new(pattern)
            .map(|regex| Self::new(RuleKind::Pattern(regex)))
            .map_err(|e| DefinitionError::InvalidDeclaration(format!("pattern {pattern:?}: {e}")))
    }

    /// Value must satisfy a custom predicate
    ///
    /// The predicate returns `Err(explanation)` to reject.
    #[must_use]
    pub fn custom<F>(name: &str, check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Self::new(RuleKind::Custom(CustomRule {
            name: Arc::from(name),
            check: Arc::new(check),
        }))
    }

    /// Parse a kind tag (`"string"`, `"int"`, ...)
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::InvalidDeclaration`] for unknown tags.
    pub fn from_tag(tag: &str) -> Result<Self, DefinitionError> {
        let kind = match tag {
            "any" => RuleKind::Any,
            "string" => RuleKind::String,
            "number" => RuleKind::Number,
            "int" | "integer" => RuleKind::Integer,
            "boolean" => RuleKind::Boolean,
            "array" => RuleKind::Array,
            "object" => RuleKind::Object,
            "null" => RuleKind::Null,
            other => {
                return Err(DefinitionError::InvalidDeclaration(format!(
                    "unknown rule kind {other:?}"
                )));
            },
        };
        Ok(Self::new(kind))
    }

    /// Parse a rule declaration: a kind tag or a descriptor object
    /// `{ "required", "min", "max", "equal", "measurement" }`
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::InvalidDeclaration`] for unknown tags, unknown
    /// descriptor keys or values of the wrong type.
    pub fn from_declaration(declaration: &Value) -> Result<Self, DefinitionError> {
        match declaration {
            Value::String(tag) => Self::from_tag(tag),
            Value::Object(_) => {
                let descriptor = Descriptor::deserialize(declaration)
                    .map_err(|e| DefinitionError::InvalidDeclaration(format!("rule descriptor: {e}")))?;
                let mut rule = Self::any();
                rule.required = descriptor.required;
                rule.min = descriptor.min;
                rule.max = descriptor.max;
                rule.equal = descriptor.equal;
                rule.measurement = descriptor.measurement;
                Ok(rule)
            },
            other => Err(DefinitionError::InvalidDeclaration(format!(
                "rule must be a kind string or descriptor object, found {}",
                type_name(other)
            ))),
        }
    }

    /// Mark the field as required
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Evaluate this rule against `null` when the value is absent
    #[must_use]
    pub const fn check_absent(mut self) -> Self {
        self.check_absent = true;
        self
    }

    /// Lower bound, inclusive
    #[must_use]
    pub const fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Upper bound, inclusive
    #[must_use]
    pub const fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Exact bound
    #[must_use]
    pub const fn equal(mut self, equal: f64) -> Self {
        self.equal = Some(equal);
        self
    }

    /// Quantity the bounds apply to
    #[must_use]
    pub const fn measure(mut self, measurement: Measurement) -> Self {
        self.measurement = Some(measurement);
        self
    }

    /// The kind of this rule
    #[must_use]
    pub const fn kind(&self) -> &RuleKind {
        &self.kind
    }

    /// Whether this rule requires a value
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    const fn has_bounds(&self) -> bool {
        self.min.is_some() || self.max.is_some() || self.equal.is_some()
    }

    /// Check one present value, returning it (possibly coerced)
    fn apply(&self, value: Value) -> Result<Value, FailureReason> {
        let value = self.kind.check(value)?;
        if self.has_bounds() {
            self.check_bounds(&value)?;
        }
        Ok(value)
    }

    #[allow(clippy::float_cmp)]
    fn check_bounds(&self, value: &Value) -> Result<(), FailureReason> {
        let Some(measurement) = self.measurement.or_else(|| Measurement::infer(value)) else {
            return Err(FailureReason::TypeMismatch {
                expected: "a measurable value",
                found: type_name(value),
            });
        };
        let actual = measurement.measure(value)?;

        if let Some(min) = self.min {
            if actual < min {
                return Err(FailureReason::BelowMin {
                    measurement,
                    min,
                    actual,
                });
            }
        }
        if let Some(max) = self.max {
            if actual > max {
                return Err(FailureReason::AboveMax {
                    measurement,
                    max,
                    actual,
                });
            }
        }
        if let Some(expected) = self.equal {
            if actual != expected {
                return Err(FailureReason::NotEqual {
                    measurement,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    fn fail(&self, field: &str, reason: FailureReason) -> FieldError {
        FieldError {
            field: field.to_string(),
            rule: self.kind.tag(),
            reason,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Descriptor {
    #[serde(default)]
    required: bool,
    min: Option<f64>,
    max: Option<f64>,
    equal: Option<f64>,
    measurement: Option<Measurement>,
}

/// How the rules of one field compose
#[derive(Debug, Clone)]
pub enum RuleSet {
    /// Every rule must pass, in order
    All(SmallVec<[RuleSpec; 4]>),
    /// At least one rule must pass
    Any(SmallVec<[RuleSpec; 4]>),
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::All(SmallVec::new())
    }
}

impl RuleSet {
    /// Sequential rules (intersection)
    #[must_use]
    pub fn all(rules: impl IntoIterator<Item = RuleSpec>) -> Self {
        Self::All(rules.into_iter().collect())
    }

    /// Alternative rules (union)
    #[must_use]
    pub fn any_of(rules: impl IntoIterator<Item = RuleSpec>) -> Self {
        Self::Any(rules.into_iter().collect())
    }

    /// Parse a declaration: a single rule or an array of rules (sequential)
    ///
    /// # Errors
    ///
    /// Propagates [`RuleSpec::from_declaration`] failures.
    pub fn from_declaration(declaration: &Value) -> Result<Self, DefinitionError> {
        match declaration {
            Value::Array(items) => items
                .iter()
                .map(RuleSpec::from_declaration)
                .collect::<Result<SmallVec<_>, _>>()
                .map(Self::All),
            single => RuleSpec::from_declaration(single).map(|rule| Self::All(SmallVec::from_elem(rule, 1))),
        }
    }

    /// Append a rule
    pub fn push(&mut self, rule: RuleSpec) {
        match self {
            Self::All(rules) | Self::Any(rules) => rules.push(rule),
        }
    }

    /// The rules in declaration order
    #[must_use]
    pub fn rules(&self) -> &[RuleSpec] {
        match self {
            Self::All(rules) | Self::Any(rules) => rules,
        }
    }

    /// Whether any rule marks the field as required
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.rules().iter().any(RuleSpec::is_required)
    }
}

/// Validate one field value
///
/// `value` is `None` when the payload has no such key; `null` is treated as
/// absent too. Returns `Ok(None)` for an absent optional value, otherwise the
/// validated value with any declared coercions applied. The input is never
/// modified.
///
/// # Errors
///
/// Returns the first failing rule as a [`FieldError`] naming `field`.
pub fn validate(value: Option<&Value>, rules: &RuleSet, field: &str) -> Result<Option<Value>, FieldError> {
    let Some(value) = value.filter(|value| !value.is_null()) else {
        return validate_absent(rules, field);
    };

    match rules {
        RuleSet::All(specs) => {
            let mut current = value.clone();
            for rule in specs {
                current = rule.apply(current).map_err(|reason| rule.fail(field, reason))?;
            }
            Ok(Some(current))
        },
        RuleSet::Any(specs) => {
            let mut first_failure = None;
            for rule in specs {
                match rule.apply(value.clone()) {
                    Ok(accepted) => return Ok(Some(accepted)),
                    Err(reason) => {
                        first_failure.get_or_insert_with(|| rule.fail(field, reason));
                    },
                }
            }
            first_failure.map_or_else(|| Ok(Some(value.clone())), Err)
        },
    }
}

fn validate_absent(rules: &RuleSet, field: &str) -> Result<Option<Value>, FieldError> {
    match rules {
        RuleSet::All(specs) => {
            for rule in specs {
                if rule.required {
                    return Err(rule.fail(field, FailureReason::Required));
                }
                if rule.check_absent {
                    rule.apply(Value::Null).map_err(|reason| rule.fail(field, reason))?;
                }
            }
            Ok(None)
        },
        RuleSet::Any(specs) => match specs.iter().find(|rule| rule.required) {
            Some(rule) => Err(rule.fail(field, FailureReason::Required)),
            None => Ok(None),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn single(rule: RuleSpec) -> RuleSet {
        RuleSet::all([rule])
    }

    #[test]
    fn length_min_rejects_empty_and_accepts_one_char() {
        let rules = single(RuleSpec::any().min(1.0).measure(Measurement::Length));

        let error = validate(Some(&json!("")), &rules, "title").unwrap_err();
        assert_eq!(error.field, "title");
        assert!(matches!(error.reason, FailureReason::BelowMin { min, actual, .. } if min == 1.0 && actual == 0.0));

        assert_eq!(validate(Some(&json!("x")), &rules, "title"), Ok(Some(json!("x"))));
    }

    #[test]
    fn value_max_accepts_ten_rejects_eleven() {
        let rules = single(RuleSpec::number().max(10.0).measure(Measurement::Value));

        assert_eq!(validate(Some(&json!(10)), &rules, "limit"), Ok(Some(json!(10))));
        let error = validate(Some(&json!(11)), &rules, "limit").unwrap_err();
        assert!(matches!(error.reason, FailureReason::AboveMax { .. }));
        assert_eq!(error.rule, "number");
    }

    #[test]
    fn count_measures_object_keys() {
        let rules = single(RuleSpec::object().max(1.0).measure(Measurement::Count));

        assert!(validate(Some(&json!({ "a": 1 })), &rules, "filter").is_ok());
        assert!(validate(Some(&json!({ "a": 1, "b": 2 })), &rules, "filter").is_err());
    }

    #[test]
    fn required_absent_fails_before_later_rules() {
        let rules = RuleSet::all([
            RuleSpec::any().required(),
            RuleSpec::custom("never", |_| Err("should not run".to_string())).check_absent(),
        ]);

        let error = validate(None, &rules, "id").unwrap_err();
        assert_eq!(error.reason, FailureReason::Required);

        let error = validate(Some(&Value::Null), &rules, "id").unwrap_err();
        assert_eq!(error.reason, FailureReason::Required);
    }

    #[test]
    fn optional_absent_skips_rules_unless_marked() {
        let rules = single(RuleSpec::string().min(3.0));
        assert_eq!(validate(None, &rules, "sort"), Ok(None));

        let marked = single(RuleSpec::custom("present", |value| {
            if value.is_null() {
                Err("must be provided by a hook".to_string())
            } else {
                Ok(())
            }
        }).check_absent());
        let error = validate(None, &marked, "token").unwrap_err();
        assert_eq!(error.reason, FailureReason::Custom("must be provided by a hook".to_string()));
    }

    #[test]
    fn first_failure_stops_evaluation() {
        let rules = RuleSet::all([
            RuleSpec::string(),
            RuleSpec::custom("unreachable", |_| Err("ran".to_string())),
        ]);

        let error = validate(Some(&json!(5)), &rules, "name").unwrap_err();
        assert_eq!(error.rule, "string");
        assert_eq!(
            error.reason,
            FailureReason::TypeMismatch {
                expected: "string",
                found: "number"
            }
        );
    }

    #[test]
    fn numeric_strings_coerce_only_on_success() {
        let rules = RuleSet::all([RuleSpec::number(), RuleSpec::any().min(1.0)]);
        assert_eq!(validate(Some(&json!("42")), &rules, "id"), Ok(Some(json!(42))));

        let input = json!("0");
        assert!(validate(Some(&input), &rules, "id").is_err());
        assert_eq!(input, json!("0"));
    }

    #[test]
    fn integer_rejects_fractions() {
        let rules = single(RuleSpec::integer());
        assert_eq!(validate(Some(&json!("7")), &rules, "limit"), Ok(Some(json!(7))));
        assert!(validate(Some(&json!(7.5)), &rules, "limit").is_err());
    }

    #[test]
    fn boolean_accepts_literal_strings() {
        let rules = single(RuleSpec::boolean());
        assert_eq!(validate(Some(&json!("true")), &rules, "flag"), Ok(Some(json!(true))));
        assert!(validate(Some(&json!("yes")), &rules, "flag").is_err());
    }

    #[test]
    fn pattern_rule_matches_strings() {
        let rules = single(RuleSpec::pattern("^(asc|desc)$").unwrap());
        assert!(validate(Some(&json!("desc")), &rules, "sort").is_ok());
        let error = validate(Some(&json!("up")), &rules, "sort").unwrap_err();
        assert_eq!(error.rule, "pattern");
    }

    #[test]
    fn equal_bound_uses_measurement() {
        let rules = single(RuleSpec::array().equal(2.0));
        assert!(validate(Some(&json!([1, 2])), &rules, "pair").is_ok());
        assert!(matches!(
            validate(Some(&json!([1])), &rules, "pair").unwrap_err().reason,
            FailureReason::NotEqual { .. }
        ));
    }

    #[test]
    fn union_passes_when_any_alternative_passes() {
        let rules = RuleSet::any_of([RuleSpec::integer(), RuleSpec::pattern("^[a-z]+$").unwrap()]);

        assert_eq!(validate(Some(&json!("12")), &rules, "key"), Ok(Some(json!(12))));
        assert_eq!(validate(Some(&json!("abc")), &rules, "key"), Ok(Some(json!("abc"))));
        let error = validate(Some(&json!("ABC")), &rules, "key").unwrap_err();
        assert_eq!(error.rule, "integer");
    }

    #[test]
    fn declarations_parse_tags_and_descriptors() {
        let rules = RuleSet::from_declaration(&json!([
            "string",
            { "required": true, "min": 1, "measurement": "length" }
        ]))
        .unwrap();

        assert!(rules.is_required());
        assert_eq!(rules.rules().len(), 2);
        assert!(validate(Some(&json!("")), &rules, "password").is_err());
    }

    #[test]
    fn malformed_declarations_are_rejected() {
        assert!(RuleSpec::from_declaration(&json!("strnig")).is_err());
        assert!(RuleSpec::from_declaration(&json!({ "requried": true })).is_err());
        assert!(RuleSpec::from_declaration(&json!({ "measurement": "weight" })).is_err());
        assert!(RuleSpec::from_declaration(&json!(3)).is_err());
        assert!(RuleSpec::pattern("(").is_err());
    }

    proptest! {
        #[test]
        fn length_bounds_match_char_count(text in "\\PC{0,20}", min in 0u8..10, span in 0u8..10) {
            let min = f64::from(min);
            let max = min + f64::from(span);
            let rules = single(RuleSpec::string().min(min).max(max));
            #[allow(clippy::cast_precision_loss)]
            let len = text.chars().count() as f64;

            let result = validate(Some(&Value::String(text.clone())), &rules, "text");
            prop_assert_eq!(result.is_ok(), len >= min && len <= max);
        }

        #[test]
        fn value_bounds_match_number(n in -1000i64..1000, max in -1000i64..1000) {
            #[allow(clippy::cast_precision_loss)]
            let rules = single(RuleSpec::number().max(max as f64));
            let result = validate(Some(&json!(n)), &rules, "n");
            prop_assert_eq!(result.is_ok(), n <= max);
        }
    }
}
