//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type, enabling type
//! validation of desired state before any API call is made.

use std::collections::HashMap;
use std::fmt;

use url::Url;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Nested configuration block (a list of attribute maps)
    Block(BlockSchema),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { validate, base, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|message| TypeError::ValidationFailed { message })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Block(block), Value::List(items)) => block.validate(items),

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Block(_) => "Block".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Attribute '{name}' is read-only")]
    ReadOnly { name: String },

    #[error("Block allows at most {max} item(s), got {got}")]
    TooManyItems { max: usize, got: usize },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Can be set by the caller
    pub optional: bool,
    /// Filled in from the API when not set
    pub computed: bool,
    /// Changing the value requires replacing the resource
    pub force_new: bool,
    /// Value must not be displayed
    pub sensitive: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            optional: true,
            computed: false,
            force_new: false,
            sensitive: false,
            default: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self.optional = false;
        self
    }

    /// Mark as computed. Combine with `optional()` to still accept a caller value.
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    fn is_read_only(&self) -> bool {
        !self.required && !self.optional
    }
}

/// Nested block schema
#[derive(Debug, Clone, Default)]
pub struct BlockSchema {
    pub attributes: HashMap<String, AttributeSchema>,
    pub max_items: Option<usize>,
}

impl BlockSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    fn validate(&self, items: &[Value]) -> Result<(), TypeError> {
        if let Some(max) = self.max_items
            && items.len() > max
        {
            return Err(TypeError::TooManyItems {
                max,
                got: items.len(),
            });
        }

        for (index, item) in items.iter().enumerate() {
            let Value::Map(map) = item else {
                return Err(TypeError::ListItemError {
                    index,
                    inner: Box::new(TypeError::TypeMismatch {
                        expected: "Map".to_string(),
                        got: item.type_name(),
                    }),
                });
            };
            if let Some(error) = validate_attributes(&self.attributes, map).into_iter().next() {
                return Err(TypeError::ListItemError {
                    index,
                    inner: Box::new(error),
                });
            }
        }
        Ok(())
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let errors = validate_attributes(&self.attributes, attributes);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Fill in defaults for unset attributes, including inside set blocks
    pub fn apply_defaults(&self, attributes: &mut HashMap<String, Value>) {
        apply_defaults(&self.attributes, attributes);
    }

    /// Names of force-new attributes whose values differ between two attribute maps
    pub fn replacement_attributes(
        &self,
        from: &HashMap<String, Value>,
        to: &HashMap<String, Value>,
    ) -> Vec<String> {
        let mut names: Vec<String> = self
            .attributes
            .values()
            .filter(|schema| schema.force_new)
            .filter(|schema| {
                to.contains_key(&schema.name)
                    && !same_value(&schema.attr_type, from.get(&schema.name), to.get(&schema.name))
            })
            .map(|schema| schema.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn is_sensitive(&self, name: &str) -> bool {
        self.attributes.get(name).is_some_and(|schema| schema.sensitive)
    }
}

fn validate_attributes(
    schemas: &HashMap<String, AttributeSchema>,
    attributes: &HashMap<String, Value>,
) -> Vec<TypeError> {
    let mut errors = Vec::new();

    // Check required attributes
    let mut required: Vec<&String> = schemas
        .values()
        .filter(|s| s.required && s.default.is_none() && !attributes.contains_key(&s.name))
        .map(|s| &s.name)
        .collect();
    required.sort();
    for name in required {
        errors.push(TypeError::MissingRequired { name: name.clone() });
    }

    // Type check each attribute
    let mut names: Vec<&String> = attributes.keys().collect();
    names.sort();
    for name in names {
        // Unknown attributes are allowed (for flexibility)
        let Some(schema) = schemas.get(name) else {
            continue;
        };
        if schema.is_read_only() {
            errors.push(TypeError::ReadOnly { name: name.clone() });
            continue;
        }
        if let Err(e) = schema.attr_type.validate(&attributes[name]) {
            errors.push(TypeError::AttributeError {
                name: name.clone(),
                inner: Box::new(e),
            });
        }
    }

    errors
}

fn apply_defaults(
    schemas: &HashMap<String, AttributeSchema>,
    attributes: &mut HashMap<String, Value>,
) {
    for schema in schemas.values() {
        if let Some(default) = &schema.default
            && !attributes.contains_key(&schema.name)
        {
            attributes.insert(schema.name.clone(), default.clone());
        }

        if let AttributeType::Block(block) = &schema.attr_type
            && let Some(Value::List(items)) = attributes.get_mut(&schema.name)
        {
            for item in items {
                if let Value::Map(map) = item {
                    apply_defaults(&block.attributes, map);
                }
            }
        }
    }
}

/// Compare an observed value with a desired one
///
/// Inside blocks, an unset optional field matches an empty one and an
/// omitted computed field matches anything.
fn same_value(attr_type: &AttributeType, from: Option<&Value>, to: Option<&Value>) -> bool {
    match (attr_type, from, to) {
        (AttributeType::Block(block), Some(Value::List(from)), Some(Value::List(to))) => {
            from.len() == to.len()
                && from.iter().zip(to).all(|pair| match pair {
                    (Value::Map(from), Value::Map(to)) => {
                        block.attributes.values().all(|schema| {
                            let desired = to.get(&schema.name);
                            (schema.computed && is_unset(desired))
                                || same_value(&schema.attr_type, from.get(&schema.name), desired)
                        })
                    }
                    (from, to) => from == to,
                })
        }
        _ => from == to || (is_unset(from) && is_unset(to)),
    }
}

fn is_unset(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::List(items)) => items.is_empty(),
        _ => false,
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Tags type (string-to-string map)
    pub fn tags() -> AttributeType {
        AttributeType::Map(Box::new(AttributeType::String))
    }

    /// Enum type from string literals
    pub fn one_of(values: &[&str]) -> AttributeType {
        AttributeType::Enum(values.iter().map(|v| v.to_string()).collect())
    }

    /// URL with an http or https scheme and a host
    pub fn http_url() -> AttributeType {
        AttributeType::Custom {
            name: "HttpUrl".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) => validate_http_url(s),
                _ => Err("Expected string".to_string()),
            },
        }
    }
}

/// Validate that a string is an http(s) URL with a host
pub fn validate_http_url(input: &str) -> Result<(), String> {
    let url = Url::parse(input).map_err(|e| format!("'{}' is not a valid URL: {}", input, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("'{}' must be a URL with an http or https scheme", input));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(format!("'{}' must contain a host", input));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace_like_schema() -> ResourceSchema {
        ResourceSchema::new("resource")
            .attribute(AttributeSchema::new("name", AttributeType::String).required().force_new())
            .attribute(AttributeSchema::new("enabled", AttributeType::Bool))
            .attribute(AttributeSchema::new("endpoint", AttributeType::String).computed())
            .attribute(
                AttributeSchema::new(
                    "network",
                    AttributeType::Block(
                        BlockSchema::new()
                            .max_items(1)
                            .attribute(
                                AttributeSchema::new("public_ip_enabled", AttributeType::Bool)
                                    .with_default(Value::Bool(false)),
                            )
                            .attribute(
                                AttributeSchema::new("key_id", types::http_url()).required(),
                            ),
                    ),
                ),
            )
    }

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::String("hello".to_string())).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn validate_enum_type() {
        let t = types::one_of(&["Default", "FeatureStore"]);
        assert!(t.validate(&Value::string("Default")).is_ok());
        assert!(t.validate(&Value::string("default")).is_err());
    }

    #[test]
    fn validate_resource_schema() {
        let schema = workspace_like_schema();

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::string("my-resource"));
        attrs.insert("enabled".to_string(), Value::Bool(true));
        attrs.insert(
            "network".to_string(),
            Value::block(HashMap::from([(
                "key_id".to_string(),
                Value::string("https://vault.example.net/keys/k/1"),
            )])),
        );

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let schema = workspace_like_schema();
        let errors = schema.validate(&HashMap::new()).unwrap_err();
        assert!(matches!(&errors[0], TypeError::MissingRequired { name } if name == "name"));
    }

    #[test]
    fn computed_only_attribute_is_read_only() {
        let schema = workspace_like_schema();
        let attrs = HashMap::from([
            ("name".to_string(), Value::string("a")),
            ("endpoint".to_string(), Value::string("https://x")),
        ]);
        let errors = schema.validate(&attrs).unwrap_err();
        assert!(matches!(&errors[0], TypeError::ReadOnly { name } if name == "endpoint"));
    }

    #[test]
    fn block_errors_are_reported() {
        let schema = workspace_like_schema();
        let block = HashMap::from([("key_id".to_string(), Value::string("ftp://x"))]);
        let attrs = HashMap::from([
            ("name".to_string(), Value::string("a")),
            (
                "network".to_string(),
                Value::List(vec![Value::Map(block.clone()), Value::Map(block)]),
            ),
        ]);
        let errors = schema.validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("at most 1"));

        let attrs = HashMap::from([
            ("name".to_string(), Value::string("a")),
            (
                "network".to_string(),
                Value::block(HashMap::from([("key_id".to_string(), Value::string("ftp://x"))])),
            ),
        ]);
        let message = schema.validate(&attrs).unwrap_err()[0].to_string();
        assert!(message.contains("http or https"), "{message}");
    }

    #[test]
    fn defaults_fill_nested_blocks() {
        let schema = workspace_like_schema();
        let mut attrs = HashMap::from([(
            "network".to_string(),
            Value::block(HashMap::from([(
                "key_id".to_string(),
                Value::string("https://vault"),
            )])),
        )]);
        schema.apply_defaults(&mut attrs);

        let Some(Value::List(items)) = attrs.get("network") else {
            panic!("expected block");
        };
        let Value::Map(block) = &items[0] else {
            panic!("expected map");
        };
        assert_eq!(block.get("public_ip_enabled"), Some(&Value::Bool(false)));
    }

    #[test]
    fn replacement_attributes_lists_changed_force_new() {
        let schema = workspace_like_schema();
        let from = HashMap::from([
            ("name".to_string(), Value::string("a")),
            ("enabled".to_string(), Value::Bool(true)),
        ]);
        let to = HashMap::from([
            ("name".to_string(), Value::string("b")),
            ("enabled".to_string(), Value::Bool(false)),
        ]);
        assert_eq!(schema.replacement_attributes(&from, &to), vec!["name"]);
        assert!(schema.replacement_attributes(&from, &from).is_empty());
    }

    #[test]
    fn unset_block_fields_match_empty_ones() {
        let schema = ResourceSchema::new("resource").attribute(
            AttributeSchema::new(
                "encryption",
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(AttributeSchema::new("key_id", AttributeType::String).required())
                        .attribute(AttributeSchema::new("identity_id", AttributeType::String))
                        .attribute(AttributeSchema::new("status", AttributeType::String).computed()),
                ),
            )
            .force_new(),
        );
        let observed = HashMap::from([(
            "encryption".to_string(),
            Value::block(HashMap::from([
                ("key_id".to_string(), Value::string("k1")),
                ("identity_id".to_string(), Value::string("")),
                ("status".to_string(), Value::string("Enabled")),
            ])),
        )]);
        let desired = |key_id: &str| {
            HashMap::from([(
                "encryption".to_string(),
                Value::block(HashMap::from([("key_id".to_string(), Value::string(key_id))])),
            )])
        };

        assert!(schema.replacement_attributes(&observed, &desired("k1")).is_empty());
        assert_eq!(
            schema.replacement_attributes(&observed, &desired("k2")),
            vec!["encryption"]
        );

        let empty = HashMap::from([("encryption".to_string(), Value::List(Vec::new()))]);
        assert!(schema.replacement_attributes(&HashMap::new(), &empty).is_empty());
        assert_eq!(
            schema.replacement_attributes(&empty, &desired("k1")),
            vec!["encryption"]
        );
    }

    #[test]
    fn validate_http_url_values() {
        assert!(validate_http_url("https://vault.example.net/keys/k").is_ok());
        assert!(validate_http_url("http://host").is_ok());
        assert!(validate_http_url("https://").is_err());
        assert!(validate_http_url("vault.example.net").is_err());
        assert!(validate_http_url("http://exa mple.com/").is_err());
        assert!(validate_http_url("ftp://vault.example.net").is_err());
    }
}
