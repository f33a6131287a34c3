//! Resource - Representing desired configuration and observed state

use std::collections::HashMap;

use crate::timeouts::TimeoutOverrides;

/// JSON input that has no `Value` counterpart
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JsonValueError {
    #[error("number {0} is not a 64-bit integer")]
    NotAnInteger(String),

    #[error("list item {0} is null")]
    NullListItem(usize),
}

/// Attribute value of a resource
///
/// Nested configuration blocks are represented as a `List` of `Map`s.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// A single nested block (a one-element list holding a map)
    pub fn block(attributes: HashMap<String, Value>) -> Self {
        Value::List(vec![Value::Map(attributes)])
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert a JSON value
    ///
    /// `null` has no counterpart: it yields `None` at the top level and
    /// unsets map entries, but is rejected inside lists.
    pub fn from_json(value: &serde_json::Value) -> Result<Option<Value>, JsonValueError> {
        let converted = match value {
            serde_json::Value::Null => return Ok(None),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => return Err(JsonValueError::NotAnInteger(n.to_string())),
            },
            serde_json::Value::Array(arr) => {
                let mut items = Vec::with_capacity(arr.len());
                for (index, item) in arr.iter().enumerate() {
                    match Value::from_json(item)? {
                        Some(item) => items.push(item),
                        None => return Err(JsonValueError::NullListItem(index)),
                    }
                }
                Value::List(items)
            }
            serde_json::Value::Object(obj) => {
                let mut map = HashMap::with_capacity(obj.len());
                for (key, item) in obj {
                    if let Some(item) = Value::from_json(item)? {
                        map.insert(key.clone(), item);
                    }
                }
                Value::Map(map)
            }
        };
        Ok(Some(converted))
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

/// Read-only view over an attribute map
pub struct Attributes<'a>(pub &'a HashMap<String, Value>);

impl<'a> Attributes<'a> {
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.0.get(key)
    }

    /// Get a string attribute, treating the empty string as unset
    pub fn get_string(&self, key: &str) -> Option<&'a str> {
        match self.0.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    /// Get the first element of a nested block list
    pub fn get_block(&self, key: &str) -> Option<Attributes<'a>> {
        match self.0.get(key) {
            Some(Value::List(items)) => match items.first() {
                Some(Value::Map(map)) => Some(Attributes(map)),
                _ => None,
            },
            Some(Value::Map(map)) => Some(Attributes(map)),
            _ => None,
        }
    }

    /// Get a list of strings, skipping non-string items
    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::List(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Get a map of string values, skipping non-string values
    pub fn get_string_map(&self, key: &str) -> HashMap<String, String> {
        match self.0.get(key) {
            Some(Value::Map(map)) => map
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect(),
            _ => HashMap::new(),
        }
    }
}

/// Desired state declared by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Resource type (e.g., "azurerm_relay_namespace")
    pub resource_type: String,
    pub attributes: HashMap<String, Value>,
    /// Caller-supplied timeouts overriding the resource type defaults
    pub timeouts: TimeoutOverrides,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            timeouts: TimeoutOverrides::default(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutOverrides) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn attrs(&self) -> Attributes<'_> {
        Attributes(&self.attributes)
    }
}

/// Current state fetched from the remote API
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub resource_type: String,
    /// Canonical resource ID string
    pub id: Option<String>,
    pub attributes: HashMap<String, Value>,
    /// Whether this state exists
    pub exists: bool,
}

impl State {
    pub fn not_found(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: None,
            attributes: HashMap::new(),
            exists: false,
        }
    }

    pub fn existing(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        attributes: HashMap<String, Value>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: Some(id.into()),
            attributes,
            exists: true,
        }
    }

    pub fn attrs(&self) -> Attributes<'_> {
        Attributes(&self.attributes)
    }
}
