//! Terraform schema descriptions.
//!
//! These mirror what the plugin host needs to know about each attribute:
//! its type, whether the practitioner must, may, or cannot set it, and how
//! changes to it are planned.

use std::fmt;
use std::ops::Deref;

use serde::{Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Bool,
    Int,
    ListOfString,
    MapOfString,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: AttributeType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// Changing the value forces the resource to be replaced.
    pub force_new: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub description: &'static str,
}

impl Attribute {
    fn new(name: &'static str, kind: AttributeType) -> Self {
        Self {
            name,
            kind,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            force_new: false,
            default: None,
            description: "",
        }
    }

    pub fn required(name: &'static str, kind: AttributeType) -> Self {
        Self {
            required: true,
            ..Self::new(name, kind)
        }
    }

    pub fn optional(name: &'static str, kind: AttributeType) -> Self {
        Self {
            optional: true,
            ..Self::new(name, kind)
        }
    }

    pub fn computed(name: &'static str, kind: AttributeType) -> Self {
        Self {
            computed: true,
            ..Self::new(name, kind)
        }
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }
}

/// A nested block such as `override { ... }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    pub attributes: Vec<Attribute>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

impl Schema {
    pub fn new(attributes: Vec<Attribute>) -> Self {
        Self {
            attributes,
            blocks: Vec::new(),
        }
    }

    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn block(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.name == name)
    }
}

/// A value from a sensitive attribute.
///
/// Shown as `(sensitive value)` in `Debug` and serialized output, the way
/// Terraform renders sensitive attributes in plans.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Sensitive(String);

impl Sensitive {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Deref for Sensitive {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Sensitive {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Sensitive {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Sensitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(sensitive value)")
    }
}

impl Serialize for Sensitive {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("(sensitive value)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_builders() {
        let attr = Attribute::required("app_id", AttributeType::String).force_new();
        assert!(attr.required && attr.force_new);
        assert!(!attr.optional && !attr.computed && !attr.sensitive);

        let attr = Attribute::optional("path", AttributeType::String).default_value("/");
        assert_eq!(attr.default, Some(Value::from("/")));
    }

    #[test]
    fn test_sensitive_is_hidden() {
        let value = Sensitive::new("hunter2");
        assert_eq!(value.expose(), "hunter2");
        assert_eq!(format!("{value:?}"), "(sensitive value)");
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#""(sensitive value)""#
        );
    }
}
