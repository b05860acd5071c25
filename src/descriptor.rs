//! Attribute, operation and argument descriptors.
//!
//! Descriptors are plain metadata. They are created once while a bean type is
//! declared and never change afterwards; values always come from the bean
//! instance through its accessors.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{DeclarationError, DeclarationResult};

/// Descriptive type tag for attributes, arguments and return values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Integer,
    Float,
    String,
    Boolean,
    Void,
    Map,
    Bean,
    List(Box<ValueType>),
}

impl ValueType {
    pub fn list_of(element: ValueType) -> Self {
        ValueType::List(Box::new(element))
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Integer => write!(f, "integer"),
            ValueType::Float => write!(f, "float"),
            ValueType::String => write!(f, "string"),
            ValueType::Boolean => write!(f, "boolean"),
            ValueType::Void => write!(f, "void"),
            ValueType::Map => write!(f, "map"),
            ValueType::Bean => write!(f, "bean"),
            ValueType::List(element) => write!(f, "list<{}>", element),
        }
    }
}

impl FromStr for ValueType {
    type Err = DeclarationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        let unknown = || DeclarationError::UnknownValueType {
            tag: s.to_string(),
        };
        if let Some(inner) = tag.strip_prefix("list<") {
            let inner = inner.strip_suffix('>').ok_or_else(unknown)?;
            return Ok(ValueType::list_of(inner.parse()?));
        }
        match tag {
            "integer" | "int" => Ok(ValueType::Integer),
            "float" => Ok(ValueType::Float),
            "string" => Ok(ValueType::String),
            "boolean" | "bool" => Ok(ValueType::Boolean),
            "void" => Ok(ValueType::Void),
            "map" | "hash" => Ok(ValueType::Map),
            "bean" => Ok(ValueType::Bean),
            _ => Err(unknown()),
        }
    }
}

impl Serialize for ValueType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Access permission of an attribute. There is no "neither" variant, an
/// attribute is always readable, writable or both.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Access {
    pub fn readable(self) -> bool {
        matches!(self, Access::ReadOnly | Access::ReadWrite)
    }

    pub fn writable(self) -> bool {
        matches!(self, Access::WriteOnly | Access::ReadWrite)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    name: String,
    #[serde(rename = "type")]
    value_type: ValueType,
    description: String,
    access: Access,
}

impl Attribute {
    pub fn new(name: &str, value_type: ValueType, description: &str, access: Access) -> Self {
        Self {
            name: name.to_string(),
            value_type,
            description: description.to_string(),
            access,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn is_readable(&self) -> bool {
        self.access.readable()
    }

    pub fn is_writable(&self) -> bool {
        self.access.writable()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Argument {
    name: String,
    #[serde(rename = "type")]
    value_type: ValueType,
    description: String,
}

impl Argument {
    pub fn new(name: &str, value_type: ValueType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            value_type,
            description: description.to_string(),
        }
    }

    /// Builds an argument from a `[name, type, description]` triple, the
    /// shape used by `BeanTypeBuilder::operation`.
    pub fn from_spec(operation: &str, index: usize, spec: &[&str]) -> DeclarationResult<Self> {
        let malformed = |message: String| DeclarationError::MalformedArgument {
            operation: operation.to_string(),
            index,
            message,
        };
        let [name, tag, description] = spec else {
            return Err(malformed(format!(
                "expected [name, type, description], got {} entries",
                spec.len()
            )));
        };
        if name.trim().is_empty() {
            return Err(malformed("argument name is empty".to_string()));
        }
        let value_type = tag
            .parse::<ValueType>()
            .map_err(|e| malformed(e.to_string()))?;
        Ok(Self::new(name, value_type, description))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    name: String,
    return_type: ValueType,
    description: String,
    arguments: Vec<Argument>,
}

impl Operation {
    pub fn new(
        name: &str,
        return_type: ValueType,
        description: &str,
        arguments: Vec<Argument>,
    ) -> DeclarationResult<Self> {
        let mut seen = HashSet::new();
        for argument in &arguments {
            if !seen.insert(argument.name()) {
                return Err(DeclarationError::DuplicateArgument {
                    operation: name.to_string(),
                    argument: argument.name().to_string(),
                });
            }
        }
        Ok(Self {
            name: name.to_string(),
            return_type,
            description: description.to_string(),
            arguments,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> &ValueType {
        &self.return_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn find_argument(&self, name: &str) -> Option<&Argument> {
        self.arguments.iter().find(|argument| argument.name() == name)
    }
}
