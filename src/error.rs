use thiserror::Error;

/// Failures raised while wiring or using a bean instance.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BeanError {
    #[error("Error trying to add {name} to embedded bean")]
    ChildOfEmbedded { name: String },
    #[error("Error trying to add embedded bean {name} as a child")]
    EmbeddedAsChild { name: String },
    #[error("Error trying to add bean {name} as embedded, it already has {children} children")]
    EmbeddedHasChildren { name: String, children: usize },
    #[error("Attribute is not writable: {name}")]
    NotWritable { name: String },
    #[error("Invalid value for attribute {name}: expected {expected}, got {got}")]
    InvalidValue {
        name: String,
        expected: String,
        got: String,
    },
    #[error("Operation not found: {name}")]
    UnknownOperation { name: String },
    #[error("Operation {name} expects {expected} arguments, got {got}")]
    ArgumentCountMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
}

impl BeanError {
    pub fn invalid_value(name: &str, expected: impl ToString, got: impl std::fmt::Debug) -> Self {
        BeanError::InvalidValue {
            name: name.to_string(),
            expected: expected.to_string(),
            got: format!("{:?}", got),
        }
    }
}

pub type BeanResult<T> = Result<T, BeanError>;

/// Failures raised while declaring a bean type. These happen before any
/// instance exists.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeclarationError {
    #[error("Invalid bean_operation format for {operation}, argument #{index}: {message}")]
    MalformedArgument {
        operation: String,
        index: usize,
        message: String,
    },
    #[error("Duplicate argument {argument} in operation {operation}")]
    DuplicateArgument { operation: String, argument: String },
    #[error("Duplicate attribute {attribute} declared on {type_name}")]
    DuplicateAttribute {
        type_name: String,
        attribute: String,
    },
    #[error("Duplicate operation {operation} declared on {type_name}")]
    DuplicateOperation {
        type_name: String,
        operation: String,
    },
    #[error("Unknown value type: {tag}")]
    UnknownValueType { tag: String },
    #[error("Bean type already registered: {type_name}")]
    TypeAlreadyRegistered { type_name: String },
}

pub type DeclarationResult<T> = Result<T, DeclarationError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Bean error: {0}")]
    Bean(#[from] BeanError),
    #[error("Declaration error: {0}")]
    Declaration(#[from] DeclarationError),
    #[error("Config error: {0}")]
    Config(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config(message.into())
    }
}
