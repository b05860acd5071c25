use dashmap::DashMap;
use lazy_static::lazy_static;
use std::sync::Arc;

use crate::bean_type::BeanType;
use crate::beans::{folder::FOLDER_TYPE, timer::TIMER_TYPE};
use crate::error::{DeclarationError, DeclarationResult};

/// Registration table of bean types by name.
#[derive(Default)]
pub struct TypeRegistry {
    types: Arc<DashMap<String, &'static BeanType>>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in `Folder` and `Timer` types.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_builtin_types();
        registry
    }

    fn register_builtin_types(&self) {
        for bean_type in [&*FOLDER_TYPE, &*TIMER_TYPE] {
            if let Err(error) = self.register(bean_type) {
                tracing::warn!("Built-in bean type registration failed: {}", error);
            }
        }
    }

    pub fn register(&self, bean_type: &'static BeanType) -> DeclarationResult<()> {
        match self.types.entry(bean_type.name().to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(DeclarationError::TypeAlreadyRegistered {
                    type_name: bean_type.name().to_string(),
                })
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                tracing::debug!("Registered bean type {}", bean_type.name());
                entry.insert(bean_type);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&'static BeanType> {
        self.types.get(name).map(|entry| *entry.value())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.types.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Registered types that extend `type_name`, including itself.
    pub fn types_extending(&self, type_name: &str) -> Vec<&'static BeanType> {
        let mut types: Vec<_> = self
            .types
            .iter()
            .filter(|entry| entry.value().is_a(type_name))
            .map(|entry| *entry.value())
            .collect();
        types.sort_by(|a, b| a.name().cmp(b.name()));
        types
    }
}

lazy_static! {
    static ref GLOBAL_TYPES: TypeRegistry = TypeRegistry::with_builtins();
}

/// The process-wide type table.
pub fn types() -> &'static TypeRegistry {
    &GLOBAL_TYPES
}
