//! The bean tree: a root folder bean and path resolution over child maps.

use std::sync::Arc;

use lazy_static::lazy_static;

use crate::bean::Bean;
use crate::beans::Folder;
use crate::config::RumxConfig;
use crate::descriptor::{Attribute, Operation};

pub struct BeanTree {
    root: Arc<dyn Bean>,
    config: RumxConfig,
}

impl Default for BeanTree {
    fn default() -> Self {
        Self::new()
    }
}

impl BeanTree {
    pub fn new() -> Self {
        Self::with_config(&RumxConfig::default())
    }

    pub fn with_config(config: &RumxConfig) -> Self {
        Self {
            root: Arc::new(Folder::new()),
            config: config.clone(),
        }
    }

    pub fn root(&self) -> &Arc<dyn Bean> {
        &self.root
    }

    pub fn config(&self) -> &RumxConfig {
        &self.config
    }

    /// Resolves `path` through the child maps. An empty path is the root.
    #[tracing::instrument(skip(self, path), level = "debug")]
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<Arc<dyn Bean>> {
        let mut bean = self.root.clone();
        for name in path {
            bean = bean.bean_find_child(name.as_ref())?;
        }
        if self.config.trace_attribute_access {
            tracing::debug!("Resolved bean {}", self.join(path));
        }
        Some(bean)
    }

    /// The last segment names the attribute, the rest the bean.
    pub fn find_attribute<S: AsRef<str>>(
        &self,
        path: &[S],
    ) -> Option<(Arc<dyn Bean>, Arc<Attribute>)> {
        let (name, bean_path) = path.split_last()?;
        let bean = self.find(bean_path)?;
        let attribute = bean.bean_find_attribute(name.as_ref())?;
        Some((bean, attribute))
    }

    pub fn find_operation<S: AsRef<str>>(
        &self,
        path: &[S],
    ) -> Option<(Arc<dyn Bean>, Arc<Operation>)> {
        let (name, bean_path) = path.split_last()?;
        let bean = self.find(bean_path)?;
        let operation = bean.bean_find_operation(name.as_ref())?;
        Some((bean, operation))
    }

    /// Splits a text path on the configured separator. Empty segments are
    /// dropped, so leading and doubled separators are harmless.
    pub fn parse_path<'a>(&self, path: &'a str) -> Vec<&'a str> {
        path.split(self.config.path_separator.as_str())
            .filter(|segment| !segment.is_empty())
            .collect()
    }

    pub fn find_path(&self, path: &str) -> Option<Arc<dyn Bean>> {
        self.find(&self.parse_path(path))
    }

    pub fn find_attribute_path(&self, path: &str) -> Option<(Arc<dyn Bean>, Arc<Attribute>)> {
        self.find_attribute(&self.parse_path(path))
    }

    pub fn find_operation_path(&self, path: &str) -> Option<(Arc<dyn Bean>, Arc<Operation>)> {
        self.find_operation(&self.parse_path(path))
    }

    fn join<S: AsRef<str>>(&self, path: &[S]) -> String {
        path.iter()
            .map(|segment| segment.as_ref())
            .collect::<Vec<_>>()
            .join(self.config.path_separator.as_str())
    }
}

lazy_static! {
    static ref GLOBAL_TREE: BeanTree = BeanTree::new();
}

/// The process-wide tree, created on first use.
pub fn global() -> &'static BeanTree {
    &GLOBAL_TREE
}

/// Root bean of the process-wide tree.
pub fn root() -> Arc<dyn Bean> {
    GLOBAL_TREE.root().clone()
}

pub fn find<S: AsRef<str>>(path: &[S]) -> Option<Arc<dyn Bean>> {
    GLOBAL_TREE.find(path)
}

pub fn find_attribute<S: AsRef<str>>(path: &[S]) -> Option<(Arc<dyn Bean>, Arc<Attribute>)> {
    GLOBAL_TREE.find_attribute(path)
}

pub fn find_operation<S: AsRef<str>>(path: &[S]) -> Option<(Arc<dyn Bean>, Arc<Operation>)> {
    GLOBAL_TREE.find_operation(path)
}
