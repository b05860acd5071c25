//! # rumx: runtime management beans
//!
//! rumx lets application code expose live counters, configuration knobs and
//! control operations to a management front-end (console, HTTP endpoint, ...)
//! without hand-rolling serialization or dispatch.
//!
//! ## Building blocks
//!
//! - Descriptors ([`descriptor`]): attributes, operations and their
//!   arguments, with descriptive type tags.
//! - Bean types ([`bean_type`]): per-type descriptor lists, aggregated across
//!   the types a bean type extends.
//! - The bean capability ([`bean`]): child and embedded-child management,
//!   lookup, and compound get/set that is atomic per bean instance.
//! - The bean tree ([`tree`]): a root folder and path resolution.
//! - Built-in beans ([`beans`]): `Folder` and the statistics `Timer`.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use rumx::{Bean, BeanTree, Value, beans::{Folder, Timer}};
//!
//! let tree = BeanTree::new();
//! let folder = Arc::new(Folder::new());
//! let timer = Arc::new(Timer::new());
//! tree.root().bean_add_child("MyFolder", folder.clone()).unwrap();
//! folder.bean_add_child("MyTimer", timer.clone()).unwrap();
//!
//! timer.measure(|| (0..1000).sum::<u64>());
//!
//! let (bean, attribute) = tree.find_attribute(&["MyFolder", "MyTimer", "count"]).unwrap();
//! assert_eq!(attribute.name(), "count");
//! assert_eq!(bean.bean_get_attributes().get("count"), Some(&Value::Integer(1)));
//! ```

pub mod attributes;
pub mod bean;
pub mod bean_type;
pub mod beans;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod tree;
pub mod type_registry;
pub mod value;

// Re-exports
pub use attributes::{AttributeParams, AttributeSnapshot, ParamKey};
pub use bean::{Bean, BeanCore};
pub use bean_type::{BeanType, BeanTypeBuilder, TypeLayer};
pub use config::{RumxConfig, TimerConfig};
pub use descriptor::{Access, Argument, Attribute, Operation, ValueType};
pub use error::*;
pub use tree::{find, find_attribute, find_operation, root, BeanTree};
pub use type_registry::TypeRegistry;
pub use value::{BeanRef, Value};
