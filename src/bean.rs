//! The bean capability.
//!
//! A type becomes a bean by implementing [`Bean`]: it names its
//! [`BeanType`], owns a [`BeanCore`] and maps attribute names to its own
//! fields. Everything else (child management, lookup, compound get/set) is
//! provided by the trait.
//!
//! Compound get/set on one instance runs under that instance's lock, so no
//! two of them interleave. Embedded children are read and written through
//! their own compound calls, which makes each bean's view consistent but
//! gives no transaction across a subtree.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};

use crate::attributes::{AttributeParams, AttributeSnapshot};
use crate::bean_type::BeanType;
use crate::descriptor::{Attribute, Operation};
use crate::error::{BeanError, BeanResult};
use crate::value::Value;

/// Per-instance bean state.
pub struct BeanCore {
    children: RwLock<IndexMap<String, Arc<dyn Bean>>>,
    embedded_children: RwLock<IndexMap<String, Arc<dyn Bean>>>,
    is_embedded: AtomicBool,
    monitor: ReentrantMutex<()>,
}

impl Default for BeanCore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BeanCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanCore")
            .field("children", &self.children.read().keys().collect::<Vec<_>>())
            .field(
                "embedded_children",
                &self.embedded_children.read().keys().collect::<Vec<_>>(),
            )
            .field("is_embedded", &self.is_embedded())
            .finish()
    }
}

impl BeanCore {
    pub fn new() -> Self {
        Self {
            children: RwLock::new(IndexMap::new()),
            embedded_children: RwLock::new(IndexMap::new()),
            is_embedded: AtomicBool::new(false),
            monitor: ReentrantMutex::new(()),
        }
    }

    /// Holds the bean lock until the guard is dropped. The lock is
    /// reentrant, so a thread holding it may call back into the bean.
    pub fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.monitor.lock()
    }

    pub fn synchronize<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.monitor.lock();
        f()
    }

    pub fn is_embedded(&self) -> bool {
        self.is_embedded.load(Ordering::Acquire)
    }

    fn add_child(&self, name: &str, child: Arc<dyn Bean>) -> BeanResult<()> {
        let mut children = self.children.write();
        // 埋め込みフラグの確認は子マップのロック下で行う
        if self.is_embedded() {
            return Err(BeanError::ChildOfEmbedded {
                name: name.to_string(),
            });
        }
        let child_core = child.bean_core();
        // mark_embedded と同じ子マップのロックで確認する（自分自身なら取得済み）
        let child_guard =
            (!std::ptr::eq(child_core, self)).then(|| child_core.children.read());
        if child_core.is_embedded() {
            return Err(BeanError::EmbeddedAsChild {
                name: name.to_string(),
            });
        }
        drop(child_guard);
        children.insert(name.to_string(), child);
        Ok(())
    }

    fn mark_embedded(&self, name: &str) -> BeanResult<()> {
        let children = self.children.write();
        if !children.is_empty() {
            return Err(BeanError::EmbeddedHasChildren {
                name: name.to_string(),
                children: children.len(),
            });
        }
        self.is_embedded.store(true, Ordering::Release);
        Ok(())
    }
}

/// Management capability of an object.
///
/// Implementors provide metadata and accessors; the `bean_*` methods are
/// provided and should not normally be overridden.
pub trait Bean: Send + Sync + 'static {
    fn bean_type(&self) -> &BeanType;

    fn bean_core(&self) -> &BeanCore;

    /// Current value of attribute `name`. Returns `None` for names the bean
    /// does not know.
    fn read_attribute(&self, name: &str) -> Option<Value>;

    /// Applies `value` to attribute `name`. Only called for attributes
    /// declared writable.
    fn write_attribute(&self, name: &str, _value: &Value) -> BeanResult<()> {
        Err(BeanError::NotWritable {
            name: name.to_string(),
        })
    }

    /// Dispatches a declared operation to the concrete method. The argument
    /// count has already been checked against the descriptor.
    fn invoke_operation(&self, name: &str, _args: &[Value]) -> BeanResult<Value> {
        Err(BeanError::UnknownOperation {
            name: name.to_string(),
        })
    }

    /// Called once, under the bean lock, after a compound set changed at
    /// least one attribute.
    fn attributes_changed(&self) {}

    fn bean_children(&self) -> Vec<(String, Arc<dyn Bean>)> {
        self.bean_core()
            .children
            .read()
            .iter()
            .map(|(name, bean)| (name.clone(), bean.clone()))
            .collect()
    }

    fn bean_find_child(&self, name: &str) -> Option<Arc<dyn Bean>> {
        self.bean_core().children.read().get(name).cloned()
    }

    fn bean_has_children(&self) -> bool {
        !self.bean_core().children.read().is_empty()
    }

    #[tracing::instrument(skip(self, child), level = "debug")]
    fn bean_add_child(&self, name: &str, child: Arc<dyn Bean>) -> BeanResult<()> {
        self.bean_core().add_child(name, child).inspect_err(|e| {
            tracing::warn!("{}", e);
        })
    }

    fn bean_remove_child(&self, name: &str) -> Option<Arc<dyn Bean>> {
        self.bean_core().children.write().shift_remove(name)
    }

    fn bean_embedded_children(&self) -> Vec<(String, Arc<dyn Bean>)> {
        self.bean_core()
            .embedded_children
            .read()
            .iter()
            .map(|(name, bean)| (name.clone(), bean.clone()))
            .collect()
    }

    #[tracing::instrument(skip(self, embedded), level = "debug")]
    fn bean_add_embedded_child(&self, name: &str, embedded: Arc<dyn Bean>) -> BeanResult<()> {
        embedded.bean_core().mark_embedded(name).inspect_err(|e| {
            tracing::warn!("{}", e);
        })?;
        self.bean_core()
            .embedded_children
            .write()
            .insert(name.to_string(), embedded);
        Ok(())
    }

    fn bean_remove_embedded_child(&self, name: &str) -> Option<Arc<dyn Bean>> {
        self.bean_core()
            .embedded_children
            .write()
            .shift_remove(name)
    }

    fn bean_find_embedded(&self, name: &str) -> Option<Arc<dyn Bean>> {
        self.bean_core().embedded_children.read().get(name).cloned()
    }

    fn bean_is_embedded(&self) -> bool {
        self.bean_core().is_embedded()
    }

    fn bean_find_attribute(&self, name: &str) -> Option<Arc<Attribute>> {
        self.bean_type().find_attribute(name).cloned()
    }

    fn bean_find_operation(&self, name: &str) -> Option<Arc<Operation>> {
        self.bean_type().find_operation(name).cloned()
    }

    fn bean_get_attributes(&self) -> AttributeSnapshot {
        let _guard = self.bean_core().lock();
        read_attributes(self)
    }

    fn bean_set_attributes(&self, params: Option<&AttributeParams>) {
        let _guard = self.bean_core().lock();
        write_attributes(self, params);
    }

    fn bean_get_and_set_attributes(&self, params: Option<&AttributeParams>) -> AttributeSnapshot {
        let _guard = self.bean_core().lock();
        let snapshot = read_attributes(self);
        write_attributes(self, params);
        snapshot
    }

    fn bean_set_and_get_attributes(&self, params: Option<&AttributeParams>) -> AttributeSnapshot {
        let _guard = self.bean_core().lock();
        write_attributes(self, params);
        read_attributes(self)
    }

    /// Invokes operation `name`. Not synchronized; an operation that needs
    /// the bean lock takes it itself.
    fn bean_invoke(&self, name: &str, args: &[Value]) -> BeanResult<Value> {
        let operation = self
            .bean_find_operation(name)
            .ok_or_else(|| BeanError::UnknownOperation {
                name: name.to_string(),
            })?;
        if operation.arguments().len() != args.len() {
            return Err(BeanError::ArgumentCountMismatch {
                name: name.to_string(),
                expected: operation.arguments().len(),
                got: args.len(),
            });
        }
        self.invoke_operation(name, args)
    }
}

// Caller holds the bean lock.
fn read_attributes<B: Bean + ?Sized>(bean: &B) -> AttributeSnapshot {
    let mut snapshot = AttributeSnapshot::new();
    for attribute in bean.bean_type().attributes() {
        if !attribute.is_readable() {
            continue;
        }
        let value = bean.read_attribute(attribute.name()).unwrap_or_default();
        snapshot.insert(attribute.clone(), value);
    }
    for (name, embedded) in bean.bean_embedded_children() {
        snapshot.insert_embedded(&name, embedded.bean_get_attributes());
    }
    snapshot
}

// Caller holds the bean lock.
fn write_attributes<B: Bean + ?Sized>(bean: &B, params: Option<&AttributeParams>) {
    let Some(params) = params.filter(|params| !params.is_empty()) else {
        return;
    };

    let mut changed = false;
    for attribute in bean.bean_type().attributes() {
        if !attribute.is_writable() {
            continue;
        }
        let Some(value) = params.lookup(attribute.name()) else {
            continue;
        };
        match bean.write_attribute(attribute.name(), value) {
            Ok(()) => changed = true,
            Err(e) => tracing::warn!(
                "Rejected value for {}.{}: {}",
                bean.bean_type().name(),
                attribute.name(),
                e
            ),
        }
    }

    for (name, embedded) in bean.bean_embedded_children() {
        let embedded_params = params.embedded(&name);
        embedded.bean_set_attributes(embedded_params.as_ref());
    }

    if changed {
        bean.attributes_changed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ValueType;
    use lazy_static::lazy_static;
    use std::sync::atomic::AtomicUsize;

    lazy_static! {
        static ref KNOB_TYPE: BeanType = BeanType::builder("Knob")
            .accessor("level", ValueType::Integer, "Current level")
            .reader("label", ValueType::String, "Read only label")
            .writer("secret", ValueType::String, "Write only")
            .build()
            .unwrap();
    }

    #[derive(Default)]
    struct Knob {
        core: BeanCore,
        level: RwLock<i64>,
        secret: RwLock<String>,
        changes: AtomicUsize,
    }

    impl Bean for Knob {
        fn bean_type(&self) -> &BeanType {
            &KNOB_TYPE
        }

        fn bean_core(&self) -> &BeanCore {
            &self.core
        }

        fn read_attribute(&self, name: &str) -> Option<Value> {
            match name {
                "level" => Some(Value::Integer(*self.level.read())),
                "label" => Some(Value::from("knob")),
                _ => None,
            }
        }

        fn write_attribute(&self, name: &str, value: &Value) -> BeanResult<()> {
            match name {
                "level" => {
                    *self.level.write() = value
                        .to_i64()
                        .ok_or_else(|| BeanError::invalid_value(name, ValueType::Integer, value))?;
                    Ok(())
                }
                "secret" => {
                    *self.secret.write() = value.to_text().unwrap_or_default();
                    Ok(())
                }
                _ => Err(BeanError::NotWritable {
                    name: name.to_string(),
                }),
            }
        }

        fn attributes_changed(&self) {
            self.changes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_get_skips_write_only() {
        let knob = Knob::default();
        let snapshot = knob.bean_get_attributes();
        assert_eq!(snapshot.get("level"), Some(&Value::Integer(0)));
        assert_eq!(snapshot.get("label"), Some(&Value::from("knob")));
        assert_eq!(snapshot.get("secret"), None);
    }

    #[test]
    fn test_set_applies_writable_only_and_fires_hook_once() {
        let knob = Knob::default();
        let params = AttributeParams::new()
            .with("level", 5)
            .with("secret", "hush")
            .with("label", "ignored")
            .with("unknown", 1);
        knob.bean_set_attributes(Some(&params));

        assert_eq!(*knob.level.read(), 5);
        assert_eq!(*knob.secret.read(), "hush");
        assert_eq!(knob.changes.load(Ordering::SeqCst), 1);
        assert_eq!(
            knob.bean_get_attributes().get("label"),
            Some(&Value::from("knob"))
        );
    }

    #[test]
    fn test_empty_set_is_noop() {
        let knob = Knob::default();
        knob.bean_set_attributes(None);
        knob.bean_set_attributes(Some(&AttributeParams::new()));
        assert_eq!(knob.changes.load(Ordering::SeqCst), 0);
        assert_eq!(*knob.level.read(), 0);
    }

    #[test]
    fn test_rejected_value_is_not_a_change() {
        let knob = Knob::default();
        knob.bean_set_attributes(Some(&AttributeParams::new().with("level", "high")));
        assert_eq!(*knob.level.read(), 0);
        assert_eq!(knob.changes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_get_and_set_returns_pre_write_state() {
        let knob = Knob::default();
        let params = AttributeParams::new().with("level", 9);
        let before = knob.bean_get_and_set_attributes(Some(&params));
        assert_eq!(before.get("level"), Some(&Value::Integer(0)));

        let params = AttributeParams::new().with("level", 10);
        let after = knob.bean_set_and_get_attributes(Some(&params));
        assert_eq!(after.get("level"), Some(&Value::Integer(10)));
    }

    #[test]
    fn test_embedded_children_nest_in_snapshot() {
        let parent = Knob::default();
        let inner = Arc::new(Knob::default());
        parent
            .bean_add_embedded_child("inner", inner.clone())
            .unwrap();
        assert!(inner.bean_is_embedded());

        let params = AttributeParams::from(serde_json::json!({
            "level": 1,
            "inner": { "level": 2 }
        }));
        parent.bean_set_attributes(Some(&params));

        let snapshot = parent.bean_get_attributes();
        assert_eq!(snapshot.get("level"), Some(&Value::Integer(1)));
        assert_eq!(
            snapshot.embedded("inner").unwrap().get("level"),
            Some(&Value::Integer(2))
        );
        assert_eq!(parent.changes.load(Ordering::SeqCst), 1);
        assert_eq!(inner.changes.load(Ordering::SeqCst), 1);
        assert!(parent.bean_find_embedded("inner").is_some());
        assert!(parent.bean_find_embedded("missing").is_none());
    }

    #[test]
    fn test_structural_rules() {
        let parent = Knob::default();
        let embedded = Arc::new(Knob::default());
        parent
            .bean_add_embedded_child("embedded", embedded.clone())
            .unwrap();
        let err = embedded
            .bean_add_child("child", Arc::new(Knob::default()))
            .unwrap_err();
        assert!(matches!(err, BeanError::ChildOfEmbedded { .. }));

        let with_child = Arc::new(Knob::default());
        with_child
            .bean_add_child("child", Arc::new(Knob::default()))
            .unwrap();
        let err = parent
            .bean_add_embedded_child("with_child", with_child)
            .unwrap_err();
        assert_eq!(
            err,
            BeanError::EmbeddedHasChildren {
                name: "with_child".to_string(),
                children: 1,
            }
        );
        assert!(parent.bean_find_embedded("with_child").is_none());
    }

    #[test]
    fn test_embedded_bean_cannot_become_child() {
        let owner = Knob::default();
        let other = Knob::default();
        let embedded = Arc::new(Knob::default());
        owner
            .bean_add_embedded_child("latency", embedded.clone())
            .unwrap();

        let err = other.bean_add_child("latency", embedded).unwrap_err();
        assert_eq!(
            err,
            BeanError::EmbeddedAsChild {
                name: "latency".to_string()
            }
        );
        assert!(other.bean_find_child("latency").is_none());
        assert!(!other.bean_has_children());
    }

    #[test]
    fn test_children_and_embedded_are_separate_namespaces() {
        let parent = Knob::default();
        let child = Arc::new(Knob::default());
        let embedded = Arc::new(Knob::default());
        parent.bean_add_child("same", child.clone()).unwrap();
        parent
            .bean_add_embedded_child("same", embedded.clone())
            .unwrap();

        let found: Arc<dyn Bean> = parent.bean_find_child("same").unwrap();
        assert!(std::ptr::addr_eq(Arc::as_ptr(&found), Arc::as_ptr(&child)));
        assert!(parent.bean_find_embedded("same").is_some());

        assert!(parent.bean_remove_child("same").is_some());
        assert!(parent.bean_remove_child("same").is_none());
        assert!(parent.bean_find_embedded("same").is_some());
        assert!(parent.bean_remove_embedded_child("same").is_some());
    }

    #[test]
    fn test_invoke_checks_declared_operations() {
        let knob = Knob::default();
        let err = knob.bean_invoke("spin", &[]).unwrap_err();
        assert!(matches!(err, BeanError::UnknownOperation { .. }));
    }

    #[test]
    fn test_hook_may_reenter_bean() {
        lazy_static! {
            static ref ECHO_TYPE: BeanType = BeanType::builder("Echo")
                .accessor("value", ValueType::Integer, "Value")
                .build()
                .unwrap();
        }

        #[derive(Default)]
        struct Echo {
            core: BeanCore,
            value: RwLock<i64>,
            seen: RwLock<Option<Value>>,
        }

        impl Bean for Echo {
            fn bean_type(&self) -> &BeanType {
                &ECHO_TYPE
            }
            fn bean_core(&self) -> &BeanCore {
                &self.core
            }
            fn read_attribute(&self, name: &str) -> Option<Value> {
                (name == "value").then(|| Value::Integer(*self.value.read()))
            }
            fn write_attribute(&self, _name: &str, value: &Value) -> BeanResult<()> {
                *self.value.write() = value.to_i64().unwrap_or_default();
                Ok(())
            }
            fn attributes_changed(&self) {
                // 再入可能ロックなので同じスレッドから読める
                let snapshot = self.bean_get_attributes();
                *self.seen.write() = snapshot.get("value").cloned();
            }
        }

        let echo = Echo::default();
        echo.bean_set_attributes(Some(&AttributeParams::new().with("value", 4)));
        assert_eq!(*echo.seen.read(), Some(Value::Integer(4)));
    }
}
