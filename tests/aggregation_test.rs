mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;
use pretty_assertions::assert_eq;
use rumx::{
    beans::Timer, AttributeParams, Bean, BeanCore, BeanError, BeanResult, BeanType, ParamKey,
    Value, ValueType,
};

lazy_static! {
    static ref SETTINGS_TYPE: BeanType = BeanType::builder("Settings")
        .accessor("a", ValueType::Integer, "Declared on the base type")
        .reader("version", ValueType::String, "Version of the base type")
        .build()
        .unwrap();
    static ref SERVICE_SETTINGS_TYPE: BeanType = BeanType::builder("ServiceSettings")
        .extend(&SETTINGS_TYPE)
        .accessor("b", ValueType::String, "Declared on the derived type")
        .reader("version", ValueType::String, "Version of the derived type")
        .operation("restart", ValueType::Boolean, "Restart the service", &[])
        .build()
        .unwrap();
}

#[derive(Default)]
struct Settings {
    core: BeanCore,
    a: RwLock<i64>,
}

impl Settings {
    fn read(&self, name: &str) -> Option<Value> {
        match name {
            "a" => Some(Value::Integer(*self.a.read())),
            "version" => Some(Value::from("base")),
            _ => None,
        }
    }

    fn write(&self, name: &str, value: &Value) -> BeanResult<()> {
        match name {
            "a" => {
                *self.a.write() = value
                    .to_i64()
                    .ok_or_else(|| BeanError::invalid_value(name, ValueType::Integer, value))?;
                Ok(())
            }
            _ => Err(BeanError::NotWritable {
                name: name.to_string(),
            }),
        }
    }
}

impl Bean for Settings {
    fn bean_type(&self) -> &BeanType {
        &SETTINGS_TYPE
    }

    fn bean_core(&self) -> &BeanCore {
        &self.core
    }

    fn read_attribute(&self, name: &str) -> Option<Value> {
        self.read(name)
    }

    fn write_attribute(&self, name: &str, value: &Value) -> BeanResult<()> {
        self.write(name, value)
    }
}

/// Extends `Settings` by composition: its own names first, everything else
/// delegated to the base.
#[derive(Default)]
struct ServiceSettings {
    base: Settings,
    b: RwLock<String>,
    changes: AtomicUsize,
}

impl Bean for ServiceSettings {
    fn bean_type(&self) -> &BeanType {
        &SERVICE_SETTINGS_TYPE
    }

    fn bean_core(&self) -> &BeanCore {
        &self.base.core
    }

    fn read_attribute(&self, name: &str) -> Option<Value> {
        match name {
            "b" => Some(Value::from(self.b.read().clone())),
            "version" => Some(Value::from("derived")),
            _ => self.base.read(name),
        }
    }

    fn write_attribute(&self, name: &str, value: &Value) -> BeanResult<()> {
        match name {
            "b" => {
                *self.b.write() = value.to_text().unwrap_or_default();
                Ok(())
            }
            _ => self.base.write(name, value),
        }
    }

    fn invoke_operation(&self, name: &str, _args: &[Value]) -> BeanResult<Value> {
        match name {
            "restart" => Ok(Value::Boolean(true)),
            _ => Err(BeanError::UnknownOperation {
                name: name.to_string(),
            }),
        }
    }

    fn attributes_changed(&self) {
        self.changes.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_derived_bean_exposes_both_layers() {
    let bean = ServiceSettings::default();
    let snapshot = bean.bean_get_attributes();

    let names: Vec<_> = snapshot.iter().map(|(attribute, _)| attribute.name()).collect();
    assert_eq!(names, vec!["a", "version", "b", "version"]);
    assert_eq!(snapshot.get("a"), Some(&Value::Integer(0)));
    assert_eq!(snapshot.get("b"), Some(&Value::from("")));
}

#[test]
fn test_accessor_binds_to_concrete_instance() {
    let bean = ServiceSettings::default();
    let snapshot = bean.bean_get_attributes();
    // 両方の宣言とも具象インスタンスのアクセサを通る
    for (attribute, value) in snapshot.iter() {
        if attribute.name() == "version" {
            assert_eq!(value, &Value::from("derived"));
        }
    }
    assert_eq!(
        snapshot.to_json(),
        serde_json::json!({ "a": 0, "version": "derived", "b": "" })
    );
}

#[test]
fn test_set_reaches_both_layers_with_one_hook_call() {
    let bean = ServiceSettings::default();
    let params = AttributeParams::new()
        .with_ident("a", 7)
        .with(ParamKey::Name("a".to_string()), 8)
        .with("b", "on");
    bean.bean_set_attributes(Some(&params));

    assert_eq!(*bean.base.a.read(), 7);
    assert_eq!(*bean.b.read(), "on");
    assert_eq!(bean.changes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_inherited_operation() {
    let bean = ServiceSettings::default();
    assert!(bean.bean_find_operation("restart").is_some());
    assert_eq!(bean.bean_invoke("restart", &[]).unwrap(), Value::Boolean(true));

    let base = Settings::default();
    assert!(base.bean_find_operation("restart").is_none());
}

#[test]
fn test_embedded_timer_flattens_into_parent() {
    let bean = ServiceSettings::default();
    let timer = Arc::new(Timer::new());
    bean.bean_add_embedded_child("latency", timer.clone())
        .unwrap();
    timer.record(4.0);

    let snapshot = bean.bean_get_attributes();
    let latency = snapshot.embedded("latency").unwrap();
    assert_eq!(latency.get("count"), Some(&Value::Integer(1)));

    bean.bean_set_attributes(Some(&AttributeParams::from(serde_json::json!({
        "latency": { "reset": true }
    }))));
    assert_eq!(timer.count(), 0);
    assert_eq!(timer.total_count(), 1);
    // 埋め込み子の変更だけでは親のフックは呼ばれない
    assert_eq!(bean.changes.load(Ordering::SeqCst), 0);

    assert!(timer.bean_add_child("x", Arc::new(Timer::new())).is_err());
}
