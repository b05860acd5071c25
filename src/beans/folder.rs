use lazy_static::lazy_static;

use crate::bean::{Bean, BeanCore};
use crate::bean_type::BeanType;
use crate::value::Value;

lazy_static! {
    pub static ref FOLDER_TYPE: BeanType = BeanType::builder("Folder")
        .build()
        .expect("Folder bean type declaration");
}

/// A bean without attributes that only groups children.
#[derive(Debug, Default)]
pub struct Folder {
    core: BeanCore,
}

impl Folder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Bean for Folder {
    fn bean_type(&self) -> &BeanType {
        &FOLDER_TYPE
    }

    fn bean_core(&self) -> &BeanCore {
        &self.core
    }

    fn read_attribute(&self, _name: &str) -> Option<Value> {
        None
    }
}
