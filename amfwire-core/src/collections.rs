//! Built-in externalizable collection types.

use crate::error::CoreError;
use crate::reflect::{DataInput, DataOutput, Externalizable, MemberInfo, Reflect};
use crate::value::Value;
use std::any::Any;

/// `flex.messaging.io.ArrayCollection`: a list whose external form is a
/// single nested array.
#[derive(Debug, Clone, Default)]
pub struct ArrayCollection {
    items: Vec<Value>,
}

impl ArrayCollection {
    pub const CLASS_NAME: &'static str = "flex.messaging.io.ArrayCollection";

    pub fn new(items: Vec<Value>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut Vec<Value> {
        &mut self.items
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Reflect for ArrayCollection {
    fn class_name(&self) -> &str {
        Self::CLASS_NAME
    }

    fn members(&self) -> Vec<MemberInfo> {
        vec![MemberInfo::new("source")]
    }

    fn get_member(&self, name: &str) -> Option<Value> {
        (name == "source").then(|| Value::array(self.items.clone()))
    }

    fn set_member(&mut self, name: &str, value: Value) -> Result<(), CoreError> {
        if name != "source" {
            return Err(CoreError::MemberNotFound {
                class: Self::CLASS_NAME.to_string(),
                member: name.to_string(),
            });
        }
        self.items = match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items.read().clone(),
            other => {
                return Err(CoreError::InvalidMemberValue {
                    class: Self::CLASS_NAME.to_string(),
                    member: name.to_string(),
                    reason: format!("expected array, found {}", other.kind()),
                })
            }
        };
        Ok(())
    }

    fn as_externalizable(&self) -> Option<&dyn Externalizable> {
        Some(self)
    }

    fn as_externalizable_mut(&mut self) -> Option<&mut dyn Externalizable> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Externalizable for ArrayCollection {
    fn read_external(&mut self, input: &mut dyn DataInput) -> Result<(), CoreError> {
        let source = input.read_object()?;
        self.set_member("source", source)
    }

    fn write_external(&self, output: &mut dyn DataOutput) -> Result<(), CoreError> {
        output.write_object(&Value::array(self.items.clone()))
    }
}
