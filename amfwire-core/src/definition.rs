//! Class definitions.
//!
//! A class definition is the wire-level shape of an object: its class name
//! (empty for anonymous objects), the ordered list of sealed members, and the
//! externalizable and dynamic flags. Definitions are immutable once built and
//! are shared through `Arc`.

use std::sync::{Arc, OnceLock};

/// A sealed member of a class definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassMember {
    name: String,
}

impl ClassMember {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&str> for ClassMember {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ClassMember {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Wire-level description of a class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassDefinition {
    class_name: String,
    members: Vec<ClassMember>,
    externalizable: bool,
    dynamic: bool,
}

impl ClassDefinition {
    pub fn new(
        class_name: impl Into<String>,
        members: Vec<ClassMember>,
        externalizable: bool,
        dynamic: bool,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            members,
            externalizable,
            dynamic,
        }
    }

    /// Definition of an externalizable class; members are never listed.
    pub fn externalizable(class_name: impl Into<String>) -> Self {
        Self::new(class_name, Vec::new(), true, false)
    }

    /// Shared definition for anonymous dynamic objects.
    pub fn anonymous() -> Arc<ClassDefinition> {
        static ANONYMOUS: OnceLock<Arc<ClassDefinition>> = OnceLock::new();
        ANONYMOUS
            .get_or_init(|| Arc::new(ClassDefinition::new("", Vec::new(), false, true)))
            .clone()
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn members(&self) -> &[ClassMember] {
        &self.members
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.members.iter().any(|m| m.name() == name)
    }

    pub fn is_externalizable(&self) -> bool {
        self.externalizable
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Returns false for anonymous definitions.
    pub fn is_typed(&self) -> bool {
        !self.class_name.is_empty()
    }
}
