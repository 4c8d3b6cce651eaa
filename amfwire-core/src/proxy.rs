//! Object proxies.
//!
//! A proxy is the codec's view of a live object: it builds the object's
//! [`ClassDefinition`], reads and writes member values, and lists dynamic
//! members. The [`ProxyRegistry`](crate::registry::ProxyRegistry) selects
//! one proxy per concrete type.

use crate::definition::{ClassDefinition, ClassMember};
use crate::error::CoreError;
use crate::object::AsObject;
use crate::reflect::Reflect;
use crate::value::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Member access strategy for one family of types.
pub trait ObjectProxy: Send + Sync + fmt::Debug {
    fn class_definition(&self, instance: &dyn Reflect) -> Result<Arc<ClassDefinition>, CoreError>;

    /// Whether definitions built by this proxy depend only on the concrete
    /// type and may be cached by class name.
    fn is_cacheable(&self) -> bool {
        true
    }

    fn get_value(&self, instance: &dyn Reflect, member: &ClassMember) -> Result<Value, CoreError>;

    fn set_value(&self, instance: &mut dyn Reflect, member: &str, value: Value) -> Result<(), CoreError>;

    /// Members written after the sealed ones when the definition is dynamic.
    fn dynamic_members(
        &self,
        _instance: &dyn Reflect,
        _definition: &ClassDefinition,
    ) -> Vec<(String, Value)> {
        Vec::new()
    }
}

fn member_not_found(instance: &dyn Reflect, member: &str) -> CoreError {
    CoreError::MemberNotFound {
        class: instance.class_name().to_string(),
        member: member.to_string(),
    }
}

/// Declared, non-transient members, first occurrence of each name wins.
fn declared_members(instance: &dyn Reflect) -> Vec<ClassMember> {
    let mut seen = HashSet::new();
    instance
        .members()
        .into_iter()
        .filter(|info| !info.transient)
        .filter(|info| seen.insert(info.name.clone()))
        .map(|info| ClassMember::new(info.name))
        .collect()
}

/// Proxy for plain [`Reflect`] types.
#[derive(Debug, Default)]
pub struct ReflectProxy;

impl ObjectProxy for ReflectProxy {
    fn class_definition(&self, instance: &dyn Reflect) -> Result<Arc<ClassDefinition>, CoreError> {
        Ok(Arc::new(ClassDefinition::new(
            instance.class_name(),
            declared_members(instance),
            instance.as_externalizable().is_some(),
            false,
        )))
    }

    fn get_value(&self, instance: &dyn Reflect, member: &ClassMember) -> Result<Value, CoreError> {
        instance
            .get_member(member.name())
            .ok_or_else(|| member_not_found(instance, member.name()))
    }

    fn set_value(&self, instance: &mut dyn Reflect, member: &str, value: Value) -> Result<(), CoreError> {
        instance.set_member(member, value)
    }
}

/// Proxy for [`AsObject`].
///
/// Anonymous objects are fully dynamic. Typed objects list their current keys
/// as sealed members. Objects decoded from the wire reuse the definition they
/// arrived with; keys outside it are written as dynamic members when that
/// definition allows it.
#[derive(Debug, Default)]
pub struct AsObjectProxy;

impl AsObjectProxy {
    fn downcast<'a>(&self, instance: &'a dyn Reflect) -> Option<&'a AsObject> {
        instance.as_any().downcast_ref::<AsObject>()
    }
}

impl ObjectProxy for AsObjectProxy {
    fn class_definition(&self, instance: &dyn Reflect) -> Result<Arc<ClassDefinition>, CoreError> {
        let Some(object) = self.downcast(instance) else {
            return ReflectProxy.class_definition(instance);
        };
        if let Some(definition) = object.definition() {
            return Ok(definition.clone());
        }
        if !object.is_typed() {
            return Ok(ClassDefinition::anonymous());
        }
        let members = object.properties().keys().map(ClassMember::new).collect();
        Ok(Arc::new(ClassDefinition::new(
            object.type_name(),
            members,
            false,
            false,
        )))
    }

    fn is_cacheable(&self) -> bool {
        false
    }

    fn get_value(&self, instance: &dyn Reflect, member: &ClassMember) -> Result<Value, CoreError> {
        instance
            .get_member(member.name())
            .ok_or_else(|| member_not_found(instance, member.name()))
    }

    fn set_value(&self, instance: &mut dyn Reflect, member: &str, value: Value) -> Result<(), CoreError> {
        instance.set_member(member, value)
    }

    fn dynamic_members(
        &self,
        instance: &dyn Reflect,
        definition: &ClassDefinition,
    ) -> Vec<(String, Value)> {
        match self.downcast(instance) {
            Some(object) => object
                .properties()
                .iter()
                .filter(|(key, _)| !definition.has_member(key))
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Proxy for externalizable types. Members are never listed; the object
/// writes its own payload.
#[derive(Debug, Default)]
pub struct ExternalizableProxy;

impl ObjectProxy for ExternalizableProxy {
    fn class_definition(&self, instance: &dyn Reflect) -> Result<Arc<ClassDefinition>, CoreError> {
        Ok(Arc::new(ClassDefinition::externalizable(
            instance.class_name(),
        )))
    }

    fn get_value(&self, instance: &dyn Reflect, member: &ClassMember) -> Result<Value, CoreError> {
        Err(member_not_found(instance, member.name()))
    }

    fn set_value(&self, instance: &mut dyn Reflect, member: &str, _value: Value) -> Result<(), CoreError> {
        Err(member_not_found(instance, member))
    }
}

/// Base class name that selects [`ExceptionProxy`].
pub const ERROR_BASE_CLASS: &str = "Error";

/// Proxy for error-shaped types. Adds `message`, `name` and `rootCause`
/// ahead of the declared members, filling them from
/// [`Reflect::as_error`] when the type does not provide them itself.
#[derive(Debug, Default)]
pub struct ExceptionProxy;

impl ExceptionProxy {
    const MESSAGE: &'static str = "message";
    const NAME: &'static str = "name";
    const ROOT_CAUSE: &'static str = "rootCause";
}

impl ObjectProxy for ExceptionProxy {
    fn class_definition(&self, instance: &dyn Reflect) -> Result<Arc<ClassDefinition>, CoreError> {
        let mut members = vec![
            ClassMember::new(Self::MESSAGE),
            ClassMember::new(Self::NAME),
            ClassMember::new(Self::ROOT_CAUSE),
        ];
        for member in declared_members(instance) {
            if !members.contains(&member) {
                members.push(member);
            }
        }
        Ok(Arc::new(ClassDefinition::new(
            instance.class_name(),
            members,
            false,
            false,
        )))
    }

    fn get_value(&self, instance: &dyn Reflect, member: &ClassMember) -> Result<Value, CoreError> {
        if let Some(value) = instance.get_member(member.name()) {
            return Ok(value);
        }
        match member.name() {
            Self::MESSAGE => Ok(instance
                .as_error()
                .map(|e| Value::from(e.to_string()))
                .unwrap_or(Value::Null)),
            Self::NAME => Ok(Value::from(instance.class_name())),
            Self::ROOT_CAUSE => Ok(instance
                .as_error()
                .and_then(|e| e.source())
                .map(|source| {
                    let mut cause = AsObject::new();
                    cause.insert(Self::MESSAGE, source.to_string());
                    Value::object(cause)
                })
                .unwrap_or(Value::Null)),
            other => Err(member_not_found(instance, other)),
        }
    }

    fn set_value(&self, instance: &mut dyn Reflect, member: &str, value: Value) -> Result<(), CoreError> {
        match instance.set_member(member, value) {
            Err(err) if err.is_member_not_found() && [Self::MESSAGE, Self::NAME, Self::ROOT_CAUSE].contains(&member) => {
                Ok(())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::MemberInfo;
    use std::any::Any;

    #[derive(Debug, Default)]
    struct Shape {
        sides: i32,
    }

    impl Reflect for Shape {
        fn class_name(&self) -> &str {
            "geo.Shape"
        }

        fn members(&self) -> Vec<MemberInfo> {
            vec![
                MemberInfo::new("sides"),
                MemberInfo::transient("cache"),
                MemberInfo::new("sides"),
            ]
        }

        fn get_member(&self, name: &str) -> Option<Value> {
            (name == "sides").then(|| Value::Integer(self.sides))
        }

        fn set_member(&mut self, name: &str, value: Value) -> Result<(), CoreError> {
            if name != "sides" {
                return Err(member_not_found(&*self, name));
            }
            self.sides = crate::FromValue::from_value(value)?;
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[derive(Debug)]
    struct Timeout {
        source: std::io::Error,
    }

    impl fmt::Display for Timeout {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "request timed out")
        }
    }

    impl std::error::Error for Timeout {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.source)
        }
    }

    impl Reflect for Timeout {
        fn class_name(&self) -> &str {
            "app.TimeoutError"
        }

        fn ancestors(&self) -> &'static [&'static str] {
            &[ERROR_BASE_CLASS]
        }

        fn members(&self) -> Vec<MemberInfo> {
            vec![MemberInfo::new("message")]
        }

        fn get_member(&self, _name: &str) -> Option<Value> {
            None
        }

        fn set_member(&mut self, name: &str, _value: Value) -> Result<(), CoreError> {
            Err(member_not_found(&*self, name))
        }

        fn as_error(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(self)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_reflect_proxy_skips_transient_and_duplicates() {
        let shape = Shape { sides: 3 };
        let def = ReflectProxy.class_definition(&shape).unwrap();
        let names: Vec<&str> = def.members().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["sides"]);
        assert!(!def.is_dynamic());
        assert!(!def.is_externalizable());

        let value = ReflectProxy.get_value(&shape, &def.members()[0]).unwrap();
        assert_eq!(value, Value::Integer(3));
    }

    #[test]
    fn test_reflect_proxy_missing_member_is_error() {
        let shape = Shape::default();
        let err = ReflectProxy
            .get_value(&shape, &ClassMember::new("colour"))
            .unwrap_err();
        assert!(err.is_member_not_found());
    }

    #[test]
    fn test_as_object_proxy_anonymous_is_dynamic() {
        let mut object = AsObject::new();
        object.insert("a", 1);
        let def = AsObjectProxy.class_definition(&object).unwrap();
        assert!(def.is_dynamic());
        assert_eq!(def.member_count(), 0);

        let dynamic = AsObjectProxy.dynamic_members(&object, &def);
        assert_eq!(dynamic, vec![("a".to_string(), Value::Integer(1))]);
    }

    #[test]
    fn test_as_object_proxy_typed_lists_keys() {
        let mut object = AsObject::typed("org.Point");
        object.insert("x", 1);
        object.insert("y", 2);
        let def = AsObjectProxy.class_definition(&object).unwrap();
        assert_eq!(def.class_name(), "org.Point");
        assert_eq!(def.member_count(), 2);
        assert!(!def.is_dynamic());
        assert!(AsObjectProxy.dynamic_members(&object, &def).is_empty());
        assert!(!AsObjectProxy.is_cacheable());
    }

    #[test]
    fn test_as_object_proxy_reuses_decoded_definition() {
        let def = Arc::new(ClassDefinition::new(
            "org.Item",
            vec![ClassMember::new("id")],
            false,
            true,
        ));
        let mut object = AsObject::with_definition(def.clone());
        object.insert("id", 1);
        object.insert("extra", true);

        let resolved = AsObjectProxy.class_definition(&object).unwrap();
        assert!(Arc::ptr_eq(&resolved, &def));
        let dynamic = AsObjectProxy.dynamic_members(&object, &resolved);
        assert_eq!(dynamic, vec![("extra".to_string(), Value::Boolean(true))]);
    }

    #[test]
    fn test_exception_proxy_fills_error_members() {
        let err = Timeout {
            source: std::io::Error::new(std::io::ErrorKind::TimedOut, "socket idle"),
        };
        let def = ExceptionProxy.class_definition(&err).unwrap();
        let names: Vec<&str> = def.members().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["message", "name", "rootCause"]);

        let message = ExceptionProxy.get_value(&err, &def.members()[0]).unwrap();
        assert_eq!(message, Value::string("request timed out"));
        let name = ExceptionProxy.get_value(&err, &def.members()[1]).unwrap();
        assert_eq!(name, Value::string("app.TimeoutError"));
        let cause = ExceptionProxy.get_value(&err, &def.members()[2]).unwrap();
        assert_eq!(cause.get("message"), Some(Value::string("socket idle")));
    }
}
