//! Proxy selection, class factories and the class-definition cache.

use crate::collections::ArrayCollection;
use crate::cow::CowMap;
use crate::definition::ClassDefinition;
use crate::error::CoreError;
use crate::object::AsObject;
use crate::proxy::{
    AsObjectProxy, ExceptionProxy, ExternalizableProxy, ObjectProxy, ReflectProxy,
    ERROR_BASE_CLASS,
};
use crate::reflect::Reflect;
use crate::value::TypedRef;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::any::TypeId;
use std::sync::Arc;
use tracing::debug;

/// Selects the [`ObjectProxy`] for a live object.
///
/// Lookup order: externalizable types get the externalizable proxy, then an
/// exact registration for the concrete type, then the first registered base
/// class found in [`Reflect::ancestors`], then the reflective default. The
/// selection is cached per concrete type.
#[derive(Debug)]
pub struct ProxyRegistry {
    by_type: CowMap<TypeId, Arc<dyn ObjectProxy>>,
    by_base: RwLock<Vec<(String, Arc<dyn ObjectProxy>)>>,
    selected: CowMap<TypeId, Arc<dyn ObjectProxy>>,
    externalizable: Arc<dyn ObjectProxy>,
    default: Arc<dyn ObjectProxy>,
}

impl Default for ProxyRegistry {
    fn default() -> Self {
        let registry = Self::empty();
        registry.register::<AsObject>(Arc::new(AsObjectProxy));
        registry.register_base(ERROR_BASE_CLASS, Arc::new(ExceptionProxy));
        registry
    }
}

impl ProxyRegistry {
    /// Registry with the built-in registrations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with no registrations beyond the externalizable and default
    /// proxies.
    pub fn empty() -> Self {
        Self {
            by_type: CowMap::new(),
            by_base: RwLock::new(Vec::new()),
            selected: CowMap::new(),
            externalizable: Arc::new(ExternalizableProxy),
            default: Arc::new(ReflectProxy),
        }
    }

    pub fn register<T: Reflect>(&self, proxy: Arc<dyn ObjectProxy>) {
        self.by_type.insert(TypeId::of::<T>(), proxy);
        self.selected.clear();
    }

    pub fn register_base(&self, base: impl Into<String>, proxy: Arc<dyn ObjectProxy>) {
        self.by_base.write().push((base.into(), proxy));
        self.selected.clear();
    }

    pub fn proxy_for(&self, instance: &dyn Reflect) -> Arc<dyn ObjectProxy> {
        let type_id = instance.as_any().type_id();
        self.selected
            .get_or_insert_with(type_id, || self.select(type_id, instance))
    }

    fn select(&self, type_id: TypeId, instance: &dyn Reflect) -> Arc<dyn ObjectProxy> {
        if instance.as_externalizable().is_some() {
            return self.externalizable.clone();
        }
        if let Some(proxy) = self.by_type.get(&type_id) {
            return proxy;
        }
        let bases = self.by_base.read();
        for ancestor in instance.ancestors() {
            if let Some((_, proxy)) = bases.iter().find(|(base, _)| base == ancestor) {
                return proxy.clone();
            }
        }
        self.default.clone()
    }

    /// Drops cached selections; registrations are kept.
    pub fn clear_selections(&self) {
        self.selected.clear();
    }
}

pub type Factory = Arc<dyn Fn() -> TypedRef + Send + Sync>;

/// Maps remote class names to constructors.
#[derive(Default)]
pub struct TypeRegistry {
    factories: DashMap<String, Factory>,
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.factories.len())
            .finish()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `class_name`, built with `T::default()`.
    pub fn register<T: Reflect + Default>(&self, class_name: impl Into<String>) {
        self.register_with(class_name, || {
            let node: TypedRef = Arc::new(RwLock::new(T::default()));
            node
        });
    }

    pub fn register_with<F>(&self, class_name: impl Into<String>, factory: F)
    where
        F: Fn() -> TypedRef + Send + Sync + 'static,
    {
        let class_name = class_name.into();
        debug!("registered remote class {}", class_name);
        self.factories.insert(class_name, Arc::new(factory));
    }

    pub fn unregister(&self, class_name: &str) -> bool {
        self.factories.remove(class_name).is_some()
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.factories.contains_key(class_name)
    }

    /// Instantiates the type registered for `class_name`.
    pub fn create(&self, class_name: &str) -> Option<TypedRef> {
        let factory = self.factories.get(class_name)?.value().clone();
        Some(factory())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Shared object-model state: proxies, class factories and the
/// process-wide class-definition cache keyed by class name.
#[derive(Debug)]
pub struct Registry {
    proxies: ProxyRegistry,
    types: TypeRegistry,
    definitions: CowMap<(TypeId, String), Arc<ClassDefinition>>,
}

impl Default for Registry {
    fn default() -> Self {
        let types = TypeRegistry::new();
        types.register::<ArrayCollection>(ArrayCollection::CLASS_NAME);
        Self {
            proxies: ProxyRegistry::new(),
            types,
            definitions: CowMap::new(),
        }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn proxies(&self) -> &ProxyRegistry {
        &self.proxies
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Resolves the class definition of `instance`, building and caching it
    /// on first use of a cacheable type.
    pub fn class_definition(
        &self,
        instance: &dyn Reflect,
    ) -> Result<Arc<ClassDefinition>, CoreError> {
        let proxy = self.proxies.proxy_for(instance);
        self.class_definition_with(instance, proxy.as_ref())
    }

    pub fn class_definition_with(
        &self,
        instance: &dyn Reflect,
        proxy: &dyn ObjectProxy,
    ) -> Result<Arc<ClassDefinition>, CoreError> {
        if !proxy.is_cacheable() {
            return proxy.class_definition(instance);
        }
        // Anonymous types share the empty class name, so the concrete type
        // is part of the key.
        let key = (instance.as_any().type_id(), instance.class_name().to_string());
        if let Some(definition) = self.definitions.get(&key) {
            return Ok(definition);
        }
        self.definitions
            .get_or_try_insert_with(key, || {
                let definition = proxy.class_definition(instance)?;
                debug!(
                    "created class definition for {} ({} members, externalizable={}, dynamic={})",
                    definition.class_name(),
                    definition.member_count(),
                    definition.is_externalizable(),
                    definition.is_dynamic()
                );
                Ok(definition)
            })
    }

    /// Number of cached class definitions.
    pub fn cached_definitions(&self) -> usize {
        self.definitions.len()
    }

    /// Drops cached class definitions and proxy selections. Registrations
    /// survive.
    pub fn shutdown(&self) {
        self.definitions.clear();
        self.proxies.clear_selections();
    }
}
