//! Copy-on-write map for shared registries.
//!
//! Reads load the current snapshot without locking. Inserts take a mutex,
//! re-check the key, clone the snapshot, insert, and publish the new
//! snapshot atomically, so readers never observe a partial update.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

pub struct CowMap<K, V> {
    current: ArcSwap<HashMap<K, V>>,
    write_lock: Mutex<()>,
}

impl<K, V> fmt::Debug for CowMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CowMap")
            .field("len", &self.current.load().len())
            .finish()
    }
}

impl<K, V> Default for CowMap<K, V> {
    fn default() -> Self {
        Self {
            current: ArcSwap::from_pointee(HashMap::new()),
            write_lock: Mutex::new(()),
        }
    }
}

impl<K, V> CowMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.current.load().get(key).cloned()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.current.load().contains_key(key)
    }

    /// Inserts or replaces an entry.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let _guard = self.write_lock.lock();
        let mut next: HashMap<K, V> = (**self.current.load()).clone();
        let previous = next.insert(key, value);
        self.current.store(Arc::new(next));
        previous
    }

    /// Returns the existing entry or inserts the one built by `init`. `init`
    /// runs at most once per key, under the write lock.
    pub fn get_or_insert_with<F>(&self, key: K, init: F) -> V
    where
        F: FnOnce() -> V,
    {
        match self.get_or_try_insert_with(key, || Ok::<V, std::convert::Infallible>(init())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    pub fn get_or_try_insert_with<E, F>(&self, key: K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let _guard = self.write_lock.lock();
        let snapshot = self.current.load_full();
        if let Some(value) = snapshot.get(&key) {
            return Ok(value.clone());
        }

        let value = init()?;
        let mut next: HashMap<K, V> = (*snapshot).clone();
        next.insert(key, value.clone());
        self.current.store(Arc::new(next));
        Ok(value)
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let _guard = self.write_lock.lock();
        let mut next: HashMap<K, V> = (**self.current.load()).clone();
        let previous = next.remove(key);
        if previous.is_some() {
            self.current.store(Arc::new(next));
        }
        previous
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    pub fn clear(&self) {
        let _guard = self.write_lock.lock();
        self.current.store(Arc::new(HashMap::new()));
    }

    /// Current snapshot of all entries.
    pub fn snapshot(&self) -> Arc<HashMap<K, V>> {
        self.current.load_full()
    }
}
