use parking_lot::RwLock;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{Arc, OnceLock},
};

type Map = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Process-wide map from a type to one shared value
pub(crate) struct StaticTypeMap {
    inner: OnceLock<RwLock<Map>>,
}

impl StaticTypeMap {
    pub(crate) const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Returns the value of type `V`, creating it with `init` on first use
    pub(crate) fn get_or_insert_with<V: Send + Sync + 'static>(
        &self,
        init: impl FnOnce() -> V,
    ) -> Arc<V> {
        let id = TypeId::of::<V>();
        let map = self.get_or_init();

        // fast get with shared access
        if let Some(value) = map.read().get(&id) {
            return downcast(value);
        }

        // slow get with unique access
        let mut map = map.write();
        let value = map
            .entry(id)
            .or_insert_with(|| Arc::new(init()) as Arc<dyn Any + Send + Sync>);
        downcast(value)
    }

    fn get_or_init(&self) -> &RwLock<Map> {
        self.inner.get_or_init(|| RwLock::new(Map::new()))
    }
}

fn downcast<V: Send + Sync + 'static>(value: &Arc<dyn Any + Send + Sync>) -> Arc<V> {
    match Arc::clone(value).downcast::<V>() {
        Ok(value) => value,
        // entries are keyed by the TypeId of their own value
        Err(_) => unreachable!("value type mismatch in StaticTypeMap"),
    }
}
