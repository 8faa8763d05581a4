//! Type-keyed service bindings contributed by modules.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

type Binding = Arc<dyn Any + Send + Sync>;

/// Mutable collection handed to `register_services` during activation.
#[derive(Default, Debug)]
pub struct ServiceCollection {
    bindings: HashMap<TypeId, (&'static str, Binding)>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value by its type. One binding per type.
    pub fn add<T>(&mut self, service: T) -> anyhow::Result<&mut Self>
    where
        T: Send + Sync + 'static,
    {
        self.add_arc(Arc::new(service))
    }

    /// Bind a shared value, typically `Arc<dyn Trait>` wrapped in an `Arc`.
    pub fn add_arc<T>(&mut self, service: Arc<T>) -> anyhow::Result<&mut Self>
    where
        T: Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        if self.bindings.contains_key(&type_id) {
            anyhow::bail!(
                "service {} is already registered",
                std::any::type_name::<T>()
            );
        }
        self.bindings
            .insert(type_id, (std::any::type_name::<T>(), service));
        Ok(self)
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.bindings.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub(crate) fn freeze(self) -> Services {
        Services {
            bindings: self.bindings,
        }
    }
}

/// Read-only service bindings after activation.
#[derive(Clone, Default)]
pub struct Services {
    bindings: HashMap<TypeId, (&'static str, Binding)>,
}

impl Services {
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let (_, binding) = self.bindings.get(&TypeId::of::<T>())?;
        Arc::clone(binding).downcast::<T>().ok()
    }

    /// Like [`Services::get`], failing with the missing type's name.
    pub fn require<T>(&self) -> anyhow::Result<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.get::<T>().ok_or_else(|| {
            anyhow::anyhow!("service {} is not registered", std::any::type_name::<T>())
        })
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.bindings.values().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("types", &self.type_names())
            .finish()
    }
}
