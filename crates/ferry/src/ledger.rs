// ResourceLedger - exactly-once release of everything one projection created
//
// Every native value and pin created while projecting one root value is
// registered here the moment it exists. The ledger, not the native composites,
// owns those resources: a native sequence only references its elements.
//
// Release runs newest-first over a flat list, so there is no tree to walk and
// no order dependency between composites and their children. `release_all`
// drains the list, which makes a second call a no-op, and `Drop` calls it so a
// ledger that goes out of scope cannot leak.

use std::fmt;

use ferry_core::{Engine, NativeValue, PinHandle};

/// A disposable engine resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Value(NativeValue),
    Pin(PinHandle),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Value(v) => write!(f, "{v}"),
            Resource::Pin(p) => write!(f, "{p}"),
        }
    }
}

/// Ordered record of the resources created by one projection call.
pub struct ResourceLedger<E: Engine> {
    engine: E,
    resources: Vec<Resource>,
    released: bool,
}

impl<E: Engine> ResourceLedger<E> {
    pub fn new(engine: E) -> Self {
        Self::with_capacity(engine, 0)
    }

    pub fn with_capacity(engine: E, capacity: usize) -> Self {
        ResourceLedger {
            engine,
            resources: Vec::with_capacity(capacity),
            released: false,
        }
    }

    /// Record a resource. Registering after release is allowed; the ledger
    /// becomes live again and will release the new entry.
    pub fn register(&mut self, resource: Resource) {
        tracing::trace!(%resource, index = self.resources.len(), "register");
        self.resources.push(resource);
        self.released = false;
    }

    pub fn register_value(&mut self, value: NativeValue) {
        self.register(Resource::Value(value));
    }

    pub fn register_pin(&mut self, pin: PinHandle) {
        self.register(Resource::Pin(pin));
    }

    /// Release every registered resource, newest first. Idempotent.
    pub fn release_all(&mut self) {
        if self.resources.is_empty() {
            self.released = true;
            return;
        }
        let count = self.resources.len();
        while let Some(resource) = self.resources.pop() {
            tracing::trace!(%resource, "release");
            match resource {
                Resource::Value(v) => self.engine.release_value(v),
                Resource::Pin(p) => self.engine.unpin_memory(p),
            }
        }
        self.released = true;
        tracing::debug!(count, engine = %self.engine.name(), "released ledger");
    }

    /// Move every resource of `other` into this ledger, keeping creation
    /// order. `other` is left empty.
    pub fn absorb(&mut self, mut other: ResourceLedger<E>) {
        self.resources.append(&mut other.resources);
        self.released = false;
    }

    /// Resources still held, in creation order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Whether `release_all` ran and nothing was registered since.
    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: Engine> Drop for ResourceLedger<E> {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl<E: Engine> fmt::Debug for ResourceLedger<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLedger")
            .field("engine", &self.engine.name())
            .field("resources", &self.resources)
            .field("released", &self.released)
            .finish()
    }
}
