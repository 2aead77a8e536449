// HostEngine - an in-process engine that keeps native values in host memory
//
// Native values live in a handle table keyed by id. Tensor views share the
// caller's storage Arc; tensor copies own freshly gathered storage; sequences
// list the handles of their elements without owning them.
//
// The engine is strict about handle hygiene, which makes it useful as a test
// double for projection:
//   - a view can only be created over storage that is currently pinned
//   - a sequence can only reference live values of one homogeneous kind
//   - releasing an unknown or already released handle is counted, not ignored
//
// `fail_after(n)` lets the first `n` creations (pins included) succeed and
// fails every creation after that, to drive failure paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use ferry_core::{
    ElementType, Engine, EngineError, NativeValue, PinHandle, Shape, TensorBuffer, TensorData,
};

/// Snapshot of the engine's handle accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    /// Native values created and not yet released.
    pub live_values: usize,
    /// Pins taken and not yet released.
    pub live_pins: usize,
    /// Cumulative native values created.
    pub values_created: u64,
    /// Cumulative pins taken.
    pub pins_created: u64,
    /// Releases of handles that were unknown or already released.
    pub invalid_releases: u64,
}

impl HostStats {
    /// No native value and no pin is outstanding.
    pub fn is_clean(&self) -> bool {
        self.live_values == 0 && self.live_pins == 0
    }
}

/// A native tensor held by the host engine.
#[derive(Debug, Clone)]
pub struct HostTensor {
    pub element_type: ElementType,
    pub shape: Shape,
    pub storage: Arc<TensorData>,
    /// Whether the storage is the caller's (view) or the engine's (copy).
    pub is_view: bool,
}

/// A native value held by the host engine.
#[derive(Debug, Clone)]
pub enum HostValue {
    Tensor(HostTensor),
    Sequence(Vec<NativeValue>),
}

#[derive(Debug, Default)]
struct HostState {
    next_id: u64,
    values: HashMap<u64, HostValue>,
    pins: HashMap<u64, Arc<TensorData>>,
}

impl HostState {
    fn mint(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn is_pinned(&self, storage: &Arc<TensorData>) -> bool {
        self.pins.values().any(|p| Arc::ptr_eq(p, storage))
    }
}

#[derive(Debug)]
struct HostInner {
    state: Mutex<HostState>,
    // creations still allowed before injected failures start; u64::MAX = unlimited
    budget: AtomicU64,
    values_created: AtomicU64,
    pins_created: AtomicU64,
    invalid_releases: AtomicU64,
}

/// In-process engine. Cloning shares the same handle table.
#[derive(Debug, Clone)]
pub struct HostEngine {
    inner: Arc<HostInner>,
}

impl Default for HostEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HostEngine {
    pub fn new() -> Self {
        HostEngine {
            inner: Arc::new(HostInner {
                state: Mutex::new(HostState::default()),
                budget: AtomicU64::new(u64::MAX),
                values_created: AtomicU64::new(0),
                pins_created: AtomicU64::new(0),
                invalid_releases: AtomicU64::new(0),
            }),
        }
    }

    /// Engine whose creations start failing after `n` successful ones.
    pub fn fail_after(n: u64) -> Self {
        let engine = Self::new();
        engine.inner.budget.store(n, Ordering::SeqCst);
        engine
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        // a panicking test thread must not hide the handle table from others
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_budget(&self, what: &str) -> Result<(), EngineError> {
        let taken = self
            .inner
            .budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |b| match b {
                u64::MAX => Some(u64::MAX),
                0 => None,
                b => Some(b - 1),
            });
        taken
            .map(|_| ())
            .map_err(|_| EngineError::new(format!("injected failure creating {what}")))
    }

    fn insert_value(&self, value: HostValue) -> NativeValue {
        let mut state = self.state();
        let id = state.mint();
        state.values.insert(id, value);
        self.inner.values_created.fetch_add(1, Ordering::Relaxed);
        NativeValue::from_raw(id)
    }

    pub fn stats(&self) -> HostStats {
        let state = self.state();
        HostStats {
            live_values: state.values.len(),
            live_pins: state.pins.len(),
            values_created: self.inner.values_created.load(Ordering::Relaxed),
            pins_created: self.inner.pins_created.load(Ordering::Relaxed),
            invalid_releases: self.inner.invalid_releases.load(Ordering::Relaxed),
        }
    }

    pub fn is_live(&self, value: NativeValue) -> bool {
        self.state().values.contains_key(&value.raw())
    }

    /// Whether `buffer`'s storage is held by at least one live pin.
    pub fn is_pinned(&self, buffer: &TensorBuffer) -> bool {
        self.state().is_pinned(buffer.storage())
    }

    pub fn value(&self, value: NativeValue) -> Option<HostValue> {
        self.state().values.get(&value.raw()).cloned()
    }

    pub fn tensor(&self, value: NativeValue) -> Option<HostTensor> {
        match self.value(value)? {
            HostValue::Tensor(t) => Some(t),
            HostValue::Sequence(_) => None,
        }
    }

    /// Element handles of a native sequence, in order.
    pub fn sequence_elements(&self, value: NativeValue) -> Option<Vec<NativeValue>> {
        match self.value(value)? {
            HostValue::Sequence(elements) => Some(elements),
            HostValue::Tensor(_) => None,
        }
    }
}

impl Engine for HostEngine {
    fn name(&self) -> String {
        "host".to_string()
    }

    fn pin_memory(&self, buffer: &TensorBuffer) -> Result<PinHandle, EngineError> {
        self.take_budget("pin")?;
        let mut state = self.state();
        let id = state.mint();
        state.pins.insert(id, Arc::clone(buffer.storage()));
        self.inner.pins_created.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(pin = id, "pinned host buffer");
        Ok(PinHandle::from_raw(id))
    }

    fn unpin_memory(&self, pin: PinHandle) {
        if self.state().pins.remove(&pin.raw()).is_none() {
            self.inner.invalid_releases.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(%pin, "unpin of unknown or released pin");
        }
    }

    fn create_tensor_view(&self, buffer: &TensorBuffer) -> Result<NativeValue, EngineError> {
        self.take_budget("tensor view")?;
        if !buffer.is_view_eligible() {
            return Err(EngineError::new(format!(
                "buffer of shape {} is not view-eligible",
                buffer.shape()
            )));
        }
        if !self.state().is_pinned(buffer.storage()) {
            return Err(EngineError::new("tensor view over unpinned memory"));
        }
        Ok(self.insert_value(HostValue::Tensor(HostTensor {
            element_type: buffer.element_type(),
            shape: buffer.shape().clone(),
            storage: Arc::clone(buffer.storage()),
            is_view: true,
        })))
    }

    fn create_tensor_copy(&self, buffer: &TensorBuffer) -> Result<NativeValue, EngineError> {
        self.take_budget("tensor copy")?;
        let data = buffer
            .to_contiguous()
            .map_err(|e| EngineError::new(e.to_string()))?;
        Ok(self.insert_value(HostValue::Tensor(HostTensor {
            element_type: buffer.element_type(),
            shape: buffer.shape().clone(),
            storage: Arc::new(data),
            is_view: false,
        })))
    }

    fn create_sequence(&self, elements: &[NativeValue]) -> Result<NativeValue, EngineError> {
        self.take_budget("sequence")?;
        {
            let state = self.state();
            let mut first_tensor_type = None;
            let mut saw_sequence = false;
            let mut saw_tensor = false;
            for element in elements {
                match state.values.get(&element.raw()) {
                    None => {
                        return Err(EngineError::new(format!(
                            "sequence element {element} is not a live value"
                        )))
                    }
                    Some(HostValue::Sequence(_)) => saw_sequence = true,
                    Some(HostValue::Tensor(t)) => {
                        saw_tensor = true;
                        let expected = *first_tensor_type.get_or_insert(t.element_type);
                        if expected != t.element_type {
                            return Err(EngineError::new(format!(
                                "sequence mixes {expected} and {} tensors",
                                t.element_type
                            )));
                        }
                    }
                }
            }
            if saw_sequence && saw_tensor {
                return Err(EngineError::new("sequence mixes tensors and sequences"));
            }
        }
        Ok(self.insert_value(HostValue::Sequence(elements.to_vec())))
    }

    fn release_value(&self, value: NativeValue) {
        if self.state().values.remove(&value.raw()).is_none() {
            self.inner.invalid_releases.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(%value, "release of unknown or released value");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_counts_down() {
        let engine = HostEngine::fail_after(1);
        let b = TensorBuffer::from_vec(vec![1.0f32], 1).unwrap();
        assert!(engine.create_tensor_copy(&b).is_ok());
        assert!(engine.create_tensor_copy(&b).is_err());
        assert_eq!(engine.stats().values_created, 1);
    }

    #[test]
    fn test_unlimited_budget() {
        let engine = HostEngine::new();
        let b = TensorBuffer::from_vec(vec![1u8], 1).unwrap();
        for _ in 0..10 {
            let v = engine.create_tensor_copy(&b).unwrap();
            engine.release_value(v);
        }
        assert!(engine.stats().is_clean());
    }
}
