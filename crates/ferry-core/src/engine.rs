use std::fmt;

use crate::buffer::TensorBuffer;
use crate::error::EngineError;

// Engine - the inference engine, seen from the projection layer
//
// Projection never touches engine memory directly. It asks the engine to mint
// opaque handles and later to release them:
//
//   pin_memory / unpin_memory       keep a host buffer alive and in place
//   create_tensor_view              native tensor over pinned host memory
//   create_tensor_copy              native tensor over engine-owned memory
//   create_sequence                 native sequence over existing handles
//   release_value                   destroy a native value
//
// A native sequence references its elements without owning them: releasing
// the sequence never releases an element, and elements may be released
// before or after the sequence. That lets the resource ledger release
// everything in one flat pass.

/// Opaque handle to a value in the engine's own representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeValue(u64);

impl NativeValue {
    pub fn from_raw(raw: u64) -> Self {
        NativeValue(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value#{}", self.0)
    }
}

/// Handle that keeps a host buffer from being freed or moved while the engine
/// references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinHandle(u64);

impl PinHandle {
    pub fn from_raw(raw: u64) -> Self {
        PinHandle(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PinHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pin#{}", self.0)
    }
}

/// The engine operations projection depends on.
///
/// Engines are cheap to clone (a shared handle to engine state), so a
/// resource ledger can carry its own clone and release resources without
/// borrowing the caller's engine.
pub trait Engine: Clone + Send + Sync + fmt::Debug + 'static {
    /// A human-readable name for this engine.
    fn name(&self) -> String;

    /// Keep `buffer`'s storage alive and in place until unpinned.
    fn pin_memory(&self, buffer: &TensorBuffer) -> Result<PinHandle, EngineError>;

    fn unpin_memory(&self, pin: PinHandle);

    /// Native tensor referencing `buffer`'s memory in place. The caller must
    /// hold a pin on the buffer for as long as the value lives.
    fn create_tensor_view(&self, buffer: &TensorBuffer) -> Result<NativeValue, EngineError>;

    /// Native tensor holding a copy of `buffer`'s elements in logical order.
    fn create_tensor_copy(&self, buffer: &TensorBuffer) -> Result<NativeValue, EngineError>;

    /// Native sequence referencing `elements`, in order, without owning them.
    fn create_sequence(&self, elements: &[NativeValue]) -> Result<NativeValue, EngineError>;

    fn release_value(&self, value: NativeValue);
}
