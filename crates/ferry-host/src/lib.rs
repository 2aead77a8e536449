//! # ferry-host
//!
//! An in-process [`Engine`](ferry_core::Engine) that keeps native values in
//! host memory. It is the reference engine for ferry: strict about pins and
//! handle lifetimes, and instrumented with [`HostStats`] so callers can check
//! that every native resource was released.

pub mod engine;

pub use engine::{HostEngine, HostStats, HostTensor, HostValue};
