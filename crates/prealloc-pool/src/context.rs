// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Execution context: may the current call block?
//!
//! Acquisition from interrupt-like code, non-preemptible sections or
//! read-side critical sections must never wait for memory. The pool asks an
//! [`ExecutionContext`] on every acquire and passes the resulting
//! [`AllocMode`] straight through to the reserve.
//!
//! The default [`ThreadContext`] keeps a per-thread nesting depth of atomic
//! sections. Code that must not block wraps itself in [`enter_atomic`]:
//!
//! ```
//! use prealloc_pool::context::{self, AllocMode, ExecutionContext, ThreadContext};
//!
//! assert_eq!(ThreadContext.alloc_mode(), AllocMode::Blocking);
//! {
//!     let _atomic = context::enter_atomic();
//!     assert_eq!(ThreadContext.alloc_mode(), AllocMode::NonBlocking);
//! }
//! assert!(!context::in_atomic());
//! ```

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;

/// Whether an allocation attempt may wait for memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocMode {
    /// The caller may sleep until a block is returned.
    Blocking,
    /// The caller must get an answer immediately.
    NonBlocking,
}

impl AllocMode {
    pub fn may_block(self) -> bool {
        matches!(self, AllocMode::Blocking)
    }
}

impl fmt::Display for AllocMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocMode::Blocking => f.write_str("blocking"),
            AllocMode::NonBlocking => f.write_str("non-blocking"),
        }
    }
}

/// Answers "can this call block?" for the current caller.
pub trait ExecutionContext: Send + Sync {
    /// Returns `true` if the calling context may sleep.
    fn may_block(&self) -> bool;

    /// The allocation mode implied by [`ExecutionContext::may_block`].
    fn alloc_mode(&self) -> AllocMode {
        if self.may_block() {
            AllocMode::Blocking
        } else {
            AllocMode::NonBlocking
        }
    }
}

thread_local! {
    static ATOMIC_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// RAII marker for a section of code that must not block.
///
/// Sections nest; the thread leaves atomic context when the outermost guard
/// drops. The guard is tied to the thread that created it.
#[must_use = "the atomic section ends when this guard is dropped"]
pub struct AtomicSection {
    _not_send: PhantomData<*const ()>,
}

/// Enters an atomic section on the current thread.
pub fn enter_atomic() -> AtomicSection {
    ATOMIC_DEPTH.with(|d| d.set(d.get() + 1));
    AtomicSection {
        _not_send: PhantomData,
    }
}

/// Returns `true` while the current thread is inside an atomic section.
pub fn in_atomic() -> bool {
    ATOMIC_DEPTH.with(|d| d.get() > 0)
}

impl Drop for AtomicSection {
    fn drop(&mut self) {
        ATOMIC_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

impl fmt::Debug for AtomicSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicSection")
            .field("depth", &ATOMIC_DEPTH.with(|d| d.get()))
            .finish()
    }
}

/// Context that blocks unless the calling thread is in an atomic section.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadContext;

impl ExecutionContext for ThreadContext {
    fn may_block(&self) -> bool {
        !in_atomic()
    }
}

/// Context that always answers with the same mode.
#[derive(Debug, Clone, Copy)]
pub struct FixedContext(pub AllocMode);

impl ExecutionContext for FixedContext {
    fn may_block(&self) -> bool {
        self.0.may_block()
    }
}
