//! The implicit parameter threaded through every fallible kernel operation.
//!
//! A [`ExecutionContext`] owns at most one active error, a retryable flag, a rollback
//! flag, and a string-keyed property map (`duro/obj/excontext.h`'s `RDB_exec_context`).

use std::collections::HashMap;

use crate::error::Error;

/// A value stored in an [`ExecutionContext`]'s property map.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    /// A boolean property.
    Bool(bool),
    /// An integer property.
    Int(i64),
    /// A string property.
    Str(String),
}

/// The per-task error slot and property map.
///
/// Raising an error while one is already active destroys the previous error first,
/// mirroring the source's "an already-active error is overwritten, never leaked"
/// contract. There is no analogous "destroy" call in Rust: replacing or dropping the
/// context frees the previous error as an ordinary consequence of ownership.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    error: Option<Error>,
    retryable: bool,
    rollback: bool,
    properties: HashMap<String, Property>,
}

impl ExecutionContext {
    /// Creates a fresh context with no active error.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `err` as the active error, replacing (and thereby dropping) any
    /// previous one. Sets the retryable flag if `err` is retryable.
    pub fn raise(&mut self, err: Error) -> &Error {
        if err.is_retryable() {
            self.retryable = true;
        }
        self.error = Some(err);
        self.error.as_ref().expect("just inserted")
    }

    /// Returns the active error, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// True iff an error is currently active.
    pub fn is_active(&self) -> bool {
        self.error.is_some()
    }

    /// Clears the active error without inspecting it. Used at iterator boundaries
    /// after a `NotFound` has been consumed as end-of-sequence.
    pub fn clear(&mut self) {
        self.error = None;
    }

    /// Takes the active error out of the context, clearing the slot.
    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    /// True iff the last raised error was retryable (concurrency or deadlock).
    /// Sticky until explicitly reset with [`ExecutionContext::reset_retryable`].
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Clears the retryable flag. Callers do this after a successful retry.
    pub fn reset_retryable(&mut self) {
        self.retryable = false;
    }

    /// Marks the context's transaction as doomed to roll back regardless of whether
    /// the current statement itself succeeds.
    pub fn mark_rollback_only(&mut self) {
        self.rollback = true;
    }

    /// True iff [`ExecutionContext::mark_rollback_only`] has been called.
    pub fn is_rollback_only(&self) -> bool {
        self.rollback
    }

    /// Sets a property in the context's property map.
    pub fn set_property<K: Into<String>>(&mut self, key: K, value: Property) {
        self.properties.insert(key.into(), value);
    }

    /// Reads a property from the context's property map.
    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raising_replaces_previous_error() {
        let mut ctx = ExecutionContext::new();
        ctx.raise(Error::not_found("a"));
        assert!(ctx.is_active());
        ctx.raise(Error::invalid_argument("b"));
        assert_eq!(ctx.error(), Some(&Error::invalid_argument("b")));
    }

    #[test]
    fn retryable_flag_follows_error_kind() {
        let mut ctx = ExecutionContext::new();
        ctx.raise(Error::not_found("a"));
        assert!(!ctx.is_retryable());
        ctx.raise(Error::Deadlock);
        assert!(ctx.is_retryable());
    }

    #[test]
    fn properties_roundtrip() {
        let mut ctx = ExecutionContext::new();
        ctx.set_property("k", Property::Int(42));
        assert_eq!(ctx.property("k"), Some(&Property::Int(42)));
        assert_eq!(ctx.property("missing"), None);
    }
}
