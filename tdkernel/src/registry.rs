//! Process-global, once-initialized state: the built-in type table and the
//! operator registry (§5, "Global mutable state"). Both are mutated only
//! under an explicit DDL transaction after start-up, so a read-write lock is
//! sufficient to expose multi-threaded read access.

use std::sync::RwLock;

use crate::operator::OperatorRegistry;
use crate::types::TypeArena;

/// Holds the kernel's shared type arena and operator registry behind
/// read-write locks. One `Globals` is created per open database and handed to
/// every transaction/connection.
#[derive(Debug)]
pub struct Globals {
    types: RwLock<TypeArena>,
    operators: RwLock<OperatorRegistry>,
}

impl Globals {
    /// Builds a fresh `Globals` with only the built-in types registered and an
    /// empty operator registry; callers install built-in operators via
    /// [`crate::builtins::register_all`] before serving any statement.
    pub fn new() -> Self {
        Self {
            types: RwLock::new(TypeArena::with_builtins()),
            operators: RwLock::new(OperatorRegistry::new()),
        }
    }

    /// Read access to the type arena.
    pub fn types(&self) -> std::sync::RwLockReadGuard<'_, TypeArena> {
        self.types.read().expect("type arena lock poisoned")
    }

    /// Write access to the type arena, for DDL (`TYPE ... ;`, scalar type
    /// registration).
    pub fn types_mut(&self) -> std::sync::RwLockWriteGuard<'_, TypeArena> {
        self.types.write().expect("type arena lock poisoned")
    }

    /// Read access to the operator registry.
    pub fn operators(&self) -> std::sync::RwLockReadGuard<'_, OperatorRegistry> {
        self.operators.read().expect("operator registry lock poisoned")
    }

    /// Write access to the operator registry, for `OPERATOR` definition,
    /// module loading, and unload.
    pub fn operators_mut(&self) -> std::sync::RwLockWriteGuard<'_, OperatorRegistry> {
        self.operators.write().expect("operator registry lock poisoned")
    }
}

impl Default for Globals {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_globals_resolves_builtin_types() {
        let g = Globals::new();
        assert!(g.types().by_name("integer").is_some());
        assert!(g.operators().chain("=").is_empty());
    }
}
