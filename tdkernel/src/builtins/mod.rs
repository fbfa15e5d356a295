//! The scalar built-in operators (§4.4): arithmetic, comparison, boolean
//! logic, casts, string, math, and datetime. Each submodule registers plain
//! `NativeFn` function pointers, matching `operator::NativeFn`'s signature --
//! builtins never close over state, so anything they need (the acting type
//! arena, a session clock) comes through `ExecutionContext` or the resolved
//! overload's declared return type, not a closure capture.
//!
//! `regex_like` and `format` are out of scope: both depend on a regex/locale
//! engine that this kernel treats as an external collaborator (§1, §6),
//! not a builtin it carries itself.

mod arithmetic;
mod boolean;
mod cast;
mod comparison;
mod datetime;
mod math;
mod string;

use crate::operator::OperatorRegistry;
use crate::types::TypeArena;

/// Registers every scalar built-in overload into `registry`, using `arena`
/// to resolve the built-in types (`integer`, `float`, ...) each overload is
/// keyed on. Called once during catalog/session initialization.
pub fn register_all(registry: &mut OperatorRegistry, arena: &TypeArena) {
    arithmetic::register(registry, arena);
    comparison::register(registry, arena);
    boolean::register(registry, arena);
    cast::register(registry, arena);
    string::register(registry, arena);
    math::register(registry, arena);
    datetime::register(registry, arena);
}
