//! The operator registry: a name-keyed multimap from operator name to an
//! ordered overload chain, resolved by arity-and-type match with a
//! generic-overload (variadic) fallback (§4.4).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::error::Error;
use crate::expr::Expr;
use crate::types::{TypeArena, TypeHandle};
use crate::value::Value;
use crate::Result;

/// An operator's declared arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly `0` parameters.
    Exact(usize),
    /// Any number of arguments; the generic-overload fallback (§4.4).
    Variadic,
}

/// A native Rust implementation of a read-only operator.
pub type NativeFn = fn(&[Value], &mut ExecutionContext) -> Result<Value>;

/// A loader capability for dynamically-registered operators, kept abstract so
/// the kernel never links against a particular dynamic-loading library
/// (REDESIGN FLAGS: "cross-backend operator module loading").
pub trait SymbolLoader: fmt::Debug + Send + Sync {
    /// Resolves `symbol` within `module` to a callable native function.
    fn load(&self, module: &str, symbol: &str) -> Result<NativeFn>;
}

/// The executable body of an operator overload.
#[derive(Clone)]
pub enum OpBody {
    /// A function pointer compiled into this process.
    Native(NativeFn),
    /// A symbol resolved at registration time through a [`SymbolLoader`].
    Dynamic { loaded: NativeFn, module: String, symbol: String },
    /// A user-defined operator whose body is itself an expression (selectors,
    /// getters, setters, and Tutorial D `OPERATOR` definitions).
    Interpreted(Arc<Expr>),
}

impl fmt::Debug for OpBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpBody::Native(_) => f.write_str("OpBody::Native(..)"),
            OpBody::Dynamic { module, symbol, .. } => {
                write!(f, "OpBody::Dynamic {{ module: {:?}, symbol: {:?} }}", module, symbol)
            }
            OpBody::Interpreted(_) => f.write_str("OpBody::Interpreted(..)"),
        }
    }
}

/// One overload of an operator.
#[derive(Debug, Clone)]
pub struct OpEntry {
    name: String,
    /// Declared parameter types; `None` at a position is a wildcard.
    params: Vec<Option<TypeHandle>>,
    arity: Arity,
    /// Return type; `None` for an update (non-read-only) operator.
    ret: Option<TypeHandle>,
    body: OpBody,
    /// Run once when this overload is unloaded (module unload, `DROP OPERATOR`).
    cleanup: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl OpEntry {
    /// Constructs a fixed-arity, natively-implemented overload.
    pub fn native(name: impl Into<String>, params: Vec<Option<TypeHandle>>, ret: Option<TypeHandle>, f: NativeFn) -> Self {
        let arity = Arity::Exact(params.len());
        Self {
            name: name.into(),
            params,
            arity,
            ret,
            body: OpBody::Native(f),
            cleanup: None,
        }
    }

    /// Constructs a variadic, natively-implemented overload (the
    /// generic-overload fallback for a name).
    pub fn variadic(name: impl Into<String>, ret: Option<TypeHandle>, f: NativeFn) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            arity: Arity::Variadic,
            ret,
            body: OpBody::Native(f),
            cleanup: None,
        }
    }

    /// Constructs an overload whose body is an expression (a possrep
    /// selector/getter/setter, or a user `OPERATOR` definition).
    pub fn interpreted(name: impl Into<String>, params: Vec<Option<TypeHandle>>, ret: Option<TypeHandle>, body: Expr) -> Self {
        Self {
            name: name.into(),
            arity: Arity::Exact(params.len()),
            params,
            ret,
            body: OpBody::Interpreted(Arc::new(body)),
            cleanup: None,
        }
    }

    /// Resolves a dynamically-loaded overload through `loader`.
    pub fn dynamic(
        name: impl Into<String>,
        params: Vec<Option<TypeHandle>>,
        ret: Option<TypeHandle>,
        module: impl Into<String>,
        symbol: impl Into<String>,
        loader: &dyn SymbolLoader,
    ) -> Result<Self> {
        let module = module.into();
        let symbol = symbol.into();
        let loaded = loader.load(&module, &symbol)?;
        Ok(Self {
            name: name.into(),
            arity: Arity::Exact(params.len()),
            params,
            ret,
            body: OpBody::Dynamic { loaded, module, symbol },
            cleanup: None,
        })
    }

    /// Attaches a cleanup callback (builder style), run once on unload.
    pub fn with_cleanup(mut self, cleanup: Arc<dyn Fn() + Send + Sync>) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    /// The operator's declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The overload's return type; `None` for an update operator.
    pub fn ret(&self) -> Option<TypeHandle> {
        self.ret
    }

    /// The overload's declared arity.
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// The overload's executable body.
    pub fn body(&self) -> &OpBody {
        &self.body
    }

    fn params_match(&self, arg_types: &[TypeHandle], arena: &TypeArena) -> bool {
        match self.arity {
            Arity::Exact(n) => {
                n == arg_types.len()
                    && self
                        .params
                        .iter()
                        .zip(arg_types)
                        .all(|(param, arg)| param.map_or(true, |p| arena.matches(*arg, p)))
            }
            // A variadic overload matches any argument count; any declared
            // leading parameters still constrain their positions.
            Arity::Variadic => self
                .params
                .iter()
                .zip(arg_types)
                .all(|(param, arg)| param.map_or(true, |p| arena.matches(*arg, p))),
        }
    }

    /// Invokes a native or dynamically-loaded overload. Interpreted overloads
    /// are evaluated by the query engine, which owns expression evaluation.
    pub fn call_native(&self, args: &[Value], ctx: &mut ExecutionContext) -> Result<Value> {
        match &self.body {
            OpBody::Native(f) => f(args, ctx),
            OpBody::Dynamic { loaded, .. } => loaded(args, ctx),
            OpBody::Interpreted(_) => Err(Error::Internal(
                "interpreted operator bodies must be evaluated by the query engine".to_string(),
            )),
        }
    }

    /// Runs this overload's cleanup callback, if any (module unload or `DROP OPERATOR`).
    pub fn cleanup(&self) {
        if let Some(cb) = &self.cleanup {
            cb();
        }
    }
}

/// The name-keyed multimap of operator overload chains.
#[derive(Debug, Default)]
pub struct OperatorRegistry {
    chains: HashMap<String, Vec<OpEntry>>,
}

impl OperatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `op` to the chain stored under its name.
    pub fn register(&mut self, op: OpEntry) {
        tracing::debug!(operator = %op.name, arity = ?op.arity, "registering operator overload");
        self.chains.entry(op.name.clone()).or_default().push(op);
    }

    /// Removes every overload of `name` for which `pred` returns true, running
    /// each one's cleanup callback first.
    pub fn unload(&mut self, name: &str, pred: impl Fn(&OpEntry) -> bool) {
        if let Some(chain) = self.chains.get_mut(name) {
            chain.retain(|entry| {
                let drop_it = pred(entry);
                if drop_it {
                    entry.cleanup();
                }
                !drop_it
            });
        }
    }

    /// `resolve(name, arg_types)`: finds the overload whose parameter count
    /// equals the argument count and whose every parameter matches, falling
    /// back to a variadic overload. Raises [`Error::type_mismatch`] if some
    /// overload's arity matched but its types didn't, else
    /// [`Error::operator_not_found`].
    pub fn resolve(&self, name: &str, arg_types: &[TypeHandle], arena: &TypeArena) -> Result<&OpEntry> {
        let chain = self
            .chains
            .get(name)
            .ok_or_else(|| Error::operator_not_found(name))?;

        let mut arity_matched = false;
        for entry in chain.iter().filter(|e| matches!(e.arity, Arity::Exact(_))) {
            arity_matched = true;
            if entry.params_match(arg_types, arena) {
                return Ok(entry);
            }
        }
        for entry in chain.iter().filter(|e| matches!(e.arity, Arity::Variadic)) {
            arity_matched = true;
            if entry.params_match(arg_types, arena) {
                return Ok(entry);
            }
        }
        if arity_matched {
            Err(Error::type_mismatch(format!(
                "no overload of `{}` matches the given argument types",
                name
            )))
        } else {
            Err(Error::operator_not_found(name))
        }
    }

    /// Resolves by argument *values*, using each value's dispatch type (the
    /// implementation type when the declared type is a dummy/union type).
    pub fn resolve_by_values<'a>(&'a self, name: &str, args: &[Value], arena: &TypeArena) -> Result<&'a OpEntry> {
        let arg_types = args
            .iter()
            .map(|v| v.dispatch_typ().ok_or_else(|| Error::type_mismatch("untyped argument")))
            .collect::<Result<Vec<_>>>()?;
        self.resolve(name, &arg_types, arena)
    }

    /// All overloads currently registered under `name`.
    pub fn chain(&self, name: &str) -> &[OpEntry] {
        self.chains.get(name).map_or(&[], |v| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeArena;

    fn noop(_args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
        Ok(Value::from_bool(true))
    }

    #[test]
    fn resolves_by_arity_and_type() {
        let arena = TypeArena::with_builtins();
        let mut reg = OperatorRegistry::new();
        reg.register(OpEntry::native("=", vec![Some(arena.integer()), Some(arena.integer())], Some(arena.boolean()), noop));
        reg.register(OpEntry::native("=", vec![Some(arena.string()), Some(arena.string())], Some(arena.boolean()), noop));

        let entry = reg.resolve("=", &[arena.string(), arena.string()], &arena).unwrap();
        assert_eq!(entry.ret(), Some(arena.boolean()));
    }

    #[test]
    fn falls_back_to_variadic_overload() {
        let arena = TypeArena::with_builtins();
        let mut reg = OperatorRegistry::new();
        reg.register(OpEntry::native("format", vec![Some(arena.string())], Some(arena.string()), noop));
        reg.register(OpEntry::variadic("format", Some(arena.string()), noop));

        let entry = reg
            .resolve("format", &[arena.string(), arena.integer(), arena.integer()], &arena)
            .unwrap();
        assert!(matches!(entry.arity(), Arity::Variadic));
    }

    #[test]
    fn arity_match_with_type_mismatch_raises_type_mismatch() {
        let arena = TypeArena::with_builtins();
        let mut reg = OperatorRegistry::new();
        reg.register(OpEntry::native("+", vec![Some(arena.integer()), Some(arena.integer())], Some(arena.integer()), noop));

        let err = reg.resolve("+", &[arena.string(), arena.string()], &arena).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }

    #[test]
    fn unknown_name_raises_operator_not_found() {
        let arena = TypeArena::with_builtins();
        let reg = OperatorRegistry::new();
        let err = reg.resolve("frobnicate", &[], &arena).unwrap_err();
        assert!(matches!(err, Error::OperatorNotFound(_)));
    }
}
