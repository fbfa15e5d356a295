//! The expression graph: literal, table reference, variable reference,
//! tuple-attribute projection, possrep-component projection, and read-only
//! operator application (§4.5).

use std::collections::HashMap;

use crate::error::Error;
use crate::types::{TypeArena, TypeHandle, TypeKind};
use crate::value::Value;
use crate::Result;

/// Optimizer-facing metadata attached to an operator-application node, used by
/// the index planner (§4.6.4). Populated only for `where` nodes over an
/// indexed attribute of a table reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptInfo {
    /// Precomputed bound values for the indexed attributes, in index order.
    pub objv: Vec<Value>,
    /// Names of the indexed attributes the bounds in `objv` apply to, in the
    /// same order (stands in for the source's raw `objpv` pointer vector).
    pub objpv: Vec<String>,
    /// True for an ascending index scan.
    pub asc: bool,
    /// True if every indexed attribute has an equality bound.
    pub all_eq: bool,
    /// An optional upper-bound expression for a one-sided range scan.
    pub stopexp: Option<Box<Expr>>,
}

/// The kind-specific payload of an expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A literal value.
    Literal(Value),
    /// A reference to a named (persistent or local) table, by name. Does not
    /// own the referenced table -- the table is looked up by name at
    /// evaluation time.
    TableRef(String),
    /// A reference to a named local variable.
    VarRef(String),
    /// Projection of a named tuple attribute out of `source`.
    TupleAttr { source: Box<Expr>, name: String },
    /// Projection of a named possrep component out of `source`.
    PossrepComponent { source: Box<Expr>, name: String },
    /// Application of a read-only operator to an argument list.
    Apply { op: String, args: Vec<Expr> },
}

/// One node of the expression graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    kind: ExprKind,
    /// Cached inferred type, once [`Expr::type_of`] has resolved one.
    cached_typ: Option<TypeHandle>,
    /// Optimizer metadata; only ever populated on `Apply` nodes.
    optinfo: Option<OptInfo>,
}

/// The external context an expression consults to infer its type: operator
/// return types, table headings, and local variable types. Implemented by the
/// query engine's evaluation environment.
pub trait TypeContext {
    /// Resolves the return type of applying operator `name` to arguments of
    /// the given types.
    fn resolve_operator_type(&self, name: &str, arg_types: &[TypeHandle]) -> Result<TypeHandle>;
    /// Resolves the heading (relation type) of the named table.
    fn table_type(&self, name: &str) -> Result<TypeHandle>;
    /// Resolves the type of a local variable.
    fn var_type(&self, name: &str) -> Result<TypeHandle>;
    /// The type arena backing every [`TypeHandle`] this context hands out, used
    /// to look inside tuple/relation/scalar types (attribute and possrep
    /// component lookup).
    fn arena(&self) -> &TypeArena;
}

impl Expr {
    fn wrap(kind: ExprKind) -> Self {
        Self {
            kind,
            cached_typ: None,
            optinfo: None,
        }
    }

    /// Constructs a literal-value node.
    pub fn literal(value: Value) -> Self {
        Self::wrap(ExprKind::Literal(value))
    }

    /// Constructs a table-reference node.
    pub fn table_ref(name: impl Into<String>) -> Self {
        Self::wrap(ExprKind::TableRef(name.into()))
    }

    /// Constructs a variable-reference node.
    pub fn var_ref(name: impl Into<String>) -> Self {
        Self::wrap(ExprKind::VarRef(name.into()))
    }

    /// Constructs a tuple-attribute projection node.
    pub fn tuple_attr(source: Expr, name: impl Into<String>) -> Self {
        Self::wrap(ExprKind::TupleAttr {
            source: Box::new(source),
            name: name.into(),
        })
    }

    /// Constructs a possrep-component projection node.
    pub fn possrep_component(source: Expr, name: impl Into<String>) -> Self {
        Self::wrap(ExprKind::PossrepComponent {
            source: Box::new(source),
            name: name.into(),
        })
    }

    /// Constructs an operator-application node.
    pub fn apply(op: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::wrap(ExprKind::Apply { op: op.into(), args })
    }

    /// Equality-comparison convenience, used throughout the query engine to
    /// build `where` predicates (mirrors `RDB_eq`).
    pub fn eq(lhs: Expr, rhs: Expr) -> Self {
        Self::apply("=", vec![lhs, rhs])
    }

    /// The node's kind.
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// The operator name, for `Apply` nodes.
    pub fn op_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Apply { op, .. } => Some(op),
            _ => None,
        }
    }

    /// The argument list, for `Apply` nodes.
    pub fn args(&self) -> Option<&[Expr]> {
        match &self.kind {
            ExprKind::Apply { args, .. } => Some(args),
            _ => None,
        }
    }

    /// Mutable argument list access, for `Apply` nodes.
    pub fn args_mut(&mut self) -> Option<&mut Vec<Expr>> {
        match &mut self.kind {
            ExprKind::Apply { args, .. } => Some(args),
            _ => None,
        }
    }

    /// The variable name, for `VarRef` nodes.
    pub fn var_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::VarRef(name) => Some(name),
            _ => None,
        }
    }

    /// The table name, for `TableRef` nodes.
    pub fn table_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::TableRef(name) => Some(name),
            _ => None,
        }
    }

    /// True iff this is an `Apply` node for operator `name`.
    pub fn is_op(&self, name: &str) -> bool {
        self.op_name() == Some(name)
    }

    /// True iff this is a `TableRef` node.
    pub fn is_table_ref(&self) -> bool {
        matches!(self.kind, ExprKind::TableRef(_))
    }

    /// True iff this node evaluates to a `string`-typed literal (used by the
    /// front-end's pretty-printer to decide on quoting).
    pub fn is_string_literal(&self) -> bool {
        matches!(&self.kind, ExprKind::Literal(v) if v.as_str().is_ok())
    }

    /// Access to an `Apply` node's optimizer metadata.
    pub fn optinfo(&self) -> Option<&OptInfo> {
        self.optinfo.as_ref()
    }

    /// Installs optimizer metadata on an `Apply` node (the index planner,
    /// §4.6.4). No-op on other node kinds.
    pub fn set_optinfo(&mut self, info: OptInfo) {
        if matches!(self.kind, ExprKind::Apply { .. }) {
            self.optinfo = Some(info);
        }
    }

    /// `is_constant`: structurally true iff all leaves are literals.
    pub fn is_constant(&self) -> bool {
        match &self.kind {
            ExprKind::Literal(_) => true,
            ExprKind::TableRef(_) | ExprKind::VarRef(_) => false,
            ExprKind::TupleAttr { source, .. } | ExprKind::PossrepComponent { source, .. } => {
                source.is_constant()
            }
            ExprKind::Apply { args, .. } => args.iter().all(Expr::is_constant),
        }
    }

    /// True iff some `VarRef` node in this expression names `name`.
    pub fn refers_to_var(&self, name: &str) -> bool {
        match &self.kind {
            ExprKind::VarRef(n) => n == name,
            ExprKind::Literal(_) | ExprKind::TableRef(_) => false,
            ExprKind::TupleAttr { source, .. } | ExprKind::PossrepComponent { source, .. } => {
                source.refers_to_var(name)
            }
            ExprKind::Apply { args, .. } => args.iter().any(|a| a.refers_to_var(name)),
        }
    }

    /// True iff some `TableRef` node in this expression names `name`
    /// (`RDB_expr_refers`/`RDB_table_refers`).
    pub fn refers_to_table(&self, name: &str) -> bool {
        match &self.kind {
            ExprKind::TableRef(n) => n == name,
            ExprKind::Literal(_) | ExprKind::VarRef(_) => false,
            ExprKind::TupleAttr { source, .. } | ExprKind::PossrepComponent { source, .. } => {
                source.refers_to_table(name)
            }
            ExprKind::Apply { args, .. } => args.iter().any(|a| a.refers_to_table(name)),
        }
    }

    /// Collects the names of every table this expression's evaluation reads from.
    pub fn referenced_tables(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_table_refs(&mut out);
        out
    }

    fn collect_table_refs(&self, out: &mut Vec<String>) {
        match &self.kind {
            ExprKind::TableRef(n) => {
                if !out.contains(n) {
                    out.push(n.clone());
                }
            }
            ExprKind::Literal(_) | ExprKind::VarRef(_) => {}
            ExprKind::TupleAttr { source, .. } | ExprKind::PossrepComponent { source, .. } => {
                source.collect_table_refs(out)
            }
            ExprKind::Apply { args, .. } => {
                for a in args {
                    a.collect_table_refs(out);
                }
            }
        }
    }

    /// True iff `self`'s evaluation depends on any table that `other` also
    /// refers to -- used by the optimizer to decide evaluation order and by
    /// the catalog to reject circular view definitions.
    pub fn depends_on(&self, other: &Expr) -> bool {
        let mine = self.referenced_tables();
        other.referenced_tables().iter().any(|t| mine.contains(t))
    }

    /// `resolve_varnames`: replaces every `VarRef` node whose name is a key of
    /// `subst` by a deep copy of the corresponding substitution expression.
    pub fn resolve_varnames(&self, subst: &HashMap<String, Expr>) -> Expr {
        match &self.kind {
            ExprKind::VarRef(name) => subst.get(name).cloned().unwrap_or_else(|| self.clone()),
            ExprKind::Literal(_) | ExprKind::TableRef(_) => self.clone(),
            ExprKind::TupleAttr { source, name } => {
                Expr::tuple_attr(source.resolve_varnames(subst), name.clone())
            }
            ExprKind::PossrepComponent { source, name } => {
                Expr::possrep_component(source.resolve_varnames(subst), name.clone())
            }
            ExprKind::Apply { op, args } => {
                Expr::apply(op.clone(), args.iter().map(|a| a.resolve_varnames(subst)).collect())
            }
        }
    }

    /// Deep copy. `Expr` owns its children and optimizer metadata by value, so
    /// `duplicate` is exactly `Clone::clone` (no shared mutable state to race
    /// on, unlike the source's pointer-graph `RDB_dup_expr`).
    pub fn duplicate(&self) -> Expr {
        self.clone()
    }

    /// Lazy type inference. Operator-application nodes consult `ctx` for the
    /// operator's return type; table/variable references consult the catalog
    /// and local environment respectively.
    pub fn type_of(&self, ctx: &dyn TypeContext) -> Result<TypeHandle> {
        if let Some(t) = self.cached_typ {
            return Ok(t);
        }
        match &self.kind {
            ExprKind::Literal(v) => v
                .typ()
                .ok_or_else(|| Error::type_mismatch("literal has no attached type")),
            ExprKind::TableRef(name) => ctx.table_type(name),
            ExprKind::VarRef(name) => ctx.var_type(name),
            ExprKind::TupleAttr { source, name } => {
                let src_typ = source.type_of(ctx)?;
                let arena = ctx.arena();
                let heading = match arena.get(src_typ) {
                    TypeKind::Tuple(_) => src_typ,
                    TypeKind::Relation(r) => r.heading,
                    _ => return Err(Error::type_mismatch("attribute source is not a tuple or relation")),
                };
                match arena.get(heading) {
                    TypeKind::Tuple(t) => t
                        .attr(name)
                        .ok_or_else(|| Error::not_found(format!("no such attribute: {}", name))),
                    _ => unreachable!("heading resolved above is always a tuple type"),
                }
            }
            ExprKind::PossrepComponent { source, name } => {
                let src_typ = source.type_of(ctx)?;
                let arena = ctx.arena();
                match arena.get(src_typ) {
                    TypeKind::Scalar(s) => s
                        .possreps
                        .iter()
                        .flat_map(|p| p.components.iter())
                        .find(|c| &c.name == name)
                        .map(|c| c.typ)
                        .ok_or_else(|| Error::not_found(format!("no such possrep component: {}", name))),
                    _ => Err(Error::type_mismatch("possrep access on a non-scalar value")),
                }
            }
            ExprKind::Apply { op, args } => {
                let arg_types = args
                    .iter()
                    .map(|a| a.type_of(ctx))
                    .collect::<Result<Vec<_>>>()?;
                ctx.resolve_operator_type(op, &arg_types)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_expression_is_detected() {
        let e = Expr::apply("+", vec![Expr::literal(Value::from_int(1)), Expr::literal(Value::from_int(2))]);
        assert!(e.is_constant());
        let e2 = Expr::apply("+", vec![Expr::literal(Value::from_int(1)), Expr::var_ref("x")]);
        assert!(!e2.is_constant());
    }

    #[test]
    fn resolve_varnames_substitutes_deep_copy() {
        let e = Expr::apply("+", vec![Expr::var_ref("x"), Expr::literal(Value::from_int(1))]);
        let mut subst = HashMap::new();
        subst.insert("x".to_string(), Expr::literal(Value::from_int(41)));
        let resolved = e.resolve_varnames(&subst);
        assert!(!resolved.refers_to_var("x"));
        assert!(resolved.is_constant());
    }

    #[test]
    fn refers_to_table_is_recursive() {
        let e = Expr::apply(
            "where",
            vec![Expr::table_ref("emps"), Expr::eq(Expr::var_ref("empno"), Expr::literal(Value::from_int(1)))],
        );
        assert!(e.refers_to_table("emps"));
        assert!(!e.refers_to_table("depts"));
    }

    #[test]
    fn duplicate_is_independent_copy() {
        let e = Expr::literal(Value::from_int(1));
        let d = e.duplicate();
        assert_eq!(e, d);
    }
}
