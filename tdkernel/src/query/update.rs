//! Insert/update/delete propagation through virtual tables (§4.6.5) and the
//! self-referential update rule (§4.6.6).

use crate::context::ExecutionContext;
use crate::error::Error;
use crate::expr::{Expr, ExprKind};
use crate::query::eval::{eval_relation, eval_scalar};
use crate::query::Catalog;
use crate::value::Tuple;
use crate::Result;

/// Inserts `tuple` through `expr`, which may be a base table reference or one
/// of the updatable view shapes in §4.6.5.
pub fn insert_view(expr: &Expr, tuple: &Tuple, catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<()> {
    match expr.kind() {
        ExprKind::TableRef(name) => catalog.insert_tuple(name, tuple),
        ExprKind::Apply { op, args } => match op.as_str() {
            "where" => {
                if !eval_scalar(&args[1], tuple, catalog, ctx)?.as_bool()? {
                    return Err(Error::invalid_argument("inserted tuple does not satisfy the view's where predicate"));
                }
                insert_view(&args[0], tuple, catalog, ctx)
            }
            "project" => {
                let child = eval_relation(&args[0], catalog, ctx)?;
                let given: Vec<&str> = tuple.attr_names().collect();
                let covers_a_key = child.keys().iter().any(|k| k.iter().all(|a| given.contains(&a.as_str())));
                if !covers_a_key {
                    return Err(Error::invalid_argument("project view insert must supply a full candidate key of the underlying relation"));
                }
                insert_view(&args[0], tuple, catalog, ctx)
            }
            "union" => insert_view(&args[0], tuple, catalog, ctx),
            "intersect" => {
                insert_view(&args[0], tuple, catalog, ctx)?;
                insert_view(&args[1], tuple, catalog, ctx)
            }
            "minus" => Err(Error::NotSupported("insert through a minus view is not uniquely defined".to_string())),
            "extend" => {
                let (names, rest) = check_extend_insert(args, tuple, catalog, ctx)?;
                let _ = names;
                insert_view(&args[0], &rest, catalog, ctx)
            }
            other => Err(Error::invalid_argument(format!("view rooted at `{}` is not updatable for insert", other))),
        },
        _ => Err(Error::invalid_argument("expression does not denote an updatable view")),
    }
}

/// Deletes every tuple of `expr`'s extent equal to `tuple`.
pub fn delete_view(expr: &Expr, tuple: &Tuple, catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<()> {
    match expr.kind() {
        ExprKind::TableRef(name) => catalog.delete_tuple(name, tuple),
        ExprKind::Apply { op, args } => match op.as_str() {
            "where" => delete_view(&args[0], tuple, catalog, ctx),
            "project" => {
                let child = eval_relation(&args[0], catalog, ctx)?;
                let names: Vec<&str> = tuple.attr_names().collect();
                for ct in child.tuples() {
                    if &ct.project(&names)? == tuple {
                        delete_view(&args[0], ct, catalog, ctx)?;
                    }
                }
                Ok(())
            }
            "union" | "intersect" => {
                delete_view(&args[0], tuple, catalog, ctx)?;
                delete_view(&args[1], tuple, catalog, ctx)
            }
            "minus" => delete_view(&args[0], tuple, catalog, ctx),
            "extend" => {
                let (names, rest) = check_extend_insert(args, tuple, catalog, ctx)?;
                let _ = names;
                delete_view(&args[0], &rest, catalog, ctx)
            }
            other => Err(Error::invalid_argument(format!("view rooted at `{}` is not updatable for delete", other))),
        },
        _ => Err(Error::invalid_argument("expression does not denote an updatable view")),
    }
}

/// Updates every tuple of `expr`'s extent (optionally restricted by `pred`) by
/// applying `assignments`. Implements §4.6.6: every assignment's right-hand
/// side is evaluated against the pre-update snapshot for every affected
/// tuple before any tuple is actually written back.
pub fn update_view(
    expr: &Expr,
    pred: Option<&Expr>,
    assignments: &[(String, Expr)],
    catalog: &dyn Catalog,
    ctx: &mut ExecutionContext,
) -> Result<usize> {
    let source = eval_relation(expr, catalog, ctx)?;
    let mut pairs: Vec<(Tuple, Tuple)> = Vec::new();
    for t in source.tuples() {
        if let Some(p) = pred {
            if !eval_scalar(p, t, catalog, ctx)?.as_bool()? {
                continue;
            }
        }
        let mut updated = t.clone();
        for (name, rhs) in assignments {
            let v = eval_scalar(rhs, t, catalog, ctx)?;
            updated.set(name.clone(), v);
        }
        if &updated != t {
            pairs.push((t.clone(), updated));
        }
    }

    let count = pairs.len();
    for (old, new) in pairs {
        delete_view(expr, &old, catalog, ctx)?;
        insert_view(expr, &new, catalog, ctx)?;
    }
    Ok(count)
}

/// Validates an `extend(child, expr AS name, ...)` insert/delete target: the
/// extended attributes in `tuple` must equal the extension expressions
/// applied to the remaining attributes, and returns the attribute names
/// together with `tuple` projected back down to the child's heading.
fn check_extend_insert(args: &[Expr], tuple: &Tuple, catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<(Vec<String>, Tuple)> {
    let pairs: Vec<(&str, &Expr)> = args[1..]
        .chunks(2)
        .map(|pair| {
            let name = pair[1].var_name().ok_or_else(|| Error::invalid_argument("extend expects `expr AS name` pairs"))?;
            Ok((name, &pair[0]))
        })
        .collect::<Result<Vec<_>>>()?;

    for (name, e) in &pairs {
        let expected = eval_scalar(e, tuple, catalog, ctx)?;
        let actual = tuple.get(name)?;
        if actual != &expected {
            return Err(Error::invalid_argument(format!(
                "extend view insert/delete requires `{}` to equal the extension expression",
                name
            )));
        }
    }
    let names: Vec<String> = pairs.iter().map(|(n, _)| n.to_string()).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    Ok((names, tuple.project_rest(&name_refs)))
}
