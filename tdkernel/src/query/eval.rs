//! Scalar and relational expression evaluation (§4.6.1).

use std::collections::HashSet;

use crate::context::ExecutionContext;
use crate::error::Error;
use crate::expr::{Expr, ExprKind, TypeContext};
use crate::query::tclose::eval_tclose;
use crate::query::Catalog;
use crate::types::{TupleAttr, TypeArena, TypeHandle};
use crate::value::{MaterializedRelation, RelationValue, Tuple, Value, ValueKind};
use crate::Result;

/// Evaluates `expr` in scalar context. `scope` supplies the current row's
/// attribute bindings for operators (`where`, `extend`, ...) evaluating a
/// per-tuple expression; pass an empty tuple outside of such a context.
pub fn eval_scalar(expr: &Expr, scope: &Tuple, catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<Value> {
    match expr.kind() {
        ExprKind::Literal(v) => Ok(v.clone()),
        ExprKind::VarRef(name) => scope
            .try_get(name)
            .cloned()
            .map_or_else(|| catalog.local_var(name), Ok),
        ExprKind::TableRef(name) => {
            let relation = eval_relation(expr, catalog, ctx)?;
            let _ = name;
            Ok(Value::from_relation(RelationValue::Materialized(relation)))
        }
        ExprKind::TupleAttr { source, name } => {
            let v = eval_scalar(source, scope, catalog, ctx)?;
            v.as_tuple()?.get(name).cloned()
        }
        ExprKind::PossrepComponent { source, name } => {
            let v = eval_scalar(source, scope, catalog, ctx)?;
            eval_possrep_component(&v, name)
        }
        ExprKind::Apply { op, args } => {
            if is_relational_op(op) {
                let relation = eval_relation(expr, catalog, ctx)?;
                return Ok(Value::from_relation(RelationValue::Materialized(relation)));
            }
            let arg_values = args
                .iter()
                .map(|a| eval_scalar(a, scope, catalog, ctx))
                .collect::<Result<Vec<_>>>()?;
            let entry = catalog.operators().resolve_by_values(op, &arg_values, catalog.arena())?;
            let ret = entry.ret();
            let mut result = entry.call_native(&arg_values, ctx)?;
            if result.typ().is_none() {
                result.set_typ(ret);
            }
            Ok(result)
        }
    }
}

fn eval_possrep_component(v: &Value, name: &str) -> Result<Value> {
    if let ValueKind::DateTime(dt) = v.kind() {
        return match name {
            "year" => Ok(Value::from_int(dt.year as i64)),
            "month" => Ok(Value::from_int(dt.month as i64)),
            "day" => Ok(Value::from_int(dt.day as i64)),
            "hour" => Ok(Value::from_int(dt.hour as i64)),
            "minute" => Ok(Value::from_int(dt.minute as i64)),
            "second" => Ok(Value::from_int(dt.second as i64)),
            _ => Err(Error::not_found(format!("no such possrep component: {}", name))),
        };
    }
    Err(Error::type_mismatch("possrep access on a value with no possrep components"))
}

fn is_relational_op(op: &str) -> bool {
    matches!(
        op,
        "where"
            | "project"
            | "rename"
            | "union"
            | "minus"
            | "intersect"
            | "join"
            | "extend"
            | "summarize"
            | "group"
            | "ungroup"
            | "wrap"
            | "unwrap"
            | "divide"
            | "semijoin"
            | "semiminus"
            | "tclose"
            | "relation"
    )
}

/// Evaluates `expr` as a relation, materializing the full result (§4.6.1).
pub fn eval_relation(expr: &Expr, catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<MaterializedRelation> {
    match expr.kind() {
        ExprKind::TableRef(name) => {
            let heading = catalog.table_type(name)?;
            let keys = catalog.table_keys(name)?;
            let attrs = crate::query::heading_attrs(heading, catalog)?.into_iter().map(|(n, _)| n).collect();
            let mut rel = MaterializedRelation::new(heading, keys, attrs);
            for tuple in catalog.scan_table(name)? {
                rel.insert(tuple)?;
            }
            Ok(rel)
        }
        ExprKind::VarRef(name) => match catalog.local_var(name)?.as_relation()? {
            RelationValue::Materialized(m) => Ok(m.clone()),
            RelationValue::Virtual(e) => eval_relation(e, catalog, ctx),
        },
        ExprKind::Literal(v) => match v.as_relation()? {
            RelationValue::Materialized(m) => Ok(m.clone()),
            RelationValue::Virtual(e) => eval_relation(e, catalog, ctx),
        },
        ExprKind::Apply { op, args } => eval_op(op, args, catalog, ctx),
        _ => Err(Error::type_mismatch("expression does not denote a relation")),
    }
}

fn eval_op(op: &str, args: &[Expr], catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<MaterializedRelation> {
    match op {
        "relation" => eval_relation_constructor(args, catalog, ctx),
        "where" => eval_where(args, catalog, ctx),
        "project" => eval_project(args, catalog, ctx),
        "rename" => eval_rename(args, catalog, ctx),
        "union" => eval_set_op(args, catalog, ctx, SetOp::Union),
        "intersect" => eval_set_op(args, catalog, ctx, SetOp::Intersect),
        "minus" => eval_set_op(args, catalog, ctx, SetOp::Minus),
        "join" => eval_join(args, catalog, ctx),
        "semijoin" => eval_semi(args, catalog, ctx, true),
        "semiminus" => eval_semi(args, catalog, ctx, false),
        "extend" => eval_extend(args, catalog, ctx),
        "summarize" => eval_summarize(args, catalog, ctx),
        "group" => eval_group(args, catalog, ctx),
        "ungroup" => eval_ungroup(args, catalog, ctx),
        "wrap" => eval_wrap(args, catalog, ctx),
        "unwrap" => eval_unwrap(args, catalog, ctx),
        "divide" => eval_divide(args, catalog, ctx),
        "tclose" => eval_tclose(args, catalog, ctx),
        other => Err(Error::operator_not_found(format!("unknown relational operator `{}`", other))),
    }
}

fn eval_relation_constructor(args: &[Expr], catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<MaterializedRelation> {
    let empty_scope = Tuple::new();
    let tuples = args
        .iter()
        .map(|a| eval_scalar(a, &empty_scope, catalog, ctx).and_then(|v| v.as_tuple().cloned()))
        .collect::<Result<Vec<_>>>()?;

    let first = tuples
        .first()
        .ok_or_else(|| Error::invalid_argument("an empty relation literal needs an explicit heading"))?;
    let attrs: Vec<String> = first.attr_names().map(str::to_string).collect();
    let heading_attrs = first
        .iter()
        .map(|(n, v)| {
            v.typ()
                .map(|typ| TupleAttr { name: Some(n.to_string()), typ })
                .ok_or_else(|| Error::type_mismatch("relation literal element has an untyped attribute"))
        })
        .collect::<Result<Vec<_>>>()?;
    let heading = catalog.arena_new_tuple_type(heading_attrs)?;

    let mut out = MaterializedRelation::new(heading, vec![attrs.clone()], attrs);
    for t in tuples {
        out.insert_if_new(t)?;
    }
    Ok(out)
}

enum SetOp {
    Union,
    Intersect,
    Minus,
}

fn eval_set_op(args: &[Expr], catalog: &dyn Catalog, ctx: &mut ExecutionContext, op: SetOp) -> Result<MaterializedRelation> {
    let lhs = eval_relation(&args[0], catalog, ctx)?;
    let rhs = eval_relation(&args[1], catalog, ctx)?;
    if !catalog.arena().equals(lhs.heading(), rhs.heading()) {
        return Err(Error::type_mismatch("union/intersect/minus require identical headings"));
    }
    let attrs: Vec<String> = lhs.tuples().next().map(|t| t.attr_names().map(str::to_string).collect()).unwrap_or_default();
    let mut out = MaterializedRelation::new(lhs.heading(), lhs.keys().to_vec(), attrs);
    match op {
        SetOp::Union => {
            for t in lhs.tuples().chain(rhs.tuples()) {
                out.insert_if_new(t.clone())?;
            }
        }
        SetOp::Intersect => {
            for t in lhs.tuples() {
                if rhs.contains(t) {
                    out.insert_if_new(t.clone())?;
                }
            }
        }
        SetOp::Minus => {
            for t in lhs.tuples() {
                if !rhs.contains(t) {
                    out.insert_if_new(t.clone())?;
                }
            }
        }
    }
    Ok(out)
}

fn eval_where(args: &[Expr], catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<MaterializedRelation> {
    let source = eval_relation(&args[0], catalog, ctx)?;
    let pred = &args[1];
    let attrs: Vec<String> = source.tuples().next().map(|t| t.attr_names().map(str::to_string).collect()).unwrap_or_default();
    let mut out = MaterializedRelation::new(source.heading(), source.keys().to_vec(), attrs);
    for t in source.tuples() {
        if eval_scalar(pred, t, catalog, ctx)?.as_bool()? {
            out.insert(t.clone())?;
        }
    }
    Ok(out)
}

fn eval_project(args: &[Expr], catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<MaterializedRelation> {
    let source = eval_relation(&args[0], catalog, ctx)?;
    let names: Vec<&str> = args[1..]
        .iter()
        .map(|e| e.var_name().ok_or_else(|| Error::invalid_argument("project expects attribute-name arguments")))
        .collect::<Result<Vec<_>>>()?;
    let new_heading = project_heading(source.heading(), &names, catalog)?;
    let surviving_keys: Vec<Vec<String>> = source
        .keys()
        .iter()
        .filter(|k| k.iter().all(|a| names.contains(&a.as_str())))
        .cloned()
        .collect();
    let keys = if surviving_keys.is_empty() {
        vec![names.iter().map(|s| s.to_string()).collect()]
    } else {
        surviving_keys
    };
    let mut out = MaterializedRelation::new(new_heading, keys, names.iter().map(|s| s.to_string()).collect());
    for t in source.tuples() {
        out.insert_if_new(t.project(&names)?)?;
    }
    Ok(out)
}

fn project_heading(heading: TypeHandle, names: &[&str], catalog: &dyn Catalog) -> Result<TypeHandle> {
    let attrs = crate::query::heading_attrs(heading, catalog)?;
    let kept: Vec<TupleAttr> = attrs
        .into_iter()
        .filter(|(n, _)| names.contains(&n.as_str()))
        .map(|(n, t)| TupleAttr { name: Some(n), typ: t })
        .collect();
    catalog.arena_new_tuple_type(kept)
}

fn eval_rename(args: &[Expr], catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<MaterializedRelation> {
    let source = eval_relation(&args[0], catalog, ctx)?;
    let pairs: Vec<(&str, &str)> = args[1..]
        .chunks(2)
        .map(|pair| {
            let from = pair[0].var_name().ok_or_else(|| Error::invalid_argument("rename expects name pairs"))?;
            let to = pair[1].var_name().ok_or_else(|| Error::invalid_argument("rename expects name pairs"))?;
            Ok((from, to))
        })
        .collect::<Result<Vec<_>>>()?;

    let rename_one = |name: &str| -> String {
        pairs.iter().find(|(from, _)| *from == name).map(|(_, to)| to.to_string()).unwrap_or_else(|| name.to_string())
    };

    let attrs = crate::query::heading_attrs(source.heading(), catalog)?;
    let renamed_attrs: Vec<TupleAttr> = attrs
        .into_iter()
        .map(|(n, t)| TupleAttr { name: Some(rename_one(&n)), typ: t })
        .collect();
    let new_heading = catalog.arena_new_tuple_type(renamed_attrs)?;
    let new_keys: Vec<Vec<String>> =
        source.keys().iter().map(|k| k.iter().map(|n| rename_one(n)).collect()).collect();
    let new_attr_names: Vec<String> = source
        .tuples()
        .next()
        .map(|t| t.attr_names().map(|n| rename_one(n)).collect())
        .unwrap_or_default();
    let mut out = MaterializedRelation::new(new_heading, new_keys, new_attr_names);
    for t in source.tuples() {
        let mut renamed = Tuple::new();
        for (n, v) in t.iter() {
            renamed.set(rename_one(n), v.clone());
        }
        out.insert(renamed)?;
    }
    Ok(out)
}

fn eval_join(args: &[Expr], catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<MaterializedRelation> {
    let lhs = eval_relation(&args[0], catalog, ctx)?;
    let rhs = eval_relation(&args[1], catalog, ctx)?;
    let lhs_attrs: HashSet<String> = lhs.tuples().next().map(|t| t.attr_names().map(str::to_string).collect()).unwrap_or_default();
    let rhs_attrs = crate::query::heading_attrs(rhs.heading(), catalog)?;
    let common: Vec<String> = rhs_attrs.iter().map(|(n, _)| n.clone()).filter(|n| lhs_attrs.contains(n)).collect();

    let mut joined_attrs = crate::query::heading_attrs(lhs.heading(), catalog)?;
    for (n, t) in &rhs_attrs {
        if !common.contains(n) {
            joined_attrs.push((n.clone(), *t));
        }
    }
    let heading = catalog.arena_new_tuple_type(
        joined_attrs.into_iter().map(|(n, t)| TupleAttr { name: Some(n), typ: t }).collect(),
    )?;
    let attr_names: Vec<String> = lhs
        .tuples()
        .next()
        .map(|t| t.attr_names().map(str::to_string).collect())
        .unwrap_or_default();
    let mut out = MaterializedRelation::new(heading, vec![attr_names.clone()], attr_names);
    for lt in lhs.tuples() {
        for rt in rhs.tuples() {
            if lt.agrees_on(rt, &common) {
                out.insert_if_new(lt.merged_with(rt))?;
            }
        }
    }
    Ok(out)
}

fn eval_semi(args: &[Expr], catalog: &dyn Catalog, ctx: &mut ExecutionContext, keep_matching: bool) -> Result<MaterializedRelation> {
    let lhs = eval_relation(&args[0], catalog, ctx)?;
    let rhs = eval_relation(&args[1], catalog, ctx)?;
    let lhs_attrs: Vec<String> = lhs.tuples().next().map(|t| t.attr_names().map(str::to_string).collect()).unwrap_or_default();
    let rhs_attrs: HashSet<String> = crate::query::heading_attrs(rhs.heading(), catalog)?.into_iter().map(|(n, _)| n).collect();
    let common: Vec<String> = lhs_attrs.iter().filter(|n| rhs_attrs.contains(*n)).cloned().collect();

    let mut out = MaterializedRelation::new(lhs.heading(), lhs.keys().to_vec(), lhs_attrs);
    for lt in lhs.tuples() {
        let matched = rhs.tuples().any(|rt| lt.agrees_on(rt, &common));
        if matched == keep_matching {
            out.insert(lt.clone())?;
        }
    }
    Ok(out)
}

/// A [`TypeContext`] that resolves a `VarRef` against a child relation's
/// heading before falling back to the catalog's own local variables, so
/// `extend`'s added attributes can be typed via [`Expr::type_of`] against the
/// heading alone -- a static, data-independent property -- rather than by
/// sampling a tuple (which would drop the added attribute entirely for an
/// empty source relation).
struct RowTypeContext<'a> {
    catalog: &'a dyn Catalog,
    attrs: &'a [(String, TypeHandle)],
}

impl TypeContext for RowTypeContext<'_> {
    fn resolve_operator_type(&self, name: &str, arg_types: &[TypeHandle]) -> Result<TypeHandle> {
        self.catalog.resolve_operator_type(name, arg_types)
    }

    fn table_type(&self, name: &str) -> Result<TypeHandle> {
        self.catalog.table_type(name)
    }

    fn var_type(&self, name: &str) -> Result<TypeHandle> {
        match self.attrs.iter().find(|(n, _)| n == name) {
            Some((_, typ)) => Ok(*typ),
            None => self.catalog.var_type(name),
        }
    }

    fn arena(&self) -> &TypeArena {
        self.catalog.arena()
    }
}

fn eval_extend(args: &[Expr], catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<MaterializedRelation> {
    let source = eval_relation(&args[0], catalog, ctx)?;
    let additions: Vec<(&str, &Expr)> = args[1..]
        .chunks(2)
        .map(|pair| {
            let name = pair[1].var_name().ok_or_else(|| Error::invalid_argument("extend expects `expr AS name` pairs"))?;
            Ok((name, &pair[0]))
        })
        .collect::<Result<Vec<_>>>()?;

    let source_attrs = crate::query::heading_attrs(source.heading(), catalog)?;
    let mut attrs = source_attrs.clone();
    {
        let row_ctx = RowTypeContext { catalog, attrs: &source_attrs };
        for (name, e) in &additions {
            let typ = e.type_of(&row_ctx)?;
            if !attrs.iter().any(|(n, _)| n == name) {
                attrs.push((name.to_string(), typ));
            }
        }
    }
    let attr_names: Vec<String> = attrs.iter().map(|(n, _)| n.clone()).collect();
    let heading = catalog.arena_new_tuple_type(
        attrs.into_iter().map(|(n, t)| TupleAttr { name: Some(n), typ: t }).collect(),
    )?;
    let mut out = MaterializedRelation::new(heading, source.keys().to_vec(), attr_names);
    for t in source.tuples() {
        let mut extended = t.clone();
        for (name, e) in &additions {
            let v = eval_scalar(e, t, catalog, ctx)?;
            extended.set(*name, v);
        }
        out.insert(extended)?;
    }
    Ok(out)
}

/// One `per {K} add f(A) as B` aggregate clause.
struct Aggregate<'a> {
    func: &'a str,
    arg: Option<&'a Expr>,
    name: &'a str,
}

fn eval_summarize(args: &[Expr], catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<MaterializedRelation> {
    let source = eval_relation(&args[0], catalog, ctx)?;
    let per_names: Vec<&str> = args[1]
        .args()
        .ok_or_else(|| Error::invalid_argument("summarize expects a per-attribute list"))?
        .iter()
        .map(|e| e.var_name().ok_or_else(|| Error::invalid_argument("per clause expects attribute names")))
        .collect::<Result<Vec<_>>>()?;

    let aggregates: Vec<Aggregate<'_>> = args[2..]
        .chunks(2)
        .map(|pair| {
            let func_args = pair[0].args();
            let func = pair[0].op_name().ok_or_else(|| Error::invalid_argument("summarize aggregate malformed"))?;
            let arg = func_args.and_then(|a| a.first());
            let name = pair[1].var_name().ok_or_else(|| Error::invalid_argument("summarize aggregate missing `as name`"))?;
            Ok(Aggregate { func, arg, name })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut groups: Vec<(Tuple, Vec<&Tuple>)> = Vec::new();
    for t in source.tuples() {
        let key = t.project(&per_names)?;
        if let Some(group) = groups.iter_mut().find(|(k, _)| k == &key) {
            group.1.push(t);
        } else {
            groups.push((key, vec![t]));
        }
    }

    let per_attrs = crate::query::heading_attrs(project_heading(source.heading(), &per_names, catalog)?, catalog)?;
    let mut attrs = per_attrs;
    let bool_typ = catalog.arena().boolean();
    let int_typ = catalog.arena().integer();
    let float_typ = catalog.arena().float();
    for agg in &aggregates {
        let typ = match agg.func {
            "count" => int_typ,
            "any" | "all" => bool_typ,
            _ => float_typ,
        };
        attrs.push((agg.name.to_string(), typ));
    }
    let heading = catalog.arena_new_tuple_type(
        attrs.into_iter().map(|(n, t)| TupleAttr { name: Some(n), typ: t }).collect(),
    )?;
    let attr_names: Vec<String> = per_names.iter().map(|s| s.to_string()).chain(aggregates.iter().map(|a| a.name.to_string())).collect();
    let keys = vec![per_names.iter().map(|s| s.to_string()).collect::<Vec<_>>()];
    let mut out = MaterializedRelation::new(heading, keys, attr_names);

    for (key, members) in groups {
        let mut result = key;
        for agg in &aggregates {
            let value = compute_aggregate(agg, &members, catalog, ctx)?;
            result.set(agg.name, value);
        }
        out.insert(result)?;
    }
    Ok(out)
}

fn compute_aggregate(agg: &Aggregate<'_>, members: &[&Tuple], catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<Value> {
    match agg.func {
        "count" => Ok(Value::from_int(members.len() as i64)),
        "any" | "all" | "sum" | "avg" | "min" | "max" => {
            let arg = agg.arg.ok_or_else(|| Error::invalid_argument(format!("{} requires an argument", agg.func)))?;
            let values = members
                .iter()
                .map(|t| eval_scalar(arg, t, catalog, ctx))
                .collect::<Result<Vec<_>>>()?;
            match agg.func {
                "any" => Ok(Value::from_bool(values.iter().map(Value::as_bool).collect::<Result<Vec<_>>>()?.iter().any(|b| *b))),
                "all" => Ok(Value::from_bool(values.iter().map(Value::as_bool).collect::<Result<Vec<_>>>()?.iter().all(|b| *b))),
                "sum" => {
                    let total: f64 = values.iter().map(numeric).collect::<Result<Vec<_>>>()?.into_iter().sum();
                    Ok(Value::from_float(total))
                }
                "avg" => {
                    let nums = values.iter().map(numeric).collect::<Result<Vec<_>>>()?;
                    if nums.is_empty() {
                        return Err(Error::AggregateUndefined);
                    }
                    Ok(Value::from_float(nums.iter().sum::<f64>() / nums.len() as f64))
                }
                "min" => {
                    let nums = values.iter().map(numeric).collect::<Result<Vec<_>>>()?;
                    nums.into_iter().fold(None, |acc: Option<f64>, x| Some(acc.map_or(x, |a| a.min(x))))
                        .map(Value::from_float)
                        .ok_or(Error::AggregateUndefined)
                }
                "max" => {
                    let nums = values.iter().map(numeric).collect::<Result<Vec<_>>>()?;
                    nums.into_iter().fold(None, |acc: Option<f64>, x| Some(acc.map_or(x, |a| a.max(x))))
                        .map(Value::from_float)
                        .ok_or(Error::AggregateUndefined)
                }
                _ => unreachable!(),
            }
        }
        other => Err(Error::operator_not_found(format!("unknown aggregate function `{}`", other))),
    }
}

fn numeric(v: &Value) -> Result<f64> {
    v.as_float().or_else(|_| v.as_int().map(|i| i as f64))
}

fn eval_group(args: &[Expr], catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<MaterializedRelation> {
    let source = eval_relation(&args[0], catalog, ctx)?;
    let grouped_names: Vec<&str> = args[1..args.len() - 1]
        .iter()
        .map(|e| e.var_name().ok_or_else(|| Error::invalid_argument("group expects attribute names")))
        .collect::<Result<Vec<_>>>()?;
    let new_attr = args[args.len() - 1]
        .var_name()
        .ok_or_else(|| Error::invalid_argument("group expects the new relation-valued attribute name"))?;

    let remaining_names: Vec<String> = source
        .tuples()
        .next()
        .map(|t| t.attr_names().filter(|n| !grouped_names.contains(n)).map(str::to_string).collect())
        .unwrap_or_default();
    let remaining_refs: Vec<&str> = remaining_names.iter().map(String::as_str).collect();

    let grouped_heading = project_heading(source.heading(), &grouped_names, catalog)?;
    let grouped_rel_typ = catalog.arena_new_relation_type_from_heading(grouped_heading);

    let mut remaining_attrs = crate::query::heading_attrs(source.heading(), catalog)?;
    remaining_attrs.retain(|(n, _)| remaining_refs.contains(&n.as_str()));
    remaining_attrs.push((new_attr.to_string(), grouped_rel_typ));
    let heading = catalog.arena_new_tuple_type(
        remaining_attrs.into_iter().map(|(n, t)| TupleAttr { name: Some(n), typ: t }).collect(),
    )?;

    let mut groups: Vec<(Tuple, Vec<Tuple>)> = Vec::new();
    for t in source.tuples() {
        let key = t.project(&remaining_refs)?;
        let grouped_tuple = t.project(&grouped_names)?;
        if let Some(g) = groups.iter_mut().find(|(k, _)| k == &key) {
            g.1.push(grouped_tuple);
        } else {
            groups.push((key, vec![grouped_tuple]));
        }
    }

    let mut attr_names = remaining_names;
    attr_names.push(new_attr.to_string());
    let mut out = MaterializedRelation::new(heading, vec![attr_names.clone()], attr_names);
    for (key, members) in groups {
        let mut rel = MaterializedRelation::new(
            grouped_heading,
            vec![grouped_names.iter().map(|s| s.to_string()).collect()],
            grouped_names.iter().map(|s| s.to_string()).collect(),
        );
        for m in members {
            rel.insert_if_new(m)?;
        }
        let mut result = key;
        result.set(new_attr, Value::from_relation(RelationValue::Materialized(rel)));
        out.insert(result)?;
    }
    Ok(out)
}

fn eval_ungroup(args: &[Expr], catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<MaterializedRelation> {
    let source = eval_relation(&args[0], catalog, ctx)?;
    let attr = args[1].var_name().ok_or_else(|| Error::invalid_argument("ungroup expects an attribute name"))?;

    let mut out: Option<MaterializedRelation> = None;
    for t in source.tuples() {
        let nested = t.get(attr)?.as_relation()?;
        let nested = match nested {
            RelationValue::Materialized(m) => m.clone(),
            RelationValue::Virtual(e) => eval_relation(e, catalog, ctx)?,
        };
        if out.is_none() {
            let outer_attrs = crate::query::heading_attrs(source.heading(), catalog)?;
            let mut attrs: Vec<_> = outer_attrs.into_iter().filter(|(n, _)| n != attr).collect();
            attrs.extend(crate::query::heading_attrs(nested.heading(), catalog)?);
            let heading = catalog.arena_new_tuple_type(
                attrs.into_iter().map(|(n, t)| TupleAttr { name: Some(n), typ: t }).collect(),
            )?;
            let attr_names: Vec<String> = t.attr_names().filter(|n| *n != attr).map(str::to_string).collect();
            let mut attr_names = attr_names;
            attr_names.extend(nested.tuples().next().map(|nt| nt.attr_names().map(str::to_string).collect::<Vec<_>>()).unwrap_or_default());
            out = Some(MaterializedRelation::new(heading, vec![attr_names.clone()], attr_names));
        }
        let rest = t.project_rest(&[attr]);
        for nt in nested.tuples() {
            out.as_mut().unwrap().insert_if_new(rest.merged_with(nt))?;
        }
    }
    out.ok_or_else(|| Error::invalid_argument("ungroup of an empty relation requires a known heading"))
}

fn eval_wrap(args: &[Expr], catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<MaterializedRelation> {
    let source = eval_relation(&args[0], catalog, ctx)?;
    let wrapped_names: Vec<&str> = args[1..args.len() - 1]
        .iter()
        .map(|e| e.var_name().ok_or_else(|| Error::invalid_argument("wrap expects attribute names")))
        .collect::<Result<Vec<_>>>()?;
    let new_attr = args[args.len() - 1].var_name().ok_or_else(|| Error::invalid_argument("wrap expects the new attribute name"))?;

    let wrapped_heading = project_heading(source.heading(), &wrapped_names, catalog)?;
    let mut remaining_attrs = crate::query::heading_attrs(source.heading(), catalog)?;
    remaining_attrs.retain(|(n, _)| !wrapped_names.contains(&n.as_str()));
    remaining_attrs.push((new_attr.to_string(), wrapped_heading));
    let heading = catalog.arena_new_tuple_type(
        remaining_attrs.into_iter().map(|(n, t)| TupleAttr { name: Some(n), typ: t }).collect(),
    )?;
    let attr_names: Vec<String> = source
        .tuples()
        .next()
        .map(|t| t.attr_names().filter(|n| !wrapped_names.contains(n)).map(str::to_string).collect())
        .unwrap_or_default();
    let mut attr_names = attr_names;
    attr_names.push(new_attr.to_string());
    let mut out = MaterializedRelation::new(heading, vec![attr_names.clone()], attr_names);
    for t in source.tuples() {
        let mut wrapped = t.project_rest(&wrapped_names);
        wrapped.set(new_attr, Value::from_tuple(t.project(&wrapped_names)?));
        out.insert(wrapped)?;
    }
    Ok(out)
}

fn eval_unwrap(args: &[Expr], catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<MaterializedRelation> {
    let source = eval_relation(&args[0], catalog, ctx)?;
    let attr = args[1].var_name().ok_or_else(|| Error::invalid_argument("unwrap expects an attribute name"))?;

    let mut out: Option<MaterializedRelation> = None;
    for t in source.tuples() {
        let inner = t.get(attr)?.as_tuple()?;
        if out.is_none() {
            let outer = crate::query::heading_attrs(source.heading(), catalog)?;
            let inner_typ = outer.iter().find(|(n, _)| n == attr).map(|(_, t)| *t).unwrap();
            let mut attrs: Vec<_> = outer.into_iter().filter(|(n, _)| n != attr).collect();
            attrs.extend(crate::query::heading_attrs(inner_typ, catalog)?);
            let heading = catalog.arena_new_tuple_type(
                attrs.into_iter().map(|(n, t)| TupleAttr { name: Some(n), typ: t }).collect(),
            )?;
            let mut attr_names: Vec<String> = t.attr_names().filter(|n| *n != attr).map(str::to_string).collect();
            attr_names.extend(inner.attr_names().map(str::to_string));
            out = Some(MaterializedRelation::new(heading, vec![attr_names.clone()], attr_names));
        }
        let merged = t.project_rest(&[attr]).merged_with(inner);
        out.as_mut().unwrap().insert_if_new(merged)?;
    }
    out.ok_or_else(|| Error::invalid_argument("unwrap of an empty relation requires a known heading"))
}

fn eval_divide(args: &[Expr], catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<MaterializedRelation> {
    let dividend = eval_relation(&args[0], catalog, ctx)?;
    let divisor = eval_relation(&args[1], catalog, ctx)?;
    let mediator = eval_relation(&args[2], catalog, ctx)?;

    let divisor_attrs: Vec<String> = divisor.tuples().next().map(|t| t.attr_names().map(str::to_string).collect()).unwrap_or_default();
    let dividend_attrs: Vec<String> = dividend.tuples().next().map(|t| t.attr_names().map(str::to_string).collect()).unwrap_or_default();
    let dividend_refs: Vec<&str> = dividend_attrs.iter().map(String::as_str).collect();

    let mut out = MaterializedRelation::new(dividend.heading(), dividend.keys().to_vec(), dividend_attrs.clone());
    'outer: for dt in dividend.tuples() {
        for dv in divisor.tuples() {
            let combined = dt.merged_with(dv);
            let matches_mediator = mediator.tuples().any(|mt| {
                mt.iter().all(|(n, v)| combined.try_get(n).map_or(false, |cv| cv == v))
            });
            if !matches_mediator {
                continue 'outer;
            }
        }
        out.insert_if_new(dt.project(&dividend_refs)?)?;
    }
    Ok(out)
}
