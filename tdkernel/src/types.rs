//! The type system: scalar, tuple, relation, array and operator types.
//!
//! Types live in a [`TypeArena`] and are referred to everywhere else by the `Copy`,
//! index-sized [`TypeHandle`]. This breaks the cyclic ownership the original C
//! implementation has between expressions (which own types, e.g. constraint and init
//! expressions) and types (which own expressions): an arena index can be copied
//! freely without the borrow-checker or a refcount ever having to reason about a
//! cycle (`duro/obj/type.h`, `duro/obj/expression.h`).

use std::collections::HashMap;
use std::sync::Arc;

use crate::expr::Expr;
use crate::value::Value;

/// A `Copy`, hashable reference to a type stored in a [`TypeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle(u32);

impl TypeHandle {
    fn new(index: usize) -> Self {
        Self(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Whether a scalar type's internal representation has a fixed or variable length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReprLen {
    /// Fixed-width representation of the given byte length.
    Fixed(usize),
    /// Variable-length representation (strings, binaries, arrays of variable content).
    Variable,
}

/// One named, typed slot of a possible representation.
#[derive(Debug, Clone, PartialEq)]
pub struct PossRepComponent {
    /// Component name.
    pub name: String,
    /// Component type.
    pub typ: TypeHandle,
}

/// One possible representation ("possrep") of a scalar type.
#[derive(Debug, Clone, PartialEq)]
pub struct PossRep {
    /// Possrep name (by convention, the scalar type's own name for the sole or
    /// principal possrep).
    pub name: String,
    /// Typed, named components.
    pub components: Vec<PossRepComponent>,
}

/// Flags describing a scalar type's provenance and capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScalarFlags {
    /// True for the built-in scalar types (`boolean`, `integer`, `float`, ...).
    pub builtin: bool,
    /// True if the type supports `<`/`<=`/`>`/`>=` via its comparison operator.
    pub ordered: bool,
    /// True if selectors/getters/setters are provided by the system rather than
    /// user-supplied code.
    pub system_implemented: bool,
    /// True for a dummy (union) type: one declared without a possrep, whose
    /// instances carry an implementation-type pointer to a concrete subtype.
    pub dummy: bool,
}

/// A scalar type definition.
#[derive(Debug, Clone)]
pub struct ScalarType {
    /// Type name.
    pub name: String,
    /// Capability/provenance flags.
    pub flags: ScalarFlags,
    /// Name of the operator used to order values of this type, if any.
    pub comparison_op: Option<String>,
    /// Internal representation length.
    pub irep_len: ReprLen,
    /// Zero or more possible representations.
    pub possreps: Vec<PossRep>,
    /// The type this one's physical layout piggy-backs on, if any.
    pub actual_rep: Option<TypeHandle>,
    /// Constraint expression; must evaluate to `true` for every value of the type.
    pub constraint: Option<Arc<Expr>>,
    /// Expression computing the type's initial (default) value.
    pub init_expr: Option<Arc<Expr>>,
    /// The precomputed initial value, if `init_expr` has been evaluated once.
    pub init_value: Option<Value>,
    /// Direct supertypes, as declared.
    pub supertypes: Vec<TypeHandle>,
    /// Direct subtypes, as declared (inverse of `supertypes`).
    pub subtypes: Vec<TypeHandle>,
}

/// One attribute of a tuple type. `name: None` is the generic-tuple-type sentinel:
/// a tuple type with at least one such slot matches any heading providing the
/// remaining named attributes with the declared types (see [`TypeArena::matches`]).
#[derive(Debug, Clone, PartialEq)]
pub struct TupleAttr {
    /// Attribute name, or `None` for a generic wildcard slot.
    pub name: Option<String>,
    /// Attribute type.
    pub typ: TypeHandle,
}

/// A tuple (heading) type: an ordered set of uniquely named attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleType {
    /// Attribute descriptors. Order is preserved for encoding purposes but is not
    /// semantically significant for equality or matching.
    pub attrs: Vec<TupleAttr>,
}

impl TupleType {
    /// True iff at least one attribute lacks a name, making this a generic tuple
    /// type usable only as a type *pattern*.
    pub fn is_generic(&self) -> bool {
        self.attrs.iter().any(|a| a.name.is_none())
    }

    /// Looks up a named attribute's type.
    pub fn attr(&self, name: &str) -> Option<TypeHandle> {
        self.attrs
            .iter()
            .find(|a| a.name.as_deref() == Some(name))
            .map(|a| a.typ)
    }
}

/// A relation type: a tuple type used as a heading.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationType {
    /// Heading (tuple type) of the relation.
    pub heading: TypeHandle,
}

/// An array type: an ordered sequence over a single element type.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    /// Element type.
    pub element: TypeHandle,
}

/// An operator type: parameter types (with wildcard support) plus optional return type.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorType {
    /// Parameter types. `None` at a given position means "matches any type"
    /// (a wildcard parameter).
    pub params: Vec<Option<TypeHandle>>,
    /// Return type; `None` for update (non-read-only) operators.
    pub ret: Option<TypeHandle>,
}

/// The kind-specific payload of a type definition.
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// A scalar type.
    Scalar(ScalarType),
    /// A tuple type.
    Tuple(TupleType),
    /// A relation type.
    Relation(RelationType),
    /// An array type.
    Array(ArrayType),
    /// An operator type.
    Operator(OperatorType),
}

/// An entry in the [`TypeArena`].
#[derive(Debug, Clone)]
pub struct TypeDef {
    kind: TypeKind,
    /// True for locked (e.g. built-in) types, which are never reclaimed even if
    /// nothing externally references them any more.
    locked: bool,
}

/// Owns every type definition the kernel knows about and resolves [`TypeHandle`]s.
///
/// Mutated only under an explicit DDL transaction once past start-up
/// initialization (see §5 of SPEC_FULL.md); callers that need multi-threaded
/// read access should wrap a `TypeArena` in a `RwLock` (see [`crate::registry::Globals`]).
#[derive(Debug, Clone)]
pub struct TypeArena {
    types: Vec<TypeDef>,
    by_name: HashMap<String, TypeHandle>,
    boolean: TypeHandle,
    integer: TypeHandle,
    float: TypeHandle,
    string: TypeHandle,
    binary: TypeHandle,
    datetime: TypeHandle,
    /// Reserved for a future front-end `iostream` pseudo-type; never constructible
    /// as a value, kept so its handle slot is stable once a front-end needs it
    /// (`src/getaction.c`'s `iostream` type is not itself part of the kernel).
    iostream: TypeHandle,
}

fn builtin_scalar(name: &str, ordered: bool, irep_len: ReprLen) -> TypeDef {
    TypeDef {
        kind: TypeKind::Scalar(ScalarType {
            name: name.to_string(),
            flags: ScalarFlags {
                builtin: true,
                ordered,
                system_implemented: true,
                dummy: false,
            },
            comparison_op: if ordered { Some("<".to_string()) } else { None },
            irep_len,
            possreps: Vec::new(),
            actual_rep: None,
            constraint: None,
            init_expr: None,
            init_value: None,
            supertypes: Vec::new(),
            subtypes: Vec::new(),
        }),
        locked: true,
    }
}

impl TypeArena {
    /// Creates a fresh arena pre-populated with the built-in scalar types at
    /// well-known, stable handles.
    pub fn with_builtins() -> Self {
        let mut arena = Self {
            types: Vec::new(),
            by_name: HashMap::new(),
            boolean: TypeHandle(0),
            integer: TypeHandle(0),
            float: TypeHandle(0),
            string: TypeHandle(0),
            binary: TypeHandle(0),
            datetime: TypeHandle(0),
            iostream: TypeHandle(0),
        };
        arena.boolean = arena.push_named("boolean", builtin_scalar("boolean", true, ReprLen::Fixed(1)));
        arena.integer = arena.push_named("integer", builtin_scalar("integer", true, ReprLen::Fixed(8)));
        arena.float = arena.push_named("float", builtin_scalar("float", true, ReprLen::Fixed(8)));
        arena.string = arena.push_named("string", builtin_scalar("string", true, ReprLen::Variable));
        arena.binary = arena.push_named("binary", builtin_scalar("binary", false, ReprLen::Variable));
        arena.datetime = arena.push_named("datetime", builtin_scalar("datetime", true, ReprLen::Fixed(24)));
        arena.iostream = arena.push_named(
            "iostream",
            TypeDef {
                kind: TypeKind::Scalar(ScalarType {
                    name: "iostream".to_string(),
                    flags: ScalarFlags {
                        builtin: true,
                        ordered: false,
                        system_implemented: false,
                        dummy: true,
                    },
                    comparison_op: None,
                    irep_len: ReprLen::Variable,
                    possreps: Vec::new(),
                    actual_rep: None,
                    constraint: None,
                    init_expr: None,
                    init_value: None,
                    supertypes: Vec::new(),
                    subtypes: Vec::new(),
                }),
                locked: true,
            },
        );
        arena
    }

    fn push_named(&mut self, name: &str, def: TypeDef) -> TypeHandle {
        let handle = TypeHandle::new(self.types.len());
        self.types.push(def);
        self.by_name.insert(name.to_string(), handle);
        handle
    }

    /// Handle of the built-in `boolean` type.
    pub fn boolean(&self) -> TypeHandle {
        self.boolean
    }
    /// Handle of the built-in `integer` type.
    pub fn integer(&self) -> TypeHandle {
        self.integer
    }
    /// Handle of the built-in `float` type.
    pub fn float(&self) -> TypeHandle {
        self.float
    }
    /// Handle of the built-in `string` type.
    pub fn string(&self) -> TypeHandle {
        self.string
    }
    /// Handle of the built-in `binary` type.
    pub fn binary(&self) -> TypeHandle {
        self.binary
    }
    /// Handle of the built-in `datetime` type.
    pub fn datetime(&self) -> TypeHandle {
        self.datetime
    }
    /// Handle of the reserved `iostream` pseudo-type.
    pub fn iostream(&self) -> TypeHandle {
        self.iostream
    }

    /// Resolves a type by name.
    pub fn by_name(&self, name: &str) -> Option<TypeHandle> {
        self.by_name.get(name).copied()
    }

    /// Dereferences a handle. Panics on a handle from a different arena; handles
    /// are never handed out by any other `TypeArena`, so this indicates a bug.
    pub fn get(&self, handle: TypeHandle) -> &TypeKind {
        &self.types[handle.index()].kind
    }

    fn get_def(&self, handle: TypeHandle) -> &TypeDef {
        &self.types[handle.index()]
    }

    /// Registers a new scalar type and returns its handle.
    pub fn register_scalar(&mut self, scalar: ScalarType) -> TypeHandle {
        let name = scalar.name.clone();
        self.push_named(
            &name,
            TypeDef {
                kind: TypeKind::Scalar(scalar),
                locked: false,
            },
        )
    }

    /// Constructs (or interns) a tuple type.
    pub fn new_tuple_type(&mut self, attrs: Vec<TupleAttr>) -> crate::Result<TypeHandle> {
        let mut seen = std::collections::HashSet::new();
        for a in &attrs {
            if let Some(name) = &a.name {
                if !seen.insert(name.clone()) {
                    return Err(crate::Error::invalid_argument(format!(
                        "duplicate attribute name `{}` in tuple type",
                        name
                    )));
                }
            }
        }
        Ok(self.push_anonymous(TypeKind::Tuple(TupleType { attrs })))
    }

    /// Constructs a relation type from an explicit heading.
    pub fn new_relation_type(&mut self, attrs: Vec<TupleAttr>) -> crate::Result<TypeHandle> {
        let heading = self.new_tuple_type(attrs)?;
        Ok(self.push_anonymous(TypeKind::Relation(RelationType { heading })))
    }

    /// Constructs a relation type directly from an existing tuple-type handle.
    pub fn new_relation_type_from_heading(&mut self, heading: TypeHandle) -> TypeHandle {
        self.push_anonymous(TypeKind::Relation(RelationType { heading }))
    }

    /// Constructs an array type over `element`.
    pub fn new_array_type(&mut self, element: TypeHandle) -> TypeHandle {
        self.push_anonymous(TypeKind::Array(ArrayType { element }))
    }

    /// Constructs an operator type.
    pub fn new_operator_type(&mut self, params: Vec<Option<TypeHandle>>, ret: Option<TypeHandle>) -> TypeHandle {
        self.push_anonymous(TypeKind::Operator(OperatorType { params, ret }))
    }

    fn push_anonymous(&mut self, kind: TypeKind) -> TypeHandle {
        let handle = TypeHandle::new(self.types.len());
        self.types.push(TypeDef {
            kind,
            locked: false,
        });
        handle
    }

    /// Deep-copies a non-scalar type into a fresh, independently owned arena
    /// entry. Scalar types are shared: their handle is returned unchanged
    /// (`RDB_dup_nonscalar_type`'s "scalars: same pointer, composites: deep copy").
    pub fn dup_nonscalar(&mut self, handle: TypeHandle) -> TypeHandle {
        match self.get(handle).clone() {
            TypeKind::Scalar(_) => handle,
            other => self.push_anonymous(other),
        }
    }

    /// Structural equality: scalar types are equal iff both names are equal;
    /// composite types are equal iff their structure (attribute sets with types,
    /// or element/heading types) is equal.
    pub fn equals(&self, a: TypeHandle, b: TypeHandle) -> bool {
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (TypeKind::Scalar(sa), TypeKind::Scalar(sb)) => sa.name == sb.name,
            (TypeKind::Tuple(ta), TypeKind::Tuple(tb)) => {
                if ta.attrs.len() != tb.attrs.len() {
                    return false;
                }
                ta.attrs.iter().all(|attr| {
                    attr.name.as_ref().map_or(false, |name| {
                        tb.attr(name)
                            .map_or(false, |t| self.equals(attr.typ, t))
                    })
                })
            }
            (TypeKind::Relation(ra), TypeKind::Relation(rb)) => self.equals(ra.heading, rb.heading),
            (TypeKind::Array(aa), TypeKind::Array(ab)) => self.equals(aa.element, ab.element),
            (TypeKind::Operator(oa), TypeKind::Operator(ob)) => {
                oa.params.len() == ob.params.len()
                    && oa
                        .params
                        .iter()
                        .zip(&ob.params)
                        .all(|(pa, pb)| match (pa, pb) {
                            (None, None) => true,
                            (Some(x), Some(y)) => self.equals(*x, *y),
                            _ => false,
                        })
                    && match (oa.ret, ob.ret) {
                        (None, None) => true,
                        (Some(x), Some(y)) => self.equals(x, y),
                        _ => false,
                    }
            }
            _ => false,
        }
    }

    /// `matches(actual, expected)`: for a generic `expected` tuple/relation type,
    /// verifies every named attribute of `expected` exists in `actual` with an
    /// equal type; otherwise falls back to [`TypeArena::subtype_of`].
    pub fn matches(&self, actual: TypeHandle, expected: TypeHandle) -> bool {
        if self.equals(actual, expected) {
            return true;
        }
        match (self.get(actual), self.get(expected)) {
            (TypeKind::Tuple(ta), TypeKind::Tuple(te)) if te.is_generic() => {
                te.attrs.iter().all(|exp_attr| match &exp_attr.name {
                    None => true,
                    Some(name) => ta
                        .attr(name)
                        .map_or(false, |t| self.equals(exp_attr.typ, t)),
                })
            }
            (TypeKind::Relation(ra), TypeKind::Relation(re)) => {
                self.matches(ra.heading, re.heading)
            }
            _ => self.subtype_of(actual, expected),
        }
    }

    /// Direct declared supertypes of `handle` (empty for non-scalar types, or a
    /// scalar type with no declared supertypes).
    fn direct_supertypes(&self, handle: TypeHandle) -> &[TypeHandle] {
        match self.get(handle) {
            TypeKind::Scalar(s) => &s.supertypes,
            _ => &[],
        }
    }

    /// `subtype_of`: the reflexive, transitive closure of the declared supertype
    /// edges.
    pub fn subtype_of(&self, sub: TypeHandle, sup: TypeHandle) -> bool {
        if self.equals(sub, sup) {
            return true;
        }
        let mut stack: Vec<TypeHandle> = self.direct_supertypes(sub).to_vec();
        let mut seen = std::collections::HashSet::new();
        while let Some(t) = stack.pop() {
            if self.equals(t, sup) {
                return true;
            }
            if seen.insert(t) {
                stack.extend(self.direct_supertypes(t).iter().copied());
            }
        }
        false
    }

    /// True iff some scalar type is a subtype of both `a` and `b`. Used as an
    /// operator-resolution feasibility check for dummy/union-typed arguments.
    pub fn shares_subtype(&self, a: TypeHandle, b: TypeHandle) -> bool {
        for (idx, def) in self.types.iter().enumerate() {
            if let TypeKind::Scalar(_) = &def.kind {
                let candidate = TypeHandle::new(idx);
                if self.subtype_of(candidate, a) && self.subtype_of(candidate, b) {
                    return true;
                }
            }
        }
        false
    }

    /// A scalar type is valid when implemented and, if multi-possrep and ordered,
    /// carries a comparison operator.
    pub fn is_valid(&self, handle: TypeHandle) -> bool {
        match self.get(handle) {
            TypeKind::Scalar(s) => {
                if s.flags.dummy {
                    return true;
                }
                if s.possreps.len() > 1 && s.flags.ordered {
                    return s.comparison_op.is_some();
                }
                true
            }
            _ => true,
        }
    }

    /// True for scalar types, including dummy/union scalar types.
    pub fn is_scalar(&self, handle: TypeHandle) -> bool {
        matches!(self.get(handle), TypeKind::Scalar(_))
    }
    /// True for tuple types.
    pub fn is_tuple(&self, handle: TypeHandle) -> bool {
        matches!(self.get(handle), TypeKind::Tuple(_))
    }
    /// True for relation types.
    pub fn is_relation(&self, handle: TypeHandle) -> bool {
        matches!(self.get(handle), TypeKind::Relation(_))
    }
    /// True for array types.
    pub fn is_array(&self, handle: TypeHandle) -> bool {
        matches!(self.get(handle), TypeKind::Array(_))
    }
    /// True for the built-in `integer` and `float` types.
    pub fn is_numeric(&self, handle: TypeHandle) -> bool {
        handle == self.integer || handle == self.float
    }

    /// The type's declared name, for scalar types; `None` for anonymous
    /// composite types.
    pub fn name(&self, handle: TypeHandle) -> Option<&str> {
        match self.get(handle) {
            TypeKind::Scalar(s) => Some(&s.name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtype_is_reflexive_and_transitive() {
        let mut arena = TypeArena::with_builtins();
        let a = arena.register_scalar(ScalarType {
            name: "a".into(),
            flags: ScalarFlags::default(),
            comparison_op: None,
            irep_len: ReprLen::Fixed(1),
            possreps: Vec::new(),
            actual_rep: None,
            constraint: None,
            init_expr: None,
            init_value: None,
            supertypes: Vec::new(),
            subtypes: Vec::new(),
        });
        let b = arena.register_scalar(ScalarType {
            name: "b".into(),
            flags: ScalarFlags::default(),
            comparison_op: None,
            irep_len: ReprLen::Fixed(1),
            possreps: Vec::new(),
            actual_rep: None,
            constraint: None,
            init_expr: None,
            init_value: None,
            supertypes: vec![a],
            subtypes: Vec::new(),
        });
        let c = arena.register_scalar(ScalarType {
            name: "c".into(),
            flags: ScalarFlags::default(),
            comparison_op: None,
            irep_len: ReprLen::Fixed(1),
            possreps: Vec::new(),
            actual_rep: None,
            constraint: None,
            init_expr: None,
            init_value: None,
            supertypes: vec![b],
            subtypes: Vec::new(),
        });
        assert!(arena.subtype_of(a, a));
        assert!(arena.subtype_of(b, a));
        assert!(arena.subtype_of(c, a));
        assert!(!arena.subtype_of(a, c));
    }

    #[test]
    fn generic_tuple_matches_by_named_subset() {
        let mut arena = TypeArena::with_builtins();
        let int = arena.integer();
        let string = arena.string();
        let actual = arena
            .new_tuple_type(vec![
                TupleAttr { name: Some("a".into()), typ: int },
                TupleAttr { name: Some("b".into()), typ: string },
            ])
            .unwrap();
        let expected = arena
            .new_tuple_type(vec![
                TupleAttr { name: Some("a".into()), typ: int },
                TupleAttr { name: None, typ: int },
            ])
            .unwrap();
        assert!(arena.matches(actual, expected));
    }

    #[test]
    fn duplicate_attribute_name_rejected() {
        let mut arena = TypeArena::with_builtins();
        let int = arena.integer();
        let err = arena
            .new_tuple_type(vec![
                TupleAttr { name: Some("a".into()), typ: int },
                TupleAttr { name: Some("a".into()), typ: int },
            ])
            .unwrap_err();
        assert_eq!(err, crate::Error::invalid_argument("duplicate attribute name `a` in tuple type"));
    }
}
