//! The type pool: handle-indexed storage for every type in a compilation.

use arnm_ir::{Name, StringInterner};
use std::fmt::Write as _;

/// Cycle break for `resolve`: a variable chain longer than this is a bug,
/// not a program.
pub const MAX_RESOLVE_DEPTH: usize = 1000;

/// Handle into the [`TypePool`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypeId(u32);

impl TypeId {
    pub const UNKNOWN: TypeId = TypeId(0);
    pub const ERROR: TypeId = TypeId(1);
    pub const UNIT: TypeId = TypeId(2);
    pub const BOOL: TypeId = TypeId(3);
    pub const I32: TypeId = TypeId(4);
    pub const I64: TypeId = TypeId(5);
    pub const F32: TypeId = TypeId(6);
    pub const F64: TypeId = TypeId(7);
    pub const STRING: TypeId = TypeId(8);
    pub const CHAR: TypeId = TypeId(9);
    pub const PROCESS: TypeId = TypeId(10);

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Permission annotation carried by every type.
///
/// Metadata only: unification never compares permissions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Permission {
    /// Owned, movable, not shareable.
    Unique,
    /// Reference counted, read-only.
    Shared,
    /// Deeply immutable, freely copyable.
    Immutable,
    #[default]
    Unknown,
}

/// A named field of an actor or struct.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Field {
    pub name: Name,
    pub ty: TypeId,
}

/// Type structure.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum TypeKind {
    Unknown,
    /// Unifies with anything; stops error cascades.
    Error,
    Unit,
    Bool,
    I32,
    I64,
    F32,
    F64,
    String,
    Char,
    /// Process handle (spawn result).
    Process,
    /// Inference variable. `instance` is set at most once, by unification,
    /// and never to the variable itself.
    Var {
        id: u32,
        instance: Option<TypeId>,
    },
    Fn {
        params: Vec<TypeId>,
        ret: TypeId,
    },
    /// Nominal: compared by name.
    Actor {
        name: Name,
        fields: Vec<Field>,
    },
    /// Nominal: compared by name.
    Struct {
        name: Name,
        fields: Vec<Field>,
    },
    Array(TypeId),
    Optional(TypeId),
}

struct TypeData {
    kind: TypeKind,
    perm: Permission,
}

/// Storage for all types of a compilation, dropped as a unit.
pub struct TypePool {
    types: Vec<TypeData>,
    next_var_id: u32,
}

impl TypePool {
    /// Create a pool with the primitive singletons pre-seeded at their
    /// fixed `TypeId` constants.
    pub fn new() -> Self {
        let mut pool = TypePool {
            types: Vec::with_capacity(64),
            next_var_id: 0,
        };
        // Order must match the TypeId constants above.
        pool.push(TypeKind::Unknown, Permission::Unknown);
        pool.push(TypeKind::Error, Permission::Unknown);
        pool.push(TypeKind::Unit, Permission::Unknown);
        pool.push(TypeKind::Bool, Permission::Unknown);
        pool.push(TypeKind::I32, Permission::Unknown);
        pool.push(TypeKind::I64, Permission::Unknown);
        pool.push(TypeKind::F32, Permission::Unknown);
        pool.push(TypeKind::F64, Permission::Unknown);
        pool.push(TypeKind::String, Permission::Unknown);
        pool.push(TypeKind::Char, Permission::Unknown);
        // Process handles default to Unique.
        pool.push(TypeKind::Process, Permission::Unique);
        pool
    }

    fn push(&mut self, kind: TypeKind, perm: Permission) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeData { kind, perm });
        id
    }

    // ── Constructors ─────────────────────────────────────────────────────

    /// Allocate a fresh unbound type variable.
    pub fn fresh_var(&mut self) -> TypeId {
        let id = self.next_var_id;
        self.next_var_id += 1;
        self.push(
            TypeKind::Var { id, instance: None },
            Permission::Unknown,
        )
    }

    /// Function types are immutable by default.
    pub fn fn_type(&mut self, params: Vec<TypeId>, ret: TypeId) -> TypeId {
        self.push(TypeKind::Fn { params, ret }, Permission::Immutable)
    }

    pub fn array(&mut self, elem: TypeId) -> TypeId {
        self.push(TypeKind::Array(elem), Permission::Unknown)
    }

    pub fn optional(&mut self, inner: TypeId) -> TypeId {
        let perm = self.perm(inner);
        self.push(TypeKind::Optional(inner), perm)
    }

    pub fn actor(&mut self, name: Name) -> TypeId {
        self.push(
            TypeKind::Actor {
                name,
                fields: Vec::new(),
            },
            Permission::Unknown,
        )
    }

    pub fn struct_type(&mut self, name: Name) -> TypeId {
        self.push(
            TypeKind::Struct {
                name,
                fields: Vec::new(),
            },
            Permission::Unknown,
        )
    }

    /// Clone a type with a different permission.
    pub fn with_perm(&mut self, ty: TypeId, perm: Permission) -> TypeId {
        let ty = self.resolve(ty);
        if self.perm(ty) == perm {
            return ty;
        }
        let kind = self.kind(ty).clone();
        self.push(kind, perm)
    }

    // ── Accessors ────────────────────────────────────────────────────────

    /// # Panics
    /// Panics if `ty` is out of bounds.
    #[inline]
    #[track_caller]
    pub fn kind(&self, ty: TypeId) -> &TypeKind {
        &self.types[ty.index()].kind
    }

    #[inline]
    pub fn perm(&self, ty: TypeId) -> Permission {
        self.types[ty.index()].perm
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        false // primitives are always present
    }

    /// Populate an actor's field table (done once, during analysis pass 2).
    pub fn set_actor_fields(&mut self, ty: TypeId, new_fields: Vec<Field>) {
        if let TypeKind::Actor { fields, .. } = &mut self.types[ty.index()].kind {
            *fields = new_fields;
        }
    }

    /// Populate a struct's field table.
    pub fn set_struct_fields(&mut self, ty: TypeId, new_fields: Vec<Field>) {
        if let TypeKind::Struct { fields, .. } = &mut self.types[ty.index()].kind {
            *fields = new_fields;
        }
    }

    /// Fields of a resolved actor or struct type; empty for anything else.
    pub fn fields(&self, ty: TypeId) -> &[Field] {
        match self.kind(ty) {
            TypeKind::Actor { fields, .. } | TypeKind::Struct { fields, .. } => fields,
            _ => &[],
        }
    }

    /// Ordinal of a field within an actor/struct field list.
    pub fn field_index(&self, ty: TypeId, name: Name) -> Option<usize> {
        self.fields(ty).iter().position(|f| f.name == name)
    }

    // ── Resolution ───────────────────────────────────────────────────────

    /// Chase `Var.instance` links to a non-variable type or an unbound
    /// variable. Caps at [`MAX_RESOLVE_DEPTH`] hops; observable only on
    /// compiler bugs.
    pub fn resolve(&self, mut ty: TypeId) -> TypeId {
        for _ in 0..MAX_RESOLVE_DEPTH {
            match self.kind(ty) {
                TypeKind::Var {
                    instance: Some(next),
                    ..
                } => ty = *next,
                _ => return ty,
            }
        }
        ty
    }

    /// Bind an unbound variable. Callers guarantee `var` resolves to an
    /// unbound `Var` and `target` is not the same variable.
    pub(crate) fn bind_var(&mut self, var: TypeId, target: TypeId) {
        if let TypeKind::Var { instance, .. } = &mut self.types[var.index()].kind {
            debug_assert!(instance.is_none(), "type variable bound twice");
            *instance = Some(target);
        }
    }

    /// Whether the type still contains unbound variables.
    pub fn has_free_vars(&self, ty: TypeId) -> bool {
        let ty = self.resolve(ty);
        match self.kind(ty) {
            TypeKind::Var { .. } => true,
            TypeKind::Fn { params, ret } => {
                params.iter().any(|&p| self.has_free_vars(p)) || self.has_free_vars(*ret)
            }
            TypeKind::Array(elem) => self.has_free_vars(*elem),
            TypeKind::Optional(inner) => self.has_free_vars(*inner),
            _ => false,
        }
    }

    // ── Display ──────────────────────────────────────────────────────────

    /// Render a type for diagnostics.
    pub fn display(&self, ty: TypeId, interner: &StringInterner) -> String {
        let mut out = String::new();
        self.write_type(&mut out, ty, interner);
        out
    }

    fn write_type(&self, out: &mut String, ty: TypeId, interner: &StringInterner) {
        let ty = self.resolve(ty);
        match self.kind(ty) {
            TypeKind::Unknown => out.push_str("unknown"),
            TypeKind::Error => out.push_str("<error>"),
            TypeKind::Unit => out.push_str("()"),
            TypeKind::Bool => out.push_str("bool"),
            TypeKind::I32 => out.push_str("i32"),
            TypeKind::I64 => out.push_str("i64"),
            TypeKind::F32 => out.push_str("f32"),
            TypeKind::F64 => out.push_str("f64"),
            TypeKind::String => out.push_str("string"),
            TypeKind::Char => out.push_str("char"),
            TypeKind::Process => out.push_str("Process"),
            TypeKind::Var { id, .. } => {
                let _ = write!(out, "t{id}");
            }
            TypeKind::Fn { params, ret } => {
                out.push_str("fn(");
                for (i, &p) in params.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_type(out, p, interner);
                }
                out.push_str(") -> ");
                self.write_type(out, *ret, interner);
            }
            TypeKind::Actor { name, .. } | TypeKind::Struct { name, .. } => {
                out.push_str(interner.lookup(*name));
            }
            TypeKind::Array(elem) => {
                out.push('[');
                self.write_type(out, *elem, interner);
                out.push(']');
            }
            TypeKind::Optional(inner) => {
                self.write_type(out, *inner, interner);
                out.push('?');
            }
        }
    }
}

impl Default for TypePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arnm_ir::SharedInterner;

    #[test]
    fn primitives_at_fixed_ids() {
        let pool = TypePool::new();
        assert!(matches!(pool.kind(TypeId::I32), TypeKind::I32));
        assert!(matches!(pool.kind(TypeId::BOOL), TypeKind::Bool));
        assert!(matches!(pool.kind(TypeId::ERROR), TypeKind::Error));
        assert_eq!(pool.perm(TypeId::PROCESS), Permission::Unique);
    }

    #[test]
    fn fn_types_are_immutable() {
        let mut pool = TypePool::new();
        let f = pool.fn_type(vec![TypeId::I32], TypeId::UNIT);
        assert_eq!(pool.perm(f), Permission::Immutable);
    }

    #[test]
    fn resolve_chases_instances() {
        let mut pool = TypePool::new();
        let a = pool.fresh_var();
        let b = pool.fresh_var();
        pool.bind_var(a, b);
        pool.bind_var(b, TypeId::I64);
        assert_eq!(pool.resolve(a), TypeId::I64);
    }

    #[test]
    fn free_vars() {
        let mut pool = TypePool::new();
        let v = pool.fresh_var();
        let f = pool.fn_type(vec![v], TypeId::UNIT);
        assert!(pool.has_free_vars(f));
        pool.bind_var(v, TypeId::I32);
        assert!(!pool.has_free_vars(f));
    }

    #[test]
    fn display_compound() {
        let interner = SharedInterner::new();
        let mut pool = TypePool::new();
        let arr = pool.array(TypeId::I32);
        let opt = pool.optional(arr);
        let f = pool.fn_type(vec![opt], TypeId::BOOL);
        assert_eq!(pool.display(f, &interner), "fn([i32]?) -> bool");
    }

    #[test]
    fn field_lookup() {
        let interner = SharedInterner::new();
        let mut pool = TypePool::new();
        let name = interner.intern("Counter");
        let count = interner.intern("count");
        let actor = pool.actor(name);
        pool.set_actor_fields(
            actor,
            vec![Field {
                name: count,
                ty: TypeId::I32,
            }],
        );
        assert_eq!(pool.field_index(actor, count), Some(0));
        assert_eq!(pool.field_index(actor, interner.intern("missing")), None);
    }
}
