//! Unification over the type pool.

use crate::pool::{TypeId, TypeKind, TypePool};

impl TypePool {
    /// Structural equality after resolution. Actors and structs compare
    /// nominally, variables by id, primitives by kind.
    pub fn equals(&self, a: TypeId, b: TypeId) -> bool {
        let a = self.resolve(a);
        let b = self.resolve(b);
        if a == b {
            return true;
        }
        match (self.kind(a), self.kind(b)) {
            (TypeKind::Var { id: ia, .. }, TypeKind::Var { id: ib, .. }) => ia == ib,
            (
                TypeKind::Fn {
                    params: pa,
                    ret: ra,
                },
                TypeKind::Fn {
                    params: pb,
                    ret: rb,
                },
            ) => {
                pa.len() == pb.len()
                    && self.equals(*ra, *rb)
                    && pa.iter().zip(pb.iter()).all(|(&x, &y)| self.equals(x, y))
            }
            (TypeKind::Array(ea), TypeKind::Array(eb)) => self.equals(*ea, *eb),
            (TypeKind::Optional(ia), TypeKind::Optional(ib)) => self.equals(*ia, *ib),
            (TypeKind::Actor { name: na, .. }, TypeKind::Actor { name: nb, .. })
            | (TypeKind::Struct { name: na, .. }, TypeKind::Struct { name: nb, .. }) => na == nb,
            (ka, kb) => std::mem::discriminant(ka) == std::mem::discriminant(kb),
        }
    }

    /// Does variable `var_id` occur in `ty`? Prevents infinite types.
    fn occurs_in(&self, var_id: u32, ty: TypeId) -> bool {
        let ty = self.resolve(ty);
        match self.kind(ty) {
            TypeKind::Var { id, .. } => *id == var_id,
            TypeKind::Fn { params, ret } => {
                params.iter().any(|&p| self.occurs_in(var_id, p)) || self.occurs_in(var_id, *ret)
            }
            TypeKind::Array(elem) => self.occurs_in(var_id, *elem),
            TypeKind::Optional(inner) => self.occurs_in(var_id, *inner),
            _ => false,
        }
    }

    /// Unify two types, binding variables as needed. Returns `false` on
    /// mismatch; the caller reports the diagnostic.
    pub fn unify(&mut self, a: TypeId, b: TypeId) -> bool {
        let a = self.resolve(a);
        let b = self.resolve(b);

        if a == b {
            return true;
        }

        // Error unifies with anything, so one reported failure does not
        // cascade.
        if matches!(self.kind(a), TypeKind::Error) || matches!(self.kind(b), TypeKind::Error) {
            return true;
        }

        // Variable binding, occurs-checked.
        if let TypeKind::Var { id, .. } = *self.kind(a) {
            if let TypeKind::Var { id: other, .. } = *self.kind(b) {
                if id == other {
                    return true;
                }
            }
            if self.occurs_in(id, b) {
                return false; // infinite type
            }
            self.bind_var(a, b);
            return true;
        }
        if let TypeKind::Var { id, .. } = *self.kind(b) {
            if self.occurs_in(id, a) {
                return false;
            }
            self.bind_var(b, a);
            return true;
        }

        match (self.kind(a), self.kind(b)) {
            (
                TypeKind::Fn {
                    params: pa,
                    ret: ra,
                },
                TypeKind::Fn {
                    params: pb,
                    ret: rb,
                },
            ) => {
                if pa.len() != pb.len() {
                    return false;
                }
                let pa = pa.clone();
                let pb = pb.clone();
                let (ra, rb) = (*ra, *rb);
                for (x, y) in pa.into_iter().zip(pb) {
                    if !self.unify(x, y) {
                        return false;
                    }
                }
                self.unify(ra, rb)
            }
            (TypeKind::Array(ea), TypeKind::Array(eb)) => {
                let (ea, eb) = (*ea, *eb);
                self.unify(ea, eb)
            }
            (TypeKind::Optional(ia), TypeKind::Optional(ib)) => {
                let (ia, ib) = (*ia, *ib);
                self.unify(ia, ib)
            }
            (TypeKind::Actor { .. }, TypeKind::Actor { .. })
            | (TypeKind::Struct { .. }, TypeKind::Struct { .. }) => self.equals(a, b),
            (ka, kb) => std::mem::discriminant(ka) == std::mem::discriminant(kb),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arnm_ir::SharedInterner;

    #[test]
    fn primitives_unify_by_kind() {
        let mut pool = TypePool::new();
        assert!(pool.unify(TypeId::I32, TypeId::I32));
        assert!(!pool.unify(TypeId::I32, TypeId::BOOL));
        assert!(!pool.unify(TypeId::I32, TypeId::I64));
    }

    #[test]
    fn var_binds_to_concrete() {
        let mut pool = TypePool::new();
        let v = pool.fresh_var();
        assert!(pool.unify(v, TypeId::I32));
        assert_eq!(pool.resolve(v), TypeId::I32);
        // Once bound, the variable behaves as its instance.
        assert!(pool.unify(v, TypeId::I32));
        assert!(!pool.unify(v, TypeId::BOOL));
    }

    #[test]
    fn var_to_var_binding() {
        let mut pool = TypePool::new();
        let a = pool.fresh_var();
        let b = pool.fresh_var();
        assert!(pool.unify(a, b));
        assert!(pool.unify(b, TypeId::STRING));
        assert_eq!(pool.resolve(a), TypeId::STRING);
    }

    #[test]
    fn var_never_binds_to_itself() {
        let mut pool = TypePool::new();
        let v = pool.fresh_var();
        assert!(pool.unify(v, v));
        // Still unbound afterwards.
        assert!(matches!(
            pool.kind(pool.resolve(v)),
            TypeKind::Var { instance: None, .. }
        ));
    }

    #[test]
    fn occurs_check_rejects_infinite_type() {
        let mut pool = TypePool::new();
        let v = pool.fresh_var();
        let arr = pool.array(v);
        assert!(!pool.unify(v, arr));
    }

    #[test]
    fn error_absorbs_everything() {
        let mut pool = TypePool::new();
        assert!(pool.unify(TypeId::ERROR, TypeId::I32));
        assert!(pool.unify(TypeId::BOOL, TypeId::ERROR));
        let f = pool.fn_type(vec![TypeId::I32], TypeId::UNIT);
        assert!(pool.unify(f, TypeId::ERROR));
    }

    #[test]
    fn fn_unifies_elementwise() {
        let mut pool = TypePool::new();
        let v = pool.fresh_var();
        let f1 = pool.fn_type(vec![TypeId::I32, v], TypeId::BOOL);
        let f2 = pool.fn_type(vec![TypeId::I32, TypeId::STRING], TypeId::BOOL);
        assert!(pool.unify(f1, f2));
        assert_eq!(pool.resolve(v), TypeId::STRING);

        let g = pool.fn_type(vec![TypeId::I32], TypeId::BOOL);
        assert!(!pool.unify(f1, g), "arity mismatch must fail");
    }

    #[test]
    fn actors_are_nominal() {
        let interner = SharedInterner::new();
        let mut pool = TypePool::new();
        let a1 = pool.actor(interner.intern("Counter"));
        let a2 = pool.actor(interner.intern("Counter"));
        let b = pool.actor(interner.intern("Logger"));
        assert!(pool.unify(a1, a2));
        assert!(!pool.unify(a1, b));
    }

    #[test]
    fn array_and_optional_unify_inner() {
        let mut pool = TypePool::new();
        let v = pool.fresh_var();
        let arr_v = pool.array(v);
        let arr_i = pool.array(TypeId::I32);
        assert!(pool.unify(arr_v, arr_i));
        assert_eq!(pool.resolve(v), TypeId::I32);

        let o1 = pool.optional(TypeId::BOOL);
        let o2 = pool.optional(TypeId::I32);
        assert!(!pool.unify(o1, o2));
    }

    #[test]
    fn permissions_do_not_affect_unification() {
        let mut pool = TypePool::new();
        let shared_i32 = pool.with_perm(TypeId::I32, crate::Permission::Shared);
        assert!(pool.unify(shared_i32, TypeId::I32));
    }
}
