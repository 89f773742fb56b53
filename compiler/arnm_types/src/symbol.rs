//! Lexically scoped symbol table.
//!
//! Each scope is a fixed 64-bucket hash table (FNV-1a over the name bytes)
//! of chained symbols, with a parent link. Lookup walks current → parent →
//! … → global; defining a duplicate in the *current* scope fails.

use crate::pool::{Permission, TypeId};
use arnm_ir::{Name, SharedInterner, Span};

/// Buckets per scope.
pub const SCOPE_BUCKET_COUNT: usize = 64;

/// Handle to a symbol.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct SymbolId(u32);

impl SymbolId {
    #[inline]
    const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SymbolKind {
    Var,
    Fn,
    Actor,
    Type,
    Param,
    Field,
}

impl SymbolKind {
    pub fn describe(self) -> &'static str {
        match self {
            SymbolKind::Var => "variable",
            SymbolKind::Fn => "function",
            SymbolKind::Actor => "actor",
            SymbolKind::Type => "type",
            SymbolKind::Param => "parameter",
            SymbolKind::Field => "field",
        }
    }
}

#[derive(Debug)]
pub struct Symbol {
    pub name: Name,
    pub kind: SymbolKind,
    pub ty: TypeId,
    pub perm: Permission,
    pub span: Span,
    pub is_mutable: bool,
    pub is_defined: bool,
    /// Next symbol in the same bucket chain.
    next: Option<SymbolId>,
}

struct Scope {
    buckets: [Option<SymbolId>; SCOPE_BUCKET_COUNT],
    parent: Option<usize>,
}

/// FNV-1a over the name's bytes.
fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2_166_136_261;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}

/// Scope-chained symbol storage.
///
/// Scopes are never freed individually; the table drops as a unit after
/// analysis, like the type pool it indexes into.
pub struct SymbolTable {
    interner: SharedInterner,
    symbols: Vec<Symbol>,
    scopes: Vec<Scope>,
    /// Index of the current scope in `scopes`.
    current: usize,
}

impl SymbolTable {
    /// Create a table with the global scope already pushed.
    pub fn new(interner: SharedInterner) -> Self {
        let mut table = SymbolTable {
            interner,
            symbols: Vec::with_capacity(64),
            scopes: Vec::with_capacity(8),
            current: 0,
        };
        table.scopes.push(Scope {
            buckets: [None; SCOPE_BUCKET_COUNT],
            parent: None,
        });
        table
    }

    fn bucket_of(&self, name: Name) -> usize {
        let text = self.interner.lookup(name);
        (fnv1a(text.as_bytes()) as usize) % SCOPE_BUCKET_COUNT
    }

    /// Open a nested scope.
    pub fn push_scope(&mut self) {
        let parent = self.current;
        self.scopes.push(Scope {
            buckets: [None; SCOPE_BUCKET_COUNT],
            parent: Some(parent),
        });
        self.current = self.scopes.len() - 1;
    }

    /// Close the current scope. The global scope is never popped.
    pub fn pop_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current].parent {
            self.current = parent;
        }
    }

    /// Nesting depth of the current scope (global = 0).
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut scope = self.current;
        while let Some(parent) = self.scopes[scope].parent {
            depth += 1;
            scope = parent;
        }
        depth
    }

    /// Define a symbol in the current scope.
    ///
    /// Returns `None` if the name already exists in the *current* scope.
    pub fn define(
        &mut self,
        name: Name,
        kind: SymbolKind,
        ty: TypeId,
        span: Span,
    ) -> Option<SymbolId> {
        if self.lookup_current(name).is_some() {
            return None;
        }

        let bucket = self.bucket_of(name);
        let id = SymbolId(self.symbols.len() as u32);
        let head = self.scopes[self.current].buckets[bucket];
        self.symbols.push(Symbol {
            name,
            kind,
            ty,
            perm: Permission::Unknown,
            span,
            is_mutable: false,
            is_defined: true,
            next: head,
        });
        self.scopes[self.current].buckets[bucket] = Some(id);
        Some(id)
    }

    fn lookup_in(&self, scope: usize, name: Name) -> Option<SymbolId> {
        let bucket = self.bucket_of(name);
        let mut cursor = self.scopes[scope].buckets[bucket];
        while let Some(id) = cursor {
            let sym = &self.symbols[id.index()];
            if sym.name == name {
                return Some(id);
            }
            cursor = sym.next;
        }
        None
    }

    /// Look up a name, walking the scope chain outward.
    pub fn lookup(&self, name: Name) -> Option<SymbolId> {
        let mut scope = Some(self.current);
        while let Some(s) = scope {
            if let Some(id) = self.lookup_in(s, name) {
                return Some(id);
            }
            scope = self.scopes[s].parent;
        }
        None
    }

    /// Look up a name in the current scope only.
    pub fn lookup_current(&self, name: Name) -> Option<SymbolId> {
        self.lookup_in(self.current, name)
    }

    /// # Panics
    /// Panics if `id` is stale.
    #[inline]
    #[track_caller]
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    /// # Panics
    /// Panics if `id` is stale.
    #[inline]
    #[track_caller]
    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }
}
