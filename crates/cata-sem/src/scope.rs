//! The scope stack and name lookup.
//!
//! A scope is just a name; the stack dot-joins its frames bottom-to-top to
//! form FQNs. `find_named` searches innermost-outwards then falls back to a
//! verbatim lookup for already-qualified references; it does *not* resolve
//! mid-chain qualified names (`d.e` from inside `a.b.c`).

use crate::symbol::SymbolTable;
use crate::types::{Type, TypeArena, TypeId};

/// A stack of scope frames. The root frame is the empty name.
#[derive(Clone, Debug)]
pub struct ScopeStack {
    frames: Vec<String>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack {
            frames: vec![String::new()],
        }
    }

    pub fn enter(&mut self, name: impl Into<String>) {
        self.frames.push(name.into());
    }

    pub fn leave(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Clear to the root, then enter each dot-separated segment of `fqn`.
    pub fn enter_fqn(&mut self, fqn: &str) {
        self.frames.truncate(1);
        for segment in fqn.split('.') {
            if !segment.is_empty() {
                self.enter(segment);
            }
        }
    }

    pub fn is_root_scope(&self) -> bool {
        self.frames.len() == 1
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The FQN of the current scope with `append` as a trailing name.
    pub fn fqn(&self, append: &str) -> String {
        self.fqn_at(self.frames.len(), append)
    }

    /// The FQN of the current scope itself.
    pub fn current_fqn(&self) -> String {
        self.fqn("")
    }

    /// The FQN formed by the outermost `depth` frames plus `append`.
    fn fqn_at(&self, depth: usize, append: &str) -> String {
        let mut out = String::new();
        for frame in self.frames.iter().take(depth) {
            if frame.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push('.');
            }
            out.push_str(frame);
        }
        if !append.is_empty() {
            if !out.is_empty() {
                out.push('.');
            }
            out.push_str(append);
        }
        out
    }

    /// Whether the current scope is the root or names a namespace symbol.
    pub fn is_root_or_ns_scope(&self, symbols: &SymbolTable, types: &TypeArena) -> bool {
        if self.is_root_scope() {
            return true;
        }
        let key = self.current_fqn();
        match symbols.get(&key) {
            Some(sym) => matches!(types.get(sym.ty), Type::Namespace(_)),
            None => false,
        }
    }

    /// Search, innermost scope outwards, for a symbol named
    /// `<scope>.name`; fall back to `name` verbatim.
    pub fn find_named(&self, symbols: &SymbolTable, name: &str) -> Option<String> {
        for depth in (1..=self.frames.len()).rev() {
            let candidate = self.fqn_at(depth, name);
            if symbols.contains_key(&candidate) {
                return Some(candidate);
            }
        }
        if symbols.contains_key(name) {
            return Some(name.to_string());
        }
        None
    }

    /// Collect every overload sibling of `name`: the base key plus
    /// `` name`1 ``, `` name`2 ``, ... up to the first missing suffix.
    /// Stops at the innermost scope with hits unless `cross_scope`. For any
    /// virtual method found, its overriders across the owning type's
    /// virtual-member set join the candidates.
    pub fn find_overloaded(
        &self,
        symbols: &SymbolTable,
        types: &TypeArena,
        name: &str,
        cross_scope: bool,
    ) -> Vec<String> {
        let mut results: Vec<String> = Vec::new();
        let push = |key: String, results: &mut Vec<String>| {
            if !results.contains(&key) {
                results.push(key);
            }
        };

        for depth in (1..=self.frames.len()).rev() {
            let base = self.fqn_at(depth, name);
            collect_suffixed(symbols, &base, |key| push(key, &mut results));
            if !cross_scope && !results.is_empty() {
                break;
            }
        }
        collect_suffixed(symbols, name, |key| push(key, &mut results));

        // overriders of virtual methods join the candidate set
        let mut extra: Vec<String> = Vec::new();
        for key in &results {
            let Some(sym) = symbols.get(key) else { continue };
            let Type::Function(f) = types.get(sym.ty) else {
                continue;
            };
            let Some(owner) = f.method_of else { continue };
            if !types.is_virtual(owner) {
                continue;
            }
            let short = key.rsplit('.').next().unwrap_or(key.as_str());
            for slot in types.virtual_members_named(owner, crate::member::canonical_name(short)) {
                let fqn = types.member_fqn(slot);
                if symbols.contains_key(&fqn) {
                    extra.push(fqn);
                }
            }
        }
        for key in extra {
            push(key, &mut results);
        }

        results
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// Enter the scope whose symbol holds namespace type `ns_ty`.
    pub fn enter_ns(&mut self, symbols: &SymbolTable, ns_ty: TypeId) {
        let found = symbols
            .iter()
            .find(|(_, sym)| sym.ty == ns_ty)
            .map(|(key, _)| key.clone());
        if let Some(key) = found {
            self.enter_fqn(&key);
        }
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_suffixed(symbols: &SymbolTable, base: &str, mut push: impl FnMut(String)) {
    if !symbols.contains_key(base) {
        return;
    }
    push(base.to_string());
    let mut i = 1;
    loop {
        let key = format!("{base}`{i}");
        if !symbols.contains_key(&key) {
            break;
        }
        push(key);
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbol;
    use cata_common::Span;

    fn table_with(arena: &TypeArena, keys: &[&str]) -> SymbolTable {
        let mut table = SymbolTable::default();
        for key in keys {
            table.insert(key.to_string(), Symbol::new(Span::dummy(), arena.void()));
        }
        table
    }

    #[test]
    fn fqn_joins_frames() {
        let mut scopes = ScopeStack::new();
        assert_eq!(scopes.fqn("x"), "x");
        scopes.enter("a");
        scopes.enter("b");
        assert_eq!(scopes.fqn("x"), "a.b.x");
        assert_eq!(scopes.current_fqn(), "a.b");
        scopes.leave();
        assert_eq!(scopes.fqn("x"), "a.x");
    }

    #[test]
    fn find_named_prefers_innermost() {
        let arena = TypeArena::new();
        let table = table_with(&arena, &["v", "a.v", "a.b.v"]);
        let mut scopes = ScopeStack::new();
        scopes.enter("a");
        scopes.enter("b");
        assert_eq!(scopes.find_named(&table, "v"), Some("a.b.v".to_string()));
        scopes.leave();
        assert_eq!(scopes.find_named(&table, "v"), Some("a.v".to_string()));
    }

    #[test]
    fn find_named_accepts_qualified_names_verbatim() {
        let arena = TypeArena::new();
        let table = table_with(&arena, &["a.b.c"]);
        let scopes = ScopeStack::new();
        assert_eq!(scopes.find_named(&table, "a.b.c"), Some("a.b.c".to_string()));
        // mid-chain resolution is not supported
        let mut nested = ScopeStack::new();
        nested.enter("a");
        assert_eq!(nested.find_named(&table, "b.c"), Some("a.b.c".to_string()));
    }

    #[test]
    fn find_overloaded_collects_suffixes_in_order() {
        let arena = TypeArena::new();
        let table = table_with(&arena, &["f", "f`1", "f`2", "g"]);
        let scopes = ScopeStack::new();
        let found = scopes.find_overloaded(&table, &arena, "f", false);
        assert_eq!(found, vec!["f", "f`1", "f`2"]);
    }

    #[test]
    fn find_overloaded_stops_at_first_missing_suffix() {
        let arena = TypeArena::new();
        let table = table_with(&arena, &["f", "f`2"]);
        let scopes = ScopeStack::new();
        let found = scopes.find_overloaded(&table, &arena, "f", false);
        assert_eq!(found, vec!["f"]);
    }

    #[test]
    fn enter_fqn_resets_to_root() {
        let mut scopes = ScopeStack::new();
        scopes.enter("x");
        scopes.enter_fqn("a.b");
        assert_eq!(scopes.current_fqn(), "a.b");
    }
}
