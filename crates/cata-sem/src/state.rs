//! The mutable compilation state threaded through every pass and emission
//! routine. One `SemState` per session; nothing is process-global.

use cata_common::{DiagnosticSink, Span};
use cata_llir::{Builder, FuncId, Linkage, Module};

use crate::scope::ScopeStack;
use crate::symbol::{Symbol, SymbolTable};
use crate::types::{TypeArena, TypeId};

/// Compilation state: symbol table, scope stack, type arena, diagnostics,
/// and the LLIR builder (which owns the module).
pub struct SemState {
    pub types: TypeArena,
    pub symbols: SymbolTable,
    pub scopes: ScopeStack,
    pub sink: DiagnosticSink,
    pub builder: Builder,
    /// The module init function holding global-variable initialisation.
    pub init_function: FuncId,
    /// Set by a file-level `ns X` declaration marked global.
    pub global_namespace: String,

    // --- locals-pass bookkeeping ---
    pub current_function_fqn: Option<String>,
    pub current_function_has_return: bool,

    // --- emission bookkeeping (used by the emitter crate) ---
    pub current_function: Option<FuncId>,
    pub current_return_slot: Option<cata_llir::ValueId>,
    pub current_return_block: Option<cata_llir::BlockId>,
}

impl SemState {
    pub fn new(module_name: &str) -> Self {
        let mut builder = Builder::new(Module::new(module_name));
        let void = builder.module.types.void();
        let init_ty = builder.module.types.function(void, vec![]);
        let init_function =
            builder
                .module
                .add_function("__CATA_GLOBAL_INIT", init_ty, Linkage::External);
        SemState {
            types: TypeArena::new(),
            symbols: SymbolTable::default(),
            scopes: ScopeStack::new(),
            sink: DiagnosticSink::new(),
            builder,
            init_function,
            global_namespace: String::new(),
            current_function_fqn: None,
            current_function_has_return: false,
            current_function: None,
            current_return_slot: None,
            current_return_block: None,
        }
    }

    // ---- diagnostics ----

    pub fn error(&mut self, message: impl Into<String>, span: Span) {
        let span = if span.is_dummy() { None } else { Some(span) };
        self.sink.error(message, span);
    }

    pub fn error_unanchored(&mut self, message: impl Into<String>) {
        self.sink.error(message, None);
    }

    pub fn info(&mut self, message: impl Into<String>, span: Span) {
        let span = if span.is_dummy() { None } else { Some(span) };
        self.sink.info(message, span);
    }

    pub fn help(&mut self, message: impl Into<String>) {
        self.sink.help(message);
    }

    pub fn num_errors(&self) -> usize {
        self.sink.num_errors()
    }

    // ---- symbols ----

    /// Insert a symbol unless the key already exists; returns whether it
    /// was introduced.
    pub fn try_insert_symbol(&mut self, key: &str, symbol: Symbol) -> bool {
        if self.symbols.contains_key(key) {
            false
        } else {
            self.symbols.insert(key.to_string(), symbol);
            true
        }
    }

    pub fn symbol_type(&self, key: &str) -> Option<TypeId> {
        self.symbols.get(key).map(|s| s.ty)
    }

    /// The custom type enclosing the current scope, when the scope names
    /// one (used to attach `method_of` to methods).
    pub fn enclosing_custom(&self) -> Option<TypeId> {
        let key = self.scopes.current_fqn();
        let sym = self.symbols.get(&key)?;
        if self.types.is_custom(sym.ty) {
            Some(sym.ty)
        } else {
            None
        }
    }

    /// The FQN of `main` for this session, honouring the global namespace.
    pub fn main_fqn(&self) -> String {
        if self.global_namespace.is_empty() {
            "main".to_string()
        } else {
            format!("{}.main", self.global_namespace)
        }
    }

    /// Resolve a named type the way source-level annotations do: builtins
    /// first, then a symbol whose type is custom (yielding an object
    /// handle), else undefined.
    pub fn resolve_named_type(&mut self, name: &str) -> TypeId {
        if let Some(builtin) = self.types.builtin(name) {
            return builtin;
        }
        if let Some(key) = self.scopes.find_named(&self.symbols, name) {
            let ty = self.symbols[&key].ty;
            if self.types.is_custom(ty) {
                return self.types.object(ty);
            }
        }
        self.types.undefined()
    }

    /// Resolve an AST type reference to a semantic type.
    pub fn resolve_type_ref(&mut self, type_ref: &cata_ast::TypeRef) -> TypeId {
        match type_ref {
            cata_ast::TypeRef::Name(qn) => self.resolve_named_type(&qn.to_dotted()),
            cata_ast::TypeRef::Function {
                parameters,
                return_type,
                ..
            } => {
                let ret = self.resolve_type_ref(return_type);
                let params: Vec<TypeId> =
                    parameters.iter().map(|p| self.resolve_type_ref(p)).collect();
                self.types.function(ret, params)
            }
        }
    }

    /// Whether the current scope may hold module-level variables.
    pub fn is_root_or_ns_scope(&self) -> bool {
        self.scopes.is_root_or_ns_scope(&self.symbols, &self.types)
    }
}

impl std::fmt::Debug for SemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemState")
            .field("symbols", &self.symbols.len())
            .field("types", &self.types.type_count())
            .field("errors", &self.sink.num_errors())
            .finish()
    }
}
