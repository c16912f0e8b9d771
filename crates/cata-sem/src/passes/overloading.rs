//! The overload-renaming pass.
//!
//! Walks every function declaration; when a function's FQN was already
//! assigned, the declaration's identifier gains a `` `N `` suffix (smallest
//! unused N >= 1). Runs before everything else and is idempotent: renamed
//! identifiers never collide again, so a second run renames nothing.

use cata_ast::{Decl, FnBody, Statement, TranslationUnit};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::pass::block_scope_name;
use crate::state::SemState;

#[derive(Default)]
pub struct OverloadingPass {
    names: FxHashSet<String>,
}

impl OverloadingPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename overload siblings in place. Always reports zero changes.
    pub fn run(&mut self, state: &mut SemState, tu: &mut TranslationUnit) -> usize {
        for decl in &mut tu.declarations {
            self.walk_decl(state, decl);
        }
        0
    }

    fn walk_decl(&mut self, state: &mut SemState, decl: &mut Decl) {
        match decl {
            Decl::Fn(d) => {
                let key = state.scopes.fqn(&d.ident.name);
                if !self.names.contains(&key) {
                    self.names.insert(key);
                } else {
                    let mut i = 1;
                    while self.names.contains(&format!("{key}`{i}")) {
                        i += 1;
                    }
                    self.names.insert(format!("{key}`{i}"));
                    debug!(from = %d.ident.name, suffix = i, "renaming overload");
                    d.ident.name = format!("{}`{}", d.ident.name, i);
                }
                state.scopes.enter(&d.ident.name);
                if let Some(FnBody::Block(statements)) = &mut d.body {
                    for stmt in statements {
                        self.walk_stmt(state, stmt);
                    }
                }
                state.scopes.leave();
            }
            Decl::Var(_) => {}
            Decl::Struct(d) => {
                state.scopes.enter(&d.ident.name);
                for inner in &mut d.declarations {
                    self.walk_decl(state, inner);
                }
                state.scopes.leave();
            }
            Decl::Class(d) => {
                state.scopes.enter(&d.ident.name);
                for inner in &mut d.declarations {
                    self.walk_decl(state, inner);
                }
                state.scopes.leave();
            }
            Decl::Iface(d) => {
                state.scopes.enter(&d.ident.name);
                for inner in &mut d.declarations {
                    self.walk_decl(state, inner);
                }
                state.scopes.leave();
            }
            Decl::Ns(d) => {
                state.scopes.enter(&d.ident.name);
                for inner in &mut d.declarations {
                    self.walk_decl(state, inner);
                }
                state.scopes.leave();
            }
        }
    }

    fn walk_stmt(&mut self, state: &mut SemState, stmt: &mut Statement) {
        match stmt {
            Statement::Decl(decl) => self.walk_decl(state, decl),
            Statement::If { then, else_, .. } => {
                self.walk_stmt(state, then);
                if let Some(else_stmt) = else_ {
                    self.walk_stmt(state, else_stmt);
                }
            }
            Statement::Block { statements, span } => {
                state.scopes.enter(block_scope_name(*span));
                for inner in statements {
                    self.walk_stmt(state, inner);
                }
                state.scopes.leave();
            }
            Statement::For { body, .. } => self.walk_stmt(state, body),
            Statement::Expr(_) | Statement::Return { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cata_ast::FnDecl;

    fn unit_with_three_fs() -> TranslationUnit {
        TranslationUnit::new(
            vec![
                Decl::Fn(FnDecl::new("f", vec![], vec![])),
                Decl::Fn(FnDecl::new("f", vec![], vec![])),
                Decl::Fn(FnDecl::new("f", vec![], vec![])),
            ],
            "",
        )
    }

    fn names(tu: &TranslationUnit) -> Vec<&str> {
        tu.declarations
            .iter()
            .map(|d| d.ident().name.as_str())
            .collect()
    }

    #[test]
    fn renames_siblings_with_ordinals() {
        let mut tu = unit_with_three_fs();
        let mut state = SemState::new("t");
        OverloadingPass::new().run(&mut state, &mut tu);
        assert_eq!(names(&tu), vec!["f", "f`1", "f`2"]);
    }

    #[test]
    fn second_run_is_idempotent() {
        let mut tu = unit_with_three_fs();
        let mut state = SemState::new("t");
        let mut pass = OverloadingPass::new();
        pass.run(&mut state, &mut tu);
        let after_first = names(&tu)
            .into_iter()
            .map(str::to_owned)
            .collect::<Vec<_>>();
        let mut second = OverloadingPass::new();
        second.run(&mut state, &mut tu);
        assert_eq!(names(&tu), after_first);
    }

    #[test]
    fn distinct_scopes_do_not_collide() {
        let mut tu = TranslationUnit::new(
            vec![
                Decl::Fn(FnDecl::new("f", vec![], vec![])),
                Decl::Ns(cata_ast::NsDecl {
                    ident: cata_ast::Ident::synthetic("util"),
                    declarations: vec![Decl::Fn(FnDecl::new("f", vec![], vec![]))],
                    is_global: false,
                    classifiers: vec![],
                    span: cata_common::Span::dummy(),
                }),
            ],
            "",
        );
        let mut state = SemState::new("t");
        OverloadingPass::new().run(&mut state, &mut tu);
        let mut seen = vec![];
        for d in &tu.declarations {
            match d {
                Decl::Fn(f) => seen.push(f.ident.name.clone()),
                Decl::Ns(ns) => {
                    for inner in &ns.declarations {
                        seen.push(inner.ident().name.clone());
                    }
                }
                _ => {}
            }
        }
        assert_eq!(seen, vec!["f", "f"]);
    }
}
