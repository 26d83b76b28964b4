//! The driver-facing compilation session.
//!
//! A [`Session`] owns one analysis context and walks it through the phases
//! in order:
//!
//! 1. [`import`](Session::import) interfaces of already compiled modules,
//! 2. [`preanalyze`](Session::preanalyze) parsed modules,
//! 3. [`analyze`](Session::analyze) everything,
//! 4. [`simplify`](Session::simplify) until a round makes no replacement,
//! 5. [`codegen`](Session::codegen) and [`interface`](Session::interface).
//!
//! Calling a phase out of order is an internal error.

use std::rc::Rc;

use futures::future::try_join_all;
use vapc_ast as ast;
use vapc_util::{SourceMap, Symbol};

use crate::analysis::analyze_expr;
use crate::config::SemaConfig;
use crate::context::{run, Sema, Stats, StatsSnapshot};
use crate::error::{SemaError, SemaResult};
use crate::expr::ExprKind;
use crate::ids::ExprId;
use crate::interface::{generate_interface, import_interface, ModuleInterface};
use crate::ir::{module_codegen_ir, IrModule};
use crate::preanalyze::preanalyze_module;
use crate::print::print_stmt;
use crate::simplify::{simplify_expr, SimplifyContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Preanalysis,
    Analyzed,
    Simplifying,
    Fixpoint,
}

pub struct Session {
    cx: Rc<Sema>,
    phase: Phase,
    /// Modules preanalyzed from source, in order
    modules: Vec<ExprId>,
}

impl Session {
    pub fn new(config: SemaConfig) -> SemaResult<Self> {
        config.validate()?;
        Ok(Self {
            cx: Sema::new(config),
            phase: Phase::Preanalysis,
            modules: Vec::new(),
        })
    }

    pub fn context(&self) -> &Rc<Sema> {
        &self.cx
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn expect_phase(&self, allowed: &[Phase], operation: &str) -> SemaResult<()> {
        if allowed.contains(&self.phase) {
            return Ok(());
        }
        Err(SemaError::internal(format!(
            "{operation} is not allowed in phase {:?}",
            self.phase
        )))
    }

    /// Module compiled last; interface and codegen describe this one
    pub fn current_module(&self) -> SemaResult<ExprId> {
        self.modules
            .last()
            .copied()
            .ok_or_else(|| SemaError::internal("no module was preanalyzed"))
    }

    pub fn import(&mut self, interface: &ModuleInterface) -> SemaResult<ExprId> {
        self.expect_phase(&[Phase::Preanalysis], "import")?;
        import_interface(&self.cx, interface)
    }

    pub fn preanalyze(&mut self, module: &ast::Module) -> SemaResult<ExprId> {
        self.expect_phase(&[Phase::Preanalysis], "preanalysis")?;
        let id = preanalyze_module(&self.cx, module)?;
        self.modules.push(id);
        Ok(id)
    }

    pub fn analyze(&mut self) -> SemaResult<()> {
        self.expect_phase(&[Phase::Preanalysis], "analysis")?;
        self.current_module()?;
        let cx = self.cx.clone();
        let modules = self.modules.clone();
        run(async move {
            try_join_all(modules.iter().map(|m| analyze_expr(&cx, *m))).await?;
            Ok(())
        })?;
        self.phase = Phase::Analyzed;
        let stats = self.cx.stats.snapshot();
        log::info!(
            "analysis done: {} expressions, {} statements, {} functions",
            stats.exprs_analyzed,
            stats.stmts_analyzed,
            stats.functions_analyzed
        );
        Ok(())
    }

    /// One simplification round over every module; returns the number of
    /// replacements made
    pub fn simplify(&mut self) -> SemaResult<usize> {
        self.expect_phase(
            &[Phase::Analyzed, Phase::Simplifying, Phase::Fixpoint],
            "simplification",
        )?;
        let sx = SimplifyContext::new(0);
        let (cx, round) = (self.cx.clone(), sx.clone());
        let modules = self.modules.clone();
        let result = run(async move {
            for module in modules {
                simplify_expr(&cx, &round, module).await?;
            }
            Ok(())
        });
        sx.clear();
        result?;

        Stats::bump(&self.cx.stats.simplify_rounds);
        let changes = sx.changes();
        log::info!(
            "simplification round {}: {changes} replacements",
            self.cx.stats.simplify_rounds.get()
        );
        self.phase = if changes == 0 {
            Phase::Fixpoint
        } else {
            Phase::Simplifying
        };
        Ok(changes)
    }

    /// Simplify until a round changes nothing; returns the rounds run
    pub fn simplify_to_fixpoint(&mut self) -> SemaResult<usize> {
        let limit = self.cx.config.max_simplify_rounds;
        for round in 1..=limit {
            if self.simplify()? == 0 {
                return Ok(round);
            }
        }
        Err(SemaError::NoFixpoint { rounds: limit })
    }

    pub fn codegen(&self) -> SemaResult<IrModule> {
        self.expect_phase(&[Phase::Fixpoint], "code generation")?;
        module_codegen_ir(&self.cx, self.current_module()?)
    }

    pub fn interface(&self) -> SemaResult<ModuleInterface> {
        self.expect_phase(
            &[Phase::Analyzed, Phase::Simplifying, Phase::Fixpoint],
            "interface generation",
        )?;
        generate_interface(&self.cx, self.current_module()?)
    }

    /// Every phase for a single module
    pub fn compile(&mut self, module: &ast::Module) -> SemaResult<IrModule> {
        self.preanalyze(module)?;
        self.analyze()?;
        self.simplify_to_fixpoint()?;
        self.codegen()
    }

    pub fn render_error(&self, error: &SemaError, sources: &SourceMap) -> String {
        error.to_diagnostic().render(sources)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.cx.stats.snapshot()
    }

    /// Expression bound to `name` at the top level of the current module
    pub fn lookup(&self, name: &str) -> Option<ExprId> {
        let module = self.modules.last()?;
        let arena = self.cx.arena();
        let scope = match &arena.exprs[*module].kind {
            ExprKind::Module(data) => data.scope,
            _ => return None,
        };
        let symbol = arena.try_get(scope, Symbol::intern(name))?;
        arena.symbols[symbol].expr
    }

    /// Current value of the top-level variable `name`
    pub fn value_of(&self, name: &str) -> Option<ExprId> {
        let declared = self.lookup(name)?;
        let arena = self.cx.arena();
        arena.referent_value(declared).map(|v| arena.resolved(v))
    }

    /// Source-like rendering of the current module
    pub fn print(&self) -> String {
        let Some(module) = self.modules.last() else {
            return String::new();
        };
        let arena = self.cx.arena();
        match &arena.exprs[*module].kind {
            ExprKind::Module(data) => data
                .statements
                .iter()
                .map(|s| print_stmt(&arena, *s))
                .collect(),
            _ => String::new(),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Memoized futures hold the context; drop them to free the arena.
        self.cx.clear_tasks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vapc_ast::build::*;

    #[test]
    fn test_phases_must_run_in_order() {
        let mut session = Session::new(SemaConfig::default()).unwrap();
        assert!(matches!(session.simplify(), Err(SemaError::Internal(_))));
        assert!(matches!(session.codegen(), Err(SemaError::Internal(_))));
        session
            .preanalyze(&module("lib", vec![let_("x", int(1))]))
            .unwrap();
        session.analyze().unwrap();
        assert!(matches!(
            session.preanalyze(&module("other", vec![])),
            Err(SemaError::Internal(_))
        ));
        assert!(matches!(session.codegen(), Err(SemaError::Internal(_))));
        session.simplify_to_fixpoint().unwrap();
        assert_eq!(session.phase(), Phase::Fixpoint);
        assert!(session.codegen().is_ok());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SemaConfig {
            max_simplify_rounds: 0,
            ..SemaConfig::default()
        };
        assert!(matches!(Session::new(config), Err(SemaError::Config(_))));
    }

    #[test]
    fn test_analyze_without_module_fails() {
        let mut session = Session::new(SemaConfig::default()).unwrap();
        assert!(session.analyze().is_err());
    }
}
