//! An ordered set of solvers, looked up by id.

use std::sync::Arc;

use super::{AutoSolver, BacktrackSolver, SolveError, Solver};

/// Solvers in priority order: earlier solvers are tried first.
#[derive(Clone, Default)]
pub struct SolverRegistry {
    solvers: Vec<Arc<dyn Solver>>,
}

impl SolverRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Default::default()
    }

    /// The concrete backends, fastest first.
    pub fn backends() -> Self {
        let mut registry = Self::new();
        #[cfg(feature = "sat")]
        registry.register(super::SatSolver::new());
        registry.register(BacktrackSolver::new());
        registry
    }

    /// [`Self::backends`] followed by an [`AutoSolver`] over them.
    pub fn with_defaults() -> Self {
        let mut registry = Self::backends();
        registry.register(AutoSolver::new(Self::backends()));
        registry
    }

    /// Add `solver` at the lowest priority, replacing any solver with the same id.
    pub fn register(&mut self, solver: impl Solver + 'static) -> &mut Self {
        self.register_shared(Arc::new(solver))
    }

    /// As [`register`](Self::register), for a solver that is already shared.
    pub fn register_shared(&mut self, solver: Arc<dyn Solver>) -> &mut Self {
        self.solvers.retain(|existing| existing.id() != solver.id());
        self.solvers.push(solver);
        self
    }

    /// The solver registered as `id`.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Solver>> {
        self.solvers.iter().find(|solver| solver.id() == id).cloned()
    }

    /// The solver registered as `id`, or [`SolveError::UnknownSolver`].
    pub fn require(&self, id: &str) -> Result<Arc<dyn Solver>, SolveError> {
        self.get(id).ok_or_else(|| SolveError::UnknownSolver(id.to_string()))
    }

    /// Every solver, highest priority first.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Solver>> {
        self.solvers.iter()
    }

    /// Every solver id, highest priority first.
    pub fn ids(&self) -> Vec<&'static str> {
        self.solvers.iter().map(|solver| solver.id()).collect()
    }

    /// Whether no solver is registered.
    pub fn is_empty(&self) -> bool {
        self.solvers.is_empty()
    }
}
