#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use itertools::Itertools;

    use crate::rules::{CellCountRule, ConnectAllRule, NoLoopsRule};
    #[cfg(feature = "sat")]
    use crate::solver::SatSolver;
    use crate::solver::{
        AutoSolver, BacktrackSolver, CancellationToken, Candidate, SolveError, Solutions, Solver, SolverRegistry,
    };
    use crate::symbols::{AreaNumberSymbol, MinesweeperSymbol};
    use crate::{validate_grid, Anchor, Color, Grid, Instruction, Location, Rule, State, Symbol, Verdict, WrapMode};

    /// Every grid a stream yields before it reports exhaustion. Panics if it ends without doing so.
    fn drain(solutions: Solutions) -> Vec<Grid> {
        let mut found = Vec::new();
        for candidate in solutions {
            match candidate {
                Candidate::Found(grid) => found.push(grid),
                Candidate::NoMoreSolutions => return found,
            }
        }
        panic!("stream ended without reporting exhaustion");
    }

    fn sorted(verdict: &Verdict) -> Vec<Location> {
        verdict.positions().iter().copied().sorted().collect_vec()
    }

    #[test]
    fn corner_block_is_a_loop() {
        let grid = Grid::from_rows(&["bbww", "bbww", "wwww", "wwww"])
            .unwrap()
            .add_rule(Rule::ConnectAll(ConnectAllRule::new(Color::Light)))
            .add_rule(Rule::NoLoops(NoLoopsRule::new(Color::Dark)));

        let validation = validate_grid(&grid, None);
        assert_eq!(validation.rules[0], Verdict::Satisfied);
        assert_eq!(
            sorted(&validation.rules[1]),
            vec![Location(0, 0), Location(1, 0), Location(0, 1), Location(1, 1)]
        );
        assert_eq!(validation.final_state, State::Error);
    }

    #[test]
    fn border_ring_through_both_seams() {
        let grid = Grid::from_rows(&["bbbb", "wwww", "wwww", "wwww"])
            .unwrap()
            .with_wrap(WrapMode::Wrap, WrapMode::Wrap)
            .add_rule(Rule::NoLoops(NoLoopsRule::new(Color::Dark)));

        let validation = validate_grid(&grid, None);
        assert_eq!(
            sorted(&validation.rules[0]),
            (0..4).map(|x| Location(x, 0)).collect_vec()
        );

        // breaking the ring anywhere clears it
        for x in 0..4 {
            let broken = grid.with_color(Location(x, 0), Color::Light);
            assert!(!validate_grid(&broken, None).rules[0].is_error());
            let open = grid.with_color(Location(x, 0), Color::Empty);
            assert_eq!(validate_grid(&open, None).rules[0], Verdict::Incomplete);
        }
    }

    #[test]
    fn validation_is_deterministic() {
        let grid = Grid::from_rows(&["bbnw", "wbbw", "nwbb", "bbwn"])
            .unwrap()
            .add_rule(Rule::NoLoops(NoLoopsRule::new(Color::Dark)))
            .add_rule(Rule::ConnectAll(ConnectAllRule::new(Color::Dark)))
            .add_rule(Rule::CellCount(CellCountRule::new(Color::Light, 3)))
            .add_symbol(Symbol::AreaNumber(AreaNumberSymbol::new(Anchor::new(0.0, 0.0), 6)));

        let first = validate_grid(&grid, None);
        for _ in 0..5 {
            let again = validate_grid(&grid, None);
            assert_eq!(again.rules, first.rules);
            assert_eq!(again.symbols, first.symbols);
            assert_eq!(again.final_state, first.final_state);
        }
    }

    #[test]
    fn holes_around_a_grid_act_as_its_edge() {
        let rule = NoLoopsRule::new(Color::Dark);
        let planar = Grid::from_rows(&["bbb", "bwb", "bbb"]).unwrap();
        let embedded = Grid::from_rows(&[".....", ".bbb.", ".bwb.", ".bbb.", "....."]).unwrap();

        let shifted = sorted(&rule.validate(&embedded))
            .into_iter()
            .map(|Location(x, y)| Location(x - 1, y - 1))
            .collect_vec();
        assert_eq!(shifted, sorted(&rule.validate(&planar)));
        assert_eq!(shifted.len(), 8);

        let open = Grid::from_rows(&["bbb", "bwb", "bwb"]).unwrap();
        let open_embedded = Grid::from_rows(&[".....", ".bbb.", ".bwb.", ".bwb.", "....."]).unwrap();
        assert_eq!(rule.validate(&open), Verdict::Satisfied);
        assert_eq!(rule.validate(&open_embedded), Verdict::Satisfied);
    }

    #[test]
    fn backtrack_solutions_validate() {
        let grid = Grid::from_rows(&["nnn", "nnn", "nnn"])
            .unwrap()
            .add_rule(Rule::ConnectAll(ConnectAllRule::new(Color::Dark)))
            .add_rule(Rule::NoLoops(NoLoopsRule::new(Color::Dark)))
            .add_symbol(Symbol::AreaNumber(AreaNumberSymbol::new(Anchor::at(Location(0, 0)), 3)));

        let found = drain(BacktrackSolver::new().solve(&grid, &CancellationToken::new()).unwrap());
        assert!(!found.is_empty());
        assert_eq!(found.iter().unique_by(|solution| solution.to_string()).count(), found.len());
        for solution in found {
            assert!(solution.is_complete());
            assert_eq!(validate_grid(&solution, None).final_state, State::Satisfied, "{}", solution);
        }
    }

    #[test]
    fn backtrack_keeps_givens() {
        let grid = Grid::from_rows(&["Bnn", "nnn", "nnW"])
            .unwrap()
            .add_rule(Rule::CellCount(CellCountRule::new(Color::Dark, 1)));

        let found = drain(BacktrackSolver::new().solve(&grid, &CancellationToken::new()).unwrap());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].to_string(), Grid::from_rows(&["Bww", "www", "wwW"]).unwrap().to_string());
    }

    #[test]
    fn backtrack_underclued_backbone() {
        let grid = Grid::from_rows(&["Bnn", "nnn"])
            .unwrap()
            .add_rule(Rule::CellCount(CellCountRule::new(Color::Dark, 2)))
            .add_symbol(Symbol::AreaNumber(AreaNumberSymbol::new(Anchor::at(Location(0, 0)), 2)))
            .add_rule(Rule::Underclued);

        // the second dark cell sits right or below the given, so only the far cells are settled
        let found = drain(BacktrackSolver::new().solve(&grid, &CancellationToken::new()).unwrap());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tile(2, 0).color, Color::Light);
        assert_eq!(found[0].tile(1, 1).color, Color::Light);
        assert_eq!(found[0].tile(2, 1).color, Color::Light);
        assert_eq!(found[0].tile(1, 0).color, Color::Empty);
        assert_eq!(found[0].tile(0, 1).color, Color::Empty);
    }

    #[test]
    fn cancelled_before_the_first_pull() {
        let grid = Grid::from_rows(&["nnn", "nnn"]).unwrap();
        let token = CancellationToken::new();
        let mut solutions = BacktrackSolver::new().solve(&grid, &token).unwrap();
        token.cancel();
        assert!(solutions.next().is_none());
        assert!(solutions.next().is_none());
    }

    #[test]
    fn cancelled_after_some_pulls() {
        let grid = Grid::from_rows(&["nnn", "nnn"]).unwrap();
        let token = CancellationToken::new();
        let mut solutions = BacktrackSolver::new().solve(&grid, &token).unwrap();
        for _ in 0..3 {
            assert!(matches!(solutions.next(), Some(Candidate::Found(_))));
        }
        token.cancel();
        assert!(solutions.next().is_none());
    }

    #[test]
    fn cancelled_backbone_sends_nothing() {
        let grid = Grid::from_rows(&["nnn", "nnn"]).unwrap().add_rule(Rule::Underclued);
        let token = CancellationToken::new();
        let mut solutions = BacktrackSolver::new().solve(&grid, &token).unwrap();
        token.cancel();
        assert!(solutions.next().is_none());
    }

    #[cfg(feature = "sat")]
    #[test]
    fn sat_cancellation() {
        let grid = Grid::from_rows(&["nnn", "nnn"]).unwrap();

        let token = CancellationToken::new();
        let mut solutions = SatSolver::new().solve(&grid, &token).unwrap();
        token.cancel();
        assert!(solutions.next().is_none());

        let token = CancellationToken::new();
        let mut solutions = SatSolver::new().solve(&grid, &token).unwrap();
        for _ in 0..3 {
            assert!(matches!(solutions.next(), Some(Candidate::Found(_))));
        }
        token.cancel();
        assert!(solutions.next().is_none());
        assert!(solutions.next().is_none());
    }

    #[test]
    fn auto_cancelled_while_streaming() {
        let grid = Grid::from_rows(&["nnn", "nnn"]).unwrap();
        let token = CancellationToken::new();
        let mut solutions = SolverRegistry::with_defaults().require("auto").unwrap().solve(&grid, &token).unwrap();
        for _ in 0..3 {
            assert!(matches!(solutions.next(), Some(Candidate::Found(_))));
        }
        token.cancel();
        assert!(solutions.next().is_none());
        assert!(solutions.next().is_none());
    }

    #[test]
    fn color_order_changes_the_first_solution() {
        let grid = Grid::from_rows(&["nn"]).unwrap();
        let dark_first = BacktrackSolver::new().solve(&grid, &CancellationToken::new()).unwrap().next();
        let light_first = BacktrackSolver::new()
            .with_color_order(Color::Light)
            .solve(&grid, &CancellationToken::new())
            .unwrap()
            .next();

        let Some(Candidate::Found(dark_first)) = dark_first else { panic!() };
        let Some(Candidate::Found(light_first)) = light_first else { panic!() };
        assert_eq!(dark_first.to_string(), "bb\n");
        assert_eq!(light_first.to_string(), "ww\n");
    }

    #[test]
    fn unsupported_grids_are_refused() {
        let grid = Grid::from_rows(&["nnn", "nnn", "nnn"])
            .unwrap()
            .add_symbol(Symbol::Minesweeper(MinesweeperSymbol::new(Anchor::new(1.0, 1.0), 3)));
        assert!(matches!(
            BacktrackSolver::new().solve(&grid, &CancellationToken::new()),
            Err(SolveError::UnsupportedGrid)
        ));

        let mut backtrack_only = SolverRegistry::new();
        backtrack_only.register(BacktrackSolver::new());
        let auto = AutoSolver::new(backtrack_only);
        let wrapped = grid.with_wrap(WrapMode::Wrap, WrapMode::None);
        assert!(matches!(auto.solve(&wrapped, &CancellationToken::new()), Err(SolveError::UnsupportedGrid)));

        let nobody = AutoSolver::new(SolverRegistry::new());
        assert!(!nobody.is_grid_supported(&grid));
        assert!(matches!(nobody.solve(&grid, &CancellationToken::new()), Err(SolveError::UnsupportedGrid)));
    }

    #[test]
    fn registry_lookup() {
        let registry = SolverRegistry::with_defaults();
        #[cfg(feature = "sat")]
        assert_eq!(registry.ids(), vec!["sat", "backtrack", "auto"]);
        #[cfg(not(feature = "sat"))]
        assert_eq!(registry.ids(), vec!["backtrack", "auto"]);

        assert_eq!(registry.require("backtrack").unwrap().id(), "backtrack");
        assert!(matches!(registry.require("nonesuch"), Err(SolveError::UnknownSolver(id)) if id == "nonesuch"));

        let mut replaced = registry.clone();
        replaced.register(BacktrackSolver::new().with_color_order(Color::Light));
        assert_eq!(replaced.ids().len(), registry.ids().len());
        assert_eq!(replaced.ids().last(), Some(&"backtrack"));
    }

    /// A stand-in backend that supports a fixed set of instruction ids and paints fixed cells, ignoring givens.
    struct Painter {
        id: &'static str,
        supported: &'static [&'static str],
        paint: Vec<(Location, Color)>,
        /// Report every grid as having no solution.
        unsolvable: bool,
        seen: Arc<Mutex<Vec<Grid>>>,
    }

    impl Painter {
        fn new(id: &'static str, supported: &'static [&'static str], paint: Vec<(Location, Color)>) -> Self {
            Self {
                id,
                supported,
                paint,
                unsolvable: false,
                seen: Default::default(),
            }
        }

        fn unsolvable(mut self) -> Self {
            self.unsolvable = true;
            self
        }
    }

    impl Solver for Painter {
        fn id(&self) -> &'static str {
            self.id
        }

        fn description(&self) -> &'static str {
            "paints a fixed set of cells"
        }

        fn is_instruction_supported(&self, _grid: &Grid, instruction: Instruction) -> bool {
            self.supported.contains(&instruction.id())
        }

        fn is_environment_supported(&self) -> bool {
            true
        }

        fn solve(&self, grid: &Grid, _token: &CancellationToken) -> Result<Solutions, SolveError> {
            self.seen.lock().unwrap().push(grid.clone());
            if self.unsolvable {
                return Ok(Box::new(std::iter::once(Candidate::NoMoreSolutions)));
            }
            let painted = self.paint.iter().fold(grid.clone(), |grid, (location, color)| {
                grid.with_tiles(|at, cell| if at == *location { cell.with_color(*color) } else { cell })
            });
            Ok(Box::new([Candidate::Found(painted), Candidate::NoMoreSolutions].into_iter()))
        }
    }

    fn relaxation_grid() -> Grid {
        Grid::from_rows(&["nn", "nn"])
            .unwrap()
            .add_rule(Rule::NoLoops(NoLoopsRule::new(Color::Dark)))
            .add_rule(Rule::CellCount(CellCountRule::new(Color::Dark, 1)))
    }

    #[test]
    fn relaxation_never_undoes_earlier_passes() {
        let counter = Painter::new(
            "counter",
            &["cell_count", "underclued"],
            vec![(Location(0, 0), Color::Dark), (Location(1, 0), Color::Light)],
        );
        let looper = Painter::new(
            "looper",
            &["no_loops", "underclued"],
            vec![(Location(0, 0), Color::Light), (Location(0, 1), Color::Light), (Location(1, 1), Color::Light)],
        );
        let seen = looper.seen.clone();

        let mut backends = SolverRegistry::new();
        backends.register(counter).register(looper);
        let auto = AutoSolver::new(backends);
        let grid = relaxation_grid();
        assert!(auto.is_grid_supported(&grid));

        let found = drain(auto.solve(&grid, &CancellationToken::new()).unwrap());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tile(0, 0).color, Color::Dark);
        assert_eq!(found[0].tile(1, 0).color, Color::Light);
        assert_eq!(found[0].tile_count(true, None, Color::Light), 3);
        // givens of the original grid are untouched
        assert_eq!(found[0].tile_count(true, Some(true), Color::Dark), 0);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let second_pass = &seen[0];
        assert!(second_pass.tile(0, 0).fixed && second_pass.tile(1, 0).fixed);
        assert_eq!(second_pass.rules().iter().map(Rule::id).collect_vec(), vec!["no_loops", "underclued"]);
    }

    #[test]
    fn relaxation_emits_best_effort() {
        let counter = Painter::new("counter", &["cell_count", "underclued"], vec![(Location(0, 0), Color::Dark)]);
        let looper = Painter::new("looper", &["no_loops", "underclued"], vec![(Location(1, 0), Color::Light)]);

        let mut backends = SolverRegistry::new();
        backends.register(counter).register(looper);
        let found = drain(AutoSolver::new(backends).solve(&relaxation_grid(), &CancellationToken::new()).unwrap());

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].to_string(), "bw\nnn\n");
    }

    #[test]
    fn relaxation_rejects_a_broken_completion() {
        let counter = Painter::new("counter", &["cell_count", "underclued"], vec![(Location(0, 0), Color::Dark)]);
        let looper = Painter::new(
            "looper",
            &["no_loops", "underclued"],
            vec![(Location(1, 0), Color::Dark), (Location(0, 1), Color::Light), (Location(1, 1), Color::Light)],
        );

        let mut backends = SolverRegistry::new();
        backends.register(counter).register(looper);
        let found = drain(AutoSolver::new(backends).solve(&relaxation_grid(), &CancellationToken::new()).unwrap());
        assert!(found.is_empty());
    }

    #[test]
    fn relaxation_stops_at_an_unsolvable_pass() {
        let counter = Painter::new("counter", &["cell_count", "underclued"], vec![]).unsolvable();
        let looper = Painter::new("looper", &["no_loops", "underclued"], vec![(Location(1, 0), Color::Light)]);
        let seen = looper.seen.clone();

        let mut backends = SolverRegistry::new();
        backends.register(counter).register(looper);
        let found = drain(AutoSolver::new(backends).solve(&relaxation_grid(), &CancellationToken::new()).unwrap());
        assert!(found.is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn relaxation_withholds_a_broken_best_effort() {
        let counter = Painter::new("counter", &["cell_count", "underclued"], vec![(Location(0, 0), Color::Dark)]);
        let looper = Painter::new("looper", &["no_loops", "underclued"], vec![(Location(1, 0), Color::Dark)]);

        let mut backends = SolverRegistry::new();
        backends.register(counter).register(looper);
        // "bb" over "nn" already holds two dark cells against a count of one
        let found = drain(AutoSolver::new(backends).solve(&relaxation_grid(), &CancellationToken::new()).unwrap());
        assert!(found.is_empty());
    }

    #[cfg(feature = "sat")]
    #[test]
    fn auto_reports_an_unsolvable_grid_as_exhausted() {
        let grid = Grid::from_rows(&["BBn", "BBn", "nnn"])
            .unwrap()
            .add_rule(Rule::NoLoops(NoLoopsRule::new(Color::Dark)))
            .add_symbol(Symbol::Minesweeper(MinesweeperSymbol::new(Anchor::new(2.0, 2.0), 1)));

        let registry = SolverRegistry::with_defaults();
        let auto = registry.require("auto").unwrap();
        assert!(auto.is_grid_supported(&grid));
        assert!(drain(auto.solve(&grid, &CancellationToken::new()).unwrap()).is_empty());
    }

    #[test]
    fn auto_cancelled_between_passes() {
        let counter = Painter::new("counter", &["cell_count", "underclued"], vec![(Location(0, 0), Color::Dark)]);
        let looper = Painter::new("looper", &["no_loops", "underclued"], vec![(Location(1, 0), Color::Light)]);
        let seen = looper.seen.clone();

        let mut backends = SolverRegistry::new();
        backends.register(counter).register(looper);
        let token = CancellationToken::new();
        let mut solutions = AutoSolver::new(backends).solve(&relaxation_grid(), &token).unwrap();
        token.cancel();
        assert!(solutions.next().is_none());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn auto_streams_a_direct_backend() {
        let grid = Grid::from_rows(&["Bn", "nn"])
            .unwrap()
            .add_rule(Rule::NoLoops(NoLoopsRule::new(Color::Dark)))
            .add_rule(Rule::CellCount(CellCountRule::new(Color::Dark, 3)));

        let found = drain(SolverRegistry::with_defaults().require("auto").unwrap().solve(&grid, &CancellationToken::new()).unwrap());
        // three dark cells in a 2x2 never close a loop; the given is one of them
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|solution| solution.tile(0, 0).fixed && solution.tile(0, 0).color == Color::Dark));
    }

    #[cfg(feature = "sat")]
    #[test]
    fn auto_combines_real_backends() {
        let grid = Grid::from_rows(&["nnn", "nBn", "nnn"])
            .unwrap()
            .add_rule(Rule::ConnectAll(ConnectAllRule::new(Color::Light)))
            .add_symbol(Symbol::Minesweeper(MinesweeperSymbol::new(Anchor::new(1.0, 1.0), 8)));

        let registry = SolverRegistry::with_defaults();
        assert!(registry.iter().filter(|solver| solver.id() != "auto").all(|solver| !solver.is_grid_supported(&grid)));

        let found = drain(registry.require("auto").unwrap().solve(&grid, &CancellationToken::new()).unwrap());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].to_string(), "www\nwBw\nwww\n");
        assert_eq!(validate_grid(&found[0], None).final_state, State::Satisfied);
    }
}
