use itertools::Itertools;
use varisat::{ExtendFormula, Lit};

/// Above this many clauses, cardinality constraints switch from plain combinations to a sequential counter.
const COMBINATION_LIMIT: u64 = 256;

/// `a <=> b`, as two clauses.
pub(crate) fn equal(a: Lit, b: Lit) -> [Vec<Lit>; 2] {
    [vec![!a, b], vec![a, !b]]
}

fn binomial(n: usize, k: usize) -> u64 {
    let k = k.min(n.saturating_sub(k));
    (0..k).fold(1u64, |acc, i| acc.saturating_mul((n - i) as u64) / (i as u64 + 1))
}

/// Add `clause`, weakened by `!guard` so that it only binds when `guard` holds.
fn emit(formula: &mut impl ExtendFormula, guard: Option<Lit>, mut clause: Vec<Lit>) {
    clause.extend(guard.map(|g| !g));
    formula.add_clause(&clause);
}

/// At most `k` of `lits` are true (whenever `guard` is true, if given).
pub(crate) fn at_most_k(formula: &mut impl ExtendFormula, lits: &[Lit], k: usize, guard: Option<Lit>) {
    let n = lits.len();
    if k >= n {
        return;
    }
    if k == 0 {
        lits.iter().for_each(|lit| emit(formula, guard, vec![!*lit]));
        return;
    }

    if binomial(n, k + 1) <= COMBINATION_LIMIT {
        // no k + 1 of them are all true
        for selection in lits.iter().combinations(k + 1) {
            emit(formula, guard, selection.into_iter().map(|lit| !*lit).collect_vec());
        }
        return;
    }

    // sequential counter: counter[i][j] holds when at least j + 1 of the first i + 1 literals are true
    let counter = (0..n - 1)
        .map(|_| (0..k).map(|_| formula.new_lit()).collect_vec())
        .collect_vec();

    emit(formula, guard, vec![!lits[0], counter[0][0]]);
    for j in 1..k {
        emit(formula, guard, vec![!counter[0][j]]);
    }
    for i in 1..n - 1 {
        emit(formula, guard, vec![!lits[i], counter[i][0]]);
        emit(formula, guard, vec![!counter[i - 1][0], counter[i][0]]);
        for j in 1..k {
            emit(formula, guard, vec![!lits[i], !counter[i - 1][j - 1], counter[i][j]]);
            emit(formula, guard, vec![!counter[i - 1][j], counter[i][j]]);
        }
        emit(formula, guard, vec![!lits[i], !counter[i - 1][k - 1]]);
    }
    emit(formula, guard, vec![!lits[n - 1], !counter[n - 2][k - 1]]);
}

/// At least `k` of `lits` are true (whenever `guard` is true, if given).
pub(crate) fn at_least_k(formula: &mut impl ExtendFormula, lits: &[Lit], k: usize, guard: Option<Lit>) {
    if k > lits.len() {
        emit(formula, guard, Vec::new());
        return;
    }
    let negated = lits.iter().map(|lit| !*lit).collect_vec();
    at_most_k(formula, &negated, lits.len() - k, guard);
}

pub(crate) fn exactly_k(formula: &mut impl ExtendFormula, lits: &[Lit], k: usize, guard: Option<Lit>) {
    at_most_k(formula, lits, k, guard);
    at_least_k(formula, lits, k, guard);
}

#[cfg(test)]
mod tests {
    use varisat::{CnfFormula, Solver, Var};

    use super::*;

    /// Count the models of `formula` projected onto `vars`.
    fn count_models(formula: &CnfFormula, vars: &[Var]) -> usize {
        let mut solver = Solver::new();
        solver.add_formula(formula);
        let mut count = 0;
        while solver.solve().unwrap() {
            count += 1;
            let model = solver.model().unwrap();
            let blocking = vars.iter()
                .map(|var| {
                    let positive = model.contains(&var.positive());
                    var.lit(!positive)
                })
                .collect_vec();
            solver.add_clause(&blocking);
        }
        count
    }

    #[test]
    fn small_cardinality() {
        let mut formula = CnfFormula::new();
        let vars = (0..5).map(|_| formula.new_var()).collect_vec();
        let lits = vars.iter().map(|var| var.positive()).collect_vec();
        exactly_k(&mut formula, &lits, 2, None);
        assert_eq!(count_models(&formula, &vars), 10);
    }

    #[test]
    fn sequential_counter() {
        let mut formula = CnfFormula::new();
        let vars = (0..14).map(|_| formula.new_var()).collect_vec();
        let lits = vars.iter().map(|var| var.positive()).collect_vec();
        exactly_k(&mut formula, &lits, 12, None);
        assert_eq!(count_models(&formula, &vars), 91);
    }

    #[test]
    fn guarded_constraint_is_void_when_guard_fails() {
        let mut formula = CnfFormula::new();
        let guard = formula.new_var();
        let vars = (0..3).map(|_| formula.new_var()).collect_vec();
        let lits = vars.iter().map(|var| var.positive()).collect_vec();
        at_least_k(&mut formula, &lits, 3, Some(guard.positive()));
        formula.add_clause(&[guard.negative()]);
        assert_eq!(count_models(&formula, &vars), 8);
    }
}
