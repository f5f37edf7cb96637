use crate::common::{DomainError, DomainResult};
use crate::domains::grid::distance::DistanceMatrix;

/// An exact bottleneck assignment: `assignment[agent_row] = goal_column`,
/// with `cost` the maximum matched distance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinimaxAssignment {
    pub assignment: Vec<usize>,
    pub cost: u32,
}

/// Exhaustive minimax (bottleneck) assignment over a square distance
/// matrix.
///
/// Enumerates all n! goal permutations in lexicographic order and keeps
/// the minimum max-cost. Ties keep the FIRST permutation in generation
/// order, so results are reproducible across runs. Factorial on purpose:
/// this is the ground-truth baseline for small boards (n <= ~8), not a
/// production matcher.
pub fn solve_minimax(matrix: &DistanceMatrix) -> DomainResult<MinimaxAssignment> {
    if !matrix.is_square() {
        return Err(DomainError::InvalidCommand {
            reason: format!(
                "Minimax assignment needs matching counts, got {} agents and {} goals",
                matrix.agents.len(),
                matrix.goals.len()
            ),
        });
    }

    let n = matrix.agents.len();
    if n == 0 {
        return Ok(MinimaxAssignment {
            assignment: Vec::new(),
            cost: 0,
        });
    }

    let mut best: Option<MinimaxAssignment> = None;
    let mut current: Vec<usize> = Vec::with_capacity(n);
    let mut taken = vec![false; n];
    enumerate(matrix, n, &mut current, &mut taken, &mut best);

    Ok(best.expect("at least one permutation exists for n >= 1"))
}

/// Depth-first lexicographic permutation walk; strict `<` keeps the
/// earliest permutation on cost ties.
fn enumerate(
    matrix: &DistanceMatrix,
    n: usize,
    current: &mut Vec<usize>,
    taken: &mut [bool],
    best: &mut Option<MinimaxAssignment>,
) {
    if current.len() == n {
        let cost = current
            .iter()
            .enumerate()
            .map(|(agent, &goal)| matrix.entries[agent][goal])
            .max()
            .unwrap_or(0);
        if best.as_ref().map(|b| cost < b.cost).unwrap_or(true) {
            *best = Some(MinimaxAssignment {
                assignment: current.clone(),
                cost,
            });
        }
        return;
    }

    for goal in 0..n {
        if !taken[goal] {
            taken[goal] = true;
            current.push(goal);
            enumerate(matrix, n, current, taken, best);
            current.pop();
            taken[goal] = false;
        }
    }
}
