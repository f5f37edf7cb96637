use crate::domains::grid::types::{AgentId, GoalLabel};
use std::collections::{BTreeMap, BTreeSet};

/// Per-agent goal preference order, most preferred first. May be
/// incomplete or empty; both are normal inputs here.
pub type Ranking = Vec<GoalLabel>;

/// Drop duplicate and dead goal labels from a raw ranking, preserving
/// order. Policies hand back whatever they parsed; the resolver only
/// ever sees live, de-duplicated preferences.
pub fn sanitize_ranking(raw: &[GoalLabel], live: &BTreeSet<GoalLabel>) -> Ranking {
    let mut seen = BTreeSet::new();
    raw.iter()
        .filter(|g| live.contains(g) && seen.insert(**g))
        .copied()
        .collect()
}

/// Greedy rank-based conflict resolution: a deferred-acceptance round
/// where the goal side has no preferences of its own.
///
/// Every agent starts at rank position 0. While any goal has more than
/// one claimant, the lowest agent id keeps it and every other claimant
/// advances to the next entry of its OWN ranking (or to None when the
/// list runs out). Terminates because each loser's pointer strictly
/// advances over a finite list. The result is injective among the agents
/// passed in: no two agents ever share a non-null final goal.
pub fn resolve_conflicts(
    rankings: &BTreeMap<AgentId, Ranking>,
) -> BTreeMap<AgentId, Option<GoalLabel>> {
    let mut positions: BTreeMap<AgentId, usize> = rankings.keys().map(|id| (*id, 0)).collect();
    let mut finals: BTreeMap<AgentId, Option<GoalLabel>> = rankings
        .iter()
        .map(|(id, ranking)| (*id, ranking.first().copied()))
        .collect();

    loop {
        let mut claimants: BTreeMap<GoalLabel, Vec<AgentId>> = BTreeMap::new();
        for (id, goal) in &finals {
            if let Some(goal) = goal {
                claimants.entry(*goal).or_default().push(*id);
            }
        }

        if claimants.values().all(|agents| agents.len() <= 1) {
            return finals;
        }

        for (_, agents) in claimants {
            if agents.len() <= 1 {
                continue;
            }
            // BTreeMap iteration already yields ascending agent ids: the
            // first claimant is the winner.
            for loser in &agents[1..] {
                let pos = positions.get_mut(loser).expect("loser has a pointer");
                *pos += 1;
                let ranking = &rankings[loser];
                finals.insert(*loser, ranking.get(*pos).copied());
            }
        }
    }
}
