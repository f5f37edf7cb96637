use serde::{Deserialize, Serialize};

/// How a step turns raw per-agent preferences into a conflict-free
/// assignment. One parameterized seam instead of per-call-site variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    /// Rank lists resolved greedily; contested goals go to the lowest
    /// agent id.
    GreedyByIdentity,
    /// Like greedy, but exactly-two-way top-choice disputes first get a
    /// bounded bilateral negotiation; everything else (including
    /// three-or-more-way conflicts) falls through to the greedy
    /// resolver.
    Negotiated,
    /// Goals fixed up front by the exact minimax assignment solver;
    /// requires the agent and goal counts to match.
    ExactMinimax,
}

impl Default for ConflictStrategy {
    fn default() -> Self {
        ConflictStrategy::GreedyByIdentity
    }
}
