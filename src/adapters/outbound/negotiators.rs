use crate::common::DomainResult;
use crate::domains::grid::distance::UNREACHABLE;
use crate::domains::grid::types::AgentId;
use crate::domains::negotiation::ports::Negotiator;
use crate::domains::negotiation::session::NegotiationSession;
use crate::domains::negotiation::types::{NegotiationAction, NegotiationContext, Proposal};
use async_trait::async_trait;

/// Deterministic stand-in for the model-backed negotiating party.
///
/// On its turn it computes the pairwise minimax split of the allowed
/// goals (minimizing the worse of the two path lengths, ties broken by
/// goal-label order with the mover's goal first), accepts any standing
/// proposal at least as good, and counters otherwise. Two of these
/// facing each other converge within two turns.
pub struct DistanceMinimaxNegotiator;

impl DistanceMinimaxNegotiator {
    fn proposal_cost(
        proposal: &Proposal,
        context: &NegotiationContext,
    ) -> u32 {
        proposal
            .entries
            .iter()
            .map(|(agent, goal)| context.distance(*agent, *goal).unwrap_or(UNREACHABLE))
            .max()
            .unwrap_or(UNREACHABLE)
    }

    fn best_split(
        session: &NegotiationSession,
        context: &NegotiationContext,
        side: AgentId,
    ) -> Option<(Proposal, u32)> {
        let other = if side == session.initiator {
            session.responder
        } else {
            session.initiator
        };

        let mut best: Option<(Proposal, u32)> = None;
        for own_goal in &session.allowed_goals {
            for other_goal in &session.allowed_goals {
                if own_goal == other_goal {
                    continue;
                }
                let proposal = Proposal::new((side, *own_goal), (other, *other_goal));
                let cost = Self::proposal_cost(&proposal, context);
                if best.as_ref().map(|(_, c)| cost < *c).unwrap_or(true) {
                    best = Some((proposal, cost));
                }
            }
        }
        best
    }
}

#[async_trait]
impl Negotiator for DistanceMinimaxNegotiator {
    async fn decide(
        &self,
        session: &NegotiationSession,
        context: &NegotiationContext,
        side: AgentId,
    ) -> DomainResult<NegotiationAction> {
        let Some((best, best_cost)) = Self::best_split(session, context, side) else {
            // Fewer than two distinct goals on the table: nothing to
            // trade, walk away.
            return Ok(NegotiationAction::Reject);
        };

        if let Some(standing) = session.standing_proposal {
            if Self::proposal_cost(&standing, context) <= best_cost {
                return Ok(NegotiationAction::Accept);
            }
        }
        Ok(NegotiationAction::Counter(best))
    }
}
