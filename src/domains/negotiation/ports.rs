use crate::common::DomainResult;
use crate::domains::grid::types::AgentId;
use crate::domains::negotiation::session::{NegotiationSession, NegotiationState};
use crate::domains::negotiation::types::{NegotiationAction, NegotiationContext};
use async_trait::async_trait;

/// Port for the party making accept/reject/counter decisions: a
/// language model, a heuristic or a human, all behind the same seam.
/// A failed decision is read as an implicit rejection, never an
/// aborted run.
#[async_trait]
pub trait Negotiator: Send + Sync {
    async fn decide(
        &self,
        session: &NegotiationSession,
        context: &NegotiationContext,
        side: AgentId,
    ) -> DomainResult<NegotiationAction>;
}

/// Drive a session to a terminal state by alternating the port's
/// decisions. Decision failures close the session as a rejection.
pub async fn drive_session(
    session: &mut NegotiationSession,
    context: &NegotiationContext,
    negotiator: &dyn Negotiator,
) -> DomainResult<NegotiationState> {
    while let Some(side) = session.to_move() {
        let action = match negotiator.decide(session, context, side).await {
            Ok(action) => action,
            Err(_) => NegotiationAction::Reject,
        };
        session.submit(side, action)?;
    }
    Ok(session.outcome().clone())
}
