use crate::common::DomainEvent;
use crate::domains::grid::types::{AgentId, GoalLabel};
use crate::domains::negotiation::types::Proposal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NegotiationEvent {
    SessionOpened {
        session_id: String,
        initiator: AgentId,
        responder: AgentId,
        contested_goal: GoalLabel,
        allowed_goals: Vec<GoalLabel>,
        max_rounds: u32,
        timestamp: DateTime<Utc>,
    },
    ProposalCountered {
        session_id: String,
        by: AgentId,
        proposal: Proposal,
        turn: u32,
        timestamp: DateTime<Utc>,
    },
    ProposalAccepted {
        session_id: String,
        by: AgentId,
        proposal: Proposal,
        timestamp: DateTime<Utc>,
    },
    ProposalRejected {
        session_id: String,
        by: AgentId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    RoundsExhausted {
        session_id: String,
        max_rounds: u32,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent for NegotiationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            NegotiationEvent::SessionOpened { .. } => "SessionOpened",
            NegotiationEvent::ProposalCountered { .. } => "ProposalCountered",
            NegotiationEvent::ProposalAccepted { .. } => "ProposalAccepted",
            NegotiationEvent::ProposalRejected { .. } => "ProposalRejected",
            NegotiationEvent::RoundsExhausted { .. } => "RoundsExhausted",
        }
    }

    fn aggregate_id(&self) -> &str {
        match self {
            NegotiationEvent::SessionOpened { session_id, .. } => session_id,
            NegotiationEvent::ProposalCountered { session_id, .. } => session_id,
            NegotiationEvent::ProposalAccepted { session_id, .. } => session_id,
            NegotiationEvent::ProposalRejected { session_id, .. } => session_id,
            NegotiationEvent::RoundsExhausted { session_id, .. } => session_id,
        }
    }

    fn event_version(&self) -> u64 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            NegotiationEvent::SessionOpened { timestamp, .. } => *timestamp,
            NegotiationEvent::ProposalCountered { timestamp, .. } => *timestamp,
            NegotiationEvent::ProposalAccepted { timestamp, .. } => *timestamp,
            NegotiationEvent::ProposalRejected { timestamp, .. } => *timestamp,
            NegotiationEvent::RoundsExhausted { timestamp, .. } => *timestamp,
        }
    }
}
