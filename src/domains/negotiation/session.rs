use crate::common::aggregate::AggregateRoot;
use crate::common::{DomainError, DomainResult};
use crate::domains::grid::types::{AgentId, GoalLabel};
use crate::domains::negotiation::events::NegotiationEvent;
use crate::domains::negotiation::types::{NegotiationAction, Proposal};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NegotiationState {
    /// Waiting for the named party's turn.
    Proposing(AgentId),
    Accepted(Proposal),
    NoAgreement,
}

/// Bilateral negotiation over one contested goal.
///
/// Opened only when EXACTLY two agents share a top-ranked goal; wider
/// conflicts never reach here and go straight to the greedy resolver.
/// Turns alternate between the parties, bounded by `max_rounds` total
/// turns. Counters are restricted to the union of both parties' top-2
/// goals and must assign the two agents different goals. Any malformed
/// action is an implicit rejection: the session closes with
/// `NoAgreement` and the caller reverts the pair to its pre-negotiation
/// resolver outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationSession {
    pub id: String,
    pub initiator: AgentId,
    pub responder: AgentId,
    pub contested_goal: GoalLabel,
    pub allowed_goals: Vec<GoalLabel>,
    pub max_rounds: u32,
    pub turns_taken: u32,
    pub standing_proposal: Option<Proposal>,
    pub state: NegotiationState,
    pub version: u64,
    #[serde(skip)]
    uncommitted_events: Vec<NegotiationEvent>,
}

impl NegotiationSession {
    /// Open a session for a two-way dispute. `initiator` moves first and
    /// must be the lower agent id; the allowed goal set is the sorted
    /// union of both parties' top-2 rankings.
    pub fn open(
        id: String,
        initiator: AgentId,
        responder: AgentId,
        contested_goal: GoalLabel,
        initiator_top2: &[GoalLabel],
        responder_top2: &[GoalLabel],
        max_rounds: u32,
    ) -> DomainResult<Self> {
        if initiator >= responder {
            return Err(DomainError::InvalidCommand {
                reason: format!(
                    "Session parties must be distinct and ordered, got {} and {}",
                    initiator, responder
                ),
            });
        }
        let allowed: BTreeSet<GoalLabel> = initiator_top2
            .iter()
            .take(2)
            .chain(responder_top2.iter().take(2))
            .copied()
            .collect();

        let mut session = Self {
            id: id.clone(),
            initiator,
            responder,
            contested_goal,
            allowed_goals: allowed.into_iter().collect(),
            max_rounds,
            turns_taken: 0,
            standing_proposal: None,
            state: NegotiationState::Proposing(initiator),
            version: 0,
            uncommitted_events: Vec::new(),
        };

        let event = NegotiationEvent::SessionOpened {
            session_id: id,
            initiator,
            responder,
            contested_goal,
            allowed_goals: session.allowed_goals.clone(),
            max_rounds,
            timestamp: Utc::now(),
        };
        session.add_event(event);
        Ok(session)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.state, NegotiationState::Proposing(_))
    }

    pub fn to_move(&self) -> Option<AgentId> {
        match self.state {
            NegotiationState::Proposing(agent) => Some(agent),
            _ => None,
        }
    }

    pub fn outcome(&self) -> &NegotiationState {
        &self.state
    }

    /// Play one turn. Out-of-turn submissions are command errors; a
    /// malformed action on a valid turn closes the session with
    /// `NoAgreement` instead of erroring, per the recovery contract.
    pub fn submit(&mut self, agent: AgentId, action: NegotiationAction) -> DomainResult<()> {
        let Some(side) = self.to_move() else {
            return Err(DomainError::InvalidCommand {
                reason: format!("Session {} already concluded", self.id),
            });
        };
        if side != agent {
            return Err(DomainError::InvalidCommand {
                reason: format!("It is agent {}'s turn, not agent {}'s", side, agent),
            });
        }

        match action {
            NegotiationAction::Accept => match self.standing_proposal {
                Some(proposal) => {
                    let event = NegotiationEvent::ProposalAccepted {
                        session_id: self.id.clone(),
                        by: agent,
                        proposal,
                        timestamp: Utc::now(),
                    };
                    self.add_event(event.clone());
                    self.apply(&event)?;
                }
                // Accepting thin air is malformed: implicit rejection.
                None => self.close_rejected(agent, "accept with no standing proposal")?,
            },
            NegotiationAction::Reject => {
                self.close_rejected(agent, "explicit rejection")?;
            }
            NegotiationAction::Counter(proposal) => {
                if !self.is_admissible(&proposal) {
                    self.close_rejected(agent, "malformed counter-proposal")?;
                    return Ok(());
                }
                let event = NegotiationEvent::ProposalCountered {
                    session_id: self.id.clone(),
                    by: agent,
                    proposal,
                    turn: self.turns_taken + 1,
                    timestamp: Utc::now(),
                };
                self.add_event(event.clone());
                self.apply(&event)?;

                if self.turns_taken >= self.max_rounds && !self.is_terminal() {
                    let event = NegotiationEvent::RoundsExhausted {
                        session_id: self.id.clone(),
                        max_rounds: self.max_rounds,
                        timestamp: Utc::now(),
                    };
                    self.add_event(event.clone());
                    self.apply(&event)?;
                }
            }
        }
        Ok(())
    }

    /// A counter must cover exactly the two parties, stay inside the
    /// allowed goal union, and give the parties different goals.
    fn is_admissible(&self, proposal: &Proposal) -> bool {
        let covers_parties = proposal.goal_for(self.initiator).is_some()
            && proposal.goal_for(self.responder).is_some();
        let goals_allowed = proposal
            .entries
            .iter()
            .all(|(_, goal)| self.allowed_goals.contains(goal));
        covers_parties && goals_allowed && proposal.goals_differ()
    }

    fn close_rejected(&mut self, by: AgentId, reason: &str) -> DomainResult<()> {
        let event = NegotiationEvent::ProposalRejected {
            session_id: self.id.clone(),
            by,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        };
        self.add_event(event.clone());
        self.apply(&event)?;
        Ok(())
    }

    fn other_party(&self, agent: AgentId) -> AgentId {
        if agent == self.initiator {
            self.responder
        } else {
            self.initiator
        }
    }
}

impl AggregateRoot for NegotiationSession {
    type Event = NegotiationEvent;

    fn aggregate_id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn apply(&mut self, event: &NegotiationEvent) -> DomainResult<()> {
        match event {
            NegotiationEvent::SessionOpened {
                initiator,
                responder,
                contested_goal,
                allowed_goals,
                max_rounds,
                ..
            } => {
                self.initiator = *initiator;
                self.responder = *responder;
                self.contested_goal = *contested_goal;
                self.allowed_goals = allowed_goals.clone();
                self.max_rounds = *max_rounds;
                self.turns_taken = 0;
                self.standing_proposal = None;
                self.state = NegotiationState::Proposing(*initiator);
            }
            NegotiationEvent::ProposalCountered { by, proposal, .. } => {
                self.standing_proposal = Some(*proposal);
                self.turns_taken += 1;
                self.state = NegotiationState::Proposing(self.other_party(*by));
            }
            NegotiationEvent::ProposalAccepted { proposal, .. } => {
                self.state = NegotiationState::Accepted(*proposal);
            }
            NegotiationEvent::ProposalRejected { .. } => {
                self.state = NegotiationState::NoAgreement;
            }
            NegotiationEvent::RoundsExhausted { .. } => {
                self.state = NegotiationState::NoAgreement;
            }
        }
        self.version += 1;
        Ok(())
    }

    fn uncommitted_events(&self) -> &[NegotiationEvent] {
        &self.uncommitted_events
    }

    fn mark_events_as_committed(&mut self) {
        self.uncommitted_events.clear();
    }

    fn add_event(&mut self, event: NegotiationEvent) {
        self.uncommitted_events.push(event);
    }
}
