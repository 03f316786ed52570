//! Round State
//!
//! The participant set of one round, kept in roster order with a name index.
//!
//! Participants are independently owned records. Pairing needs to mutate two
//! of them at once, which `pair_mut` provides without any shared state.
//!
//! # Critical Invariants
//!
//! 1. **Unique names**: each roster name appears exactly once
//! 2. **Stable order**: iteration follows the roster, so a seed fully
//!    determines the outcome of a round

use crate::models::ledger::MatchLedger;
use crate::models::participant::Participant;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StateError {
    #[error("duplicate participant name: {0}")]
    DuplicateName(String),

    #[error("participant names must not be empty")]
    EmptyName,

    #[error("unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("{0} cannot be paired with itself")]
    SameParticipant(String),
}

/// All participants of one round
///
/// # Example
///
/// ```rust
/// use coffee_match_core::{Participant, RoundState};
///
/// let ana = Participant::new("Ana".to_string(), "1".to_string(), vec!["Ben".to_string()]);
/// let ben = Participant::new("Ben".to_string(), "2".to_string(), vec!["Ana".to_string()]);
///
/// let mut state = RoundState::new(vec![ana, ben]).unwrap();
/// let (a, b) = state.pair_mut("Ana", "Ben").unwrap();
/// assert_eq!((a.name(), b.name()), ("Ana", "Ben"));
/// ```
#[derive(Debug, Clone)]
pub struct RoundState {
    participants: Vec<Participant>,
    index: HashMap<String, usize>,
}

impl RoundState {
    pub fn new(participants: Vec<Participant>) -> Result<Self, StateError> {
        let mut index = HashMap::with_capacity(participants.len());
        for (i, participant) in participants.iter().enumerate() {
            if participant.name().is_empty() {
                return Err(StateError::EmptyName);
            }
            if index.insert(participant.name().to_string(), i).is_some() {
                return Err(StateError::DuplicateName(participant.name().to_string()));
            }
        }
        Ok(Self {
            participants,
            index,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Participant> {
        self.index.get(name).map(|&i| &self.participants[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Participant> {
        self.index.get(name).map(|&i| &mut self.participants[i])
    }

    /// Like `get`, but a missing name is an error
    pub fn require(&self, name: &str) -> Result<&Participant, StateError> {
        self.get(name)
            .ok_or_else(|| StateError::UnknownParticipant(name.to_string()))
    }

    /// Mutable access to two distinct participants at once
    pub fn pair_mut(
        &mut self,
        first: &str,
        second: &str,
    ) -> Result<(&mut Participant, &mut Participant), StateError> {
        let i = self.position(first)?;
        let j = self.position(second)?;

        if i == j {
            return Err(StateError::SameParticipant(first.to_string()));
        }
        if i < j {
            let (left, right) = self.participants.split_at_mut(j);
            Ok((&mut left[i], &mut right[0]))
        } else {
            let (left, right) = self.participants.split_at_mut(i);
            Ok((&mut right[0], &mut left[j]))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Participant> {
        self.participants.iter_mut()
    }

    /// Names in roster order
    pub fn names(&self) -> Vec<String> {
        self.participants
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Participants that are unmatched or missing from the ledger
    pub fn unmatched<'a>(&'a self, ledger: &MatchLedger) -> Vec<&'a Participant> {
        self.participants
            .iter()
            .filter(|p| !p.is_matched() || !ledger.contains(p.name()))
            .collect()
    }

    fn position(&self, name: &str) -> Result<usize, StateError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| StateError::UnknownParticipant(name.to_string()))
    }
}
