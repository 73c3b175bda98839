//! Participant identities.
//!
//! The chat has exactly two participants, fixed at startup from
//! configuration. Every sender, presence record and gateway session is keyed
//! by one of them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shared::error::ChatError;

/// One of the two chat participants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Participant(String);

impl Participant {
    /// Rebuild a participant from a name previously written to storage.
    pub(crate) fn from_stored(name: String) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The fixed pair of participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participants {
    pair: [Participant; 2],
}

impl Participants {
    /// Build the pair from configuration.
    ///
    /// Names are trimmed; exactly two distinct, non-blank names are required.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Result<Self, ChatError> {
        let names: Vec<String> = names.iter().map(|n| n.as_ref().trim().to_string()).collect();

        match names.as_slice() {
            [a, b] if !a.is_empty() && !b.is_empty() && a != b => Ok(Self {
                pair: [Participant(a.clone()), Participant(b.clone())],
            }),
            _ => Err(ChatError::Validation(format!(
                "exactly two distinct participants are required, got {:?}",
                names
            ))),
        }
    }

    /// Look up a participant by name.
    pub fn resolve(&self, name: &str) -> Result<Participant, ChatError> {
        self.pair
            .iter()
            .find(|p| p.as_str() == name)
            .cloned()
            .ok_or_else(|| ChatError::UnknownParticipant(name.to_string()))
    }

    /// Whether `participant` belongs to this pair.
    pub fn contains(&self, participant: &Participant) -> bool {
        self.pair.contains(participant)
    }

    /// The other participant.
    pub fn counterpart(&self, participant: &Participant) -> Participant {
        if &self.pair[0] == participant {
            self.pair[1].clone()
        } else {
            self.pair[0].clone()
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.pair.iter()
    }
}
