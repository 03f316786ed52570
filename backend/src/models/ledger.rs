//! Match ledger
//!
//! The accumulating result of one round: an ordered list of groups, each
//! holding two or three members, plus a name → group side table so that any
//! member (not only the primary) can be looked up directly.
//!
//! # Critical Invariants
//!
//! 1. **Group size**: every group has 2 or 3 members
//! 2. **Uniqueness**: every name appears in at most one group, at most once
//! 3. **Immutability of triples**: a group of three never grows or changes
//! 4. **Primary**: the first member of a group is its primary and never changes

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Smallest and largest allowed group sizes
pub const MIN_GROUP_SIZE: usize = 2;
pub const MAX_GROUP_SIZE: usize = 3;

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("{name} is already placed in the group of {primary}")]
    AlreadyPlaced { name: String, primary: String },

    #[error("the group of {primary} is already a triple")]
    GroupFull { primary: String },

    #[error("no group at index {0}")]
    UnknownGroup(usize),

    #[error("{0} cannot be grouped with itself")]
    SameMember(String),

    #[error("a group needs 2 or 3 members, found {0}")]
    GroupSize(usize),
}

/// How a member ended up in its group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Both sides accepted each other through the history-checked protocol
    Mutual,
    /// Last-resort placement by the overflow resolver; history was not checked
    Forced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Pair,
    Triple,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub placement: Placement,
}

/// One meeting group of two or three people
///
/// Only built by the ledger or by validated deserialization, so there is
/// always a primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GroupRecord", into = "GroupRecord")]
pub struct Group {
    members: Vec<Member>,
}

/// Persisted form of a group
#[derive(Serialize, Deserialize)]
struct GroupRecord {
    members: Vec<Member>,
}

impl TryFrom<GroupRecord> for Group {
    type Error = LedgerError;

    fn try_from(record: GroupRecord) -> Result<Self, Self::Error> {
        let size = record.members.len();
        if !(MIN_GROUP_SIZE..=MAX_GROUP_SIZE).contains(&size) {
            return Err(LedgerError::GroupSize(size));
        }
        for (i, member) in record.members.iter().enumerate() {
            if record.members[..i].iter().any(|m| m.name == member.name) {
                return Err(LedgerError::SameMember(member.name.clone()));
            }
        }
        Ok(Self {
            members: record.members,
        })
    }
}

impl From<Group> for GroupRecord {
    fn from(group: Group) -> Self {
        Self {
            members: group.members,
        }
    }
}

impl Group {
    fn pair(first: &str, second: &str, placement: Placement) -> Self {
        Self {
            members: vec![
                Member {
                    name: first.to_string(),
                    placement,
                },
                Member {
                    name: second.to_string(),
                    placement,
                },
            ],
        }
    }

    /// The name the group is keyed by
    pub fn primary(&self) -> &str {
        &self.members[0].name
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.name.as_str())
    }

    /// Everyone in the group except the primary
    pub fn partners(&self) -> impl Iterator<Item = &str> {
        self.names().skip(1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn kind(&self) -> GroupKind {
        if self.members.len() >= MAX_GROUP_SIZE {
            GroupKind::Triple
        } else {
            GroupKind::Pair
        }
    }

    pub fn is_pair(&self) -> bool {
        self.kind() == GroupKind::Pair
    }

    pub fn is_triple(&self) -> bool {
        self.kind() == GroupKind::Triple
    }

    /// Members placed by the overflow bypass
    pub fn forced_members(&self) -> impl Iterator<Item = &str> {
        self.members
            .iter()
            .filter(|m| m.placement == Placement::Forced)
            .map(|m| m.name.as_str())
    }
}

/// All groups formed in one round
///
/// # Example
/// ```
/// use coffee_match_core::{MatchLedger, Placement};
///
/// let mut ledger = MatchLedger::new();
/// let group = ledger.open_pair("Ana", "Ben", Placement::Mutual).unwrap();
/// ledger.join(group, "Cleo", Placement::Mutual).unwrap();
///
/// assert_eq!(ledger.primary_of("Cleo"), Some("Ana"));
/// assert_eq!(ledger.triple_count(), 1);
/// assert!(ledger.join(group, "Dev", Placement::Mutual).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Group>", into = "Vec<Group>")]
pub struct MatchLedger {
    groups: Vec<Group>,

    /// Member name → index into `groups`
    index: HashMap<String, usize>,
}

impl MatchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `name` is a primary or a partner anywhere in the ledger
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn group_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn group(&self, index: usize) -> Option<&Group> {
        self.groups.get(index)
    }

    pub fn group_of(&self, name: &str) -> Option<&Group> {
        self.group_index(name).and_then(|i| self.groups.get(i))
    }

    /// Primary of the group `name` belongs to
    pub fn primary_of(&self, name: &str) -> Option<&str> {
        self.group_of(name).map(Group::primary)
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Open a new pair; neither name may already be placed
    pub fn open_pair(
        &mut self,
        first: &str,
        second: &str,
        placement: Placement,
    ) -> Result<usize, LedgerError> {
        if first == second {
            return Err(LedgerError::SameMember(first.to_string()));
        }
        self.ensure_unplaced(first)?;
        self.ensure_unplaced(second)?;

        let index = self.groups.len();
        self.groups.push(Group::pair(first, second, placement));
        self.index.insert(first.to_string(), index);
        self.index.insert(second.to_string(), index);
        Ok(index)
    }

    /// Grow the pair at `index` into a triple
    pub fn join(&mut self, index: usize, name: &str, placement: Placement) -> Result<(), LedgerError> {
        self.ensure_unplaced(name)?;
        let group = self
            .groups
            .get_mut(index)
            .ok_or(LedgerError::UnknownGroup(index))?;
        if group.is_triple() {
            return Err(LedgerError::GroupFull {
                primary: group.primary().to_string(),
            });
        }

        group.members.push(Member {
            name: name.to_string(),
            placement,
        });
        self.index.insert(name.to_string(), index);
        Ok(())
    }

    /// First group that can still take a third member
    pub fn first_open_pair(&self) -> Option<usize> {
        self.groups.iter().position(Group::is_pair)
    }

    /// Number of groups (the report's match count)
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of people placed in any group
    pub fn member_count(&self) -> usize {
        self.index.len()
    }

    pub fn pair_count(&self) -> usize {
        self.groups.iter().filter(|g| g.is_pair()).count()
    }

    pub fn triple_count(&self) -> usize {
        self.groups.iter().filter(|g| g.is_triple()).count()
    }

    /// `(primary, name)` for every member placed by the overflow bypass
    pub fn forced_placements(&self) -> Vec<(String, String)> {
        self.groups
            .iter()
            .flat_map(|g| {
                g.forced_members()
                    .map(move |name| (g.primary().to_string(), name.to_string()))
            })
            .collect()
    }

    fn ensure_unplaced(&self, name: &str) -> Result<(), LedgerError> {
        match self.primary_of(name) {
            Some(primary) => Err(LedgerError::AlreadyPlaced {
                name: name.to_string(),
                primary: primary.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl TryFrom<Vec<Group>> for MatchLedger {
    type Error = LedgerError;

    fn try_from(groups: Vec<Group>) -> Result<Self, Self::Error> {
        let mut index = HashMap::new();
        for (i, group) in groups.iter().enumerate() {
            for name in group.names() {
                if let Some(previous) = index.insert(name.to_string(), i) {
                    return Err(LedgerError::AlreadyPlaced {
                        name: name.to_string(),
                        primary: groups[previous].primary().to_string(),
                    });
                }
            }
        }
        Ok(Self { groups, index })
    }
}

impl From<MatchLedger> for Vec<Group> {
    fn from(ledger: MatchLedger) -> Self {
        ledger.groups
    }
}
