// Copyright 2025 Cowboy AI, LLC.

//! Method ownership metadata
//!
//! Every class keeps a side table recording, for each method it carries,
//! which class introduced that method and where parent dispatch continues.
//! Entries are write-once: tagging never touches a name that is already
//! tagged, so a method keeps the identity of the level that declared it.

use std::collections::HashMap;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::member::Member;

/// Where a method was declared and where dispatch continues from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Ownership {
    /// Class whose definition introduced the method
    pub owner: String,
    /// Parent of the owner; `None` at the root
    pub parent: Option<String>,
}

impl Ownership {
    /// Create an ownership record
    pub fn new(owner: impl Into<String>, parent: Option<impl Into<String>>) -> Self {
        Self {
            owner: owner.into(),
            parent: parent.map(Into::into),
        }
    }
}

/// Side table from member name to ownership
#[derive(Debug, Clone, Default)]
pub struct OwnershipTable {
    entries: HashMap<String, Ownership>,
}

impl OwnershipTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Ownership recorded for a member
    pub fn get(&self, member: &str) -> Option<&Ownership> {
        self.entries.get(member)
    }

    /// Check whether a member is tagged
    pub fn is_tagged(&self, member: &str) -> bool {
        self.entries.contains_key(member)
    }

    /// Tag a member unless it already carries ownership
    ///
    /// Returns `true` when the tag was written.
    pub fn tag(&mut self, member: impl Into<String>, ownership: Ownership) -> bool {
        let member = member.into();
        if self.entries.contains_key(&member) {
            return false;
        }
        self.entries.insert(member, ownership);
        true
    }

    /// Forget the tag of a member that has been replaced by a new function
    pub fn clear(&mut self, member: &str) -> Option<Ownership> {
        self.entries.remove(member)
    }

    /// Carry a tag over from another table, replacing whatever was there
    pub(crate) fn inherit(&mut self, member: &str, ownership: Option<&Ownership>) {
        match ownership {
            Some(ownership) => {
                self.entries.insert(member.to_string(), ownership.clone());
            }
            None => {
                self.entries.remove(member);
            }
        }
    }

    /// Number of tagged members
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all tags
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Ownership)> {
        self.entries.iter()
    }
}

/// Stamp every untagged method in `members` with `(owner, parent)`
///
/// Data members are never tagged. Returns the number of tags written.
pub fn tag_members(
    table: &mut OwnershipTable,
    members: &IndexMap<String, Member>,
    owner: &str,
    parent: Option<&str>,
) -> usize {
    let mut tagged = 0;
    for (name, member) in members {
        if member.is_method() && table.tag(name.as_str(), Ownership::new(owner, parent)) {
            tagged += 1;
        }
    }
    tagged
}
