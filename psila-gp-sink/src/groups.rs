//! # APS group table
//!
//! Group memberships of the sink endpoints. Groupcast forwarded GPD
//! commands are received on the Green Power endpoint through these.

use psila_gp_data::GroupIdentifier;

use crate::config::MAX_GROUP_MEMBERSHIPS;
use crate::Error;

/// A endpoint membership of a group
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GroupMembership {
    /// Endpoint
    pub endpoint: u8,
    /// Group
    pub group: GroupIdentifier,
}

/// Group table
#[derive(Clone, Debug)]
pub struct GroupTable {
    capacity: usize,
    memberships: heapless::Vec<GroupMembership, MAX_GROUP_MEMBERSHIPS>,
}

impl GroupTable {
    /// Create a table for `capacity` memberships, at most
    /// `MAX_GROUP_MEMBERSHIPS`
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.min(MAX_GROUP_MEMBERSHIPS),
            memberships: heapless::Vec::new(),
        }
    }

    /// True if `endpoint` is member of `group`
    pub fn contains(&self, endpoint: u8, group: GroupIdentifier) -> bool {
        self.memberships
            .iter()
            .any(|m| m.endpoint == endpoint && m.group == group)
    }

    /// Add `endpoint` to `group`, returns true if the membership is new.
    /// A existing membership is not an error.
    pub fn add(&mut self, endpoint: u8, group: GroupIdentifier) -> Result<bool, Error> {
        if self.contains(endpoint, group) {
            return Ok(false);
        }
        if self.memberships.len() >= self.capacity {
            return Err(Error::GroupTableFull);
        }
        self.memberships
            .push(GroupMembership { endpoint, group })
            .map_err(|_| Error::GroupTableFull)?;
        Ok(true)
    }

    /// Remove `endpoint` from `group`, returns true if it was a member
    pub fn remove(&mut self, endpoint: u8, group: GroupIdentifier) -> bool {
        match self
            .memberships
            .iter()
            .position(|m| m.endpoint == endpoint && m.group == group)
        {
            Some(index) => {
                self.memberships.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Iterate over the memberships
    pub fn iter(&self) -> impl Iterator<Item = &GroupMembership> {
        self.memberships.iter()
    }
}
