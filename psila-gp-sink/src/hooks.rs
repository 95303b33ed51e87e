//! # Application hooks
//!
//! The sink calls these at fixed points of commissioning and forwarding.
//! Every method has a default, an application overrides what it needs.

use psila_gp_data::green_power::commands::{CommissioningNotification, Notification};
use psila_gp_data::green_power::{ApplicationInformation, SinkTableEntry};
use psila_gp_data::GpdAddress;

use crate::timer::TimeoutKind;
use crate::translation::TranslationEntry;

/// Change about to be made to the sink table
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SinkTableAction {
    /// A GPD is added or updated
    AddGpd,
    /// A GPD is removed
    RemoveGpd,
}

/// Application hooks
pub trait SinkHooks {
    /// A commissioning notification was received, return true if the
    /// application handled it
    fn commissioning_notification(&mut self, _notification: &CommissioningNotification) -> bool {
        false
    }

    /// Functionality match override. Return the number of matching
    /// commands to skip the built-in matcher and translation table update,
    /// `None` to use them.
    fn gpd_commissioning(
        &mut self,
        _address: &GpdAddress,
        _device_id: u8,
        _information: &ApplicationInformation,
    ) -> Option<usize> {
        None
    }

    /// Approve a sink table change, returning false vetoes it
    fn sink_table_access(&mut self, _action: SinkTableAction, _entry: &SinkTableEntry) -> bool {
        true
    }

    /// A frame from `address` failed the security checks
    fn security_failure(&mut self, _address: &GpdAddress) {}

    /// A GPD was paired with `endpoints`
    fn pairing_complete(&mut self, _address: &GpdAddress, _endpoints: &[u8]) {}

    /// A commissioning timer expired
    fn commissioning_timeout(&mut self, _kind: TimeoutKind, _endpoints: &[u8]) {}

    /// Forwarding override, return true if the application handled the
    /// notification
    fn forward_notification(&mut self, _notification: &Notification) -> bool {
        false
    }

    /// A translation table entry was added or removed
    fn translation_table_update(&mut self, _entry: &TranslationEntry, _added: bool) {}
}

/// Hooks with the default behaviour
#[derive(Copy, Clone, Debug, Default)]
pub struct NoHooks;

impl SinkHooks for NoHooks {}
