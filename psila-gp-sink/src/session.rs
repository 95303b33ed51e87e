//! # Commissioning sessions
//!
//! A session holds what a GPD has told the sink while it is commissioned,
//! from the first commissioning frame until the pairing is finalised or a
//! timer expires. The pool has a fixed capacity.

use psila_gp_data::green_power::frame::{
    report_length, CommissioningOptions, ReportDescriptors, MIN_REPORT_LENGTH,
};
use psila_gp_data::green_power::commands::{PairedEndpoints, ProxyInfo};
use psila_gp_data::green_power::{
    ApplicationInformation, CommunicationMode, GroupList, SecurityOptions,
    DEFAULT_GROUPCAST_RADIUS,
};
use psila_gp_data::{GpdAddress, Key, ShortAddress};

use crate::config::{MAX_REPORT_BUFFER, MAX_SESSIONS};
use crate::timer::Timer;
use crate::Error;

/// State of a commissioning session
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum CommissioningState {
    /// Nothing received yet
    Idle,
    /// Waiting for application description frames
    CollectReports,
    /// A commissioning reply is to be sent to the GPD
    SendCommissioningReply,
    /// Waiting for the success frame of a bidirectional GPD
    WaitForSuccess,
    /// Ready to commit the pairing
    FinalisePairing,
    /// The pairing has been committed
    PairingDone,
}

/// Report descriptors collected from application description frames
#[derive(Clone, Debug, PartialEq)]
pub struct ReportAccumulator {
    capacity: usize,
    total: u8,
    count: u8,
    data: heapless::Vec<u8, MAX_REPORT_BUFFER>,
}

impl ReportAccumulator {
    /// Create a accumulator holding at most `capacity` octets, no more
    /// than `MAX_REPORT_BUFFER`
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.min(MAX_REPORT_BUFFER),
            total: 0,
            count: 0,
            data: heapless::Vec::new(),
        }
    }

    /// Forget all reports
    pub fn reset(&mut self) {
        self.total = 0;
        self.count = 0;
        self.data.clear();
    }

    /// Number of reports the GPD has declared
    pub fn total(&self) -> u8 {
        self.total
    }

    /// Set the number of reports the GPD has declared
    pub fn set_total(&mut self, total: u8) {
        self.total = total;
    }

    /// Number of distinct reports stored
    pub fn count(&self) -> u8 {
        self.count
    }

    /// The stored report descriptors
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// True if no report is stored
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// True when every declared report has been received
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.count >= self.total
    }

    /// Iterate over the stored report descriptors
    pub fn descriptors(&self) -> ReportDescriptors<'_> {
        ReportDescriptors::new(&self.data)
    }

    /// True if a report with `id` is stored
    pub fn contains(&self, id: u8) -> bool {
        frame_contains(&self.data, id)
    }

    /// Store the reports of one application description frame. Reports
    /// already stored are skipped. Either every new report is stored or,
    /// on error, none.
    pub fn save(&mut self, reports: &[u8]) -> Result<usize, Error> {
        let mut offset = 0;
        let mut added = 0usize;
        let mut added_length = 0usize;
        let mut fresh: Vec<(usize, usize)> = Vec::new();
        while offset < reports.len() {
            let length = report_length(&reports[offset..])?;
            if length < MIN_REPORT_LENGTH {
                log::warn!("Report descriptor too short, {} octets", length);
                return Err(Error::MalformedPacket);
            }
            if offset + length > reports.len() {
                log::warn!("Report descriptor past the end of the frame");
                return Err(Error::MalformedPacket);
            }
            let id = reports[offset];
            let duplicate = self.contains(id)
                || fresh.iter().any(|(start, _)| reports[*start] == id);
            if duplicate {
                log::debug!("Skip duplicate report {}", id);
            } else {
                fresh.push((offset, length));
                added += 1;
                added_length += length;
            }
            offset += length;
        }
        if self.data.len() + added_length > self.capacity {
            log::warn!(
                "Report buffer full, {} + {} octets",
                self.data.len(),
                added_length
            );
            return Err(Error::NotEnoughSpace);
        }
        for (start, length) in fresh {
            self.data
                .extend_from_slice(&reports[start..start + length])
                .map_err(|_| Error::NotEnoughSpace)?;
        }
        self.count = self.count.saturating_add(added as u8);
        Ok(added)
    }
}

/// True if the report descriptors in `data` include `id`
pub fn frame_contains(data: &[u8], id: u8) -> bool {
    ReportDescriptors::new(data)
        .filter_map(|report| report.ok())
        .any(|report| report.id == id)
}

/// Commissioning context of one GPD
#[derive(Clone, Debug, PartialEq)]
pub struct CommissioningSession {
    /// GPD address
    pub address: GpdAddress,
    /// State
    pub state: CommissioningState,
    /// Device identifier
    pub device_id: u8,
    /// Capabilities from the commissioning frame
    pub options: CommissioningOptions,
    /// Application information
    pub information: ApplicationInformation,
    /// Sink endpoints to pair with
    pub endpoints: PairedEndpoints,
    /// Negotiated security
    pub security: SecurityOptions,
    /// GPD key
    pub key: Option<Key>,
    /// GPD outgoing frame counter
    pub outgoing_counter: u32,
    /// Collected report descriptors
    pub reports: ReportAccumulator,
    /// The proxy that reported the GPD
    pub proxy: Option<ProxyInfo>,
    /// Forwarding mode of the pairing
    pub communication_mode: CommunicationMode,
    /// Assigned alias
    pub alias: Option<ShortAddress>,
    /// Pre-commissioned groups
    pub groups: GroupList,
    /// Groupcast radius
    pub radius: u8,
    /// Do not send GP Pairing when finalised
    pub suppress_pairing: bool,
    /// The GPD listens after each transmission
    pub rx_after_tx: bool,
    /// The GPD key is exchanged encrypted
    pub key_encryption: bool,
    /// Bounds the commissioning of a generic switch
    pub switch_timer: Timer,
    /// Bounds the collection of application descriptions
    pub report_timer: Timer,
}

impl CommissioningSession {
    /// Create a idle session
    pub fn new(address: GpdAddress, report_capacity: usize) -> Self {
        Self {
            address,
            state: CommissioningState::Idle,
            device_id: 0xff,
            options: CommissioningOptions::default(),
            information: ApplicationInformation::default(),
            endpoints: PairedEndpoints::Commissioning,
            security: SecurityOptions::none(),
            key: None,
            outgoing_counter: 0,
            reports: ReportAccumulator::new(report_capacity),
            proxy: None,
            communication_mode: CommunicationMode::DerivedGroupcast,
            alias: None,
            groups: GroupList::new(),
            radius: DEFAULT_GROUPCAST_RADIUS,
            suppress_pairing: false,
            rx_after_tx: false,
            key_encryption: false,
            switch_timer: Timer::default(),
            report_timer: Timer::default(),
        }
    }

    /// Forget the collected reports, the switch information is kept
    pub fn partial_reset(&mut self) {
        self.reports.reset();
        self.report_timer.cancel();
    }

    /// Milliseconds until the first timer of the session expires
    pub fn remaining(&self, now: u32) -> Option<u32> {
        match (self.switch_timer.remaining(now), self.report_timer.remaining(now)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// Fixed capacity pool of commissioning sessions
#[derive(Clone, Debug)]
pub struct SessionPool {
    capacity: usize,
    report_capacity: usize,
    sessions: heapless::Vec<CommissioningSession, MAX_SESSIONS>,
}

impl SessionPool {
    /// Create a pool of `capacity` sessions, each with a report buffer of
    /// `report_capacity` octets
    pub fn new(capacity: usize, report_capacity: usize) -> Self {
        Self {
            capacity: capacity.min(MAX_SESSIONS),
            report_capacity,
            sessions: heapless::Vec::new(),
        }
    }

    /// Number of allocated sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True if no session is allocated
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Index of the session for `address`
    pub fn find(&self, address: &GpdAddress) -> Option<usize> {
        self.sessions.iter().position(|s| s.address.matches(address))
    }

    /// The session for `address`, or a new one. A new session is only
    /// handed out while the sink table has more free slots than there are
    /// sessions.
    pub fn allocate(&mut self, address: &GpdAddress, free_slots: usize) -> Result<usize, Error> {
        if let Some(index) = self.find(address) {
            return Ok(index);
        }
        if self.sessions.len() >= self.capacity || self.sessions.len() >= free_slots {
            log::warn!(
                "No free commissioning session, {} allocated, {} free slots",
                self.sessions.len(),
                free_slots
            );
            return Err(Error::NoFreeSession);
        }
        self.sessions
            .push(CommissioningSession::new(*address, self.report_capacity))
            .map_err(|_| Error::NoFreeSession)?;
        Ok(self.sessions.len() - 1)
    }

    /// Session at `index`
    pub fn get(&self, index: usize) -> Option<&CommissioningSession> {
        self.sessions.get(index)
    }

    /// Mutable session at `index`
    pub fn get_mut(&mut self, index: usize) -> Option<&mut CommissioningSession> {
        self.sessions.get_mut(index)
    }

    /// Release the session at `index`
    pub fn free(&mut self, index: usize) -> Option<CommissioningSession> {
        if index < self.sessions.len() {
            Some(self.sessions.swap_remove(index))
        } else {
            None
        }
    }

    /// Release the session of `address`
    pub fn free_address(&mut self, address: &GpdAddress) -> Option<CommissioningSession> {
        self.find(address).and_then(|index| self.free(index))
    }

    /// Release every session
    pub fn reset_all(&mut self) {
        self.sessions.clear();
    }

    /// Iterate over the sessions
    pub fn iter(&self) -> impl Iterator<Item = &CommissioningSession> {
        self.sessions.iter()
    }

    /// Milliseconds until the first session timer expires
    pub fn remaining(&self, now: u32) -> Option<u32> {
        self.sessions.iter().filter_map(|s| s.remaining(now)).min()
    }
}
