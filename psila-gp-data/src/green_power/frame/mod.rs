//! # Green Power device frames
//!
//! Payloads of the GPD commands that the sink parses itself, or builds to
//! have a proxy transmit them to a bidirectional GPD.

mod application_description;
mod channel;
mod commissioning;
mod commissioning_reply;

pub use application_description::{
    report_length, ApplicationDescription, AttributeRecord, DataPointDescriptor,
    ReportDescriptor, ReportDescriptors, MIN_REPORT_LENGTH,
};
pub use channel::{ChannelConfiguration, ChannelRequest};
pub use commissioning::{CommissioningFrame, CommissioningOptions, CommissioningSecurity};
pub use commissioning_reply::CommissioningReply;
