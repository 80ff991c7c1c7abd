//! # spine-model
//!
//! Protocol data model for the SPINE engine: hierarchical addressing
//! (device, entity path, feature id), datagram headers and payloads, the
//! command tagged union over the supported function payloads, partial/delete
//! filters, and the keyed list-merge contract every list payload honors.
//!
//! The model is pure data: no I/O, no state machines. The engine crate
//! (`spine`) drives dispatch, correlation and relationship management on top
//! of these types.

pub mod address;
pub mod command;
pub mod datagram;
pub mod duration;
pub mod filter;
pub mod payloads;
pub mod result_data;
pub mod types;
pub mod update;

pub use address::{DeviceAddress, EntityAddress, FeatureAddress};
pub use command::{Cmd, CmdPayload};
pub use datagram::{CmdClassifier, Datagram, DatagramEnvelope, Header, Payload, SPECIFICATION_VERSION};
pub use duration::XsDuration;
pub use filter::{CmdControl, Filter, LoadControlLimitSelectors, MeasurementSelectors, Selector};
pub use result_data::{ErrorNumber, ResultData};
pub use types::{
    DeviceType, EntityType, FeatureType, Function, MsgCounter, NetworkFeatureSet, Role,
};
pub use update::{update_list, ListData};
