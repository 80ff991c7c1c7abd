//! # spine
//!
//! Protocol engine of a device-to-device energy-management messaging stack.
//! It routes typed command messages between hierarchically addressed
//! features on local and remote devices, correlates asynchronous requests
//! with their replies, maintains binding and subscription relationships,
//! and keeps a heartbeat running between two endpoints.
//!
//! The engine sits between two injected boundaries: decoded datagrams come
//! in through [`DeviceLocal::process_cmd`], encoded datagrams go out through
//! the [`DatagramWriter`] registered per remote peer. Transport framing,
//! peer discovery and domain data validation live outside this crate; the
//! wire data model lives in `spine-model`.

pub mod api;
pub mod device_local;
pub mod device_remote;
pub mod entity_local;
pub mod entity_remote;
pub mod error;
pub mod events;
pub mod feature_local;
pub mod feature_remote;
pub mod function_data;
pub mod heartbeat_manager;
mod node_management;
pub mod pending_requests;
pub mod recent_cache;
pub mod relationships;
pub mod sender;

pub use api::{node_management_address, DatagramWriter, Message, ResultHandler, ResultMessage};
pub use device_local::{DeviceConfig, DeviceLocal};
pub use device_remote::{DeviceRemote, DEFAULT_MAX_RESPONSE_DELAY};
pub use entity_local::EntityLocal;
pub use entity_remote::EntityRemote;
pub use error::SpineError;
pub use events::{ElementChange, EventHub, EventPayload, EventType};
pub use feature_local::FeatureLocal;
pub use feature_remote::FeatureRemote;
pub use function_data::{FunctionData, Operations};
pub use heartbeat_manager::HeartbeatManager;
pub use pending_requests::{PendingOutcome, PendingRequests};
pub use relationships::{BindingManager, Relationship, SubscriptionManager};
pub use sender::Sender;
