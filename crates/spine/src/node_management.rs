//! Dispatch for commands addressed to the well-known node-management
//! feature (entity `[0]`, feature 0): relationship calls and detailed
//! discovery.

use spine_model::{Cmd, CmdClassifier, CmdPayload, Function};

use crate::api::Message;
use crate::device_local::DeviceLocalInner;
use crate::error::SpineError;

impl DeviceLocalInner {
    pub(crate) fn handle_node_management(&self, message: &Message) -> Result<(), SpineError> {
        match message.request_header.cmd_classifier {
            CmdClassifier::Call => self.handle_node_management_call(message),
            CmdClassifier::Read => self.handle_node_management_read(message),
            CmdClassifier::Reply | CmdClassifier::Notify => {
                self.handle_node_management_data(message)
            }
            CmdClassifier::Result => {
                if let Some(result) = message.cmd.result() {
                    if result.is_error() {
                        log::debug!(
                            "node management error result {}: {}",
                            result.error_number,
                            result.description.as_deref().unwrap_or("no description")
                        );
                    }
                }
                Ok(())
            }
            other => Err(SpineError::NotSupported(format!(
                "cmd classifier not implemented for node management: {other:?}"
            ))),
        }
    }

    fn handle_node_management_call(&self, message: &Message) -> Result<(), SpineError> {
        match &message.cmd.payload {
            Some(CmdPayload::NodeManagementSubscriptionRequestCall(call)) => self
                .subscription_manager()
                .add_subscription(&message.device_remote, call.subscription_request.clone()),
            Some(CmdPayload::NodeManagementSubscriptionDeleteCall(call)) => {
                self.subscription_manager()
                    .remove_subscription(call.subscription_delete.clone(), &message.device_remote)?;
                self.update_heartbeat_on_subscriptions();
                Ok(())
            }
            Some(CmdPayload::NodeManagementBindingRequestCall(call)) => self
                .binding_manager()
                .add_binding(&message.device_remote, call.binding_request.clone()),
            Some(CmdPayload::NodeManagementBindingDeleteCall(call)) => self
                .binding_manager()
                .remove_binding(call.binding_delete.clone(), &message.device_remote),
            other => Err(SpineError::NotSupported(format!(
                "call payload not implemented: {:?}",
                other.as_ref().map(CmdPayload::function)
            ))),
        }
    }

    fn handle_node_management_read(&self, message: &Message) -> Result<(), SpineError> {
        match message.cmd.function() {
            Some(Function::NodeManagementDetailedDiscoveryData) => {
                let discovery = self.information();
                let destination = message.request_header.address_destination.clone();
                message.device_remote.sender().reply(
                    &message.request_header,
                    &destination,
                    Cmd::new(CmdPayload::NodeManagementDetailedDiscoveryData(discovery)),
                )
            }
            other => Err(SpineError::NotSupported(format!(
                "node management read not implemented for {other:?}"
            ))),
        }
    }

    /// Discovery replies and notifications build the mirror of the peer's
    /// entity/feature tree.
    fn handle_node_management_data(&self, message: &Message) -> Result<(), SpineError> {
        match &message.cmd.payload {
            Some(CmdPayload::NodeManagementDetailedDiscoveryData(data)) => {
                message.device_remote.add_entity_and_features(data)?;
                Ok(())
            }
            other => Err(SpineError::NotSupported(format!(
                "node management data not implemented for {:?}",
                other.as_ref().map(CmdPayload::function)
            ))),
        }
    }
}
