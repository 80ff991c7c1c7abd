use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use spine_model::payloads::{FeatureDescription, FeatureInformation, FunctionProperty};
use spine_model::{
    Cmd, CmdClassifier, CmdPayload, FeatureAddress, FeatureType, Function, MsgCounter, ResultData,
    Role,
};

use crate::api::{Message, ResultHandler, ResultMessage};
use crate::device_local::DeviceLocalInner;
use crate::error::SpineError;
use crate::events::{ElementChange, EventPayload, EventType};
use crate::feature_remote::FeatureRemote;
use crate::function_data::{functions_for_feature_type, FunctionData, Operations};
use crate::pending_requests::PendingRequests;

type ResultCallback = Box<dyn FnOnce(ResultMessage) + Send>;

/// A feature hosted on the local device: the dispatch state machine for
/// inbound commands plus the outbound read/notify/write/relationship
/// operations.
pub struct FeatureLocal {
    address: FeatureAddress,
    ftype: FeatureType,
    role: Role,
    description: Mutex<Option<String>>,
    device: Weak<DeviceLocalInner>,
    operations: Mutex<HashMap<Function, Operations>>,
    function_data: Mutex<HashMap<Function, FunctionData>>,
    pending_requests: PendingRequests,
    result_handlers: Mutex<Vec<Arc<dyn ResultHandler>>>,
    result_callbacks: Mutex<HashMap<MsgCounter, ResultCallback>>,
    bindings: Mutex<Vec<FeatureAddress>>,
    subscriptions: Mutex<Vec<FeatureAddress>>,
}

impl FeatureLocal {
    pub(crate) fn new(
        address: FeatureAddress,
        ftype: FeatureType,
        role: Role,
        device: Weak<DeviceLocalInner>,
    ) -> Arc<Self> {
        let mut cells = HashMap::new();
        for function in functions_for_feature_type(ftype) {
            cells.insert(*function, FunctionData::new(*function));
        }
        Arc::new(Self {
            address,
            ftype,
            role,
            description: Mutex::new(None),
            device,
            operations: Mutex::new(HashMap::new()),
            function_data: Mutex::new(cells),
            pending_requests: PendingRequests::new(),
            result_handlers: Mutex::new(Vec::new()),
            result_callbacks: Mutex::new(HashMap::new()),
            bindings: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    pub fn address(&self) -> &FeatureAddress {
        &self.address
    }

    pub fn feature_type(&self) -> FeatureType {
        self.ftype
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn description(&self) -> Option<String> {
        self.description.lock().expect("description poisoned").clone()
    }

    pub fn set_description(&self, description: impl Into<String>) {
        *self.description.lock().expect("description poisoned") = Some(description.into());
    }

    /// Declares a supported function with its operations. Only server and
    /// special features advertise operations.
    pub fn add_function_type(&self, function: Function, read: bool, write: bool) {
        if self.role != Role::Server && self.role != Role::Special {
            return;
        }
        self.operations
            .lock()
            .expect("operations poisoned")
            .entry(function)
            .or_insert_with(|| Operations::new(read, write));
    }

    /// Exempts a writable function from the binding requirement.
    pub fn allow_write_without_binding(&self, function: Function) {
        if let Some(operations) =
            self.operations.lock().expect("operations poisoned").get_mut(&function)
        {
            operations.allow_write_without_binding();
        }
    }

    pub fn data_copy(&self, function: Function) -> Option<CmdPayload> {
        self.function_data
            .lock()
            .expect("function data poisoned")
            .get(&function)
            .and_then(FunctionData::data_copy)
    }

    /// Replaces the cell value and notifies every subscribed remote client
    /// feature.
    pub fn set_data(&self, function: Function, data: CmdPayload) {
        let updated = {
            let mut cells = self.function_data.lock().expect("function data poisoned");
            match cells.get_mut(&function) {
                Some(cell) => cell.update(&data, None, None).is_ok(),
                None => false,
            }
        };
        if !updated {
            log::warn!("set_data: feature '{}' does not host function '{function}'", self.address);
            return;
        }
        if let Some(device) = self.device.upgrade() {
            device.notify_subscribers(&self.address, Cmd::new(data));
        }
    }

    pub fn add_result_handler(&self, handler: Arc<dyn ResultHandler>) {
        self.result_handlers.lock().expect("result handlers poisoned").push(handler);
    }

    /// Registers a one-shot callback fired when a result referencing
    /// `msg_counter_reference` arrives.
    pub fn add_result_callback(
        &self,
        msg_counter_reference: MsgCounter,
        callback: impl FnOnce(ResultMessage) + Send + 'static,
    ) {
        self.result_callbacks
            .lock()
            .expect("result callbacks poisoned")
            .insert(msg_counter_reference, Box::new(callback));
    }

    /// Discovery description of this feature and its supported functions.
    pub fn information(&self) -> FeatureInformation {
        let supported_function = self
            .operations
            .lock()
            .expect("operations poisoned")
            .iter()
            .map(|(function, operations)| FunctionProperty {
                function: *function,
                possible_operations: Some(operations.information()),
            })
            .collect();
        FeatureInformation {
            description: Some(FeatureDescription {
                feature_address: Some(self.address.clone()),
                feature_type: Some(self.ftype),
                role: Some(self.role),
                supported_function,
                description: self.description(),
            }),
        }
    }

    /// Sends a read request for `function` to the destination and registers
    /// a pending request sized to the destination's maximum response delay.
    pub fn request_data(
        &self,
        function: Function,
        destination: &FeatureRemote,
    ) -> Result<MsgCounter, SpineError> {
        self.require_function(function)?;
        let cmd = Cmd::new(CmdPayload::empty(function));
        let msg_counter = destination.sender().request(
            CmdClassifier::Read,
            &self.address,
            destination.address(),
            false,
            vec![cmd],
        )?;
        self.pending_requests.add(
            destination.ski(),
            msg_counter,
            destination.max_response_delay(),
        );
        Ok(msg_counter)
    }

    /// Blocks until the response for `msg_counter` arrives or the request
    /// expires.
    pub async fn fetch_request_data(
        &self,
        msg_counter: MsgCounter,
        destination: &FeatureRemote,
    ) -> Result<Option<CmdPayload>, SpineError> {
        self.pending_requests.get_data(destination.ski(), msg_counter).await
    }

    /// Sends the current data of `function` as a notification.
    pub fn notify_data(
        &self,
        function: Function,
        destination: &FeatureRemote,
    ) -> Result<MsgCounter, SpineError> {
        let data = self.payload_for_send(function)?;
        destination.sender().notify(&self.address, destination.address(), Cmd::new(data))
    }

    /// Sends the current data of `function` as a write to a remote server
    /// feature.
    pub fn write_data(
        &self,
        function: Function,
        destination: &FeatureRemote,
    ) -> Result<MsgCounter, SpineError> {
        let data = self.payload_for_send(function)?;
        destination.sender().write(&self.address, destination.address(), Cmd::new(data))
    }

    /// Subscribes this feature to a remote server feature. The relationship
    /// is recorded locally without waiting for the peer's confirmation.
    pub fn subscribe(&self, remote_address: &FeatureAddress) -> Result<MsgCounter, SpineError> {
        let remote_device = self.remote_device_for(remote_address)?;
        if self.role == Role::Server {
            return Err(SpineError::CommandRejected(format!(
                "the server feature '{}' cannot request a subscription",
                self.address
            )));
        }
        let msg_counter =
            remote_device.sender().subscribe(&self.address, remote_address, self.ftype)?;
        self.subscriptions.lock().expect("subscriptions poisoned").push(remote_address.clone());
        Ok(msg_counter)
    }

    /// Removes a subscription to a remote feature, best-effort.
    pub fn remove_subscription(&self, remote_address: &FeatureAddress) {
        let Ok(remote_device) = self.remote_device_for(remote_address) else {
            return;
        };
        if let Err(err) = remote_device.sender().unsubscribe(&self.address, remote_address) {
            log::debug!("unsubscribe from '{remote_address}' failed: {err}");
            return;
        }
        self.subscriptions
            .lock()
            .expect("subscriptions poisoned")
            .retain(|address| address != remote_address);
    }

    pub fn remove_all_subscriptions(&self) {
        let subscriptions = self.subscriptions.lock().expect("subscriptions poisoned").clone();
        for address in subscriptions {
            self.remove_subscription(&address);
        }
    }

    pub fn subscriptions(&self) -> Vec<FeatureAddress> {
        self.subscriptions.lock().expect("subscriptions poisoned").clone()
    }

    /// Binds this feature to a remote server feature. The relationship is
    /// recorded locally without waiting for the peer's confirmation.
    pub fn bind(&self, remote_address: &FeatureAddress) -> Result<MsgCounter, SpineError> {
        let remote_device = self.remote_device_for(remote_address)?;
        if self.role == Role::Server {
            return Err(SpineError::CommandRejected(format!(
                "the server feature '{}' cannot request a binding",
                self.address
            )));
        }
        let msg_counter = remote_device.sender().bind(&self.address, remote_address, self.ftype)?;
        self.bindings.lock().expect("bindings poisoned").push(remote_address.clone());
        Ok(msg_counter)
    }

    /// Removes a binding to a remote feature, best-effort.
    pub fn remove_binding(&self, remote_address: &FeatureAddress) {
        let Ok(remote_device) = self.remote_device_for(remote_address) else {
            return;
        };
        if let Err(err) = remote_device.sender().unbind(&self.address, remote_address) {
            log::debug!("unbind from '{remote_address}' failed: {err}");
            return;
        }
        self.bindings
            .lock()
            .expect("bindings poisoned")
            .retain(|address| address != remote_address);
    }

    pub fn remove_all_bindings(&self) {
        let bindings = self.bindings.lock().expect("bindings poisoned").clone();
        for address in bindings {
            self.remove_binding(&address);
        }
    }

    pub fn bindings(&self) -> Vec<FeatureAddress> {
        self.bindings.lock().expect("bindings poisoned").clone()
    }

    /// Routes one inbound command to its classifier handler.
    pub fn handle_message(&self, message: &Message) -> Result<(), SpineError> {
        if let Some(result) = message.cmd.result() {
            return self.process_result(result, message);
        }

        let function = message
            .cmd
            .function()
            .ok_or_else(|| SpineError::NotSupported("no function found for cmd data".to_string()))?;

        match message.request_header.cmd_classifier {
            CmdClassifier::Read => self.process_read(function, message),
            CmdClassifier::Reply => self.process_reply(function, message),
            CmdClassifier::Notify => self.process_notify(function, message),
            CmdClassifier::Write => self.process_write(function, message),
            other => {
                Err(SpineError::NotSupported(format!("cmd classifier not implemented: {other:?}")))
            }
        }
    }

    fn process_result(&self, result: &ResultData, message: &Message) -> Result<(), SpineError> {
        if message.request_header.cmd_classifier != CmdClassifier::Result {
            return Err(SpineError::NotSupported(format!(
                "result data with cmd classifier {:?} not implemented",
                message.request_header.cmd_classifier
            )));
        }

        if result.is_error() {
            log::debug!(
                "error result received {}: {}",
                result.error_number,
                result.description.as_deref().unwrap_or("no description")
            );
        }

        let Some(reference) = message.request_header.msg_counter_reference else {
            return Ok(());
        };

        // Requests do not require a pending entry; a miss only means nobody
        // is waiting.
        let _ = self.pending_requests.set_result(message.device_remote.ski(), reference, result);

        if !result.is_error() {
            return Ok(());
        }

        let result_message = ResultMessage {
            msg_counter_reference: reference,
            result: result.clone(),
            local_feature: self.address.clone(),
            remote_feature: message.feature_remote.as_ref().map(|f| f.address().clone()),
            ski: message.device_remote.ski().to_string(),
        };

        let handlers = self.result_handlers.lock().expect("result handlers poisoned").clone();
        for handler in handlers {
            let delivery = result_message.clone();
            tokio::spawn(async move { handler.handle_result(delivery) });
        }

        let callback =
            self.result_callbacks.lock().expect("result callbacks poisoned").remove(&reference);
        if let Some(callback) = callback {
            tokio::spawn(async move { callback(result_message) });
        }

        Ok(())
    }

    fn process_read(&self, function: Function, message: &Message) -> Result<(), SpineError> {
        if self.role == Role::Client {
            // Read requests to a client feature are not allowed.
            return Err(SpineError::CommandRejected(format!(
                "feature '{}' is a client and cannot be read",
                self.address
            )));
        }

        let data = self.payload_for_send(function)?;
        message.device_remote.sender().reply(&message.request_header, &self.address, Cmd::new(data))
    }

    fn process_reply(&self, function: Function, message: &Message) -> Result<(), SpineError> {
        let remote = self.require_remote_feature(message)?;
        self.merge_into_remote(function, &remote, message)?;

        if let Some(reference) = message.request_header.msg_counter_reference {
            if let Some(data) = message.cmd.payload.clone() {
                // A miss only means nobody is waiting on this counter.
                let _ =
                    self.pending_requests.set_data(message.device_remote.ski(), reference, data);
            }
        }

        self.publish_data_change(CmdClassifier::Reply, function, &remote, message);
        Ok(())
    }

    fn process_notify(&self, function: Function, message: &Message) -> Result<(), SpineError> {
        let remote = self.require_remote_feature(message)?;
        self.merge_into_remote(function, &remote, message)?;
        self.publish_data_change(CmdClassifier::Notify, function, &remote, message);
        Ok(())
    }

    fn process_write(&self, function: Function, message: &Message) -> Result<(), SpineError> {
        if self.role != Role::Server && self.role != Role::Special {
            return Err(SpineError::CommandRejected(format!(
                "feature '{}' does not accept writes",
                self.address
            )));
        }

        let operations =
            self.operations.lock().expect("operations poisoned").get(&function).copied();
        let operations = operations.filter(|operations| operations.write()).ok_or_else(|| {
            SpineError::CommandRejected(format!(
                "write is not enabled for function '{function}' on '{}'",
                self.address
            ))
        })?;

        let remote = self.require_remote_feature(message)?;

        if !operations.write_without_binding() {
            let device = self.require_device()?;
            if !device.binding_manager().has_binding(remote.address(), &self.address) {
                return Err(SpineError::CommandRejected(format!(
                    "no binding from '{}' to '{}'",
                    remote.address(),
                    self.address
                )));
            }
        }

        let payload = message
            .cmd
            .payload
            .as_ref()
            .ok_or_else(|| SpineError::NotSupported("no function found for cmd data".to_string()))?;
        {
            let mut cells = self.function_data.lock().expect("function data poisoned");
            let cell = cells.get_mut(&function).ok_or_else(|| {
                SpineError::NotSupported(format!(
                    "feature '{}' does not host function '{function}'",
                    self.address
                ))
            })?;
            cell.update(payload, message.cmd.filter_partial(), message.cmd.filter_delete())?;
        }

        if let Some(device) = self.device.upgrade() {
            device.events().publish(EventPayload {
                ski: message.device_remote.ski().to_string(),
                event_type: EventType::DataChange,
                change_type: ElementChange::Update,
                classifier: Some(CmdClassifier::Write),
                feature: self.address.clone(),
                function: Some(function),
                data: self.data_copy(function),
            });
        }
        Ok(())
    }

    fn merge_into_remote(
        &self,
        function: Function,
        remote: &Arc<FeatureRemote>,
        message: &Message,
    ) -> Result<(), SpineError> {
        let payload = message
            .cmd
            .payload
            .as_ref()
            .ok_or_else(|| SpineError::NotSupported("no function found for cmd data".to_string()))?;
        remote.update_data(
            function,
            payload,
            message.cmd.filter_partial(),
            message.cmd.filter_delete(),
        )
    }

    fn publish_data_change(
        &self,
        classifier: CmdClassifier,
        function: Function,
        remote: &Arc<FeatureRemote>,
        message: &Message,
    ) {
        if let Some(device) = self.device.upgrade() {
            device.events().publish(EventPayload {
                ski: message.device_remote.ski().to_string(),
                event_type: EventType::DataChange,
                change_type: ElementChange::Update,
                classifier: Some(classifier),
                feature: remote.address().clone(),
                function: Some(function),
                data: remote.data_copy(function),
            });
        }
    }

    /// Current cell data, or the empty payload when the cell has no value
    /// yet.
    fn payload_for_send(&self, function: Function) -> Result<CmdPayload, SpineError> {
        self.require_function(function)?;
        Ok(self.data_copy(function).unwrap_or_else(|| CmdPayload::empty(function)))
    }

    pub(crate) fn operations_for(&self, function: Function) -> Option<Operations> {
        self.operations.lock().expect("operations poisoned").get(&function).copied()
    }

    fn require_function(&self, function: Function) -> Result<(), SpineError> {
        if !self.function_data.lock().expect("function data poisoned").contains_key(&function) {
            return Err(SpineError::NotSupported(format!(
                "feature '{}' does not host function '{function}'",
                self.address
            )));
        }
        Ok(())
    }

    fn require_remote_feature(&self, message: &Message) -> Result<Arc<FeatureRemote>, SpineError> {
        message.feature_remote.clone().ok_or_else(|| {
            SpineError::AddressNotFound(format!(
                "no known remote feature at '{}'",
                message.request_header.address_source
            ))
        })
    }

    fn require_device(&self) -> Result<Arc<DeviceLocalInner>, SpineError> {
        self.device
            .upgrade()
            .ok_or_else(|| SpineError::AddressNotFound("local device dropped".to_string()))
    }

    fn remote_device_for(
        &self,
        remote_address: &FeatureAddress,
    ) -> Result<Arc<crate::device_remote::DeviceRemote>, SpineError> {
        let device_address = remote_address
            .device
            .as_ref()
            .ok_or_else(|| SpineError::AddressNotFound("destination device not set".to_string()))?;
        let device = self.require_device()?;
        device.remote_device_for_address(device_address).ok_or_else(|| {
            SpineError::AddressNotFound(format!("unknown remote device '{device_address}'"))
        })
    }
}
