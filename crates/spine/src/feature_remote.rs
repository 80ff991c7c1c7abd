use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use spine_model::{CmdPayload, FeatureAddress, FeatureType, Filter, Function, Role};

use crate::error::SpineError;
use crate::function_data::{functions_for_feature_type, FunctionData};
use crate::sender::Sender;

/// Local mirror of a feature hosted on a remote device. Reply and notify
/// merges land in its cached cells.
pub struct FeatureRemote {
    address: FeatureAddress,
    ftype: FeatureType,
    role: Role,
    ski: String,
    sender: Arc<Sender>,
    max_response_delay: Arc<Mutex<Duration>>,
    function_data: Mutex<HashMap<Function, FunctionData>>,
}

impl FeatureRemote {
    pub(crate) fn new(
        address: FeatureAddress,
        ftype: FeatureType,
        role: Role,
        ski: String,
        sender: Arc<Sender>,
        max_response_delay: Arc<Mutex<Duration>>,
    ) -> Arc<Self> {
        let mut cells = HashMap::new();
        for function in functions_for_feature_type(ftype) {
            cells.insert(*function, FunctionData::new(*function));
        }
        Arc::new(Self {
            address,
            ftype,
            role,
            ski,
            sender,
            max_response_delay,
            function_data: Mutex::new(cells),
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

    pub fn ski(&self) -> &str {
        &self.ski
    }

    pub fn sender(&self) -> Arc<Sender> {
        Arc::clone(&self.sender)
    }

    /// Expiry used for pending requests towards this feature's device.
    pub fn max_response_delay(&self) -> Duration {
        *self.max_response_delay.lock().expect("response delay poisoned")
    }

    pub fn data_copy(&self, function: Function) -> Option<CmdPayload> {
        self.function_data
            .lock()
            .expect("remote function data poisoned")
            .get(&function)
            .and_then(FunctionData::data_copy)
    }

    /// Merges received data into the cached cell for `function`.
    pub fn update_data(
        &self,
        function: Function,
        data: &CmdPayload,
        partial: Option<&Filter>,
        delete: Option<&Filter>,
    ) -> Result<(), SpineError> {
        let mut cells = self.function_data.lock().expect("remote function data poisoned");
        let cell = cells.get_mut(&function).ok_or_else(|| {
            SpineError::NotSupported(format!(
                "feature '{}' does not host function '{function}'",
                self.address
            ))
        })?;
        cell.update(data, partial, delete)
    }
}
