use spine_model::payloads::PossibleOperations;
use spine_model::{CmdPayload, FeatureType, Filter, Function};

use crate::error::SpineError;

/// Read/write permissions a feature declares for one function.
#[derive(Clone, Copy, Debug)]
pub struct Operations {
    read: bool,
    write: bool,
    write_without_binding: bool,
}

impl Operations {
    pub fn new(read: bool, write: bool) -> Self {
        Self { read, write, write_without_binding: false }
    }

    pub fn read(&self) -> bool {
        self.read
    }

    pub fn write(&self) -> bool {
        self.write
    }

    pub fn write_without_binding(&self) -> bool {
        self.write_without_binding
    }

    pub(crate) fn allow_write_without_binding(&mut self) {
        self.write_without_binding = true;
    }

    pub fn information(&self) -> PossibleOperations {
        PossibleOperations::new(self.read, self.write)
    }
}

/// Cell holding the last known value of one data function. Owned exclusively
/// by its feature; callers only ever see copies.
#[derive(Debug)]
pub struct FunctionData {
    function: Function,
    data: Option<CmdPayload>,
}

impl FunctionData {
    pub fn new(function: Function) -> Self {
        Self { function, data: None }
    }

    pub fn function(&self) -> Function {
        self.function
    }

    pub fn data_copy(&self) -> Option<CmdPayload> {
        self.data.clone()
    }

    /// Merges `incoming` into the cell under the apply-update contract.
    pub fn update(
        &mut self,
        incoming: &CmdPayload,
        partial: Option<&Filter>,
        delete: Option<&Filter>,
    ) -> Result<(), SpineError> {
        if incoming.function() != self.function {
            return Err(SpineError::NotSupported(format!(
                "cannot update function '{}' with data for '{}'",
                self.function,
                incoming.function()
            )));
        }
        let mut base = self.data.take().unwrap_or_else(|| CmdPayload::empty(self.function));
        base.update(incoming, partial, delete);
        self.data = Some(base);
        Ok(())
    }
}

/// Functions a feature of the given type hosts. Cells for these are created
/// at feature construction time.
pub(crate) fn functions_for_feature_type(ftype: FeatureType) -> &'static [Function] {
    match ftype {
        FeatureType::NodeManagement => &[Function::NodeManagementDetailedDiscoveryData],
        FeatureType::DeviceClassification => &[Function::DeviceClassificationManufacturerData],
        FeatureType::DeviceDiagnosis => &[Function::DeviceDiagnosisHeartbeatData],
        FeatureType::LoadControl => &[Function::LoadControlLimitListData],
        FeatureType::Measurement => &[Function::MeasurementListData],
        FeatureType::ElectricalConnection | FeatureType::Generic => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spine_model::payloads::DeviceClassificationManufacturerData;

    fn manufacturer(name: &str) -> CmdPayload {
        CmdPayload::DeviceClassificationManufacturerData(DeviceClassificationManufacturerData {
            device_name: Some(name.into()),
            ..Default::default()
        })
    }

    #[test]
    fn update_replaces_and_copies_are_detached() {
        let mut sut = FunctionData::new(Function::DeviceClassificationManufacturerData);
        assert_eq!(sut.data_copy(), None);

        sut.update(&manufacturer("device name"), None, None).expect("update");
        let first = sut.data_copy();

        sut.update(&manufacturer("new device name"), None, None).expect("update");
        let second = sut.data_copy();

        assert_eq!(first, Some(manufacturer("device name")));
        assert_eq!(second, Some(manufacturer("new device name")));
        assert_eq!(sut.function(), Function::DeviceClassificationManufacturerData);
    }

    #[test]
    fn mismatched_function_is_rejected() {
        let mut sut = FunctionData::new(Function::LoadControlLimitListData);
        let result = sut.update(&manufacturer("x"), None, None);
        assert!(matches!(result, Err(SpineError::NotSupported(_))));
    }
}
