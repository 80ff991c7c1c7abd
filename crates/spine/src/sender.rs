use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use spine_model::{
    Cmd, CmdClassifier, CmdPayload, Datagram, DatagramEnvelope, FeatureAddress, FeatureType,
    Header, MsgCounter, Payload, SPECIFICATION_VERSION,
};
use spine_model::payloads::{
    BindingDelete, BindingDeleteCall, BindingRequest, BindingRequestCall, SubscriptionDelete,
    SubscriptionDeleteCall, SubscriptionRequest, SubscriptionRequestCall,
};

use crate::api::{node_management_address, DatagramWriter};
use crate::error::SpineError;
use crate::recent_cache::RecentCache;

/// Notify datagrams kept for correlating late out-of-band results.
const NOTIFY_CACHE_CAPACITY: usize = 100;

/// Builds and transmits datagrams towards one remote device, stamping each
/// with a fresh message counter.
pub struct Sender {
    msg_counter: AtomicU64,
    notify_cache: Mutex<RecentCache<MsgCounter, Datagram>>,
    writer: Arc<dyn DatagramWriter>,
}

impl Sender {
    pub fn new(writer: Arc<dyn DatagramWriter>) -> Self {
        Self {
            msg_counter: AtomicU64::new(0),
            notify_cache: Mutex::new(RecentCache::new(NOTIFY_CACHE_CAPACITY)),
            writer,
        }
    }

    /// Returns the cached datagram for a counter. Only notify datagrams are
    /// cached.
    pub fn datagram_for_msg_counter(&self, counter: MsgCounter) -> Option<Datagram> {
        self.notify_cache
            .lock()
            .expect("notify cache poisoned")
            .get(&counter)
            .cloned()
    }

    /// Sends a request (read or call) datagram.
    pub fn request(
        &self,
        classifier: CmdClassifier,
        sender_address: &FeatureAddress,
        destination_address: &FeatureAddress,
        ack_request: bool,
        cmd: Vec<Cmd>,
    ) -> Result<MsgCounter, SpineError> {
        let msg_counter = self.next_msg_counter();
        let datagram = Datagram {
            header: Header {
                specification_version: Some(SPECIFICATION_VERSION.to_string()),
                address_source: sender_address.clone(),
                address_destination: destination_address.clone(),
                msg_counter,
                msg_counter_reference: None,
                cmd_classifier: classifier,
                ack_request: ack_request.then_some(true),
            },
            payload: Payload { cmd },
        };
        self.send_datagram(datagram)?;
        Ok(msg_counter)
    }

    /// Acknowledges a request with a success result.
    pub fn result_success(
        &self,
        request_header: &Header,
        sender_address: &FeatureAddress,
    ) -> Result<(), SpineError> {
        self.result(request_header, sender_address, None)
    }

    /// Acknowledges a request with an error result.
    pub fn result_error(
        &self,
        request_header: &Header,
        sender_address: &FeatureAddress,
        error: &SpineError,
    ) -> Result<(), SpineError> {
        self.result(request_header, sender_address, Some(error))
    }

    fn result(
        &self,
        request_header: &Header,
        sender_address: &FeatureAddress,
        error: Option<&SpineError>,
    ) -> Result<(), SpineError> {
        let result_data = match error {
            Some(error) => error.to_result_data(),
            None => Default::default(),
        };
        let datagram = Datagram {
            header: Header {
                specification_version: Some(SPECIFICATION_VERSION.to_string()),
                address_source: reply_source(request_header, sender_address),
                address_destination: request_header.address_source.clone(),
                msg_counter: self.next_msg_counter(),
                msg_counter_reference: Some(request_header.msg_counter),
                cmd_classifier: CmdClassifier::Result,
                ack_request: None,
            },
            payload: Payload { cmd: vec![Cmd::new(CmdPayload::ResultData(result_data))] },
        };
        self.send_datagram(datagram)
    }

    /// Sends a reply to the original requester.
    pub fn reply(
        &self,
        request_header: &Header,
        sender_address: &FeatureAddress,
        cmd: Cmd,
    ) -> Result<(), SpineError> {
        let datagram = Datagram {
            header: Header {
                specification_version: Some(SPECIFICATION_VERSION.to_string()),
                address_source: reply_source(request_header, sender_address),
                address_destination: request_header.address_source.clone(),
                msg_counter: self.next_msg_counter(),
                msg_counter_reference: Some(request_header.msg_counter),
                cmd_classifier: CmdClassifier::Reply,
                ack_request: None,
            },
            payload: Payload { cmd: vec![cmd] },
        };
        self.send_datagram(datagram)
    }

    /// Sends a notification and caches the datagram for later result
    /// correlation.
    pub fn notify(
        &self,
        sender_address: &FeatureAddress,
        destination_address: &FeatureAddress,
        cmd: Cmd,
    ) -> Result<MsgCounter, SpineError> {
        let msg_counter = self.next_msg_counter();
        let datagram = Datagram {
            header: Header {
                specification_version: Some(SPECIFICATION_VERSION.to_string()),
                address_source: sender_address.clone(),
                address_destination: destination_address.clone(),
                msg_counter,
                msg_counter_reference: None,
                cmd_classifier: CmdClassifier::Notify,
                ack_request: None,
            },
            payload: Payload { cmd: vec![cmd] },
        };
        self.notify_cache
            .lock()
            .expect("notify cache poisoned")
            .insert(msg_counter, datagram.clone());
        self.send_datagram(datagram)?;
        Ok(msg_counter)
    }

    /// Sends a write, always with acknowledgement requested.
    pub fn write(
        &self,
        sender_address: &FeatureAddress,
        destination_address: &FeatureAddress,
        cmd: Cmd,
    ) -> Result<MsgCounter, SpineError> {
        let msg_counter = self.next_msg_counter();
        let datagram = Datagram {
            header: Header {
                specification_version: Some(SPECIFICATION_VERSION.to_string()),
                address_source: sender_address.clone(),
                address_destination: destination_address.clone(),
                msg_counter,
                msg_counter_reference: None,
                cmd_classifier: CmdClassifier::Write,
                ack_request: Some(true),
            },
            payload: Payload { cmd: vec![cmd] },
        };
        self.send_datagram(datagram)?;
        Ok(msg_counter)
    }

    /// Requests a subscription on a remote server feature. The call goes to
    /// the peer's node-management feature.
    pub fn subscribe(
        &self,
        sender_address: &FeatureAddress,
        destination_address: &FeatureAddress,
        server_feature_type: FeatureType,
    ) -> Result<MsgCounter, SpineError> {
        let cmd = Cmd::new(CmdPayload::NodeManagementSubscriptionRequestCall(
            SubscriptionRequestCall {
                subscription_request: SubscriptionRequest {
                    client_address: sender_address.clone(),
                    server_address: destination_address.clone(),
                    server_feature_type: Some(server_feature_type),
                },
            },
        ));
        self.node_management_call(sender_address, destination_address, cmd)
    }

    /// Requests deletion of a subscription on a remote server feature.
    pub fn unsubscribe(
        &self,
        sender_address: &FeatureAddress,
        destination_address: &FeatureAddress,
    ) -> Result<MsgCounter, SpineError> {
        let cmd = Cmd::new(CmdPayload::NodeManagementSubscriptionDeleteCall(
            SubscriptionDeleteCall {
                subscription_delete: SubscriptionDelete {
                    client_address: sender_address.clone(),
                    server_address: destination_address.clone(),
                },
            },
        ));
        self.node_management_call(sender_address, destination_address, cmd)
    }

    /// Requests a binding on a remote server feature.
    pub fn bind(
        &self,
        sender_address: &FeatureAddress,
        destination_address: &FeatureAddress,
        server_feature_type: FeatureType,
    ) -> Result<MsgCounter, SpineError> {
        let cmd = Cmd::new(CmdPayload::NodeManagementBindingRequestCall(BindingRequestCall {
            binding_request: BindingRequest {
                client_address: sender_address.clone(),
                server_address: destination_address.clone(),
                server_feature_type: Some(server_feature_type),
            },
        }));
        self.node_management_call(sender_address, destination_address, cmd)
    }

    /// Requests deletion of a binding on a remote server feature.
    pub fn unbind(
        &self,
        sender_address: &FeatureAddress,
        destination_address: &FeatureAddress,
    ) -> Result<MsgCounter, SpineError> {
        let cmd = Cmd::new(CmdPayload::NodeManagementBindingDeleteCall(BindingDeleteCall {
            binding_delete: BindingDelete {
                client_address: sender_address.clone(),
                server_address: destination_address.clone(),
            },
        }));
        self.node_management_call(sender_address, destination_address, cmd)
    }

    fn node_management_call(
        &self,
        sender_address: &FeatureAddress,
        destination_address: &FeatureAddress,
        cmd: Cmd,
    ) -> Result<MsgCounter, SpineError> {
        let local = node_management_address(sender_address.device.as_ref());
        let remote = node_management_address(destination_address.device.as_ref());
        self.request(CmdClassifier::Call, &local, &remote, true, vec![cmd])
    }

    fn next_msg_counter(&self) -> MsgCounter {
        MsgCounter(self.msg_counter.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn send_datagram(&self, datagram: Datagram) -> Result<(), SpineError> {
        log::debug!(
            "send {:?} {} -> {} counter {} reference {:?}",
            datagram.header.cmd_classifier,
            datagram.header.address_source,
            datagram.header.address_destination,
            datagram.header.msg_counter,
            datagram.header.msg_counter_reference,
        );
        let message = serde_json::to_vec(&DatagramEnvelope { datagram })
            .map_err(|err| SpineError::Transport(err.to_string()))?;
        self.writer
            .write_spine_message(&message)
            .map_err(|err| SpineError::Transport(err.to_string()))
    }
}

/// A reply/result datagram answers from the requested address, scoped to the
/// answering device.
fn reply_source(request_header: &Header, sender_address: &FeatureAddress) -> FeatureAddress {
    let mut source = request_header.address_destination.clone();
    source.device = sender_address.device.clone();
    source
}

#[cfg(test)]
mod tests {
    use super::*;
    use spine_model::DeviceAddress;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct CapturingWriter {
        sent: StdMutex<Vec<Vec<u8>>>,
    }

    impl DatagramWriter for CapturingWriter {
        fn write_spine_message(&self, payload: &[u8]) -> std::io::Result<()> {
            self.sent.lock().expect("writer state").push(payload.to_vec());
            Ok(())
        }
    }

    struct FailingWriter;

    impl DatagramWriter for FailingWriter {
        fn write_spine_message(&self, _payload: &[u8]) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "connection closed"))
        }
    }

    fn decode(payload: &[u8]) -> Datagram {
        serde_json::from_slice::<DatagramEnvelope>(payload).expect("decode").datagram
    }

    fn heartbeat_cmd() -> Cmd {
        Cmd::new(CmdPayload::DeviceDiagnosisHeartbeatData(Default::default()))
    }

    #[test]
    fn counters_increase_per_datagram() {
        let writer = Arc::new(CapturingWriter::default());
        let sut = Sender::new(writer.clone());
        let source = FeatureAddress::new("local", vec![1], 1);
        let dest = FeatureAddress::new("remote", vec![1], 1);

        let first = sut
            .request(CmdClassifier::Read, &source, &dest, false, vec![heartbeat_cmd()])
            .expect("send");
        let second = sut.notify(&source, &dest, heartbeat_cmd()).expect("send");
        assert_eq!(first, MsgCounter(1));
        assert_eq!(second, MsgCounter(2));

        let sent = writer.sent.lock().expect("writer state");
        assert_eq!(sent.len(), 2);
        assert_eq!(decode(&sent[0]).header.msg_counter, MsgCounter(1));
    }

    #[test]
    fn reply_references_the_request_and_answers_its_source() {
        let writer = Arc::new(CapturingWriter::default());
        let sut = Sender::new(writer.clone());
        let request_header = Header {
            specification_version: Some(SPECIFICATION_VERSION.to_string()),
            address_source: FeatureAddress::new("remote", vec![1], 1),
            address_destination: FeatureAddress::new("local", vec![1], 2),
            msg_counter: MsgCounter(40),
            msg_counter_reference: None,
            cmd_classifier: CmdClassifier::Read,
            ack_request: None,
        };

        sut.reply(&request_header, &FeatureAddress::new("local", vec![1], 2), heartbeat_cmd())
            .expect("reply");

        let sent = writer.sent.lock().expect("writer state");
        let datagram = decode(&sent[0]);
        assert_eq!(datagram.header.cmd_classifier, CmdClassifier::Reply);
        assert_eq!(datagram.header.msg_counter_reference, Some(MsgCounter(40)));
        assert_eq!(datagram.header.address_destination, request_header.address_source);
        assert_eq!(datagram.header.address_source, request_header.address_destination);
    }

    #[test]
    fn notify_datagrams_are_cached_for_result_correlation() {
        let writer = Arc::new(CapturingWriter::default());
        let sut = Sender::new(writer);
        let source = FeatureAddress::new("local", vec![1], 1);
        let dest = FeatureAddress::new("remote", vec![1], 1);

        let counter = sut.notify(&source, &dest, heartbeat_cmd()).expect("notify");
        let cached = sut.datagram_for_msg_counter(counter).expect("cached datagram");
        assert_eq!(cached.header.msg_counter, counter);

        let read = sut
            .request(CmdClassifier::Read, &source, &dest, false, vec![heartbeat_cmd()])
            .expect("read");
        assert!(sut.datagram_for_msg_counter(read).is_none());
    }

    #[test]
    fn subscribe_targets_the_peer_node_management_feature() {
        let writer = Arc::new(CapturingWriter::default());
        let sut = Sender::new(writer.clone());
        let client = FeatureAddress::new("local", vec![1], 1);
        let server = FeatureAddress::new("remote", vec![1], 2);

        sut.subscribe(&client, &server, FeatureType::DeviceDiagnosis).expect("subscribe");

        let sent = writer.sent.lock().expect("writer state");
        let datagram = decode(&sent[0]);
        assert_eq!(datagram.header.cmd_classifier, CmdClassifier::Call);
        assert_eq!(datagram.header.ack_request, Some(true));
        assert_eq!(
            datagram.header.address_destination,
            node_management_address(Some(&DeviceAddress::from("remote")))
        );
        match &datagram.payload.cmd[0].payload {
            Some(CmdPayload::NodeManagementSubscriptionRequestCall(call)) => {
                assert_eq!(call.subscription_request.client_address, client);
                assert_eq!(call.subscription_request.server_address, server);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn transport_failures_surface_as_errors() {
        let sut = Sender::new(Arc::new(FailingWriter));
        let source = FeatureAddress::new("local", vec![1], 1);
        let dest = FeatureAddress::new("remote", vec![1], 1);

        let result = sut.notify(&source, &dest, heartbeat_cmd());
        assert!(matches!(result, Err(SpineError::Transport(_))));
    }
}
