use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use spine_model::{CmdPayload, MsgCounter, ResultData};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::SpineError;

/// Outcome of one in-flight request: reply data, a bare success
/// acknowledgement, or an error.
pub type PendingOutcome = Result<Option<CmdPayload>, SpineError>;

struct PendingEntry {
    resolver: Option<oneshot::Sender<PendingOutcome>>,
    waiter: Option<oneshot::Receiver<PendingOutcome>>,
    expiry: JoinHandle<()>,
}

type EntryMap = Mutex<HashMap<String, PendingEntry>>;

/// Correlates outgoing requests with their later replies or results.
///
/// Shared across every task sending or receiving for one feature. Each entry
/// carries a single-slot channel, so exactly one of timeout and explicit
/// resolution wins; the loser becomes a no-op.
pub struct PendingRequests {
    entries: Arc<EntryMap>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self { entries: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Registers a new pending request and starts its expiry timer. Counters
    /// are unique per send, so a duplicate (ski, counter) pair is an internal
    /// invariant breach rather than a caller-facing error.
    pub fn add(&self, ski: &str, counter: MsgCounter, max_delay: Duration) {
        let (tx, rx) = oneshot::channel();
        let key = map_key(ski, counter);

        let entries = Arc::clone(&self.entries);
        let timer_key = key.clone();
        let expiry = tokio::spawn(async move {
            tokio::time::sleep(max_delay).await;
            let _ = resolve(&entries, &timer_key, counter, Err(SpineError::Timeout { counter }), true);
        });

        let previous = self
            .entries
            .lock()
            .expect("pending request table poisoned")
            .insert(key, PendingEntry { resolver: Some(tx), waiter: Some(rx), expiry });
        debug_assert!(previous.is_none(), "duplicate pending request for {ski}:{counter}");
        if let Some(previous) = previous {
            previous.expiry.abort();
        }
    }

    /// Resolves a pending entry with reply data. A missing entry simply
    /// means nobody is waiting.
    pub fn set_data(
        &self,
        ski: &str,
        counter: MsgCounter,
        data: CmdPayload,
    ) -> Result<(), SpineError> {
        resolve(&self.entries, &map_key(ski, counter), counter, Ok(Some(data)), false)
    }

    /// Resolves a pending entry from a received result command: a success
    /// acknowledgement yields empty data, an error result yields the
    /// corresponding error.
    pub fn set_result(
        &self,
        ski: &str,
        counter: MsgCounter,
        result: &ResultData,
    ) -> Result<(), SpineError> {
        let outcome = match SpineError::from_result_data(result) {
            Some(err) => Err(err),
            None => Ok(None),
        };
        resolve(&self.entries, &map_key(ski, counter), counter, outcome, false)
    }

    /// Blocks the calling task until the entry resolves, then removes it.
    /// A second call for an already-consumed entry fails with
    /// [`SpineError::AddressNotFound`].
    pub async fn get_data(&self, ski: &str, counter: MsgCounter) -> PendingOutcome {
        let key = map_key(ski, counter);
        let waiter = {
            let mut entries = self.entries.lock().expect("pending request table poisoned");
            let entry = entries
                .get_mut(&key)
                .ok_or_else(|| SpineError::AddressNotFound(no_such_request(counter)))?;
            entry
                .waiter
                .take()
                .ok_or_else(|| SpineError::AddressNotFound(no_such_request(counter)))?
        };

        let outcome = waiter.await;

        if let Some(entry) = self.entries.lock().expect("pending request table poisoned").remove(&key)
        {
            entry.expiry.abort();
        }

        match outcome {
            Ok(resolved) => resolved,
            // The entry was removed underneath us without a resolution.
            Err(_) => Err(SpineError::AddressNotFound(no_such_request(counter))),
        }
    }

    /// Cancels and discards an entry without resolving it.
    pub fn remove(&self, ski: &str, counter: MsgCounter) -> Result<(), SpineError> {
        let entry = self
            .entries
            .lock()
            .expect("pending request table poisoned")
            .remove(&map_key(ski, counter))
            .ok_or_else(|| SpineError::AddressNotFound(no_such_request(counter)))?;
        entry.expiry.abort();
        Ok(())
    }
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new()
    }
}

fn map_key(ski: &str, counter: MsgCounter) -> String {
    format!("{ski}:{counter}")
}

fn no_such_request(counter: MsgCounter) -> String {
    format!("no pending request with message counter '{counter}' found")
}

fn resolve(
    entries: &EntryMap,
    key: &str,
    counter: MsgCounter,
    outcome: PendingOutcome,
    from_expiry: bool,
) -> Result<(), SpineError> {
    let mut guard = entries.lock().expect("pending request table poisoned");
    let entry = guard
        .get_mut(key)
        .ok_or_else(|| SpineError::AddressNotFound(no_such_request(counter)))?;
    let resolver = entry.resolver.take().ok_or(SpineError::AlreadyResolved(counter))?;
    if !from_expiry {
        entry.expiry.abort();
    }
    // The waiter may already have been dropped; that is not an error here.
    let _ = resolver.send(outcome);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spine_model::payloads::DeviceClassificationManufacturerData;
    use spine_model::ErrorNumber;

    const SKI: &str = "test-ski";

    fn payload(name: &str) -> CmdPayload {
        CmdPayload::DeviceClassificationManufacturerData(DeviceClassificationManufacturerData {
            device_name: Some(name.into()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn add_set_get_round_trips() {
        let sut = PendingRequests::new();
        let counter = MsgCounter(1);
        sut.add(SKI, counter, Duration::from_secs(5));

        sut.set_data(SKI, counter, payload("one")).expect("set data");
        let got = sut.get_data(SKI, counter).await.expect("get data");
        assert_eq!(got, Some(payload("one")));

        let again = sut.get_data(SKI, counter).await;
        assert!(matches!(again, Err(SpineError::AddressNotFound(_))));
    }

    #[tokio::test]
    async fn get_before_set_blocks_until_resolution() {
        let sut = Arc::new(PendingRequests::new());
        let counter = MsgCounter(2);
        sut.add(SKI, counter, Duration::from_secs(5));

        let waiter = {
            let sut = Arc::clone(&sut);
            tokio::spawn(async move { sut.get_data(SKI, counter).await })
        };
        tokio::task::yield_now().await;

        sut.set_data(SKI, counter, payload("late")).expect("set data");
        let got = waiter.await.expect("join").expect("get data");
        assert_eq!(got, Some(payload("late")));
    }

    #[tokio::test]
    async fn second_resolution_fails_with_already_resolved() {
        let sut = PendingRequests::new();
        let counter = MsgCounter(3);
        sut.add(SKI, counter, Duration::from_secs(5));

        sut.set_data(SKI, counter, payload("first")).expect("first resolution");
        let second = sut.set_data(SKI, counter, payload("second"));
        assert_eq!(second, Err(SpineError::AlreadyResolved(counter)));
    }

    #[tokio::test]
    async fn expiry_resolves_with_timeout_exactly_once() {
        let sut = PendingRequests::new();
        let counter = MsgCounter(4);
        sut.add(SKI, counter, Duration::from_millis(20));

        let got = sut.get_data(SKI, counter).await;
        assert_eq!(got, Err(SpineError::Timeout { counter }));

        // The timed-out entry is gone; a late explicit result is a miss,
        // not a double delivery.
        let late = sut.set_data(SKI, counter, payload("late"));
        assert!(matches!(late, Err(SpineError::AddressNotFound(_))));
    }

    #[tokio::test]
    async fn explicit_resolution_beats_the_timer() {
        let sut = PendingRequests::new();
        let counter = MsgCounter(5);
        sut.add(SKI, counter, Duration::from_millis(30));

        sut.set_data(SKI, counter, payload("quick")).expect("set data");
        tokio::time::sleep(Duration::from_millis(60)).await;

        let got = sut.get_data(SKI, counter).await.expect("get data");
        assert_eq!(got, Some(payload("quick")));
    }

    #[tokio::test]
    async fn error_result_resolves_as_error() {
        let sut = PendingRequests::new();
        let counter = MsgCounter(6);
        sut.add(SKI, counter, Duration::from_secs(5));

        let wire = ResultData::error(ErrorNumber::GeneralError, "error occurred");
        sut.set_result(SKI, counter, &wire).expect("set result");

        let got = sut.get_data(SKI, counter).await;
        assert_eq!(
            got,
            Err(SpineError::Result {
                number: ErrorNumber::GeneralError,
                description: Some("error occurred".into())
            })
        );
    }

    #[tokio::test]
    async fn remove_discards_without_resolving() {
        let sut = PendingRequests::new();
        let counter = MsgCounter(7);
        sut.add(SKI, counter, Duration::from_secs(5));

        sut.remove(SKI, counter).expect("remove");
        assert!(matches!(
            sut.set_data(SKI, counter, payload("gone")),
            Err(SpineError::AddressNotFound(_))
        ));
        assert!(matches!(sut.remove(SKI, counter), Err(SpineError::AddressNotFound(_))));
    }
}
