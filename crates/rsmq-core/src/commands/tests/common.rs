use super::*;

/// Server time every test starts at (ms).
pub(super) const START_MS: u64 = 1_700_000_000_000;

pub(super) struct Harness {
    pub rsmq: Rsmq,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn advance_ms(&self, ms: u64) {
        self.clock.advance(Duration::from_millis(ms));
    }
}

pub(super) fn test_setup() -> Harness {
    let clock = Arc::new(ManualClock::at_millis(START_MS));
    let store = Arc::new(MemoryStore::with_clock(clock.clone()));
    let rsmq = Rsmq::new(store.clone(), Namespace::default());
    Harness { rsmq, store, clock }
}

/// Setup with queue `name` created using default attributes.
pub(super) fn test_setup_with_queue(name: &str) -> Harness {
    let h = test_setup();
    h.rsmq.create_queue(&CreateQueue::new(name)).unwrap();
    h
}

pub(super) fn send(h: &Harness, qname: &str, body: &str) -> String {
    h.rsmq.send_message(&SendMessage::new(qname, body)).unwrap()
}

pub(super) fn receive(h: &Harness, qname: &str) -> Option<QueueMessage> {
    h.rsmq
        .receive_message(&ReceiveMessage::new(qname))
        .unwrap()
}

pub(super) fn attrs(h: &Harness, qname: &str) -> QueueAttributes {
    h.rsmq.get_queue_attributes(qname).unwrap()
}
