use super::*;

#[test]
fn create_queue_stores_defaults() {
    let h = test_setup_with_queue("jobs");

    let a = attrs(&h, "jobs");
    assert_eq!(a.vt, 30);
    assert_eq!(a.delay, 0);
    assert_eq!(a.maxsize, MaxSize::Bytes(65_536));
    assert_eq!(a.totalsent, 0);
    assert_eq!(a.totalrecv, 0);
    assert_eq!(a.created, START_MS / 1000);
    assert_eq!(a.modified, START_MS / 1000);
    assert_eq!(a.msgs, 0);
    assert_eq!(a.hiddenmsgs, 0);
}

#[test]
fn create_queue_twice_fails_and_keeps_attributes() {
    let h = test_setup();
    let mut params = CreateQueue::new("jobs");
    params.vt = 60;
    h.rsmq.create_queue(&params).unwrap();
    let before = attrs(&h, "jobs");

    h.advance_ms(5_000);
    params.vt = 10;
    params.maxsize = MaxSize::Unlimited;
    let err = h.rsmq.create_queue(&params).unwrap_err();
    assert!(matches!(err, RsmqError::QueueAlreadyExists(name) if name == "jobs"));

    assert_eq!(attrs(&h, "jobs"), before);
    assert_eq!(h.rsmq.list_queues().unwrap(), vec!["jobs"]);
}

#[test]
fn create_queue_rejects_invalid_input_before_touching_the_store() {
    let h = test_setup();

    let err = h.rsmq.create_queue(&CreateQueue::new("bad name")).unwrap_err();
    assert!(matches!(
        err,
        RsmqError::Validation(ValidationError::InvalidQueueName(_))
    ));

    let mut params = CreateQueue::new("q");
    params.vt = 10_000_000;
    assert!(matches!(
        h.rsmq.create_queue(&params).unwrap_err(),
        RsmqError::Validation(ValidationError::VtOutOfRange(10_000_000))
    ));

    let mut params = CreateQueue::new("q");
    params.delay = 10_000_000;
    assert!(matches!(
        h.rsmq.create_queue(&params).unwrap_err(),
        RsmqError::Validation(ValidationError::DelayOutOfRange(_))
    ));

    let mut params = CreateQueue::new("q");
    params.maxsize = MaxSize::Bytes(100);
    assert!(matches!(
        h.rsmq.create_queue(&params).unwrap_err(),
        RsmqError::Validation(ValidationError::MaxSizeOutOfRange(100))
    ));

    assert_eq!(h.store.key_count(), 0);
}

#[test]
fn delete_queue_removes_metadata_messages_and_directory_entry() {
    let h = test_setup_with_queue("jobs");
    send(&h, "jobs", "one");
    send(&h, "jobs", "two");

    h.rsmq.delete_queue("jobs").unwrap();

    assert_eq!(h.store.key_count(), 0);
    assert!(h.rsmq.list_queues().unwrap().is_empty());
    assert!(matches!(
        h.rsmq.get_queue_attributes("jobs").unwrap_err(),
        RsmqError::QueueNotFound(_)
    ));
}

#[test]
fn delete_missing_queue_is_not_found() {
    let h = test_setup();
    let err = h.rsmq.delete_queue("ghost").unwrap_err();
    assert!(matches!(err, RsmqError::QueueNotFound(name) if name == "ghost"));
}

#[test]
fn deleted_queue_can_be_created_again() {
    let h = test_setup_with_queue("jobs");
    h.rsmq.delete_queue("jobs").unwrap();
    h.rsmq.create_queue(&CreateQueue::new("jobs")).unwrap();
    assert_eq!(h.rsmq.list_queues().unwrap(), vec!["jobs"]);
}

#[test]
fn set_queue_attributes_updates_supplied_fields_only() {
    let h = test_setup_with_queue("jobs");
    h.advance_ms(90_000);

    let mut params = SetQueueAttributes::new("jobs");
    params.vt = Some(120);
    params.maxsize = Some(MaxSize::Unlimited);
    let a = h.rsmq.set_queue_attributes(&params).unwrap();

    assert_eq!(a.vt, 120);
    assert_eq!(a.delay, 0);
    assert_eq!(a.maxsize, MaxSize::Unlimited);
    assert_eq!(a.created, START_MS / 1000);
    assert_eq!(a.modified, START_MS / 1000 + 90);
    assert_eq!(attrs(&h, "jobs"), a);
}

#[test]
fn set_queue_attributes_requires_an_attribute() {
    let h = test_setup_with_queue("jobs");
    let err = h
        .rsmq
        .set_queue_attributes(&SetQueueAttributes::new("jobs"))
        .unwrap_err();
    assert!(matches!(
        err,
        RsmqError::Validation(ValidationError::NoAttributes)
    ));
}

#[test]
fn set_queue_attributes_validates_ranges() {
    let h = test_setup_with_queue("jobs");
    let mut params = SetQueueAttributes::new("jobs");
    params.delay = Some(10_000_000);
    assert!(matches!(
        h.rsmq.set_queue_attributes(&params).unwrap_err(),
        RsmqError::Validation(ValidationError::DelayOutOfRange(_))
    ));
    assert_eq!(attrs(&h, "jobs").delay, 0);
}

#[test]
fn set_queue_attributes_on_missing_queue_creates_nothing() {
    let h = test_setup();
    let mut params = SetQueueAttributes::new("ghost");
    params.vt = Some(5);
    assert!(matches!(
        h.rsmq.set_queue_attributes(&params).unwrap_err(),
        RsmqError::QueueNotFound(_)
    ));
    assert_eq!(h.store.key_count(), 0);
}

#[test]
fn half_created_queue_is_not_found() {
    let h = test_setup();
    h.store
        .exec(vec![Op::HSet {
            key: h.rsmq.namespace().queue_key("partial"),
            field: "vt".to_string(),
            value: "30".to_string(),
        }])
        .unwrap();

    assert!(matches!(
        h.rsmq.get_queue_attributes("partial").unwrap_err(),
        RsmqError::QueueNotFound(_)
    ));
    assert!(matches!(
        h.rsmq.send_message(&SendMessage::new("partial", "x")).unwrap_err(),
        RsmqError::QueueNotFound(_)
    ));
}

#[test]
fn failed_create_over_partial_hash_writes_nothing() {
    let h = test_setup();
    let key = h.rsmq.namespace().queue_key("partial");
    h.store
        .exec(vec![
            Op::HSet {
                key: key.clone(),
                field: "vt".to_string(),
                value: "99".to_string(),
            },
            Op::HSet {
                key: key.clone(),
                field: "modified".to_string(),
                value: "1".to_string(),
            },
        ])
        .unwrap();

    let err = h.rsmq.create_queue(&CreateQueue::new("partial")).unwrap_err();
    assert!(matches!(err, RsmqError::QueueAlreadyExists(name) if name == "partial"));

    let replies = h
        .store
        .exec(vec![Op::HMGet {
            key,
            fields: ["vt", "delay", "maxsize", "created", "modified"]
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }])
        .unwrap();
    assert_eq!(
        replies,
        vec![Reply::Array(vec![
            Reply::Bulk("99".to_string()),
            Reply::Nil,
            Reply::Nil,
            Reply::Nil,
            Reply::Bulk("1".to_string()),
        ])]
    );
    assert!(matches!(
        h.rsmq.get_queue_attributes("partial").unwrap_err(),
        RsmqError::QueueNotFound(_)
    ));
    assert!(h.rsmq.list_queues().unwrap().is_empty());
}

#[test]
fn list_queues_is_sorted() {
    let h = test_setup();
    for name in ["zeta", "alpha", "mid"] {
        h.rsmq.create_queue(&CreateQueue::new(name)).unwrap();
    }
    assert_eq!(h.rsmq.list_queues().unwrap(), vec!["alpha", "mid", "zeta"]);
}

#[test]
fn namespaces_are_isolated() {
    let h = test_setup_with_queue("jobs");
    let other = Rsmq::new(h.store.clone(), Namespace::new("other"));

    assert!(other.list_queues().unwrap().is_empty());
    other.create_queue(&CreateQueue::new("jobs")).unwrap();
    send(&h, "jobs", "mine");

    assert!(other
        .receive_message(&ReceiveMessage::new("jobs"))
        .unwrap()
        .is_none());
    assert_eq!(receive(&h, "jobs").unwrap().message, "mine");
}
