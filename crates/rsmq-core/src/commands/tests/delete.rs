use super::*;

#[test]
fn delete_message_succeeds_exactly_once() {
    let h = test_setup_with_queue("q");
    let id = send(&h, "q", "m");
    let params = DeleteMessage::new("q", &id);

    assert!(h.rsmq.delete_message(&params).unwrap());
    assert!(!h.rsmq.delete_message(&params).unwrap());

    h.advance_ms(60_000);
    assert!(receive(&h, "q").is_none());
    assert_eq!(attrs(&h, "q").msgs, 0);
}

#[test]
fn delete_removes_leased_message_and_its_counters() {
    let h = test_setup_with_queue("q");
    let id = send(&h, "q", "m");
    receive(&h, "q").unwrap();

    assert!(h.rsmq.delete_message(&DeleteMessage::new("q", &id)).unwrap());

    let fields = h
        .store
        .exec(vec![Op::HMGet {
            key: h.rsmq.namespace().queue_key("q"),
            fields: vec![
                id.clone(),
                crate::keys::rc_field(&id),
                crate::keys::fr_field(&id),
            ],
        }])
        .unwrap();
    assert_eq!(
        fields,
        vec![Reply::Array(vec![Reply::Nil, Reply::Nil, Reply::Nil])]
    );

    h.advance_ms(31_000);
    assert!(receive(&h, "q").is_none());
}

#[test]
fn delete_unknown_id_returns_false() {
    let h = test_setup_with_queue("q");
    send(&h, "q", "keep");
    let unknown = "a".repeat(32);
    assert!(!h
        .rsmq
        .delete_message(&DeleteMessage::new("q", unknown))
        .unwrap());
    assert_eq!(attrs(&h, "q").msgs, 1);
}

#[test]
fn delete_validates_id_before_touching_the_store() {
    let h = test_setup_with_queue("q");
    let err = h
        .rsmq
        .delete_message(&DeleteMessage::new("q", "short"))
        .unwrap_err();
    assert!(matches!(
        err,
        RsmqError::Validation(ValidationError::InvalidMessageId(id)) if id == "short"
    ));
}
