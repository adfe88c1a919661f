//! Property-based tests for push-channel framing.
//!
//! Uses proptest to verify:
//! 1. Arbitrary text never panics the decoder (it returns `Err` gracefully).
//! 2. Any event a server emits decodes back to the same name, namespace,
//!    arguments and ack id.
//! 3. Only `tasksUpdated` on the default namespace is recognised as a change
//!    notification.

use proptest::prelude::*;
use taskboard_proto::push::{
    DEFAULT_NAMESPACE, PushFrame, TASKS_UPDATED_EVENT, decode_frame, encode_frame,
};

/// Strategy for namespaces: the default one or `/word`.
fn arb_namespace() -> impl Strategy<Value = String> {
    prop_oneof![Just("/".to_string()), "/[a-z]{1,12}"]
}

/// Strategy for simple JSON arguments.
fn arb_arg() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        any::<i64>().prop_map(serde_json::Value::from),
        any::<bool>().prop_map(serde_json::Value::from),
        "[^\"\\\\]{0,32}".prop_map(serde_json::Value::from),
        Just(serde_json::Value::Null),
    ]
}

fn arb_event() -> impl Strategy<Value = PushFrame> {
    (
        arb_namespace(),
        "[A-Za-z][A-Za-z0-9_]{0,24}",
        prop::collection::vec(arb_arg(), 0..4),
        prop::option::of(0u64..100_000),
    )
        .prop_map(|(namespace, name, args, ack_id)| PushFrame::Event {
            namespace,
            name,
            args,
            ack_id,
        })
}

proptest! {
    #[test]
    fn decode_never_panics(text in ".{0,256}") {
        let _ = decode_frame(&text);
    }

    #[test]
    fn decode_never_panics_on_message_packets(body in "4[0-9/,\\[\\]\"a-z{}:]{0,64}") {
        let _ = decode_frame(&body);
    }

    #[test]
    fn emitted_events_decode_unchanged(frame in arb_event()) {
        let text = encode_frame(&frame);
        prop_assert_eq!(decode_frame(&text).unwrap(), frame);
    }

    #[test]
    fn only_tasks_updated_triggers_refresh(frame in arb_event()) {
        let is_update = matches!(
            &frame,
            PushFrame::Event { namespace, name, .. }
                if namespace == DEFAULT_NAMESPACE && name == TASKS_UPDATED_EVENT
        );
        prop_assert_eq!(frame.is_tasks_updated(), is_update);
    }
}
