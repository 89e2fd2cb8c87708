//! End-to-end pairing and scoring flows against mock adapters.

use bracelet::app::events::AppEvent;
use bracelet::app::messages::ScoreAction;
use bracelet::app::persistence::{RECORD_KEY, RECORD_NAMESPACE};
use bracelet::error::{Error, MessageError, StorageError, TransportError};
use bracelet::fsm::StateId;

use super::mock_hw::{MockStore, Rig};

fn stored_record(rig: &Rig) -> Option<serde_json::Value> {
    rig.store
        .get(RECORD_NAMESPACE, RECORD_KEY)
        .map(|bytes| serde_json::from_slice(bytes).unwrap())
}

#[test]
fn fresh_device_starts_unpaired_and_listens() {
    let mut rig = Rig::new();
    assert!(rig.sink.contains(&AppEvent::Started(StateId::Unpaired)));

    rig.step();
    assert_eq!(rig.link.connect_calls, vec!["SC-DEADBEEFCAFE".to_owned()]);
    assert_eq!(rig.link.subscribe_calls, vec![rig.response_topic()]);
    assert!(rig.sink.contains(&AppEvent::AwaitingResponse));
}

#[test]
fn holding_both_requests_pairing_once() {
    let mut rig = Rig::new();
    rig.hold_both(4_000);

    let requests = rig.link.published_on("pairing/request");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["deviceId"], "SC-DEADBEEFCAFE");
    assert!(requests[0]["timestamp"].is_u64());
    assert_eq!(rig.device.state(), StateId::Unpaired);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::PairingRequested), 1);
}

#[test]
fn short_combined_press_does_nothing() {
    let mut rig = Rig::new();
    rig.hold_both(1_000);
    assert!(rig.link.published.is_empty());
}

#[test]
fn each_new_hold_episode_requests_again() {
    let mut rig = Rig::new();
    rig.hold_both(2_200);
    rig.hold_both(2_200);
    assert_eq!(rig.link.published_on("pairing/request").len(), 2);
}

#[test]
fn ok_response_pairs_and_persists() {
    let mut rig = Rig::new();
    rig.pair("session/TEST01/event", 3);

    assert_eq!(rig.device.state(), StateId::Paired);
    let record = rig.device.record();
    assert!(record.is_paired);
    assert_eq!(record.session_topic.as_str(), "session/TEST01/event");
    assert_eq!(record.team_number, 3);

    let stored = stored_record(&rig).expect("record persisted");
    assert_eq!(stored["sessionTopic"], "session/TEST01/event");
    assert_eq!(stored["teamNumber"], 3);
    assert!(stored.get("isPaired").is_none());
    assert!(rig.sink.contains(&AppEvent::Paired { team: 3 }));
}

#[test]
fn rejected_response_keeps_device_unpaired() {
    let mut rig = Rig::new();
    rig.hold_both(2_200);
    rig.respond(r#"{"status":"error","message":"No active pairing session"}"#);

    assert_eq!(rig.device.state(), StateId::Unpaired);
    assert!(stored_record(&rig).is_none());
    assert!(rig.sink.contains(&AppEvent::PairingRejected));
}

#[test]
fn malformed_response_is_reported_and_ignored() {
    let mut rig = Rig::new();
    rig.step();
    rig.respond(r#"{"status":"ok","topic":"match/7"}"#);

    assert_eq!(rig.device.state(), StateId::Unpaired);
    assert!(stored_record(&rig).is_none());
    assert!(rig.sink.contains(&AppEvent::Fault(Error::MalformedMessage(
        MessageError::MissingField("team")
    ))));
}

#[test]
fn response_on_foreign_topic_is_ignored() {
    let mut rig = Rig::new();
    rig.step();
    rig.link.deliver(
        "pairing/response/SC-000000000000",
        br#"{"status":"ok","topic":"match/7","team":1}"#,
    );
    rig.step();
    assert_eq!(rig.device.state(), StateId::Unpaired);
}

#[test]
fn paired_lone_press_publishes_score() {
    let mut rig = Rig::new();
    rig.pair("match/7", 2);

    rig.tap(true);
    rig.tap(false);

    let scores = rig.link.published_on("match/7");
    assert_eq!(scores.len(), 2);
    assert_eq!(scores[0]["type"], "score");
    assert_eq!(scores[0]["action"], "increment");
    assert_eq!(scores[0]["team"], 2);
    assert_eq!(scores[0]["deviceId"], "SC-DEADBEEFCAFE");
    assert!(scores[0]["timestamp"].is_u64());
    assert_eq!(scores[1]["action"], "decrement");
    assert!(rig.sink.contains(&AppEvent::ScoreSent(ScoreAction::Decrement)));
}

#[test]
fn unpaired_lone_press_publishes_nothing() {
    let mut rig = Rig::new();
    rig.tap(true);
    rig.tap(false);
    assert!(rig.link.published.is_empty());
}

#[test]
fn combined_press_while_paired_never_scores() {
    let mut rig = Rig::new();
    rig.pair("match/7", 2);
    rig.hold_both(500);
    rig.hold_both(2_500);
    assert!(rig.link.published_on("match/7").is_empty());
    assert_eq!(rig.link.published_on("pairing/request").len(), 1);
}

#[test]
fn publish_failure_drops_score_without_retry() {
    let mut rig = Rig::new();
    rig.pair("match/7", 2);
    rig.link.fail_publish = true;
    rig.tap(true);
    rig.link.fail_publish = false;
    rig.run_ms(1_000);

    assert!(rig.link.published_on("match/7").is_empty());
    assert!(rig.sink.contains(&AppEvent::ScoreDropped(
        ScoreAction::Increment,
        TransportError::PublishFailed
    )));
}

#[test]
fn stored_record_boots_straight_into_paired() {
    let mut store = MockStore::new();
    store.put(
        RECORD_NAMESPACE,
        RECORD_KEY,
        br#"{"sessionTopic":"match/9","teamNumber":1}"#,
    );
    let mut rig = Rig::with_store(store);

    assert_eq!(rig.device.state(), StateId::Paired);
    assert!(rig.sink.contains(&AppEvent::Started(StateId::Paired)));

    rig.step();
    assert!(rig.link.subscribe_calls.is_empty());

    rig.tap(true);
    assert_eq!(rig.link.published_on("match/9").len(), 1);
}

#[test]
fn corrupt_record_boots_unpaired() {
    let mut store = MockStore::new();
    store.put(RECORD_NAMESPACE, RECORD_KEY, br#"{"sessionTopic":"match/9"}"#);
    let rig = Rig::with_store(store);
    assert_eq!(rig.device.state(), StateId::Unpaired);
    assert!(!rig.device.record().is_paired);
}

#[test]
fn failed_save_stays_paired_and_retries() {
    let mut rig = Rig::new();
    rig.store.fail_writes = true;
    rig.pair("match/7", 4);

    assert_eq!(rig.device.state(), StateId::Paired);
    assert!(rig.device.is_persistence_stale());
    assert!(rig.sink.contains(&AppEvent::PersistenceStale(StorageError::WriteFailed)));
    assert!(stored_record(&rig).is_none());

    rig.store.fail_writes = false;
    rig.run_ms(6_000);

    assert!(!rig.device.is_persistence_stale());
    assert!(rig.sink.contains(&AppEvent::PersistenceRestored));
    assert_eq!(stored_record(&rig).unwrap()["teamNumber"], 4);
}

#[test]
fn reset_gesture_unpairs_and_listens_again() {
    let mut rig = Rig::new();
    rig.pair("match/7", 2);
    let subscribes_before = rig.link.subscribe_calls.len();

    rig.hold_both(10_500);

    assert_eq!(rig.device.state(), StateId::Unpaired);
    assert!(!rig.device.record().is_paired);
    assert!(stored_record(&rig).is_none());
    assert!(rig.sink.contains(&AppEvent::Unpaired));
    assert_eq!(rig.link.subscribe_calls.len(), subscribes_before + 1);
    // The same episode must not also request pairing.
    assert_eq!(rig.link.published_on("pairing/request").len(), 1);
}

#[test]
fn second_response_after_pairing_is_ignored() {
    let mut rig = Rig::new();
    rig.pair("match/7", 2);
    rig.respond(r#"{"status":"ok","topic":"match/8","team":5}"#);
    assert_eq!(rig.device.record().session_topic.as_str(), "match/7");
    assert_eq!(rig.device.record().team_number, 2);
}
