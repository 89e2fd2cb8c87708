//! Transport session: connect retry, resubscribe and no-queue behaviour.

use bracelet::app::events::AppEvent;
use bracelet::app::session::{LinkState, TransportSession};
use bracelet::error::{Error, TransportError};

use super::mock_hw::{MockClock, MockLink, RecordingSink, Rig, sim_id};

#[test]
fn connect_retries_with_fixed_backoff() {
    let mut rig = Rig::new();
    rig.link.fail_connects = 3;
    rig.step();

    assert!(rig.link.connected);
    assert_eq!(rig.link.connect_calls.len(), 4);
    assert_eq!(rig.clock.sleeps, vec![5_000, 5_000, 5_000]);
    assert!(rig.sink.contains(&AppEvent::LinkUp { attempts: 4 }));
    assert!(rig.sink.contains(&AppEvent::ConnectRetry {
        attempt: 3,
        delay_ms: 5_000
    }));
}

#[test]
fn connected_link_is_left_alone() {
    let mut rig = Rig::new();
    rig.run_ms(100);
    assert_eq!(rig.link.connect_calls.len(), 1);
    assert_eq!(rig.link.subscribe_calls.len(), 1);
}

#[test]
fn dropped_link_reconnects_and_resubscribes_when_unpaired() {
    let mut rig = Rig::new();
    rig.step();
    rig.link.drop_link();
    rig.step();

    assert!(rig.sink.contains(&AppEvent::LinkDown));
    assert_eq!(rig.link.connect_calls.len(), 2);
    assert_eq!(rig.link.subscribe_calls.len(), 2);
    assert_eq!(rig.device.session().connect_count(), 2);
}

#[test]
fn dropped_link_does_not_resubscribe_when_paired() {
    let mut rig = Rig::new();
    rig.pair("match/7", 1);
    let subscribes = rig.link.subscribe_calls.len();

    rig.link.drop_link();
    rig.step();

    assert_eq!(rig.link.connect_calls.len(), 2);
    assert_eq!(rig.link.subscribe_calls.len(), subscribes);
}

#[test]
fn failed_subscribe_is_retried_next_step() {
    let mut rig = Rig::new();
    rig.link.fail_subscribe = true;
    rig.step();
    assert!(rig.sink.contains(&AppEvent::Fault(Error::TransportUnavailable(
        TransportError::SubscribeFailed
    ))));
    assert!(!rig.device.session().is_subscribed());

    rig.link.fail_subscribe = false;
    rig.step();
    assert!(rig.device.session().is_subscribed());
    assert_eq!(rig.link.subscribe_calls.len(), 2);
}

#[test]
fn publish_while_disconnected_is_dropped() {
    let mut session = TransportSession::new(sim_id(), 5_000);
    let mut link = MockLink::new();
    assert_eq!(
        session.publish(&mut link, "match/7", b"{}"),
        Err(TransportError::NotConnected)
    );
    assert!(link.published.is_empty());
}

#[test]
fn routes_only_own_response_topic() {
    let mut session = TransportSession::new(sim_id(), 5_000);
    let mut link = MockLink::new();
    let mut clock = MockClock::default();
    let mut sink = RecordingSink::default();
    session.set_listening(true);
    session.ensure_connected(&mut link, &mut clock, &mut sink);

    assert_eq!(session.state(), LinkState::Connected);
    assert!(session.accepts("pairing/response/SC-DEADBEEFCAFE"));
    assert!(!session.accepts("pairing/response/SC-DEADBEEFCAFF"));
    assert!(!session.accepts("pairing/request"));
}

#[test]
fn relistening_forces_a_fresh_subscribe() {
    let mut session = TransportSession::new(sim_id(), 5_000);
    let mut link = MockLink::new();
    let mut clock = MockClock::default();
    let mut sink = RecordingSink::default();

    session.set_listening(true);
    session.ensure_connected(&mut link, &mut clock, &mut sink);
    session.set_listening(false);
    session.ensure_connected(&mut link, &mut clock, &mut sink);
    session.set_listening(true);
    session.ensure_connected(&mut link, &mut clock, &mut sink);

    assert_eq!(link.subscribe_calls.len(), 2);
}

#[test]
fn externally_restored_link_reports_one_attempt() {
    let mut session = TransportSession::new(sim_id(), 5_000);
    let mut link = MockLink::new();
    let mut clock = MockClock::default();
    let mut sink = RecordingSink::default();
    link.connected = true;

    session.ensure_connected(&mut link, &mut clock, &mut sink);

    assert_eq!(session.state(), LinkState::Connected);
    assert!(link.connect_calls.is_empty());
    assert!(sink.contains(&AppEvent::LinkUp { attempts: 1 }));
    assert!(!sink.contains(&AppEvent::LinkUp { attempts: 0 }));
}
