//! Pairing record persistence through the NVS adapter and across reboots.

use bracelet::adapters::nvs::NvsAdapter;
use bracelet::app::events::AppEvent;
use bracelet::app::messages::{MAX_TOPIC_LEN, SessionTopic};
use bracelet::app::persistence::{self, PairingRecord, RECORD_KEY, RECORD_NAMESPACE};
use bracelet::app::ports::StoragePort;
use bracelet::app::service::DeviceState;
use bracelet::config::BraceletConfig;
use bracelet::error::{Error, StorageError};
use bracelet::fsm::StateId;

use super::mock_hw::{MockButtons, MockClock, MockLink, RecordingSink, Rig, STEP_MS, sim_id};

fn topic(s: &str) -> SessionTopic {
    let mut t = SessionTopic::new();
    t.push_str(s).unwrap();
    t
}

#[test]
fn nvs_round_trip_is_byte_stable() {
    let mut nvs = NvsAdapter::new().unwrap();
    let record = PairingRecord::paired(topic("session/ABC/event"), 7).unwrap();

    persistence::save(&mut nvs, &record).unwrap();
    let mut first = [0u8; 128];
    let n1 = nvs.read(RECORD_NAMESPACE, RECORD_KEY, &mut first).unwrap();

    let loaded = persistence::load(&nvs).unwrap();
    assert_eq!(loaded, record);

    persistence::save(&mut nvs, &loaded).unwrap();
    let mut second = [0u8; 128];
    let n2 = nvs.read(RECORD_NAMESPACE, RECORD_KEY, &mut second).unwrap();
    assert_eq!(&first[..n1], &second[..n2]);
}

#[test]
fn nvs_without_record_loads_not_found() {
    let nvs = NvsAdapter::new().unwrap();
    assert_eq!(persistence::load(&nvs), Err(StorageError::NotFound));
}

#[test]
fn truncated_record_loads_not_found() {
    let mut nvs = NvsAdapter::new().unwrap();
    nvs.write(RECORD_NAMESPACE, RECORD_KEY, br#"{"sessionTopic":"mat"#)
        .unwrap();
    assert_eq!(persistence::load(&nvs), Err(StorageError::NotFound));
}

#[test]
fn pairing_survives_reboot() {
    let mut rig = Rig::new();
    rig.pair("session/TEST01/event", 2);
    let flash = std::mem::take(&mut rig.store);

    let mut rebooted = Rig::with_store(flash);
    assert_eq!(rebooted.device.state(), StateId::Paired);
    assert_eq!(rebooted.device.record(), rig.device.record());

    rebooted.tap(false);
    let scores = rebooted.link.published_on("session/TEST01/event");
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0]["team"], 2);
}

#[test]
fn reset_survives_reboot() {
    let mut rig = Rig::new();
    rig.pair("match/7", 2);
    rig.hold_both(10_500);
    let flash = std::mem::take(&mut rig.store);

    let rebooted = Rig::with_store(flash);
    assert_eq!(rebooted.device.state(), StateId::Unpaired);
}

#[test]
fn quote_only_topic_reloads_from_nvs() {
    let mut nvs = NvsAdapter::new().unwrap();
    let mut t = SessionTopic::new();
    for _ in 0..MAX_TOPIC_LEN {
        t.push('"').unwrap();
    }
    let record = PairingRecord::paired(t, 3).unwrap();

    assert_eq!(persistence::save(&mut nvs, &record), Ok(()));
    let loaded = persistence::load(&nvs);
    assert_eq!(loaded, Ok(record.clone()));

    persistence::save(&mut nvs, &record).unwrap();
    assert_eq!(persistence::load(&nvs), Ok(record));
}

#[test]
fn unmounted_flash_boots_unpaired_and_keeps_running() {
    let mut nvs = NvsAdapter::unmounted();
    let mut device = DeviceState::new(BraceletConfig::default(), sim_id());
    let mut buttons = MockButtons::default();
    let mut link = MockLink::new();
    let mut clock = MockClock::default();
    let mut sink = RecordingSink::default();

    device.start(&nvs, &mut sink);
    assert_eq!(device.state(), StateId::Unpaired);
    assert!(sink.contains(&AppEvent::Fault(Error::StorageUnavailable(
        StorageError::MountFailed
    ))));

    let response_topic = format!("pairing/response/{}", device.device_id());
    for _ in 0..5 {
        clock.now += STEP_MS;
        device.step(&mut buttons, &mut link, &mut nvs, &mut clock, &mut sink);
    }
    link.deliver(&response_topic, br#"{"status":"ok","topic":"match/7","team":1}"#);
    clock.now += STEP_MS;
    device.step(&mut buttons, &mut link, &mut nvs, &mut clock, &mut sink);

    assert_eq!(device.state(), StateId::Paired);
    assert!(device.is_persistence_stale());
    assert!(sink.contains(&AppEvent::PersistenceStale(StorageError::MountFailed)));
}
