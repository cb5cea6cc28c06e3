//! Fault counter persistence on the EEPROM adapter.

use winlink::adapters::eeprom::{CONFIG_ADDR, EepromAdapter};
use winlink::app::ports::{ConfigPort, StoragePort};
use winlink::config::{LinkConfig, NodeConfig, WireFormat};
use winlink::error::{StorageFault, StorageOp};
use winlink::faults::{FaultCounterStore, FaultKind};

fn store() -> FaultCounterStore<EepromAdapter> {
    FaultCounterStore::new(EepromAdapter::new().unwrap(), 3)
}

#[test]
fn counters_live_at_their_fixed_addresses() {
    let mut s = store();
    s.increment(FaultKind::Temperature).unwrap();
    s.increment(FaultKind::Temperature).unwrap();
    s.increment(FaultKind::Distance).unwrap();

    let image = s.storage().image();
    assert_eq!(image[0x10], 2);
    assert_eq!(image[0x20], 1);
}

#[test]
fn counters_saturate_at_255() {
    let mut eeprom = EepromAdapter::new().unwrap();
    eeprom.write(FaultKind::Distance.addr(), 254).unwrap();
    let mut s = FaultCounterStore::new(eeprom, 3);

    assert_eq!(s.increment(FaultKind::Distance), Ok(255));
    assert_eq!(s.increment(FaultKind::Distance), Ok(255));
    assert_eq!(s.read(FaultKind::Distance), Ok(255));
}

#[test]
fn transient_failures_are_retried() {
    let mut s = store();
    s.storage_mut().fail_next_reads(2);
    s.storage_mut().fail_next_writes(2);
    assert_eq!(s.increment(FaultKind::Temperature), Ok(1));
    assert_eq!(s.read(FaultKind::Temperature), Ok(1));
}

#[test]
fn persistent_failure_reports_a_fault_and_keeps_the_cache() {
    let mut s = store();
    s.increment(FaultKind::Temperature).unwrap();

    s.storage_mut().fail_next_reads(3);
    assert_eq!(
        s.read(FaultKind::Temperature),
        Err(StorageFault {
            op: StorageOp::Read,
            addr: 0x10,
            attempts: 3
        })
    );
    assert_eq!(s.cached().temp, 1);
}

#[test]
fn reset_all_attempts_both_counters() {
    let mut s = store();
    s.increment(FaultKind::Temperature).unwrap();
    s.increment(FaultKind::Distance).unwrap();

    // Every write to the temperature counter fails; distance still resets.
    s.storage_mut().fail_next_writes(3);
    let err = s.reset_all().unwrap_err();
    assert_eq!(err.op, StorageOp::Write);
    assert_eq!(err.addr, FaultKind::Temperature.addr());
    assert_eq!(s.read(FaultKind::Distance), Ok(0));
    assert_eq!(s.read(FaultKind::Temperature), Ok(1));
}

#[test]
fn config_and_counters_share_the_image_without_overlap() {
    let mut eeprom = EepromAdapter::new().unwrap();
    let config = NodeConfig {
        link: LinkConfig {
            wire_format: WireFormat::Raw,
            ..LinkConfig::default()
        },
        ..NodeConfig::default()
    };
    eeprom.save(&config).unwrap();
    assert_ne!(eeprom.image()[CONFIG_ADDR as usize], 0);

    let mut s = FaultCounterStore::new(eeprom, 3);
    s.increment(FaultKind::Distance).unwrap();
    s.reset_all().unwrap();

    let loaded = s.storage_mut().load().unwrap();
    assert_eq!(loaded.link.wire_format, WireFormat::Raw);
}
