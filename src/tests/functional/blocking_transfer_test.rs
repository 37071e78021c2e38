// Licensed under the Apache-2.0 license

use embedded_hal::i2c::{I2c, Operation};

use crate::i2c::common::{I2cConfig, I2cConfigBuilder, I2cError, I2cState, RegisterWidth};
use crate::i2c::handle::I2cHandle;
use crate::i2c::i2c_controller::I2cController;
use crate::i2c::registers::{Cr1, Isr};
use crate::tests::sim::{SimBus, Wire};

fn start(address: u8, read: bool, nbytes: u8) -> Wire {
    Wire::Start {
        address,
        read,
        nbytes,
    }
}

#[test]
fn test_write_stores_bytes() {
    let sim = SimBus::new(0x50);
    let mut h = I2cHandle::new(sim.clone(), I2cConfig::default());

    h.write(0x50, &[0x10, 0xAA, 0xBB]).unwrap();

    assert_eq!(
        sim.wire(),
        vec![
            start(0x50, false, 3),
            Wire::Tx(0x10),
            Wire::Tx(0xAA),
            Wire::Tx(0xBB),
            Wire::Stop
        ]
    );
    assert_eq!(sim.register(0x10), 0xAA);
    assert_eq!(sim.register(0x11), 0xBB);
    assert_eq!(h.state(), I2cState::Ready);
    assert_eq!(h.status().data_transferred, 3);
    assert!(!sim.isr().contains(Isr::STOPF));
}

#[test]
fn test_write_read_uses_repeated_start() {
    let sim = SimBus::new(0x50);
    sim.load(0x20, &[1, 2, 3]);
    let mut h = I2cHandle::new(sim.clone(), I2cConfig::default());
    let mut buffer = [0u8; 3];

    h.write_read(0x50, &[0x20], &mut buffer).unwrap();

    assert_eq!(buffer, [1, 2, 3]);
    assert_eq!(
        sim.wire(),
        vec![
            start(0x50, false, 1),
            Wire::Tx(0x20),
            start(0x50, true, 3),
            Wire::Rx(1),
            Wire::Rx(2),
            Wire::Rx(3),
            Wire::Stop
        ]
    );
}

#[test]
fn test_memory_write_restarts_for_payload() {
    let sim = SimBus::new(0x50).with_wide_offsets();
    let mut h = I2cHandle::new(sim.clone(), I2cConfig::default());

    h.memory_write(0x50, 0x0130, RegisterWidth::U16, &[9, 8, 7])
        .unwrap();
    assert_eq!(
        sim.wire(),
        vec![
            start(0x50, false, 2),
            Wire::Tx(0x01),
            Wire::Tx(0x30),
            start(0x50, false, 3),
            Wire::Tx(9),
            Wire::Tx(8),
            Wire::Tx(7),
            Wire::Stop
        ]
    );
    let status = h.status();
    assert_eq!(status.register_bytes_sent, 2);
    assert_eq!(status.data_transferred, 3);
    assert_eq!(h.state(), I2cState::Ready);
}

#[test]
fn test_memory_access_round_trip() {
    let sim = SimBus::new(0x50).with_wide_offsets();
    let config = I2cConfigBuilder::new()
        .memory_write_continuation(true)
        .build();
    let mut h = I2cHandle::new(sim.clone(), config);

    h.memory_write(0x50, 0x0130, RegisterWidth::U16, &[9, 8, 7])
        .unwrap();
    assert_eq!(
        sim.wire(),
        vec![
            start(0x50, false, 2),
            Wire::Tx(0x01),
            Wire::Tx(0x30),
            Wire::Reload { nbytes: 3 },
            Wire::Tx(9),
            Wire::Tx(8),
            Wire::Tx(7),
            Wire::Stop
        ]
    );
    assert_eq!(h.status().register_bytes_sent, 2);

    sim.clear_wire();
    let mut buffer = [0u8; 3];
    h.memory_read(0x50, 0x0130, RegisterWidth::U16, &mut buffer)
        .unwrap();
    assert_eq!(buffer, [9, 8, 7]);
    assert_eq!(sim.wire()[3], start(0x50, true, 3));
}

#[test]
fn test_register_wider_than_offset_rejected() {
    let sim = SimBus::new(0x50);
    let mut h = I2cHandle::new(sim.clone(), I2cConfig::default());
    let before = h.status();
    let mut buffer = [0u8; 1];

    assert_eq!(
        h.memory_write(0x50, 0x0123, RegisterWidth::U8, &[1]),
        Err(I2cError::InvalidLength)
    );
    assert_eq!(
        h.memory_read(0x50, 0x0100, RegisterWidth::U8, &mut buffer),
        Err(I2cError::InvalidLength)
    );
    assert_eq!(h.status(), before);
    assert!(sim.wire().is_empty());

    h.memory_read(0x50, 0x0123, RegisterWidth::U16, &mut buffer)
        .unwrap();
}

#[test]
fn test_long_write_is_split_with_reload() {
    let sim = SimBus::new(0x50);
    let mut h = I2cHandle::new(sim.clone(), I2cConfig::default());
    let data = [0x5Au8; 300];

    h.write(0x50, &data).unwrap();

    let wire = sim.wire();
    assert_eq!(wire[0], start(0x50, false, 255));
    assert_eq!(wire[256], Wire::Reload { nbytes: 45 });
    assert_eq!(wire.last(), Some(&Wire::Stop));
    assert_eq!(sim.sent().len(), 300);
    assert_eq!(h.status().data_transferred, 300);
}

#[test]
fn test_transaction_merges_and_turns_around() {
    let sim = SimBus::new(0x50);
    sim.load(0x07, &[0xC0, 0xC1]);
    let mut h = I2cHandle::new(sim.clone(), I2cConfig::default());
    let mut buffer = [0u8; 2];

    h.transaction(
        0x50,
        &mut [
            Operation::Write(&[0x05]),
            Operation::Write(&[0xA0, 0xA1]),
            Operation::Read(&mut buffer),
        ],
    )
    .unwrap();

    assert_eq!(buffer, [0xC0, 0xC1]);
    assert_eq!(
        sim.wire(),
        vec![
            start(0x50, false, 1),
            Wire::Tx(0x05),
            Wire::Reload { nbytes: 2 },
            Wire::Tx(0xA0),
            Wire::Tx(0xA1),
            start(0x50, true, 2),
            Wire::Rx(0xC0),
            Wire::Rx(0xC1),
            Wire::Stop
        ]
    );
    assert_eq!(sim.register(0x05), 0xA0);
}

#[test]
fn test_empty_transaction_touches_nothing() {
    let sim = SimBus::new(0x50);
    let mut h = I2cHandle::new(sim.clone(), I2cConfig::default());
    h.transaction(0x50, &mut []).unwrap();
    assert!(sim.wire().is_empty());
}

#[test]
fn test_missing_device_nacks() {
    let sim = SimBus::new(0x50);
    sim.remove_target();
    let mut h = I2cHandle::new(sim.clone(), I2cConfig::default());

    assert_eq!(h.write(0x50, &[1, 2]), Err(I2cError::NotAcknowledged));
    assert_eq!(h.state(), I2cState::Ready);
    assert_eq!(h.last_error(), Some(I2cError::NotAcknowledged));
    // Probing with an empty write reports the same.
    assert_eq!(h.write(0x50, &[]), Err(I2cError::NotAcknowledged));
    assert!(!sim.isr().contains(Isr::NACKF));
}

#[test]
fn test_data_nack_stops_write() {
    let sim = SimBus::new(0x50);
    sim.nack_after(1);
    let mut h = I2cHandle::new(sim.clone(), I2cConfig::default());

    assert_eq!(h.write(0x50, &[0x00, 1, 2]), Err(I2cError::NotAcknowledged));
    assert_eq!(sim.sent(), vec![0x00, 1]);
    assert_eq!(h.status().data_transferred, 2);
}

#[test]
fn test_stalled_bus_times_out_within_budget() {
    let sim = SimBus::new(0x50);
    sim.stall();
    let config = I2cConfigBuilder::new().timeout_polls(50).build();
    let mut h = I2cHandle::new(sim.clone(), config);

    assert_eq!(h.write(0x50, &[1]), Err(I2cError::Timeout));
    assert_eq!(h.state(), I2cState::Ready);
    assert_eq!(h.last_error(), Some(I2cError::Timeout));
    // One readiness check plus the poll budget of the stalled slot.
    assert_eq!(sim.isr_reads(), 51);
}

#[test]
fn test_busy_bus_rejected_without_traffic() {
    let sim = SimBus::new(0x50);
    sim.set_bus_busy(true);
    let mut h = I2cHandle::new(sim.clone(), I2cConfig::default());
    let before = h.status();
    let mut buffer = [0u8; 1];

    assert_eq!(h.read(0x50, &mut buffer), Err(I2cError::Busy));
    assert_eq!(
        h.memory_read(0x50, 0, RegisterWidth::U8, &mut buffer),
        Err(I2cError::Busy)
    );
    assert_eq!(h.status(), before);
    assert!(sim.wire().is_empty());

    sim.set_bus_busy(false);
    h.read(0x50, &mut buffer).unwrap();
}

#[test]
fn test_initialize_is_idempotent() {
    let sim = SimBus::new(0x50);
    let mut h = I2cHandle::new(sim.clone(), I2cConfig::default());
    let fresh = h.status();

    h.initialize();
    let once = h.status();
    h.initialize();
    assert_eq!(h.status(), once);
    assert_eq!(once, fresh);

    h.write(0x50, &[1, 2]).unwrap();
    assert_ne!(h.status(), fresh);
    h.initialize();
    h.initialize();
    assert_eq!(h.status(), fresh);
    // Only the transfers touched the bus.
    assert_eq!(sim.wire().len(), 4);
    assert!(!sim.cr1().intersects(Cr1::TRANSFER_IRQS));
}

#[test]
fn test_recover_bus_after_stall() {
    let sim = SimBus::new(0x50);
    sim.stall();
    let mut h = I2cHandle::new(sim.clone(), I2cConfig::default());

    h.read_async(0x50, 4).unwrap();
    assert!(h.state().is_busy());
    h.recover_bus().unwrap();

    assert_eq!(h.state(), I2cState::Ready);
    assert!(sim.cr1().contains(Cr1::PE));
    assert!(!sim.cr1().intersects(Cr1::TRANSFER_IRQS));
}

#[test]
fn test_controller_speaks_embedded_hal() {
    let sim = SimBus::new(0x50);
    sim.load(0x30, &[0x42]);
    let mut bus = I2cController::new(I2cHandle::new(sim.clone(), I2cConfig::default()));
    let mut id = [0u8; 1];

    bus.write_read(0x50, &[0x30], &mut id).unwrap();
    assert_eq!(id, [0x42]);
    bus.write(0x50, &[0x31, 0x99]).unwrap();
    assert_eq!(sim.register(0x31), 0x99);

    sim.remove_target();
    let err = bus.read(0x50, &mut id).unwrap_err();
    assert_eq!(err, I2cError::NotAcknowledged);
    assert_eq!(bus.free().state(), I2cState::Ready);
}
