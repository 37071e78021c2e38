// Licensed under the Apache-2.0 license

use heapless::spsc::{Consumer, Producer, Queue};
use hex_literal::hex;

use crate::hts221::registers::{AV_CONF, CALIB_START, CTRL_REG1, STATUS_REG};
use crate::hts221::{Config, Error, Hts221, InitStep, SensorState};
use crate::i2c::callbacks::I2cCallback;
use crate::i2c::common::{I2cConfig, I2cConfigBuilder, I2cError};
use crate::i2c::device::{HalRegisters, InterruptRegisters};
use crate::i2c::handle::I2cHandle;
use crate::i2c::i2c_controller::I2cController;
use crate::i2c::queue::{Completion, QueueCallbacks};
use crate::i2c::shared::SharedI2c;
use crate::tests::sim::{run_interrupts, SimBus};

const ADDRESS: u8 = 0x5F;
const CALIBRATION: [u8; 16] = hex!("28 8C A0 18 00 04 E8 03 00 00 F8 2A 64 00 40 06");

/// An HTS221 with fresh samples: 45.00 %RH and 27.50 C.
fn sensor_bus() -> SimBus {
    let sim = SimBus::new(ADDRESS).with_pointer_mask(0x7F);
    sim.load(0x0F, &[0xBC]);
    sim.load(CALIB_START, &CALIBRATION);
    sim.load(STATUS_REG, &[0x03]);
    sim.load(0x28, &hex!("70 17 52 03"));
    sim
}

#[test]
fn test_polled_init_and_measure() {
    let sim = sensor_bus();
    let bus = I2cController::new(I2cHandle::new(sim.clone(), I2cConfig::default()));
    let mut sensor = Hts221::new(HalRegisters::new(bus, ADDRESS), Config::default());

    sensor.init().unwrap();
    assert_eq!(sensor.state(), SensorState::Ready);
    assert_eq!(sim.register(AV_CONF), 0x3F);
    assert_eq!(sim.register(CTRL_REG1), 0x85);
    assert_eq!(sensor.calibration().map(|c| c.t1_degc_x8), Some(280));

    sensor.request().unwrap();
    let sample = sensor.take_measurement().unwrap();
    assert_eq!(sample.humidity_centi, 4500);
    assert_eq!(sample.temperature_centi, 2750);
    assert!(sensor.take_measurement().is_none());
}

#[test]
fn test_polled_stale_status_skips_read() {
    let sim = sensor_bus();
    let bus = I2cController::new(I2cHandle::new(sim.clone(), I2cConfig::default()));
    let mut sensor = Hts221::new(HalRegisters::new(bus, ADDRESS), Config::default());
    sensor.init().unwrap();

    sim.load(STATUS_REG, &[0x01]);
    sim.clear_wire();
    sensor.request().unwrap();

    assert!(sensor.take_measurement().is_none());
    assert_eq!(sensor.state(), SensorState::Ready);
    // STATUS only: address, offset, restart, one byte, stop.
    assert_eq!(sim.wire().len(), 5);
}

#[test]
fn test_polled_wrong_device() {
    let sim = sensor_bus();
    sim.load(0x0F, &[0x33]);
    let bus = I2cController::new(I2cHandle::new(sim, I2cConfig::default()));
    let mut sensor = Hts221::new(HalRegisters::new(bus, ADDRESS), Config::default());

    assert_eq!(sensor.init(), Err(Error::InvalidDeviceId(0x33)));
    assert_eq!(sensor.state(), SensorState::Uninitialized);
    assert_eq!(sensor.request(), Err(Error::NotReady));
}

/// The HTS221 ends a write at a repeated START, so register writes keep
/// offset and payload in one write.
fn sensor_handle<'q>(
    sim: &SimBus,
    producer: Producer<'q, Completion, 4>,
) -> I2cHandle<SimBus, QueueCallbacks<'q, 4>> {
    let config = I2cConfigBuilder::new()
        .memory_write_continuation(true)
        .build();
    I2cHandle::new(sim.clone(), config).with_callbacks(QueueCallbacks::new(producer))
}

/// Feeds every queued completion to the sensor, as a main loop would.
fn drain<B: crate::i2c::device::RegisterAccess>(
    sensor: &mut Hts221<B>,
    consumer: &mut Consumer<'_, Completion, 4>,
) -> Result<usize, Error<B::Error>> {
    let mut handled = 0;
    while let Some(done) = consumer.dequeue() {
        handled += 1;
        match done.kind {
            I2cCallback::MemoryWriteComplete | I2cCallback::WriteComplete => {
                sensor.on_write_complete()?;
            }
            I2cCallback::MemoryReadComplete | I2cCallback::ReadComplete => {
                sensor.on_read_complete(&done.data)?;
            }
            I2cCallback::NotAcknowledged | I2cCallback::Timeout => sensor.on_transfer_error(),
        }
    }
    Ok(handled)
}

#[test]
fn test_interrupt_driven_init_and_measure() {
    let sim = sensor_bus();
    let mut queue: Queue<Completion, 4> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let shared = SharedI2c::new();
    shared.install(sensor_handle(&sim, producer));
    let mut sensor = Hts221::new(InterruptRegisters::new(&shared, ADDRESS), Config::default());

    sensor.init().unwrap();
    assert_eq!(sensor.state(), SensorState::Initializing(InitStep::Identify));

    let mut steps = 0;
    while sensor.state() != SensorState::Ready && steps < 10 {
        run_interrupts(|| shared.on_interrupt(), &sim);
        drain(&mut sensor, &mut consumer).unwrap();
        steps += 1;
    }
    // Identify, averaging, power on, calibration.
    assert_eq!(steps, 4);
    assert_eq!(sim.register(AV_CONF), 0x3F);
    assert_eq!(sim.register(CTRL_REG1), 0x85);

    sensor.request().unwrap();
    assert_eq!(sensor.state(), SensorState::Requesting);
    run_interrupts(|| shared.on_interrupt(), &sim);
    drain(&mut sensor, &mut consumer).unwrap();
    assert_eq!(sensor.state(), SensorState::Reading);
    run_interrupts(|| shared.on_interrupt(), &sim);
    drain(&mut sensor, &mut consumer).unwrap();

    let sample = sensor.take_measurement().unwrap();
    assert_eq!(sample.humidity_centi, 4500);
    assert_eq!(sample.temperature_centi, 2750);
    assert_eq!(
        shared.with(|h| h.callbacks().dropped()),
        Some(0)
    );
}

#[test]
fn test_interrupt_driven_request_while_bus_busy() {
    let sim = sensor_bus();
    let mut queue: Queue<Completion, 4> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let shared = SharedI2c::new();
    shared.install(sensor_handle(&sim, producer));
    let mut sensor = Hts221::new(InterruptRegisters::new(&shared, ADDRESS), Config::default());
    sensor.init().unwrap();
    for _ in 0..4 {
        run_interrupts(|| shared.on_interrupt(), &sim);
        drain(&mut sensor, &mut consumer).unwrap();
    }
    assert_eq!(sensor.state(), SensorState::Ready);

    // Another transfer holds the handle.
    shared
        .try_with(|h| h.read_async(0x40, 1))
        .unwrap();
    assert_eq!(sensor.request(), Err(Error::Bus(I2cError::Busy)));
    assert_eq!(sensor.state(), SensorState::Ready);
}

#[test]
fn test_interrupt_driven_nack_resets_sensor() {
    let sim = sensor_bus();
    sim.remove_target();
    let mut queue: Queue<Completion, 4> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let shared = SharedI2c::new();
    shared.install(sensor_handle(&sim, producer));
    let mut sensor = Hts221::new(InterruptRegisters::new(&shared, ADDRESS), Config::default());

    sensor.init().unwrap();
    run_interrupts(|| shared.on_interrupt(), &sim);
    assert_eq!(drain(&mut sensor, &mut consumer), Ok(1));
    assert_eq!(sensor.state(), SensorState::Uninitialized);
}

#[test]
fn test_uninstalled_handle_is_unavailable() {
    let shared: SharedI2c<I2cHandle<SimBus>> = SharedI2c::new();
    let mut sensor = Hts221::new(InterruptRegisters::new(&shared, ADDRESS), Config::default());

    assert_eq!(sensor.init(), Err(Error::Bus(I2cError::Unavailable)));
    assert_eq!(sensor.state(), SensorState::Uninitialized);
    assert!(!shared.is_installed());
}
