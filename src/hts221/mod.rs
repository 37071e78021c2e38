// Licensed under the Apache-2.0 license

//! HTS221 relative humidity and temperature sensor.
//!
//! The driver is a small state machine on top of [`RegisterAccess`]. Every
//! step issues exactly one register request; the next step runs when that
//! request completes:
//!
//! ```text
//! Uninitialized ─init─▶ Identify ─▶ ConfigureAveraging ─▶ PowerOn ─▶ ReadCalibration ─▶ Ready
//! Ready ─request─▶ Requesting (STATUS) ─data ready─▶ Reading (outputs) ─▶ Ready
//! ```
//!
//! With a polled transport the driver calls its completion handlers itself
//! right after issuing each request, so `init` and `request` return with the
//! whole sequence done. With an interrupt-driven transport the owner forwards
//! the bus completions to [`Hts221::on_write_complete`],
//! [`Hts221::on_read_complete`] and [`Hts221::on_transfer_error`].

pub mod calibration;
pub mod registers;

use crate::i2c::common::RegisterWidth;
use crate::i2c::device::RegisterAccess;

pub use calibration::Calibration;
pub use registers::Config;

use registers::{
    Status, AUTO_INCREMENT, AV_CONF, CALIB_LEN, CALIB_START, CTRL_REG1, DEVICE_ID, HUMIDITY_OUT_L,
    OUTPUT_LEN, STATUS_REG, WHO_AM_I,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitStep {
    Identify,
    ConfigureAveraging,
    PowerOn,
    ReadCalibration,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorState {
    Uninitialized,
    Initializing(InitStep),
    Ready,
    /// Waiting for the STATUS register.
    Requesting,
    /// Waiting for the output registers.
    Reading,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The transport rejected or failed a request.
    Bus(E),
    /// WHO_AM_I did not match.
    InvalidDeviceId(u8),
    /// The calibration block cannot be used for conversion.
    InvalidCalibration,
    /// The driver is in the middle of another sequence, or not initialized.
    NotReady,
    /// A completion arrived that no request is waiting for.
    UnexpectedCompletion,
}

/// One converted sample.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Relative humidity in hundredths of a percent.
    pub humidity_centi: u16,
    /// Temperature in hundredths of a degree Celsius.
    pub temperature_centi: i32,
}

impl Measurement {
    #[must_use]
    pub fn humidity(&self) -> f32 {
        f32::from(self.humidity_centi) / 100.0
    }

    #[must_use]
    pub fn temperature(&self) -> f32 {
        self.temperature_centi as f32 / 100.0
    }
}

pub struct Hts221<B> {
    bus: B,
    config: Config,
    state: SensorState,
    calibration: Option<Calibration>,
    measurement: Option<Measurement>,
}

impl<B: RegisterAccess> Hts221<B> {
    pub fn new(bus: B, config: Config) -> Self {
        Self {
            bus,
            config,
            state: SensorState::Uninitialized,
            calibration: None,
            measurement: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> SensorState {
        self.state
    }

    #[must_use]
    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    /// Returns the latest measurement, leaving none behind.
    pub fn take_measurement(&mut self) -> Option<Measurement> {
        self.measurement.take()
    }

    pub fn free(self) -> B {
        self.bus
    }

    /// Starts (or restarts) the initialization sequence.
    ///
    /// # Errors
    ///
    /// [`Error::NotReady`] while another sequence is running, or the error
    /// of the first failing step.
    pub fn init(&mut self) -> Result<(), Error<B::Error>> {
        if !matches!(self.state, SensorState::Uninitialized | SensorState::Ready) {
            return Err(Error::NotReady);
        }
        self.calibration = None;
        self.measurement = None;
        self.state = SensorState::Initializing(InitStep::Identify);
        self.issue_read(WHO_AM_I, 1)
    }

    /// Starts a measurement: checks STATUS and, if both outputs are fresh,
    /// reads them.
    ///
    /// # Errors
    ///
    /// [`Error::NotReady`] unless the driver is `Ready`, or a bus error.
    pub fn request(&mut self) -> Result<(), Error<B::Error>> {
        if self.state != SensorState::Ready {
            return Err(Error::NotReady);
        }
        self.state = SensorState::Requesting;
        self.issue_read(STATUS_REG, 1)
    }

    /// Advances the sequence after a register write finished.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedCompletion`] if no write was pending, or the error
    /// of the next step.
    pub fn on_write_complete(&mut self) -> Result<(), Error<B::Error>> {
        match self.state {
            SensorState::Initializing(InitStep::ConfigureAveraging) => {
                self.state = SensorState::Initializing(InitStep::PowerOn);
                self.issue_write(CTRL_REG1, self.config.ctrl_reg1())
            }
            SensorState::Initializing(InitStep::PowerOn) => {
                self.state = SensorState::Initializing(InitStep::ReadCalibration);
                self.issue_read(CALIB_START, CALIB_LEN)
            }
            _ => Err(Error::UnexpectedCompletion),
        }
    }

    /// Advances the sequence after a register read delivered `data`.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedCompletion`] if no read was pending,
    /// [`Error::InvalidDeviceId`] or [`Error::InvalidCalibration`] for bad
    /// contents, or the error of the next step.
    pub fn on_read_complete(&mut self, data: &[u8]) -> Result<(), Error<B::Error>> {
        match self.state {
            SensorState::Initializing(InitStep::Identify) => {
                let id = data.first().copied().unwrap_or(0);
                if id != DEVICE_ID {
                    self.state = SensorState::Uninitialized;
                    return Err(Error::InvalidDeviceId(id));
                }
                self.state = SensorState::Initializing(InitStep::ConfigureAveraging);
                self.issue_write(AV_CONF, self.config.av_conf())
            }
            SensorState::Initializing(InitStep::ReadCalibration) => {
                let calibration = <&[u8; CALIB_LEN]>::try_from(data)
                    .ok()
                    .and_then(|raw| Calibration::from_registers(raw).ok());
                let Some(calibration) = calibration else {
                    self.state = SensorState::Uninitialized;
                    return Err(Error::InvalidCalibration);
                };
                self.calibration = Some(calibration);
                self.state = SensorState::Ready;
                Ok(())
            }
            SensorState::Requesting => {
                let status = Status::from_bits_truncate(data.first().copied().unwrap_or(0));
                if !status.contains(Status::H_DA | Status::T_DA) {
                    self.state = SensorState::Ready;
                    return Ok(());
                }
                self.state = SensorState::Reading;
                self.issue_read(HUMIDITY_OUT_L, OUTPUT_LEN)
            }
            SensorState::Reading => {
                self.state = SensorState::Ready;
                let (Some(calibration), [h_l, h_h, t_l, t_h]) = (self.calibration, data) else {
                    return Err(Error::UnexpectedCompletion);
                };
                let humidity = i16::from_le_bytes([*h_l, *h_h]);
                let temperature = i16::from_le_bytes([*t_l, *t_h]);
                self.measurement = Some(Measurement {
                    humidity_centi: calibration.humidity_centi(humidity),
                    temperature_centi: calibration.temperature_centi(temperature),
                });
                Ok(())
            }
            _ => Err(Error::UnexpectedCompletion),
        }
    }

    /// Abandons the step in flight after the transport reported a failure.
    pub fn on_transfer_error(&mut self) {
        self.state = match self.state {
            SensorState::Initializing(_) | SensorState::Uninitialized => {
                SensorState::Uninitialized
            }
            SensorState::Ready | SensorState::Requesting | SensorState::Reading => {
                SensorState::Ready
            }
        };
    }

    fn issue_read(&mut self, register: u8, len: usize) -> Result<(), Error<B::Error>> {
        let register = if len > 1 {
            register | AUTO_INCREMENT
        } else {
            register
        };
        let mut buffer = [0u8; CALIB_LEN];
        let data = buffer.get_mut(..len).ok_or(Error::NotReady)?;
        if let Err(err) = self
            .bus
            .read_register(u16::from(register), RegisterWidth::U8, data)
        {
            self.on_transfer_error();
            return Err(Error::Bus(err));
        }
        if self.bus.is_interrupt_driven() {
            return Ok(());
        }
        self.on_read_complete(data)
    }

    fn issue_write(&mut self, register: u8, value: u8) -> Result<(), Error<B::Error>> {
        if let Err(err) = self
            .bus
            .write_register(u16::from(register), RegisterWidth::U8, &[value])
        {
            self.on_transfer_error();
            return Err(Error::Bus(err));
        }
        if self.bus.is_interrupt_driven() {
            return Ok(());
        }
        self.on_write_complete()
    }
}
