// Licensed under the Apache-2.0 license

//! Factory calibration and conversion of raw outputs.
//!
//! The device stores two calibration points for each quantity. Outputs are
//! converted by linear interpolation between them, in integer hundredths.

use zerocopy::byteorder::little_endian::I16;
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::hts221::registers::CALIB_LEN;

/// Layout of the calibration block at 0x30..=0x3F.
#[derive(FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct CalibrationRegisters {
    pub h0_rh_x2: u8,
    pub h1_rh_x2: u8,
    pub t0_degc_x8: u8,
    pub t1_degc_x8: u8,
    _reserved0: u8,
    /// Bits 1:0 extend T0, bits 3:2 extend T1.
    pub t1_t0_msb: u8,
    pub h0_t0_out: I16,
    _reserved1: [u8; 2],
    pub h1_t0_out: I16,
    pub t0_out: I16,
    pub t1_out: I16,
}

/// Decoded calibration points.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    /// Relative humidity of the two points, in half percent.
    pub h0_rh_x2: u8,
    pub h1_rh_x2: u8,
    /// Temperature of the two points, in eighths of a degree.
    pub t0_degc_x8: u16,
    pub t1_degc_x8: u16,
    pub h0_out: i16,
    pub h1_out: i16,
    pub t0_out: i16,
    pub t1_out: i16,
}

/// The calibration points coincide, so no slope can be derived.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DegenerateCalibration;

impl Calibration {
    /// # Errors
    ///
    /// [`DegenerateCalibration`] if either pair of raw points is equal.
    pub fn from_registers(raw: &[u8; CALIB_LEN]) -> Result<Self, DegenerateCalibration> {
        let regs =
            CalibrationRegisters::read_from_bytes(raw).map_err(|_| DegenerateCalibration)?;
        let calibration = Self {
            h0_rh_x2: regs.h0_rh_x2,
            h1_rh_x2: regs.h1_rh_x2,
            t0_degc_x8: u16::from(regs.t0_degc_x8) | (u16::from(regs.t1_t0_msb & 0x03) << 8),
            t1_degc_x8: u16::from(regs.t1_degc_x8) | (u16::from(regs.t1_t0_msb & 0x0C) << 6),
            h0_out: regs.h0_t0_out.get(),
            h1_out: regs.h1_t0_out.get(),
            t0_out: regs.t0_out.get(),
            t1_out: regs.t1_out.get(),
        };
        if calibration.h0_out == calibration.h1_out || calibration.t0_out == calibration.t1_out {
            return Err(DegenerateCalibration);
        }
        Ok(calibration)
    }

    /// Relative humidity in hundredths of a percent, clamped to 0..=10000.
    #[must_use]
    pub fn humidity_centi(&self, raw: i16) -> u16 {
        let value = interpolate(
            i64::from(self.h0_rh_x2),
            i64::from(self.h1_rh_x2),
            self.h0_out,
            self.h1_out,
            raw,
        ) / 2;
        u16::try_from(value.clamp(0, 10_000)).unwrap_or(0)
    }

    /// Temperature in hundredths of a degree Celsius.
    #[must_use]
    pub fn temperature_centi(&self, raw: i16) -> i32 {
        let value = interpolate(
            i64::from(self.t0_degc_x8),
            i64::from(self.t1_degc_x8),
            self.t0_out,
            self.t1_out,
            raw,
        ) / 8;
        i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
    }
}

/// `y0 + (y1 - y0) * (x - x0) / (x1 - x0)`, scaled by 100.
fn interpolate(y0: i64, y1: i64, x0: i16, x1: i16, x: i16) -> i64 {
    let span = i64::from(x1) - i64::from(x0);
    if span == 0 {
        return y0 * 100;
    }
    y0 * 100 + (y1 - y0) * 100 * (i64::from(x) - i64::from(x0)) / span
}
