// Licensed under the Apache-2.0 license

//! HTS221 register map and configuration fields.

use bitflags::bitflags;

/// Fixed 7-bit bus address.
pub const ADDRESS: u8 = 0x5F;

pub const WHO_AM_I: u8 = 0x0F;
pub const AV_CONF: u8 = 0x10;
pub const CTRL_REG1: u8 = 0x20;
pub const CTRL_REG2: u8 = 0x21;
pub const CTRL_REG3: u8 = 0x22;
pub const STATUS_REG: u8 = 0x27;
pub const HUMIDITY_OUT_L: u8 = 0x28;
pub const HUMIDITY_OUT_H: u8 = 0x29;
pub const TEMP_OUT_L: u8 = 0x2A;
pub const TEMP_OUT_H: u8 = 0x2B;
pub const CALIB_START: u8 = 0x30;

/// Size of the factory calibration block at [`CALIB_START`].
pub const CALIB_LEN: usize = 16;

/// Humidity and temperature output registers, read as one block.
pub const OUTPUT_LEN: usize = 4;

/// WHO_AM_I contents.
pub const DEVICE_ID: u8 = 0xBC;

/// Set on the sub-address to read several registers in one transfer.
pub const AUTO_INCREMENT: u8 = 0x80;

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Ctrl1: u8 {
        /// Power on.
        const PD = 1 << 7;
        /// Output registers update only after both bytes are read.
        const BDU = 1 << 2;
        const ODR1 = 1 << 1;
        const ODR0 = 1 << 0;
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Ctrl2: u8 {
        const BOOT = 1 << 7;
        const HEATER = 1 << 1;
        const ONE_SHOT = 1 << 0;
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Status: u8 {
        const H_DA = 1 << 1;
        const T_DA = 1 << 0;
    }
}

/// Internal humidity samples averaged per output (AVGH).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum HumidityAveraging {
    Avg4 = 0,
    Avg8 = 1,
    Avg16 = 2,
    Avg32 = 3,
    Avg64 = 4,
    Avg128 = 5,
    Avg256 = 6,
    Avg512 = 7,
}

/// Internal temperature samples averaged per output (AVGT).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TemperatureAveraging {
    Avg2 = 0,
    Avg4 = 1,
    Avg8 = 2,
    Avg16 = 3,
    Avg32 = 4,
    Avg64 = 5,
    Avg128 = 6,
    Avg256 = 7,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OutputDataRate {
    OneShot = 0,
    Hz1 = 1,
    Hz7 = 2,
    Hz12_5 = 3,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub humidity_averaging: HumidityAveraging,
    pub temperature_averaging: TemperatureAveraging,
    pub data_rate: OutputDataRate,
    pub block_data_update: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            humidity_averaging: HumidityAveraging::Avg512,
            temperature_averaging: TemperatureAveraging::Avg256,
            data_rate: OutputDataRate::Hz1,
            block_data_update: true,
        }
    }
}

impl Config {
    #[must_use]
    pub fn av_conf(&self) -> u8 {
        ((self.temperature_averaging as u8) << 3) | self.humidity_averaging as u8
    }

    /// CTRL_REG1 value that powers the device on with this configuration.
    #[must_use]
    pub fn ctrl_reg1(&self) -> u8 {
        let mut value = Ctrl1::PD;
        if self.block_data_update {
            value |= Ctrl1::BDU;
        }
        value.bits() | self.data_rate as u8
    }
}
