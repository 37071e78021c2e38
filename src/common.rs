// Licensed under the Apache-2.0 license

//! Crate-wide logging capability.
//!
//! Drivers take a `L: Logger` type parameter that defaults to [`NoOpLogger`],
//! so builds that do not care about diagnostics pay nothing for them.

use core::fmt::Write as _;
use heapless::String;

/// Capacity of the scratch buffer used by [`log_fmt`].
pub const LOG_LINE_LEN: usize = 96;

/// Minimal logging sink used by the drivers in this crate.
pub trait Logger {
    fn debug(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Discards every message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn debug(&mut self, _msg: &str) {}
    fn error(&mut self, _msg: &str) {}
}

impl<T: Logger + ?Sized> Logger for &mut T {
    fn debug(&mut self, msg: &str) {
        T::debug(self, msg);
    }

    fn error(&mut self, msg: &str) {
        T::error(self, msg);
    }
}

/// Writes each message as one `\r\n` terminated line to a byte sink such as a
/// UART. Write errors are dropped; logging must never fail a bus transfer.
pub struct WriteLogger<W: embedded_io::Write> {
    sink: W,
}

impl<W: embedded_io::Write> WriteLogger<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    fn line(&mut self, level: &str, msg: &str) {
        let _ = self.sink.write_all(level.as_bytes());
        let _ = self.sink.write_all(msg.as_bytes());
        let _ = self.sink.write_all(b"\r\n");
    }
}

impl<W: embedded_io::Write> Logger for WriteLogger<W> {
    fn debug(&mut self, msg: &str) {
        self.line("[DEBUG] ", msg);
    }

    fn error(&mut self, msg: &str) {
        self.line("[ERROR] ", msg);
    }
}

/// Forwards messages to the `defmt` global logger.
#[cfg(feature = "defmt")]
#[derive(Clone, Copy, Debug, Default)]
pub struct DefmtLogger;

#[cfg(feature = "defmt")]
impl Logger for DefmtLogger {
    fn debug(&mut self, msg: &str) {
        defmt::debug!("{=str}", msg);
    }

    fn error(&mut self, msg: &str) {
        defmt::error!("{=str}", msg);
    }
}

/// Formats `args` into a fixed-size buffer and hands it to `log`.
///
/// Output longer than [`LOG_LINE_LEN`] is truncated rather than dropped.
pub fn log_fmt(args: core::fmt::Arguments<'_>, log: impl FnOnce(&str)) {
    let mut line: String<LOG_LINE_LEN> = String::new();
    let _ = line.write_fmt(args);
    log(line.as_str());
}

/// Formats a message and sends it to `logger.debug`.
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $crate::common::log_fmt(format_args!($($arg)*), |msg| {
            $crate::common::Logger::debug(&mut $logger, msg)
        })
    };
}

/// Formats a message and sends it to `logger.error`.
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => {
        $crate::common::log_fmt(format_args!($($arg)*), |msg| {
            $crate::common::Logger::error(&mut $logger, msg)
        })
    };
}

pub(crate) use {log_debug, log_error};
