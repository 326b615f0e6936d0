//! Digital I/O lines
//!
//! The pollers and the session manager talk to the outside world through
//! the two small traits below. On the target hardware the lines are sysfs
//! GPIO value files; tests use [`MemoryLine`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Logic level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }

    pub fn is_low(self) -> bool {
        self == Level::Low
    }
}

/// Polled digital input.
pub trait InputLine: Send {
    fn level(&self) -> Result<Level>;
}

/// Settable digital output.
pub trait OutputLine: Send {
    fn set(&mut self, level: Level) -> Result<()>;
}

impl<T: InputLine + ?Sized> InputLine for Box<T> {
    fn level(&self) -> Result<Level> {
        (**self).level()
    }
}

impl<T: OutputLine + ?Sized> OutputLine for Box<T> {
    fn set(&mut self, level: Level) -> Result<()> {
        (**self).set(level)
    }
}

/// Input line backed by a sysfs GPIO value file.
///
/// Reads `/sys/class/gpio/gpioN/value`-style files: the first byte is
/// `'0'` for low, anything else for high.
pub struct SysfsInput {
    path: PathBuf,
}

impl SysfsInput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl InputLine for SysfsInput {
    fn level(&self) -> Result<Level> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::Gpio(format!("Cannot read {}: {}", self.path.display(), e)))?;
        match raw.trim_start().as_bytes().first() {
            Some(b'0') => Ok(Level::Low),
            Some(_) => Ok(Level::High),
            None => Err(Error::Gpio(format!("Empty value file {}", self.path.display()))),
        }
    }
}

/// Output line backed by a sysfs GPIO value file.
pub struct SysfsOutput {
    path: PathBuf,
}

impl SysfsOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OutputLine for SysfsOutput {
    fn set(&mut self, level: Level) -> Result<()> {
        let value = if level.is_high() { "1" } else { "0" };
        std::fs::write(&self.path, value)
            .map_err(|e| Error::Gpio(format!("Cannot write {}: {}", self.path.display(), e)))
    }
}

/// In-memory line for tests and wiring without hardware.
///
/// Clones share the same level, so a test can hold one handle to drive
/// the line and hand another to the component under test.
#[derive(Clone)]
pub struct MemoryLine {
    level: Arc<AtomicBool>,
}

impl MemoryLine {
    pub fn new(level: Level) -> Self {
        Self {
            level: Arc::new(AtomicBool::new(level.is_high())),
        }
    }

    /// Drive the line to the given level.
    pub fn drive(&self, level: Level) {
        self.level.store(level.is_high(), Ordering::Relaxed);
    }

    /// Read back the last driven level.
    pub fn read(&self) -> Level {
        if self.level.load(Ordering::Relaxed) {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl InputLine for MemoryLine {
    fn level(&self) -> Result<Level> {
        Ok(self.read())
    }
}

impl OutputLine for MemoryLine {
    fn set(&mut self, level: Level) -> Result<()> {
        self.drive(level);
        Ok(())
    }
}
