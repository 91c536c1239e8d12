//! Sysfs GPIO output pin
//!
//! Drives an already-exported line through `/sys/class/gpio/gpioN/value`.
//! Exporting the line and setting its direction is left to the boot
//! scripts.

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};

/// I/O failure on a sysfs value file
#[derive(Debug)]
pub struct SysfsPinError(pub io::Error);

impl fmt::Display for SysfsPinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sysfs gpio: {}", self.0)
    }
}

impl embedded_hal::digital::Error for SysfsPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Output pin backed by a sysfs `value` file
pub struct SysfsPin {
    path: PathBuf,
    file: File,
}

impl SysfsPin {
    /// Open the value file of an exported line
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().write(true).open(&path)?;
        log::debug!("Opened GPIO value file {}", path.display());
        Ok(Self { path, file })
    }

    /// Open line `gpio` under `sysfs_root` (normally `/sys/class/gpio`)
    pub fn for_line<P: AsRef<Path>>(sysfs_root: P, gpio: u32) -> io::Result<Self> {
        Self::open(
            sysfs_root
                .as_ref()
                .join(format!("gpio{}", gpio))
                .join("value"),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_level(&mut self, high: bool) -> Result<(), SysfsPinError> {
        self.file.rewind().map_err(SysfsPinError)?;
        self.file
            .write_all(if high { b"1" } else { b"0" })
            .map_err(SysfsPinError)?;
        self.file.flush().map_err(SysfsPinError)
    }
}

impl ErrorType for SysfsPin {
    type Error = SysfsPinError;
}

impl OutputPin for SysfsPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write_level(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write_level(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_writes_level_to_value_file() {
        let dir = std::env::temp_dir().join(format!("desk-io-gpio-{}", std::process::id()));
        let line_dir = dir.join("gpio17");
        fs::create_dir_all(&line_dir).unwrap();
        fs::write(line_dir.join("value"), "0").unwrap();

        let mut pin = SysfsPin::for_line(&dir, 17).unwrap();
        pin.set_high().unwrap();
        assert_eq!(fs::read_to_string(pin.path()).unwrap(), "1");
        pin.set_low().unwrap();
        assert_eq!(fs::read_to_string(pin.path()).unwrap(), "0");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_line_fails_to_open() {
        let dir = std::env::temp_dir().join("desk-io-gpio-missing");
        assert!(SysfsPin::for_line(&dir, 99).is_err());
    }
}
