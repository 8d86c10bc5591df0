//! Serial channel to the signal controller.
//!
//! The port is opened once at startup. If that fails the link degrades to a
//! null channel for the rest of the process: the failure is logged once and
//! every later send is a silent no-op. There is no reconnect.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::command::Command;

pub const DEFAULT_BAUD: u32 = 115_200;
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerialSettings {
    /// Port name (e.g. "/dev/ttyUSB0", "COM17"). `None` runs without a device.
    pub port: Option<String>,
    pub baud: u32,
    /// Pause after opening; boards that reset on connect need a moment.
    pub settle: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: None,
            baud: DEFAULT_BAUD,
            settle: Duration::ZERO,
        }
    }
}

pub struct SerialLink {
    channel: Channel,
    name: String,
    commands_sent: u64,
}

enum Channel {
    Port(Box<dyn serialport::SerialPort>),
    Writer(Box<dyn Write + Send>),
    Null,
}

impl SerialLink {
    /// Open the configured port, falling back to a null link on failure.
    pub fn open(settings: &SerialSettings) -> Self {
        let Some(port) = settings.port.as_deref() else {
            log::warn!("no serial port configured; commands will not be sent");
            return Self::null();
        };

        match serialport::new(port, settings.baud)
            .timeout(WRITE_TIMEOUT)
            .open()
        {
            Ok(handle) => {
                log::info!("connected to serial port {} at {} baud", port, settings.baud);
                if !settings.settle.is_zero() {
                    std::thread::sleep(settings.settle);
                }
                Self {
                    channel: Channel::Port(handle),
                    name: port.to_string(),
                    commands_sent: 0,
                }
            }
            Err(err) => {
                log::warn!(
                    "failed to open serial port {}: {}; commands will not be sent",
                    port,
                    err
                );
                Self::null()
            }
        }
    }

    pub fn null() -> Self {
        Self {
            channel: Channel::Null,
            name: "null".to_string(),
            commands_sent: 0,
        }
    }

    /// Wrap an arbitrary writer (test fakes, pipes).
    pub fn from_writer<W: Write + Send + 'static>(name: &str, writer: W) -> Self {
        Self {
            channel: Channel::Writer(Box::new(writer)),
            name: name.to_string(),
            commands_sent: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        !matches!(self.channel, Channel::Null)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }

    /// Write one command. Returns `false` when the link is null.
    ///
    /// Write errors are returned to the caller; nothing is retried.
    pub fn send(&mut self, command: &Command) -> Result<bool> {
        let bytes = command.encode();
        let writer: &mut dyn Write = match &mut self.channel {
            Channel::Port(port) => port,
            Channel::Writer(writer) => writer,
            Channel::Null => return Ok(false),
        };
        writer
            .write_all(&bytes)
            .with_context(|| format!("failed to write {} to {}", command, self.name))?;
        writer
            .flush()
            .with_context(|| format!("failed to flush {}", self.name))?;
        self.commands_sent += 1;
        log::info!("sent: {}", command);
        Ok(true)
    }

    /// Flush and release the device. The link is null afterwards.
    pub fn close(&mut self) -> Result<()> {
        let channel = std::mem::replace(&mut self.channel, Channel::Null);
        match channel {
            Channel::Port(mut port) => {
                port.flush()
                    .with_context(|| format!("failed to flush {}", self.name))?;
                log::info!("serial port {} closed", self.name);
            }
            Channel::Writer(mut writer) => {
                writer
                    .flush()
                    .with_context(|| format!("failed to flush {}", self.name))?;
            }
            Channel::Null => {}
        }
        Ok(())
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("{}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writer_link_writes_encoded_commands() {
        let buffer = SharedBuffer::default();
        let mut link = SerialLink::from_writer("fake", buffer.clone());

        assert!(link.send(&Command::Count { lane: 2, count: 4 }).unwrap());
        assert!(link.send(&Command::Accident).unwrap());
        assert_eq!(link.commands_sent(), 2);
        assert_eq!(buffer.0.lock().unwrap().as_slice(), b"COUNT_LANE_2=4\nA");
    }

    #[test]
    fn unavailable_port_degrades_to_null() {
        let mut link = SerialLink::open(&SerialSettings {
            port: Some("/nonexistent/tty-lane-sensor".to_string()),
            ..SerialSettings::default()
        });
        assert!(!link.is_connected());
        assert!(!link.send(&Command::Ambulance { lane: 2 }).unwrap());
        assert_eq!(link.commands_sent(), 0);
    }

    #[test]
    fn write_errors_propagate() {
        let mut link = SerialLink::from_writer("broken", BrokenPipe);
        assert!(link.send(&Command::Normal).is_err());
    }

    #[test]
    fn close_makes_link_null() {
        let mut link = SerialLink::from_writer("fake", SharedBuffer::default());
        link.close().unwrap();
        assert!(!link.is_connected());
        assert!(!link.send(&Command::Normal).unwrap());
    }
}
