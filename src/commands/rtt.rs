//! RTT command implementation

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use flashkit_core::error::Error as CoreError;
use flashkit_core::log::Logger;
use flashkit_flash::{open_programmer, FlashError, Programmer, RttControl};

use crate::cli::RttArgs;

/// Delay after reset before looking for the control block
const RESET_SETTLE: Duration = Duration::from_millis(500);
/// Delay given to the probe to locate the control block
const RTT_SETTLE: Duration = Duration::from_secs(1);
/// Polling interval of the read loop
const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Largest chunk pulled per read
const READ_CHUNK: usize = 4096;

/// Why the read loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamEnd {
    Timeout,
    Interrupted,
}

/// SIGINT sets a flag instead of killing the process while registered
struct InterruptFlag {
    flag: Arc<AtomicBool>,
    id: signal_hook::SigId,
}

impl InterruptFlag {
    fn register() -> std::io::Result<Self> {
        let flag = Arc::new(AtomicBool::new(false));
        let id = signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&flag))?;
        Ok(Self { flag, id })
    }
}

impl Drop for InterruptFlag {
    fn drop(&mut self) {
        signal_hook::low_level::unregister(self.id);
    }
}

/// Run the rtt command
pub fn cmd_rtt(args: &RttArgs, logger: &Logger) -> Result<(), Box<dyn std::error::Error>> {
    let mut handle = open_programmer(&args.programmer, args.serial, logger.clone())?;
    let interrupt = InterruptFlag::register()?;

    if !handle.connect(args.mcu.as_deref()) {
        return Err(FlashError::ConnectFailed.into());
    }
    if let Some(target) = handle.target() {
        println!("Connected to {}", target);
    }

    if args.should_reset() {
        println!("Resetting target...");
        handle.reset(false);
        thread::sleep(RESET_SETTLE);
    }

    let name = handle.name();
    let rtt = handle
        .as_rtt()
        .ok_or_else(|| FlashError::RttUnsupported(name.to_string()))?;

    if !rtt.start_rtt(args.address, RTT_SETTLE) {
        return Err(CoreError::Rtt("could not start RTT".into()).into());
    }

    println!("RTT connected. Reading data...");
    if args.timeout > 0.0 {
        println!("(Reading for {} seconds)", args.timeout);
    } else {
        println!("(Press Ctrl+C to stop)");
    }
    println!("{}", "-".repeat(50));

    if let Some(msg) = &args.msg {
        thread::sleep(Duration::from_secs_f64(args.msg_timeout));
        let data = decode_escapes(msg);
        match rtt.rtt_write(&data) {
            Some(n) => logger.debug(format_args!("Sent {} of {} bytes", n, data.len())),
            None => logger.warn(format_args!("Failed to send message")),
        }
    }

    let deadline = (args.timeout > 0.0)
        .then(|| Instant::now() + Duration::from_secs_f64(args.timeout));
    let stdout = std::io::stdout();
    let end = stream(rtt, deadline, &interrupt.flag, &mut stdout.lock());

    println!();
    println!("{}", "-".repeat(50));
    if let Ok(StreamEnd::Interrupted) = end {
        println!("Interrupted by user");
    }

    rtt.stop_rtt();
    handle.disconnect();
    end?;
    println!("Done.");
    Ok(())
}

/// Copy RTT terminal output to `out` until `deadline` passes or `stop` is set
///
/// A failed read ends the loop with an error.
fn stream(
    rtt: &mut dyn RttControl,
    deadline: Option<Instant>,
    stop: &AtomicBool,
    out: &mut impl Write,
) -> Result<StreamEnd, Box<dyn std::error::Error>> {
    loop {
        if stop.load(Ordering::Relaxed) {
            return Ok(StreamEnd::Interrupted);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Ok(StreamEnd::Timeout);
        }

        let data = rtt
            .rtt_read(READ_CHUNK)
            .ok_or_else(|| CoreError::Rtt("RTT read failed".into()))?;
        if !data.is_empty() {
            out.write_all(String::from_utf8_lossy(&data).as_bytes())?;
            out.flush()?;
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Expand backslash escapes in a message typed on the command line
///
/// Supports `\n \r \t \\ \0 \' \"` and `\xHH`. Unknown escapes are kept
/// as written.
fn decode_escapes(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('r') => out.push(b'\r'),
            Some('t') => out.push(b'\t'),
            Some('0') => out.push(0),
            Some('\\') => out.push(b'\\'),
            Some('\'') => out.push(b'\''),
            Some('"') => out.push(b'"'),
            Some('x') => {
                let hex: String = (0..2)
                    .filter_map(|_| chars.next_if(char::is_ascii_hexdigit))
                    .collect();
                match u8::from_str_radix(&hex, 16) {
                    Ok(b) if hex.len() == 2 => out.push(b),
                    _ => {
                        out.extend_from_slice(b"\\x");
                        out.extend_from_slice(hex.as_bytes());
                    }
                }
            }
            Some(other) => {
                out.push(b'\\');
                let mut buf = [0u8; 4];
                out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => out.push(b'\\'),
        }
    }
    out
}
