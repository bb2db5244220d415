//! Session log: one file per run in the OS data directory, truncated at
//! start-up so it only ever holds the latest session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\MiniPaint\minipaint.log`
//!   Linux:    `$XDG_DATA_HOME/MiniPaint/minipaint.log` (default `~/.local/share`)
//!   macOS:    `~/Library/Application Support/MiniPaint/minipaint.log`
//!
//! Use the `log_info!` / `log_warn!` / `log_err!` macros anywhere in the
//! crate.  Before `init()` every write is dropped, so the engine works as a
//! plain library (and in tests) without a log file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
/// Mirror every line to stderr (`--verbose`).
static ECHO_STDERR: AtomicBool = AtomicBool::new(false);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Panic,
}

impl Level {
    pub fn tag(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Panic => "PANIC",
        }
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Error, &format!($($arg)*))
    };
}

pub fn set_echo_stderr(on: bool) {
    ECHO_STDERR.store(on, Ordering::Relaxed);
}

/// Append a tagged, timestamped line.  I/O errors are swallowed; logging
/// never fails the caller.
pub fn write(level: Level, msg: &str) {
    let line = format_line(unix_secs(), level, msg);
    if ECHO_STDERR.load(Ordering::Relaxed) {
        eprintln!("{}", line);
    }
    write_raw(&line);
}

fn write_raw(line: &str) {
    if let Some(mutex) = LOG_FILE.get()
        && let Ok(mut file) = mutex.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
}

/// `[HH:MM:SS] [LEVEL] message`, with the clock taken modulo one day (UTC).
fn format_line(unix_secs: Option<u64>, level: Level, msg: &str) -> String {
    let clock = match unix_secs {
        Some(secs) => format!(
            "{:02}:{:02}:{:02}",
            (secs % 86_400) / 3_600,
            (secs % 3_600) / 60,
            secs % 60
        ),
        None => "??:??:??".to_string(),
    };
    format!("[{}] [{}] {}", clock, level.tag(), msg)
}

fn unix_secs() -> Option<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}

/// Open the log at its platform location.
pub fn init() {
    match default_log_path() {
        Some(path) => init_at(path),
        None => eprintln!("[logger] no data directory; session log disabled"),
    }
}

/// Open (truncating) the log at `path` and install a panic hook that copies
/// panic messages into it.  Only the first call has any effect.
pub fn init_at(path: PathBuf) {
    if LOG_FILE.get().is_some() {
        return;
    }
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = match OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path)
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            return;
        }
    };
    let _ = LOG_FILE.set(Mutex::new(file));

    let started = unix_secs().map_or_else(|| "unknown time".to_string(), |s| format!("unix {}", s));
    write_raw(&format!("=== MiniPaint session started ({}) ===", started));
    write_raw(&format!("Log file: {}", path.display()));

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write_raw(&format_line(unix_secs(), Level::Panic, &info.to_string()));
        prev(info);
    }));
}

fn default_log_path() -> Option<PathBuf> {
    Some(data_dir()?.join("MiniPaint").join("minipaint.log"))
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return Some(PathBuf::from(appdata));
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return Some(PathBuf::from(home).join("Library").join("Application Support"));
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return Some(PathBuf::from(xdg));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local").join("share"))
}
