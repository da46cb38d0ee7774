//! Session management
//!
//! A session is one execution of an executable. It owns a timestamped
//! directory holding the log file and any data archived during the run (for
//! example the consign curves of each movement), and defines the epoch that
//! all log timestamps are relative to.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use erased_serde::Serialize;
use log::{info, warn};
use std::ffi::OsStr;
use std::fs;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

// Internal imports
use crate::time;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();
static SAVE_SENDER: OnceCell<Mutex<Sender<SaveRequest>>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A chrono format string which diplays a timestamp. See
/// https://docs.rs/chrono/0.4.11/chrono/format/strftime/index.html for more
/// information.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// How long the save thread waits for data before checking the stop flag.
const SAVE_POLL_PERIOD: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

type SaveRequest = (PathBuf, Box<dyn Serialize + Send>);

/// A struct storing information about the current session
pub struct Session {
    /// The root directory for this session
    pub session_root: PathBuf,

    /// The root directory for this session's archives
    pub arch_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,

    save_sender: Sender<SaveRequest>,

    save_stop: Arc<AtomicBool>,

    save_handle: Option<JoinHandle<()>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot find the software root directory: {0}")]
    SwRootNotFound(std::io::Error),

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error(
        "Cannot initialise the session epoch, have you already initialised the\
         session? (conquer_once error: {0})"
    )]
    CannotInitEpoch(conquer_once::TryInitError),

    #[error("Cannot get the epoch time, did you forget to initialise the session?")]
    CannotGetEpoch,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session within the given directory.
    ///
    /// This will create a new session directory named `{exec_name}_{timestamp}`
    /// inside `sessions_dir`, itself relative to the software root.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        // Set the session epoch
        SESSION_EPOCH
            .try_init_once(Utc::now)
            .map_err(SessionError::CannotInitEpoch)?;

        // Format the session epoch as a timestamp
        let timestamp = match SESSION_EPOCH.get() {
            Some(e) => e.format(TIMESTAMP_FORMAT),
            None => return Err(SessionError::CannotGetEpoch),
        };

        // Build the session path
        let mut path = crate::host::get_sw_root().map_err(SessionError::SwRootNotFound)?;
        path.push(sessions_dir);
        path.push(format!("{}_{}", exec_name, timestamp));

        // Create the session and archive directories
        let arch_path = path.join("arch");
        fs::create_dir_all(&arch_path).map_err(SessionError::CannotCreateDir)?;

        let log_file_path = path.join(format!("{}.log", exec_name));

        // Start the save thread, keeping a copy of the sender in the static so
        // that modules without access to the session can still archive data
        let (tx, rx) = channel();
        SAVE_SENDER.init_once(|| Mutex::new(tx.clone()));

        let save_stop = Arc::new(AtomicBool::new(false));
        let stop = save_stop.clone();
        let arch_root = arch_path.clone();
        let save_handle = thread::spawn(move || save_thread(stop, arch_root, rx));

        Ok(Session {
            session_root: path,
            arch_root: arch_path,
            log_file_path,
            save_sender: tx,
            save_stop,
            save_handle: Some(save_handle),
        })
    }

    /// Exit the session, waiting for the save thread to finish any pending actions
    pub fn exit(mut self) {
        self.save_stop.store(true, Ordering::Relaxed);

        info!("Stopping save thread");

        if let Some(handle) = self.save_handle.take() {
            if handle.join().is_err() {
                warn!("Save thread panicked before exiting");
            }
        }

        info!("Save thread exited");
    }

    /// Saves the given data to the given archive-relative path in a background thread.
    pub fn save<P: AsRef<Path>, T: serde::Serialize + Send + 'static>(&self, path: P, data: T) {
        if let Err(e) = self
            .save_sender
            .send((path.as_ref().to_path_buf(), Box::new(data)))
        {
            warn!(
                "Could not send data to be saved to path {:?}: {}",
                path.as_ref(),
                e
            )
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the number of seconds elapsed since the start of the session.
///
/// # Panics
/// - This function will panic if the session epoch has not been
///   initialised, which is performed on creating a new Session instance.
pub fn get_elapsed_seconds() -> f64 {
    match SESSION_EPOCH.get() {
        Some(e) => time::duration_to_seconds(Utc::now() - *e).unwrap_or(std::f64::NAN),
        None => panic!("Cannot get the session epoch!"),
    }
}

/// Return a reference to the session's epoch.
///
/// # Panics
/// - This function will panic if the session epoch has not been
///   initialised, which is performed on creating a new Session instance.
pub fn get_epoch() -> &'static DateTime<Utc> {
    match SESSION_EPOCH.get() {
        Some(e) => e,
        None => panic!("Cannot get the session epoch!"),
    }
}

/// Save the given data into the archive-relative path.
///
/// If no session has been started the data is dropped with a warning.
pub fn save<P: AsRef<Path>, T: serde::Serialize + Send + 'static>(path: P, data: T) {
    match SAVE_SENDER.get() {
        Some(m) => match m.lock() {
            Ok(s) => {
                if let Err(e) = s.send((path.as_ref().to_path_buf(), Box::new(data))) {
                    warn!(
                        "Couldn't send data to save thread for file {:?}: {}",
                        path.as_ref(),
                        e
                    )
                }
            }
            Err(_) => warn!("Couldn't get lock on save sender"),
        },
        None => warn!("Cannot save data as session is not initialised yet"),
    }
}

/// Saves the given data to the path, appending a timestamp before the path's extension
pub fn save_with_timestamp<P: AsRef<Path>, T: serde::Serialize + Send + 'static>(path: P, data: T) {
    save(timestamped_path(path.as_ref(), Utc::now()), data);
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Insert `_{timestamp}` between the file stem and the extension of `path`.
///
/// Milliseconds are included so that several movements started within the
/// same second don't overwrite each other.
fn timestamped_path(path: &Path, stamp: DateTime<Utc>) -> PathBuf {
    let stem = path.file_stem().unwrap_or(OsStr::new(""));

    let mut file_name = stem.to_os_string();
    file_name.push("_");
    file_name.push(stamp.format(TIMESTAMP_FORMAT).to_string());
    file_name.push(format!("_{:03}", stamp.timestamp_subsec_millis()));

    if let Some(ext) = path.extension() {
        file_name.push(".");
        file_name.push(ext);
    }

    path.with_file_name(file_name)
}

fn save_thread(stop: Arc<AtomicBool>, arch_root: PathBuf, receiver: Receiver<SaveRequest>) {
    loop {
        match receiver.recv_timeout(SAVE_POLL_PERIOD) {
            Ok((path, data)) => write_json(&arch_root.join(path), data),
            Err(RecvTimeoutError::Timeout) => {
                // Only stop once the queue has been drained
                if stop.load(Ordering::Relaxed) {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn write_json(full_path: &Path, data: Box<dyn Serialize + Send>) {
    match full_path.extension().and_then(|s| s.to_str()) {
        Some("json") => (),
        ext => {
            warn!(
                "Unrecognised file path extension for {:?} (got {:?})",
                full_path, ext
            );
            return;
        }
    }

    // Create the parent path if needed
    if let Some(parent) = full_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Couldn't create parent directory for {:?}: {}", full_path, e);
            return;
        }
    }

    let file = match OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .open(full_path)
    {
        Ok(f) => f,
        Err(e) => {
            warn!("Couldn't create file {:?}: {}", full_path, e);
            return;
        }
    };

    if let Err(e) = serde_json::to_writer_pretty(&file, &data) {
        warn!("Couldn't serialize data for file {:?}: {}", full_path, e);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamped_path() {
        let stamp = Utc.ymd(2021, 3, 4).and_hms_milli(5, 6, 7, 89);

        assert_eq!(
            timestamped_path(Path::new("traj_ctrl/robot_0.json"), stamp),
            PathBuf::from("traj_ctrl/robot_0_20210304_050607_089.json")
        );
        assert_eq!(
            timestamped_path(Path::new("dump"), stamp),
            PathBuf::from("dump_20210304_050607_089")
        );
    }
}
