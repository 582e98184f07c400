//! Periodic background recording of externally supplied values
//!
//! Runs a repeating sampling task on a fixed interval, independent of the
//! main processing flow, appending one timestamped CSV row per tick.
//! Cancellation is cooperative: [`Recorder::stop`] signals the worker and
//! then joins it, so the in-flight write always completes before the call
//! returns and no partial record reaches disk. A failed write terminates
//! that iteration only and is surfaced, never retried.

use crate::error::{Error, Result};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::fs::File;
use std::path::Path;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::error;

/// Handle to a running background recorder
pub struct Recorder {
    stop_tx: Sender<()>,
    handle: JoinHandle<Result<()>>,
}

impl Recorder {
    /// Start recording to a CSV file.
    ///
    /// Writes a header of `time` plus the given column names, then one row
    /// per `interval` with values produced by `sample`. Fails immediately
    /// if the file cannot be created.
    pub fn start<P, F>(
        path: P,
        interval: Duration,
        columns: &[&str],
        mut sample: F,
    ) -> Result<Self>
    where
        P: AsRef<Path>,
        F: FnMut() -> Vec<String> + Send + 'static,
    {
        let file = File::create(path.as_ref())?;
        let mut writer = csv::Writer::from_writer(file);

        let mut header = vec!["time".to_string()];
        header.extend(columns.iter().map(|c| c.to_string()));
        writer
            .write_record(&header)
            .and_then(|_| writer.flush().map_err(Into::into))
            .map_err(|e| Error::Other(format!("Cannot write recorder header: {}", e)))?;

        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = std::thread::spawn(move || -> Result<()> {
            let mut first_error: Option<Error> = None;

            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let mut row = vec![chrono::Local::now()
                            .format("%Y-%m-%d %H:%M:%S")
                            .to_string()];
                        row.extend(sample());

                        let written = writer
                            .write_record(&row)
                            .and_then(|_| writer.flush().map_err(Into::into));
                        if let Err(e) = written {
                            error!("recorder write failed: {}", e);
                            if first_error.is_none() {
                                first_error =
                                    Some(Error::Other(format!("Recorder write failed: {}", e)));
                            }
                        }
                    }
                    // Stop requested or handle dropped; the current iteration
                    // has fully finished its write by this point.
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            match first_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        });

        Ok(Self { stop_tx, handle })
    }

    /// Request a stop and wait for the worker to finish.
    ///
    /// Blocks until any in-flight write has completed. Returns the first
    /// write error encountered during recording, if any.
    pub fn stop(self) -> Result<()> {
        let _ = self.stop_tx.send(());
        self.handle
            .join()
            .map_err(|_| Error::Other("Recorder thread panicked".to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_records_complete_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vitals.csv");

        let counter = Arc::new(AtomicUsize::new(0));
        let sampler = {
            let counter = Arc::clone(&counter);
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                vec![n.to_string(), "36.8".to_string()]
            }
        };

        let recorder = Recorder::start(
            &path,
            Duration::from_millis(10),
            &["tick", "temperature"],
            sampler,
        )
        .unwrap();

        std::thread::sleep(Duration::from_millis(80));
        recorder.stop().unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(
            reader.headers().unwrap().iter().collect::<Vec<_>>(),
            vec!["time", "tick", "temperature"]
        );

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert!(!rows.is_empty());
        for row in &rows {
            // Every persisted row is complete, including the last one.
            assert_eq!(row.len(), 3);
            assert_eq!(&row[2], "36.8");
        }
    }

    #[test]
    fn test_start_fails_on_bad_path() {
        let result = Recorder::start(
            "/nonexistent-dir/vitals.csv",
            Duration::from_millis(10),
            &["tick"],
            || vec!["0".to_string()],
        );
        assert!(result.is_err());
    }
}
