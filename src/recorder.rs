//! Offline export: capture through the substrate, then encode.
//!
//! An export is a capture session plus an encoding pass. Bounded exports
//! (`duration` set) capture without real-time pacing and return as soon as
//! encoding finishes. Unbounded exports run until a [`RecorderStop`] handle
//! fires. Decoding, resampling and encoding are compute-bound and run on the
//! blocking pool.

use crate::error::{Error, Result};
use divisi_core::{SampleBuffer, Substrate};
use divisi_export::ExportOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Notify;

pub struct Recorder {
    substrate: Arc<dyn Substrate>,
    stop: Arc<Notify>,
}

/// Finishes an unbounded export. Cheap to clone; firing it before the
/// export reaches its wait point is safe (the signal is retained).
#[derive(Clone)]
pub struct RecorderStop {
    notify: Arc<Notify>,
}

impl RecorderStop {
    pub fn stop(&self) {
        self.notify.notify_one();
    }
}

impl Recorder {
    pub(crate) fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self {
            substrate,
            stop: Arc::new(Notify::new()),
        }
    }

    /// Handle that ends an unbounded export.
    pub fn stop_handle(&self) -> RecorderStop {
        RecorderStop {
            notify: Arc::clone(&self.stop),
        }
    }

    /// Run an export and return the encoded bytes.
    pub async fn export(&self, options: &ExportOptions) -> Result<Vec<u8>> {
        let buffer = self.capture(options).await?;
        let options = options.clone();
        run_blocking(move || Ok(divisi_export::encode(&buffer, &options)?)).await
    }

    /// Run an export, writing the encoded file to `path`.
    pub async fn export_to_file(&self, options: &ExportOptions, path: &Path) -> Result<()> {
        let buffer = self.capture(options).await?;
        let options = options.clone();
        let path = PathBuf::from(path);
        run_blocking(move || Ok(divisi_export::encode_to_file(&buffer, &options, &path)?)).await
    }

    /// Capture per `options.duration` and decode the blob.
    async fn capture(&self, options: &ExportOptions) -> Result<SampleBuffer> {
        let mut session = self.substrate.open_capture(None)?;
        match options.duration {
            Some(secs) => {
                log::debug!("bounded export capture: {secs}s");
                session.run_for(secs)?;
            }
            None => {
                log::debug!("unbounded export capture: waiting for stop");
                session.start()?;
                self.stop.notified().await;
            }
        }
        let blob = session.stop()?;
        let substrate = Arc::clone(&self.substrate);
        run_blocking(move || Ok(substrate.decode(&blob)?)).await
    }
}

pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::ExportTask(e.to_string()))?
}
