//! Console + transcript logging.
//!
//! Everything goes through `tracing`. Two layers are installed: the
//! console (stderr) and a per-run transcript file. The transcript
//! discards output until [`Transcript::open`] is called, so a run
//! that fails its preconditions leaves no log file behind.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::DeployResult;

/// Late-bound log file sink.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    file: Arc<Mutex<Option<File>>>,
}

impl Transcript {
    /// Create `dir/deploy-<timestamp>.log` and start writing to it.
    pub fn open(&self, dir: &Path) -> DeployResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let path = dir.join(format!("deploy-{stamp}.log"));
        let file = File::options().create(true).append(true).open(&path)?;

        let mut slot = self
            .file
            .lock()
            .map_err(|_| io::Error::other("transcript lock poisoned"))?;
        *slot = Some(file);
        Ok(path)
    }
}

pub struct TranscriptWriter {
    file: Arc<Mutex<Option<File>>>,
}

impl Write for TranscriptWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut slot = self
            .file
            .lock()
            .map_err(|_| io::Error::other("transcript lock poisoned"))?;
        match slot.as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut slot = self
            .file
            .lock()
            .map_err(|_| io::Error::other("transcript lock poisoned"))?;
        slot.as_mut().map_or(Ok(()), File::flush)
    }
}

impl<'a> MakeWriter<'a> for Transcript {
    type Writer = TranscriptWriter;

    fn make_writer(&'a self) -> Self::Writer {
        TranscriptWriter {
            file: Arc::clone(&self.file),
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the console
/// level; the transcript always records debug and above.
pub fn init(verbose: bool) -> Transcript {
    let transcript = Transcript::default();

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(console_filter);

    let file = fmt::layer()
        .with_writer(transcript.clone())
        .with_ansi(false)
        .with_target(false)
        .with_filter(LevelFilter::DEBUG);

    if tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .is_err()
    {
        tracing::debug!("global subscriber already installed");
    }

    transcript
}
