//! Input reader
//!
//! Concatenates one or more inputs (files or stdin) into a single stream
//! of raw lines. Every named file is opened before any line is read, so a
//! missing file fails the run before indexing starts.

use crate::storage::{StorageError, StorageResult};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Name used for standard input in logs
pub const STDIN_NAME: &str = "<stdin>";

/// A single opened input
struct InputSource {
    name: String,
    reader: Box<dyn BufRead>,
}

/// Ordered set of opened inputs
pub struct InputSet {
    sources: Vec<InputSource>,
}

impl InputSet {
    /// Open all inputs in argument order
    ///
    /// An empty list, or the path `-`, reads standard input.
    pub fn open(paths: &[PathBuf]) -> StorageResult<Self> {
        if paths.is_empty() {
            return Ok(Self::stdin());
        }

        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            if path.as_os_str() == "-" {
                sources.push(stdin_source());
                continue;
            }
            sources.push(open_file(path)?);
        }

        Ok(Self { sources })
    }

    /// Read from standard input only
    pub fn stdin() -> Self {
        Self {
            sources: vec![stdin_source()],
        }
    }

    /// Wrap an in-memory or already-open reader
    pub fn from_reader(name: impl Into<String>, reader: impl BufRead + 'static) -> Self {
        Self {
            sources: vec![InputSource {
                name: name.into(),
                reader: Box::new(reader),
            }],
        }
    }

    /// Append another reader after the existing inputs
    pub fn chain(mut self, name: impl Into<String>, reader: impl BufRead + 'static) -> Self {
        self.sources.push(InputSource {
            name: name.into(),
            reader: Box::new(reader),
        });
        self
    }

    /// Number of inputs
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Feed every line, terminator included, to `visit`
    ///
    /// Stops at the first error returned by `visit`. Returns the number of
    /// lines read.
    pub fn for_each_line<F>(self, mut visit: F) -> StorageResult<u64>
    where
        F: FnMut(&[u8]) -> StorageResult<()>,
    {
        let mut total = 0u64;
        let mut buf = Vec::with_capacity(128);

        for mut source in self.sources {
            let mut lines = 0u64;
            loop {
                buf.clear();
                if source.reader.read_until(b'\n', &mut buf)? == 0 {
                    break;
                }
                lines += 1;
                visit(&buf)?;
            }

            tracing::debug!("Read {} lines from {}", lines, source.name);
            total += lines;
        }

        Ok(total)
    }
}

fn stdin_source() -> InputSource {
    InputSource {
        name: STDIN_NAME.to_string(),
        reader: Box::new(BufReader::new(std::io::stdin())),
    }
}

fn open_file(path: &Path) -> StorageResult<InputSource> {
    let file = File::open(path).map_err(|source| StorageError::InputOpen {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!("Opened input {:?}", path);

    Ok(InputSource {
        name: path.display().to_string(),
        reader: Box::new(BufReader::new(file)),
    })
}
