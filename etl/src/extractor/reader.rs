use serde::de::DeserializeOwned;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::marker::PhantomData;
use std::path::PathBuf;
use tracing::debug;

use crate::error::{ErrorKind, EtlResult};
use crate::extractor::base::Extractor;
use crate::metrics::EtlMetrics;
use crate::{bail, etl_error};

/// Reader factory used by [`ReaderExtractor::from_path`].
pub type FileOpener = Box<dyn FnMut() -> io::Result<BufReader<File>> + Send>;

/// An [`Extractor`] that reads one JSON document per line.
///
/// The reader is only created on [`Extractor::open`], through the factory given at
/// construction, and dropped on [`Extractor::close`]. Blank lines are skipped. Failing to open,
/// read or parse the source ends extraction with [`ErrorKind::BackingFailure`].
pub struct ReaderExtractor<T, R, F> {
    open_reader: F,
    lines: Option<Lines<R>>,
    line_number: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T, R, F> ReaderExtractor<T, R, F>
where
    T: DeserializeOwned,
    R: BufRead,
    F: FnMut() -> io::Result<R>,
{
    pub fn new(open_reader: F) -> Self {
        Self {
            open_reader,
            lines: None,
            line_number: 0,
            _marker: PhantomData,
        }
    }
}

impl<T> ReaderExtractor<T, BufReader<File>, FileOpener>
where
    T: DeserializeOwned,
{
    /// Reads JSON lines from the file at `path`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let opener: FileOpener = Box::new(move || File::open(&path).map(BufReader::new));

        ReaderExtractor::new(opener)
    }
}

impl<T, R, F> Extractor<T> for ReaderExtractor<T, R, F>
where
    T: DeserializeOwned,
    R: BufRead,
    F: FnMut() -> io::Result<R>,
{
    fn open(&mut self, _metrics: &dyn EtlMetrics) -> EtlResult<()> {
        let reader = (self.open_reader)().map_err(|err| {
            etl_error!(
                ErrorKind::BackingFailure,
                "Failed to open the extractor source",
                err
            )
        })?;

        self.lines = Some(reader.lines());
        self.line_number = 0;

        Ok(())
    }

    fn next(&mut self) -> EtlResult<Option<T>> {
        let Some(lines) = self.lines.as_mut() else {
            bail!(
                ErrorKind::InvalidLifecycleUse,
                "Extractor was polled before being opened"
            );
        };

        loop {
            let line = match lines.next() {
                None => return Ok(None),
                Some(Ok(line)) => line,
                Some(Err(err)) => bail!(
                    ErrorKind::BackingFailure,
                    "Failed to read from the extractor source",
                    format!("after line {}: {err}", self.line_number)
                ),
            };
            self.line_number += 1;

            if line.trim().is_empty() {
                continue;
            }

            let value = serde_json::from_str(&line).map_err(|err| {
                etl_error!(
                    ErrorKind::BackingFailure,
                    "Failed to parse a record from the extractor source",
                    format!("line {}: {err}", self.line_number)
                )
            })?;

            return Ok(Some(value));
        }
    }

    fn close(&mut self) -> EtlResult<()> {
        if self.lines.take().is_some() {
            debug!(lines = self.line_number, "closed reader extractor");
        }

        Ok(())
    }
}

impl<T, R, F> fmt::Debug for ReaderExtractor<T, R, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderExtractor")
            .field("open", &self.lines.is_some())
            .field("line_number", &self.line_number)
            .finish()
    }
}
