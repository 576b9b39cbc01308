use super::{
    builder::{ReaderError, RowReaderBuilder},
    config::HeaderMode,
    header::ColumnNames,
    parser,
    record::Row,
    source::{self, CsvSource, Dialect},
};
use csv::ByteRecord;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Restartable, row-at-a-time reader over a delimited text file.
///
/// The reader can be driven explicitly with [`rewind`](Self::rewind),
/// [`valid`](Self::valid), [`current`](Self::current) and [`key`](Self::key),
/// or through [`rows`](Self::rows), which rewinds and yields
/// `(ordinal, row)` pairs. Ordinals are 1-based file row numbers, so when a
/// header row is consumed the first data row is 2.
///
/// ```no_run
/// use csvrows::{HeaderMode, RowReader};
///
/// let mut reader = RowReader::new("people.csv", HeaderMode::Use)?;
/// for row in reader.rows() {
///     let (ordinal, row) = row?;
///     println!("{ordinal}: {:?}", row.get("Surname"));
/// }
/// # Ok::<(), csvrows::ReaderError>(())
/// ```
pub struct RowReader {
    path: PathBuf,
    dialect: Dialect,
    lossy: bool,
    header_mode: HeaderMode,
    derived: ColumnNames,
    custom: ColumnNames,
    stream: Option<CsvSource>,
    // Record read by `valid` and not yet handed out by `current`.
    pending: Option<Result<ByteRecord, ReaderError>>,
    ordinal: u64,
}

impl RowReader {
    /// Opens `path` with default options and the given header mode.
    pub fn new(path: impl AsRef<Path>, header_mode: HeaderMode) -> Result<Self, ReaderError> {
        RowReaderBuilder::new(path).header_mode(header_mode).build()
    }

    pub fn builder(path: impl AsRef<Path>) -> RowReaderBuilder {
        RowReaderBuilder::new(path)
    }

    pub(crate) fn open(
        path: PathBuf,
        dialect: Dialect,
        lossy: bool,
        header_mode: HeaderMode,
    ) -> Result<Self, ReaderError> {
        let mut reader = Self {
            path,
            dialect,
            lossy,
            header_mode,
            derived: ColumnNames::default(),
            custom: ColumnNames::default(),
            stream: None,
            pending: None,
            ordinal: 0,
        };
        reader.reopen()?;
        Ok(reader)
    }

    /// Switches header handling and restarts from the top of the file.
    ///
    /// Every mode change reopens the file and applies the new mode from
    /// scratch, so switching back to [`HeaderMode::None`] makes row 1 data
    /// again.
    ///
    /// If the file cannot be reopened the previous mode is kept, the error is
    /// returned and the reader is left closed until the next successful
    /// [`rewind`](Self::rewind).
    pub fn set_header_mode(&mut self, header_mode: HeaderMode) -> Result<(), ReaderError> {
        debug!(
            path = %self.path.display(),
            from = %self.header_mode,
            to = %header_mode,
            "changing header mode"
        );
        let previous = std::mem::replace(&mut self.header_mode, header_mode);
        if let Err(err) = self.reopen() {
            self.header_mode = previous;
            self.close();
            return Err(err);
        }
        Ok(())
    }

    /// Names columns explicitly, overriding any derived headers.
    ///
    /// Blank names fall back to `"Column k"`. An empty list clears the custom
    /// names. The read position is left alone.
    pub fn set_custom_headers<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<S> = names.into_iter().collect();
        self.custom = ColumnNames::resolve(&names);
    }

    pub fn clear_custom_headers(&mut self) {
        self.custom = ColumnNames::default();
    }

    /// Restarts traversal from the first row after any header.
    ///
    /// Safe to call at any point, including after the file was exhausted and
    /// closed.
    pub fn rewind(&mut self) -> Result<(), ReaderError> {
        self.reopen()
    }

    /// Whether another row is available.
    ///
    /// Reads one record ahead and keeps it for the next [`current`](Self::current).
    /// At end of input the file is closed.
    pub fn valid(&mut self) -> bool {
        if self.pending.is_some() {
            return true;
        }
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };

        let mut record = ByteRecord::new();
        match stream.read_byte_record(&mut record) {
            Ok(true) => {
                self.pending = Some(Ok(record));
                true
            }
            Ok(false) => {
                self.close();
                false
            }
            // A stream that can no longer be read is treated as finished.
            Err(err) if err.is_io_error() => {
                warn!(
                    path = %self.path.display(),
                    ordinal = self.ordinal,
                    error = %err,
                    "read failed during lookahead, ending traversal"
                );
                self.close();
                false
            }
            Err(err) => {
                self.pending = Some(Err(err.into()));
                true
            }
        }
    }

    /// Reads the next row, or `None` once the file is exhausted.
    pub fn current(&mut self) -> Result<Option<Row>, ReaderError> {
        let Some(record) = self.next_record()? else {
            return Ok(None);
        };
        self.ordinal += 1;

        let fields = parser::decode_fields(&record, self.lossy, self.ordinal)?;
        trace!(ordinal = self.ordinal, fields = fields.len(), "read row");
        Ok(Some(parser::build_row(self.column_names(), fields)))
    }

    /// Ordinal of the row last produced by [`current`](Self::current), 0 before any.
    #[inline]
    pub fn key(&self) -> u64 {
        self.ordinal
    }

    /// Rewinds and iterates over every `(ordinal, row)` pair from the first
    /// data row.
    pub fn rows(&mut self) -> Rows<'_> {
        Rows::new(self)
    }

    /// The names rows are currently keyed by: custom names when set, else
    /// derived ones, else `None` for positional output.
    pub fn column_names(&self) -> Option<&ColumnNames> {
        if !self.custom.is_empty() {
            Some(&self.custom)
        } else if !self.derived.is_empty() {
            Some(&self.derived)
        } else {
            None
        }
    }

    pub fn derived_headers(&self) -> &ColumnNames {
        &self.derived
    }

    pub fn custom_headers(&self) -> &ColumnNames {
        &self.custom
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header_mode(&self) -> HeaderMode {
        self.header_mode
    }

    pub fn delimiter(&self) -> u8 {
        self.dialect.delimiter
    }

    pub fn max_row_bytes(&self) -> usize {
        self.dialect.max_row_bytes
    }

    /// Whether the underlying file handle is open.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn reopen(&mut self) -> Result<(), ReaderError> {
        self.close();
        self.ordinal = 0;
        self.derived = ColumnNames::default();

        self.stream = Some(source::open(&self.path, self.dialect)?);
        debug!(
            path = %self.path.display(),
            header_mode = %self.header_mode,
            "opened source"
        );

        if self.header_mode.consumes_header_row() {
            self.consume_header_row()?;
        }
        Ok(())
    }

    fn consume_header_row(&mut self) -> Result<(), ReaderError> {
        let Some(record) = self.next_record()? else {
            debug!(path = %self.path.display(), "no header row, file is empty");
            return Ok(());
        };
        self.ordinal += 1;

        if self.header_mode.names_columns() {
            let cells = parser::decode_fields(&record, self.lossy, self.ordinal)?;
            self.derived = ColumnNames::resolve(&cells);
            debug!(
                path = %self.path.display(),
                columns = self.derived.len(),
                "derived column names from header row"
            );
        }
        Ok(())
    }

    fn next_record(&mut self) -> Result<Option<ByteRecord>, ReaderError> {
        if let Some(pending) = self.pending.take() {
            return pending.map(Some);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };

        let mut record = ByteRecord::new();
        if stream.read_byte_record(&mut record)? {
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }

    fn close(&mut self) {
        self.pending = None;
        if self.stream.take().is_some() {
            debug!(path = %self.path.display(), ordinal = self.ordinal, "closed source");
        }
    }
}

impl Drop for RowReader {
    #[inline]
    fn drop(&mut self) {
        self.close();
    }
}

/// `for row in &mut reader` is [`RowReader::rows`]: it rewinds first, so it
/// restarts any pass in progress through [`valid`](RowReader::valid) and
/// [`current`](RowReader::current).
impl<'a> IntoIterator for &'a mut RowReader {
    type Item = Result<(u64, Row), ReaderError>;
    type IntoIter = Rows<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows()
    }
}

/// Iterator over one full pass of a [`RowReader`].
///
/// Created by [`RowReader::rows`]. A failed rewind is yielded once as the
/// first item.
pub struct Rows<'a> {
    reader: &'a mut RowReader,
    failed: Option<ReaderError>,
    done: bool,
}

impl<'a> Rows<'a> {
    fn new(reader: &'a mut RowReader) -> Self {
        let failed = reader.rewind().err();
        Self {
            reader,
            failed,
            done: false,
        }
    }
}

impl Iterator for Rows<'_> {
    type Item = Result<(u64, Row), ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(err) = self.failed.take() {
            self.done = true;
            return Some(Err(err));
        }
        if !self.reader.valid() {
            self.done = true;
            return None;
        }

        match self.reader.current() {
            Ok(Some(row)) => Some(Ok((self.reader.key(), row))),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => Some(Err(err)),
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        // We can't know the exact size without reading the whole file
        (0, None)
    }
}
