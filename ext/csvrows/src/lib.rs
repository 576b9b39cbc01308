//! Restartable, row-at-a-time reading of delimited text files.
//!
//! A [`RowReader`] walks a file one row at a time without loading it into
//! memory. Row 1 can be data, a skipped header, or the source of column
//! names ([`HeaderMode`]). Rows come back positional or keyed by column name,
//! and a finished pass can be replayed with [`RowReader::rewind`] or another
//! call to [`RowReader::rows`].
//!
//! Rows end at `\n`, `\r\n` or a bare `\r` outside quotes, and a blank line
//! is a row holding one empty field. Splitting a row into fields (quoting,
//! escaping, trimming) is done by the [`csv`](https://docs.rs/csv) crate.
//! Files ending in `.gz` are decompressed on the fly.
//!
//! ```no_run
//! use csvrows::{HeaderMode, RowReader};
//!
//! let mut reader = RowReader::builder("people.tsv")
//!     .delimiter(b'\t')
//!     .header_mode(HeaderMode::Use)
//!     .build()?;
//!
//! for row in &mut reader {
//!     let (ordinal, row) = row?;
//!     println!("row {ordinal} has {} fields", row.len());
//! }
//! # Ok::<(), csvrows::ReaderError>(())
//! ```

mod csv;

pub use crate::csv::{
    fallback_name, ColumnNames, ErrorKind, HeaderMode, NamedRow, ReaderConfig, ReaderError, Row,
    RowReader, RowReaderBuilder, Rows,
};
pub use ::csv::Trim;
