use super::builder::ReaderError;
use csv::ByteRecord;
use flate2::read::MultiGzDecoder;
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Read},
    path::Path,
};

pub(crate) const READ_BUFFER_SIZE: usize = 16384;

// Capacity handed to the per-record field splitter. Its input is already in
// memory, so this only sizes the copy buffer.
const SPLIT_BUFFER_SIZE: usize = 1024;

/// Record-splitting settings.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Dialect {
    pub delimiter: u8,
    pub quote_char: u8,
    pub trim: csv::Trim,
    /// Cap on the bytes read per record, terminator excluded. 0 = unbounded.
    pub max_row_bytes: usize,
}

/// Where the record scanner is within the current record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

impl Scan {
    /// Moves past `byte`, or returns `None` when it terminates the record.
    fn step(self, byte: u8, delimiter: u8, quote: u8) -> Option<Self> {
        match self {
            Self::Quoted if byte == quote => Some(Self::QuoteInQuoted),
            Self::Quoted => Some(Self::Quoted),
            _ if byte == b'\n' || byte == b'\r' => None,
            _ if byte == delimiter => Some(Self::FieldStart),
            Self::FieldStart if byte == quote => Some(Self::Quoted),
            // `""` inside a quoted field is an escaped quote.
            Self::QuoteInQuoted if byte == quote => Some(Self::Quoted),
            _ => Some(Self::Unquoted),
        }
    }
}

/// An open view of the source file that hands out one record per physical
/// row.
///
/// Record boundaries are found here so that blank lines come back as a
/// single empty field and the byte cap bounds what is read. Splitting a
/// record into fields (quoting, escapes, trimming) is left to the `csv`
/// crate. Line terminators are `\n`, `\r\n` or a bare `\r`; terminators
/// inside quoted fields belong to the field.
pub(crate) struct CsvSource {
    input: BufReader<Box<dyn Read + Send>>,
    splitter: csv::ReaderBuilder,
    dialect: Dialect,
    chunk: Vec<u8>,
    // Bytes of a character cut by the cap, replayed at the start of the
    // next record.
    carry: Vec<u8>,
    // The previous record ended on `\r`, so a leading `\n` is part of it.
    after_cr: bool,
}

impl CsvSource {
    fn new(readable: Box<dyn Read + Send>, dialect: Dialect) -> Self {
        let mut splitter = csv::ReaderBuilder::new();
        splitter
            .has_headers(false)
            .flexible(true)
            .delimiter(dialect.delimiter)
            .quote(dialect.quote_char)
            .trim(dialect.trim)
            .buffer_capacity(SPLIT_BUFFER_SIZE);

        Self {
            input: BufReader::with_capacity(READ_BUFFER_SIZE, readable),
            splitter,
            dialect,
            chunk: Vec::new(),
            carry: Vec::new(),
            after_cr: false,
        }
    }

    /// Reads the next record into `record`. Returns `Ok(false)` at end of
    /// input. A blank line yields one empty field.
    pub(crate) fn read_byte_record(&mut self, record: &mut ByteRecord) -> csv::Result<bool> {
        if !self.next_chunk()? {
            return Ok(false);
        }
        record.clear();
        if !self.chunk.is_empty() {
            let mut fields = self.splitter.from_reader(self.chunk.as_slice());
            if fields.read_byte_record(record)? {
                return Ok(true);
            }
        }
        record.push_field(b"");
        Ok(true)
    }

    /// Fills `chunk` with the bytes of the next record, terminator excluded.
    /// Returns `Ok(false)` once the input is exhausted.
    fn next_chunk(&mut self) -> io::Result<bool> {
        self.chunk.clear();
        self.chunk.append(&mut self.carry);
        let limit = self.dialect.max_row_bytes;
        let (delimiter, quote) = (self.dialect.delimiter, self.dialect.quote_char);
        let mut state = if self.chunk.is_empty() {
            Scan::FieldStart
        } else {
            Scan::Unquoted
        };

        loop {
            let room = match limit {
                0 => usize::MAX,
                limit => limit.saturating_sub(self.chunk.len()),
            };
            let buf = self.input.fill_buf()?;
            if buf.is_empty() {
                return Ok(!self.chunk.is_empty());
            }
            if std::mem::take(&mut self.after_cr) && buf[0] == b'\n' {
                self.input.consume(1);
                continue;
            }

            if room == 0 {
                let next = buf[0];
                match next {
                    // The record ends exactly at the cap.
                    b'\n' => self.input.consume(1),
                    b'\r' => {
                        self.input.consume(1);
                        self.after_cr = true;
                    }
                    _ => {
                        if let Some(start) = split_char_start(&self.chunk, next) {
                            self.carry = self.chunk.split_off(start);
                        }
                    }
                }
                return Ok(true);
            }

            let window = buf.len().min(room);
            let mut consumed = 0;
            let mut terminator = None;
            for &byte in &buf[..window] {
                consumed += 1;
                match state.step(byte, delimiter, quote) {
                    Some(next) => state = next,
                    None => {
                        terminator = Some(byte);
                        break;
                    }
                }
            }

            let body = if terminator.is_some() {
                consumed - 1
            } else {
                consumed
            };
            self.chunk.extend_from_slice(&buf[..body]);
            self.input.consume(consumed);

            if let Some(byte) = terminator {
                self.after_cr = byte == b'\r';
                return Ok(true);
            }
        }
    }
}

/// Start of the UTF-8 sequence that `chunk` ends inside of, when `next`
/// continues it and the chunk holds something before it.
fn split_char_start(chunk: &[u8], next: u8) -> Option<usize> {
    let is_continuation = |byte: u8| byte & 0xC0 == 0x80;
    if !is_continuation(next) {
        return None;
    }
    (chunk.len().saturating_sub(3)..chunk.len())
        .rev()
        .find(|&i| chunk[i] & 0xC0 == 0xC0)
        .filter(|&i| i > 0 && chunk[i + 1..].iter().all(|&byte| is_continuation(byte)))
}

/// Fails unless `path` names an existing regular file.
pub(crate) fn check_path(path: &Path) -> Result<(), ReaderError> {
    let metadata = std::fs::metadata(path).map_err(|e| ReaderError::from_open(path, e))?;
    if !metadata.is_file() {
        return Err(ReaderError::NotAFile(path.to_path_buf()));
    }
    Ok(())
}

/// Opens `path` from the beginning. Files ending in `.gz` are decompressed.
///
/// Row 1 is never treated as a header here; header handling belongs to the
/// row reader. Records may have any number of fields.
pub(crate) fn open(path: &Path, dialect: Dialect) -> Result<CsvSource, ReaderError> {
    let file = File::open(path).map_err(|e| ReaderError::from_open(path, e))?;

    let readable: Box<dyn Read + Send> = if is_gzip(path) {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(CsvSource::new(readable, dialect))
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialect(max_row_bytes: usize) -> Dialect {
        Dialect {
            delimiter: b',',
            quote_char: b'"',
            trim: csv::Trim::None,
            max_row_bytes,
        }
    }

    fn records(input: &'static [u8], max_row_bytes: usize) -> Vec<Vec<Vec<u8>>> {
        let mut source = CsvSource::new(Box::new(input), dialect(max_row_bytes));
        let mut record = ByteRecord::new();
        let mut out = Vec::new();
        while source.read_byte_record(&mut record).unwrap() {
            out.push(record.iter().map(<[u8]>::to_vec).collect());
        }
        out
    }

    fn rows(values: &[&[&str]]) -> Vec<Vec<Vec<u8>>> {
        values
            .iter()
            .map(|row| row.iter().map(|field| field.as_bytes().to_vec()).collect())
            .collect()
    }

    #[test]
    fn blank_lines_are_single_empty_fields() {
        assert_eq!(
            records(b"\na\n\n\nb\n\n", 0),
            rows(&[&[""], &["a"], &[""], &[""], &["b"], &[""]])
        );
        assert_eq!(
            records(b"a\r\n\r\nb\r\n", 0),
            rows(&[&["a"], &[""], &["b"]])
        );
        assert_eq!(records(b"a\r\rb", 0), rows(&[&["a"], &[""], &["b"]]));
    }

    #[test]
    fn quoted_terminators_stay_in_the_field() {
        assert_eq!(
            records(b"\"one\ntwo\",x\n\"say \"\"hi\"\"\r\n\"\nlast", 0),
            rows(&[&["one\ntwo", "x"], &["say \"hi\"\r\n"], &["last"]])
        );
    }

    #[test]
    fn mid_field_quotes_are_literal() {
        assert_eq!(
            records(b"a\"b,c\nd\n", 0),
            rows(&[&["a\"b", "c"], &["d"]])
        );
    }

    #[test]
    fn cap_returns_the_overflow_as_following_records() {
        assert_eq!(
            records(b"abcdefghij\nxy\n", 4),
            rows(&[&["abcd"], &["efgh"], &["ij"], &["xy"]])
        );
    }

    #[test]
    fn record_ending_at_the_cap_keeps_its_terminator() {
        assert_eq!(
            records(b"abcd\nefgh\r\nij", 4),
            rows(&[&["abcd"], &["efgh"], &["ij"]])
        );
    }

    #[test]
    fn cap_never_splits_a_character() {
        assert_eq!(
            records("aé\nxyz\n".as_bytes(), 2),
            rows(&[&["a"], &["é"], &["xy"], &["z"]])
        );
    }

    #[test]
    fn detects_gzip_extension() {
        assert!(is_gzip(Path::new("rows.csv.gz")));
        assert!(is_gzip(Path::new("ROWS.CSV.GZ")));
        assert!(!is_gzip(Path::new("rows.csv")));
        assert!(!is_gzip(Path::new("gz")));
    }

    #[test]
    fn directories_are_not_sources() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_path(dir.path()).unwrap_err();
        assert!(matches!(err, ReaderError::NotAFile(_)));
    }

    #[test]
    fn missing_files_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_path(&dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, ReaderError::FileNotFound(_)));
    }
}
