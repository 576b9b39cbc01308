mod builder;
mod config;
mod header;
mod parser;
mod record;
mod record_reader;
mod source;

pub use builder::{ErrorKind, ReaderError, RowReaderBuilder};
pub use config::{HeaderMode, ReaderConfig};
pub use header::{fallback_name, ColumnNames};
pub use record::{NamedRow, Row};
pub use record_reader::{RowReader, Rows};
