use super::{
    builder::ReaderError,
    header::ColumnNames,
    record::{NamedRow, Row},
};
use csv::ByteRecord;
use std::borrow::Cow;

/// Builds the row for `fields`, keyed by `names` when a naming source is active.
pub(crate) fn build_row(names: Option<&ColumnNames>, fields: Vec<String>) -> Row {
    match names {
        Some(names) => Row::Named(NamedRow::from_fields(names, fields)),
        None => Row::Positional(fields),
    }
}

/// Decodes a raw record into owned fields. Invalid UTF-8 fails the row
/// unless `lossy` is set, in which case it is replaced.
pub(crate) fn decode_fields(
    record: &ByteRecord,
    lossy: bool,
    ordinal: u64,
) -> Result<Vec<String>, ReaderError> {
    let mut fields = Vec::with_capacity(record.len());
    for field in record.iter() {
        let field = if lossy {
            String::from_utf8_lossy(field)
        } else {
            Cow::Borrowed(
                std::str::from_utf8(field).map_err(|_| ReaderError::InvalidUtf8 { ordinal })?,
            )
        };
        fields.push(field.into_owned());
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn positional_without_names() {
        let row = build_row(None, strings(&["a", "b"]));
        assert_eq!(row.as_positional(), Some(&strings(&["a", "b"])[..]));
    }

    #[test]
    fn named_with_names() {
        let names = ColumnNames::resolve(&["x"]);
        let row = build_row(Some(&names), strings(&["1"]));
        assert_eq!(row.get("x"), Some("1"));
    }

    #[test]
    fn strict_decoding_rejects_invalid_utf8() {
        let record = ByteRecord::from(vec![&b"ok"[..], &b"\xff"[..]]);
        let err = decode_fields(&record, false, 7).unwrap_err();
        assert!(matches!(err, ReaderError::InvalidUtf8 { ordinal: 7 }));
    }

    #[test]
    fn lossy_decoding_replaces_invalid_utf8() {
        let record = ByteRecord::from(vec![&b"ok"[..], &b"\xff"[..]]);
        let fields = decode_fields(&record, true, 1).unwrap();
        assert_eq!(fields, vec!["ok".to_string(), "\u{FFFD}".to_string()]);
    }
}
