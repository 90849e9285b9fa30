//! Row decoding against a derived column layout.

use crate::error::DecodeError;
use crate::table::layout::{ColumnLayout, LayoutOptions};
use serde::{Deserialize, Serialize};

/// One table row: trimmed fields in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    /// Creates a record from its fields.
    #[must_use]
    pub const fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Returns the fields.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Returns the field at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Returns the number of fields.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns whether the record has no fields.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns whether every field is empty.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(String::is_empty)
    }

    /// Consumes the record, returning its fields.
    #[must_use]
    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }
}

impl From<Vec<String>> for Record {
    fn from(fields: Vec<String>) -> Self {
        Self::new(fields)
    }
}

impl FromIterator<String> for Record {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Lazy iterator of records over body lines.
///
/// Separator and border lines are skipped; every other line, including
/// the column-name row and blank lines, yields one record.
#[derive(Debug, Clone)]
pub struct Records<'a, I> {
    layout: &'a ColumnLayout,
    options: &'a LayoutOptions,
    lines: I,
}

impl<'l, I> Iterator for Records<'_, I>
where
    I: Iterator<Item = &'l str>,
{
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            if !self.options.is_border(line) {
                return Some(self.layout.slice(line));
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.lines.size_hint().1)
    }
}

/// Decodes `lines` with `layout`.
///
/// Each call starts a fresh pass; no state is kept between calls.
pub fn decode<'a, 'l, I>(
    layout: &'a ColumnLayout,
    options: &'a LayoutOptions,
    lines: I,
) -> Records<'a, I::IntoIter>
where
    I: IntoIterator<Item = &'l str>,
{
    Records {
        layout,
        options,
        lines: lines.into_iter(),
    }
}

/// Derives the layout from the leading lines of `text` and decodes all of
/// its lines.
///
/// # Errors
///
/// Returns [`DecodeError::NoSeparatorFound`] rather than guessing a layout
/// when no separator is sampled.
pub fn decode_table(text: &str, options: &LayoutOptions) -> Result<Vec<Record>, DecodeError> {
    let layout = ColumnLayout::derive(text.lines(), options)?;
    Ok(decode(&layout, options, text.lines()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::layout::{TableFamily, TrailingColumn};

    fn unity() -> LayoutOptions {
        LayoutOptions::for_family(TableFamily::Unity)
    }

    #[test]
    fn test_decode_scenario_double_space() {
        let layout = ColumnLayout::from_separator("----  -------", "  ", TrailingColumn::Always);
        let records: Vec<Record> = decode(&layout, &unity(), ["abc   def123"]).collect();
        assert_eq!(records, vec![Record::from(vec!["abc".to_string(), "def123".to_string()])]);
    }

    #[test]
    fn test_decode_skips_separator_lines() {
        let text = "alias  name\n-----  -----\njdoe   John\n-----  -----\namy    Anne";
        let records = decode_table(text, &unity()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].fields(), &["alias", "name"]);
        assert_eq!(records[1].fields(), &["jdoe", "John"]);
        assert_eq!(records[2].fields(), &["amy", "Anne"]);
    }

    #[test]
    fn test_decode_keeps_rows_starting_with_marker() {
        let text = "delta  alias\n-----  -----\n-5     jdoe\n10     amy";
        let records = decode_table(text, &unity()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].fields(), &["-5", "jdoe"]);
        assert_eq!(records[2].fields(), &["10", "amy"]);
    }

    #[test]
    fn test_decode_call_manager_output() {
        let text = "\
pkid                                 name        \r
==================================== =========== \r
7a3a1f0e-8b4c-4a4f-9e2e-4c4f1a2b3c4d SEP00112233 \r
9b8c7d6e-1a2b-3c4d-5e6f-7a8b9c0d1e2f CSFJDOE     ";
        let options = LayoutOptions::for_family(TableFamily::CallManager);
        let records = decode_table(text, &options).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].fields(), &["pkid", "name"]);
        assert_eq!(
            records[1].fields(),
            &["7a3a1f0e-8b4c-4a4f-9e2e-4c4f1a2b3c4d", "SEP00112233"]
        );
        assert_eq!(records[2].get(1), Some("CSFJDOE"));
    }

    #[test]
    fn test_decode_keeps_blank_lines() {
        let layout = ColumnLayout::from_separator("---  ---", "  ", TrailingColumn::Always);
        let records: Vec<Record> = decode(&layout, &unity(), ["a    b", "", "c"]).collect();
        assert_eq!(records.len(), 3);
        assert!(records[1].is_blank());
        assert_eq!(records[2].fields(), &["c", ""]);
    }

    #[test]
    fn test_decode_is_restartable() {
        let layout = ColumnLayout::from_separator("---", "  ", TrailingColumn::Always);
        let options = unity();
        let lines = vec!["one", "two"];
        let first: Vec<Record> = decode(&layout, &options, lines.iter().copied()).collect();
        let second: Vec<Record> = decode(&layout, &options, lines.iter().copied()).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_decode_table_without_separator() {
        let text = "Executing command... Please be patient\nerror";
        let err = decode_table(text, &unity()).unwrap_err();
        assert!(matches!(err, DecodeError::NoSeparatorFound { scanned: 2 }));
    }

    #[test]
    fn test_record_accessors() {
        let record: Record = ["a", ""].into_iter().map(String::from).collect();
        assert_eq!(record.len(), 2);
        assert!(!record.is_empty());
        assert!(!record.is_blank());
        assert_eq!(record.get(2), None);
        assert_eq!(record.into_fields(), vec!["a".to_string(), String::new()]);
    }

    #[test]
    fn test_record_serializes_as_array() {
        let record = Record::from(vec!["x".to_string(), "y".to_string()]);
        assert_eq!(serde_json::to_string(&record).unwrap(), r#"["x","y"]"#);
    }
}
