//! Delimited-text rendering of decoded records.
//!
//! Rows are comma separated and terminated with `\r\n`. A field is quoted
//! when it contains a comma, a double quote, or a line break; embedded
//! quotes are doubled.

use crate::table::decode::Record;
use std::fmt::Write;

const DELIMITER: char = ',';
const QUOTE: char = '"';
const TERMINATOR: &str = "\r\n";

/// Renders records as CSV text.
#[must_use]
pub fn render_csv<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut output = String::new();
    for record in records {
        write_record(&mut output, record.fields());
    }
    output
}

fn write_record(output: &mut String, fields: &[String]) {
    // A lone empty field is quoted so the row is not read back as empty.
    if let [only] = fields
        && only.is_empty()
    {
        output.push_str("\"\"");
        output.push_str(TERMINATOR);
        return;
    }

    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            output.push(DELIMITER);
        }
        write_field(output, field);
    }
    output.push_str(TERMINATOR);
}

fn write_field(output: &mut String, field: &str) {
    let needs_quotes = field
        .chars()
        .any(|c| c == DELIMITER || c == QUOTE || c == '\r' || c == '\n');
    if needs_quotes {
        let _ = write!(output, "\"{}\"", field.replace(QUOTE, "\"\""));
    } else {
        output.push_str(field);
    }
}

/// Parses CSV text produced by [`render_csv`] back into records.
///
/// Accepts `\r\n` or `\n` terminators and quoted fields spanning lines.
#[must_use]
pub fn parse_csv(text: &str) -> Vec<Record> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut row_started = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == QUOTE {
                if chars.peek() == Some(&QUOTE) {
                    chars.next();
                    field.push(QUOTE);
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            QUOTE => {
                in_quotes = true;
                row_started = true;
            }
            DELIMITER => {
                fields.push(std::mem::take(&mut field));
                row_started = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                if row_started || !field.is_empty() {
                    fields.push(std::mem::take(&mut field));
                }
                records.push(Record::new(std::mem::take(&mut fields)));
                row_started = false;
            }
            _ => {
                field.push(c);
                row_started = true;
            }
        }
    }

    if row_started || !field.is_empty() {
        fields.push(field);
        records.push(Record::new(fields));
    }

    records
}

/// Renders records as an aligned plain-text table.
///
/// The first record is treated as the header and underlined.
#[must_use]
pub fn render_text(records: &[Record]) -> String {
    let Some(first) = records.first() else {
        return "No rows returned.\n".to_string();
    };

    let columns = records.iter().map(Record::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for record in records {
        for (i, field) in record.fields().iter().enumerate() {
            widths[i] = widths[i].max(field.chars().count());
        }
    }

    let mut output = String::new();
    write_text_row(&mut output, first, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(rule.join("  ").trim_end());
    output.push('\n');
    for record in &records[1..] {
        write_text_row(&mut output, record, &widths);
    }
    output
}

fn write_text_row(output: &mut String, record: &Record, widths: &[usize]) {
    let mut line = String::new();
    for (i, &width) in widths.iter().enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        let field = record.get(i).unwrap_or("");
        let _ = write!(line, "{field:<width$}");
    }
    output.push_str(line.trim_end());
    output.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[&str]) -> Record {
        fields.iter().map(|f| (*f).to_string()).collect()
    }

    #[test]
    fn test_render_plain_fields() {
        let records = vec![record(&["alias", "name"]), record(&["jdoe", "John"])];
        assert_eq!(render_csv(&records), "alias,name\r\njdoe,John\r\n");
    }

    #[test]
    fn test_render_quotes_special_fields() {
        let records = vec![record(&["Doe, John", "say \"hi\"", "two\nlines", "plain"])];
        assert_eq!(
            render_csv(&records),
            "\"Doe, John\",\"say \"\"hi\"\"\",\"two\nlines\",plain\r\n"
        );
    }

    #[test]
    fn test_render_empty_fields() {
        let records = vec![record(&["", ""]), record(&[""]), record(&[])];
        assert_eq!(render_csv(&records), ",\r\n\"\"\r\n\r\n");
    }

    #[test]
    fn test_parse_round_trip() {
        let records = vec![
            record(&["Doe, John", "say \"hi\"", ""]),
            record(&["two\r\nlines", "x"]),
            record(&[""]),
            record(&[]),
            record(&["", "", "last"]),
        ];
        assert_eq!(parse_csv(&render_csv(&records)), records);
    }

    #[test]
    fn test_parse_accepts_lf() {
        assert_eq!(parse_csv("a,b\nc,d"), vec![record(&["a", "b"]), record(&["c", "d"])]);
    }

    #[test]
    fn test_render_text() {
        let records = vec![
            record(&["alias", "display name"]),
            record(&["jdoe", "John Doe"]),
            record(&["administrator", ""]),
        ];
        let text = render_text(&records);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "alias          display name");
        assert_eq!(lines[1], "-------------  ------------");
        assert_eq!(lines[2], "jdoe           John Doe");
        assert_eq!(lines[3], "administrator");
    }

    #[test]
    fn test_render_text_empty() {
        assert_eq!(render_text(&[]), "No rows returned.\n");
    }
}
