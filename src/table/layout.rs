//! Column layout derivation from a separator line.
//!
//! Query results are printed as monospaced tables whose only structural
//! marker is a horizontal rule under the column names, e.g.
//!
//! ```text
//! name         description
//! ============ ===========
//! ```
//!
//! Every occurrence of the column break token inside that rule marks the
//! end of one column and, `token` characters later, the start of the next.

use crate::error::DecodeError;
use crate::table::decode::Record;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::debug;

/// Default number of leading lines searched for the separator.
pub const DEFAULT_SAMPLE_LINES: usize = 3;

/// Whether a final column is appended after the last break token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingColumn {
    /// Always append a final column up to the end of the separator.
    Always,
    /// Never append it; text after the last break token is ignored.
    Never,
    /// Append it only when it would be non-empty, i.e. the separator does
    /// not end with the break token.
    #[default]
    Auto,
}

impl TrailingColumn {
    /// Parses a policy name (`always`, `never`, `auto`).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

/// Families of query output with their own separator conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFamily {
    /// Call-manager `run sql` output: `=` rules, single-space breaks, every
    /// column padded with a trailing space.
    CallManager,
    /// Unity `run cuc dbquery` output: `-` rules, double-space breaks.
    Unity,
}

/// Options controlling how a layout is derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutOptions {
    /// Characters a separator line may start with.
    pub markers: Vec<char>,
    /// Literal substring marking a column boundary inside the separator.
    pub break_token: String,
    /// Trailing column policy.
    pub trailing: TrailingColumn,
    /// Number of leading lines searched for the separator.
    pub sample_lines: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            markers: vec!['=', '-'],
            break_token: "  ".to_string(),
            trailing: TrailingColumn::Auto,
            sample_lines: DEFAULT_SAMPLE_LINES,
        }
    }
}

impl LayoutOptions {
    /// Creates options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the preset for a table family.
    ///
    /// Both presets accept `=` and `-` rules; they differ in the break
    /// token and the trailing column policy.
    #[must_use]
    pub fn for_family(family: TableFamily) -> Self {
        match family {
            TableFamily::CallManager => Self {
                break_token: " ".to_string(),
                trailing: TrailingColumn::Never,
                ..Self::default()
            },
            TableFamily::Unity => Self {
                break_token: "  ".to_string(),
                trailing: TrailingColumn::Always,
                ..Self::default()
            },
        }
    }

    /// Sets the separator markers.
    #[must_use]
    pub fn with_markers(mut self, markers: impl IntoIterator<Item = char>) -> Self {
        self.markers = markers.into_iter().collect();
        self
    }

    /// Sets the column break token.
    #[must_use]
    pub fn with_break_token(mut self, token: impl Into<String>) -> Self {
        self.break_token = token.into();
        self
    }

    /// Sets the trailing column policy.
    #[must_use]
    pub const fn with_trailing(mut self, trailing: TrailingColumn) -> Self {
        self.trailing = trailing;
        self
    }

    /// Sets the number of sample lines.
    #[must_use]
    pub const fn with_sample_lines(mut self, sample_lines: usize) -> Self {
        self.sample_lines = sample_lines;
        self
    }

    /// Returns whether `line` starts like a separator. Only used to locate
    /// the rule among the leading sample lines.
    #[must_use]
    pub fn is_separator(&self, line: &str) -> bool {
        line.chars()
            .next()
            .is_some_and(|first| self.markers.contains(&first))
    }

    /// Returns whether `line` is a rule or border line in the body: it
    /// starts with a marker and holds nothing but markers, break tokens and
    /// whitespace. A data row such as `-5     jdoe` is not a border.
    #[must_use]
    pub fn is_border(&self, line: &str) -> bool {
        self.is_separator(line)
            && line
                .split(self.break_token.as_str())
                .flat_map(str::chars)
                .all(|c| c.is_whitespace() || self.markers.contains(&c))
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidOptions`] for an empty break token, no
    /// markers, or a zero sample size.
    pub fn validate(&self) -> Result<(), DecodeError> {
        let reason = if self.break_token.is_empty() {
            "empty column break token"
        } else if self.markers.is_empty() {
            "no separator markers"
        } else if self.sample_lines == 0 {
            "sample_lines must be > 0"
        } else {
            return Ok(());
        };
        Err(DecodeError::InvalidOptions {
            reason: reason.to_string(),
        })
    }
}

/// Half-open character ranges, one per column.
///
/// Derived from exactly one separator line and never modified, so every
/// row of a result is cut the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnLayout {
    columns: Vec<Range<usize>>,
}

impl ColumnLayout {
    /// Builds the layout described by a separator line.
    ///
    /// Offsets are in characters, not bytes. Without any break token the
    /// table has one column spanning the whole separator.
    #[must_use]
    pub fn from_separator(line: &str, break_token: &str, trailing: TrailingColumn) -> Self {
        let width = line.chars().count();
        let token_len = break_token.chars().count();

        let breaks: Vec<usize> = if break_token.is_empty() {
            Vec::new()
        } else {
            line.match_indices(break_token)
                .map(|(byte, _)| line[..byte].chars().count())
                .collect()
        };

        if breaks.is_empty() {
            return Self {
                columns: vec![0..width],
            };
        }

        let mut columns = Vec::with_capacity(breaks.len() + 1);
        let mut offset = 0;
        for column_break in breaks {
            columns.push(offset..column_break);
            offset = column_break + token_len;
        }

        let append = match trailing {
            TrailingColumn::Always => true,
            TrailingColumn::Never => false,
            TrailingColumn::Auto => offset < width,
        };
        if append {
            columns.push(offset..width);
        }

        Self { columns }
    }

    /// Scans the first `options.sample_lines` lines for a separator and
    /// derives the layout from it.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::NoSeparatorFound`] if none of the sampled
    /// lines is a separator, or [`DecodeError::InvalidOptions`].
    pub fn derive<'l, I>(lines: I, options: &LayoutOptions) -> Result<Self, DecodeError>
    where
        I: IntoIterator<Item = &'l str>,
    {
        options.validate()?;

        let mut scanned = 0;
        for line in lines.into_iter().take(options.sample_lines) {
            scanned += 1;
            if options.is_separator(line) {
                let layout = Self::from_separator(line, &options.break_token, options.trailing);
                debug!(
                    line = scanned,
                    columns = layout.len(),
                    "column layout derived from separator"
                );
                return Ok(layout);
            }
        }

        Err(DecodeError::NoSeparatorFound { scanned })
    }

    /// Returns the column ranges.
    #[must_use]
    pub fn columns(&self) -> &[Range<usize>] {
        &self.columns
    }

    /// Returns the number of columns.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns whether the layout has no columns.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Cuts `line` into trimmed fields.
    ///
    /// Columns past the end of a short line yield empty fields.
    #[must_use]
    pub fn slice(&self, line: &str) -> Record {
        self.columns
            .iter()
            .map(|range| slice_chars(line, range).trim().to_string())
            .collect()
    }
}

/// Bounds-safe slice of `line` by character offsets.
fn slice_chars<'a>(line: &'a str, range: &Range<usize>) -> &'a str {
    let byte_at = |n: usize| line.char_indices().nth(n).map_or(line.len(), |(i, _)| i);
    let start = byte_at(range.start);
    let end = byte_at(range.end).max(start);
    &line[start..end]
}

/// Derives a layout from sample lines. See [`ColumnLayout::derive`].
///
/// # Errors
///
/// Returns [`DecodeError::NoSeparatorFound`] if no separator is sampled.
pub fn derive_layout<'l, I>(lines: I, options: &LayoutOptions) -> Result<ColumnLayout, DecodeError>
where
    I: IntoIterator<Item = &'l str>,
{
    ColumnLayout::derive(lines, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_space_layout() {
        let layout = ColumnLayout::from_separator("----  -------", "  ", TrailingColumn::Always);
        assert_eq!(layout.columns(), &[0..4, 6..13]);
    }

    #[test]
    fn test_single_space_three_columns() {
        let layout = ColumnLayout::from_separator("=== ===== ===", " ", TrailingColumn::Always);
        assert_eq!(layout.columns(), &[0..3, 4..9, 10..13]);
    }

    #[test]
    fn test_single_column() {
        let layout = ColumnLayout::from_separator("==========", " ", TrailingColumn::Never);
        assert_eq!(layout.columns(), &[0..10]);
    }

    #[test]
    fn test_trailing_never_drops_final_range() {
        let layout = ColumnLayout::from_separator("==== ===== ", " ", TrailingColumn::Never);
        assert_eq!(layout.columns(), &[0..4, 5..10]);

        let layout = ColumnLayout::from_separator("==== =====", " ", TrailingColumn::Never);
        assert_eq!(layout.columns(), &[0..4]);
    }

    #[test]
    fn test_trailing_auto() {
        let layout = ColumnLayout::from_separator("==== ===== ", " ", TrailingColumn::Auto);
        assert_eq!(layout.columns(), &[0..4, 5..10]);

        let layout = ColumnLayout::from_separator("==== =====", " ", TrailingColumn::Auto);
        assert_eq!(layout.columns(), &[0..4, 5..10]);
    }

    #[test]
    fn test_trailing_always_keeps_empty_final_range() {
        let layout = ColumnLayout::from_separator("==== ===== ", " ", TrailingColumn::Always);
        assert_eq!(layout.columns(), &[0..4, 5..10, 11..11]);
    }

    #[test]
    fn test_wide_gap_yields_empty_column() {
        // Non-overlapping matches, as a regex scan would find them.
        let layout = ColumnLayout::from_separator("--    --", "  ", TrailingColumn::Always);
        assert_eq!(layout.columns(), &[0..2, 4..4, 6..8]);
    }

    #[test]
    fn test_derive_finds_separator_in_sample() {
        let lines = ["alias    display", "-----    -------", "jdoe     John"];
        let layout = ColumnLayout::derive(lines, &LayoutOptions::default()).unwrap();
        assert_eq!(layout.len(), 2);
    }

    #[test]
    fn test_derive_stops_at_sample_limit() {
        let lines = ["a", "b", "c", "----"];
        let err = ColumnLayout::derive(lines, &LayoutOptions::default()).unwrap_err();
        assert!(matches!(err, DecodeError::NoSeparatorFound { scanned: 3 }));

        let options = LayoutOptions::default().with_sample_lines(4);
        assert!(ColumnLayout::derive(lines, &options).is_ok());
    }

    #[test]
    fn test_derive_empty_input() {
        let err = derive_layout(std::iter::empty(), &LayoutOptions::default()).unwrap_err();
        assert!(matches!(err, DecodeError::NoSeparatorFound { scanned: 0 }));
    }

    #[test]
    fn test_derive_rejects_invalid_options() {
        let options = LayoutOptions::default().with_break_token("");
        let err = derive_layout(["----"], &options).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidOptions { .. }));

        let options = LayoutOptions::default().with_markers(Vec::new());
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_family_presets() {
        let ccm = LayoutOptions::for_family(TableFamily::CallManager);
        assert_eq!(ccm.break_token, " ");
        assert_eq!(ccm.trailing, TrailingColumn::Never);

        let cuc = LayoutOptions::for_family(TableFamily::Unity);
        assert_eq!(cuc.break_token, "  ");
        assert_eq!(cuc.trailing, TrailingColumn::Always);
        assert!(cuc.is_separator("-----"));
        assert!(cuc.is_separator("====="));
        assert!(!cuc.is_separator("alias"));
        assert!(!cuc.is_separator(""));
    }

    #[test]
    fn test_border_requires_whole_rule() {
        let cuc = LayoutOptions::for_family(TableFamily::Unity);
        assert!(cuc.is_border("-----  -----"));
        assert!(cuc.is_border("=====  =====\r"));
        assert!(!cuc.is_border("-5     jdoe"));
        assert!(!cuc.is_border("--verbose"));
        assert!(!cuc.is_border("alias  name"));

        let piped = LayoutOptions::default().with_break_token("|");
        assert!(piped.is_border("----|----"));
        assert!(cuc.is_separator("-5     jdoe"));
    }

    #[test]
    fn test_slice_short_line() {
        let layout = ColumnLayout::from_separator("----  -------", "  ", TrailingColumn::Always);
        assert_eq!(layout.slice("ab").fields(), &["ab", ""]);
        assert_eq!(layout.slice("").fields(), &["", ""]);
    }

    #[test]
    fn test_slice_multibyte() {
        let layout = ColumnLayout::from_separator("-----  -----", "  ", TrailingColumn::Always);
        let record = layout.slice("Zoë    Ångström");
        assert_eq!(record.fields(), &["Zoë", "Ångst"]);
    }

    #[test]
    fn test_trailing_column_parse() {
        assert_eq!(TrailingColumn::parse("always"), Some(TrailingColumn::Always));
        assert_eq!(TrailingColumn::parse("Never"), Some(TrailingColumn::Never));
        assert_eq!(TrailingColumn::parse("auto"), Some(TrailingColumn::Auto));
        assert_eq!(TrailingColumn::parse("sometimes"), None);
    }
}
