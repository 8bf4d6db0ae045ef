use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::report::Location;

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
    /// Byte offsets where each line starts
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self::from_string(path.to_path_buf(), content))
    }

    pub fn from_string(path: PathBuf, content: String) -> Self {
        let line_starts = compute_line_starts(&content);
        Self {
            path,
            content,
            line_starts,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset of the first character of the line containing `offset`.
    pub fn line_start_of(&self, offset: usize) -> usize {
        let idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        self.line_starts[idx]
    }

    /// Byte offset of the `\n` ending the line containing `offset` (or the
    /// end of the text on the last line).
    pub fn line_end_of(&self, offset: usize) -> usize {
        self.content[offset.min(self.content.len())..]
            .find('\n')
            .map_or(self.content.len(), |i| offset + i)
    }

    /// Leading whitespace of the line containing `offset`.
    pub fn indentation_at(&self, offset: usize) -> &str {
        let start = self.line_start_of(offset);
        let line = &self.content[start..self.line_end_of(start)];
        let trimmed = line.trim_start_matches([' ', '\t']);
        &line[..line.len() - trimmed.len()]
    }

    /// Convert a byte offset into a (1-indexed line, 0-indexed column) pair.
    /// Column counts characters, not bytes.
    pub fn offset_to_line_col(&self, byte_offset: usize) -> (usize, usize) {
        let byte_offset = byte_offset.min(self.content.len());
        let line_idx = match self.line_starts.binary_search(&byte_offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_bytes = &self.content.as_bytes()[self.line_starts[line_idx]..byte_offset];
        let col = line_bytes.iter().filter(|&&b| (b & 0xC0) != 0x80).count();
        (line_idx + 1, col)
    }

    pub fn offset_to_location(&self, byte_offset: usize) -> Location {
        let (line, column) = self.offset_to_line_col(byte_offset);
        Location { line, column }
    }

    /// Convert a (1-indexed line, 0-indexed column) pair to a byte offset.
    /// Returns `None` if the line is out of range; columns past the end of
    /// the line clamp to the line end.
    pub fn line_col_to_offset(&self, line: usize, col: usize) -> Option<usize> {
        if line == 0 || line > self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[line - 1];
        let end = self.line_end_of(start);
        let text = &self.content[start..end];
        Some(
            text.char_indices()
                .nth(col)
                .map_or(end, |(i, _)| start + i),
        )
    }
}

fn compute_line_starts(content: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, byte) in content.bytes().enumerate() {
        if byte == b'\n' && i + 1 < content.len() {
            starts.push(i + 1);
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(s: &str) -> SourceFile {
        SourceFile::from_string(PathBuf::from("test.cpp"), s.to_string())
    }

    #[test]
    fn line_starts_multiple_lines() {
        let sf = source("abc\ndef\nghi");
        assert_eq!(sf.line_starts, vec![0, 4, 8]);
    }

    #[test]
    fn line_starts_trailing_newline() {
        let sf = source("abc\n");
        assert_eq!(sf.line_starts, vec![0]);
    }

    #[test]
    fn offset_to_line_col_second_line() {
        let sf = source("abc\ndef\nghi");
        assert_eq!(sf.offset_to_line_col(0), (1, 0));
        assert_eq!(sf.offset_to_line_col(4), (2, 0));
        assert_eq!(sf.offset_to_line_col(9), (3, 1));
    }

    #[test]
    fn line_col_to_offset_basic() {
        let sf = source("abc\ndef\nghi");
        assert_eq!(sf.line_col_to_offset(1, 2), Some(2));
        assert_eq!(sf.line_col_to_offset(3, 1), Some(9));
        assert_eq!(sf.line_col_to_offset(0, 0), None);
        assert_eq!(sf.line_col_to_offset(4, 0), None);
    }

    #[test]
    fn column_past_line_end_clamps() {
        let sf = source("ab\ncd");
        assert_eq!(sf.line_col_to_offset(1, 40), Some(2));
    }

    #[test]
    fn multibyte_columns_count_characters() {
        let sf = source("// é\nint x;");
        assert_eq!(sf.offset_to_line_col(5), (1, 4));
        assert_eq!(sf.line_col_to_offset(1, 4), Some(5));
    }

    #[test]
    fn indentation_and_line_bounds() {
        let sf = source("int f() {\n    return 1;\n}\n");
        let ret = sf.content.find("return").unwrap();
        assert_eq!(sf.indentation_at(ret), "    ");
        assert_eq!(sf.line_start_of(ret), 10);
        assert_eq!(&sf.content[sf.line_start_of(ret)..sf.line_end_of(ret)], "    return 1;");
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.cpp");
        std::fs::write(&file, "int x;\n").unwrap();
        let sf = SourceFile::from_path(&file).unwrap();
        assert_eq!(sf.as_str(), "int x;\n");
        assert_eq!(sf.path, file);
    }

    #[test]
    fn from_path_nonexistent() {
        assert!(SourceFile::from_path(Path::new("/nonexistent/file.cpp")).is_err());
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn line_starts_follow_newlines(content in "[a-z\\n ]{0,300}") {
                let starts = compute_line_starts(&content);
                prop_assert_eq!(starts[0], 0);
                for &start in &starts[1..] {
                    prop_assert!(content.as_bytes()[start - 1] == b'\n',
                        "line start {} is not preceded by newline", start);
                }
            }

            #[test]
            fn offset_line_col_roundtrip(content in "[\\x00-\\x7f\\u{80}-\\u{10FFFF}]{1,200}") {
                let sf = source(&content);
                for offset in 0..content.len() {
                    if !content.is_char_boundary(offset) {
                        continue;
                    }
                    let (line, col) = sf.offset_to_line_col(offset);
                    prop_assert_eq!(sf.line_col_to_offset(line, col), Some(offset),
                        "round-trip failed: offset {} -> ({}, {})", offset, line, col);
                }
            }

            #[test]
            fn offset_to_line_col_is_monotonic(content in "[a-z\\n]{1,300}") {
                let sf = source(&content);
                let mut prev = (0usize, 0usize);
                for offset in 0..content.len() {
                    let cur = sf.offset_to_line_col(offset);
                    prop_assert!(cur >= prev, "offset {} -> {:?} after {:?}", offset, cur, prev);
                    prev = cur;
                }
            }
        }
    }
}
