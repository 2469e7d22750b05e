//! Statement splitter: cuts the scanned segment stream into top-level
//! statements at semicolons that sit in code at parenthesis depth zero.
//!
//! Comments are replaced by a single space so they never merge adjacent
//! tokens; quoted and dollar-quoted segments are carried into the statement
//! text verbatim but never inspected for punctuation.

use crate::diag::LineRange;
use crate::scan::{Segment, SegmentKind};

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Statement text, trimmed, without the terminating semicolon.
    pub text: String,
    /// 1-based source lines the statement's content spans.
    pub lines: LineRange,
}

/// Split classified segments into statements.
pub fn split(segments: &[Segment]) -> Vec<Statement> {
    let mut statements = Vec::new();
    let mut text = String::new();
    let mut start: Option<u32> = None;
    let mut end: u32 = 0;
    let mut depth: u32 = 0;

    let mut finish = |text: &mut String, start: &mut Option<u32>, end: u32| {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            let start_line = start.unwrap_or(end.max(1));
            statements.push(Statement {
                text: trimmed.to_string(),
                lines: LineRange::new(start_line, end.max(start_line)),
            });
        }
        text.clear();
        *start = None;
    };

    for segment in segments {
        let mut line = segment.line;
        match segment.kind {
            SegmentKind::Code => {
                for c in segment.text.chars() {
                    match c {
                        '\n' => {
                            line += 1;
                            text.push(c);
                        }
                        '(' => {
                            depth += 1;
                            mark(&mut start, &mut end, line);
                            text.push(c);
                        }
                        ')' => {
                            depth = depth.saturating_sub(1);
                            mark(&mut start, &mut end, line);
                            text.push(c);
                        }
                        ';' if depth == 0 => {
                            finish(&mut text, &mut start, end);
                        }
                        c if c.is_whitespace() => text.push(c),
                        c => {
                            mark(&mut start, &mut end, line);
                            text.push(c);
                        }
                    }
                }
            }
            SegmentKind::LineComment | SegmentKind::BlockComment => {
                text.push(' ');
            }
            SegmentKind::QuotedString | SegmentKind::DollarQuoted => {
                mark(&mut start, &mut end, line);
                text.push_str(&segment.text);
                line += segment.text.matches('\n').count() as u32;
                end = end.max(line);
            }
        }
    }
    finish(&mut text, &mut start, end);

    statements
}

fn mark(start: &mut Option<u32>, end: &mut u32, line: u32) {
    if start.is_none() {
        *start = Some(line);
    }
    *end = (*end).max(line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::scan;

    fn split_text(input: &str) -> Vec<Statement> {
        split(&scan(input).unwrap())
    }

    #[test]
    fn test_simple_split() {
        let statements = split_text("CREATE TABLE a (x INT);\nCREATE TABLE b (y INT);");
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].text, "CREATE TABLE a (x INT)");
        assert_eq!(statements[0].lines, LineRange::new(1, 1));
        assert_eq!(statements[1].lines, LineRange::new(2, 2));
    }

    #[test]
    fn test_semicolon_in_string_does_not_split() {
        let statements = split_text("INSERT INTO t VALUES ('a;b');SELECT 1;");
        assert_eq!(statements.len(), 2);
        assert!(statements[0].text.contains("'a;b'"));
    }

    #[test]
    fn test_semicolon_in_dollar_quote_does_not_split() {
        let statements = split_text("DO $$ BEGIN SELECT 1; SELECT 2; END $$;\nSELECT 3;");
        assert_eq!(statements.len(), 2);
        assert!(statements[0].text.starts_with("DO $$"));
    }

    #[test]
    fn test_semicolon_in_comment_does_not_split() {
        let statements = split_text("CREATE TABLE t ( -- trailing; note\n  id INT\n);");
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].lines, LineRange::new(1, 3));
    }

    #[test]
    fn test_parenthesized_semicolon_does_not_split() {
        // not meaningful SQL, but boundary correctness must hold anyway
        let statements = split_text("CREATE TABLE t (a INT; b INT);");
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_comment_does_not_merge_tokens() {
        let statements = split_text("CREATE/* x */TABLE t (id INT);");
        assert_eq!(statements[0].text, "CREATE TABLE t (id INT)");
    }

    #[test]
    fn test_multiline_statement_lines() {
        let statements = split_text("\n\nCREATE TABLE t (\n  id INT\n);\n");
        assert_eq!(statements[0].lines, LineRange::new(3, 5));
    }

    #[test]
    fn test_trailing_statement_without_semicolon() {
        let statements = split_text("CREATE TABLE t (id INT)");
        assert_eq!(statements.len(), 1);
    }
}
