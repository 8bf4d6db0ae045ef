use crate::changeset::ChangeSet;
use crate::fix::util::column_of;
use crate::fix::{FixConfig, QuickFixFactory, QuickFixInterface, QuickFixOperation, perform_fn};
use crate::parse::Document;
use crate::parse::ast::TokenIdx;
use crate::parse::lexer::{CommentKind, TokenKind};

/// Converts `//` comments to `/* */` comments and back.
///
/// Works on the comment under the cursor, or on every token of the selection
/// when all of them are comments of one style. Doxygen comments keep their
/// doxygen marker (`//!` and `/*!`). `///` is treated as a plain line comment.
pub struct ConvertCommentStyle;

impl QuickFixFactory for ConvertCommentStyle {
    fn name(&self) -> &'static str {
        "Comment/ConvertCommentStyle"
    }

    fn match_at(
        &self,
        iface: &QuickFixInterface<'_>,
        _config: &FixConfig,
        result: &mut Vec<QuickFixOperation>,
    ) {
        let doc = iface.document();
        let tokens = match comment_tokens(iface) {
            Some(t) => t,
            None => return,
        };
        let kind = match effective_kind(doc, tokens[0]) {
            Some(k) => k,
            None => return,
        };
        if tokens[1..].iter().any(|&t| effective_kind(doc, t) != Some(kind)) {
            return;
        }

        let edits = if kind.is_line() {
            line_to_block(doc, &tokens, kind.is_doxygen())
        } else {
            match block_to_line(doc, &tokens, kind.is_doxygen()) {
                Some(e) => e,
                None => return,
            }
        };
        let description = if kind.is_line() {
            "Convert Comment to C-Style"
        } else {
            "Convert Comment to C++-Style"
        };

        result.push(QuickFixOperation::new(
            iface,
            self.name(),
            -1,
            description,
            perform_fn(move |ctx| {
                let mut cs = ChangeSet::new();
                for edit in &edits {
                    match edit {
                        Edit::Replace(start, end, text) => cs.replace(*start, *end, text.clone()),
                        Edit::Insert(at, text) => cs.insert(*at, text.clone()),
                    };
                }
                ctx.apply_origin(cs)
            }),
        ));
    }
}

#[derive(Debug, Clone)]
enum Edit {
    Replace(usize, usize, String),
    Insert(usize, String),
}

/// Tokens overlapping the selection, or the comment under the cursor. `None`
/// unless every one of them is a comment.
fn comment_tokens(iface: &QuickFixInterface<'_>) -> Option<Vec<TokenIdx>> {
    let doc = iface.document();
    let tokens = doc.tokens();
    let picked: Vec<TokenIdx> = if iface.has_selection() {
        let (start, end) = iface.selection();
        (0..tokens.len())
            .filter(|&i| tokens[i].start < end && tokens[i].end > start)
            .collect()
    } else {
        (0..tokens.len())
            .filter(|&i| tokens[i].is_comment() && iface.is_cursor_on_token(i))
            .take(1)
            .collect()
    };
    let all_comments = !picked.is_empty() && picked.iter().all(|&i| tokens[i].is_comment());
    all_comments.then_some(picked)
}

fn effective_kind(doc: &Document, token: TokenIdx) -> Option<CommentKind> {
    match doc.tokens()[token].kind {
        TokenKind::Comment(CommentKind::LineDoxygen) if doc.text_of_token(token).starts_with("///") => {
            Some(CommentKind::Line)
        }
        TokenKind::Comment(kind) => Some(kind),
        _ => None,
    }
}

/// Fill lines are decoration such as `//////////` or `/*********`: nothing
/// but `fill` and spaces, with more than two `fill` characters.
fn is_fill_line(text: &str, fill: char) -> bool {
    text.chars().all(|c| c == fill || c == ' ') && text.chars().filter(|&c| c == fill).count() > 2
}

fn line_to_block(doc: &Document, tokens: &[TokenIdx], doxygen: bool) -> Vec<Edit> {
    let mut edits = Vec::new();
    if doxygen {
        for &token in tokens {
            let start = doc.start_of_token(token);
            edits.push(Edit::Replace(start, start + 3, "   ".to_string()));
        }
        edits.insert(0, Edit::Insert(doc.start_of_token(tokens[0]), "/*!\n".to_string()));
        let last = tokens[tokens.len() - 1];
        edits.push(Edit::Insert(doc.end_of_token(last), "\n*/".to_string()));
        return edits;
    }

    // Column of the `*/` closing the most recent fill line.
    let mut closing_column: Option<usize> = None;
    for &token in tokens {
        let start = doc.start_of_token(token);
        let end = doc.end_of_token(token);
        let text = doc.text_of_token(token);
        let column = column_of(doc, start);
        let len = text.chars().count();

        if is_fill_line(&text[1..], '/') {
            edits.push(Edit::Replace(start, end, format!("/{}/", "*".repeat(len - 1))));
            closing_column = Some(column + len - 1);
            continue;
        }

        let content = text[2..].trim_start_matches('/').trim_end();
        let mut converted = format!("/*{content}");
        let end_column = column + converted.chars().count();
        if let Some(closing) = closing_column
            && end_column + 1 < closing
        {
            converted.push_str(&" ".repeat(closing - end_column - 1));
        }
        converted.push_str(" */");
        edits.push(Edit::Replace(start, end, converted));
    }
    edits
}

/// `None` when code follows a comment on its closing line.
fn block_to_line(doc: &Document, tokens: &[TokenIdx], doxygen: bool) -> Option<Vec<Edit>> {
    let text = doc.text();
    let mut edits = Vec::with_capacity(tokens.len());
    for &token in tokens {
        let start = doc.start_of_token(token);
        let end = doc.end_of_token(token);
        let line_end = doc.source().line_end_of(end);
        if !text[end..line_end].trim().is_empty() {
            return None;
        }
        let converted = convert_block(doc.text_of_token(token), column_of(doc, start), doxygen);
        edits.push(Edit::Replace(start, end, converted));
    }
    Some(edits)
}

/// Rewrite one block comment as line comments. `column` is where the comment
/// starts; continuation lines keep at most that much indentation.
fn convert_block(comment: &str, column: usize, doxygen: bool) -> String {
    let prefix = if doxygen { "//!" } else { "//" };
    let opener = if doxygen { 3 } else { 2 };
    let lines: Vec<&str> = comment.split('\n').collect();
    let last_index = lines.len() - 1;
    let multi_line = last_index > 0;

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for (index, raw) in lines.iter().enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let is_first = index == 0;
        let is_last = index == last_index;
        let removable = multi_line && (is_first || is_last);

        if !doxygen {
            let mut inner = line;
            if is_first {
                inner = &inner[1..];
            }
            if is_last {
                inner = inner.strip_suffix('/').unwrap_or(inner);
            }
            if is_fill_line(inner, '*') {
                out.push("/".repeat(line.chars().count()));
                continue;
            }
        }

        let mut body = line;
        if is_first {
            body = &body[opener..];
        }
        if is_last {
            body = body.strip_suffix("*/").unwrap_or(body);
        }
        let (indent, body) = if is_first {
            ("", body)
        } else {
            split_indent(body, column)
        };
        let content = strip_decoration(body).trim_end();

        if content.trim().is_empty() {
            if !removable {
                out.push(format!("{indent}{prefix}"));
            }
            continue;
        }
        let aligned = " ".repeat(prefix.len() + 1);
        let converted = if !is_first && content.starts_with(&aligned) {
            format!("{indent}{prefix}{}", &content[prefix.len()..])
        } else {
            format!("{indent}{prefix}{content}")
        };
        out.push(converted);
    }

    if out.is_empty() {
        return prefix.to_string();
    }
    out.join("\n")
}

/// Split off up to `column` characters of leading whitespace.
fn split_indent(line: &str, column: usize) -> (&str, &str) {
    let cut = line
        .char_indices()
        .take(column)
        .take_while(|(_, c)| *c == ' ' || *c == '\t')
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    line.split_at(cut)
}

/// Drop a leading run of whitespace and `*` up to and including its last `*`.
fn strip_decoration(body: &str) -> &str {
    let mut cut = 0;
    for (i, c) in body.char_indices() {
        match c {
            '*' => cut = i + 1,
            ' ' | '\t' => {}
            _ => break,
        }
    }
    &body[cut..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_fix, assert_no_fix, descriptions, run_fix};

    const TO_C: &str = "Convert Comment to C-Style";
    const TO_CXX: &str = "Convert Comment to C++-Style";

    #[test]
    fn line_comment_becomes_block() {
        assert_fix(&ConvertCommentStyle, "@// hello\nint x;\n", TO_C, "/* hello */\nint x;\n");
    }

    #[test]
    fn selected_line_comments_convert_together() {
        assert_fix(
            &ConvertCommentStyle,
            "@// a\n// b@\nint x;\n",
            TO_C,
            "/* a */\n/* b */\nint x;\n",
        );
    }

    #[test]
    fn fill_lines_align_closing_markers() {
        assert_fix(
            &ConvertCommentStyle,
            "@//////////\n// ab\n//////////@\n",
            TO_C,
            "/*********/\n/* ab    */\n/*********/\n",
        );
    }

    #[test]
    fn triple_slash_is_plain() {
        assert_fix(&ConvertCommentStyle, "/// doc@\nvoid f();\n", TO_C, "/* doc */\nvoid f();\n");
    }

    #[test]
    fn doxygen_line_comments_become_doxygen_block() {
        assert_fix(
            &ConvertCommentStyle,
            "@//! a\n//! b@\n",
            TO_C,
            "/*!\n    a\n    b\n*/\n",
        );
    }

    #[test]
    fn block_comment_becomes_line() {
        assert_fix(&ConvertCommentStyle, "/* he@llo */\nint x;\n", TO_CXX, "// hello\nint x;\n");
    }

    #[test]
    fn decorated_block_drops_opener_and_closer_lines() {
        assert_fix(
            &ConvertCommentStyle,
            "@/*\n * one\n * two\n */\nint x;\n",
            TO_CXX,
            "// one\n// two\nint x;\n",
        );
    }

    #[test]
    fn indented_block_keeps_indentation() {
        assert_fix(
            &ConvertCommentStyle,
            "void f() {\n    @/* a\n     * b */\n}\n",
            TO_CXX,
            "void f() {\n    // a\n    // b\n}\n",
        );
    }

    #[test]
    fn doxygen_block_keeps_marker() {
        assert_fix(
            &ConvertCommentStyle,
            "@/** Brief.\n * More.\n */\nvoid f();\n",
            TO_CXX,
            "//! Brief.\n//! More.\nvoid f();\n",
        );
    }

    #[test]
    fn block_fill_lines_become_slashes() {
        assert_fix(
            &ConvertCommentStyle,
            "@/*****\n * a\n *****/\n",
            TO_CXX,
            "//////\n// a\n///////\n",
        );
    }

    #[test]
    fn mixed_styles_are_ignored() {
        assert_no_fix(&ConvertCommentStyle, "@// a\n/* b */@\n");
    }

    #[test]
    fn code_in_selection_is_ignored() {
        assert_no_fix(&ConvertCommentStyle, "@// a\nint x;@\n");
    }

    #[test]
    fn code_after_block_is_ignored() {
        assert_no_fix(&ConvertCommentStyle, "/* @a */ int x;\n");
    }

    #[test]
    fn cursor_outside_comment_is_ignored() {
        assert_no_fix(&ConvertCommentStyle, "int @x; // note\n");
    }

    #[test]
    fn one_candidate_per_comment() {
        let ops = run_fix(&ConvertCommentStyle, "int x; // no@te\n");
        assert_eq!(descriptions(&ops), vec![TO_C]);
    }
}
