use vanilla_highlight::LanguageId;

use crate::editor::{EditOperation, EditorBuffer, EditorError};

/// 預設縮排單位（四個空白）。 / Default indent unit: four spaces.
pub const INDENT_UNIT: &str = "    ";

const PAIRS: [(char, char); 6] = [
    ('(', ')'),
    ('[', ']'),
    ('{', '}'),
    ('"', '"'),
    ('\'', '\''),
    ('`', '`'),
];

const EMPTY_PAIRS: [&str; 6] = ["()", "[]", "{}", "''", "\"\"", "``"];

fn closing_for(opening: char) -> Option<char> {
    PAIRS
        .iter()
        .find(|(open, _)| *open == opening)
        .map(|(_, close)| *close)
}

fn is_closing(ch: char) -> bool {
    PAIRS.iter().any(|(_, close)| *close == ch)
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}

/// Enter 鍵的自動縮排。 / Splits the line at the caret with auto-indent.
///
/// The new line copies the current line's indentation and gains one indent
/// unit when the text before the caret ends with `{` (or `:` for Python).
/// When the rest of the line starts with `}` or `)`, an empty nested block is
/// produced and the caret lands on its inner line.
pub fn newline_with_indent(
    buffer: &mut EditorBuffer,
    language: LanguageId,
    indent_unit: &str,
) -> Result<(), EditorError> {
    let (start, end) = match buffer.selection() {
        Some(selection) => (selection.start(), selection.end()),
        None => (buffer.position(), buffer.position()),
    };
    let line_start = buffer.line_start(start);
    let line_end = buffer.line_end(end);
    let text = buffer.contents();
    let before = &text[line_start..start];
    let after = &text[end..line_end];

    let indent = leading_whitespace(before).to_string();
    let opener = before.trim_end();
    let opens_block = opener.ends_with('{') || (language.is_python_like() && opener.ends_with(':'));
    let extra = if opens_block { indent_unit } else { "" };

    let closes_next = matches!(after.trim_start().chars().next(), Some('}') | Some(')'));
    if closes_next {
        let inner = format!("\n{indent}{extra}");
        let insertion = format!("{inner}\n{indent}");
        buffer.insert_text(&insertion)?;
        buffer.move_to(start + inner.len())
    } else {
        buffer.insert_text(&format!("\n{indent}{extra}"))
    }
}

/// Tab 鍵：縮排選取的每一行，或在游標插入縮排。 / Indents every selected line, or inserts one unit at the caret.
pub fn indent(buffer: &mut EditorBuffer, indent_unit: &str) -> Result<(), EditorError> {
    let Some(selection) = buffer.selection().cloned() else {
        return buffer.insert_text(indent_unit);
    };
    let starts = buffer.line_starts_between(selection.start(), selection.end());
    let ops = starts
        .iter()
        .map(|&start| EditOperation::insert(start, indent_unit))
        .collect();
    buffer.apply_edit_plan(ops)
}

/// Backspace：成對刪除、整段縮排刪除或單字元刪除。 / Pair-aware, indent-aware backspace.
pub fn backspace(buffer: &mut EditorBuffer, indent_unit: &str) -> Result<(), EditorError> {
    if buffer.selection().is_some() {
        return buffer.delete_backward();
    }
    let position = buffer.position();
    if let Some(previous) = buffer.chars_before(2) {
        if EMPTY_PAIRS.contains(&previous) {
            let start = position - previous.len();
            buffer.apply_edit_plan(vec![EditOperation::delete(start, position)])?;
            return buffer.move_to(start);
        }
    }
    let unit_len = indent_unit.chars().count();
    if unit_len > 0 {
        if let Some(previous) = buffer.chars_before(unit_len) {
            if previous == indent_unit {
                let start = position - previous.len();
                buffer.apply_edit_plan(vec![EditOperation::delete(start, position)])?;
                return buffer.move_to(start);
            }
        }
    }
    buffer.delete_backward()
}

/// 輸入字元並處理自動配對。 / Types a character with auto-pairing.
///
/// Openers wrap the selection (re-selecting the inner text) or insert a pair
/// with the caret between. A closer that already sits right after the caret
/// is stepped over instead of duplicated.
pub fn type_char(buffer: &mut EditorBuffer, ch: char) -> Result<(), EditorError> {
    if let Some(closing) = closing_for(ch) {
        if let Some(selection) = buffer.selection().cloned() {
            let inner = buffer.contents()[selection.start()..selection.end()].to_string();
            let wrapped = format!("{ch}{inner}{closing}");
            buffer.insert_text(&wrapped)?;
            let inner_start = selection.start() + ch.len_utf8();
            return buffer.select(inner_start, inner_start + inner.len());
        }
        let over_type = ch == closing && buffer.char_after() == Some(ch);
        if !over_type {
            let position = buffer.position();
            buffer.insert_text(&format!("{ch}{closing}"))?;
            return buffer.move_to(position + ch.len_utf8());
        }
    }
    if is_closing(ch) && buffer.selection().is_none() && buffer.char_after() == Some(ch) {
        return buffer.move_to(buffer.position() + ch.len_utf8());
    }
    let mut encoded = [0u8; 4];
    buffer.insert_text(ch.encode_utf8(&mut encoded))
}

/// 切換行註解。 / Toggles the language's line comment over the selected lines (or the caret line).
///
/// When every non-blank line already starts with the marker, the first marker
/// on each line (plus one following space) is removed; otherwise the marker is
/// prepended to every line.
pub fn toggle_comment(buffer: &mut EditorBuffer, language: LanguageId) -> Result<(), EditorError> {
    let prefix = language.profile().comment_marker;
    let marker = prefix.trim();
    let (start, end) = match buffer.selection() {
        Some(selection) => (selection.start(), selection.end()),
        None => (buffer.position(), buffer.position()),
    };
    let starts = buffer.line_starts_between(start, end);
    let text = buffer.contents();
    let lines: Vec<(usize, &str)> = starts
        .iter()
        .map(|&line_start| (line_start, &text[line_start..buffer.line_end(line_start)]))
        .collect();

    let all_commented = lines
        .iter()
        .filter(|(_, line)| !line.trim().is_empty())
        .all(|(_, line)| line.trim_start().starts_with(marker));

    let ops: Vec<EditOperation> = if all_commented {
        lines
            .iter()
            .filter_map(|&(line_start, line)| {
                let found = line.find(marker)?;
                let mut remove = marker.len();
                if line[found + remove..].starts_with(' ') {
                    remove += 1;
                }
                Some(EditOperation::delete(
                    line_start + found,
                    line_start + found + remove,
                ))
            })
            .collect()
    } else {
        lines
            .iter()
            .map(|&(line_start, _)| EditOperation::insert(line_start, prefix))
            .collect()
    };
    buffer.apply_edit_plan(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Caret;

    fn at(text: &str, position: usize) -> EditorBuffer {
        EditorBuffer::with_caret(text, Caret::new(position)).unwrap()
    }

    #[test]
    fn newline_copies_indent() {
        let mut buffer = at("    x = 1", 9);
        newline_with_indent(&mut buffer, LanguageId::Python, INDENT_UNIT).unwrap();
        assert_eq!(buffer.contents(), "    x = 1\n    ");
        assert_eq!(buffer.position(), buffer.contents().len());
    }

    #[test]
    fn newline_after_colon_indents_only_for_python() {
        let mut buffer = at("if x:", 5);
        newline_with_indent(&mut buffer, LanguageId::Python, INDENT_UNIT).unwrap();
        assert_eq!(buffer.contents(), "if x:\n    ");

        let mut buffer = at("label:", 6);
        newline_with_indent(&mut buffer, LanguageId::C, INDENT_UNIT).unwrap();
        assert_eq!(buffer.contents(), "label:\n");
    }

    #[test]
    fn newline_inside_braces_builds_block() {
        let mut buffer = at("fn main() {}", 11);
        newline_with_indent(&mut buffer, LanguageId::Rust, INDENT_UNIT).unwrap();
        assert_eq!(buffer.contents(), "fn main() {\n    \n}");
        assert_eq!(buffer.position(), "fn main() {\n    ".len());
    }

    #[test]
    fn newline_before_paren_keeps_outer_indent() {
        let mut buffer = at("  call()", 7);
        newline_with_indent(&mut buffer, LanguageId::JavaScript, INDENT_UNIT).unwrap();
        assert_eq!(buffer.contents(), "  call(\n  \n  )");
        assert_eq!(buffer.position(), "  call(\n  ".len());
    }

    #[test]
    fn tab_inserts_unit_or_indents_lines() {
        let mut buffer = at("x", 0);
        indent(&mut buffer, INDENT_UNIT).unwrap();
        assert_eq!(buffer.contents(), "    x");
        assert_eq!(buffer.position(), 4);

        let mut buffer = EditorBuffer::new("a\nb\nc");
        buffer.select(0, 3).unwrap();
        indent(&mut buffer, INDENT_UNIT).unwrap();
        assert_eq!(buffer.contents(), "    a\n    b\nc");
    }

    #[test]
    fn backspace_removes_empty_pair() {
        let mut buffer = at("()", 2);
        backspace(&mut buffer, INDENT_UNIT).unwrap();
        assert_eq!(buffer.contents(), "");
        assert_eq!(buffer.position(), 0);
    }

    #[test]
    fn backspace_removes_indent_unit() {
        let mut buffer = at("x\n        ", 10);
        backspace(&mut buffer, INDENT_UNIT).unwrap();
        assert_eq!(buffer.contents(), "x\n    ");
    }

    #[test]
    fn backspace_falls_back_to_single_char() {
        let mut buffer = at("ab  ", 4);
        backspace(&mut buffer, INDENT_UNIT).unwrap();
        assert_eq!(buffer.contents(), "ab ");
    }

    #[test]
    fn typing_opener_inserts_pair() {
        let mut buffer = at("f", 1);
        type_char(&mut buffer, '(').unwrap();
        assert_eq!(buffer.contents(), "f()");
        assert_eq!(buffer.position(), 2);
    }

    #[test]
    fn typing_quote_wraps_selection() {
        let mut buffer = EditorBuffer::new("say abc now");
        buffer.select(4, 7).unwrap();
        type_char(&mut buffer, '"').unwrap();
        assert_eq!(buffer.contents(), "say \"abc\" now");
        assert_eq!(buffer.selected_text(), Some("abc"));
    }

    #[test]
    fn typing_existing_closer_steps_over() {
        let mut buffer = at("()", 1);
        type_char(&mut buffer, ')').unwrap();
        assert_eq!(buffer.contents(), "()");
        assert_eq!(buffer.position(), 2);

        let mut buffer = at("\"\"", 1);
        type_char(&mut buffer, '"').unwrap();
        assert_eq!(buffer.contents(), "\"\"");
        assert_eq!(buffer.position(), 2);
    }

    #[test]
    fn typing_plain_char_inserts() {
        let mut buffer = at("ab", 1);
        type_char(&mut buffer, 'é').unwrap();
        assert_eq!(buffer.contents(), "aéb");
        assert_eq!(buffer.position(), 3);
    }

    #[test]
    fn toggle_comment_round_trips_python() {
        let original = "a = 1\n  b = 2\nc = 3";
        let mut buffer = EditorBuffer::new(original);
        buffer.select(0, original.len()).unwrap();
        toggle_comment(&mut buffer, LanguageId::Python).unwrap();
        assert_eq!(buffer.contents(), "# a = 1\n#   b = 2\n# c = 3");

        let len = buffer.contents().len();
        buffer.select(0, len).unwrap();
        toggle_comment(&mut buffer, LanguageId::Python).unwrap();
        assert_eq!(buffer.contents(), original);
    }

    #[test]
    fn toggle_comment_current_line_uses_slashes() {
        let mut buffer = at("let x = 1;\nlet y = 2;", 3);
        toggle_comment(&mut buffer, LanguageId::Rust).unwrap();
        assert_eq!(buffer.contents(), "// let x = 1;\nlet y = 2;");
    }

    #[test]
    fn toggle_comment_ignores_blank_lines_when_checking() {
        let mut buffer = EditorBuffer::new("// a\n\n// b");
        buffer.select(0, 11).unwrap();
        toggle_comment(&mut buffer, LanguageId::Go).unwrap();
        assert_eq!(buffer.contents(), "a\n\nb");
    }
}
