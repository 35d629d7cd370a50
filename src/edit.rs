/// Byte-level splices against the original descriptor text
///
/// Planning code never rewrites the file; it produces a list of `Edit`s that
/// are applied in one pass. Bytes outside the edited spans are copied through
/// untouched.

use crate::error::DescriptorError;
use crate::lexer::Span;
use crate::parser::{Array, Dict, Item};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Span,
    pub text: String,
}

impl Edit {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Edit {
            span: Span::empty(at),
            text: text.into(),
        }
    }

    pub fn replace(span: Span, text: impl Into<String>) -> Self {
        Edit {
            span,
            text: text.into(),
        }
    }

    pub fn delete(span: Span) -> Self {
        Edit {
            span,
            text: String::new(),
        }
    }
}

/// Apply `edits` to `source`
///
/// Edits are ordered by position; inserts at the same offset keep the order
/// they were given in.
pub fn apply(source: &str, edits: &[Edit]) -> Result<String, DescriptorError> {
    let mut ordered: Vec<&Edit> = edits.iter().collect();
    ordered.sort_by_key(|e| (e.span.start, e.span.end));

    let mut out = String::with_capacity(source.len() + edits.iter().map(|e| e.text.len()).sum::<usize>());
    let mut cursor = 0;
    for edit in ordered {
        if edit.span.start < cursor {
            return Err(DescriptorError::OverlappingEdits(edit.span.start));
        }
        out.push_str(&source[cursor..edit.span.start]);
        out.push_str(&edit.text);
        cursor = edit.span.end;
    }
    out.push_str(&source[cursor..]);
    Ok(out)
}

/// Offset of the first byte of the line containing `pos`
pub fn line_start(source: &str, pos: usize) -> usize {
    source[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// Offset just past the newline ending the line containing `pos`
pub fn line_end(source: &str, pos: usize) -> usize {
    source[pos..]
        .find('\n')
        .map(|i| pos + i + 1)
        .unwrap_or(source.len())
}

/// Leading whitespace of the line containing `pos`
pub fn indent_at(source: &str, pos: usize) -> &str {
    let start = line_start(source, pos);
    let rest = &source[start..];
    let width = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    &rest[..width]
}

/// True when only spaces or tabs precede `pos` on its line
fn starts_line(source: &str, pos: usize) -> bool {
    source[line_start(source, pos)..pos]
        .chars()
        .all(|c| c == ' ' || c == '\t')
}

/// True when only whitespace follows `pos` up to the end of its line
fn ends_line(source: &str, pos: usize) -> bool {
    let end = line_end(source, pos);
    source[pos..end].trim().is_empty()
}

/// Grow `span` to whole lines when nothing else shares those lines
///
/// Used for deletions so that removing an entry does not leave a blank line
/// behind.
pub fn whole_lines(source: &str, span: Span) -> Span {
    if starts_line(source, span.start) && ends_line(source, span.end) {
        Span::new(line_start(source, span.start), line_end(source, span.end))
    } else {
        span
    }
}

/// Append `item` (without its trailing comma) to the end of `array`
pub fn append_to_array(source: &str, array: &Array, item: &str) -> Edit {
    let close = array.span.end - 1;
    if starts_line(source, close) {
        let indent = format!("{}\t", indent_at(source, close));
        Edit::insert(line_start(source, close), format!("{}{},\n", indent, item))
    } else {
        match array.items.last() {
            Some(last) if source[..last.span.end].ends_with(',') => {
                Edit::insert(last.span.end, format!(" {},", item))
            }
            Some(last) => Edit::insert(last.span.end, format!(", {},", item)),
            None => Edit::insert(close, format!("{}, ", item)),
        }
    }
}

/// Insert `item` directly after an existing array element
pub fn insert_after_item(source: &str, existing: &Item, item: &str) -> Edit {
    let has_comma = source[..existing.span.end].ends_with(',');
    if !has_comma {
        return Edit::insert(existing.span.end, format!(", {}", item));
    }
    if starts_line(source, existing.span.start) && ends_line(source, existing.span.end) {
        let indent = indent_at(source, existing.span.start);
        Edit::insert(
            line_end(source, existing.span.end),
            format!("{}{},\n", indent, item),
        )
    } else {
        Edit::insert(existing.span.end, format!(" {},", item))
    }
}

/// Insert `key = value;` into `dict`, keeping keys in ascending order
///
/// `value` must already be quoted.
pub fn insert_dict_entry(source: &str, dict: &Dict, key: &str, value: &str) -> Edit {
    let entry = format!("{} = {};", key, value);
    let successor = dict.entries.iter().find(|e| e.key.value.as_str() > key);

    match successor {
        Some(next) if starts_line(source, next.span.start) => {
            let indent = indent_at(source, next.span.start);
            Edit::insert(
                line_start(source, next.span.start),
                format!("{}{}\n", indent, entry),
            )
        }
        Some(next) => Edit::insert(next.span.start, format!("{} ", entry)),
        None => {
            let close = dict.span.end - 1;
            if starts_line(source, close) {
                let indent = match dict.entries.last() {
                    Some(last) if starts_line(source, last.span.start) => {
                        indent_at(source, last.span.start).to_string()
                    }
                    _ => format!("{}\t", indent_at(source, close)),
                };
                Edit::insert(line_start(source, close), format!("{}{}\n", indent, entry))
            } else {
                Edit::insert(close, format!("{} ", entry))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, Value};

    fn array_in<'a>(doc: &'a crate::parser::Document, key: &str) -> &'a Array {
        doc.root.get(key).and_then(Value::as_array).unwrap()
    }

    #[test]
    fn test_apply_keeps_untouched_bytes() {
        let src = "hello world";
        let edits = vec![
            Edit::insert(5, ","),
            Edit::replace(Span::new(6, 11), "there"),
        ];
        assert_eq!(apply(src, &edits).unwrap(), "hello, there");
        assert_eq!(apply(src, &[]).unwrap(), src);
    }

    #[test]
    fn test_apply_preserves_insert_order_at_same_offset() {
        let edits = vec![Edit::insert(1, "b"), Edit::insert(1, "c")];
        assert_eq!(apply("ad", &edits).unwrap(), "abcd");
    }

    #[test]
    fn test_apply_rejects_overlap() {
        let edits = vec![
            Edit::delete(Span::new(0, 4)),
            Edit::delete(Span::new(2, 6)),
        ];
        assert_eq!(
            apply("abcdefgh", &edits).unwrap_err(),
            DescriptorError::OverlappingEdits(2)
        );
    }

    #[test]
    fn test_whole_lines_swallows_line() {
        let src = "a\n\t\tB /* b */,\nc\n";
        let start = src.find('B').unwrap();
        let end = src.find(',').unwrap() + 1;
        let span = whole_lines(src, Span::new(start, end));
        assert_eq!(apply(src, &[Edit::delete(span)]).unwrap(), "a\nc\n");
    }

    #[test]
    fn test_whole_lines_keeps_shared_line() {
        let src = "(A, B, C)";
        let span = whole_lines(src, Span::new(4, 6));
        assert_eq!(span, Span::new(4, 6));
    }

    #[test]
    fn test_append_to_multiline_array() {
        let src = "{\n\tfiles = (\n\t\tA /* a */,\n\t);\n}";
        let doc = parse(src).unwrap();
        let edit = append_to_array(src, array_in(&doc, "files"), "B /* b */");
        assert_eq!(
            apply(src, &[edit]).unwrap(),
            "{\n\tfiles = (\n\t\tA /* a */,\n\t\tB /* b */,\n\t);\n}"
        );
    }

    #[test]
    fn test_append_to_inline_arrays() {
        let src = "{ a = (X, ); b = ( ); c = (Y); }";
        let doc = parse(src).unwrap();
        let edits = vec![
            append_to_array(src, array_in(&doc, "a"), "N"),
            append_to_array(src, array_in(&doc, "b"), "N"),
            append_to_array(src, array_in(&doc, "c"), "N"),
        ];
        assert_eq!(
            apply(src, &edits).unwrap(),
            "{ a = (X, N, ); b = ( N, ); c = (Y, N,); }"
        );
    }

    #[test]
    fn test_insert_after_item_on_own_line() {
        let src = "{\n\tphases = (\n\t\tA /* Embed */,\n\t\tB /* Resources */,\n\t);\n}";
        let doc = parse(src).unwrap();
        let phases = array_in(&doc, "phases");
        let edit = insert_after_item(src, &phases.items[0], "N /* Sign */");
        assert_eq!(
            apply(src, &[edit]).unwrap(),
            "{\n\tphases = (\n\t\tA /* Embed */,\n\t\tN /* Sign */,\n\t\tB /* Resources */,\n\t);\n}"
        );
    }

    #[test]
    fn test_insert_dict_entry_sorted() {
        let src = "{\n\tsettings = {\n\t\tALPHA = 1;\n\t\tGAMMA = 3;\n\t};\n}";
        let doc = parse(src).unwrap();
        let settings = doc.root.get("settings").and_then(Value::as_dict).unwrap();
        let middle = insert_dict_entry(src, settings, "BETA", "2");
        let last = insert_dict_entry(src, settings, "ZETA", "\"z-z\"");
        assert_eq!(
            apply(src, &[middle, last]).unwrap(),
            "{\n\tsettings = {\n\t\tALPHA = 1;\n\t\tBETA = 2;\n\t\tGAMMA = 3;\n\t\tZETA = \"z-z\";\n\t};\n}"
        );
    }

    #[test]
    fn test_insert_dict_entry_into_empty_dict() {
        let src = "{\n\tsettings = {\n\t};\n}";
        let doc = parse(src).unwrap();
        let settings = doc.root.get("settings").and_then(Value::as_dict).unwrap();
        let edit = insert_dict_entry(src, settings, "KEY", "VALUE");
        assert_eq!(
            apply(src, &[edit]).unwrap(),
            "{\n\tsettings = {\n\t\tKEY = VALUE;\n\t};\n}"
        );
    }
}
