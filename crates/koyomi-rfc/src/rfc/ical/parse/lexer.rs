//! Content line lexer for iCalendar (RFC 5545 §3.1).
//!
//! Handles line unfolding and tokenization of content lines.

use std::iter::Peekable;
use std::str::CharIndices;

use super::error::{ParseError, ParseErrorKind, ParseResult};
use crate::rfc::ical::core::{ContentLine, Parameter};

/// Splits input into content lines, merging folded continuations.
///
/// Handles both CRLF and bare LF line endings. Lines starting with SP/HTAB are
/// continuations of the previous line; unfolding removes the line break and
/// the single whitespace character. Returned line numbers are 1-based and
/// point at the first physical line of each content line.
#[must_use]
pub fn split_lines(input: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();

    for (i, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        if let Some(continuation) = line.strip_prefix([' ', '\t']) {
            if let Some((_, prev)) = lines.last_mut() {
                prev.push_str(continuation);
            } else {
                lines.push((i + 1, continuation.to_string()));
            }
        } else {
            lines.push((i + 1, line.to_string()));
        }
    }

    lines
}

/// Parses a single content line.
///
/// Format: `name *(";" param) ":" value`
///
/// ## Errors
/// Returns an error if the line is malformed or contains invalid characters.
pub fn parse_content_line(line: &str, line_num: usize) -> ParseResult<ContentLine> {
    let mut chars = line.char_indices().peekable();
    let mut separator = None;

    while let Some(&(i, c)) = chars.peek() {
        if c == ';' || c == ':' {
            separator = Some((i, c));
            break;
        }
        if !c.is_ascii_alphanumeric() && c != '-' {
            return Err(ParseError::new(
                ParseErrorKind::InvalidPropertyName,
                line_num,
                i + 1,
            ));
        }
        chars.next();
    }

    let Some((name_end, separator)) = separator else {
        return Err(ParseError::new(
            ParseErrorKind::MissingColon,
            line_num,
            line.len(),
        ));
    };

    if name_end == 0 {
        return Err(ParseError::new(
            ParseErrorKind::MissingPropertyName,
            line_num,
            1,
        ));
    }

    let name = line[..name_end].to_ascii_uppercase();
    chars.next(); // consume the separator

    let mut params = Vec::new();
    let colon_pos = if separator == ':' {
        name_end
    } else {
        loop {
            let (param, colon) = parse_parameter(&mut chars, line, line_num)?;
            params.push(param);
            if let Some(colon) = colon {
                break colon;
            }
        }
    };

    Ok(ContentLine {
        name,
        params,
        raw_value: line[colon_pos + 1..].to_string(),
    })
}

/// Parses a single parameter from the character stream.
///
/// Returns the parameter and, if the parameter list ended, the index of the
/// `:` that starts the value.
fn parse_parameter(
    chars: &mut Peekable<CharIndices<'_>>,
    line: &str,
    line_num: usize,
) -> ParseResult<(Parameter, Option<usize>)> {
    let start = chars.peek().map_or(line.len(), |&(i, _)| i);

    let mut name_end = None;
    while let Some(&(i, c)) = chars.peek() {
        chars.next();
        if c == '=' {
            name_end = Some(i);
            break;
        }
        if !c.is_ascii_alphanumeric() && c != '-' {
            return Err(ParseError::new(
                ParseErrorKind::InvalidParameter,
                line_num,
                i + 1,
            ));
        }
    }

    let name_end = match name_end {
        Some(end) if end > start => end,
        _ => {
            return Err(ParseError::new(
                ParseErrorKind::InvalidParameter,
                line_num,
                start + 1,
            ));
        }
    };

    let param_name = &line[start..name_end];

    let mut values = Vec::new();
    loop {
        values.push(parse_param_value(chars, line, line_num)?);

        match chars.next() {
            Some((_, ',')) => {}
            Some((_, ';')) => return Ok((Parameter::with_values(param_name, values), None)),
            Some((i, ':')) => return Ok((Parameter::with_values(param_name, values), Some(i))),
            Some((i, c)) => {
                return Err(
                    ParseError::new(ParseErrorKind::InvalidParameter, line_num, i + 1)
                        .with_context(format!("unexpected character '{c}'")),
                );
            }
            None => {
                return Err(ParseError::new(
                    ParseErrorKind::MissingColon,
                    line_num,
                    line.len(),
                ));
            }
        }
    }
}

/// Parses a parameter value (possibly quoted, with RFC 6868 caret escapes).
fn parse_param_value(
    chars: &mut Peekable<CharIndices<'_>>,
    line: &str,
    line_num: usize,
) -> ParseResult<String> {
    let Some(&(start, first)) = chars.peek() else {
        return Err(ParseError::new(
            ParseErrorKind::InvalidParameter,
            line_num,
            line.len(),
        ));
    };

    if first != '"' {
        let mut end = start;
        while let Some(&(i, c)) = chars.peek() {
            if c == ',' || c == ';' || c == ':' {
                break;
            }
            end = i + c.len_utf8();
            chars.next();
        }
        return Ok(line[start..end].to_string());
    }

    chars.next(); // opening quote
    let mut value = String::new();

    while let Some((_, c)) = chars.next() {
        match c {
            '"' => return Ok(value),
            '^' => match chars.peek() {
                Some(&(_, '^')) => {
                    value.push('^');
                    chars.next();
                }
                Some(&(_, 'n')) => {
                    value.push('\n');
                    chars.next();
                }
                Some(&(_, '\'')) => {
                    value.push('"');
                    chars.next();
                }
                _ => value.push('^'),
            },
            _ => value.push(c),
        }
    }

    Err(ParseError::new(
        ParseErrorKind::UnclosedQuote,
        line_num,
        start + 1,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_unfolds_continuations() {
        let input = "DESCRIPTION:This is a long description\r\n  that continues here\r\nSUMMARY:x\r\n";
        let lines = split_lines(input);
        assert_eq!(
            lines,
            vec![
                (
                    1,
                    "DESCRIPTION:This is a long description that continues here".to_string()
                ),
                (3, "SUMMARY:x".to_string()),
            ]
        );
    }

    #[test]
    fn split_accepts_bare_lf_and_tabs() {
        let lines = split_lines("SUMMARY:First\n\tSecond\n Third\n");
        assert_eq!(lines, vec![(1, "SUMMARY:FirstSecondThird".to_string())]);
    }

    #[test]
    fn content_line_with_params() {
        let cl = parse_content_line(
            "DTSTART;TZID=Europe/Berlin;VALUE=DATE-TIME:20240108T090000",
            4,
        )
        .unwrap();
        assert_eq!(cl.name, "DTSTART");
        assert_eq!(cl.tzid(), Some("Europe/Berlin"));
        assert_eq!(cl.value_type(), Some("DATE-TIME"));
        assert_eq!(cl.raw_value, "20240108T090000");
    }

    #[test]
    fn content_line_value_may_contain_colons() {
        let cl = parse_content_line("URL:https://example.com/a:b", 1).unwrap();
        assert_eq!(cl.raw_value, "https://example.com/a:b");
    }

    #[test]
    fn quoted_param_with_separators() {
        let cl =
            parse_content_line(r#"ATTENDEE;CN="Doe; John: ^'Jr^'":mailto:j@example.com"#, 1)
                .unwrap();
        assert_eq!(cl.param("CN"), Some(r#"Doe; John: "Jr""#));
        assert_eq!(cl.raw_value, "mailto:j@example.com");
    }

    #[test]
    fn empty_value_after_params() {
        let cl = parse_content_line("DESCRIPTION;LANGUAGE=en:", 1).unwrap();
        assert_eq!(cl.raw_value, "");
    }

    #[test]
    fn missing_colon_is_an_error() {
        let err = parse_content_line("SUMMARY", 7).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingColon);
        assert_eq!(err.line, 7);
    }

    #[test]
    fn unclosed_quote_is_an_error() {
        let err = parse_content_line(r#"X-FOO;A="open:value"#, 2).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnclosedQuote);
    }

    #[test]
    fn invalid_name_reports_column() {
        let err = parse_content_line("SUM MARY:x", 3).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidPropertyName);
        assert_eq!(err.column, 4);
    }
}
