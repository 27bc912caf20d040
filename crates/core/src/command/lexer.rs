/// A token that borrows its text directly from the source input.
///
/// `text` is always exactly `&input[start..end]`. The `start`/`end` byte
/// offsets are stored alongside for consumers that need numeric positions
/// (spans, in-place substitution).
#[derive(Debug, PartialEq, Eq)]
pub struct Token<'a> {
    /// Borrowed slice of the source input for this token.
    pub text: &'a str,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// `true` when the token started with a quote character.
    pub quoted: bool,
    /// `true` when a quoted token found its closing quote.
    pub terminated: bool,
}

/// Find the byte offset of the first occurrence of `delimiter` outside of
/// quoted sections, or `None` if it never occurs unquoted.
///
/// Both `"` and `'` open a quoted section; SCPI doubles the quote character
/// to escape it, which this scan handles by simply re-toggling.
pub fn find_unquoted(input: &str, delimiter: impl Fn(char) -> bool) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in input.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                } else if delimiter(c) {
                    return Some(i);
                }
            }
        }
    }
    None
}

/// Tokenize an argument remainder into spanned tokens.
///
/// `base` is the byte offset of `input` within the original command string;
/// all token offsets are reported relative to the original. Tokens are
/// separated by commas and runs of whitespace; quoted sections keep their
/// delimiters and may contain separators. Unterminated quotes run to the
/// end of input with `terminated == false`.
pub fn tokenize_args(input: &str, base: usize) -> Vec<Token<'_>> {
    let mut toks = Vec::new();
    let b = input.as_bytes();
    let mut i = 0usize;
    while i < b.len() {
        let c = b[i] as char;
        if c == ',' || c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        if c == '"' || c == '\'' {
            let quote = c;
            i += 1;
            let mut terminated = false;
            while i < b.len() {
                if b[i] as char == quote {
                    i += 1;
                    terminated = true;
                    break;
                }
                i += 1;
            }
            toks.push(Token {
                text: &input[start..i],
                start: base + start,
                end: base + i,
                quoted: true,
                terminated,
            });
        } else {
            // Bare run — stop on separator or quote start.
            i += 1;
            while i < b.len() {
                let ch = b[i] as char;
                if ch == ',' || ch.is_ascii_whitespace() || ch == '"' || ch == '\'' {
                    break;
                }
                i += 1;
            }
            toks.push(Token {
                text: &input[start..i],
                start: base + start,
                end: base + i,
                quoted: false,
                terminated: true,
            });
        }
    }
    toks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_comma_separated() {
        let toks = tokenize_args("CH1,REF2", 0);
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[0].text, "CH1");
        assert_eq!((toks[0].start, toks[0].end), (0, 3));
        assert_eq!(toks[1].text, "REF2");
        assert_eq!((toks[1].start, toks[1].end), (4, 8));
    }

    #[test]
    fn tokenize_with_base_offset() {
        let toks = tokenize_args("ON", 14);
        assert_eq!((toks[0].start, toks[0].end), (14, 16));
    }

    #[test]
    fn tokenize_quoted_keeps_separators_inside() {
        let toks = tokenize_args("\"A, B\",C", 0);
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[0].text, "\"A, B\"");
        assert!(toks[0].quoted && toks[0].terminated);
        assert_eq!(toks[1].text, "C");
    }

    #[test]
    fn tokenize_unterminated_quote() {
        let toks = tokenize_args("\"half", 0);
        assert_eq!(toks.len(), 1);
        assert!(toks[0].quoted);
        assert!(!toks[0].terminated);
        assert_eq!(toks[0].text, "\"half");
    }

    #[test]
    fn find_unquoted_skips_quotes() {
        let s = "\"a b\" c";
        assert_eq!(find_unquoted(s, |c| c.is_ascii_whitespace()), Some(5));
        assert_eq!(find_unquoted("\"a b\"", |c| c.is_ascii_whitespace()), None);
    }
}
