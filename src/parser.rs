// ABOUTME: Reader turning source text into value forms using nom combinators

use crate::errors::{Error, Result, EEOF, EREAD};
use crate::value::Value;
use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char as token_char, multispace1},
    combinator::value,
    multi::many0,
    IResult, Parser,
};

/// Identifier characters: printable, non-whitespace, and not one of the
/// structural tokens.
fn is_id_char(c: char) -> bool {
    !c.is_whitespace() && !c.is_control() && !matches!(c, '(' | ')' | '\'' | '`' | ',' | ';' | '"')
}

/// Parse a line comment (from `;` to end of line)
fn line_comment(input: &str) -> IResult<&str, ()> {
    let (input, _) = token_char(';')(input)?;
    let (input, _) = take_while(|c| c != '\n')(input)?;
    Ok((input, ()))
}

/// Skip whitespace and comments
fn ws_and_comments(input: &str) -> IResult<&str, ()> {
    many0(alt((value((), multispace1), line_comment)))
        .map(|_| ())
        .parse(input)
}

fn skip_ws(input: &str) -> &str {
    match ws_and_comments(input) {
        Ok((rest, ())) => rest,
        Err(_) => input,
    }
}

/// Reads the next form from `input`, returning it with the unconsumed
/// remainder. Premature end of input is `EEOF`; any malformed token is
/// `EREAD`.
fn read_form(input: &str) -> Result<(Value, &str)> {
    let input = skip_ws(input);
    let Some(c) = input.chars().next() else {
        return Err(Error::new(EEOF, "unexpected end of input"));
    };
    match c {
        '(' => read_list(&input[1..]),
        ')' => Err(Error::new(EREAD, "unexpected )")),
        '\'' => {
            let (inner, rest) = read_form(&input[1..])?;
            Ok((Value::Quote(Box::new(inner)), rest))
        }
        '`' => {
            let (inner, rest) = read_form(&input[1..])?;
            Ok((Value::Backquote(Box::new(inner)), rest))
        }
        ',' => {
            let (inner, rest) = read_form(&input[1..])?;
            Ok((Value::Comma(Box::new(inner)), rest))
        }
        '"' => read_string_body(&input[1..]),
        c if is_id_char(c) => read_atom(input),
        _ => Err(Error::new(EREAD, format!("unexpected character {:?}", c))),
    }
}

/// Reads forms until the closing paren. An empty list is nil.
fn read_list(mut input: &str) -> Result<(Value, &str)> {
    let mut items = Vec::new();
    loop {
        input = skip_ws(input);
        if input.is_empty() {
            return Err(Error::new(EEOF, "unterminated list"));
        }
        if let Some(rest) = input.strip_prefix(')') {
            return Ok((Value::list(items), rest));
        }
        let (item, rest) = read_form(input)?;
        items.push(item);
        input = rest;
    }
}

/// Consumes one maximal identifier-character token and classifies it: a
/// token starting with a decimal digit (optionally after `-`) is
/// numeric, everything else is an identifier.
fn read_atom(input: &str) -> Result<(Value, &str)> {
    let (rest, token) = take_while1::<_, _, nom::error::Error<&str>>(is_id_char)(input)
        .map_err(|_| Error::new(EREAD, "malformed token"))?;

    let unsigned = token.strip_prefix('-').unwrap_or(token);
    if !unsigned.starts_with(|c: char| c.is_ascii_digit()) {
        return Ok((Value::id(token), rest));
    }

    // A numeric token with a decimal point is a double, otherwise an
    // integer; integer literals must fit in 32 bits already at read
    // time.
    let value = if token.contains('.') {
        token
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| Error::new(EREAD, format!("malformed number {}", token)))?
    } else {
        let parsed = if let Some(hex) = unsigned.strip_prefix("0x").or_else(|| unsigned.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16)
                .map(|n| if token.starts_with('-') { -n } else { n })
        } else {
            token.parse::<i64>()
        };
        let wide = parsed.map_err(|_| Error::new(EREAD, format!("malformed number {}", token)))?;
        let narrow = i32::try_from(wide)
            .map_err(|_| Error::new(EREAD, format!("integer literal {} out of range", token)))?;
        Value::Int(narrow)
    };
    Ok((value, rest))
}

/// Reads a string literal body (the opening quote is already consumed),
/// processing backslash escapes.
fn read_string_body(input: &str) -> Result<(Value, &str)> {
    let mut out = String::new();
    let mut chars = input.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((Value::string(&out), &input[i + 1..])),
            '\\' => {
                let Some((_, esc)) = chars.next() else {
                    return Err(Error::new(EEOF, "unterminated string"));
                };
                match esc {
                    '\\' => out.push('\\'),
                    '"' => out.push('"'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    '0' => out.push('\0'),
                    'x' => {
                        let hi = chars.next().and_then(|(_, c)| c.to_digit(16));
                        let lo = chars.next().and_then(|(_, c)| c.to_digit(16));
                        match (hi, lo) {
                            (Some(hi), Some(lo)) => {
                                let code = hi * 16 + lo;
                                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                            }
                            _ => {
                                return Err(Error::new(EREAD, "malformed \\x escape"));
                            }
                        }
                    }
                    other => {
                        return Err(Error::new(
                            EREAD,
                            format!("unknown escape \\{}", other),
                        ));
                    }
                }
            }
            c => out.push(c),
        }
    }
    Err(Error::new(EEOF, "unterminated string"))
}

/// Streaming reader yielding one top-level form at a time.
pub struct Reader<'a> {
    input: &'a str,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a str) -> Self {
        Reader { input }
    }

    /// The next top-level form, or `None` at end of input.
    pub fn next_form(&mut self) -> Result<Option<Value>> {
        self.input = skip_ws(self.input);
        if self.input.is_empty() {
            return Ok(None);
        }
        let (form, rest) = read_form(self.input)?;
        self.input = rest;
        Ok(Some(form))
    }
}

/// Reads the first form of `input`, or `None` if it holds only
/// whitespace and comments.
pub fn read_one(input: &str) -> Result<Option<Value>> {
    Reader::new(input).next_form()
}

/// Reads every top-level form of `input`.
pub fn read_all(input: &str) -> Result<Vec<Value>> {
    let mut reader = Reader::new(input);
    let mut forms = Vec::new();
    while let Some(form) = reader.next_form()? {
        forms.push(form);
    }
    Ok(forms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Value {
        read_one(input).unwrap().expect("expected a form")
    }

    #[test]
    fn test_read_integers() {
        assert_eq!(parse("42"), Value::Int(42));
        assert_eq!(parse("-42"), Value::Int(-42));
        assert_eq!(parse("0"), Value::Int(0));
        assert_eq!(parse("0x10"), Value::Int(16));
        assert_eq!(parse("0xff"), Value::Int(255));
        assert_eq!(parse("-0x10"), Value::Int(-16));
        assert_eq!(parse("2147483647"), Value::Int(i32::MAX));
        assert_eq!(parse("-2147483648"), Value::Int(i32::MIN));
    }

    #[test]
    fn test_read_integer_overflow() {
        let err = read_one("2147483648").unwrap_err();
        assert_eq!(err.code, EREAD);
        let err = read_one("0x1ffffffff").unwrap_err();
        assert_eq!(err.code, EREAD);
    }

    #[test]
    fn test_read_doubles() {
        assert_eq!(parse("2.5"), Value::Double(2.5));
        assert_eq!(parse("-2.5"), Value::Double(-2.5));
        assert_eq!(parse("42."), Value::Double(42.0));
    }

    #[test]
    fn test_read_identifiers() {
        assert_eq!(parse("x"), Value::id("x"));
        assert_eq!(parse("foo-bar"), Value::id("foo-bar"));
        assert_eq!(parse("+"), Value::id("+"));
        assert_eq!(parse("\\"), Value::id("\\"));
        assert_eq!(parse("\\\\"), Value::id("\\\\"));
        assert_eq!(parse("-"), Value::id("-"));
        assert_eq!(parse("<="), Value::id("<="));
    }

    #[test]
    fn test_read_strings_with_escapes() {
        assert_eq!(parse(r#""hello""#), Value::string("hello"));
        assert_eq!(parse(r#""""#), Value::string(""));
        assert_eq!(parse(r#""a\nb""#), Value::string("a\nb"));
        assert_eq!(parse(r#""tab\there""#), Value::string("tab\there"));
        assert_eq!(parse(r#""q: \"hi\"""#), Value::string("q: \"hi\""));
        assert_eq!(parse(r#""\x41""#), Value::string("A"));
        assert_eq!(parse(r#""nul\0""#), Value::string("nul\0"));
    }

    #[test]
    fn test_read_string_errors() {
        assert_eq!(read_one(r#""open"#).unwrap_err().code, EEOF);
        assert_eq!(read_one(r#""bad\q""#).unwrap_err().code, EREAD);
        assert_eq!(read_one(r#""bad\xg1""#).unwrap_err().code, EREAD);
    }

    #[test]
    fn test_read_lists() {
        assert_eq!(parse("()"), Value::Nil);
        assert_eq!(
            parse("(1 2 3)"),
            Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(
            parse("(+ 1 (neg 2))"),
            Value::list(vec![
                Value::id("+"),
                Value::Int(1),
                Value::list(vec![Value::id("neg"), Value::Int(2)]),
            ])
        );
    }

    #[test]
    fn test_read_list_errors() {
        assert_eq!(read_one("(1 2").unwrap_err().code, EEOF);
        assert_eq!(read_one(")").unwrap_err().code, EREAD);
    }

    #[test]
    fn test_read_quote_prefixes() {
        assert_eq!(parse("'x"), Value::Quote(Box::new(Value::id("x"))));
        assert_eq!(parse("`x"), Value::Backquote(Box::new(Value::id("x"))));
        assert_eq!(
            parse("`(a ,b)"),
            Value::Backquote(Box::new(Value::list(vec![
                Value::id("a"),
                Value::Comma(Box::new(Value::id("b"))),
            ])))
        );
        assert_eq!(read_one("'").unwrap_err().code, EEOF);
    }

    #[test]
    fn test_comments_and_whitespace() {
        assert_eq!(parse("  ; leading comment\n 42"), Value::Int(42));
        assert_eq!(read_one("; only a comment").unwrap(), None);
        assert_eq!(read_one("   ").unwrap(), None);
        assert_eq!(read_one("").unwrap(), None);
    }

    #[test]
    fn test_streaming_reader() {
        let mut reader = Reader::new("1 (2 3) 'x");
        assert_eq!(reader.next_form().unwrap(), Some(Value::Int(1)));
        assert_eq!(
            reader.next_form().unwrap(),
            Some(Value::list(vec![Value::Int(2), Value::Int(3)]))
        );
        assert_eq!(
            reader.next_form().unwrap(),
            Some(Value::Quote(Box::new(Value::id("x"))))
        );
        assert_eq!(reader.next_form().unwrap(), None);
    }

    #[test]
    fn test_read_print_round_trip_atoms() {
        for src in ["42", "-17", "2.5", "foo", "<=", "\"hi\\nthere\""] {
            let v = parse(src);
            assert_eq!(format!("{}", v), src);
        }
    }
}
