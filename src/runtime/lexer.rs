//! Tokenizer for setup scripts.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_until},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace1, one_of},
    combinator::{map, map_res, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::{many0, many0_count},
    sequence::{pair, tuple},
    IResult,
};

/// Multi-character punctuators first so the longest match wins.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "...", "=>", "==", "!=", "&&", "||", "(", ")", "{", "}", "[", "]", ",", ";",
    ":", ".", "=", "!", "+", "-",
];

/// A piece of a template literal.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateChunk {
    Text(String),
    /// Source of a `${...}` interpolation.
    Code(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Ident(String),
    Str(String),
    Num(f64),
    Template(Vec<TemplateChunk>),
    Punct(&'static str),
}

/// A token and the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: usize,
}

impl Tok {
    pub fn is_punct(&self, p: &str) -> bool {
        matches!(self, Tok::Punct(q) if *q == p)
    }

    pub fn is_ident(&self, name: &str) -> bool {
        matches!(self, Tok::Ident(n) if n == name)
    }

    pub fn describe(&self) -> String {
        match self {
            Tok::Ident(n) => format!("'{n}'"),
            Tok::Str(_) => "string".to_string(),
            Tok::Num(n) => format!("number {n}"),
            Tok::Template(_) => "template literal".to_string(),
            Tok::Punct(p) => format!("'{p}'"),
        }
    }
}

/// Split `source` into tokens, dropping whitespace and comments.
pub fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let mut rest = source;
    let mut tokens = Vec::new();

    loop {
        let (after, _) = trivia(rest).map_err(|_| {
            format!("line {}: unterminated comment", line_at(source, rest))
        })?;
        rest = after;
        if rest.is_empty() {
            return Ok(tokens);
        }

        let line = line_at(source, rest);
        match token(rest) {
            Ok((after, tok)) => {
                tokens.push(Token { tok, line });
                rest = after;
            }
            Err(_) => {
                let found = rest.chars().next().unwrap_or(' ');
                return Err(match found {
                    '"' | '\'' | '`' => format!("line {line}: unterminated string"),
                    other => format!("line {line}: unexpected character '{other}'"),
                });
            }
        }
    }
}

fn line_at(source: &str, rest: &str) -> usize {
    let offset = source.len() - rest.len();
    source[..offset].matches('\n').count() + 1
}

fn trivia(input: &str) -> IResult<&str, usize> {
    many0_count(alt((
        value((), multispace1),
        value((), pair(tag("//"), opt(is_not("\n")))),
        value((), tuple((tag("/*"), take_until("*/"), tag("*/")))),
    )))(input)
}

fn token(input: &str) -> IResult<&str, Tok> {
    alt((
        map(string_literal, Tok::Str),
        map(template_literal, Tok::Template),
        map(number, Tok::Num),
        map(identifier, |s: &str| Tok::Ident(s.to_string())),
        map(punctuator, Tok::Punct),
    ))(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"), tag("$"))),
        many0(alt((alphanumeric1, tag("_"), tag("$")))),
    ))(input)
}

fn number(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        |s: &str| s.parse::<f64>(),
    )(input)
}

fn punctuator(input: &str) -> IResult<&str, &'static str> {
    for p in PUNCTUATORS {
        if let Some(rest) = input.strip_prefix(*p) {
            return Ok((rest, *p));
        }
    }
    Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)))
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

fn string_literal(input: &str) -> IResult<&str, String> {
    let (rest, quote) = one_of("'\"")(input)?;
    let mut out = String::new();
    let mut chars = rest.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) => out.push(unescape(escaped)),
                None => break,
            },
            '\n' => break,
            c if c == quote => return Ok((&rest[i + c.len_utf8()..], out)),
            c => out.push(c),
        }
    }
    Err(nom::Err::Failure(Error::new(input, ErrorKind::Char)))
}

fn template_literal(input: &str) -> IResult<&str, Vec<TemplateChunk>> {
    let (rest, _) = char('`')(input)?;
    let mut chunks = Vec::new();
    let mut text = String::new();
    let mut chars = rest.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) => text.push(unescape(escaped)),
                None => break,
            },
            '`' => {
                if !text.is_empty() {
                    chunks.push(TemplateChunk::Text(text));
                }
                return Ok((&rest[i + 1..], chunks));
            }
            '$' if chars.peek().is_some_and(|(_, n)| *n == '{') => {
                chars.next();
                let start = i + 2;
                let Some(end) = interpolation_end(&rest[start..]) else {
                    break;
                };
                if !text.is_empty() {
                    chunks.push(TemplateChunk::Text(std::mem::take(&mut text)));
                }
                chunks.push(TemplateChunk::Code(rest[start..start + end].to_string()));
                while chars.peek().is_some_and(|(j, _)| *j <= start + end) {
                    chars.next();
                }
            }
            c => text.push(c),
        }
    }
    Err(nom::Err::Failure(Error::new(input, ErrorKind::Char)))
}

/// Byte offset of the `}` closing an interpolation whose body starts `code`.
fn interpolation_end(code: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in code.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(source: &str) -> Vec<Tok> {
        tokenize(source).unwrap().into_iter().map(|t| t.tok).collect()
    }

    #[test]
    fn tokenizes_call_with_strings() {
        assert_eq!(
            toks(r#"tools.files.append("a.txt", 'x\n');"#),
            vec![
                Tok::Ident("tools".into()),
                Tok::Punct("."),
                Tok::Ident("files".into()),
                Tok::Punct("."),
                Tok::Ident("append".into()),
                Tok::Punct("("),
                Tok::Str("a.txt".into()),
                Tok::Punct(","),
                Tok::Str("x\n".into()),
                Tok::Punct(")"),
                Tok::Punct(";"),
            ]
        );
    }

    #[test]
    fn skips_comments_and_tracks_lines() {
        let tokens = tokenize("// header\n/* block\n comment */\nconst x = 1;").unwrap();
        assert_eq!(tokens[0].tok, Tok::Ident("const".into()));
        assert_eq!(tokens[0].line, 4);
    }

    #[test]
    fn longest_punctuator_wins() {
        assert_eq!(
            toks("a === b !== c => d"),
            vec![
                Tok::Ident("a".into()),
                Tok::Punct("==="),
                Tok::Ident("b".into()),
                Tok::Punct("!=="),
                Tok::Ident("c".into()),
                Tok::Punct("=>"),
                Tok::Ident("d".into()),
            ]
        );
    }

    #[test]
    fn template_literal_splits_interpolations() {
        assert_eq!(
            toks("`# ${context.name} ({ ${ {a: 1}.a } })`"),
            vec![Tok::Template(vec![
                TemplateChunk::Text("# ".into()),
                TemplateChunk::Code("context.name".into()),
                TemplateChunk::Text(" ({ ".into()),
                TemplateChunk::Code(" {a: 1}.a ".into()),
                TemplateChunk::Text(" })".into()),
            ])]
        );
    }

    #[test]
    fn numbers_parse() {
        assert_eq!(toks("42 3.5"), vec![Tok::Num(42.0), Tok::Num(3.5)]);
    }

    #[test]
    fn reports_unterminated_string() {
        let err = tokenize("const a = 'oops\n").unwrap_err();
        assert!(err.contains("line 1"));
        assert!(err.contains("unterminated"));
    }

    #[test]
    fn reports_unexpected_character() {
        let err = tokenize("const a = 1;\n#").unwrap_err();
        assert!(err.contains("line 2"));
    }
}
