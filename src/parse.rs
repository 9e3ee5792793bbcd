//! Parsing MAC-1 source lines.
//!
//! This module is used to convert raw source lines into [`ParsedLine`]s,
//! which are then assembled by the [`asm`] module.
//!
//! The module notably consists of:
//! - [`parse_line`]: parses one source line into pure data ([`ParsedLine`]).
//! - [`highlight_line`]: tokenizes one source line into positioned [`Segment`]s,
//!     which an editor can use to map fragments back to the source
//!     (e.g., for syntax highlighting). This never fails.
//!
//! The syntax of a line is:
//!
//! ```text
//! [label:] [MNEMONIC [parameter]] [// comment]
//! #alias name [@address] [=value]  [; comment]
//! ```
//!
//! [`asm`]: crate::asm

pub mod lex;

use std::borrow::Cow;
use std::ops::Range;

use logos::Logos;

use crate::ast::{AliasDecl, CodeLine, ParsedLine, Stmt, Word};
use lex::Token;

/// Any errors raised in attempting to tokenize or parse a source line.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub enum LexErr {
    /// A code line had more than two whitespace-delimited tokens (mnemonic and parameter).
    TooManyTokens,
    /// An alias declaration did not match `#alias name [@address] [=value]`.
    MalformedAlias,
    /// An alias name could be parsed as an integer.
    AliasNameIsInteger,
    /// An alias address was not an integer.
    InvalidAliasAddress,
    /// An alias initial value was not an integer.
    InvalidAliasValue,
    /// A colon appeared somewhere other than directly after a leading label.
    MalformedLabel,
    /// A symbol (`@` or `=`) appeared outside of an alias declaration.
    UnexpectedSymbol,
    /// A symbol was used which is not allowed in MAC-1 assembly files.
    #[default]
    InvalidSymbol
}
impl std::fmt::Display for LexErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexErr::TooManyTokens       => f.write_str("parsed line has more than two parts"),
            LexErr::MalformedAlias      => f.write_str("malformed alias declaration"),
            LexErr::AliasNameIsInteger  => f.write_str("alias name cannot be an integer"),
            LexErr::InvalidAliasAddress => f.write_str("alias address is not an integer"),
            LexErr::InvalidAliasValue   => f.write_str("alias value is not an integer"),
            LexErr::MalformedLabel      => f.write_str("malformed label"),
            LexErr::UnexpectedSymbol    => f.write_str("unexpected symbol outside of alias declaration"),
            LexErr::InvalidSymbol       => f.write_str("unrecognized symbol"),
        }
    }
}
impl std::error::Error for LexErr {}
impl crate::err::Error for LexErr {
    fn help(&self) -> Option<Cow<str>> {
        match self {
            LexErr::TooManyTokens       => Some("an instruction consists of a mnemonic and at most one parameter".into()),
            LexErr::MalformedAlias      => Some("aliases are declared as `#alias name [@address] [=value]`".into()),
            LexErr::AliasNameIsInteger  => Some("integer names would be ambiguous with literal addresses; try a name starting with a letter".into()),
            LexErr::InvalidAliasAddress => Some("the address after `@` must be a decimal integer".into()),
            LexErr::InvalidAliasValue   => Some("the value after `=` must be a decimal integer".into()),
            LexErr::MalformedLabel      => Some("a label is a single word followed by a colon at the start of a line".into()),
            LexErr::UnexpectedSymbol    => Some("`@` and `=` can only be used in `#alias` declarations".into()),
            LexErr::InvalidSymbol       => Some("this char does not occur in any token in MAC-1 assembly".into()),
        }
    }
}

/// Parses a single source line.
///
/// # Example
/// ```
/// use mac1_ensemble::parse::parse_line;
/// use mac1_ensemble::ast::{CodeLine, Stmt};
///
/// let line = parse_line("loop: SUBL one // count down").unwrap();
/// assert_eq!(line.stmt, Stmt::Code(CodeLine {
///     label: Some("loop".into()),
///     command: Some("SUBL".into()),
///     param: Some("one".into()),
/// }));
/// assert_eq!(line.comment.as_deref(), Some("// count down"));
/// ```
pub fn parse_line(line: &str) -> Result<ParsedLine, LexErr> {
    let mut tokens = vec![];
    let mut comment = None;

    for (m_token, span) in Token::lexer(line).spanned() {
        match m_token? {
            Token::Comment => comment = Some(line[span].to_string()),
            token => tokens.push(token),
        }
    }

    let stmt = match tokens.is_empty() {
        true => Stmt::Empty,
        false if tokens.contains(&Token::Hash) => Stmt::Alias(parse_alias(&tokens)?),
        false => Stmt::Code(parse_code(&tokens)?),
    };

    Ok(ParsedLine { stmt, comment })
}

fn parse_alias(tokens: &[Token]) -> Result<AliasDecl, LexErr> {
    let [Token::Hash, Token::Word(kw), Token::Word(name), rest @ ..] = tokens else {
        return Err(LexErr::MalformedAlias);
    };
    if !kw.eq_ignore_ascii_case("alias") {
        return Err(LexErr::MalformedAlias);
    }
    if is_integer(name) {
        return Err(LexErr::AliasNameIsInteger);
    }

    let mut addr = None;
    let mut value = None;
    let mut rest = rest;
    loop {
        match rest {
            [] => break,
            [Token::At, Token::Word(a), tail @ ..] if addr.is_none() => {
                addr = Some(a.parse::<Word>().map_err(|_| LexErr::InvalidAliasAddress)?);
                rest = tail;
            },
            [Token::Eq, Token::Word(v), tail @ ..] if value.is_none() => {
                value = Some(v.parse::<Word>().map_err(|_| LexErr::InvalidAliasValue)?);
                rest = tail;
            },
            _ => return Err(LexErr::MalformedAlias)
        }
    }

    Ok(AliasDecl { name: name.clone(), addr, value })
}

/// Whether a token is written as a decimal integer (an optional sign, then only digits),
/// regardless of whether it fits in a [`Word`].
pub fn is_integer(token: &str) -> bool {
    let digits = token.strip_prefix(['+', '-']).unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_code(tokens: &[Token]) -> Result<CodeLine, LexErr> {
    let (label, rest) = match tokens {
        [Token::Word(label), Token::Colon, rest @ ..] => (Some(label.clone()), rest),
        _ => (None, tokens),
    };
    if rest.contains(&Token::Colon) {
        return Err(LexErr::MalformedLabel);
    }

    let words = rest.iter()
        .map(|t| t.as_word().ok_or(LexErr::UnexpectedSymbol))
        .collect::<Result<Vec<_>, _>>()?;

    let (command, param) = match words[..] {
        []           => (None, None),
        [cmd]        => (Some(cmd.to_string()), None),
        [cmd, param] => (Some(cmd.to_string()), Some(param.to_string())),
        _ => return Err(LexErr::TooManyTokens),
    };

    Ok(CodeLine { label, command, param })
}

/// The role of a fragment of a source line.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum SegmentKind {
    /// A label declaration (without its colon).
    Label,
    /// A mnemonic.
    Command,
    /// A parameter.
    Parameter,
    /// A comment (including its marker).
    Comment,
    /// The `alias` keyword of an alias declaration.
    AliasKeyword,
    /// The name of an alias declaration.
    AliasName,
    /// The address of an alias declaration.
    AliasAddress,
    /// The initial value of an alias declaration.
    AliasValue,
    /// Punctuation (`#`, `:`, `@`, `=`).
    Punct,
    /// A fragment which is not valid where it appears.
    Invalid
}

/// A positioned fragment of a source line.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Segment {
    /// What this fragment is.
    pub kind: SegmentKind,
    /// The byte range of the fragment in the line.
    pub span: Range<usize>
}

/// Splits a source line into positioned, classified fragments.
///
/// Unlike [`parse_line`], this never fails: fragments which would cause a parse error
/// are marked as [`SegmentKind::Invalid`], so that a partially-typed line can still be highlighted.
///
/// # Example
/// ```
/// use mac1_ensemble::parse::{highlight_line, SegmentKind};
///
/// let segs = highlight_line("x: LODD 12");
/// let kinds: Vec<_> = segs.iter().map(|s| (s.kind, s.span.clone())).collect();
/// assert_eq!(kinds, [
///     (SegmentKind::Label, 0..1),
///     (SegmentKind::Punct, 1..2),
///     (SegmentKind::Command, 3..7),
///     (SegmentKind::Parameter, 8..10),
/// ]);
/// ```
pub fn highlight_line(line: &str) -> Vec<Segment> {
    let tokens: Vec<_> = Token::lexer(line).spanned().collect();

    let is_alias = matches!(tokens.first(), Some((Ok(Token::Hash), _)));
    let has_label = matches!(&tokens[..], [(Ok(Token::Word(_)), _), (Ok(Token::Colon), _), ..]);

    let mut segments = Vec::with_capacity(tokens.len());
    let mut words_seen = 0;
    let mut prev: Option<&Token> = None;
    for (i, (m_token, span)) in tokens.iter().enumerate() {
        let kind = match m_token {
            Err(_) => SegmentKind::Invalid,
            Ok(Token::Comment) => SegmentKind::Comment,
            Ok(Token::Hash) if is_alias && i == 0 => SegmentKind::Punct,
            Ok(Token::At | Token::Eq) if is_alias => SegmentKind::Punct,
            Ok(Token::Colon) if has_label && i == 1 => SegmentKind::Punct,
            Ok(Token::Hash | Token::At | Token::Eq | Token::Colon) => SegmentKind::Invalid,
            Ok(Token::Word(_)) if is_alias => {
                words_seen += 1;
                match (prev, words_seen) {
                    (Some(Token::At), _) => SegmentKind::AliasAddress,
                    (Some(Token::Eq), _) => SegmentKind::AliasValue,
                    (_, 1) => SegmentKind::AliasKeyword,
                    (_, 2) => SegmentKind::AliasName,
                    _ => SegmentKind::Invalid
                }
            },
            Ok(Token::Word(_)) if has_label && i == 0 => SegmentKind::Label,
            Ok(Token::Word(_)) => {
                words_seen += 1;
                match words_seen {
                    1 => SegmentKind::Command,
                    2 => SegmentKind::Parameter,
                    _ => SegmentKind::Invalid
                }
            },
        };

        prev = m_token.as_ref().ok();
        segments.push(Segment { kind, span: span.clone() });
    }

    segments
}
