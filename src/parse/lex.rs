//! Tokenizing MAC-1 assembly.
//!
//! This module holds the tokens that characterize one line of MAC-1 assembly ([`Token`]).
//! It is used by the parser to turn a source line into a [`Stmt`]
//! and by [`highlight_line`] to map fragments of a line back to their source positions.
//!
//! Source is line-oriented, so unlike most assembly lexers there is no newline token:
//! each line is tokenized on its own.
//!
//! [`Stmt`]: crate::ast::Stmt
//! [`highlight_line`]: crate::parse::highlight_line

use logos::Logos;

use super::LexErr;

/// A unit of information in one line of MAC-1 source code.
#[derive(Debug, Logos, PartialEq, Eq, Clone)]
#[logos(skip r"[ \t\r\n\f]+", error = LexErr)]
pub enum Token {
    /// A comment, which starts with `//` or `;` and spans the remaining part of the line.
    ///
    /// Whichever marker occurs first wins, since the rest of the line is consumed.
    #[regex(r"//[^\n]*")]
    #[regex(r";[^\n]*")]
    Comment,

    /// A `#`, which introduces an alias declaration (e.g., `#alias counter @100 =5`).
    #[token("#")]
    Hash,

    /// A colon, which terminates a label (e.g., `loop:`).
    #[token(":")]
    Colon,

    /// An `@`, which precedes the address of an alias declaration.
    #[token("@")]
    At,

    /// An `=`, which precedes the initial value of an alias declaration.
    #[token("=")]
    Eq,

    /// Any other run of non-whitespace characters.
    ///
    /// This can refer to:
    /// - a mnemonic (e.g., `LOCO`, `jnze`)
    /// - a parameter (e.g., `10`, `-3`, `counter`, `loop`)
    /// - a label or alias name
    /// - the `alias` keyword
    ///
    /// Whether a word is valid in its position is decided by the parser.
    #[regex(r"[^ \t\r\n\f:#;@=/]+", |lx| lx.slice().to_string())]
    Word(String),
}

impl Token {
    /// Gets the word held by this token, if this token is a word.
    pub(crate) fn as_word(&self) -> Option<&str> {
        match self {
            Token::Word(w) => Some(w),
            _ => None
        }
    }
}
