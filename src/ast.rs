//! Components relating to the parsed representation of MAC-1 source lines.
//!
//! Each source line is parsed into a [`ParsedLine`], which consists of a [`Stmt`]
//! and the comment that followed it (if any).
//!
//! These types are pure data: they hold no source positions.
//! Positions are tracked separately by [`crate::parse::highlight_line`].

use std::fmt::Write as _;

/// A machine word.
///
/// The accumulator, the program counter, the stack pointer, and every memory cell
/// hold a signed integer of this type. All arithmetic on words is wrapping.
pub type Word = i64;

/// A fully parsed source line.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Default)]
pub struct ParsedLine {
    /// The statement held by this line.
    pub stmt: Stmt,
    /// The text of the comment (including its `//` or `;` marker), if present.
    pub comment: Option<String>
}

/// A statement, which is the meaningful (non-comment) part of a source line.
///
/// A line is either an alias declaration or a (possibly labeled) code line. It cannot be both.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Default)]
pub enum Stmt {
    /// A line with no statement (blank or comment-only).
    #[default]
    Empty,
    /// An alias declaration (e.g., `#alias counter @100 =5`).
    Alias(AliasDecl),
    /// A code line (e.g., `loop: SUBL one`, `PUSH`, `end_loop:`).
    Code(CodeLine)
}

/// A code line, consisting of an optional label, mnemonic, and parameter.
///
/// ## Examples
///
/// ```text
/// loop: SUBL one
/// ~~~~  ~~~~ ~~~
/// label cmd  param
///
/// done:
/// ~~~~
/// label (binds to the next instruction)
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Default)]
pub struct CodeLine {
    /// The label declared on this line.
    pub label: Option<String>,
    /// The mnemonic of this line, as written.
    pub command: Option<String>,
    /// The parameter token of this line, as written.
    pub param: Option<String>
}
impl CodeLine {
    /// Whether this line holds an instruction (and thus occupies an instruction slot).
    pub fn has_command(&self) -> bool {
        self.command.is_some()
    }
}

/// An alias declaration, which binds a name to a memory address.
///
/// If the declaration has an initial value, the assembler emits an instruction
/// which stores that value into the address before any other instruction runs.
///
/// ## Examples
///
/// ```text
/// #alias counter @100 =5
///        ~~~~~~~  ~~~  ~
///        name    addr  value
/// #alias tmp
///        ~~~ (address allocated by the assembler)
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct AliasDecl {
    /// The name of the alias. Never a valid integer.
    pub name: String,
    /// The declared address, if one was given.
    pub addr: Option<Word>,
    /// The initial value, if one was given.
    pub value: Option<Word>
}
impl std::fmt::Display for AliasDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#alias {}", self.name)?;
        if let Some(addr) = self.addr {
            write!(f, " @{addr}")?;
        }
        if let Some(value) = self.value {
            write!(f, " ={value}")?;
        }
        Ok(())
    }
}
impl std::fmt::Display for CodeLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut sep = "";
        if let Some(label) = &self.label {
            write!(f, "{label}:")?;
            sep = " ";
        }
        if let Some(cmd) = &self.command {
            write!(f, "{sep}{cmd}")?;
        }
        if let Some(param) = &self.param {
            f.write_char(' ')?;
            f.write_str(param)?;
        }
        Ok(())
    }
}
