//! Assembling MAC-1 source lines into programs.
//!
//! This module is used to convert source lines into a [`Program`]
//! that can be executed by the simulator.
//!
//! Assembly happens in two passes:
//! 1. **Pass 1**: building the [`SymbolTable`] parses each line in order (see [`crate::parse::parse_line`]),
//!     binding every label to an instruction index and every alias to a memory address.
//! 2. **Pass 2**: building the [`Program`] resolves every parameter against the kind its command requires
//!     and emits the instruction sequence (alias initializers first, then the source instructions).
//!
//! The module notably consists of:
//! - [`assemble`] and [`assemble_str`]: assemble with the standard command table and default flags.
//! - [`Assembler`]: assembles with a given [`CommandTable`] and [`AsmFlags`].
//! - [`SymbolTable`]: the labels and aliases of a program.
//! - [`Program`]: the assembled instruction sequence, which can be executed by the simulator.
//!
//! Every error raised during assembly is an [`AsmErr`], which carries the 1-based line number
//! and the text of the line which caused it. Assembly stops at the first error,
//! and no partial program is returned.

use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use tracing::{debug, debug_span, trace};

use crate::ast::{AliasDecl, CodeLine, Stmt, Word};
use crate::isa::{CommandTable, Opcode, ParamKind, SpecialAddress};
use crate::parse::{parse_line, LexErr};
use crate::sim::MachineFlags;

/// Assembles source lines into a program,
/// using the standard command table and default flags.
///
/// # Example
/// ```
/// use mac1_ensemble::asm::assemble;
///
/// let prog = assemble(&["LOCO 10", "loop: SUBL one", "JNZE loop", "END"]).unwrap();
/// assert_eq!(prog.captions().collect::<Vec<_>>(), [
///     "(0): LOCO 10",
///     "loop(=1): SUBL one",
///     "(2): JNZE loop",
///     "(3): END",
/// ]);
/// ```
pub fn assemble<S: AsRef<str>>(lines: &[S]) -> Result<Program, AsmErr> {
    Assembler::default().assemble(lines)
}

/// Assembles a whole source text (split into lines) into a program,
/// using the standard command table and default flags.
pub fn assemble_str(src: &str) -> Result<Program, AsmErr> {
    let lines: Vec<_> = src.lines().collect();
    assemble(&lines)
}

/// Configuration for the assembler.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct AsmFlags {
    /// The size of the memory the program is assembled for.
    ///
    /// Addresses and stack deltas are checked against this at assembly time.
    ///
    /// This is 65536 by default.
    pub memory_size: usize
}
impl Default for AsmFlags {
    fn default() -> Self {
        Self { memory_size: MachineFlags::DEFAULT_MEMORY_SIZE }
    }
}
impl From<&MachineFlags> for AsmFlags {
    fn from(flags: &MachineFlags) -> Self {
        Self { memory_size: flags.memory_size }
    }
}

/// Kinds of errors that can occur from assembling given source code.
///
/// See [`AsmErr`] for this error type with line information included.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum AsmErrKind {
    /// The line could not be parsed.
    Lex(LexErr),
    /// The mnemonic is not in the command table (holds the canonical mnemonic).
    CommandNotFound(String),
    /// The command requires a parameter but none was given.
    CommandRequiresParameter(&'static str),
    /// The command does not accept a parameter but one was given.
    CommandDoesNotAcceptParameter(&'static str),
    /// A label was declared more than once (pass 1).
    LabelRedefined {
        /// The name of the label.
        name: String,
        /// The line the label was first declared on.
        first_line: usize
    },
    /// An alias was declared more than once, or shares its name with a special address (pass 1).
    AliasRedefined {
        /// The name of the alias.
        name: String,
        /// The line the alias was first declared on (`None` for special addresses).
        first_line: Option<usize>
    },
    /// An alias was declared at an address outside of memory (pass 1).
    AliasAddressOutOfRange(Word),
    /// There is no free memory cell left to allocate an alias to (pass 1).
    NoFreeAddress,
    /// A label was referenced but never declared (pass 2).
    LabelNotFound(String),
    /// A parameter could not be parsed as the kind its command requires (pass 2).
    InvalidParameter {
        /// The parameter as written.
        token: String,
        /// The kind of parameter required.
        kind: ParamKind
    },
    /// A parameter resolved to a value outside of `[0, limit)` (pass 2).
    ParameterOutOfRange {
        /// The resolved value.
        value: Word,
        /// The kind of parameter required.
        kind: ParamKind,
        /// The exclusive upper bound (the memory size).
        limit: usize
    },
    /// A parameter was neither an integer nor a declared alias (pass 2).
    UnresolvedAddress(String),
}
impl std::fmt::Display for AsmErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lex(e) => write!(f, "{e}"),
            Self::CommandNotFound(name) => write!(f, "command '{name}' not found"),
            Self::CommandRequiresParameter(name) => write!(f, "command '{name}' requires a parameter"),
            Self::CommandDoesNotAcceptParameter(name) => write!(f, "command '{name}' does not accept a parameter"),
            Self::LabelRedefined { name, first_line } => write!(f, "label '{name}' was already defined on line #{first_line}"),
            Self::AliasRedefined { name, first_line: Some(l) } => write!(f, "alias '{name}' was already defined on line #{l}"),
            Self::AliasRedefined { name, first_line: None } => write!(f, "alias '{name}' is a special address"),
            Self::AliasAddressOutOfRange(addr) => write!(f, "alias address {addr} is outside of memory"),
            Self::NoFreeAddress => f.write_str("no free address left to allocate alias"),
            Self::LabelNotFound(name) => write!(f, "label '{name}' not found"),
            Self::InvalidParameter { token, kind } => write!(f, "parameter '{token}' is not a valid {kind}"),
            Self::ParameterOutOfRange { value, kind, limit } => write!(f, "{kind} {value} is out of range [0, {limit})"),
            Self::UnresolvedAddress(token) => write!(f, "'{token}' is neither an address nor a declared alias"),
        }
    }
}

/// Error from assembling given source code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AsmErr {
    /// The cause of this error.
    pub kind: AsmErrKind,
    /// The 1-based line number of the line which caused this error.
    pub line_no: usize,
    /// The literal text of the line which caused this error.
    pub line: String
}
impl AsmErr {
    /// Creates a new [`AsmErr`].
    pub fn new(kind: AsmErrKind, line_no: usize, line: &str) -> Self {
        AsmErr { kind, line_no, line: line.to_string() }
    }
}
impl std::fmt::Display for AsmErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line #{} '{}': {}", self.line_no, self.line.trim(), self.kind)
    }
}
impl std::error::Error for AsmErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            AsmErrKind::Lex(e) => Some(e),
            _ => None
        }
    }
}
impl crate::err::Error for AsmErr {
    fn line(&self) -> Option<usize> {
        Some(self.line_no)
    }

    fn help(&self) -> Option<Cow<str>> {
        match &self.kind {
            AsmErrKind::Lex(e) => crate::err::Error::help(e),
            AsmErrKind::CommandNotFound(_) => Some("check the spelling of the mnemonic against the list of known commands".into()),
            AsmErrKind::CommandRequiresParameter(name) => {
                let usage = CommandTable::standard().get(name)?.usage();
                Some(format!("this command is written as `{usage}`").into())
            },
            AsmErrKind::CommandDoesNotAcceptParameter(_) => Some("try removing the parameter".into()),
            AsmErrKind::LabelRedefined { .. } => Some("labels must be unique within a program, try renaming one of the labels".into()),
            AsmErrKind::AliasRedefined { first_line: None, .. } => Some("this name is reserved, try renaming the alias".into()),
            AsmErrKind::AliasRedefined { .. } => Some("aliases must be unique within a program, try renaming one of the aliases".into()),
            AsmErrKind::AliasAddressOutOfRange(_) => Some("the address must be non-negative and less than the memory size".into()),
            AsmErrKind::NoFreeAddress => Some("try giving some aliases an explicit address with `@address`".into()),
            AsmErrKind::LabelNotFound(_) => Some("try declaring this label before an instruction".into()),
            AsmErrKind::InvalidParameter { kind: ParamKind::Constant, .. } => Some("this command requires a decimal integer".into()),
            AsmErrKind::InvalidParameter { .. } => Some("this command requires a decimal integer or an alias".into()),
            AsmErrKind::ParameterOutOfRange { .. } => Some("the value must be non-negative and less than the memory size".into()),
            AsmErrKind::UnresolvedAddress(_) => Some("try declaring this alias with `#alias`".into()),
        }
    }
}

/// A parsed source line, with its 1-based line number.
#[derive(Debug)]
struct SourceLine<'s> {
    line_no: usize,
    text: &'s str,
    stmt: Stmt
}
impl SourceLine<'_> {
    fn err(&self, kind: AsmErrKind) -> AsmErr {
        AsmErr::new(kind, self.line_no, self.text)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
struct LabelData {
    /// The instruction index the label points to.
    index: usize,
    /// The line the label was declared on.
    line: usize
}

/// An alias in a [`SymbolTable`].
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct AliasData {
    /// The name of the alias.
    pub name: String,
    /// The address the alias refers to.
    pub addr: usize,
    /// The initial value of the alias, if it has one.
    pub value: Option<Word>,
    /// The line the alias was declared on (`None` for special addresses).
    pub line: Option<usize>
}

/// The labels and aliases of a program.
///
/// This is computed by the first assembler pass.
///
/// Every special address (e.g., `one`) is registered as an alias before the program's own aliases.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SymbolTable {
    /// A mapping from label names to their instruction index.
    labels: HashMap<String, LabelData>,
    /// Aliases, in declaration order.
    aliases: Vec<AliasData>,
    /// A mapping from alias names to their position in `aliases`.
    alias_index: HashMap<String, usize>
}

impl SymbolTable {
    /// Creates a new symbol table.
    ///
    /// This performs the first assembler pass, parsing each line
    /// and computing the instruction index of every label and the address of every alias.
    /// Lines are handled in order, so the first offending line is the one reported.
    ///
    /// This also returns the parsed lines, for the second pass.
    fn new<'s>(texts: impl IntoIterator<Item=&'s str>, flags: &AsmFlags) -> Result<(Self, Vec<SourceLine<'s>>), AsmErr> {
        fn add_label(
            labels: &mut HashMap<String, LabelData>,
            name: &str,
            index: usize,
            src: &SourceLine
        ) -> Result<(), AsmErr> {
            match labels.entry(name.to_string()) {
                Entry::Occupied(e) => Err(src.err(AsmErrKind::LabelRedefined {
                    name: name.to_string(),
                    first_line: e.get().line
                })),
                Entry::Vacant(e) => {
                    e.insert(LabelData { index, line: src.line_no });
                    Ok(())
                }
            }
        }

        let mut sym = SymbolTable {
            labels: HashMap::new(),
            aliases: vec![],
            alias_index: HashMap::new()
        };
        for &sa in SpecialAddress::ALL {
            sym.push_alias(AliasData { name: sa.name().to_string(), addr: sa.addr(), value: None, line: None });
        }

        let mut lines = vec![];
        // Aliases which need an address allocated (indices into `sym.aliases` and `lines`).
        let mut unallocated: Vec<(usize, usize)> = vec![];
        let mut n_inits = 0;
        let mut counter = 0;

        for (i, text) in texts.into_iter().enumerate() {
            let line_no = i + 1;
            let stmt = parse_line(text)
                .map_err(|e| AsmErr::new(AsmErrKind::Lex(e), line_no, text))?
                .stmt;
            let src = SourceLine { line_no, text, stmt };

            match &src.stmt {
                Stmt::Empty => {},
                Stmt::Alias(decl) => {
                    if let Some(&i) = sym.alias_index.get(&decl.name) {
                        return Err(src.err(AsmErrKind::AliasRedefined {
                            name: decl.name.clone(),
                            first_line: sym.aliases[i].line
                        }));
                    }

                    let addr = match decl.addr {
                        Some(a) => Some(check_range(a, flags.memory_size)
                            .ok_or_else(|| src.err(AsmErrKind::AliasAddressOutOfRange(a)))?),
                        None => None
                    };

                    let ai = sym.push_alias(AliasData {
                        name: decl.name.clone(),
                        addr: addr.unwrap_or(0),
                        value: decl.value,
                        line: Some(src.line_no)
                    });
                    if addr.is_none() {
                        unallocated.push((ai, lines.len()));
                    }
                    if decl.value.is_some() {
                        n_inits += 1;
                    }
                },
                Stmt::Code(code) => {
                    if let Some(label) = &code.label {
                        add_label(&mut sym.labels, label, counter, &src)?;
                    }
                    if code.has_command() {
                        counter += 1;
                    }
                }
            }
            lines.push(src);
        }
        debug!("parsed {} lines", lines.len());

        // Initializers are placed before every source instruction.
        for data in sym.labels.values_mut() {
            data.index += n_inits;
        }

        // Allocate the aliases declared without an address,
        // skipping every special or explicitly declared address.
        let mut taken: HashSet<_> = SpecialAddress::ALL.iter().map(|sa| sa.addr()).collect();
        let unallocated_set: HashSet<_> = unallocated.iter().map(|&(i, _)| i).collect();
        taken.extend({
            sym.aliases.iter()
                .enumerate()
                .filter(|(i, _)| !unallocated_set.contains(i))
                .map(|(_, a)| a.addr)
        });

        let mut free = (0..flags.memory_size).filter(|a| !taken.contains(a));
        for (ai, li) in unallocated {
            let addr = free.next().ok_or_else(|| lines[li].err(AsmErrKind::NoFreeAddress))?;
            trace!(alias = sym.aliases[ai].name.as_str(), addr, "allocated alias");
            sym.aliases[ai].addr = addr;
        }

        Ok((sym, lines))
    }

    fn push_alias(&mut self, data: AliasData) -> usize {
        let i = self.aliases.len();
        self.alias_index.insert(data.name.clone(), i);
        self.aliases.push(data);
        i
    }

    /// Gets the instruction index of a given label (if it exists).
    ///
    /// Label names are case-sensitive.
    pub fn lookup_label(&self, label: &str) -> Option<usize> {
        self.labels.get(label).map(|data| data.index)
    }

    /// Gets the line a given label was declared on (if it exists).
    pub fn label_line(&self, label: &str) -> Option<usize> {
        self.labels.get(label).map(|data| data.line)
    }

    /// Gets a given alias (if it exists).
    ///
    /// Alias names are case-sensitive. Special addresses (e.g., `one`) are also aliases.
    pub fn lookup_alias(&self, name: &str) -> Option<&AliasData> {
        self.alias_index.get(name).map(|&i| &self.aliases[i])
    }

    /// Gets an iterable of the mapping from labels to instruction indices, ordered by index.
    pub fn label_iter(&self) -> impl Iterator<Item=(&str, usize)> + '_ {
        let mut labels: Vec<_> = self.labels.iter()
            .map(|(name, data)| (name.as_str(), data.index))
            .collect();
        labels.sort_by(|(ln, li), (rn, ri)| li.cmp(ri).then_with(|| ln.cmp(rn)));

        labels.into_iter()
    }

    /// Gets an iterable of all aliases (special addresses first, then in declaration order).
    pub fn alias_iter(&self) -> impl Iterator<Item=&AliasData> + '_ {
        self.aliases.iter()
    }
}

/// Converts a word to an index within `[0, limit)`.
fn check_range(value: Word, limit: usize) -> Option<usize> {
    usize::try_from(value).ok().filter(|&v| v < limit)
}

/// The effect an instruction has when executed.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Effect {
    /// Executes an opcode with a resolved parameter (0 if the opcode takes none).
    Exec(Opcode, Word),
    /// Stores the initial value of an alias into its address.
    Init {
        /// The address of the alias.
        addr: usize,
        /// The initial value of the alias.
        value: Word
    },
    /// Halts the machine (`END`).
    Halt
}

/// An assembled instruction.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Instr {
    /// What this instruction does.
    pub effect: Effect,
    /// A human-readable rendering of this instruction, used for tracing.
    pub caption: String,
    /// The 1-based source line this instruction was assembled from.
    ///
    /// For alias initializers, this is the line of the alias declaration.
    pub line: Option<usize>
}
impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.caption)
    }
}

fn caption(label: Option<&str>, index: usize, name: &str, param: Option<&str>) -> String {
    let mut caption = match label {
        Some(label) => format!("{label}(={index}): {name}"),
        None => format!("({index}): {name}"),
    };
    if let Some(param) = param {
        caption.push(' ');
        caption.push_str(param);
    }
    caption
}

/// Resolves a parameter token against the kind of parameter required.
fn resolve_param(kind: ParamKind, token: Option<&str>, sym: &SymbolTable, flags: &AsmFlags) -> Result<Word, AsmErrKind> {
    let Some(token) = token else { return Ok(0) };

    match kind {
        ParamKind::None => Ok(0),
        ParamKind::Constant => token.parse::<Word>()
            .map_err(|_| AsmErrKind::InvalidParameter { token: token.to_string(), kind }),
        ParamKind::StackDelta | ParamKind::Address => {
            let value = match (token.parse::<Word>(), sym.lookup_alias(token)) {
                (Ok(value), _) => value,
                (Err(_), Some(alias)) => alias.addr as Word,
                // looks like a number, but isn't one
                (Err(_), None) if token.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+') => {
                    return Err(AsmErrKind::InvalidParameter { token: token.to_string(), kind });
                },
                (Err(_), None) => return Err(AsmErrKind::UnresolvedAddress(token.to_string())),
            };

            match check_range(value, flags.memory_size) {
                Some(_) => Ok(value),
                None => Err(AsmErrKind::ParameterOutOfRange { value, kind, limit: flags.memory_size }),
            }
        },
        ParamKind::Label => sym.lookup_label(token)
            .map(|i| i as Word)
            .ok_or_else(|| AsmErrKind::LabelNotFound(token.to_string())),
    }
}

/// An assembled program, which can be executed by the simulator.
///
/// The instruction sequence holds the initializers of every alias with an initial value
/// (in declaration order), followed by every instruction in the source.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Program {
    instrs: Vec<Instr>,
    sym: SymbolTable
}
impl Program {
    /// Creates a new program.
    ///
    /// This performs the second assembler pass,
    /// resolving every parameter and emitting the instruction sequence.
    fn new(lines: &[SourceLine], sym: SymbolTable, commands: &CommandTable, flags: &AsmFlags) -> Result<Self, AsmErr> {
        let mut instrs = vec![];

        for alias in sym.alias_iter() {
            let Some(value) = alias.value else { continue };
            let decl = AliasDecl { name: alias.name.clone(), addr: Some(alias.addr as Word), value: Some(value) };

            instrs.push(Instr {
                effect: Effect::Init { addr: alias.addr, value },
                caption: format!("({}): {decl}", instrs.len()),
                line: alias.line,
            });
        }

        for src in lines {
            let Stmt::Code(CodeLine { label, command: Some(command), param }) = &src.stmt else { continue };
            let index = instrs.len();

            let (effect, name) = match command.eq_ignore_ascii_case(CommandTable::HALT_MNEMONIC) {
                true if param.is_some() => {
                    return Err(src.err(AsmErrKind::CommandDoesNotAcceptParameter(CommandTable::HALT_MNEMONIC)));
                },
                true => (Effect::Halt, CommandTable::HALT_MNEMONIC),
                false => {
                    let cmd = commands.find(command, param.is_some())
                        .map_err(|e| src.err(e))?;
                    let x = resolve_param(cmd.param_kind(), param.as_deref(), &sym, flags)
                        .map_err(|e| src.err(e))?;

                    (Effect::Exec(cmd.opcode, x), cmd.name())
                }
            };

            let caption = caption(label.as_deref(), index, name, param.as_deref());
            trace!(line = src.line_no, caption = caption.as_str(), "emitted instruction");
            instrs.push(Instr { effect, caption, line: Some(src.line_no) });
        }

        Ok(Self { instrs, sym })
    }

    /// The instructions of this program, in execution order.
    pub fn instructions(&self) -> &[Instr] {
        &self.instrs
    }

    /// Gets an iterable of the caption of every instruction.
    pub fn captions(&self) -> impl Iterator<Item=&str> + '_ {
        self.instrs.iter().map(|i| i.caption.as_str())
    }

    /// Gets the instruction at a given index.
    pub fn get(&self, index: usize) -> Option<&Instr> {
        self.instrs.get(index)
    }

    /// The number of instructions in this program.
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    /// Whether this program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// The symbol table computed while assembling this program.
    pub fn symbol_table(&self) -> &SymbolTable {
        &self.sym
    }
}

/// An assembler, which assembles source lines with a given command table and flags.
///
/// # Example
/// ```
/// use mac1_ensemble::asm::{Assembler, AsmErrKind, AsmFlags};
/// use mac1_ensemble::isa::{CommandTable, Opcode};
///
/// // An exercise which only allows loading constants and the stack:
/// let table = CommandTable::new([Opcode::LOCO, Opcode::PUSH, Opcode::POP]);
/// let asm = Assembler::new(&table, AsmFlags { memory_size: 256 });
///
/// assert!(asm.assemble(&["LOCO 1", "PUSH", "END"]).is_ok());
///
/// let err = asm.assemble(&["LOCO 1", "STOD 5"]).unwrap_err();
/// assert_eq!(err.kind, AsmErrKind::CommandNotFound("STOD".into()));
/// assert_eq!(err.line_no, 2);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Assembler<'t> {
    commands: &'t CommandTable,
    flags: AsmFlags
}
impl<'t> Assembler<'t> {
    /// Creates a new assembler.
    pub fn new(commands: &'t CommandTable, flags: AsmFlags) -> Self {
        Self { commands, flags }
    }

    /// The flags this assembler was configured with.
    pub fn flags(&self) -> &AsmFlags {
        &self.flags
    }

    /// Assembles source lines into a program.
    pub fn assemble<S: AsRef<str>>(&self, lines: &[S]) -> Result<Program, AsmErr> {
        let _span = debug_span!("assemble", lines = lines.len()).entered();

        let (sym, lines) = SymbolTable::new(lines.iter().map(AsRef::as_ref), &self.flags)?;
        debug!(labels = sym.labels.len(), aliases = sym.aliases.len(), "pass 1 complete");

        let prog = Program::new(&lines, sym, self.commands, &self.flags)?;
        debug!(instructions = prog.len(), "pass 2 complete");

        Ok(prog)
    }
}
impl Default for Assembler<'static> {
    fn default() -> Self {
        Self::new(CommandTable::standard(), AsmFlags::default())
    }
}

#[cfg(test)]
mod tests {
    use crate::isa::{Opcode, ParamKind};

    use super::*;

    fn assemble_err(src: &str) -> AsmErr {
        assemble_str(src).unwrap_err()
    }

    #[test]
    fn test_captions() {
        let prog = assemble_str("
            #alias counter @100 =5
            start: LODD counter
            loop:
            subl one ; decrement
            JNZE loop
            END
        ").unwrap();

        assert_eq!(prog.captions().collect::<Vec<_>>(), [
            "(0): #alias counter @100 =5",
            "start(=1): LODD counter",
            "(2): SUBL one",
            "(3): JNZE loop",
            "(4): END",
        ]);
        assert_eq!(prog.instructions()[0].line, Some(2));
        assert_eq!(prog.instructions()[2].line, Some(5));
    }

    #[test]
    fn test_effects() {
        let prog = assemble(&["LOCO -3", "PUSH", "x: ADDL 2", "CALL x", "END"]).unwrap();
        let effects: Vec<_> = prog.instructions().iter().map(|i| i.effect).collect();
        assert_eq!(effects, [
            Effect::Exec(Opcode::LOCO, -3),
            Effect::Exec(Opcode::PUSH, 0),
            Effect::Exec(Opcode::ADDL, 2),
            Effect::Exec(Opcode::CALL, 2),
            Effect::Halt,
        ]);
    }

    #[test]
    fn test_labels() {
        // forward references, labels on their own line, and labels past the end
        let prog = assemble_str("
            JUMP skip
            LOCO 1
            skip:
            LOCO 2
            JUMP done
            done:
        ").unwrap();

        let sym = prog.symbol_table();
        assert_eq!(sym.lookup_label("skip"), Some(2));
        assert_eq!(sym.lookup_label("done"), Some(prog.len()));
        assert_eq!(sym.lookup_label("SKIP"), None);
        assert_eq!(sym.label_iter().collect::<Vec<_>>(), [("skip", 2), ("done", 4)]);
        assert_eq!(sym.label_line("skip"), Some(4));
        assert_eq!(sym.label_line("done"), Some(7));
        assert_eq!(sym.label_line("nowhere"), None);
    }

    #[test]
    fn test_label_offset_by_initializers() {
        // initializers run first, even if declared after the labels
        let prog = assemble_str("
            top: LODD a
            JUMP top
            #alias a @10 =1
            #alias b @11 =2
        ").unwrap();

        assert_eq!(prog.symbol_table().lookup_label("top"), Some(2));
        assert_eq!(prog.instructions()[3].effect, Effect::Exec(Opcode::JUMP, 2));
        assert_eq!(prog.captions().collect::<Vec<_>>(), [
            "(0): #alias a @10 =1",
            "(1): #alias b @11 =2",
            "top(=2): LODD a",
            "(3): JUMP top",
        ]);
    }

    #[test]
    fn test_aliases() {
        let prog = assemble_str("
            #alias a
            #alias b @1
            #alias c =7
            LODD a
            LODD b
            LODD c
            LODD one
        ").unwrap();

        let sym = prog.symbol_table();
        let addrs: Vec<_> = sym.alias_iter().map(|a| (a.name.as_str(), a.addr)).collect();
        assert_eq!(addrs, [("one", 0), ("a", 2), ("b", 1), ("c", 3)]);
        assert_eq!(sym.lookup_alias("c").and_then(|a| a.value), Some(7));

        let params: Vec<_> = prog.instructions().iter()
            .filter_map(|i| match i.effect {
                Effect::Exec(Opcode::LODD, x) => Some(x),
                _ => None
            })
            .collect();
        assert_eq!(params, [2, 1, 3, 0]);
    }

    #[test]
    fn test_aliases_with_numeric_prefix() {
        let prog = assemble_str("
            #alias 1st @5
            #alias -x @6
            LODD 1st
            STOD -x
            INSP 1st
        ").unwrap();

        let effects: Vec<_> = prog.instructions().iter().map(|i| i.effect).collect();
        assert_eq!(effects, [
            Effect::Exec(Opcode::LODD, 5),
            Effect::Exec(Opcode::STOD, 6),
            Effect::Exec(Opcode::INSP, 5),
        ]);

        // without a matching alias, these are still malformed numbers
        let err = assemble_err("LODD 1st");
        assert_eq!(err.kind, AsmErrKind::InvalidParameter { token: "1st".into(), kind: ParamKind::Address });
    }

    #[test]
    fn test_no_free_address() {
        let asm = Assembler::new(CommandTable::standard(), AsmFlags { memory_size: 3 });
        assert_eq!(asm.flags().memory_size, 3);
        assert!(asm.assemble(&["#alias a", "#alias b"]).is_ok());

        let err = asm.assemble(&["#alias a", "#alias b", "#alias c"]).unwrap_err();
        assert_eq!(err.kind, AsmErrKind::NoFreeAddress);
        assert_eq!(err.line_no, 3);
    }

    #[test]
    fn test_redefinitions() {
        let err = assemble_err("x: LOCO 1\n\nx: LOCO 2");
        assert_eq!(err.kind, AsmErrKind::LabelRedefined { name: "x".into(), first_line: 1 });
        assert_eq!(err.line_no, 3);
        assert_eq!(err.line, "x: LOCO 2");

        let err = assemble_err("#alias a @5\nLOCO 1\n#alias a @6");
        assert_eq!(err.kind, AsmErrKind::AliasRedefined { name: "a".into(), first_line: Some(1) });
        assert_eq!(err.line_no, 3);

        let err = assemble_err("#alias one @5");
        assert_eq!(err.kind, AsmErrKind::AliasRedefined { name: "one".into(), first_line: None });

        // labels are case-sensitive
        assert!(assemble_str("x: LOCO 1\nX: LOCO 2").is_ok());
    }

    #[test]
    fn test_label_not_found() {
        let err = assemble_err("LOCO 1\nJUMP nowhere\nEND");
        assert_eq!(err.kind, AsmErrKind::LabelNotFound("nowhere".into()));
        assert_eq!(err.line_no, 2);
        assert_eq!(err.to_string(), "Line #2 'JUMP nowhere': label 'nowhere' not found");
    }

    #[test]
    fn test_command_errors() {
        let err = assemble_err("LOCO 1\nFOOP 3");
        assert_eq!(err.kind, AsmErrKind::CommandNotFound("FOOP".into()));
        assert_eq!(err.line_no, 2);

        assert_eq!(assemble_err("LOCO").kind, AsmErrKind::CommandRequiresParameter("LOCO"));
        assert_eq!(assemble_err("PUSH 1").kind, AsmErrKind::CommandDoesNotAcceptParameter("PUSH"));
        assert_eq!(assemble_err("END 5").kind, AsmErrKind::CommandDoesNotAcceptParameter("END"));
        assert!(assemble_str("end").is_ok());
    }

    #[test]
    fn test_param_errors() {
        let limit = 0x10000;
        let cases = [
            ("LOCO ten", AsmErrKind::InvalidParameter { token: "ten".into(), kind: ParamKind::Constant }),
            ("LODD 70000", AsmErrKind::ParameterOutOfRange { value: 70000, kind: ParamKind::Address, limit }),
            ("LODD -1", AsmErrKind::ParameterOutOfRange { value: -1, kind: ParamKind::Address, limit }),
            ("LODL -1", AsmErrKind::ParameterOutOfRange { value: -1, kind: ParamKind::StackDelta, limit }),
            ("DESP 65536", AsmErrKind::ParameterOutOfRange { value: 65536, kind: ParamKind::StackDelta, limit }),
            ("STOD 1x", AsmErrKind::InvalidParameter { token: "1x".into(), kind: ParamKind::Address }),
            ("STOD nope", AsmErrKind::UnresolvedAddress("nope".into())),
        ];

        for (src, kind) in cases {
            let err = assemble_err(src);
            assert_eq!(err.kind, kind, "{src}");
            assert_eq!(err.line_no, 1);
        }

        // LOCO takes any integer
        assert!(assemble_str("LOCO -70000").is_ok());
        assert!(assemble_str("LODD 65535").is_ok());
    }

    #[test]
    fn test_alias_address_out_of_range() {
        let err = assemble_err("#alias far @65536");
        assert_eq!(err.kind, AsmErrKind::AliasAddressOutOfRange(65536));

        let err = assemble_err("#alias neg @-2 =1");
        assert_eq!(err.kind, AsmErrKind::AliasAddressOutOfRange(-2));
    }

    #[test]
    fn test_lex_errors() {
        let err = assemble_err("LOCO 1\nLOCO 1 2");
        assert_eq!(err.kind, AsmErrKind::Lex(LexErr::TooManyTokens));
        assert_eq!(err.line_no, 2);
        assert!(std::error::Error::source(&err).is_some());

        let err = assemble_err("#alias 5 @1");
        assert_eq!(err.kind, AsmErrKind::Lex(LexErr::AliasNameIsInteger));
    }

    #[test]
    fn test_first_error_wins() {
        // a redefinition is reported before a parse error on a later line
        let err = assemble_err("x: LOCO 1\nx: LOCO 2\nLOCO 1 2 3");
        assert_eq!(err.kind, AsmErrKind::LabelRedefined { name: "x".into(), first_line: 1 });
        assert_eq!(err.line_no, 2);

        // and a parse error before a later alias redefinition
        let err = assemble_err("#alias a @1\nLOCO 1 2 3\n#alias a @2");
        assert_eq!(err.kind, AsmErrKind::Lex(LexErr::TooManyTokens));
        assert_eq!(err.line_no, 2);

        // pass 2 errors only surface once every line parses
        let err = assemble_err("JUMP nowhere\nLOCO 1 2");
        assert_eq!(err.kind, AsmErrKind::Lex(LexErr::TooManyTokens));
        assert_eq!(err.line_no, 2);
    }

    #[test]
    fn test_deterministic() {
        let src = "
            #alias n =3
            #alias acc
            LODD n
            loop: JZER done
            PUSH
            SUBL one
            JUMP loop
            done: END
        ";

        let a = assemble_str(src).unwrap();
        let b = assemble_str(src).unwrap();
        assert_eq!(a.len(), b.len());
        assert!(a.captions().eq(b.captions()));
        assert_eq!(a, b);
    }

    #[test]
    fn test_help() {
        use crate::err::Error;

        let err = assemble_err("LODD");
        assert_eq!(err.help().as_deref(), Some("this command is written as `LODD [address]`"));
        assert_eq!(err.line(), Some(1));
    }
}
