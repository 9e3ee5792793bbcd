//! The MAC-1 instruction set.
//!
//! This module holds:
//! - [`Opcode`]: every operation the machine supports,
//! - [`ParamKind`]: the kind of parameter each operation requires,
//! - [`CommandTable`]: the registry the assembler looks mnemonics up in,
//! - [`SpecialAddress`]: memory cells which are reserved and pre-initialized by the machine.
//!
//! The effect of each opcode is implemented by [`MachineState::apply`].
//!
//! [`MachineState::apply`]: crate::sim::state::MachineState::apply

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::asm::AsmErrKind;
use crate::ast::Word;

/// The kind of parameter a command requires.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ParamKind {
    /// The command takes no parameter.
    None,
    /// Any signed integer (e.g., `LOCO -7`).
    Constant,
    /// A non-negative offset from the stack pointer, less than the memory size (e.g., `LODL 2`).
    ///
    /// An alias name is also accepted, resolving to its address.
    StackDelta,
    /// A memory address, written either as an integer or as an alias name (e.g., `LODD counter`).
    Address,
    /// A label (e.g., `JUMP loop`).
    Label
}
impl ParamKind {
    /// Whether this kind requires a parameter at all.
    pub fn takes_param(self) -> bool {
        self != ParamKind::None
    }
}
impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamKind::None       => f.write_str("none"),
            ParamKind::Constant   => f.write_str("number"),
            ParamKind::StackDelta => f.write_str("offset"),
            ParamKind::Address    => f.write_str("address"),
            ParamKind::Label      => f.write_str("label"),
        }
    }
}

macro_rules! opcodes {
    ($($(#[$m:meta])* $op:ident: $kind:ident),+ $(,)?) => {
        /// An operation supported by the machine.
        ///
        /// The opcodes are listed in their canonical (registration) order.
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        pub enum Opcode {
            $($(#[$m])* $op),+
        }

        impl Opcode {
            /// All opcodes, in registration order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$op),+];

            /// The canonical (upper-case) mnemonic of this opcode.
            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$op => stringify!($op)),+
                }
            }

            /// The kind of parameter this opcode requires.
            pub fn param_kind(self) -> ParamKind {
                match self {
                    $(Opcode::$op => ParamKind::$kind),+
                }
            }
        }
    };
}
opcodes! {
    /// `ac := x`
    LOCO: Constant,
    /// `ac := ac - m[sp + x]`
    SUBL: StackDelta,
    /// `ac := ac + m[sp + x]`
    ADDL: StackDelta,
    /// `m[sp + x] := ac`
    STOL: StackDelta,
    /// `ac := m[sp + x]`
    LODL: StackDelta,
    /// `ac := m[x]`
    LODD: Address,
    /// `m[x] := ac`
    STOD: Address,
    /// `ac := ac + m[x]`
    ADDD: Address,
    /// `ac := ac - m[x]`
    SUBD: Address,
    /// `sp := sp - 1; m[sp] := ac`
    PUSH: None,
    /// `ac := m[sp]; sp := sp + 1`
    POP: None,
    /// `sp := sp - 1; m[sp] := m[ac]`
    PSHI: None,
    /// `m[ac] := m[sp]; sp := sp + 1`
    POPI: None,
    /// `if ac >= 0 then pc := x`
    JPOS: Label,
    /// `if ac == 0 then pc := x`
    JZER: Label,
    /// `if ac < 0 then pc := x`
    JNEG: Label,
    /// `if ac != 0 then pc := x`
    JNZE: Label,
    /// `pc := x`
    JUMP: Label,
    /// `sp := sp - 1; m[sp] := pc; pc := x`
    CALL: Label,
    /// `pc := m[sp]; sp := sp + 1`
    RETN: None,
    /// `ac :=: sp`
    SWAP: None,
    /// `sp := sp + y`
    INSP: StackDelta,
    /// `sp := sp - y`
    DESP: StackDelta,
}

impl Opcode {
    /// Finds the opcode with the given mnemonic (case-insensitive).
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        Self::ALL.iter()
            .copied()
            .find(|op| op.name().eq_ignore_ascii_case(name))
    }
}
impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A command registered in a [`CommandTable`].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Command {
    /// The operation this command executes.
    pub opcode: Opcode,
}
impl Command {
    /// The canonical (upper-case) name of this command.
    pub fn name(&self) -> &'static str {
        self.opcode.name()
    }

    /// The kind of parameter this command requires.
    pub fn param_kind(&self) -> ParamKind {
        self.opcode.param_kind()
    }

    /// Whether this command requires a parameter.
    pub fn requires_param(&self) -> bool {
        self.param_kind().takes_param()
    }

    /// Renders how this command is written (e.g., `LODD [address]`, `PUSH`).
    pub fn usage(&self) -> String {
        match self.param_kind() {
            ParamKind::None => self.name().to_string(),
            kind => format!("{} [{kind}]", self.name()),
        }
    }
}

/// The registry of commands the assembler accepts.
///
/// A table is immutable once built.
/// [`CommandTable::standard`] holds the full MAC-1 instruction set and is shared process-wide,
/// but a restricted table (e.g., for an exercise which only allows a subset of instructions)
/// can be built with [`CommandTable::new`].
#[derive(Debug, Clone)]
pub struct CommandTable {
    /// Commands in registration order.
    commands: Vec<Command>,
    /// Index into `commands`, keyed by canonical name.
    by_name: HashMap<&'static str, usize>
}
impl CommandTable {
    /// The terminal marker mnemonic.
    ///
    /// This is not a registered command. The assembler recognizes it before
    /// looking in the table and compiles it to a halt.
    pub const HALT_MNEMONIC: &'static str = "END";

    /// Creates a new command table with the given opcodes.
    ///
    /// Each mnemonic is registered once; repeated opcodes are ignored.
    pub fn new(opcodes: impl IntoIterator<Item=Opcode>) -> Self {
        let mut commands = vec![];
        let mut by_name = HashMap::new();

        for opcode in opcodes {
            by_name.entry(opcode.name()).or_insert_with(|| {
                commands.push(Command { opcode });
                commands.len() - 1
            });
        }

        Self { commands, by_name }
    }

    /// The table holding the full MAC-1 instruction set.
    ///
    /// This is built once and shared for the lifetime of the process.
    pub fn standard() -> &'static CommandTable {
        static STANDARD: OnceLock<CommandTable> = OnceLock::new();

        STANDARD.get_or_init(|| CommandTable::new(Opcode::ALL.iter().copied()))
    }

    /// Gets the command with the given name (case-insensitive), if it is registered.
    pub fn get(&self, name: &str) -> Option<Command> {
        let name = name.to_uppercase();
        self.by_name.get(&*name).map(|&i| self.commands[i])
    }

    /// Searches for the command with the given name (case-insensitive),
    /// checking that it agrees with whether a parameter was provided.
    ///
    /// The name is looked up first. If it is not found, this fails with [`AsmErrKind::CommandNotFound`],
    /// regardless of the parameter. Only then is the arity checked.
    ///
    /// # Example
    /// ```
    /// use mac1_ensemble::isa::{CommandTable, Opcode};
    /// use mac1_ensemble::asm::AsmErrKind;
    ///
    /// let table = CommandTable::standard();
    /// assert_eq!(table.find("lodd", true).map(|c| c.opcode), Ok(Opcode::LODD));
    /// assert!(matches!(table.find("LODD", false), Err(AsmErrKind::CommandRequiresParameter(_))));
    /// assert!(matches!(table.find("PUSH", true), Err(AsmErrKind::CommandDoesNotAcceptParameter(_))));
    /// assert!(matches!(table.find("FOOP", true), Err(AsmErrKind::CommandNotFound(_))));
    /// ```
    pub fn find(&self, name: &str, has_param: bool) -> Result<Command, AsmErrKind> {
        let cmd = self.get(name)
            .ok_or_else(|| AsmErrKind::CommandNotFound(name.to_uppercase()))?;

        match (cmd.requires_param(), has_param) {
            (true, false) => Err(AsmErrKind::CommandRequiresParameter(cmd.name())),
            (false, true) => Err(AsmErrKind::CommandDoesNotAcceptParameter(cmd.name())),
            _ => Ok(cmd),
        }
    }

    /// Gets an iterable of all commands, in registration order.
    ///
    /// This is useful for rendering a "known commands" listing.
    pub fn iter(&self) -> impl Iterator<Item=Command> + '_ {
        self.commands.iter().copied()
    }

    /// The number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the table has no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
impl Default for CommandTable {
    fn default() -> Self {
        CommandTable::standard().clone()
    }
}

/// A reserved memory cell, which the machine initializes on construction
/// and which every program can refer to by name (like an alias) without declaring it.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum SpecialAddress {
    /// The constant-one cell, named `one`.
    One
}
impl SpecialAddress {
    /// All special addresses.
    pub const ALL: &'static [SpecialAddress] = &[SpecialAddress::One];

    /// The name programs use to refer to this cell.
    pub fn name(self) -> &'static str {
        match self {
            SpecialAddress::One => "one",
        }
    }

    /// The address of this cell.
    pub fn addr(self) -> usize {
        match self {
            SpecialAddress::One => 0,
        }
    }

    /// The value this cell holds when the machine is constructed.
    pub fn value(self) -> Word {
        match self {
            SpecialAddress::One => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::asm::AsmErrKind;

    use super::{CommandTable, Opcode, ParamKind};

    #[test]
    fn test_standard_table() {
        let table = CommandTable::standard();
        assert_eq!(table.len(), Opcode::ALL.len());
        assert!(table.iter().map(|c| c.opcode).eq(Opcode::ALL.iter().copied()));

        // every name is upper case and unique
        for cmd in table.iter() {
            assert_eq!(cmd.name(), cmd.name().to_uppercase());
            assert_eq!(table.get(cmd.name()), Some(cmd));
        }
    }

    #[test]
    fn test_case_insensitive() {
        let table = CommandTable::standard();
        for name in ["jnze", "JNZE", "JnZe", "jNZE"] {
            assert_eq!(table.find(name, true).map(|c| c.opcode), Ok(Opcode::JNZE));
        }
        assert_eq!(Opcode::from_mnemonic("swap"), Some(Opcode::SWAP));
        assert_eq!(Opcode::from_mnemonic("end"), None);
    }

    #[test]
    fn test_find_errors() {
        let table = CommandTable::standard();
        assert_eq!(table.find("foop", false), Err(AsmErrKind::CommandNotFound("FOOP".into())));
        assert_eq!(table.find("foop", true), Err(AsmErrKind::CommandNotFound("FOOP".into())));
        assert_eq!(table.find("loco", false), Err(AsmErrKind::CommandRequiresParameter("LOCO")));
        assert_eq!(table.find("retn", true), Err(AsmErrKind::CommandDoesNotAcceptParameter("RETN")));
        // END is not a registered command
        assert_eq!(table.find("END", false), Err(AsmErrKind::CommandNotFound("END".into())));
    }

    #[test]
    fn test_param_kinds() {
        assert_eq!(Opcode::LOCO.param_kind(), ParamKind::Constant);
        for op in [Opcode::LODD, Opcode::STOD, Opcode::ADDD, Opcode::SUBD] {
            assert_eq!(op.param_kind(), ParamKind::Address);
        }
        for op in [Opcode::LODL, Opcode::STOL, Opcode::ADDL, Opcode::SUBL, Opcode::INSP, Opcode::DESP] {
            assert_eq!(op.param_kind(), ParamKind::StackDelta);
        }
        for op in [Opcode::JUMP, Opcode::JPOS, Opcode::JZER, Opcode::JNEG, Opcode::JNZE, Opcode::CALL] {
            assert_eq!(op.param_kind(), ParamKind::Label);
        }
        for op in [Opcode::PUSH, Opcode::POP, Opcode::PSHI, Opcode::POPI, Opcode::RETN, Opcode::SWAP] {
            assert_eq!(op.param_kind(), ParamKind::None);
        }
    }

    #[test]
    fn test_usage() {
        let table = CommandTable::standard();
        let usage: Vec<_> = ["LOCO", "LODL", "STOD", "CALL", "POP"].into_iter()
            .filter_map(|n| table.get(n))
            .map(|c| c.usage())
            .collect();
        assert_eq!(usage, ["LOCO [number]", "LODL [offset]", "STOD [address]", "CALL [label]", "POP"]);
    }

    #[test]
    fn test_restricted_table() {
        let table = CommandTable::new([Opcode::LOCO, Opcode::PUSH, Opcode::LOCO]);
        assert_eq!(table.len(), 2);
        assert!(table.find("LOCO", true).is_ok());
        assert_eq!(table.find("POP", false), Err(AsmErrKind::CommandNotFound("POP".into())));
    }
}
