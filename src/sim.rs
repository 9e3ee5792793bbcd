//! Simulating and execution for MAC-1 programs.
//!
//! This module is focused on executing assembled programs (i.e., [`Program`]).
//!
//! This module consists of:
//! - [`Simulator`]: The struct that holds a program, the machine state it runs on, and a trace sink.
//! - [`Program::execute_batch`]: The execution engine, which runs a bounded number of instructions.
//! - [`state`]: The module handling registers, memory, and the semantics of each opcode.
//! - [`mem`]: The module handling memory and how it is initialized.
//! - [`sink`]: The module handling where the execution trace is sent.
//!
//! # Usage
//!
//! To simulate some code, you need to assemble it and create a [`Simulator`] with it:
//!
//! ```
//! use mac1_ensemble::asm::assemble;
//! use mac1_ensemble::sim::{Simulator, NullSink};
//!
//! let prog = assemble(&["LOCO 10", "loop: SUBL one", "JNZE loop", "END"]).unwrap();
//! let mut sim = Simulator::new(prog, Default::default(), NullSink);
//! sim.run().unwrap();
//!
//! assert_eq!(sim.state.ac, 0);
//! assert_eq!(sim.instructions_run, 21);
//! assert!(sim.is_halted());
//! ```
//!
//! ## Flags
//!
//! Here, we define `sim` to have the default flags.
//! We could also configure the machine by editing the flags. For example,
//! if we wish to fill memory with random garbage instead of zeroes, we can edit the flags like so:
//!
//! ```
//! # use mac1_ensemble::asm::assemble;
//! # use mac1_ensemble::sim::{Simulator, MachineFlags, NullSink};
//! use mac1_ensemble::sim::mem::MachineInitStrategy;
//!
//! # let prog = assemble(&["END"]).unwrap();
//! let flags = MachineFlags { machine_init: MachineInitStrategy::Seeded { seed: 1 }, ..Default::default() };
//! let sim = Simulator::new(prog, flags, NullSink);
//! ```
//!
//! All of the available flags can be found in [`MachineFlags`].
//!
//! ## Execution
//!
//! Execution happens in bounded batches,
//! so that a caller (e.g., a UI) can interleave execution with other work without threads.
//! Pausing is simply not running the next batch.
//!
//! - [`Simulator::run_batch`]: runs at most `n` instructions, returning whether the machine halted
//! - [`Simulator::step_in`]: runs exactly one instruction
//! - [`Simulator::run`]: runs until the machine halts
//!
//! ```
//! use mac1_ensemble::asm::assemble;
//! use mac1_ensemble::sim::Simulator;
//!
//! let prog = assemble(&["LOCO 3", "PUSH", "POP", "END"]).unwrap();
//! let mut sim = Simulator::new(prog, Default::default(), Vec::<String>::new());
//!
//! assert_eq!(sim.run_batch(2), Ok(false));
//! assert_eq!(sim.state.sp(), 0xFFFF);
//! assert_eq!(sim.run_batch(100), Ok(true));
//!
//! assert_eq!(sim.into_sink(), [
//!     "(0): LOCO 3",
//!     "    ac := 3",
//!     "(1): PUSH",
//!     "    sp := -1",
//!     "    m[65535] := 3",
//!     "(2): POP",
//!     "    sp := 0",
//!     "    ac := 3",
//!     "(3): END",
//! ]);
//! ```
//!
//! ## Halting
//!
//! The machine halts when:
//! - `END` is executed,
//! - the program counter leaves the program (e.g., by running past the last instruction),
//! - a runtime error occurs (the error is returned once, and the state is left as it was at the failure).
//!
//! Once halted, every batch returns `true` without executing anything.

pub mod mem;
pub mod sink;
pub mod state;

use std::borrow::Cow;

use tracing::{debug, trace};

use crate::asm::{Effect, Program};
use crate::ast::Word;

use self::mem::MachineInitStrategy;
use self::state::MachineState;
pub use self::sink::{LogSink, NullSink};

/// Kinds of errors that can occur during simulation.
///
/// See [`SimErr`] for this error type with the location of the faulting instruction.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum SimErrKind {
    /// A memory access resolved to an address outside of memory.
    MemOutOfBounds {
        /// The resolved address.
        addr: Word
    }
}
impl std::fmt::Display for SimErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimErrKind::MemOutOfBounds { addr } => write!(f, "memory access at {addr} is out of bounds"),
        }
    }
}

/// Errors that can occur during simulation.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct SimErr {
    /// The cause of this error.
    pub kind: SimErrKind,
    /// The index of the instruction that caused this error.
    pub pc: usize,
    /// The caption of the instruction that caused this error.
    pub caption: String
}
impl std::fmt::Display for SimErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "instruction '{}' failed: {}", self.caption, self.kind)
    }
}
impl std::error::Error for SimErr {}
impl crate::err::Error for SimErr {
    fn help(&self) -> Option<Cow<str>> {
        match self.kind {
            SimErrKind::MemOutOfBounds { .. } => Some("check that the stack pointer (or ac, for PSHI/POPI) points where it should".into()),
        }
    }
}

/// Anything that can cause a step to abruptly fail to finish.
enum StepBreak {
    /// `END` was executed.
    Halt,
    /// A simulation error occurred.
    Err(SimErr),
}

/// Configuration flags for the machine.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct MachineFlags {
    /// The number of memory cells.
    ///
    /// This is 65536 by default.
    pub memory_size: usize,

    /// The creation strategy for memory.
    ///
    /// This is used to initialize memory before any special addresses are set.
    /// By default, memory is zeroed.
    pub machine_init: MachineInitStrategy
}
impl MachineFlags {
    /// The default number of memory cells.
    pub const DEFAULT_MEMORY_SIZE: usize = 0x10000;
}
impl Default for MachineFlags {
    fn default() -> Self {
        Self {
            memory_size: Self::DEFAULT_MEMORY_SIZE,
            machine_init: Default::default()
        }
    }
}

/// The indentation applied to mutation lines in the trace.
const LOG_INDENT: &str = "    ";

impl Program {
    /// Whether the machine state is halted relative to this program
    /// (either `END` or an error halted it, or `pc` is outside of the program).
    pub fn is_halted(&self, state: &MachineState) -> bool {
        state.is_halted() || usize::try_from(state.pc).map_or(true, |pc| pc >= self.len())
    }

    /// Executes up to `max` instructions of this program against the machine state,
    /// sending the trace to the sink.
    ///
    /// This returns `Ok(true)` if the machine is halted
    /// and `Ok(false)` if the limit was hit while the machine can still run
    /// (in which case, calling this again resumes execution).
    ///
    /// If an instruction fails, the machine halts and the error is returned.
    ///
    /// # Example
    /// ```
    /// use mac1_ensemble::asm::assemble;
    /// use mac1_ensemble::sim::{MachineFlags, NullSink};
    /// use mac1_ensemble::sim::state::MachineState;
    ///
    /// let prog = assemble(&["#alias counter @100 =5", "LODD counter", "END"]).unwrap();
    /// let mut state = MachineState::new(&MachineFlags::default());
    ///
    /// assert_eq!(prog.execute_batch(&mut state, 1, &mut NullSink), Ok(false));
    /// assert_eq!(state.mem()[100], 5);
    /// assert_eq!(prog.execute_batch(&mut state, 10, &mut NullSink), Ok(true));
    /// assert_eq!(state.ac, 5);
    /// ```
    pub fn execute_batch(&self, state: &mut MachineState, max: u64, sink: &mut impl LogSink) -> Result<bool, SimErr> {
        self.execute_counted(state, max, sink, &mut 0)
    }

    /// Executes like [`Program::execute_batch`],
    /// adding the number of executed instructions (excluding `END`) to `counter`.
    fn execute_counted(&self, state: &mut MachineState, max: u64, sink: &mut impl LogSink, counter: &mut u64) -> Result<bool, SimErr> {
        for _ in 0..max {
            if self.is_halted(state) {
                return Ok(true);
            }

            match self.step(state, sink) {
                Ok(()) => *counter = counter.wrapping_add(1),
                Err(StepBreak::Halt) => {
                    debug!(pc = state.pc, "machine halted");
                    return Ok(true);
                },
                Err(StepBreak::Err(e)) => {
                    debug!(pc = e.pc, error = %e.kind, "machine halted on error");
                    return Err(e);
                }
            }
        }

        Ok(self.is_halted(state))
    }

    /// Executes the instruction at `pc`.
    ///
    /// The caller must have checked that `pc` is within the program.
    fn step(&self, state: &mut MachineState, sink: &mut impl LogSink) -> Result<(), StepBreak> {
        let index = state.pc as usize;
        let instr = &self.instructions()[index];
        state.pc += 1;

        trace!(pc = index, caption = %instr.caption, "step");
        sink.log(&instr.caption);

        let result = match instr.effect {
            Effect::Exec(op, x) => state.apply(op, x),
            Effect::Init { addr, value } => state.store_init(addr, value),
            Effect::Halt => {
                state.halt();
                return Err(StepBreak::Halt);
            }
        };

        for line in state.drain_log() {
            sink.log(&format!("{LOG_INDENT}{line}"));
        }

        result.map_err(|kind| {
            state.halt();
            StepBreak::Err(SimErr { kind, pc: index, caption: instr.caption.clone() })
        })
    }
}

/// Executes MAC-1 programs.
///
/// A simulator holds:
/// - the program,
/// - the machine state the program runs on,
/// - the sink the trace is sent to,
/// - the number of instructions run.
#[derive(Debug)]
pub struct Simulator<S: LogSink = NullSink> {
    program: Program,

    /// The machine state.
    ///
    /// This can be inspected (or edited) between batches.
    pub state: MachineState,

    /// Configuration settings for the machine.
    ///
    /// These are preserved between resets.
    pub flags: MachineFlags,

    /// The number of instructions successfully run since this `Simulator` was initialized
    /// (or last reset).
    ///
    /// `END` is not counted. This can be set to 0 to reset the counter.
    pub instructions_run: u64,

    sink: S
}

impl<S: LogSink> Simulator<S> {
    /// Batch size used by [`Simulator::run`].
    const RUN_BATCH: u64 = 1 << 16;

    /// Creates a new simulator, with a fresh machine state.
    pub fn new(program: Program, flags: MachineFlags, sink: S) -> Self {
        debug!(instructions = program.len(), memory_size = flags.memory_size, "creating simulator");

        Self {
            state: MachineState::new(&flags),
            program,
            flags,
            instructions_run: 0,
            sink
        }
    }

    /// Resets the simulator.
    ///
    /// This creates a fresh machine state, keeping the program, flags, and sink.
    pub fn reset(&mut self) {
        self.state = MachineState::new(&self.flags);
        self.instructions_run = 0;
    }

    /// The program this simulator executes.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The sink the trace is sent to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The sink the trace is sent to.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consumes the simulator, returning its sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Whether the machine has halted.
    pub fn is_halted(&self) -> bool {
        self.program.is_halted(&self.state)
    }

    /// Executes up to `max` instructions.
    ///
    /// See [`Program::execute_batch`].
    pub fn run_batch(&mut self, max: u64) -> Result<bool, SimErr> {
        self.program.execute_counted(&mut self.state, max, &mut self.sink, &mut self.instructions_run)
    }

    /// Execute the program.
    ///
    /// This blocks until the machine halts.
    /// If you would like to limit the number of steps to execute, consider [`Simulator::run_batch`].
    pub fn run(&mut self) -> Result<(), SimErr> {
        while !self.run_batch(Self::RUN_BATCH)? {}
        Ok(())
    }

    /// Simulate one step, executing one instruction.
    ///
    /// This returns whether the machine is halted after the step.
    pub fn step_in(&mut self) -> Result<bool, SimErr> {
        self.run_batch(1)
    }
}
impl From<Program> for Simulator {
    fn from(program: Program) -> Self {
        Simulator::new(program, Default::default(), NullSink)
    }
}
