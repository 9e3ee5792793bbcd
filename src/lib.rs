//! A MAC-1 parser, assembler, and simulator.
//!
//! This is meant to be a general suite to use MAC-1 assembly,
//! the accumulator/stack teaching machine from Tanenbaum's *Structured Computer Organization*,
//! as a backend for an editor, a trace viewer, or a command-line front end.
//!
//! # Usage
//!
//! To convert MAC-1 source code to a program, it must be assembled:
//! ```
//! use mac1_ensemble::asm::{assemble_str, Program};
//!
//! let code = "
//!     #alias counter @100 =3
//!     LODD counter
//!     loop: SUBL one  ; `one` is always at address 0
//!     JNZE loop
//!     END
//! ";
//!
//! let prog: Program = assemble_str(code).unwrap();
//! assert_eq!(prog.len(), 5);
//! ```
//!
//! Once a program has been assembled, it can be executed with the simulator:
//! ```
//! # use mac1_ensemble::asm::assemble_str;
//! # let prog = assemble_str("LOCO 2\nEND").unwrap();
//! use mac1_ensemble::sim::Simulator;
//!
//! let mut lines: Vec<String> = vec![];
//! let mut simulator = Simulator::new(prog, Default::default(), |line: &str| lines.push(line.to_string()));
//! simulator.run().unwrap(); // <-- Result can be handled accordingly
//! drop(simulator);
//!
//! assert_eq!(lines, ["(0): LOCO 2", "    ac := 2", "(1): END"]);
//! ```
//!
//! If more granularity is needed for simulation, there are also batch and step-in functions.
//! See the [`sim`] module for more details.
#![warn(missing_docs)]

pub mod parse;
pub mod ast;
pub mod isa;
pub mod asm;
pub mod sim;
pub mod err;
