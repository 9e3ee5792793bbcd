//! The registers and memory of the machine, and the semantics of every opcode.
//!
//! A [`MachineState`] holds:
//! - `ac`: the accumulator,
//! - `pc`: the index of the next instruction to fetch,
//! - `sp`: the stack pointer, which always lies in `[0, memory size)`,
//! - `mem`: the memory ([`MemArray`]),
//! - a mutation log, which records every register or cell an instruction touched.
//!
//! The stack grows toward lower addresses and is circular over memory:
//! pushing with `sp == 0` writes to the last cell, and popping from the last cell returns `sp` to `0`.

use crate::ast::Word;
use crate::isa::{Opcode, SpecialAddress};

use super::mem::MemArray;
use super::{MachineFlags, SimErrKind};

/// The mutable state of the machine.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MachineState {
    /// The accumulator.
    pub ac: Word,
    /// The program counter.
    pub pc: Word,
    /// The stack pointer. Kept private so it is always normalized.
    sp: usize,
    /// The memory. Its size is fixed at construction.
    mem: MemArray,
    /// Lines describing the mutations since the log was last drained.
    log: Vec<String>,
    halted: bool
}

impl MachineState {
    /// Creates a new machine state.
    ///
    /// Memory is filled according to the flags' [`MachineInitStrategy`],
    /// then every special address is set to its value (e.g., `m[0] := 1`).
    /// All registers start at 0.
    ///
    /// A memory size of 0 is treated as 1.
    ///
    /// [`MachineInitStrategy`]: super::mem::MachineInitStrategy
    pub fn new(flags: &MachineFlags) -> Self {
        let size = flags.memory_size.max(1);
        let mut mem = MemArray::new(size, &mut flags.machine_init.generator());
        for &sa in SpecialAddress::ALL {
            if sa.addr() < size {
                mem[sa.addr()] = sa.value();
            }
        }

        Self { ac: 0, pc: 0, sp: 0, mem, log: vec![], halted: false }
    }

    /// The stack pointer.
    pub fn sp(&self) -> usize {
        self.sp
    }

    /// Sets the stack pointer, normalizing it into `[0, memory size)`.
    pub fn set_sp(&mut self, sp: Word) {
        self.sp = sp.rem_euclid(self.mem.len() as Word) as usize;
    }

    /// The memory.
    pub fn mem(&self) -> &MemArray {
        &self.mem
    }

    /// The memory, as a mutable slice (so its size cannot change).
    pub fn mem_mut(&mut self) -> &mut [Word] {
        self.mem.as_mut_slice()
    }

    /// Whether the machine has halted (either by `END` or by a runtime error).
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Marks the machine as halted.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    /// Takes every line logged since the last drain.
    pub fn drain_log(&mut self) -> std::vec::Drain<'_, String> {
        self.log.drain(..)
    }

    /// Views every line logged since the last drain.
    pub fn log(&self) -> &[String] {
        &self.log
    }

    fn log_ac(&mut self) {
        self.log.push(format!("ac := {}", self.ac));
    }
    /// The stack pointer is logged by its signed offset from the top of memory
    /// (e.g., after a push from 0, `sp := -1`).
    fn log_sp(&mut self) {
        let sp = match self.sp {
            0 => 0,
            sp => sp as Word - self.mem.len() as Word
        };
        self.log.push(format!("sp := {sp}"));
    }
    fn log_mem(&mut self, addr: usize) {
        self.log.push(format!("m[{addr}] := {}", self.mem[addr]));
    }
    fn log_pc(&mut self) {
        self.log.push(format!("pc := {}", self.pc));
    }

    fn push(&mut self, value: Word) {
        self.set_sp(self.sp as Word - 1);
        self.mem[self.sp] = value;
        self.log_sp();
        self.log_mem(self.sp);
    }
    fn pop(&mut self) -> Word {
        let value = self.mem[self.sp];
        self.set_sp(self.sp as Word + 1);
        self.log_sp();
        value
    }

    /// Resolves `sp + x`, failing if it falls outside of memory.
    fn stack_addr(&self, x: Word) -> Result<usize, SimErrKind> {
        self.mem.check((self.sp as Word).wrapping_add(x))
    }

    /// Stores the initial value of an alias.
    pub fn store_init(&mut self, addr: usize, value: Word) -> Result<(), SimErrKind> {
        self.mem.write(addr as Word, value)?;
        self.log_mem(addr);
        Ok(())
    }

    /// Applies the effect of an opcode with its resolved parameter.
    ///
    /// This does not touch `pc` except for jumps, calls, and returns.
    /// The caller is expected to have already advanced `pc` past the instruction.
    ///
    /// If this errors, the state has not been modified.
    pub fn apply(&mut self, op: Opcode, x: Word) -> Result<(), SimErrKind> {
        match op {
            Opcode::LOCO => {
                self.ac = x;
                self.log_ac();
            },
            Opcode::LODD => {
                self.ac = self.mem.read(x)?;
                self.log_ac();
            },
            Opcode::STOD => {
                let a = self.mem.check(x)?;
                self.mem[a] = self.ac;
                self.log_mem(a);
            },
            Opcode::ADDD => {
                let v = self.mem.read(x)?;
                self.log.push(format!("ac += m[{x}]={v}"));
                self.ac = self.ac.wrapping_add(v);
                self.log_ac();
            },
            Opcode::SUBD => {
                let v = self.mem.read(x)?;
                self.log.push(format!("ac -= m[{x}]={v}"));
                self.ac = self.ac.wrapping_sub(v);
                self.log_ac();
            },
            Opcode::LODL => {
                let a = self.stack_addr(x)?;
                self.ac = self.mem[a];
                self.log_ac();
            },
            Opcode::STOL => {
                let a = self.stack_addr(x)?;
                self.mem[a] = self.ac;
                self.log_mem(a);
            },
            Opcode::ADDL => {
                let a = self.stack_addr(x)?;
                let v = self.mem[a];
                self.log.push(format!("ac += m[sp+{x}]={v}"));
                self.ac = self.ac.wrapping_add(v);
                self.log_ac();
            },
            Opcode::SUBL => {
                let a = self.stack_addr(x)?;
                let v = self.mem[a];
                self.log.push(format!("ac -= m[sp+{x}]={v}"));
                self.ac = self.ac.wrapping_sub(v);
                self.log_ac();
            },
            Opcode::PUSH => self.push(self.ac),
            Opcode::POP => {
                self.ac = self.pop();
                self.log_ac();
            },
            Opcode::PSHI => {
                let v = self.mem.read(self.ac)?;
                self.push(v);
            },
            Opcode::POPI => {
                let a = self.mem.check(self.ac)?;
                let v = self.pop();
                self.mem[a] = v;
                self.log_mem(a);
            },
            Opcode::JPOS => self.jump_if(self.ac >= 0, x),
            Opcode::JZER => self.jump_if(self.ac == 0, x),
            Opcode::JNEG => self.jump_if(self.ac < 0, x),
            Opcode::JNZE => self.jump_if(self.ac != 0, x),
            Opcode::JUMP => self.jump_if(true, x),
            Opcode::CALL => {
                self.push(self.pc);
                self.pc = x;
                self.log_pc();
            },
            Opcode::RETN => {
                self.pc = self.pop();
                self.log_pc();
            },
            Opcode::SWAP => {
                let ac = self.ac;
                self.ac = self.sp as Word;
                self.set_sp(ac);
                self.log_ac();
                self.log_sp();
            },
            Opcode::INSP => {
                self.set_sp((self.sp as Word).wrapping_add(x));
                self.log_sp();
            },
            Opcode::DESP => {
                self.set_sp((self.sp as Word).wrapping_sub(x));
                self.log_sp();
            },
        }

        Ok(())
    }

    fn jump_if(&mut self, cond: bool, x: Word) {
        if cond {
            self.pc = x;
            self.log_pc();
        }
    }

    /// Renders the registers, for display in a trace or debugger.
    pub fn registers(&self) -> String {
        format!("ac = {}, pc = {}, sp = {}", self.ac, self.pc, self.sp)
    }
}

#[cfg(test)]
mod tests {
    use crate::isa::Opcode;
    use crate::sim::{MachineFlags, SimErrKind};

    use super::MachineState;

    fn state(memory_size: usize) -> MachineState {
        MachineState::new(&MachineFlags { memory_size, ..Default::default() })
    }

    #[test]
    fn test_new() {
        let st = MachineState::new(&MachineFlags::default());
        assert_eq!(st.mem().len(), 0x10000);
        assert_eq!(st.mem()[0], 1);
        assert_eq!(state(0).mem_mut().len(), 1);
        assert_eq!((st.ac, st.pc, st.sp()), (0, 0, 0));
        assert!(!st.is_halted());
        assert!(st.log().is_empty());
    }

    #[test]
    fn test_push_pop_round_trip() {
        let mut st = state(16);
        st.mem_mut()[15] = 99;
        st.ac = 42;

        st.apply(Opcode::PUSH, 0).unwrap();
        assert_eq!(st.sp(), 15);
        assert_eq!(st.mem[15], 42);
        assert_eq!(st.drain_log().collect::<Vec<_>>(), ["sp := -1", "m[15] := 42"]);

        st.ac = 0;
        st.apply(Opcode::POP, 0).unwrap();
        assert_eq!((st.ac, st.sp()), (42, 0));
        assert_eq!(st.drain_log().collect::<Vec<_>>(), ["sp := 0", "ac := 42"]);

        // PUSH then POP leaves ac and sp unchanged
        for (ac, sp) in [(5, 0), (-3, 7), (1000, 15)] {
            st.ac = ac;
            st.set_sp(sp);
            st.apply(Opcode::PUSH, 0).unwrap();
            st.apply(Opcode::POP, 0).unwrap();
            assert_eq!((st.ac, st.sp()), (ac, sp as usize));
        }
    }

    #[test]
    fn test_sp_closure() {
        let mut st = state(5);
        let ops = [
            (Opcode::PUSH, 0), (Opcode::DESP, 4), (Opcode::POP, 0), (Opcode::INSP, 3),
            (Opcode::PUSH, 0), (Opcode::PUSH, 0), (Opcode::INSP, 4), (Opcode::DESP, 1),
        ];

        for i in 0..500 {
            let (op, x) = ops[i % ops.len()];
            st.apply(op, x).unwrap();
            assert!(st.sp() < 5);
        }

        st.set_sp(-12);
        assert_eq!(st.sp(), 3);
        st.set_sp(12);
        assert_eq!(st.sp(), 2);
    }

    #[test]
    fn test_call_retn() {
        let mut st = state(64);
        // CALL at index 3 (pc already advanced to 4)
        st.pc = 4;
        st.apply(Opcode::CALL, 10).unwrap();
        assert_eq!(st.pc, 10);
        assert_eq!(st.sp(), 63);
        assert_eq!(st.mem[63], 4);

        st.pc = 12;
        st.apply(Opcode::RETN, 0).unwrap();
        assert_eq!(st.pc, 4);
        assert_eq!(st.sp(), 0);
    }

    #[test]
    fn test_direct() {
        let mut st = state(32);
        st.apply(Opcode::LOCO, 7).unwrap();
        st.apply(Opcode::STOD, 20).unwrap();
        st.apply(Opcode::ADDD, 20).unwrap();
        assert_eq!(st.ac, 14);
        st.apply(Opcode::SUBD, 0).unwrap();
        assert_eq!(st.ac, 13);
        st.apply(Opcode::LODD, 20).unwrap();
        assert_eq!(st.ac, 7);

        assert_eq!(st.drain_log().collect::<Vec<_>>(), [
            "ac := 7",
            "m[20] := 7",
            "ac += m[20]=7",
            "ac := 14",
            "ac -= m[0]=1",
            "ac := 13",
            "ac := 7",
        ]);
    }

    #[test]
    fn test_stack_relative() {
        let mut st = state(32);
        st.set_sp(10);
        st.mem_mut()[12] = 5;
        st.apply(Opcode::LODL, 2).unwrap();
        assert_eq!(st.ac, 5);
        st.apply(Opcode::ADDL, 2).unwrap();
        st.apply(Opcode::STOL, 3).unwrap();
        assert_eq!(st.mem[13], 10);
        st.apply(Opcode::SUBL, 2).unwrap();
        assert_eq!(st.ac, 5);

        // out of bounds does not wrap
        st.set_sp(30);
        st.drain_log();
        assert_eq!(st.apply(Opcode::LODL, 2), Err(SimErrKind::MemOutOfBounds { addr: 32 }));
        assert_eq!(st.ac, 5);
        assert!(st.log().is_empty());
    }

    #[test]
    fn test_indirect() {
        let mut st = state(32);
        st.mem_mut()[9] = 77;
        st.ac = 9;
        st.apply(Opcode::PSHI, 0).unwrap();
        assert_eq!((st.sp(), st.mem[31]), (31, 77));

        st.ac = 4;
        st.apply(Opcode::POPI, 0).unwrap();
        assert_eq!((st.sp(), st.mem[4]), (0, 77));

        st.ac = -1;
        assert_eq!(st.apply(Opcode::PSHI, 0), Err(SimErrKind::MemOutOfBounds { addr: -1 }));
        assert_eq!(st.apply(Opcode::POPI, 0), Err(SimErrKind::MemOutOfBounds { addr: -1 }));
        assert_eq!(st.sp(), 0);
    }

    #[test]
    fn test_jumps() {
        let cases = [
            (Opcode::JPOS, [true, true, false]),
            (Opcode::JZER, [false, true, false]),
            (Opcode::JNEG, [false, false, true]),
            (Opcode::JNZE, [true, false, true]),
            (Opcode::JUMP, [true, true, true]),
        ];

        for (op, expected) in cases {
            for (ac, jumps) in [1, 0, -1].into_iter().zip(expected) {
                let mut st = state(8);
                st.ac = ac;
                st.pc = 1;
                st.apply(op, 5).unwrap();
                assert_eq!(st.pc == 5, jumps, "{op} with ac = {ac}");
            }
        }
    }

    #[test]
    fn test_swap() {
        let mut st = state(16);
        st.set_sp(3);
        st.ac = -2;
        st.apply(Opcode::SWAP, 0).unwrap();
        assert_eq!((st.ac, st.sp()), (3, 14));
        assert_eq!(st.drain_log().collect::<Vec<_>>(), ["ac := 3", "sp := -2"]);
    }

    #[test]
    fn test_registers() {
        let mut st = state(16);
        st.ac = -5;
        st.pc = 3;
        st.apply(Opcode::PUSH, 0).unwrap();
        assert_eq!(st.registers(), "ac = -5, pc = 3, sp = 15");
    }

    #[test]
    fn test_wrapping() {
        let mut st = state(8);
        st.ac = i64::MAX;
        st.apply(Opcode::ADDD, 0).unwrap();
        assert_eq!(st.ac, i64::MIN);
    }
}
