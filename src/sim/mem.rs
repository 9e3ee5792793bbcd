//! Memory handling for the MAC-1 simulator.
//!
//! This module consists of:
//! - [`MemArray`]: The memory, a flat array of words.
//! - [`WordFiller`]: A source of values to fill fresh memory with.
//! - [`MachineInitStrategy`]: The strategy used to fill fresh memory.

use rand::rngs::StdRng;
use rand::Rng;

use crate::ast::Word;

use super::SimErrKind;

/// Trait that describes types that can be used to create the data for a fresh memory cell.
pub trait WordFiller {
    /// Generate the data.
    fn generate(&mut self) -> Word;
}
impl WordFiller for () {
    /// This creates unseeded, non-deterministic values.
    fn generate(&mut self) -> Word {
        rand::random::<i16>().into()
    }
}
impl WordFiller for Word {
    /// Sets each word to the given value.
    fn generate(&mut self) -> Word {
        *self
    }
}
impl WordFiller for StdRng {
    /// This creates values from the standard random number generator.
    ///
    /// This can be used to create deterministic, seeded values.
    fn generate(&mut self) -> Word {
        self.gen::<i16>().into()
    }
}

/// Strategy used to initialize the memory of a [`MachineState`].
///
/// Random strategies generate values in the 16-bit signed range,
/// which keeps garbage values readable in a trace.
///
/// [`MachineState`]: super::state::MachineState
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum MachineInitStrategy {
    /// Initializes each word randomly and non-deterministically.
    Unseeded,

    /// Initializes each word randomly and deterministically.
    Seeded {
        /// The seed the RNG was initialized with.
        seed: u64
    },

    /// Initializes each word to a known value.
    Known {
        /// The value to initialize each value to.
        value: Word
    }
}
impl Default for MachineInitStrategy {
    fn default() -> Self {
        MachineInitStrategy::Known { value: 0 }
    }
}
impl MachineInitStrategy {
    pub(super) fn generator(&self) -> impl WordFiller {
        use rand::SeedableRng;

        match self {
            MachineInitStrategy::Unseeded => MIGenerator::Unseeded,
            MachineInitStrategy::Seeded { seed } => MIGenerator::Seeded(Box::new(StdRng::seed_from_u64(*seed))),
            MachineInitStrategy::Known { value } => MIGenerator::Known(*value),
        }
    }
}

enum MIGenerator {
    Unseeded,
    Seeded(Box<StdRng>),
    Known(Word)
}
impl WordFiller for MIGenerator {
    fn generate(&mut self) -> Word {
        match self {
            MIGenerator::Unseeded  => ().generate(),
            MIGenerator::Seeded(r) => r.generate(),
            MIGenerator::Known(k)  => k.generate(),
        }
    }
}

/// The machine's memory.
///
/// This is a fixed-size, flat array of words,
/// addressable by any index in `[0, len)`.
/// Its size never changes after construction.
///
/// Memory can be indexed directly with a `usize` (which panics if out of bounds, like a slice),
/// or read and written with [`MemArray::read`] and [`MemArray::write`],
/// which bounds-check a machine-provided address.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct MemArray(Box<[Word]>);

impl MemArray {
    /// Creates a new memory with a provided size and word filler.
    pub fn new(size: usize, filler: &mut impl WordFiller) -> Self {
        Self(std::iter::repeat_with(|| filler.generate()).take(size).collect())
    }

    /// The number of cells in memory.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether memory has no cells.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts an address into an index, failing if it falls outside of memory.
    pub fn check(&self, addr: Word) -> Result<usize, SimErrKind> {
        usize::try_from(addr).ok()
            .filter(|&a| a < self.len())
            .ok_or(SimErrKind::MemOutOfBounds { addr })
    }

    /// Reads the word at the given address.
    pub fn read(&self, addr: Word) -> Result<Word, SimErrKind> {
        self.check(addr).map(|a| self.0[a])
    }

    /// Writes the word at the given address.
    pub fn write(&mut self, addr: Word, value: Word) -> Result<(), SimErrKind> {
        let a = self.check(addr)?;
        self.0[a] = value;
        Ok(())
    }

    /// Gets the word at the given index, if it is in bounds.
    pub fn get(&self, index: usize) -> Option<Word> {
        self.0.get(index).copied()
    }

    /// Views the memory as a slice.
    pub fn as_slice(&self) -> &[Word] {
        &self.0
    }

    /// Views the memory as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [Word] {
        &mut self.0
    }
}
impl std::ops::Index<usize> for MemArray {
    type Output = Word;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}
impl std::ops::IndexMut<usize> for MemArray {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

#[cfg(test)]
mod tests {
    use crate::sim::SimErrKind;

    use super::{MachineInitStrategy, MemArray};

    #[test]
    fn test_bounds() {
        let mut mem = MemArray::new(16, &mut 0i64);
        assert_eq!(mem.len(), 16);
        assert_eq!(mem.read(15), Ok(0));
        assert_eq!(mem.read(16), Err(SimErrKind::MemOutOfBounds { addr: 16 }));
        assert_eq!(mem.read(-1), Err(SimErrKind::MemOutOfBounds { addr: -1 }));

        mem.write(3, -9).unwrap();
        assert_eq!(mem[3], -9);
        assert_eq!(mem.get(3), Some(-9));
        assert_eq!(mem.get(16), None);

        mem.as_mut_slice()[4] = 2;
        assert_eq!(mem.read(4), Ok(2));
        assert_eq!(mem.write(16, 1), Err(SimErrKind::MemOutOfBounds { addr: 16 }));
    }

    #[test]
    fn test_init_strategies() {
        let known = MemArray::new(8, &mut MachineInitStrategy::Known { value: 7 }.generator());
        assert!(known.as_slice().iter().all(|&w| w == 7));

        let seeded = MachineInitStrategy::Seeded { seed: 0xC0FFEE };
        let a = MemArray::new(64, &mut seeded.generator());
        let b = MemArray::new(64, &mut seeded.generator());
        assert_eq!(a, b);
        assert!(a.as_slice().iter().all(|&w| i16::try_from(w).is_ok()));

        let unseeded = MemArray::new(64, &mut MachineInitStrategy::Unseeded.generator());
        assert_eq!(unseeded.len(), 64);
    }
}
