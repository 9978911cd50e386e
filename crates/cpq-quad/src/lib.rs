//! The QUAD intermediate representation: a line-oriented three-address
//! code for a stack-free register machine with typed opcodes.

pub mod instruction;
pub mod program;
pub mod resolve;

pub use instruction::{Instruction, Opcode, Operand};
pub use program::{Line, Program};
pub use resolve::resolve_labels;
