//! Tern Core: bytecode primitives for the Tern runtime
//!
//! This crate holds the data the compiler produces and the interpreter
//! consumes, with no dependency on the object heap:
//!
//! - `value`: the tagged Value union and non-owning object handles
//! - `chunk`: a compiled bytecode unit (code, constants pool, line table)
//! - `opcode`: the instruction catalogue and operand classification
//!
//! Heap-aware pieces (object variants, interning, the disassembler) live in
//! `tern-runtime`, which depends on this crate.

pub mod chunk;
pub mod opcode;
pub mod value;

pub use chunk::{Chunk, LineStart};
pub use opcode::{Op, Operands};
pub use value::{ObjHandle, StringHandle, Value};
