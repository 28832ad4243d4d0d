//! Tern Runtime: the object heap and bytecode tooling of the Tern language
//!
//! This crate is the runtime core the interpreter dispatch loop drives:
//! a heap of first-class objects (strings, functions, closures, upvalues,
//! classes, instances, bound methods) threaded on an intrusive list for
//! the external collector, interned-string storage, and the disassembler
//! used for debugging.
//!
//! # Modules
//!
//! - `object`: heap object variants behind the common header
//! - `heap`: allocation, interning, upvalue lifecycle, collector hooks
//! - `table`: string-keyed table (interning set, methods, fields) + sdbm
//! - `printer`: side-effect-free value printing for diagnostics
//! - `debug`: chunk disassembler
//! - `memory_stats`: process-global allocation counters
//! - `diagnostics`: SIGQUIT heap dump
//! - `report`: at-exit report (`TERN_REPORT` env var)

pub mod debug;
pub mod diagnostics;
pub mod heap;
pub mod memory_stats;
pub mod object;
pub mod printer;
pub mod report;
pub mod table;

// Re-export key types and functions
pub use debug::{disassemble_chunk, disassemble_instruction};
pub use heap::{Census, Heap};
pub use object::{
    NativeFn, ObjBoundMethod, ObjClass, ObjClosure, ObjFunction, ObjInstance, ObjKind, ObjNative,
    ObjString, ObjUpvalue, Object, UpvalueState,
};
pub use printer::{type_name, write_value};
pub use table::{Table, hash_bytes};

// The core data crate, re-exported so embedders need one dependency
pub use tern_core::{Chunk, LineStart, ObjHandle, Op, Operands, StringHandle, Value};
