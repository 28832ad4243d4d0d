//! Bytecode disassembler
//!
//! Renders a chunk as a human-readable trace: offset column, source-line
//! gutter, opcode name, decoded operand. Constants are printed through the
//! safe value printer with a trailing type annotation. Output goes to a
//! caller-supplied diagnostic sink.
//!
//! `disassemble_instruction` is the unit-testable primitive: it decodes
//! one instruction and returns the offset of the next. An undefined opcode
//! byte is reported and skipped, so a listing can recover and continue.

use crate::heap::Heap;
use crate::object::Object;
use crate::printer::{type_name, write_value};
use std::io::{self, Write};
use tern_core::{Chunk, Op, Operands};

/// Write the full trace of `chunk`, one instruction per line, preceded by
/// a `[name from filename]` header.
pub fn disassemble_chunk<W: Write>(
    out: &mut W,
    heap: &Heap,
    chunk: &Chunk,
    name: &str,
) -> io::Result<()> {
    let filename = match chunk.filename {
        Some(handle) => String::from_utf8_lossy(heap.string_bytes(handle)).into_owned(),
        None => "?".to_string(),
    };
    writeln!(out, "[{} from {}]", name, filename)?;
    let mut offset = 0;
    while offset < chunk.code.len() {
        offset = disassemble_instruction(out, heap, chunk, offset)?;
    }
    Ok(())
}

/// Decode and print the instruction at `offset`; returns the offset of the
/// next instruction.
pub fn disassemble_instruction<W: Write>(
    out: &mut W,
    heap: &Heap,
    chunk: &Chunk,
    offset: usize,
) -> io::Result<usize> {
    write!(out, "{:04} ", offset)?;
    if offset > 0 && chunk.line_for(offset) == chunk.line_for(offset - 1) {
        write!(out, "   | ")?;
    } else {
        write!(out, "{:4} ", chunk.line_for(offset))?;
    }

    let byte = chunk.code[offset];
    let Some(op) = Op::from_byte(byte) else {
        writeln!(out, "Unknown opcode: {:02x}", byte)?;
        return Ok(offset + 1);
    };

    match op.operands() {
        Operands::None => {
            writeln!(out, "{}", op.name())?;
            Ok(offset + 1)
        }
        Operands::Byte => {
            let operand = chunk.code[offset + 1];
            writeln!(out, "{:<16} {:4}", op.name(), operand)?;
            Ok(offset + 2)
        }
        Operands::Wide => {
            let operand = read_u24(chunk, offset + 1);
            writeln!(out, "{:<16} {:4}", op.name(), operand)?;
            Ok(offset + 4)
        }
        Operands::Constant | Operands::ConstantWide => {
            let size = op.operands().size();
            let index = if size == 1 {
                chunk.code[offset + 1] as usize
            } else {
                read_u24(chunk, offset + 1) as usize
            };
            debug_assert!(index < chunk.constants.len(), "constant index out of range");
            let constant = chunk.constants[index];
            write!(out, "{:<16} {:4} ", op.name(), index)?;
            write_value(out, heap, constant)?;
            writeln!(out, " (type={})", type_name(heap, constant))?;

            let mut next = offset + 1 + size;
            if matches!(op, Op::Closure | Op::ClosureLong) {
                next = write_closure_trailer(out, heap, chunk, constant, next)?;
            }
            Ok(next)
        }
        Operands::Jump => {
            let jump = read_u16(chunk, offset + 1) as usize;
            writeln!(out, "{:<16} {:4} -> {}", op.name(), offset, offset + 3 + jump)?;
            Ok(offset + 3)
        }
        Operands::JumpBack => {
            let jump = read_u16(chunk, offset + 1) as usize;
            writeln!(out, "{:<16} {:4} -> {}", op.name(), offset, offset + 3 - jump)?;
            Ok(offset + 3)
        }
    }
}

/// OP_CLOSURE carries one `(is_local, index)` byte pair per captured
/// variable after its constant operand. Print each pair on its own line
/// and return the offset past the trailer.
fn write_closure_trailer<W: Write>(
    out: &mut W,
    heap: &Heap,
    chunk: &Chunk,
    constant: tern_core::Value,
    mut trailer: usize,
) -> io::Result<usize> {
    let function = constant
        .as_obj()
        .unwrap_or_else(|| panic!("OP_CLOSURE constant is not an object"));
    let count = match heap.get(function) {
        Object::Function(f) => f.upvalue_count as usize,
        other => panic!("OP_CLOSURE constant is a {:?} object", other.kind()),
    };
    for _ in 0..count {
        let is_local = chunk.code[trailer];
        let index = chunk.code[trailer + 1];
        writeln!(
            out,
            "{:04}      |                     {} {}",
            trailer - 2,
            if is_local != 0 { "local" } else { "upvalue" },
            index
        )?;
        trailer += 2;
    }
    Ok(trailer)
}

fn read_u16(chunk: &Chunk, offset: usize) -> u16 {
    ((chunk.code[offset] as u16) << 8) | chunk.code[offset + 1] as u16
}

fn read_u24(chunk: &Chunk, offset: usize) -> u32 {
    ((chunk.code[offset] as u32) << 16)
        | ((chunk.code[offset + 1] as u32) << 8)
        | chunk.code[offset + 2] as u32
}
