//! Side-effect-free value printing
//!
//! Renders any Value for diagnostic output without allocating on the
//! object heap and without running user code, so the collector and the
//! disassembler can call it at any point. Output goes to a caller-supplied
//! sink, never to stdout.

use crate::heap::Heap;
use crate::object::Object;
use std::io::{self, Write};
use tern_core::{StringHandle, Value};

/// Write the diagnostic rendering of `value`.
pub fn write_value<W: Write>(out: &mut W, heap: &Heap, value: Value) -> io::Result<()> {
    match value {
        Value::None => write!(out, "None"),
        Value::Bool(true) => write!(out, "True"),
        Value::Bool(false) => write!(out, "False"),
        Value::Int(i) => write!(out, "{}", i),
        Value::Float(f) => write!(out, "{}", f),
        Value::Obj(handle) => match heap.get(handle) {
            Object::String(string) => write_string_escaped(out, string.as_bytes()),
            Object::Function(function) => match function.name {
                Some(name) => write!(out, "<def {}>", name_lossy(heap, name)),
                None => write!(out, "<module>"),
            },
            Object::Native(_) => write!(out, "<native bind>"),
            Object::Closure(closure) => {
                write!(out, "<closure <def {}>>", function_name(heap, closure.function))
            }
            Object::Upvalue(_) => write!(out, "<upvalue>"),
            Object::Class(class) => write!(out, "<class {}>", name_lossy(heap, class.name)),
            Object::Instance(instance) => {
                let class_name = match heap.get(instance.class) {
                    Object::Class(class) => class.name,
                    other => panic!("instance of a {:?} object", other.kind()),
                };
                write!(out, "<instance of {}>", name_lossy(heap, class_name))
            }
            Object::BoundMethod(bound) => match heap.get(bound.method) {
                Object::Closure(closure) => {
                    write!(out, "<bound <def {}>>", function_name(heap, closure.function))
                }
                Object::Native(_) => write!(out, "<bound <native>>"),
                _ => write!(out, "<bound <unknown>>"),
            },
        },
    }
}

/// Diagnostic type name of a value, used in `(type=...)` annotations.
pub fn type_name(heap: &Heap, value: Value) -> &'static str {
    match value {
        Value::None => "NoneType",
        Value::Bool(_) => "bool",
        Value::Int(_) => "int",
        Value::Float(_) => "float",
        Value::Obj(handle) => match heap.get(handle) {
            Object::String(_) => "str",
            Object::Function(_) => "function",
            Object::Native(_) => "native",
            Object::Closure(_) => "closure",
            Object::Upvalue(_) => "upvalue",
            Object::Class(_) => "class",
            Object::Instance(_) => "instance",
            Object::BoundMethod(_) => "method",
        },
    }
}

/// Double-quoted with control escapes. `\x1b` renders as `\[` so escape
/// sequences stay visible on ANSI terminals; this is a display convenience
/// only, not a parseable escape.
fn write_string_escaped<W: Write>(out: &mut W, bytes: &[u8]) -> io::Result<()> {
    out.write_all(b"\"")?;
    for &byte in bytes {
        match byte {
            b'\n' => out.write_all(b"\\n")?,
            b'\r' => out.write_all(b"\\r")?,
            b'\t' => out.write_all(b"\\t")?,
            b'"' => out.write_all(b"\\\"")?,
            0x1b => out.write_all(b"\\[")?,
            _ => out.write_all(&[byte])?,
        }
    }
    out.write_all(b"\"")
}

fn name_lossy(heap: &Heap, name: StringHandle) -> String {
    String::from_utf8_lossy(heap.string_bytes(name)).into_owned()
}

/// Name of the function behind `handle`, `(unnamed)` for anonymous ones.
fn function_name(heap: &Heap, handle: tern_core::ObjHandle) -> String {
    match heap.get(handle) {
        Object::Function(function) => match function.name {
            Some(name) => name_lossy(heap, name),
            None => "(unnamed)".to_string(),
        },
        other => panic!("closure over a {:?} object", other.kind()),
    }
}
