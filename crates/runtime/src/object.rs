//! Heap object variants
//!
//! Every heap allocation is one of these bodies behind a common header
//! (mark flag + intrusive list link, owned by the heap). The variant tag
//! is authoritative: there is no runtime type information beyond it.
//!
//! Bodies are plain data. Construction, linking and interning all happen
//! in `heap`; the interpreter reaches bodies through handles.

use crate::table::Table;
use tern_core::{Chunk, ObjHandle, StringHandle, Value};

/// A routine implemented by the host.
pub type NativeFn = fn(args: &[Value]) -> Value;

/// Variant tag of a heap object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ObjKind {
    String,
    Function,
    Native,
    Closure,
    Upvalue,
    Class,
    Instance,
    BoundMethod,
}

/// Immutable interned byte string.
///
/// Content never changes after construction, and the heap guarantees at
/// most one live string per content, so handle equality is content
/// equality. Strings are byte sequences with no encoding guarantee.
#[derive(Debug)]
pub struct ObjString {
    bytes: Box<[u8]>,
    /// Cached sdbm hash of `bytes`.
    pub hash: u32,
}

impl ObjString {
    pub(crate) fn new(bytes: Box<[u8]>, hash: u32) -> ObjString {
        ObjString { bytes, hash }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Byte count.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A compiled routine: parameters, capture count, and the bytecode body.
/// Immutable once the compiler finishes emitting into `chunk`.
#[derive(Debug)]
pub struct ObjFunction {
    /// Declared parameter count.
    pub arity: u32,
    /// Number of variables the function captures.
    pub upvalue_count: u32,
    /// Absent for a top-level module body.
    pub name: Option<StringHandle>,
    pub chunk: Chunk,
}

/// Host routine, with a flag for implicit receiver binding.
#[derive(Debug)]
pub struct ObjNative {
    pub function: NativeFn,
    pub is_method: bool,
}

/// State of a capture cell. The transition open -> closed is one-way and
/// happens when the owning frame unwinds past the slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UpvalueState {
    /// Points into the owning frame's slot region.
    Open { slot: usize },
    /// Owns the captured value after the frame departed.
    Closed(Value),
}

/// Runtime capture cell for a local variable.
#[derive(Debug)]
pub struct ObjUpvalue {
    pub state: UpvalueState,
    /// Link in the VM's open-upvalue list (descending slot order). Unused
    /// once closed.
    pub next: Option<ObjHandle>,
}

/// A function paired with its resolved captures.
///
/// `upvalues` has exactly `function.upvalue_count` entries. Slots start
/// empty and are filled by the dispatcher from the OP_CLOSURE trailer;
/// a cell captured by several closures is shared between them.
#[derive(Debug)]
pub struct ObjClosure {
    /// Shared: the function is also referenced from the constants pool and
    /// possibly from sibling closures.
    pub function: ObjHandle,
    pub upvalues: Vec<Option<ObjHandle>>,
}

/// User-defined type.
#[derive(Debug)]
pub struct ObjClass {
    pub name: StringHandle,
    /// Source file, for diagnostics.
    pub filename: Option<StringHandle>,
    /// Method name -> closure or native. Populated by OP_METHOD, not at
    /// construction; inheritance copies in later via OP_INHERIT.
    pub methods: Table,
}

/// An instantiation of a class.
#[derive(Debug)]
pub struct ObjInstance {
    pub class: ObjHandle,
    pub fields: Table,
}

/// A method captured together with its receiver.
#[derive(Debug)]
pub struct ObjBoundMethod {
    pub receiver: Value,
    /// Closure or native.
    pub method: ObjHandle,
}

/// Heap object body; the discriminant is the object's kind.
#[derive(Debug)]
pub enum Object {
    String(ObjString),
    Function(ObjFunction),
    Native(ObjNative),
    Closure(ObjClosure),
    Upvalue(ObjUpvalue),
    Class(ObjClass),
    Instance(ObjInstance),
    BoundMethod(ObjBoundMethod),
}

impl Object {
    pub fn kind(&self) -> ObjKind {
        match self {
            Object::String(_) => ObjKind::String,
            Object::Function(_) => ObjKind::Function,
            Object::Native(_) => ObjKind::Native,
            Object::Closure(_) => ObjKind::Closure,
            Object::Upvalue(_) => ObjKind::Upvalue,
            Object::Class(_) => ObjKind::Class,
            Object::Instance(_) => ObjKind::Instance,
            Object::BoundMethod(_) => ObjKind::BoundMethod,
        }
    }

    /// Approximate owned footprint in bytes, for allocation accounting.
    /// Counts the body plus its heap-allocated payload at this moment;
    /// the heap records it at allocation time.
    pub fn byte_count(&self) -> usize {
        use std::mem::size_of;
        let payload = match self {
            Object::String(s) => s.bytes.len(),
            Object::Function(f) => {
                f.chunk.code.capacity()
                    + f.chunk.constants.capacity() * size_of::<Value>()
                    + f.chunk.lines().len() * size_of::<tern_core::LineStart>()
            }
            Object::Native(_) => 0,
            Object::Closure(c) => c.upvalues.capacity() * size_of::<Option<ObjHandle>>(),
            Object::Upvalue(_) => 0,
            Object::Class(c) => c.methods.capacity() * size_of::<(StringHandle, u32, Value)>(),
            Object::Instance(i) => i.fields.capacity() * size_of::<(StringHandle, u32, Value)>(),
            Object::BoundMethod(_) => 0,
        };
        size_of::<Object>() + payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let string = Object::String(ObjString::new(b"x".to_vec().into_boxed_slice(), 0));
        assert_eq!(string.kind(), ObjKind::String);

        let upvalue = Object::Upvalue(ObjUpvalue {
            state: UpvalueState::Open { slot: 0 },
            next: None,
        });
        assert_eq!(upvalue.kind(), ObjKind::Upvalue);
    }

    #[test]
    fn test_string_byte_count_tracks_content() {
        let short = Object::String(ObjString::new(b"ab".to_vec().into_boxed_slice(), 0));
        let long = Object::String(ObjString::new(vec![0u8; 100].into_boxed_slice(), 0));
        assert_eq!(long.byte_count() - short.byte_count(), 98);
    }

    #[test]
    fn test_upvalue_close_transition() {
        let mut upvalue = ObjUpvalue {
            state: UpvalueState::Open { slot: 3 },
            next: None,
        };
        assert_eq!(upvalue.state, UpvalueState::Open { slot: 3 });
        upvalue.state = UpvalueState::Closed(Value::Int(9));
        assert_eq!(upvalue.state, UpvalueState::Closed(Value::Int(9)));
    }
}
