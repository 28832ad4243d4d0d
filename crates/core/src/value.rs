//! Value: what Tern programs talk about
//!
//! A Value is either an immediate (none, boolean, integer, float) or a
//! reference to a heap object. References are non-owning handles into the
//! VM-owned heap; the heap itself lives in `tern-runtime`. Two object
//! values are equal exactly when their handles are equal, which is why
//! string interning makes `==` sufficient for string comparison.

use std::fmt;

/// Non-owning reference to a heap object.
///
/// Handles are minted by the heap and index its slot table. They are plain
/// data: copying a handle never copies the object, and a handle does not
/// keep its object alive. Using a handle after the collector has freed the
/// object is a bug in the caller.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjHandle(u32);

impl ObjHandle {
    /// Build a handle from a raw slot index. Reserved for the heap; treat
    /// handles as opaque everywhere else.
    pub fn from_index(index: usize) -> ObjHandle {
        ObjHandle(index as u32)
    }

    /// Slot index this handle refers to.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ObjHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{}", self.0)
    }
}

/// Handle known to refer to an interned string.
///
/// Interning guarantees at most one live string per byte content, so
/// comparing `StringHandle`s compares string content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct StringHandle(ObjHandle);

impl StringHandle {
    /// Wrap a handle the caller has verified to be a string. Minted by the
    /// heap's string constructors.
    pub fn new(handle: ObjHandle) -> StringHandle {
        StringHandle(handle)
    }

    /// The underlying object handle.
    pub fn handle(self) -> ObjHandle {
        self.0
    }
}

impl From<StringHandle> for ObjHandle {
    fn from(s: StringHandle) -> ObjHandle {
        s.0
    }
}

/// The tagged value union.
///
/// 16 bytes: one machine word of payload plus the discriminant. Copy, so
/// stack slots, constants and table entries all pass values by value.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Value {
    /// The absence of a value (`none` literal, uninitialized slots)
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Reference to a heap object (string, function, closure, ...)
    Obj(ObjHandle),
}

impl Value {
    /// The object handle, if this value is an object reference.
    pub fn as_obj(self) -> Option<ObjHandle> {
        match self {
            Value::Obj(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn is_obj(self) -> bool {
        matches!(self, Value::Obj(_))
    }

    pub fn is_none(self) -> bool {
        matches!(self, Value::None)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Float(v)
    }
}

impl From<ObjHandle> for Value {
    fn from(handle: ObjHandle) -> Value {
        Value::Obj(handle)
    }
}

impl From<StringHandle> for Value {
    fn from(s: StringHandle) -> Value {
        Value::Obj(s.handle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn test_value_layout() {
        // Constants pools and table entries store Value inline; keep it at
        // two words (8-byte payload + discriminant with padding).
        assert_eq!(size_of::<Value>(), 16);
        assert_eq!(align_of::<Value>(), 8);
        assert_eq!(size_of::<ObjHandle>(), 4);
    }

    #[test]
    fn test_from_impls() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i64), Value::Int(42));
        assert_eq!(Value::from(2.5f64), Value::Float(2.5));

        let handle = ObjHandle::from_index(7);
        assert_eq!(Value::from(handle), Value::Obj(handle));

        let s = StringHandle::new(handle);
        assert_eq!(Value::from(s), Value::Obj(handle));
    }

    #[test]
    fn test_handle_identity() {
        let a = ObjHandle::from_index(3);
        let b = ObjHandle::from_index(3);
        let c = ObjHandle::from_index(4);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(Value::Obj(a), Value::Obj(b));
        assert_ne!(Value::Obj(a), Value::Obj(c));
    }

    #[test]
    fn test_accessors() {
        let handle = ObjHandle::from_index(0);
        assert_eq!(Value::Obj(handle).as_obj(), Some(handle));
        assert_eq!(Value::Int(1).as_obj(), None);
        assert!(Value::None.is_none());
        assert!(!Value::Bool(false).is_none());
        assert!(Value::Obj(handle).is_obj());
    }
}
