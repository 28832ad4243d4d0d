//! The object heap
//!
//! One `Heap` per VM. It owns every heap object, keyed by non-owning
//! handles, and threads an intrusive singly-linked list through all live
//! objects so the external collector can walk every allocation without a
//! separate root set. Registration is O(1): fresh objects link at the head.
//!
//! The heap also owns the two pieces of collector-visible shared state the
//! constructors maintain:
//!
//! - the string interning table (at most one live string per byte content)
//! - the temp-root stack (values pinned across a possible collection, used
//!   while a fresh string is being published to the interning table)
//!
//! Single-threaded: only the active interpreter mutates the heap, between
//! two instruction dispatches. The collector's mark/sweep
//! policy lives outside; this module supplies the hooks (`mark`, `objects`,
//! `temp_roots`, `sweep`).

use crate::memory_stats;
use crate::object::{
    ObjBoundMethod, ObjClass, ObjClosure, ObjFunction, ObjInstance, ObjKind, ObjNative, ObjString,
    ObjUpvalue, Object, UpvalueState,
};
use crate::table::{Table, hash_bytes};
use tern_core::{Chunk, ObjHandle, StringHandle, Value};

/// Native function pointer, re-exported with the object variants.
pub use crate::object::NativeFn;

/// One heap slot: the common object header plus the variant body.
#[derive(Debug)]
struct ObjNode {
    /// Reserved for the external tracing collector; false at allocation.
    marked: bool,
    /// Intrusive list link to the next heap object.
    next: Option<ObjHandle>,
    /// Footprint recorded at allocation, subtracted again on free.
    footprint: usize,
    body: Object,
}

/// Per-kind object counts, produced by walking the intrusive list.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Census {
    pub strings: usize,
    pub functions: usize,
    pub natives: usize,
    pub closures: usize,
    pub upvalues: usize,
    pub classes: usize,
    pub instances: usize,
    pub bound_methods: usize,
}

impl Census {
    pub fn total(&self) -> usize {
        self.strings
            + self.functions
            + self.natives
            + self.closures
            + self.upvalues
            + self.classes
            + self.instances
            + self.bound_methods
    }
}

#[derive(Debug, Default)]
pub struct Heap {
    slots: Vec<Option<ObjNode>>,
    /// Slot indices reclaimed by `sweep`, reused before the table grows.
    free: Vec<usize>,
    /// Head of the intrusive all-objects list.
    objects: Option<ObjHandle>,
    /// Interning set: every live string, keyed by itself.
    strings: Table,
    /// Values pinned by constructors across potential collection points.
    temp_roots: Vec<Value>,
    /// Head of the open-upvalue list, descending stack-slot order.
    open_upvalues: Option<ObjHandle>,
}

impl Heap {
    pub fn new() -> Heap {
        Heap::default()
    }

    // ------------------------------------------------------------------
    // Allocation and access
    // ------------------------------------------------------------------

    /// Install a fresh object: header initialised, linked at the list
    /// head, footprint recorded.
    fn allocate(&mut self, body: Object) -> ObjHandle {
        let footprint = body.byte_count();
        let node = ObjNode {
            marked: false,
            next: self.objects,
            footprint,
            body,
        };
        let handle = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(node);
                ObjHandle::from_index(index)
            }
            None => {
                self.slots.push(Some(node));
                ObjHandle::from_index(self.slots.len() - 1)
            }
        };
        self.objects = Some(handle);
        memory_stats::record_alloc(footprint);
        handle
    }

    fn node(&self, handle: ObjHandle) -> &ObjNode {
        match self.slots.get(handle.index()) {
            Some(Some(node)) => node,
            _ => panic!("use of dead object handle {:?}", handle),
        }
    }

    fn node_mut(&mut self, handle: ObjHandle) -> &mut ObjNode {
        match self.slots.get_mut(handle.index()) {
            Some(Some(node)) => node,
            _ => panic!("use of dead object handle {:?}", handle),
        }
    }

    pub fn get(&self, handle: ObjHandle) -> &Object {
        &self.node(handle).body
    }

    pub fn get_mut(&mut self, handle: ObjHandle) -> &mut Object {
        &mut self.node_mut(handle).body
    }

    pub fn kind(&self, handle: ObjHandle) -> ObjKind {
        self.get(handle).kind()
    }

    /// The string behind an interned handle.
    pub fn string(&self, handle: StringHandle) -> &ObjString {
        match self.get(handle.handle()) {
            Object::String(string) => string,
            other => panic!("string handle refers to a {:?}", other.kind()),
        }
    }

    pub fn string_bytes(&self, handle: StringHandle) -> &[u8] {
        self.string(handle).as_bytes()
    }

    // ------------------------------------------------------------------
    // String interning
    // ------------------------------------------------------------------

    /// Intern a string, taking ownership of the buffer. On an interning
    /// hit the supplied buffer is released and the existing string
    /// returned.
    pub fn take_string(&mut self, bytes: Vec<u8>) -> StringHandle {
        let hash = hash_bytes(&bytes);
        if let Some(existing) = self.find_interned(&bytes, hash) {
            return existing;
        }
        self.intern_new(bytes.into_boxed_slice(), hash)
    }

    /// Intern a string from borrowed bytes, copying only on a miss.
    pub fn copy_string(&mut self, bytes: &[u8]) -> StringHandle {
        let hash = hash_bytes(bytes);
        if let Some(existing) = self.find_interned(bytes, hash) {
            return existing;
        }
        self.intern_new(bytes.to_vec().into_boxed_slice(), hash)
    }

    /// `copy_string` for str literals; names, filenames, symbols.
    pub fn intern(&mut self, text: &str) -> StringHandle {
        self.copy_string(text.as_bytes())
    }

    fn find_interned(&self, bytes: &[u8], hash: u32) -> Option<StringHandle> {
        let slots = &self.slots;
        self.strings.find_string(bytes, hash, |key| {
            match slots.get(key.handle().index()) {
                Some(Some(node)) => match &node.body {
                    Object::String(string) => string.as_bytes(),
                    other => panic!("interning table key is a {:?}", other.kind()),
                },
                _ => panic!("interning table key {:?} is dead", key),
            }
        })
    }

    fn intern_new(&mut self, bytes: Box<[u8]>, hash: u32) -> StringHandle {
        let handle = self.allocate(Object::String(ObjString::new(bytes, hash)));
        let string = StringHandle::new(handle);
        // Keep the fresh string reachable while it is being published: the
        // table insert may allocate, and a collection at that point must
        // still find it.
        self.push_root(Value::Obj(handle));
        self.strings.set(string, hash, Value::None);
        self.pop_root();
        memory_stats::record_intern();
        string
    }

    /// Number of live interned strings.
    pub fn interned_count(&self) -> usize {
        self.strings.len()
    }

    // ------------------------------------------------------------------
    // Object constructors
    // ------------------------------------------------------------------

    /// Blank function object; the compiler fills in arity, captures, name
    /// and body while emitting.
    pub fn new_function(&mut self) -> ObjHandle {
        self.allocate(Object::Function(ObjFunction {
            arity: 0,
            upvalue_count: 0,
            name: None,
            chunk: Chunk::new(),
        }))
    }

    pub fn new_native(&mut self, function: NativeFn) -> ObjHandle {
        self.allocate(Object::Native(ObjNative {
            function,
            is_method: false,
        }))
    }

    /// Closure over `function`, with the upvalue vector pre-sized to the
    /// declared capture count and empty. The dispatcher fills each slot
    /// from the OP_CLOSURE trailer.
    pub fn new_closure(&mut self, function: ObjHandle) -> ObjHandle {
        let count = match self.get(function) {
            Object::Function(f) => f.upvalue_count as usize,
            other => panic!("closure over a {:?} object", other.kind()),
        };
        self.allocate(Object::Closure(ObjClosure {
            function,
            upvalues: vec![None; count],
        }))
    }

    /// Open capture cell for a frame slot. Most callers want
    /// `capture_upvalue`, which reuses an existing open cell.
    pub fn new_upvalue(&mut self, slot: usize) -> ObjHandle {
        self.allocate(Object::Upvalue(ObjUpvalue {
            state: UpvalueState::Open { slot },
            next: None,
        }))
    }

    /// Class with an empty method table; no inheritance at construction.
    pub fn new_class(&mut self, name: StringHandle) -> ObjHandle {
        self.allocate(Object::Class(ObjClass {
            name,
            filename: None,
            methods: Table::new(),
        }))
    }

    pub fn new_instance(&mut self, class: ObjHandle) -> ObjHandle {
        self.allocate(Object::Instance(ObjInstance {
            class,
            fields: Table::new(),
        }))
    }

    /// Pair a receiver with a callable; nothing is copied.
    pub fn new_bound_method(&mut self, receiver: Value, method: ObjHandle) -> ObjHandle {
        self.allocate(Object::BoundMethod(ObjBoundMethod { receiver, method }))
    }

    // ------------------------------------------------------------------
    // Upvalue lifecycle
    // ------------------------------------------------------------------

    fn upvalue(&self, handle: ObjHandle) -> &ObjUpvalue {
        match self.get(handle) {
            Object::Upvalue(upvalue) => upvalue,
            other => panic!("upvalue handle refers to a {:?}", other.kind()),
        }
    }

    fn upvalue_mut(&mut self, handle: ObjHandle) -> &mut ObjUpvalue {
        match self.get_mut(handle) {
            Object::Upvalue(upvalue) => upvalue,
            other => panic!("upvalue handle refers to a {:?}", other.kind()),
        }
    }

    /// Capture cell for a stack slot. While the frame is live there is at
    /// most one open upvalue per slot: an existing cell is reused, so
    /// every closure capturing the slot shares it. The open list stays in
    /// descending slot order.
    pub fn capture_upvalue(&mut self, slot: usize) -> ObjHandle {
        let mut prev: Option<ObjHandle> = None;
        let mut current = self.open_upvalues;
        while let Some(handle) = current {
            match self.upvalue(handle).state {
                UpvalueState::Open { slot: s } if s > slot => {
                    prev = Some(handle);
                    current = self.upvalue(handle).next;
                }
                _ => break,
            }
        }
        if let Some(handle) = current {
            if self.upvalue(handle).state == (UpvalueState::Open { slot }) {
                return handle;
            }
        }

        let created = self.new_upvalue(slot);
        self.upvalue_mut(created).next = current;
        match prev {
            Some(prev) => self.upvalue_mut(prev).next = Some(created),
            None => self.open_upvalues = Some(created),
        }
        created
    }

    /// Close every open upvalue at `from_slot` or above, copying the
    /// captured value out of the departing frame. One-way transition.
    pub fn close_upvalues(&mut self, from_slot: usize, frame: &[Value]) {
        while let Some(handle) = self.open_upvalues {
            let slot = match self.upvalue(handle).state {
                UpvalueState::Open { slot } => slot,
                UpvalueState::Closed(_) => {
                    debug_assert!(false, "closed upvalue on the open list");
                    break;
                }
            };
            if slot < from_slot {
                break;
            }
            let value = frame[slot];
            let next = {
                let upvalue = self.upvalue_mut(handle);
                upvalue.state = UpvalueState::Closed(value);
                upvalue.next.take()
            };
            self.open_upvalues = next;
        }
    }

    /// Head of the open-upvalue list.
    pub fn open_upvalues(&self) -> Option<ObjHandle> {
        self.open_upvalues
    }

    // ------------------------------------------------------------------
    // Collector hooks
    // ------------------------------------------------------------------

    /// Pin a value against collection; paired with `pop_root`.
    pub fn push_root(&mut self, value: Value) {
        self.temp_roots.push(value);
    }

    pub fn pop_root(&mut self) -> Option<Value> {
        self.temp_roots.pop()
    }

    /// Values the collector must treat as roots.
    pub fn temp_roots(&self) -> &[Value] {
        &self.temp_roots
    }

    pub fn mark(&mut self, handle: ObjHandle) {
        self.node_mut(handle).marked = true;
    }

    pub fn is_marked(&self, handle: ObjHandle) -> bool {
        self.node(handle).marked
    }

    /// Walk the intrusive all-objects list, head first.
    pub fn objects(&self) -> impl Iterator<Item = ObjHandle> + '_ {
        std::iter::successors(self.objects, move |&handle| self.node(handle).next)
    }

    /// Free every unmarked object and clear surviving marks. Returns the
    /// number of objects freed. Freed strings leave the interning table;
    /// freed slots go back on the free list.
    pub fn sweep(&mut self) -> usize {
        // Unlink doomed cells from the open-upvalue list first, so a later
        // capture never walks a reclaimed slot.
        let mut prev: Option<ObjHandle> = None;
        let mut current = self.open_upvalues;
        while let Some(handle) = current {
            let next = self.upvalue(handle).next;
            if self.node(handle).marked {
                prev = Some(handle);
            } else {
                match prev {
                    Some(p) => self.upvalue_mut(p).next = next,
                    None => self.open_upvalues = next,
                }
            }
            current = next;
        }

        let mut freed = 0;
        let mut prev: Option<ObjHandle> = None;
        let mut current = self.objects;
        while let Some(handle) = current {
            let node = self.node(handle);
            let next = node.next;
            if node.marked {
                self.node_mut(handle).marked = false;
                prev = Some(handle);
            } else {
                match prev {
                    Some(p) => self.node_mut(p).next = next,
                    None => self.objects = next,
                }
                self.free_object(handle);
                freed += 1;
            }
            current = next;
        }
        freed
    }

    fn free_object(&mut self, handle: ObjHandle) {
        let node = match self.slots.get_mut(handle.index()).and_then(Option::take) {
            Some(node) => node,
            None => panic!("double free of object handle {:?}", handle),
        };
        if let Object::String(string) = &node.body {
            let removed = self.strings.delete(StringHandle::new(handle), string.hash);
            debug_assert!(removed, "freed string was not in the interning table");
            memory_stats::record_unintern();
        }
        memory_stats::record_free(node.footprint);
        self.free.push(handle.index());
    }

    /// Count live objects by kind, by walking the intrusive list.
    pub fn census(&self) -> Census {
        let mut census = Census::default();
        for handle in self.objects() {
            match self.get(handle).kind() {
                ObjKind::String => census.strings += 1,
                ObjKind::Function => census.functions += 1,
                ObjKind::Native => census.natives += 1,
                ObjKind::Closure => census.closures += 1,
                ObjKind::Upvalue => census.upvalues += 1,
                ObjKind::Class => census.classes += 1,
                ObjKind::Instance => census.instances += 1,
                ObjKind::BoundMethod => census.bound_methods += 1,
            }
        }
        census
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructor_defaults() {
        let mut heap = Heap::new();

        let function = heap.new_function();
        match heap.get(function) {
            Object::Function(f) => {
                assert_eq!(f.arity, 0);
                assert_eq!(f.upvalue_count, 0);
                assert!(f.name.is_none());
                assert!(f.chunk.is_empty());
            }
            _ => panic!("expected a function"),
        }

        let name = heap.intern("Point");
        let class = heap.new_class(name);
        match heap.get(class) {
            Object::Class(c) => {
                assert_eq!(c.name, name);
                assert!(c.filename.is_none());
                assert!(c.methods.is_empty());
            }
            _ => panic!("expected a class"),
        }

        let instance = heap.new_instance(class);
        match heap.get(instance) {
            Object::Instance(i) => {
                assert_eq!(i.class, class);
                assert!(i.fields.is_empty());
            }
            _ => panic!("expected an instance"),
        }
    }

    #[test]
    fn test_closure_upvalue_vector_is_presized() {
        let mut heap = Heap::new();
        let function = heap.new_function();
        if let Object::Function(f) = heap.get_mut(function) {
            f.upvalue_count = 3;
        }
        let closure = heap.new_closure(function);
        match heap.get(closure) {
            Object::Closure(c) => {
                assert_eq!(c.upvalues.len(), 3);
                assert!(c.upvalues.iter().all(Option::is_none));
            }
            _ => panic!("expected a closure"),
        }
    }

    #[test]
    fn test_freed_slot_is_reused() {
        let mut heap = Heap::new();
        let doomed = heap.new_function();
        let survivor = heap.new_function();
        heap.mark(survivor);
        assert_eq!(heap.sweep(), 1);

        // The next allocation takes the reclaimed slot.
        let fresh = heap.new_function();
        assert_eq!(fresh.index(), doomed.index());
        assert_eq!(heap.census().functions, 2);
    }

    #[test]
    #[should_panic(expected = "dead object handle")]
    fn test_dead_handle_access_panics() {
        let mut heap = Heap::new();
        let handle = heap.new_function();
        heap.sweep();
        let _ = heap.get(handle);
    }

    #[test]
    fn test_temp_roots_stack() {
        let mut heap = Heap::new();
        heap.push_root(Value::Int(1));
        heap.push_root(Value::Int(2));
        assert_eq!(heap.temp_roots(), &[Value::Int(1), Value::Int(2)]);
        assert_eq!(heap.pop_root(), Some(Value::Int(2)));
        assert_eq!(heap.temp_roots(), &[Value::Int(1)]);
    }

    #[test]
    fn test_sweep_prunes_open_upvalue_list() {
        let mut heap = Heap::new();
        let kept = heap.capture_upvalue(5);
        let _doomed = heap.capture_upvalue(2);
        heap.mark(kept);
        heap.sweep();

        assert_eq!(heap.open_upvalues(), Some(kept));
        match heap.get(kept) {
            Object::Upvalue(u) => assert!(u.next.is_none()),
            _ => panic!("expected an upvalue"),
        }
    }
}
