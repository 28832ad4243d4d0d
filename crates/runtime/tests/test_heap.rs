//! Behavioral tests for the object heap: interning identity, the intrusive
//! object list, upvalue sharing and the sweep hook.

use serial_test::serial;
use tern_runtime::object::{Object, UpvalueState};
use tern_runtime::{Heap, Value, hash_bytes, memory_stats};

#[test]
fn test_copy_string_interns_by_content() {
    let mut heap = Heap::new();
    let a = heap.copy_string(b"tern");
    let b = heap.copy_string(b"tern");
    let c = heap.copy_string(b"terns");

    // Same content, same identity; different content, different identity.
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(heap.census().strings, 2);
}

#[test]
fn test_take_string_returns_existing_intern() {
    let mut heap = Heap::new();
    let existing = heap.copy_string(b"shared");

    // take_string owns its buffer; on a hit the buffer is released and the
    // interned string comes back.
    let taken = heap.take_string(b"shared".to_vec());
    assert_eq!(taken, existing);
    assert_eq!(heap.census().strings, 1);

    let fresh = heap.take_string(b"unshared".to_vec());
    assert_ne!(fresh, existing);
    assert_eq!(heap.census().strings, 2);
}

#[test]
fn test_interned_strings_share_one_object() {
    let mut heap = Heap::new();
    for _ in 0..100 {
        heap.copy_string(b"repeated");
    }
    assert_eq!(heap.census().strings, 1);
    assert_eq!(heap.interned_count(), 1);
}

#[test]
fn test_string_content_and_hash() {
    let mut heap = Heap::new();
    let s = heap.copy_string(b"ab");
    assert_eq!(heap.string_bytes(s), b"ab");
    assert_eq!(heap.string(s).hash, hash_bytes(b"ab"));
    assert_eq!(heap.string(s).len(), 2);
}

#[test]
fn test_empty_string_interns() {
    let mut heap = Heap::new();
    let a = heap.copy_string(b"");
    let b = heap.take_string(Vec::new());
    assert_eq!(a, b);
    assert_eq!(heap.string(a).hash, 0);
    assert!(heap.string(a).is_empty());
}

#[test]
fn test_heap_list_reaches_every_object_unmarked() {
    let mut heap = Heap::new();
    let mut created = Vec::new();

    created.push(heap.intern("one").handle());
    let function = heap.new_function();
    created.push(function);
    created.push(heap.new_closure(function));
    created.push(heap.new_upvalue(0));
    let name = heap.intern("Thing");
    created.push(name.handle());
    let class = heap.new_class(name);
    created.push(class);
    created.push(heap.new_instance(class));
    created.push(heap.new_bound_method(Value::None, function));

    let listed: Vec<_> = heap.objects().collect();
    assert_eq!(listed.len(), created.len());
    for &handle in &created {
        assert!(listed.contains(&handle), "{:?} missing from heap list", handle);
        assert!(!heap.is_marked(handle));
    }
}

#[test]
fn test_new_objects_link_at_head() {
    let mut heap = Heap::new();
    let first = heap.new_function();
    let second = heap.new_function();
    let listed: Vec<_> = heap.objects().collect();
    assert_eq!(listed, vec![second, first]);
}

#[test]
fn test_capture_reuses_open_upvalue() {
    let mut heap = Heap::new();
    let function = heap.new_function();
    if let Object::Function(f) = heap.get_mut(function) {
        f.upvalue_count = 1;
    }

    // Two closures capture the same still-open slot.
    let first = heap.new_closure(function);
    let second = heap.new_closure(function);
    let cell_a = heap.capture_upvalue(4);
    let cell_b = heap.capture_upvalue(4);
    assert_eq!(cell_a, cell_b);

    if let Object::Closure(c) = heap.get_mut(first) {
        c.upvalues[0] = Some(cell_a);
    }
    if let Object::Closure(c) = heap.get_mut(second) {
        c.upvalues[0] = Some(cell_b);
    }

    let stored_first = match heap.get(first) {
        Object::Closure(c) => c.upvalues[0],
        _ => unreachable!(),
    };
    let stored_second = match heap.get(second) {
        Object::Closure(c) => c.upvalues[0],
        _ => unreachable!(),
    };
    assert_eq!(stored_first, stored_second);
}

#[test]
fn test_open_upvalue_list_stays_sorted() {
    let mut heap = Heap::new();
    let low = heap.capture_upvalue(1);
    let high = heap.capture_upvalue(5);
    let mid = heap.capture_upvalue(3);

    // Walk the open list: slots must come out descending.
    let mut slots = Vec::new();
    let mut current = heap.open_upvalues();
    while let Some(handle) = current {
        match heap.get(handle) {
            Object::Upvalue(upvalue) => {
                match upvalue.state {
                    UpvalueState::Open { slot } => slots.push(slot),
                    UpvalueState::Closed(_) => panic!("closed upvalue on open list"),
                }
                current = upvalue.next;
            }
            _ => panic!("non-upvalue on open list"),
        }
    }
    assert_eq!(slots, vec![5, 3, 1]);
    assert_eq!(heap.capture_upvalue(5), high);
    assert_eq!(heap.capture_upvalue(3), mid);
    assert_eq!(heap.capture_upvalue(1), low);
}

#[test]
fn test_close_upvalues_from_slot() {
    let mut heap = Heap::new();
    let low = heap.capture_upvalue(0);
    let high = heap.capture_upvalue(2);
    let frame = [Value::Int(10), Value::Int(11), Value::Int(12)];

    heap.close_upvalues(1, &frame);

    // Slot 2 closed over its frame value, slot 0 still open.
    match heap.get(high) {
        Object::Upvalue(u) => assert_eq!(u.state, UpvalueState::Closed(Value::Int(12))),
        _ => unreachable!(),
    }
    match heap.get(low) {
        Object::Upvalue(u) => assert_eq!(u.state, UpvalueState::Open { slot: 0 }),
        _ => unreachable!(),
    }
    assert_eq!(heap.open_upvalues(), Some(low));

    heap.close_upvalues(0, &frame);
    match heap.get(low) {
        Object::Upvalue(u) => assert_eq!(u.state, UpvalueState::Closed(Value::Int(10))),
        _ => unreachable!(),
    }
    assert_eq!(heap.open_upvalues(), None);
}

#[test]
fn test_sweep_frees_unmarked_objects() {
    let mut heap = Heap::new();
    let keep = heap.new_function();
    let _drop_a = heap.new_function();
    let _drop_b = heap.new_upvalue(0);

    heap.mark(keep);
    assert_eq!(heap.sweep(), 2);

    let census = heap.census();
    assert_eq!(census.total(), 1);
    assert_eq!(census.functions, 1);
    // Survivors come out unmarked, ready for the next cycle.
    assert!(!heap.is_marked(keep));
}

#[test]
fn test_sweep_evicts_strings_from_interning_table() {
    let mut heap = Heap::new();
    let doomed = heap.copy_string(b"ephemeral");
    assert_eq!(heap.interned_count(), 1);

    heap.sweep();
    assert_eq!(heap.interned_count(), 0);
    assert_eq!(heap.census().strings, 0);

    // Re-interning the same content must build a fresh, valid string, not
    // resurrect the stale table entry.
    let fresh = heap.copy_string(b"ephemeral");
    assert_eq!(heap.string_bytes(fresh), b"ephemeral");
    assert_eq!(heap.interned_count(), 1);
    let _ = doomed;
}

#[test]
fn test_sweep_keeps_marked_strings_interned() {
    let mut heap = Heap::new();
    let kept = heap.copy_string(b"kept");
    let _doomed = heap.copy_string(b"doomed");
    heap.mark(kept.handle());

    heap.sweep();

    assert_eq!(heap.interned_count(), 1);
    // Identity is preserved across the sweep.
    assert_eq!(heap.copy_string(b"kept"), kept);
}

#[test]
fn test_temp_roots_visible_to_collector() {
    let mut heap = Heap::new();
    let s = heap.intern("rooted");
    heap.push_root(s.into());
    assert_eq!(heap.temp_roots(), &[Value::Obj(s.handle())]);
    heap.pop_root();
    assert!(heap.temp_roots().is_empty());
}

#[test]
#[serial]
fn test_allocation_counters_advance() {
    let before = memory_stats::snapshot();

    let mut heap = Heap::new();
    heap.intern("stats-probe-one");
    heap.intern("stats-probe-two");
    heap.new_function();

    let after = memory_stats::snapshot();
    // Counters are process-global; only monotonic claims are safe.
    assert!(after.total_allocations >= before.total_allocations + 3);
    assert!(after.peak_bytes >= before.peak_bytes);
}
