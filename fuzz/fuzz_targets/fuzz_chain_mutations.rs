#![no_main]

//! Random mutations of a `root.a.a.a` graph under an attached observer.
//! After every step the hop count must match what the graph resolves to and
//! every discarded observable must be listener-free.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pathbind_core::{KeyPath, Observable, Record, Value};
use pathbind_runtime::{PathObserver, Terminal, resolve};

const DEPTH: usize = 4;

#[derive(Debug, Arbitrary)]
enum Op {
    /// Replace the payload at `level` with a fresh node.
    Link { level: u8 },
    /// Null the payload at `level`.
    Cut { level: u8 },
    /// Write a scalar into the terminal field.
    Leaf { value: i16 },
}

fn node(field: &Observable<Value>) -> Value {
    Value::object(Record::new("Node").with_observable("a", field))
}

fuzz_target!(|ops: Vec<Op>| {
    let path = KeyPath::parse("root.a.a.a").expect("valid path");
    assert_eq!(path.len(), DEPTH);

    // fields[i] is the observable at path index i, while reachable.
    let mut fields: Vec<Observable<Value>> = vec![Observable::new(Value::Null)];
    let mut retired: Vec<Observable<Value>> = Vec::new();
    let observer = PathObserver::attach(&fields[0], path.clone(), |_t: Terminal| {})
        .expect("attach");

    for op in ops.into_iter().take(256) {
        match op {
            Op::Link { level } => {
                let level = usize::from(level) % (DEPTH - 1);
                if level < fields.len() {
                    retired.extend(fields.drain(level + 1..));
                    let next = Observable::new(Value::Null);
                    fields[level].set(node(&next));
                    fields.push(next);
                }
            }
            Op::Cut { level } => {
                let level = usize::from(level) % (DEPTH - 1);
                if level < fields.len() {
                    retired.extend(fields.drain(level + 1..));
                    fields[level].set(Value::Null);
                }
            }
            Op::Leaf { value } => {
                if fields.len() == DEPTH {
                    fields[DEPTH - 1].set(Value::from(i64::from(value)));
                }
            }
        }

        assert_eq!(observer.hop_count(), fields.len());
        let resolution = resolve(observer.root(), &path).expect("shape is fixed");
        assert_eq!(resolution.links().len(), fields.len());
        for field in &fields {
            assert_eq!(field.live_subscriber_count(), 1);
        }
        for field in &retired {
            assert_eq!(field.live_subscriber_count(), 0);
        }
        if fields.len() == DEPTH {
            assert_eq!(observer.terminal(), Terminal::Resolved(fields[DEPTH - 1].get()));
        } else {
            assert_eq!(observer.terminal(), Terminal::Unset);
        }
    }
});
