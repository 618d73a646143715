//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use pathbind_core::{
    AsObservableRef, KeyPath, Observable, ObservableRef, ObservableValue, Subscription, Value,
    WritableValue, key_value,
};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

pub struct Person {
    pub name: Observable<Value>,
}

key_value!(Person { name });

pub struct House {
    pub name: Observable<Value>,
    pub owner: Observable<Value>,
    pub rooms: u32,
}

key_value!(House { name, owner } plain { rooms });

pub struct Model {
    pub house: Observable<Value>,
}

key_value!(Model { house });

/// Handles into a `Model -> House -> Person` graph.
pub struct Graph {
    pub root: Observable<Value>,
    pub house: Observable<Value>,
    pub house_name: Observable<Value>,
    pub owner: Observable<Value>,
    pub owner_name: Observable<Value>,
}

impl Graph {
    pub fn new(house_name: &str, owner_name: &str) -> Self {
        let owner_name = Observable::new(Value::from(owner_name));
        let owner = Observable::new(person(&owner_name));
        let house_name = Observable::new(Value::from(house_name));
        let house = Observable::new(Value::object(House {
            name: house_name.clone(),
            owner: owner.clone(),
            rooms: 3,
        }));
        let root = Observable::new(Value::object(Model {
            house: house.clone(),
        }));
        Self {
            root,
            house,
            house_name,
            owner,
            owner_name,
        }
    }

    /// Every observable in the graph, for leak checks.
    pub fn observables(&self) -> Vec<&Observable<Value>> {
        vec![
            &self.root,
            &self.house,
            &self.house_name,
            &self.owner,
            &self.owner_name,
        ]
    }

    pub fn live_listeners(&self) -> usize {
        self.observables()
            .iter()
            .map(|o| o.live_subscriber_count())
            .sum()
    }
}

pub fn person(name: &Observable<Value>) -> Value {
    Value::object(Person { name: name.clone() })
}

/// A fresh house object plus the handles to its fields.
pub fn house(name: &str) -> (Value, Observable<Value>, Observable<Value>) {
    let name = Observable::new(Value::from(name));
    let owner = Observable::new(Value::Null);
    let value = Value::object(House {
        name: name.clone(),
        owner: owner.clone(),
        rooms: 1,
    });
    (value, name, owner)
}

pub fn path(text: &str) -> KeyPath {
    KeyPath::parse(text).expect("valid key path")
}

/// A writable observable that counts writes arriving through
/// [`WritableValue`]. Host-side writes go through [`Counted::host`].
#[derive(Clone)]
pub struct Counted {
    inner: Observable<Value>,
    writes: Rc<Cell<usize>>,
}

impl Counted {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            inner: Observable::new(value.into()),
            writes: Rc::new(Cell::new(0)),
        }
    }

    pub fn host(&self) -> &Observable<Value> {
        &self.inner
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl ObservableValue for Counted {
    fn value(&self) -> Value {
        self.inner.get()
    }

    fn add_listener(&self, listener: Box<dyn Fn(&Value)>) -> Subscription {
        self.inner.subscribe(listener)
    }

    fn as_writable(&self) -> Option<&dyn WritableValue> {
        Some(self)
    }
}

impl WritableValue for Counted {
    fn set_value(&self, value: Value) {
        self.writes.set(self.writes.get() + 1);
        self.inner.set(value);
    }
}

impl AsObservableRef for Counted {
    fn observable_ref(&self) -> ObservableRef {
        Rc::new(self.clone())
    }
}

/// One captured tracing event.
#[derive(Debug, Clone)]
pub struct Captured {
    pub level: Level,
    pub target: String,
    pub message: String,
}

/// A layer that records every event it sees.
#[derive(Clone, Default)]
pub struct CaptureLayer {
    events: Arc<Mutex<Vec<Captured>>>,
}

impl CaptureLayer {
    pub fn events(&self) -> Vec<Captured> {
        self.events.lock().expect("capture lock").clone()
    }

    pub fn at(&self, level: Level) -> Vec<Captured> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events.lock().expect("capture lock").push(Captured {
            level: *event.metadata().level(),
            target: event.metadata().target().to_owned(),
            message: visitor.0,
        });
    }
}

/// Run `f` with a [`CaptureLayer`] installed as the thread's subscriber.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, CaptureLayer) {
    use tracing_subscriber::layer::SubscriberExt;

    let layer = CaptureLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, layer)
}
