//! Path observer behavior against a live object graph.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{Graph, house, path, person};
use pathbind_core::{Observable, Value};
use pathbind_runtime::{BindingError, PathObserver, Terminal};
use proptest::prelude::*;

/// Records every terminal reported to it.
#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<Terminal>>>);

impl Recorder {
    fn listener(&self) -> impl Fn(Terminal) + use<> {
        let log = Rc::clone(&self.0);
        move |t| log.borrow_mut().push(t)
    }

    fn count(&self) -> usize {
        self.0.borrow().len()
    }

    fn last(&self) -> Option<Terminal> {
        self.0.borrow().last().cloned()
    }
}

#[test]
fn full_resolution_installs_one_hop_per_segment() {
    let graph = Graph::new("Henri's Hut", "Henri");
    let rec = Recorder::default();
    let observer = PathObserver::attach(&graph.root, path("root.house.owner.name"), rec.listener())
        .expect("attach");

    assert_eq!(observer.hop_count(), 4);
    assert_eq!(observer.hop_indices(), vec![0, 1, 2, 3]);
    assert!(observer.is_complete());
    assert_eq!(rec.count(), 1);
    assert_eq!(rec.last(), Some(Terminal::Resolved(Value::from("Henri"))));
    for observable in graph.observables().into_iter().filter(|o| !o.ptr_eq(&graph.house_name)) {
        assert_eq!(observable.live_subscriber_count(), 1);
    }
    assert_eq!(graph.house_name.live_subscriber_count(), 0);
}

#[test]
fn partial_resolution_reports_unset() {
    let graph = Graph::new("Hut", "Henri");
    graph.owner.set(Value::Null);

    let rec = Recorder::default();
    let observer = PathObserver::attach(&graph.root, path("root.house.owner.name"), rec.listener())
        .expect("a null intermediate is not an error");

    assert_eq!(observer.hop_count(), 3);
    assert!(!observer.is_complete());
    assert_eq!(rec.last(), Some(Terminal::Unset));
    assert_eq!(observer.terminal(), Terminal::Unset);
    assert_eq!(graph.owner_name.live_subscriber_count(), 0);
}

#[test]
fn replacing_an_intermediate_rebinds_the_tail() {
    let graph = Graph::new("Henri's Hut", "Henri");
    let rec = Recorder::default();
    let observer =
        PathObserver::attach(&graph.root, path("root.house.name"), rec.listener()).expect("attach");
    assert_eq!(rec.last(), Some(Terminal::Resolved(Value::from("Henri's Hut"))));

    let (ranch, ranch_name, _) = house("Evy's Ranch");
    graph.house.set(ranch);

    assert_eq!(rec.last(), Some(Terminal::Resolved(Value::from("Evy's Ranch"))));
    assert_eq!(observer.hop_count(), 3);
    // The old house's field is no longer observed; the new one is.
    assert_eq!(graph.house_name.live_subscriber_count(), 0);
    assert_eq!(ranch_name.live_subscriber_count(), 1);

    let before = rec.count();
    graph.house_name.set(Value::from("Old news"));
    assert_eq!(rec.count(), before, "detached object must not report");

    ranch_name.set(Value::from("Evy's Mansion"));
    assert_eq!(rec.last(), Some(Terminal::Resolved(Value::from("Evy's Mansion"))));
}

#[test]
fn nulling_an_intermediate_breaks_the_chain() {
    let graph = Graph::new("Hut", "Henri");
    let rec = Recorder::default();
    let observer = PathObserver::attach(&graph.root, path("root.house.owner.name"), rec.listener())
        .expect("attach");

    graph.house.set(Value::Null);
    assert_eq!(observer.hop_count(), 2);
    assert_eq!(rec.last(), Some(Terminal::Unset));
    assert_eq!(graph.owner.live_subscriber_count(), 0);
    assert_eq!(graph.owner_name.live_subscriber_count(), 0);

    // Nothing downstream reports while broken.
    let before = rec.count();
    graph.owner_name.set(Value::from("Ghost"));
    assert_eq!(rec.count(), before);

    // Restoring a house resumes propagation.
    let (hut, _, owner) = house("Hut");
    graph.house.set(hut);
    assert_eq!(rec.last(), Some(Terminal::Unset), "new house has no owner yet");
    let name = Observable::new(Value::from("Evy"));
    owner.set(person(&name));
    assert_eq!(observer.hop_count(), 4);
    assert_eq!(rec.last(), Some(Terminal::Resolved(Value::from("Evy"))));
}

#[test]
fn bad_path_fails_before_any_hop_is_installed() {
    let graph = Graph::new("Hut", "Henri");
    let rec = Recorder::default();
    let err = PathObserver::attach(&graph.root, path("root.house.roof"), rec.listener())
        .expect_err("House has no roof");

    assert!(matches!(err, BindingError::NoSuchField { ref type_name, .. } if type_name == "House"));
    assert_eq!(rec.count(), 0);
    assert_eq!(graph.live_listeners(), 0);

    let err = PathObserver::attach(&graph.root, path("root.house.rooms"), rec.listener())
        .expect_err("rooms is plain");
    assert!(matches!(err, BindingError::NotObservable { .. }));
    assert_eq!(graph.live_listeners(), 0);
}

#[test]
fn detach_removes_every_listener() {
    let graph = Graph::new("Hut", "Henri");
    let rec = Recorder::default();
    let mut observer = PathObserver::attach(&graph.root, path("root.house.owner.name"), rec.listener())
        .expect("attach");
    assert_eq!(graph.live_listeners(), 4);

    observer.detach().expect("detach");
    assert_eq!(graph.live_listeners(), 0);
    graph.owner_name.set(Value::from("Evy"));
    graph.house.set(Value::Null);
    assert_eq!(rec.count(), 1);
    assert!(matches!(observer.detach(), Err(BindingError::AlreadyDetached { .. })));
}

#[derive(Debug, Clone)]
enum Mutation {
    NewHouse,
    ClearHouse,
    NewOwner(String),
    ClearOwner,
    Rename(String),
}

fn mutation() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        Just(Mutation::NewHouse),
        Just(Mutation::ClearHouse),
        "[a-z]{1,6}".prop_map(Mutation::NewOwner),
        Just(Mutation::ClearOwner),
        "[a-z]{1,6}".prop_map(Mutation::Rename),
    ]
}

/// Mirror of the mutable part of the graph.
struct Shadow {
    house: Observable<Value>,
    owner: Option<Observable<Value>>,
    name: Option<Observable<Value>>,
}

impl Shadow {
    fn apply(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::NewHouse => {
                let (value, _, owner) = house("h");
                self.house.set(value);
                self.owner = Some(owner);
                self.name = None;
            }
            Mutation::ClearHouse => {
                self.house.set(Value::Null);
                self.owner = None;
                self.name = None;
            }
            Mutation::NewOwner(text) => {
                if let Some(owner) = &self.owner {
                    let name = Observable::new(Value::from(text.as_str()));
                    owner.set(person(&name));
                    self.name = Some(name);
                }
            }
            Mutation::ClearOwner => {
                if let Some(owner) = &self.owner {
                    owner.set(Value::Null);
                    self.name = None;
                }
            }
            Mutation::Rename(text) => {
                if let Some(name) = &self.name {
                    name.set(Value::from(text.as_str()));
                }
            }
        }
    }

    fn expected_hops(&self) -> usize {
        2 + usize::from(self.owner.is_some()) + usize::from(self.name.is_some())
    }
}

proptest! {
    #[test]
    fn hops_track_the_graph(mutations in prop::collection::vec(mutation(), 1..40)) {
        let graph = Graph::new("Hut", "Henri");
        let mut shadow = Shadow {
            house: graph.house.clone(),
            owner: Some(graph.owner.clone()),
            name: Some(graph.owner_name.clone()),
        };
        let rec = Recorder::default();
        let observer = PathObserver::attach(&graph.root, path("root.house.owner.name"), rec.listener())
            .expect("attach");

        for m in &mutations {
            shadow.apply(m);

            prop_assert_eq!(observer.hop_count(), shadow.expected_hops());
            prop_assert_eq!(graph.house.live_subscriber_count(), 1);
            if let Some(owner) = &shadow.owner {
                prop_assert_eq!(owner.live_subscriber_count(), 1);
            }
            match &shadow.name {
                Some(name) => {
                    prop_assert_eq!(name.live_subscriber_count(), 1);
                    prop_assert_eq!(rec.last(), Some(Terminal::Resolved(name.get())));
                }
                None => prop_assert_eq!(rec.last(), Some(Terminal::Unset)),
            }
        }
    }
}
