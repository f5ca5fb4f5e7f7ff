//! The path-addressable data store contract
//!
//! The engine never holds a copy of the data tree: every read goes through
//! [`Store::state`] and every write through [`Store::set_value`]. A store
//! must guarantee that previously returned snapshots stay stable under
//! later writes. [`MemoryStore`] is the single-threaded reference
//! implementation, using copy-on-write over the `Arc`-backed containers of
//! [`Value`] so a write copies only the spine it touches.

use crate::error::{CoreError, CoreResult};
use crate::path::{Path, Segment};
use crate::value::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

/// Change-notification callback, invoked with the paths written since the
/// last notification
pub type Listener = Rc<dyn Fn(&[String])>;

/// Token returned by [`Store::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

/// The data store contract consumed by the runtime engine
pub trait Store {
    /// Full current snapshot of the data tree
    fn state(&self) -> Value;

    /// Write one value at a dot-delimited path
    ///
    /// Unwritable paths (malformed, index far out of bounds, traversing a
    /// scalar) are logged and dropped; a store write never panics.
    fn set_value(&self, path: &str, value: Value);

    /// Run `f`, collapsing all writes it performs into a single change
    /// notification delivered when the outermost batch closes
    fn batch(&self, f: &mut dyn FnMut());

    /// Register a change listener
    fn subscribe(&self, listener: Listener) -> Subscription;

    /// Remove a previously registered listener
    fn unsubscribe(&self, subscription: Subscription);

    /// Read the value at a dot-delimited path from the current snapshot
    fn get(&self, path: &str) -> Option<Value> {
        let path = Path::parse(path).ok()?;
        resolve(&self.state(), &path).cloned()
    }
}

/// Resolve a parsed path against a data tree
pub fn resolve<'a>(root: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.segments() {
        current = match segment {
            Segment::Key(key) => current.field(key)?,
            Segment::Index(index) => current.item(*index)?,
        };
    }
    Some(current)
}

/// Single-threaded in-memory store with structural sharing
///
/// Snapshots returned by [`Store::state`] are immutable: writes replace the
/// `Arc` spine from the root down to the written leaf, leaving earlier
/// snapshots untouched.
pub struct MemoryStore {
    state: RefCell<Value>,
    listeners: RefCell<Vec<(u64, Listener)>>,
    next_listener: Cell<u64>,
    batch_depth: Cell<u32>,
    pending: RefCell<Vec<String>>,
}

impl MemoryStore {
    /// Create a store over an initial data tree
    pub fn new(initial: Value) -> Self {
        MemoryStore {
            state: RefCell::new(initial),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
            batch_depth: Cell::new(0),
            pending: RefCell::new(Vec::new()),
        }
    }

    /// Create a store over an empty record
    pub fn empty() -> Self {
        Self::new(Value::record::<String, _>([]))
    }

    fn notify(&self, paths: &[String]) {
        // Listeners may re-enter the store (subscribe, set_value), so the
        // registration list is snapshotted before dispatch.
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in snapshot {
            listener(paths);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::empty()
    }
}

impl Store for MemoryStore {
    fn state(&self) -> Value {
        self.state.borrow().clone()
    }

    fn set_value(&self, path: &str, value: Value) {
        let parsed = match Path::parse(path) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("store: dropping write to unparseable path: {e}");
                return;
            }
        };

        let result = {
            let mut state = self.state.borrow_mut();
            write_at(&mut state, parsed.segments(), value)
        };
        if let Err(e) = result {
            log::warn!("store: dropping unwritable path '{path}': {e}");
            return;
        }

        if self.batch_depth.get() > 0 {
            self.pending.borrow_mut().push(path.to_string());
        } else {
            self.notify(&[path.to_string()]);
        }
    }

    fn batch(&self, f: &mut dyn FnMut()) {
        self.batch_depth.set(self.batch_depth.get() + 1);
        f();
        self.batch_depth.set(self.batch_depth.get() - 1);

        if self.batch_depth.get() == 0 {
            let mut paths = std::mem::take(&mut *self.pending.borrow_mut());
            // Deduplicate, keeping first-write order
            let mut seen = std::collections::HashSet::new();
            paths.retain(|p| seen.insert(p.clone()));
            if !paths.is_empty() {
                self.notify(&paths);
            }
        }
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners.borrow_mut().push((id, listener));
        Subscription(id)
    }

    fn unsubscribe(&self, subscription: Subscription) {
        self.listeners
            .borrow_mut()
            .retain(|(id, _)| *id != subscription.0);
    }
}

/// Copy-on-write write of `value` at `segments` under `root`
///
/// Missing intermediate records are created; a list index may be at most
/// one past the end (which appends a row). `Null` intermediates are
/// replaced by the container the next segment needs.
fn write_at(root: &mut Value, segments: &[Segment], value: Value) -> CoreResult<()> {
    let mut current = root;
    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();
        match segment {
            Segment::Key(key) => {
                if matches!(current, Value::Null) {
                    *current = Value::record::<String, _>([]);
                }
                let map = match current {
                    Value::Record(map) => Arc::make_mut(map),
                    _ => return Err(CoreError::NotARecord(prefix(segments, i))),
                };
                if last {
                    map.insert(key.clone(), value);
                    return Ok(());
                }
                current = map.entry(key.clone()).or_insert(Value::Null);
            }
            Segment::Index(index) => {
                if matches!(current, Value::Null) {
                    *current = Value::list([]);
                }
                let list = match current {
                    Value::List(items) => Arc::make_mut(items),
                    _ => return Err(CoreError::NotAList(prefix(segments, i))),
                };
                if *index == list.len() {
                    list.push(Value::Null);
                } else if *index > list.len() {
                    return Err(CoreError::IndexOutOfBounds {
                        path: prefix(segments, i),
                        index: *index,
                        len: list.len(),
                    });
                }
                if last {
                    list[*index] = value;
                    return Ok(());
                }
                current = &mut list[*index];
            }
        }
    }
    // Parsed paths always have at least one segment
    Err(CoreError::InvalidPath(String::new()))
}

fn prefix(segments: &[Segment], upto: usize) -> String {
    segments[..=upto]
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn invoice_store() -> MemoryStore {
        MemoryStore::new(Value::record([
            ("price", Value::from(10.0)),
            (
                "items",
                Value::list([
                    Value::record([("qty", Value::from(1.0))]),
                    Value::record([("qty", Value::from(2.0))]),
                ]),
            ),
        ]))
    }

    #[test]
    fn test_get_and_set_top_level() {
        let store = invoice_store();
        assert_eq!(store.get("price"), Some(Value::from(10.0)));
        store.set_value("price", Value::from(12.0));
        assert_eq!(store.get("price"), Some(Value::from(12.0)));
    }

    #[test]
    fn test_row_write() {
        let store = invoice_store();
        store.set_value("items.1.qty", Value::from(5.0));
        assert_eq!(store.get("items.1.qty"), Some(Value::from(5.0)));
        assert_eq!(store.get("items.0.qty"), Some(Value::from(1.0)));
    }

    #[test]
    fn test_snapshot_stability() {
        let store = invoice_store();
        let before = store.state();
        store.set_value("items.0.qty", Value::from(99.0));
        // Snapshots taken before the write are not mutated under the reader
        assert_eq!(
            resolve(&before, &Path::parse("items.0.qty").unwrap()),
            Some(&Value::from(1.0))
        );
        assert_eq!(store.get("items.0.qty"), Some(Value::from(99.0)));
    }

    #[test]
    fn test_creates_intermediate_records() {
        let store = MemoryStore::empty();
        store.set_value("totals.net", Value::from(7.0));
        assert_eq!(store.get("totals.net"), Some(Value::from(7.0)));
    }

    #[test]
    fn test_append_row() {
        let store = invoice_store();
        store.set_value("items.2.qty", Value::from(3.0));
        assert_eq!(store.get("items.2.qty"), Some(Value::from(3.0)));
        // Far past the end is dropped, not panicked on
        store.set_value("items.9.qty", Value::from(1.0));
        assert_eq!(store.get("items.9.qty"), None);
    }

    #[test]
    fn test_notification_per_write() {
        let store = invoice_store();
        let seen: Rc<RefCell<Vec<Vec<String>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(Rc::new(move |paths: &[String]| {
            sink.borrow_mut().push(paths.to_vec());
        }));

        store.set_value("price", Value::from(1.0));
        store.set_value("price", Value::from(2.0));
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_batch_collapses_notifications() {
        let store = invoice_store();
        let seen: Rc<RefCell<Vec<Vec<String>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(Rc::new(move |paths: &[String]| {
            sink.borrow_mut().push(paths.to_vec());
        }));

        store.batch(&mut || {
            store.set_value("price", Value::from(1.0));
            store.set_value("items.0.qty", Value::from(4.0));
            store.set_value("price", Value::from(2.0));
        });

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], vec!["price".to_string(), "items.0.qty".to_string()]);
    }

    #[test]
    fn test_nested_batches_collapse_into_outermost() {
        let store = invoice_store();
        let seen: Rc<RefCell<Vec<Vec<String>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(Rc::new(move |paths: &[String]| {
            sink.borrow_mut().push(paths.to_vec());
        }));

        store.batch(&mut || {
            store.set_value("price", Value::from(1.0));
            store.batch(&mut || {
                store.set_value("items.0.qty", Value::from(2.0));
                store.set_value("price", Value::from(3.0));
            });
            // Inner batch closed, but nothing delivered until the outermost does
            assert_eq!(seen.borrow().len(), 0);
            store.set_value("items.1.qty", Value::from(4.0));
        });

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            vec![
                "price".to_string(),
                "items.0.qty".to_string(),
                "items.1.qty".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_batch_is_silent() {
        let store = invoice_store();
        let count = Rc::new(Cell::new(0u32));
        let sink = Rc::clone(&count);
        store.subscribe(Rc::new(move |_: &[String]| sink.set(sink.get() + 1)));

        store.batch(&mut || {});
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let store = invoice_store();
        let count = Rc::new(Cell::new(0u32));
        let sink = Rc::clone(&count);
        let sub = store.subscribe(Rc::new(move |_: &[String]| sink.set(sink.get() + 1)));

        store.set_value("price", Value::from(1.0));
        store.unsubscribe(sub);
        store.set_value("price", Value::from(2.0));
        assert_eq!(count.get(), 1);
    }
}
