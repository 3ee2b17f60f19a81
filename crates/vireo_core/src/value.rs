//! Dynamic value tree
//!
//! `Value` is the data model the reactivity system instruments: primitives
//! are opaque, records and lists are shared containers that can carry an
//! observer. Reads through `Record::get` register dependencies on the
//! active watcher; writes through `Record::assign` and the list mutators
//! notify them.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::dep::Dep;
use crate::observer::{observe, Observer};

/// A dynamically-typed value.
///
/// Cloning is cheap: containers and strings are reference handles.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Record(Record),
    List(List),
}

impl Value {
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Records and lists are containers; everything else is opaque.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Record(_) | Value::List(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Truthiness for conditional rendering: null, false, 0, 0.0, NaN and
    /// the empty string are falsy; containers are always truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Record(_) | Value::List(_) => true,
        }
    }

    /// Equality as seen by change detection: primitives by value (with
    /// NaN equal to itself, so `NaN -> NaN` writes do not notify),
    /// containers by handle identity.
    pub fn same_observable(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a.ptr_eq(b),
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Render a value as display text (used for text vnodes and attributes).
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.to_string(),
            Value::Record(_) => "[record]".to_string(),
            Value::List(_) => "[list]".to_string(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Record(r) => {
                let keys = r.keys();
                write!(f, "record{{")?;
                for (i, k) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}")?;
                }
                write!(f, "}}")
            }
            Value::List(l) => write!(f, "list[{}]", l.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s.as_str()))
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl From<List> for Value {
    fn from(l: List) -> Self {
        Value::List(l)
    }
}

// =========================================================================
// Record
// =========================================================================

struct Entry {
    key: Rc<str>,
    value: Value,
    /// Present iff the entry is reactive. Entries added through plain
    /// insertion have no dep and never notify.
    dep: Option<Rc<Dep>>,
}

struct RecordData {
    entries: Vec<Entry>,
    index: FxHashMap<Rc<str>, usize>,
    observer: Option<Rc<Observer>>,
    frozen: bool,
}

impl RecordData {
    fn lookup(&self, key: &str) -> Option<&Entry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }
}

/// An insertion-ordered, string-keyed record.
///
/// `Record` is a shared handle; clones refer to the same storage.
#[derive(Clone)]
pub struct Record {
    inner: Rc<RefCell<RecordData>>,
}

impl Record {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(RecordData {
                entries: Vec::new(),
                index: FxHashMap::default(),
                observer: None,
                frozen: false,
            })),
        }
    }

    /// Builder-style insertion, for constructing initial data trees.
    pub fn with(self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        self.insert_raw(key, value.into());
        self
    }

    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Stable handle identity, usable as a map key in seen-sets.
    pub fn handle_id(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.borrow().index.contains_key(key)
    }

    /// Snapshot of the keys in insertion order.
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.inner
            .borrow()
            .entries
            .iter()
            .map(|e| e.key.clone())
            .collect()
    }

    /// Read an entry, registering a dependency on the active watcher.
    ///
    /// When the entry holds an observed container, the container's dep is
    /// registered as well so collection-level mutations reach watchers
    /// that only read the parent property.
    pub fn get(&self, key: &str) -> Value {
        let (value, dep) = {
            let data = self.inner.borrow();
            match data.lookup(key) {
                Some(entry) => (entry.value.clone(), entry.dep.clone()),
                None => return Value::Null,
            }
        };
        if let Some(dep) = dep {
            dep.depend();
            depend_nested(&value);
        }
        value
    }

    /// Read an entry without registering any dependency.
    pub fn peek(&self, key: &str) -> Value {
        self.inner
            .borrow()
            .lookup(key)
            .map(|e| e.value.clone())
            .unwrap_or(Value::Null)
    }

    /// Write an entry. Reactive entries notify their dep unless the new
    /// value is indistinguishable from the old one; plain entries are
    /// silently updated. Missing keys fall back to plain insertion, which
    /// never notifies (use [`crate::set`] to add a key reactively).
    pub fn assign(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let (dep, reactive) = {
            let data = self.inner.borrow();
            if data.frozen {
                drop(data);
                crate::config::dev_warn(&format!(
                    "cannot assign key `{key}` on a frozen record"
                ));
                return;
            }
            match data.lookup(key) {
                Some(entry) => {
                    if entry.value.same_observable(&value) {
                        return;
                    }
                    (entry.dep.clone(), entry.dep.is_some())
                }
                None => {
                    drop(data);
                    self.insert_raw(key, value);
                    return;
                }
            }
        };
        // Observe outside the borrow: the new value may (pathologically)
        // contain this record.
        if reactive {
            observe(&value);
        }
        {
            let mut data = self.inner.borrow_mut();
            let data = &mut *data;
            if let Some(&i) = data.index.get(key) {
                data.entries[i].value = value;
            }
        }
        if let Some(dep) = dep {
            dep.notify();
        }
    }

    /// Insert or overwrite an entry without dependency bookkeeping.
    /// The entry is plain: reads do not subscribe and writes do not
    /// notify until the record is (re)walked by observation.
    pub fn insert_raw(&self, key: impl Into<Rc<str>>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let mut data = self.inner.borrow_mut();
        if data.frozen {
            drop(data);
            crate::config::dev_warn(&format!(
                "cannot insert key `{key}` on a frozen record"
            ));
            return;
        }
        let data = &mut *data;
        match data.index.get(&key) {
            Some(&i) => data.entries[i].value = value,
            None => {
                let i = data.entries.len();
                data.index.insert(key.clone(), i);
                data.entries.push(Entry {
                    key,
                    value,
                    dep: None,
                });
            }
        }
    }

    /// Remove an entry, returning its value and whether it was reactive.
    pub(crate) fn remove_entry(&self, key: &str) -> Option<(Value, Option<Rc<Dep>>)> {
        let mut data = self.inner.borrow_mut();
        let data = &mut *data;
        if data.frozen {
            return None;
        }
        let i = data.index.remove(key)?;
        let entry = data.entries.remove(i);
        // Positions after the removed entry shift down.
        for (pos, e) in data.entries.iter().enumerate().skip(i) {
            data.index.insert(e.key.clone(), pos);
        }
        Some((entry.value, entry.dep))
    }

    /// Freeze the record (shallow): observation skips it and writes are
    /// dropped with a warning.
    pub fn freeze(&self) {
        self.inner.borrow_mut().frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.borrow().frozen
    }

    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.inner.borrow().observer.clone()
    }

    pub(crate) fn attach_observer(&self, observer: Rc<Observer>) {
        self.inner.borrow_mut().observer = Some(observer);
    }

    /// Give an entry its dep, making reads subscribe and writes notify.
    pub(crate) fn ensure_reactive(&self, key: &str) {
        let mut data = self.inner.borrow_mut();
        if let Some(&i) = data.index.get(key) {
            let entry = &mut data.entries[i];
            if entry.dep.is_none() {
                entry.dep = Some(Dep::new());
            }
        }
    }

    pub(crate) fn entry_dep(&self, key: &str) -> Option<Rc<Dep>> {
        self.inner.borrow().lookup(key).and_then(|e| e.dep.clone())
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record({} entries)", self.len())
    }
}

/// Register the container-level deps reachable from a freshly-read value:
/// the value's own container dep, and recursively every observed element
/// of a list. Property-level deps of a nested record are registered only
/// when its entries are actually read.
pub(crate) fn depend_nested(value: &Value) {
    match value {
        Value::Record(record) => {
            if let Some(ob) = record.observer() {
                ob.dep().depend();
            }
        }
        Value::List(list) => {
            if let Some(ob) = list.observer() {
                ob.dep().depend();
            }
            for item in list.to_vec() {
                match &item {
                    Value::Record(r) => {
                        if let Some(ob) = r.observer() {
                            ob.dep().depend();
                        }
                    }
                    Value::List(_) => depend_nested(&item),
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

// =========================================================================
// List
// =========================================================================

struct ListData {
    items: Vec<Value>,
    observer: Option<Rc<Observer>>,
    frozen: bool,
}

/// An ordered sequence of values.
///
/// `List` is a shared handle; clones refer to the same storage. Only the
/// intercepted mutators (`push`, `pop`, `shift`, `unshift`, `splice`,
/// `sort_by`, `reverse`) notify watchers; `store` is a raw element write
/// that deliberately does not.
#[derive(Clone)]
pub struct List {
    inner: Rc<RefCell<ListData>>,
}

impl List {
    pub fn new() -> Self {
        Self::from_values(Vec::new())
    }

    pub fn from_values(items: Vec<Value>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ListData {
                items,
                observer: None,
                frozen: false,
            })),
        }
    }

    pub fn ptr_eq(&self, other: &List) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn handle_id(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    /// Read an element. Element reads register no dependency; watchers
    /// track the list through the property that returned it.
    pub fn get(&self, index: usize) -> Value {
        self.inner
            .borrow()
            .items
            .get(index)
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.borrow().items.clone()
    }

    pub fn push(&self, value: impl Into<Value>) {
        let value = value.into();
        let Some(ob) = self.mutate(|items| items.push(value.clone())) else {
            return;
        };
        if let Some(ob) = ob {
            observe(&value);
            ob.dep().notify();
        }
    }

    pub fn pop(&self) -> Option<Value> {
        let mut popped = None;
        let ob = self.mutate(|items| popped = items.pop())?;
        if let Some(ob) = ob {
            ob.dep().notify();
        }
        popped
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<Value> {
        let mut shifted = None;
        let ob = self.mutate(|items| {
            if !items.is_empty() {
                shifted = Some(items.remove(0));
            }
        })?;
        if let Some(ob) = ob {
            ob.dep().notify();
        }
        shifted
    }

    /// Insert an element at the front.
    pub fn unshift(&self, value: impl Into<Value>) {
        let value = value.into();
        let Some(ob) = self.mutate(|items| items.insert(0, value.clone())) else {
            return;
        };
        if let Some(ob) = ob {
            observe(&value);
            ob.dep().notify();
        }
    }

    /// Remove `delete_count` elements at `start` and insert `inserted`
    /// in their place, returning the removed elements. `start` is clamped
    /// to the list length.
    pub fn splice(&self, start: usize, delete_count: usize, inserted: Vec<Value>) -> Vec<Value> {
        let mut removed = Vec::new();
        let Some(ob) = self.mutate(|items| {
            let start = start.min(items.len());
            let end = (start + delete_count).min(items.len());
            removed = items.splice(start..end, inserted.iter().cloned()).collect();
        }) else {
            return removed;
        };
        if let Some(ob) = ob {
            for value in &inserted {
                observe(value);
            }
            ob.dep().notify();
        }
        removed
    }

    pub fn sort_by(&self, mut cmp: impl FnMut(&Value, &Value) -> std::cmp::Ordering) {
        let Some(ob) = self.mutate(|items| items.sort_by(&mut cmp)) else {
            return;
        };
        if let Some(ob) = ob {
            ob.dep().notify();
        }
    }

    pub fn reverse(&self) {
        let Some(ob) = self.mutate(|items| items.reverse()) else {
            return;
        };
        if let Some(ob) = ob {
            ob.dep().notify();
        }
    }

    /// Raw element write. Not intercepted: no observation, no
    /// notification. Out-of-bounds writes are dropped.
    pub fn store(&self, index: usize, value: impl Into<Value>) -> bool {
        let mut data = self.inner.borrow_mut();
        if data.frozen {
            return false;
        }
        match data.items.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    pub fn freeze(&self) {
        self.inner.borrow_mut().frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.borrow().frozen
    }

    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.inner.borrow().observer.clone()
    }

    pub(crate) fn attach_observer(&self, observer: Rc<Observer>) {
        self.inner.borrow_mut().observer = Some(observer);
    }

    /// Run a mutation under the borrow, returning `None` when frozen and
    /// the (possibly absent) observer otherwise.
    fn mutate(&self, f: impl FnOnce(&mut Vec<Value>)) -> Option<Option<Rc<Observer>>> {
        let mut data = self.inner.borrow_mut();
        if data.frozen {
            drop(data);
            crate::config::dev_warn("cannot mutate a frozen list");
            return None;
        }
        f(&mut data.items);
        Some(data.observer.clone())
    }
}

impl Default for List {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "List({} items)", self.len())
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from_values(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_insertion_order() {
        let record = Record::new()
            .with("b", 1)
            .with("a", 2)
            .with("c", 3);
        let keys: Vec<String> = record.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_record_get_missing_is_null() {
        let record = Record::new();
        assert!(record.get("nope").is_null());
    }

    #[test]
    fn test_nan_is_same_observable() {
        let a = Value::Float(f64::NAN);
        let b = Value::Float(f64::NAN);
        assert!(a.same_observable(&b));
        assert!(!Value::Float(1.0).same_observable(&Value::Float(2.0)));
    }

    #[test]
    fn test_container_identity() {
        let r = Record::new();
        let a = Value::Record(r.clone());
        let b = Value::Record(r);
        assert!(a.same_observable(&b));
        assert!(!a.same_observable(&Value::Record(Record::new())));
    }

    #[test]
    fn test_frozen_record_drops_writes() {
        let record = Record::new().with("n", 1);
        record.freeze();
        record.assign("n", 2);
        assert_eq!(record.peek("n").as_int(), Some(1));
    }

    #[test]
    fn test_list_splice() {
        let list = List::from_values(vec![1.into(), 2.into(), 3.into()]);
        let removed = list.splice(1, 1, vec![10.into(), 11.into()]);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].as_int(), Some(2));
        assert_eq!(list.len(), 4);
        assert_eq!(list.get(1).as_int(), Some(10));
        assert_eq!(list.get(2).as_int(), Some(11));
    }

    #[test]
    fn test_list_store_is_raw() {
        let list = List::from_values(vec![1.into()]);
        assert!(list.store(0, 5));
        assert!(!list.store(7, 5));
        assert_eq!(list.get(0).as_int(), Some(5));
    }

    #[test]
    fn test_record_remove_reindexes() {
        let record = Record::new().with("a", 1).with("b", 2).with("c", 3);
        record.remove_entry("b");
        assert_eq!(record.get("c").as_int(), Some(3));
        assert!(!record.contains_key("b"));
        assert_eq!(record.len(), 2);
    }
}
