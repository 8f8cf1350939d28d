//! Concurrent map keyed by byte strings, laid out as a 256-way trie.
//!
//! Each node sits at a fixed depth and can hold one entry. An entry whose key
//! is exactly as long as the node's depth lives there permanently; a longer
//! key may be *parked* on the shallowest node of its path that has no
//! children yet. When another key needs to pass through that node, a children
//! array is allocated and the parked entry moves one level down.
//!
//! Readers never lock and never allocate. Writers publish child arrays, child
//! nodes and entries with a single compare-and-swap on an `ArcSwapOption`, so
//! anything a reader can reach is fully built.
//!
//! Removal walks back up the path, dropping empty children arrays and
//! unlinking nodes left with nothing in them. A node being cleaned is sealed
//! first. A writer that published into a node checks the seal afterwards and
//! waits for the clean-up to settle; if its write ended up in a dropped array
//! or an unlinked node it starts over.
//!
//! Tolerated: while a parked entry is being moved it is visible at two
//! depths. The shallower copy wins for readers and writers, and removal
//! sweeps the deeper one.

use arc_swap::ArcSwapOption;
use ferrous_netkit_domain::DomainError;
use std::sync::atomic::{fence, AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

const KEY_SPACE: usize = 256;

const OPEN: u8 = 0;
const SEALED: u8 = 1;
const DETACHED: u8 = 2;

struct Entry<T> {
    key: Box<[u8]>,
    value: T,
    removed: AtomicBool,
}

impl<T> Entry<T> {
    fn new(key: &[u8], value: T) -> Arc<Self> {
        Arc::new(Self {
            key: key.into(),
            value,
            removed: AtomicBool::new(false),
        })
    }

    fn is_parked_at(&self, depth: usize) -> bool {
        self.key.len() > depth
    }
}

struct Children<T> {
    slots: Box<[ArcSwapOption<Node<T>>]>,
}

impl<T> Children<T> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            slots: (0..KEY_SPACE).map(|_| ArcSwapOption::empty()).collect(),
        })
    }

    fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.load().is_none())
    }
}

struct Node<T> {
    depth: usize,
    /// Byte that selects this node in its parent's children.
    discriminator: u8,
    children: ArcSwapOption<Children<T>>,
    value: ArcSwapOption<Entry<T>>,
    /// `OPEN`, `SEALED` while a clean-up inspects the node, `DETACHED` once
    /// it has been unlinked for good.
    state: AtomicU8,
}

impl<T> Node<T> {
    fn new(depth: usize, discriminator: u8, value: Option<Arc<Entry<T>>>) -> Arc<Self> {
        Arc::new(Self {
            depth,
            discriminator,
            children: ArcSwapOption::empty(),
            value: ArcSwapOption::new(value),
            state: AtomicU8::new(OPEN),
        })
    }

    /// Called after a successful publish into this node's value, or into
    /// `array` when it is this node's children array. Waits while a clean-up
    /// holds the node and reports whether the write is still reachable.
    fn kept_write(&self, array: Option<&Arc<Children<T>>>) -> bool {
        fence(Ordering::SeqCst);
        loop {
            match self.state.load(Ordering::SeqCst) {
                SEALED => std::thread::yield_now(),
                OPEN => {
                    return array.map_or(true, |array| {
                        self.children
                            .load_full()
                            .is_some_and(|current| Arc::ptr_eq(&current, array))
                    })
                }
                _ => return false,
            }
        }
    }

    /// Takes the seal, waiting out another clean-up. False once detached.
    fn seal(&self) -> bool {
        loop {
            match self
                .state
                .compare_exchange(OPEN, SEALED, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => {
                    fence(Ordering::SeqCst);
                    return true;
                }
                Err(SEALED) => std::thread::yield_now(),
                Err(_) => return false,
            }
        }
    }
}

enum SetOutcome<T> {
    Unchanged(Option<Arc<Entry<T>>>),
    Stored {
        previous: Option<Arc<Entry<T>>>,
        current: Arc<Entry<T>>,
    },
    /// The subtree the walk started from was unlinked.
    Abandoned,
}

fn same_pointer<U>(a: &Option<Arc<U>>, b: &Option<Arc<U>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Swaps `slot` from `current` to `new`. Returns false if another writer got
/// there first.
fn publish<U>(slot: &ArcSwapOption<U>, current: &Option<Arc<U>>, new: Option<Arc<U>>) -> bool {
    let previous = slot.compare_and_swap(current, new);
    same_pointer(&previous, current)
}

pub struct ByteTree<T> {
    root: Arc<Node<T>>,
}

impl<T> Default for ByteTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ByteTree<T> {
    pub fn new() -> Self {
        Self {
            root: Node::new(0, 0, None),
        }
    }

    pub fn is_empty(&self) -> bool {
        if self.root.value.load().is_some() {
            return false;
        }
        match self.root.children.load_full() {
            None => true,
            Some(children) => children
                .slots
                .iter()
                .all(|slot| slot.load_full().map_or(true, |child| subtree_is_empty(&child))),
        }
    }

    pub fn clear(&self) {
        self.root.value.store(None);
        self.root.children.store(None);
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get_value(key).is_some()
    }

    /// Removes every entry `predicate` selects and returns how many went.
    /// Entries replaced after the scan saw them are left alone.
    pub fn remove_where(&self, mut predicate: impl FnMut(&[u8], &T) -> bool) -> usize {
        let mut selected = Vec::new();
        let mut stack = vec![Arc::clone(&self.root)];
        while let Some(node) = stack.pop() {
            if let Some(entry) = node.value.load_full() {
                if predicate(&entry.key, &entry.value) {
                    selected.push(entry);
                }
            }
            if let Some(children) = node.children.load_full() {
                stack.extend(children.slots.iter().filter_map(|slot| slot.load_full()));
            }
        }

        let mut removed = 0;
        for entry in &selected {
            let same = |current: &Arc<Entry<T>>| Arc::ptr_eq(current, entry);
            if self.remove_value(&entry.key, &same).is_some() {
                removed += 1;
            }
        }
        removed
    }

    // Walks `key`'s path from the root and returns the first entry with this
    // exact key. Every depth is checked because a parked entry may still sit
    // above a node created after it. The walk stops where the path runs out.
    fn get_value(&self, key: &[u8]) -> Option<Arc<Entry<T>>> {
        let mut node = Arc::clone(&self.root);
        loop {
            if let Some(entry) = node.value.load_full() {
                if *entry.key == *key {
                    return Some(entry);
                }
            }
            if node.depth >= key.len() {
                return None;
            }
            let children = node.children.load_full()?;
            node = children.slots[usize::from(key[node.depth])].load_full()?;
        }
    }

    fn ensure_children(node: &Node<T>) {
        if node.children.load().is_none() {
            publish(&node.children, &None, Some(Children::new()));
        }
    }

    /// Runs `decide` against the current entry for `key` and stores what it
    /// returns. `decide` may run more than once if writers collide.
    fn set_value_from(
        &self,
        start: &Arc<Node<T>>,
        key: &[u8],
        decide: &mut dyn FnMut(Option<&Arc<Entry<T>>>) -> Option<Arc<Entry<T>>>,
    ) -> SetOutcome<T> {
        'restart: loop {
            if start.state.load(Ordering::SeqCst) == DETACHED {
                return SetOutcome::Abandoned;
            }
            let mut node = Arc::clone(start);
            loop {
                let current = node.value.load_full();

                if let Some(entry) = current.as_ref().filter(|e| *e.key == *key) {
                    let Some(new) = decide(Some(entry)) else {
                        return SetOutcome::Unchanged(current);
                    };
                    if publish(&node.value, &current, Some(Arc::clone(&new)))
                        && node.kept_write(None)
                    {
                        return SetOutcome::Stored {
                            previous: current,
                            current: new,
                        };
                    }
                    continue 'restart;
                }

                let children = node.children.load_full();
                let parked = current
                    .as_ref()
                    .is_some_and(|entry| entry.is_parked_at(node.depth));

                if children.is_some() && parked {
                    self.relocate_parked(&node);
                    continue;
                }

                let children = match children {
                    Some(children) if node.depth < key.len() => children,
                    _ => {
                        if current.is_some() {
                            // a longer key is parked here and has to move down first
                            Self::ensure_children(&node);
                            continue;
                        }
                        let Some(new) = decide(None) else {
                            return SetOutcome::Unchanged(None);
                        };
                        if !publish(&node.value, &None, Some(Arc::clone(&new))) {
                            continue;
                        }
                        if node.kept_write(None) {
                            return SetOutcome::Stored {
                                previous: None,
                                current: new,
                            };
                        }
                        continue 'restart;
                    }
                };

                let byte = key[node.depth];
                let slot = &children.slots[usize::from(byte)];
                if let Some(child) = slot.load_full() {
                    node = child;
                    continue;
                }

                let Some(new) = decide(None) else {
                    return SetOutcome::Unchanged(None);
                };
                let child = Node::new(node.depth + 1, byte, Some(Arc::clone(&new)));
                if !publish(slot, &None, Some(child)) {
                    continue;
                }
                if node.kept_write(Some(&children)) {
                    return SetOutcome::Stored {
                        previous: None,
                        current: new,
                    };
                }
                continue 'restart;
            }
        }
    }

    fn set_value(
        &self,
        key: &[u8],
        decide: &mut dyn FnMut(Option<&Arc<Entry<T>>>) -> Option<Arc<Entry<T>>>,
    ) -> SetOutcome<T> {
        let root = Arc::clone(&self.root);
        self.set_value_from(&root, key, decide)
    }

    /// Moves a parked entry into the children of `node`: the copy below is
    /// published first, then the parked slot is cleared.
    fn relocate_parked(&self, node: &Arc<Node<T>>) {
        loop {
            let current = node.value.load_full();
            let Some(parked) = current.as_ref().filter(|e| e.is_parked_at(node.depth)) else {
                return;
            };
            let Some(children) = node.children.load_full() else {
                return;
            };

            let byte = parked.key[node.depth];
            let slot = &children.slots[usize::from(byte)];
            let child = match slot.load_full() {
                Some(child) => child,
                None => {
                    let child = Node::new(node.depth + 1, byte, Some(Arc::clone(parked)));
                    if !publish(slot, &None, Some(Arc::clone(&child))) {
                        continue;
                    }
                    child
                }
            };
            if !child
                .value
                .load_full()
                .is_some_and(|e| Arc::ptr_eq(&e, parked))
            {
                let moved = Arc::clone(parked);
                let outcome =
                    self.set_value_from(&child, &parked.key, &mut |_| Some(Arc::clone(&moved)));
                if matches!(outcome, SetOutcome::Abandoned) {
                    continue;
                }
            }
            // the copy must be reachable before the parked slot is cleared
            if !node.kept_write(Some(&children)) {
                continue;
            }

            let cleared = publish(&node.value, &current, None);
            if parked.removed.load(Ordering::SeqCst) {
                self.purge_below(node, &parked.key);
            }
            if cleared {
                return;
            }
        }
    }

    /// Removes any entry for `key` strictly below `node`.
    fn purge_below(&self, node: &Arc<Node<T>>, key: &[u8]) {
        let mut path = Vec::new();
        let mut current = Arc::clone(node);
        while current.depth < key.len() {
            let Some(children) = current.children.load_full() else {
                return;
            };
            let Some(child) = children.slots[usize::from(key[current.depth])].load_full() else {
                return;
            };
            path.push(current);
            current = child;

            let value = current.value.load_full();
            if value.as_ref().is_some_and(|e| *e.key == *key)
                && publish(&current.value, &value, None)
            {
                self.clean_up(path.clone(), Arc::clone(&current));
            }
        }
    }

    /// Removes the entry for `key` if `matches` accepts it.
    fn remove_value(
        &self,
        key: &[u8],
        matches: &dyn Fn(&Arc<Entry<T>>) -> bool,
    ) -> Option<Arc<Entry<T>>> {
        'restart: loop {
            let mut path = Vec::new();
            let mut node = Arc::clone(&self.root);
            loop {
                let current = node.value.load_full();
                if let Some(entry) = current.as_ref().filter(|e| *e.key == *key) {
                    if !matches(entry) {
                        return None;
                    }
                    entry.removed.store(true, Ordering::SeqCst);
                    if !publish(&node.value, &current, None) {
                        continue 'restart;
                    }
                    let removed = Arc::clone(entry);
                    self.purge_below(&node, key);
                    self.clean_up(path, node);
                    return Some(removed);
                }
                if node.depth >= key.len() {
                    return None;
                }
                let children = node.children.load_full()?;
                let child = children.slots[usize::from(key[node.depth])].load_full()?;
                path.push(node);
                node = child;
            }
        }
    }

    /// Walks up from `node`, dropping empty children arrays and detaching
    /// nodes left with neither a value nor children. The root stays.
    fn clean_up(&self, mut path: Vec<Arc<Node<T>>>, mut node: Arc<Node<T>>) {
        loop {
            if !node.seal() {
                return;
            }
            let children = node.children.load_full();
            if children.as_ref().is_some_and(|c| c.is_empty()) {
                publish(&node.children, &children, None);
            }
            let vacant = node.value.load().is_none() && node.children.load().is_none();

            let Some(parent) = path.pop().filter(|_| vacant) else {
                node.state.store(OPEN, Ordering::SeqCst);
                return;
            };
            // the parent's array only goes away through `clear`
            if let Some(siblings) = parent.children.load_full() {
                let slot = &siblings.slots[usize::from(node.discriminator)];
                publish(slot, &Some(Arc::clone(&node)), None);
            }
            node.state.store(DETACHED, Ordering::SeqCst);
            node = parent;
        }
    }
}

fn subtree_is_empty<T>(node: &Node<T>) -> bool {
    if node.value.load().is_some() {
        return false;
    }
    match node.children.load_full() {
        None => true,
        Some(children) => children
            .slots
            .iter()
            .all(|slot| slot.load_full().map_or(true, |child| subtree_is_empty(&child))),
    }
}

impl<T: Clone> ByteTree<T> {
    /// Adds `value` unless `key` is present. Returns whether it was added.
    pub fn try_add(&self, key: &[u8], value: T) -> bool {
        let outcome = self.set_value(key, &mut |current| {
            current.is_none().then(|| Entry::new(key, value.clone()))
        });
        matches!(outcome, SetOutcome::Stored { .. })
    }

    pub fn add(&self, key: &[u8], value: T) -> Result<(), DomainError> {
        if self.try_add(key, value) {
            Ok(())
        } else {
            Err(DomainError::KeyAlreadyExists)
        }
    }

    /// Stores `value` under `key`, returning the value it replaced.
    pub fn set(&self, key: &[u8], value: T) -> Option<T> {
        match self.set_value(key, &mut |_| Some(Entry::new(key, value.clone()))) {
            SetOutcome::Stored { previous, .. } => previous.map(|e| e.value.clone()),
            SetOutcome::Unchanged(_) | SetOutcome::Abandoned => None,
        }
    }

    pub fn try_get(&self, key: &[u8]) -> Option<T> {
        self.get_value(key).map(|entry| entry.value.clone())
    }

    pub fn get(&self, key: &[u8]) -> Result<T, DomainError> {
        self.try_get(key).ok_or(DomainError::KeyNotFound)
    }

    /// Inserts `add(key)` when absent, otherwise replaces the value with
    /// `update(key, old)`. Returns the stored value.
    pub fn add_or_update(
        &self,
        key: &[u8],
        mut add: impl FnMut(&[u8]) -> T,
        mut update: impl FnMut(&[u8], &T) -> T,
    ) -> T {
        let outcome = self.set_value(key, &mut |current| {
            let value = match current {
                Some(entry) => update(key, &entry.value),
                None => add(key),
            };
            Some(Entry::new(key, value))
        });
        match outcome {
            SetOutcome::Stored { current, .. } => current.value.clone(),
            SetOutcome::Unchanged(Some(entry)) => entry.value.clone(),
            SetOutcome::Unchanged(None) | SetOutcome::Abandoned => add(key),
        }
    }

    /// Returns the value for `key`, adding `factory(key)` first if absent.
    pub fn get_or_add(&self, key: &[u8], mut factory: impl FnMut(&[u8]) -> T) -> T {
        if let Some(value) = self.try_get(key) {
            return value;
        }
        let outcome = self.set_value(key, &mut |current| {
            current.is_none().then(|| Entry::new(key, factory(key)))
        });
        match outcome {
            SetOutcome::Stored { current, .. } => current.value.clone(),
            SetOutcome::Unchanged(Some(entry)) => entry.value.clone(),
            SetOutcome::Unchanged(None) | SetOutcome::Abandoned => factory(key),
        }
    }

    pub fn try_remove(&self, key: &[u8]) -> Option<T> {
        self.remove_value(key, &|_: &Arc<Entry<T>>| true).map(|entry| entry.value.clone())
    }
}

impl<T: Clone + PartialEq> ByteTree<T> {
    /// Replaces the value for `key` with `new_value` only while it still
    /// equals `comparison`.
    pub fn try_update(&self, key: &[u8], new_value: T, comparison: &T) -> bool {
        let outcome = self.set_value(key, &mut |current| match current {
            Some(entry) if entry.value == *comparison => Some(Entry::new(key, new_value.clone())),
            _ => None,
        });
        matches!(outcome, SetOutcome::Stored { .. })
    }
}
