//! Key binding registry: an ordered binding list behind a prefix trie.
//!
//! Lookup has two directions: exact matches for a fed key sequence, and
//! "starting with" matches that tell the processor a longer binding is still
//! reachable. Both honor the `Any` wildcard, which is stored as its own edge
//! kind so a wildcard binding never collides with a literal one.
//!
//! Design invariants:
//! * The trie and the per-sequence lookup memos are rebuilt lazily after any
//!   mutation; `version()` is the invalidation hash consumers compare across
//!   frames.
//! * `get_bindings_for_keys` orders results by ascending wildcard count,
//!   then registration order. The processor's "last match wins" rule picks
//!   from the tail of that list.
//! * Filters do not participate in the trie; they gate candidacy at the
//!   call site (the processor evaluates them per lookup).

use crate::keys::KeyOrChar;
use crate::processor::KeyPressEvent;
use ahash::AHashMap;
use smallvec::SmallVec;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, OnceLock};
use stroke_core::{Filter, HandlerOutcome};
use tracing::trace;

/// Lookup memos are cleared wholesale past this many distinct sequences.
const LOOKUP_CACHE_MAX: usize = 10_000;

pub type HandlerResult = anyhow::Result<HandlerOutcome>;
pub type Handler = Arc<dyn Fn(&mut KeyPressEvent<'_>) -> HandlerResult + Send + Sync>;
pub type SaveBefore = Arc<dyn Fn(&KeyPressEvent<'_>) -> bool + Send + Sync>;

// -------------------------------------------------------------------------------------------------
// Binding
// -------------------------------------------------------------------------------------------------

#[derive(Clone)]
pub struct Binding {
    keys: Vec<KeyOrChar>,
    handler: Handler,
    pub filter: Filter,
    pub eager: Filter,
    pub is_global: Filter,
    pub save_before: SaveBefore,
    pub record_in_macro: Filter,
}

impl Binding {
    /// # Panics
    ///
    /// Panics when `keys` is empty (a binding must consume at least one key).
    pub fn new(
        keys: Vec<KeyOrChar>,
        handler: impl Fn(&mut KeyPressEvent<'_>) -> HandlerResult + Send + Sync + 'static,
    ) -> Self {
        assert!(!keys.is_empty(), "binding registered with an empty key sequence");
        Self {
            keys,
            handler: Arc::new(handler),
            filter: Filter::always(),
            eager: Filter::never(),
            is_global: Filter::never(),
            save_before: Arc::new(|_| true),
            record_in_macro: Filter::always(),
        }
    }

    pub fn keys(&self) -> &[KeyOrChar] {
        &self.keys
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_eager(mut self, eager: Filter) -> Self {
        self.eager = eager;
        self
    }

    pub fn with_is_global(mut self, is_global: Filter) -> Self {
        self.is_global = is_global;
        self
    }

    pub fn with_save_before(
        mut self,
        save_before: impl Fn(&KeyPressEvent<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.save_before = Arc::new(save_before);
        self
    }

    pub fn with_record_in_macro(mut self, record: Filter) -> Self {
        self.record_in_macro = record;
        self
    }

    pub fn call(&self, event: &mut KeyPressEvent<'_>) -> HandlerResult {
        (self.handler)(event)
    }

    fn wildcard_count(&self) -> usize {
        self.keys.iter().filter(|k| k.is_any()).count()
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding").field("keys", &self.keys).finish()
    }
}

// -------------------------------------------------------------------------------------------------
// Trie
// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Edge {
    key: KeyOrChar,
    next: usize,
}

#[derive(Debug, Clone, Default)]
struct Node {
    edges: SmallVec<[Edge; 4]>,
    /// Indices into the binding list terminating at this node.
    terminals: SmallVec<[usize; 2]>,
}

#[derive(Debug, Default)]
struct Trie {
    nodes: Vec<Node>,
}

impl Trie {
    fn build(bindings: &[Arc<Binding>]) -> Self {
        let mut trie = Trie {
            nodes: vec![Node::default()],
        };
        for (idx, binding) in bindings.iter().enumerate() {
            let mut cur = 0usize;
            for key in binding.keys() {
                let next = match trie.nodes[cur].edges.iter().find(|e| e.key == *key) {
                    Some(edge) => edge.next,
                    None => {
                        let new_idx = trie.nodes.len();
                        trie.nodes.push(Node::default());
                        trie.nodes[cur].edges.push(Edge {
                            key: *key,
                            next: new_idx,
                        });
                        new_idx
                    }
                };
                cur = next;
            }
            trie.nodes[cur].terminals.push(idx);
        }
        trie
    }

    /// Indices of bindings whose sequences match `keys` exactly, with the
    /// number of wildcard positions used on that path.
    fn exact_matches(&self, keys: &[KeyOrChar]) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, usize, usize)> = vec![(0, 0, 0)]; // (node, pos, anys)
        while let Some((node, pos, anys)) = stack.pop() {
            if pos == keys.len() {
                for &t in &self.nodes[node].terminals {
                    out.push((anys, t));
                }
                continue;
            }
            for edge in &self.nodes[node].edges {
                if edge.key.is_any() {
                    stack.push((edge.next, pos + 1, anys + 1));
                } else if edge.key == keys[pos] {
                    stack.push((edge.next, pos + 1, anys));
                }
            }
        }
        out
    }

    /// Indices of bindings whose sequences are strictly longer than `keys`
    /// and have `keys` as a matching prefix.
    fn prefix_matches(&self, keys: &[KeyOrChar]) -> Vec<usize> {
        let mut reached = Vec::new();
        let mut stack: Vec<(usize, usize)> = vec![(0, 0)];
        while let Some((node, pos)) = stack.pop() {
            if pos == keys.len() {
                reached.push(node);
                continue;
            }
            for edge in &self.nodes[node].edges {
                if edge.key.is_any() || edge.key == keys[pos] {
                    stack.push((edge.next, pos + 1));
                }
            }
        }
        let mut out = Vec::new();
        for node in reached {
            self.collect_descendants(node, &mut out);
        }
        out
    }

    fn collect_descendants(&self, node: usize, out: &mut Vec<usize>) {
        for edge in &self.nodes[node].edges {
            out.extend(self.nodes[edge.next].terminals.iter().copied());
            self.collect_descendants(edge.next, out);
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Registry trait
// -------------------------------------------------------------------------------------------------

pub trait KeyBindingsBase: Send + Sync {
    /// Invalidation hash: changes whenever the effective binding list does.
    fn version(&self) -> u64;

    /// All bindings in registration order.
    fn bindings(&self) -> Vec<Arc<Binding>>;

    /// Bindings matching `keys` exactly (wildcards honored), ordered by
    /// ascending wildcard count then registration order.
    fn get_bindings_for_keys(&self, keys: &[KeyOrChar]) -> Vec<Arc<Binding>>;

    /// Bindings for which `keys` is a strict proper prefix.
    fn get_bindings_starting_with_keys(&self, keys: &[KeyOrChar]) -> Vec<Arc<Binding>>;
}

fn empty_bindings() -> Arc<KeyBindings> {
    static EMPTY: OnceLock<Arc<KeyBindings>> = OnceLock::new();
    EMPTY.get_or_init(|| Arc::new(KeyBindings::new())).clone()
}

// -------------------------------------------------------------------------------------------------
// Concrete registry
// -------------------------------------------------------------------------------------------------

#[derive(Default)]
struct LookupState {
    /// Version the memos below were built against.
    version: u64,
    trie: Option<Trie>,
    for_keys: AHashMap<Vec<KeyOrChar>, Vec<Arc<Binding>>>,
    starting_with: AHashMap<Vec<KeyOrChar>, Vec<Arc<Binding>>>,
}

pub struct KeyBindings {
    bindings: Vec<Arc<Binding>>,
    version: u64,
    lookup: Mutex<LookupState>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyBindings {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
            version: 0,
            lookup: Mutex::new(LookupState::default()),
        }
    }

    pub fn from_bindings(bindings: Vec<Arc<Binding>>) -> Self {
        let mut kb = Self::new();
        kb.bindings = bindings;
        kb.version = 1;
        kb
    }

    /// Register a binding built elsewhere.
    pub fn add_binding(&mut self, binding: Binding) {
        self.bindings.push(Arc::new(binding));
        self.invalidate();
    }

    /// Register a handler for a key sequence given as spellings
    /// (`kb.add(&["c-x", "c-c"], handler)`).
    ///
    /// # Panics
    ///
    /// Panics on an empty sequence or unknown key spelling.
    pub fn add(
        &mut self,
        keys: &[&str],
        handler: impl Fn(&mut KeyPressEvent<'_>) -> HandlerResult + Send + Sync + 'static,
    ) {
        self.add_binding(Binding::new(crate::keys::parse_key_sequence(keys), handler));
    }

    /// Remove the most recently registered binding for `keys`. Returns
    /// whether one was found.
    pub fn remove(&mut self, keys: &[KeyOrChar]) -> bool {
        match self.bindings.iter().rposition(|b| b.keys() == keys) {
            Some(idx) => {
                self.bindings.remove(idx);
                self.invalidate();
                true
            }
            None => false,
        }
    }

    fn invalidate(&mut self) {
        self.version = self.version.wrapping_add(1);
        trace!(target: "keys.registry", version = self.version, count = self.bindings.len(), "invalidated");
    }

    fn with_lookup<R>(&self, f: impl FnOnce(&Trie, &mut LookupState) -> R) -> R {
        let mut state = self.lookup.lock().unwrap();
        let stale = state.trie.is_none() || state.version != self.version;
        if stale {
            state.trie = Some(Trie::build(&self.bindings));
            state.for_keys.clear();
            state.starting_with.clear();
            state.version = self.version;
        }
        if state.for_keys.len() > LOOKUP_CACHE_MAX || state.starting_with.len() > LOOKUP_CACHE_MAX {
            state.for_keys.clear();
            state.starting_with.clear();
        }
        let trie = state.trie.take().unwrap();
        let result = f(&trie, &mut state);
        state.trie = Some(trie);
        result
    }
}

impl KeyBindingsBase for KeyBindings {
    fn version(&self) -> u64 {
        self.version
    }

    fn bindings(&self) -> Vec<Arc<Binding>> {
        self.bindings.clone()
    }

    fn get_bindings_for_keys(&self, keys: &[KeyOrChar]) -> Vec<Arc<Binding>> {
        self.with_lookup(|trie, state| {
            if let Some(hit) = state.for_keys.get(keys) {
                return hit.clone();
            }
            let mut matches = trie.exact_matches(keys);
            matches.sort_unstable();
            let result: Vec<Arc<Binding>> = matches
                .into_iter()
                .map(|(_anys, idx)| self.bindings[idx].clone())
                .collect();
            state.for_keys.insert(keys.to_vec(), result.clone());
            result
        })
    }

    fn get_bindings_starting_with_keys(&self, keys: &[KeyOrChar]) -> Vec<Arc<Binding>> {
        self.with_lookup(|trie, state| {
            if let Some(hit) = state.starting_with.get(keys) {
                return hit.clone();
            }
            let mut indices = trie.prefix_matches(keys);
            indices.sort_unstable();
            indices.dedup();
            let result: Vec<Arc<Binding>> = indices
                .into_iter()
                .map(|idx| self.bindings[idx].clone())
                .collect();
            state.starting_with.insert(keys.to_vec(), result.clone());
            result
        })
    }
}

// -------------------------------------------------------------------------------------------------
// Merged registries
// -------------------------------------------------------------------------------------------------

struct MergedCache {
    child_versions: Vec<u64>,
    flat: Arc<KeyBindings>,
}

/// Logical union of several registries, preserving registration order across
/// constituents. The flattened view is rebuilt whenever any child's version
/// changes; the merged version is the hash of the child version tuple.
pub struct MergedKeyBindings {
    registries: Vec<Arc<dyn KeyBindingsBase>>,
    cache: Mutex<Option<MergedCache>>,
}

impl MergedKeyBindings {
    pub fn new(registries: Vec<Arc<dyn KeyBindingsBase>>) -> Self {
        Self {
            registries,
            cache: Mutex::new(None),
        }
    }

    fn flattened(&self) -> Arc<KeyBindings> {
        let versions: Vec<u64> = self.registries.iter().map(|r| r.version()).collect();
        let mut cache = self.cache.lock().unwrap();
        if let Some(c) = cache.as_ref()
            && c.child_versions == versions
        {
            return c.flat.clone();
        }
        let mut all = Vec::new();
        for registry in &self.registries {
            all.extend(registry.bindings());
        }
        trace!(target: "keys.registry", children = self.registries.len(), bindings = all.len(), "merged_rebuild");
        let flat = Arc::new(KeyBindings::from_bindings(all));
        *cache = Some(MergedCache {
            child_versions: versions,
            flat: flat.clone(),
        });
        cache.as_ref().unwrap().flat.clone()
    }
}

/// Union of registries: `merge_key_bindings([a, b])`.
pub fn merge_key_bindings(registries: Vec<Arc<dyn KeyBindingsBase>>) -> MergedKeyBindings {
    MergedKeyBindings::new(registries)
}

impl KeyBindingsBase for MergedKeyBindings {
    fn version(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for registry in &self.registries {
            registry.version().hash(&mut hasher);
        }
        hasher.finish()
    }

    fn bindings(&self) -> Vec<Arc<Binding>> {
        self.flattened().bindings()
    }

    fn get_bindings_for_keys(&self, keys: &[KeyOrChar]) -> Vec<Arc<Binding>> {
        self.flattened().get_bindings_for_keys(keys)
    }

    fn get_bindings_starting_with_keys(&self, keys: &[KeyOrChar]) -> Vec<Arc<Binding>> {
        self.flattened().get_bindings_starting_with_keys(keys)
    }
}

// -------------------------------------------------------------------------------------------------
// Conditional wrapper
// -------------------------------------------------------------------------------------------------

/// Gates every binding of the wrapped registry behind an extra filter
/// (AND-composed with each binding's own filter).
pub struct ConditionalKeyBindings {
    inner: Arc<dyn KeyBindingsBase>,
    filter: Filter,
    cache: Mutex<Option<(u64, Arc<KeyBindings>)>>,
}

impl ConditionalKeyBindings {
    pub fn new(inner: Arc<dyn KeyBindingsBase>, filter: Filter) -> Self {
        Self {
            inner,
            filter,
            cache: Mutex::new(None),
        }
    }

    fn wrapped(&self) -> Arc<KeyBindings> {
        let version = self.inner.version();
        let mut cache = self.cache.lock().unwrap();
        if let Some((v, flat)) = cache.as_ref()
            && *v == version
        {
            return flat.clone();
        }
        let wrapped: Vec<Arc<Binding>> = self
            .inner
            .bindings()
            .into_iter()
            .map(|b| {
                let mut clone = (*b).clone();
                clone.filter = b.filter.clone() & self.filter.clone();
                Arc::new(clone)
            })
            .collect();
        let flat = Arc::new(KeyBindings::from_bindings(wrapped));
        *cache = Some((version, flat.clone()));
        flat
    }
}

impl KeyBindingsBase for ConditionalKeyBindings {
    fn version(&self) -> u64 {
        self.inner.version()
    }

    fn bindings(&self) -> Vec<Arc<Binding>> {
        self.wrapped().bindings()
    }

    fn get_bindings_for_keys(&self, keys: &[KeyOrChar]) -> Vec<Arc<Binding>> {
        self.wrapped().get_bindings_for_keys(keys)
    }

    fn get_bindings_starting_with_keys(&self, keys: &[KeyOrChar]) -> Vec<Arc<Binding>> {
        self.wrapped().get_bindings_starting_with_keys(keys)
    }
}

// -------------------------------------------------------------------------------------------------
// Dynamic wrapper
// -------------------------------------------------------------------------------------------------

pub type BindingsResolver = Arc<dyn Fn() -> Option<Arc<dyn KeyBindingsBase>> + Send + Sync>;

/// Delegates to whatever registry the resolver currently returns; `None`
/// behaves as an empty registry. Resolver panics propagate to the caller.
pub struct DynamicKeyBindings {
    resolver: BindingsResolver,
}

impl DynamicKeyBindings {
    pub fn new(resolver: impl Fn() -> Option<Arc<dyn KeyBindingsBase>> + Send + Sync + 'static) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }

    fn resolve(&self) -> Arc<dyn KeyBindingsBase> {
        match (self.resolver)() {
            Some(registry) => registry,
            None => empty_bindings(),
        }
    }
}

impl KeyBindingsBase for DynamicKeyBindings {
    fn version(&self) -> u64 {
        let delegate = self.resolve();
        let mut hasher = DefaultHasher::new();
        (Arc::as_ptr(&delegate) as *const () as usize).hash(&mut hasher);
        delegate.version().hash(&mut hasher);
        hasher.finish()
    }

    fn bindings(&self) -> Vec<Arc<Binding>> {
        self.resolve().bindings()
    }

    fn get_bindings_for_keys(&self, keys: &[KeyOrChar]) -> Vec<Arc<Binding>> {
        self.resolve().get_bindings_for_keys(keys)
    }

    fn get_bindings_starting_with_keys(&self, keys: &[KeyOrChar]) -> Vec<Arc<Binding>> {
        self.resolve().get_bindings_starting_with_keys(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{Key, parse_key_sequence};
    use pretty_assertions::assert_eq;

    fn handler(_: &mut KeyPressEvent<'_>) -> HandlerResult {
        Ok(HandlerOutcome::Handled)
    }

    fn keyseq(specs: &[&str]) -> Vec<KeyOrChar> {
        parse_key_sequence(specs)
    }

    #[test]
    #[should_panic(expected = "empty key sequence")]
    fn empty_sequence_panics() {
        Binding::new(vec![], handler);
    }

    #[test]
    fn exact_lookup_requires_equal_length() {
        let mut kb = KeyBindings::new();
        kb.add(&["c-x", "c-c"], handler);
        assert!(kb.get_bindings_for_keys(&keyseq(&["c-x"])).is_empty());
        assert_eq!(kb.get_bindings_for_keys(&keyseq(&["c-x", "c-c"])).len(), 1);
        assert!(
            kb.get_bindings_for_keys(&keyseq(&["c-x", "c-c", "a"]))
                .is_empty()
        );
    }

    #[test]
    fn starting_with_is_strict_prefix() {
        let mut kb = KeyBindings::new();
        kb.add(&["c-x", "c-c"], handler);
        kb.add(&["c-x"], handler);
        assert_eq!(
            kb.get_bindings_starting_with_keys(&keyseq(&["c-x"])).len(),
            1
        );
        assert_eq!(kb.get_bindings_starting_with_keys(&[]).len(), 2);
        assert!(
            kb.get_bindings_starting_with_keys(&keyseq(&["c-x", "c-c"]))
                .is_empty()
        );
    }

    #[test]
    fn wildcard_matches_any_single_key() {
        let mut kb = KeyBindings::new();
        kb.add(&["<any>"], handler);
        assert_eq!(kb.get_bindings_for_keys(&[KeyOrChar::Char('z')]).len(), 1);
        assert_eq!(
            kb.get_bindings_for_keys(&[KeyOrChar::Key(Key::F5)]).len(),
            1
        );
        assert!(kb.get_bindings_for_keys(&keyseq(&["a", "b"])).is_empty());
    }

    #[test]
    fn fewer_wildcards_sort_first() {
        let mut kb = KeyBindings::new();
        kb.add(&["<any>"], handler);
        kb.add(&["a"], handler);
        let matches = kb.get_bindings_for_keys(&[KeyOrChar::Char('a')]);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].keys(), keyseq(&["a"]).as_slice());
        assert_eq!(matches[1].keys(), keyseq(&["<any>"]).as_slice());
    }

    #[test]
    fn registration_order_breaks_ties() {
        let mut kb = KeyBindings::new();
        kb.add(&["a"], handler);
        kb.add(&["a"], handler);
        let matches = kb.get_bindings_for_keys(&[KeyOrChar::Char('a')]);
        assert_eq!(matches.len(), 2);
        let all = kb.bindings();
        assert!(Arc::ptr_eq(&matches[0], &all[0]));
        assert!(Arc::ptr_eq(&matches[1], &all[1]));
    }

    #[test]
    fn remove_drops_last_registration() {
        let mut kb = KeyBindings::new();
        kb.add(&["a"], handler);
        let v1 = kb.version();
        assert!(kb.remove(&keyseq(&["a"])));
        assert_ne!(kb.version(), v1);
        assert!(!kb.remove(&keyseq(&["a"])));
        assert!(kb.get_bindings_for_keys(&keyseq(&["a"])).is_empty());
    }

    #[test]
    fn merged_concatenates_in_order() {
        let mut a = KeyBindings::new();
        a.add(&["x"], handler);
        let mut b = KeyBindings::new();
        b.add(&["x"], handler);
        b.add(&["y"], handler);
        let merged = merge_key_bindings(vec![Arc::new(a), Arc::new(b)]);
        assert_eq!(merged.bindings().len(), 3);
        let matches = merged.get_bindings_for_keys(&keyseq(&["x"]));
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn merged_version_tracks_children() {
        let a = Arc::new(KeyBindings::new());
        let b = Arc::new(KeyBindings::new());
        let merged = merge_key_bindings(vec![a.clone(), b]);
        let v1 = merged.version();
        // Same children, same versions: stable hash.
        assert_eq!(merged.version(), v1);
    }

    #[test]
    fn conditional_gates_candidacy() {
        let mut kb = KeyBindings::new();
        kb.add(&["a"], handler);
        let conditional = ConditionalKeyBindings::new(Arc::new(kb), Filter::never());
        let matches = conditional.get_bindings_for_keys(&keyseq(&["a"]));
        assert_eq!(matches.len(), 1);
        assert!(!matches[0].filter.eval());
    }

    #[test]
    fn dynamic_none_is_empty() {
        let dynamic = DynamicKeyBindings::new(|| None);
        assert!(dynamic.get_bindings_for_keys(&keyseq(&["a"])).is_empty());
        assert!(dynamic.bindings().is_empty());
    }

    #[test]
    fn dynamic_delegates() {
        let mut kb = KeyBindings::new();
        kb.add(&["a"], handler);
        let shared: Arc<dyn KeyBindingsBase> = Arc::new(kb);
        let delegate = shared.clone();
        let dynamic = DynamicKeyBindings::new(move || Some(delegate.clone()));
        assert_eq!(dynamic.get_bindings_for_keys(&keyseq(&["a"])).len(), 1);
    }
}
