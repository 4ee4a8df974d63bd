//! Import/export graph (spec §2, §3, §4.1): modules joined by resolved
//! import records, plus the entry bitset each module carries once
//! reachability has run.
//!
//! Grounded in the teacher's `bundler::graph::{Module, ModuleGraph}`
//! (path-indexed module list, per-module dependency lists, Kahn's
//! toposort with a cycle fallback), generalized to:
//! - a newtype `ModuleId` instead of a bare `usize`, matching the
//!   `(module-id, local-id)` pairing the symbol table needs;
//! - a `Loader` tag and entry-point flag per module (spec §3 Module);
//! - import records shaped per spec §3 (kind, resolution state, CSS
//!   condition) instead of the teacher's bundler-local `Import`;
//! - an `EntryBitset` carried per module once reachability computes it
//!   (§4.1), used as the sole chunk-grouping key.

use std::collections::HashMap;
use std::path::Path;

use super::loader::Loader;

/// Unique identifier for a module in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u32);

/// Unique identifier for an entry point (an index into the build's
/// ordered entry-point list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u32);

/// The set of entry points that transitively reach a module (spec
/// GLOSSARY: "Entry bitset"). Backed by a growable word vector rather
/// than a fixed-width integer, since a build's entry count is unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryBitset(Vec<u64>);

impl EntryBitset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn singleton(entry: EntryId) -> Self {
        let mut bits = Self::new();
        bits.insert(entry);
        bits
    }

    pub fn insert(&mut self, entry: EntryId) {
        let word = entry.0 as usize / 64;
        let bit = entry.0 as usize % 64;
        if self.0.len() <= word {
            self.0.resize(word + 1, 0);
        }
        self.0[word] |= 1u64 << bit;
    }

    pub fn union_with(&mut self, other: &EntryBitset) {
        if self.0.len() < other.0.len() {
            self.0.resize(other.0.len(), 0);
        }
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= b;
        }
    }

    #[must_use]
    pub fn contains(&self, entry: EntryId) -> bool {
        let word = entry.0 as usize / 64;
        let bit = entry.0 as usize % 64;
        self.0.get(word).is_some_and(|w| w & (1u64 << bit) != 0)
    }

    /// `true` iff every entry set in `self` is also set in `other` —
    /// used for the two-to-one CSS-chunk association rule (spec §4.1).
    #[must_use]
    pub fn is_subset_of(&self, other: &EntryBitset) -> bool {
        self.0.iter().enumerate().all(|(i, word)| {
            let other_word = other.0.get(i).copied().unwrap_or(0);
            word & !other_word == 0
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.0.iter().enumerate().flat_map(|(word_idx, &word)| {
            (0..64).filter_map(move |bit| {
                if word & (1u64 << bit) != 0 {
                    Some(EntryId((word_idx * 64 + bit) as u32))
                } else {
                    None
                }
            })
        })
    }
}

/// How an import record was introduced (spec §3 Import Record).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    ImportStatement,
    RequireCall,
    DynamicImport,
    CssAtImport,
    CssUrlToken,
    ComposesFrom,
}

/// A CSS `@import` condition tree: the layer/supports/media qualifiers
/// captured so the CSS linker can wrap inlined rules in the right
/// at-rules, outside in (spec §4.4).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportCondition {
    pub layer: Option<String>,
    pub supports: Option<String>,
    pub media: Vec<String>,
}

impl ImportCondition {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layer.is_none() && self.supports.is_none() && self.media.is_empty()
    }
}

/// How an import record's target resolved (spec §3 invariant: every
/// import record reaches exactly one of these four states).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Internal(ModuleId),
    External,
    UnresolvedError,
    UnresolvedWarningGlob,
}

/// A resolved (or failed-to-resolve) import edge (spec §3 Import Record).
#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub specifier: String,
    pub referrer: ModuleId,
    pub resolution: Resolution,
    pub kind: ImportKind,
    pub condition: Option<ImportCondition>,
    pub span: Option<(u32, u32)>,
}

impl ImportRecord {
    #[must_use]
    pub fn target(&self) -> Option<ModuleId> {
        match self.resolution {
            Resolution::Internal(id) => Some(id),
            _ => None,
        }
    }
}

/// A parsed input module (spec §3 Module).
#[derive(Debug, Clone)]
pub struct Module {
    pub path: String,
    pub loader: Loader,
    pub is_entry: bool,
    pub source: String,
    pub imports: Vec<ImportRecord>,
    /// `true` unless `sideEffects: false` in an enclosing `package.json`
    /// marks this module's top-level statements as side-effect free
    /// (spec §4.2).
    pub has_side_effects: bool,
    /// Populated by the reachability pass (§4.1); empty until then.
    pub entry_bitset: EntryBitset,
    pub dependencies: Vec<ModuleId>,
    pub dynamic_dependencies: Vec<ModuleId>,
}

/// The module dependency graph: path-indexed storage plus specifier
/// resolution, mirroring the teacher's `ModuleGraph` but keyed by the
/// `ModuleId` newtype and carrying the richer `ImportRecord`.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: Vec<Module>,
    path_to_id: HashMap<String, ModuleId>,
}

impl ModuleGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, module: Module) -> ModuleId {
        let id = ModuleId(self.modules.len() as u32);
        self.path_to_id.insert(module.path.clone(), id);
        self.modules.push(module);
        id
    }

    #[must_use]
    pub fn get(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(id.0 as usize)
    }

    #[must_use]
    pub fn get_by_path(&self, path: &Path) -> Option<(ModuleId, &Module)> {
        let path_str = path.display().to_string();
        self.path_to_id
            .get(&path_str)
            .map(|&id| (id, &self.modules[id.0 as usize]))
    }

    #[must_use]
    pub fn id_by_path(&self, path: &str) -> Option<ModuleId> {
        self.path_to_id.get(path).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules
            .iter()
            .enumerate()
            .map(|(i, m)| (ModuleId(i as u32), m))
    }

    /// Modules in dependency order (a module appears after everything it
    /// statically depends on). Cycles are broken on the last back-edge
    /// entered during the Kahn walk, matching ESM live-binding semantics
    /// (spec §4.6 "break cycles on the last-entered back-edge").
    #[must_use]
    pub fn toposort(&self) -> Vec<ModuleId> {
        let n = self.modules.len();
        if n == 0 {
            return Vec::new();
        }

        let mut in_degree = vec![0usize; n];
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (id, module) in self.modules.iter().enumerate() {
            for dep in &module.dependencies {
                adj[dep.0 as usize].push(id);
                in_degree[id] += 1;
            }
        }

        let mut queue: std::collections::VecDeque<usize> = std::collections::VecDeque::new();
        for (id, &deg) in in_degree.iter().enumerate() {
            if deg == 0 {
                queue.push_back(id);
            }
        }

        let mut order = Vec::with_capacity(n);
        let mut visited = vec![false; n];
        while let Some(id) = queue.pop_front() {
            if visited[id] {
                continue;
            }
            visited[id] = true;
            order.push(ModuleId(id as u32));
            for &next in &adj[id] {
                if in_degree[next] > 0 {
                    in_degree[next] -= 1;
                }
                if in_degree[next] == 0 && !visited[next] {
                    queue.push_back(next);
                }
            }
        }

        // Any modules left unvisited are inside a cycle: break it by
        // appending them in declaration order, which is equivalent to
        // dropping the last back-edge entered for each.
        if order.len() < n {
            for id in 0..n {
                if !visited[id] {
                    order.push(ModuleId(id as u32));
                }
            }
        }

        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(path: &str, deps: Vec<ModuleId>) -> Module {
        Module {
            path: path.to_string(),
            loader: Loader::Js,
            is_entry: false,
            source: String::new(),
            imports: Vec::new(),
            has_side_effects: true,
            entry_bitset: EntryBitset::new(),
            dependencies: deps,
            dynamic_dependencies: Vec::new(),
        }
    }

    #[test]
    fn toposort_linear_chain() {
        let mut graph = ModuleGraph::new();
        let c = graph.add(module("/c.ts", vec![]));
        let b = graph.add(module("/b.ts", vec![c]));
        let a = graph.add(module("/a.ts", vec![b]));
        assert_eq!(graph.toposort(), vec![c, b, a]);
    }

    #[test]
    fn toposort_survives_cycle() {
        let mut graph = ModuleGraph::new();
        let a = graph.add(module("/a.ts", vec![]));
        let b = graph.add(module("/b.ts", vec![a]));
        graph.get_mut(a).unwrap().dependencies.push(b);
        let order = graph.toposort();
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn entry_bitset_union_and_subset() {
        let mut a = EntryBitset::singleton(EntryId(0));
        let b = EntryBitset::singleton(EntryId(70));
        a.union_with(&b);
        assert!(a.contains(EntryId(0)));
        assert!(a.contains(EntryId(70)));
        assert!(EntryBitset::singleton(EntryId(0)).is_subset_of(&a));
        assert!(!EntryBitset::singleton(EntryId(5)).is_subset_of(&a));
    }
}
