//! Reachability & Chunk Assigner (spec §4.1).
//!
//! Computes each module's entry bitset, groups modules with equal
//! bitsets into chunks (one per applicable loader kind), associates CSS
//! chunks with the JS entries that reach them (the two-to-one case), and
//! optionally merges undersized chunks into their most frequent consumer.
//!
//! Grounded in the teacher's `bundler::chunks::ChunkGraph` (dynamic-import
//! split points found by walking `dynamic_dependencies`, chunks built by
//! a DFS from each split point), generalized from "one chunk per dynamic
//! entry" to the spec's "one chunk per distinct entry bitset, per kind".

use std::collections::HashMap;

use super::graph::{EntryBitset, EntryId, ModuleGraph, ModuleId};
use super::loader::ChunkKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub u32);

#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: ChunkId,
    pub kind: ChunkKind,
    pub entry_bitset: EntryBitset,
    pub modules: Vec<ModuleId>,
}

#[derive(Debug, Default)]
pub struct ChunkGraph {
    chunks: Vec<Chunk>,
    module_chunk: HashMap<(ModuleId, ChunkKind), ChunkId>,
    /// JS entry -> CSS chunk, modeled one-directionally per spec §4.7
    /// ("the metafile records this association one-directionally").
    entry_css_chunk: HashMap<EntryId, ChunkId>,
}

impl ChunkGraph {
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    #[must_use]
    pub fn chunk_for_module(&self, module: ModuleId, kind: ChunkKind) -> Option<ChunkId> {
        self.module_chunk.get(&(module, kind)).copied()
    }

    #[must_use]
    pub fn css_chunk_for_entry(&self, entry: EntryId) -> Option<ChunkId> {
        self.entry_css_chunk.get(&entry).copied()
    }

    fn chunk_mut(&mut self, id: ChunkId) -> &mut Chunk {
        &mut self.chunks[id.0 as usize]
    }
}

/// Propagate entry bitsets outward from each entry module over every
/// edge kind (static, dynamic, and — since CSS `@import`/`composes`
/// targets are resolved into `dependencies` at graph-build time — those
/// too). A dynamic-import edge still propagates the bitset; it only
/// marks its target as a split-point boundary elsewhere (spec §4.1).
pub fn compute_entry_bitsets(graph: &mut ModuleGraph, entries: &[(EntryId, ModuleId)]) {
    for (entry_id, root) in entries {
        let mut stack = vec![*root];
        let mut visited = std::collections::HashSet::new();
        while let Some(module_id) = stack.pop() {
            if !visited.insert(module_id) {
                continue;
            }
            let Some(module) = graph.get_mut(module_id) else {
                continue;
            };
            module.entry_bitset.insert(*entry_id);
            let next: Vec<ModuleId> = module
                .dependencies
                .iter()
                .chain(module.dynamic_dependencies.iter())
                .copied()
                .collect();
            stack.extend(next);
        }
    }
}

/// Group modules into chunks by equal entry bitset, one chunk per kind
/// per group (spec §4.1 "Chunk partitioning"), then associate each CSS
/// chunk with every JS entry whose singleton bitset is a subset of it.
#[must_use]
pub fn assign_chunks(graph: &ModuleGraph, entries: &[(EntryId, ModuleId)]) -> ChunkGraph {
    let mut groups: HashMap<(Vec<u64>, ChunkKind), Vec<ModuleId>> = HashMap::new();

    for (module_id, module) in graph.iter() {
        let Some(kind) = module.loader.produces_chunk_kind() else {
            continue;
        };
        let key = (bitset_key(&module.entry_bitset), kind);
        groups.entry(key).or_default().push(module_id);
    }

    let mut chunk_graph = ChunkGraph::default();
    let mut by_bitset: HashMap<Vec<u64>, HashMap<ChunkKind, ChunkId>> = HashMap::new();

    // Deterministic chunk creation order: sort groups by bitset key then
    // kind so chunk ids are stable across runs (spec §8 Determinism).
    let mut ordered: Vec<_> = groups.into_iter().collect();
    ordered.sort_by(|(a, _), (b, _)| a.cmp(b));

    for ((bitset_key_val, kind), mut modules) in ordered {
        modules.sort();
        let entry_bitset = graph
            .get(modules[0])
            .map(|m| m.entry_bitset.clone())
            .unwrap_or_default();
        let id = ChunkId(chunk_graph.chunks.len() as u32);
        for &m in &modules {
            chunk_graph.module_chunk.insert((m, kind), id);
        }
        chunk_graph.chunks.push(Chunk {
            id,
            kind,
            entry_bitset,
            modules,
        });
        by_bitset.entry(bitset_key_val).or_default().insert(kind, id);
    }

    // Two-to-one CSS association: a CSS chunk for entry set E is
    // associated with every JS entry whose singleton bitset ⊆ E.
    for chunk in &chunk_graph.chunks {
        if chunk.kind != ChunkKind::Css {
            continue;
        }
        for (entry_id, _) in entries {
            if EntryBitset::singleton(*entry_id).is_subset_of(&chunk.entry_bitset) {
                chunk_graph.entry_css_chunk.insert(*entry_id, chunk.id);
            }
        }
    }

    chunk_graph
}

fn bitset_key(bitset: &EntryBitset) -> Vec<u64> {
    bitset.iter().map(|e| e.0 as u64).collect()
}

/// Merge the smallest chunk into its most frequent consumer until every
/// non-solitary chunk exceeds `min_size` bytes, tie-breaking by
/// lexicographic order of representative module path then kind (JS
/// before CSS) for determinism (spec §4.1).
pub fn merge_small_chunks(
    chunk_graph: &mut ChunkGraph,
    graph: &ModuleGraph,
    min_size: usize,
    consumer_edges: &HashMap<ChunkId, HashMap<ChunkId, u32>>,
) {
    loop {
        let Some(victim) = smallest_undersized_chunk(chunk_graph, graph, min_size) else {
            break;
        };
        let Some(&target) = consumer_edges
            .get(&victim)
            .and_then(|consumers| {
                consumers
                    .iter()
                    .max_by_key(|(_, &count)| count)
                    .map(|(id, _)| id)
            })
        else {
            break;
        };
        if target == victim {
            break;
        }
        merge_chunk(chunk_graph, victim, target);
    }
}

fn smallest_undersized_chunk(
    chunk_graph: &ChunkGraph,
    graph: &ModuleGraph,
    min_size: usize,
) -> Option<ChunkId> {
    let mut candidates: Vec<(usize, &Chunk)> = chunk_graph
        .chunks
        .iter()
        .filter(|c| c.modules.len() > 1 || !is_solitary(chunk_graph, c))
        .map(|c| (chunk_byte_size(c, graph), c))
        .filter(|(size, _)| *size < min_size)
        .collect();

    candidates.sort_by(|(size_a, a), (size_b, b)| {
        size_a.cmp(size_b).then_with(|| {
            let path_a = representative_path(a, graph);
            let path_b = representative_path(b, graph);
            path_a.cmp(&path_b).then(chunk_kind_rank(a.kind).cmp(&chunk_kind_rank(b.kind)))
        })
    });

    candidates.first().map(|(_, c)| c.id)
}

fn is_solitary(chunk_graph: &ChunkGraph, chunk: &Chunk) -> bool {
    chunk_graph.chunks.len() == 1 || chunk.modules.len() <= 1
}

fn chunk_byte_size(chunk: &Chunk, graph: &ModuleGraph) -> usize {
    chunk
        .modules
        .iter()
        .filter_map(|&id| graph.get(id))
        .map(|m| m.source.len())
        .sum()
}

fn representative_path<'a>(chunk: &Chunk, graph: &'a ModuleGraph) -> &'a str {
    chunk
        .modules
        .iter()
        .filter_map(|&id| graph.get(id))
        .map(|m| m.path.as_str())
        .min()
        .unwrap_or("")
}

fn chunk_kind_rank(kind: ChunkKind) -> u8 {
    match kind {
        ChunkKind::Js => 0,
        ChunkKind::Css => 1,
    }
}

fn merge_chunk(chunk_graph: &mut ChunkGraph, victim: ChunkId, target: ChunkId) {
    let victim_modules = std::mem::take(&mut chunk_graph.chunk_mut(victim).modules);
    for &m in &victim_modules {
        let kind = chunk_graph.chunks.iter().find(|c| c.id == target).unwrap().kind;
        chunk_graph.module_chunk.insert((m, kind), target);
    }
    chunk_graph.chunk_mut(target).modules.extend(victim_modules);
    chunk_graph.chunks.retain(|c| c.id != victim);
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::graph::Module;
    use super::super::loader::Loader;

    fn js_module(path: &str) -> Module {
        Module {
            path: path.to_string(),
            loader: Loader::Js,
            is_entry: false,
            source: String::new(),
            imports: Vec::new(),
            has_side_effects: true,
            entry_bitset: EntryBitset::new(),
            dependencies: Vec::new(),
            dynamic_dependencies: Vec::new(),
        }
    }

    #[test]
    fn two_entries_sharing_a_dependency_share_its_chunk() {
        let mut graph = ModuleGraph::new();
        let shared = graph.add(js_module("/shared.ts"));
        let mut a = js_module("/a.ts");
        a.dependencies.push(shared);
        let a_id = graph.add(a);
        let mut b = js_module("/b.ts");
        b.dependencies.push(shared);
        let b_id = graph.add(b);

        let entries = vec![(EntryId(0), a_id), (EntryId(1), b_id)];
        compute_entry_bitsets(&mut graph, &entries);
        let chunk_graph = assign_chunks(&graph, &entries);

        let shared_chunk = chunk_graph.chunk_for_module(shared, ChunkKind::Js);
        let a_chunk = chunk_graph.chunk_for_module(a_id, ChunkKind::Js);
        assert_ne!(shared_chunk, a_chunk);
    }

    #[test]
    fn css_chunk_associates_with_both_js_entries() {
        let mut graph = ModuleGraph::new();
        let mut css = js_module("/common.css");
        css.loader = Loader::Css;
        let css_id = graph.add(css);

        let mut foo = js_module("/foo/entry.js");
        foo.dependencies.push(css_id);
        let foo_id = graph.add(foo);

        let mut bar = js_module("/bar/entry.js");
        bar.dependencies.push(css_id);
        let bar_id = graph.add(bar);

        let entries = vec![(EntryId(0), foo_id), (EntryId(1), bar_id)];
        compute_entry_bitsets(&mut graph, &entries);
        let chunk_graph = assign_chunks(&graph, &entries);

        assert!(chunk_graph.css_chunk_for_entry(EntryId(0)).is_some());
        assert!(chunk_graph.css_chunk_for_entry(EntryId(1)).is_some());
        assert_eq!(
            chunk_graph.css_chunk_for_entry(EntryId(0)),
            chunk_graph.css_chunk_for_entry(EntryId(1))
        );
    }
}
