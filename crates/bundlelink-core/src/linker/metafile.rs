//! Metafile Builder (spec §4.7): a structured, serializable build report
//! — per-input size and chunk membership, per-output chunk inputs/bytes/
//! imported chunks, and the one-directional JS-entry→CSS-chunk
//! association.
//!
//! New module — the teacher's `bundler` emits no build report at all; the
//! shape here follows the spec's own field list, serialized with `serde`
//! the way every other structured-output type in this workspace is
//! (`compiler::spec::TranspileOutput`, `config`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::assembly::AssembledChunk;
use super::graph::{EntryId, ModuleGraph, ModuleId};
use super::loader::ChunkKind;
use super::reachability::ChunkGraph;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputMeta {
    pub bytes: usize,
    pub imports: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputMeta {
    pub bytes: usize,
    pub inputs: Vec<String>,
    pub imports: Vec<String>,
    pub entry_point: Option<String>,
    pub css_chunk: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Metafile {
    pub inputs: HashMap<String, InputMeta>,
    pub outputs: HashMap<String, OutputMeta>,
}

impl Metafile {
    #[must_use]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Build the metafile from the final graph, chunk assignment, entry
/// list, and assembled chunks.
#[must_use]
pub fn build(
    graph: &ModuleGraph,
    chunk_graph: &ChunkGraph,
    entries: &[(EntryId, ModuleId)],
    chunks: &[AssembledChunk],
) -> Metafile {
    let mut meta = Metafile::default();

    for (_, module) in graph.iter() {
        let imports: Vec<String> = module
            .imports
            .iter()
            .filter_map(|i| i.target())
            .filter_map(|target| graph.get(target))
            .map(|m| m.path.clone())
            .collect();
        meta.inputs.insert(
            module.path.clone(),
            InputMeta {
                bytes: module.source.len(),
                imports,
            },
        );
    }

    let entry_paths: HashMap<ModuleId, EntryId> = entries.iter().map(|(e, m)| (*m, *e)).collect();

    for chunk_info in chunk_graph.chunks() {
        let Some(assembled) = chunks.iter().find(|c| c.chunk_id == chunk_info.id) else {
            continue;
        };

        let inputs: Vec<String> = chunk_info
            .modules
            .iter()
            .filter_map(|&id| graph.get(id))
            .map(|m| m.path.clone())
            .collect();

        let imported_chunks = super::assembly::compute_consumer_edges(graph, chunk_graph)
            .into_iter()
            .filter(|(to, _)| *to == chunk_info.id)
            .flat_map(|(_, froms)| froms.into_keys())
            .filter_map(|id| chunks.iter().find(|c| c.chunk_id == id))
            .map(|c| c.output_path.clone())
            .collect();

        let entry_point = chunk_info
            .modules
            .iter()
            .find_map(|m| entry_paths.get(m))
            .and_then(|_| {
                chunk_info
                    .modules
                    .iter()
                    .filter_map(|&id| graph.get(id))
                    .find(|m| m.is_entry)
                    .map(|m| m.path.clone())
            });

        let css_chunk = if chunk_info.kind == ChunkKind::Js {
            chunk_info
                .modules
                .iter()
                .find_map(|m| entry_paths.get(m))
                .and_then(|&entry_id| chunk_graph.css_chunk_for_entry(entry_id))
                .and_then(|css_id| chunks.iter().find(|c| c.chunk_id == css_id))
                .map(|c| c.output_path.clone())
        } else {
            None
        };

        meta.outputs.insert(
            assembled.output_path.clone(),
            OutputMeta {
                bytes: assembled.byte_size,
                inputs,
                imports: imported_chunks,
                entry_point,
                css_chunk,
            },
        );
    }

    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::graph::{EntryBitset, Module};
    use super::super::loader::Loader;
    use super::super::reachability::{assign_chunks, compute_entry_bitsets};
    use super::super::symbol::SymbolTable;
    use super::super::LinkerConfig;

    #[test]
    fn metafile_records_input_sizes_and_output_bytes() {
        let mut graph = ModuleGraph::new();
        let a = graph.add(Module {
            path: "/a.ts".into(),
            loader: Loader::Js,
            is_entry: true,
            source: "const x = 1;".into(),
            imports: Vec::new(),
            has_side_effects: true,
            entry_bitset: EntryBitset::new(),
            dependencies: Vec::new(),
            dynamic_dependencies: Vec::new(),
        });
        let entries = vec![(EntryId(0), a)];
        compute_entry_bitsets(&mut graph, &entries);
        let chunk_graph = assign_chunks(&graph, &entries);
        let symbols = SymbolTable::new();
        let config = LinkerConfig::default();
        let chunks = super::super::assembly::assemble(&graph, &symbols, &chunk_graph, &config);

        let metafile = build(&graph, &chunk_graph, &entries, &chunks);
        assert_eq!(metafile.inputs.get("/a.ts").unwrap().bytes, 12);
        assert_eq!(metafile.outputs.len(), 1);
    }
}
