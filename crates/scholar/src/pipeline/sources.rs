use std::collections::HashSet;

use crate::providers::base::GroundingMetadata;

/// The urls backing a grounded answer, deduplicated in first-seen order
///
/// Chunks are visited in the order the support entries reference them. Indices that
/// point past the chunk list and chunks without a web uri are skipped. Metadata
/// without any web search queries means no search happened, so it yields nothing.
pub fn extract_source_urls(metadata: Option<&GroundingMetadata>) -> Vec<String> {
    let Some(metadata) = metadata else {
        return Vec::new();
    };
    if metadata.web_search_queries.is_none() {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    metadata
        .grounding_supports
        .iter()
        .flat_map(|support| support.grounding_chunk_indices.iter())
        .filter_map(|index| metadata.grounding_chunks.get(*index))
        .filter_map(|chunk| chunk.web.as_ref()?.uri.clone())
        .filter(|uri| seen.insert(uri.clone()))
        .collect()
}

/// Number the sources for citation, one `[n] url` line each
pub fn enumerate_sources(sources: &[String]) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(i, url)| format!("[{}] {}", i + 1, url))
        .collect::<Vec<_>>()
        .join("\n")
}
