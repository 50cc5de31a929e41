//! Conversion of host symbol results into search items.

use std::path::PathBuf;

use crate::host::{workspace_relative, DocumentSymbol, SymbolInformation};
use crate::model::{uri_to_path, SearchItem};

/// Display path for a resource: workspace-relative for files, the raw
/// identity otherwise.
pub(crate) fn display_path(roots: &[PathBuf], uri: &str) -> String {
    uri_to_path(uri).map_or_else(|| uri.to_string(), |path| workspace_relative(roots, &path))
}

/// Search item for a workspace symbol match.
#[must_use]
pub fn symbol_item(info: &SymbolInformation, relative: &str) -> SearchItem {
    SearchItem::symbol(
        &info.name,
        info.kind,
        &info.uri,
        info.range,
        info.container_name.clone().unwrap_or_default(),
        Some(relative.to_string()),
    )
}

/// Flatten a document symbol tree into search items.
///
/// Each item's description is the chain of enclosing symbol names.
#[must_use]
pub fn document_symbol_items(uri: &str, relative: &str, symbols: &[DocumentSymbol]) -> Vec<SearchItem> {
    let mut items = Vec::new();
    collect(uri, relative, symbols, &mut Vec::new(), &mut items);
    items
}

fn collect<'a>(
    uri: &str,
    relative: &str,
    symbols: &'a [DocumentSymbol],
    chain: &mut Vec<&'a str>,
    out: &mut Vec<SearchItem>,
) {
    for symbol in symbols {
        out.push(SearchItem::symbol(
            &symbol.name,
            symbol.kind,
            uri,
            symbol.range,
            chain.join("."),
            Some(relative.to_string()),
        ));
        if !symbol.children.is_empty() {
            chain.push(&symbol.name);
            collect(uri, relative, &symbol.children, chain, out);
            chain.pop();
        }
    }
}
