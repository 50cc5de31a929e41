//! Data model shared by providers, the text matcher and the ranking engine.
//!
//! This module defines:
//! - Search items and their variant payloads
//! - Item actions executed by the host on selection
//! - Symbol kinds, kind groups and the priority table

mod item;
mod symbol;

pub use item::{
    file_uri, uri_to_path, ItemAction, ItemKind, ItemType, Position, Range, RankedItem,
    SearchItem, SymbolLocation,
};
pub use symbol::{
    SymbolKind, SymbolKindGroup, PRIORITY_CLASS, PRIORITY_CONSTANT, PRIORITY_DEFAULT,
    PRIORITY_FILE, PRIORITY_FUNCTION, PRIORITY_MEMBER, PRIORITY_TEXT_MATCH, PRIORITY_VARIABLE,
};
