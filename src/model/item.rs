//! Search items produced by providers and the text matcher.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::symbol::{
    SymbolKind, SymbolKindGroup, PRIORITY_DEFAULT, PRIORITY_FILE, PRIORITY_TEXT_MATCH,
};

/// URI scheme prefix for local files.
const FILE_SCHEME: &str = "file://";

/// Build a `file://` URI for a local path.
#[must_use]
pub fn file_uri(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    if normalized.starts_with('/') {
        format!("{FILE_SCHEME}{normalized}")
    } else {
        format!("{FILE_SCHEME}/{normalized}")
    }
}

/// Extract the local path from a `file://` URI.
///
/// Returns `None` for any other scheme.
#[must_use]
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    let rest = uri.strip_prefix(FILE_SCHEME)?;
    // Windows drive letters arrive as "/C:/..."
    let bytes = rest.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'/' && bytes[2] == b':' {
        return Some(PathBuf::from(&rest[1..]));
    }
    Some(PathBuf::from(rest))
}

/// Zero-based line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Start/end span inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Range covering `len` columns of a single line.
    #[must_use]
    pub const fn on_line(line: u32, column: u32, len: u32) -> Self {
        Self {
            start: Position::new(line, column),
            end: Position::new(line, column + len),
        }
    }
}

/// Item type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    File,
    Command,
    Symbol,
    Class,
    TextMatch,
}

impl ItemType {
    /// Lowercase name used in ids and dedup keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Command => "command",
            Self::Symbol => "symbol",
            Self::Class => "class",
            Self::TextMatch => "text",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location data shared by symbol and class items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolLocation {
    pub uri: String,
    pub range: Range,
    pub symbol_kind: SymbolKind,
    pub group: SymbolKindGroup,
}

/// Variant-specific payload of a [`SearchItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ItemKind {
    File {
        uri: String,
        icon: String,
    },
    Command {
        command_id: String,
        args: Vec<serde_json::Value>,
    },
    Symbol(SymbolLocation),
    Class(SymbolLocation),
    TextMatch {
        uri: String,
        range: Range,
        line_text: String,
        matched: String,
    },
}

/// Side effect performed when an item is selected.
///
/// Executed by the host; the search core never looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ItemAction {
    OpenFile {
        uri: String,
    },
    ExecuteCommand {
        command_id: String,
        args: Vec<serde_json::Value>,
    },
    RevealRange {
        uri: String,
        range: Range,
    },
}

/// An indexed or matched entity that can be searched and selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchItem {
    /// Stable identity across refresh cycles.
    pub id: String,
    /// Primary fuzzy-match target.
    pub label: String,
    pub description: String,
    pub detail: Option<String>,
    /// Static tie-break priority, higher is more important.
    pub priority: i32,
    pub kind: ItemKind,
    pub action: ItemAction,
}

impl SearchItem {
    /// File item for a local path.
    #[must_use]
    pub fn file(path: &Path, relative: &str, icon: &str) -> Self {
        let uri = file_uri(path);
        let label = path
            .file_name()
            .map_or_else(|| relative.to_string(), |n| n.to_string_lossy().into_owned());
        Self {
            id: format!("file:{uri}"),
            label,
            description: relative.to_string(),
            detail: None,
            priority: PRIORITY_FILE,
            kind: ItemKind::File {
                uri: uri.clone(),
                icon: icon.to_string(),
            },
            action: ItemAction::OpenFile { uri },
        }
    }

    /// Command item for a registered action identifier.
    #[must_use]
    pub fn command(command_id: &str, label: impl Into<String>) -> Self {
        Self {
            id: format!("command:{command_id}"),
            label: label.into(),
            description: command_id.to_string(),
            detail: None,
            priority: PRIORITY_DEFAULT,
            kind: ItemKind::Command {
                command_id: command_id.to_string(),
                args: Vec::new(),
            },
            action: ItemAction::ExecuteCommand {
                command_id: command_id.to_string(),
                args: Vec::new(),
            },
        }
    }

    /// Symbol item; class-like kinds become [`ItemType::Class`].
    #[must_use]
    pub fn symbol(
        name: &str,
        symbol_kind: SymbolKind,
        uri: &str,
        range: Range,
        description: impl Into<String>,
        detail: Option<String>,
    ) -> Self {
        let location = SymbolLocation {
            uri: uri.to_string(),
            range,
            symbol_kind,
            group: symbol_kind.group(),
        };
        let (prefix, kind) = if symbol_kind.is_class_like() {
            ("class", ItemKind::Class(location))
        } else {
            ("symbol", ItemKind::Symbol(location))
        };
        Self {
            id: format!(
                "{prefix}:{uri}:{}:{}:{name}",
                range.start.line, range.start.column
            ),
            label: name.to_string(),
            description: description.into(),
            detail,
            priority: symbol_kind.priority(),
            kind,
            action: ItemAction::RevealRange {
                uri: uri.to_string(),
                range,
            },
        }
    }

    /// Raw text match on a single line.
    #[must_use]
    pub fn text_match(uri: &str, relative: &str, range: Range, line_text: &str, matched: &str) -> Self {
        let trimmed = line_text.trim();
        Self {
            id: format!("text:{uri}:{}:{}", range.start.line, range.start.column),
            label: trimmed.to_string(),
            description: format!("{relative}:{}", range.start.line + 1),
            detail: None,
            priority: PRIORITY_TEXT_MATCH,
            kind: ItemKind::TextMatch {
                uri: uri.to_string(),
                range,
                line_text: line_text.to_string(),
                matched: matched.to_string(),
            },
            action: ItemAction::RevealRange {
                uri: uri.to_string(),
                range,
            },
        }
    }

    /// Type discriminant.
    #[must_use]
    pub const fn item_type(&self) -> ItemType {
        match self.kind {
            ItemKind::File { .. } => ItemType::File,
            ItemKind::Command { .. } => ItemType::Command,
            ItemKind::Symbol(_) => ItemType::Symbol,
            ItemKind::Class(_) => ItemType::Class,
            ItemKind::TextMatch { .. } => ItemType::TextMatch,
        }
    }

    /// Resource URI, if the item refers to one.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::File { uri, .. } | ItemKind::TextMatch { uri, .. } => Some(uri),
            ItemKind::Symbol(loc) | ItemKind::Class(loc) => Some(&loc.uri),
            ItemKind::Command { .. } => None,
        }
    }

    /// Span inside the resource, if any.
    #[must_use]
    pub const fn range(&self) -> Option<Range> {
        match &self.kind {
            ItemKind::Symbol(loc) | ItemKind::Class(loc) => Some(loc.range),
            ItemKind::TextMatch { range, .. } => Some(*range),
            ItemKind::File { .. } | ItemKind::Command { .. } => None,
        }
    }

    /// Label, description and detail joined: the fuzzy scorer's secondary
    /// target after the label.
    #[must_use]
    pub fn search_text(&self) -> String {
        let mut text = String::with_capacity(
            self.label.len() + self.description.len() + self.detail.as_ref().map_or(0, String::len) + 2,
        );
        text.push_str(&self.label);
        if !self.description.is_empty() {
            text.push(' ');
            text.push_str(&self.description);
        }
        if let Some(detail) = &self.detail {
            text.push(' ');
            text.push_str(detail);
        }
        text
    }
}

/// A search result: an item plus its relevance score.
///
/// `score` is `None` for unscored listings (empty query).
#[derive(Debug, Clone)]
pub struct RankedItem {
    pub item: Arc<SearchItem>,
    pub score: Option<f64>,
}

impl RankedItem {
    #[must_use]
    pub const fn new(item: Arc<SearchItem>, score: Option<f64>) -> Self {
        Self { item, score }
    }

    #[must_use]
    pub const fn unscored(item: Arc<SearchItem>) -> Self {
        Self { item, score: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_uri_round_trip() {
        let path = Path::new("/home/dev/project/src/main.rs");
        let uri = file_uri(path);
        assert_eq!(uri, "file:///home/dev/project/src/main.rs");
        assert_eq!(uri_to_path(&uri), Some(path.to_path_buf()));
    }

    #[test]
    fn test_uri_to_path_rejects_other_schemes() {
        assert!(uri_to_path("untitled:Untitled-1").is_none());
        assert!(uri_to_path("git:/repo/file.rs").is_none());
    }

    #[test]
    fn test_uri_to_path_windows_drive() {
        assert_eq!(
            uri_to_path("file:///C:/work/app.ts"),
            Some(PathBuf::from("C:/work/app.ts"))
        );
    }

    #[test]
    fn test_file_item() {
        let item = SearchItem::file(Path::new("/ws/src/Foo.ts"), "src/Foo.ts", "typescript");
        assert_eq!(item.label, "Foo.ts");
        assert_eq!(item.description, "src/Foo.ts");
        assert_eq!(item.id, "file:file:///ws/src/Foo.ts");
        assert_eq!(item.item_type(), ItemType::File);
        assert_eq!(item.priority, PRIORITY_FILE);
        assert_eq!(item.uri(), Some("file:///ws/src/Foo.ts"));
    }

    #[test]
    fn test_symbol_item_class_refinement() {
        let range = Range::on_line(3, 6, 3);
        let class = SearchItem::symbol("Foo", SymbolKind::Class, "file:///a.ts", range, "", None);
        assert_eq!(class.item_type(), ItemType::Class);
        assert_eq!(class.priority, 100);

        let func = SearchItem::symbol("run", SymbolKind::Function, "file:///a.ts", range, "", None);
        assert_eq!(func.item_type(), ItemType::Symbol);
        assert_eq!(func.priority, 90);
        assert_eq!(func.range(), Some(range));
    }

    #[test]
    fn test_text_match_item() {
        let item = SearchItem::text_match(
            "file:///ws/a.rs",
            "a.rs",
            Range::on_line(9, 4, 3),
            "    let foo = 1;",
            "foo",
        );
        assert_eq!(item.label, "let foo = 1;");
        assert_eq!(item.description, "a.rs:10");
        assert_eq!(item.priority, PRIORITY_TEXT_MATCH);
        assert_eq!(item.item_type(), ItemType::TextMatch);
    }

    #[test]
    fn test_search_text_concatenates_fields() {
        let mut item = SearchItem::command("editor.action.formatDocument", "Format Document");
        item.detail = Some("Shift+Alt+F".to_string());
        assert_eq!(
            item.search_text(),
            "Format Document editor.action.formatDocument Shift+Alt+F"
        );
    }
}
