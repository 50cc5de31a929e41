//! Symbol kinds, their coarse groups and ranking priorities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Priority for class-like symbols.
pub const PRIORITY_CLASS: i32 = 100;
/// Priority for function-like symbols.
pub const PRIORITY_FUNCTION: i32 = 90;
/// Priority for files.
pub const PRIORITY_FILE: i32 = 80;
/// Priority for properties, fields and enum members.
pub const PRIORITY_MEMBER: i32 = 70;
/// Priority for constants.
pub const PRIORITY_CONSTANT: i32 = 60;
/// Neutral priority, used for anything without an entry in the table.
pub const PRIORITY_DEFAULT: i32 = 50;
/// Priority for variables.
pub const PRIORITY_VARIABLE: i32 = 40;
/// Priority for raw text matches, below every indexed item.
pub const PRIORITY_TEXT_MATCH: i32 = 30;

/// Fine-grained symbol kind as reported by a symbol index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SymbolKind {
    File,
    Module,
    Namespace,
    Package,
    Class,
    Method,
    Property,
    Field,
    Constructor,
    Enum,
    Interface,
    Function,
    Variable,
    Constant,
    String,
    Number,
    Boolean,
    Array,
    Object,
    Key,
    Null,
    EnumMember,
    Struct,
    Event,
    Operator,
    TypeParameter,
}

/// Coarse classification derived from a [`SymbolKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKindGroup {
    Class,
    Function,
    Variable,
    Other,
}

impl SymbolKind {
    /// Whether this kind is class-like (class, interface, struct, enum).
    #[must_use]
    pub const fn is_class_like(self) -> bool {
        matches!(
            self,
            Self::Class | Self::Interface | Self::Struct | Self::Enum
        )
    }

    /// Coarse group of this kind.
    #[must_use]
    pub const fn group(self) -> SymbolKindGroup {
        match self {
            Self::Class | Self::Interface | Self::Struct | Self::Enum => SymbolKindGroup::Class,
            Self::Method | Self::Function | Self::Constructor => SymbolKindGroup::Function,
            Self::Variable
            | Self::Constant
            | Self::Property
            | Self::Field
            | Self::EnumMember => SymbolKindGroup::Variable,
            _ => SymbolKindGroup::Other,
        }
    }

    /// Ranking priority shared by both symbol providers.
    #[must_use]
    pub const fn priority(self) -> i32 {
        match self {
            Self::Class | Self::Interface | Self::Enum | Self::Struct => PRIORITY_CLASS,
            Self::Method | Self::Function | Self::Constructor => PRIORITY_FUNCTION,
            Self::Property | Self::Field | Self::EnumMember => PRIORITY_MEMBER,
            Self::Constant => PRIORITY_CONSTANT,
            Self::Variable => PRIORITY_VARIABLE,
            _ => PRIORITY_DEFAULT,
        }
    }

    /// Lowercase display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Module => "module",
            Self::Namespace => "namespace",
            Self::Package => "package",
            Self::Class => "class",
            Self::Method => "method",
            Self::Property => "property",
            Self::Field => "field",
            Self::Constructor => "constructor",
            Self::Enum => "enum",
            Self::Interface => "interface",
            Self::Function => "function",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Key => "key",
            Self::Null => "null",
            Self::EnumMember => "enumMember",
            Self::Struct => "struct",
            Self::Event => "event",
            Self::Operator => "operator",
            Self::TypeParameter => "typeParameter",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
