//! Line-based symbol outline extraction.
//!
//! A lightweight stand-in for a language server: each language family has a
//! table of declaration patterns, and nesting is inferred from indentation.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::DocumentSymbol;
use crate::model::{Range, SymbolKind};

/// Language families with an outline table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Rust,
    TypeScript,
    Python,
    Go,
    CFamily,
}

/// Supported source extensions and their language family.
const LANGUAGE_EXTENSIONS: &[(&str, Language)] = &[
    ("rs", Language::Rust),
    ("ts", Language::TypeScript),
    ("tsx", Language::TypeScript),
    ("js", Language::TypeScript),
    ("jsx", Language::TypeScript),
    ("mjs", Language::TypeScript),
    ("cjs", Language::TypeScript),
    ("py", Language::Python),
    ("go", Language::Go),
    ("java", Language::CFamily),
    ("cs", Language::CFamily),
    ("kt", Language::CFamily),
    ("scala", Language::CFamily),
    ("swift", Language::CFamily),
    ("c", Language::CFamily),
    ("cpp", Language::CFamily),
    ("cc", Language::CFamily),
    ("h", Language::CFamily),
    ("hpp", Language::CFamily),
    ("php", Language::CFamily),
    ("rb", Language::CFamily),
];

/// Words that look like calls at line start but never name a method.
const CONTROL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "else", "do", "try", "new",
    "throw", "typeof", "await", "super", "this",
];

struct Rule {
    regex: Regex,
    kind: SymbolKind,
    /// Only applies inside a container symbol.
    nested_only: bool,
    /// Prefix added to the captured name.
    label_prefix: &'static str,
}

fn rule(pattern: &str, kind: SymbolKind) -> Rule {
    Rule {
        regex: Regex::new(pattern).expect("valid outline pattern"),
        kind,
        nested_only: false,
        label_prefix: "",
    }
}

fn nested(mut r: Rule) -> Rule {
    r.nested_only = true;
    r
}

const RUST_VIS: &str = r"^\s*(?:pub(?:\([^)]*\))?\s+)?";

static RUST_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(
            &format!(r#"{RUST_VIS}(?:(?:async|const|unsafe|extern\s+"[^"]*")\s+)*fn\s+(?P<name>[A-Za-z_]\w*)"#),
            SymbolKind::Function,
        ),
        rule(&format!(r"{RUST_VIS}struct\s+(?P<name>[A-Za-z_]\w*)"), SymbolKind::Struct),
        rule(&format!(r"{RUST_VIS}enum\s+(?P<name>[A-Za-z_]\w*)"), SymbolKind::Enum),
        rule(&format!(r"{RUST_VIS}(?:unsafe\s+)?trait\s+(?P<name>[A-Za-z_]\w*)"), SymbolKind::Interface),
        rule(&format!(r"{RUST_VIS}mod\s+(?P<name>[A-Za-z_]\w*)"), SymbolKind::Module),
        rule(
            &format!(r"{RUST_VIS}(?:const|static)\s+(?:mut\s+)?(?P<name>[A-Za-z_]\w*)\s*:"),
            SymbolKind::Constant,
        ),
        Rule {
            label_prefix: "impl ",
            ..rule(
                r"^\s*(?:unsafe\s+)?impl(?:<[^>]*>)?\s+(?:[\w:<>, ]+\s+for\s+)?(?P<name>[A-Za-z_][\w:]*)",
                SymbolKind::Object,
            )
        },
    ]
});

const TS_EXPORT: &str = r"^\s*(?:export\s+)?(?:default\s+)?(?:declare\s+)?";

static TYPESCRIPT_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(
            &format!(r"{TS_EXPORT}(?:abstract\s+)?class\s+(?P<name>[A-Za-z_$][\w$]*)"),
            SymbolKind::Class,
        ),
        rule(&format!(r"{TS_EXPORT}interface\s+(?P<name>[A-Za-z_$][\w$]*)"), SymbolKind::Interface),
        rule(&format!(r"{TS_EXPORT}(?:const\s+)?enum\s+(?P<name>[A-Za-z_$][\w$]*)"), SymbolKind::Enum),
        rule(
            &format!(r"{TS_EXPORT}(?:async\s+)?function\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)"),
            SymbolKind::Function,
        ),
        rule(
            &format!(
                r"{TS_EXPORT}const\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s*)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=>"
            ),
            SymbolKind::Function,
        ),
        rule(&format!(r"{TS_EXPORT}const\s+(?P<name>[A-Za-z_$][\w$]*)"), SymbolKind::Constant),
        rule(&format!(r"{TS_EXPORT}(?:let|var)\s+(?P<name>[A-Za-z_$][\w$]*)"), SymbolKind::Variable),
        nested(rule(
            r"^\s+(?:(?:public|private|protected|static|async|readonly|override|abstract|get|set)\s+)*(?P<name>[A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\([^)]*\)\s*(?::\s*[^{]+)?\{",
            SymbolKind::Method,
        )),
        nested(rule(
            r"^\s+(?:(?:public|private|protected|static|readonly)\s+)+(?P<name>[A-Za-z_$][\w$]*)\s*[?!]?\s*[:=;]",
            SymbolKind::Property,
        )),
    ]
});

static PYTHON_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(r"^\s*class\s+(?P<name>[A-Za-z_]\w*)", SymbolKind::Class),
        rule(r"^\s*(?:async\s+)?def\s+(?P<name>[A-Za-z_]\w*)", SymbolKind::Function),
        rule(r"^(?P<name>[A-Z][A-Z0-9_]*)\s*(?::[^=]+)?=", SymbolKind::Constant),
    ]
});

static GO_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(r"^func\s+\([^)]*\)\s*(?P<name>[A-Za-z_]\w*)", SymbolKind::Method),
        rule(r"^func\s+(?P<name>[A-Za-z_]\w*)", SymbolKind::Function),
        rule(r"^type\s+(?P<name>[A-Za-z_]\w*)\s+struct\b", SymbolKind::Struct),
        rule(r"^type\s+(?P<name>[A-Za-z_]\w*)\s+interface\b", SymbolKind::Interface),
        rule(r"^const\s+(?P<name>[A-Za-z_]\w*)", SymbolKind::Constant),
        rule(r"^var\s+(?P<name>[A-Za-z_]\w*)", SymbolKind::Variable),
    ]
});

const C_MODIFIERS: &str =
    r"^\s*(?:(?:public|private|protected|internal|static|final|abstract|sealed|partial|open|data|export)\s+)*";

static C_FAMILY_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(&format!(r"{C_MODIFIERS}(?:class|object)\s+(?P<name>[A-Za-z_]\w*)"), SymbolKind::Class),
        rule(&format!(r"{C_MODIFIERS}interface\s+(?P<name>[A-Za-z_]\w*)"), SymbolKind::Interface),
        rule(&format!(r"{C_MODIFIERS}enum\s+(?:class\s+)?(?P<name>[A-Za-z_]\w*)"), SymbolKind::Enum),
        rule(&format!(r"{C_MODIFIERS}struct\s+(?P<name>[A-Za-z_]\w*)"), SymbolKind::Struct),
        rule(
            &format!(r"{C_MODIFIERS}(?:def|fun|func|function)\s+(?:self\.)?(?P<name>[A-Za-z_]\w*[?!]?)"),
            SymbolKind::Function,
        ),
        nested(rule(
            r"^\s+(?:(?:public|private|protected|internal|static|final|abstract|synchronized|override|virtual|async)\s+)+[\w<>\[\],.?\s]+?\s+(?P<name>[A-Za-z_]\w*)\s*\(",
            SymbolKind::Method,
        )),
    ]
});

/// Language family for a path, by extension.
#[must_use]
pub fn language_for(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    LANGUAGE_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
}

/// Whether a path has an extension with outline support.
#[must_use]
pub fn is_outline_supported(path: &Path) -> bool {
    language_for(path).is_some()
}

fn rules_for(language: Language) -> &'static [Rule] {
    match language {
        Language::Rust => &RUST_RULES,
        Language::TypeScript => &TYPESCRIPT_RULES,
        Language::Python => &PYTHON_RULES,
        Language::Go => &GO_RULES,
        Language::CFamily => &C_FAMILY_RULES,
    }
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn is_container(kind: SymbolKind) -> bool {
    kind.is_class_like() || matches!(kind, SymbolKind::Object | SymbolKind::Module | SymbolKind::Namespace)
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// A symbol under construction, with the path to it in the tree.
struct Open {
    indent: usize,
    path: Vec<usize>,
    kind: SymbolKind,
    name: String,
}

fn children_at<'a>(roots: &'a mut Vec<DocumentSymbol>, path: &[usize]) -> &'a mut Vec<DocumentSymbol> {
    let mut current = roots;
    for &index in path {
        current = &mut current[index].children;
    }
    current
}

/// Extract a symbol tree from source text.
#[must_use]
pub fn outline(content: &str, language: Language) -> Vec<DocumentSymbol> {
    let rules = rules_for(language);
    let mut roots: Vec<DocumentSymbol> = Vec::new();
    let mut stack: Vec<Open> = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.is_empty()
            || trimmed.starts_with("//")
            || (trimmed.starts_with('#') && language != Language::Rust)
            || trimmed.starts_with('*')
        {
            continue;
        }

        let indent = indent_width(line);
        while stack.last().is_some_and(|open| open.indent >= indent) {
            stack.pop();
        }
        let container = stack.last();

        let Some((rule, caps)) = rules.iter().find_map(|r| {
            if r.nested_only && container.is_none() {
                return None;
            }
            r.regex.captures(line).map(|c| (r, c))
        }) else {
            continue;
        };
        let Some(name_match) = caps.name("name") else {
            continue;
        };
        let raw_name = name_match.as_str();
        if rule.kind == SymbolKind::Method && CONTROL_KEYWORDS.contains(&raw_name) {
            continue;
        }

        let kind = refine_kind(rule.kind, raw_name, container.map(|c| (c.kind, c.name.as_str())));
        let name = format!("{}{raw_name}", rule.label_prefix);
        let column = to_u32(line[..name_match.start()].chars().count());
        let symbol = DocumentSymbol {
            name: name.clone(),
            detail: None,
            kind,
            range: Range::on_line(to_u32(line_no), column, to_u32(raw_name.chars().count())),
            children: Vec::new(),
        };

        let parent_path = container.map(|c| c.path.clone()).unwrap_or_default();
        let siblings = children_at(&mut roots, &parent_path);
        siblings.push(symbol);
        let mut path = parent_path;
        path.push(siblings.len() - 1);

        if is_container(kind) {
            stack.push(Open {
                indent,
                path,
                kind,
                name,
            });
        }
    }

    roots
}

/// Adjust a matched kind for its context.
fn refine_kind(kind: SymbolKind, name: &str, container: Option<(SymbolKind, &str)>) -> SymbolKind {
    let Some((container_kind, container_name)) = container else {
        return kind;
    };
    let in_type = container_kind.is_class_like() || container_kind == SymbolKind::Object;
    match kind {
        SymbolKind::Function | SymbolKind::Method if in_type => {
            let type_name = container_name.trim_start_matches("impl ");
            if name == "constructor" || name == "__init__" || name == type_name {
                SymbolKind::Constructor
            } else {
                SymbolKind::Method
            }
        }
        SymbolKind::Constant | SymbolKind::Variable if in_type => SymbolKind::Field,
        _ => kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flatten(symbols: &[DocumentSymbol]) -> Vec<(String, SymbolKind, u32)> {
        let mut out = Vec::new();
        for s in symbols {
            out.push((s.name.clone(), s.kind, s.range.start.line));
            out.extend(flatten(&s.children));
        }
        out
    }

    #[test]
    fn test_language_for() {
        assert_eq!(language_for(Path::new("a/main.rs")), Some(Language::Rust));
        assert_eq!(language_for(Path::new("App.TSX")), Some(Language::TypeScript));
        assert_eq!(language_for(Path::new("x.py")), Some(Language::Python));
        assert_eq!(language_for(Path::new("README.md")), None);
        assert!(!is_outline_supported(Path::new("Makefile")));
    }

    #[test]
    fn test_all_rule_tables_compile() {
        for lang in [
            Language::Rust,
            Language::TypeScript,
            Language::Python,
            Language::Go,
            Language::CFamily,
        ] {
            assert!(!rules_for(lang).is_empty());
        }
    }

    #[test]
    fn test_typescript_class_with_methods() {
        let src = "\
export class Foo {
  private count: number = 0;
  constructor(name: string) {
  }
  handleClick(event: Event): void {
    if (event) {
    }
  }
}

export function helper() {}
const MAX = 10;
";
        let symbols = outline(src, Language::TypeScript);
        assert_eq!(symbols.len(), 3);
        assert_eq!(symbols[0].name, "Foo");
        assert_eq!(symbols[0].kind, SymbolKind::Class);

        let children: Vec<(&str, SymbolKind)> = symbols[0]
            .children
            .iter()
            .map(|c| (c.name.as_str(), c.kind))
            .collect();
        assert_eq!(
            children,
            vec![
                ("count", SymbolKind::Property),
                ("constructor", SymbolKind::Constructor),
                ("handleClick", SymbolKind::Method),
            ]
        );
        assert_eq!(symbols[1].kind, SymbolKind::Function);
        assert_eq!(symbols[2].kind, SymbolKind::Constant);
    }

    #[test]
    fn test_symbol_range_points_at_name() {
        let symbols = outline("export class Foo {}\n", Language::TypeScript);
        let range = symbols[0].range;
        assert_eq!(range.start.line, 0);
        assert_eq!(range.start.column, 13);
        assert_eq!(range.end.column, 16);
    }

    #[test]
    fn test_rust_outline() {
        let src = "\
pub struct Index {
    items: Vec<String>,
}

impl Index {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub async fn refresh(&self) {}
}

pub const LIMIT: usize = 300;
fn main() {}
";
        let flat = flatten(&outline(src, Language::Rust));
        assert_eq!(
            flat,
            vec![
                ("Index".to_string(), SymbolKind::Struct, 0),
                ("impl Index".to_string(), SymbolKind::Object, 4),
                ("new".to_string(), SymbolKind::Method, 5),
                ("refresh".to_string(), SymbolKind::Method, 9),
                ("LIMIT".to_string(), SymbolKind::Constant, 12),
                ("main".to_string(), SymbolKind::Function, 13),
            ]
        );
    }

    #[test]
    fn test_python_outline() {
        let src = "\
MAX_SIZE = 10

class Greeter:
    def __init__(self, name):
        self.name = name

    def greet(self):
        return self.name

def main():
    pass
";
        let flat = flatten(&outline(src, Language::Python));
        assert_eq!(
            flat,
            vec![
                ("MAX_SIZE".to_string(), SymbolKind::Constant, 0),
                ("Greeter".to_string(), SymbolKind::Class, 2),
                ("__init__".to_string(), SymbolKind::Constructor, 3),
                ("greet".to_string(), SymbolKind::Method, 6),
                ("main".to_string(), SymbolKind::Function, 9),
            ]
        );
    }

    #[test]
    fn test_go_outline() {
        let src = "\
type Server struct {
}

func (s *Server) Start() error {
}

func main() {
}
";
        let flat = flatten(&outline(src, Language::Go));
        assert_eq!(flat[0], ("Server".to_string(), SymbolKind::Struct, 0));
        assert_eq!(flat[1], ("Start".to_string(), SymbolKind::Method, 3));
        assert_eq!(flat[2], ("main".to_string(), SymbolKind::Function, 6));
    }

    #[test]
    fn test_comments_and_control_flow_ignored() {
        let src = "\
class A {
  // function notReal() {
  run() {
    if (x) {
    }
    for (;;) {
    }
  }
}
";
        let flat = flatten(&outline(src, Language::TypeScript));
        assert_eq!(
            flat,
            vec![
                ("A".to_string(), SymbolKind::Class, 0),
                ("run".to_string(), SymbolKind::Method, 2),
            ]
        );
    }
}
