//! Static policy check for setup scripts.
//!
//! The guard scans script source for constructs that load code or modules:
//! static and dynamic `import`, `require(...)`, `eval(...)` and `Function`
//! construction. A script with any match is rejected before it runs.
//!
//! This is a policy lint, not an isolation boundary. It matches text, so a
//! determined author can spell around it. Scripts run in the crate's own
//! interpreter, which has no module loader, filesystem or process access
//! beyond the [`ToolSurface`](super::tools::ToolSurface) it is handed; that
//! interpreter, not this guard, is what limits what a script can do.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

struct Rule {
    name: &'static str,
    pattern: Regex,
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    [
        ("static import", r"^\s*import\b\s*[\w*{'\x22]"),
        ("re-export", r"^\s*export\b[^;]*\bfrom\s*['\x22]"),
        ("dynamic import", r"\bimport\s*\("),
        ("require call", r"\brequire\s*\("),
        ("eval call", r"\beval\s*\("),
        ("Function constructor", r"\bnew\s+Function\b|\bFunction\s*\("),
    ]
    .into_iter()
    .map(|(name, pattern)| Rule {
        name,
        pattern: Regex::new(pattern).expect("valid guard pattern"),
    })
    .collect()
});

/// One prohibited construct found in a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub line: usize,
    pub rule: &'static str,
    pub excerpt: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} (`{}`)", self.line, self.rule, self.excerpt)
    }
}

/// Scan `source` and return every violation, in line order.
///
/// Comments are blanked out before matching; code sharing a line with a
/// comment is still scanned.
pub fn scan(source: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut in_block_comment = false;

    for (index, raw) in source.lines().enumerate() {
        let code = strip_comments(raw, &mut in_block_comment);
        if code.trim().is_empty() {
            continue;
        }

        for rule in RULES.iter() {
            if let Some(found) = rule.pattern.find(&code) {
                violations.push(Violation {
                    line: index + 1,
                    rule: rule.name,
                    excerpt: found.as_str().trim().to_string(),
                });
            }
        }
    }

    violations
}

/// The code on one line with `//` and `/* */` comments replaced by spaces.
///
/// `in_block` carries an unterminated block comment into the next line.
/// Comment markers inside string literals are kept as text.
fn strip_comments(line: &str, in_block: &mut bool) -> String {
    let mut code = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if *in_block {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                *in_block = false;
                code.push(' ');
            }
            continue;
        }
        if let Some(q) = quote {
            code.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    code.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                code.push(c);
            }
            '/' if chars.peek() == Some(&'/') => break,
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                *in_block = true;
            }
            _ => code.push(c),
        }
    }

    code
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(source: &str) -> Vec<&'static str> {
        scan(source).into_iter().map(|v| v.rule).collect()
    }

    #[test]
    fn clean_script_passes() {
        let source = r#"
export default async function ({ context, tools }) {
  await tools.files.append("README.md", `# ${context.name}`);
}
"#;
        assert!(scan(source).is_empty());
    }

    #[test]
    fn catches_static_imports() {
        assert_eq!(rules("import fs from 'fs';"), ["static import"]);
        assert_eq!(rules("  import { readFile } from \"fs\";"), ["static import"]);
        assert_eq!(rules("import 'side-effect';"), ["static import"]);
        assert_eq!(rules("export { x } from './x.js';"), ["re-export"]);
    }

    #[test]
    fn catches_dynamic_loading() {
        assert_eq!(rules("const m = await import('fs');"), ["dynamic import"]);
        assert_eq!(rules("const cp = require('child_process');"), ["require call"]);
        assert_eq!(rules("eval(code);"), ["eval call"]);
        assert_eq!(rules("const f = new Function('return 1');"), ["Function constructor"]);
    }

    #[test]
    fn reports_line_numbers() {
        let violations = scan("const a = 1;\n\nrequire('x');\n");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 3);
        assert!(violations[0].to_string().starts_with("line 3: require call"));
    }

    #[test]
    fn comments_are_ignored() {
        let source = "// require('fs') is not allowed\n/*\n import x from 'y'\n*/\nconst a = 1;";
        assert!(scan(source).is_empty());
    }

    #[test]
    fn code_after_inline_block_comment_is_scanned() {
        assert_eq!(rules("/* note */ eval(x);"), ["eval call"]);
        assert_eq!(rules("const a = 1; /* x */ import('fs');"), ["dynamic import"]);
        assert_eq!(rules("/* header */ import fs from 'fs';"), ["static import"]);
    }

    #[test]
    fn code_after_block_comment_end_is_scanned() {
        let violations = scan("/*\n a note\n*/ require(x);\n");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, "require call");
        assert_eq!(violations[0].line, 3);
    }

    #[test]
    fn code_before_trailing_comment_is_scanned() {
        assert_eq!(rules("eval(x); // harmless"), ["eval call"]);
        assert_eq!(rules("const u = \"https://x.io\"; eval(u);"), ["eval call"]);
    }

    #[test]
    fn identifiers_containing_keywords_pass() {
        assert!(scan("const important = requirement(evaluate);").is_empty());
    }
}
