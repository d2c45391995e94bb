use std::sync::LazyLock;

use regex::Regex;

use crate::style::regex_parser::strip_comments;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static AROUND_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([{}:;,])\s*").expect("punctuation pattern is valid"));

static AROUND_PUNCT_FULL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([{}:;,>~])\s*").expect("punctuation pattern is valid"));

static TRAILING_SEMI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r";+\}").expect("semicolon pattern is valid"));

static EMPTY_RULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^{};]+\{\}").expect("empty rule pattern is valid"));

/// Collapse whitespace and strip it around `{ } : ; ,`.
pub fn collapse_whitespace(css: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(css, " ");
    AROUND_PUNCT_RE
        .replace_all(&collapsed, "$1")
        .trim()
        .to_string()
}

/// Full minification used on bundles: drops comments, redundant
/// semicolons and empty rule bodies as well. `+` is left alone so that
/// `calc(a + b)` keeps its required spaces.
///
/// Running it on its own output returns the same string.
pub fn minify(css: &str) -> String {
    let stripped = strip_comments(css);
    let collapsed = WHITESPACE_RE.replace_all(&stripped, " ");
    let mut out = AROUND_PUNCT_FULL_RE
        .replace_all(&collapsed, "$1")
        .into_owned();

    // Removing an empty rule can leave its parent empty, so repeat until stable.
    loop {
        let next = TRAILING_SEMI_RE.replace_all(&out, "}");
        let next = EMPTY_RULE_RE.replace_all(&next, "").into_owned();
        if next == out {
            break;
        }
        out = next;
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(
            collapse_whitespace("body {\n  margin : 0 ;\n}\n\n.a , .b { color: red }"),
            "body{margin:0;}.a,.b{color:red}"
        );
    }

    #[test]
    fn test_minify_drops_empties_and_semicolons() {
        let css = "/* x */ .a > .b { color: red; ; }\n.empty { }\n@media print { .gone {} }";
        assert_eq!(minify(css), ".a>.b{color:red}");
    }

    #[test]
    fn test_minify_keeps_calc_spacing() {
        assert_eq!(minify(".a { width: calc(100% + 2px); }"), ".a{width:calc(100% + 2px)}");
    }

    #[test]
    fn test_minify_is_idempotent() {
        let inputs = [
            "a { b: c; }\n\n d ~ e { f: g }",
            "@media (max-width: 10px) { .x { y: z; } .w {} }",
            ".q{}",
            "",
        ];
        for input in inputs {
            let once = minify(input);
            assert_eq!(minify(&once), once);
        }
    }
}
