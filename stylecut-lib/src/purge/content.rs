//! Finds the classes, ids, tags and attributes that content files use.
//!
//! Extraction is textual and generous. A word that merely looks like a
//! class name anywhere in quotes counts as used, so false positives keep
//! rules alive but nothing referenced is ever reported as unused.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;
use walkdir::WalkDir;

use crate::error::{ensure_exists, Error, Result};

const MARKUP_EXTENSIONS: &[&str] = &["html", "php", "vue"];
const SCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx"];
const SEMANTIC_TAGS: &[&str] = &["header", "nav", "main", "article", "section", "aside", "footer"];
const MAX_NAME_LEN: usize = 100;

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect("content pattern is valid"));
    };
}

pattern!(CLASS_ATTR_RE, r#"(?i)class=["']([^"']*)["']"#);
pattern!(CLASS_NAME_RE, r#"(?i)className=["']([^"']*)["']"#);
pattern!(CLASS_LIST_RE, r#"(?i)classList\.(?:add|remove|toggle)\(["']([^"']*)["']"#);
pattern!(CLASS_KEY_RE, r#"(?i)\bclass:\s*["']([^"']*)["']"#);
pattern!(QUOTED_WORDS_RE, r#"["']([\w-]+(?:\s+[\w-]+)*)["']"#);
pattern!(VALID_CLASS_RE, r"^[a-zA-Z_-][a-zA-Z0-9_-]*$");
pattern!(ID_ATTR_RE, r#"(?i)id=["']([^"']*)["']"#);
pattern!(GET_BY_ID_RE, r#"(?i)getElementById\(["']([^"']*)["']"#);
pattern!(VALID_ID_RE, r"^[a-zA-Z][a-zA-Z0-9_-]*$");
pattern!(TAG_RE, r"<([a-zA-Z][a-zA-Z0-9-]*)");
pattern!(DATA_ATTR_RE, r#"data-([a-zA-Z][a-zA-Z0-9-]*)=["']"#);
pattern!(ARIA_ATTR_RE, r#"aria-([a-zA-Z][a-zA-Z0-9-]*)=["']"#);
pattern!(ANIMATION_RE, r"animation(?:-name)?\s*:\s*([\w-]+)");
pattern!(FONT_FAMILY_RE, r#"font-family\s*:\s*((?:"[^"]*"|'[^']*'|[^;}"'<>])+)"#);

/// Everything the content files reference, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedSelectors {
    pub classes: IndexSet<String>,
    pub ids: IndexSet<String>,
    /// Lowercase tag names.
    pub tags: IndexSet<String>,
    /// `data-*` and `aria-*` attribute names.
    pub attributes: IndexSet<String>,
    pub keyframes: IndexSet<String>,
    /// Individual family names, unquoted.
    pub fonts: IndexSet<String>,
}

impl UsedSelectors {
    /// Scan files and directories. Directories are walked recursively and
    /// only files with one of `extensions` are read. Explicit files are
    /// always read.
    pub fn scan_paths(paths: &[PathBuf], extensions: &[String]) -> Result<Self> {
        for path in paths {
            ensure_exists(path)?;
        }
        let mut used = UsedSelectors::default();
        let mut scanned = 0usize;
        for path in paths {
            if path.is_dir() {
                for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
                    let file = entry.path();
                    if !entry.file_type().is_file() || !has_extension(file, extensions) {
                        continue;
                    }
                    match fs::read(file) {
                        Ok(bytes) => {
                            used.scan(&String::from_utf8_lossy(&bytes), &extension(file));
                            scanned += 1;
                        }
                        Err(e) => log::warn!("skipping {}: {}", file.display(), e),
                    }
                }
            } else {
                let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
                used.scan(&String::from_utf8_lossy(&bytes), &extension(path));
                scanned += 1;
            }
        }
        log::info!(
            "scanned {} content file(s): {} classes, {} ids, {} tags, {} attributes",
            scanned,
            used.classes.len(),
            used.ids.len(),
            used.tags.len(),
            used.attributes.len()
        );
        Ok(used)
    }

    /// Add the references found in one file's text. `extension` picks the
    /// class patterns; it is compared case-insensitively.
    pub fn scan(&mut self, content: &str, extension: &str) {
        self.scan_classes(content, &extension.to_ascii_lowercase());
        self.scan_ids(content);
        self.scan_tags(content);
        self.scan_attributes(content);
        self.scan_animations_and_fonts(content);
    }

    /// Record animation and font names referenced by CSS declarations.
    pub fn scan_animations_and_fonts(&mut self, text: &str) {
        for caps in ANIMATION_RE.captures_iter(text) {
            self.keyframes.insert(caps[1].to_string());
        }
        for caps in FONT_FAMILY_RE.captures_iter(text) {
            self.fonts.extend(family_names(&caps[1]));
        }
    }

    /// Distinct names found across classes, ids, tags and attributes.
    pub fn total(&self) -> usize {
        self.classes.len() + self.ids.len() + self.tags.len() + self.attributes.len()
    }

    fn scan_classes(&mut self, content: &str, extension: &str) {
        let mut patterns: Vec<&Regex> = Vec::new();
        if MARKUP_EXTENSIONS.contains(&extension) {
            patterns.push(&*CLASS_ATTR_RE);
        }
        if SCRIPT_EXTENSIONS.contains(&extension) {
            patterns.extend([&*CLASS_NAME_RE, &*CLASS_LIST_RE, &*CLASS_KEY_RE]);
        }
        patterns.push(&*QUOTED_WORDS_RE);

        for pattern in patterns {
            for caps in pattern.captures_iter(content) {
                let names = caps[1].split_whitespace().filter(|c| is_valid_class(c));
                self.classes.extend(names.map(str::to_string));
            }
        }
    }

    fn scan_ids(&mut self, content: &str) {
        for pattern in [&*ID_ATTR_RE, &*GET_BY_ID_RE] {
            for caps in pattern.captures_iter(content) {
                let id = &caps[1];
                if id.len() < MAX_NAME_LEN && VALID_ID_RE.is_match(id) {
                    self.ids.insert(id.to_string());
                }
            }
        }
    }

    fn scan_tags(&mut self, content: &str) {
        for caps in TAG_RE.captures_iter(content) {
            self.tags.insert(caps[1].to_ascii_lowercase());
        }
        let lower = content.to_ascii_lowercase();
        for tag in SEMANTIC_TAGS {
            if lower.contains(tag) {
                self.tags.insert(tag.to_string());
            }
        }
    }

    fn scan_attributes(&mut self, content: &str) {
        for (prefix, pattern) in [("data-", &*DATA_ATTR_RE), ("aria-", &*ARIA_ATTR_RE)] {
            for caps in pattern.captures_iter(content) {
                self.attributes.insert(format!("{prefix}{}", &caps[1]));
            }
        }
    }
}

fn is_valid_class(name: &str) -> bool {
    name.len() < MAX_NAME_LEN && VALID_CLASS_RE.is_match(name) && name.parse::<f64>().is_err()
}

/// `"Inter", Arial, sans-serif` -> `Inter`, `Arial`, `sans-serif`.
pub fn family_names(list: &str) -> impl Iterator<Item = String> + '_ {
    list.split(',')
        .map(|name| name.trim().trim_matches(|c| c == '"' || c == '\'').trim())
        .map(|name| name.trim_end_matches("!important").trim().to_string())
        .filter(|name| !name.is_empty())
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let ext = extension(path);
    extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(content: &str, extension: &str) -> UsedSelectors {
        let mut used = UsedSelectors::default();
        used.scan(content, extension);
        used
    }

    #[test]
    fn test_markup_references() {
        let used = scan(
            r##"<nav id="top" class="menu  is-open" data-toggle="x" aria-expanded="false"><A href="#">1</A></nav>"##,
            "html",
        );
        assert!(used.classes.contains("menu"));
        assert!(used.classes.contains("is-open"));
        assert!(used.ids.contains("top"));
        assert!(used.tags.contains("nav"));
        assert!(used.tags.contains("a"));
        assert!(used.attributes.contains("data-toggle"));
        assert!(used.attributes.contains("aria-expanded"));
    }

    #[test]
    fn test_script_references() {
        let used = scan(
            "el.classList.add('shown'); document.getElementById(\"modal\"); const cls = { class: 'x-card' }; const n = '42';",
            "JS",
        );
        assert!(used.classes.contains("shown"));
        assert!(used.classes.contains("x-card"));
        assert!(used.ids.contains("modal"));
        assert!(!used.classes.contains("42"));
    }

    #[test]
    fn test_semantic_tags_anywhere() {
        let used = scan("render(Footer)", "js");
        assert!(used.tags.contains("footer"));
        assert!(!used.tags.contains("header"));
    }

    #[test]
    fn test_animations_and_fonts() {
        let used = scan(
            r#"<div style="animation: spin 1s; font-family: 'Inter', sans-serif"></div>"#,
            "html",
        );
        assert!(used.keyframes.contains("spin"));
        assert!(used.fonts.contains("Inter"));
        assert!(used.fonts.contains("sans-serif"));
    }

    #[test]
    fn test_directory_walk_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/page.html"), r#"<p class="kept">"#).unwrap();
        fs::write(dir.path().join("notes.txt"), r#"<p class="ignored">"#).unwrap();

        let extensions = vec!["html".to_string()];
        let used = UsedSelectors::scan_paths(&[dir.path().to_path_buf()], &extensions).unwrap();
        assert!(used.classes.contains("kept"));
        assert!(!used.classes.contains("ignored"));

        let err = UsedSelectors::scan_paths(&[dir.path().join("missing")], &extensions).unwrap_err();
        assert!(matches!(err, Error::InputNotFound(_)));
    }
}
