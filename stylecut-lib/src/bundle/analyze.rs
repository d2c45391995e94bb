use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::style::stylesheet::{font_face_family, Stylesheet};
use crate::style::RuleParser;

pub const CATEGORY_FONTS: &str = "fonts";
pub const CATEGORY_VARIABLES: &str = "variables";
pub const CATEGORY_RESPONSIVE: &str = "responsive";
pub const CATEGORY_COMPONENTS: &str = "components";
pub const CATEGORY_GLOBAL: &str = "global";

/// More custom properties than this makes a variables file.
const VARIABLES_THRESHOLD: usize = 20;
/// More media queries than this makes a responsive file.
const RESPONSIVE_THRESHOLD: usize = 5;
/// Share of simple class selectors at which a file counts as components.
const COMPONENT_SHARE: f64 = 0.7;

/// What the bundler knows about one input file.
#[derive(Debug, Clone, Serialize)]
pub struct FileAnalysis {
    pub path: PathBuf,
    #[serde(skip)]
    pub content: String,
    pub size: usize,
    pub rule_count: usize,
    pub selectors: Vec<String>,
    pub imports: Vec<String>,
    pub media_queries: Vec<String>,
    pub fonts: Vec<String>,
    pub variables: IndexMap<String, String>,
    pub category: String,
}

impl FileAnalysis {
    /// File name without the `.css` extension.
    pub fn basename(&self) -> String {
        basename(&self.path)
    }
}

pub fn analyze_file(
    path: &Path,
    content: String,
    parser: &dyn RuleParser,
    splitting: &IndexMap<String, Vec<String>>,
) -> FileAnalysis {
    let sheet = parser.parse(&content);
    for warning in &sheet.warnings {
        log::warn!("{}: {}", path.display(), warning);
    }

    let selectors: Vec<String> = sheet.selectors().into_iter().collect();
    let fonts: Vec<String> = sheet
        .font_faces
        .iter()
        .filter_map(|face| font_face_family(face))
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect();
    let category = categorize(&basename(path), &sheet, &selectors, fonts.len(), splitting);
    log::debug!("{} categorized as {}", path.display(), category);

    FileAnalysis {
        path: path.to_path_buf(),
        size: content.len(),
        rule_count: sheet.rule_count(),
        imports: sheet.imports.clone(),
        media_queries: sheet.media_queries.iter().map(|m| m.condition.clone()).collect(),
        variables: sheet.custom_properties.clone(),
        selectors,
        fonts,
        category,
        content,
    }
}

/// Configured name patterns first (case-insensitive substring of the
/// basename, first category wins), then content heuristics.
pub fn categorize(
    basename: &str,
    sheet: &Stylesheet,
    selectors: &[String],
    font_count: usize,
    splitting: &IndexMap<String, Vec<String>>,
) -> String {
    let lower = basename.to_ascii_lowercase();
    for (category, patterns) in splitting {
        if patterns.iter().any(|p| lower.contains(&p.to_ascii_lowercase())) {
            return category.clone();
        }
    }

    if font_count > 0 || !sheet.font_faces.is_empty() {
        return CATEGORY_FONTS.to_string();
    }
    if sheet.custom_properties.len() > VARIABLES_THRESHOLD {
        return CATEGORY_VARIABLES.to_string();
    }
    if sheet.media_queries.len() > RESPONSIVE_THRESHOLD {
        return CATEGORY_RESPONSIVE.to_string();
    }
    if !selectors.is_empty() {
        let simple = selectors.iter().filter(|s| is_simple_class(s)).count();
        if simple as f64 >= selectors.len() as f64 * COMPONENT_SHARE {
            return CATEGORY_COMPONENTS.to_string();
        }
    }
    CATEGORY_GLOBAL.to_string()
}

/// `.name` with no combinator, e.g. `.btn` or `.btn:hover`, but not `.a .b`.
pub fn is_simple_class(selector: &str) -> bool {
    selector.starts_with('.')
        && !selector.contains(|c: char| c.is_whitespace() || matches!(c, '>' | '+' | '~'))
}

pub(crate) fn basename(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
