use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::bundle::analyze::{is_simple_class, FileAnalysis, CATEGORY_COMPONENTS};
use crate::bundle::graph::DependencyGraph;
use crate::config::{BundleStrategy, BundlerConfig};

static COMPONENT_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:component-|comp-|c-)").expect("prefix pattern is valid"));

static COMPONENT_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:-component|-comp|-styles?)$").expect("suffix pattern is valid"));

static CLASS_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.[a-zA-Z][a-zA-Z0-9-]*$").expect("class pattern is valid"));

/// Unoptimized bundle text and the files it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleDraft {
    pub css: String,
    /// Indices into the analysis list, in concatenation order.
    pub files: Vec<usize>,
}

impl BundleDraft {
    fn push(&mut self, index: usize, header: String, content: &str) {
        self.css.push_str(&header);
        self.css.push_str(content);
        self.files.push(index);
    }

    fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn source_header(analysis: &FileAnalysis) -> String {
    format!("\n/* Source: {} */\n", analysis.path.display())
}

/// Split the analyzed files into named bundles. Every file lands in exactly
/// one bundle. Empty bundles are never returned.
pub fn generate(
    analyses: &[FileAnalysis],
    graph: &DependencyGraph,
    config: &BundlerConfig,
) -> IndexMap<String, BundleDraft> {
    let bundles = match config.bundle_strategy {
        BundleStrategy::Route => route_bundles(analyses, config.max_bundle_size),
        BundleStrategy::Component => component_bundles(analyses),
        BundleStrategy::Global => global_bundle(analyses, graph),
        BundleStrategy::Smart => smart_bundles(analyses, config.inline_threshold),
    };
    log::info!(
        "{} strategy produced {} bundle(s) from {} file(s)",
        config.bundle_strategy,
        bundles.len(),
        analyses.len()
    );
    bundles
}

/// One bundle per category, split when `max_size` would be exceeded.
/// Follow-up bundles are named `<category>-2`, `<category>-3`, ...
fn route_bundles(analyses: &[FileAnalysis], max_size: usize) -> IndexMap<String, BundleDraft> {
    let mut by_category: IndexMap<&str, Vec<usize>> = IndexMap::new();
    for (i, analysis) in analyses.iter().enumerate() {
        by_category.entry(analysis.category.as_str()).or_default().push(i);
    }

    let mut bundles = IndexMap::new();
    for (category, files) in by_category {
        let mut part = 1;
        let mut draft = BundleDraft::default();
        let mut size = 0;
        for index in files {
            let analysis = &analyses[index];
            if size > 0 && size + analysis.size > max_size {
                bundles.insert(part_name(category, part), std::mem::take(&mut draft));
                part += 1;
                size = 0;
            }
            draft.push(index, source_header(analysis), &analysis.content);
            size += analysis.size;
        }
        if !draft.is_empty() {
            bundles.insert(part_name(category, part), draft);
        }
    }
    bundles
}

fn part_name(category: &str, part: usize) -> String {
    if part == 1 {
        category.to_string()
    } else {
        format!("{category}-{part}")
    }
}

/// `component-<name>` bundles for component files; other files are grouped
/// by category.
fn component_bundles(analyses: &[FileAnalysis]) -> IndexMap<String, BundleDraft> {
    let mut components: IndexMap<String, BundleDraft> = IndexMap::new();
    let mut others: IndexMap<String, BundleDraft> = IndexMap::new();

    for (i, analysis) in analyses.iter().enumerate() {
        if analysis.category == CATEGORY_COMPONENTS {
            let name = component_name(analysis);
            let header = format!("\n/* Component: {} - {} */\n", name, analysis.path.display());
            components
                .entry(format!("component-{name}"))
                .or_default()
                .push(i, header, &analysis.content);
        } else {
            others
                .entry(analysis.category.clone())
                .or_default()
                .push(i, source_header(analysis), &analysis.content);
        }
    }

    for (name, draft) in others {
        match components.get_mut(&name) {
            // A category can only collide with a component bundle by name.
            Some(existing) => {
                existing.css.push_str(&draft.css);
                existing.files.extend(draft.files);
            }
            None => {
                components.insert(name, draft);
            }
        }
    }
    components
}

/// Basename without component affixes, else the first simple class, else `misc`.
pub fn component_name(analysis: &FileAnalysis) -> String {
    let basename = analysis.basename();
    let stripped = COMPONENT_PREFIX_RE.replace(&basename, "");
    let stripped = COMPONENT_SUFFIX_RE.replace(&stripped, "");
    if !stripped.is_empty() {
        return stripped.into_owned();
    }
    analysis
        .selectors
        .iter()
        .find(|s| is_simple_class(s) && CLASS_NAME_RE.is_match(s))
        .map(|s| s.trim_start_matches('.').to_string())
        .unwrap_or_else(|| "misc".to_string())
}

/// Everything in one `global` bundle, imports before importers.
fn global_bundle(analyses: &[FileAnalysis], graph: &DependencyGraph) -> IndexMap<String, BundleDraft> {
    let mut draft = BundleDraft::default();
    for index in graph.topological_order() {
        let analysis = &analyses[index];
        draft.push(index, source_header(analysis), &analysis.content);
    }
    let mut bundles = IndexMap::new();
    if !draft.is_empty() {
        bundles.insert("global".to_string(), draft);
    }
    bundles
}

/// `critical` (critical category or small), then `vendor`, then `main`.
/// A file goes to the first bundle it qualifies for.
fn smart_bundles(analyses: &[FileAnalysis], inline_threshold: usize) -> IndexMap<String, BundleDraft> {
    let mut critical = BundleDraft::default();
    let mut vendor = BundleDraft::default();
    let mut main = BundleDraft::default();

    for (i, analysis) in analyses.iter().enumerate() {
        let target = if analysis.category == "critical" || analysis.size < inline_threshold {
            &mut critical
        } else if analysis.category == "vendor" {
            &mut vendor
        } else {
            &mut main
        };
        target.push(i, source_header(analysis), &analysis.content);
    }

    [("critical", critical), ("vendor", vendor), ("main", main)]
        .into_iter()
        .filter(|(_, draft)| !draft.is_empty())
        .map(|(name, draft)| (name.to_string(), draft))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file(name: &str, category: &str, size: usize) -> FileAnalysis {
        FileAnalysis {
            path: PathBuf::from(name),
            content: format!(".{}{{x:{}}}", name.trim_end_matches(".css"), "y".repeat(size.saturating_sub(8))),
            size,
            rule_count: 1,
            selectors: vec![format!(".{}", name.trim_end_matches(".css"))],
            imports: Vec::new(),
            media_queries: Vec::new(),
            fonts: Vec::new(),
            variables: IndexMap::new(),
            category: category.to_string(),
        }
    }

    fn names(bundles: &IndexMap<String, BundleDraft>) -> Vec<&str> {
        bundles.keys().map(String::as_str).collect()
    }

    fn config(strategy: BundleStrategy) -> BundlerConfig {
        BundlerConfig {
            bundle_strategy: strategy,
            max_bundle_size: 100,
            ..BundlerConfig::default()
        }
    }

    #[test]
    fn test_route_splits_by_size() {
        let files = vec![
            file("a.css", "global", 60),
            file("b.css", "vendor", 10),
            file("c.css", "global", 60),
            file("d.css", "global", 30),
            file("e.css", "global", 80),
        ];
        let graph = DependencyGraph::default();
        let bundles = generate(&files, &graph, &config(BundleStrategy::Route));
        assert_eq!(names(&bundles), vec!["global", "global-2", "global-3", "vendor"]);
        assert_eq!(bundles["global"].files, vec![0]);
        assert_eq!(bundles["global-2"].files, vec![2, 3]);
        assert_eq!(bundles["global-3"].files, vec![4]);
        assert!(bundles["vendor"].css.starts_with("\n/* Source: b.css */\n.b{"));
    }

    #[test]
    fn test_component_grouping() {
        let files = vec![
            file("c-button-styles.css", "components", 10),
            file("comp-button.css", "components", 10),
            file("cards.css", "components", 10),
            file("site.css", "global", 10),
        ];
        let bundles = generate(&files, &DependencyGraph::default(), &config(BundleStrategy::Component));
        assert_eq!(names(&bundles), vec!["component-button", "component-cards", "global"]);
        assert_eq!(bundles["component-button"].files, vec![0, 1]);
        assert!(bundles["component-cards"].css.contains("/* Component: cards - cards.css */"));
    }

    #[test]
    fn test_component_name_falls_back_to_class() {
        let mut analysis = file("component-.css", "components", 10);
        analysis.selectors = vec![".card .x".into(), ".modal".into()];
        assert_eq!(component_name(&analysis), "modal");
        analysis.selectors.clear();
        assert_eq!(component_name(&analysis), "misc");
    }

    #[test]
    fn test_smart_is_a_partition() {
        let files = vec![
            file("reset.css", "critical", 5000),
            file("tiny.css", "vendor", 100),
            file("bootstrap.css", "vendor", 9000),
            file("app.css", "global", 9000),
        ];
        let bundles = generate(&files, &DependencyGraph::default(), &config(BundleStrategy::Smart));
        assert_eq!(names(&bundles), vec!["critical", "vendor", "main"]);
        assert_eq!(bundles["critical"].files, vec![0, 1]);
        assert_eq!(bundles["vendor"].files, vec![2]);
        assert_eq!(bundles["main"].files, vec![3]);
    }

    #[test]
    fn test_global_is_single_bundle() {
        let files = vec![file("a.css", "global", 10), file("b.css", "vendor", 10)];
        let graph = DependencyGraph::build(&files);
        let bundles = generate(&files, &graph, &config(BundleStrategy::Global));
        assert_eq!(names(&bundles), vec!["global"]);
        assert_eq!(bundles["global"].files, vec![0, 1]);
    }
}
