//! Import graph between analyzed files.
//!
//! Nodes are indices into the analysis list. An edge `a -> b` means file
//! `a` imports file `b`. Cycles are allowed and only logged.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::bundle::analyze::FileAnalysis;

#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<usize, ()>,
    nodes: Vec<NodeIndex>,
}

impl DependencyGraph {
    pub fn build(analyses: &[FileAnalysis]) -> Self {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..analyses.len()).map(|i| graph.add_node(i)).collect();

        let known: HashMap<PathBuf, usize> = analyses
            .iter()
            .enumerate()
            .map(|(i, a)| (canonical(&a.path), i))
            .collect();

        for (i, analysis) in analyses.iter().enumerate() {
            let base_dir = analysis.path.parent().unwrap_or_else(|| Path::new(""));
            for import in &analysis.imports {
                match resolve_import(import, base_dir, &known) {
                    Some(target) if target != i => {
                        graph.update_edge(nodes[i], nodes[target], ());
                    }
                    Some(_) => log::warn!("{} imports itself", analysis.path.display()),
                    None => log::debug!(
                        "{}: import `{}` is not among the bundled files",
                        analysis.path.display(),
                        import
                    ),
                }
            }
        }

        let dependency_graph = DependencyGraph { graph, nodes };
        if dependency_graph.has_cycle() {
            log::warn!("import graph contains a cycle, ordering falls back to encounter order inside it");
        }
        dependency_graph
    }

    /// Files imported by file `index`, in import order.
    pub fn dependencies(&self, index: usize) -> Vec<usize> {
        let Some(&node) = self.nodes.get(index) else {
            return Vec::new();
        };
        // petgraph yields the most recently added edge first.
        let mut deps: Vec<usize> = self.graph.neighbors(node).map(|n| self.graph[n]).collect();
        deps.reverse();
        deps
    }

    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Every file after the files it imports. Unrelated files keep their
    /// input order; on a cycle the first file reached wins.
    pub fn topological_order(&self) -> Vec<usize> {
        let mut visited = vec![false; self.nodes.len()];
        let mut sorted = Vec::with_capacity(self.nodes.len());
        for index in 0..self.nodes.len() {
            self.visit(index, &mut visited, &mut sorted);
        }
        sorted
    }

    fn visit(&self, index: usize, visited: &mut [bool], sorted: &mut Vec<usize>) {
        if visited[index] {
            return;
        }
        visited[index] = true;
        for dep in self.dependencies(index) {
            self.visit(dep, visited, sorted);
        }
        sorted.push(index);
    }
}

/// Map an `@import` target to an analyzed file. Remote, protocol-relative
/// and absolute targets never resolve. A target without `.css` is retried
/// with the extension appended.
pub fn resolve_import(import: &str, base_dir: &Path, known: &HashMap<PathBuf, usize>) -> Option<usize> {
    let import = import.trim();
    if import.is_empty()
        || import.contains("://")
        || import.starts_with("//")
        || import.starts_with('/')
        || import.starts_with("data:")
    {
        return None;
    }

    let candidate = canonical(&base_dir.join(import));
    if let Some(&index) = known.get(&candidate) {
        return Some(index);
    }
    if !import.to_ascii_lowercase().ends_with(".css") {
        return resolve_import(&format!("{import}.css"), base_dir, known);
    }
    None
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::analyze::analyze_file;
    use crate::config::BundlerConfig;
    use crate::style::RegexRuleParser;
    use std::fs;

    fn analyses(dir: &Path, files: &[(&str, &str)]) -> Vec<FileAnalysis> {
        let splitting = BundlerConfig::default().bundle_splitting;
        files
            .iter()
            .map(|(name, css)| {
                let path = dir.join(name);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).unwrap();
                }
                fs::write(&path, css).unwrap();
                analyze_file(&path, css.to_string(), &RegexRuleParser, &splitting)
            })
            .collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        let dir = tempfile::tempdir().unwrap();
        let files = analyses(
            dir.path(),
            &[
                ("app.css", "@import './lib/grid'; @import \"base.css\"; .app{x:y}"),
                ("base.css", ".base{x:y}"),
                ("lib/grid.css", "@import '../base.css'; .grid{x:y}"),
                ("other.css", "@import url(https://cdn.example.com/x.css); .o{x:y}"),
            ],
        );
        let graph = DependencyGraph::build(&files);

        assert_eq!(graph.dependencies(0), vec![2, 1]);
        assert_eq!(graph.edge_count(), 3);
        assert!(!graph.has_cycle());
        assert_eq!(graph.topological_order(), vec![1, 2, 0, 3]);
    }

    #[test]
    fn test_cycles_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let files = analyses(
            dir.path(),
            &[("a.css", "@import 'b.css'; .a{x:y}"), ("b.css", "@import 'a.css'; .b{x:y}")],
        );
        let graph = DependencyGraph::build(&files);
        assert!(graph.has_cycle());
        assert_eq!(graph.topological_order(), vec![1, 0]);
    }
}
