//! Groups CSS files into optimized bundles plus a manifest.
//!
//! The pipeline is analyze, graph, generate, optimize, emit. Only
//! [`StyleBundler::create_bundles`] touches the output directory; every
//! other step is usable on its own.

pub mod analyze;
pub mod emit;
pub mod graph;
pub mod loader;
pub mod manifest;
pub mod optimize;
pub mod strategy;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{json, Map, Value};

pub use analyze::FileAnalysis;
pub use emit::EmittedFiles;
pub use graph::DependencyGraph;
pub use loader::generate_loader;
pub use manifest::{content_hash, determine_load_strategy, BundleManifest, LoadStrategy, ManifestEntry};
pub use optimize::OptimizedCss;
pub use strategy::BundleDraft;

use crate::config::BundlerConfig;
use crate::error::{ensure_exists, read_input, Error, Result};
use crate::metrics::{round2, MetricsSink};
use crate::style::{RegexRuleParser, RuleParser};

/// One emitted bundle.
#[derive(Debug, Clone, Serialize)]
pub struct Bundle {
    pub name: String,
    #[serde(skip)]
    pub css: String,
    pub original_size: usize,
    pub optimized_size: usize,
    pub load_strategy: LoadStrategy,
    pub content_hash: String,
    /// Input files, in concatenation order.
    pub sources: Vec<PathBuf>,
    /// Other bundles holding files this bundle's files import.
    pub dependencies: Vec<String>,
    #[serde(skip)]
    pub files: EmittedFiles,
}

/// Outcome of [`StyleBundler::create_bundles`].
#[derive(Debug, Clone)]
pub struct BundleReport {
    pub bundles: Vec<Bundle>,
    pub manifest: BundleManifest,
    pub total_original_size: usize,
    pub total_bundled_size: usize,
    pub elapsed_seconds: f64,
}

impl BundleReport {
    pub fn bundle(&self, name: &str) -> Option<&Bundle> {
        self.bundles.iter().find(|b| b.name == name)
    }
}

pub struct StyleBundler {
    config: BundlerConfig,
    parser: Box<dyn RuleParser>,
    metrics: Arc<dyn MetricsSink>,
}

impl StyleBundler {
    pub fn new(config: BundlerConfig, metrics: Arc<dyn MetricsSink>) -> Self {
        StyleBundler {
            config,
            parser: Box::new(RegexRuleParser),
            metrics,
        }
    }

    pub fn with_parser(mut self, parser: Box<dyn RuleParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn config(&self) -> &BundlerConfig {
        &self.config
    }

    /// Read and analyze every file. All paths are checked before any is
    /// read. The result has the order of `paths`.
    pub fn analyze(&self, paths: &[PathBuf]) -> Result<Vec<FileAnalysis>> {
        for path in paths {
            ensure_exists(path)?;
        }
        let parser = self.parser.as_ref();
        let splitting = &self.config.bundle_splitting;
        paths
            .par_iter()
            .map(|path| {
                let content = read_input(path)?;
                Ok(analyze::analyze_file(path, content, parser, splitting))
            })
            .collect()
    }

    pub fn generate_bundles(
        &self,
        analyses: &[FileAnalysis],
        graph: &DependencyGraph,
    ) -> IndexMap<String, BundleDraft> {
        strategy::generate(analyses, graph, &self.config)
    }

    pub fn optimize(&self, css: &str) -> OptimizedCss {
        optimize::optimize(css, &self.config.optimization, self.parser.as_ref())
    }

    /// Run the whole pipeline and write `<name>.css` (plus compressed
    /// companions) and `bundle-manifest.json` into `out_dir`.
    pub fn create_bundles(&self, paths: &[PathBuf], out_dir: &Path) -> Result<BundleReport> {
        let started = Instant::now();

        let analyses = self.analyze(paths)?;
        let graph = DependencyGraph::build(&analyses);
        let drafts = self.generate_bundles(&analyses, &graph);

        fs::create_dir_all(out_dir).map_err(|e| Error::io(out_dir, e))?;

        let mut owner = vec![""; analyses.len()];
        for (name, draft) in &drafts {
            for &file in &draft.files {
                owner[file] = name.as_str();
            }
        }

        let mut manifest = BundleManifest::new();
        let mut bundles = Vec::with_capacity(drafts.len());
        for (name, draft) in &drafts {
            let optimized = self.optimize(&draft.css);
            let files = emit::emit_bundle(out_dir, name, &optimized.css, self.config.compress)?;

            let dependencies: Vec<String> = draft
                .files
                .iter()
                .flat_map(|&file| graph.dependencies(file))
                .map(|dep| owner[dep])
                .filter(|dep_bundle| *dep_bundle != name.as_str())
                .map(str::to_string)
                .collect::<IndexSet<_>>()
                .into_iter()
                .collect();

            let bundle = Bundle {
                name: name.clone(),
                load_strategy: determine_load_strategy(name, optimized.optimized_size, &self.config),
                content_hash: content_hash(&optimized.css),
                original_size: optimized.original_size,
                optimized_size: optimized.optimized_size,
                sources: draft.files.iter().map(|&i| analyses[i].path.clone()).collect(),
                dependencies,
                css: optimized.css,
                files,
            };
            log::info!(
                "bundle {}: {} -> {} bytes ({}% smaller), {}",
                bundle.name,
                bundle.original_size,
                bundle.optimized_size,
                optimized.reduction,
                bundle.load_strategy
            );
            manifest.bundles.insert(
                name.clone(),
                ManifestEntry {
                    size: bundle.optimized_size,
                    original_size: bundle.original_size,
                    reduction: format!("{}%", optimized.reduction),
                    load_strategy: bundle.load_strategy,
                    dependencies: bundle.dependencies.clone(),
                    hash: bundle.content_hash.clone(),
                },
            );
            bundles.push(bundle);
        }
        manifest.write(out_dir)?;

        let report = BundleReport {
            total_original_size: analyses.iter().map(|a| a.size).sum(),
            total_bundled_size: bundles.iter().map(|b| b.optimized_size).sum(),
            elapsed_seconds: started.elapsed().as_secs_f64(),
            bundles,
            manifest,
        };
        self.record(&report);
        Ok(report)
    }

    /// Loader HTML for a finished run. Inline bundles embed their CSS.
    pub fn loader_html(&self, report: &BundleReport) -> String {
        generate_loader(
            &report.manifest,
            |name| report.bundle(name).map(|b| b.css.clone()),
            &self.config.public_path,
        )
    }

    fn record(&self, report: &BundleReport) {
        let mut data = Map::new();
        data.insert("bundles_created".into(), json!(report.bundles.len()));
        data.insert("total_original_size".into(), json!(report.total_original_size));
        data.insert("total_bundled_size".into(), json!(report.total_bundled_size));
        data.insert("processing_time".into(), json!(round2(report.elapsed_seconds)));
        data.insert(
            "strategy".into(),
            Value::String(self.config.bundle_strategy.to_string()),
        );
        self.metrics.record_metric("css_bundling", &data);
    }
}
