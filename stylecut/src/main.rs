use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use stylecut_lib::purge::REPORT_FILE;
use stylecut_lib::{
    BundleStrategy, Config, CriticalCssExtractor, LogMetrics, ParserBackend, StyleBundler, UnusedCssPurger,
    Viewport,
};

const STYLECUT_INTRO: &str = r#"
       _         _                _
   ___| |_ _   _| | ___  ___ _   _| |_
  / __| __| | | | |/ _ \/ __| | | | __|
  \__ \ |_| |_| | |  __/ (__| |_| | |_
  |___/\__|\__, |_|\___|\___|\__,_|\__|
           |___/

    Critical CSS, bundles and purging for static sites.
"#;

const LOADER_FILE: &str = "css-bundle-loader.html";

#[derive(Parser)]
#[command(name = "stylecut")]
#[command(about = "Split, bundle and purge CSS for faster first paint")]
struct Args {
    /// TOML config file. Flags override its values.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// CSS parser backend: regex or lightning.
    #[arg(long, global = true)]
    parser: Option<ParserBackend>,

    /// More output; repeat for trace logging.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split a stylesheet into critical and remaining CSS for one page.
    Extract {
        /// HTML page.
        html: PathBuf,
        /// Stylesheet used by the page.
        css: PathBuf,
        /// Output directory.
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
        /// Critical CSS budget in bytes.
        #[arg(long)]
        max_size: Option<usize>,
        /// Viewport as WIDTHxHEIGHT, e.g. 1366x768.
        #[arg(long)]
        viewport: Option<Viewport>,
    },
    /// Group stylesheets into optimized bundles with a manifest.
    Bundle {
        /// Stylesheets to bundle.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output directory for bundles and manifest.
        #[arg(short, long)]
        out: PathBuf,
        /// route, component, global or smart.
        #[arg(short, long)]
        strategy: Option<BundleStrategy>,
        /// Skip the .gz and .br companions.
        #[arg(long)]
        no_compress: bool,
        /// URL prefix used by the loader HTML.
        #[arg(long)]
        public_path: Option<String>,
    },
    /// Remove rules that no content file references.
    Purge {
        /// Stylesheet to purge.
        css: PathBuf,
        /// Content files or directories to scan.
        #[arg(required = true)]
        content: Vec<PathBuf>,
        /// Purged output, defaults to <css>.purged.css.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Extra safelist entries; `/.../` for patterns.
        #[arg(long)]
        safelist: Vec<String>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    println!("{}", STYLECUT_INTRO);

    // parse the args given in terminal
    let args: Args = Args::parse();
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(parser) = args.parser {
        config.parser = parser;
    }
    let metrics = Arc::new(LogMetrics);

    match args.command {
        Command::Extract {
            html,
            css,
            out,
            max_size,
            viewport,
        } => {
            if let Some(max_size) = max_size {
                config.extractor.max_critical_size = max_size;
            }
            if let Some(viewport) = viewport {
                config.extractor.viewport = viewport;
            }
            let extractor =
                CriticalCssExtractor::new(config.extractor, metrics).with_parser(config.parser.build());
            let result = extractor
                .extract_files(&html, &css)
                .context("critical CSS extraction failed")?;
            for warning in &result.warnings {
                log::warn!("{warning}");
            }

            write_file(&out.join("css").join("critical.css"), &result.critical_css)?;
            write_file(&out.join("css").join("remaining.css"), &result.remaining_css)?;
            write_file(
                &out.join("critical-css-inline.html"),
                &extractor.inline_html(&result.critical_css),
            )?;
            write_file(&out.join("critical-css-loader.js"), &extractor.loader_script())?;
            println!(
                "Critical CSS: {} bytes ({}% of the stylesheet), remaining: {} bytes",
                result.metrics.critical_size_bytes,
                result.metrics.compression_ratio,
                result.metrics.remaining_size_bytes
            );
        }
        Command::Bundle {
            files,
            out,
            strategy,
            no_compress,
            public_path,
        } => {
            if let Some(strategy) = strategy {
                config.bundler.bundle_strategy = strategy;
            }
            if no_compress {
                config.bundler.compress = false;
            }
            if let Some(public_path) = public_path {
                config.bundler.public_path = public_path;
            }
            let bundler = StyleBundler::new(config.bundler, metrics).with_parser(config.parser.build());
            let report = bundler
                .create_bundles(&files, &out)
                .context("bundling failed")?;

            for bundle in &report.bundles {
                println!(
                    "{}: {} -> {} bytes [{}] {}",
                    bundle.name,
                    bundle.original_size,
                    bundle.optimized_size,
                    bundle.load_strategy,
                    bundle.content_hash
                );
            }
            write_file(&out.join(LOADER_FILE), &bundler.loader_html(&report))?;
        }
        Command::Purge {
            css,
            content,
            output,
            safelist,
        } => {
            config.purge.safelist.extend(safelist);
            let purger = UnusedCssPurger::new(config.purge, metrics)
                .context("invalid safelist or blocklist")?
                .with_parser(config.parser.build());
            let result = purger
                .purge_file(&css, &content, output.as_deref())
                .context("purge failed")?;

            let report_dir = output
                .as_deref()
                .and_then(Path::parent)
                .or_else(|| css.parent())
                .unwrap_or_else(|| Path::new("."));
            write_file(&report_dir.join(REPORT_FILE), &result.report.to_json()?)?;
            println!(
                "Purged {} of {} rules, {} ({}% smaller)",
                result.stats.removed_rules,
                result.stats.total_rules(),
                result.report.summary.removed_size,
                result.stats.reduction_percentage
            );
        }
    }
    Ok(())
}
