use crate::bundle::manifest::{BundleManifest, LoadStrategy};

/// HTML that loads every bundle of `manifest` according to its strategy.
///
/// `css_lookup` returns the optimized CSS of an inline bundle; when it
/// yields nothing the bundle falls back to a plain stylesheet link.
pub fn generate_loader(
    manifest: &BundleManifest,
    css_lookup: impl Fn(&str) -> Option<String>,
    public_path: &str,
) -> String {
    let public_path = public_path.trim_end_matches('/');
    let mut html = String::from("<!-- CSS Bundle Loader -->\n");

    for (name, entry) in &manifest.bundles {
        let href = format!("{public_path}/{name}.css?v={}", entry.hash);
        match entry.load_strategy {
            LoadStrategy::Inline => match css_lookup(name) {
                Some(css) => {
                    html.push_str(&format!("<style id=\"bundle-{name}\">\n{css}\n</style>\n"));
                }
                None => {
                    log::warn!("no css for inline bundle `{name}`, linking it instead");
                    html.push_str(&format!("<link rel=\"stylesheet\" href=\"{href}\">\n"));
                }
            },
            LoadStrategy::Async => {
                html.push_str(&format!(
                    "<link rel=\"preload\" href=\"{href}\" as=\"style\" onload=\"this.onload=null;this.rel='stylesheet'\">\n"
                ));
                html.push_str(&format!("<noscript><link rel=\"stylesheet\" href=\"{href}\"></noscript>\n"));
            }
            LoadStrategy::Preload => {
                html.push_str(&format!("<link rel=\"preload\" href=\"{href}\" as=\"style\">\n"));
                html.push_str(&format!("<link rel=\"stylesheet\" href=\"{href}\">\n"));
            }
            LoadStrategy::Normal => {
                html.push_str(&format!("<link rel=\"stylesheet\" href=\"{href}\">\n"));
            }
        }
    }
    html
}
