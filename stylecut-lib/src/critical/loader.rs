//! HTML and JavaScript snippets that deliver extracted critical CSS.

use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

use crate::config::{ExtractorConfig, FontStrategy};

static FONT_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(["']?([^"')]+\.(woff2?|ttf|otf))["']?\)"#).expect("font url pattern is valid")
});

/// Inline `critical_css` and load the full stylesheet without blocking render.
pub fn inline_html(critical_css: &str, config: &ExtractorConfig) -> String {
    let href = &config.stylesheet_href;
    let mut html = String::from("<style id=\"critical-css\">\n");
    html.push_str(critical_css);
    html.push_str("\n</style>\n");
    html.push_str(&format!(
        "<link rel=\"preload\" href=\"{href}\" as=\"style\" onload=\"this.onload=null;this.rel='stylesheet'\">\n"
    ));
    html.push_str(&format!("<noscript><link rel=\"stylesheet\" href=\"{href}\"></noscript>\n"));

    if config.fonts_strategy == FontStrategy::Preload {
        for (font, ext) in font_urls(critical_css) {
            html.push_str(&format!(
                "<link rel=\"preload\" href=\"{font}\" as=\"font\" type=\"font/{ext}\" crossorigin>\n"
            ));
        }
    }
    html
}

/// Distinct font files referenced by `url(...)`, with their extension.
fn font_urls(css: &str) -> IndexSet<(String, String)> {
    FONT_URL_RE
        .captures_iter(css)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

/// Script that loads the full stylesheet when the browser is idle, then
/// drops the inlined critical block.
pub fn loader_script(config: &ExtractorConfig) -> String {
    let href = &config.stylesheet_href;
    format!(
        r#"
// Critical CSS loader
(function() {{
    var loadCSS = function(href) {{
        var link = document.createElement("link");
        link.rel = "stylesheet";
        link.href = href;
        link.media = "only x";
        document.head.appendChild(link);
        link.onload = function() {{
            link.media = "all";
        }};
    }};

    var removeCritical = function() {{
        var critical = document.getElementById("critical-css");
        if (critical) {{
            critical.remove();
        }}
    }};

    if ("requestIdleCallback" in window) {{
        requestIdleCallback(function() {{
            loadCSS("{href}");
            setTimeout(removeCritical, 100);
        }});
    }} else {{
        setTimeout(function() {{
            loadCSS("{href}");
            setTimeout(removeCritical, 100);
        }}, 1);
    }}
}})();
"#
    )
}
