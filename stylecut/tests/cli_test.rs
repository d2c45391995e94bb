use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

const PAGE: &str = r#"<html><body><header class="site-header"></header><div class="below-fold">x</div></body></html>"#;
const STYLES: &str = "body { margin: 0 } .site-header { display: flex } .below-fold { color: red }";

fn stylecut() -> Command {
    Command::cargo_bin("stylecut").unwrap()
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_extract_writes_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("index.html");
        let css = dir.path().join("main.css");
        fs::write(&html, PAGE).unwrap();
        fs::write(&css, STYLES).unwrap();
        let out = dir.path().join("public");

        stylecut()
            .arg("extract")
            .arg(&html)
            .arg(&css)
            .arg("--out")
            .arg(&out)
            .assert()
            .success()
            .stdout(predicate::str::contains("Critical CSS:"));

        let critical = fs::read_to_string(out.join("css").join("critical.css")).unwrap();
        assert!(critical.contains("body{margin:0}"));
        assert!(!critical.contains("below-fold"));
        let remaining = fs::read_to_string(out.join("css").join("remaining.css")).unwrap();
        assert!(remaining.contains(".below-fold"));
        assert!(out.join("critical-css-inline.html").is_file());
        assert!(out.join("critical-css-loader.js").is_file());
    }

    #[test]
    fn test_extract_missing_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        stylecut()
            .arg("extract")
            .arg(dir.path().join("nope.html"))
            .arg(dir.path().join("nope.css"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn test_extract_viewport_flag() {
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("index.html");
        let css = dir.path().join("main.css");
        fs::write(&html, PAGE).unwrap();
        fs::write(&css, STYLES).unwrap();

        stylecut()
            .arg("extract")
            .arg(&html)
            .arg(&css)
            .args(["--viewport", "1024x768", "--out"])
            .arg(dir.path())
            .assert()
            .success();

        stylecut()
            .arg("extract")
            .arg(&html)
            .arg(&css)
            .args(["--viewport", "1024"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("expected WIDTHxHEIGHT"));
    }

    #[test]
    fn test_bundle_with_strategy_flag() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("reset.css");
        let b = dir.path().join("site.css");
        fs::write(&a, "* { margin: 0 }").unwrap();
        fs::write(&b, "main p { line-height: 1.5 }").unwrap();
        let out = dir.path().join("bundles");

        stylecut()
            .args(["bundle", "--strategy", "global", "--no-compress", "--out"])
            .arg(&out)
            .arg(&a)
            .arg(&b)
            .assert()
            .success()
            .stdout(predicate::str::contains("global:"));

        assert!(out.join("global.css").is_file());
        assert!(!out.join("global.css.gz").exists());
        assert!(out.join("bundle-manifest.json").is_file());
        let loader = fs::read_to_string(out.join("css-bundle-loader.html")).unwrap();
        assert!(loader.contains("bundle-global"));
    }

    #[test]
    fn test_bundle_rejects_unknown_strategy() {
        let dir = tempfile::tempdir().unwrap();
        stylecut()
            .args(["bundle", "--strategy", "fastest", "--out"])
            .arg(dir.path())
            .arg(dir.path().join("a.css"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown bundle strategy"));
    }

    #[test]
    fn test_purge_writes_css_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let css = dir.path().join("app.css");
        let page = dir.path().join("index.html");
        fs::write(&css, ".used { color: red } .unused { color: blue }").unwrap();
        fs::write(&page, r#"<p class="used">hi</p>"#).unwrap();

        stylecut()
            .arg("purge")
            .arg(&css)
            .arg(&page)
            .assert()
            .success()
            .stdout(predicate::str::contains("Purged 1 of 2 rules"));

        let purged = fs::read_to_string(dir.path().join("app.purged.css")).unwrap();
        assert_eq!(purged, ".used{color:red}");
        assert!(dir.path().join("purgecss-report.json").is_file());
    }

    #[test]
    fn test_config_file_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("stylecut.toml");
        fs::write(&config, "[purge]\nsafelist = [\"unused\"]\n").unwrap();
        let css = dir.path().join("app.css");
        let page = dir.path().join("index.html");
        fs::write(&css, ".used { color: red } .unused { color: blue }").unwrap();
        fs::write(&page, r#"<p class="used">hi</p>"#).unwrap();

        stylecut()
            .arg("--config")
            .arg(&config)
            .arg("purge")
            .arg(&css)
            .arg(&page)
            .assert()
            .success();

        let purged = fs::read_to_string(dir.path().join("app.purged.css")).unwrap();
        assert!(purged.contains(".unused{color:blue}"));
    }
}
