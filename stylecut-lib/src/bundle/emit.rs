//! Writes bundle files and their compressed companions.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{Error, Result};

/// Files written for one bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmittedFiles {
    pub css: PathBuf,
    pub gzip: Option<PathBuf>,
    pub brotli: Option<PathBuf>,
}

/// Write `<dir>/<name>.css` and, when `compress` is set, the `.gz` and
/// `.br` companions. The plain file is required; compressed ones are
/// best effort.
pub fn emit_bundle(dir: &Path, name: &str, css: &str, compress: bool) -> Result<EmittedFiles> {
    let path = dir.join(format!("{name}.css"));
    fs::write(&path, css).map_err(|e| Error::io(&path, e))?;

    let mut emitted = EmittedFiles {
        css: path.clone(),
        ..Default::default()
    };
    if !compress {
        return Ok(emitted);
    }

    let gz_path = with_suffix(&path, "gz");
    match gzip(css.as_bytes()).and_then(|bytes| fs::write(&gz_path, bytes)) {
        Ok(()) => emitted.gzip = Some(gz_path),
        Err(e) => log::warn!("skipping {}: {}", gz_path.display(), e),
    }

    let br_path = with_suffix(&path, "br");
    match brotli_bytes(css.as_bytes()) {
        Some(Ok(bytes)) => match fs::write(&br_path, bytes) {
            Ok(()) => emitted.brotli = Some(br_path),
            Err(e) => log::warn!("skipping {}: {}", br_path.display(), e),
        },
        Some(Err(e)) => log::warn!("brotli compression of {name} failed: {e}"),
        None => log::debug!("brotli support not compiled in, no .br for {name}"),
    }
    Ok(emitted)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".");
    os.push(suffix);
    PathBuf::from(os)
}

/// Gzip at level 9.
pub fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Brotli at quality 11, or `None` without the `brotli` feature.
#[cfg(feature = "brotli")]
pub fn brotli_bytes(data: &[u8]) -> Option<std::io::Result<Vec<u8>>> {
    let mut out = Vec::new();
    let result = {
        let mut writer = brotli::CompressorWriter::new(&mut out, 4096, 11, 22);
        writer.write_all(data).and_then(|()| writer.flush())
    };
    Some(result.map(|()| out))
}

#[cfg(not(feature = "brotli"))]
pub fn brotli_bytes(_data: &[u8]) -> Option<std::io::Result<Vec<u8>>> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_gzip_companion_decodes() {
        let dir = tempfile::tempdir().unwrap();
        let css = ".a{color:red}".repeat(50);
        let emitted = emit_bundle(dir.path(), "main", &css, true).unwrap();

        assert_eq!(fs::read_to_string(&emitted.css).unwrap(), css);
        let gz_path = emitted.gzip.unwrap();
        assert!(gz_path.ends_with("main.css.gz"));
        let mut decoded = String::new();
        GzDecoder::new(fs::File::open(gz_path).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, css);
        assert_eq!(emitted.brotli.is_some(), cfg!(feature = "brotli"));
    }

    #[test]
    fn test_no_companions_without_compress() {
        let dir = tempfile::tempdir().unwrap();
        let emitted = emit_bundle(dir.path(), "main", ".a{}", false).unwrap();
        assert!(emitted.gzip.is_none());
        assert!(!dir.path().join("main.css.gz").exists());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = emit_bundle(&dir.path().join("nope"), "main", ".a{}", true).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
