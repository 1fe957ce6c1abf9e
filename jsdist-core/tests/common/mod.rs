#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use jsdist_core::config::ReleaseConfig;
use serde_json::json;
use tempfile::TempDir;

pub const CORE_JS: &str = "var mylib = {\n  /** Version number. */\n  version: '2.1.0'\n, mode: null\n};\n";
pub const DOM_JS: &str = "mylib.dom = function() { return 'dom'; };\n";
pub const HTML_JS: &str = "mylib.html = function() { return 'html'; }";
pub const DEMO_HTML: &str = "<html>\n<head><script src=\"mylib.js\"></script></head>\n<body>demo</body>\n</html>\n";

/// A throwaway project laid out like a small library repository.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        fs::create_dir_all(root.join("lib")).unwrap();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("lib/core.js"), CORE_JS).unwrap();
        fs::write(root.join("lib/dom.js"), DOM_JS).unwrap();
        fs::write(root.join("lib/html.js"), HTML_JS).unwrap();
        fs::write(root.join("docs/index.rst"), "mylib\n=====\n").unwrap();
        fs::write(root.join("demo.html"), DEMO_HTML).unwrap();
        fs::write(root.join("CHANGELOG"), "2.1.0\n- things\n").unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Full release config: plain and compressed variants, demo, docs and a changelog.
    pub fn release_config(&self) -> ReleaseConfig {
        self.config_from(json!({
            "library": {
                "name": "mylib",
                "homepage": "https://example.com/mylib",
                "mode_trailer": "mylib.mode = '{mode}';"
            },
            "version": { "from": "source", "path": "lib/core.js" },
            "fragments": [
                { "name": "core", "path": "lib/core.js" },
                { "name": "dom", "path": "lib/dom.js" }
            ],
            "variants": [
                { "name": "full", "fragments": ["core", "dom"], "modes": "dom [default]" },
                { "name": "full-min", "fragments": ["core", "dom"], "modes": "dom [default]", "compress": true }
            ],
            "compressor": { "kind": "command", "program": "cat" },
            "docs": {
                "source": "docs",
                "output": "docs/_build/html",
                "command": { "program": "sphinx-build", "args": ["{source}", "{output}"] }
            },
            "demo": { "path": "demo.html", "script_reference": "mylib.js", "variant": "full" },
            "static_files": ["CHANGELOG"]
        }))
    }

    /// Variants only: what `build` needs.
    pub fn build_config(&self) -> ReleaseConfig {
        self.config_from(json!({
            "library": { "name": "mylib", "mode_trailer": "mylib.mode = '{mode}';" },
            "version": { "from": "argument" },
            "fragments": [
                { "name": "core", "path": "lib/core.js" },
                { "name": "dom", "path": "lib/dom.js" },
                { "name": "html", "path": "lib/html.js" }
            ],
            "variants": [
                { "name": "full", "fragments": ["core", "dom", "html"], "modes": "dom [default], html" },
                { "name": "full-min", "fragments": ["core", "dom", "html"], "modes": "dom [default], html", "compress": true },
                { "name": "html", "qualifier": "html", "fragments": ["core", "html"], "modes": "html [default]", "pin_mode": "html" }
            ],
            "compressor": { "kind": "command", "program": "cat" }
        }))
    }

    pub fn config_from(&self, value: serde_json::Value) -> ReleaseConfig {
        let config: ReleaseConfig = serde_json::from_value(value).expect("valid config");
        config.rebase(self.root())
    }
}

/// Stands in for a docs builder: one page, an asset and the housekeeping files.
pub fn write_fake_docs(output: &Path) {
    fs::create_dir_all(output.join("_static")).unwrap();
    fs::write(output.join("index.html"), "<html>docs</html>").unwrap();
    fs::write(output.join("_static/site.css"), "body{}").unwrap();
    fs::write(output.join(".buildinfo"), "config: abc").unwrap();
    fs::write(output.join("objects.inv"), "inventory").unwrap();
}
