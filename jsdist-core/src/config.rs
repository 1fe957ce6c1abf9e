//! Declarative release configuration.
//!
//! One [`ReleaseConfig`] describes the library, where its version comes from,
//! the named source fragments, the variants built from them and the optional
//! collaborators (compressor, docs, demo page). All paths are resolved against
//! a root directory with [`ReleaseConfig::rebase`] before validation.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assemble::variant_filename;
use crate::error::ReleaseError;
use crate::release::DOCS_SUBDIR;

/// Placeholder replaced by the pinned mode in [`LibraryConfig::mode_trailer`].
pub const MODE_PLACEHOLDER: &str = "{mode}";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    pub library: LibraryConfig,
    #[serde(default)]
    pub version: VersionSource,
    pub fragments: Vec<FragmentSource>,
    pub variants: Vec<VariantConfig>,
    #[serde(default)]
    pub compressor: Option<CompressorConfig>,
    #[serde(default)]
    pub docs: Option<DocsConfig>,
    #[serde(default)]
    pub demo: Option<DemoConfig>,
    #[serde(default)]
    pub static_files: Vec<PathBuf>,
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
    #[serde(default = "default_dist_dir")]
    pub dist_dir: PathBuf,
    #[serde(default = "default_dist_dir")]
    pub build_dir: PathBuf,
    /// Directory the relative paths were resolved against, set by
    /// [`ReleaseConfig::rebase`].
    #[serde(skip)]
    pub root: Option<PathBuf>,
}

/// Naming and header metadata for the library being packaged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Filename stem for scripts and the release archive.
    pub name: String,
    /// Name shown in the header comment; defaults to `name`.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default = "default_license")]
    pub license: String,
    /// Statement appended to variants that pin a mode, e.g.
    /// `DOMBuilder.mode = '{mode}';`.
    #[serde(default)]
    pub mode_trailer: Option<String>,
}

impl LibraryConfig {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }
}

/// Where the version string of a run comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "lowercase")]
pub enum VersionSource {
    /// Supplied as the positional command line argument.
    #[default]
    Argument,
    /// Extracted from a `version: '...'` declaration in a source file.
    Source { path: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentSource {
    pub name: String,
    pub path: PathBuf,
}

/// One output script: an ordered fragment list plus labelling and compression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfig {
    pub name: String,
    /// Filename qualifier for reduced bundles (`<lib>.<qualifier>.js`).
    #[serde(default)]
    pub qualifier: Option<String>,
    /// Fragment names, concatenated in exactly this order.
    pub fragments: Vec<String>,
    /// Human-readable modes label for the header, e.g. `dom [default], html`.
    pub modes: String,
    #[serde(default)]
    pub pin_mode: Option<String>,
    #[serde(default)]
    pub compress: bool,
}

impl VariantConfig {
    pub fn filename(&self, library: &str, version: Option<&str>) -> String {
        variant_filename(library, version, self.qualifier.as_deref(), self.compress)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CompressorConfig {
    /// Closure-Compiler-compatible HTTP service.
    Service {
        url: String,
        #[serde(default = "default_compilation_level")]
        compilation_level: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// Local program reading source on stdin and writing compressed text to stdout.
    Command(CommandSpec),
}

/// An external program invocation. Arguments may contain `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Builds a [`Command`] with every `{key}` in the arguments replaced by its path.
    pub fn command(&self, vars: &[(&str, &Path)]) -> Command {
        let mut command = Command::new(&self.program);
        for arg in &self.args {
            let mut arg = arg.clone();
            for (key, value) in vars {
                arg = arg.replace(&format!("{{{key}}}"), &value.to_string_lossy());
            }
            command.arg(arg);
        }
        command
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
    pub source: PathBuf,
    pub output: PathBuf,
    pub command: CommandSpec,
    /// File names never copied into the release (build housekeeping).
    #[serde(default = "default_doc_excludes")]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    pub path: PathBuf,
    /// Unversioned script filename the demo page loads.
    pub script_reference: String,
    /// Variant whose versioned file replaces the reference.
    pub variant: String,
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_dist_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_license() -> String {
    "MIT".to_string()
}

fn default_compilation_level() -> String {
    "SIMPLE_OPTIMIZATIONS".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_doc_excludes() -> Vec<String> {
    vec![".buildinfo".to_string(), "objects.inv".to_string()]
}

impl ReleaseConfig {
    pub fn trace_loaded(&self) {
        info!(
            library = %self.library.name,
            fragments = self.fragments.len(),
            variants = self.variants.len(),
            docs = self.docs.is_some(),
            demo = self.demo.is_some(),
            staging_dir = %self.staging_dir.display(),
            dist_dir = %self.dist_dir.display(),
            "Loaded ReleaseConfig"
        );
        debug!(?self, "ReleaseConfig loaded (full debug)");
    }

    /// Resolves every relative path against `root`.
    pub fn rebase(mut self, root: &Path) -> Self {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        };
        if let VersionSource::Source { path } = &mut self.version {
            join(path);
        }
        self.fragments.iter_mut().for_each(|f| join(&mut f.path));
        if let Some(docs) = &mut self.docs {
            join(&mut docs.source);
            join(&mut docs.output);
        }
        if let Some(demo) = &mut self.demo {
            join(&mut demo.path);
        }
        self.static_files.iter_mut().for_each(join);
        join(&mut self.staging_dir);
        join(&mut self.dist_dir);
        join(&mut self.build_dir);
        self.root = Some(root.to_path_buf());
        self
    }

    pub fn fragment(&self, name: &str) -> Option<&FragmentSource> {
        self.fragments.iter().find(|f| f.name == name)
    }

    pub fn variant(&self, name: &str) -> Option<&VariantConfig> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// Checks everything the variant build needs: library naming, version
    /// source, fragments and variant definitions.
    pub fn validate_sources(&self) -> Result<(), ReleaseError> {
        let name = &self.library.name;
        if name.trim().is_empty() || name.contains(['/', '\\']) {
            return Err(ReleaseError::config(format!("invalid library name {name:?}")));
        }
        if let Some(trailer) = &self.library.mode_trailer {
            if !trailer.contains(MODE_PLACEHOLDER) {
                return Err(ReleaseError::config(format!(
                    "library.mode_trailer must contain {MODE_PLACEHOLDER}"
                )));
            }
        }
        if let VersionSource::Source { path } = &self.version {
            require_file("version source", path)?;
        }

        let mut fragment_names = HashSet::new();
        for fragment in &self.fragments {
            if !fragment_names.insert(fragment.name.as_str()) {
                return Err(ReleaseError::config(format!(
                    "fragment {:?} is declared more than once",
                    fragment.name
                )));
            }
            require_file(&format!("fragment {:?}", fragment.name), &fragment.path)?;
        }

        if self.variants.is_empty() {
            return Err(ReleaseError::config("no variants configured"));
        }
        let mut variant_names = HashSet::new();
        let mut filenames = HashSet::new();
        for variant in &self.variants {
            if !variant_names.insert(variant.name.as_str()) {
                return Err(ReleaseError::config(format!(
                    "variant {:?} is declared more than once",
                    variant.name
                )));
            }
            if variant.fragments.is_empty() {
                return Err(ReleaseError::config(format!(
                    "variant {:?} lists no fragments",
                    variant.name
                )));
            }
            if let Some(unknown) = variant.fragments.iter().find(|f| !fragment_names.contains(f.as_str())) {
                return Err(ReleaseError::config(format!(
                    "variant {:?} references unknown fragment {unknown:?}",
                    variant.name
                )));
            }
            if let Some(qualifier) = &variant.qualifier {
                if qualifier.is_empty() || qualifier.contains(['/', '\\']) {
                    return Err(ReleaseError::config(format!(
                        "variant {:?} has invalid qualifier {qualifier:?}",
                        variant.name
                    )));
                }
            }
            if variant.pin_mode.is_some() && self.library.mode_trailer.is_none() {
                return Err(ReleaseError::config(format!(
                    "variant {:?} pins a mode but library.mode_trailer is not set",
                    variant.name
                )));
            }
            if variant.compress && self.compressor.is_none() {
                return Err(ReleaseError::config(format!(
                    "variant {:?} requests compression but no compressor is configured",
                    variant.name
                )));
            }
            let filename = variant.filename(name, None);
            if !filenames.insert(filename.clone()) {
                return Err(ReleaseError::config(format!(
                    "variant {:?} would overwrite {filename} written by another variant",
                    variant.name
                )));
            }
        }
        Ok(())
    }

    /// Checks every input of a full release. Runs before anything is written.
    pub fn validate(&self) -> Result<(), ReleaseError> {
        self.validate_sources()?;

        if let Some(demo) = &self.demo {
            require_file("demo page", &demo.path)?;
            if self.variant(&demo.variant).is_none() {
                return Err(ReleaseError::config(format!(
                    "demo.variant {:?} is not a configured variant",
                    demo.variant
                )));
            }
            let page = fs::read_to_string(&demo.path)
                .map_err(|e| ReleaseError::config(format!("cannot read demo page {}: {e}", demo.path.display())))?;
            if demo.script_reference.is_empty() || !page.contains(&demo.script_reference) {
                return Err(ReleaseError::config(format!(
                    "demo page {} does not reference {:?}",
                    demo.path.display(),
                    demo.script_reference
                )));
            }
        }

        if let Some(docs) = &self.docs {
            if !docs.source.is_dir() {
                return Err(ReleaseError::config(format!(
                    "docs source directory {} does not exist",
                    docs.source.display()
                )));
            }
            if docs.output == docs.source || docs.source.starts_with(&docs.output) {
                return Err(ReleaseError::config(
                    "docs.output must not contain the docs source directory",
                ));
            }
        }

        for file in &self.static_files {
            require_file("static file", file)?;
        }

        self.validate_staging_dir()
    }

    /// Staging is wiped at the start of every run, so it must not overlap
    /// anything we read or keep, nor contain the project itself. Paths are
    /// compared in canonical form so `..` segments and symlinks cannot hide
    /// an overlap.
    fn validate_staging_dir(&self) -> Result<(), ReleaseError> {
        let resolve = |path: &Path| {
            resolve_path(path).map_err(|e| ReleaseError::config(format!("cannot resolve {}: {e}", path.display())))
        };
        let staging = resolve(&self.staging_dir)?;
        if staging.parent().is_none() {
            return Err(ReleaseError::config(format!(
                "staging directory {} is a filesystem root",
                self.staging_dir.display()
            )));
        }
        if let Some(root) = &self.root {
            if resolve(root)?.starts_with(&staging) {
                return Err(ReleaseError::config(format!(
                    "staging directory {} would contain the project directory {}",
                    self.staging_dir.display(),
                    root.display()
                )));
            }
        }

        let mut guarded: Vec<(&str, &Path)> = vec![("dist_dir", &self.dist_dir)];
        guarded.extend(self.fragments.iter().map(|f| ("fragment", f.path.as_path())));
        guarded.extend(self.static_files.iter().map(|f| ("static file", f.as_path())));
        if let VersionSource::Source { path } = &self.version {
            guarded.push(("version source", path));
        }
        if let Some(demo) = &self.demo {
            guarded.push(("demo page", &demo.path));
        }
        if let Some(docs) = &self.docs {
            guarded.push(("docs.source", &docs.source));
            guarded.push(("docs.output", &docs.output));
        }
        for (what, path) in guarded {
            let resolved = resolve(path)?;
            if resolved.starts_with(&staging) || staging.starts_with(&resolved) {
                return Err(ReleaseError::config(format!(
                    "{what} {} overlaps the staging directory {}",
                    path.display(),
                    self.staging_dir.display()
                )));
            }
        }
        Ok(())
    }

    /// Checks that no two release entries land on the same name in staging.
    /// Needs the resolved version, since variant file names carry it.
    pub fn validate_staging_entries(&self, version: &str) -> Result<(), ReleaseError> {
        let mut owners: HashMap<String, String> = HashMap::new();
        let mut claim = |name: String, owner: String| match owners.entry(name) {
            Entry::Occupied(taken) => Err(ReleaseError::config(format!(
                "{owner} and {} would both be written to {} in staging",
                taken.get(),
                taken.key()
            ))),
            Entry::Vacant(free) => {
                free.insert(owner);
                Ok(())
            }
        };

        for variant in &self.variants {
            claim(
                variant.filename(&self.library.name, Some(version)),
                format!("variant {:?}", variant.name),
            )?;
        }
        if let Some(demo) = &self.demo {
            claim(entry_name(&demo.path)?, "the demo page".to_string())?;
        }
        if self.docs.is_some() {
            claim(DOCS_SUBDIR.to_string(), "the generated docs".to_string())?;
        }
        for file in &self.static_files {
            claim(entry_name(file)?, format!("static file {}", file.display()))?;
        }
        Ok(())
    }
}

fn entry_name(path: &Path) -> Result<String, ReleaseError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| ReleaseError::config(format!("{} has no usable file name", path.display())))
}

/// Canonical form of `path`, following symlinks. Components that do not
/// exist yet are appended lexically to their nearest existing ancestor.
pub fn resolve_path(path: &Path) -> io::Result<PathBuf> {
    let mut resolved = if path.is_relative() {
        std::env::current_dir()?
    } else {
        PathBuf::new()
    };
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => {
                resolved.push(name);
                if let Ok(canonical) = resolved.canonicalize() {
                    resolved = canonical;
                }
            }
        }
    }
    Ok(resolved)
}

fn require_file(what: &str, path: &Path) -> Result<(), ReleaseError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ReleaseError::config(format!("{what} {} does not exist", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_spec_substitutes_placeholders() {
        let spec = CommandSpec {
            program: "sphinx-build".into(),
            args: vec!["-b".into(), "html".into(), "{source}".into(), "{output}".into()],
        };
        let command = spec.command(&[("source", Path::new("docs")), ("output", Path::new("docs/_build/html"))]);
        let args: Vec<_> = command.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["-b", "html", "docs", "docs/_build/html"]);
    }

    #[test]
    fn omitted_sections_take_defaults() {
        let config: ReleaseConfig =
            serde_json::from_str(r#"{"library":{"name":"mylib"},"fragments":[],"variants":[]}"#)
                .expect("valid config");
        assert_eq!(config.version, VersionSource::Argument);
        assert_eq!(config.staging_dir, PathBuf::from("build"));
        assert_eq!(config.dist_dir, PathBuf::from("dist"));
        assert_eq!(config.library.license, "MIT");
        assert_eq!(config.library.title(), "mylib");
        assert!(config.compressor.is_none());
    }

    #[test]
    fn resolve_path_collapses_parent_segments_of_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let name = root.file_name().unwrap();

        let sneaky = dir.path().join("..").join(name);
        assert_eq!(resolve_path(&sneaky).unwrap(), root);

        let missing = dir.path().join("build/nested/../out");
        assert_eq!(resolve_path(&missing).unwrap(), root.join("build/out"));
    }

    #[test]
    fn rebase_only_touches_relative_paths() {
        let config: ReleaseConfig = serde_json::from_str(
            r#"{"library":{"name":"mylib"},
                "version":{"from":"source","path":"lib/core.js"},
                "fragments":[{"name":"core","path":"/abs/core.js"}],
                "variants":[]}"#,
        )
        .expect("valid config");
        let config = config.rebase(Path::new("/project"));
        assert_eq!(
            config.version,
            VersionSource::Source { path: PathBuf::from("/project/lib/core.js") }
        );
        assert_eq!(config.fragments[0].path, PathBuf::from("/abs/core.js"));
        assert_eq!(config.staging_dir, PathBuf::from("/project/build"));
    }
}
