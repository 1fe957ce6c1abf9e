//! Variant assembly: header template + ordered fragment concatenation +
//! optional mode-pinning trailer.

use std::fs;

use tracing::debug;

use crate::config::{FragmentSource, LibraryConfig, VariantConfig, MODE_PLACEHOLDER};
use crate::error::{ReleaseError, Step};

/// A named unit of source text, read once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFragment {
    pub name: String,
    pub contents: String,
}

/// All fragments declared in the config, keyed by name.
#[derive(Debug, Default)]
pub struct FragmentSet {
    fragments: Vec<SourceFragment>,
}

impl FragmentSet {
    pub fn new(fragments: Vec<SourceFragment>) -> Self {
        Self { fragments }
    }

    pub fn load(sources: &[FragmentSource]) -> Result<Self, ReleaseError> {
        let mut fragments = Vec::with_capacity(sources.len());
        for source in sources {
            let contents = fs::read_to_string(&source.path)
                .map_err(ReleaseError::io(Step::AssembleVariants, &source.path))?;
            debug!(fragment = %source.name, path = %source.path.display(), bytes = contents.len(), "Read source fragment");
            fragments.push(SourceFragment {
                name: source.name.clone(),
                contents,
            });
        }
        Ok(Self { fragments })
    }

    pub fn get(&self, name: &str) -> Option<&SourceFragment> {
        self.fragments.iter().find(|f| f.name == name)
    }

    /// Looks up `names` in order.
    pub fn select<'a>(&'a self, names: &[String]) -> Result<Vec<&'a SourceFragment>, ReleaseError> {
        names
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| ReleaseError::config(format!("unknown fragment {name:?}")))
            })
            .collect()
    }
}

/// Assembled script text, kept in two parts so the body can be compressed
/// as a whole while the header survives compression untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledVariant {
    pub header: String,
    pub body: String,
}

impl AssembledVariant {
    pub fn text(&self) -> String {
        let mut text = String::with_capacity(self.header.len() + self.body.len());
        text.push_str(&self.header);
        text.push_str(&self.body);
        text
    }

    /// The script with `compressed` in place of the body.
    pub fn with_body(&self, compressed: &str) -> String {
        let mut text = String::with_capacity(self.header.len() + compressed.len() + 1);
        text.push_str(&self.header);
        push_line(&mut text, compressed);
        text
    }
}

/// Assembles variants for one library at one resolved version.
pub struct VariantAssembler<'a> {
    library: &'a LibraryConfig,
    version: &'a str,
}

impl<'a> VariantAssembler<'a> {
    pub fn new(library: &'a LibraryConfig, version: &'a str) -> Self {
        Self { library, version }
    }

    pub fn version(&self) -> &str {
        self.version
    }

    /// The block comment every generated script starts with.
    pub fn header(&self, modes: &str) -> String {
        let mut line = format!(" * {} {} (modes: {modes})", self.library.title(), self.version);
        if let Some(homepage) = &self.library.homepage {
            line.push_str(" - ");
            line.push_str(homepage);
        }
        format!("/**\n{line}\n * {} licensed\n */\n", self.library.license)
    }

    /// Concatenates `fragments` in the given order under the header, then the
    /// trailer pinning `pin_mode` when one is given.
    pub fn assemble(
        &self,
        fragments: &[&SourceFragment],
        modes: &str,
        pin_mode: Option<&str>,
    ) -> Result<AssembledVariant, ReleaseError> {
        let mut body = String::with_capacity(fragments.iter().map(|f| f.contents.len() + 1).sum());
        for fragment in fragments {
            push_line(&mut body, &fragment.contents);
        }
        if let Some(mode) = pin_mode {
            let trailer = self.library.mode_trailer.as_deref().ok_or_else(|| {
                ReleaseError::config(format!("cannot pin mode {mode:?}: library.mode_trailer is not set"))
            })?;
            push_line(&mut body, &trailer.replace(MODE_PLACEHOLDER, mode));
        }
        Ok(AssembledVariant {
            header: self.header(modes),
            body,
        })
    }

    pub fn assemble_variant(
        &self,
        fragments: &FragmentSet,
        variant: &VariantConfig,
    ) -> Result<AssembledVariant, ReleaseError> {
        let selected = fragments.select(&variant.fragments)?;
        self.assemble(&selected, &variant.modes, variant.pin_mode.as_deref())
    }
}

/// Appends `text`, terminating it with a newline so the next fragment starts
/// on a line of its own.
fn push_line(out: &mut String, text: &str) {
    out.push_str(text);
    if !text.ends_with('\n') {
        out.push('\n');
    }
}

/// `<library>[-<version>][.<qualifier>][.min].js`
pub fn variant_filename(library: &str, version: Option<&str>, qualifier: Option<&str>, compressed: bool) -> String {
    let mut name = String::from(library);
    if let Some(version) = version {
        name.push('-');
        name.push_str(version);
    }
    if let Some(qualifier) = qualifier {
        name.push('.');
        name.push_str(qualifier);
    }
    if compressed {
        name.push_str(".min");
    }
    name.push_str(".js");
    name
}

/// `<library>-<version>.zip`
pub fn archive_filename(library: &str, version: &str) -> String {
    format!("{library}-{version}.zip")
}
