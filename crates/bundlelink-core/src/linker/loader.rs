//! Loader tags: the per-file policy that decides how a file is parsed and
//! emitted, and the behavior table each tag carries.
//!
//! Mirrors the file-type dispatch the teacher does in
//! `bundler::assets::AssetType`, generalized to the full tag set the spec
//! requires (including the three CSS flavors) and to a proper behavior
//! table instead of a handful of free functions.

use std::fmt;

/// The chunk kind a loader contributes output to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    Js,
    Css,
}

/// Per-file loader tag. Immutable after scan (spec §3 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Loader {
    Js,
    Jsx,
    Ts,
    Tsx,
    Json,
    Text,
    Binary,
    Base64,
    DataUrl,
    File,
    Copy,
    Css,
    GlobalCss,
    LocalCss,
}

impl Loader {
    /// Resolve a loader from a file extension using the default
    /// extension-probe table. Callers with a configured extension map
    /// should consult that first and only fall back to this.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        Some(match ext.to_lowercase().as_str() {
            "js" | "mjs" | "cjs" => Loader::Js,
            "jsx" => Loader::Jsx,
            "ts" | "mts" | "cts" => Loader::Ts,
            "tsx" => Loader::Tsx,
            "json" => Loader::Json,
            "txt" | "xml" => Loader::Text,
            "wasm" | "bin" => Loader::Binary,
            "css" => Loader::Css,
            "woff" | "woff2" | "ttf" | "otf" | "eot" | "png" | "jpg" | "jpeg" | "gif" | "webp"
            | "avif" | "ico" | "svg" => Loader::File,
            _ => return None,
        })
    }

    /// `true` for files named like `*.module.css` — the common convention
    /// for opting a CSS file into the `local-css` loader.
    #[must_use]
    pub fn css_loader_for_filename(filename: &str) -> Loader {
        if filename.ends_with(".module.css") {
            Loader::LocalCss
        } else {
            Loader::Css
        }
    }

    /// Whether a module of this loader may be the target of a CSS
    /// `@import` (spec §6: `css | global-css | local-css` only).
    #[must_use]
    pub fn can_be_at_import_target(self) -> bool {
        matches!(self, Loader::Css | Loader::GlobalCss | Loader::LocalCss)
    }

    /// Whether a module of this loader may be the target of a CSS
    /// `url()` token (spec §6: anything except the JS/TS/JSON/CSS family).
    #[must_use]
    pub fn can_be_url_target(self) -> bool {
        !matches!(
            self,
            Loader::Js
                | Loader::Jsx
                | Loader::Ts
                | Loader::Tsx
                | Loader::Json
                | Loader::Css
                | Loader::GlobalCss
                | Loader::LocalCss
        )
    }

    /// The chunk kind a module with this loader contributes to, if any.
    /// Asset loaders (`file`, `copy`, `binary`, ...) don't produce chunk
    /// content of their own; they're inlined or copied by the referencing
    /// chunk.
    #[must_use]
    pub fn produces_chunk_kind(self) -> Option<ChunkKind> {
        match self {
            Loader::Js | Loader::Jsx | Loader::Ts | Loader::Tsx | Loader::Json | Loader::Text => {
                Some(ChunkKind::Js)
            }
            Loader::Css | Loader::GlobalCss | Loader::LocalCss => Some(ChunkKind::Css),
            Loader::Binary | Loader::Base64 | Loader::DataUrl | Loader::File | Loader::Copy => {
                None
            }
        }
    }

    /// Whether this is one of the two CSS-Modules-aware loaders.
    #[must_use]
    pub fn is_css_modules(self) -> bool {
        matches!(self, Loader::LocalCss)
    }

    /// Whether this loader participates in CSS linking at all.
    #[must_use]
    pub fn is_css(self) -> bool {
        matches!(self, Loader::Css | Loader::GlobalCss | Loader::LocalCss)
    }

    /// Whether bytes for this loader should be inlined at the reference
    /// site (as opposed to emitted as a separate asset file).
    #[must_use]
    pub fn inlines_bytes(self) -> bool {
        matches!(self, Loader::Base64 | Loader::DataUrl | Loader::Text | Loader::Json)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Loader::Js => "js",
            Loader::Jsx => "jsx",
            Loader::Ts => "ts",
            Loader::Tsx => "tsx",
            Loader::Json => "json",
            Loader::Text => "text",
            Loader::Binary => "binary",
            Loader::Base64 => "base64",
            Loader::DataUrl => "data-url",
            Loader::File => "file",
            Loader::Copy => "copy",
            Loader::Css => "css",
            Loader::GlobalCss => "global-css",
            Loader::LocalCss => "local-css",
        }
    }
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_loader_by_filename() {
        assert_eq!(
            Loader::css_loader_for_filename("button.module.css"),
            Loader::LocalCss
        );
        assert_eq!(Loader::css_loader_for_filename("app.css"), Loader::Css);
    }

    #[test]
    fn js_cannot_be_url_target() {
        assert!(!Loader::Js.can_be_url_target());
        assert!(Loader::File.can_be_url_target());
    }

    #[test]
    fn only_css_family_can_be_import_target() {
        assert!(Loader::LocalCss.can_be_at_import_target());
        assert!(!Loader::Js.can_be_at_import_target());
    }
}
