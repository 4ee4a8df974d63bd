//! Path templates (spec §6): an ordered sequence of literal segments and
//! placeholders (`[name]`, `[dir]`, `[hash]`, `[ext]`). `[hash]` is
//! back-patched once the chunk's final bytes are known (spec §4.6).
//!
//! New module — grounded in the spec's own wording; the teacher has no
//! placeholder templating (it writes fixed `{name}.js` paths in
//! `bundler::emit`), so this generalizes that fixed scheme into a small
//! token parser in the same spirit as the teacher's other small
//! string-processing helpers.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Name,
    Dir,
    Hash,
    Ext,
}

/// A parsed output path template.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    segments: Vec<Segment>,
}

/// The placeholder values available when rendering a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext<'a> {
    pub name: &'a str,
    pub dir: &'a str,
    pub ext: &'a str,
    pub hash: Option<&'a str>,
}

impl PathTemplate {
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '[' {
                let mut token = String::new();
                let mut closed = false;
                for c2 in chars.by_ref() {
                    if c2 == ']' {
                        closed = true;
                        break;
                    }
                    token.push(c2);
                }
                if closed {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(match token.as_str() {
                        "name" => Segment::Name,
                        "dir" => Segment::Dir,
                        "hash" => Segment::Hash,
                        "ext" => Segment::Ext,
                        _ => Segment::Literal(format!("[{token}]")),
                    });
                } else {
                    literal.push('[');
                    literal.push_str(&token);
                }
            } else {
                literal.push(c);
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Self { segments }
    }

    #[must_use]
    pub fn has_hash(&self) -> bool {
        self.segments.iter().any(|s| *s == Segment::Hash)
    }

    /// Render with the hash placeholder left as a literal marker string,
    /// for content-hash computation over the rest of the path.
    #[must_use]
    pub fn render_with_hash_marker(&self, ctx: &TemplateContext<'_>, marker: &str) -> String {
        self.render_internal(ctx, Some(marker))
    }

    #[must_use]
    pub fn render(&self, ctx: &TemplateContext<'_>) -> String {
        self.render_internal(ctx, None)
    }

    fn render_internal(&self, ctx: &TemplateContext<'_>, hash_marker: Option<&str>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Name => out.push_str(ctx.name),
                Segment::Dir => out.push_str(ctx.dir),
                Segment::Ext => out.push_str(ctx.ext),
                Segment::Hash => {
                    if let Some(marker) = hash_marker {
                        out.push_str(marker);
                    } else if let Some(hash) = ctx.hash {
                        out.push_str(hash);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_name_and_hash() {
        let tpl = PathTemplate::parse("[dir]/[name]-[hash].[ext]");
        let ctx = TemplateContext {
            name: "app",
            dir: "assets",
            ext: "js",
            hash: Some("abcd1234"),
        };
        assert_eq!(tpl.render(&ctx), "assets/app-abcd1234.js");
    }

    #[test]
    fn hash_marker_used_before_final_hash_known() {
        let tpl = PathTemplate::parse("[name]-[hash].js");
        let ctx = TemplateContext {
            name: "app",
            dir: "",
            ext: "js",
            hash: None,
        };
        assert_eq!(
            tpl.render_with_hash_marker(&ctx, "%%HASH%%"),
            "app-%%HASH%%.js"
        );
    }
}
