//! Long-form essays attached to Dhammas at load time.

use std::path::{Path, PathBuf};

/// Where essay text comes from, keyed by Dhamma slug.
pub trait EssaySource: Send + Sync {
    fn essay_for(&self, slug: &str) -> Option<String>;
}

/// No essays at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEssays;

impl EssaySource for NoEssays {
    fn essay_for(&self, _slug: &str) -> Option<String> {
        None
    }
}

/// Essays stored as `{dir}/{slug}.md`. Missing or blank files mean no essay.
#[derive(Debug, Clone)]
pub struct EssayDir {
    dir: PathBuf,
}

impl EssayDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl EssaySource for EssayDir {
    fn essay_for(&self, slug: &str) -> Option<String> {
        let path = self.dir.join(format!("{slug}.md"));
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "unreadable essay");
                None
            }
        }
    }
}

impl<S: EssaySource + ?Sized> EssaySource for &S {
    fn essay_for(&self, slug: &str) -> Option<String> {
        (**self).essay_for(slug)
    }
}

const TRAILING_PUNCT: [char; 6] = ['.', ',', ';', ':', '!', '?'];

/// Rewrite `"term"` as `*term*` for each known transliterated term, and
/// `"term."` as `*term*.` (punctuation moves outside). Longer terms are
/// rewritten first so `"samma samadhi"` is not split by `"samadhi"`.
/// Running it twice changes nothing.
pub fn normalize_quoted_terms<S: AsRef<str>>(text: &str, terms: &[S]) -> String {
    let mut terms: Vec<&str> = terms
        .iter()
        .map(AsRef::as_ref)
        .filter(|t| !t.is_empty())
        .collect();
    terms.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
    terms.dedup();

    let mut out = text.to_string();
    for term in terms {
        out = out.replace(&format!("\"{term}\""), &format!("*{term}*"));
        for p in TRAILING_PUNCT {
            out = out.replace(&format!("\"{term}{p}\""), &format!("*{term}*{p}"));
        }
    }
    out
}
