use crate::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub type FragmentId = i64;

/// Fragments whose length falls strictly inside this range are quote candidates.
pub const QUOTE_MIN_CHARS: usize = 50;
pub const QUOTE_MAX_CHARS: usize = 300;
/// Fallback pool size when no fragment fits the quote range.
pub const QUOTE_FALLBACK_POOL: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: FragmentId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    /// Character count of `text`.
    #[serde(default)]
    pub length: usize,
    #[serde(default)]
    pub excerpt: String,
}

impl Fragment {
    pub fn new(id: FragmentId, url: impl Into<String>, title: impl Into<String>, text: impl Into<String>, excerpt: impl Into<String>) -> Self {
        let text = text.into();
        Self { id, url: url.into(), title: title.into(), length: text.chars().count(), text, excerpt: excerpt.into() }
    }
}

/// Descriptive corpus information served as-is by the info endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub fragments_count: usize,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub categories_count: usize,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub authors_count: usize,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub languages_count: usize,
    #[serde(default)]
    pub project_info: serde_json::Value,
    #[serde(default)]
    pub heteronyms_info: serde_json::Value,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The immutable, ordered fragment collection.
#[derive(Debug, Default)]
pub struct Corpus {
    fragments: Vec<Fragment>,
}

impl Corpus {
    /// Builds a corpus, recomputing every `length` from its text.
    pub fn new(mut fragments: Vec<Fragment>) -> Self {
        for f in fragments.iter_mut() {
            let chars = f.text.chars().count();
            if f.length != chars {
                tracing::debug!(id = f.id, declared = f.length, actual = chars, "fragment length corrected");
                f.length = chars;
            }
        }
        Self { fragments }
    }

    pub fn len(&self) -> usize { self.fragments.len() }

    pub fn is_empty(&self) -> bool { self.fragments.is_empty() }

    pub fn fragments(&self) -> &[Fragment] { &self.fragments }

    /// Linear scan for a fragment by id.
    pub fn lookup_by_id(&self, id: FragmentId) -> Result<&Fragment> {
        self.fragments.iter().find(|f| f.id == id).ok_or(Error::NotFound(id))
    }

    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&Fragment> {
        if self.fragments.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        Ok(&self.fragments[rng.gen_range(0..self.fragments.len())])
    }

    /// Fragments suitable as a quote: length strictly between the quote
    /// bounds, or failing that, the shortest fragments of the corpus.
    pub fn quote_candidates(&self) -> Vec<&Fragment> {
        let fitting: Vec<&Fragment> = self
            .fragments
            .iter()
            .filter(|f| f.length > QUOTE_MIN_CHARS && f.length < QUOTE_MAX_CHARS)
            .collect();
        if !fitting.is_empty() {
            return fitting;
        }
        let mut shortest: Vec<&Fragment> = self.fragments.iter().collect();
        shortest.sort_by_key(|f| (f.length, f.id));
        shortest.truncate(QUOTE_FALLBACK_POOL);
        shortest
    }

    pub fn random_quote<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&Fragment> {
        let candidates = self.quote_candidates();
        if candidates.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        Ok(candidates[rng.gen_range(0..candidates.len())])
    }
}

/// Load fragments from a JSON array file, or from every `*.json` file under a
/// directory (visited in path order).
pub fn load_fragments<P: AsRef<Path>>(path: P) -> Result<Corpus> {
    let path = path.as_ref();
    let mut files: Vec<PathBuf> = Vec::new();
    if path.is_dir() {
        for entry in WalkDir::new(path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("json") {
                files.push(p.to_path_buf());
            }
        }
    } else {
        files.push(path.to_path_buf());
    }

    let mut fragments = Vec::new();
    for file in files {
        let mut batch: Vec<Fragment> = read_json(&file)?;
        tracing::debug!(file = %file.display(), count = batch.len(), "loaded fragment file");
        fragments.append(&mut batch);
    }
    tracing::info!(count = fragments.len(), "loaded fragments");
    Ok(Corpus::new(fragments))
}

pub fn load_metadata<P: AsRef<Path>>(path: P) -> Result<Metadata> {
    read_json(path.as_ref())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let f = File::open(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
    serde_json::from_reader(BufReader::new(f)).map_err(|source| Error::Json { path: path.to_path_buf(), source })
}
