//! Directory-structured output container.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ns_core::{Error, Result};
use serde::Serialize;

use crate::histogram::Histogram1D;

/// In-memory directory tree of 1-D histograms.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputDirectory {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    dirs: BTreeMap<String, OutputDirectory>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    histograms: BTreeMap<String, Histogram1D>,
}

fn check_segment(seg: &str) -> Result<()> {
    if seg.is_empty() || seg == "." || seg == ".." || seg.contains(['/', '\\']) {
        return Err(Error::Config(format!("invalid output path segment '{seg}'")));
    }
    Ok(())
}

impl OutputDirectory {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sub-directory at `path`, created on demand.
    pub fn mkdir<S: AsRef<str>>(&mut self, path: &[S]) -> Result<&mut OutputDirectory> {
        let mut dir = self;
        for seg in path {
            let seg = seg.as_ref();
            check_segment(seg)?;
            dir = dir.dirs.entry(seg.to_string()).or_default();
        }
        Ok(dir)
    }

    /// Store `hist` under `path`, keyed by its name. Fails if the name is taken.
    pub fn insert<S: AsRef<str>>(&mut self, path: &[S], hist: Histogram1D) -> Result<()> {
        check_segment(&hist.name)?;
        let dir = self.mkdir(path)?;
        if dir.histograms.contains_key(&hist.name) || dir.dirs.contains_key(&hist.name) {
            let full: Vec<&str> = path.iter().map(AsRef::as_ref).collect();
            return Err(Error::Config(format!(
                "output entry '{}' already exists in '/{}'",
                hist.name,
                full.join("/")
            )));
        }
        dir.histograms.insert(hist.name.clone(), hist);
        Ok(())
    }

    /// Histogram `name` under `path`.
    pub fn get<S: AsRef<str>>(&self, path: &[S], name: &str) -> Option<&Histogram1D> {
        let mut dir = self;
        for seg in path {
            dir = dir.dirs.get(seg.as_ref())?;
        }
        dir.histograms.get(name)
    }

    /// Whether `name` under `path` is already a histogram or a directory.
    pub fn is_taken<S: AsRef<str>>(&self, path: &[S], name: &str) -> bool {
        let mut dir = self;
        for seg in path {
            match dir.dirs.get(seg.as_ref()) {
                Some(d) => dir = d,
                None => return false,
            }
        }
        dir.histograms.contains_key(name) || dir.dirs.contains_key(name)
    }

    /// Sub-directory names.
    pub fn dir_names(&self) -> impl Iterator<Item = &str> {
        self.dirs.keys().map(String::as_str)
    }

    /// Histogram names stored directly in this directory.
    pub fn histogram_names(&self) -> impl Iterator<Item = &str> {
        self.histograms.keys().map(String::as_str)
    }

    /// Number of histograms in the whole tree.
    pub fn n_histograms(&self) -> usize {
        self.histograms.len() + self.dirs.values().map(OutputDirectory::n_histograms).sum::<usize>()
    }

    /// Whether the tree holds no histograms.
    pub fn is_empty(&self) -> bool {
        self.n_histograms() == 0
    }

    /// Render the whole tree as one JSON document.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the tree under `root`: one filesystem directory per directory,
    /// one `<name>.json` file per histogram.
    pub fn write_json_tree(&self, root: &Path) -> Result<()> {
        fs::create_dir_all(root)?;
        for (name, h) in &self.histograms {
            let f = fs::File::create(root.join(format!("{name}.json")))?;
            serde_json::to_writer_pretty(std::io::BufWriter::new(f), h)?;
        }
        for (name, d) in &self.dirs {
            d.write_json_tree(&root.join(name))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(name: &str) -> Histogram1D {
        Histogram1D::new(name, "x", 2, 0.0, 1.0)
    }

    #[test]
    fn insert_and_get() {
        let mut out = OutputDirectory::new();
        out.insert(&["SR", "j0"], h("E")).unwrap();
        out.insert(&["SR", "j0"], h("E_PtScaleUp")).unwrap();
        out.insert::<&str>(&[], h("top")).unwrap();
        assert_eq!(out.n_histograms(), 3);
        assert!(out.get(&["SR", "j0"], "E").is_some());
        assert!(out.get(&["SR"], "E").is_none());
        assert_eq!(out.dir_names().collect::<Vec<_>>(), ["SR"]);
        assert_eq!(out.histogram_names().collect::<Vec<_>>(), ["top"]);
    }

    #[test]
    fn rejects_collisions_and_bad_segments() {
        let mut out = OutputDirectory::new();
        out.insert(&["a"], h("E")).unwrap();
        assert!(out.insert(&["a"], h("E")).is_err());
        assert!(out.insert(&[".."], h("E")).is_err());
        assert!(out.insert(&["a/b"], h("E")).is_err());
        assert!(out.insert(&[""], h("E")).is_err());
        assert_eq!(out.n_histograms(), 1);
    }

    #[test]
    fn writes_json_tree() {
        let mut out = OutputDirectory::new();
        let mut e = h("E");
        e.add_to_bin(1, 2.0, 4.0, 1);
        out.insert(&["SR"], e).unwrap();
        let tmp = tempfile::tempdir().unwrap();
        out.write_json_tree(tmp.path()).unwrap();
        let text = std::fs::read_to_string(tmp.path().join("SR").join("E.json")).unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["bin_content"][0], 2.0);
        assert_eq!(v["title"], "x");

        let doc: serde_json::Value = serde_json::from_str(&out.to_json().unwrap()).unwrap();
        assert_eq!(doc["dirs"]["SR"]["histograms"]["E"]["entries"], 1);
    }
}
