//! Guidance document library.
//!
//! Documents are read once at startup from the guidance directory. A missing
//! or unreadable document is replaced by a placeholder so guided responses
//! always carry something for every referenced document.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use windfarm_routing::GuidanceDoc;

/// A guidance document as handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidanceDocument {
    pub id: GuidanceDoc,
    pub title: String,
    pub file_name: String,
    /// Opaque text; the placeholder when the file was missing
    pub content: String,
}

/// In-memory copy of every guidance document.
#[derive(Debug, Clone)]
pub struct GuidanceLibrary {
    contents: BTreeMap<GuidanceDoc, String>,
    missing: Vec<GuidanceDoc>,
}

/// Placeholder used in place of a missing document.
pub fn placeholder(doc: GuidanceDoc) -> String {
    format!("# {} guidance not found", doc.title())
}

impl GuidanceLibrary {
    /// Load every known document from `dir`.
    pub fn load(dir: &Path) -> Self {
        let mut contents = BTreeMap::new();
        let mut missing = Vec::new();

        for doc in GuidanceDoc::ALL {
            let path = dir.join(doc.file_name());
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    contents.insert(doc, text);
                }
                Err(e) => {
                    warn!(doc = %doc, path = %path.display(), error = %e, "Guidance document unavailable");
                    contents.insert(doc, placeholder(doc));
                    missing.push(doc);
                }
            }
        }

        info!(
            path = %dir.display(),
            loaded = GuidanceDoc::ALL.len() - missing.len(),
            missing = missing.len(),
            "Loaded guidance library"
        );

        Self { contents, missing }
    }

    /// A library of placeholders only.
    pub fn placeholders() -> Self {
        Self {
            contents: GuidanceDoc::ALL
                .into_iter()
                .map(|doc| (doc, placeholder(doc)))
                .collect(),
            missing: GuidanceDoc::ALL.to_vec(),
        }
    }

    /// Replace one document's content.
    pub fn with_document(mut self, doc: GuidanceDoc, content: impl Into<String>) -> Self {
        self.contents.insert(doc, content.into());
        self.missing.retain(|d| *d != doc);
        self
    }

    pub fn content(&self, doc: GuidanceDoc) -> String {
        self.contents
            .get(&doc)
            .cloned()
            .unwrap_or_else(|| placeholder(doc))
    }

    /// Documents that fell back to placeholders.
    pub fn missing(&self) -> &[GuidanceDoc] {
        &self.missing
    }

    pub fn document(&self, doc: GuidanceDoc) -> GuidanceDocument {
        GuidanceDocument {
            id: doc,
            title: doc.title().to_string(),
            file_name: doc.file_name().to_string(),
            content: self.content(doc),
        }
    }

    pub fn documents(&self, docs: &[GuidanceDoc]) -> Vec<GuidanceDocument> {
        docs.iter().map(|d| self.document(*d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_with_missing_documents() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(GuidanceDoc::BusinessImpact.file_name()),
            "# Business impact\nUse annual_generation.",
        )
        .unwrap();

        let library = GuidanceLibrary::load(dir.path());
        assert_eq!(
            library.content(GuidanceDoc::BusinessImpact),
            "# Business impact\nUse annual_generation."
        );
        assert_eq!(
            library.content(GuidanceDoc::QuickReference),
            "# General Analysis guidance not found"
        );
        assert_eq!(library.missing().len(), GuidanceDoc::ALL.len() - 1);
        assert!(!library.missing().contains(&GuidanceDoc::BusinessImpact));
    }

    #[test]
    fn test_documents_keep_order() {
        let library = GuidanceLibrary::placeholders()
            .with_document(GuidanceDoc::ModelComparison, "compare");
        let docs = library.documents(&[GuidanceDoc::ModelComparison, GuidanceDoc::ForecastPerformance]);
        assert_eq!(docs[0].content, "compare");
        assert_eq!(docs[0].file_name, "09_model_comparison.md");
        assert_eq!(docs[1].id, GuidanceDoc::ForecastPerformance);
        assert_eq!(library.missing().len(), GuidanceDoc::ALL.len() - 1);
    }
}
