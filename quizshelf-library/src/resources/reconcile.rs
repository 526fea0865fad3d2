//! Matching frame trees against resource names

use super::ResourceStore;
use crate::models::{Frame, ImageFrame, LeafFrame, Quiz};
use futures::future::join_all;
use tracing::warn;

/// One resource referenced by a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub name: String,
    /// Human-readable owner, for diagnostics
    pub requester: String,
}

/// Every image filename in `frames`, depth-first, paired with its requester
///
/// `owner` names the quiz the frames belong to.
pub fn required_resources(frames: &[Frame], owner: &str) -> Vec<ResourceRequest> {
    let mut requests = Vec::new();
    let mut push = |image: &ImageFrame| {
        requests.push(ResourceRequest {
            name: image.filename.clone(),
            requester: format!("{}, image frame #{}", owner, image.id),
        });
    };

    for frame in frames {
        match frame {
            Frame::Image(image) => push(image),
            Frame::Options(options) => {
                for keyed in &options.frames {
                    if let LeafFrame::Image(image) = &keyed.frame {
                        push(image);
                    }
                }
            }
            Frame::Text(_) => {}
        }
    }
    requests
}

/// Distinct resource names referenced by an existing quiz
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSet {
    names: Vec<String>,
}

pub fn resources_of(quiz: &Quiz) -> ResourceSet {
    let mut names: Vec<String> = required_resources(&quiz.frames, &quiz.display_name())
        .into_iter()
        .map(|r| r.name)
        .collect();
    names.sort();
    names.dedup();
    ResourceSet { names }
}

impl ResourceSet {
    pub fn from_names(names: impl IntoIterator<Item = String>) -> Self {
        let mut names: Vec<String> = names.into_iter().collect();
        names.sort();
        names.dedup();
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Delete every file in the set, returning how many existed
    ///
    /// Resource names are unique library-wide, so no other quiz can lose a
    /// file here. Failures are logged and do not stop the remaining deletes.
    pub async fn delete_all(&self, store: &ResourceStore) -> usize {
        let results = join_all(self.names.iter().map(|name| store.delete(name))).await;

        let mut deleted = 0;
        for (name, result) in self.names.iter().zip(results) {
            match result {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => warn!(resource = %name, error = %e, "Failed to delete resource"),
            }
        }
        deleted
    }
}
