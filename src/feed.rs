use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::catalog::{CatalogActivity, IngestReport};
use crate::error::PlanError;
use crate::timeline::TimelineStore;

/// A catalog batch as stored on disk: either a bare list of activities or
/// the attractions discovered for one city.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FeedDocument {
    Activities(Vec<CatalogActivity>),
    City {
        city: String,
        attractions: Vec<CatalogActivity>,
    },
}

impl FeedDocument {
    pub fn city(&self) -> Option<&str> {
        match self {
            FeedDocument::Activities(_) => None,
            FeedDocument::City { city, .. } => Some(city),
        }
    }

    pub fn into_activities(self) -> Vec<CatalogActivity> {
        match self {
            FeedDocument::Activities(activities) => activities,
            FeedDocument::City { attractions, .. } => attractions,
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read catalog feed {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse catalog feed {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("catalog feed {} rejected: {source}", path.display())]
    Rejected { path: PathBuf, source: PlanError },
}

pub fn read_feed(path: &Path) -> Result<FeedDocument, FeedError> {
    let raw = fs::read_to_string(path).map_err(|source| FeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| FeedError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Ingests feeds in order, so later files overwrite ids from earlier ones.
pub fn ingest_feeds(
    store: &mut TimelineStore,
    paths: &[PathBuf],
) -> Result<IngestReport, FeedError> {
    let mut total = IngestReport::default();
    for path in paths {
        let document = read_feed(path)?;
        let city = document.city().map(str::to_string);
        let report = store
            .ingest(document.into_activities())
            .map_err(|source| FeedError::Rejected {
                path: path.clone(),
                source,
            })?;
        debug!(
            path = %path.display(),
            city = city.as_deref().unwrap_or("-"),
            added = report.added,
            replaced = report.replaced,
            "catalog feed ingested"
        );
        total.added += report.added;
        total.replaced += report.replaced;
    }
    Ok(total)
}
