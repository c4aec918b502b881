//! Brand sources backed by the YAML configuration file or a fixed list.

use std::path::PathBuf;

use async_trait::async_trait;
use mentions_core::{load_brands, TrackedBrand};

use crate::error::AggregatorError;
use crate::traits::BrandSource;

/// Re-reads `brands.yaml` on every call, so edits apply on the next cycle.
#[derive(Debug, Clone)]
pub struct YamlBrandSource {
    path: PathBuf,
}

impl YamlBrandSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BrandSource for YamlBrandSource {
    async fn tracked_brands(&self) -> Result<Vec<TrackedBrand>, AggregatorError> {
        let path = self.path.clone();
        let file = tokio::task::spawn_blocking(move || load_brands(&path))
            .await
            .map_err(|e| AggregatorError::BrandSource(format!("brand loader task failed: {e}")))??;
        Ok(file.brands)
    }
}

/// Serves a fixed set of brands; swappable at runtime for tests and dry runs.
#[derive(Debug, Default)]
pub struct StaticBrandSource {
    brands: std::sync::Mutex<Vec<TrackedBrand>>,
}

impl StaticBrandSource {
    #[must_use]
    pub fn new(brands: Vec<TrackedBrand>) -> Self {
        Self {
            brands: std::sync::Mutex::new(brands),
        }
    }

    pub fn replace(&self, brands: Vec<TrackedBrand>) {
        *self
            .brands
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = brands;
    }
}

#[async_trait]
impl BrandSource for StaticBrandSource {
    async fn tracked_brands(&self) -> Result<Vec<TrackedBrand>, AggregatorError> {
        Ok(self
            .brands
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }
}
