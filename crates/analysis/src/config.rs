//! Analysis configuration
//!
//! Everything the operations need is passed in explicitly; this struct is the
//! serializable bundle the CLI builds from flags or a JSON file.

use crate::clip::ClipMode;
use crate::country::CountryParams;
use crate::reduce::{ReducerKind, StatReducer};
use nightlight_core::vector::GDP_ATTRIBUTE;
use nightlight_core::{Error, Result};
use nightlight_parallel::ProcessingMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub reducer: ReducerKind,
    pub clip_mode: ClipMode,
    /// Worker threads for chunked reduction; `None` uses every core
    pub threads: Option<usize>,
    pub gdp_attribute: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            reducer: ReducerKind::default(),
            clip_mode: ClipMode::default(),
            threads: None,
            gdp_attribute: GDP_ATTRIBUTE.to_string(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if let ReducerKind::Chunked { tile_size: 0 } = self.reducer {
            return Err(Error::InvalidParameter {
                name: "tile_size",
                value: "0".into(),
                reason: "tile size must be at least 1".into(),
            });
        }
        if self.threads == Some(0) {
            return Err(Error::InvalidParameter {
                name: "threads",
                value: "0".into(),
                reason: "thread count must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn processing_mode(&self) -> ProcessingMode {
        ProcessingMode::from_threads(self.threads)
    }

    pub fn build_reducer(&self) -> Result<Box<dyn StatReducer>> {
        self.reducer.build(self.processing_mode())
    }

    pub fn country_params(&self) -> CountryParams {
        CountryParams {
            clip_mode: self.clip_mode,
            gdp_attribute: self.gdp_attribute.clone(),
        }
    }
}
