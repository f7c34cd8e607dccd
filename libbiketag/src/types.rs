//! Core types for the BikeTag announcer

use serde::{Deserialize, Serialize};

/// The current tag as published by the game's endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSnapshot {
    #[serde(rename = "currentTagNumber")]
    pub number: u64,
    pub credit: String,
    #[serde(rename = "currentTagURL")]
    pub image_url: String,
    /// File extension including the dot, e.g. `.jpg`
    #[serde(rename = "currentTagURLExt")]
    pub extension: String,
}

impl TagSnapshot {
    pub fn new(number: u64, credit: &str, image_url: &str, extension: &str) -> Self {
        Self {
            number,
            credit: credit.to_string(),
            image_url: image_url.to_string(),
            extension: extension.to_string(),
        }
    }

    /// URL of the high-resolution variant of the tag image
    ///
    /// The image host serves it at the same path with `h` inserted before the
    /// extension (`img.jpg` -> `imgh.jpg`). URLs that don't end with the
    /// extension are passed through unchanged.
    pub fn full_image_url(&self) -> String {
        if self.extension.is_empty() {
            return self.image_url.clone();
        }
        match self.image_url.strip_suffix(&self.extension) {
            Some(stem) => format!("{}h{}", stem, self.extension),
            None => self.image_url.clone(),
        }
    }
}

/// A status that was successfully published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedStatus {
    pub id: String,
    pub url: Option<String>,
}
