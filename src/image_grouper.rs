use crate::chunk::Chunk;
use crate::image::{Image, ImageConfig};

use log::{debug, error, warn};

/// Partitions a heterogeneous list of chunks into images
#[derive(Debug, Clone, Default)]
pub struct ImageGrouper {
    config: ImageConfig,
}

impl ImageGrouper {
    pub fn new(config: ImageConfig) -> Self {
        Self { config }
    }

    /// Split `chunks` into volume homogeneous, sufficient images.
    ///
    /// Each pass opens a new image and offers it every remaining chunk once.
    /// Refused chunks wait for a later pass. A pass that takes no chunk ends
    /// the grouping, the chunks still left over are dropped.
    ///
    /// Every image is reindexed before it is returned. An image whose
    /// reindex failed is returned dirty.
    pub fn group<T: Sync>(&self, chunks: Vec<Chunk<T>>) -> Vec<Image<T>> {
        let mut remaining = chunks;
        let mut images = Vec::new();

        while !remaining.is_empty() {
            let mut image = Image::new(self.config.clone());
            let mut refused = Vec::new();

            for chunk in remaining {
                if let Err(rejected) = image.insert(chunk) {
                    refused.push(rejected.chunk);
                }
            }

            if image.is_empty() {
                warn!("Dropping {} chunks which fit into no image", refused.len());
                break;
            }

            if let Err(err) = image.reindex() {
                error!("Failed to index image {}: {err}", images.len());
            }
            debug!(
                "Image {} holds {} chunks of size {:?}",
                images.len(),
                image.chunk_count(),
                image.size()
            );
            images.push(image);
            remaining = refused;
        }

        images
    }
}
