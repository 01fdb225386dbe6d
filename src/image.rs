use crate::chunk::{Chunk, compare_origin, linear_index};
use crate::enums::Dimension;
use crate::property::{PropertySet, PropertyValue, keys};

use log::{debug, error, warn};
use rayon::prelude::*;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Chunk volume {found} does not match the image chunk volume {expected}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("Chunk is missing required properties: {missing:?}")]
    InsufficientChunk { missing: Vec<String> },

    #[error("Chunk holds no samples")]
    EmptyChunk,

    #[error("A chunk at the same position is already part of the image")]
    DuplicatePosition,

    #[error("Chunk has no indexOrigin")]
    MissingIndexOrigin,

    #[error("Image holds no chunks")]
    EmptyImage,

    #[error("Image was modified since the last reindex")]
    StaleImage,

    #[error("Coordinate {coords:?} is outside of the image size {size:?}")]
    OutOfRange { coords: [usize; 4], size: [usize; 4] },

    #[error("Chunk index {index} is outside of the {count} indexed chunks")]
    ChunkIndexOutOfRange { index: usize, count: usize },

    #[error("{chunks} chunks found, but a single chunk already fills all four dimensions")]
    OverfilledDimensions { chunks: usize },

    #[error("Expected {expected} samples, got {found}")]
    DataLength { expected: usize, found: usize },
}

/// A chunk the image refused, handed back together with the reason
#[derive(Debug, Error)]
#[error("Chunk rejected: {reason}")]
pub struct Rejected<T> {
    pub chunk: Chunk<T>,
    pub reason: ImageError,
}

/// Settings shared by images and the grouper
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// Properties a chunk must carry to be inserted. `indexOrigin` is
    /// required in any case.
    pub required: Vec<String>,
    /// A step between neighbouring chunks whose squared length exceeds this
    /// factor times the first step's squared length starts a new dimension.
    pub break_factor: f64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            required: vec![keys::INDEX_ORIGIN.to_owned()],
            break_factor: 4.0,
        }
    }
}

/// Stable handle of a chunk inside an image's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChunkHandle(usize);

/// Same-volume chunks welded into one addressable 4D image.
///
/// Chunks live in an arena and are never moved once inserted. `order` is the
/// sorted permutation of their handles. `lookup` is the copy of `order` taken
/// by the last successful [`Image::reindex`] and is cleared on every change.
#[derive(Debug, Clone)]
pub struct Image<T> {
    chunks: Vec<Chunk<T>>,
    order: Vec<ChunkHandle>,
    lookup: Vec<ChunkHandle>,
    size: [usize; 4],
    chunk_volume: usize,
    properties: PropertySet,
    // keys of `properties` taken from the chunks by the last reindex
    derived: BTreeSet<String>,
    clean: bool,
    config: ImageConfig,
}

impl<T> Default for Image<T> {
    fn default() -> Self {
        Self::new(ImageConfig::default())
    }
}

impl<T> Image<T> {
    pub fn new(config: ImageConfig) -> Self {
        Self {
            chunks: Vec::new(),
            order: Vec::new(),
            lookup: Vec::new(),
            size: [0; 4],
            chunk_volume: 0,
            properties: PropertySet::new(),
            derived: BTreeSet::new(),
            clean: false,
            config,
        }
    }

    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    /// Insert a chunk at its position in the chunk ordering.
    ///
    /// # Errors
    ///
    /// Hands the chunk back if it holds no samples, if its volume differs
    /// from the chunks already present, if it lacks required properties, or
    /// if a chunk at the same position exists.
    pub fn insert(&mut self, chunk: Chunk<T>) -> Result<(), Rejected<T>> {
        if chunk.volume() == 0 {
            error!("Cannot insert chunk of size {:?}", chunk.dims());
            return Err(Rejected {
                chunk,
                reason: ImageError::EmptyChunk,
            });
        }

        if let Some(first) = self.chunks.first()
            && first.volume() != chunk.volume()
        {
            let reason = ImageError::ShapeMismatch {
                expected: first.volume(),
                found: chunk.volume(),
            };
            error!("Cannot insert chunk: {reason}");
            return Err(Rejected { chunk, reason });
        }

        let mut missing = chunk.missing(&self.config.required);
        if !self.config.required.iter().any(|k| k == keys::INDEX_ORIGIN)
            && !chunk.properties().has(keys::INDEX_ORIGIN)
        {
            missing.push(keys::INDEX_ORIGIN.to_owned());
        }
        if !missing.is_empty() {
            error!("Cannot insert insufficient chunk, missing {missing:?}");
            return Err(Rejected {
                chunk,
                reason: ImageError::InsufficientChunk { missing },
            });
        }

        let Some(origin) = chunk.index_origin() else {
            error!("Cannot insert chunk, {} is not a vector", keys::INDEX_ORIGIN);
            return Err(Rejected {
                chunk,
                reason: ImageError::MissingIndexOrigin,
            });
        };

        let search = self.order.binary_search_by(|handle| {
            self.chunks[handle.0]
                .index_origin()
                .map_or(std::cmp::Ordering::Less, |pos| compare_origin(&pos, &origin))
        });
        match search {
            Ok(_) => {
                debug!("Skipping chunk at {origin:?}, position already taken");
                Err(Rejected {
                    chunk,
                    reason: ImageError::DuplicatePosition,
                })
            }
            Err(pos) => {
                let handle = ChunkHandle(self.chunks.len());
                self.chunks.push(chunk);
                self.order.insert(pos, handle);
                self.lookup.clear();
                self.clean = false;
                Ok(())
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.clean
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Logical extent (row, column, slice, time) as of the last reindex
    pub fn size(&self) -> [usize; 4] {
        self.size
    }

    pub fn dim_size(&self, dim: Dimension) -> usize {
        self.size[dim.index()]
    }

    pub fn chunk_volume(&self) -> usize {
        self.chunk_volume
    }

    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    /// Direct access to the image properties. Keys that came from the chunks
    /// are still replaced by the next reindex.
    pub fn properties_mut(&mut self) -> &mut PropertySet {
        &mut self.properties
    }

    /// Set an image level property. It survives reindexing unless it is
    /// `indexOrigin`.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        let key = key.into();
        self.derived.remove(&key);
        self.properties.set(key, value);
    }

    fn clear_derived(&mut self) {
        let derived = std::mem::take(&mut self.derived);
        self.properties.erase(&derived);
    }

    /// Order the chunks, discover the image geometry and gather the
    /// properties all chunks agree on.
    ///
    /// # Errors
    ///
    /// Fails with [`ImageError::OverfilledDimensions`] if the chunks fill
    /// all four dimensions on their own but there is more than one of them.
    /// The image stays dirty in that case.
    pub fn reindex(&mut self) -> Result<(), ImageError>
    where
        T: Sync,
    {
        if self.chunks.is_empty() {
            warn!("Reindexing an empty image");
            self.clear_derived();
            self.lookup.clear();
            self.size = [0; 4];
            self.chunk_volume = 0;
            self.clean = true;
            return Ok(());
        }

        let lookup = self.order.clone();
        let lead = &self.chunks[lookup[0].0];
        let chunk_dims = lead.relevant_dims();
        let lead_dims = lead.dims();
        let lead_volume = lead.volume();
        let lead_origin = lead.index_origin();
        let mut common = lead.properties().clone();

        let mut size = [1; 4];
        size[..chunk_dims].copy_from_slice(&lead_dims[..chunk_dims]);

        if chunk_dims >= 4 {
            if lookup.len() > 1 {
                let err = ImageError::OverfilledDimensions {
                    chunks: lookup.len(),
                };
                error!("{err}");
                return Err(err);
            }
        } else {
            let mut placed = 1;
            for dim in chunk_dims..4 {
                size[dim] = self.chunk_stride(&lookup, placed).max(1);
                placed *= size[dim];
            }
            if placed != lookup.len() {
                warn!(
                    "Geometry {size:?} places {placed} of {} chunks",
                    lookup.len()
                );
            }
        }

        let unique = self.unique_keys(&lookup);
        common.erase(&unique);
        self.clear_derived();
        self.derived = common
            .keys()
            .filter(|key| !self.properties.has(key))
            .map(str::to_owned)
            .collect();
        self.properties.join(&common);
        if let Some(origin) = lead_origin {
            self.properties.set(keys::INDEX_ORIGIN, origin);
            self.derived.insert(keys::INDEX_ORIGIN.to_owned());
        }

        self.chunk_volume = lead_volume;
        self.size = size;
        self.lookup = lookup;
        self.clean = true;
        Ok(())
    }

    /// Keys that are not shared with identical value by every chunk
    fn unique_keys(&self, lookup: &[ChunkHandle]) -> BTreeSet<String>
    where
        T: Sync,
    {
        let lead = self.chunks[lookup[0].0].properties();
        lookup[1..]
            .par_iter()
            .map(|handle| lead.diff(self.chunks[handle.0].properties()))
            .reduce(BTreeSet::new, |mut acc, found| {
                acc.extend(found);
                acc
            })
    }

    /// Number of `base_stride` sized blocks before the position sequence
    /// jumps, i.e. the extent of the next dimension. Without a jump every
    /// remaining block counts.
    fn chunk_stride(&self, lookup: &[ChunkHandle], base_stride: usize) -> usize {
        let origin = |i: usize| self.chunks[lookup[i].0].index_origin().unwrap_or_default();
        let sqdist = |a: [f64; 3], b: [f64; 3]| {
            a.iter()
                .zip(b.iter())
                .map(|(x, y)| (y - x) * (y - x))
                .sum::<f64>()
        };

        // less than a 2x2 arrangement of blocks can't hold a dimensional break
        if lookup.len() >= 4 * base_stride {
            let first = sqdist(origin(0), origin(base_stride));
            if first == 0.0 {
                warn!("First two chunks share a position, no dimensional break detection");
                return lookup.len() / base_stride;
            }
            let threshold = first * self.config.break_factor;

            let mut i = base_stride;
            while i + base_stride < lookup.len() {
                if sqdist(origin(i), origin(i + base_stride)) > threshold {
                    return (i + base_stride) / base_stride;
                }
                i += base_stride;
            }
        }
        lookup.len() / base_stride
    }

    /// Map an image coordinate to (chunk index, offset inside that chunk).
    ///
    /// # Errors
    ///
    /// The image must be clean, non empty and the coordinate inside
    /// [`Image::size`].
    pub fn address_of(&self, coords: [usize; 4]) -> Result<(usize, usize), ImageError> {
        if !self.clean {
            error!("Addressing an image which was not reindexed");
            return Err(ImageError::StaleImage);
        }
        if self.lookup.is_empty() || self.chunk_volume == 0 {
            error!("Addressing an empty image");
            return Err(ImageError::EmptyImage);
        }
        if coords.iter().zip(self.size.iter()).any(|(c, s)| c >= s) {
            let err = ImageError::OutOfRange {
                coords,
                size: self.size,
            };
            error!("{err}");
            return Err(err);
        }

        let flat = linear_index(coords, self.size);
        Ok((flat / self.chunk_volume, flat % self.chunk_volume))
    }

    fn handle_at(&self, index: usize) -> Result<ChunkHandle, ImageError> {
        if !self.clean {
            return Err(ImageError::StaleImage);
        }
        self.lookup
            .get(index)
            .copied()
            .ok_or(ImageError::ChunkIndexOutOfRange {
                index,
                count: self.lookup.len(),
            })
    }

    pub fn chunk_at(&self, index: usize) -> Result<&Chunk<T>, ImageError> {
        let handle = self.handle_at(index)?;
        Ok(&self.chunks[handle.0])
    }

    pub fn chunk_at_mut(&mut self, index: usize) -> Result<&mut Chunk<T>, ImageError> {
        let handle = self.handle_at(index)?;
        Ok(&mut self.chunks[handle.0])
    }

    /// Chunk holding `coords`, reindexing first if the image is dirty
    pub fn get_chunk(&mut self, coords: [usize; 4]) -> Result<&mut Chunk<T>, ImageError>
    where
        T: Sync,
    {
        if !self.clean {
            self.reindex()?;
        }
        let (index, _) = self.address_of(coords)?;
        self.chunk_at_mut(index)
    }

    pub fn voxel(&self, coords: [usize; 4]) -> Result<&T, ImageError> {
        let (index, offset) = self.address_of(coords)?;
        self.chunk_at(index)?
            .voxel_at(offset)
            .ok_or(ImageError::OutOfRange {
                coords,
                size: self.size,
            })
    }

    /// Mutable sample at `coords`, reindexing first if the image is dirty
    pub fn voxel_mut(&mut self, coords: [usize; 4]) -> Result<&mut T, ImageError>
    where
        T: Sync,
    {
        if !self.clean {
            self.reindex()?;
        }
        let (index, offset) = self.address_of(coords)?;
        let size = self.size;
        self.chunk_at_mut(index)?
            .voxel_at_mut(offset)
            .ok_or(ImageError::OutOfRange { coords, size })
    }

    /// Chunks in chunk order
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk<T>> {
        self.order.iter().map(|handle| &self.chunks[handle.0])
    }

    /// Release the chunks in chunk order
    pub fn into_chunks(self) -> Vec<Chunk<T>> {
        let mut slots: Vec<Option<Chunk<T>>> = self.chunks.into_iter().map(Some).collect();
        self.order
            .iter()
            .filter_map(|handle| slots[handle.0].take())
            .collect()
    }
}
