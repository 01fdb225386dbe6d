//! # Volume assembly library
//!
//! This crate welds independently produced, arbitrarily ordered blocks of
//! samples ("chunks") into logically contiguous 4D images.
//!
//! A chunk is an n-dimensional block (up to row, column, slice and time)
//! together with a [`PropertySet`]. Its `indexOrigin` property places it in
//! space. Chunk producers such as file format readers hand their chunks to an
//! [`ImageGrouper`], which partitions them into one [`Image`] per group of
//! compatible chunks:
//!  - all chunks of an image have the same volume
//!  - all chunks carry the properties the [`ImageConfig`] requires
//!  - no two chunks of an image share a position
//!
//! An image defers all indexing until [`Image::reindex`]. Reindexing sorts
//! the chunks by position (last component first), infers the extent of the
//! dimensions the chunks do not cover themselves from jumps in the distance
//! between neighbouring chunks, and keeps the properties all chunks agree on.
//! After that every voxel is reachable through [`Image::address_of`] and
//! [`Image::voxel`].
//!
//! # Examples
//!
//! ## Stacking slices into a volume
//!
//! ```
//! # use volume_assembly::{Chunk, ImageGrouper, keys};
//! let slices: Vec<Chunk<u16>> = (0..3)
//!     .map(|z| {
//!         Chunk::new([4, 4, 1, 1])
//!             .with_property(keys::INDEX_ORIGIN, [0.0, 0.0, z as f64])
//!             .with_property(keys::VOXEL_SIZE, [1.0, 1.0, 1.0])
//!     })
//!     .collect();
//!
//! let mut images = ImageGrouper::default().group(slices);
//! assert_eq!(images.len(), 1);
//!
//! let image = &mut images[0];
//! assert_eq!(image.size(), [4, 4, 3, 1]);
//! *image.voxel_mut([1, 2, 2, 0]).expect("voxel should be inside the image") = 7;
//! assert_eq!(image.address_of([1, 2, 2, 0]).ok(), Some((2, 9)));
//! ```

pub mod chunk;
pub mod enums;
pub mod image;
pub mod image_grouper;
pub mod property;

pub use chunk::{Chunk, chunk_less, chunk_order, compare_origin};
pub use enums::Dimension;
pub use image::{Image, ImageConfig, ImageError, Rejected};
pub use image_grouper::ImageGrouper;
pub use property::{PropertySet, PropertyValue, keys};
