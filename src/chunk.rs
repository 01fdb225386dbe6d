use crate::enums::Dimension;
use crate::image::ImageError;
use crate::property::{PropertySet, PropertyValue, keys};

use log::error;
use ndarray::{Array4, ArrayView4, ArrayViewMut4};
use std::cmp::Ordering;

/// Linear index of `coords` inside a block of extent `dims`, row fastest
pub(crate) fn linear_index(coords: [usize; 4], dims: [usize; 4]) -> usize {
    coords[0] + dims[0] * (coords[1] + dims[1] * (coords[2] + dims[2] * coords[3]))
}

/// One contiguous block of samples with up to four dimensions and its own
/// properties. The shape is fixed at construction.
#[derive(Debug, Clone)]
pub struct Chunk<T> {
    // axis order is (time, slice, column, row) so memory order matches `linear_index`
    data: Array4<T>,
    properties: PropertySet,
}

impl<T> Chunk<T> {
    /// Zero (default) filled chunk of extent `dims` (row, column, slice, time)
    pub fn new(dims: [usize; 4]) -> Self
    where
        T: Default,
    {
        Self::from_array(Array4::default(Self::shape(dims)))
    }

    /// Build a chunk from samples laid out row fastest
    pub fn from_vec(dims: [usize; 4], data: Vec<T>) -> Result<Self, ImageError> {
        let expected: usize = dims.iter().product();
        let found = data.len();
        let data = Array4::from_shape_vec(Self::shape(dims), data)
            .map_err(|_| ImageError::DataLength { expected, found })?;
        Ok(Self::from_array(data))
    }

    /// Build a chunk by evaluating `f` at every (row, column, slice, time)
    pub fn from_fn(dims: [usize; 4], mut f: impl FnMut([usize; 4]) -> T) -> Self {
        Self::from_array(Array4::from_shape_fn(
            Self::shape(dims),
            |(t, s, c, r)| f([r, c, s, t]),
        ))
    }

    fn from_array(data: Array4<T>) -> Self {
        Self {
            data,
            properties: PropertySet::new(),
        }
    }

    fn shape(dims: [usize; 4]) -> (usize, usize, usize, usize) {
        (dims[3], dims[2], dims[1], dims[0])
    }

    /// Builder style property setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.set(key, value);
        self
    }

    /// Extent as (row, column, slice, time)
    pub fn dims(&self) -> [usize; 4] {
        let (t, s, c, r) = self.data.dim();
        [r, c, s, t]
    }

    pub fn dim_size(&self, dim: Dimension) -> usize {
        self.dims()[dim.index()]
    }

    /// Number of populated dimensions: the highest axis with more than one
    /// sample, counted from one. Never less than 1. Axes of size 0 count as
    /// unpopulated, such a chunk has a volume of 0 and is refused by images.
    pub fn relevant_dims(&self) -> usize {
        self.dims()
            .iter()
            .rposition(|&size| size > 1)
            .map_or(1, |pos| pos + 1)
    }

    pub fn volume(&self) -> usize {
        self.data.len()
    }

    pub fn voxel(&self, coords: [usize; 4]) -> Option<&T> {
        self.data.get([coords[3], coords[2], coords[1], coords[0]])
    }

    pub fn voxel_mut(&mut self, coords: [usize; 4]) -> Option<&mut T> {
        self.data.get_mut([coords[3], coords[2], coords[1], coords[0]])
    }

    /// Sample at a linear offset as computed by `Image::address_of`
    pub fn voxel_at(&self, offset: usize) -> Option<&T> {
        self.voxel(self.coords_of(offset)?)
    }

    pub fn voxel_at_mut(&mut self, offset: usize) -> Option<&mut T> {
        let coords = self.coords_of(offset)?;
        self.voxel_mut(coords)
    }

    fn coords_of(&self, offset: usize) -> Option<[usize; 4]> {
        if offset >= self.volume() {
            return None;
        }
        let [r, c, s, _] = self.dims();
        Some([
            offset % r,
            offset / r % c,
            offset / (r * c) % s,
            offset / (r * c * s),
        ])
    }

    pub fn data(&self) -> ArrayView4<'_, T> {
        self.data.view()
    }

    /// Mutable view of the samples. The view cannot change the shape.
    pub fn data_mut(&mut self) -> ArrayViewMut4<'_, T> {
        self.data.view_mut()
    }

    /// Samples in linear order, `None` if the storage is not contiguous
    pub fn as_slice(&self) -> Option<&[T]> {
        self.data.as_slice()
    }

    pub fn as_bytes(&self) -> Option<&[u8]>
    where
        T: bytemuck::Pod,
    {
        self.data.as_slice().map(bytemuck::cast_slice)
    }

    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut PropertySet {
        &mut self.properties
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.set(key, value);
    }

    pub fn index_origin(&self) -> Option<[f64; 3]> {
        self.properties.get_as(keys::INDEX_ORIGIN)
    }

    pub fn missing<S: AsRef<str>>(&self, required: &[S]) -> Vec<String> {
        self.properties.missing(required)
    }

    pub fn sufficient<S: AsRef<str>>(&self, required: &[S]) -> bool {
        self.missing(required).is_empty()
    }
}

/// Reverse lexicographic comparison of two positions: the last component
/// decides first. Components that cannot be compared count as equal.
pub fn compare_origin(a: &[f64; 3], b: &[f64; 3]) -> Ordering {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .map(|(x, y)| x.partial_cmp(y).unwrap_or(Ordering::Equal))
        .find(|order| order.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Order two chunks by their `indexOrigin`. `None` if either has none.
pub fn chunk_order<T>(a: &Chunk<T>, b: &Chunk<T>) -> Option<Ordering> {
    Some(compare_origin(&a.index_origin()?, &b.index_origin()?))
}

/// Strict weak ordering on chunks. Chunks without a position are never less.
pub fn chunk_less<T>(a: &Chunk<T>, b: &Chunk<T>) -> bool {
    match chunk_order(a, b) {
        Some(order) => order.is_lt(),
        None => {
            error!("chunk has no {}, it can not be sorted", keys::INDEX_ORIGIN);
            false
        }
    }
}
