//! End to end tests for assembling chunks into images: ordering, geometry
//! discovery, property reconciliation, addressing and grouping.

use volume_assembly::{Chunk, Image, ImageError, ImageGrouper, keys};

/// Chunk of extent `dims` whose samples encode their global coordinate
fn coded_chunk(dims: [usize; 4], offset: [usize; 4], origin: [f64; 3]) -> Chunk<u32> {
    Chunk::from_fn(dims, |[r, c, s, t]| {
        encode([r + offset[0], c + offset[1], s + offset[2], t + offset[3]])
    })
    .with_property(keys::INDEX_ORIGIN, origin)
}

fn encode([r, c, s, t]: [usize; 4]) -> u32 {
    (r + 100 * c + 10_000 * s + 1_000_000 * t) as u32
}

#[test]
fn test_two_slices_give_a_thin_volume() {
    let mut image = Image::default();
    image
        .insert(Chunk::<u8>::new([4, 4, 1, 1]).with_property(keys::INDEX_ORIGIN, [0.0, 0.0, 1.0]))
        .unwrap();
    image
        .insert(Chunk::<u8>::new([4, 4, 1, 1]).with_property(keys::INDEX_ORIGIN, [0.0, 0.0, 0.0]))
        .unwrap();
    image.reindex().unwrap();
    assert_eq!(image.size(), [4, 4, 2, 1]);
}

#[test]
fn test_every_coordinate_resolves_to_its_sample() {
    // 3 slices x 2 timesteps, inserted in scrambled order
    let mut positions = Vec::new();
    for t in 0..2 {
        for s in 0..3 {
            positions.push((s, t));
        }
    }
    positions.reverse();
    positions.swap(1, 4);

    let mut image = Image::default();
    for (s, t) in positions {
        let z = (t * 20 + s) as f64;
        image
            .insert(coded_chunk([5, 3, 1, 1], [0, 0, s, t], [0.0, 0.0, z]))
            .unwrap();
    }
    image.reindex().unwrap();
    assert_eq!(image.size(), [5, 3, 3, 2]);

    for t in 0..2 {
        for s in 0..3 {
            for c in 0..3 {
                for r in 0..5 {
                    let coords = [r, c, s, t];
                    let (index, offset) = image.address_of(coords).unwrap();
                    let chunk = image.chunk_at(index).unwrap();
                    assert_eq!(chunk.voxel_at(offset), Some(&encode(coords)));
                    assert_eq!(image.voxel(coords).ok(), Some(&encode(coords)));
                }
            }
        }
    }
}

#[test]
fn test_volume_chunks_stack_in_time() {
    let mut image = Image::default();
    for t in 0..3 {
        image
            .insert(coded_chunk([2, 2, 2, 1], [0, 0, 0, t], [0.0, 0.0, t as f64 * 5.0]))
            .unwrap();
    }
    image.reindex().unwrap();
    assert_eq!(image.size(), [2, 2, 2, 3]);
    assert_eq!(image.voxel([1, 0, 1, 2]).ok(), Some(&encode([1, 0, 1, 2])));
}

#[test]
fn test_reindex_is_idempotent() {
    let mut image = Image::default();
    for z in 0..6 {
        image
            .insert(
                coded_chunk([2, 2, 1, 1], [0, 0, z, 0], [0.0, 0.0, z as f64])
                    .with_property(keys::VOXEL_SIZE, [1.0, 1.0, 2.0]),
            )
            .unwrap();
    }
    image.reindex().unwrap();
    let size = image.size();
    let properties = image.properties().clone();
    let first: Vec<_> = (0..6)
        .map(|i| image.chunk_at(i).unwrap().index_origin())
        .collect();

    image.reindex().unwrap();
    assert_eq!(image.size(), size);
    assert_eq!(image.properties(), &properties);
    let second: Vec<_> = (0..6)
        .map(|i| image.chunk_at(i).unwrap().index_origin())
        .collect();
    assert_eq!(first, second);
}

#[test]
fn test_rejected_volume_leaves_image_untouched() {
    let mut image = Image::default();
    image
        .insert(coded_chunk([4, 4, 1, 1], [0; 4], [0.0; 3]))
        .unwrap();
    image.reindex().unwrap();

    let rejected = image
        .insert(coded_chunk([3, 3, 1, 1], [0; 4], [0.0, 0.0, 1.0]))
        .unwrap_err();
    assert!(matches!(rejected.reason, ImageError::ShapeMismatch { .. }));
    assert_eq!(image.chunk_count(), 1);
    assert!(image.is_clean());
}

#[test]
fn test_only_shared_properties_survive() {
    let mut image = Image::default();
    for (i, z) in [0.0, 1.0, 2.0].into_iter().enumerate() {
        image
            .insert(
                Chunk::<u8>::new([2, 2, 1, 1])
                    .with_property(keys::INDEX_ORIGIN, [0.0, 0.0, z])
                    .with_property(keys::VOXEL_SIZE, [1.0, 1.0, 1.0])
                    .with_property(keys::ACQUISITION_NUMBER, i as i64),
            )
            .unwrap();
    }
    image.set_property("repetitionTime", 2000);
    image.reindex().unwrap();

    let properties = image.properties();
    assert!(properties.has(keys::VOXEL_SIZE));
    assert!(!properties.has(keys::ACQUISITION_NUMBER));
    assert_eq!(properties.get_as::<i64>("repetitionTime"), Some(2000));
    assert_eq!(
        properties.get_as::<[f64; 3]>(keys::INDEX_ORIGIN),
        Some([0.0, 0.0, 0.0])
    );
}

#[test]
fn test_grouping_mixed_volumes() {
    let chunks = vec![
        coded_chunk([4, 4, 1, 1], [0; 4], [0.0, 0.0, 0.0]),
        coded_chunk([3, 3, 1, 1], [0; 4], [0.0, 0.0, 0.0]),
        coded_chunk([3, 3, 1, 1], [0, 0, 1, 0], [0.0, 0.0, 1.0]),
        coded_chunk([4, 4, 1, 1], [0, 0, 1, 0], [0.0, 0.0, 1.0]),
    ];
    let images = ImageGrouper::default().group(chunks);

    assert_eq!(images.len(), 2);
    for image in &images {
        assert!(image.is_clean());
        assert_eq!(image.chunk_count(), 2);
        let volume = image.chunk_volume();
        assert!(image.chunks().all(|chunk| chunk.volume() == volume));
    }
    let volumes: Vec<_> = images.iter().map(Image::chunk_volume).collect();
    assert_eq!(volumes, vec![16, 9]);
}

#[test]
fn test_stale_image_is_not_addressed() {
    let mut image = Image::default();
    image
        .insert(coded_chunk([2, 2, 1, 1], [0; 4], [0.0; 3]))
        .unwrap();
    image.reindex().unwrap();
    assert_eq!(image.size(), [2, 2, 1, 1]);

    image
        .insert(coded_chunk([2, 2, 1, 1], [0, 0, 1, 0], [0.0, 0.0, 1.0]))
        .unwrap();
    assert!(matches!(
        image.address_of([0, 0, 0, 0]),
        Err(ImageError::StaleImage)
    ));
    assert!(matches!(
        image.voxel([0, 0, 0, 0]),
        Err(ImageError::StaleImage)
    ));

    // mutable access reindexes on its own
    assert!(image.get_chunk([0, 0, 1, 0]).is_ok());
    assert_eq!(image.size(), [2, 2, 2, 1]);
}

#[test]
fn test_chunks_beyond_the_geometry_stay_reachable_by_index() {
    // four evenly spaced slices, then one far away
    let mut image = Image::default();
    for (s, z) in [0.0, 1.0, 2.0, 3.0, 10.0].into_iter().enumerate() {
        image
            .insert(coded_chunk([2, 2, 1, 1], [0, 0, s, 0], [0.0, 0.0, z]))
            .unwrap();
    }
    image.reindex().unwrap();
    assert_eq!(image.size(), [2, 2, 4, 1]);
    assert_eq!(image.chunk_count(), 5);

    for s in 0..4 {
        for c in 0..2 {
            for r in 0..2 {
                let coords = [r, c, s, 0];
                assert_eq!(image.address_of(coords).unwrap().0, s);
                assert_eq!(image.voxel(coords).ok(), Some(&encode(coords)));
            }
        }
    }
    assert!(matches!(
        image.address_of([0, 0, 4, 0]),
        Err(ImageError::OutOfRange { .. })
    ));
    assert_eq!(
        image.chunk_at(4).unwrap().index_origin(),
        Some([0.0, 0.0, 10.0])
    );
}
