use volume_assembly::{Chunk, ImageGrouper, keys};
use web_time::Instant;

const SLICES: usize = 32;
const TIMESTEPS: usize = 16;
const SLICE_SIZE: usize = 128;

// Builds a synthetic series slice by slice, assembles it and touches every voxel
fn main() {
    env_logger::init();

    let mut timer = Instant::now();
    let mut acquisition = 0u32;
    let mut chunks = Vec::with_capacity(SLICES * TIMESTEPS);
    for timestep in 0..TIMESTEPS {
        for slice in 0..SLICES {
            acquisition += 1;
            // every timestep is shifted by one full stack so the break is detectable
            let z = (timestep * (SLICES + 1) * 4 + slice) as f64;
            chunks.push(
                Chunk::<i16>::new([SLICE_SIZE, SLICE_SIZE, 1, 1])
                    .with_property(keys::ROW_VEC, [1.0, 0.0, 0.0])
                    .with_property(keys::COLUMN_VEC, [0.0, 1.0, 0.0])
                    .with_property(keys::INDEX_ORIGIN, [0.0, 0.0, z])
                    .with_property(keys::ACQUISITION_NUMBER, acquisition)
                    .with_property(keys::VOXEL_SIZE, [1.0, 1.0, 1.0]),
            );
        }
    }
    println!("{} chunks created in {:?}", chunks.len(), timer.elapsed());

    timer = Instant::now();
    let mut images = ImageGrouper::default().group(chunks);
    println!("{} image(s) assembled in {:?}", images.len(), timer.elapsed());

    for image in &mut images {
        timer = Instant::now();
        let [rows, columns, slices, timesteps] = image.size();
        let mut written = 0usize;
        for t in 0..timesteps {
            for s in 0..slices {
                for c in 0..columns {
                    for r in 0..rows {
                        if let Ok(voxel) = image.voxel_mut([r, c, s, t]) {
                            *voxel = 42;
                            written += 1;
                        }
                    }
                }
            }
        }
        println!(
            "image of size {:?}: {written} voxels set to 42 in {:?}",
            image.size(),
            timer.elapsed()
        );
    }
}
