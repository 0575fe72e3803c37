//! In-memory raster payloads
//!
//! Raster types produced and consumed by tile composition:
//!
//! - [`CodeRaster`] - raw classification codes from one coverage source
//! - [`ClassRaster`] - composited land cover samples
//! - [`Heightfield`] - elevation samples
//! - [`TextureHandle`] - color imagery handle, including the empty
//!   placeholder bound when a tile legitimately has no color data
//!
//! All rasters are square grids addressed by normalized UV coordinates
//! with `u = 0` at the west edge and `v = 0` at the south edge.
//! Classification rasters sample nearest-neighbor only: interpolating
//! discrete class codes would fabricate meaningless intermediate codes.

use std::sync::Arc;

use image::RgbaImage;

/// Sentinel classification code meaning "no valid sample here".
pub const NODATA: i32 = -32767;

/// One composited land cover sample.
///
/// The warp strength and contributing source index travel with the
/// class code through every intermediate raster; the boundary warping
/// pass needs both to decide whether a displaced sample is acceptable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassSample {
    /// Class code in the shared dictionary vocabulary, or [`NODATA`].
    pub code: i32,
    /// Warp strength of the source that contributed this sample.
    pub warp: f32,
    /// Index of the contributing coverage source, -1 for no data.
    pub source: i32,
}

impl ClassSample {
    /// The no-data sample.
    pub const NODATA: ClassSample = ClassSample {
        code: NODATA,
        warp: 0.0,
        source: -1,
    };

    /// Returns true if this sample carries no class data.
    #[inline]
    pub fn is_nodata(&self) -> bool {
        self.code == NODATA
    }
}

/// Maps a normalized coordinate to the nearest pixel index.
///
/// Inverse of the writer convention `u = i / (size - 1)`.
#[inline]
fn nearest(coord: f64, size: u32) -> usize {
    let i = (coord * (size - 1) as f64).round();
    i.clamp(0.0, (size - 1) as f64) as usize
}

/// Square grid of raw classification codes from one coverage source.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeRaster {
    size: u32,
    data: Vec<i32>,
}

impl CodeRaster {
    /// Creates a raster filled with [`NODATA`].
    pub fn new(size: u32) -> Self {
        Self::filled(size, NODATA)
    }

    /// Creates a raster filled with a single raw code.
    pub fn filled(size: u32, code: i32) -> Self {
        assert!(size >= 2, "raster must be at least 2x2");
        Self {
            size,
            data: vec![code; (size * size) as usize],
        }
    }

    /// Edge length in pixels.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Writes the code at a pixel. Row 0 is the south edge.
    pub fn set(&mut self, col: u32, row: u32, code: i32) {
        self.data[(row * self.size + col) as usize] = code;
    }

    /// Reads the code at a pixel.
    pub fn get(&self, col: u32, row: u32) -> i32 {
        self.data[(row * self.size + col) as usize]
    }

    /// Nearest-neighbor sample at normalized (u, v).
    pub fn sample(&self, u: f64, v: f64) -> i32 {
        let col = nearest(u, self.size);
        let row = nearest(v, self.size);
        self.data[row * self.size as usize + col]
    }
}

/// Square grid of composited [`ClassSample`] values.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassRaster {
    size: u32,
    data: Vec<ClassSample>,
}

impl ClassRaster {
    /// Creates a raster filled with no-data samples.
    pub fn new(size: u32) -> Self {
        assert!(size >= 1, "raster must have at least one pixel");
        Self {
            size,
            data: vec![ClassSample::NODATA; (size * size) as usize],
        }
    }

    /// Edge length in pixels.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Writes the sample at a pixel. Row 0 is the south edge.
    pub fn set(&mut self, col: u32, row: u32, sample: ClassSample) {
        self.data[(row * self.size + col) as usize] = sample;
    }

    /// Reads the sample at a pixel.
    pub fn get(&self, col: u32, row: u32) -> ClassSample {
        self.data[(row * self.size + col) as usize]
    }

    /// Nearest-neighbor sample at normalized (u, v).
    pub fn sample(&self, u: f64, v: f64) -> ClassSample {
        if self.size == 1 {
            return self.data[0];
        }
        let col = nearest(u, self.size);
        let row = nearest(v, self.size);
        self.data[row * self.size as usize + col]
    }

    /// Iterates all samples in row-major order.
    pub fn samples(&self) -> impl Iterator<Item = &ClassSample> {
        self.data.iter()
    }

    /// Returns true if any pixel carries real class data.
    pub fn has_data(&self) -> bool {
        self.data.iter().any(|s| !s.is_nodata())
    }
}

/// Square grid of elevation samples in meters.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightfield {
    size: u32,
    data: Vec<f32>,
}

impl Heightfield {
    /// Creates a heightfield at a constant elevation.
    pub fn filled(size: u32, elevation: f32) -> Self {
        assert!(size >= 2, "heightfield must be at least 2x2");
        Self {
            size,
            data: vec![elevation; (size * size) as usize],
        }
    }

    /// Edge length in samples.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Writes the elevation at a sample. Row 0 is the south edge.
    pub fn set(&mut self, col: u32, row: u32, elevation: f32) {
        self.data[(row * self.size + col) as usize] = elevation;
    }

    /// Nearest-neighbor sample at normalized (u, v).
    pub fn sample(&self, u: f64, v: f64) -> f32 {
        let col = nearest(u, self.size);
        let row = nearest(v, self.size);
        self.data[row * self.size as usize + col]
    }
}

/// Cheaply clonable handle to a color raster.
///
/// `Empty` is a valid handle meaning "no data here": the pipeline
/// always has something to bind, never a null.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureHandle {
    /// Real imagery.
    Image(Arc<RgbaImage>),
    /// The designated empty placeholder.
    Empty,
}

impl TextureHandle {
    /// Wraps an image in a handle.
    pub fn from_image(image: RgbaImage) -> Self {
        TextureHandle::Image(Arc::new(image))
    }

    /// Returns true if this is the empty placeholder.
    pub fn is_empty(&self) -> bool {
        matches!(self, TextureHandle::Empty)
    }
}
