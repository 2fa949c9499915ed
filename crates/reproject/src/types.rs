//! Core data types: footprint, output grid and sample mappings.

use fits_io::PixelType;

/// World-coordinate bounding box of an image (first two world axes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl Footprint {
    /// A zero-area footprint at one point.
    pub fn from_point(lon: f64, lat: f64) -> Self {
        Self {
            lon_min: lon,
            lon_max: lon,
            lat_min: lat,
            lat_max: lat,
        }
    }

    /// Grow to include a point.
    pub fn include(&mut self, lon: f64, lat: f64) {
        self.lon_min = self.lon_min.min(lon);
        self.lon_max = self.lon_max.max(lon);
        self.lat_min = self.lat_min.min(lat);
        self.lat_max = self.lat_max.max(lat);
    }

    pub fn lon_span(&self) -> f64 {
        self.lon_max - self.lon_min
    }

    pub fn lat_span(&self) -> f64 {
        self.lat_max - self.lat_min
    }

    /// Span along spatial axis 0 or 1.
    pub fn span(&self, axis: usize) -> f64 {
        if axis == 0 {
            self.lon_span()
        } else {
            self.lat_span()
        }
    }
}

/// Shape and sample type of the output image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputGrid {
    /// NAXIS1, NAXIS2 and, for cubes, NAXIS3 (all >= 1).
    pub dimensions: Vec<usize>,
    pub pixel_type: PixelType,
}

impl OutputGrid {
    pub fn width(&self) -> usize {
        self.dimensions[0]
    }

    pub fn height(&self) -> usize {
        self.dimensions[1]
    }

    /// Number of depth planes; 1 for 2-D output.
    pub fn depth(&self) -> usize {
        self.dimensions.get(2).copied().unwrap_or(1)
    }

    pub fn pixel_count(&self) -> usize {
        self.width() * self.height() * self.depth()
    }

    /// Storage index of 0-based (i, j, z).
    #[inline]
    pub fn index(&self, i: usize, j: usize, z: usize) -> usize {
        (z * self.height() + j) * self.width() + i
    }
}

/// Where one output sample comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleMapping<'a> {
    /// 0-based (column, row, plane) of the output sample.
    pub output: [usize; 3],
    /// 1-based input pixel coordinates, `None` when a transform failed.
    pub input: Option<&'a [f64]>,
}

impl SampleMapping<'_> {
    pub fn is_valid(&self) -> bool {
        self.input.is_some()
    }
}

/// Mapped input coordinates for every output sample, in storage order.
///
/// Coordinates are stored flat with a stride of the input axis count; a
/// validity bitmap marks samples whose transforms succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingGrid {
    stride: usize,
    len: usize,
    coords: Vec<f64>,
    /// Bit N is 1 if sample N has valid input coordinates.
    valid_bitmap: Vec<u64>,
}

impl MappingGrid {
    /// An empty grid for samples with `stride` input coordinates each.
    pub fn with_capacity(stride: usize, capacity: usize) -> Self {
        Self {
            stride,
            len: 0,
            coords: Vec::with_capacity(stride * capacity),
            valid_bitmap: Vec::with_capacity(capacity.div_ceil(64)),
        }
    }

    /// Append one sample; invalid samples store zeros.
    pub fn push(&mut self, input: Option<&[f64]>) {
        let idx = self.len;
        if idx % 64 == 0 {
            self.valid_bitmap.push(0);
        }
        match input {
            Some(coords) => {
                self.coords.extend_from_slice(&coords[..self.stride]);
                self.valid_bitmap[idx / 64] |= 1u64 << (idx % 64);
            }
            None => self.coords.resize(self.coords.len() + self.stride, 0.0),
        }
        self.len += 1;
    }

    /// Append every sample of `other`.
    pub fn append(&mut self, other: &MappingGrid) {
        for idx in 0..other.len {
            self.push(other.get(idx));
        }
    }

    /// Check if a sample has valid input coordinates.
    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        idx < self.len && (self.valid_bitmap[idx / 64] & (1u64 << (idx % 64))) != 0
    }

    /// Input coordinates of a sample, `None` if invalid.
    #[inline]
    pub fn get(&self, idx: usize) -> Option<&[f64]> {
        if self.is_valid(idx) {
            Some(&self.coords[idx * self.stride..(idx + 1) * self.stride])
        } else {
            None
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Count valid samples.
    pub fn valid_count(&self) -> usize {
        self.valid_bitmap
            .iter()
            .map(|w| w.count_ones() as usize)
            .sum()
    }

    /// Mappings in storage order (plane, row, column) for `grid`.
    pub fn mappings<'a>(&'a self, grid: &'a OutputGrid) -> impl Iterator<Item = SampleMapping<'a>> + 'a {
        let (width, height) = (grid.width(), grid.height());
        (0..self.len).map(move |idx| {
            let i = idx % width;
            let j = (idx / width) % height;
            let z = idx / (width * height);
            SampleMapping {
                output: [i, j, z],
                input: self.get(idx),
            }
        })
    }
}
