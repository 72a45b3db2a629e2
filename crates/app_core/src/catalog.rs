//! Image catalog: the ordered set of images shown in a session

use image::RgbaImage;
use std::fmt;
use std::sync::Arc;

/// Decoded pixel data owned by the image source
pub struct DecodedImage {
    pub pixels: RgbaImage,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Cheap, shared reference to decoded pixel data
#[derive(Clone)]
pub struct ImageHandle(Arc<DecodedImage>);

impl ImageHandle {
    pub fn new(pixels: RgbaImage) -> Self {
        Self(Arc::new(DecodedImage { pixels }))
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.0.pixels
    }

    /// Do both handles point at the same pixel buffer?
    pub fn same_as(&self, other: &ImageHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageHandle({}x{})", self.0.width(), self.0.height())
    }
}

/// One loaded image
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub index: usize,
    pub handle: ImageHandle,
    /// Size of the source file's image, before any downscaling
    pub width: u32,
    pub height: u32,
    pub caption: String,
    /// xxh3 of the file bytes
    pub hash: u64,
}

/// Ordered collection of image records.
///
/// Records are appended while loading; once the catalog is handed to a
/// session it is shared behind an `Arc` and never mutated again.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    records: Vec<ImageRecord>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an image, assigning it the next index
    pub fn push(&mut self, handle: ImageHandle, width: u32, height: u32, caption: impl Into<String>, hash: u64) -> usize {
        let index = self.records.len();
        self.records.push(ImageRecord {
            index,
            handle,
            width,
            height,
            caption: caption.into(),
            hash,
        });
        index
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ImageRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records.iter()
    }

    pub fn captions(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.caption.as_str())
    }
}

#[cfg(test)]
pub(crate) fn test_catalog(sizes: &[(u32, u32, &str)]) -> Catalog {
    let mut catalog = Catalog::new();
    for (i, (w, h, caption)) in sizes.iter().enumerate() {
        // Keep test buffers tiny; natural size is what layout uses.
        let pixels = RgbaImage::from_pixel(2, 2, image::Rgba([i as u8, 0, 0, 255]));
        catalog.push(ImageHandle::new(pixels), *w, *h, *caption, i as u64);
    }
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_sequential_indices() {
        let catalog = test_catalog(&[(10, 10, "a"), (20, 10, "b"), (5, 5, "c")]);
        assert_eq!(catalog.len(), 3);
        for (i, record) in catalog.iter().enumerate() {
            assert_eq!(record.index, i);
        }
        assert_eq!(catalog.captions().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_handles_are_shared_not_copied() {
        let catalog = test_catalog(&[(10, 10, "a")]);
        let record = catalog.get(0).unwrap().clone();
        assert!(record.handle.same_as(&catalog.get(0).unwrap().handle));
    }
}
