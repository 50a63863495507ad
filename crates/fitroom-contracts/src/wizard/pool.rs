use crate::image::EncodedImage;

/// Garment candidates: generated images (newest first) plus at most one
/// uploaded image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GarmentPool {
    // Oldest first; every public view reverses it.
    generated: Vec<EncodedImage>,
    uploaded: Option<EncodedImage>,
}

impl GarmentPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_generated(&mut self, image: EncodedImage) {
        self.generated.push(image);
    }

    pub fn set_uploaded(&mut self, image: EncodedImage) {
        self.uploaded = Some(image);
    }

    pub fn clear_uploaded(&mut self) {
        self.uploaded = None;
    }

    pub fn uploaded(&self) -> Option<&EncodedImage> {
        self.uploaded.as_ref()
    }

    /// Generated candidates, most recent first.
    pub fn generated(&self) -> impl ExactSizeIterator<Item = &EncodedImage> + '_ {
        self.generated.iter().rev()
    }

    /// `index` 0 is the most recent generation.
    pub fn get(&self, index: usize) -> Option<&EncodedImage> {
        let len = self.generated.len();
        if index >= len {
            return None;
        }
        self.generated.get(len - 1 - index)
    }

    pub fn len(&self) -> usize {
        self.generated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generated.is_empty()
    }

    pub fn contains(&self, image: &EncodedImage) -> bool {
        self.uploaded.as_ref() == Some(image) || self.generated.iter().any(|item| item == image)
    }
}
