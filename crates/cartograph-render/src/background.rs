//! Optional base-map image drawn beneath the tiles.

use cartograph_assets::{LoadHandle, LoadState, ResourceLoader};
use image::RgbaImage;
use tiny_skia::{ColorU8, Pixmap};
use tracing::debug;

/// Loading state of the base-map image.
pub(crate) enum Background {
    None,
    Loading(LoadHandle<RgbaImage>),
    Ready(Pixmap),
    /// The image failed to load; the plain background color is used.
    Missing,
}

impl Background {
    pub(crate) fn request(loader: &ResourceLoader, key: Option<&str>) -> Self {
        match key {
            Some(key) => Self::Loading(loader.load_image(key)),
            None => Self::None,
        }
    }

    /// Advance a pending load. Never blocks.
    pub(crate) fn poll(&mut self) {
        let Self::Loading(handle) = self else {
            return;
        };
        match handle.try_get() {
            LoadState::Pending => {}
            LoadState::Loaded(image) => {
                *self = match image_to_pixmap(&image) {
                    Some(pixmap) => {
                        debug!(
                            width = pixmap.width(),
                            height = pixmap.height(),
                            "background image ready"
                        );
                        Self::Ready(pixmap)
                    }
                    None => Self::Missing,
                };
            }
            LoadState::Failed => *self = Self::Missing,
        }
    }

    pub(crate) fn pixmap(&self) -> Option<&Pixmap> {
        match self {
            Self::Ready(pixmap) => Some(pixmap),
            _ => None,
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        matches!(self, Self::Loading(_))
    }
}

/// Convert straight-alpha RGBA to a premultiplied pixmap.
pub(crate) fn image_to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_to_pixmap_premultiplies() {
        let image = RgbaImage::from_pixel(2, 1, image::Rgba([200, 100, 0, 128]));
        let pixmap = image_to_pixmap(&image).unwrap();
        let px = pixmap.pixel(1, 0).unwrap();
        assert_eq!(px.alpha(), 128);
        assert_eq!(px.red(), 100);
        assert_eq!(px.green(), 50);
    }

    #[test]
    fn test_no_key_is_inert() {
        let loader = ResourceLoader::new("unused", 1).unwrap();
        let mut background = Background::request(&loader, None);
        background.poll();
        assert!(background.pixmap().is_none());
        assert!(!background.is_pending());
    }
}
