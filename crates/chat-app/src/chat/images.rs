use std::sync::Arc;

use gpui::{Image, ImageFormat};

/// Wraps downloaded bytes in a gpui image, picking the codec from the URL
/// extension. Unknown extensions are decoded as PNG, which is what the
/// analysis service writes.
pub fn image_from_download(url: &str, bytes: Vec<u8>) -> Arc<Image> {
    Arc::new(Image::from_bytes(format_for_url(url), bytes))
}

fn format_for_url(url: &str) -> ImageFormat {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    mime_guess::from_path(path)
        .first_raw()
        .and_then(ImageFormat::from_mime_type)
        .unwrap_or(ImageFormat::Png)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[::core::prelude::v1::test]
    fn format_follows_extension() {
        assert_eq!(
            format_for_url("http://127.0.0.1:5000/get_annotated/wrist.jpg"),
            ImageFormat::Jpeg
        );
        assert_eq!(
            format_for_url("http://127.0.0.1:5000/get_annotated/wrist.webp?v=2"),
            ImageFormat::Webp
        );
    }

    #[::core::prelude::v1::test]
    fn unknown_extension_falls_back_to_png() {
        assert_eq!(
            format_for_url("http://127.0.0.1:5000/get_annotated/scan"),
            ImageFormat::Png
        );
    }
}
