use std::path::PathBuf;

use bonescope_client::Attachment;
use snafu::{OptionExt, Snafu, ensure};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DraftError {
    #[snafu(display("{path:?} is not an image (detected `{detected}`)"))]
    NotAnImage {
        stage: &'static str,
        path: PathBuf,
        detected: String,
    },
    #[snafu(display("{path:?} has no file name"))]
    MissingFileName { stage: &'static str, path: PathBuf },
}

/// Input text plus at most one staged image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    text: String,
    attachment: Option<Attachment>,
}

impl Draft {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn clear_text(&mut self) {
        self.text.clear();
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Replaces any previous selection wholesale.
    pub fn select_attachment(&mut self, attachment: Attachment) {
        self.attachment = Some(attachment);
    }

    pub fn clear_attachment(&mut self) -> Option<Attachment> {
        self.attachment.take()
    }

    pub fn is_submittable(&self) -> bool {
        !self.text.trim().is_empty() || self.attachment.is_some()
    }
}

/// Checks a picked path against the image filter and stages it as an attachment.
///
/// Only the extension is inspected; the file is not opened until it is sent.
pub fn image_attachment(path: impl Into<PathBuf>) -> Result<Attachment, DraftError> {
    let path = path.into();
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .context(MissingFileNameSnafu {
            stage: "image-attachment-name",
            path: path.clone(),
        })?;

    let guessed = mime_guess::from_path(&path).first();
    let detected = guessed
        .as_ref()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    ensure!(
        guessed
            .as_ref()
            .is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE),
        NotAnImageSnafu {
            stage: "image-attachment-mime",
            path: path.clone(),
            detected,
        }
    );

    Ok(Attachment::new(path, file_name, detected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submittable_requires_text_or_attachment() {
        let mut draft = Draft::default();
        assert!(!draft.is_submittable());

        draft.set_text(" \n\t");
        assert!(!draft.is_submittable());

        draft.set_text("hip pain");
        assert!(draft.is_submittable());

        draft.clear_text();
        draft.select_attachment(Attachment::new("/scans/hip.jpg", "hip.jpg", "image/jpeg"));
        assert!(draft.is_submittable());
    }

    #[test]
    fn selecting_replaces_previous_attachment() {
        let mut draft = Draft::default();
        draft.select_attachment(Attachment::new("/a.png", "a.png", "image/png"));
        draft.select_attachment(Attachment::new("/b.png", "b.png", "image/png"));

        assert_eq!(draft.attachment().map(|a| a.file_name.as_str()), Some("b.png"));
        assert!(draft.clear_attachment().is_some());
        assert!(draft.attachment().is_none());
    }

    #[test]
    fn image_paths_are_accepted_with_their_mime_type() {
        let attachment = image_attachment("/scans/Knee Scan.JPG").unwrap();
        assert_eq!(attachment.file_name, "Knee Scan.JPG");
        assert_eq!(attachment.mime, "image/jpeg");
    }

    #[test]
    fn non_image_paths_are_rejected() {
        let error = image_attachment("/docs/report.pdf").unwrap_err();
        assert!(matches!(error, DraftError::NotAnImage { detected, .. } if detected == "application/pdf"));

        let error = image_attachment("/scans/no-extension").unwrap_err();
        assert!(matches!(error, DraftError::NotAnImage { detected, .. } if detected == "unknown"));

        let error = image_attachment("/").unwrap_err();
        assert!(matches!(error, DraftError::MissingFileName { .. }));
    }
}
