#![deny(unsafe_code)]

/// Desktop front end for the fracture analysis service.
///
/// The window hosts a single conversation: typed questions and X-ray uploads go
/// out as one multipart request each, replies come back as markdown and
/// annotated images.
pub mod app;
/// Chat view, message list and input components.
pub mod chat;
/// Settings persistence.
pub mod settings;
