use mime_guess::Mime;

/// Look up the MIME type for a file extension. `None` means the extension
/// is not in the table.
pub fn resolve_media_type(extension: &str) -> Option<Mime> {
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        return None;
    }

    mime_guess::from_ext(extension).first()
}
