use crate::errors::AppError;

/// Largest accepted avatar upload.
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Trims `value`; blank input fails with `message`.
pub fn required_text(value: &str, message: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(message.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Trims an optional field; blank becomes `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// File extension for an accepted avatar content type.
pub fn avatar_extension(content_type: &str) -> Result<&'static str, AppError> {
    match content_type {
        "image/jpeg" => Ok("jpg"),
        "image/png" => Ok("png"),
        "image/webp" => Ok("webp"),
        "image/gif" => Ok("gif"),
        _ => Err(AppError::Validation(
            "Please select a valid image file (JPEG, PNG, WebP, or GIF)".to_string(),
        )),
    }
}

pub fn check_avatar_size(len: usize) -> Result<(), AppError> {
    if len == 0 {
        return Err(AppError::Validation("File is empty".to_string()));
    }
    if len > MAX_AVATAR_BYTES {
        return Err(AppError::Validation(
            "Image size must be less than 5MB".to_string(),
        ));
    }
    Ok(())
}
