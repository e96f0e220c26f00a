use crate::core::error::{AppError, Result};
use crate::shared::constants::{MAX_DESCRIPTION_LENGTH, MAX_NAME_LENGTH};

/// Validate a category name: required, at most MAX_NAME_LENGTH characters.
///
/// Lengths are counted in characters, matching the VARCHAR limits in the
/// schema rather than byte counts.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::NameRequired);
    }

    let len = name.chars().count();
    if len > MAX_NAME_LENGTH {
        return Err(AppError::NameTooLong {
            len,
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

/// Validate an optional category description against MAX_DESCRIPTION_LENGTH.
pub fn validate_description(description: Option<&str>) -> Result<()> {
    if let Some(desc) = description {
        let len = desc.chars().count();
        if len > MAX_DESCRIPTION_LENGTH {
            return Err(AppError::DescriptionTooLong {
                len,
                max: MAX_DESCRIPTION_LENGTH,
            });
        }
    }

    Ok(())
}
