/// Maximum category name length (characters, not bytes)
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum category description length
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Maximum tree depth: valid levels are 0..DEFAULT_MAX_DEPTH
pub const DEFAULT_MAX_DEPTH: u32 = 10;

/// Separator used when materializing category paths
pub const DEFAULT_PATH_SEPARATOR: &str = " > ";
