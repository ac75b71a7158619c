pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DATA_DIR_NAME: &str = "popchat";

pub fn default_data_dir() -> Option<std::path::PathBuf> {
    dirs::home_dir().map(|home| home.join(".cache").join(DATA_DIR_NAME))
}
