/// Session storage: where the token and accessory records live on disk.
///
/// Two small records in the user's data directory:
/// - `token.txt` — the Bitmoji token, one line
/// - `saves.json` — the accessory registry
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory holding both records.
///
/// - Linux: ~/.local/share/bitmoji-editor/
/// - macOS: ~/Library/Application Support/bitmoji-editor/
/// - Windows: %APPDATA%\bitmoji-editor\
pub fn storage_dir() -> PathBuf {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .expect("Could not determine user data directory");

    path.push("bitmoji-editor");
    path
}

pub fn token_path() -> PathBuf {
    storage_dir().join("token.txt")
}

pub fn registry_path() -> PathBuf {
    storage_dir().join("saves.json")
}

/// Read the stored token, if any. Whitespace is trimmed; a blank file
/// counts as no token.
pub fn load_token_from(path: &Path) -> Option<String> {
    let text = fs::read_to_string(path).ok()?;
    let token = text.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Persist the token. Called once, right after the first successful fetch
/// proves the token works; a failed fetch never writes anything.
pub fn store_token_at(path: &Path, token: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, token)
}

pub fn load_token() -> Option<String> {
    load_token_from(&token_path())
}
