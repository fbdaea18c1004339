/// Bounded reads over the game's log file.
///
/// The log is consulted for exactly two things: the most recently loaded map
/// token and the presence of the graceful-shutdown marker.  Nothing else is
/// parsed.
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::{Context, Result};

/// How much of the end of the log the pollers read per tick.
pub const TAIL_BYTES: u64 = 64 * 1024;

/// Reads at most `max_bytes` from the end of the file at `path`.
/// Returns `Ok(None)` when the file does not exist — the game has not
/// written a log yet — and an error for any other IO failure.
pub fn read_tail(path: &Path, max_bytes: u64) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut file =
        File::open(path).with_context(|| format!("Failed to open game log: {}", path.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat game log: {}", path.display()))?
        .len();
    if len > max_bytes {
        file.seek(SeekFrom::Start(len - max_bytes))
            .context("Failed to seek game log")?;
    }
    let mut raw = Vec::new();
    file.read_to_end(&mut raw)
        .with_context(|| format!("Failed to read game log: {}", path.display()))?;
    // Lossy: a tail cut mid-character must not fail the whole poll.
    Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
}

/// Returns the most recent map token assignment in `content`, scanning for
/// the last `map="<token>"` occurrence.
pub fn latest_map_token(content: &str) -> Option<String> {
    let start = content.rfind("map=\"")? + "map=\"".len();
    let rest = &content[start..];
    let end = rest.find('"')?;
    let token = &rest[..end];
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// True if the graceful-shutdown marker appears anywhere in `content`.
pub fn contains_graceful_marker(content: &str, marker: &str) -> bool {
    !marker.is_empty() && content.contains(marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_log(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Game.log");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    // ── read_tail ─────────────────────────────────────────────────────────────

    #[test]
    fn read_tail_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.log");
        assert_eq!(read_tail(&path, TAIL_BYTES).unwrap(), None);
    }

    #[test]
    fn read_tail_small_file_returns_full_content() {
        let (_dir, path) = write_log("line one\nline two\n");
        let tail = read_tail(&path, TAIL_BYTES).unwrap().unwrap();
        assert_eq!(tail, "line one\nline two\n");
    }

    #[test]
    fn read_tail_truncates_from_the_front() {
        let (_dir, path) = write_log("aaaaaaaaaa_THE_END");
        let tail = read_tail(&path, 8).unwrap().unwrap();
        assert_eq!(tail, "_THE_END");
    }

    // ── latest_map_token ──────────────────────────────────────────────────────

    #[test]
    fn finds_the_only_map_token() {
        let content = "<12:00:01> Loading screen closed\n<12:00:02> ContextEstablisher map=\"pu\" done\n";
        assert_eq!(latest_map_token(content).as_deref(), Some("pu"));
    }

    #[test]
    fn later_map_token_wins() {
        let content = "map=\"frontend_main\"\nsome noise\nmap=\"hangarapp\"\n";
        assert_eq!(latest_map_token(content).as_deref(), Some("hangarapp"));
    }

    #[test]
    fn no_map_token_returns_none() {
        assert_eq!(latest_map_token("nothing relevant here"), None);
        assert_eq!(latest_map_token(""), None);
    }

    #[test]
    fn empty_map_token_returns_none() {
        assert_eq!(latest_map_token("map=\"\""), None);
    }

    #[test]
    fn unterminated_map_token_returns_none() {
        assert_eq!(latest_map_token("map=\"pu"), None);
    }

    // ── contains_graceful_marker ──────────────────────────────────────────────

    #[test]
    fn marker_presence_is_detected() {
        let content = "<12:31:05> [Shutdown] FastShutdown requested\n";
        assert!(contains_graceful_marker(content, "FastShutdown"));
        assert!(!contains_graceful_marker(content, "CryEngineCrash"));
    }

    #[test]
    fn empty_marker_never_matches() {
        assert!(!contains_graceful_marker("any content", ""));
    }
}
