use anyhow::Result;
use serde_json::Value;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Global counter for sequential file naming
static GLOBAL_COUNTER: AtomicUsize = AtomicUsize::new(1);

/// Root of the transcript store, if recording is enabled.
pub fn message_directory() -> Option<PathBuf> {
    env::var("MESSAGE_LOG_DIR")
        .ok()
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from)
}

/// Clear recorded messages at the start of a new workflow run
pub fn clear_message_directory() -> Result<()> {
    match message_directory() {
        Some(root) => clear_messages_in(&root),
        None => Ok(()),
    }
}

pub fn clear_messages_in(root: &Path) -> Result<()> {
    let messages = root.join("messages");

    if messages.exists() {
        fs::remove_dir_all(&messages)?;
        log::info!("Cleared message directory for new run");
    }

    fs::create_dir_all(&messages)?;

    GLOBAL_COUNTER.store(1, Ordering::SeqCst);
    Ok(())
}

/// Get the next global sequence number
pub fn get_next_global_sequence_number() -> usize {
    GLOBAL_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Generate a sequential filename for messages
pub fn generate_message_filename(agent_type: &str, sequence_number: usize) -> String {
    format!("{:03}_{}_message.json", sequence_number, agent_type)
}

/// Record an LLM exchange under `root`, shared across all agents.
pub fn store_message_in(root: &Path, agent_type: &str, message: &Value) -> Result<PathBuf> {
    let sequence_number = get_next_global_sequence_number();
    let filename = generate_message_filename(agent_type, sequence_number);
    let dir_path = root.join("messages").join(agent_type);
    fs::create_dir_all(&dir_path)?;

    let file_path = dir_path.join(&filename);
    fs::write(&file_path, serde_json::to_string_pretty(message)?)?;
    log::debug!("Stored {} message: {}", agent_type, filename);
    Ok(file_path)
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_zero_padded() {
        assert_eq!(generate_message_filename("cmo", 7), "007_cmo_message.json");
        assert_eq!(
            generate_message_filename("research", 123),
            "123_research_message.json"
        );
    }

    #[test]
    fn stored_messages_land_under_agent_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = store_message_in(
            root.path(),
            "product",
            &serde_json::json!({"prompt": "hi", "response": "there"}),
        )
        .unwrap();

        assert!(path.starts_with(root.path().join("messages").join("product")));
        let contents: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(contents["response"], "there");
    }

    #[test]
    fn clearing_removes_previous_messages() {
        let root = tempfile::tempdir().unwrap();
        let path = store_message_in(root.path(), "cto", &serde_json::json!({})).unwrap();
        assert!(path.exists());

        clear_messages_in(root.path()).unwrap();
        assert!(!path.exists());
        assert!(root.path().join("messages").is_dir());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 50), "short");
        assert_eq!(truncate_chars("", 3), "");
    }
}
