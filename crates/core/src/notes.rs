use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::Result,
    phase::KnowledgeLevel,
    types::{Connections, KeyConcepts, Quiz, ThesisArguments, VerifiedClaims},
    youtube::extract_video_id,
};

/// Everything a finished (or partial) session produced, as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyNotes {
    pub session_id: Uuid,
    pub video_url: String,
    pub video_id: String,
    pub knowledge_level: KnowledgeLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_concepts: Option<KeyConcepts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thesis_arguments: Option<ThesisArguments>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<Connections>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_claims: Option<VerifiedClaims>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Quiz>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_score: Option<u8>,
}

pub fn get_notes_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("konspekt")
}

/// Get the path for saved notes of a video (knowledge-level aware)
pub fn get_notes_path(notes_dir: &Path, video_id: &str, level: KnowledgeLevel) -> PathBuf {
    notes_dir
        .join(video_id)
        .join(format!("notes_{}.json", level.name()))
}

/// Notes saved earlier for this video and level, if any.
pub async fn find_cached_notes(
    notes_dir: &Path,
    video_url: &str,
    level: KnowledgeLevel,
) -> Result<Option<StudyNotes>> {
    let Some(video_id) = extract_video_id(video_url) else {
        return Ok(None);
    };
    let path = get_notes_path(notes_dir, &video_id, level);
    if !fs::try_exists(&path).await? {
        return Ok(None);
    }
    debug!(path = %path.display(), "found cached notes");
    load_notes(&path).await.map(Some)
}

/// Save notes to a file, creating parent directories
pub async fn save_notes(notes: &StudyNotes, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let pretty_json = serde_json::to_string_pretty(notes)?;
    fs::write(path, &pretty_json).await?;
    Ok(())
}

/// Load notes from a saved file
pub async fn load_notes(path: &Path) -> Result<StudyNotes> {
    let json_content = fs::read_to_string(path).await?;
    let notes: StudyNotes = serde_json::from_str(&json_content)?;
    Ok(notes)
}
