use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One multi-modal restructuring of an uploaded artifact.
///
/// Built wholesale from a generator response and never patched afterwards;
/// a new profile or a new upload produces a new document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformedDocument {
    pub title: String,
    pub blocks: Vec<ContentBlock>,
    pub slides: Vec<Slide>,
    pub audio_script: String,
    pub activities: Vec<Activity>,
    pub mindmap: Vec<MindmapNode>,
    pub flashcards: Vec<Flashcard>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Text,
    Heading,
    Math,
    Vocabulary,
    Checkpoint,
    Summary,
}

impl BlockKind {
    pub const ALL: [&'static str; 6] = [
        "text",
        "heading",
        "math",
        "vocabulary",
        "checkpoint",
        "summary",
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    /// Markdown, inline math in `$...$`.
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_aid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simplification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<String>>,
}

impl ContentBlock {
    /// Stepwise breakdown; empty when the generator supplied none.
    pub fn steps(&self) -> &[String] {
        self.steps.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub id: String,
    pub content: String,
    pub visual_cue: String,
    /// Narration text for this slide.
    pub speaker_notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Quiz,
    Checklist,
    Reflection,
}

impl ActivityKind {
    pub const ALL: [&'static str; 3] = ["quiz", "checklist", "reflection"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    /// Signed so an out-of-range value from the generator survives parsing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer_index: Option<i64>,
}

impl Activity {
    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindmapNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: String,
    pub front: String,
    pub back: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
}

/// Non-fatal findings about an accepted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentWarning {
    DuplicateId {
        collection: &'static str,
        id: String,
    },
    /// The node is unreachable from any mindmap root.
    DanglingParent { id: String, parent_id: String },
}

impl fmt::Display for DocumentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentWarning::DuplicateId { collection, id } => {
                write!(f, "duplicate id `{id}` in {collection}")
            }
            DocumentWarning::DanglingParent { id, parent_id } => {
                write!(f, "mindmap node `{id}` references missing parent `{parent_id}`")
            }
        }
    }
}

impl TransformedDocument {
    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }

    pub fn lint(&self) -> Vec<DocumentWarning> {
        let mut warnings = Vec::new();
        duplicate_ids("blocks", self.blocks.iter().map(|b| &b.id), &mut warnings);
        duplicate_ids("slides", self.slides.iter().map(|s| &s.id), &mut warnings);
        duplicate_ids(
            "activities",
            self.activities.iter().map(|a| &a.id),
            &mut warnings,
        );
        duplicate_ids("mindmap", self.mindmap.iter().map(|n| &n.id), &mut warnings);
        duplicate_ids(
            "flashcards",
            self.flashcards.iter().map(|f| &f.id),
            &mut warnings,
        );

        let ids = self.mindmap.iter().map(|n| n.id.as_str()).collect::<HashSet<_>>();
        for node in &self.mindmap {
            if let Some(parent_id) = crate::mindmap::parent_of(node)
                && !ids.contains(parent_id)
            {
                warnings.push(DocumentWarning::DanglingParent {
                    id: node.id.clone(),
                    parent_id: parent_id.to_owned(),
                });
            }
        }

        warnings
    }

    /// Short context handed to the tutor boundaries: title plus the head of the audio script.
    pub fn context_summary(&self, max_chars: usize) -> String {
        let head = self.audio_script.chars().take(max_chars).collect::<String>();
        format!("{} - {head}", self.title)
    }
}

fn duplicate_ids<'a>(
    collection: &'static str,
    ids: impl Iterator<Item = &'a String>,
    warnings: &mut Vec<DocumentWarning>,
) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for id in ids {
        if !seen.insert(id.as_str()) && reported.insert(id.as_str()) {
            warnings.push(DocumentWarning::DuplicateId {
                collection,
                id: id.clone(),
            });
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

/// Append-only dialogue for the "explain" view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn push(&mut self, role: Role, text: impl Into<String>) {
        self.messages.push(Message {
            role,
            text: text.into(),
        });
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, parent_id: Option<&str>) -> MindmapNode {
        MindmapNode {
            id: id.to_owned(),
            parent_id: parent_id.map(str::to_owned),
            label: id.to_uppercase(),
            description: None,
        }
    }

    fn card(id: &str) -> Flashcard {
        Flashcard {
            id: id.to_owned(),
            front: "term".to_owned(),
            back: "definition".to_owned(),
            mnemonic: None,
        }
    }

    fn empty_document() -> TransformedDocument {
        TransformedDocument {
            title: "Photosynthesis".to_owned(),
            blocks: Vec::new(),
            slides: Vec::new(),
            audio_script: "Plants turn light into sugar.".to_owned(),
            activities: Vec::new(),
            mindmap: Vec::new(),
            flashcards: Vec::new(),
        }
    }

    #[test]
    fn lint_reports_duplicates_once_per_id() {
        let document = TransformedDocument {
            flashcards: vec![card("f1"), card("f1"), card("f1"), card("f2")],
            ..empty_document()
        };
        assert_eq!(
            document.lint(),
            vec![DocumentWarning::DuplicateId {
                collection: "flashcards",
                id: "f1".to_owned(),
            }]
        );
    }

    #[test]
    fn lint_reports_dangling_parents() {
        let document = TransformedDocument {
            mindmap: vec![node("a", None), node("b", Some("a")), node("z", Some("ghost"))],
            ..empty_document()
        };
        assert_eq!(
            document.lint(),
            vec![DocumentWarning::DanglingParent {
                id: "z".to_owned(),
                parent_id: "ghost".to_owned(),
            }]
        );
    }

    #[test]
    fn root_sentinel_is_not_dangling() {
        let document = TransformedDocument {
            mindmap: vec![node("a", Some("root")), node("b", Some(""))],
            ..empty_document()
        };
        assert!(document.lint().is_empty());
    }

    #[test]
    fn block_steps_default_to_empty() -> anyhow::Result<()> {
        let block: ContentBlock =
            serde_json::from_str(r#"{"id":"b1","type":"math","content":"$x+1$"}"#)?;
        assert_eq!(block.kind, BlockKind::Math);
        assert!(block.steps().is_empty());
        Ok(())
    }

    #[test]
    fn activity_without_question_does_not_deserialize() {
        let parsed = serde_json::from_str::<Activity>(r#"{"id":"a1","type":"reflection"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn context_summary_truncates_on_char_boundary() {
        let document = TransformedDocument {
            audio_script: "éééééé".to_owned(),
            ..empty_document()
        };
        assert_eq!(document.context_summary(3), "Photosynthesis - ééé");
    }

    #[test]
    fn transcript_keeps_append_order() {
        let mut transcript = Transcript::default();
        transcript.push(Role::User, "hi");
        transcript.push(Role::Model, "hello");
        let roles = transcript.messages().iter().map(|m| m.role).collect::<Vec<_>>();
        assert_eq!(roles, vec![Role::User, Role::Model]);
    }
}
