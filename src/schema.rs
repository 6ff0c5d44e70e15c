//! Shape validation for generator payloads.
//!
//! The generator is trusted for nothing beyond structure: every required field
//! must be present with the right JSON type, closed unions must hold a known tag,
//! and quiz activities must carry both forms of their answer. Content quality is
//! never judged here. Past this boundary the crate only handles
//! [`TransformedDocument`].

use serde_json::{Map, Value};

use crate::document::{ActivityKind, BlockKind, TransformedDocument};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("missing required field `{path}`")]
    MissingField { path: String },

    #[error("field `{path}` must be {expected}")]
    TypeMismatch { path: String, expected: String },

    #[error("field `{path}` must not be empty")]
    EmptyRequired { path: String },
}

impl SchemaError {
    pub fn path(&self) -> Option<&str> {
        match self {
            SchemaError::InvalidJson(_) => None,
            SchemaError::MissingField { path }
            | SchemaError::TypeMismatch { path, .. }
            | SchemaError::EmptyRequired { path } => Some(path),
        }
    }
}

pub fn parse_document(raw: &str) -> Result<TransformedDocument, SchemaError> {
    let value: Value = serde_json::from_str(raw)?;
    validate(&value)?;
    Ok(serde_json::from_value(value)?)
}

pub fn validate(value: &Value) -> Result<(), SchemaError> {
    let root = Obj::root(value)?;

    root.required_str("title")?;
    let blocks = root.required_array("blocks")?;
    let slides = root.required_array("slides")?;
    root.required_str("audioScript")?;
    let activities = root.required_array("activities")?;
    let mindmap = root.required_array("mindmap")?;
    let flashcards = root.required_array("flashcards")?;

    for (i, item) in blocks.iter().enumerate() {
        let block = Obj::item("blocks", i, item)?;
        block.required_id()?;
        block.required_tag("type", &BlockKind::ALL)?;
        block.required_str("content")?;
        for key in ["originalText", "highlight", "visualAid", "simplification"] {
            block.optional_str(key)?;
        }
        block.optional_str_array("steps")?;
    }

    for (i, item) in slides.iter().enumerate() {
        let slide = Obj::item("slides", i, item)?;
        slide.required_id()?;
        for key in ["content", "visualCue", "speakerNotes"] {
            slide.required_str(key)?;
        }
    }

    for (i, item) in activities.iter().enumerate() {
        let activity = Obj::item("activities", i, item)?;
        activity.required_id()?;
        let kind = activity.required_tag("type", &ActivityKind::ALL)?;
        activity.required_str("question")?;
        if kind == "quiz" {
            let options = activity.required_str_array("options")?;
            if options.is_empty() {
                return Err(SchemaError::EmptyRequired {
                    path: activity.field("options"),
                });
            }
            activity.required_str("correctAnswer")?;
            activity.required_int("correctAnswerIndex")?;
        } else {
            activity.optional_str_array("options")?;
            activity.optional_str("correctAnswer")?;
            activity.optional_int("correctAnswerIndex")?;
        }
    }

    for (i, item) in mindmap.iter().enumerate() {
        let node = Obj::item("mindmap", i, item)?;
        node.required_id()?;
        node.required_str("label")?;
        node.optional_str("parentId")?;
        node.optional_str("description")?;
    }

    for (i, item) in flashcards.iter().enumerate() {
        let card = Obj::item("flashcards", i, item)?;
        card.required_id()?;
        card.required_str("front")?;
        card.required_str("back")?;
        card.optional_str("mnemonic")?;
    }

    Ok(())
}

struct Obj<'a> {
    map: &'a Map<String, Value>,
    path: String,
}

impl<'a> Obj<'a> {
    fn root(value: &'a Value) -> Result<Self, SchemaError> {
        let map = value.as_object().ok_or_else(|| SchemaError::TypeMismatch {
            path: "$".to_owned(),
            expected: "an object".to_owned(),
        })?;
        Ok(Self {
            map,
            path: String::new(),
        })
    }

    fn item(collection: &str, index: usize, value: &'a Value) -> Result<Self, SchemaError> {
        let path = format!("{collection}[{index}]");
        let map = value.as_object().ok_or_else(|| SchemaError::TypeMismatch {
            path: path.clone(),
            expected: "an object".to_owned(),
        })?;
        Ok(Self { map, path })
    }

    fn field(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_owned()
        } else {
            format!("{}.{key}", self.path)
        }
    }

    // Explicit `null` counts as absent.
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    fn required(&self, key: &str) -> Result<&'a Value, SchemaError> {
        self.get(key).ok_or_else(|| SchemaError::MissingField {
            path: self.field(key),
        })
    }

    fn mismatch(&self, key: &str, expected: &str) -> SchemaError {
        SchemaError::TypeMismatch {
            path: self.field(key),
            expected: expected.to_owned(),
        }
    }

    fn required_str(&self, key: &str) -> Result<&'a str, SchemaError> {
        self.required(key)?
            .as_str()
            .ok_or_else(|| self.mismatch(key, "a string"))
    }

    fn optional_str(&self, key: &str) -> Result<Option<&'a str>, SchemaError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| self.mismatch(key, "a string")),
        }
    }

    fn required_id(&self) -> Result<&'a str, SchemaError> {
        let id = self.required_str("id")?;
        if id.trim().is_empty() {
            return Err(SchemaError::EmptyRequired {
                path: self.field("id"),
            });
        }
        Ok(id)
    }

    fn required_tag(&self, key: &str, allowed: &[&str]) -> Result<&'a str, SchemaError> {
        let tag = self.required_str(key)?;
        if !allowed.contains(&tag) {
            return Err(self.mismatch(key, &format!("one of {}", allowed.join(", "))));
        }
        Ok(tag)
    }

    fn required_array(&self, key: &str) -> Result<&'a Vec<Value>, SchemaError> {
        self.required(key)?
            .as_array()
            .ok_or_else(|| self.mismatch(key, "an array"))
    }

    fn str_array(&self, key: &str, value: &'a Value) -> Result<Vec<&'a str>, SchemaError> {
        let items = value
            .as_array()
            .ok_or_else(|| self.mismatch(key, "an array of strings"))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| self.mismatch(key, "an array of strings"))
            })
            .collect()
    }

    fn required_str_array(&self, key: &str) -> Result<Vec<&'a str>, SchemaError> {
        let value = self.required(key)?;
        self.str_array(key, value)
    }

    fn optional_str_array(&self, key: &str) -> Result<Option<Vec<&'a str>>, SchemaError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => self.str_array(key, value).map(Some),
        }
    }

    fn required_int(&self, key: &str) -> Result<i64, SchemaError> {
        self.required(key)?
            .as_i64()
            .ok_or_else(|| self.mismatch(key, "an integer"))
    }

    fn optional_int(&self, key: &str) -> Result<Option<i64>, SchemaError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.mismatch(key, "an integer")),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::document::ActivityKind;

    const REQUIRED: [&str; 7] = [
        "title",
        "blocks",
        "slides",
        "audioScript",
        "activities",
        "mindmap",
        "flashcards",
    ];

    fn minimal() -> Value {
        json!({
            "title": "Fractions",
            "blocks": [],
            "slides": [],
            "audioScript": "",
            "activities": [],
            "mindmap": [],
            "flashcards": [],
        })
    }

    fn full() -> Value {
        json!({
            "title": "Fractions",
            "blocks": [
                { "id": "b1", "type": "heading", "content": "# Fractions" },
                { "id": "b2", "type": "math", "content": "$1/2 + 1/4$", "steps": ["$2/4 + 1/4$", "$3/4$"] }
            ],
            "slides": [
                { "id": "s1", "content": "Halves", "visualCue": "🍕", "speakerNotes": "A pizza cut in two." }
            ],
            "audioScript": "Welcome to fractions.",
            "activities": [
                { "id": "a1", "type": "quiz", "question": "1/2 + 1/4?", "options": ["1/4", "3/4"], "correctAnswer": "3/4", "correctAnswerIndex": 1 },
                { "id": "a2", "type": "reflection", "question": "Where do you see fractions?" }
            ],
            "mindmap": [
                { "id": "m1", "label": "Fractions" },
                { "id": "m2", "parentId": "m1", "label": "Halves", "description": "Two equal parts" }
            ],
            "flashcards": [
                { "id": "f1", "front": "Numerator", "back": "Top number", "mnemonic": "N is north" }
            ]
        })
    }

    #[test]
    fn accepts_minimal_payload_with_empty_collections() -> anyhow::Result<()> {
        let document = parse_document(&minimal().to_string())?;
        assert_eq!(document.title, "Fractions");
        assert!(document.blocks.is_empty());
        assert!(document.flashcards.is_empty());
        Ok(())
    }

    #[test]
    fn rejects_each_missing_top_level_field() {
        for key in REQUIRED {
            let mut payload = minimal();
            payload.as_object_mut().unwrap().remove(key);
            let err = parse_document(&payload.to_string()).unwrap_err();
            assert!(
                matches!(&err, SchemaError::MissingField { path } if path == key),
                "key={key} err={err}"
            );
        }
    }

    #[test]
    fn accepts_full_payload() -> anyhow::Result<()> {
        let document = parse_document(&full().to_string())?;
        assert_eq!(document.blocks[1].steps().len(), 2);
        assert!(document.blocks[0].steps().is_empty());
        assert_eq!(document.activities[0].correct_answer_index, Some(1));
        assert_eq!(document.activities[1].kind, ActivityKind::Reflection);
        assert_eq!(document.mindmap[1].parent_id.as_deref(), Some("m1"));
        Ok(())
    }

    #[test]
    fn quiz_requires_both_answer_forms() {
        for key in ["correctAnswer", "correctAnswerIndex"] {
            let mut payload = full();
            payload["activities"][0].as_object_mut().unwrap().remove(key);
            let err = validate(&payload).unwrap_err();
            assert_eq!(err.path(), Some(format!("activities[0].{key}").as_str()));
            assert!(matches!(err, SchemaError::MissingField { .. }));
        }
    }

    #[test]
    fn every_activity_requires_a_question() {
        let mut payload = full();
        payload["activities"][1].as_object_mut().unwrap().remove("question");
        let err = validate(&payload).unwrap_err();
        assert!(matches!(err, SchemaError::MissingField { ref path } if path == "activities[1].question"));
    }

    #[test]
    fn quiz_answer_forms_need_not_agree() -> anyhow::Result<()> {
        let mut payload = full();
        payload["activities"][0]["correctAnswerIndex"] = json!(0);
        let document = parse_document(&payload.to_string())?;
        assert_eq!(document.activities[0].correct_answer.as_deref(), Some("3/4"));
        Ok(())
    }

    #[test]
    fn quiz_with_no_options_is_empty_required() {
        let mut payload = full();
        payload["activities"][0]["options"] = json!([]);
        let err = validate(&payload).unwrap_err();
        assert!(matches!(err, SchemaError::EmptyRequired { ref path } if path == "activities[0].options"));
    }

    #[test]
    fn unknown_block_type_is_type_mismatch() {
        let mut payload = full();
        payload["blocks"][0]["type"] = json!("poem");
        let err = validate(&payload).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { ref path, .. } if path == "blocks[0].type"));
    }

    #[test]
    fn wrong_types_are_reported_with_path() {
        let mut payload = full();
        payload["slides"] = json!("not a list");
        assert!(matches!(
            validate(&payload).unwrap_err(),
            SchemaError::TypeMismatch { ref path, .. } if path == "slides"
        ));

        let mut payload = full();
        payload["blocks"][1]["steps"] = json!([1, 2]);
        assert!(matches!(
            validate(&payload).unwrap_err(),
            SchemaError::TypeMismatch { ref path, .. } if path == "blocks[1].steps"
        ));

        let mut payload = full();
        payload["activities"][0]["correctAnswerIndex"] = json!("1");
        assert!(matches!(
            validate(&payload).unwrap_err(),
            SchemaError::TypeMismatch { ref path, .. } if path == "activities[0].correctAnswerIndex"
        ));
    }

    #[test]
    fn blank_id_is_empty_required() {
        let mut payload = full();
        payload["flashcards"][0]["id"] = json!("  ");
        assert!(matches!(
            validate(&payload).unwrap_err(),
            SchemaError::EmptyRequired { ref path } if path == "flashcards[0].id"
        ));
    }

    #[test]
    fn null_optional_fields_are_absent() -> anyhow::Result<()> {
        let mut payload = full();
        payload["mindmap"][0]["parentId"] = Value::Null;
        payload["blocks"][0]["steps"] = Value::Null;
        let document = parse_document(&payload.to_string())?;
        assert_eq!(document.mindmap[0].parent_id, None);
        assert!(document.blocks[0].steps().is_empty());
        Ok(())
    }

    #[test]
    fn non_object_and_non_json_payloads_fail() {
        assert!(matches!(
            parse_document("[1, 2]").unwrap_err(),
            SchemaError::TypeMismatch { ref path, .. } if path == "$"
        ));
        assert!(matches!(
            parse_document("here is your lesson").unwrap_err(),
            SchemaError::InvalidJson(_)
        ));
    }
}
