use std::fmt;

use serde::{Deserialize, Serialize};

/// Cognitive-accessibility category a learner is sorted into.
///
/// Serialized in SCREAMING_CASE (`"DYSLEXIA"`, ...) because that is the tag the
/// generator boundary and the saved-profile store both expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Profile {
    Dyslexia,
    Dyscalculia,
    Adhd,
    Ell,
    Autism,
    Custom,
}

impl Profile {
    /// The five named profiles, in the order they are presented for manual selection.
    pub const NAMED: [Profile; 5] = [
        Profile::Dyslexia,
        Profile::Dyscalculia,
        Profile::Adhd,
        Profile::Ell,
        Profile::Autism,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Dyslexia => "DYSLEXIA",
            Profile::Dyscalculia => "DYSCALCULIA",
            Profile::Adhd => "ADHD",
            Profile::Ell => "ELL",
            Profile::Autism => "AUTISM",
            Profile::Custom => "CUSTOM",
        }
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "DYSLEXIA" => Ok(Self::Dyslexia),
            "DYSCALCULIA" => Ok(Self::Dyscalculia),
            "ADHD" => Ok(Self::Adhd),
            "ELL" => Ok(Self::Ell),
            "AUTISM" => Ok(Self::Autism),
            "CUSTOM" => Ok(Self::Custom),
            other => anyhow::bail!("unsupported profile: {other}"),
        }
    }

    /// User-facing "faction" label. Flavor text only.
    pub fn faction_name(self) -> &'static str {
        match self {
            Profile::Dyslexia => "Phoenix Faction",
            Profile::Dyscalculia => "Owl Faction",
            Profile::Adhd => "Falcon Faction",
            Profile::Ell => "Griffin Faction",
            Profile::Autism => "Dragon Faction",
            Profile::Custom => "Chimera Faction",
        }
    }

    pub fn faction_description(self) -> &'static str {
        match self {
            Profile::Dyslexia => {
                "As a Phoenix, you see the world visually. Content uses dyslexia-friendly fonts, \
                 vivid images for vocabulary, and short, punchy sentences."
            }
            Profile::Dyscalculia => {
                "As an Owl, you need structure. Every math problem is broken into clear steps \
                 and numbers are visualized so they stop getting jumbled."
            }
            Profile::Adhd => {
                "As a Falcon, you have speed but need focus. Long texts are chopped into \
                 micro-quests with frequent checkpoints and rewards."
            }
            Profile::Ell => {
                "As a Griffin, you are bridging worlds. Idioms are translated into plain English \
                 and tricky words get instant definitions."
            }
            Profile::Autism => {
                "As a Dragon, you value truth and logic. Confusing metaphors are removed and \
                 information is organized into predictable structures."
            }
            Profile::Custom => {
                "Content is adapted to be clear, structured, and multimodal."
            }
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
