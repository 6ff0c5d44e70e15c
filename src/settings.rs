use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::classify::Classification;
use crate::profile::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontFamily {
    Sans,
    Dyslexic,
    Mono,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FontSize {
    #[serde(rename = "text-base")]
    Base,
    #[serde(rename = "text-lg")]
    Large,
    #[serde(rename = "text-xl")]
    ExtraLarge,
    #[serde(rename = "text-2xl")]
    Huge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LineSpacing {
    #[serde(rename = "leading-normal")]
    Normal,
    #[serde(rename = "leading-relaxed")]
    Relaxed,
    #[serde(rename = "leading-loose")]
    Loose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorTheme {
    Default,
    Sepia,
    Dark,
    HighContrast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customizations {
    pub font_family: FontFamily,
    pub font_size: FontSize,
    pub line_spacing: LineSpacing,
    pub color_theme: ColorTheme,
    #[serde(rename = "ttsSpeed")]
    pub narration_speed: f32,
    pub show_images: bool,
    #[serde(rename = "isColorBlind")]
    pub color_blind: bool,
}

impl Default for Customizations {
    fn default() -> Self {
        Self {
            font_family: FontFamily::Sans,
            font_size: FontSize::Base,
            line_spacing: LineSpacing::Relaxed,
            color_theme: ColorTheme::Default,
            narration_speed: 1.0,
            show_images: true,
            color_blind: false,
        }
    }
}

/// Render-ready presentation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub id: String,
    pub name: String,
    pub base_profile: Profile,
    pub customizations: Customizations,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SettingsError {
    #[error("narration speed must be a positive number, got {0}")]
    InvalidNarrationSpeed(f32),
}

/// A single-field edit. Applying one always produces a new record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingsChange {
    FontFamily(FontFamily),
    FontSize(FontSize),
    LineSpacing(LineSpacing),
    ColorTheme(ColorTheme),
    NarrationSpeed(f32),
    ShowImages(bool),
    ColorBlind(bool),
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            id: "temp".to_owned(),
            name: "Default".to_owned(),
            base_profile: Profile::Dyslexia,
            customizations: Customizations::default(),
        }
    }
}

impl Settings {
    /// Bundle used when a learner picks a profile by hand.
    pub fn for_profile(profile: Profile) -> Self {
        let base = Customizations::default();
        let customizations = match profile {
            Profile::Dyslexia => Customizations {
                font_family: FontFamily::Dyslexic,
                line_spacing: LineSpacing::Loose,
                color_theme: ColorTheme::Sepia,
                ..base
            },
            Profile::Dyscalculia => Customizations {
                font_family: FontFamily::Mono,
                color_theme: ColorTheme::Default,
                ..base
            },
            Profile::Adhd => Customizations {
                font_family: FontFamily::Sans,
                line_spacing: LineSpacing::Normal,
                color_theme: ColorTheme::Default,
                ..base
            },
            Profile::Autism => Customizations {
                font_family: FontFamily::Sans,
                color_theme: ColorTheme::Default,
                ..base
            },
            Profile::Ell => Customizations {
                font_family: FontFamily::Sans,
                line_spacing: LineSpacing::Loose,
                ..base
            },
            Profile::Custom => base,
        };

        Self {
            id: generated_id("temp_"),
            name: display_name(profile).to_owned(),
            base_profile: profile,
            customizations,
        }
    }

    /// Bundle derived from a finished sorting ceremony.
    pub fn from_classification(classification: &Classification) -> Self {
        let profile = classification.profile;
        let font_family = if profile == Profile::Dyslexia {
            FontFamily::Dyslexic
        } else {
            FontFamily::Sans
        };
        let color_theme = if classification.color_blind {
            ColorTheme::HighContrast
        } else {
            ColorTheme::Default
        };

        Self {
            id: generated_id("quiz_"),
            name: display_name(profile).to_owned(),
            base_profile: profile,
            customizations: Customizations {
                font_family,
                font_size: FontSize::Large,
                color_theme,
                color_blind: classification.color_blind,
                ..Customizations::default()
            },
        }
    }

    /// Theme to render with. Colorblind mode always wins over the stored theme.
    pub fn effective_theme(&self) -> ColorTheme {
        if self.customizations.color_blind {
            ColorTheme::HighContrast
        } else {
            self.customizations.color_theme
        }
    }

    pub fn is_dark(&self) -> bool {
        matches!(
            self.effective_theme(),
            ColorTheme::Dark | ColorTheme::HighContrast
        )
    }

    pub fn with(&self, change: SettingsChange) -> Result<Self, SettingsError> {
        let mut customizations = self.customizations.clone();
        match change {
            SettingsChange::FontFamily(v) => customizations.font_family = v,
            SettingsChange::FontSize(v) => customizations.font_size = v,
            SettingsChange::LineSpacing(v) => customizations.line_spacing = v,
            SettingsChange::ColorTheme(v) => customizations.color_theme = v,
            SettingsChange::NarrationSpeed(v) => {
                if !(v.is_finite() && v > 0.0) {
                    return Err(SettingsError::InvalidNarrationSpeed(v));
                }
                customizations.narration_speed = v;
            }
            SettingsChange::ShowImages(v) => customizations.show_images = v,
            SettingsChange::ColorBlind(v) => customizations.color_blind = v,
        }
        Ok(Self {
            customizations,
            ..self.clone()
        })
    }

    /// Flips the stored theme between dark and default.
    pub fn toggled_dark_mode(&self) -> Self {
        let next = if self.customizations.color_theme == ColorTheme::Dark {
            ColorTheme::Default
        } else {
            ColorTheme::Dark
        };
        Self {
            customizations: Customizations {
                color_theme: next,
                ..self.customizations.clone()
            },
            ..self.clone()
        }
    }

    /// Copy of these settings under a new identity, as stored by "save profile".
    pub fn snapshot(&self, name: &str) -> Self {
        Self {
            id: Utc::now().timestamp_millis().to_string(),
            name: name.to_owned(),
            ..self.clone()
        }
    }
}

pub fn display_name(profile: Profile) -> &'static str {
    profile.faction_name()
}

fn generated_id(prefix: &str) -> String {
    format!("{prefix}{}", Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Scoreboard;

    fn classification(profile: Profile, color_blind: bool) -> Classification {
        Classification {
            profile,
            color_blind,
            scores: Scoreboard::default(),
        }
    }

    fn without_id(settings: Settings) -> Settings {
        Settings {
            id: String::new(),
            ..settings
        }
    }

    #[test]
    fn named_profiles_have_distinct_bundles() {
        let bundles = Profile::NAMED
            .iter()
            .map(|p| {
                let c = Settings::for_profile(*p).customizations;
                (c.font_family, c.line_spacing, c.color_theme)
            })
            .collect::<Vec<_>>();
        for (i, a) in bundles.iter().enumerate() {
            for b in &bundles[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn dyslexia_bundle_matches_defaults() {
        let settings = Settings::for_profile(Profile::Dyslexia);
        assert_eq!(settings.customizations.font_family, FontFamily::Dyslexic);
        assert_eq!(settings.customizations.line_spacing, LineSpacing::Loose);
        assert_eq!(settings.customizations.color_theme, ColorTheme::Sepia);
        assert_eq!(settings.name, "Phoenix Faction");
        assert!(settings.id.starts_with("temp_"));
    }

    #[test]
    fn resolver_is_pure_apart_from_id() {
        for profile in Profile::NAMED {
            assert_eq!(
                without_id(Settings::for_profile(profile)),
                without_id(Settings::for_profile(profile))
            );
            let c = classification(profile, true);
            assert_eq!(
                without_id(Settings::from_classification(&c)),
                without_id(Settings::from_classification(&c))
            );
        }
    }

    #[test]
    fn quiz_bundle_is_larger_and_forces_high_contrast_when_colorblind() {
        let settings = Settings::from_classification(&classification(Profile::Autism, true));
        assert_eq!(settings.customizations.font_size, FontSize::Large);
        assert_eq!(settings.customizations.font_family, FontFamily::Sans);
        assert_eq!(settings.customizations.color_theme, ColorTheme::HighContrast);
        assert!(settings.customizations.color_blind);
        assert!(settings.id.starts_with("quiz_"));

        let settings = Settings::from_classification(&classification(Profile::Dyslexia, false));
        assert_eq!(settings.customizations.font_family, FontFamily::Dyslexic);
        assert_eq!(settings.customizations.color_theme, ColorTheme::Default);
    }

    #[test]
    fn colorblind_overrides_any_stored_theme() -> anyhow::Result<()> {
        let base = Settings::for_profile(Profile::Dyslexia).with(SettingsChange::ColorBlind(true))?;
        for theme in [
            ColorTheme::Default,
            ColorTheme::Sepia,
            ColorTheme::Dark,
            ColorTheme::HighContrast,
        ] {
            let settings = base.with(SettingsChange::ColorTheme(theme))?;
            assert_eq!(settings.customizations.color_theme, theme);
            assert_eq!(settings.effective_theme(), ColorTheme::HighContrast);
            assert!(settings.is_dark());
        }
        Ok(())
    }

    #[test]
    fn with_replaces_one_field_and_leaves_original_untouched() -> anyhow::Result<()> {
        let original = Settings::for_profile(Profile::Ell);
        let changed = original.with(SettingsChange::FontSize(FontSize::Huge))?;
        assert_eq!(original.customizations.font_size, FontSize::Base);
        assert_eq!(changed.customizations.font_size, FontSize::Huge);
        assert_eq!(
            Customizations {
                font_size: FontSize::Base,
                ..changed.customizations.clone()
            },
            original.customizations
        );
        assert_eq!(changed.id, original.id);
        Ok(())
    }

    #[test]
    fn narration_speed_must_be_positive() {
        let settings = Settings::default();
        assert_eq!(
            settings.with(SettingsChange::NarrationSpeed(0.0)),
            Err(SettingsError::InvalidNarrationSpeed(0.0))
        );
        assert!(settings.with(SettingsChange::NarrationSpeed(f32::NAN)).is_err());
        assert!(settings.with(SettingsChange::NarrationSpeed(1.5)).is_ok());
    }

    #[test]
    fn dark_mode_toggle_round_trips() {
        let settings = Settings::for_profile(Profile::Dyslexia);
        let dark = settings.toggled_dark_mode();
        assert_eq!(dark.customizations.color_theme, ColorTheme::Dark);
        assert!(dark.is_dark());
        let light = dark.toggled_dark_mode();
        assert_eq!(light.customizations.color_theme, ColorTheme::Default);
        assert!(!light.is_dark());
    }

    #[test]
    fn serializes_with_storage_field_names() -> anyhow::Result<()> {
        let settings = Settings::for_profile(Profile::Dyscalculia);
        let value = serde_json::to_value(&settings)?;
        assert_eq!(value["baseProfile"], "DYSCALCULIA");
        assert_eq!(value["customizations"]["fontFamily"], "mono");
        assert_eq!(value["customizations"]["fontSize"], "text-base");
        assert_eq!(value["customizations"]["lineSpacing"], "leading-relaxed");
        assert_eq!(value["customizations"]["colorTheme"], "default");
        assert_eq!(value["customizations"]["ttsSpeed"], 1.0);
        assert_eq!(value["customizations"]["isColorBlind"], false);

        let parsed: Settings = serde_json::from_value(value)?;
        assert_eq!(parsed, settings);
        Ok(())
    }

    #[test]
    fn high_contrast_theme_uses_hyphenated_tag() -> anyhow::Result<()> {
        assert_eq!(
            serde_json::to_string(&ColorTheme::HighContrast)?,
            "\"high-contrast\""
        );
        Ok(())
    }
}
