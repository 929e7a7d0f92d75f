use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    TakeOff,
    Land,
    TakePhoto,
    PhotoPosition,
}

impl Intent {
    pub const ALL: [Intent; 4] = [
        Intent::TakeOff,
        Intent::Land,
        Intent::TakePhoto,
        Intent::PhotoPosition,
    ];

    /// A stable label for UI display.
    pub fn label(self) -> &'static str {
        match self {
            Intent::TakeOff => "Take Off",
            Intent::Land => "Land",
            Intent::TakePhoto => "Take Photo",
            Intent::PhotoPosition => "Photo Position",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct IntentRule {
    intent: Intent,
    phrases: &'static [&'static str],
}

// Order is priority: phrases overlap ("island", "take off and land"), first rule wins.
const RULES: &[IntentRule] = &[
    IntentRule {
        intent: Intent::PhotoPosition,
        phrases: &["photo position", "selfie position", "selfie mode"],
    },
    IntentRule {
        intent: Intent::TakeOff,
        phrases: &["take off", "takeoff", "lift off", "launch"],
    },
    IntentRule {
        intent: Intent::Land,
        phrases: &["land"],
    },
    IntentRule {
        intent: Intent::TakePhoto,
        phrases: &[
            "take a photo",
            "take photo",
            "take a picture",
            "take picture",
            "snapshot",
        ],
    },
];

/// Maps recognized speech to a flight intent.
///
/// Matching is a case-insensitive substring test against an ordered rule list. `None` is not an
/// error: callers are expected to ignore utterances that match nothing.
pub fn classify(text: &str) -> Option<Intent> {
    let s = crate::text::normalize_transcript(text).to_lowercase();
    if s.is_empty() {
        return None;
    }

    RULES
        .iter()
        .find(|rule| rule.phrases.iter().any(|p| s.contains(p)))
        .map(|rule| rule.intent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_basic_commands() {
        assert_eq!(classify("please land now"), Some(Intent::Land));
        assert_eq!(classify("take off now"), Some(Intent::TakeOff));
        assert_eq!(classify("snapshot please"), Some(Intent::TakePhoto));
        assert_eq!(classify("selfie mode"), Some(Intent::PhotoPosition));
        assert_eq!(classify("do a barrel roll"), None);
    }

    #[test]
    fn is_case_insensitive() {
        assert_eq!(classify("TAKE OFF"), Some(Intent::TakeOff));
        assert_eq!(classify("Take A Picture"), Some(Intent::TakePhoto));
        assert_eq!(classify("Photo Position please"), Some(Intent::PhotoPosition));
    }

    #[test]
    fn land_wins_over_take_photo() {
        assert_eq!(classify("land and take a photo"), Some(Intent::Land));
    }

    #[test]
    fn photo_position_wins_over_everything() {
        assert_eq!(
            classify("take off then land in photo position"),
            Some(Intent::PhotoPosition)
        );
        assert_eq!(classify("take off and land"), Some(Intent::TakeOff));
    }

    #[test]
    fn collapses_whitespace_before_matching() {
        assert_eq!(classify("  take    off  "), Some(Intent::TakeOff));
        assert_eq!(classify("take\ta\nphoto"), Some(Intent::TakePhoto));
    }

    #[test]
    fn empty_and_blank_input_match_nothing() {
        assert_eq!(classify(""), None);
        assert_eq!(classify("   \n"), None);
    }

    #[test]
    fn is_deterministic() {
        for text in ["launch", "snapshot", "selfie position", "landing gear", "hello"] {
            assert_eq!(classify(text), classify(text));
        }
    }

    #[test]
    fn labels_are_stable() {
        let labels: Vec<String> = Intent::ALL.iter().map(|i| i.to_string()).collect();
        assert_eq!(labels, ["Take Off", "Land", "Take Photo", "Photo Position"]);
    }
}
