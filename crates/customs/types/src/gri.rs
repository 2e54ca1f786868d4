//! General Rules of Interpretation used to justify a classification

use serde::{Deserialize, Serialize};

/// A GRI rule, strongest (`Gri1`) to weakest (`Gri4`)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GriRule {
    Gri1,
    Gri2a,
    Gri2b,
    Gri3a,
    Gri3b,
    Gri3c,
    Gri4,
    Gri5,
    Gri6,
}

impl GriRule {
    /// Parse the loose notations agents emit: "GRI 3(b)", "gri3b",
    /// "Rule 2 (a)", "GIR 1".
    pub fn parse(raw: &str) -> Option<Self> {
        let compact: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        let body = ["GRI", "GIR", "RULE"]
            .iter()
            .find_map(|p| compact.strip_prefix(p))
            .unwrap_or(&compact);

        let mut chars = body.chars();
        let number = chars.next()?;
        let letter = chars.next();
        match (number, letter) {
            ('1', _) => Some(Self::Gri1),
            ('2', Some('A')) => Some(Self::Gri2a),
            ('2', Some('B')) => Some(Self::Gri2b),
            ('3', Some('A')) => Some(Self::Gri3a),
            ('3', Some('B')) => Some(Self::Gri3b),
            ('3', Some('C')) => Some(Self::Gri3c),
            ('4', _) => Some(Self::Gri4),
            ('5', _) => Some(Self::Gri5),
            ('6', _) => Some(Self::Gri6),
            _ => None,
        }
    }

    /// Decision-strength score of the rule, 0-100
    pub fn strength(&self) -> u8 {
        match self {
            Self::Gri1 => 95,
            Self::Gri6 => 90,
            Self::Gri3a => 85,
            Self::Gri2a | Self::Gri5 => 80,
            Self::Gri2b => 75,
            Self::Gri3b => 70,
            Self::Gri3c => 60,
            Self::Gri4 => 55,
        }
    }

    pub fn is_weakest(&self) -> bool {
        matches!(self, Self::Gri4)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Gri1 => "GRI 1",
            Self::Gri2a => "GRI 2(a)",
            Self::Gri2b => "GRI 2(b)",
            Self::Gri3a => "GRI 3(a)",
            Self::Gri3b => "GRI 3(b)",
            Self::Gri3c => "GRI 3(c)",
            Self::Gri4 => "GRI 4",
            Self::Gri5 => "GRI 5",
            Self::Gri6 => "GRI 6",
        }
    }
}

impl std::fmt::Display for GriRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
