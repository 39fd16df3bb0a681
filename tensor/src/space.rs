use serde::{Deserialize, Serialize};

/// Orbital partition an index runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IndexSpace {
    Occupied,
    Virtual,
    #[default]
    General,
}

impl IndexSpace {
    /// Space implied by the conventional label letter: `i..=o` occupied,
    /// `a..=h` virtual, anything else general.
    pub fn from_label(label: char) -> Self {
        match label {
            'i'..='o' => IndexSpace::Occupied,
            'a'..='h' => IndexSpace::Virtual,
            _ => IndexSpace::General,
        }
    }

    /// Spaces for every letter of a label string.
    pub fn from_labels(labels: &str) -> Vec<Self> {
        labels.chars().map(Self::from_label).collect()
    }

    pub fn code(self) -> char {
        match self {
            IndexSpace::Occupied => 'o',
            IndexSpace::Virtual => 'v',
            IndexSpace::General => 'g',
        }
    }
}
