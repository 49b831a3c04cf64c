//! Heart-rate strap readings.

use serde::{Deserialize, Serialize};

/// A single reading from a heart-rate strap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateSample {
    /// Beats per minute.
    pub bpm: u16,
    /// Whether the strap reported skin contact for this reading.
    pub contact_detected: bool,
}

impl HeartRateSample {
    /// Reading with skin contact.
    pub fn new(bpm: u16) -> Self {
        Self {
            bpm,
            contact_detected: true,
        }
    }

    /// Reading flagged as lacking skin contact.
    pub fn without_contact(bpm: u16) -> Self {
        Self {
            bpm,
            contact_detected: false,
        }
    }

    /// The sample if it can be trusted for recording, otherwise `None`.
    pub fn with_contact(self) -> Option<Self> {
        self.contact_detected.then_some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_filter() {
        assert_eq!(HeartRateSample::new(142).with_contact(), Some(HeartRateSample::new(142)));
        assert_eq!(HeartRateSample::without_contact(142).with_contact(), None);
    }
}
