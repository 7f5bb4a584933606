use serde::{Deserialize, Serialize};

/// Orientation hint from the OCR engine: how far the page image must be
/// turned clockwise to read upright.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Upright,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Orientation {
    pub fn degrees(self) -> u16 {
        match self {
            Orientation::Upright => 0,
            Orientation::Rotate90 => 90,
            Orientation::Rotate180 => 180,
            Orientation::Rotate270 => 270,
        }
    }
}

impl TryFrom<u16> for Orientation {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Orientation::Upright),
            90 => Ok(Orientation::Rotate90),
            180 => Ok(Orientation::Rotate180),
            270 => Ok(Orientation::Rotate270),
            other => Err(format!("Unsupported rotation: {other} degrees")),
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrees_roundtrip() {
        for d in [0u16, 90, 180, 270] {
            assert_eq!(Orientation::try_from(d).unwrap().degrees(), d);
        }
    }

    #[test]
    fn rejects_odd_angles() {
        assert!(Orientation::try_from(45).is_err());
        assert!(Orientation::try_from(360).is_err());
    }

    #[test]
    fn default_is_upright() {
        assert_eq!(Orientation::default(), Orientation::Upright);
        assert_eq!(Orientation::Rotate270.to_string(), "270°");
    }
}
