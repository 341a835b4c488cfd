// src/landmarks.rs
use crate::error::{Error, Result};
use crate::geometry::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Landmarks per detected hand, in the detector's fixed anatomical order.
pub const HAND_LANDMARK_COUNT: usize = 21;

// Hand landmark indices (MediaPipe hand topology)
pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_TIP: usize = 20;

/// First and last landmark of each finger chain, thumb first.
pub const FINGER_CHAINS: [(usize, usize); 5] = [
    (THUMB_CMC, THUMB_TIP),
    (INDEX_MCP, INDEX_TIP),
    (MIDDLE_MCP, MIDDLE_TIP),
    (RING_MCP, RING_TIP),
    (PINKY_MCP, PINKY_TIP),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const ALL: [Hand; 2] = [Hand::Left, Hand::Right];
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hand::Left => write!(f, "left"),
            Hand::Right => write!(f, "right"),
        }
    }
}

/// One frame's worth of hand landmarks. Either hand may be missing; a sample
/// with no hands at all is valid and simply never matches anything.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkSample {
    #[serde(default)]
    pub(crate) left_hand: Option<Vec<Point>>,
    #[serde(default)]
    pub(crate) right_hand: Option<Vec<Point>>,
}

impl LandmarkSample {
    pub fn new(left_hand: Option<Vec<Point>>, right_hand: Option<Vec<Point>>) -> Result<Self> {
        let sample = Self {
            left_hand,
            right_hand,
        };
        sample.validate()?;
        Ok(sample)
    }

    /// A sample with no hands detected.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn left(points: Vec<Point>) -> Result<Self> {
        Self::new(Some(points), None)
    }

    pub fn right(points: Vec<Point>) -> Result<Self> {
        Self::new(None, Some(points))
    }

    pub fn hand(&self, hand: Hand) -> Option<&[Point]> {
        match hand {
            Hand::Left => self.left_hand.as_deref(),
            Hand::Right => self.right_hand.as_deref(),
        }
    }

    pub fn left_hand(&self) -> Option<&[Point]> {
        self.hand(Hand::Left)
    }

    pub fn right_hand(&self) -> Option<&[Point]> {
        self.hand(Hand::Right)
    }

    pub(crate) fn set_hand(&mut self, hand: Hand, points: Vec<Point>) -> Result<()> {
        check_hand(hand, &points)?;
        match hand {
            Hand::Left => self.left_hand = Some(points),
            Hand::Right => self.right_hand = Some(points),
        }
        Ok(())
    }

    pub fn hand_count(&self) -> usize {
        Hand::ALL.iter().filter(|h| self.hand(**h).is_some()).count()
    }

    pub fn has_hands(&self) -> bool {
        self.hand_count() > 0
    }

    /// Checks that every present hand carries exactly 21 finite landmarks.
    pub fn validate(&self) -> Result<()> {
        for hand in Hand::ALL {
            if let Some(points) = self.hand(hand) {
                check_hand(hand, points)?;
            }
        }
        Ok(())
    }
}

fn check_hand(hand: Hand, points: &[Point]) -> Result<()> {
    if points.len() != HAND_LANDMARK_COUNT {
        return Err(Error::InvalidSample {
            hand,
            len: points.len(),
        });
    }
    // NaN and infinities cannot be written to JSON.
    if let Some(index) = points.iter().position(|p| !p.is_finite()) {
        return Err(Error::NonFiniteLandmark { hand, index });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_at(p: Point) -> Vec<Point> {
        vec![p; HAND_LANDMARK_COUNT]
    }

    #[test]
    fn test_empty_sample_is_valid() {
        let sample = LandmarkSample::empty();
        assert!(sample.validate().is_ok());
        assert!(!sample.has_hands());
        assert_eq!(sample.hand_count(), 0);
    }

    #[test]
    fn test_rejects_short_hand() {
        let err = LandmarkSample::new(None, Some(vec![Point::ORIGIN; 20])).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidSample {
                hand: Hand::Right,
                len: 20
            }
        ));
    }

    #[test]
    fn test_rejects_long_hand() {
        let err = LandmarkSample::left(vec![Point::ORIGIN; 22]).unwrap_err();
        assert!(matches!(err, Error::InvalidSample { hand: Hand::Left, len: 22 }));
    }

    #[test]
    fn test_rejects_non_finite_coordinates() {
        let mut points = hand_at(Point::ORIGIN);
        points[3] = Point::new(f32::NAN, 0.0, 0.0);
        assert!(matches!(
            LandmarkSample::left(points).unwrap_err(),
            Error::NonFiniteLandmark { hand: Hand::Left, index: 3 }
        ));

        let mut points = hand_at(Point::ORIGIN);
        points[20] = Point::new(0.0, f32::INFINITY, 0.0);
        assert!(matches!(
            LandmarkSample::right(points).unwrap_err(),
            Error::NonFiniteLandmark { hand: Hand::Right, index: 20 }
        ));
    }

    #[test]
    fn test_hand_accessors() {
        let sample = LandmarkSample::new(Some(hand_at(Point::ORIGIN)), None).unwrap();
        assert_eq!(sample.left_hand().map(|h| h.len()), Some(21));
        assert!(sample.right_hand().is_none());
        assert_eq!(sample.hand_count(), 1);
    }

    #[test]
    fn test_serialized_shape_uses_null_for_missing_hand() {
        let sample = LandmarkSample::left(hand_at(Point::new(1.0, 2.0, 3.0))).unwrap();
        let json = serde_json::to_value(&sample).unwrap();
        assert!(json["right_hand"].is_null());
        assert_eq!(json["left_hand"].as_array().map(|a| a.len()), Some(21));
        assert_eq!(json["left_hand"][0]["z"], 3.0);
    }
}
