//! Classification outcomes and batch summaries.

use std::fmt;

use serde::Serialize;

use super::ImageRef;

/// The two classes the classifier distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// A watermark was detected.
    Watermarked,
    /// No watermark was detected.
    Clean,
}

impl Label {
    /// Maps a model class index to a label (1 = watermark, anything else = clean).
    #[must_use]
    pub const fn from_class_index(index: usize) -> Self {
        if index == 1 {
            Self::Watermarked
        } else {
            Self::Clean
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Watermarked => f.write_str("watermarked"),
            Self::Clean => f.write_str("clean"),
        }
    }
}

/// Raw classifier output for one image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// Predicted class.
    pub label: Label,
    /// Probability of the predicted class (0.0 to 1.0).
    pub confidence: f32,
}

impl Prediction {
    /// Creates a prediction, clamping the confidence into `[0, 1]`.
    ///
    /// A NaN confidence becomes 0.0.
    #[must_use]
    pub fn new(label: Label, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self { label, confidence }
    }

    /// Returns true if the confidence is a probability in `[0, 1]`.
    #[must_use]
    pub fn has_valid_confidence(&self) -> bool {
        (0.0..=1.0).contains(&self.confidence)
    }
}

/// A successfully classified image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// The classified image.
    pub image: ImageRef,
    /// Predicted class.
    pub label: Label,
    /// Confidence of the prediction (0.0 to 1.0).
    pub confidence: f32,
}

impl Classification {
    /// Human-readable explanation, e.g. `Watermark detected (Confidence: 92.0%)`.
    #[must_use]
    pub fn explanation(&self) -> String {
        let pct = self.confidence * 100.0;
        match self.label {
            Label::Watermarked => format!("Watermark detected (Confidence: {pct:.1}%)"),
            Label::Clean => format!("No watermark detected (Confidence: {pct:.1}%)"),
        }
    }
}

/// An image that could not be classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// The image that failed.
    pub image: ImageRef,
    /// Why it failed. Prefixed with the stage (`load failed:` or `classification failed:`).
    pub reason: String,
}

/// Per-item result of processing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetectionOutcome {
    /// The image was loaded and classified.
    Classified(Classification),
    /// Loading or classification failed.
    Failed(Failure),
}

impl DetectionOutcome {
    /// The image this outcome belongs to.
    #[must_use]
    pub const fn image(&self) -> &ImageRef {
        match self {
            Self::Classified(c) => &c.image,
            Self::Failed(f) => &f.image,
        }
    }

    /// The label, if the image was classified.
    #[must_use]
    pub const fn label(&self) -> Option<Label> {
        match self {
            Self::Classified(c) => Some(c.label),
            Self::Failed(_) => None,
        }
    }
}

/// Aggregate counts for a run.
///
/// The total is always derived from the three buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Images classified as watermarked.
    pub watermarked: usize,
    /// Images classified as clean.
    pub clean: usize,
    /// Images that failed to load or classify.
    pub failed: usize,
}

impl BatchSummary {
    /// Total number of outcomes.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.watermarked + self.clean + self.failed
    }

    /// Counts one more outcome into the matching bucket.
    pub fn record(&mut self, outcome: &DetectionOutcome) {
        match outcome.label() {
            Some(Label::Watermarked) => self.watermarked += 1,
            Some(Label::Clean) => self.clean += 1,
            None => self.failed += 1,
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Watermarked: {} | Non-watermarked: {} | Errors: {}",
            self.watermarked, self.clean, self.failed
        )
    }
}

impl Serialize for BatchSummary {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("BatchSummary", 4)?;
        s.serialize_field("watermarked", &self.watermarked)?;
        s.serialize_field("clean", &self.clean)?;
        s.serialize_field("failed", &self.failed)?;
        s.serialize_field("total", &self.total())?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_from_class_index() {
        assert_eq!(Label::from_class_index(1), Label::Watermarked);
        assert_eq!(Label::from_class_index(0), Label::Clean);
    }

    #[test]
    fn test_prediction_confidence_validity() {
        assert!(Prediction::new(Label::Watermarked, 1.7).has_valid_confidence());
        let raw = Prediction {
            label: Label::Watermarked,
            confidence: 1.7,
        };
        assert!(!raw.has_valid_confidence());
        let nan = Prediction {
            label: Label::Clean,
            confidence: f32::NAN,
        };
        assert!(!nan.has_valid_confidence());
    }

    #[test]
    fn test_prediction_clamps_confidence() {
        assert!((Prediction::new(Label::Clean, 1.5).confidence - 1.0).abs() < f32::EPSILON);
        assert!(Prediction::new(Label::Clean, -0.2).confidence.abs() < f32::EPSILON);
        assert!(Prediction::new(Label::Clean, f32::NAN).confidence.abs() < f32::EPSILON);
    }

    #[test]
    fn test_explanation() {
        let c = Classification {
            image: ImageRef::new("a.jpg"),
            label: Label::Watermarked,
            confidence: 0.92,
        };
        assert_eq!(c.explanation(), "Watermark detected (Confidence: 92.0%)");
    }

    #[test]
    fn test_summary_total_is_sum_of_buckets() {
        let mut summary = BatchSummary::default();
        summary.record(&DetectionOutcome::Failed(Failure {
            image: ImageRef::new("c.jpg"),
            reason: "load failed: corrupt".into(),
        }));
        summary.record(&DetectionOutcome::Classified(Classification {
            image: ImageRef::new("a.jpg"),
            label: Label::Clean,
            confidence: 0.8,
        }));

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.clean, 1);
        assert_eq!(summary.total(), 2);
        assert_eq!(
            summary.to_string(),
            "Watermarked: 0 | Non-watermarked: 1 | Errors: 1"
        );
    }
}
