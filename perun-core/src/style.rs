//! Confidence-to-colour mapping for highlighted segments.
//!
//! Low confidence is yellow, high confidence red; the green channel falls
//! linearly as confidence rises.

use crate::align::{Annotation, Verdict};
use crate::annotation::AnnotationSource;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An sRGB colour with optional alpha
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: Option<f32>,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: None }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self {
            r,
            g,
            b,
            a: Some(a),
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.a {
            Some(a) => write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, a),
            None => write!(f, "rgb({}, {}, {})", self.r, self.g, self.b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderLine {
    Solid,
    Dashed,
}

/// Decoration of one highlighted segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentStyle {
    pub background: Option<Rgba>,
    pub border: Rgba,
    pub border_width: u8,
    pub border_line: BorderLine,
    pub text: Option<Rgba>,
}

const DARK_RED: Rgba = Rgba::rgb(139, 0, 0);
const DARK_ORANGE: Rgba = Rgba::rgb(139, 69, 0);
const MUTED_GREY: Rgba = Rgba::rgb(156, 163, 175);

impl SegmentStyle {
    /// Colour ramp for a machine confidence in `[0, 1]`.
    ///
    /// Out-of-range values are clamped and NaN is treated as 0.
    pub fn for_confidence(confidence: f32) -> Self {
        let c = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        let green = (255.0 * (1.0 - c)).round() as u8;
        let text = if c * 100.0 > 70.0 {
            DARK_RED
        } else {
            DARK_ORANGE
        };

        Self {
            background: Some(Rgba::rgba(255, green, 0, 0.25)),
            border: Rgba::rgb(u8::max(200, 255 - 55), green.saturating_sub(55), 0),
            border_width: 2,
            border_line: BorderLine::Solid,
            text: Some(text),
        }
    }

    /// A machine flag a reviewer marked as a false positive
    pub fn rejected() -> Self {
        Self {
            background: None,
            border: MUTED_GREY,
            border_width: 2,
            border_line: BorderLine::Dashed,
            text: None,
        }
    }

    /// Style for an aligned annotation, taking any human verdict into account
    pub fn for_annotation(annotation: &Annotation) -> Self {
        let span = &annotation.span;
        match (span.source, annotation.verdict) {
            (AnnotationSource::Machine, Some(Verdict::Rejected)) => Self::rejected(),
            (AnnotationSource::Machine, Some(Verdict::Confirmed)) => Self {
                border_width: 3,
                ..Self::for_confidence(span.confidence.unwrap_or(1.0))
            },
            (AnnotationSource::Machine, None) => {
                Self::for_confidence(span.confidence.unwrap_or(0.0))
            }
            (AnnotationSource::HumanPositive, _) => Self::for_confidence(1.0),
            (AnnotationSource::HumanNegative, _) => Self::rejected(),
        }
    }

    /// Inline CSS declarations
    pub fn to_css(&self) -> String {
        let line = match self.border_line {
            BorderLine::Solid => "solid",
            BorderLine::Dashed => "dashed",
        };
        let mut css = format!(
            "border-bottom: {}px {} {};",
            self.border_width, line, self.border
        );
        if let Some(background) = self.background {
            css.push_str(&format!(" background-color: {};", background));
        }
        if let Some(text) = self.text {
            css.push_str(&format!(" color: {};", text));
        }
        css
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationSpan;
    use crate::api::FeedbackType;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 255, 200, "rgb(139, 69, 0)")]
    #[case(0.5, 128, 73, "rgb(139, 69, 0)")]
    #[case(0.7, 77, 22, "rgb(139, 69, 0)")]
    #[case(0.71, 74, 19, "rgb(139, 0, 0)")]
    #[case(1.0, 0, 0, "rgb(139, 0, 0)")]
    fn test_ramp(
        #[case] confidence: f32,
        #[case] green: u8,
        #[case] border_green: u8,
        #[case] text: &str,
    ) {
        let style = SegmentStyle::for_confidence(confidence);
        assert_eq!(style.background, Some(Rgba::rgba(255, green, 0, 0.25)));
        assert_eq!(style.border, Rgba::rgb(200, border_green, 0));
        assert_eq!(style.text.unwrap().to_string(), text);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(
            SegmentStyle::for_confidence(-3.0),
            SegmentStyle::for_confidence(0.0)
        );
        assert_eq!(
            SegmentStyle::for_confidence(7.0),
            SegmentStyle::for_confidence(1.0)
        );
        assert_eq!(
            SegmentStyle::for_confidence(f32::NAN),
            SegmentStyle::for_confidence(0.0)
        );
    }

    #[test]
    fn test_css() {
        assert_eq!(
            SegmentStyle::for_confidence(1.0).to_css(),
            "border-bottom: 2px solid rgb(200, 0, 0); background-color: rgba(255, 0, 0, 0.25); color: rgb(139, 0, 0);"
        );
        assert_eq!(
            SegmentStyle::rejected().to_css(),
            "border-bottom: 2px dashed rgb(156, 163, 175);"
        );
    }

    #[test]
    fn test_annotation_decorations() {
        let machine = AnnotationSpan::machine("x", 0.4);
        let confirmed = Annotation {
            span: machine.clone(),
            verdict: Some(Verdict::Confirmed),
        };
        let style = SegmentStyle::for_annotation(&confirmed);
        assert_eq!(style.border_width, 3);
        assert_eq!(style.background, SegmentStyle::for_confidence(0.4).background);

        let rejected = Annotation {
            span: machine,
            verdict: Some(Verdict::Rejected),
        };
        assert_eq!(
            SegmentStyle::for_annotation(&rejected),
            SegmentStyle::rejected()
        );

        let human = Annotation {
            span: AnnotationSpan::human("y", FeedbackType::Positive),
            verdict: None,
        };
        assert_eq!(
            SegmentStyle::for_annotation(&human),
            SegmentStyle::for_confidence(1.0)
        );
    }
}
