use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::bbox::{BBox, PointF, Rect};

/// One detected document field.
///
/// Created by the external detector, re-ranked by the filter, read-only
/// afterward. `position_rank == 0` marks the best-scoring detection of a
/// label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub bbox: BBox,
    pub confidence: f32,
    pub position_rank: usize,
}

impl Detection {
    pub fn new(label: impl Into<String>, bbox: BBox, confidence: f32) -> Self {
        Self {
            label: label.into(),
            bbox,
            confidence,
            position_rank: 0,
        }
    }

    /// Canonical axis-aligned rectangle of the bbox.
    #[inline]
    pub fn rect(&self) -> Rect {
        self.bbox.to_rect()
    }

    #[inline]
    pub fn center(&self) -> PointF {
        self.rect().center()
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.rect().area()
    }
}

/// Count detections per label.
pub fn count_by_label(detections: &[Detection]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for det in detections {
        *counts.entry(det.label.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str, conf: f32) -> Detection {
        Detection::new(label, BBox::Rect(Rect::new(0.0, 0.0, 10.0, 10.0)), conf)
    }

    #[test]
    fn counts_sum_to_input_length() {
        let dets = vec![det("name", 0.9), det("name", 0.8), det("id", 0.7)];
        let counts = count_by_label(&dets);
        assert_eq!(counts["name"], 2);
        assert_eq!(counts["id"], 1);
        assert_eq!(counts.values().sum::<usize>(), dets.len());
    }

    #[test]
    fn accessors_use_canonical_rect() {
        let d = Detection::new(
            "portrait",
            BBox::Rect(Rect::new(10.0, 20.0, 30.0, 60.0)),
            0.5,
        );
        assert_eq!(d.area(), 800.0);
        let c = d.center();
        assert_eq!((c.x, c.y), (20.0, 40.0));
    }

    #[test]
    fn serializes_round_trip() {
        let d = det("id", 0.42);
        let json = serde_json::to_string(&d).unwrap();
        let back: Detection = serde_json::from_str(&json).unwrap();
        assert_eq!(d, back);
    }
}
