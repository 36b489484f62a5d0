use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::detection::Detection;

/// Ranking filter mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterMode {
    /// Pass-through: detections keep their detector-assigned ranks.
    None,
    /// Keep the best non-overlapping positions per label, ranked by
    /// acceptance order.
    MultiPosition,
}

/// De-duplicate and rank raw detections.
///
/// Within each label, detections are taken by descending confidence and
/// greedily accepted while their IOU against every already-accepted
/// detection of that label stays at or below `iou_threshold`; acceptance
/// order becomes `position_rank`, capped at `max_per_label`. The output
/// is ordered by `(label, position_rank)` in both modes. Empty input
/// yields empty output; there are no failure modes.
pub fn filter_detections(
    detections: Vec<Detection>,
    mode: FilterMode,
    max_per_label: usize,
    iou_threshold: f32,
) -> Vec<Detection> {
    let mut out = match mode {
        FilterMode::None => detections,
        FilterMode::MultiPosition => {
            let raw_count = detections.len();
            let mut groups: BTreeMap<String, Vec<Detection>> = BTreeMap::new();
            for det in detections {
                groups.entry(det.label.clone()).or_default().push(det);
            }

            let mut selected = Vec::new();
            for (_, mut group) in groups {
                // Stable sort keeps equal-confidence ties deterministic.
                group.sort_by(|a, b| {
                    b.confidence
                        .partial_cmp(&a.confidence)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });

                let mut kept: Vec<Detection> = Vec::new();
                for mut det in group {
                    if kept.len() >= max_per_label {
                        break;
                    }
                    let rect = det.rect();
                    let duplicate = kept.iter().any(|k| rect.iou(&k.rect()) > iou_threshold);
                    if !duplicate {
                        det.position_rank = kept.len();
                        kept.push(det);
                    }
                }
                selected.extend(kept);
            }
            log::debug!("filter: {} raw -> {} ranked", raw_count, selected.len());
            selected
        }
    };

    out.sort_by(|a, b| {
        a.label
            .cmp(&b.label)
            .then(a.position_rank.cmp(&b.position_rank))
    });
    out
}
