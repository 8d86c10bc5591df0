use crate::detect::{ClassKind, ClassMap, Detection};

/// Per-frame lane signal: how many vehicles, and whether an ambulance is present.
///
/// Recomputed from scratch for every frame; nothing carries over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SignalState {
    pub vehicle_count: u32,
    pub ambulance: bool,
}

impl SignalState {
    pub fn aggregate(detections: &[Detection], classes: &ClassMap) -> Self {
        detections
            .iter()
            .fold(Self::default(), |mut state, det| {
                match classes.kind(det.class_id) {
                    ClassKind::Priority => state.ambulance = true,
                    ClassKind::Ordinary => state.vehicle_count += 1,
                }
                state
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, AMBULANCE_CLASS, CAR_CLASS};

    fn det(class_id: u32) -> Detection {
        Detection {
            bbox: BoundingBox::new(0, 0, 10, 10),
            class_id,
            label: String::new(),
            confidence: 0.5,
        }
    }

    #[test]
    fn empty_frame_is_quiet() {
        let state = SignalState::aggregate(&[], &ClassMap::default());
        assert_eq!(state.vehicle_count, 0);
        assert!(!state.ambulance);
    }

    #[test]
    fn priority_class_sets_flag_without_counting() {
        let detections = vec![
            det(CAR_CLASS),
            det(AMBULANCE_CLASS),
            det(CAR_CLASS),
            det(CAR_CLASS),
        ];
        let state = SignalState::aggregate(&detections, &ClassMap::default());
        assert_eq!(state.vehicle_count, 3);
        assert!(state.ambulance);
    }

    #[test]
    fn result_is_order_independent() {
        let classes = ClassMap::default();
        let mut detections = vec![
            det(AMBULANCE_CLASS),
            det(CAR_CLASS),
            det(5),
            det(AMBULANCE_CLASS),
            det(CAR_CLASS),
        ];
        let forward = SignalState::aggregate(&detections, &classes);
        detections.reverse();
        let backward = SignalState::aggregate(&detections, &classes);
        assert_eq!(forward, backward);
        assert_eq!(forward.vehicle_count, 3);
        assert!(forward.ambulance);
    }
}
