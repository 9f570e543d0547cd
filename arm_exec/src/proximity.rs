//! # Proximity Selection

use comms_if::eqpt::vision::DetectedBox;
use nalgebra::Point3;

/// Return the box whose grab point is closest to `reference_m_w`.
///
/// When several boxes are equally close the first one wins. `None` is returned only if there are
/// no boxes.
pub fn nearest<'a, I>(boxes: I, reference_m_w: &Point3<f64>) -> Option<&'a DetectedBox>
where
    I: IntoIterator<Item = &'a DetectedBox>,
{
    let mut best: Option<(&DetectedBox, f64)> = None;

    for b in boxes {
        let dist_m = (b.grab_point_m_w - reference_m_w).norm();

        match best {
            Some((_, best_dist_m)) if dist_m >= best_dist_m => (),
            _ => best = Some((b, dist_m)),
        }
    }

    best.map(|(b, _)| b)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::detected_box;

    #[test]
    fn test_nearest() {
        let boxes = vec![
            detected_box(1, 0.3, 0.0, 0.0),
            detected_box(2, 0.1, 0.1, 0.0),
            detected_box(3, -0.2, 0.0, 0.0),
        ];

        assert_eq!(nearest(&boxes, &Point3::origin()).unwrap().id, 2);
        assert_eq!(nearest(&boxes, &Point3::new(0.3, 0.0, 0.0)).unwrap().id, 1);
        assert!(nearest(&Vec::<DetectedBox>::new(), &Point3::origin()).is_none());
    }

    #[test]
    fn test_first_wins_ties() {
        let boxes = vec![
            detected_box(5, 0.1, 0.0, 0.0),
            detected_box(4, -0.1, 0.0, 0.0),
            detected_box(9, 0.0, 0.1, 0.0),
        ];

        assert_eq!(nearest(&boxes, &Point3::origin()).unwrap().id, 5);

        // Order decides, not the id
        let reversed: Vec<_> = boxes.iter().rev().collect();
        assert_eq!(nearest(reversed, &Point3::origin()).unwrap().id, 9);
    }
}
