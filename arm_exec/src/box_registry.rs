//! # Box Registry
//!
//! Holds the boxes found by the most recent detection pass. Box ids are only meaningful within a
//! single pass, so the registry is always replaced as a whole, never merged.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::{
        cam::CamImage,
        vision::{CameraGeometry, CameraPose, DetectedBox},
    },
    program::Group,
};
use log::info;

use crate::vision::{Vision, VisionError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The boxes found by the last detection pass, in the order the detector reported them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxRegistry {
    boxes: Vec<DetectedBox>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BoxRegistry {
    pub fn new(boxes: Vec<DetectedBox>) -> Self {
        Self { boxes }
    }

    /// Run a detection pass on the image and replace the registry's contents with the result.
    ///
    /// Returns the annotated overlay image. On error the registry is left untouched.
    pub fn detect(
        &mut self,
        vision: &mut dyn Vision,
        image: &CamImage,
        pose: &CameraPose,
        geometry: &CameraGeometry,
    ) -> Result<CamImage, VisionError> {
        let detection = vision.detect_boxes(image, pose, geometry)?;

        info!("Detected {} boxes", detection.boxes.len());

        self.boxes = detection.boxes;

        Ok(detection.overlay)
    }

    pub fn boxes(&self) -> &[DetectedBox] {
        &self.boxes
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Find the first box with the given id.
    pub fn find(&self, id: u32) -> Option<&DetectedBox> {
        self.boxes.iter().find(|b| b.id == id)
    }

    /// All boxes whose id is listed in the group, in registry order.
    pub fn in_group(&self, group: &Group) -> Vec<&DetectedBox> {
        self.boxes
            .iter()
            .filter(|b| group.boxes.contains(&b.id))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::{
        camera_geometry, camera_pose, detected_box, test_image, MockVision,
    };
    use nalgebra::Point3;

    #[test]
    fn test_detect_replaces() {
        let mut registry = BoxRegistry::new(vec![
            detected_box(1, 0.0, 0.0, 0.0),
            detected_box(7, 0.1, 0.0, 0.0),
        ]);

        let pose = camera_pose(Point3::origin(), 0.0);
        let mut vision = MockVision::new(Some(pose.clone()), vec![detected_box(1, 0.5, 0.5, 0.0)]);

        registry
            .detect(&mut vision, &test_image(), &pose, &camera_geometry())
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.find(7).is_none());
        assert_eq!(
            registry.find(1).unwrap().grab_point_m_w,
            Point3::new(0.5, 0.5, 0.0)
        );

        // Nothing detected is a valid result
        vision.boxes.clear();
        registry
            .detect(&mut vision, &test_image(), &pose, &camera_geometry())
            .unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failed_detect_keeps_boxes() {
        let mut registry = BoxRegistry::new(vec![detected_box(3, 0.0, 0.0, 0.0)]);

        let pose = camera_pose(Point3::origin(), 0.0);
        let mut vision = MockVision::new(Some(pose.clone()), vec![]);
        vision.detect_error = Some("no model".into());

        assert!(registry
            .detect(&mut vision, &test_image(), &pose, &camera_geometry())
            .is_err());
        assert!(registry.find(3).is_some());
    }

    #[test]
    fn test_in_group() {
        let registry = BoxRegistry::new(vec![
            detected_box(1, 0.0, 0.0, 0.0),
            detected_box(2, 0.1, 0.0, 0.0),
            detected_box(3, 0.2, 0.0, 0.0),
        ]);

        let group = Group {
            id: "1".into(),
            boxes: vec![3, 1, 42],
            ..Default::default()
        };

        let ids: Vec<u32> = registry.in_group(&group).iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
