use meshmorph_scene::{Axis, AxisSystem, Handedness, PoseTime};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Options of a single import.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ImportSettings {
    pub handedness: Handedness,
    /// The front vector of the target system points along the negative axis.
    pub front_axis: Axis,
    pub up_axis: Axis,
    /// Convert the scene to the target axis system before flattening.
    pub convert_scene: bool,
    /// Deform skinned meshes in their pose at time zero instead of the
    /// authored static pose.
    pub use_t0: bool,
    /// Caller chosen id of the import session. A random one is drawn when unset.
    pub import_id: Option<u64>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            handedness: Handedness::RightHanded,
            front_axis: Axis::X,
            up_axis: Axis::Z,
            convert_scene: true,
            use_t0: false,
            import_id: None,
        }
    }
}

impl ImportSettings {
    pub fn with_handedness(mut self, handedness: Handedness) -> Self {
        self.handedness = handedness;
        self
    }

    pub fn with_front_axis(mut self, axis: Axis) -> Self {
        self.front_axis = axis;
        self
    }

    pub fn with_up_axis(mut self, axis: Axis) -> Self {
        self.up_axis = axis;
        self
    }

    pub fn with_convert_scene(mut self, convert: bool) -> Self {
        self.convert_scene = convert;
        self
    }

    pub fn with_use_t0(mut self, use_t0: bool) -> Self {
        self.use_t0 = use_t0;
        self
    }

    pub fn with_import_id(mut self, id: u64) -> Self {
        self.import_id = Some(id);
        self
    }

    pub fn axis_system(&self) -> AxisSystem {
        AxisSystem::target(self.handedness, self.front_axis, self.up_axis)
    }

    pub fn pose_time(&self) -> PoseTime {
        PoseTime::from_use_t0(self.use_t0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshmorph_scene::SignedAxis;

    #[test]
    fn defaults() {
        let settings = ImportSettings::default();
        let system = settings.axis_system();
        assert_eq!(system.up, SignedAxis::positive(Axis::Z));
        assert_eq!(system.front, SignedAxis::negative(Axis::X));
        assert_eq!(system.handedness, Handedness::RightHanded);
        assert_eq!(settings.pose_time(), PoseTime::Infinite);
        assert_eq!(settings.import_id, None);
    }

    #[test]
    fn builders() {
        let settings = ImportSettings::default()
            .with_handedness(Handedness::LeftHanded)
            .with_front_axis(Axis::Z)
            .with_up_axis(Axis::Y)
            .with_convert_scene(false)
            .with_use_t0(true)
            .with_import_id(7);
        assert_eq!(settings.handedness, Handedness::LeftHanded);
        assert_eq!(settings.axis_system().front, SignedAxis::negative(Axis::Z));
        assert!(!settings.convert_scene);
        assert_eq!(settings.pose_time(), PoseTime::Zero);
        assert_eq!(settings.import_id, Some(7));
    }
}
