//! World-space electrode geometry.
//!
//! Electrodes live in chamber-local coordinates (grid plane at `z = 0`, depth
//! running towards negative `z`). This module pushes those positions through
//! the chamber transform so the rendering layer can draw shafts, tips and
//! contacts without knowing anything about the grid.

use crate::transform::RigidTransform;
use electronav_core::models::{ContactSelection, Electrode, ElectrodeColors, ElectrodeHandle, Session};
use electronav_core::Result;
use serde::Serialize;

/// A straight piece of electrode between two world points
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub start: [f64; 3],
    pub end: [f64; 3],
}

impl Segment {
    pub fn length(&self) -> f64 {
        (0..3)
            .map(|k| (self.end[k] - self.start[k]).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactGlyph {
    /// 1-based contact number
    pub number: usize,
    pub centre: [f64; 3],
    pub rating: u32,
    pub selected: bool,
}

/// Everything the renderer needs to draw one electrode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElectrodeWorldGeometry {
    pub handle: ElectrodeHandle,
    pub guide: Segment,
    pub shaft: Segment,
    pub tip: Segment,
    pub contacts: Vec<ContactGlyph>,
    pub diameter: f64,
    pub contact_diameter: f64,
    pub colors: ElectrodeColors,
}

/// Extension trait placing an electrode in scanner space
pub trait ElectrodePlacement {
    /// World position of contact `number` (1-based)
    fn contact_world_position(&self, number: usize, transform: &RigidTransform) -> Result<[f64; 3]>;

    fn tip_world_position(&self, transform: &RigidTransform) -> [f64; 3];

    fn world_geometry(&self, transform: &RigidTransform) -> ElectrodeWorldGeometry;
}

impl ElectrodePlacement for Electrode {
    fn contact_world_position(&self, number: usize, transform: &RigidTransform) -> Result<[f64; 3]> {
        let local = self.contact_local_position(number)?;
        Ok(transform.apply_point(local))
    }

    fn tip_world_position(&self, transform: &RigidTransform) -> [f64; 3] {
        transform.apply_point(self.tip_local_position())
    }

    fn world_geometry(&self, transform: &RigidTransform) -> ElectrodeWorldGeometry {
        let geometry = self.geometry();
        let target = self.target();
        let tip_local = self.tip_local_position();
        let tip_base = [target.x, target.y, tip_local[2] + geometry.tip_length];

        let (guide_top, guide_bottom) = self.guide_local_segment();
        let guide = Segment {
            start: transform.apply_point(guide_top),
            end: transform.apply_point(guide_bottom),
        };
        let shaft = Segment {
            start: transform.apply_point([target.x, target.y, 0.0]),
            end: transform.apply_point(tip_base),
        };
        let tip = Segment {
            start: transform.apply_point(tip_base),
            end: transform.apply_point(tip_local),
        };

        let ratings = self.contact_data();
        let contacts = ratings
            .iter()
            .enumerate()
            .filter_map(|(i, &rating)| {
                let number = i + 1;
                let centre = self.contact_world_position(number, transform).ok()?;
                Some(ContactGlyph {
                    number,
                    centre,
                    rating,
                    selected: self.selection() == ContactSelection::Contact(number),
                })
            })
            .collect();

        ElectrodeWorldGeometry {
            handle: self.handle(),
            guide,
            shaft,
            tip,
            contacts,
            diameter: geometry.diameter,
            contact_diameter: geometry.contact_diameter,
            colors: *self.colors(),
        }
    }
}

/// World point the slice views follow: the selected contact of the selected
/// electrode, or its tip when the tip is selected.
pub fn focus_point(session: &Session, transform: &RigidTransform) -> [f64; 3] {
    transform.apply_point(session.selected().selected_local_position())
}

/// Geometry for every electrode in session order
pub fn session_geometry(session: &Session, transform: &RigidTransform) -> Vec<ElectrodeWorldGeometry> {
    session
        .electrodes()
        .iter()
        .map(|electrode| electrode.world_geometry(transform))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use electronav_core::models::{ElectrodeType, Target};

    fn probe() -> ElectrodeType {
        ElectrodeType {
            id: "T4".to_string(),
            diameter: 0.2,
            tip_length: 1.0,
            contact_diameter: 0.02,
            contact_spacing: 0.5,
            default_contact_number: 4,
            colors: ElectrodeColors::default(),
        }
    }

    fn placed() -> Electrode {
        let mut electrode = Electrode::new(ElectrodeHandle(3), &probe()).unwrap();
        electrode.set_target(Target::new(1.0, -1.0)).unwrap();
        electrode.set_total_depth(10.0).unwrap();
        electrode.set_guide_length(4.0).unwrap();
        electrode
    }

    #[test]
    fn test_identity_placement_matches_local() {
        let electrode = placed();
        let identity = RigidTransform::identity();
        assert_eq!(electrode.tip_world_position(&identity), [1.0, -1.0, -10.0]);
        assert_eq!(electrode.contact_world_position(1, &identity).unwrap(), [1.0, -1.0, -9.0]);
        assert_eq!(electrode.contact_world_position(3, &identity).unwrap(), [1.0, -1.0, -8.0]);
    }

    #[test]
    fn test_contact_outside_range_rejected() {
        let electrode = placed();
        let identity = RigidTransform::identity();
        assert!(electrode.contact_world_position(0, &identity).is_err());
        assert!(electrode.contact_world_position(5, &identity).is_err());
    }

    #[test]
    fn test_world_geometry_segments() {
        let mut electrode = placed();
        electrode.select_contact(2).unwrap();
        let transform = RigidTransform::translation(0.0, 0.0, 5.0);
        let geometry = electrode.world_geometry(&transform);

        assert_eq!(geometry.handle, ElectrodeHandle(3));
        assert_eq!(geometry.guide.start, [1.0, -1.0, 5.0]);
        assert_eq!(geometry.guide.end, [1.0, -1.0, 1.0]);
        assert_eq!(geometry.shaft.end, [1.0, -1.0, -4.0]);
        assert_eq!(geometry.tip.end, [1.0, -1.0, -5.0]);
        assert!((geometry.tip.length() - 1.0).abs() < 1e-12);
        assert_eq!(geometry.contacts.len(), 4);
        let selected: Vec<usize> =
            geometry.contacts.iter().filter(|c| c.selected).map(|c| c.number).collect();
        assert_eq!(selected, vec![2]);
    }
}
