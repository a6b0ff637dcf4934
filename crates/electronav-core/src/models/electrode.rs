//! Per-electrode state: target, depth, geometry, and contact ratings.
//!
//! Contacts are numbered from 1, starting at the contact nearest the tip.
//! All positions returned here are grid-local (chamber) millimetres; the
//! world-space placement lives in `electronav-geo`.

use crate::error::{ensure_finite, ElectronavError, Result};
use serde::{Deserialize, Serialize};

/// Grid-local target coordinate; may sit between holes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Target {
    pub x: f64,
    pub y: f64,
}

impl Target {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Stable identifier issued by the session; rendering resources are keyed by it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElectrodeHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepthComponent {
    /// Manual offset at the start of the penetration
    Start,
    /// Microdrive travel
    Microdrive,
}

/// Contact selection cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactSelection {
    Contact(usize),
    Tip,
}

/// Display colours (RGB, 0..1) supplied by the electrode catalog
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElectrodeColors {
    pub shaft: [f32; 3],
    pub tip: [f32; 3],
    pub contact: [f32; 3],
}

impl Default for ElectrodeColors {
    fn default() -> Self {
        Self { shaft: [0.6, 0.6, 0.6], tip: [0.2, 0.2, 0.2], contact: [1.0, 0.8, 0.0] }
    }
}

/// Catalog entry describing one electrode model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectrodeType {
    pub id: String,
    pub diameter: f64,
    pub tip_length: f64,
    pub contact_diameter: f64,
    pub contact_spacing: f64,
    pub default_contact_number: usize,
    #[serde(default)]
    pub colors: ElectrodeColors,
}

impl ElectrodeType {
    pub fn validate(&self) -> Result<()> {
        let what = format!("electrode type {}", self.id);
        for (name, value) in [
            ("diameter", self.diameter),
            ("tip_length", self.tip_length),
            ("contact_diameter", self.contact_diameter),
            ("contact_spacing", self.contact_spacing),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ElectronavError::invalid(
                    &what,
                    format!("{} must be a non-negative number, got {}", name, value),
                ));
            }
        }
        if self.default_contact_number == 0 {
            return Err(ElectronavError::invalid(&what, "at least one contact is required"));
        }
        Ok(())
    }
}

/// Physical dimensions of the electrode currently in use (mm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElectrodeGeometry {
    pub diameter: f64,
    pub tip_length: f64,
    pub contact_diameter: f64,
    pub contact_spacing: f64,
    pub contact_number: usize,
}

impl From<&ElectrodeType> for ElectrodeGeometry {
    fn from(kind: &ElectrodeType) -> Self {
        Self {
            diameter: kind.diameter,
            tip_length: kind.tip_length,
            contact_diameter: kind.contact_diameter,
            contact_spacing: kind.contact_spacing,
            contact_number: kind.default_contact_number,
        }
    }
}

/// Number of discrete quality ratings (the size of the quality colour map)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityScale {
    levels: usize,
}

impl QualityScale {
    pub fn new(levels: usize) -> Result<Self> {
        if levels == 0 {
            return Err(ElectronavError::invalid("quality scale", "needs at least one level"));
        }
        Ok(Self { levels })
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Highest storable rating (`K - 1`)
    pub fn max_rating(&self) -> u32 {
        (self.levels - 1) as u32
    }

    /// Saturate any requested rating into `0..=K-1`
    pub fn saturate(&self, rating: i64) -> u32 {
        rating.clamp(0, self.max_rating() as i64) as u32
    }
}

impl Default for QualityScale {
    fn default() -> Self {
        Self { levels: 5 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Electrode {
    handle: ElectrodeHandle,
    id: String,
    target: Target,
    start_depth: f64,
    microdrive_depth: f64,
    current_depth: f64,
    guide_length: f64,
    geometry: ElectrodeGeometry,
    colors: ElectrodeColors,
    contact_data: Vec<u32>,
    selection: ContactSelection,
}

impl Electrode {
    /// New electrode at the grid origin with zero depth
    pub fn new(handle: ElectrodeHandle, kind: &ElectrodeType) -> Result<Self> {
        kind.validate()?;
        Ok(Self {
            handle,
            id: kind.id.clone(),
            target: Target::default(),
            start_depth: 0.0,
            microdrive_depth: 0.0,
            current_depth: 0.0,
            guide_length: 0.0,
            geometry: ElectrodeGeometry::from(kind),
            colors: kind.colors,
            contact_data: vec![0; kind.default_contact_number],
            selection: ContactSelection::Contact(1),
        })
    }

    pub fn handle(&self) -> ElectrodeHandle {
        self.handle
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn start_depth(&self) -> f64 {
        self.start_depth
    }

    pub fn microdrive_depth(&self) -> f64 {
        self.microdrive_depth
    }

    pub fn current_depth(&self) -> f64 {
        self.current_depth
    }

    /// True while a directly entered total depth differs from the component sum
    pub fn depth_overridden(&self) -> bool {
        self.current_depth != self.start_depth + self.microdrive_depth
    }

    pub fn guide_length(&self) -> f64 {
        self.guide_length
    }

    pub fn geometry(&self) -> &ElectrodeGeometry {
        &self.geometry
    }

    pub fn colors(&self) -> &ElectrodeColors {
        &self.colors
    }

    pub fn contact_number(&self) -> usize {
        self.geometry.contact_number
    }

    pub fn contact_data(&self) -> &[u32] {
        &self.contact_data
    }

    pub fn selection(&self) -> ContactSelection {
        self.selection
    }

    pub fn set_target(&mut self, target: Target) -> Result<()> {
        ensure_finite("target x", target.x)?;
        ensure_finite("target y", target.y)?;
        self.target = target;
        Ok(())
    }

    /// Edit one depth component; the total is recomputed from both components
    pub fn set_depth(&mut self, component: DepthComponent, value: f64) -> Result<()> {
        let value = ensure_finite("depth", value)?;
        match component {
            DepthComponent::Start => self.start_depth = value,
            DepthComponent::Microdrive => self.microdrive_depth = value,
        }
        self.current_depth = self.start_depth + self.microdrive_depth;
        Ok(())
    }

    /// Override the total depth without touching either component.
    ///
    /// The override holds until the next `set_depth` call.
    pub fn set_total_depth(&mut self, value: f64) -> Result<()> {
        self.current_depth = ensure_finite("total depth", value)?;
        Ok(())
    }

    pub fn set_guide_length(&mut self, value: f64) -> Result<()> {
        let value = ensure_finite("guide length", value)?;
        if value < 0.0 {
            return Err(ElectronavError::invalid("guide length", "must not be negative"));
        }
        self.guide_length = value;
        Ok(())
    }

    /// Grow with zero ratings or drop trailing ratings; clamps the cursor
    pub fn resize_contacts(&mut self, n: usize) -> Result<()> {
        if n == 0 {
            return Err(ElectronavError::invalid("contact count", "must be at least 1"));
        }
        self.contact_data.resize(n, 0);
        self.geometry.contact_number = n;
        if let ContactSelection::Contact(i) = self.selection {
            if i > n {
                self.selection = ContactSelection::Contact(n);
            }
        }
        Ok(())
    }

    /// Store a rating for contact `number`, saturated into the scale
    pub fn rate_contact(&mut self, number: usize, rating: i64, scale: &QualityScale) -> Result<u32> {
        let slot = self.contact_slot(number)?;
        let stored = scale.saturate(rating);
        self.contact_data[slot] = stored;
        Ok(stored)
    }

    pub fn rating(&self, number: usize) -> Result<u32> {
        Ok(self.contact_data[self.contact_slot(number)?])
    }

    pub fn select_contact(&mut self, number: usize) -> Result<()> {
        self.contact_slot(number)?;
        self.selection = ContactSelection::Contact(number);
        Ok(())
    }

    pub fn select_tip(&mut self) {
        self.selection = ContactSelection::Tip;
    }

    /// Switch to another electrode model. Ratings follow the resize policy.
    pub fn apply_type(&mut self, kind: &ElectrodeType) -> Result<()> {
        kind.validate()?;
        self.resize_contacts(kind.default_contact_number)?;
        self.id = kind.id.clone();
        self.geometry = ElectrodeGeometry::from(kind);
        self.colors = kind.colors;
        Ok(())
    }

    /// Replace all ratings at once, saturating each value. Length must match.
    pub fn restore_ratings(&mut self, ratings: &[i64], scale: &QualityScale) -> Result<()> {
        if ratings.len() != self.contact_number() {
            return Err(ElectronavError::invalid(
                "contact ratings",
                format!("expected {} values, got {}", self.contact_number(), ratings.len()),
            ));
        }
        self.contact_data = ratings.iter().map(|&r| scale.saturate(r)).collect();
        Ok(())
    }

    pub fn tip_local_position(&self) -> [f64; 3] {
        [self.target.x, self.target.y, -self.current_depth]
    }

    pub fn contact_local_position(&self, number: usize) -> Result<[f64; 3]> {
        self.contact_slot(number)?;
        let z = -self.current_depth
            + self.geometry.tip_length
            + (number - 1) as f64 * self.geometry.contact_spacing;
        Ok([self.target.x, self.target.y, z])
    }

    /// Guide tube from the grid surface down to its own length
    pub fn guide_local_segment(&self) -> ([f64; 3], [f64; 3]) {
        let top = [self.target.x, self.target.y, 0.0];
        let bottom = [self.target.x, self.target.y, -self.guide_length];
        (top, bottom)
    }

    /// Position of the selected contact, or of the tip
    pub fn selected_local_position(&self) -> [f64; 3] {
        match self.selection {
            ContactSelection::Contact(n) => self
                .contact_local_position(n)
                .unwrap_or_else(|_| self.tip_local_position()),
            ContactSelection::Tip => self.tip_local_position(),
        }
    }

    fn contact_slot(&self, number: usize) -> Result<usize> {
        if number == 0 || number > self.contact_number() {
            return Err(ElectronavError::out_of_range("contact", number, self.contact_number()));
        }
        Ok(number - 1)
    }
}
