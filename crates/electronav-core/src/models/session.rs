//! Session state: the ordered electrode list and the selection cursor.
//!
//! Electrode indices are 0-based positions in the session. Exactly one
//! electrode is selected at any time and the session is never empty.

use crate::error::{ElectronavError, Result};
use crate::models::electrode::{
    DepthComponent, Electrode, ElectrodeHandle, QualityScale, Target,
};
use crate::models::record::{ElectrodeRecord, SessionRecord};
use crate::models::ElectrodeType;
use crate::ports::ElectrodeCatalog;
use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct Session {
    date: NaiveDate,
    subject_id: String,
    electrodes: Vec<Electrode>,
    selected: usize,
    quality: QualityScale,
    next_handle: u64,
}

impl Session {
    /// Start a session with a single electrode of the given type
    pub fn new(
        date: NaiveDate,
        subject_id: impl Into<String>,
        kind: &ElectrodeType,
        quality: QualityScale,
    ) -> Result<Self> {
        let first = Electrode::new(ElectrodeHandle(0), kind)?;
        Ok(Self {
            date,
            subject_id: subject_id.into(),
            electrodes: vec![first],
            selected: 0,
            quality,
            next_handle: 1,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn set_subject_id(&mut self, subject_id: impl Into<String>) {
        self.subject_id = subject_id.into();
    }

    pub fn quality_scale(&self) -> &QualityScale {
        &self.quality
    }

    pub fn len(&self) -> usize {
        self.electrodes.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.electrodes.is_empty()
    }

    pub fn electrodes(&self) -> &[Electrode] {
        &self.electrodes
    }

    pub fn handles(&self) -> Vec<ElectrodeHandle> {
        self.electrodes.iter().map(Electrode::handle).collect()
    }

    pub fn electrode(&self, index: usize) -> Result<&Electrode> {
        let len = self.len();
        self.electrodes.get(index).ok_or_else(|| ElectronavError::out_of_range("electrode", index, len))
    }

    pub fn electrode_mut(&mut self, index: usize) -> Result<&mut Electrode> {
        let len = self.len();
        self.electrodes
            .get_mut(index)
            .ok_or_else(|| ElectronavError::out_of_range("electrode", index, len))
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> &Electrode {
        &self.electrodes[self.selected]
    }

    pub fn selected_mut(&mut self) -> &mut Electrode {
        &mut self.electrodes[self.selected]
    }

    pub fn select_electrode(&mut self, index: usize) -> Result<()> {
        self.electrode(index)?;
        self.selected = index;
        Ok(())
    }

    /// Append an electrode of type `id` and select it
    pub fn add_electrode(&mut self, id: &str, catalog: &dyn ElectrodeCatalog) -> Result<usize> {
        let kind = catalog.lookup(id)?;
        let electrode = Electrode::new(ElectrodeHandle(self.next_handle), &kind)?;
        self.next_handle += 1;
        self.electrodes.push(electrode);
        self.selected = self.electrodes.len() - 1;
        tracing::info!(electrode = id, index = self.selected, "Added electrode");
        Ok(self.selected)
    }

    /// Remove an electrode. Removing the last remaining one is refused.
    pub fn delete_electrode(&mut self, index: usize) -> Result<Electrode> {
        self.electrode(index)?;
        if self.electrodes.len() == 1 {
            return Err(ElectronavError::InvariantViolation(
                "a session must keep at least one electrode".to_string(),
            ));
        }

        let removed = self.electrodes.remove(index);
        if self.selected > index || self.selected >= self.electrodes.len() {
            self.selected = self.selected.saturating_sub(1);
        }
        tracing::info!(electrode = removed.id(), index, "Deleted electrode");
        Ok(removed)
    }

    /// Switch an electrode to another catalog type; a miss leaves it untouched
    pub fn change_electrode_type(
        &mut self,
        index: usize,
        id: &str,
        catalog: &dyn ElectrodeCatalog,
    ) -> Result<()> {
        self.electrode(index)?;
        let kind = catalog.lookup(id)?;
        self.electrodes[index].apply_type(&kind)
    }

    pub fn rate_selected_contact(&mut self, number: usize, rating: i64) -> Result<u32> {
        let scale = self.quality;
        self.selected_mut().rate_contact(number, rating, &scale)
    }

    pub fn to_record(&self) -> SessionRecord {
        let electrodes = self
            .electrodes
            .iter()
            .map(|e| ElectrodeRecord {
                id: e.id().to_string(),
                target_x: e.target().x,
                target_y: e.target().y,
                depth: e.current_depth(),
                guide_length: e.guide_length(),
            })
            .collect();

        let rated = self.electrodes.iter().any(|e| e.contact_data().iter().any(|&r| r > 0));
        let quality = rated
            .then(|| self.electrodes.iter().map(|e| e.contact_data().to_vec()).collect());

        SessionRecord {
            date: self.date,
            subject_id: self.subject_id.clone(),
            electrodes,
            quality,
        }
    }

    /// Replace the whole electrode list from a stored record.
    ///
    /// Electrodes are rebuilt off to the side and swapped in only when every
    /// one of them is valid. Surviving positions keep their handles; the
    /// handles of surplus electrodes are returned for disposal.
    pub fn load_from(
        &mut self,
        record: &SessionRecord,
        catalog: &dyn ElectrodeCatalog,
    ) -> Result<Vec<ElectrodeHandle>> {
        if record.electrodes.is_empty() {
            return Err(ElectronavError::invalid("session record", "contains no electrodes"));
        }
        if let Some(quality) = &record.quality {
            if quality.len() != record.electrodes.len() {
                return Err(ElectronavError::invalid(
                    "session record",
                    format!(
                        "quality matrix has {} rows for {} electrodes",
                        quality.len(),
                        record.electrodes.len()
                    ),
                ));
            }
        }

        let mut next_handle = self.next_handle;
        let mut rebuilt = Vec::with_capacity(record.electrodes.len());
        for (position, params) in record.electrodes.iter().enumerate() {
            let handle = match self.electrodes.get(position) {
                Some(existing) => existing.handle(),
                None => {
                    next_handle += 1;
                    ElectrodeHandle(next_handle - 1)
                }
            };

            let kind = catalog.lookup(&params.id)?;
            let mut electrode = Electrode::new(handle, &kind)?;
            electrode.set_target(Target::new(params.target_x, params.target_y))?;
            electrode.set_depth(DepthComponent::Start, params.depth)?;
            electrode.set_guide_length(params.guide_length)?;

            if let Some(row) = record.quality.as_ref().map(|q| &q[position]) {
                if !row.is_empty() {
                    electrode.resize_contacts(row.len())?;
                    let ratings: Vec<i64> = row.iter().map(|&r| r as i64).collect();
                    electrode.restore_ratings(&ratings, &self.quality)?;
                }
            }
            rebuilt.push(electrode);
        }

        let removed: Vec<ElectrodeHandle> =
            self.electrodes.iter().skip(rebuilt.len()).map(Electrode::handle).collect();

        self.electrodes = rebuilt;
        self.next_handle = next_handle;
        self.date = record.date;
        self.subject_id = record.subject_id.clone();
        self.selected = self.selected.min(self.electrodes.len() - 1);

        tracing::info!(
            date = %record.date,
            electrodes = self.electrodes.len(),
            removed = removed.len(),
            "Loaded session parameters"
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ElectrodeColors;

    struct TwoTypes;

    impl ElectrodeCatalog for TwoTypes {
        fn lookup(&self, id: &str) -> Result<ElectrodeType> {
            let contacts = match id {
                "A8" => 8,
                "B2" => 2,
                _ => return Err(ElectronavError::UnknownElectrodeType { id: id.to_string() }),
            };
            Ok(ElectrodeType {
                id: id.to_string(),
                diameter: 0.2,
                tip_length: 0.5,
                contact_diameter: 0.02,
                contact_spacing: 0.1,
                default_contact_number: contacts,
                colors: ElectrodeColors::default(),
            })
        }

        fn list(&self) -> Vec<ElectrodeType> {
            vec![self.lookup("A8").unwrap(), self.lookup("B2").unwrap()]
        }
    }

    fn session() -> Session {
        let kind = TwoTypes.lookup("A8").unwrap();
        Session::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            "M1",
            &kind,
            QualityScale::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_add_selects_new_electrode() {
        let mut s = session();
        let index = s.add_electrode("B2", &TwoTypes).unwrap();
        assert_eq!(index, 1);
        assert_eq!(s.selected_index(), 1);
        assert_eq!(s.selected().contact_number(), 2);
        assert_ne!(s.electrodes()[0].handle(), s.electrodes()[1].handle());
    }

    #[test]
    fn test_add_unknown_type_leaves_session() {
        let mut s = session();
        let err = s.add_electrode("ZZ", &TwoTypes).unwrap_err();
        assert!(matches!(err, ElectronavError::UnknownElectrodeType { .. }));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_delete_adjusts_selection() {
        let mut s = session();
        s.add_electrode("B2", &TwoTypes).unwrap();
        s.add_electrode("B2", &TwoTypes).unwrap();
        s.select_electrode(2).unwrap();
        s.delete_electrode(0).unwrap();
        assert_eq!(s.selected_index(), 1);

        s.delete_electrode(1).unwrap();
        assert_eq!(s.selected_index(), 0);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_delete_last_electrode_is_refused() {
        let mut s = session();
        let before = s.handles();
        let err = s.delete_electrode(0).unwrap_err();
        assert!(matches!(err, ElectronavError::InvariantViolation(_)));
        assert_eq!(s.handles(), before);
    }

    #[test]
    fn test_select_out_of_range() {
        let mut s = session();
        assert!(matches!(s.select_electrode(1), Err(ElectronavError::OutOfRange { .. })));
        assert_eq!(s.selected_index(), 0);
    }

    #[test]
    fn test_change_type_miss_retains_parameters() {
        let mut s = session();
        assert!(s.change_electrode_type(0, "nope", &TwoTypes).is_err());
        assert_eq!(s.selected().id(), "A8");
        assert_eq!(s.selected().contact_number(), 8);

        s.change_electrode_type(0, "B2", &TwoTypes).unwrap();
        assert_eq!(s.selected().contact_number(), 2);
    }

    #[test]
    fn test_record_round_trip_through_load() {
        let mut s = session();
        s.selected_mut().set_target(Target::new(1.0, -2.0)).unwrap();
        s.selected_mut().set_total_depth(7.5).unwrap();
        s.rate_selected_contact(3, 2).unwrap();
        s.add_electrode("B2", &TwoTypes).unwrap();
        let record = s.to_record();
        assert_eq!(record.electrode_count(), 2);
        assert_eq!(record.quality.as_ref().unwrap()[0][2], 2);

        let mut other = session();
        let removed = other.load_from(&record, &TwoTypes).unwrap();
        assert!(removed.is_empty());
        assert_eq!(other.len(), 2);
        assert_eq!(other.electrodes()[0].current_depth(), 7.5);
        assert_eq!(other.electrodes()[0].rating(3).unwrap(), 2);
        assert_eq!(other.electrodes()[1].id(), "B2");
    }

    #[test]
    fn test_load_reports_surplus_handles() {
        let mut s = session();
        s.add_electrode("B2", &TwoTypes).unwrap();
        s.add_electrode("B2", &TwoTypes).unwrap();
        let handles = s.handles();

        let record = SessionRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            subject_id: "M1".to_string(),
            electrodes: vec![ElectrodeRecord {
                id: "A8".to_string(),
                target_x: 0.0,
                target_y: 0.0,
                depth: 4.0,
                guide_length: 10.0,
            }],
            quality: None,
        };
        let removed = s.load_from(&record, &TwoTypes).unwrap();
        assert_eq!(removed, handles[1..].to_vec());
        assert_eq!(s.handles(), vec![handles[0]]);
        assert_eq!(s.selected_index(), 0);
    }

    #[test]
    fn test_load_is_atomic_on_unknown_type() {
        let mut s = session();
        s.selected_mut().set_total_depth(3.0).unwrap();
        let record = SessionRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            subject_id: "M2".to_string(),
            electrodes: vec![
                ElectrodeRecord {
                    id: "B2".to_string(),
                    target_x: 1.0,
                    target_y: 1.0,
                    depth: 1.0,
                    guide_length: 1.0,
                },
                ElectrodeRecord {
                    id: "missing".to_string(),
                    target_x: 0.0,
                    target_y: 0.0,
                    depth: 0.0,
                    guide_length: 0.0,
                },
            ],
            quality: None,
        };
        assert!(s.load_from(&record, &TwoTypes).is_err());
        assert_eq!(s.len(), 1);
        assert_eq!(s.subject_id(), "M1");
        assert_eq!(s.selected().current_depth(), 3.0);
    }
}
