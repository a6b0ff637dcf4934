//! End-to-end session scenarios driven through the public model API

use chrono::NaiveDate;
use electronav_core::models::{
    ContactSelection, DepthComponent, ElectrodeColors, ElectrodeType, QualityScale, Session,
};
use electronav_core::ports::ElectrodeCatalog;
use electronav_core::{ElectronavError, Result};
use proptest::prelude::*;

struct PlexonOnly;

impl ElectrodeCatalog for PlexonOnly {
    fn lookup(&self, id: &str) -> Result<ElectrodeType> {
        if id != "PLX24" {
            return Err(ElectronavError::UnknownElectrodeType { id: id.to_string() });
        }
        Ok(ElectrodeType {
            id: "PLX24".to_string(),
            diameter: 0.185,
            tip_length: 0.3,
            contact_diameter: 0.015,
            contact_spacing: 0.1,
            default_contact_number: 24,
            colors: ElectrodeColors::default(),
        })
    }

    fn list(&self) -> Vec<ElectrodeType> {
        self.lookup("PLX24").into_iter().collect()
    }
}

fn start_session(levels: usize) -> Session {
    let kind = PlexonOnly.lookup("PLX24").unwrap();
    Session::new(
        NaiveDate::from_ymd_opt(2024, 5, 14).unwrap(),
        "Subject-A",
        &kind,
        QualityScale::new(levels).unwrap(),
    )
    .unwrap()
}

#[test]
fn test_single_plexon_session() {
    let mut session = start_session(5);
    assert_eq!(session.len(), 1);
    assert_eq!(session.selected().contact_number(), 24);
    assert_eq!(session.selected().current_depth(), 0.0);

    let electrode = session.selected_mut();
    electrode.set_depth(DepthComponent::Start, 10.0).unwrap();
    electrode.set_depth(DepthComponent::Microdrive, 2.5).unwrap();
    assert_eq!(session.selected().current_depth(), 12.5);

    let stored = session.rate_selected_contact(5, 7).unwrap();
    assert_eq!(stored, 4);

    let before: Vec<u32> = session.selected().contact_data().to_vec();
    session.selected_mut().select_contact(10).unwrap();
    session.selected_mut().resize_contacts(16).unwrap();

    let electrode = session.selected();
    assert_eq!(electrode.contact_data().len(), 16);
    assert_eq!(electrode.contact_data(), &before[..16]);
    assert_eq!(electrode.rating(5).unwrap(), 4);
    assert_eq!(electrode.selection(), ContactSelection::Contact(10));
}

#[test]
fn test_resize_clamps_cursor_past_new_count() {
    let mut session = start_session(5);
    session.selected_mut().select_contact(20).unwrap();
    session.selected_mut().resize_contacts(16).unwrap();
    assert_eq!(session.selected().selection(), ContactSelection::Contact(16));
}

#[test]
fn test_deleting_sole_electrode_keeps_list() {
    let mut session = start_session(5);
    let before = session.handles();
    let err = session.delete_electrode(0).unwrap_err();
    assert!(matches!(err, ElectronavError::InvariantViolation(_)));
    assert_eq!(session.handles(), before);
    assert_eq!(session.len(), 1);
}

#[test]
fn test_history_record_carries_depth_and_ratings() {
    let mut session = start_session(5);
    session.selected_mut().set_total_depth(4.25).unwrap();
    session.selected_mut().set_guide_length(12.0).unwrap();
    session.rate_selected_contact(1, 3).unwrap();

    let record = session.to_record();
    assert_eq!(record.subject_id, "Subject-A");
    assert_eq!(record.electrodes[0].depth, 4.25);
    assert_eq!(record.electrodes[0].guide_length, 12.0);
    assert_eq!(record.quality.as_ref().unwrap()[0].len(), 24);

    let unrated = start_session(5).to_record();
    assert!(unrated.quality.is_none());
}

proptest! {
    #[test]
    fn rating_always_saturates(levels in 1usize..12, rating in any::<i64>(), contact in 1usize..=24) {
        let mut session = start_session(levels);
        let stored = session.rate_selected_contact(contact, rating).unwrap();
        prop_assert!((stored as usize) < levels);
        prop_assert_eq!(session.selected().rating(contact).unwrap(), stored);
    }

    #[test]
    fn shrink_then_grow_zero_fills(n in 2usize..40, m in 1usize..40) {
        prop_assume!(m < n);
        let mut session = start_session(5);
        let electrode = session.selected_mut();
        electrode.resize_contacts(n).unwrap();
        let scale = QualityScale::new(5).unwrap();
        for contact in 1..=n {
            electrode.rate_contact(contact, 1 + (contact as i64 % 4), &scale).unwrap();
        }
        electrode.resize_contacts(m).unwrap();
        electrode.resize_contacts(n).unwrap();
        prop_assert!(electrode.contact_data()[m..].iter().all(|&r| r == 0));
        prop_assert!(electrode.contact_data()[..m].iter().all(|&r| r > 0));
    }
}
