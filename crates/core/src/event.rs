//! Events organised for a client under a signed contract.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::non_empty;
use crate::{ClientId, CollaboratorId, ContractId, Entity, EventId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub contract_id: ContractId,
    pub client_id: ClientId,
    /// Support collaborator in charge; `None` until management assigns one.
    pub support_contact_id: Option<CollaboratorId>,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub location: String,
    pub attendees: u32,
    pub expected_attendees: Option<u32>,
    pub notes: Option<String>,
}

impl Entity for Event {
    type Id = EventId;

    fn id(&self) -> EventId {
        self.id
    }
}

fn check_window(starts_at: NaiveDateTime, ends_at: NaiveDateTime) -> DomainResult<()> {
    if ends_at < starts_at {
        return Err(DomainError::validation(format!(
            "event ends ({ends_at}) before it starts ({starts_at})"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub contract_id: ContractId,
    pub client_id: ClientId,
    pub support_contact_id: Option<CollaboratorId>,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub location: String,
    pub attendees: u32,
    pub expected_attendees: Option<u32>,
    pub notes: Option<String>,
}

impl NewEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        contract_id: ContractId,
        client_id: ClientId,
        support_contact_id: Option<CollaboratorId>,
        starts_at: NaiveDateTime,
        ends_at: NaiveDateTime,
        location: &str,
        attendees: u32,
        expected_attendees: Option<u32>,
        notes: Option<String>,
    ) -> DomainResult<Self> {
        check_window(starts_at, ends_at)?;
        Ok(Self {
            contract_id,
            client_id,
            support_contact_id,
            starts_at,
            ends_at,
            location: non_empty("location", location)?,
            attendees,
            expected_attendees,
            notes: notes.filter(|n| !n.trim().is_empty()),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub support_contact_id: Option<CollaboratorId>,
    pub starts_at: Option<NaiveDateTime>,
    pub ends_at: Option<NaiveDateTime>,
    pub location: Option<String>,
    pub attendees: Option<u32>,
    pub expected_attendees: Option<u32>,
    pub notes: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.support_contact_id.is_none()
            && self.starts_at.is_none()
            && self.ends_at.is_none()
            && self.location.is_none()
            && self.attendees.is_none()
            && self.expected_attendees.is_none()
            && self.notes.is_none()
    }

    pub fn apply(&self, target: &mut Event) -> DomainResult<()> {
        let starts_at = self.starts_at.unwrap_or(target.starts_at);
        let ends_at = self.ends_at.unwrap_or(target.ends_at);
        check_window(starts_at, ends_at)?;

        if let Some(location) = &self.location {
            target.location = non_empty("location", location)?;
        }
        target.starts_at = starts_at;
        target.ends_at = ends_at;
        if let Some(v) = self.support_contact_id {
            target.support_contact_id = Some(v);
        }
        if let Some(v) = self.attendees {
            target.attendees = v;
        }
        if let Some(v) = self.expected_attendees {
            target.expected_attendees = Some(v);
        }
        if let Some(v) = &self.notes {
            target.notes = Some(v.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 4)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn event_cannot_end_before_it_starts() {
        let err = NewEvent::new(
            ContractId::new(1),
            ClientId::new(1),
            None,
            at(18),
            at(13),
            "53 Rue du Château, 41120 Candé-sur-Beuvron",
            75,
            None,
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("before it starts"));
    }

    #[test]
    fn patch_revalidates_window() {
        let new = NewEvent::new(
            ContractId::new(1),
            ClientId::new(1),
            None,
            at(13),
            at(18),
            "Candé-sur-Beuvron",
            75,
            Some(80),
            Some("  ".to_string()),
        )
        .unwrap();
        assert_eq!(new.notes, None);

        let mut event = Event {
            id: EventId::new(1),
            contract_id: new.contract_id,
            client_id: new.client_id,
            support_contact_id: new.support_contact_id,
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            location: new.location,
            attendees: new.attendees,
            expected_attendees: new.expected_attendees,
            notes: new.notes,
        };

        let bad = EventPatch {
            starts_at: Some(at(20)),
            ..Default::default()
        };
        assert!(bad.apply(&mut event).is_err());
        assert_eq!(event.starts_at, at(13));

        let assign = EventPatch {
            support_contact_id: Some(CollaboratorId::new(3)),
            attendees: Some(80),
            ..Default::default()
        };
        assign.apply(&mut event).unwrap();
        assert_eq!(event.support_contact_id, Some(CollaboratorId::new(3)));
        assert_eq!(event.attendees, 80);
    }
}
