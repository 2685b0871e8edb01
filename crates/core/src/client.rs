//! Clients: companies followed by a commercial contact.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DomainResult;
use crate::value_object::non_empty;
use crate::{ClientId, CollaboratorId, Email, Entity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub full_name: String,
    pub email: Email,
    pub phone: String,
    pub company: String,
    pub created_on: NaiveDate,
    pub updated_on: Option<NaiveDate>,
    /// Owning commercial; row-level access for the sales role keys off this.
    pub contact_commercial_id: Option<CollaboratorId>,
}

impl Entity for Client {
    type Id = ClientId;

    fn id(&self) -> ClientId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClient {
    pub full_name: String,
    pub email: Email,
    pub phone: String,
    pub company: String,
    pub created_on: NaiveDate,
    pub contact_commercial_id: Option<CollaboratorId>,
}

impl NewClient {
    pub fn new(
        full_name: &str,
        email: &str,
        phone: &str,
        company: &str,
        created_on: NaiveDate,
        contact_commercial_id: Option<CollaboratorId>,
    ) -> DomainResult<Self> {
        Ok(Self {
            full_name: non_empty("full name", full_name)?,
            email: Email::parse(email)?,
            phone: non_empty("phone", phone)?,
            company: non_empty("company", company)?,
            created_on,
            contact_commercial_id,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientPatch {
    pub full_name: Option<String>,
    pub email: Option<Email>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub contact_commercial_id: Option<CollaboratorId>,
}

impl ClientPatch {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.company.is_none()
            && self.contact_commercial_id.is_none()
    }

    /// Apply the patch and stamp `updated_on`.
    pub fn apply(&self, target: &mut Client, today: NaiveDate) -> DomainResult<()> {
        if let Some(v) = &self.full_name {
            target.full_name = non_empty("full name", v)?;
        }
        if let Some(v) = &self.email {
            target.email = v.clone();
        }
        if let Some(v) = &self.phone {
            target.phone = non_empty("phone", v)?;
        }
        if let Some(v) = &self.company {
            target.company = non_empty("company", v)?;
        }
        if let Some(v) = self.contact_commercial_id {
            target.contact_commercial_id = Some(v);
        }
        target.updated_on = Some(today);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn patch_stamps_update_date() {
        let new = NewClient::new(
            "Kevin Casey",
            "kevin@startup.io",
            "+33 6 12 34 56 78",
            "Cool Startup LLC",
            day(1),
            Some(CollaboratorId::new(1)),
        )
        .unwrap();
        let mut client = Client {
            id: ClientId::new(1),
            full_name: new.full_name,
            email: new.email,
            phone: new.phone,
            company: new.company,
            created_on: new.created_on,
            updated_on: None,
            contact_commercial_id: new.contact_commercial_id,
        };

        let patch = ClientPatch {
            phone: Some("+33 6 00 00 00 00".to_string()),
            ..Default::default()
        };
        patch.apply(&mut client, day(5)).unwrap();

        assert_eq!(client.phone, "+33 6 00 00 00 00");
        assert_eq!(client.updated_on, Some(day(5)));
        assert_eq!(client.created_on, day(1));
    }

    #[test]
    fn blank_company_is_rejected() {
        let err = NewClient::new("Kevin", "kevin@startup.io", "0600", " ", day(1), None).unwrap_err();
        assert!(err.to_string().contains("company"));
    }
}
