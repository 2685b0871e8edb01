//! Contracts between the company and a client.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::{ClientId, CollaboratorId, ContractId, Entity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub client_id: ClientId,
    pub contact_commercial_id: CollaboratorId,
    pub total_amount: f64,
    pub remaining_amount: f64,
    pub created_on: NaiveDate,
    /// Events can only be attached to signed contracts.
    pub signed: bool,
}

impl Entity for Contract {
    type Id = ContractId;

    fn id(&self) -> ContractId {
        self.id
    }
}

fn check_amounts(total: f64, remaining: f64) -> DomainResult<()> {
    if !total.is_finite() || !remaining.is_finite() {
        return Err(DomainError::validation("amounts must be finite numbers"));
    }
    if total < 0.0 || remaining < 0.0 {
        return Err(DomainError::validation("amounts cannot be negative"));
    }
    if remaining > total {
        return Err(DomainError::invariant(format!(
            "remaining amount ({remaining}) exceeds total amount ({total})"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewContract {
    pub client_id: ClientId,
    pub contact_commercial_id: CollaboratorId,
    pub total_amount: f64,
    pub remaining_amount: f64,
    pub created_on: NaiveDate,
    pub signed: bool,
}

impl NewContract {
    pub fn new(
        client_id: ClientId,
        contact_commercial_id: CollaboratorId,
        total_amount: f64,
        remaining_amount: f64,
        created_on: NaiveDate,
        signed: bool,
    ) -> DomainResult<Self> {
        check_amounts(total_amount, remaining_amount)?;
        Ok(Self {
            client_id,
            contact_commercial_id,
            total_amount,
            remaining_amount,
            created_on,
            signed,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractPatch {
    pub total_amount: Option<f64>,
    pub remaining_amount: Option<f64>,
    pub signed: Option<bool>,
    pub contact_commercial_id: Option<CollaboratorId>,
}

impl ContractPatch {
    pub fn is_empty(&self) -> bool {
        self.total_amount.is_none()
            && self.remaining_amount.is_none()
            && self.signed.is_none()
            && self.contact_commercial_id.is_none()
    }

    pub fn apply(&self, target: &mut Contract) -> DomainResult<()> {
        let total = self.total_amount.unwrap_or(target.total_amount);
        let remaining = self.remaining_amount.unwrap_or(target.remaining_amount);
        check_amounts(total, remaining)?;

        target.total_amount = total;
        target.remaining_amount = remaining;
        if let Some(signed) = self.signed {
            target.signed = signed;
        }
        if let Some(owner) = self.contact_commercial_id {
            target.contact_commercial_id = owner;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn contract() -> Contract {
        Contract {
            id: ContractId::new(1),
            client_id: ClientId::new(1),
            contact_commercial_id: CollaboratorId::new(1),
            total_amount: 10_000.0,
            remaining_amount: 4_000.0,
            created_on: today(),
            signed: false,
        }
    }

    #[test]
    fn remaining_cannot_exceed_total() {
        let err = NewContract::new(ClientId::new(1), CollaboratorId::new(1), 100.0, 150.0, today(), false)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(NewContract::new(ClientId::new(1), CollaboratorId::new(1), -1.0, 0.0, today(), false).is_err());
    }

    #[test]
    fn patch_checks_amounts_against_current_values() {
        let mut c = contract();
        let lower_total = ContractPatch {
            total_amount: Some(1_000.0),
            ..Default::default()
        };
        assert!(lower_total.apply(&mut c).is_err());
        assert_eq!(c.total_amount, 10_000.0);

        let sign = ContractPatch {
            signed: Some(true),
            remaining_amount: Some(0.0),
            ..Default::default()
        };
        sign.apply(&mut c).unwrap();
        assert!(c.signed);
        assert_eq!(c.remaining_amount, 0.0);
    }
}
