//! Table rendering for command output (`comfy-table`).

use comfy_table::{Cell, ContentArrangement, Table};

use epiccrm_auth::AuthorizationExplanation;
use epiccrm_core::{Client, Collaborator, Contract, Event, RoleRecord};

fn table<I, S>(header: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: Into<Cell>,
{
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

fn finish(table: Table, rows: usize) -> String {
    format!("{table}\n({rows} row{})", if rows == 1 { "" } else { "s" })
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn collaborators(rows: &[Collaborator]) -> String {
    let mut t = table(["id", "name", "email", "role"]);
    for c in rows {
        t.add_row(vec![
            c.id.to_string(),
            c.name.clone(),
            c.email.to_string(),
            c.role_name.clone(),
        ]);
    }
    finish(t, rows.len())
}

pub fn clients(rows: &[Client]) -> String {
    let mut t = table(["id", "full name", "email", "phone", "company", "created", "updated", "commercial"]);
    for c in rows {
        t.add_row(vec![
            c.id.to_string(),
            c.full_name.clone(),
            c.email.to_string(),
            c.phone.clone(),
            c.company.clone(),
            c.created_on.to_string(),
            or_dash(c.updated_on),
            or_dash(c.contact_commercial_id),
        ]);
    }
    finish(t, rows.len())
}

pub fn contracts(rows: &[Contract]) -> String {
    let mut t = table(["id", "client", "commercial", "total", "remaining", "created", "signed"]);
    for c in rows {
        t.add_row(vec![
            c.id.to_string(),
            c.client_id.to_string(),
            c.contact_commercial_id.to_string(),
            format!("{:.2}", c.total_amount),
            format!("{:.2}", c.remaining_amount),
            c.created_on.to_string(),
            if c.signed { "yes" } else { "no" }.to_string(),
        ]);
    }
    finish(t, rows.len())
}

pub fn events(rows: &[Event]) -> String {
    let mut t = table([
        "id", "contract", "client", "support", "start", "end", "location", "attendees", "notes",
    ]);
    for e in rows {
        t.add_row(vec![
            e.id.to_string(),
            e.contract_id.to_string(),
            e.client_id.to_string(),
            or_dash(e.support_contact_id),
            e.starts_at.format("%Y-%m-%d %H:%M").to_string(),
            e.ends_at.format("%Y-%m-%d %H:%M").to_string(),
            e.location.clone(),
            match e.expected_attendees {
                Some(expected) => format!("{} / {expected}", e.attendees),
                None => e.attendees.to_string(),
            },
            e.notes.clone().unwrap_or_default(),
        ]);
    }
    finish(t, rows.len())
}

pub fn roles(rows: &[RoleRecord]) -> String {
    let mut t = table(["id", "name", "permissions"]);
    for r in rows {
        let permissions = r
            .permissions
            .iter()
            .map(|(resource, actions)| format!("{resource}: {}", actions.join(", ")))
            .collect::<Vec<_>>()
            .join("\n");
        t.add_row(vec![r.id.to_string(), r.name.clone(), permissions]);
    }
    finish(t, rows.len())
}

/// Two-column `Field | Value` view of a single record.
pub fn fields(pairs: &[(&str, String)]) -> String {
    let mut t = table(["Field", "Value"]);
    for (key, value) in pairs {
        t.add_row(vec![Cell::new(key), Cell::new(value)]);
    }
    t.to_string()
}

pub fn explanation(e: &AuthorizationExplanation) -> String {
    let mut pairs = vec![
        ("permission", e.required_permission.to_string()),
        ("granted", if e.granted { "yes" } else { "no" }.to_string()),
        ("reason", e.reason.clone()),
        ("principal", format!("{} (#{})", e.principal.email, e.principal.id)),
        ("role", e.principal.role.clone()),
        ("effective permissions", e.principal.effective_permissions.join(", ")),
    ];
    if let Some(denial) = &e.denial_reason {
        pairs.push(("missing", denial.message.clone()));
        pairs.push(("suggestions", denial.suggestions.join("\n")));
    }
    fields(&pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use epiccrm_core::{ClientId, CollaboratorId, ContractId};

    #[test]
    fn contract_rows_show_amounts_and_status() {
        let rendered = contracts(&[Contract {
            id: ContractId::new(3),
            client_id: ClientId::new(1),
            contact_commercial_id: CollaboratorId::new(2),
            total_amount: 1500.0,
            remaining_amount: 250.5,
            created_on: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            signed: false,
        }]);

        assert!(rendered.contains("1500.00"));
        assert!(rendered.contains("250.50"));
        assert!(rendered.contains("no"));
        assert!(rendered.ends_with("(1 row)"));
    }

    #[test]
    fn empty_listing_reports_zero_rows() {
        assert!(clients(&[]).ends_with("(0 rows)"));
    }
}
