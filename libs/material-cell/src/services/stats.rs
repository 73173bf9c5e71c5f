use chrono::{Duration, NaiveDate};

use crate::models::{Alert, Loan, MaterialState, MaterialStats, MedicalMaterial};

pub fn compute_material_stats(
    materials: &[MedicalMaterial],
    loans: &[Loan],
    alerts: &[Alert],
    today: NaiveDate,
) -> MaterialStats {
    let in_state = |state: MaterialState| materials.iter().filter(|m| m.state == state).count();
    let soon = today + Duration::days(30);

    MaterialStats {
        total_materials: materials.len(),
        in_service: in_state(MaterialState::InService),
        maintenance: in_state(MaterialState::Maintenance),
        loaned: in_state(MaterialState::Loaned),
        out_of_service: in_state(MaterialState::OutOfService),
        expired: materials.iter().filter(|m| m.is_expired(today)).count(),
        expiring_soon: materials
            .iter()
            .filter(|m| m.expiration_date >= today && m.expiration_date <= soon)
            .count(),
        active_alerts: alerts.iter().filter(|a| !a.resolved).count(),
        ongoing_loans: loans.iter().filter(|l| !l.is_returned()).count(),
        overdue_loans: loans.iter().filter(|l| l.days_overdue(today) > 0).count(),
        total_cost: materials.iter().map(|m| m.purchase_price).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LoanStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    fn material(state: MaterialState, expires_in: i64, price: f64) -> MedicalMaterial {
        MedicalMaterial {
            id: Uuid::new_v4(),
            name: "Item".to_string(),
            material_type: "Device".to_string(),
            reference: "R".to_string(),
            state,
            quantity: 1,
            initial_quantity: Some(1),
            purchase_price: price,
            acquisition_date: today() - Duration::days(365),
            expiration_date: today() + Duration::days(expires_in),
            supplier_id: None,
            location_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn loan(due_in: i64, returned: bool) -> Loan {
        let due_date = today() + Duration::days(due_in);
        Loan {
            id: Uuid::new_v4(),
            material_id: Uuid::new_v4(),
            borrower: "Ward 3".to_string(),
            service: "Surgery".to_string(),
            loan_date: today() - Duration::days(10),
            due_date,
            returned_on: returned.then(today),
            notes: String::new(),
            status: LoanStatus::Ongoing,
        }
    }

    #[test]
    fn test_material_stats() {
        let materials = vec![
            material(MaterialState::InService, -2, 100.0),
            material(MaterialState::Loaned, 10, 250.5),
            material(MaterialState::Maintenance, 400, 49.5),
        ];
        let loans = vec![loan(-1, false), loan(3, false), loan(-9, true)];

        let stats = compute_material_stats(&materials, &loans, &[], today());

        assert_eq!(stats.total_materials, 3);
        assert_eq!(stats.in_service, 1);
        assert_eq!(stats.loaned, 1);
        assert_eq!(stats.maintenance, 1);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.expiring_soon, 1);
        assert_eq!(stats.ongoing_loans, 2);
        assert_eq!(stats.overdue_loans, 1);
        assert_eq!(stats.total_cost, 400.0);
    }
}
