// Pure material rules: alert thresholds, quantity bookkeeping and form checks.

use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{
    AlertPriority, AlertThresholds, AlertType, CreateMaterialRequest, Loan, MaterialError,
    MaterialState, MedicalMaterial, NewAlert, UpdateMaterialRequest,
};

pub fn expiry_priority(days_left: i64) -> AlertPriority {
    if days_left <= 7 {
        AlertPriority::High
    } else if days_left <= 15 {
        AlertPriority::Medium
    } else {
        AlertPriority::Low
    }
}

pub fn low_stock_priority(quantity: u32) -> AlertPriority {
    if quantity <= 2 { AlertPriority::High } else { AlertPriority::Medium }
}

pub fn overdue_priority(days_late: i64) -> AlertPriority {
    if days_late > 7 { AlertPriority::High } else { AlertPriority::Medium }
}

/// Alerts the current materials and loans call for. The output is sorted so
/// that two evaluations over the same data compare equal.
pub fn evaluate_alert_rules(
    materials: &[MedicalMaterial],
    loans: &[Loan],
    today: NaiveDate,
    thresholds: AlertThresholds,
) -> Vec<NewAlert> {
    let mut alerts = Vec::new();

    for material in materials {
        let days_left = (material.expiration_date - today).num_days();
        if (0..=thresholds.expiry_window_days).contains(&days_left)
            && material.state != MaterialState::OutOfService
        {
            alerts.push(NewAlert {
                material_id: material.id,
                alert_type: AlertType::Expiry,
                priority: expiry_priority(days_left),
                message: format!(
                    "{} expires in {} day(s) ({})",
                    material.name, days_left, material.expiration_date
                ),
            });
        }

        if material.state == MaterialState::InService {
            if material.quantity == 0 {
                alerts.push(NewAlert {
                    material_id: material.id,
                    alert_type: AlertType::Stock,
                    priority: AlertPriority::High,
                    message: format!("Out of stock: {} needs urgent restocking", material.name),
                });
            } else if material.quantity <= thresholds.low_stock {
                alerts.push(NewAlert {
                    material_id: material.id,
                    alert_type: AlertType::Stock,
                    priority: low_stock_priority(material.quantity),
                    message: format!(
                        "Low stock: {} has {} unit(s) left",
                        material.name, material.quantity
                    ),
                });
            }
        }

        match material.state {
            MaterialState::Maintenance => alerts.push(NewAlert {
                material_id: material.id,
                alert_type: AlertType::Maintenance,
                priority: AlertPriority::Medium,
                message: format!("{} is in maintenance and needs follow-up", material.name),
            }),
            MaterialState::OutOfService => alerts.push(NewAlert {
                material_id: material.id,
                alert_type: AlertType::Breakdown,
                priority: AlertPriority::Medium,
                message: format!(
                    "{} is out of service and must be repaired or replaced",
                    material.name
                ),
            }),
            _ => {}
        }
    }

    let names: HashMap<Uuid, &str> = materials.iter().map(|m| (m.id, m.name.as_str())).collect();

    for loan in loans.iter().filter(|l| !l.is_returned() && l.due_date < today) {
        let days_late = (today - loan.due_date).num_days();
        let name = names.get(&loan.material_id).copied().unwrap_or("Unknown material");

        alerts.push(NewAlert {
            material_id: loan.material_id,
            alert_type: AlertType::Overdue,
            priority: overdue_priority(days_late),
            message: format!(
                "Overdue loan: {} borrowed by {} ({} day(s) late)",
                name, loan.borrower, days_late
            ),
        });
    }

    alerts.sort();
    alerts
}

/// Quantity after a material moves between states. Entering `loaned` takes
/// one unit out, leaving it puts one back.
pub fn quantity_after_state_change(
    from: MaterialState,
    to: MaterialState,
    quantity: u32,
) -> Result<u32, MaterialError> {
    match (from == MaterialState::Loaned, to == MaterialState::Loaned) {
        (false, true) => quantity
            .checked_sub(1)
            .ok_or(MaterialError::NotAvailable { state: from, quantity }),
        (true, false) => quantity.checked_add(1).ok_or(MaterialError::QuantityOverflow),
        _ => Ok(quantity),
    }
}

fn check_price(price: f64, errors: &mut Vec<String>) {
    if !price.is_finite() || price < 0.0 {
        errors.push("Purchase price must be a positive amount".to_string());
    }
}

fn check_required(field: &str, value: &str, errors: &mut Vec<String>) {
    if value.trim().is_empty() {
        errors.push(format!("{} is required", field));
    }
}

pub fn validate_create(request: &CreateMaterialRequest) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    check_required("Name", &request.name, &mut errors);
    check_required("Type", &request.material_type, &mut errors);
    check_required("Reference", &request.reference, &mut errors);
    check_price(request.purchase_price, &mut errors);

    if request.expiration_date < request.acquisition_date {
        errors.push("Expiration date cannot precede the acquisition date".to_string());
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn validate_update(
    current: &MedicalMaterial,
    request: &UpdateMaterialRequest,
) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if let Some(name) = &request.name {
        check_required("Name", name, &mut errors);
    }
    if let Some(material_type) = &request.material_type {
        check_required("Type", material_type, &mut errors);
    }
    if let Some(reference) = &request.reference {
        check_required("Reference", reference, &mut errors);
    }
    if let Some(price) = request.purchase_price {
        check_price(price, &mut errors);
    }

    let acquisition = request.acquisition_date.unwrap_or(current.acquisition_date);
    let expiration = request.expiration_date.unwrap_or(current.expiration_date);
    if expiration < acquisition {
        errors.push("Expiration date cannot precede the acquisition date".to_string());
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
