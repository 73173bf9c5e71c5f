use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, ConflictKind, ConflictReport};

/// The slot a booking wants to occupy.
#[derive(Debug, Clone, Copy)]
pub struct SlotRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub exclude_id: Option<Uuid>,
}

/// Checks `slot` against existing appointments. Cancelled rows and the
/// excluded appointment never conflict.
pub fn evaluate_conflicts(existing: &[Appointment], slot: &SlotRequest) -> Vec<ConflictKind> {
    let competing: Vec<&Appointment> = existing
        .iter()
        .filter(|a| a.status != AppointmentStatus::Cancelled)
        .filter(|a| Some(a.id) != slot.exclude_id)
        .filter(|a| a.is_at(slot.date, slot.time))
        .collect();

    let doctor_booked = competing.iter().any(|a| a.doctor_id == slot.doctor_id);
    let patient_booked = competing.iter().any(|a| a.patient_id == slot.patient_id);
    let duplicate = competing
        .iter()
        .any(|a| a.doctor_id == slot.doctor_id && a.patient_id == slot.patient_id);

    let mut conflicts = Vec::new();
    if doctor_booked {
        conflicts.push(ConflictKind::DoctorBooked);
    }
    if patient_booked {
        conflicts.push(ConflictKind::PatientBooked);
    }
    if duplicate {
        conflicts.push(ConflictKind::DuplicateBooking);
    }
    conflicts
}

pub struct ConflictDetectionService<'a> {
    supabase: &'a SupabaseClient,
}

impl<'a> ConflictDetectionService<'a> {
    pub fn new(supabase: &'a SupabaseClient) -> Self {
        Self { supabase }
    }

    pub async fn check_conflicts(&self, slot: &SlotRequest) -> Result<ConflictReport, AppointmentError> {
        debug!(
            "Checking conflicts for doctor {} / patient {} at {} {}",
            slot.doctor_id, slot.patient_id, slot.date, slot.time
        );

        let existing = self.appointments_in_slot(slot).await?;
        let report = ConflictReport::from_kinds(evaluate_conflicts(&existing, slot));

        if report.has_conflict {
            warn!(
                "Conflict detected at {} {}: {:?}",
                slot.date, slot.time, report.conflicts
            );
        }

        Ok(report)
    }

    async fn appointments_in_slot(&self, slot: &SlotRequest) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query_parts = vec![
            format!("appointment_date=eq.{}", slot.date.format("%Y-%m-%d")),
            format!("appointment_time=eq.{}", slot.time.format("%H:%M:%S")),
            "status=neq.cancelled".to_string(),
            format!("or=(doctor_id.eq.{},patient_id.eq.{})", slot.doctor_id, slot.patient_id),
        ];
        if let Some(exclude_id) = slot.exclude_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;

        result
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(AppointmentError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn slot_time() -> (NaiveDate, NaiveTime) {
        (
            NaiveDate::from_ymd_opt(2030, 3, 4).unwrap(),
            NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
        )
    }

    fn appointment(patient_id: Uuid, doctor_id: Uuid, status: AppointmentStatus) -> Appointment {
        let (date, time) = slot_time();
        Appointment {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            appointment_date: date,
            appointment_time: time,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn slot(patient_id: Uuid, doctor_id: Uuid) -> SlotRequest {
        let (date, time) = slot_time();
        SlotRequest { patient_id, doctor_id, date, time, exclude_id: None }
    }

    #[test]
    fn test_doctor_already_booked() {
        let doctor = Uuid::new_v4();
        let existing = vec![appointment(Uuid::new_v4(), doctor, AppointmentStatus::Scheduled)];

        let conflicts = evaluate_conflicts(&existing, &slot(Uuid::new_v4(), doctor));
        assert_eq!(conflicts, vec![ConflictKind::DoctorBooked]);
    }

    #[test]
    fn test_same_triple_reports_all_three() {
        let (patient, doctor) = (Uuid::new_v4(), Uuid::new_v4());
        let existing = vec![appointment(patient, doctor, AppointmentStatus::Completed)];

        let conflicts = evaluate_conflicts(&existing, &slot(patient, doctor));
        assert_eq!(
            conflicts,
            vec![
                ConflictKind::DoctorBooked,
                ConflictKind::PatientBooked,
                ConflictKind::DuplicateBooking
            ]
        );
    }

    #[test]
    fn test_cancelled_and_excluded_rows_are_ignored() {
        let (patient, doctor) = (Uuid::new_v4(), Uuid::new_v4());
        let cancelled = appointment(patient, doctor, AppointmentStatus::Cancelled);
        let own = appointment(patient, doctor, AppointmentStatus::Scheduled);

        let mut request = slot(patient, doctor);
        request.exclude_id = Some(own.id);

        assert!(evaluate_conflicts(&[cancelled, own], &request).is_empty());
    }

    #[test]
    fn test_other_slot_does_not_conflict() {
        let doctor = Uuid::new_v4();
        let mut other = appointment(Uuid::new_v4(), doctor, AppointmentStatus::Scheduled);
        other.appointment_time = NaiveTime::from_hms_opt(11, 0, 0).unwrap();

        assert!(evaluate_conflicts(&[other], &slot(Uuid::new_v4(), doctor)).is_empty());
    }
}
