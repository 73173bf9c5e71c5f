use chrono::{NaiveDateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use employee_cell::{EmployeeError, EmployeeService};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::Role;

use crate::models::{
    Appointment, AppointmentError, AppointmentQuery, AppointmentStatus, ClinicHours,
    ConflictCheckQuery, ConflictReport, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::conflict::{ConflictDetectionService, SlotRequest};
use crate::services::scheduling::validate_schedule;

pub struct AppointmentService {
    supabase: SupabaseClient,
    employees: EmployeeService,
    hours: ClinicHours,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            employees: EmployeeService::new(config),
            hours: ClinicHours {
                opening_hour: config.clinic_opening_hour,
                closing_hour: config.clinic_closing_hour,
            },
        }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let result: Vec<Value> = self.supabase.request(Method::GET, path, None, None).await?;

        result
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(AppointmentError::from))
            .collect()
    }

    async fn ensure_doctor(&self, doctor_id: Uuid) -> Result<(), AppointmentError> {
        match self.employees.get(doctor_id).await {
            Ok(employee) if employee.role == Role::Doctor => Ok(()),
            Ok(employee) => {
                warn!("Employee {} has role {}, not doctor", doctor_id, employee.role);
                Err(AppointmentError::DoctorNotFound)
            }
            Err(EmployeeError::NotFound) => Err(AppointmentError::DoctorNotFound),
            Err(e) => Err(AppointmentError::DatabaseError(e.to_string())),
        }
    }

    async fn ensure_patient(&self, patient_id: Uuid) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/patients?id=eq.{}&select=id", patient_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;

        if rows.is_empty() {
            return Err(AppointmentError::PatientNotFound);
        }
        Ok(())
    }

    async fn reject_conflicts(&self, slot: &SlotRequest) -> Result<(), AppointmentError> {
        let report = ConflictDetectionService::new(&self.supabase)
            .check_conflicts(slot)
            .await?;

        if report.has_conflict {
            return Err(AppointmentError::Conflicts(report.messages));
        }
        Ok(())
    }

    pub async fn check_conflicts(&self, query: &ConflictCheckQuery) -> Result<ConflictReport, AppointmentError> {
        let slot = SlotRequest {
            patient_id: query.patient_id,
            doctor_id: query.doctor_id,
            date: query.date,
            time: query.time,
            exclude_id: query.exclude_id,
        };

        ConflictDetectionService::new(&self.supabase)
            .check_conflicts(&slot)
            .await
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        self.fetch(&path).await?
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
    }

    /// Scheduled appointments, soonest first.
    pub async fn upcoming(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Listing upcoming appointments: {:?}", query);

        let mut query_parts = vec!["status=eq.scheduled".to_string()];
        if let Some(doctor_id) = query.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(date) = query.date {
            query_parts.push(format!("appointment_date=eq.{}", date.format("%Y-%m-%d")));
        }
        query_parts.push("order=appointment_date.asc,appointment_time.asc".to_string());

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        self.fetch(&path).await
    }

    /// Cancelled and completed appointments, most recent first.
    pub async fn history(&self) -> Result<Vec<Appointment>, AppointmentError> {
        self.fetch(
            "/rest/v1/appointments?status=in.(cancelled,completed)&order=appointment_date.desc,appointment_time.desc",
        ).await
    }

    pub async fn doctor_history(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Fetching appointment history of doctor {}", doctor_id);

        self.ensure_doctor(doctor_id).await?;

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&status=neq.scheduled&order=appointment_date.desc,appointment_time.desc",
            doctor_id
        );
        self.fetch(&path).await
    }

    pub async fn create(
        &self,
        request: CreateAppointmentRequest,
        now: NaiveDateTime,
    ) -> Result<Appointment, AppointmentError> {
        debug!(
            "Booking patient {} with doctor {} on {} at {}",
            request.patient_id, request.doctor_id, request.appointment_date, request.appointment_time
        );

        validate_schedule(request.appointment_date, request.appointment_time, now, self.hours)
            .map_err(AppointmentError::Invalid)?;

        futures::try_join!(
            self.ensure_doctor(request.doctor_id),
            self.ensure_patient(request.patient_id),
        )?;

        self.reject_conflicts(&SlotRequest {
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            date: request.appointment_date,
            time: request.appointment_time,
            exclude_id: None,
        }).await?;

        let timestamp = Utc::now().to_rfc3339();
        let appointment_data = json!({
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "appointment_date": request.appointment_date,
            "appointment_time": request.appointment_time,
            "status": AppointmentStatus::Scheduled,
            "created_at": timestamp,
            "updated_at": timestamp
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            None,
            Some(appointment_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let row = result.into_iter().next()
            .ok_or_else(|| AppointmentError::DatabaseError("Failed to create appointment".to_string()))?;
        let appointment: Appointment = serde_json::from_value(row)?;

        info!("Appointment {} booked", appointment.id);
        Ok(appointment)
    }

    pub async fn update(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        now: NaiveDateTime,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating appointment {}", appointment_id);

        let current = self.get(appointment_id).await?;

        let doctor_id = request.doctor_id.unwrap_or(current.doctor_id);
        let date = request.appointment_date.unwrap_or(current.appointment_date);
        let time = request.appointment_time.unwrap_or(current.appointment_time);
        let status = request.status.unwrap_or(current.status);

        let slot_moved = doctor_id != current.doctor_id
            || date != current.appointment_date
            || time != current.appointment_time;
        let rescheduled = status == AppointmentStatus::Scheduled
            && current.status != AppointmentStatus::Scheduled;

        if slot_moved || rescheduled {
            validate_schedule(date, time, now, self.hours).map_err(AppointmentError::Invalid)?;
        }
        if doctor_id != current.doctor_id {
            self.ensure_doctor(doctor_id).await?;
        }
        if status != AppointmentStatus::Cancelled {
            self.reject_conflicts(&SlotRequest {
                patient_id: current.patient_id,
                doctor_id,
                date,
                time,
                exclude_id: Some(current.id),
            }).await?;
        }

        let update_data = json!({
            "doctor_id": doctor_id,
            "appointment_date": date,
            "appointment_time": time,
            "status": status,
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            None,
            Some(update_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let row = result.into_iter().next().ok_or(AppointmentError::NotFound)?;
        let appointment: Appointment = serde_json::from_value(row)?;

        info!("Appointment {} updated (status {})", appointment.id, appointment.status);
        Ok(appointment)
    }

    pub async fn cancel(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let current = self.get(appointment_id).await?;

        if current.status != AppointmentStatus::Scheduled {
            warn!("Refusing to cancel appointment {} in status {}", appointment_id, current.status);
            return Err(AppointmentError::CannotCancel(current.status));
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            None,
            Some(json!({
                "status": AppointmentStatus::Cancelled,
                "updated_at": Utc::now().to_rfc3339()
            })),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let row = result.into_iter().next().ok_or(AppointmentError::NotFound)?;
        let appointment: Appointment = serde_json::from_value(row)?;

        info!("Appointment {} cancelled", appointment_id);
        Ok(appointment)
    }
}
