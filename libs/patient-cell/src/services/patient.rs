use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::upload::FileUpload;

use crate::models::{
    validate_create, validate_update, CreatePatientRequest, Patient, PatientError,
    PatientSearchQuery, UpdatePatientRequest,
};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn write(&self, method: Method, path: &str, body: Value) -> Result<Patient, PatientError> {
        let result: Vec<Value> = self.supabase.request_with_headers(
            method,
            path,
            None,
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let row = result.into_iter().next().ok_or(PatientError::NotFound)?;
        Ok(serde_json::from_value(row)?)
    }

    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        today: NaiveDate,
    ) -> Result<Patient, PatientError> {
        debug!("Creating patient record for {} {}", request.last_name, request.first_name);

        validate_create(&request, today).map_err(PatientError::Invalid)?;

        // The record lands in storage before the row exists, so a failed
        // upload leaves nothing behind in the patients table.
        let patient_id = Uuid::new_v4();
        let record_url = match &request.record {
            Some(upload) => {
                let bytes = upload.decode().map_err(PatientError::InvalidRecord)?;
                Some(self.upload_record(patient_id, upload, bytes).await?)
            }
            None => None,
        };

        let now = Utc::now().to_rfc3339();
        let patient_data = json!({
            "id": patient_id,
            "last_name": request.last_name.trim(),
            "first_name": request.first_name.trim(),
            "birth_date": request.birth_date,
            "sex": request.sex,
            "record_url": record_url,
            "created_at": now,
            "updated_at": now
        });

        let patient = self.write(Method::POST, "/rest/v1/patients", patient_data).await?;
        info!("Patient {} created", patient.id);
        Ok(patient)
    }

    pub async fn get_patient(&self, patient_id: Uuid) -> Result<Patient, PatientError> {
        debug!("Fetching patient {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;

        let row = result.into_iter().next().ok_or(PatientError::NotFound)?;
        Ok(serde_json::from_value(row)?)
    }

    pub async fn search_patients(&self, query: &PatientSearchQuery) -> Result<Vec<Patient>, PatientError> {
        debug!("Searching patients with query: {:?}", query);

        let mut query_parts = Vec::new();

        if let Some(name) = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            let pattern = SupabaseClient::ilike_term(name);
            query_parts.push(format!(
                "or=(last_name.ilike.{p},first_name.ilike.{p})",
                p = pattern
            ));
        }
        if let Some(sex) = query.sex {
            query_parts.push(format!("sex=eq.{}", sex));
        }
        query_parts.push("order=last_name.asc,first_name.asc".to_string());

        let path = format!("/rest/v1/patients?{}", query_parts.join("&"));
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;

        result
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(PatientError::from))
            .collect()
    }

    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
        today: NaiveDate,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient {}", patient_id);

        validate_update(&request, today).map_err(PatientError::Invalid)?;

        let mut update_data = serde_json::Map::new();

        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name.trim()));
        }
        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name.trim()));
        }
        if let Some(birth_date) = request.birth_date {
            update_data.insert("birth_date".to_string(), json!(birth_date));
        }
        if let Some(sex) = request.sex {
            update_data.insert("sex".to_string(), json!(sex));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let patient = self.write(Method::PATCH, &path, Value::Object(update_data)).await?;

        info!("Patient {} updated", patient_id);
        Ok(patient)
    }

    /// Replaces the patient's medical record file.
    pub async fn attach_record(&self, patient_id: Uuid, upload: FileUpload) -> Result<Patient, PatientError> {
        let bytes = upload.decode().map_err(PatientError::InvalidRecord)?;

        // Existence check first; storage writes are not rolled back
        self.get_patient(patient_id).await?;
        let record_url = self.upload_record(patient_id, &upload, bytes).await?;

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let patient = self.write(Method::PATCH, &path, json!({
            "record_url": record_url,
            "updated_at": Utc::now().to_rfc3339()
        })).await?;

        info!("Medical record stored for patient {}", patient_id);
        Ok(patient)
    }

    async fn upload_record(
        &self,
        patient_id: Uuid,
        upload: &FileUpload,
        bytes: Vec<u8>,
    ) -> Result<String, PatientError> {
        let object_path = upload.object_path("patients", patient_id);
        self.supabase
            .upload_object(&object_path, bytes, &upload.content_type)
            .await
            .map_err(|e| PatientError::Storage(e.to_string()))
    }

    pub async fn delete_patient(&self, patient_id: Uuid) -> Result<(), PatientError> {
        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let deleted: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            None,
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if deleted.is_empty() {
            return Err(PatientError::NotFound);
        }

        info!("Patient {} deleted", patient_id);
        Ok(())
    }
}
