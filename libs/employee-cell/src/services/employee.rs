use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::upload::FileUpload;

use crate::models::{
    CreateEmployeeRequest, Employee, EmployeeError, EmployeeSearchQuery, EmployeeStats,
    NotificationPreferencesRequest, Role, UpdateEmployeeRequest,
};
use crate::services::password::PasswordService;
use crate::services::stats::compute_stats;
use crate::services::validation::{validate_create, validate_update};

pub struct EmployeeService {
    supabase: SupabaseClient,
    email_domain: Option<String>,
}

impl EmployeeService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            email_domain: config.employee_email_domain.clone(),
        }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Employee>, EmployeeError> {
        let result: Vec<Value> = self.supabase.request(Method::GET, path, None, None).await?;

        result
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(EmployeeError::from))
            .collect()
    }

    async fn ensure_unique(
        &self,
        login: Option<&str>,
        email: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Result<(), EmployeeError> {
        let others = |rows: Vec<Employee>| rows.into_iter().any(|e| Some(e.id) != exclude);

        if let Some(login) = login {
            let path = format!("/rest/v1/employees?login=eq.{}", urlencoding::encode(login));
            if others(self.fetch(&path).await?) {
                warn!("Login {} already in use", login);
                return Err(EmployeeError::LoginTaken { login: login.to_string() });
            }
        }

        if let Some(email) = email {
            let path = format!("/rest/v1/employees?email=eq.{}", urlencoding::encode(email));
            if others(self.fetch(&path).await?) {
                warn!("Email {} already in use", email);
                return Err(EmployeeError::EmailTaken { email: email.to_string() });
            }
        }

        Ok(())
    }

    /// Checks and decodes a photo without touching storage.
    fn decode_photo(upload: &FileUpload) -> Result<Vec<u8>, EmployeeError> {
        if !upload.content_type.starts_with("image/") {
            return Err(EmployeeError::InvalidPhoto(format!(
                "expected an image, got {}",
                upload.content_type
            )));
        }
        upload.decode().map_err(EmployeeError::InvalidPhoto)
    }

    async fn upload_photo(
        &self,
        employee_id: Uuid,
        upload: &FileUpload,
        bytes: Vec<u8>,
    ) -> Result<String, EmployeeError> {
        let object_path = upload.object_path("employees", employee_id);
        self.supabase
            .upload_object(&object_path, bytes, &upload.content_type)
            .await
            .map_err(|e| EmployeeError::Storage(e.to_string()))
    }

    /// Drops a photo that is no longer referenced. Failures only cost storage space.
    async fn discard_photo(&self, photo_url: Option<&str>) {
        let Some(object_path) = photo_url.and_then(|url| self.supabase.object_path_of(url)) else {
            return;
        };
        if let Err(e) = self.supabase.delete_object(object_path).await {
            warn!("Could not delete photo {}: {}", object_path, e);
        }
    }

    pub async fn create(&self, request: CreateEmployeeRequest) -> Result<Employee, EmployeeError> {
        debug!("Creating employee with login {}", request.login);

        validate_create(&request, self.email_domain.as_deref()).map_err(EmployeeError::Invalid)?;
        if request.password.is_empty() {
            return Err(EmployeeError::MissingPassword);
        }
        let photo = match &request.photo {
            Some(upload) => Some((upload, Self::decode_photo(upload)?)),
            None => None,
        };

        let login = request.login.trim().to_string();
        let email = request.email.trim().to_lowercase();
        self.ensure_unique(Some(&login), Some(&email), None).await?;

        let password = PasswordService::hash_password(&request.password)
            .map_err(|e| EmployeeError::PasswordHash(e.to_string()))?;

        let employee_id = Uuid::new_v4();
        let photo_url = match photo {
            Some((upload, bytes)) => Some(self.upload_photo(employee_id, upload, bytes).await?),
            None => None,
        };

        let now = Utc::now().to_rfc3339();
        let employee_data = json!({
            "id": employee_id,
            "last_name": request.last_name.trim(),
            "first_name": request.first_name.trim(),
            "role": request.role,
            "login": login,
            "password": password,
            "email": email,
            "phone": request.phone.filter(|p| !p.trim().is_empty()),
            "hire_date": request.hire_date.format("%Y-%m-%d").to_string(),
            "service": request.service.trim(),
            "state": request.state.unwrap_or_default(),
            "photo_url": photo_url,
            "notification_enabled": true,
            "notification_interval_hours": 24,
            "created_at": now,
            "updated_at": now
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/employees",
            None,
            Some(employee_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let row = result.into_iter().next()
            .ok_or_else(|| EmployeeError::DatabaseError("Failed to create employee".to_string()))?;
        let employee: Employee = serde_json::from_value(row)?;

        info!("Employee {} created with role {}", employee.id, employee.role);
        Ok(employee)
    }

    pub async fn get(&self, employee_id: Uuid) -> Result<Employee, EmployeeError> {
        debug!("Fetching employee {}", employee_id);

        let path = format!("/rest/v1/employees?id=eq.{}", employee_id);
        self.fetch(&path).await?
            .into_iter()
            .next()
            .ok_or(EmployeeError::NotFound)
    }

    pub async fn find_by_login(&self, login: &str) -> Result<Option<Employee>, EmployeeError> {
        debug!("Looking up employee by login {}", login);

        let path = format!("/rest/v1/employees?login=eq.{}", urlencoding::encode(login.trim()));
        Ok(self.fetch(&path).await?.into_iter().next())
    }

    pub async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Employee>, EmployeeError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let list = ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");
        let path = format!("/rest/v1/employees?id=in.({})", list);
        self.fetch(&path).await
    }

    /// Doctors and nurses, the staff that can own or share tasks.
    pub async fn list_care_staff(&self) -> Result<Vec<Employee>, EmployeeError> {
        let path = "/rest/v1/employees?role=in.(doctor,nurse)&order=last_name.asc,first_name.asc";
        self.fetch(path).await
    }

    pub async fn search(&self, query: &EmployeeSearchQuery) -> Result<Vec<Employee>, EmployeeError> {
        debug!("Searching employees: {:?}", query);

        let mut query_parts = Vec::new();

        if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = SupabaseClient::ilike_term(q);
            query_parts.push(format!(
                "or=(last_name.ilike.{p},first_name.ilike.{p},email.ilike.{p},login.ilike.{p})",
                p = pattern
            ));
        }
        if let Some(role) = query.role {
            query_parts.push(format!("role=eq.{}", role));
        }
        if let Some(state) = query.state {
            query_parts.push(format!("state=eq.{}", state));
        }
        query_parts.push(format!("order={}", query.sort.unwrap_or_default().order_clause()));

        let path = format!("/rest/v1/employees?{}", query_parts.join("&"));
        self.fetch(&path).await
    }

    pub async fn update(
        &self,
        employee_id: Uuid,
        request: UpdateEmployeeRequest,
    ) -> Result<Employee, EmployeeError> {
        debug!("Updating employee {}", employee_id);

        validate_update(&request, self.email_domain.as_deref()).map_err(EmployeeError::Invalid)?;
        let photo = match &request.photo {
            Some(upload) => Some((upload, Self::decode_photo(upload)?)),
            None => None,
        };

        let current = self.get(employee_id).await?;

        let login = request.login.as_deref().map(str::trim).filter(|l| *l != current.login);
        let email = request.email.as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| *e != current.email);
        self.ensure_unique(login, email.as_deref(), Some(employee_id)).await?;

        let mut update_data = serde_json::Map::new();

        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name.trim()));
        }
        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name.trim()));
        }
        if let Some(role) = request.role {
            update_data.insert("role".to_string(), json!(role));
        }
        if let Some(login) = login {
            update_data.insert("login".to_string(), json!(login));
        }
        if let Some(password) = request.password.filter(|p| !p.is_empty()) {
            let hashed = PasswordService::hash_password(&password)
                .map_err(|e| EmployeeError::PasswordHash(e.to_string()))?;
            update_data.insert("password".to_string(), json!(hashed));
        }
        if let Some(email) = email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(phone) = request.phone {
            let phone = Some(phone).filter(|p| !p.trim().is_empty());
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(hire_date) = request.hire_date {
            update_data.insert("hire_date".to_string(), json!(hire_date.format("%Y-%m-%d").to_string()));
        }
        if let Some(service) = request.service {
            update_data.insert("service".to_string(), json!(service.trim()));
        }
        if let Some(state) = request.state {
            update_data.insert("state".to_string(), json!(state));
        }
        if let Some((upload, bytes)) = photo {
            let photo_url = self.upload_photo(employee_id, upload, bytes).await?;
            update_data.insert("photo_url".to_string(), json!(photo_url));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let updated = self.patch(employee_id, Value::Object(update_data)).await?;
        if updated.photo_url != current.photo_url {
            self.discard_photo(current.photo_url.as_deref()).await;
        }

        info!("Employee {} updated", employee_id);
        Ok(updated)
    }

    async fn patch(&self, employee_id: Uuid, body: Value) -> Result<Employee, EmployeeError> {
        let path = format!("/rest/v1/employees?id=eq.{}", employee_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            None,
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let row = result.into_iter().next().ok_or(EmployeeError::NotFound)?;
        Ok(serde_json::from_value(row)?)
    }

    pub async fn delete(&self, employee_id: Uuid) -> Result<(), EmployeeError> {
        // Surface 404 before the delete, PostgREST answers 204 either way
        let current = self.get(employee_id).await?;

        let path = format!("/rest/v1/employees?id=eq.{}", employee_id);
        self.supabase.execute(Method::DELETE, &path, None, None).await?;
        self.discard_photo(current.photo_url.as_deref()).await;

        info!("Employee {} deleted", employee_id);
        Ok(())
    }

    pub async fn update_notification_preferences(
        &self,
        employee_id: Uuid,
        request: NotificationPreferencesRequest,
    ) -> Result<Employee, EmployeeError> {
        if request.notification_interval_hours < 1 {
            return Err(EmployeeError::Invalid(vec![
                "Notification interval must be at least 1 hour".to_string(),
            ]));
        }

        let current = self.get(employee_id).await?;
        if !matches!(current.role, Role::Doctor | Role::Nurse) {
            return Err(EmployeeError::NotificationsUnavailable);
        }

        let updated = self.patch(employee_id, json!({
            "notification_enabled": request.notification_enabled,
            "notification_interval_hours": request.notification_interval_hours,
            "updated_at": Utc::now().to_rfc3339()
        })).await?;

        info!(
            "Employee {} notifications: enabled={} every {}h",
            employee_id, updated.notification_enabled, updated.notification_interval_hours
        );
        Ok(updated)
    }

    pub async fn get_stats(&self, today: NaiveDate) -> Result<EmployeeStats, EmployeeError> {
        let employees = self.fetch("/rest/v1/employees?order=created_at.desc").await?;
        Ok(compute_stats(&employees, today))
    }
}
