// Suppliers and storage locations referenced by materials.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Location, LocationRequest, MaterialError, Supplier, SupplierRequest};
use crate::services::material::fetch_rows;

pub struct DirectoryService {
    supabase: SupabaseClient,
}

impl DirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn write<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Value,
        missing: MaterialError,
    ) -> Result<T, MaterialError> {
        let result: Vec<Value> = self.supabase.request_with_headers(
            method,
            path,
            None,
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let row = result.into_iter().next().ok_or(missing)?;
        Ok(serde_json::from_value(row)?)
    }

    async fn remove(&self, path: &str, missing: MaterialError) -> Result<(), MaterialError> {
        let deleted: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            path,
            None,
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if deleted.is_empty() {
            return Err(missing);
        }
        Ok(())
    }

    pub async fn list_suppliers(&self) -> Result<Vec<Supplier>, MaterialError> {
        fetch_rows(&self.supabase, "/rest/v1/suppliers?order=name.asc").await
    }

    pub async fn create_supplier(&self, request: SupplierRequest) -> Result<Supplier, MaterialError> {
        if request.name.trim().is_empty() {
            return Err(MaterialError::Invalid(vec!["Supplier name is required".to_string()]));
        }

        let supplier: Supplier = self.write(
            Method::POST,
            "/rest/v1/suppliers",
            json!(request),
            MaterialError::DatabaseError("Failed to create supplier".to_string()),
        ).await?;

        info!("Supplier {} created", supplier.id);
        Ok(supplier)
    }

    pub async fn update_supplier(&self, supplier_id: Uuid, request: SupplierRequest) -> Result<Supplier, MaterialError> {
        let path = format!("/rest/v1/suppliers?id=eq.{}", supplier_id);
        self.write(Method::PATCH, &path, json!(request), MaterialError::SupplierNotFound).await
    }

    pub async fn delete_supplier(&self, supplier_id: Uuid) -> Result<(), MaterialError> {
        let path = format!("/rest/v1/suppliers?id=eq.{}", supplier_id);
        self.remove(&path, MaterialError::SupplierNotFound).await
    }

    pub async fn list_locations(&self) -> Result<Vec<Location>, MaterialError> {
        fetch_rows(&self.supabase, "/rest/v1/locations?order=building.asc,floor.asc,room.asc").await
    }

    pub async fn create_location(&self, request: LocationRequest) -> Result<Location, MaterialError> {
        let mut errors = Vec::new();
        if request.building.trim().is_empty() {
            errors.push("Building is required".to_string());
        }
        if request.room.trim().is_empty() {
            errors.push("Room is required".to_string());
        }
        if !errors.is_empty() {
            return Err(MaterialError::Invalid(errors));
        }

        let location: Location = self.write(
            Method::POST,
            "/rest/v1/locations",
            json!(request),
            MaterialError::DatabaseError("Failed to create location".to_string()),
        ).await?;

        info!("Location {} created", location.label());
        Ok(location)
    }

    pub async fn update_location(&self, location_id: Uuid, request: LocationRequest) -> Result<Location, MaterialError> {
        let path = format!("/rest/v1/locations?id=eq.{}", location_id);
        self.write(Method::PATCH, &path, json!(request), MaterialError::LocationNotFound).await
    }

    pub async fn delete_location(&self, location_id: Uuid) -> Result<(), MaterialError> {
        let path = format!("/rest/v1/locations?id=eq.{}", location_id);
        self.remove(&path, MaterialError::LocationNotFound).await
    }
}
