use chrono::Utc;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    CreateMaterialRequest, HistoryAction, Location, MaterialDetail, MaterialError,
    MaterialHistory, MaterialSearchQuery, MaterialState, MedicalMaterial, StateTransition,
    Supplier, UpdateMaterialRequest,
};
use crate::services::rules::{quantity_after_state_change, validate_create, validate_update};

pub struct MaterialService {
    supabase: SupabaseClient,
}

pub(crate) async fn fetch_rows<T: DeserializeOwned>(
    supabase: &SupabaseClient,
    path: &str,
) -> Result<Vec<T>, MaterialError> {
    let result: Vec<Value> = supabase.request(Method::GET, path, None, None).await?;

    result
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(MaterialError::from))
        .collect()
}

impl MaterialService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list(&self, query: &MaterialSearchQuery) -> Result<Vec<MedicalMaterial>, MaterialError> {
        debug!("Listing materials: {:?}", query);

        let mut query_parts = Vec::new();

        if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = SupabaseClient::ilike_term(q);
            query_parts.push(format!(
                "or=(name.ilike.{p},reference.ilike.{p},material_type.ilike.{p})",
                p = pattern
            ));
        }
        if let Some(state) = query.state {
            query_parts.push(format!("state=eq.{}", state));
        }
        if let Some(material_type) = query.material_type.as_deref().filter(|t| !t.is_empty()) {
            query_parts.push(format!("material_type=eq.{}", urlencoding::encode(material_type)));
        }
        query_parts.push("order=name.asc".to_string());

        let path = format!("/rest/v1/materials?{}", query_parts.join("&"));
        fetch_rows(&self.supabase, &path).await
    }

    pub async fn list_all(&self) -> Result<Vec<MedicalMaterial>, MaterialError> {
        fetch_rows(&self.supabase, "/rest/v1/materials?order=name.asc").await
    }

    pub async fn get(&self, material_id: Uuid) -> Result<MedicalMaterial, MaterialError> {
        debug!("Fetching material {}", material_id);

        let path = format!("/rest/v1/materials?id=eq.{}", material_id);
        fetch_rows(&self.supabase, &path).await?
            .into_iter()
            .next()
            .ok_or(MaterialError::NotFound)
    }

    pub async fn get_detail(&self, material_id: Uuid) -> Result<MaterialDetail, MaterialError> {
        let material = self.get(material_id).await?;

        let supplier_path = material.supplier_id
            .map(|id| format!("/rest/v1/suppliers?id=eq.{}", id));
        let location_path = material.location_id
            .map(|id| format!("/rest/v1/locations?id=eq.{}", id));

        let (supplier, location, history) = futures::try_join!(
            async {
                match &supplier_path {
                    Some(path) => Ok(fetch_rows::<Supplier>(&self.supabase, path).await?.into_iter().next()),
                    None => Ok::<_, MaterialError>(None),
                }
            },
            async {
                match &location_path {
                    Some(path) => Ok(fetch_rows::<Location>(&self.supabase, path).await?.into_iter().next()),
                    None => Ok::<_, MaterialError>(None),
                }
            },
            self.history(material_id),
        )?;

        Ok(MaterialDetail {
            location_label: location.as_ref().map(Location::label),
            material,
            supplier,
            location,
            history,
        })
    }

    pub async fn create(&self, request: CreateMaterialRequest) -> Result<MedicalMaterial, MaterialError> {
        debug!("Creating material {}", request.name);

        validate_create(&request).map_err(MaterialError::Invalid)?;

        let now = Utc::now().to_rfc3339();
        let material_data = json!({
            "name": request.name.trim(),
            "material_type": request.material_type.trim(),
            "reference": request.reference.trim(),
            "state": request.state.unwrap_or_default(),
            "quantity": request.quantity,
            "initial_quantity": request.initial_quantity.unwrap_or(request.quantity),
            "purchase_price": request.purchase_price,
            "acquisition_date": request.acquisition_date.format("%Y-%m-%d").to_string(),
            "expiration_date": request.expiration_date.format("%Y-%m-%d").to_string(),
            "supplier_id": request.supplier_id,
            "location_id": request.location_id,
            "created_at": now,
            "updated_at": now
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/materials",
            None,
            Some(material_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let row = result.into_iter().next()
            .ok_or_else(|| MaterialError::DatabaseError("Failed to create material".to_string()))?;
        let material: MedicalMaterial = serde_json::from_value(row)?;

        self.record_history(material.id, HistoryAction::Creation, &format!(
            "Created with quantity {}", material.quantity
        )).await?;

        info!("Material {} created", material.id);
        Ok(material)
    }

    pub async fn update(
        &self,
        material_id: Uuid,
        request: UpdateMaterialRequest,
    ) -> Result<MedicalMaterial, MaterialError> {
        debug!("Updating material {}", material_id);

        let current = self.get(material_id).await?;
        validate_update(&current, &request).map_err(MaterialError::Invalid)?;

        let mut update_data = serde_json::Map::new();
        let mut changes = Vec::new();

        if let Some(name) = request.name {
            update_data.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(material_type) = request.material_type {
            update_data.insert("material_type".to_string(), json!(material_type.trim()));
        }
        if let Some(reference) = request.reference {
            update_data.insert("reference".to_string(), json!(reference.trim()));
        }
        if let Some(price) = request.purchase_price {
            update_data.insert("purchase_price".to_string(), json!(price));
        }
        if let Some(acquisition_date) = request.acquisition_date {
            update_data.insert("acquisition_date".to_string(), json!(acquisition_date.format("%Y-%m-%d").to_string()));
        }
        if let Some(expiration_date) = request.expiration_date {
            update_data.insert("expiration_date".to_string(), json!(expiration_date.format("%Y-%m-%d").to_string()));
        }
        if let Some(supplier_id) = request.supplier_id {
            update_data.insert("supplier_id".to_string(), json!(supplier_id));
        }
        if let Some(location_id) = request.location_id {
            update_data.insert("location_id".to_string(), json!(location_id));
        }

        let state = request.state.unwrap_or(current.state);
        let base_quantity = request.quantity.unwrap_or(current.quantity);
        let quantity = quantity_after_state_change(current.state, state, base_quantity)?;

        if state != current.state {
            update_data.insert("state".to_string(), json!(state));
            changes.push(format!("state {} -> {}", current.state, state));
        }
        if quantity != current.quantity {
            update_data.insert("quantity".to_string(), json!(quantity));
            changes.push(format!("quantity {} -> {}", current.quantity, quantity));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let updated = self.patch(material_id, Value::Object(update_data)).await?;

        let details = if changes.is_empty() {
            "Details updated".to_string()
        } else {
            changes.join(", ")
        };
        self.record_history(material_id, HistoryAction::Modification, &details).await?;

        info!("Material {} updated", material_id);
        Ok(updated)
    }

    pub async fn delete(&self, material_id: Uuid) -> Result<(), MaterialError> {
        self.get(material_id).await?;

        let path = format!("/rest/v1/materials?id=eq.{}", material_id);
        self.supabase.execute(Method::DELETE, &path, None, None).await?;

        info!("Material {} deleted", material_id);
        Ok(())
    }

    pub async fn apply_transition(
        &self,
        material_id: Uuid,
        transition: StateTransition,
    ) -> Result<MedicalMaterial, MaterialError> {
        let current = self.get(material_id).await?;
        let (from, to) = transition.endpoints();

        if current.state != from {
            warn!("Rejected {} on material {} in state {}", transition, material_id, current.state);
            return Err(MaterialError::InvalidTransition { transition, from: current.state });
        }

        let updated = self.set_state(material_id, to, current.quantity).await?;
        self.record_history(
            material_id,
            transition.history_action(),
            &format!("{} -> {}", from.label(), to.label()),
        ).await?;

        info!("Material {} moved to {}", material_id, to);
        Ok(updated)
    }

    pub async fn history(&self, material_id: Uuid) -> Result<Vec<MaterialHistory>, MaterialError> {
        let path = format!(
            "/rest/v1/material_history?material_id=eq.{}&order=created_at.desc",
            material_id
        );
        fetch_rows(&self.supabase, &path).await
    }

    pub(crate) async fn set_state(
        &self,
        material_id: Uuid,
        state: MaterialState,
        quantity: u32,
    ) -> Result<MedicalMaterial, MaterialError> {
        self.patch(material_id, json!({
            "state": state,
            "quantity": quantity,
            "updated_at": Utc::now().to_rfc3339()
        })).await
    }

    async fn patch(&self, material_id: Uuid, body: Value) -> Result<MedicalMaterial, MaterialError> {
        let path = format!("/rest/v1/materials?id=eq.{}", material_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            None,
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let row = result.into_iter().next().ok_or(MaterialError::NotFound)?;
        Ok(serde_json::from_value(row)?)
    }

    pub(crate) async fn record_history(
        &self,
        material_id: Uuid,
        action: HistoryAction,
        details: &str,
    ) -> Result<(), MaterialError> {
        self.supabase.execute(
            Method::POST,
            "/rest/v1/material_history",
            None,
            Some(json!({
                "material_id": material_id,
                "action": action,
                "details": details,
                "created_at": Utc::now().to_rfc3339()
            })),
        ).await?;

        Ok(())
    }
}
