use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Alert, AlertQuery, AlertStatus, AlertThresholds, AlertType, MaterialError, SweepSummary,
};
use crate::services::loan::LoanService;
use crate::services::material::{fetch_rows, MaterialService};
use crate::services::rules::evaluate_alert_rules;

pub struct AlertService {
    supabase: SupabaseClient,
    materials: MaterialService,
    loans: LoanService,
    thresholds: AlertThresholds,
}

impl AlertService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            materials: MaterialService::new(config),
            loans: LoanService::new(config),
            thresholds: AlertThresholds {
                expiry_window_days: config.alert_expiry_window_days,
                low_stock: config.alert_low_stock_threshold,
            },
        }
    }

    /// Drops every unresolved automatic alert and recreates the set the
    /// current data calls for. Manual and resolved alerts are left alone.
    #[instrument(skip(self))]
    pub async fn sweep(&self, today: NaiveDate) -> Result<SweepSummary, MaterialError> {
        let types = AlertType::automatic()
            .iter()
            .map(AlertType::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("/rest/v1/alerts?resolved=eq.false&alert_type=in.({})", types);

        let deleted: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            None,
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let (materials, loans) = futures::try_join!(self.materials.list_all(), self.loans.list_all())?;
        let alerts = evaluate_alert_rules(&materials, &loans, today, self.thresholds);

        if !alerts.is_empty() {
            let now = Utc::now().to_rfc3339();
            let rows: Vec<Value> = alerts
                .iter()
                .map(|alert| json!({
                    "material_id": alert.material_id,
                    "alert_type": alert.alert_type,
                    "priority": alert.priority,
                    "status": AlertStatus::Active,
                    "message": alert.message,
                    "resolved": false,
                    "created_at": now
                }))
                .collect();

            self.supabase
                .execute(Method::POST, "/rest/v1/alerts", None, Some(Value::Array(rows)))
                .await?;
        }

        let active = self.list(&AlertQuery { resolved: Some(false), ..Default::default() }).await?.len();

        let summary = SweepSummary {
            deleted: deleted.len(),
            created: alerts.len(),
            active,
        };
        info!("Alert sweep: {:?}", summary);
        Ok(summary)
    }

    pub async fn list(&self, query: &AlertQuery) -> Result<Vec<Alert>, MaterialError> {
        debug!("Listing alerts: {:?}", query);

        let mut query_parts = Vec::new();
        if let Some(alert_type) = query.alert_type {
            query_parts.push(format!("alert_type=eq.{}", alert_type));
        }
        if let Some(priority) = query.priority {
            query_parts.push(format!("priority=eq.{}", priority));
        }
        if let Some(resolved) = query.resolved {
            query_parts.push(format!("resolved=eq.{}", resolved));
        }
        query_parts.push("order=created_at.desc".to_string());

        let path = format!("/rest/v1/alerts?{}", query_parts.join("&"));
        fetch_rows(&self.supabase, &path).await
    }

    pub async fn resolve(&self, alert_id: Uuid) -> Result<Alert, MaterialError> {
        let path = format!("/rest/v1/alerts?id=eq.{}", alert_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            None,
            Some(json!({ "resolved": true, "status": AlertStatus::Resolved })),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let row = result.into_iter().next().ok_or(MaterialError::AlertNotFound)?;
        let alert: Alert = serde_json::from_value(row)?;

        info!("Alert {} resolved", alert_id);
        Ok(alert)
    }

    pub async fn delete(&self, alert_id: Uuid) -> Result<(), MaterialError> {
        let path = format!("/rest/v1/alerts?id=eq.{}", alert_id);
        let deleted: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            None,
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if deleted.is_empty() {
            return Err(MaterialError::AlertNotFound);
        }

        info!("Alert {} deleted", alert_id);
        Ok(())
    }
}
