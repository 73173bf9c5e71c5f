use std::collections::HashMap;

use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    CreateLoanRequest, HistoryAction, Loan, LoanQuery, LoanStatus, LoanView, MaterialError,
    MaterialState,
};
use crate::services::material::{fetch_rows, MaterialService};
use crate::services::rules::quantity_after_state_change;

pub struct LoanService {
    supabase: SupabaseClient,
    materials: MaterialService,
}

impl LoanService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            materials: MaterialService::new(config),
        }
    }

    pub async fn list_all(&self) -> Result<Vec<Loan>, MaterialError> {
        fetch_rows(&self.supabase, "/rest/v1/loans?order=loan_date.desc").await
    }

    /// Loans with the status recomputed against `today`, so an ongoing loan
    /// past its due date lists as overdue before anything re-saves it.
    pub async fn list(&self, query: &LoanQuery, today: NaiveDate) -> Result<Vec<LoanView>, MaterialError> {
        debug!("Listing loans: {:?}", query);

        let (loans, materials) = futures::try_join!(self.list_all(), self.materials.list_all())?;
        let names: HashMap<Uuid, String> = materials.into_iter().map(|m| (m.id, m.name)).collect();

        Ok(loans
            .into_iter()
            .map(|mut loan| {
                loan.status = LoanStatus::derive(loan.due_date, loan.returned_on, today);
                loan
            })
            .filter(|loan| query.status.map_or(true, |status| loan.status == status))
            .map(|loan| {
                let name = names.get(&loan.material_id).cloned();
                LoanView::new(loan, name, today)
            })
            .collect())
    }

    pub async fn get(&self, loan_id: Uuid, today: NaiveDate) -> Result<LoanView, MaterialError> {
        let loan = self.get_loan(loan_id).await?;
        let material = self.materials.get(loan.material_id).await.ok();

        Ok(LoanView::new(loan, material.map(|m| m.name), today))
    }

    async fn get_loan(&self, loan_id: Uuid) -> Result<Loan, MaterialError> {
        let path = format!("/rest/v1/loans?id=eq.{}", loan_id);
        fetch_rows(&self.supabase, &path).await?
            .into_iter()
            .next()
            .ok_or(MaterialError::LoanNotFound)
    }

    pub async fn create(&self, request: CreateLoanRequest, today: NaiveDate) -> Result<Loan, MaterialError> {
        debug!("Lending material {} to {}", request.material_id, request.borrower);

        let mut errors = Vec::new();
        if request.borrower.trim().is_empty() {
            errors.push("Borrower is required".to_string());
        }
        if request.service.trim().is_empty() {
            errors.push("Service is required".to_string());
        }
        if request.due_date < today {
            errors.push("Due date cannot be in the past".to_string());
        }
        if !errors.is_empty() {
            return Err(MaterialError::Invalid(errors));
        }

        let material = self.materials.get(request.material_id).await?;
        if material.state != MaterialState::InService || material.quantity == 0 {
            warn!("Material {} cannot be lent from state {}", material.id, material.state);
            return Err(MaterialError::NotAvailable {
                state: material.state,
                quantity: material.quantity,
            });
        }

        let loan_data = json!({
            "material_id": request.material_id,
            "borrower": request.borrower.trim(),
            "service": request.service.trim(),
            "loan_date": today.format("%Y-%m-%d").to_string(),
            "due_date": request.due_date.format("%Y-%m-%d").to_string(),
            "returned_on": null,
            "notes": request.notes,
            "status": LoanStatus::derive(request.due_date, None, today)
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/loans",
            None,
            Some(loan_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let row = result.into_iter().next()
            .ok_or_else(|| MaterialError::DatabaseError("Failed to create loan".to_string()))?;
        let loan: Loan = serde_json::from_value(row)?;

        let quantity = quantity_after_state_change(material.state, MaterialState::Loaned, material.quantity)?;
        self.materials.set_state(material.id, MaterialState::Loaned, quantity).await?;
        self.materials.record_history(
            material.id,
            HistoryAction::Loan,
            &format!("Lent to {} ({}) until {}", loan.borrower, loan.service, loan.due_date),
        ).await?;

        info!("Loan {} created for material {}", loan.id, material.id);
        Ok(loan)
    }

    pub async fn return_loan(&self, loan_id: Uuid, today: NaiveDate) -> Result<Loan, MaterialError> {
        let loan = self.get_loan(loan_id).await?;
        if loan.is_returned() {
            warn!("Loan {} returned twice", loan_id);
            return Err(MaterialError::AlreadyReturned);
        }

        let updated = self.patch(loan_id, json!({
            "returned_on": today.format("%Y-%m-%d").to_string(),
            "status": LoanStatus::derive(loan.due_date, Some(today), today)
        })).await?;

        // A material already moved out of `loaned` got its unit back at that point.
        let material = self.materials.get(loan.material_id).await?;
        if material.state == MaterialState::Loaned {
            let quantity = quantity_after_state_change(material.state, MaterialState::InService, material.quantity)?;
            self.materials.set_state(material.id, MaterialState::InService, quantity).await?;
        } else {
            warn!(
                "Material {} is {} at loan {} return, leaving its state and quantity",
                material.id, material.state, loan_id
            );
        }
        self.materials.record_history(
            material.id,
            HistoryAction::Return,
            &format!("Returned by {}", loan.borrower),
        ).await?;

        info!("Loan {} returned", loan_id);
        Ok(updated)
    }

    pub async fn extend(
        &self,
        loan_id: Uuid,
        due_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Loan, MaterialError> {
        let loan = self.get_loan(loan_id).await?;
        if loan.is_returned() {
            return Err(MaterialError::AlreadyReturned);
        }
        if due_date <= loan.due_date {
            return Err(MaterialError::InvalidDueDate { current: loan.due_date });
        }

        let updated = self.patch(loan_id, json!({
            "due_date": due_date.format("%Y-%m-%d").to_string(),
            "status": LoanStatus::derive(due_date, None, today)
        })).await?;

        info!("Loan {} extended to {}", loan_id, due_date);
        Ok(updated)
    }

    async fn patch(&self, loan_id: Uuid, body: Value) -> Result<Loan, MaterialError> {
        let path = format!("/rest/v1/loans?id=eq.{}", loan_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            None,
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let row = result.into_iter().next().ok_or(MaterialError::LoanNotFound)?;
        Ok(serde_json::from_value(row)?)
    }
}
