use chrono::{NaiveDate, Utc};
use futures::future::try_join_all;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use employee_cell::{Employee, EmployeeError, EmployeeService};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::upload::FileUpload;

use crate::models::{
    validate_create, validate_update, CreateTaskRequest, Task, TaskBoard, TaskCollaborator,
    TaskDetail, TaskDocument, TaskError, TaskListQuery, TaskNote, TaskStatus, UpdateTaskRequest,
};
use crate::services::ordering::{notification_window, reorder_plan, retain_collaborators};

impl From<EmployeeError> for TaskError {
    fn from(err: EmployeeError) -> Self {
        match err {
            EmployeeError::NotFound => TaskError::NoAccess,
            other => TaskError::DatabaseError(other.to_string()),
        }
    }
}

pub struct TaskService {
    supabase: SupabaseClient,
    employees: EmployeeService,
}

impl TaskService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            employees: EmployeeService::new(config),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, TaskError> {
        let result: Vec<Value> = self.supabase.request(Method::GET, path, None, None).await?;

        result
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(TaskError::from))
            .collect()
    }

    async fn insert<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, TaskError> {
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            path,
            None,
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let row = result.into_iter().next()
            .ok_or_else(|| TaskError::DatabaseError(format!("Insert into {} returned no row", path)))?;
        Ok(serde_json::from_value(row)?)
    }

    async fn patch_task(&self, task_id: Uuid, body: Value) -> Result<Task, TaskError> {
        let path = format!("/rest/v1/tasks?id=eq.{}", task_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            None,
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let row = result.into_iter().next().ok_or(TaskError::NotFound)?;
        Ok(serde_json::from_value(row)?)
    }

    pub async fn get(&self, task_id: Uuid) -> Result<Task, TaskError> {
        let path = format!("/rest/v1/tasks?id=eq.{}", task_id);
        self.fetch(&path).await?
            .into_iter()
            .next()
            .ok_or(TaskError::NotFound)
    }

    async fn owned_task(&self, task_id: Uuid, caller: Uuid) -> Result<Task, TaskError> {
        let task = self.get(task_id).await?;
        if task.owner_id != caller {
            warn!("Employee {} is not the owner of task {}", caller, task_id);
            return Err(TaskError::NotOwner);
        }
        Ok(task)
    }

    async fn collaborator_ids(&self, task_id: Uuid) -> Result<Vec<Uuid>, TaskError> {
        let path = format!("/rest/v1/task_collaborators?task_id=eq.{}", task_id);
        let rows: Vec<TaskCollaborator> = self.fetch(&path).await?;
        Ok(rows.into_iter().map(|c| c.employee_id).collect())
    }

    /// Owner or collaborator.
    async fn accessible_task(&self, task_id: Uuid, caller: Uuid) -> Result<Task, TaskError> {
        let task = self.get(task_id).await?;
        if task.owner_id == caller {
            return Ok(task);
        }

        if self.collaborator_ids(task_id).await?.contains(&caller) {
            Ok(task)
        } else {
            warn!("Employee {} has no access to task {}", caller, task_id);
            Err(TaskError::NoAccess)
        }
    }

    async fn owned_tasks(&self, caller: Uuid, query: &TaskListQuery) -> Result<Vec<Task>, TaskError> {
        let mut query_parts = vec![format!("owner_id=eq.{}", caller)];
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(from) = query.due_from {
            query_parts.push(format!("due_date=gte.{}", from.format("%Y-%m-%d")));
        }
        if let Some(to) = query.due_to {
            query_parts.push(format!("due_date=lte.{}", to.format("%Y-%m-%d")));
        }
        query_parts.push("order=sort_order.asc,due_date.asc".to_string());

        self.fetch(&format!("/rest/v1/tasks?{}", query_parts.join("&"))).await
    }

    async fn shared_tasks(&self, caller: Uuid) -> Result<Vec<Task>, TaskError> {
        let path = format!("/rest/v1/task_collaborators?employee_id=eq.{}", caller);
        let links: Vec<TaskCollaborator> = self.fetch(&path).await?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let ids = links.iter().map(|l| l.task_id.to_string()).collect::<Vec<_>>().join(",");
        let path = format!(
            "/rest/v1/tasks?id=in.({})&owner_id=neq.{}&order=due_date.asc",
            ids, caller
        );
        self.fetch(&path).await
    }

    pub async fn board(
        &self,
        caller: Uuid,
        query: &TaskListQuery,
        today: NaiveDate,
    ) -> Result<TaskBoard, TaskError> {
        debug!("Loading task board of employee {}", caller);

        let (employee, tasks, shared_tasks) = futures::try_join!(
            async { self.employees.get(caller).await.map_err(TaskError::from) },
            self.owned_tasks(caller, query),
            self.shared_tasks(caller),
        )?;

        let upcoming = notification_window(&tasks, today, employee.notification_enabled);

        Ok(TaskBoard {
            tasks,
            shared_tasks,
            upcoming,
            notifications_enabled: employee.notification_enabled,
        })
    }

    pub async fn create(&self, caller: Uuid, request: CreateTaskRequest) -> Result<Task, TaskError> {
        debug!("Creating task for employee {}", caller);

        validate_create(&request).map_err(TaskError::Invalid)?;

        let path = format!(
            "/rest/v1/tasks?owner_id=eq.{}&select=sort_order&order=sort_order.desc&limit=1",
            caller
        );
        let last: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        let max_order = last
            .first()
            .and_then(|row| row["sort_order"].as_u64())
            .unwrap_or(0) as u32;

        let now = Utc::now().to_rfc3339();
        let task: Task = self.insert("/rest/v1/tasks", json!({
            "description": request.description.trim(),
            "due_date": request.due_date,
            "status": TaskStatus::Pending,
            "owner_id": caller,
            "sort_order": max_order + 1,
            "notify_interval_hours": request.notify_interval_hours,
            "created_at": now,
            "updated_at": now
        })).await?;

        info!("Task {} created at position {}", task.id, task.sort_order);
        Ok(task)
    }

    pub async fn update(
        &self,
        task_id: Uuid,
        caller: Uuid,
        request: UpdateTaskRequest,
    ) -> Result<Task, TaskError> {
        validate_update(&request).map_err(TaskError::Invalid)?;
        self.owned_task(task_id, caller).await?;

        let mut update_data = serde_json::Map::new();
        if let Some(description) = request.description {
            update_data.insert("description".to_string(), json!(description.trim()));
        }
        if let Some(due_date) = request.due_date {
            update_data.insert("due_date".to_string(), json!(due_date));
        }
        if let Some(status) = request.status {
            update_data.insert("status".to_string(), json!(status));
        }
        if let Some(hours) = request.notify_interval_hours {
            update_data.insert("notify_interval_hours".to_string(), json!(hours));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let task = self.patch_task(task_id, Value::Object(update_data)).await?;
        info!("Task {} updated", task_id);
        Ok(task)
    }

    pub async fn delete(&self, task_id: Uuid, caller: Uuid) -> Result<(), TaskError> {
        self.owned_task(task_id, caller).await?;

        let path = format!("/rest/v1/tasks?id=eq.{}", task_id);
        self.supabase.execute(Method::DELETE, &path, None, None).await?;

        info!("Task {} deleted", task_id);
        Ok(())
    }

    pub async fn set_status(&self, task_id: Uuid, caller: Uuid, status: TaskStatus) -> Result<Task, TaskError> {
        self.accessible_task(task_id, caller).await?;

        let task = self.patch_task(task_id, json!({
            "status": status,
            "updated_at": Utc::now().to_rfc3339()
        })).await?;

        info!("Task {} marked {} by {}", task_id, status, caller);
        Ok(task)
    }

    pub async fn set_notification_interval(
        &self,
        task_id: Uuid,
        caller: Uuid,
        hours: u32,
    ) -> Result<Task, TaskError> {
        if hours < 1 {
            return Err(TaskError::Invalid(vec![
                "Notification interval must be at least 1 hour".to_string(),
            ]));
        }
        self.owned_task(task_id, caller).await?;

        self.patch_task(task_id, json!({
            "notify_interval_hours": hours,
            "updated_at": Utc::now().to_rfc3339()
        })).await
    }

    /// Doctors and nurses that may be added as collaborators by `caller`.
    pub async fn collaborator_candidates(&self, caller: Uuid) -> Result<Vec<Employee>, TaskError> {
        let staff = self.employees.list_care_staff().await?;
        Ok(staff.into_iter().filter(|e| e.id != caller).collect())
    }

    /// Replaces the collaborator set; ineligible ids are dropped silently.
    pub async fn set_collaborators(
        &self,
        task_id: Uuid,
        caller: Uuid,
        requested: &[Uuid],
    ) -> Result<Vec<Uuid>, TaskError> {
        let task = self.owned_task(task_id, caller).await?;

        let candidates = self.employees.get_by_ids(requested).await?;
        let retained = retain_collaborators(&candidates, task.owner_id);

        let path = format!("/rest/v1/task_collaborators?task_id=eq.{}", task_id);
        self.supabase.execute(Method::DELETE, &path, None, None).await?;

        if !retained.is_empty() {
            let rows: Vec<TaskCollaborator> = retained
                .iter()
                .map(|employee_id| TaskCollaborator { task_id, employee_id: *employee_id })
                .collect();
            self.supabase
                .execute(Method::POST, "/rest/v1/task_collaborators", None, Some(json!(rows)))
                .await?;
        }

        info!("Task {} now has {} collaborators", task_id, retained.len());
        Ok(retained)
    }

    pub async fn detail(&self, task_id: Uuid, caller: Uuid) -> Result<TaskDetail, TaskError> {
        let task = self.accessible_task(task_id, caller).await?;

        let documents_path = format!("/rest/v1/task_documents?task_id=eq.{}&order=created_at.desc", task_id);
        let notes_path = format!("/rest/v1/task_notes?task_id=eq.{}&order=created_at.desc", task_id);

        let (collaborators, documents, notes) = futures::try_join!(
            async {
                let ids = self.collaborator_ids(task_id).await?;
                self.employees.get_by_ids(&ids).await.map_err(TaskError::from)
            },
            self.fetch::<TaskDocument>(&documents_path),
            self.fetch::<TaskNote>(&notes_path),
        )?;

        Ok(TaskDetail { task, collaborators, documents, notes })
    }

    pub async fn reorder(&self, caller: Uuid, order: &[Uuid]) -> Result<Vec<(Uuid, u32)>, TaskError> {
        debug!("Reordering {} tasks for employee {}", order.len(), caller);

        let owned = self.owned_tasks(caller, &TaskListQuery::default()).await?;
        let plan = reorder_plan(&owned, order)?;

        let changed: Vec<(Uuid, u32)> = plan
            .iter()
            .copied()
            .filter(|(id, position)| {
                owned.iter().any(|t| t.id == *id && t.sort_order != *position)
            })
            .collect();

        try_join_all(changed.iter().map(|(id, position)| {
            let path = format!("/rest/v1/tasks?id=eq.{}", id);
            async move {
                self.supabase
                    .execute(Method::PATCH, &path, None, Some(json!({ "sort_order": position })))
                    .await
            }
        }))
        .await?;

        info!("Reordered tasks of employee {} ({} rows changed)", caller, changed.len());
        Ok(plan)
    }

    pub async fn upload_document(
        &self,
        task_id: Uuid,
        caller: Uuid,
        upload: FileUpload,
    ) -> Result<TaskDocument, TaskError> {
        let bytes = upload.decode().map_err(TaskError::InvalidDocument)?;
        self.accessible_task(task_id, caller).await?;

        let object_path = upload.object_path("tasks", task_id);
        let file_url = self.supabase
            .upload_object(&object_path, bytes, &upload.content_type)
            .await
            .map_err(|e| TaskError::Storage(e.to_string()))?;

        let document: TaskDocument = self.insert("/rest/v1/task_documents", json!({
            "task_id": task_id,
            "file_url": file_url,
            "file_name": upload.file_name,
            "uploader_id": caller,
            "created_at": Utc::now().to_rfc3339()
        })).await?;

        info!("Document {} attached to task {}", document.id, task_id);
        Ok(document)
    }

    pub async fn add_note(&self, task_id: Uuid, caller: Uuid, content: &str) -> Result<TaskNote, TaskError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(TaskError::Invalid(vec!["The note is empty".to_string()]));
        }
        self.accessible_task(task_id, caller).await?;

        self.insert("/rest/v1/task_notes", json!({
            "task_id": task_id,
            "content": content,
            "author_id": caller,
            "created_at": Utc::now().to_rfc3339()
        })).await
    }
}
