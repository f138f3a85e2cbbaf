//! # Todoist Task Source
//!
//! Reads active tasks from the Todoist REST API. The mapper owns the urgency
//! rule: Todoist priority 4 (shown as "p1" in the apps) is urgent.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::SourceError;
use crate::model::TaskItem;
use crate::retrieve::ApiClient;
use crate::sources::SourceClient;

/// Todoist priority value treated as urgent.
pub const URGENT_PRIORITY: u8 = 4;

/// `due` object of a task.
#[derive(Debug, Clone, Deserialize)]
pub struct TodoistDue {
    pub date: Option<NaiveDate>,
}

/// One active task.
#[derive(Debug, Clone, Deserialize)]
pub struct TodoistTask {
    pub id: String,
    pub content: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
    pub due: Option<TodoistDue>,
    #[serde(default)]
    pub is_completed: bool,
}

fn default_priority() -> u8 {
    1
}

/// Client authenticated with a personal API token.
pub struct TodoistClient {
    api: ApiClient,
    project_id: Option<String>,
}

impl TodoistClient {
    /// `api` must carry the bearer token. `project_id` narrows the list to one project.
    pub fn new(api: ApiClient, project_id: Option<String>) -> Self {
        Self { api, project_id }
    }
}

#[async_trait]
impl SourceClient for TodoistClient {
    type Raw = Vec<TodoistTask>;
    type Record = Vec<TaskItem>;

    fn name(&self) -> &'static str {
        "tasks"
    }

    async fn fetch_raw(&self) -> Result<Vec<TodoistTask>, SourceError> {
        let mut query = Vec::new();
        if let Some(project) = &self.project_id {
            query.push(("project_id", project.clone()));
        }
        self.api.get_json("rest/v2/tasks", &query).await
    }

    fn parse(&self, raw: Vec<TodoistTask>) -> Result<Vec<TaskItem>, SourceError> {
        Ok(map_tasks(raw))
    }
}

/// Pure mapper: drops completed tasks, flags urgency, orders urgent first then by due date.
pub fn map_tasks(raw: Vec<TodoistTask>) -> Vec<TaskItem> {
    let mut tasks: Vec<TaskItem> = raw
        .into_iter()
        .filter(|t| !t.is_completed)
        .map(|t| TaskItem {
            urgent: t.priority >= URGENT_PRIORITY,
            due: t.due.and_then(|d| d.date),
            id: t.id,
            content: t.content,
            priority: t.priority.clamp(1, 4),
        })
        .collect();

    // Stable sort keeps the provider order among equals; undated tasks go last.
    tasks.sort_by_key(|t| (!t.urgent, t.due.is_none(), t.due));
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_tasks_from_fixture() {
        let raw: Vec<TodoistTask> = serde_json::from_str(
            r#"[
                { "id": "1", "content": "Water plants", "priority": 1, "due": null },
                { "id": "2", "content": "File taxes", "priority": 4, "due": { "date": "2026-10-20", "is_recurring": false } },
                { "id": "3", "content": "Call mom", "priority": 2, "due": { "date": "2026-10-18" } },
                { "id": "4", "content": "Done already", "priority": 4, "is_completed": true },
                { "id": "5", "content": "Renew passport", "priority": 4 }
            ]"#,
        )
        .unwrap();

        let tasks = map_tasks(raw);
        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "5", "3", "1"]);
        assert_eq!(tasks.iter().filter(|t| t.urgent).count(), 2);
        assert_eq!(tasks[2].due, NaiveDate::from_ymd_opt(2026, 10, 18));
    }
}
