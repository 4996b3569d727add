//! Workflow instances, models and tasks.
//!
//! Documents, workflows and tasks refer to each other by id only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::Paginable;
use crate::field::Field;
use crate::time::Iso8601Time;

/// `{ "id": ... }` reference used for documents and actors
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRef {
    pub id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(rename = "entity-type", default)]
    pub entity_type: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub workflow_model_name: String,
    #[serde(default)]
    pub initiator: Option<String>,
    #[serde(default)]
    pub attached_document_ids: Vec<IdRef>,
    #[serde(default)]
    pub variables: BTreeMap<String, Field>,
    #[serde(default)]
    pub graph_resource: Option<String>,
}

/// A page of workflows or workflow models
pub type Workflows = Paginable<Workflow>;

/// Body for starting a workflow instance on documents
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStart {
    #[serde(rename = "entity-type")]
    entity_type: &'static str,
    pub workflow_model_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attached_document_ids: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, Field>,
}

impl WorkflowStart {
    pub fn new(workflow_model_name: impl Into<String>) -> Self {
        Self {
            entity_type: "workflow",
            workflow_model_name: workflow_model_name.into(),
            attached_document_ids: Vec::new(),
            variables: BTreeMap::new(),
        }
    }

    pub fn document(mut self, id: impl Into<String>) -> Self {
        self.attached_document_ids.push(id.into());
        self
    }

    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Field>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskComment {
    pub author: String,
    pub text: String,
    #[serde(default)]
    pub date: Option<Iso8601Time>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskAction {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    #[serde(default)]
    pub allow_task_reassignment: bool,
    #[serde(default)]
    pub task_actions: Vec<TaskAction>,
    #[serde(default)]
    pub schemas: Vec<Field>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "entity-type", default)]
    pub entity_type: String,
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub workflow_instance_id: Option<String>,
    #[serde(default)]
    pub workflow_model_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub directive: Option<String>,
    #[serde(default)]
    pub created: Option<Iso8601Time>,
    #[serde(default)]
    pub due_date: Option<Iso8601Time>,
    #[serde(default)]
    pub node_name: Option<String>,
    #[serde(default)]
    pub target_document_ids: Vec<IdRef>,
    #[serde(default)]
    pub actors: Vec<IdRef>,
    #[serde(default)]
    pub comments: Vec<TaskComment>,
    #[serde(default)]
    pub variables: BTreeMap<String, Field>,
    #[serde(default)]
    pub task_info: TaskInfo,
}

/// A page of tasks
pub type Tasks = Paginable<Task>;

/// Body sent when completing a task with an action
#[derive(Clone, Debug, Serialize)]
pub struct TaskCompletion {
    #[serde(rename = "entity-type")]
    entity_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, Field>,
}

impl Default for TaskCompletion {
    fn default() -> Self {
        Self {
            entity_type: "task",
            comment: None,
            variables: BTreeMap::new(),
        }
    }
}

impl TaskCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Field>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_task() {
        let json = r#"{
            "entity-type": "task",
            "id": "t1",
            "name": "wf.serialDocumentReview.DocumentValidation",
            "workflowInstanceId": "w1",
            "workflowModelName": "SerialDocumentReview",
            "state": "opened",
            "directive": "wf.serialDocumentReview.AcceptReject",
            "created": "2020-05-01T10:00:00.000Z",
            "dueDate": "2020-05-04T10:00:00.000Z",
            "nodeName": "Task3c7",
            "targetDocumentIds": [{"id": "doc1"}],
            "actors": [{"id": "user:jdoe"}],
            "comments": [],
            "variables": {"comment": null, "validationOrReview": "validation"},
            "taskInfo": {"allowTaskReassignment": true, "taskActions": [{"name": "reject", "url": "x", "label": "Reject"}], "schemas": []}
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.target_document_ids[0].id, "doc1");
        assert_eq!(task.task_info.task_actions[0].name, "reject");
        assert!(task.variables["comment"].is_null());
        assert!(task.due_date.unwrap() > task.created.unwrap());
    }

    #[test]
    fn test_completion_payload() {
        let body = TaskCompletion::new()
            .comment("ok")
            .variable("validationOrReview", "review");
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(
            json,
            r#"{"entity-type":"task","comment":"ok","variables":{"validationOrReview":"review"}}"#
        );
    }

    #[test]
    fn test_workflow_start_payload() {
        let start = WorkflowStart::new("SerialDocumentReview").document("doc1");
        let json = serde_json::to_value(&start).unwrap();
        assert_eq!(json["entity-type"], "workflow");
        assert_eq!(json["attachedDocumentIds"][0], "doc1");
        assert!(json.get("variables").is_none());
    }
}
