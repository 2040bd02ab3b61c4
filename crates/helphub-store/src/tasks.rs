use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use helphub_shared::TaskStatus;
use rusqlite::{params, OptionalExtension};

use crate::database::{format_timestamp, parse_enum, parse_json, parse_timestamp, Database};
use crate::error::Result;
use crate::models::ProjectTask;

const TASK_COLUMNS: &str = "project_id, project_title, organizer_id, task_id, task_title,
     status, deadline, assigned_volunteer_ids";

impl Database {
    /// Insert or overwrite a task and return the status it had before.
    pub fn upsert_task(&mut self, task: &ProjectTask) -> Result<Option<TaskStatus>> {
        let tx = self.conn_mut().transaction()?;

        let previous: Option<String> = tx
            .query_row(
                "SELECT status FROM project_tasks WHERE project_id = ?1 AND task_id = ?2",
                params![task.project_id, task.task_id],
                |row| row.get(0),
            )
            .optional()?;
        let previous = previous
            .map(|status| parse_enum::<TaskStatus>(0, &status))
            .transpose()?;

        tx.execute(
            "INSERT INTO project_tasks (project_id, task_id, project_title, task_title,
                 organizer_id, status, deadline, assigned_volunteer_ids)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(project_id, task_id) DO UPDATE SET
                 project_title = excluded.project_title,
                 task_title = excluded.task_title,
                 organizer_id = excluded.organizer_id,
                 status = excluded.status,
                 deadline = excluded.deadline,
                 assigned_volunteer_ids = excluded.assigned_volunteer_ids",
            params![
                task.project_id,
                task.task_id,
                task.project_title,
                task.task_title,
                task.organizer_id,
                task.status.as_str(),
                task.deadline.as_ref().map(format_timestamp),
                serde_json::to_string(&task.assigned_volunteer_ids)?,
            ],
        )?;
        tx.commit()?;

        Ok(previous)
    }

    pub fn get_task(&self, project_id: &str, task_id: &str) -> Result<Option<ProjectTask>> {
        let task = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {TASK_COLUMNS} FROM project_tasks
                     WHERE project_id = ?1 AND task_id = ?2"
                ),
                params![project_id, task_id],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    /// Distinct volunteers assigned to any task of the project, ordered by id.
    pub fn project_assignees(&self, project_id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT assigned_volunteer_ids FROM project_tasks WHERE project_id = ?1")?;
        let rows = stmt.query_map(params![project_id], |row| {
            let assigned: String = row.get(0)?;
            parse_json::<Vec<String>>(0, &assigned)
        })?;

        let mut assignees = BTreeSet::new();
        for row in rows {
            assignees.extend(row?);
        }
        Ok(assignees.into_iter().collect())
    }

    /// Unfinished tasks with `from <= deadline < to`, earliest deadline first.
    pub fn tasks_due_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ProjectTask>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM project_tasks
             WHERE deadline IS NOT NULL AND deadline >= ?1 AND deadline < ?2
               AND status NOT IN ('completed', 'confirmed')
             ORDER BY deadline, project_id, task_id"
        ))?;
        let rows = stmt.query_map(
            params![format_timestamp(&from), format_timestamp(&to)],
            row_to_task,
        )?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectTask> {
    let status: String = row.get(5)?;
    let deadline: Option<String> = row.get(6)?;
    let assigned: String = row.get(7)?;

    Ok(ProjectTask {
        project_id: row.get(0)?,
        project_title: row.get(1)?,
        organizer_id: row.get(2)?,
        task_id: row.get(3)?,
        task_title: row.get(4)?,
        status: parse_enum(5, &status)?,
        deadline: deadline.map(|d| parse_timestamp(6, &d)).transpose()?,
        assigned_volunteer_ids: parse_json(7, &assigned)?,
    })
}
