//! Domain triggers delivered by the external trigger source.
//!
//! Each variant carries the snapshot fields its handler needs; the wider
//! domain schema (events, projects, fundraisers) stays outside the engine.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use helphub_shared::achievements::{
    self, COMMUNITY_FAN, DONATOR, PHILANTHROPIST, PHOTOGRAPHER, PROJECT_LEADER, TEAM_PLAYER,
};
use helphub_shared::constants::*;
use helphub_shared::{NotificationCategory, Payload, TaskStatus};
use helphub_store::{CalendarEvent, ProjectTask};

use crate::achievements::UnlockOutcome;
use crate::dispatcher::{DispatchReport, Notification};
use crate::error::{EngineError, Result};
use crate::Engine;

/// Event fields whose change is announced to participants.
const IMPORTANT_EVENT_FIELDS: &[&str] = &["name", "date", "locationText", "city", "description", "duration"];

const DEFAULT_AUTHOR_NAME: &str = "A user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    EventCreated {
        event_id: String,
        name: String,
        starts_at: DateTime<Utc>,
        organizer_id: String,
        #[serde(default)]
        participant_ids: Vec<String>,
    },
    EventParticipantsChanged {
        event_id: String,
        participant_ids: Vec<String>,
    },
    EventUpdated {
        event_id: String,
        name: String,
        /// Names of the fields the update touched, as the client stores them.
        #[serde(default)]
        changed_fields: Vec<String>,
        #[serde(default)]
        starts_at: Option<DateTime<Utc>>,
        /// Falls back to the stored participants.
        #[serde(default)]
        participant_ids: Option<Vec<String>>,
    },
    Donation {
        donation_id: String,
        fundraising_id: String,
        fundraising_title: String,
        #[serde(default)]
        organizer_id: Option<String>,
        #[serde(default)]
        donor_id: Option<String>,
        donor_name: String,
        /// Whole currency units.
        amount: i64,
        donor_total_donated: i64,
        donor_donation_count: u32,
    },
    FriendAdded {
        user_id: String,
        friend_count: u32,
    },
    ProjectApplicationApproved {
        application_id: String,
        project_id: String,
        project_title: String,
        volunteer_id: String,
        approved_project_count: u32,
    },
    ProjectApplicationRejected {
        application_id: String,
        project_id: String,
        project_title: String,
        volunteer_id: String,
    },
    ProjectCompleted {
        project_id: String,
        organizer_id: String,
    },
    ProjectCreated {
        project_id: String,
        organizer_id: String,
    },
    ReportCreated {
        report_id: String,
        organizer_id: String,
        #[serde(default)]
        photo_count: u32,
        /// `event`, `project` or `fundraising`.
        #[serde(default)]
        entity_type: Option<String>,
        #[serde(default)]
        entity_id: Option<String>,
        #[serde(default)]
        author_name: Option<String>,
        /// Explicit audience; when empty, event participants or project
        /// assignees are looked up from the store.
        #[serde(default)]
        recipient_ids: Vec<String>,
    },
    OrganizerFeedback {
        report_id: String,
        participant_id: String,
    },
    TaskConfirmed {
        project_id: String,
        project_title: String,
        task_id: String,
        task_title: String,
        volunteer_ids: Vec<String>,
    },
    TaskUpdated {
        project_id: String,
        project_title: String,
        #[serde(default)]
        organizer_id: Option<String>,
        task_id: String,
        task_title: String,
        status: TaskStatus,
        #[serde(default)]
        deadline: Option<DateTime<Utc>>,
        #[serde(default)]
        assigned_volunteer_ids: Vec<String>,
    },
    Notify {
        user_ids: Vec<String>,
        title: String,
        body: String,
        category: NotificationCategory,
        #[serde(default)]
        data: Payload,
    },
}

impl Trigger {
    pub fn kind(&self) -> &'static str {
        match self {
            Trigger::EventCreated { .. } => "event_created",
            Trigger::EventParticipantsChanged { .. } => "event_participants_changed",
            Trigger::EventUpdated { .. } => "event_updated",
            Trigger::Donation { .. } => "donation",
            Trigger::FriendAdded { .. } => "friend_added",
            Trigger::ProjectApplicationApproved { .. } => "project_application_approved",
            Trigger::ProjectApplicationRejected { .. } => "project_application_rejected",
            Trigger::ProjectCompleted { .. } => "project_completed",
            Trigger::ProjectCreated { .. } => "project_created",
            Trigger::ReportCreated { .. } => "report_created",
            Trigger::OrganizerFeedback { .. } => "organizer_feedback",
            Trigger::TaskConfirmed { .. } => "task_confirmed",
            Trigger::TaskUpdated { .. } => "task_updated",
            Trigger::Notify { .. } => "notify",
        }
    }
}

/// What a handler did, returned to the trigger source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TriggerReport {
    pub kind: &'static str,
    /// Achievement ids newly unlocked by this trigger.
    pub unlocked: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<DispatchReport>,
}

impl Engine {
    pub async fn handle(&self, trigger: Trigger) -> Result<TriggerReport> {
        let mut report = TriggerReport {
            kind: trigger.kind(),
            ..TriggerReport::default()
        };
        debug!(kind = report.kind, "handling trigger");

        match trigger {
            Trigger::EventCreated {
                event_id,
                name,
                starts_at,
                organizer_id,
                participant_ids,
            } => {
                let event = CalendarEvent {
                    id: event_id,
                    name,
                    organizer_id: Some(organizer_id.clone()),
                    starts_at,
                    participant_ids,
                };
                self.db.lock().await.upsert_event(&event)?;
                self.ledger
                    .apply_points(&organizer_id, POINTS_EVENT_CREATED, "Event organized")
                    .await?;
            }

            Trigger::EventParticipantsChanged {
                event_id,
                participant_ids,
            } => {
                let updated = self
                    .db
                    .lock()
                    .await
                    .set_event_participants(&event_id, &participant_ids)?;
                if !updated {
                    debug!(event = %event_id, "participants changed for unknown event");
                }
            }

            Trigger::EventUpdated {
                event_id,
                name,
                changed_fields,
                starts_at,
                participant_ids,
            } => {
                let participants = {
                    let db = self.db.lock().await;
                    let stored = db.get_event(&event_id)?;
                    let participants = participant_ids
                        .or_else(|| stored.as_ref().map(|e| e.participant_ids.clone()))
                        .unwrap_or_default();
                    let event = match stored {
                        Some(event) => Some(CalendarEvent {
                            name: name.clone(),
                            starts_at: starts_at.unwrap_or(event.starts_at),
                            participant_ids: participants.clone(),
                            ..event
                        }),
                        None => starts_at.map(|starts_at| CalendarEvent {
                            id: event_id.clone(),
                            name: name.clone(),
                            organizer_id: None,
                            starts_at,
                            participant_ids: participants.clone(),
                        }),
                    };
                    if let Some(ref event) = event {
                        db.upsert_event(event)?;
                    }
                    participants
                };

                match event_update_message(&changed_fields) {
                    None => debug!(event = %event_id, "no announced field changed"),
                    Some(_) if participants.is_empty() => {}
                    Some(message) => {
                        let notification = Notification::new(
                            NotificationCategory::EventUpdate,
                            "Event update",
                            format!("Event \"{name}\": {message}"),
                        )
                        .with_payload(
                            Payload::new()
                                .with("eventId", &event_id)
                                .with("updateType", "eventUpdate"),
                        );
                        report.dispatch = Some(self.dispatcher.dispatch(&participants, &notification).await?);
                    }
                }
            }

            Trigger::Donation {
                donation_id,
                fundraising_id,
                fundraising_title,
                organizer_id,
                donor_id,
                donor_name,
                amount,
                donor_total_donated,
                donor_donation_count,
            } => {
                if amount < 0 {
                    return Err(EngineError::InvalidTrigger(format!(
                        "negative donation amount {amount}"
                    )));
                }

                if let Some(ref donor) = donor_id {
                    let points = amount / DONATION_UNIT_PER_POINT;
                    if points > 0 {
                        self.ledger.apply_points(donor, points, "Donation").await?;
                    }
                }

                if let Some(ref organizer) = organizer_id {
                    let notification = Notification::new(
                        NotificationCategory::FundraisingDonation,
                        "New donation",
                        format!("{donor_name} donated {amount} UAH to \"{fundraising_title}\""),
                    )
                    .with_payload(
                        Payload::new()
                            .with("fundraisingId", &fundraising_id)
                            .with("donationId", &donation_id)
                            .with("amount", amount),
                    );
                    report.dispatch = Some(self.dispatcher.notify_user(organizer, &notification).await?);
                }

                if let Some(ref donor) = donor_id {
                    if donor_donation_count >= 1 {
                        self.unlock_into(&mut report, donor, DONATOR).await?;
                    }
                    if donor_total_donated >= PHILANTHROPIST_TOTAL {
                        self.unlock_into(&mut report, donor, PHILANTHROPIST).await?;
                    }
                }
            }

            Trigger::FriendAdded {
                user_id,
                friend_count,
            } => {
                self.ledger
                    .apply_points(&user_id, POINTS_FRIEND_ADDED, "New friend")
                    .await?;
                if friend_count >= COMMUNITY_FAN_FRIENDS {
                    self.unlock_into(&mut report, &user_id, COMMUNITY_FAN).await?;
                }
            }

            Trigger::ProjectApplicationApproved {
                application_id,
                project_id,
                project_title,
                volunteer_id,
                approved_project_count,
            } => {
                self.ledger
                    .apply_points(&volunteer_id, POINTS_APPLICATION_APPROVED, "Project application approved")
                    .await?;

                let notification = Notification::new(
                    NotificationCategory::ProjectApplication,
                    "Application approved",
                    format!("Your application to \"{project_title}\" was approved"),
                )
                .with_payload(
                    Payload::new()
                        .with("projectId", &project_id)
                        .with("applicationId", &application_id)
                        .with("status", "approved"),
                );
                report.dispatch = Some(self.dispatcher.notify_user(&volunteer_id, &notification).await?);

                if approved_project_count >= TEAM_PLAYER_PROJECTS {
                    self.unlock_into(&mut report, &volunteer_id, TEAM_PLAYER).await?;
                }
            }

            Trigger::ProjectApplicationRejected {
                application_id,
                project_id,
                project_title,
                volunteer_id,
            } => {
                let notification = Notification::new(
                    NotificationCategory::ProjectApplicationEdit,
                    "Application rejected",
                    format!("Your application to \"{project_title}\" was rejected"),
                )
                .with_payload(
                    Payload::new()
                        .with("projectId", &project_id)
                        .with("applicationId", &application_id)
                        .with("status", "rejected"),
                );
                report.dispatch = Some(self.dispatcher.notify_user(&volunteer_id, &notification).await?);
            }

            Trigger::ProjectCompleted {
                project_id,
                organizer_id,
            } => {
                debug!(project = %project_id, "project completed");
                self.unlock_into(&mut report, &organizer_id, PROJECT_LEADER).await?;
            }

            Trigger::ProjectCreated {
                project_id,
                organizer_id,
            } => {
                debug!(project = %project_id, "project created");
                self.ledger
                    .apply_points(&organizer_id, POINTS_PROJECT_CREATED, "Project created")
                    .await?;
            }

            Trigger::ReportCreated {
                report_id,
                organizer_id,
                photo_count,
                entity_type,
                entity_id,
                author_name,
                recipient_ids,
            } => {
                debug!(report = %report_id, photo_count, "report created");
                self.ledger
                    .apply_points(&organizer_id, POINTS_REPORT_PUBLISHED, "Report published")
                    .await?;
                if photo_count > 0 {
                    self.ledger
                        .apply_points(&organizer_id, POINTS_REPORT_PHOTOS, "Report photos")
                        .await?;
                }

                let (recipients, author) = {
                    let db = self.db.lock().await;
                    let recipients = if !recipient_ids.is_empty() {
                        recipient_ids
                    } else {
                        match (entity_type.as_deref(), entity_id.as_deref()) {
                            (Some("event"), Some(id)) => {
                                db.get_event(id)?.map(|e| e.participant_ids).unwrap_or_default()
                            }
                            (Some("project"), Some(id)) => db.project_assignees(id)?,
                            _ => Vec::new(),
                        }
                    };
                    let author = match author_name.filter(|n| !n.trim().is_empty()) {
                        Some(name) => name,
                        None => db
                            .find_user(&organizer_id)?
                            .and_then(|u| u.display_name)
                            .unwrap_or_else(|| DEFAULT_AUTHOR_NAME.to_string()),
                    };
                    (recipients, author)
                };

                if !recipients.is_empty() {
                    let notification = Notification::new(
                        NotificationCategory::ReportCreated,
                        "New report",
                        format!("{author} published a new report"),
                    )
                    .with_payload(
                        Payload::new()
                            .with("reportId", &report_id)
                            .with("entityType", entity_type.as_deref().unwrap_or_default())
                            .with("entityId", entity_id.as_deref().unwrap_or_default())
                            .with("authorId", &organizer_id),
                    );
                    report.dispatch = Some(self.dispatcher.dispatch(&recipients, &notification).await?);
                }

                if photo_count > 0 {
                    self.unlock_into(&mut report, &organizer_id, PHOTOGRAPHER).await?;
                }
            }

            Trigger::OrganizerFeedback {
                report_id,
                participant_id,
            } => {
                debug!(report = %report_id, "organizer feedback");
                self.ledger
                    .apply_points(&participant_id, POINTS_ORGANIZER_FEEDBACK, "Organizer feedback")
                    .await?;
            }

            Trigger::TaskConfirmed {
                project_id,
                project_title,
                task_id,
                task_title,
                volunteer_ids,
            } => {
                report.dispatch = Some(
                    self.confirm_task(&project_id, &project_title, &task_id, &task_title, volunteer_ids)
                        .await?,
                );
            }

            Trigger::TaskUpdated {
                project_id,
                project_title,
                organizer_id,
                task_id,
                task_title,
                status,
                deadline,
                assigned_volunteer_ids,
            } => {
                let task = ProjectTask {
                    project_id,
                    project_title,
                    organizer_id,
                    task_id,
                    task_title,
                    status,
                    deadline,
                    assigned_volunteer_ids,
                };
                let previous = self.db.lock().await.upsert_task(&task)?;

                // New tasks and unchanged statuses are only recorded.
                let transitioned = previous.is_some_and(|p| p != task.status);
                match task.status {
                    _ if !transitioned => {}
                    TaskStatus::Completed => {
                        if let Some(ref organizer) = task.organizer_id {
                            let notification = Notification::new(
                                NotificationCategory::TaskCompleted,
                                "Task awaiting confirmation",
                                format!(
                                    "Task \"{}\" in \"{}\" is done and needs your review",
                                    task.task_title, task.project_title
                                ),
                            )
                            .with_payload(
                                Payload::new()
                                    .with("projectId", &task.project_id)
                                    .with("taskId", &task.task_id),
                            );
                            report.dispatch = Some(self.dispatcher.notify_user(organizer, &notification).await?);
                        }
                    }
                    TaskStatus::Confirmed => {
                        report.dispatch = Some(
                            self.confirm_task(
                                &task.project_id,
                                &task.project_title,
                                &task.task_id,
                                &task.task_title,
                                task.assigned_volunteer_ids.clone(),
                            )
                            .await?,
                        );
                    }
                    TaskStatus::Open | TaskStatus::InProgress => {}
                }
            }

            Trigger::Notify {
                user_ids,
                title,
                body,
                category,
                data,
            } => {
                if user_ids.is_empty() {
                    return Err(EngineError::InvalidTrigger("notify without recipients".into()));
                }
                if title.trim().is_empty() {
                    return Err(EngineError::InvalidTrigger("notify without title".into()));
                }
                let notification = Notification {
                    title,
                    body,
                    category,
                    payload: data,
                };
                report.dispatch = Some(self.dispatcher.dispatch(&user_ids, &notification).await?);
            }
        }

        info!(kind = report.kind, unlocked = report.unlocked.len(), "trigger handled");
        Ok(report)
    }

    /// Credit every distinct volunteer of a confirmed task and tell them.
    async fn confirm_task(
        &self,
        project_id: &str,
        project_title: &str,
        task_id: &str,
        task_title: &str,
        volunteer_ids: Vec<String>,
    ) -> Result<DispatchReport> {
        let volunteers: BTreeSet<String> = volunteer_ids.into_iter().collect();
        for volunteer in &volunteers {
            self.ledger
                .apply_points(volunteer, POINTS_TASK_CONFIRMED, "Task confirmed")
                .await?;
        }

        let notification = Notification::new(
            NotificationCategory::TaskConfirmed,
            "Task confirmed",
            format!("Your task \"{task_title}\" in \"{project_title}\" was confirmed"),
        )
        .with_payload(
            Payload::new()
                .with("projectId", project_id)
                .with("taskId", task_id),
        );
        self.dispatcher.dispatch(&volunteers, &notification).await
    }

    async fn unlock_into(&self, report: &mut TriggerReport, user_id: &str, achievement_id: &str) -> Result<()> {
        let outcome = self
            .achievements
            .unlock(user_id, achievement_id, achievements::title_for(achievement_id))
            .await?;
        if outcome == UnlockOutcome::Unlocked {
            report.unlocked.push(achievement_id.to_string());
        }
        Ok(())
    }
}

/// Participant-facing summary of an event edit, or `None` when no announced
/// field changed. A date change outranks location, then name, then duration.
fn event_update_message(changed_fields: &[String]) -> Option<&'static str> {
    let changed = |field: &str| changed_fields.iter().any(|f| f == field);
    if !IMPORTANT_EVENT_FIELDS.iter().any(|f| changed(*f)) {
        return None;
    }

    let message = if changed("date") {
        "The date has changed"
    } else if changed("locationText") || changed("city") {
        "The location has changed"
    } else if changed("name") {
        "The name has changed"
    } else if changed("duration") {
        "The duration has changed"
    } else {
        "Event details were updated"
    };
    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{harness, seed_user, Harness};
    use helphub_shared::Role;
    use helphub_store::User;

    #[test]
    fn triggers_are_tagged_by_kind() {
        let json = r#"{"kind":"friend_added","user_id":"u","friend_count":5}"#;
        let trigger: Trigger = serde_json::from_str(json).unwrap();
        assert_eq!(
            trigger,
            Trigger::FriendAdded {
                user_id: "u".into(),
                friend_count: 5
            }
        );
        assert_eq!(trigger.kind(), "friend_added");

        let json = r#"{"kind":"notify","user_ids":["a"],"title":"t","body":"b","category":"adminNotification","data":{"x":"1"}}"#;
        let trigger: Trigger = serde_json::from_str(json).unwrap();
        assert!(matches!(trigger, Trigger::Notify { category: NotificationCategory::AdminNotification, .. }));
    }

    #[tokio::test]
    async fn donation_awards_points_and_achievements() {
        let h = harness();
        seed_user(&h.db, "donor", Role::Volunteer, None).await;
        seed_user(&h.db, "org", Role::Organization, Some("tok-org")).await;

        let report = h
            .engine
            .handle(Trigger::Donation {
                donation_id: "d1".into(),
                fundraising_id: "f1".into(),
                fundraising_title: "Shelter".into(),
                organizer_id: Some("org".into()),
                donor_id: Some("donor".into()),
                donor_name: "Ada".into(),
                amount: 1250,
                donor_total_donated: 1250,
                donor_donation_count: 1,
            })
            .await
            .unwrap();

        assert_eq!(report.unlocked, vec![DONATOR.to_string(), PHILANTHROPIST.to_string()]);
        let dispatch = report.dispatch.unwrap();
        assert_eq!(dispatch.persisted, 0);
        assert_eq!(dispatch.push_success, 1);

        let db = h.db.lock().await;
        assert_eq!(db.get_user("donor").unwrap().points, 12);
        assert!(db.list_notifications("org", 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn small_donation_gives_no_points() {
        let h = harness();
        seed_user(&h.db, "donor", Role::Volunteer, None).await;

        h.engine
            .handle(Trigger::Donation {
                donation_id: "d1".into(),
                fundraising_id: "f1".into(),
                fundraising_title: "Shelter".into(),
                organizer_id: None,
                donor_id: Some("donor".into()),
                donor_name: "Ada".into(),
                amount: 99,
                donor_total_donated: 99,
                donor_donation_count: 1,
            })
            .await
            .unwrap();
        let db = h.db.lock().await;
        assert_eq!(db.get_user("donor").unwrap().points, 0);
        assert!(db.list_points_history("donor").unwrap().is_empty());
    }

    #[tokio::test]
    async fn report_with_photos() {
        let h = harness();
        seed_user(&h.db, "u", Role::Volunteer, None).await;

        let report = h
            .engine
            .handle(Trigger::ReportCreated {
                report_id: "r1".into(),
                organizer_id: "u".into(),
                photo_count: 3,
                entity_type: None,
                entity_id: None,
                author_name: None,
                recipient_ids: vec![],
            })
            .await
            .unwrap();
        assert_eq!(report.unlocked, vec![PHOTOGRAPHER.to_string()]);
        assert!(report.dispatch.is_none());
        assert_eq!(h.db.lock().await.get_user("u").unwrap().points, 15);
    }

    #[tokio::test]
    async fn task_confirmation_credits_each_volunteer_once() {
        let h = harness();
        seed_user(&h.db, "a", Role::Volunteer, None).await;
        seed_user(&h.db, "b", Role::Volunteer, None).await;

        let report = h
            .engine
            .handle(Trigger::TaskConfirmed {
                project_id: "p1".into(),
                project_title: "Garden".into(),
                task_id: "t1".into(),
                task_title: "Water plants".into(),
                volunteer_ids: vec!["a".into(), "b".into(), "a".into()],
            })
            .await
            .unwrap();
        assert_eq!(report.dispatch.unwrap().persisted, 2);

        let db = h.db.lock().await;
        assert_eq!(db.get_user("a").unwrap().points, 10);
        assert_eq!(db.get_user("b").unwrap().points, 10);
    }

    #[tokio::test]
    async fn event_created_records_event() {
        let h = harness();
        seed_user(&h.db, "org", Role::Volunteer, None).await;

        h.engine
            .handle(Trigger::EventCreated {
                event_id: "e1".into(),
                name: "Cleanup".into(),
                starts_at: Utc::now(),
                organizer_id: "org".into(),
                participant_ids: vec![],
            })
            .await
            .unwrap();
        h.engine
            .handle(Trigger::EventParticipantsChanged {
                event_id: "e1".into(),
                participant_ids: vec!["a".into()],
            })
            .await
            .unwrap();

        let db = h.db.lock().await;
        assert_eq!(db.get_event("e1").unwrap().unwrap().participant_ids, vec!["a"]);
        assert_eq!(db.get_user("org").unwrap().points, 20);
    }

    #[tokio::test]
    async fn notify_requires_recipients() {
        let h = harness();
        let err = h
            .engine
            .handle(Trigger::Notify {
                user_ids: vec![],
                title: "t".into(),
                body: "b".into(),
                category: NotificationCategory::AdminNotification,
                data: Payload::new(),
            })
            .await;
        assert!(matches!(err, Err(EngineError::InvalidTrigger(_))));
    }

    async fn seed_event(h: &Harness, id: &str, participants: &[&str]) {
        h.db.lock()
            .await
            .upsert_event(&CalendarEvent {
                id: id.to_string(),
                name: "Cleanup".into(),
                organizer_id: Some("org".into()),
                starts_at: Utc::now(),
                participant_ids: participants.iter().map(|p| p.to_string()).collect(),
            })
            .unwrap();
    }

    #[tokio::test]
    async fn event_report_reaches_participants() {
        let h = harness();
        let mut author = User::new("org", Role::Volunteer);
        author.display_name = Some("Olena".into());
        h.db.lock().await.upsert_user(&author).unwrap();
        seed_user(&h.db, "a", Role::Volunteer, Some("tok-a")).await;
        seed_user(&h.db, "b", Role::Volunteer, None).await;
        seed_event(&h, "e1", &["a", "b"]).await;

        let report = h
            .engine
            .handle(Trigger::ReportCreated {
                report_id: "r1".into(),
                organizer_id: "org".into(),
                photo_count: 0,
                entity_type: Some("event".into()),
                entity_id: Some("e1".into()),
                author_name: None,
                recipient_ids: vec![],
            })
            .await
            .unwrap();
        assert_eq!(report.dispatch.unwrap().persisted, 2);

        let sent = h.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, "Olena published a new report");
        assert_eq!(sent[0].data.get("type").map(String::as_str), Some("reportCreated"));
        assert_eq!(sent[0].data.get("entityId").map(String::as_str), Some("e1"));
        assert_eq!(sent[0].data.get("authorId").map(String::as_str), Some("org"));
    }

    #[tokio::test]
    async fn project_report_reaches_assignees() {
        let h = harness();
        seed_user(&h.db, "org", Role::Organization, None).await;
        seed_user(&h.db, "a", Role::Volunteer, None).await;
        h.engine
            .handle(Trigger::TaskUpdated {
                project_id: "p1".into(),
                project_title: "Garden".into(),
                organizer_id: Some("org".into()),
                task_id: "t1".into(),
                task_title: "Water plants".into(),
                status: TaskStatus::InProgress,
                deadline: None,
                assigned_volunteer_ids: vec!["a".into()],
            })
            .await
            .unwrap();

        h.engine
            .handle(Trigger::ReportCreated {
                report_id: "r1".into(),
                organizer_id: "org".into(),
                photo_count: 0,
                entity_type: Some("project".into()),
                entity_id: Some("p1".into()),
                author_name: None,
                recipient_ids: vec![],
            })
            .await
            .unwrap();

        let inbox = h.db.lock().await.list_notifications("a", 10).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].category, NotificationCategory::ReportCreated);
        assert_eq!(inbox[0].body, "A user published a new report");
    }

    #[tokio::test]
    async fn rejected_application_is_announced() {
        let h = harness();
        seed_user(&h.db, "v", Role::Volunteer, None).await;

        let report = h
            .engine
            .handle(Trigger::ProjectApplicationRejected {
                application_id: "app1".into(),
                project_id: "p1".into(),
                project_title: "Garden".into(),
                volunteer_id: "v".into(),
            })
            .await
            .unwrap();
        assert_eq!(report.kind, "project_application_rejected");

        let db = h.db.lock().await;
        let inbox = db.list_notifications("v", 10).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].category, NotificationCategory::ProjectApplicationEdit);
        assert_eq!(inbox[0].data.get("status"), Some("rejected"));
        assert_eq!(db.get_user("v").unwrap().points, 0);
    }

    #[tokio::test]
    async fn event_update_announces_important_changes_only() {
        let h = harness();
        seed_user(&h.db, "a", Role::Volunteer, None).await;
        seed_event(&h, "e1", &["a"]).await;

        let cosmetic = h
            .engine
            .handle(Trigger::EventUpdated {
                event_id: "e1".into(),
                name: "Cleanup".into(),
                changed_fields: vec!["coverImage".into()],
                starts_at: None,
                participant_ids: None,
            })
            .await
            .unwrap();
        assert!(cosmetic.dispatch.is_none());

        let moved = Utc::now() + chrono::Duration::days(3);
        h.engine
            .handle(Trigger::EventUpdated {
                event_id: "e1".into(),
                name: "Big cleanup".into(),
                changed_fields: vec!["name".into(), "date".into()],
                starts_at: Some(moved),
                participant_ids: None,
            })
            .await
            .unwrap();

        let db = h.db.lock().await;
        let inbox = db.list_notifications("a", 10).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].category, NotificationCategory::EventUpdate);
        assert_eq!(inbox[0].body, "Event \"Big cleanup\": The date has changed");
        assert_eq!(inbox[0].data.get("updateType"), Some("eventUpdate"));

        let stored = db.get_event("e1").unwrap().unwrap();
        assert_eq!(stored.name, "Big cleanup");
        assert_eq!(stored.participant_ids, vec!["a"]);
    }

    #[test]
    fn event_update_message_priority() {
        let fields = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        assert_eq!(event_update_message(&fields(&["photo"])), None);
        assert_eq!(
            event_update_message(&fields(&["city", "duration"])),
            Some("The location has changed")
        );
        assert_eq!(
            event_update_message(&fields(&["duration", "name"])),
            Some("The name has changed")
        );
        assert_eq!(
            event_update_message(&fields(&["description"])),
            Some("Event details were updated")
        );
    }

    #[tokio::test]
    async fn task_status_changes_notify_organizer_then_volunteers() {
        let h = harness();
        seed_user(&h.db, "org", Role::Organization, Some("tok-org")).await;
        seed_user(&h.db, "a", Role::Volunteer, None).await;

        let update = |status: TaskStatus| Trigger::TaskUpdated {
            project_id: "p1".into(),
            project_title: "Garden".into(),
            organizer_id: Some("org".into()),
            task_id: "t1".into(),
            task_title: "Water plants".into(),
            status,
            deadline: None,
            assigned_volunteer_ids: vec!["a".into()],
        };

        // First sighting is only recorded.
        let created = h.engine.handle(update(TaskStatus::InProgress)).await.unwrap();
        assert!(created.dispatch.is_none());

        let completed = h.engine.handle(update(TaskStatus::Completed)).await.unwrap();
        assert_eq!(completed.dispatch.unwrap().persisted, 1);
        let sent = h.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "Task awaiting confirmation");
        assert_eq!(sent[0].data.get("type").map(String::as_str), Some("taskCompleted"));

        // Repeating the same status is a no-op.
        let repeat = h.engine.handle(update(TaskStatus::Completed)).await.unwrap();
        assert!(repeat.dispatch.is_none());

        h.engine.handle(update(TaskStatus::Confirmed)).await.unwrap();
        let db = h.db.lock().await;
        assert_eq!(db.get_user("a").unwrap().points, 10);
        let confirmations = db
            .list_notifications("a", 10)
            .unwrap()
            .into_iter()
            .filter(|n| n.category == NotificationCategory::TaskConfirmed)
            .count();
        assert_eq!(confirmations, 1);
    }
}
