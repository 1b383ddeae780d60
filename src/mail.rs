//! Email draft of completed tasks.
//!
//! Nothing is sent from here: the draft is a `mailto:` URL handed to the
//! platform's mail client, which the user then reviews and sends.

use crate::models::{Session, Task};
use crate::{Error, Result};

/// A composed draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub to: Option<String>,
    pub subject: String,
    pub body: String,
}

impl Draft {
    /// The draft as a percent-encoded `mailto:` URL.
    pub fn mailto_url(&self) -> String {
        let to = self
            .to
            .as_deref()
            .map(|to| urlencoding::encode(to).into_owned())
            .unwrap_or_default();
        format!(
            "mailto:{}?subject={}&body={}",
            to,
            urlencoding::encode(&self.subject),
            urlencoding::encode(&self.body)
        )
    }
}

/// Compose a summary of the completed tasks in `tasks`.
///
/// Fails with `InvalidInput` when nothing is completed.
pub fn compose_completed_summary(
    session: &Session,
    tasks: &[Task],
    to: Option<&str>,
) -> Result<Draft> {
    let completed: Vec<&Task> = tasks.iter().filter(|t| t.completed).collect();
    if completed.is_empty() {
        return Err(Error::InvalidInput(
            "No completed tasks to share".to_string(),
        ));
    }

    let subject = format!(
        "{} completed {} task{}",
        session.display_name,
        completed.len(),
        if completed.len() == 1 { "" } else { "s" }
    );

    let mut body = String::from("Completed tasks:\n\n");
    for task in &completed {
        body.push_str("- ");
        body.push_str(&task.text);
        body.push('\n');
    }

    Ok(Draft {
        to: to.map(str::trim).filter(|t| !t.is_empty()).map(String::from),
        subject,
        body,
    })
}

/// Open `draft` in the default mail client.
#[cfg(not(target_arch = "wasm32"))]
pub fn open_draft(draft: &Draft) -> Result<()> {
    let url = draft.mailto_url();
    tracing::info!(subject = %draft.subject, "Opening mail draft");
    crate::sys::open_url(&url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::directory;
    use chrono::{TimeZone, Utc};

    fn session() -> Session {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Session::for_identity(&directory::IDENTITIES[2], now)
    }

    fn task(id: i64, text: &str, completed: bool) -> Task {
        Task {
            id,
            text: text.to_string(),
            completed,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            owner_id: "3".to_string(),
        }
    }

    #[test]
    fn test_summary_lists_only_completed() {
        let tasks = vec![
            task(1, "Buy milk", true),
            task(2, "Walk dog", false),
            task(3, "File taxes", true),
        ];
        let draft = compose_completed_summary(&session(), &tasks, None).unwrap();

        assert_eq!(draft.subject, "Demo completed 2 tasks");
        assert_eq!(draft.body, "Completed tasks:\n\n- Buy milk\n- File taxes\n");
        assert_eq!(draft.to, None);
    }

    #[test]
    fn test_summary_singular_subject() {
        let tasks = vec![task(1, "Buy milk", true)];
        let draft = compose_completed_summary(&session(), &tasks, Some("boss@example.com")).unwrap();
        assert_eq!(draft.subject, "Demo completed 1 task");
        assert_eq!(draft.to.as_deref(), Some("boss@example.com"));
    }

    #[test]
    fn test_summary_requires_completed_tasks() {
        let tasks = vec![task(1, "Buy milk", false)];
        assert!(matches!(
            compose_completed_summary(&session(), &tasks, None),
            Err(Error::InvalidInput(_))
        ));
        assert!(compose_completed_summary(&session(), &[], None).is_err());
    }

    #[test]
    fn test_mailto_url_is_percent_encoded() {
        let draft = Draft {
            to: Some("a b@example.com".to_string()),
            subject: "Done & dusted".to_string(),
            body: "- one\n".to_string(),
        };
        assert_eq!(
            draft.mailto_url(),
            "mailto:a%20b%40example.com?subject=Done%20%26%20dusted&body=-%20one%0A"
        );
    }

    #[test]
    fn test_blank_recipient_is_dropped() {
        let tasks = vec![task(1, "Buy milk", true)];
        let draft = compose_completed_summary(&session(), &tasks, Some("  ")).unwrap();
        assert_eq!(draft.to, None);
        assert!(draft.mailto_url().starts_with("mailto:?subject="));
    }
}
