//! Calendar events shown on the dashboard.
//!
//! Events are dated records keyed by `start_time` (Unix ms). Listing is by
//! start-time window; `upcoming` returns the next few events from now.

use anyhow::Result;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{CalendarEvent, NewCalendarEvent};
use crate::store::CalendarStore;

/// Status assigned to every new event.
pub const SCHEDULED: &str = "scheduled";

pub const DEFAULT_UPCOMING_LIMIT: usize = 10;

/// Listing filter. `from`/`to` bound `start_time` inclusively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarFilter {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl CalendarFilter {
    pub fn matches(&self, event: &CalendarEvent) -> bool {
        self.from.map_or(true, |from| event.start_time >= from)
            && self.to.map_or(true, |to| event.start_time <= to)
    }
}

pub async fn create<S: CalendarStore + ?Sized>(
    store: &S,
    new_event: NewCalendarEvent,
) -> Result<CalendarEvent> {
    if new_event.title.trim().is_empty() {
        return Err(CoreError::validation("title is required").into());
    }
    if new_event.event_type.trim().is_empty() {
        return Err(CoreError::validation("type is required").into());
    }
    if let Some(end) = new_event.end_time {
        if end < new_event.start_time {
            return Err(CoreError::validation(format!(
                "endTime ({}) is before startTime ({})",
                end, new_event.start_time
            ))
            .into());
        }
    }

    let event = CalendarEvent {
        id: Uuid::new_v4().to_string(),
        title: new_event.title.trim().to_string(),
        description: new_event.description,
        start_time: new_event.start_time,
        end_time: new_event.end_time,
        event_type: new_event.event_type.trim().to_string(),
        recurrence: new_event.recurrence.filter(|r| !r.trim().is_empty()),
        source: new_event.source.filter(|s| !s.trim().is_empty()),
        status: SCHEDULED.to_string(),
    };
    store.insert_event(&event).await?;
    tracing::info!(id = %event.id, title = %event.title, "calendar event created");
    Ok(event)
}

/// Events whose start falls inside `filter`, earliest first.
pub async fn list<S: CalendarStore + ?Sized>(
    store: &S,
    filter: &CalendarFilter,
) -> Result<Vec<CalendarEvent>> {
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if from > to {
            return Err(CoreError::validation(format!(
                "from ({}) must not be after to ({})",
                from, to
            ))
            .into());
        }
    }
    store.list_events(filter, None).await
}

/// The next `limit` events starting at or after `now`, earliest first.
pub async fn upcoming<S: CalendarStore + ?Sized>(
    store: &S,
    now: i64,
    limit: Option<usize>,
) -> Result<Vec<CalendarEvent>> {
    let limit = limit.unwrap_or(DEFAULT_UPCOMING_LIMIT);
    if limit == 0 {
        return Ok(Vec::new());
    }
    let filter = CalendarFilter {
        from: Some(now),
        to: None,
    };
    store.list_events(&filter, Some(limit)).await
}

pub async fn delete<S: CalendarStore + ?Sized>(store: &S, id: &str) -> Result<()> {
    if !store.delete_event(id).await? {
        return Err(CoreError::not_found(format!("calendar event '{}'", id)).into());
    }
    tracing::info!(id, "calendar event deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;

    fn new_event(title: &str, start_time: i64) -> NewCalendarEvent {
        NewCalendarEvent {
            title: title.to_string(),
            description: String::new(),
            start_time,
            end_time: None,
            event_type: "meeting".to_string(),
            recurrence: None,
            source: None,
        }
    }

    #[tokio::test]
    async fn create_validates_fields() {
        let store = InMemoryStore::new();

        let err = create(&store, new_event(" ", 10)).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<CoreError>(),
            Some(&CoreError::validation("title is required"))
        );

        let mut backwards = new_event("standup", 100);
        backwards.end_time = Some(50);
        let err = create(&store, backwards).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<CoreError>(), Some(CoreError::Validation(_))));

        let created = create(&store, new_event("standup", 100)).await.unwrap();
        assert_eq!(created.status, SCHEDULED);
    }

    #[tokio::test]
    async fn list_by_start_time_window() {
        let store = InMemoryStore::new();
        for (title, start) in [("c", 300), ("a", 100), ("b", 200)] {
            create(&store, new_event(title, start)).await.unwrap();
        }

        let window = list(
            &store,
            &CalendarFilter {
                from: Some(100),
                to: Some(200),
            },
        )
        .await
        .unwrap();
        let titles: Vec<&str> = window.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);

        let err = list(
            &store,
            &CalendarFilter {
                from: Some(5),
                to: Some(1),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err.downcast_ref::<CoreError>(), Some(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn upcoming_skips_past_and_honours_limit() {
        let store = InMemoryStore::new();
        for (title, start) in [("past", 50), ("now", 100), ("soon", 150), ("later", 400)] {
            create(&store, new_event(title, start)).await.unwrap();
        }

        let next = upcoming(&store, 100, Some(2)).await.unwrap();
        let titles: Vec<&str> = next.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["now", "soon"]);

        assert_eq!(upcoming(&store, 100, None).await.unwrap().len(), 3);
        assert!(upcoming(&store, 100, Some(0)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_unknown_event_is_not_found() {
        let store = InMemoryStore::new();
        let event = create(&store, new_event("review", 10)).await.unwrap();
        delete(&store, &event.id).await.unwrap();
        assert!(list(&store, &CalendarFilter::default()).await.unwrap().is_empty());

        let err = delete(&store, &event.id).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<CoreError>(), Some(CoreError::NotFound(_))));
    }
}
