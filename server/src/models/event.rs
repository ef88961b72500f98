use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::patch::Patch;
use super::timestamp::Timestamp;
use crate::utils::error::{AppError, AppResult};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;
/// Highest page whose offset still fits an `i64` at any allowed limit.
pub const MAX_PAGE: i64 = i64::MAX / MAX_LIMIT;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub event_id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub location: String,
    pub capacity: Option<i32>,
    pub text: String,
    pub event_owner: Uuid,
    pub pictures: Option<Vec<String>>,
    pub fb_link: Option<String>,
    pub twitter_link: Option<String>,
    pub instagram: Option<String>,
    pub calendar_event_id: Option<String>,
}

/// A row of the event listing, carrying the computed relevance rank.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ListedEvent {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub event: Event,
    pub search_priority: i32,
}

/// Predicates shared by the listing and its total count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilters {
    pub start_date: Option<DateTime<Utc>>,
    pub latest_date: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

impl EventFilters {
    /// `ILIKE` pattern matching `search` as a literal substring.
    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .filter(|term| !term.is_empty())
            .map(|term| format!("%{}%", escape_like(term)))
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Date,
    Title,
    Location,
    Relevance,
}

impl SortKey {
    /// Unknown or missing keys fall back to relevance.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("date") => SortKey::Date,
            Some("title") => SortKey::Title,
            Some("location") => SortKey::Location,
            _ => SortKey::Relevance,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            SortKey::Date => "date",
            SortKey::Title => "title",
            SortKey::Location => "location",
            SortKey::Relevance => "search_priority",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(order) if order.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// A fully resolved listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub filters: EventFilters,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub page: i64,
    pub limit: i64,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            filters: EventFilters::default(),
            sort_key: SortKey::Relevance,
            sort_order: SortOrder::Asc,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl EventQuery {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Raw `GET /events` query string.
#[derive(Debug, Default, Deserialize)]
pub struct ListEventsParams {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "latestDate")]
    pub latest_date: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListEventsParams {
    pub fn resolve(self) -> AppResult<EventQuery> {
        let sort_key = SortKey::parse(self.sort_by.as_deref());
        // Relevance always lists the best matches first.
        let sort_order = match sort_key {
            SortKey::Relevance => SortOrder::Asc,
            _ => SortOrder::parse(self.sort_order.as_deref()),
        };

        Ok(EventQuery {
            filters: EventFilters {
                start_date: parse_bound("startDate", self.start_date)?,
                latest_date: parse_bound("latestDate", self.latest_date)?,
                search: self.search.filter(|s| !s.is_empty()),
            },
            sort_key,
            sort_order,
            page: self.page.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        })
    }
}

fn parse_bound(name: &str, raw: Option<String>) -> AppResult<Option<DateTime<Utc>>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Timestamp::parse(value)
            .map(|ts| Some(ts.into_inner()))
            .ok_or_else(|| AppError::ValidationError(format!("{} must be a valid date", name))),
    }
}

/// One page of the listing plus the metadata a client needs to page further.
#[derive(Debug, Serialize)]
pub struct EventPage {
    pub events: Vec<ListedEvent>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl EventPage {
    pub fn new(events: Vec<ListedEvent>, total: i64, query: &EventQuery) -> Self {
        Self {
            events,
            total,
            page: query.page,
            limit: query.limit,
            total_pages: (total + query.limit - 1) / query.limit,
        }
    }
}

/// Body of `POST /events`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub date: Option<Timestamp>,
    #[serde(rename = "finishDate")]
    pub finish_date: Option<Timestamp>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub owner: Option<Uuid>,
    pub pictures: Option<Vec<String>>,
    #[serde(rename = "fbEvent")]
    pub fb_event: Option<String>,
    #[serde(rename = "instaLink")]
    pub insta_link: Option<String>,
    #[serde(rename = "twitterLink")]
    pub twitter_link: Option<String>,
    #[serde(rename = "calendarEventId")]
    pub calendar_event_id: Option<String>,
}

/// A validated event ready to insert.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub location: String,
    pub description: String,
    pub owner: Uuid,
    pub pictures: Option<Vec<String>>,
    pub fb_link: Option<String>,
    pub twitter_link: Option<String>,
    pub instagram: Option<String>,
    pub calendar_event_id: Option<String>,
}

impl CreateEventRequest {
    /// Checks required fields. `caller` owns the event unless `owner` is given.
    pub fn validate(self, caller: Uuid) -> AppResult<NewEvent> {
        let title = required_text("title", self.title)?;
        let date = self.date.ok_or_else(|| AppError::missing_field("date"))?.into_inner();
        let end_date = self
            .finish_date
            .ok_or_else(|| AppError::missing_field("finishDate"))?
            .into_inner();
        let location = required_text("location", self.location)?;
        let description = required_text("description", self.description)?;

        check_chronology(date, end_date)?;

        Ok(NewEvent {
            title,
            date,
            end_date,
            location,
            description,
            owner: self.owner.unwrap_or(caller),
            pictures: self.pictures.filter(|pictures| !pictures.is_empty()),
            fb_link: non_empty(self.fb_event),
            twitter_link: non_empty(self.twitter_link),
            instagram: non_empty(self.insta_link),
            calendar_event_id: non_empty(self.calendar_event_id),
        })
    }
}

/// Body of `PATCH /events/:event_id`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EventPatch {
    pub title: Patch<String>,
    pub date: Patch<Timestamp>,
    #[serde(rename = "finishDate")]
    pub finish_date: Patch<Timestamp>,
    pub location: Patch<String>,
    pub description: Patch<String>,
    pub pictures: Patch<Vec<String>>,
    #[serde(rename = "fbEvent")]
    pub fb_event: Patch<String>,
    #[serde(rename = "instaLink")]
    pub insta_link: Patch<String>,
    #[serde(rename = "twitterLink")]
    pub twitter_link: Patch<String>,
    #[serde(rename = "calendarEventId")]
    pub calendar_event_id: Patch<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        !(self.title.is_value()
            || self.date.is_value()
            || self.finish_date.is_value()
            || self.location.is_value()
            || self.description.is_value()
            || self.pictures.is_value()
            || self.fb_event.is_value()
            || self.insta_link.is_value()
            || self.twitter_link.is_value()
            || self.calendar_event_id.is_value())
    }

    /// Rejects a patch whose own bounds are out of order. Moving a single
    /// bound is checked by the `events_end_after_start` constraint.
    pub fn validate(&self) -> AppResult<()> {
        if let (Some(date), Some(end)) = (self.date.as_value(), self.finish_date.as_value()) {
            check_chronology(date.0, end.0)?;
        }
        Ok(())
    }
}

fn check_chronology(date: DateTime<Utc>, end_date: DateTime<Utc>) -> AppResult<()> {
    if end_date < date {
        return Err(AppError::ValidationError(
            "finishDate must not be before date".to_string(),
        ));
    }
    Ok(())
}

fn required_text(field: &str, value: Option<String>) -> AppResult<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::missing_field(field)),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn launch_request() -> CreateEventRequest {
        serde_json::from_value(serde_json::json!({
            "title": "Launch",
            "date": "2025-01-01",
            "finishDate": "2025-01-02",
            "location": "HQ",
            "description": "Kickoff",
        }))
        .unwrap()
    }

    #[test]
    fn test_sort_key_allow_list() {
        assert_eq!(SortKey::parse(Some("date")), SortKey::Date);
        assert_eq!(SortKey::parse(Some("title")), SortKey::Title);
        assert_eq!(SortKey::parse(Some("location")), SortKey::Location);
        assert_eq!(SortKey::parse(Some("capacity; DROP TABLE events")), SortKey::Relevance);
        assert_eq!(SortKey::parse(None), SortKey::Relevance);
    }

    #[test]
    fn test_sort_order_is_case_insensitive() {
        assert_eq!(SortOrder::parse(Some("desc")), SortOrder::Desc);
        assert_eq!(SortOrder::parse(Some("DeSc")), SortOrder::Desc);
        assert_eq!(SortOrder::parse(Some("sideways")), SortOrder::Asc);
        assert_eq!(SortOrder::parse(None), SortOrder::Asc);
    }

    #[test]
    fn test_resolve_defaults() {
        let query = ListEventsParams::default().resolve().unwrap();
        assert_eq!(query, EventQuery::default());
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn test_resolve_relevance_forces_ascending() {
        let query = ListEventsParams {
            sort_by: Some("popularity".into()),
            sort_order: Some("DESC".into()),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        assert_eq!(query.sort_key, SortKey::Relevance);
        assert_eq!(query.sort_order, SortOrder::Asc);
    }

    #[test]
    fn test_resolve_pagination() {
        let query = ListEventsParams {
            sort_by: Some("title".into()),
            sort_order: Some("desc".into()),
            page: Some(3),
            limit: Some(10),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        assert_eq!(query.sort_order, SortOrder::Desc);
        assert_eq!(query.offset(), 20);

        let clamped = ListEventsParams {
            page: Some(0),
            limit: Some(10_000),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.limit, MAX_LIMIT);
    }

    #[test]
    fn test_resolve_huge_page_keeps_offset_in_range() {
        let query = ListEventsParams {
            page: Some(i64::MAX),
            limit: Some(20),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        assert_eq!(query.page, MAX_PAGE);
        assert!(query.offset() > 0);
        assert_eq!(query.offset(), (MAX_PAGE - 1) * 20);

        let widest = ListEventsParams {
            page: Some(i64::MAX),
            limit: Some(MAX_LIMIT),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        assert!(widest.offset() > 0);
    }

    #[test]
    fn test_resolve_dates() {
        let query = ListEventsParams {
            start_date: Some("2025-01-01".into()),
            latest_date: Some("".into()),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        assert_eq!(
            query.filters.start_date,
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(query.filters.latest_date, None);

        let err = ListEventsParams {
            latest_date: Some("soon".into()),
            ..Default::default()
        }
        .resolve()
        .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        let filters = EventFilters {
            search: Some("100%_off\\".into()),
            ..Default::default()
        };
        assert_eq!(filters.search_pattern().as_deref(), Some("%100\\%\\_off\\\\%"));
        assert_eq!(EventFilters::default().search_pattern(), None);
    }

    #[test]
    fn test_page_count_rounds_up() {
        let query = EventQuery {
            limit: 20,
            ..Default::default()
        };
        assert_eq!(EventPage::new(vec![], 41, &query).total_pages, 3);
        assert_eq!(EventPage::new(vec![], 0, &query).total_pages, 0);
    }

    #[test]
    fn test_create_request_validates() {
        let caller = Uuid::new_v4();
        let event = launch_request().validate(caller).unwrap();
        assert_eq!(event.title, "Launch");
        assert_eq!(event.owner, caller);
        assert_eq!(event.pictures, None);
        assert_eq!(event.fb_link, None);
    }

    #[test]
    fn test_create_request_missing_field() {
        let mut request = launch_request();
        request.location = Some("  ".into());
        let err = request.validate(Uuid::new_v4()).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: location is required");
    }

    #[test]
    fn test_create_request_rejects_reversed_dates() {
        let mut request = launch_request();
        request.finish_date = Timestamp::parse("2024-12-31");
        assert!(request.validate(Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_patch_emptiness() {
        let patch: EventPatch = serde_json::from_str(r#"{"title": null}"#).unwrap();
        assert!(patch.is_empty());

        let patch: EventPatch = serde_json::from_str(r#"{"location": "Annex"}"#).unwrap();
        assert!(!patch.is_empty());
        assert_eq!(patch.title, Patch::Absent);
    }

    #[test]
    fn test_patch_validate_bounds() {
        let patch: EventPatch =
            serde_json::from_str(r#"{"date": "2025-02-02", "finishDate": "2025-02-01"}"#).unwrap();
        assert!(patch.validate().is_err());

        let patch: EventPatch = serde_json::from_str(r#"{"finishDate": "2025-02-01"}"#).unwrap();
        assert!(patch.validate().is_ok());
    }
}
