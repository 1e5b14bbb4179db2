use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::str::FromStr;
use validator::Validate;

use crate::slug::business_slug;

// ============================================================================
// ENUMS
// ============================================================================

/// Business lifecycle status (also a Postgres enum).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "business_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BusinessStatus {
    Active,
    Inactive,
}

/// Review moderation state (also a Postgres enum).
///
/// Exactly three values: a review starts `pending` and an admin moves it to
/// `approved` or `rejected`. Deletion removes the row outright.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "review_approval", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReviewApproval {
    Pending,
    Approved,
    Rejected,
}

/// Moderation actions an admin may apply to a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Reject,
    Delete,
}

impl FromStr for ReviewAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "delete" => Ok(Self::Delete),
            _ => Err(()),
        }
    }
}

/// Status actions an admin may apply to a business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusinessAction {
    Activate,
    Deactivate,
}

impl BusinessAction {
    pub fn target_status(self) -> BusinessStatus {
        match self {
            Self::Activate => BusinessStatus::Active,
            Self::Deactivate => BusinessStatus::Inactive,
        }
    }
}

impl FromStr for BusinessAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activate" => Ok(Self::Activate),
            "deactivate" => Ok(Self::Deactivate),
            _ => Err(()),
        }
    }
}

/// Admin-flag actions an admin may apply to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    MakeAdmin,
    RemoveAdmin,
}

impl FromStr for UserAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "make_admin" => Ok(Self::MakeAdmin),
            "remove_admin" => Ok(Self::RemoveAdmin),
            _ => Err(()),
        }
    }
}

// ============================================================================
// BUSINESSES
// ============================================================================

/// Business row as stored.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Business {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub timezone: Option<String>,
    pub status: BusinessStatus,
}

/// Listing row with read-time rating aggregates.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BusinessRecord {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub timezone: Option<String>,
    pub status: BusinessStatus,
    pub average_rating: f64,
    pub review_count: i64,
}

/// Business as rendered in listings, with its URL slug attached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSummary {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub timezone: Option<String>,
    pub status: BusinessStatus,
    pub average_rating: f64,
    pub review_count: i64,
    pub slug: String,
}

impl From<BusinessRecord> for BusinessSummary {
    fn from(record: BusinessRecord) -> Self {
        let slug = business_slug(&record.name, record.id);
        Self {
            id: record.id,
            name: record.name,
            phone: record.phone,
            address: record.address,
            location: record.location,
            industry: record.industry,
            timezone: record.timezone,
            status: record.status,
            average_rating: record.average_rating,
            review_count: record.review_count,
            slug,
        }
    }
}

/// Pagination metadata returned with every listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_count: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(current_page: i64, limit: i64, total_count: i64) -> Self {
        // limit is clamped to >= 1 at the query boundary, so the division is
        // always defined.
        let total_pages = (total_count + limit - 1) / limit;
        Self {
            current_page,
            total_pages,
            total_count,
            limit,
        }
    }
}

// ============================================================================
// REVIEWS
// ============================================================================

/// Review joined with the reviewer's account names, as fetched for the public
/// business detail page.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRecord {
    pub id: i64,
    pub rating: i16,
    pub review_text: String,
    pub reviewer_name: Option<String>,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
    pub user_first_name: Option<String>,
    pub user_last_name: Option<String>,
}

impl ReviewRecord {
    fn display_name(&self) -> String {
        if self.is_anonymous {
            return "Anonymous".into();
        }
        if let Some(name) = &self.reviewer_name {
            if !name.trim().is_empty() {
                return name.clone();
            }
        }
        match (&self.user_first_name, &self.user_last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => "Anonymous".into(),
        }
    }
}

/// Approved review as rendered on the public business page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicReview {
    pub id: i64,
    pub rating: i16,
    pub review_text: String,
    pub reviewer_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<ReviewRecord> for PublicReview {
    fn from(record: ReviewRecord) -> Self {
        let reviewer_name = record.display_name();
        Self {
            id: record.id,
            rating: record.rating,
            review_text: record.review_text,
            reviewer_name,
            created_at: record.created_at,
        }
    }
}

/// Moderation-queue row: review, owning business name, reviewer account
/// names, and the windowed total for pagination.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ModerationReviewRecord {
    pub id: i64,
    pub rating: i16,
    pub review_text: String,
    pub reviewer_name: Option<String>,
    pub reviewer_email: Option<String>,
    pub approval: ReviewApproval,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
    pub business_name: String,
    pub user_first_name: Option<String>,
    pub user_last_name: Option<String>,
    pub total_count: i64,
}

/// Review as rendered in the admin moderation queue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationReview {
    pub id: i64,
    pub rating: i16,
    pub review_text: String,
    pub reviewer_name: String,
    pub reviewer_email: Option<String>,
    pub approval: ReviewApproval,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
    pub business_name: String,
}

impl From<ModerationReviewRecord> for ModerationReview {
    fn from(record: ModerationReviewRecord) -> Self {
        let reviewer_name = match &record.reviewer_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => match (&record.user_first_name, &record.user_last_name) {
                (Some(first), Some(last)) => format!("{first} {last}"),
                _ => "Anonymous".into(),
            },
        };
        Self {
            id: record.id,
            rating: record.rating,
            review_text: record.review_text,
            reviewer_name,
            reviewer_email: record.reviewer_email,
            approval: record.approval,
            is_anonymous: record.is_anonymous,
            created_at: record.created_at,
            business_name: record.business_name,
        }
    }
}

/// Helper struct used when inserting a new review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub business_id: i64,
    pub user_id: Option<i64>,
    pub rating: i16,
    pub review_text: String,
    pub reviewer_name: Option<String>,
    pub reviewer_email: Option<String>,
    pub is_anonymous: bool,
    pub approval: ReviewApproval,
}

// ============================================================================
// USERS & SESSIONS
// ============================================================================

/// User account row as stored.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        }
    }
}

/// Authenticated identity resolved from a session token.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_admin: bool,
}

impl CurrentUser {
    pub fn display_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        }
    }
}

/// Admin user-management row with the windowed total for pagination.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub total_count: i64,
}

/// User as rendered in the admin user-management view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for AdminUser {
    fn from(record: UserRecord) -> Self {
        let name = match (&record.first_name, &record.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => "Unknown".into(),
        };
        Self {
            id: record.id,
            name,
            email: record.email,
            is_admin: record.is_admin,
            created_at: record.created_at,
        }
    }
}

// ============================================================================
// SUGGESTIONS
// ============================================================================

/// Typeahead suggestion categorized as business, location, or industry.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sublabel: Option<String>,
    pub value: String,
}

/// Requested suggestion category. Absent defaults to business; anything
/// unrecognized falls back to a mixed search across all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    Business,
    Location,
    Industry,
    Mixed,
}

impl SuggestionKind {
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            None | Some("business") => Self::Business,
            Some("location") => Self::Location,
            Some("industry") => Self::Industry,
            Some(_) => Self::Mixed,
        }
    }
}

// ============================================================================
// REQUEST DTOs
// ============================================================================

/// Public review submission payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewRequest {
    pub business_id: Option<i64>,
    pub rating: Option<i16>,
    pub review_text: Option<String>,
    pub reviewer_name: Option<String>,
    pub reviewer_email: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

/// Admin business status action payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessActionRequest {
    pub business_id: Option<i64>,
    pub action: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBusinessRequest {
    pub business_id: Option<i64>,
}

/// Admin review moderation action payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewActionRequest {
    pub review_id: Option<i64>,
    pub action: Option<String>,
}

/// Admin user-flag action payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActionRequest {
    pub user_id: Option<i64>,
    pub action: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

// ============================================================================
// STATS & SETTINGS
// ============================================================================

/// Aggregated platform statistics for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_businesses: i64,
    pub total_users: i64,
    pub total_reviews: i64,
    pub pending_reviews: i64,
    pub average_rating: f64,
    pub reviews_today: i64,
}

/// Industry grouped with its business count, for home/dashboard listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct IndustryCount {
    pub name: String,
    pub count: i64,
}

/// Default admin settings, keyed the way they appear on the wire. Stored
/// settings overlay these on read; unknown stored keys are ignored.
pub fn default_settings() -> Map<String, Value> {
    let defaults = json!({
        "siteName": "America's Trusted Businesses",
        "siteDescription": "Find and review trusted businesses across America",
        "adminEmail": "",
        "enableUserRegistration": true,
        "requireEmailVerification": true,
        "autoApproveReviews": false,
        "enableNotifications": true,
        "maintenanceMode": false,
        "maxReviewsPerUser": 10,
        "reviewsPerPage": 20,
    });
    match defaults {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// Parse a stored setting string back into its JSON value. Settings are
/// persisted as plain text, so booleans and numbers are recovered by shape.
pub fn parse_setting_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(n) = raw.parse::<i64>() {
                return Value::Number(n.into());
            }
            if let Ok(f) = raw.parse::<f64>() {
                if let Some(n) = serde_json::Number::from_f64(f) {
                    return Value::Number(n);
                }
            }
            Value::String(raw.to_string())
        }
    }
}

/// Stringify a JSON setting value for key/value storage.
pub fn setting_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_math_matches_ceil() {
        let p = Pagination::new(1, 20, 0);
        assert_eq!(p.total_pages, 0);
        let p = Pagination::new(1, 20, 1);
        assert_eq!(p.total_pages, 1);
        let p = Pagination::new(1, 20, 20);
        assert_eq!(p.total_pages, 1);
        let p = Pagination::new(1, 20, 21);
        assert_eq!(p.total_pages, 2);
        let p = Pagination::new(3, 7, 15);
        assert_eq!(p.total_pages, 3);
    }

    #[test]
    fn review_actions_parse_known_verbs_only() {
        assert_eq!("approve".parse(), Ok(ReviewAction::Approve));
        assert_eq!("reject".parse(), Ok(ReviewAction::Reject));
        assert_eq!("delete".parse(), Ok(ReviewAction::Delete));
        assert!("APPROVE".parse::<ReviewAction>().is_err());
        assert!("publish".parse::<ReviewAction>().is_err());
    }

    #[test]
    fn business_actions_map_to_statuses() {
        let activate: BusinessAction = "activate".parse().unwrap();
        assert_eq!(activate.target_status(), BusinessStatus::Active);
        let deactivate: BusinessAction = "deactivate".parse().unwrap();
        assert_eq!(deactivate.target_status(), BusinessStatus::Inactive);
        assert!("delete".parse::<BusinessAction>().is_err());
    }

    #[test]
    fn user_actions_parse_snake_case_verbs() {
        assert_eq!("make_admin".parse(), Ok(UserAction::MakeAdmin));
        assert_eq!("remove_admin".parse(), Ok(UserAction::RemoveAdmin));
        assert!("demote".parse::<UserAction>().is_err());
    }

    #[test]
    fn anonymous_reviews_never_leak_a_name() {
        let record = ReviewRecord {
            id: 1,
            rating: 5,
            review_text: "Great".into(),
            reviewer_name: Some("Sarah".into()),
            is_anonymous: true,
            created_at: Utc::now(),
            user_first_name: Some("Sarah".into()),
            user_last_name: Some("Smith".into()),
        };
        let public = PublicReview::from(record);
        assert_eq!(public.reviewer_name, "Anonymous");
    }

    #[test]
    fn named_reviews_fall_back_to_account_names() {
        let record = ReviewRecord {
            id: 1,
            rating: 4,
            review_text: "Fine".into(),
            reviewer_name: None,
            is_anonymous: false,
            created_at: Utc::now(),
            user_first_name: Some("Jo".into()),
            user_last_name: None,
        };
        assert_eq!(PublicReview::from(record).reviewer_name, "Jo");
    }

    #[test]
    fn suggestion_kind_defaults_and_fallbacks() {
        assert_eq!(SuggestionKind::from_param(None), SuggestionKind::Business);
        assert_eq!(
            SuggestionKind::from_param(Some("industry")),
            SuggestionKind::Industry
        );
        assert_eq!(
            SuggestionKind::from_param(Some("everything")),
            SuggestionKind::Mixed
        );
    }

    #[test]
    fn setting_values_round_trip_by_shape() {
        assert_eq!(parse_setting_value("true"), Value::Bool(true));
        assert_eq!(parse_setting_value("20"), Value::Number(20.into()));
        assert_eq!(
            parse_setting_value("Trusted"),
            Value::String("Trusted".into())
        );
        assert_eq!(setting_value_to_string(&Value::Bool(false)), "false");
        assert_eq!(setting_value_to_string(&json!("x")), "x");
        assert_eq!(setting_value_to_string(&json!(10)), "10");
    }
}
