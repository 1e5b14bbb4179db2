use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use validator::Validate;

use crate::auth::{self, maybe_user, require_admin, require_user};
use crate::classifier;
use crate::database::Database;
use crate::errors::ApiError;
use crate::models::{
    default_settings, parse_setting_value, setting_value_to_string, AdminUser, BusinessAction,
    BusinessActionRequest, BusinessRecord, BusinessStatus, BusinessSummary, ChangePasswordRequest,
    DeleteBusinessRequest, LoginRequest, ModerationReview, NewReview, Pagination, PublicReview,
    ReviewAction, ReviewActionRequest, ReviewApproval, SignupRequest, SubmitReviewRequest,
    Suggestion, SuggestionKind, UpdateProfileRequest, UserAction, UserActionRequest,
};
use crate::query::{Filter, Page};
use crate::slug::extract_business_id;

const DEFAULT_PAGE_SIZE: i64 = 20;
const ADMIN_QUEUE_PAGE_SIZE: i64 = 50;

/// Map a row-not-found mutation onto a 404 with an entity-specific message.
fn map_missing(err: sqlx::Error, message: &str) -> ApiError {
    match err {
        sqlx::Error::RowNotFound => ApiError::not_found(message),
        other => other.into(),
    }
}

fn split_name(name: &str) -> (Option<String>, Option<String>) {
    let mut parts = name.split_whitespace();
    let first = parts.next().map(|s| s.to_string());
    let rest: Vec<&str> = parts.collect();
    let last = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };
    (first, last)
}

// ============================================================================
// PUBLIC: BUSINESSES
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BusinessListQuery {
    query: Option<String>,
    location: Option<String>,
    industry: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
}

#[get("/businesses")]
pub async fn list_businesses(
    db: web::Data<Database>,
    params: web::Query<BusinessListQuery>,
) -> Result<HttpResponse, ApiError> {
    let params = params.into_inner();
    let page = Page::clamped(params.page, params.limit, DEFAULT_PAGE_SIZE);

    // Public search never surfaces inactive businesses.
    let filter = Filter::new()
        .contains(
            &["b.name", "b.industry"],
            params.query.as_deref().unwrap_or(""),
        )
        .contains(
            &["b.location", "b.address"],
            params.location.as_deref().unwrap_or(""),
        )
        .contains(&["b.industry"], params.industry.as_deref().unwrap_or(""))
        .status_eq("b.status", BusinessStatus::Active);

    let (records, total_count) = db.search_businesses(&filter, page).await?;
    let businesses: Vec<BusinessSummary> = records.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(json!({
        "businesses": businesses,
        "pagination": Pagination::new(page.number, page.limit, total_count),
    })))
}

#[get("/businesses/{id_or_slug}")]
pub async fn get_business(
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id_or_slug = path.into_inner();
    let business_id = extract_business_id(&id_or_slug)
        .ok_or_else(|| ApiError::validation("Invalid business identifier"))?;

    let business = db
        .get_business(business_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Business not found"))?;

    let records = db.approved_reviews_for_business(business_id).await?;
    let review_count = records.len() as i64;
    let average_rating = if records.is_empty() {
        0.0
    } else {
        records.iter().map(|r| r.rating as f64).sum::<f64>() / review_count as f64
    };
    let reviews: Vec<PublicReview> = records.into_iter().map(Into::into).collect();

    let summary = BusinessSummary::from(BusinessRecord {
        id: business.id,
        name: business.name,
        phone: business.phone,
        address: business.address,
        location: business.location,
        industry: business.industry,
        timezone: business.timezone,
        status: business.status,
        average_rating,
        review_count,
    });

    Ok(HttpResponse::Ok().json(json!({
        "business": summary,
        "reviews": reviews,
    })))
}

// ============================================================================
// PUBLIC: REVIEW SUBMISSION
// ============================================================================

/// Validated submission fields, produced before any database access.
#[derive(Debug)]
struct ValidSubmission {
    business_id: i64,
    rating: i16,
    review_text: String,
    reviewer_name: Option<String>,
    reviewer_email: Option<String>,
}

/// Pure validation stage of a review submission. Checks run in a fixed
/// order: required fields, then rating range, then the name/email
/// requirement for unauthenticated callers.
fn validate_submission(
    body: &SubmitReviewRequest,
    authenticated: bool,
) -> Result<ValidSubmission, ApiError> {
    let review_text = body
        .review_text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let (business_id, rating, review_text) = match (body.business_id, body.rating, review_text) {
        (Some(b), Some(r), Some(t)) => (b, r, t.to_string()),
        _ => {
            return Err(ApiError::validation(
                "Business ID, rating, and review text are required",
            ))
        }
    };

    if !(1..=5).contains(&rating) {
        return Err(ApiError::validation("Rating must be between 1 and 5"));
    }

    let reviewer_name = body
        .reviewer_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(|n| n.to_string());
    let reviewer_email = body
        .reviewer_email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(|e| e.to_string());

    if !authenticated && (reviewer_name.is_none() || reviewer_email.is_none()) {
        return Err(ApiError::validation(
            "Name and email are required when not logged in",
        ));
    }

    Ok(ValidSubmission {
        business_id,
        rating,
        review_text,
        reviewer_name,
        reviewer_email,
    })
}

#[post("/reviews")]
pub async fn submit_review(
    req: HttpRequest,
    db: web::Data<Database>,
    payload: web::Json<SubmitReviewRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = payload.into_inner();
    let user = maybe_user(&req, &db).await?;

    let ValidSubmission {
        business_id,
        rating,
        review_text,
        reviewer_name,
        reviewer_email,
    } = validate_submission(&body, user.is_some())?;

    if !db.business_exists(business_id).await? {
        return Err(ApiError::not_found("Business not found"));
    }

    // Pre-check only; two concurrent submissions can still both pass.
    if let Some(user) = &user {
        if db.user_has_reviewed(business_id, user.id).await? {
            return Err(ApiError::validation(
                "You have already reviewed this business",
            ));
        }
    }

    let approval = match &user {
        Some(user) if user.is_admin => ReviewApproval::Approved,
        _ => ReviewApproval::Pending,
    };

    db.insert_review(NewReview {
        business_id,
        user_id: user.as_ref().map(|u| u.id),
        rating,
        review_text,
        reviewer_name,
        reviewer_email,
        is_anonymous: body.is_anonymous,
        approval,
    })
    .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Review submitted successfully",
    })))
}

// ============================================================================
// PUBLIC: SUGGESTIONS
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    q: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Typeahead endpoint. Never fails: short queries are a no-op and database
/// errors degrade to an empty list.
#[get("/search/suggestions")]
pub async fn search_suggestions(
    db: web::Data<Database>,
    params: web::Query<SuggestionQuery>,
) -> HttpResponse {
    let params = params.into_inner();
    let needle = params.q.as_deref().unwrap_or("").trim().to_string();
    if needle.chars().count() < 2 {
        return HttpResponse::Ok().json(json!({ "suggestions": [] }));
    }

    let kind = SuggestionKind::from_param(params.kind.as_deref());
    let result: Result<Vec<Suggestion>, sqlx::Error> = async {
        match kind {
            SuggestionKind::Business => db.suggest_businesses(&needle, 10).await,
            SuggestionKind::Location => db.suggest_locations(&needle, 10).await,
            SuggestionKind::Industry => db.suggest_industries(&needle, 10).await,
            SuggestionKind::Mixed => {
                let mut suggestions = db.suggest_businesses(&needle, 5).await?;
                suggestions.extend(db.suggest_locations(&needle, 3).await?);
                suggestions.extend(db.suggest_industries(&needle, 3).await?);
                Ok(suggestions)
            }
        }
    }
    .await;

    let suggestions = match result {
        Ok(suggestions) => suggestions,
        Err(err) => {
            log::error!("Suggestion lookup failed: {err:?}");
            Vec::new()
        }
    };

    HttpResponse::Ok().json(json!({ "suggestions": suggestions }))
}

// ============================================================================
// PUBLIC: HOME
// ============================================================================

#[get("/home")]
pub async fn home(db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let top_categories = db.top_industries(8).await?;
    let (total_businesses, total_users, total_reviews) = db.home_counts().await?;

    // Distinct classified states, "Other" included as its own bucket.
    let mut states: Vec<&'static str> = Vec::new();
    for (location, _) in db.location_counts().await? {
        let state = classifier::classify_or_other(&location);
        if !states.contains(&state) {
            states.push(state);
        }
    }
    let unique_states = states.len().min(50);

    Ok(HttpResponse::Ok().json(json!({
        "homeData": {
            "topCategories": top_categories,
            "stats": {
                "totalBusinesses": total_businesses,
                "totalUsers": total_users,
                "totalReviews": total_reviews,
                "uniqueStates": unique_states,
            },
        },
    })))
}

// ============================================================================
// AUTH & PROFILE
// ============================================================================

#[post("/auth/signup")]
pub async fn signup(
    db: web::Data<Database>,
    payload: web::Json<SignupRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return Err(ApiError::validation(format!("Validation failed: {e}")));
    }

    if db.find_user_by_email(&body.email).await?.is_some() {
        return Err(ApiError::validation("User already exists with this email"));
    }

    let password_hash = auth::hash_password(&body.password)?;
    db.create_user(
        &body.email,
        &password_hash,
        body.first_name.as_deref(),
        body.last_name.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "User created successfully",
    })))
}

#[post("/auth/login")]
pub async fn login(
    db: web::Data<Database>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = payload.into_inner();

    let user = db
        .find_user_by_email(&body.email)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !auth::verify_password(&body.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized);
    }

    let token = db.create_session(user.id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "token": token,
        "user": {
            "id": user.id,
            "email": user.email,
            "name": user.display_name(),
            "isAdmin": user.is_admin,
        },
    })))
}

#[post("/auth/logout")]
pub async fn logout(req: HttpRequest, db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    if let Some(token) = auth::session_token(&req) {
        db.delete_session(token).await?;
    }

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[get("/profile")]
pub async fn get_profile(
    req: HttpRequest,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let user = require_user(&req, &db).await?;

    Ok(HttpResponse::Ok().json(json!({
        "user": {
            "id": user.id,
            "email": user.email,
            "name": user.display_name(),
            "isAdmin": user.is_admin,
        },
    })))
}

#[put("/profile")]
pub async fn update_profile(
    req: HttpRequest,
    db: web::Data<Database>,
    payload: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = require_user(&req, &db).await?;
    let body = payload.into_inner();

    let name = body.name.as_deref().map(str::trim).unwrap_or("");
    let email = body.email.as_deref().map(str::trim).unwrap_or("");
    if name.is_empty() || email.is_empty() {
        return Err(ApiError::validation("Name and email are required"));
    }

    if email != user.email && db.find_user_by_email(email).await?.is_some() {
        return Err(ApiError::validation("Email is already taken"));
    }

    let (first_name, last_name) = split_name(name);
    db.update_user_profile(user.id, first_name.as_deref(), last_name.as_deref(), email)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Profile updated successfully",
        "user": {
            "id": user.id,
            "email": email,
            "name": name,
            "isAdmin": user.is_admin,
        },
    })))
}

#[put("/profile/password")]
pub async fn change_password(
    req: HttpRequest,
    db: web::Data<Database>,
    payload: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = require_user(&req, &db).await?;
    let body = payload.into_inner();

    let (current, new) = match (body.current_password.as_deref(), body.new_password.as_deref()) {
        (Some(current), Some(new)) if !current.is_empty() && !new.is_empty() => (current, new),
        _ => {
            return Err(ApiError::validation(
                "Current password and new password are required",
            ))
        }
    };

    if new.len() < 6 {
        return Err(ApiError::validation(
            "New password must be at least 6 characters long",
        ));
    }

    let account = db
        .find_user_by_email(&user.email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !auth::verify_password(current, &account.password_hash)? {
        return Err(ApiError::validation("Current password is incorrect"));
    }

    let password_hash = auth::hash_password(new)?;
    db.update_user_password(user.id, &password_hash).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Password updated successfully",
    })))
}

// ============================================================================
// ADMIN: BUSINESSES
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AdminBusinessQuery {
    query: Option<String>,
    status: Option<String>,
    industry: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
}

#[get("/admin/businesses")]
pub async fn admin_list_businesses(
    req: HttpRequest,
    db: web::Data<Database>,
    params: web::Query<AdminBusinessQuery>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&req, &db).await?;
    let params = params.into_inner();
    let page = Page::clamped(params.page, params.limit, DEFAULT_PAGE_SIZE);

    let mut filter = Filter::new()
        .contains(
            &["b.name", "b.industry"],
            params.query.as_deref().unwrap_or(""),
        )
        .contains(&["b.industry"], params.industry.as_deref().unwrap_or(""));

    // "all" (the default) applies no status predicate.
    match params.status.as_deref() {
        Some("active") => filter = filter.status_eq("b.status", BusinessStatus::Active),
        Some("inactive") => filter = filter.status_eq("b.status", BusinessStatus::Inactive),
        _ => {}
    }

    let (records, total_count) = db.search_businesses(&filter, page).await?;
    let businesses: Vec<BusinessSummary> = records.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(json!({
        "businesses": businesses,
        "pagination": Pagination::new(page.number, page.limit, total_count),
    })))
}

#[post("/admin/businesses/action")]
pub async fn admin_business_action(
    req: HttpRequest,
    db: web::Data<Database>,
    payload: web::Json<BusinessActionRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&req, &db).await?;
    let body = payload.into_inner();

    let (business_id, action) = match (body.business_id, body.action.as_deref()) {
        (Some(id), Some(action)) => (id, action),
        _ => return Err(ApiError::validation("Business ID and action are required")),
    };

    let action: BusinessAction = action.parse().map_err(|_| {
        ApiError::validation("Invalid action. Use \"activate\" or \"deactivate\"")
    })?;

    let business = db
        .get_business(business_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Business not found"))?;

    db.set_business_status(business_id, action.target_status())
        .await
        .map_err(|e| map_missing(e, "Business not found"))?;

    let message = match action {
        BusinessAction::Activate => format!("Successfully activated {}", business.name),
        BusinessAction::Deactivate => format!("Successfully deactivated {}", business.name),
    };

    Ok(HttpResponse::Ok().json(json!({ "message": message })))
}

#[delete("/admin/businesses/action")]
pub async fn admin_delete_business(
    req: HttpRequest,
    db: web::Data<Database>,
    payload: web::Json<DeleteBusinessRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&req, &db).await?;

    let business_id = payload
        .into_inner()
        .business_id
        .ok_or_else(|| ApiError::validation("Business ID is required"))?;

    let business = db
        .get_business(business_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Business not found"))?;

    db.delete_business(business_id)
        .await
        .map_err(|e| map_missing(e, "Business not found"))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Successfully deleted {}", business.name),
    })))
}

// ============================================================================
// ADMIN: REVIEWS
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AdminReviewQuery {
    status: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
}

/// Moderation-queue status filter. An absent parameter means the pending
/// queue; "all" and unrecognized values apply no predicate.
fn review_status_filter(status: Option<&str>) -> Filter {
    let filter = Filter::new();
    match status.unwrap_or("pending") {
        "pending" => filter.approval_eq("r.approval", ReviewApproval::Pending),
        "approved" => filter.approval_eq("r.approval", ReviewApproval::Approved),
        "rejected" => filter.approval_eq("r.approval", ReviewApproval::Rejected),
        _ => filter,
    }
}

#[get("/admin/reviews")]
pub async fn admin_list_reviews(
    req: HttpRequest,
    db: web::Data<Database>,
    params: web::Query<AdminReviewQuery>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&req, &db).await?;
    let params = params.into_inner();
    let page = Page::clamped(params.page, params.limit, ADMIN_QUEUE_PAGE_SIZE);

    let filter = review_status_filter(params.status.as_deref());
    let records = db.list_reviews(&filter, page).await?;
    let total_count = records.first().map(|r| r.total_count).unwrap_or(0);
    let reviews: Vec<ModerationReview> = records.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(json!({
        "reviews": reviews,
        "pagination": Pagination::new(page.number, page.limit, total_count),
    })))
}

#[post("/admin/reviews/action")]
pub async fn admin_review_action(
    req: HttpRequest,
    db: web::Data<Database>,
    payload: web::Json<ReviewActionRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&req, &db).await?;
    let body = payload.into_inner();

    let (review_id, action) = match (body.review_id, body.action.as_deref()) {
        (Some(id), Some(action)) => (id, action),
        _ => return Err(ApiError::validation("Review ID and action are required")),
    };

    let action: ReviewAction = action
        .parse()
        .map_err(|_| ApiError::validation("Invalid action"))?;

    let result = match action {
        ReviewAction::Approve => {
            db.set_review_approval(review_id, ReviewApproval::Approved)
                .await
        }
        ReviewAction::Reject => {
            db.set_review_approval(review_id, ReviewApproval::Rejected)
                .await
        }
        ReviewAction::Delete => db.delete_review(review_id).await,
    };
    result.map_err(|e| map_missing(e, "Review not found"))?;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

// ============================================================================
// ADMIN: USERS
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AdminUserQuery {
    filter: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
}

#[get("/admin/users")]
pub async fn admin_list_users(
    req: HttpRequest,
    db: web::Data<Database>,
    params: web::Query<AdminUserQuery>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&req, &db).await?;
    let params = params.into_inner();
    let page = Page::clamped(params.page, params.limit, ADMIN_QUEUE_PAGE_SIZE);

    let mut filter = Filter::new();
    match params.filter.as_deref() {
        Some("admin") => filter = filter.bool_eq("u.is_admin", true),
        Some("regular") => filter = filter.bool_eq("u.is_admin", false),
        _ => {}
    }

    let records = db.list_users(&filter, page).await?;
    let total_count = records.first().map(|r| r.total_count).unwrap_or(0);
    let users: Vec<AdminUser> = records.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(json!({
        "users": users,
        "pagination": Pagination::new(page.number, page.limit, total_count),
    })))
}

/// An admin may toggle anyone's flag except revoking their own.
fn check_user_action(action: UserAction, target_id: i64, actor_id: i64) -> Result<(), ApiError> {
    if action == UserAction::RemoveAdmin && target_id == actor_id {
        return Err(ApiError::validation(
            "You cannot remove admin access from your own account",
        ));
    }
    Ok(())
}

#[post("/admin/users/action")]
pub async fn admin_user_action(
    req: HttpRequest,
    db: web::Data<Database>,
    payload: web::Json<UserActionRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = require_admin(&req, &db).await?;
    let body = payload.into_inner();

    let (user_id, action) = match (body.user_id, body.action.as_deref()) {
        (Some(id), Some(action)) => (id, action),
        _ => return Err(ApiError::validation("User ID and action are required")),
    };

    let action: UserAction = action
        .parse()
        .map_err(|_| ApiError::validation("Invalid action"))?;

    check_user_action(action, user_id, actor.id)?;

    db.set_user_admin(user_id, action == UserAction::MakeAdmin)
        .await
        .map_err(|e| map_missing(e, "User not found"))?;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

// ============================================================================
// ADMIN: STATS & SETTINGS
// ============================================================================

#[get("/admin/stats")]
pub async fn admin_stats(
    req: HttpRequest,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&req, &db).await?;

    let stats = db.admin_stats().await?;

    Ok(HttpResponse::Ok().json(json!({ "stats": stats })))
}

#[get("/admin/settings")]
pub async fn admin_get_settings(
    req: HttpRequest,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&req, &db).await?;

    // Stored rows overlay the defaults; keys no setting page knows about are
    // dropped on read.
    let mut settings = default_settings();
    for (key, value) in db.load_settings().await? {
        if settings.contains_key(&key) {
            settings.insert(key, parse_setting_value(&value));
        }
    }

    Ok(HttpResponse::Ok().json(json!({ "settings": settings })))
}

#[post("/admin/settings")]
pub async fn admin_save_settings(
    req: HttpRequest,
    db: web::Data<Database>,
    payload: web::Json<Map<String, Value>>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&req, &db).await?;

    // One upsert per key with no surrounding transaction; a mid-loop failure
    // leaves the keys already written in place. Unknown keys are stored but
    // never read back.
    for (key, value) in payload.into_inner() {
        db.upsert_setting(&key, &setting_value_to_string(&value))
            .await?;
    }

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Predicate;

    #[test]
    fn admins_cannot_revoke_their_own_flag() {
        let err = check_user_action(UserAction::RemoveAdmin, 3, 3).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "You cannot remove admin access from your own account"
        );
    }

    #[test]
    fn other_user_actions_pass_the_self_check() {
        // Granting yourself the flag you already hold is a no-op, not an error.
        assert!(check_user_action(UserAction::MakeAdmin, 3, 3).is_ok());
        assert!(check_user_action(UserAction::RemoveAdmin, 4, 3).is_ok());
        assert!(check_user_action(UserAction::MakeAdmin, 4, 3).is_ok());
    }

    #[test]
    fn review_queue_defaults_to_pending_and_opens_up_for_unknown_statuses() {
        let pending = Predicate::ApprovalEq {
            column: "r.approval",
            value: ReviewApproval::Pending,
        };
        assert_eq!(review_status_filter(None).predicates(), &[pending.clone()]);
        assert_eq!(
            review_status_filter(Some("pending")).predicates(),
            &[pending]
        );
        assert_eq!(
            review_status_filter(Some("rejected")).predicates(),
            &[Predicate::ApprovalEq {
                column: "r.approval",
                value: ReviewApproval::Rejected,
            }]
        );
        assert!(review_status_filter(Some("all")).is_empty());
        assert!(review_status_filter(Some("flagged")).is_empty());
    }

    #[test]
    fn split_name_keeps_everything_after_the_first_token_as_last_name() {
        assert_eq!(
            split_name("Mary Jane Watson"),
            (Some("Mary".into()), Some("Jane Watson".into()))
        );
        assert_eq!(split_name("Cher"), (Some("Cher".into()), None));
    }

    #[test]
    fn missing_rows_become_not_found_and_other_errors_stay_internal() {
        let err = map_missing(sqlx::Error::RowNotFound, "Business not found");
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(err.to_string(), "Business not found");

        let err = map_missing(sqlx::Error::PoolClosed, "Business not found");
        assert!(matches!(err, ApiError::Database(_)));
    }

    fn submission(rating: Option<i16>) -> SubmitReviewRequest {
        SubmitReviewRequest {
            business_id: Some(7),
            rating,
            review_text: Some("Solid work, fair price".into()),
            reviewer_name: Some("Sarah".into()),
            reviewer_email: Some("s@example.com".into()),
            is_anonymous: false,
        }
    }

    #[test]
    fn submission_checks_required_fields_before_rating_range() {
        let mut body = submission(None);
        body.review_text = None;
        let err = validate_submission(&body, false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Business ID, rating, and review text are required"
        );

        let err = validate_submission(&submission(Some(9)), false).unwrap_err();
        assert_eq!(err.to_string(), "Rating must be between 1 and 5");
        let err = validate_submission(&submission(Some(0)), true).unwrap_err();
        assert_eq!(err.to_string(), "Rating must be between 1 and 5");
    }

    #[test]
    fn anonymous_submissions_need_name_and_email() {
        let mut body = submission(Some(4));
        body.reviewer_email = None;
        let err = validate_submission(&body, false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Name and email are required when not logged in"
        );

        // The same shape is fine for an authenticated caller.
        let mut body = submission(Some(4));
        body.reviewer_name = None;
        body.reviewer_email = None;
        let valid = validate_submission(&body, true).unwrap();
        assert_eq!(valid.business_id, 7);
        assert_eq!(valid.rating, 4);
        assert!(valid.reviewer_name.is_none());
    }

    #[test]
    fn whitespace_only_text_counts_as_missing() {
        let mut body = submission(Some(3));
        body.review_text = Some("   ".into());
        let err = validate_submission(&body, true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Business ID, rating, and review text are required"
        );
    }
}
