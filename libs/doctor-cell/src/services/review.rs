use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{is_conflict_error, SupabaseClient};

use crate::models::{CreateReviewRequest, DoctorError, Review, UpdateReviewRequest};

#[derive(Debug, Deserialize)]
struct RatingRow {
    rating: i32,
}

#[derive(Debug, Deserialize)]
struct AppointmentRef {
    id: Uuid,
}

pub struct ReviewService {
    supabase: SupabaseClient,
}

impl ReviewService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Add a review. Requires a completed appointment with the doctor and
    /// at most one review per (doctor, patient); new reviews await approval.
    pub async fn add_review(
        &self,
        doctor_id: Uuid,
        patient_id: &str,
        request: CreateReviewRequest,
        auth_token: &str,
    ) -> Result<Review, DoctorError> {
        debug!("Adding review for doctor {} by patient {}", doctor_id, patient_id);

        validate_review_content(request.rating, &request.comment)?;

        let completed_path = format!(
            "/rest/v1/appointments?user_id=eq.{}&doctor_id=eq.{}&status=eq.completed&select=id&limit=1",
            patient_id, doctor_id
        );
        let completed: Vec<AppointmentRef> = self
            .supabase
            .request(Method::GET, &completed_path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let appointment = completed.into_iter().next().ok_or(DoctorError::ReviewNotAllowed)?;

        let existing_path = format!(
            "/rest/v1/reviews?doctor_id=eq.{}&patient_id=eq.{}&select=id",
            doctor_id, patient_id
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &existing_path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if !existing.is_empty() {
            return Err(DoctorError::DuplicateReview);
        }

        let body = json!({
            "doctor_id": doctor_id,
            "patient_id": patient_id,
            "appointment_id": appointment.id,
            "rating": request.rating,
            "title": request.title,
            "comment": request.comment,
            "is_approved": false,
            "created_at": chrono::Utc::now().to_rfc3339(),
            "updated_at": chrono::Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/reviews",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(|e| {
                // Unique (doctor, patient, appointment) backstop.
                if is_conflict_error(&e) {
                    DoctorError::DuplicateReview
                } else {
                    DoctorError::DatabaseError(e.to_string())
                }
            })?;

        let review: Review = result
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::DatabaseError("Failed to create review".to_string()))
            .and_then(|row| {
                serde_json::from_value(row).map_err(|e| {
                    DoctorError::DatabaseError(format!("Failed to parse review: {}", e))
                })
            })?;

        self.recompute_rating(doctor_id, auth_token).await?;

        Ok(review)
    }

    /// Edit an own review; edits reset approval and the rating recomputes.
    pub async fn edit_review(
        &self,
        review_id: Uuid,
        patient_id: &str,
        request: UpdateReviewRequest,
        auth_token: &str,
    ) -> Result<Review, DoctorError> {
        validate_review_content(request.rating, &request.comment)?;

        let existing = self.get_review(review_id, auth_token).await?;
        if existing.patient_id.to_string() != patient_id {
            return Err(DoctorError::Unauthorized);
        }

        let body = json!({
            "rating": request.rating,
            "title": request.title,
            "comment": request.comment,
            "is_approved": false,
            "updated_at": chrono::Utc::now().to_rfc3339(),
        });

        let path = format!("/rest/v1/reviews?id=eq.{}", review_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let review: Review = result
            .into_iter()
            .next()
            .ok_or(DoctorError::ReviewNotFound)
            .and_then(|row| {
                serde_json::from_value(row).map_err(|e| {
                    DoctorError::DatabaseError(format!("Failed to parse review: {}", e))
                })
            })?;

        self.recompute_rating(review.doctor_id, auth_token).await?;

        Ok(review)
    }

    /// Approve a review (admin) and fold it into the doctor's rating.
    pub async fn approve_review(
        &self,
        review_id: Uuid,
        auth_token: &str,
    ) -> Result<Review, DoctorError> {
        let path = format!("/rest/v1/reviews?id=eq.{}", review_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({
                    "is_approved": true,
                    "updated_at": chrono::Utc::now().to_rfc3339(),
                })),
                Some(headers),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let review: Review = result
            .into_iter()
            .next()
            .ok_or(DoctorError::ReviewNotFound)
            .and_then(|row| {
                serde_json::from_value(row).map_err(|e| {
                    DoctorError::DatabaseError(format!("Failed to parse review: {}", e))
                })
            })?;

        info!("Review {} approved for doctor {}", review_id, review.doctor_id);
        self.recompute_rating(review.doctor_id, auth_token).await?;

        Ok(review)
    }

    /// Approved reviews for a doctor's public page, newest first.
    pub async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Review>, DoctorError> {
        let path = format!(
            "/rest/v1/reviews?doctor_id=eq.{}&is_approved=eq.true&order=created_at.desc",
            doctor_id
        );
        self.fetch_reviews(&path, auth_token).await
    }

    pub async fn reviews_by_patient(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Review>, DoctorError> {
        let path = format!(
            "/rest/v1/reviews?patient_id=eq.{}&order=created_at.desc",
            patient_id
        );
        self.fetch_reviews(&path, auth_token).await
    }

    /// Recompute the denormalized rating from approved reviews. Called on
    /// every create/edit/approve; the stored value is never trusted stale.
    pub async fn recompute_rating(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<(), DoctorError> {
        let path = format!(
            "/rest/v1/reviews?doctor_id=eq.{}&is_approved=eq.true&select=rating",
            doctor_id
        );
        let rows: Vec<RatingRow> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let ratings: Vec<i32> = rows.into_iter().map(|r| r.rating).collect();
        let (average, total) = rating_summary(&ratings);

        let update_path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let _: Vec<Value> = self
            .supabase
            .request(
                Method::PATCH,
                &update_path,
                Some(auth_token),
                Some(json!({
                    "average_rating": average,
                    "total_reviews": total,
                })),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        debug!("Doctor {} rating recomputed: {} over {} reviews", doctor_id, average, total);
        Ok(())
    }

    async fn get_review(&self, review_id: Uuid, auth_token: &str) -> Result<Review, DoctorError> {
        let path = format!("/rest/v1/reviews?id=eq.{}", review_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or(DoctorError::ReviewNotFound)
            .and_then(|row| {
                serde_json::from_value(row).map_err(|e| {
                    DoctorError::DatabaseError(format!("Failed to parse review: {}", e))
                })
            })
    }

    async fn fetch_reviews(&self, path: &str, auth_token: &str) -> Result<Vec<Review>, DoctorError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Review>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse reviews: {}", e)))
    }
}

fn validate_review_content(rating: i32, comment: &str) -> Result<(), DoctorError> {
    if !(1..=5).contains(&rating) {
        return Err(DoctorError::ValidationError(
            "Rating must be between 1 and 5 stars".to_string(),
        ));
    }
    if comment.trim().is_empty() {
        return Err(DoctorError::ValidationError(
            "A review comment is required".to_string(),
        ));
    }
    Ok(())
}

/// Average (rounded to 2 decimals) and count over a set of ratings.
pub fn rating_summary(ratings: &[i32]) -> (f64, i32) {
    if ratings.is_empty() {
        return (0.0, 0);
    }
    let sum: i32 = ratings.iter().sum();
    let average = sum as f64 / ratings.len() as f64;
    ((average * 100.0).round() / 100.0, ratings.len() as i32)
}
