// Typed back office API client
// Attaches the session token, turns every failure into an ApiError and resets the session on 401

use crate::api::{Access, ApiError, ApiRequest, Method, Transport};
use crate::booking::CreateBookingPayload;
use crate::models::*;
use crate::query_key::StatKind;
use crate::session::Session;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct AdminClient<T> {
    transport: T,
    session: Arc<Session>,
}

// Pull the server's own explanation out of an error body
fn error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["message", "error"]
        .iter()
        .filter_map(|field| value.get(*field).and_then(|v| v.as_str()))
        .map(|message| message.trim().to_string())
        .find(|message| !message.is_empty())
}

fn decode<R: DeserializeOwned>(label: &str, body: &[u8]) -> Result<R, ApiError> {
    let envelope: Envelope<R> = serde_json::from_slice(body)
        .map_err(|e| ApiError::DecodeError(format!("{}: {}", label, e)))?;
    if !envelope.success {
        return Err(ApiError::ApiResponseError {
            status_code: 200,
            message: envelope
                .message
                .unwrap_or_else(|| "The server reported a failure".to_string()),
        });
    }
    Ok(envelope.data)
}

fn decode_ack(label: &str, body: &[u8]) -> Result<Ack, ApiError> {
    let ack: Ack = serde_json::from_slice(body)
        .map_err(|e| ApiError::DecodeError(format!("{}: {}", label, e)))?;
    if !ack.success {
        return Err(ApiError::ApiResponseError {
            status_code: 200,
            message: ack
                .message
                .unwrap_or_else(|| "The server reported a failure".to_string()),
        });
    }
    Ok(ack)
}

impl<T: Transport> AdminClient<T> {
    pub fn new(transport: T, session: Arc<Session>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn dispatch(&self, mut request: ApiRequest) -> Result<Bytes, ApiError> {
        if request.access == Access::Private {
            request.bearer = self.session.token();
        }
        let label = request.label();
        let access = request.access;
        debug!("-> {}", label);

        let response = self.transport.send(request).await?;
        match response.status {
            200..=299 => Ok(response.body),
            401 if access == Access::Private => {
                self.session.clear(&format!("401 from {}", label));
                Err(ApiError::Unauthorized(
                    error_message(&response.body)
                        .unwrap_or_else(|| "Your session has expired. Please sign in again.".to_string()),
                ))
            }
            status => {
                let message = error_message(&response.body)
                    .unwrap_or_else(|| format!("Request failed with status {}", status));
                warn!("{} failed with {}: {}", label, status, message);
                Err(ApiError::ApiResponseError {
                    status_code: status,
                    message,
                })
            }
        }
    }

    async fn fetch<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, ApiError> {
        let label = request.label();
        let body = self.dispatch(request).await?;
        decode(&label, &body)
    }

    async fn write(&self, request: ApiRequest) -> Result<Ack, ApiError> {
        let label = request.label();
        let body = self.dispatch(request).await?;
        decode_ack(&label, &body)
    }

    // Session

    pub async fn login(&self, credentials: &LoginRequest) -> Result<AdminUser, ApiError> {
        let request = ApiRequest::public(Method::Post, "/api/v1/user/login").json(credentials)?;
        let data: LoginData = self.fetch(request).await?;
        self.session.sign_in(data.token, data.user.clone());
        Ok(data.user)
    }

    pub fn logout(&self) -> bool {
        self.session.clear("logout")
    }

    pub async fn view_profile(&self) -> Result<AdminUser, ApiError> {
        self.fetch(ApiRequest::private(Method::Get, "/api/v1/user/view-profile"))
            .await
    }

    pub async fn register_cleaner(&self, cleaner: &NewCleaner) -> Result<Ack, ApiError> {
        let request =
            ApiRequest::public(Method::Post, "/api/v1/user/register-worker").json(cleaner)?;
        self.write(request).await
    }

    pub async fn verify_email(&self, code: &str) -> Result<Ack, ApiError> {
        self.write(
            ApiRequest::public(Method::Post, "/api/v1/user/email-verification").query("token", code),
        )
        .await
    }

    // Bookings

    pub async fn list_bookings(&self) -> Result<Vec<Booking>, ApiError> {
        self.fetch(ApiRequest::private(Method::Get, "/api/v1/admin/all-bookings"))
            .await
    }

    pub async fn recent_bookings(&self) -> Result<Vec<Booking>, ApiError> {
        self.fetch(ApiRequest::private(
            Method::Get,
            "/api/v1/admin/all-recent-bookings",
        ))
        .await
    }

    pub async fn get_booking(&self, booking_id: &str) -> Result<Booking, ApiError> {
        self.fetch(
            ApiRequest::private(Method::Get, "/api/v1/admin/booking").query("bookingId", booking_id),
        )
        .await
    }

    pub async fn create_booking(&self, payload: &CreateBookingPayload) -> Result<Ack, ApiError> {
        let request =
            ApiRequest::public(Method::Post, "/api/v1/booking/createBookingPayment").json(payload)?;
        self.write(request).await
    }

    pub async fn assign_booking(&self, booking_id: &str, worker_id: &str) -> Result<Ack, ApiError> {
        self.write(
            ApiRequest::private(Method::Post, "/api/v1/admin/assign-booking-to-cleaner")
                .query("bookingId", booking_id)
                .query("workerId", worker_id),
        )
        .await
    }

    pub async fn revoke_cleaner(&self, worker_id: &str, booking_id: &str) -> Result<Ack, ApiError> {
        self.write(
            ApiRequest::private(Method::Post, "/api/v1/admin/revoke-booking-from-cleaner")
                .query("workerId", worker_id)
                .query("bookingId", booking_id),
        )
        .await
    }

    pub async fn assign_booking_to_many(
        &self,
        assignment: &MultiAssignRequest,
    ) -> Result<Ack, ApiError> {
        let request = ApiRequest::private(
            Method::Post,
            "/api/v1/admin/adminAssignBookingToMultipleCleaners",
        )
        .json(assignment)?;
        self.write(request).await
    }

    pub async fn delete_booking(&self, booking_id: &str) -> Result<Ack, ApiError> {
        self.write(
            ApiRequest::private(Method::Delete, "/api/v1/admin/deleteBooking")
                .query("bookingId", booking_id),
        )
        .await
    }

    // Cleaners and admins

    pub async fn list_cleaners(&self) -> Result<Vec<Cleaner>, ApiError> {
        self.fetch(ApiRequest::private(Method::Get, "/api/v1/admin/all-cleaners"))
            .await
    }

    pub async fn get_cleaner(&self, cleaner_id: &str) -> Result<Cleaner, ApiError> {
        self.fetch(
            ApiRequest::private(Method::Get, "/api/v1/admin/cleaner").query("cleanerId", cleaner_id),
        )
        .await
    }

    pub async fn delete_cleaner(&self, cleaner_id: &str) -> Result<Ack, ApiError> {
        self.write(
            ApiRequest::private(Method::Delete, "/api/v1/admin/deleteCleaner")
                .query("cleanerId", cleaner_id),
        )
        .await
    }

    // The back office serves the admin roster from the same listing as cleaners
    pub async fn list_admins(&self) -> Result<Vec<AdminUser>, ApiError> {
        self.fetch(ApiRequest::private(Method::Get, "/api/v1/admin/all-cleaners"))
            .await
    }

    pub async fn block_user(&self, user_id: &str) -> Result<Ack, ApiError> {
        self.write(ApiRequest::private(
            Method::Post,
            format!("/api/v1/admin/block-user/{}", user_id),
        ))
        .await
    }

    pub async fn create_admin(&self, admin: &NewAdmin) -> Result<Ack, ApiError> {
        let request = ApiRequest::private(Method::Post, "/api/v1/admin/adminRegisterWorker").json(admin)?;
        self.write(request).await
    }

    // Banks

    pub async fn list_banks(&self) -> Result<Vec<Bank>, ApiError> {
        self.fetch(ApiRequest::private(Method::Get, "/api/v1/admin/all-banks"))
            .await
    }

    pub async fn get_bank(&self, bank_id: &str) -> Result<Bank, ApiError> {
        self.fetch(ApiRequest::private(Method::Get, "/api/v1/admin/bank").query("bankId", bank_id))
            .await
    }

    // FAQs

    pub async fn list_faqs(&self) -> Result<Vec<Faq>, ApiError> {
        self.fetch(ApiRequest::private(Method::Get, "/api/v1/faq/getFaqs"))
            .await
    }

    pub async fn get_faq(&self, faq_id: &str) -> Result<Faq, ApiError> {
        self.fetch(ApiRequest::private(
            Method::Get,
            format!("/api/v1/faq/getFaqById/{}", faq_id),
        ))
        .await
    }

    pub async fn create_faq(&self, faq: &NewFaq) -> Result<Ack, ApiError> {
        let request = ApiRequest::private(Method::Post, "/api/v1/faq/createFaq").json(faq)?;
        self.write(request).await
    }

    pub async fn update_faq(&self, faq_id: &str, faq: &NewFaq) -> Result<Ack, ApiError> {
        let request =
            ApiRequest::private(Method::Put, format!("/api/v1/faq/updateFaq/{}", faq_id)).json(faq)?;
        self.write(request).await
    }

    pub async fn delete_faq(&self, faq_id: &str) -> Result<Ack, ApiError> {
        self.write(ApiRequest::private(
            Method::Delete,
            format!("/api/v1/faq/deleteFaq/{}", faq_id),
        ))
        .await
    }

    // Service catalog

    pub async fn list_catalog(&self) -> Result<Vec<CatalogEntry>, ApiError> {
        self.fetch(ApiRequest::private(Method::Get, "/api/v1/catalog/getAllCatalogs"))
            .await
    }

    pub async fn get_catalog_entry(&self, entry_id: &str) -> Result<CatalogEntry, ApiError> {
        self.fetch(ApiRequest::private(
            Method::Get,
            format!("/api/v1/catalog/getCatalogById/{}", entry_id),
        ))
        .await
    }

    pub async fn create_catalog_entry(&self, entry: &NewCatalogEntry) -> Result<Ack, ApiError> {
        let request =
            ApiRequest::private(Method::Post, "/api/v1/catalog/createCatalog").json(entry)?;
        self.write(request).await
    }

    pub async fn update_catalog_entry(
        &self,
        entry_id: &str,
        entry: &NewCatalogEntry,
    ) -> Result<Ack, ApiError> {
        let request = ApiRequest::private(
            Method::Put,
            format!("/api/v1/catalog/updateCatalog/{}", entry_id),
        )
        .json(entry)?;
        self.write(request).await
    }

    pub async fn delete_catalog_entry(&self, entry_id: &str) -> Result<Ack, ApiError> {
        self.write(ApiRequest::private(
            Method::Delete,
            format!("/api/v1/catalog/deleteCatalog/{}", entry_id),
        ))
        .await
    }

    // About us

    pub async fn list_about(&self) -> Result<Vec<AboutContent>, ApiError> {
        self.fetch(ApiRequest::private(Method::Get, "/api/v1/aboutus/getAboutus"))
            .await
    }

    pub async fn get_about(&self, about_id: &str) -> Result<AboutContent, ApiError> {
        self.fetch(ApiRequest::private(
            Method::Get,
            format!("/api/v1/aboutus/getAboutusById/{}", about_id),
        ))
        .await
    }

    pub async fn create_about(&self, about: &NewAbout) -> Result<Ack, ApiError> {
        let request =
            ApiRequest::private(Method::Post, "/api/v1/aboutus/createAboutus").json(about)?;
        self.write(request).await
    }

    pub async fn update_about(&self, about_id: &str, about: &NewAbout) -> Result<Ack, ApiError> {
        let request = ApiRequest::private(
            Method::Put,
            format!("/api/v1/aboutus/updateAboutus/{}", about_id),
        )
        .json(about)?;
        self.write(request).await
    }

    pub async fn delete_about(&self, about_id: &str) -> Result<Ack, ApiError> {
        self.write(ApiRequest::private(
            Method::Delete,
            format!("/api/v1/aboutus/deleteAboutus/{}", about_id),
        ))
        .await
    }

    // Payouts and statistics

    pub async fn list_disbursements(&self) -> Result<Vec<DisbursementRecord>, ApiError> {
        self.fetch(ApiRequest::private(
            Method::Get,
            "/api/v1/admin/adminWorkerPaymentDetails",
        ))
        .await
    }

    pub async fn booking_totals(&self) -> Result<BookingTotals, ApiError> {
        self.fetch(stat_request(StatKind::Bookings)).await
    }

    pub async fn revenue_totals(&self) -> Result<RevenueTotals, ApiError> {
        self.fetch(stat_request(StatKind::Revenue)).await
    }

    pub async fn user_totals(&self) -> Result<UserTotals, ApiError> {
        self.fetch(stat_request(StatKind::Users)).await
    }

    pub async fn worker_totals(&self) -> Result<WorkerTotals, ApiError> {
        self.fetch(stat_request(StatKind::Workers)).await
    }

    pub async fn cleaning_service_graph(&self) -> Result<CleaningServiceGraph, ApiError> {
        self.fetch(stat_request(StatKind::CleaningServiceGraph)).await
    }

    pub async fn revenue_graph(&self) -> Result<RevenueGraph, ApiError> {
        self.fetch(stat_request(StatKind::RevenueGraph)).await
    }
}

pub fn stat_path(kind: StatKind) -> &'static str {
    match kind {
        StatKind::Bookings => "/api/v1/admin/total-bookings",
        StatKind::Revenue => "/api/v1/admin/total-revenue",
        StatKind::Users => "/api/v1/admin/total-users",
        StatKind::Workers => "/api/v1/admin/total-workers",
        StatKind::CleaningServiceGraph => "/api/v1/admin/job-cleaning-service-graphs",
        StatKind::RevenueGraph => "/api/v1/admin/revenue-graphs",
    }
}

fn stat_request(kind: StatKind) -> ApiRequest {
    ApiRequest::private(Method::Get, stat_path(kind))
}
