// Screen-facing facade: every read is bound to its cache key, every write to the keys it invalidates

use crate::api::{ApiError, ClientError, HttpTransport, Transport};
use crate::booking::{BookingDraft, BookingValidationError, CreateBookingPayload};
use crate::client::AdminClient;
use crate::config::AppConfig;
use crate::disbursement::PayoutReport;
use crate::models::*;
use crate::mutation::{MutationScope, MutationTracker};
use crate::overview::{cleaning_points, revenue_series, Overview, StatCard};
use crate::query_cache::{CacheConfig, CacheEntry, QueryCache, ReadOptions};
use crate::query_key::{QueryKey, StatKind};
use crate::screen::DetailGate;
use crate::session::{Session, SessionState};
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] BookingValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SubmitError {
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Validation(error) => error.to_string(),
            SubmitError::Api(error) => error.user_message(),
        }
    }
}

pub struct Dashboard<T: Transport> {
    client: Arc<AdminClient<T>>,
    cache: QueryCache,
    mutations: MutationTracker,
    session_updates: Mutex<watch::Receiver<SessionState>>,
}

impl Dashboard<HttpTransport> {
    pub fn connect(config: AppConfig) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(&config.client)?;
        info!("Back office client ready for {}", config.client.base_url);
        Ok(Self::new(transport, config.cache))
    }
}

impl<T: Transport> Dashboard<T> {
    pub fn new(transport: T, cache_config: CacheConfig) -> Self {
        let cache = QueryCache::new(cache_config);
        let session = Arc::new(Session::new());
        Self {
            session_updates: Mutex::new(session.subscribe()),
            client: Arc::new(AdminClient::new(transport, session)),
            mutations: MutationTracker::new(cache.clone()),
            cache,
        }
    }

    pub fn client(&self) -> &AdminClient<T> {
        &self.client
    }

    pub fn session(&self) -> &Arc<Session> {
        self.client.session()
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    // Signed-in data never outlives a session reset, whether it came from logout or a 401
    fn drop_signed_out_data(&self) {
        let mut updates = self.session_updates.lock();
        if !updates.has_changed().unwrap_or(false) {
            return;
        }
        let signed_out = *updates.borrow_and_update() == SessionState::SignedOut;
        if signed_out {
            info!("Session reset, dropping {} cached entries", self.cache.len());
            self.cache.clear();
        }
    }

    async fn query<R, F, Fut>(&self, key: QueryKey, options: ReadOptions, fetch: F) -> CacheEntry<R>
    where
        R: Send + Sync + 'static,
        F: Fn(Arc<AdminClient<T>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ApiError>> + Send + 'static,
    {
        self.drop_signed_out_data();
        let client = Arc::clone(&self.client);
        let entry = self
            .cache
            .read(key, move || fetch(Arc::clone(&client)), options)
            .await;
        self.drop_signed_out_data();
        entry
    }

    // None until a row is selected; runs only while the gate is open
    async fn detail<R, F, Fut>(
        &self,
        gate: &DetailGate,
        make_key: fn(String) -> QueryKey,
        fetch: F,
    ) -> Option<CacheEntry<R>>
    where
        R: Send + Sync + 'static,
        F: Fn(Arc<AdminClient<T>>, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ApiError>> + Send + 'static,
    {
        let id = gate.selected.clone()?;
        let key = make_key(id.clone());
        let options = ReadOptions::gated(gate.enabled());
        Some(
            self.query(key, options, move |client| fetch(client, id.clone()))
                .await,
        )
    }

    // Closing a dialog disables its detail key so later invalidations leave it alone
    pub fn close_detail(&self, gate: &mut DetailGate, make_key: fn(String) -> QueryKey) {
        gate.close();
        if let Some(id) = gate.selected.clone() {
            self.cache.set_enabled(&make_key(id), false);
        }
    }

    // Session

    pub async fn login(&self, email: &str, password: &str) -> Result<AdminUser, ApiError> {
        let user = self
            .client
            .login(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        self.drop_signed_out_data();
        self.cache.clear();
        Ok(user)
    }

    pub fn logout(&self) {
        self.client.logout();
        self.cache.clear();
    }

    pub async fn profile(&self) -> CacheEntry<AdminUser> {
        self.query(QueryKey::Profile, ReadOptions::default(), |c| async move {
            c.view_profile().await
        })
        .await
    }

    // Bookings

    pub async fn bookings(&self) -> CacheEntry<Vec<Booking>> {
        self.query(QueryKey::Bookings, ReadOptions::default(), |c| async move {
            c.list_bookings().await
        })
        .await
    }

    pub async fn recent_bookings(&self) -> CacheEntry<Vec<Booking>> {
        self.query(QueryKey::RecentBookings, ReadOptions::default(), |c| async move {
            c.recent_bookings().await
        })
        .await
    }

    pub async fn booking_detail(&self, gate: &DetailGate) -> Option<CacheEntry<Booking>> {
        self.detail(gate, QueryKey::Booking, |c, id| async move {
            c.get_booking(&id).await
        })
        .await
    }

    pub async fn create_booking(&self, payload: &CreateBookingPayload) -> Result<Ack, ApiError> {
        self.mutations
            .mutate(
                MutationScope::resource(QueryKey::Bookings),
                self.client.create_booking(payload),
                &[QueryKey::Bookings, QueryKey::Stat(StatKind::Bookings)],
            )
            .await
    }

    // Validation failures never reach the network
    pub async fn submit_booking(&self, draft: &BookingDraft) -> Result<Ack, SubmitError> {
        draft.validate()?;
        let payload = draft.to_payload();
        Ok(self.create_booking(&payload).await?)
    }

    pub async fn delete_booking(&self, booking_id: &str) -> Result<Ack, ApiError> {
        self.mutations
            .mutate(
                MutationScope::item(QueryKey::Bookings, booking_id),
                self.client.delete_booking(booking_id),
                &[QueryKey::Bookings, QueryKey::Stat(StatKind::Bookings)],
            )
            .await
    }

    pub async fn assign_booking(&self, booking_id: &str, worker_id: &str) -> Result<Ack, ApiError> {
        self.mutations
            .mutate(
                MutationScope::item(QueryKey::Bookings, booking_id),
                self.client.assign_booking(booking_id, worker_id),
                &[QueryKey::Bookings],
            )
            .await
    }

    pub async fn revoke_cleaner(&self, worker_id: &str, booking_id: &str) -> Result<Ack, ApiError> {
        self.mutations
            .mutate(
                MutationScope::item(QueryKey::Bookings, booking_id),
                self.client.revoke_cleaner(worker_id, booking_id),
                &[QueryKey::Bookings],
            )
            .await
    }

    pub async fn assign_booking_to_many(&self, assignment: &MultiAssignRequest) -> Result<Ack, ApiError> {
        self.mutations
            .mutate(
                MutationScope::item(QueryKey::Bookings, assignment.booking_id.as_str()),
                self.client.assign_booking_to_many(assignment),
                &[QueryKey::Bookings],
            )
            .await
    }

    // Cleaners and admins

    pub async fn cleaners(&self) -> CacheEntry<Vec<Cleaner>> {
        self.query(QueryKey::Cleaners, ReadOptions::default(), |c| async move {
            c.list_cleaners().await
        })
        .await
    }

    pub async fn cleaner_detail(&self, gate: &DetailGate) -> Option<CacheEntry<Cleaner>> {
        self.detail(gate, QueryKey::Cleaner, |c, id| async move {
            c.get_cleaner(&id).await
        })
        .await
    }

    pub async fn register_cleaner(&self, cleaner: &NewCleaner) -> Result<Ack, ApiError> {
        self.mutations
            .mutate(
                MutationScope::resource(QueryKey::Cleaners),
                self.client.register_cleaner(cleaner),
                &[QueryKey::Cleaners, QueryKey::Stat(StatKind::Workers)],
            )
            .await
    }

    pub async fn delete_cleaner(&self, cleaner_id: &str) -> Result<Ack, ApiError> {
        self.mutations
            .mutate(
                MutationScope::item(QueryKey::Cleaners, cleaner_id),
                self.client.delete_cleaner(cleaner_id),
                &[QueryKey::Cleaners, QueryKey::Stat(StatKind::Workers)],
            )
            .await
    }

    pub async fn admins(&self) -> CacheEntry<Vec<AdminUser>> {
        self.query(QueryKey::Admins, ReadOptions::default(), |c| async move {
            c.list_admins().await
        })
        .await
    }

    pub async fn create_admin(&self, admin: &NewAdmin) -> Result<Ack, ApiError> {
        self.mutations
            .mutate(
                MutationScope::resource(QueryKey::Admins),
                self.client.create_admin(admin),
                &[QueryKey::Admins],
            )
            .await
    }

    pub async fn block_user(&self, user_id: &str) -> Result<Ack, ApiError> {
        self.mutations
            .mutate(
                MutationScope::item(QueryKey::Admins, user_id),
                self.client.block_user(user_id),
                &[QueryKey::Admins],
            )
            .await
    }

    // Banks

    pub async fn banks(&self) -> CacheEntry<Vec<Bank>> {
        self.query(QueryKey::Banks, ReadOptions::default(), |c| async move {
            c.list_banks().await
        })
        .await
    }

    pub async fn bank_detail(&self, gate: &DetailGate) -> Option<CacheEntry<Bank>> {
        self.detail(gate, QueryKey::Bank, |c, id| async move { c.get_bank(&id).await })
            .await
    }

    // FAQs

    pub async fn faqs(&self) -> CacheEntry<Vec<Faq>> {
        self.query(QueryKey::Faqs, ReadOptions::default(), |c| async move {
            c.list_faqs().await
        })
        .await
    }

    pub async fn faq_detail(&self, gate: &DetailGate) -> Option<CacheEntry<Faq>> {
        self.detail(gate, QueryKey::Faq, |c, id| async move { c.get_faq(&id).await })
            .await
    }

    pub async fn create_faq(&self, faq: &NewFaq) -> Result<Ack, ApiError> {
        self.mutations
            .mutate(
                MutationScope::resource(QueryKey::Faqs),
                self.client.create_faq(faq),
                &[QueryKey::Faqs],
            )
            .await
    }

    pub async fn update_faq(&self, faq_id: &str, faq: &NewFaq) -> Result<Ack, ApiError> {
        self.mutations
            .mutate(
                MutationScope::item(QueryKey::Faqs, faq_id),
                self.client.update_faq(faq_id, faq),
                &[QueryKey::Faqs],
            )
            .await
    }

    pub async fn delete_faq(&self, faq_id: &str) -> Result<Ack, ApiError> {
        self.mutations
            .mutate(
                MutationScope::item(QueryKey::Faqs, faq_id),
                self.client.delete_faq(faq_id),
                &[QueryKey::Faqs],
            )
            .await
    }

    // Service catalog

    pub async fn catalog(&self) -> CacheEntry<Vec<CatalogEntry>> {
        self.query(QueryKey::Catalog, ReadOptions::default(), |c| async move {
            c.list_catalog().await
        })
        .await
    }

    pub async fn catalog_detail(&self, gate: &DetailGate) -> Option<CacheEntry<CatalogEntry>> {
        self.detail(gate, QueryKey::CatalogEntry, |c, id| async move {
            c.get_catalog_entry(&id).await
        })
        .await
    }

    pub async fn create_catalog_entry(&self, entry: &NewCatalogEntry) -> Result<Ack, ApiError> {
        self.mutations
            .mutate(
                MutationScope::resource(QueryKey::Catalog),
                self.client.create_catalog_entry(entry),
                &[QueryKey::Catalog],
            )
            .await
    }

    pub async fn update_catalog_entry(&self, entry_id: &str, entry: &NewCatalogEntry) -> Result<Ack, ApiError> {
        self.mutations
            .mutate(
                MutationScope::item(QueryKey::Catalog, entry_id),
                self.client.update_catalog_entry(entry_id, entry),
                &[QueryKey::Catalog],
            )
            .await
    }

    pub async fn delete_catalog_entry(&self, entry_id: &str) -> Result<Ack, ApiError> {
        self.mutations
            .mutate(
                MutationScope::item(QueryKey::Catalog, entry_id),
                self.client.delete_catalog_entry(entry_id),
                &[QueryKey::Catalog],
            )
            .await
    }

    // About us

    pub async fn about(&self) -> CacheEntry<Vec<AboutContent>> {
        self.query(QueryKey::About, ReadOptions::default(), |c| async move {
            c.list_about().await
        })
        .await
    }

    pub async fn about_detail(&self, gate: &DetailGate) -> Option<CacheEntry<AboutContent>> {
        self.detail(gate, QueryKey::AboutEntry, |c, id| async move {
            c.get_about(&id).await
        })
        .await
    }

    pub async fn create_about(&self, about: &NewAbout) -> Result<Ack, ApiError> {
        self.mutations
            .mutate(
                MutationScope::resource(QueryKey::About),
                self.client.create_about(about),
                &[QueryKey::About],
            )
            .await
    }

    pub async fn update_about(&self, about_id: &str, about: &NewAbout) -> Result<Ack, ApiError> {
        self.mutations
            .mutate(
                MutationScope::item(QueryKey::About, about_id),
                self.client.update_about(about_id, about),
                &[QueryKey::About],
            )
            .await
    }

    pub async fn delete_about(&self, about_id: &str) -> Result<Ack, ApiError> {
        self.mutations
            .mutate(
                MutationScope::item(QueryKey::About, about_id),
                self.client.delete_about(about_id),
                &[QueryKey::About],
            )
            .await
    }

    // Payouts and statistics

    pub async fn disbursements(&self) -> CacheEntry<Vec<DisbursementRecord>> {
        self.query(QueryKey::Disbursements, ReadOptions::default(), |c| async move {
            c.list_disbursements().await
        })
        .await
    }

    pub async fn payout_report(&self, generated_on: NaiveDate) -> Result<PayoutReport, ApiError> {
        let records = self.disbursements().await.into_result()?;
        Ok(PayoutReport::from_records(&records, generated_on))
    }

    pub async fn booking_totals(&self) -> CacheEntry<BookingTotals> {
        self.query(QueryKey::Stat(StatKind::Bookings), ReadOptions::default(), |c| async move {
            c.booking_totals().await
        })
        .await
    }

    pub async fn revenue_totals(&self) -> CacheEntry<RevenueTotals> {
        self.query(QueryKey::Stat(StatKind::Revenue), ReadOptions::default(), |c| async move {
            c.revenue_totals().await
        })
        .await
    }

    pub async fn user_totals(&self) -> CacheEntry<UserTotals> {
        self.query(QueryKey::Stat(StatKind::Users), ReadOptions::default(), |c| async move {
            c.user_totals().await
        })
        .await
    }

    pub async fn worker_totals(&self) -> CacheEntry<WorkerTotals> {
        self.query(QueryKey::Stat(StatKind::Workers), ReadOptions::default(), |c| async move {
            c.worker_totals().await
        })
        .await
    }

    pub async fn cleaning_service_graph(&self) -> CacheEntry<CleaningServiceGraph> {
        self.query(
            QueryKey::Stat(StatKind::CleaningServiceGraph),
            ReadOptions::default(),
            |c| async move { c.cleaning_service_graph().await },
        )
        .await
    }

    pub async fn revenue_graph(&self) -> CacheEntry<RevenueGraph> {
        self.query(
            QueryKey::Stat(StatKind::RevenueGraph),
            ReadOptions::default(),
            |c| async move { c.revenue_graph().await },
        )
        .await
    }

    // All statistics load side by side; a failed one renders as zero
    pub async fn overview(&self) -> Overview {
        let (bookings, revenue, users, workers, cleaning, graph, recent) = tokio::join!(
            self.booking_totals(),
            self.revenue_totals(),
            self.user_totals(),
            self.worker_totals(),
            self.cleaning_service_graph(),
            self.revenue_graph(),
            self.recent_bookings(),
        );

        Overview {
            cards: vec![
                StatCard::bookings(&bookings),
                StatCard::revenue(&revenue),
                StatCard::users(&users),
                StatCard::workers(&workers),
            ],
            cleaning: cleaning_points(cleaning.data()),
            this_week_total: cleaning
                .data()
                .and_then(|graph| graph.summary.as_ref())
                .map(|summary| summary.total_this_week),
            revenue: revenue_series(graph.data()),
            recent_bookings: recent.data().cloned().unwrap_or_default(),
        }
    }
}
