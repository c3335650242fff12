#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;

use portal_api::auth::jwt::{issue_access_token, JwtConfig, DEFAULT_ISSUER};
use portal_api::config::ServerConfig;
use portal_api::router::build_app_router;
use portal_api::state::AppState;
use portal_core::error::CoreError;
use portal_core::geo::GeoPoint;
use portal_core::index_record::{JobRecord, TradespersonRecord};
use portal_core::job::{DerivedLocation, Job, JobLocation, JobStatus, NewJob, Urgency};
use portal_core::ports::{
    GeocodedPlace, Geocoder, IndexPage, JobIndexQuery, JobStore, QuoteStore, SearchIndex, Store,
    UserStore,
};
use portal_core::quote::{NewQuote, Quote, QuoteStatus};
use portal_core::tier::{SubscriptionStatus, Tier};
use portal_core::types::{DbId, Timestamp};
use portal_core::user::{UpdateProfile, User, UserProfile};
use portal_events::EventBus;
use portal_geocode::GeocoderConfig;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-long-enough";

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Tables {
    jobs: BTreeMap<DbId, Job>,
    users: BTreeMap<DbId, User>,
    quotes: Vec<Quote>,
}

/// Primary store held in memory.
pub struct MemoryStore {
    tables: Mutex<Tables>,
    healthy: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            healthy: AtomicBool::new(true),
        }
    }
}

impl MemoryStore {
    pub fn insert_job(&self, job: Job) {
        self.tables.lock().unwrap().jobs.insert(job.id, job);
    }

    pub fn insert_user(&self, user: User) {
        self.tables.lock().unwrap().users.insert(user.id, user);
    }

    pub fn insert_quote(&self, job_id: DbId, tradesperson_id: DbId, status: QuoteStatus) {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.quotes.len() as DbId + 1;
        tables.quotes.push(Quote {
            id,
            job_id,
            tradesperson_id,
            amount: 100,
            message: None,
            status,
            created_at: Utc::now(),
        });
    }

    pub fn job(&self, id: DbId) -> Option<Job> {
        self.tables.lock().unwrap().jobs.get(&id).cloned()
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn find_job(&self, id: DbId) -> Result<Option<Job>, CoreError> {
        Ok(self.job(id))
    }

    async fn list_open_jobs(&self) -> Result<Vec<Job>, CoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Open)
            .cloned()
            .collect())
    }

    async fn count_open_jobs(&self) -> Result<u64, CoreError> {
        Ok(self.list_open_jobs().await?.len() as u64)
    }

    async fn create_job(
        &self,
        customer_id: DbId,
        input: &NewJob,
        derived: &DerivedLocation,
    ) -> Result<Job, CoreError> {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.jobs.keys().next_back().copied().unwrap_or(0) + 1;
        let now = Utc::now();
        let job = Job {
            id,
            customer_id,
            title: input.title.clone(),
            description: input.description.clone(),
            status: JobStatus::Open,
            urgency: input.urgency,
            service_type: input.service_type.clone(),
            location: JobLocation {
                postcode: input.postcode.clone(),
                town: input.town.clone(),
                city_slug: derived.city_slug.clone(),
                coordinates: derived.coordinates,
            },
            budget: input.budget,
            quote_count: 0,
            created_at: now,
            updated_at: now,
        };
        tables.jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn update_job_status(
        &self,
        id: DbId,
        status: JobStatus,
    ) -> Result<Option<Job>, CoreError> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables.jobs.get_mut(&id).map(|job| {
            job.status = status;
            job.updated_at = Utc::now();
            job.clone()
        }))
    }

    async fn delete_job(&self, id: DbId) -> Result<bool, CoreError> {
        Ok(self.tables.lock().unwrap().jobs.remove(&id).is_some())
    }
}

#[async_trait]
impl QuoteStore for MemoryStore {
    async fn create_quote(
        &self,
        job_id: DbId,
        tradesperson_id: DbId,
        input: &NewQuote,
    ) -> Result<Quote, CoreError> {
        let mut tables = self.tables.lock().unwrap();
        let quote = Quote {
            id: tables.quotes.len() as DbId + 1,
            job_id,
            tradesperson_id,
            amount: input.amount,
            message: input.message.clone(),
            status: QuoteStatus::Pending,
            created_at: Utc::now(),
        };
        tables.quotes.push(quote.clone());
        if let Some(job) = tables.jobs.get_mut(&job_id) {
            job.quote_count += 1;
        }
        Ok(quote)
    }

    async fn count_pending_quotes(&self, tradesperson_id: DbId) -> Result<i64, CoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .quotes
            .iter()
            .filter(|q| q.tradesperson_id == tradesperson_id && q.status == QuoteStatus::Pending)
            .count() as i64)
    }

    async fn has_quoted(&self, job_id: DbId, tradesperson_id: DbId) -> Result<bool, CoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .quotes
            .iter()
            .any(|q| q.job_id == job_id && q.tradesperson_id == tradesperson_id))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: DbId) -> Result<Option<User>, CoreError> {
        Ok(self.tables.lock().unwrap().users.get(&id).cloned())
    }

    async fn update_profile(
        &self,
        id: DbId,
        patch: &UpdateProfile,
    ) -> Result<Option<User>, CoreError> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables.users.get_mut(&id).map(|user| {
            patch.apply_to(&mut user.profile);
            user.updated_at = Utc::now();
            user.clone()
        }))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), CoreError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CoreError::Internal("connection refused".into()))
        }
    }
}

// ---------------------------------------------------------------------------
// Search index double
// ---------------------------------------------------------------------------

/// Answers every search with a canned page (or an error) and records queries.
pub struct FakeIndex {
    page: Option<IndexPage>,
    pub queries: Mutex<Vec<JobIndexQuery>>,
}

impl FakeIndex {
    pub fn returning(page: IndexPage) -> Self {
        Self {
            page: Some(page),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            page: None,
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SearchIndex for FakeIndex {
    async fn search_jobs(&self, query: &JobIndexQuery) -> Result<IndexPage, CoreError> {
        self.queries.lock().unwrap().push(query.clone());
        self.page.clone().ok_or(CoreError::Upstream {
            service: "algolia",
            message: "HTTP 503".into(),
        })
    }

    async fn upsert_job(&self, _record: &JobRecord) -> Result<(), CoreError> {
        Ok(())
    }

    async fn delete_job(&self, _id: DbId) -> Result<(), CoreError> {
        Ok(())
    }

    async fn upsert_tradesperson(&self, _record: &TradespersonRecord) -> Result<(), CoreError> {
        Ok(())
    }

    async fn delete_tradesperson(&self, _id: DbId) -> Result<(), CoreError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Geocoder double
// ---------------------------------------------------------------------------

/// Knows a fixed set of full postcodes; everything else is unknown.
/// When `failing`, every lookup errors.
#[derive(Default)]
pub struct FakeGeocoder {
    pub postcodes: BTreeMap<String, GeoPoint>,
    pub failing: bool,
}

impl FakeGeocoder {
    pub fn with_postcode(mut self, postcode: &str, point: GeoPoint) -> Self {
        self.postcodes.insert(postcode.to_string(), point);
        self
    }

    fn check(&self) -> Result<(), CoreError> {
        if self.failing {
            Err(CoreError::Upstream {
                service: "geocoder",
                message: "timed out".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn lookup_postcode(&self, postcode: &str) -> Result<Option<GeocodedPlace>, CoreError> {
        self.check()?;
        Ok(self.postcodes.get(postcode).map(|point| GeocodedPlace {
            point: *point,
            admin_district: None,
        }))
    }

    async fn lookup_outcode(&self, _outcode: &str) -> Result<Option<GeocodedPlace>, CoreError> {
        self.check()?;
        Ok(None)
    }

    async fn reverse(&self, _point: GeoPoint) -> Result<Option<GeocodedPlace>, CoreError> {
        self.check()?;
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            issuer: DEFAULT_ISSUER.to_string(),
            access_token_expiry_mins: 60,
        },
        algolia: None,
        geocoder: GeocoderConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
        },
    }
}

/// Backends shared by every request a test sends.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub index: Option<Arc<FakeIndex>>,
    pub geocoder: Arc<FakeGeocoder>,
    pub event_bus: Arc<EventBus>,
}

impl TestContext {
    /// No search index: every search runs against the store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::default()),
            index: None,
            geocoder: Arc::new(FakeGeocoder::default()),
            event_bus: Arc::new(EventBus::default()),
        }
    }

    pub fn with_index(mut self, index: FakeIndex) -> Self {
        self.index = Some(Arc::new(index));
        self
    }

    pub fn with_geocoder(mut self, geocoder: FakeGeocoder) -> Self {
        self.geocoder = Arc::new(geocoder);
        self
    }

    /// Build the full application router over these backends, using the
    /// same middleware stack as `main.rs`.
    pub fn app(&self) -> Router {
        let config = test_config();
        let search_index = self
            .index
            .as_ref()
            .map(|index| Arc::clone(index) as Arc<dyn SearchIndex>);

        let state = AppState {
            store: Arc::clone(&self.store) as Arc<dyn Store>,
            search_index,
            geocoder: Arc::clone(&self.geocoder) as Arc<dyn Geocoder>,
            config: Arc::new(config.clone()),
            event_bus: Arc::clone(&self.event_bus),
        };

        build_app_router(state, &config)
    }

    /// Queries the fake index has received so far.
    pub fn index_queries(&self) -> Vec<JobIndexQuery> {
        self.index
            .as_ref()
            .map(|index| index.queries.lock().unwrap().clone())
            .unwrap_or_default()
    }
}

/// Mint an access token for `user_id` with `role`.
pub fn token(user_id: DbId, role: &str) -> String {
    issue_access_token(user_id, role, &test_config().jwt).expect("token generation")
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// An open Manchester job created `age_days` days ago.
pub fn open_job(id: DbId, age_days: i64) -> Job {
    let created_at: Timestamp = Utc::now() - Duration::days(age_days);
    Job {
        id,
        customer_id: 500,
        title: format!("Job number {id}"),
        description: "Replace leaking kitchen mixer tap".to_string(),
        status: JobStatus::Open,
        urgency: Urgency::Soon,
        service_type: "repairs".to_string(),
        location: JobLocation {
            postcode: "M1 1AE".to_string(),
            town: Some("Manchester".to_string()),
            city_slug: Some("manchester".to_string()),
            coordinates: Some(GeoPoint::new(53.4808, -2.2426)),
        },
        budget: Some(100),
        quote_count: 0,
        created_at,
        updated_at: created_at,
    }
}

pub fn user(id: DbId, role: &str, tier: Tier, status: SubscriptionStatus) -> User {
    let now = Utc::now();
    User {
        id,
        role: role.to_string(),
        name: format!("User {id}"),
        email: format!("user{id}@example.com"),
        subscription_tier: tier,
        subscription_status: status,
        profile: UserProfile::default(),
        created_at: now,
        updated_at: now,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn patch_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
