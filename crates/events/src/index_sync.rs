//! Search-index synchronisation service.
//!
//! [`IndexSync`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! mirrors every job and user change into the search index. Failures are
//! logged and dropped; the next write to the same document re-syncs it.
//! The loop exits when the bus is dropped.

use std::sync::Arc;

use portal_core::error::CoreError;
use portal_core::geo::GeoPoint;
use portal_core::index_record::{JobRecord, TradespersonRecord};
use portal_core::job::Job;
use portal_core::ports::{geocode_postcode, Geocoder, SearchIndex, Store};
use portal_core::slug;
use portal_core::types::DbId;
use portal_core::user::User;
use tokio::sync::broadcast;

use crate::bus::{DocumentChange, DocumentEvent};

/// What a sync did to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Upserted,
    Deleted,
}

/// Coordinates and city slug resolved for a record.
#[derive(Debug, Default)]
struct ResolvedLocation {
    coordinates: Option<GeoPoint>,
    /// District reported by the forward lookup, reused instead of a reverse one.
    district: Option<String>,
}

/// Background service that keeps the search index in step with the store.
pub struct IndexSync {
    store: Arc<dyn Store>,
    index: Arc<dyn SearchIndex>,
    geocoder: Arc<dyn Geocoder>,
}

impl IndexSync {
    pub fn new(
        store: Arc<dyn Store>,
        index: Arc<dyn SearchIndex>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            store,
            index,
            geocoder,
        }
    }

    /// Run the sync loop until the channel is closed.
    pub async fn run(self, mut receiver: broadcast::Receiver<DocumentEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => match self.handle(&event).await {
                    Ok(outcome) => {
                        tracing::info!(
                            event_type = event.change.event_type(),
                            entity_id = event.change.entity_id(),
                            outcome = ?outcome,
                            "Search index synced",
                        );
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            event_type = event.change.event_type(),
                            entity_id = event.change.entity_id(),
                            "Failed to sync search index",
                        );
                    }
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Index sync lagged, some document changes were not synced"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, index sync shutting down");
                    break;
                }
            }
        }
    }

    /// Apply a single document change to the index.
    pub async fn handle(&self, event: &DocumentEvent) -> Result<SyncOutcome, CoreError> {
        match event.change {
            DocumentChange::JobWritten(id) => self.sync_job(id).await,
            DocumentChange::JobDeleted(id) => {
                self.index.delete_job(id).await?;
                Ok(SyncOutcome::Deleted)
            }
            DocumentChange::UserWritten(id) => self.sync_user(id).await,
            DocumentChange::UserDeleted(id) => {
                self.index.delete_tradesperson(id).await?;
                Ok(SyncOutcome::Deleted)
            }
        }
    }

    // ---- jobs ----

    async fn sync_job(&self, id: DbId) -> Result<SyncOutcome, CoreError> {
        let Some(job) = self.store.find_job(id).await? else {
            self.index.delete_job(id).await?;
            return Ok(SyncOutcome::Deleted);
        };

        let record = self.job_record(&job).await?;
        self.index.upsert_job(&record).await?;
        Ok(SyncOutcome::Upserted)
    }

    /// Build the index record, filling in coordinates and the city slug.
    pub async fn job_record(&self, job: &Job) -> Result<JobRecord, CoreError> {
        let location = match job.location.coordinates {
            Some(point) => ResolvedLocation {
                coordinates: Some(point),
                district: None,
            },
            None => self.geocode(Some(&job.location.postcode), job.id).await,
        };

        let mut city_slug = slug::first_slug([
            job.location.city_slug.as_deref(),
            job.location.town.as_deref(),
        ]);

        if city_slug.is_none() {
            // A missing owner only costs us this step of the chain.
            let owner = self.store.find_user(job.customer_id).await?;
            city_slug = owner.as_ref().and_then(|o| {
                slug::first_slug([
                    o.profile.city_slug.as_deref(),
                    o.profile.location_name.as_deref(),
                ])
            });
        }

        if city_slug.is_none() {
            city_slug = self.district_slug(&location).await;
        }

        Ok(JobRecord::from_job(job, location.coordinates, city_slug))
    }

    // ---- users ----

    async fn sync_user(&self, id: DbId) -> Result<SyncOutcome, CoreError> {
        let user = match self.store.find_user(id).await? {
            Some(user) if user.is_service_provider() => user,
            _ => {
                self.index.delete_tradesperson(id).await?;
                return Ok(SyncOutcome::Deleted);
            }
        };

        let record = self.tradesperson_record(&user).await;
        self.index.upsert_tradesperson(&record).await?;
        Ok(SyncOutcome::Upserted)
    }

    pub async fn tradesperson_record(&self, user: &User) -> TradespersonRecord {
        let location = match user.profile.coordinates {
            Some(point) => ResolvedLocation {
                coordinates: Some(point),
                district: None,
            },
            None => self.geocode(user.profile.postcode.as_deref(), user.id).await,
        };

        let mut city_slug = slug::first_slug([
            user.profile.city_slug.as_deref(),
            user.profile.location_name.as_deref(),
        ]);
        if city_slug.is_none() {
            city_slug = self.district_slug(&location).await;
        }

        TradespersonRecord::from_user(user, location.coordinates, city_slug)
    }

    // ---- location helpers ----

    /// Forward-geocode a postcode. Failures degrade to "no coordinates".
    async fn geocode(&self, postcode: Option<&str>, entity_id: DbId) -> ResolvedLocation {
        let Some(postcode) = postcode.filter(|p| !p.trim().is_empty()) else {
            return ResolvedLocation::default();
        };

        match geocode_postcode(self.geocoder.as_ref(), postcode).await {
            Ok(Some(place)) => ResolvedLocation {
                coordinates: Some(place.point),
                district: place.admin_district,
            },
            Ok(None) => {
                tracing::debug!(entity_id, postcode, "Postcode not found by geocoder");
                ResolvedLocation::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, entity_id, postcode, "Geocoding failed");
                ResolvedLocation::default()
            }
        }
    }

    /// Last step of the city-slug chain: the administrative district of the
    /// resolved coordinates.
    async fn district_slug(&self, location: &ResolvedLocation) -> Option<String> {
        if let Some(district) = location.district.as_deref() {
            return slug::city_slug(district);
        }

        let point = location.coordinates?;
        match self.geocoder.reverse(point).await {
            Ok(place) => place
                .and_then(|p| p.admin_district)
                .and_then(|d| slug::city_slug(&d)),
            Err(e) => {
                tracing::warn!(error = %e, lat = point.lat, lng = point.lng, "Reverse geocoding failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use portal_core::job::{DerivedLocation, JobLocation, JobStatus, NewJob, Urgency};
    use portal_core::ports::{
        GeocodedPlace, IndexPage, JobIndexQuery, JobStore, QuoteStore, UserStore,
    };
    use portal_core::quote::{NewQuote, Quote};
    use portal_core::tier::{SubscriptionStatus, Tier};
    use portal_core::user::{UpdateProfile, UserProfile};

    use super::*;
    use crate::bus::EventBus;

    // -----------------------------------------------------------------------
    // Fakes
    // -----------------------------------------------------------------------

    #[derive(Default)]
    struct FakeStore {
        jobs: HashMap<DbId, Job>,
        users: HashMap<DbId, User>,
    }

    #[async_trait]
    impl JobStore for FakeStore {
        async fn find_job(&self, id: DbId) -> Result<Option<Job>, CoreError> {
            Ok(self.jobs.get(&id).cloned())
        }
        async fn list_open_jobs(&self) -> Result<Vec<Job>, CoreError> {
            unreachable!()
        }
        async fn count_open_jobs(&self) -> Result<u64, CoreError> {
            unreachable!()
        }
        async fn create_job(
            &self,
            _: DbId,
            _: &NewJob,
            _: &DerivedLocation,
        ) -> Result<Job, CoreError> {
            unreachable!()
        }
        async fn update_job_status(
            &self,
            _: DbId,
            _: JobStatus,
        ) -> Result<Option<Job>, CoreError> {
            unreachable!()
        }
        async fn delete_job(&self, _: DbId) -> Result<bool, CoreError> {
            unreachable!()
        }
    }

    #[async_trait]
    impl QuoteStore for FakeStore {
        async fn create_quote(&self, _: DbId, _: DbId, _: &NewQuote) -> Result<Quote, CoreError> {
            unreachable!()
        }
        async fn count_pending_quotes(&self, _: DbId) -> Result<i64, CoreError> {
            unreachable!()
        }
        async fn has_quoted(&self, _: DbId, _: DbId) -> Result<bool, CoreError> {
            unreachable!()
        }
    }

    #[async_trait]
    impl UserStore for FakeStore {
        async fn find_user(&self, id: DbId) -> Result<Option<User>, CoreError> {
            Ok(self.users.get(&id).cloned())
        }
        async fn update_profile(
            &self,
            _: DbId,
            _: &UpdateProfile,
        ) -> Result<Option<User>, CoreError> {
            unreachable!()
        }
    }

    #[async_trait]
    impl Store for FakeStore {
        async fn health_check(&self) -> Result<(), CoreError> {
            Ok(())
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum IndexCall {
        UpsertJob(JobRecord),
        DeleteJob(DbId),
        UpsertTradesperson(TradespersonRecord),
        DeleteTradesperson(DbId),
    }

    #[derive(Default)]
    struct RecordingIndex {
        calls: Mutex<Vec<IndexCall>>,
        fail: bool,
    }

    impl RecordingIndex {
        fn record(&self, call: IndexCall) -> Result<(), CoreError> {
            if self.fail {
                return Err(CoreError::Upstream {
                    service: "algolia",
                    message: "down".into(),
                });
            }
            self.calls.lock().unwrap().push(call);
            Ok(())
        }

        fn calls(&self) -> Vec<IndexCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchIndex for RecordingIndex {
        async fn search_jobs(&self, _: &JobIndexQuery) -> Result<IndexPage, CoreError> {
            unreachable!()
        }
        async fn upsert_job(&self, record: &JobRecord) -> Result<(), CoreError> {
            self.record(IndexCall::UpsertJob(record.clone()))
        }
        async fn delete_job(&self, id: DbId) -> Result<(), CoreError> {
            self.record(IndexCall::DeleteJob(id))
        }
        async fn upsert_tradesperson(&self, record: &TradespersonRecord) -> Result<(), CoreError> {
            self.record(IndexCall::UpsertTradesperson(record.clone()))
        }
        async fn delete_tradesperson(&self, id: DbId) -> Result<(), CoreError> {
            self.record(IndexCall::DeleteTradesperson(id))
        }
    }

    /// Knows one postcode in Leeds; reverse lookups land in Salford.
    #[derive(Default)]
    struct FakeGeocoder {
        fail: bool,
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn lookup_postcode(&self, postcode: &str) -> Result<Option<GeocodedPlace>, CoreError> {
            if self.fail {
                return Err(CoreError::Upstream {
                    service: "geocoder",
                    message: "timeout".into(),
                });
            }
            Ok((postcode == "LS1 4AP").then(|| GeocodedPlace {
                point: GeoPoint::new(53.7960, -1.5480),
                admin_district: Some("Leeds".into()),
            }))
        }
        async fn lookup_outcode(&self, _: &str) -> Result<Option<GeocodedPlace>, CoreError> {
            Ok(None)
        }
        async fn reverse(&self, _: GeoPoint) -> Result<Option<GeocodedPlace>, CoreError> {
            Ok(Some(GeocodedPlace {
                point: GeoPoint::new(53.48, -2.29),
                admin_district: Some("Salford".into()),
            }))
        }
    }

    // -----------------------------------------------------------------------
    // Fixtures
    // -----------------------------------------------------------------------

    fn job(id: DbId, customer_id: DbId, location: JobLocation) -> Job {
        let now = Utc::now();
        Job {
            id,
            customer_id,
            title: "Replace kitchen tap".into(),
            description: "Mixer tap is loose and dripping constantly".into(),
            status: JobStatus::Open,
            urgency: Urgency::Soon,
            service_type: "Taps".into(),
            location,
            budget: Some(90),
            quote_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn location(postcode: &str) -> JobLocation {
        JobLocation {
            postcode: postcode.into(),
            town: None,
            city_slug: None,
            coordinates: None,
        }
    }

    fn user(id: DbId, role: &str, profile: UserProfile) -> User {
        let now = Utc::now();
        User {
            id,
            role: role.into(),
            name: "Pat".into(),
            email: format!("user{id}@example.com"),
            subscription_tier: Tier::Business,
            subscription_status: SubscriptionStatus::Active,
            profile,
            created_at: now,
            updated_at: now,
        }
    }

    fn sync(store: FakeStore, index: Arc<RecordingIndex>, geocoder: FakeGeocoder) -> IndexSync {
        IndexSync::new(Arc::new(store), index, Arc::new(geocoder))
    }

    fn upserted_job(index: &RecordingIndex) -> JobRecord {
        match index.calls().as_slice() {
            [IndexCall::UpsertJob(record)] => record.clone(),
            other => panic!("expected one job upsert, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // Jobs
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn job_without_coordinates_is_geocoded_and_slugged_from_district() {
        let mut store = FakeStore::default();
        store.jobs.insert(1, job(1, 50, location("LS1 4AP")));
        let index = Arc::new(RecordingIndex::default());

        let outcome = sync(store, index.clone(), FakeGeocoder::default())
            .handle(&DocumentEvent::job_written(1))
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Upserted);
        let record = upserted_job(&index);
        assert_eq!(record.object_id, "1");
        assert_eq!(record.geoloc, Some(GeoPoint::new(53.7960, -1.5480)));
        assert_eq!(record.city_slug.as_deref(), Some("leeds"));
        assert_eq!(record.specialties, vec!["taps"]);
    }

    #[tokio::test]
    async fn explicit_slug_then_town_take_priority() {
        let mut store = FakeStore::default();
        let mut with_town = location("LS1 4AP");
        with_town.town = Some("Headingley".into());
        store.jobs.insert(1, job(1, 50, with_town));
        let index = Arc::new(RecordingIndex::default());

        sync(store, index.clone(), FakeGeocoder::default())
            .handle(&DocumentEvent::job_written(1))
            .await
            .unwrap();

        assert_eq!(upserted_job(&index).city_slug.as_deref(), Some("headingley"));
    }

    #[tokio::test]
    async fn owner_profile_fills_city_slug_before_reverse_geocoding() {
        let mut store = FakeStore::default();
        let mut loc = location("M1 1AE");
        loc.coordinates = Some(GeoPoint::new(53.4808, -2.2426));
        store.jobs.insert(1, job(1, 50, loc));
        store.users.insert(
            50,
            user(
                50,
                "customer",
                UserProfile {
                    location_name: Some("Stockport".into()),
                    ..Default::default()
                },
            ),
        );
        let index = Arc::new(RecordingIndex::default());

        sync(store, index.clone(), FakeGeocoder::default())
            .handle(&DocumentEvent::job_written(1))
            .await
            .unwrap();

        assert_eq!(upserted_job(&index).city_slug.as_deref(), Some("stockport"));
    }

    #[tokio::test]
    async fn reverse_geocoding_is_the_last_resort() {
        let mut store = FakeStore::default();
        let mut loc = location("M1 1AE");
        loc.coordinates = Some(GeoPoint::new(53.4808, -2.2426));
        store.jobs.insert(1, job(1, 50, loc));
        let index = Arc::new(RecordingIndex::default());

        sync(store, index.clone(), FakeGeocoder::default())
            .handle(&DocumentEvent::job_written(1))
            .await
            .unwrap();

        assert_eq!(upserted_job(&index).city_slug.as_deref(), Some("salford"));
    }

    #[tokio::test]
    async fn geocoder_failure_still_indexes_the_job() {
        let mut store = FakeStore::default();
        store.jobs.insert(1, job(1, 50, location("LS1 4AP")));
        let index = Arc::new(RecordingIndex::default());

        sync(store, index.clone(), FakeGeocoder { fail: true })
            .handle(&DocumentEvent::job_written(1))
            .await
            .unwrap();

        let record = upserted_job(&index);
        assert!(record.geoloc.is_none());
        assert!(record.city_slug.is_none());
    }

    #[tokio::test]
    async fn written_event_for_missing_job_deletes_record() {
        let index = Arc::new(RecordingIndex::default());
        let outcome = sync(FakeStore::default(), index.clone(), FakeGeocoder::default())
            .handle(&DocumentEvent::job_written(77))
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Deleted);
        assert_eq!(index.calls(), vec![IndexCall::DeleteJob(77)]);
    }

    #[tokio::test]
    async fn index_failure_is_returned() {
        let mut store = FakeStore::default();
        store.jobs.insert(1, job(1, 50, location("LS1 4AP")));
        let index = Arc::new(RecordingIndex {
            fail: true,
            ..Default::default()
        });

        let result = sync(store, index, FakeGeocoder::default())
            .handle(&DocumentEvent::job_written(1))
            .await;
        assert!(matches!(result, Err(CoreError::Upstream { .. })));
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn service_provider_is_indexed_with_normalised_specialties() {
        let mut store = FakeStore::default();
        store.users.insert(
            5,
            user(
                5,
                "tradesperson",
                UserProfile {
                    specialties: vec![" Boilers".into(), "boilers".into(), "".into(), "Drains".into()],
                    postcode: Some("LS1 4AP".into()),
                    ..Default::default()
                },
            ),
        );
        let index = Arc::new(RecordingIndex::default());

        sync(store, index.clone(), FakeGeocoder::default())
            .handle(&DocumentEvent::user_written(5))
            .await
            .unwrap();

        match index.calls().as_slice() {
            [IndexCall::UpsertTradesperson(record)] => {
                assert_eq!(record.object_id, "5");
                assert_eq!(record.specialties, vec!["boilers", "drains"]);
                assert_eq!(record.city_slug.as_deref(), Some("leeds"));
                assert_eq!(record.tier, "business");
            }
            other => panic!("expected one tradesperson upsert, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn customers_are_removed_from_the_tradespeople_index() {
        let mut store = FakeStore::default();
        store
            .users
            .insert(6, user(6, "customer", UserProfile::default()));
        let index = Arc::new(RecordingIndex::default());

        let outcome = sync(store, index.clone(), FakeGeocoder::default())
            .handle(&DocumentEvent::user_written(6))
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Deleted);
        assert_eq!(index.calls(), vec![IndexCall::DeleteTradesperson(6)]);
    }

    #[tokio::test]
    async fn deleted_events_delete_records() {
        let index = Arc::new(RecordingIndex::default());
        let sync = sync(FakeStore::default(), index.clone(), FakeGeocoder::default());

        sync.handle(&DocumentEvent::job_deleted(1)).await.unwrap();
        sync.handle(&DocumentEvent::user_deleted(2)).await.unwrap();

        assert_eq!(
            index.calls(),
            vec![IndexCall::DeleteJob(1), IndexCall::DeleteTradesperson(2)]
        );
    }

    // -----------------------------------------------------------------------
    // Run loop
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn run_processes_events_and_exits_when_bus_closes() {
        let index = Arc::new(RecordingIndex::default());
        let bus = EventBus::default();
        let receiver = bus.subscribe();
        let handle = tokio::spawn(
            sync(FakeStore::default(), index.clone(), FakeGeocoder::default()).run(receiver),
        );

        bus.publish(DocumentEvent::job_deleted(3));
        drop(bus);

        handle.await.expect("sync loop should exit cleanly");
        assert_eq!(index.calls(), vec![IndexCall::DeleteJob(3)]);
    }
}
