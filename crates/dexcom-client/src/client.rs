//! Client facade and builder
//!
//! The facade validates arguments eagerly, delegates session handling to
//! `SessionManager`, and recovers from exactly one server-side session
//! rejection per call by invalidating and re-authenticating.

use std::sync::Arc;
use std::time::Duration;

use dexcom_auth::constants::READINGS_ENDPOINT;
use dexcom_auth::{
    ArgumentError, Credentials, Endpoints, Error, MemorySessionCache, Region, Result,
    SessionCache, SessionManager, endpoint,
};
use serde_json::{Value, json};
use share_transport::{HttpRequest, HttpSend, ReqwestSender, ResilientTransport, RetryPolicy};
use tracing::{debug, info, instrument, warn};

use crate::query::encode_query;
use crate::reading::GlucoseReading;

/// How long a session id is trusted before re-authenticating.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(600);

/// Per-request timeout of the default HTTP sender.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest `minutes` window the readings endpoint accepts.
pub const MAX_MINUTES: u32 = 1440;

/// Largest `max_count` the readings endpoint accepts.
pub const MAX_MAX_COUNT: u32 = 288;

// Window used by `get_current_glucose_reading`
const CURRENT_MINUTES: u32 = 10;

/// Configures and builds a `Client`.
///
/// Exactly one of `username` / `account_id` and a non-empty `password` are
/// required; everything else has a default.
pub struct ClientBuilder {
    password: Option<String>,
    username: Option<String>,
    account_id: Option<String>,
    region: Region,
    base_url: Option<String>,
    cache: Option<Arc<dyn SessionCache>>,
    session_ttl: Duration,
    retry_policy: RetryPolicy,
    sender: Option<Arc<dyn HttpSend>>,
    timeout: Duration,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            password: None,
            username: None,
            account_id: None,
            region: Region::default(),
            base_url: None,
            cache: None,
            session_ttl: DEFAULT_SESSION_TTL,
            retry_policy: RetryPolicy::default(),
            sender: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientBuilder {
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// Override the region's base URL. The application id still follows the
    /// region.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Session store; defaults to a fresh `MemorySessionCache`.
    pub fn cache(mut self, cache: Arc<dyn SessionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// HTTP implementation; defaults to `ReqwestSender`.
    pub fn sender(mut self, sender: Arc<dyn HttpSend>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Per-request timeout for the default sender. Ignored when a custom
    /// sender is supplied.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate the configuration and build the client. No network I/O.
    pub fn build(self) -> Result<Client> {
        let credentials = Credentials::new(
            self.password.unwrap_or_default(),
            self.username,
            self.account_id,
        )?;
        let endpoints = match &self.base_url {
            Some(base_url) => Endpoints::with_base_url(self.region, base_url)?,
            None => Endpoints::for_region(self.region)?,
        };

        let sender: Arc<dyn HttpSend> = match self.sender {
            Some(sender) => sender,
            None => {
                let http = reqwest::Client::builder().build().map_err(|e| {
                    Error::Network(share_transport::Error::Network(format!(
                        "building HTTP client: {e}"
                    )))
                })?;
                Arc::new(ReqwestSender::new(http, self.timeout))
            }
        };
        let transport = ResilientTransport::new(sender, self.retry_policy);
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemorySessionCache::new()));

        let session = SessionManager::new(
            transport.clone(),
            endpoints.clone(),
            Arc::new(credentials),
            cache.clone(),
            self.session_ttl,
        );

        info!(
            region = %self.region,
            base_url = %endpoints.base(),
            session_ttl_secs = self.session_ttl.as_secs(),
            "dexcom share client configured"
        );

        Ok(Client {
            region: self.region,
            endpoints,
            transport,
            cache,
            session,
        })
    }
}

/// Dexcom Share client.
///
/// Cheap to share behind an `Arc`; all methods take `&self`. Session
/// acquisition is serialized per client, reads are not.
pub struct Client {
    region: Region,
    endpoints: Endpoints,
    transport: ResilientTransport,
    cache: Arc<dyn SessionCache>,
    session: SessionManager,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Account id, once known (supplied or authenticated).
    pub async fn account_id(&self) -> Option<String> {
        self.session.account_id().await
    }

    /// Session id currently held by the cache, if any.
    pub async fn session_id(&self) -> Result<Option<String>> {
        self.cache.get().await
    }

    /// Readings from the last `minutes` minutes, newest first, at most
    /// `max_count` of them.
    ///
    /// `minutes` must be in `1..=1440` and `max_count` in `1..=288`; both are
    /// checked before any network call. A session rejected by the server is
    /// renewed once; a second rejection is returned to the caller.
    #[instrument(skip(self))]
    pub async fn get_glucose_readings(
        &self,
        minutes: u32,
        max_count: u32,
    ) -> Result<Vec<GlucoseReading>> {
        validate_window(minutes, max_count)?;

        match self.fetch_readings(minutes, max_count).await {
            Err(e) if e.is_session() => {
                warn!(error = %e, "session rejected, re-authenticating");
                metrics::counter!("dexcom_session_renewals_total").increment(1);
                self.session.invalidate().await?;
                self.fetch_readings(minutes, max_count).await
            }
            result => result,
        }
    }

    /// Most recent reading from the last 24 hours.
    pub async fn get_latest_glucose_reading(&self) -> Result<Option<GlucoseReading>> {
        let readings = self.get_glucose_readings(MAX_MINUTES, 1).await?;
        Ok(readings.into_iter().next())
    }

    /// Most recent reading from the last 10 minutes.
    pub async fn get_current_glucose_reading(&self) -> Result<Option<GlucoseReading>> {
        let readings = self.get_glucose_readings(CURRENT_MINUTES, 1).await?;
        Ok(readings.into_iter().next())
    }

    async fn fetch_readings(&self, minutes: u32, max_count: u32) -> Result<Vec<GlucoseReading>> {
        let session_id = self.session.ensure_session().await?;

        let mut url = self.endpoints.url(READINGS_ENDPOINT)?;
        encode_query(
            &mut url,
            &[
                ("sessionId", Value::String(session_id)),
                ("minutes", minutes.into()),
                ("maxCount", max_count.into()),
            ],
        );
        let request = HttpRequest::post_json(url, &json!({}));

        let body = endpoint::send(&self.transport, &request).await?;
        let readings = GlucoseReading::from_response(body)?;
        debug!(count = readings.len(), "readings fetched");
        metrics::counter!("dexcom_readings_fetched_total").increment(readings.len() as u64);
        Ok(readings)
    }
}

fn validate_window(minutes: u32, max_count: u32) -> Result<()> {
    if !(1..=MAX_MINUTES).contains(&minutes) {
        return Err(ArgumentError::MinutesInvalid.into());
    }
    if !(1..=MAX_MAX_COUNT).contains(&max_count) {
        return Err(ArgumentError::MaxCountInvalid.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex as StdMutex;

    use dexcom_auth::constants::{AUTHENTICATE_ENDPOINT, DEFAULT_UUID, LOGIN_ID_ENDPOINT};
    use dexcom_auth::{AccountError, SessionError};
    use reqwest::StatusCode;
    use reqwest::header::{HeaderValue, RETRY_AFTER};
    use share_transport::{HttpResponse, SendFuture};

    use crate::trend::Trend;

    const ACCOUNT_ID: &str = "5a0e4c3b-8f1d-4b2a-9c6e-7d8f9a0b1c2d";
    const SESSION_A: &str = "0f1e2d3c-4b5a-4968-8776-a5b4c3d2e1f0";
    const SESSION_B: &str = "1a2b3c4d-5e6f-4a0b-9c1d-2e3f4a5b6c7d";
    const READING: &str =
        r#"[{"WT":"Date(1691455258000)","ST":"Date(1691455258000)","DT":"Date(1691455258000-0400)","Value":85,"Trend":"Flat"}]"#;
    const SESSION_NOT_FOUND: &str = r#"{"Code":"SessionIdNotFound","Message":"Session ID not found"}"#;
    const SESSION_INVALID: &str = r#"{"Code":"SessionNotValid","Message":"Session not active"}"#;

    /// Scripted Share upstream keyed by endpoint path. Records the URL of
    /// every request.
    #[derive(Default)]
    struct FakeShare {
        routes: StdMutex<HashMap<&'static str, VecDeque<HttpResponse>>>,
        requests: StdMutex<Vec<reqwest::Url>>,
    }

    impl FakeShare {
        fn respond(&self, endpoint: &'static str, response: HttpResponse) {
            self.routes
                .lock()
                .unwrap()
                .entry(endpoint)
                .or_default()
                .push_back(response);
        }

        fn ok(&self, endpoint: &'static str, body: &str) {
            self.respond(endpoint, HttpResponse::new(StatusCode::OK, body.to_owned()));
        }

        fn ok_id(&self, endpoint: &'static str, id: &str) {
            self.ok(endpoint, &format!("\"{id}\""));
        }

        /// Script a complete username login.
        fn full_login(&self, session_id: &str) {
            self.ok_id(AUTHENTICATE_ENDPOINT, ACCOUNT_ID);
            self.ok_id(LOGIN_ID_ENDPOINT, session_id);
        }

        fn count(&self, endpoint: &str) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|url| url.path().ends_with(endpoint))
                .count()
        }

        fn total(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn last_readings_query(&self) -> HashMap<String, String> {
            let requests = self.requests.lock().unwrap();
            let url = requests
                .iter()
                .rev()
                .find(|url| url.path().ends_with(READINGS_ENDPOINT))
                .unwrap();
            url.query_pairs().into_owned().collect()
        }
    }

    impl HttpSend for FakeShare {
        fn send<'a>(&'a self, request: &'a HttpRequest) -> SendFuture<'a> {
            let path = request.url.path().to_owned();
            self.requests.lock().unwrap().push(request.url.clone());

            let mut routes = self.routes.lock().unwrap();
            let response = routes
                .iter_mut()
                .find(|(endpoint, _)| path.ends_with(**endpoint))
                .and_then(|(_, queue)| queue.pop_front());
            Box::pin(async move {
                response.ok_or_else(|| {
                    share_transport::Error::Network(format!("no scripted response for {path}"))
                })
            })
        }
    }

    fn builder(fake: &Arc<FakeShare>) -> ClientBuilder {
        Client::builder()
            .password("hunter2")
            .base_url("http://share.test/ShareWebServices/Services")
            .sender(fake.clone())
            .retry_policy(RetryPolicy {
                max_attempts: 1,
                ..RetryPolicy::default()
            })
    }

    fn client(fake: &Arc<FakeShare>) -> Client {
        builder(fake).username("someone").build().unwrap()
    }

    #[test]
    fn builder_rejects_bad_identity_without_io() {
        let fake = Arc::new(FakeShare::default());

        let err = builder(&fake).build().err().unwrap();
        assert_eq!(err, Error::from(ArgumentError::NoUserId));

        let err = builder(&fake)
            .username("someone")
            .account_id(ACCOUNT_ID)
            .build()
            .err()
            .unwrap();
        assert_eq!(err, Error::from(ArgumentError::TooManyUserIds));

        let err = builder(&fake).account_id(DEFAULT_UUID).build().err().unwrap();
        assert_eq!(err, Error::from(ArgumentError::AccountIdDefault));

        let err = builder(&fake).account_id("not-a-uuid").build().err().unwrap();
        assert_eq!(err, Error::from(ArgumentError::AccountIdInvalid));

        let err = Client::builder()
            .username("someone")
            .sender(fake.clone())
            .build()
            .err()
            .unwrap();
        assert_eq!(err, Error::from(ArgumentError::PasswordInvalid));

        let err = builder(&fake)
            .username("someone")
            .base_url("ftp://share.test/")
            .build()
            .err()
            .unwrap();
        assert_eq!(err, Error::from(ArgumentError::BaseUrlInvalid));

        assert_eq!(fake.total(), 0);
    }

    #[tokio::test]
    async fn out_of_range_windows_fail_before_any_request() {
        let fake = Arc::new(FakeShare::default());
        let client = client(&fake);

        for (minutes, max_count, expected) in [
            (0, 1, ArgumentError::MinutesInvalid),
            (1441, 1, ArgumentError::MinutesInvalid),
            (10, 0, ArgumentError::MaxCountInvalid),
            (10, 289, ArgumentError::MaxCountInvalid),
            (0, 0, ArgumentError::MinutesInvalid),
        ] {
            let err = client.get_glucose_readings(minutes, max_count).await.unwrap_err();
            assert_eq!(err, Error::from(expected), "({minutes}, {max_count})");
        }
        assert_eq!(fake.total(), 0);
    }

    #[tokio::test]
    async fn window_bounds_are_inclusive() {
        let fake = Arc::new(FakeShare::default());
        fake.full_login(SESSION_A);
        fake.ok(READINGS_ENDPOINT, "[]");
        fake.ok(READINGS_ENDPOINT, "[]");
        let client = client(&fake);

        client.get_glucose_readings(1, 1).await.unwrap();
        client.get_glucose_readings(1440, 288).await.unwrap();

        let query = fake.last_readings_query();
        assert_eq!(query["minutes"], "1440");
        assert_eq!(query["maxCount"], "288");
    }

    #[tokio::test]
    async fn decodes_the_reading_and_sends_the_session() {
        let fake = Arc::new(FakeShare::default());
        fake.full_login(SESSION_A);
        fake.ok(READINGS_ENDPOINT, READING);
        let client = client(&fake);

        let reading = client.get_latest_glucose_reading().await.unwrap().unwrap();
        assert_eq!(reading.mg_dl(), 85);
        assert_eq!(reading.trend(), Trend::Flat);
        assert_eq!(reading.trend_description(), "steady");
        assert_eq!(reading.timezone(), "-0400");

        let query = fake.last_readings_query();
        assert_eq!(query["sessionId"], SESSION_A);
        assert_eq!(query["minutes"], "1440");
        assert_eq!(query["maxCount"], "1");

        assert_eq!(client.account_id().await.as_deref(), Some(ACCOUNT_ID));
        assert_eq!(client.session_id().await.unwrap().as_deref(), Some(SESSION_A));
    }

    #[tokio::test]
    async fn current_reading_uses_ten_minute_window_and_may_be_empty() {
        let fake = Arc::new(FakeShare::default());
        fake.full_login(SESSION_A);
        fake.ok(READINGS_ENDPOINT, "[]");
        let client = client(&fake);

        assert!(client.get_current_glucose_reading().await.unwrap().is_none());
        let query = fake.last_readings_query();
        assert_eq!(query["minutes"], "10");
        assert_eq!(query["maxCount"], "1");
    }

    #[tokio::test]
    async fn session_is_reused_within_ttl() {
        let fake = Arc::new(FakeShare::default());
        fake.full_login(SESSION_A);
        fake.ok(READINGS_ENDPOINT, READING);
        fake.ok(READINGS_ENDPOINT, READING);
        let client = client(&fake);

        client.get_latest_glucose_reading().await.unwrap();
        client.get_latest_glucose_reading().await.unwrap();

        assert_eq!(fake.count(AUTHENTICATE_ENDPOINT), 1);
        assert_eq!(fake.count(LOGIN_ID_ENDPOINT), 1);
        assert_eq!(fake.count(READINGS_ENDPOINT), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_ttl_triggers_a_new_login() {
        let fake = Arc::new(FakeShare::default());
        fake.full_login(SESSION_A);
        fake.ok_id(LOGIN_ID_ENDPOINT, SESSION_B);
        fake.ok(READINGS_ENDPOINT, READING);
        fake.ok(READINGS_ENDPOINT, READING);
        let client = builder(&fake)
            .username("someone")
            .session_ttl(Duration::from_secs(60))
            .build()
            .unwrap();

        client.get_latest_glucose_reading().await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        client.get_latest_glucose_reading().await.unwrap();

        // Account id survives; only the session is renewed
        assert_eq!(fake.count(AUTHENTICATE_ENDPOINT), 1);
        assert_eq!(fake.count(LOGIN_ID_ENDPOINT), 2);
        assert_eq!(fake.last_readings_query()["sessionId"], SESSION_B);
    }

    #[tokio::test]
    async fn unbounded_session_ttl_is_accepted() {
        let fake = Arc::new(FakeShare::default());
        fake.full_login(SESSION_A);
        fake.ok(READINGS_ENDPOINT, READING);
        fake.ok(READINGS_ENDPOINT, READING);
        let client = builder(&fake)
            .username("someone")
            .session_ttl(Duration::MAX)
            .build()
            .unwrap();

        client.get_latest_glucose_reading().await.unwrap();
        client.get_latest_glucose_reading().await.unwrap();
        assert_eq!(fake.count(LOGIN_ID_ENDPOINT), 1);
    }

    #[tokio::test]
    async fn account_id_credentials_skip_account_authentication() {
        let fake = Arc::new(FakeShare::default());
        fake.ok_id(LOGIN_ID_ENDPOINT, SESSION_A);
        fake.ok(READINGS_ENDPOINT, READING);
        let client = builder(&fake).account_id(ACCOUNT_ID).build().unwrap();

        client.get_latest_glucose_reading().await.unwrap();
        assert_eq!(fake.count(AUTHENTICATE_ENDPOINT), 0);
        assert_eq!(fake.count(LOGIN_ID_ENDPOINT), 1);
    }

    #[tokio::test]
    async fn sentinel_account_id_stops_the_flow() {
        let fake = Arc::new(FakeShare::default());
        fake.ok_id(AUTHENTICATE_ENDPOINT, DEFAULT_UUID);
        let client = client(&fake);

        let err = client.get_latest_glucose_reading().await.unwrap_err();
        assert_eq!(err, Error::from(ArgumentError::AccountIdDefault));
        assert_eq!(fake.total(), 1);
    }

    #[tokio::test]
    async fn sentinel_session_id_stops_the_flow() {
        let fake = Arc::new(FakeShare::default());
        fake.full_login(DEFAULT_UUID);
        let client = client(&fake);

        let err = client.get_latest_glucose_reading().await.unwrap_err();
        assert_eq!(err, Error::from(ArgumentError::SessionIdDefault));
        assert_eq!(fake.count(READINGS_ENDPOINT), 0);
        assert_eq!(client.session_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn rejected_session_is_renewed_once() {
        let fake = Arc::new(FakeShare::default());
        fake.full_login(SESSION_A);
        fake.ok_id(LOGIN_ID_ENDPOINT, SESSION_B);
        fake.respond(
            READINGS_ENDPOINT,
            HttpResponse::new(StatusCode::INTERNAL_SERVER_ERROR, SESSION_NOT_FOUND),
        );
        fake.ok(READINGS_ENDPOINT, READING);
        let client = client(&fake);

        let reading = client.get_latest_glucose_reading().await.unwrap().unwrap();
        assert_eq!(reading.mg_dl(), 85);

        assert_eq!(fake.count(AUTHENTICATE_ENDPOINT), 1);
        assert_eq!(fake.count(LOGIN_ID_ENDPOINT), 2);
        assert_eq!(fake.count(READINGS_ENDPOINT), 2);
        assert_eq!(fake.last_readings_query()["sessionId"], SESSION_B);
        assert_eq!(client.session_id().await.unwrap().as_deref(), Some(SESSION_B));
    }

    #[tokio::test]
    async fn second_session_rejection_is_returned() {
        let fake = Arc::new(FakeShare::default());
        fake.full_login(SESSION_A);
        fake.ok_id(LOGIN_ID_ENDPOINT, SESSION_B);
        fake.respond(
            READINGS_ENDPOINT,
            HttpResponse::new(StatusCode::INTERNAL_SERVER_ERROR, SESSION_NOT_FOUND),
        );
        fake.respond(
            READINGS_ENDPOINT,
            HttpResponse::new(StatusCode::BAD_REQUEST, SESSION_INVALID),
        );
        let client = client(&fake);

        let err = client.get_latest_glucose_reading().await.unwrap_err();
        assert_eq!(err, Error::from(SessionError::Invalid));
        assert_eq!(fake.count(LOGIN_ID_ENDPOINT), 2);
        assert_eq!(fake.count(READINGS_ENDPOINT), 2);
    }

    #[tokio::test]
    async fn account_errors_are_not_retried_by_the_facade() {
        let fake = Arc::new(FakeShare::default());
        fake.respond(
            AUTHENTICATE_ENDPOINT,
            HttpResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"Code":"AccountPasswordInvalid","Message":"bad password"}"#,
            ),
        );
        let client = client(&fake);

        let err = client.get_latest_glucose_reading().await.unwrap_err();
        assert_eq!(err, Error::from(AccountError::FailedAuthentication));
        assert_eq!(fake.total(), 1);
    }

    #[tokio::test]
    async fn malformed_readings_are_argument_errors() {
        let fake = Arc::new(FakeShare::default());
        fake.full_login(SESSION_A);
        fake.ok(READINGS_ENDPOINT, r#"[{"Value":85}]"#);
        let client = client(&fake);

        let err = client.get_latest_glucose_reading().await.unwrap_err();
        assert_eq!(err, Error::from(ArgumentError::GlucoseReadingInvalid));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_then_success_is_transparent() {
        let fake = Arc::new(FakeShare::default());
        fake.full_login(SESSION_A);
        fake.respond(
            READINGS_ENDPOINT,
            HttpResponse::new(StatusCode::SERVICE_UNAVAILABLE, "")
                .with_header(RETRY_AFTER, HeaderValue::from_static("0")),
        );
        fake.ok(READINGS_ENDPOINT, READING);
        let client = builder(&fake)
            .username("someone")
            .retry_policy(RetryPolicy::default())
            .build()
            .unwrap();

        let reading = client.get_latest_glucose_reading().await.unwrap().unwrap();
        assert_eq!(reading.mg_dl(), 85);
        assert_eq!(fake.count(READINGS_ENDPOINT), 2);
        assert_eq!(fake.count(LOGIN_ID_ENDPOINT), 1);
    }

    #[tokio::test]
    async fn shared_cache_skips_login_for_a_second_client() {
        let fake = Arc::new(FakeShare::default());
        fake.full_login(SESSION_A);
        fake.ok(READINGS_ENDPOINT, READING);
        fake.ok(READINGS_ENDPOINT, READING);
        let cache: Arc<dyn SessionCache> = Arc::new(MemorySessionCache::new());

        let first = builder(&fake).username("someone").cache(cache.clone()).build().unwrap();
        first.get_latest_glucose_reading().await.unwrap();

        let second = builder(&fake).username("someone").cache(cache).build().unwrap();
        second.get_latest_glucose_reading().await.unwrap();

        assert_eq!(fake.count(LOGIN_ID_ENDPOINT), 1);
        assert_eq!(fake.count(READINGS_ENDPOINT), 2);
        // The second client never needed the account id
        assert_eq!(second.account_id().await, None);
    }

    /// Mock Share upstream over real HTTP. Answers the two login endpoints
    /// with fixed ids and checks the session id on readings calls.
    async fn start_share_server() -> (String, tokio::task::JoinHandle<()>) {
        use axum::Json;
        use axum::extract::Query;
        use axum::routing::post;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base = format!("http://{addr}/ShareWebServices/Services/");

        let handle = tokio::spawn(async move {
            let app = axum::Router::new()
                .route(
                    "/ShareWebServices/Services/General/AuthenticatePublisherAccount",
                    post(|Json(body): Json<Value>| async move {
                        assert_eq!(body["accountName"], "someone");
                        assert_eq!(body["applicationId"], "d89443d2-327c-4a6f-89e5-496bbb0317db");
                        Json(json!(ACCOUNT_ID))
                    }),
                )
                .route(
                    "/ShareWebServices/Services/General/LoginPublisherAccountById",
                    post(|Json(body): Json<Value>| async move {
                        assert_eq!(body["accountId"], ACCOUNT_ID);
                        Json(json!(SESSION_A))
                    }),
                )
                .route(
                    "/ShareWebServices/Services/Publisher/ReadPublisherLatestGlucoseValues",
                    post(|Query(query): Query<HashMap<String, String>>| async move {
                        if query.get("sessionId").map(String::as_str) != Some(SESSION_A) {
                            return (StatusCode::INTERNAL_SERVER_ERROR, SESSION_NOT_FOUND.to_owned());
                        }
                        (StatusCode::OK, READING.to_owned())
                    }),
                );
            axum::serve(listener, app).await.unwrap();
        });

        (base, handle)
    }

    #[tokio::test]
    async fn end_to_end_over_http() {
        let (base, _server) = start_share_server().await;
        let client = Client::builder()
            .username("someone")
            .password("hunter2")
            .base_url(base)
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        let reading = client.get_current_glucose_reading().await.unwrap().unwrap();
        assert_eq!(reading.mg_dl(), 85);
        assert_eq!(reading.mmol_l(), 4.7);
        assert_eq!(reading.trend_arrow(), "→");
        assert_eq!(client.session_id().await.unwrap().as_deref(), Some(SESSION_A));
    }
}
