//! End-to-end pipeline tests: repositories and use cases against a local
//! HTTP server and an in-memory response store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use reelkit::config::ApiConfig;
use reelkit::model::{Media, MyList, UserSession};
use reelkit::net::{
  DataTransferService, Endpoint, HttpTransport, ResponseEnvelope, TransportError,
};
use reelkit::repo::{
  AuthRepository, MediaListRequest, MediaRepository, MyListAction, MyListRepository,
  MyListRequest, SeasonRepository, SectionRepository, SignInRequest, SignUpRequest,
};
use reelkit::store::{ResponseStore, SqliteResponseStore};
use reelkit::usecase::{
  FetchMyListUseCase, FetchSeasonUseCase, SearchMediaUseCase, UpdateMyListUseCase,
};

// ============================================================================
// Test server infrastructure
// ============================================================================

#[derive(Default)]
struct ServerState {
  media_calls: AtomicUsize,
  signin_calls: AtomicUsize,
  media_titles: Mutex<Vec<String>>,
}

impl ServerState {
  fn set_media_titles(&self, titles: &[&str]) {
    *self.media_titles.lock().unwrap() = titles.iter().map(|t| t.to_string()).collect();
  }
}

fn media_item(title: &str) -> Value {
  json!({
    "slug": title.to_lowercase().replace(' ', "-"),
    "title": title,
    "poster_path": format!("/posters/{}.jpg", title.to_lowercase().replace(' ', "-")),
  })
}

async fn media_list(State(state): State<Arc<ServerState>>) -> Json<Value> {
  state.media_calls.fetch_add(1, Ordering::SeqCst);
  let items: Vec<Value> = state
    .media_titles
    .lock()
    .unwrap()
    .iter()
    .map(|t| media_item(t))
    .collect();
  Json(json!({"status": "success", "results": items.len(), "data": items}))
}

async fn media_search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
  // Slow enough that cancellation tests can interleave.
  tokio::time::sleep(Duration::from_millis(300)).await;
  let q = params.get("q").cloned().unwrap_or_default();
  Json(json!({"status": "success", "results": 1, "data": [media_item(&q)]}))
}

async fn sections() -> Json<Value> {
  Json(json!({
    "status": "success",
    "results": 1,
    "data": [{"id": "s-1", "title": "Trending", "media": [media_item("Dark Water")]}],
  }))
}

async fn signin(State(state): State<Arc<ServerState>>, Json(body): Json<Value>) -> Json<Value> {
  state.signin_calls.fetch_add(1, Ordering::SeqCst);
  let email = body["email"].as_str().unwrap_or_default();
  Json(json!({
    "status": "success",
    "data": {"user_id": "u-1", "name": "Ada", "email": email, "token": "tok-1"},
  }))
}

async fn signup(Json(body): Json<Value>) -> Json<Value> {
  let email = body["email"].as_str().unwrap_or_default();
  let name = body["name"].as_str().unwrap_or_default();
  Json(json!({
    "status": "success",
    "data": {"user_id": "u-2", "name": name, "email": email, "token": "tok-2"},
  }))
}

async fn signout() -> Json<Value> {
  Json(json!({"status": "success", "data": null}))
}

async fn season(Path((slug, number)): Path<(String, u32)>) -> Json<Value> {
  Json(json!({
    "status": "success",
    "data": {
      "media_slug": slug,
      "number": number,
      "title": format!("Season {}", number),
      "episodes": [
        {"id": "e-1", "number": 1, "title": "Pilot"},
        {"id": "e-2", "number": 2, "title": "Undertow"},
      ],
    },
  }))
}

async fn my_list(Path(user_id): Path<String>) -> Json<Value> {
  Json(json!({
    "status": "success",
    "data": {"user_id": user_id, "media": [media_item("Dark Water")]},
  }))
}

async fn my_list_update(Path(user_id): Path<String>, Json(body): Json<Value>) -> Json<Value> {
  let slug = body["media"].as_str().unwrap_or_default();
  Json(json!({
    "status": "success",
    "data": {"user_id": user_id, "media": [{"slug": slug, "title": "Saved"}]},
  }))
}

async fn broken() -> (StatusCode, Json<Value>) {
  (
    StatusCode::INTERNAL_SERVER_ERROR,
    Json(json!({"status_message": "boom"})),
  )
}

async fn garbage() -> &'static str {
  "certainly not json"
}

struct Harness {
  state: Arc<ServerState>,
  store: Arc<SqliteResponseStore>,
  service: DataTransferService,
}

async fn harness() -> Harness {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .try_init();

  let state = Arc::new(ServerState::default());

  let router = Router::new()
    .route("/api/v1/media", get(media_list))
    .route("/api/v1/media/search", get(media_search))
    .route("/api/v1/media/:slug/seasons/:number", get(season))
    .route("/api/v1/sections", get(sections))
    .route("/api/v1/users/signin", post(signin))
    .route("/api/v1/users/signup", post(signup))
    .route("/api/v1/users/signout", post(signout))
    .route("/api/v1/mylists/:user_id", get(my_list).patch(my_list_update))
    .route("/api/v1/broken", get(broken))
    .route("/api/v1/garbage", get(garbage))
    .with_state(Arc::clone(&state));

  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, router).await.unwrap();
  });

  let config = ApiConfig {
    scheme: "http".into(),
    host: addr.to_string(),
    cache_dir: None,
  };
  let transport = HttpTransport::new(&config).unwrap();

  Harness {
    state,
    store: Arc::new(SqliteResponseStore::in_memory().unwrap()),
    service: DataTransferService::new(transport),
  }
}

// ============================================================================
// Media: cache-first read-through
// ============================================================================

#[tokio::test]
async fn media_get_all_shows_cache_first_then_overwrites_with_network() {
  let h = harness().await;
  h.state.set_media_titles(&["One", "Two", "Three"]);
  let repo = MediaRepository::new(h.service.clone(), Arc::clone(&h.store));

  // First call: empty cache, network populates three titles.
  let (done_tx, done_rx) = oneshot::channel();
  let no_cache = Arc::new(AtomicBool::new(false));
  let no_cache_probe = Arc::clone(&no_cache);
  repo.get_all(
    MediaListRequest::default(),
    move |cached| no_cache_probe.store(cached.is_none(), Ordering::SeqCst),
    move |result| {
      let _ = done_tx.send(result.map(|envelope| envelope.data.len()));
    },
  );
  assert_eq!(done_rx.await.unwrap().unwrap(), 3);
  assert!(no_cache.load(Ordering::SeqCst));

  // Second call: cache shows the three titles before the network lands,
  // the network now returns five, and the record is overwritten.
  h.state.set_media_titles(&["One", "Two", "Three", "Four", "Five"]);
  let events = Arc::new(Mutex::new(Vec::new()));
  let (done_tx, done_rx) = oneshot::channel();

  let cached_events = Arc::clone(&events);
  let network_events = Arc::clone(&events);
  repo.get_all(
    MediaListRequest::default(),
    move |cached| {
      let count = cached.map(|envelope| envelope.data.len()).unwrap_or(0);
      cached_events.lock().unwrap().push(format!("cached:{}", count));
    },
    move |result| {
      if let Ok(envelope) = &result {
        network_events
          .lock()
          .unwrap()
          .push(format!("network:{}", envelope.data.len()));
      }
      let _ = done_tx.send(());
    },
  );
  done_rx.await.unwrap();

  assert_eq!(
    *events.lock().unwrap(),
    vec!["cached:3".to_string(), "network:5".to_string()]
  );
  assert_eq!(h.state.media_calls.load(Ordering::SeqCst), 2);

  let record = h
    .store
    .response_for::<MediaListRequest, ResponseEnvelope<Vec<Media>>>(&MediaListRequest::default())
    .unwrap()
    .unwrap();
  assert_eq!(record.response.data.len(), 5);
}

#[tokio::test]
async fn sections_singleton_record_is_cached_for_the_second_read() {
  let h = harness().await;
  let repo = SectionRepository::new(h.service.clone(), Arc::clone(&h.store));

  let (done_tx, done_rx) = oneshot::channel();
  repo.get_all(|_| {}, move |result| {
    let _ = done_tx.send(result.is_ok());
  });
  assert!(done_rx.await.unwrap());

  let (cached_tx, cached_rx) = oneshot::channel();
  let (done_tx, done_rx) = oneshot::channel();
  repo.get_all(
    move |cached| {
      let _ = cached_tx.send(cached.map(|envelope| envelope.data[0].title.clone()));
    },
    move |result| {
      let _ = done_tx.send(result.is_ok());
    },
  );
  assert_eq!(cached_rx.await.unwrap().as_deref(), Some("Trending"));
  assert!(done_rx.await.unwrap());
}

// ============================================================================
// Auth: short-circuit, invalidation, session observable
// ============================================================================

#[tokio::test]
async fn sign_in_misses_then_short_circuits_then_invalidates_on_sign_out() {
  let h = harness().await;
  let repo = Arc::new(AuthRepository::new(h.service.clone(), Arc::clone(&h.store)));
  let request = SignInRequest {
    email: "ada@reel.example".into(),
    password: "secret".into(),
  };

  // Miss: the network is hit and the record persisted.
  let unexpected_hit = Arc::new(AtomicBool::new(false));
  let hit_probe = Arc::clone(&unexpected_hit);
  let (done_tx, done_rx) = oneshot::channel();
  let task = repo.sign_in(
    request.clone(),
    move |_| hit_probe.store(true, Ordering::SeqCst),
    move |result| {
      let _ = done_tx.send(result.map(|envelope| envelope.data.user_id));
    },
  );
  assert!(task.is_some());
  assert_eq!(done_rx.await.unwrap().unwrap(), "u-1");
  assert!(!unexpected_hit.load(Ordering::SeqCst));
  assert_eq!(h.state.signin_calls.load(Ordering::SeqCst), 1);
  assert_eq!(
    repo.session().get().map(|session| session.user_id),
    Some("u-1".to_string())
  );

  // Hit: cached record short-circuits the network entirely.
  let unexpected_network = Arc::new(AtomicBool::new(false));
  let network_probe = Arc::clone(&unexpected_network);
  let (cached_tx, cached_rx) = oneshot::channel();
  let task = repo.sign_in(
    request.clone(),
    move |envelope| {
      let _ = cached_tx.send(envelope.data.email);
    },
    move |_| network_probe.store(true, Ordering::SeqCst),
  );
  assert!(task.is_none());
  assert_eq!(cached_rx.await.unwrap(), "ada@reel.example");
  assert_eq!(h.state.signin_calls.load(Ordering::SeqCst), 1);
  assert!(!unexpected_network.load(Ordering::SeqCst));

  // Sign-out deletes the record and clears the session.
  let (out_tx, out_rx) = oneshot::channel();
  let task = repo.sign_out(move |result| {
    let _ = out_tx.send(result.is_ok());
  });
  assert!(task.is_some());
  assert!(out_rx.await.unwrap());
  assert!(repo.session().get().is_none());

  // The next sign-in is forced back onto the network path.
  let (done_tx, done_rx) = oneshot::channel();
  let task = repo.sign_in(
    request,
    |_| {},
    move |result| {
      let _ = done_tx.send(result.is_ok());
    },
  );
  assert!(task.is_some());
  assert!(done_rx.await.unwrap());
  assert_eq!(h.state.signin_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn sign_up_publishes_the_session_and_seeds_the_auth_record() {
  let h = harness().await;
  let repo = Arc::new(AuthRepository::new(h.service.clone(), Arc::clone(&h.store)));

  let (done_tx, done_rx) = oneshot::channel();
  repo.sign_up(
    SignUpRequest {
      name: "Grace".into(),
      email: "grace@reel.example".into(),
      password: "secret".into(),
    },
    move |result| {
      let _ = done_tx.send(result.map(|envelope| envelope.data.user_id));
    },
  );
  assert_eq!(done_rx.await.unwrap().unwrap(), "u-2");
  assert_eq!(
    repo.session().get().map(|session| session.email),
    Some("grace@reel.example".to_string())
  );

  // The persisted record short-circuits a later sign-in for that email.
  let (cached_tx, cached_rx) = oneshot::channel();
  let task = repo.sign_in(
    SignInRequest {
      email: "grace@reel.example".into(),
      password: "secret".into(),
    },
    move |envelope| {
      let _ = cached_tx.send(envelope.data.user_id);
    },
    |_| {},
  );
  assert!(task.is_none());
  assert_eq!(cached_rx.await.unwrap(), "u-2");
  assert_eq!(h.state.signin_calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn cancelled_search_never_invokes_completion() {
  let h = harness().await;
  let repo = MediaRepository::new(h.service.clone(), Arc::clone(&h.store));

  let landed = Arc::new(AtomicBool::new(false));
  let landed_probe = Arc::clone(&landed);
  let task = repo.search("slow query", move |_| {
    landed_probe.store(true, Ordering::SeqCst);
  });

  task.cancel();
  task.cancel();
  assert!(task.is_cancelled());

  tokio::time::sleep(Duration::from_millis(500)).await;
  assert!(!landed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn a_new_search_cancels_the_previous_one() {
  let h = harness().await;
  let repo = Arc::new(MediaRepository::new(h.service.clone(), Arc::clone(&h.store)));
  let search = SearchMediaUseCase::new(Arc::clone(&repo));

  let stale = Arc::new(AtomicBool::new(false));
  let stale_probe = Arc::clone(&stale);
  let first = search.execute("first", move |_| {
    stale_probe.store(true, Ordering::SeqCst);
  });

  // Let the first request reach the server before superseding it.
  tokio::time::sleep(Duration::from_millis(50)).await;

  let (done_tx, done_rx) = oneshot::channel();
  search.execute("second", move |result| {
    let _ = done_tx.send(result.map(|envelope| envelope.data[0].title.clone()));
  });

  assert!(first.is_cancelled());
  assert_eq!(done_rx.await.unwrap().unwrap(), "second");

  tokio::time::sleep(Duration::from_millis(400)).await;
  assert!(!stale.load(Ordering::SeqCst));
}

// ============================================================================
// Seasons and my-list
// ============================================================================

#[tokio::test]
async fn season_fetch_decodes_the_envelope() {
  let h = harness().await;
  let seasons = Arc::new(SeasonRepository::new(h.service.clone()));
  let usecase = FetchSeasonUseCase::new(seasons);

  let (done_tx, done_rx) = oneshot::channel();
  usecase.execute("show-42", 1, move |result| {
    let _ = done_tx.send(result.map(|envelope| {
      (
        envelope.data.media_slug,
        envelope.data.number,
        envelope.data.episodes.len(),
      )
    }));
  });

  assert_eq!(
    done_rx.await.unwrap().unwrap(),
    ("show-42".to_string(), 1, 2)
  );
}

#[tokio::test]
async fn my_list_update_composes_the_session_and_replaces_the_record() {
  let h = harness().await;
  let auth = Arc::new(AuthRepository::new(h.service.clone(), Arc::clone(&h.store)));
  let list = Arc::new(MyListRepository::new(h.service.clone(), Arc::clone(&h.store)));
  let update = UpdateMyListUseCase::new(Arc::clone(&auth), Arc::clone(&list));
  let fetch = FetchMyListUseCase::new(Arc::clone(&auth), Arc::clone(&list));

  // No session, nothing to mutate.
  assert!(update.execute("show-42", MyListAction::Add, |_| {}).is_none());

  let (done_tx, done_rx) = oneshot::channel();
  auth.sign_in(
    SignInRequest {
      email: "ada@reel.example".into(),
      password: "secret".into(),
    },
    |_| {},
    move |result| {
      let _ = done_tx.send(result.is_ok());
    },
  );
  assert!(done_rx.await.unwrap());

  let (done_tx, done_rx) = oneshot::channel();
  let task = update.execute("show-42", MyListAction::Add, move |result| {
    let _ = done_tx.send(result.map(|envelope| envelope.data.media.len()));
  });
  assert!(task.is_some());
  assert_eq!(done_rx.await.unwrap().unwrap(), 1);

  // The mutation's response replaced the cached record.
  let record = h
    .store
    .response_for::<MyListRequest, ResponseEnvelope<MyList>>(&MyListRequest {
      user_id: "u-1".into(),
    })
    .unwrap()
    .unwrap();
  assert_eq!(record.response.data.media[0].slug, "show-42");

  // A cache-first fetch now sees it immediately.
  let (cached_tx, cached_rx) = oneshot::channel();
  let (done_tx, done_rx) = oneshot::channel();
  let task = fetch.execute(
    move |cached| {
      let _ = cached_tx.send(cached.map(|envelope| envelope.data.media.len()));
    },
    move |result| {
      let _ = done_tx.send(result.is_ok());
    },
  );
  assert!(task.is_some());
  assert_eq!(cached_rx.await.unwrap(), Some(1));
  assert!(done_rx.await.unwrap());
}

// ============================================================================
// Transport classification
// ============================================================================

#[tokio::test]
async fn transport_classifies_resolved_and_parsing_failures() {
  let h = harness().await;

  let resolved = h
    .service
    .call::<ResponseEnvelope<Vec<Media>>>(Endpoint::get("api/v1/broken"))
    .await;
  match resolved {
    Err(TransportError::Resolved { status, message }) => {
      assert_eq!(status, 500);
      assert_eq!(message, "boom");
    }
    other => panic!("expected resolved failure, got {:?}", other),
  }

  let parsing = h
    .service
    .call::<ResponseEnvelope<Vec<Media>>>(Endpoint::get("api/v1/garbage"))
    .await;
  assert!(matches!(parsing, Err(TransportError::Parsing(_))));
}

#[tokio::test]
async fn sign_in_payload_round_trips_the_session() {
  let h = harness().await;

  let envelope = h
    .service
    .call::<ResponseEnvelope<UserSession>>(
      Endpoint::post("api/v1/users/signin")
        .with_body(json!({"email": "ada@reel.example", "password": "secret"})),
    )
    .await
    .unwrap();

  assert_eq!(envelope.status, "success");
  assert_eq!(envelope.data.email, "ada@reel.example");
  assert_eq!(envelope.data.token, "tok-1");
}
