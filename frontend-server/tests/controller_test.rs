// frontend-server/tests/controller_test.rs
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use common::graphql::GraphqlEnvelope;
use common::{HandshakeMessage, IdentityAndKeyManager, STORAGE_KEY};
use frontend_server::controller::{
    AuthPageController, AuthState, BrowserHost, ControllerConfig, ControllerError, IgnoreReason,
    KeyStore, MessageEvent, MessageOutcome, MessageSource, ProviderMode, ProviderWindow,
    StatusKind, StorageError, WindowId,
};
use frontend_server::gateway_client::ClientError;
use serde_json::{json, Value};

const PROVIDER_ORIGIN: &str = "https://wallet.example";
const PAGE_ORIGIN: &str = "https://app.example";

struct FakeWindow {
    id: WindowId,
    closed: Rc<Cell<bool>>,
}

impl ProviderWindow for FakeWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn is_closed(&self) -> bool {
        self.closed.get()
    }

    fn close(&mut self) {
        self.closed.set(true);
    }
}

#[derive(Default)]
struct FakeHost {
    block_popups: bool,
    opened: Vec<(String, ProviderMode)>,
    windows: Vec<Rc<Cell<bool>>>,
    cookies: Vec<String>,
}

impl FakeHost {
    /// Closed flag of the n-th window opened
    fn window(&self, n: usize) -> Rc<Cell<bool>> {
        self.windows[n].clone()
    }
}

impl BrowserHost for FakeHost {
    type Window = FakeWindow;

    fn open_provider(&mut self, url: &str, mode: ProviderMode) -> Option<FakeWindow> {
        self.opened.push((url.to_string(), mode));
        if self.block_popups {
            return None;
        }
        let closed = Rc::new(Cell::new(false));
        self.windows.push(closed.clone());
        Some(FakeWindow {
            id: WindowId(self.windows.len() as u64),
            closed,
        })
    }

    fn set_document_cookie(&mut self, cookie: &str) {
        self.cookies.push(cookie.to_string());
    }

    fn origin(&self) -> String {
        PAGE_ORIGIN.to_string()
    }
}

struct FakeSource {
    id: Option<WindowId>,
    replies: RefCell<Vec<(Value, String)>>,
}

impl FakeSource {
    fn window(n: u64) -> Self {
        Self {
            id: Some(WindowId(n)),
            replies: RefCell::new(Vec::new()),
        }
    }
}

impl MessageSource for FakeSource {
    fn id(&self) -> Option<WindowId> {
        self.id
    }

    fn post_message(&self, message: &HandshakeMessage, target_origin: &str) {
        self.replies
            .borrow_mut()
            .push((message.to_value(), target_origin.to_string()));
    }
}

#[derive(Default)]
struct MemoryStore {
    entries: HashMap<String, String>,
    fail_writes: bool,
    writes: usize,
}

impl KeyStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError("quota exceeded".to_string()));
        }
        self.writes += 1;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError("storage unavailable".to_string()));
        }
        self.entries.remove(key);
        Ok(())
    }
}

type Controller = AuthPageController<FakeHost, MemoryStore>;

fn controller_config(mode: ProviderMode) -> ControllerConfig {
    ControllerConfig {
        provider_url: format!("{}/connect", PROVIDER_ORIGIN),
        allowed_origin: PROVIDER_ORIGIN.to_string(),
        mode,
    }
}

fn controller() -> Controller {
    AuthPageController::new(controller_config(ProviderMode::Popup), FakeHost::default(), MemoryStore::default())
}

/// Controller that has opened its first provider window
fn awaiting() -> Controller {
    let mut controller = controller();
    controller.start_auth().unwrap();
    assert_eq!(controller.state(), AuthState::AwaitingProvider);
    controller
}

fn identity_json() -> Value {
    json!({
        "hashedIdentity": "0xabc",
        "hashedSeedUpdatedAt": "2024-01-01T00:00:00Z",
        "passphraseEnhancementKey": "pek",
    })
}

fn auth_success(cookie: Option<&str>) -> Value {
    let mut message = json!({
        "type": "AUTH_SUCCESS",
        "data": { "identityAndKeyManager": identity_json() },
    });
    if let Some(cookie) = cookie {
        message["cookie"] = json!(cookie);
    }
    message
}

fn deliver(controller: &mut Controller, data: &Value, origin: &str, source: &FakeSource) -> Result<MessageOutcome, ControllerError> {
    controller.on_message(MessageEvent {
        data,
        origin,
        source: Some(source),
    })
}

#[test]
fn test_start_auth_opens_provider() {
    let mut controller = controller();
    assert!(controller.trigger_enabled());
    assert_eq!(controller.state(), AuthState::Idle);

    controller.start_auth().unwrap();

    assert_eq!(controller.state(), AuthState::AwaitingProvider);
    assert!(!controller.trigger_enabled());
    assert_eq!(
        controller.host().opened,
        vec![("https://wallet.example/connect".to_string(), ProviderMode::Popup)]
    );
    assert_eq!(controller.status().message, "Please complete authentication in the popup window...");
}

#[test]
fn test_start_auth_rejected_while_disabled() {
    let mut controller = awaiting();
    assert!(matches!(controller.start_auth(), Err(ControllerError::AuthInProgress)));
    assert_eq!(controller.host().opened.len(), 1);
}

#[test]
fn test_blocked_popup_restores_trigger() {
    let host = FakeHost {
        block_popups: true,
        ..FakeHost::default()
    };
    let mut controller = AuthPageController::new(controller_config(ProviderMode::Popup), host, MemoryStore::default());

    assert!(matches!(controller.start_auth(), Err(ControllerError::PopupBlocked)));
    assert_eq!(controller.state(), AuthState::Idle);
    assert!(controller.trigger_enabled());
    assert_eq!(controller.status().message, "Popup blocked. Please allow popups and try again.");
    assert_eq!(controller.status().kind, StatusKind::Error);
}

#[test]
fn test_valid_auth_success_persists_exact_record() {
    let mut controller = awaiting();
    let source = FakeSource::window(1);

    let outcome = deliver(&mut controller, &auth_success(None), PROVIDER_ORIGIN, &source).unwrap();

    assert_eq!(outcome, MessageOutcome::Authenticated);
    assert_eq!(controller.state(), AuthState::Authenticated);
    assert_eq!(controller.status().message, "Authentication successful!");
    assert_eq!(controller.status().kind, StatusKind::Success);

    let stored = controller.store().entries.get(STORAGE_KEY).unwrap();
    let stored: Value = serde_json::from_str(stored).unwrap();
    assert_eq!(stored, identity_json());
    assert_eq!(controller.identity().unwrap().hashed_identity, "0xabc");

    // provider window is closed after success
    assert!(controller.host().window(0).get());
    assert!(controller.host().cookies.is_empty());
}

#[test]
fn test_unknown_identity_fields_survive_storage() {
    let mut controller = awaiting();
    let source = FakeSource::window(1);
    let mut message = auth_success(None);
    message["data"]["identityAndKeyManager"]["walletVersion"] = json!(3);

    deliver(&mut controller, &message, PROVIDER_ORIGIN, &source).unwrap();

    let stored: Value = serde_json::from_str(controller.store().entries.get(STORAGE_KEY).unwrap()).unwrap();
    assert_eq!(stored["walletVersion"], json!(3));
}

#[test]
fn test_explicit_null_fields_are_persisted() {
    let mut controller = awaiting();
    let mut message = auth_success(None);
    message["data"]["identityAndKeyManager"]["backupEnhancementKey"] = Value::Null;

    deliver(&mut controller, &message, PROVIDER_ORIGIN, &FakeSource::window(1)).unwrap();

    let stored: Value = serde_json::from_str(controller.store().entries.get(STORAGE_KEY).unwrap()).unwrap();
    assert_eq!(stored, message["data"]["identityAndKeyManager"]);
    assert_eq!(stored["backupEnhancementKey"], Value::Null);
}

#[test]
fn test_auth_success_applies_cookie() {
    let mut controller = awaiting();
    let source = FakeSource::window(1);
    let cookie = "api_access_token=abc; path=/; secure";

    deliver(&mut controller, &auth_success(Some(cookie)), PROVIDER_ORIGIN, &source).unwrap();

    assert_eq!(controller.host().cookies, vec![cookie.to_string()]);
}

#[test]
fn test_malformed_identity_is_rejected() {
    let mut controller = awaiting();
    let source = FakeSource::window(1);
    let message = json!({
        "type": "AUTH_SUCCESS",
        "data": { "identityAndKeyManager": { "hashedIdentity": "0xabc" } },
    });

    let result = deliver(&mut controller, &message, PROVIDER_ORIGIN, &source);

    assert!(matches!(result, Err(ControllerError::MalformedMessage(_))));
    assert_eq!(controller.store().writes, 0);
    assert_eq!(controller.state(), AuthState::AwaitingProvider);
    assert!(controller.trigger_enabled());
    assert_eq!(controller.status().message, "Authentication failed: Invalid data format");
}

#[test]
fn test_unknown_shapes_are_ignored() {
    let mut controller = awaiting();
    let source = FakeSource::window(1);

    for data in [json!("hello"), json!({"type": "PING"}), json!({"type": "AUTH_SUCCESS"}), json!(null)] {
        let outcome = deliver(&mut controller, &data, PROVIDER_ORIGIN, &source).unwrap();
        assert_eq!(outcome, MessageOutcome::Ignored(IgnoreReason::UnknownShape));
    }
    assert_eq!(controller.state(), AuthState::AwaitingProvider);
}

#[test]
fn test_foreign_origin_is_ignored() {
    let mut controller = awaiting();
    let source = FakeSource::window(1);

    let outcome = deliver(&mut controller, &auth_success(None), "https://evil.example", &source).unwrap();

    assert_eq!(
        outcome,
        MessageOutcome::Ignored(IgnoreReason::UnauthorizedOrigin("https://evil.example".to_string()))
    );
    assert_eq!(controller.store().writes, 0);
    assert_eq!(controller.state(), AuthState::AwaitingProvider);
}

#[test]
fn test_wildcard_origin_accepts_any_sender() {
    let mut config = controller_config(ProviderMode::Popup);
    config.allowed_origin = "*".to_string();
    let mut controller = AuthPageController::new(config, FakeHost::default(), MemoryStore::default());
    controller.start_auth().unwrap();

    let outcome = deliver(&mut controller, &auth_success(None), "https://anyone.example", &FakeSource::window(1)).unwrap();
    assert_eq!(outcome, MessageOutcome::Authenticated);
}

#[test]
fn test_wrong_source_is_ignored_in_popup_mode() {
    let mut controller = awaiting();
    let stranger = FakeSource::window(99);

    let outcome = deliver(&mut controller, &auth_success(None), PROVIDER_ORIGIN, &stranger).unwrap();

    assert_eq!(outcome, MessageOutcome::Ignored(IgnoreReason::UnexpectedSource));
    assert_eq!(controller.store().writes, 0);
}

#[test]
fn test_frame_mode_skips_source_check() {
    let mut controller = AuthPageController::new(
        controller_config(ProviderMode::Frame),
        FakeHost::default(),
        MemoryStore::default(),
    );
    controller.start_auth().unwrap();
    assert_eq!(controller.host().opened[0].1, ProviderMode::Frame);

    let outcome = deliver(&mut controller, &auth_success(None), PROVIDER_ORIGIN, &FakeSource::window(42)).unwrap();
    assert_eq!(outcome, MessageOutcome::Authenticated);
}

#[test]
fn test_messages_outside_a_pending_attempt_are_ignored() {
    let mut controller = controller();

    let outcome = deliver(&mut controller, &auth_success(None), PROVIDER_ORIGIN, &FakeSource::window(1)).unwrap();

    assert_eq!(outcome, MessageOutcome::Ignored(IgnoreReason::NotAwaitingProvider));
    assert_eq!(controller.state(), AuthState::Idle);
    assert_eq!(controller.store().writes, 0);
}

#[test]
fn test_request_parent_origin_gets_a_reply() {
    let mut controller = controller();
    let source = FakeSource::window(7);
    let data = json!({"type": "REQUEST_PARENT_ORIGIN"});

    // answered from any origin, in any state
    let outcome = deliver(&mut controller, &data, "https://elsewhere.example", &source).unwrap();

    assert_eq!(outcome, MessageOutcome::RepliedWithOrigin);
    assert_eq!(
        source.replies.borrow().as_slice(),
        &[(
            json!({"type": "PROVIDE_PARENT_ORIGIN", "origin": PAGE_ORIGIN}),
            "https://elsewhere.example".to_string()
        )]
    );
    assert_eq!(controller.state(), AuthState::Idle);
}

#[test]
fn test_request_parent_origin_without_source() {
    let mut controller = controller();
    let data = json!({"type": "REQUEST_PARENT_ORIGIN"});

    let outcome = controller
        .on_message(MessageEvent {
            data: &data,
            origin: PROVIDER_ORIGIN,
            source: None,
        })
        .unwrap();

    assert_eq!(outcome, MessageOutcome::Ignored(IgnoreReason::UnexpectedSource));
}

#[test]
fn test_auth_failure_reports_provider_error() {
    let mut controller = awaiting();
    let data = json!({"type": "AUTH_FAILURE", "error": "user rejected"});

    let outcome = deliver(&mut controller, &data, PROVIDER_ORIGIN, &FakeSource::window(1)).unwrap();

    assert_eq!(outcome, MessageOutcome::Failed);
    assert_eq!(controller.state(), AuthState::Failed);
    assert!(controller.trigger_enabled());
    assert_eq!(controller.status().message, "Authentication failed: user rejected");
    assert!(controller.host().window(0).get());
}

#[test]
fn test_storage_failure_fails_the_attempt() {
    let store = MemoryStore {
        fail_writes: true,
        ..MemoryStore::default()
    };
    let mut controller = AuthPageController::new(controller_config(ProviderMode::Popup), FakeHost::default(), store);
    controller.start_auth().unwrap();

    let result = deliver(&mut controller, &auth_success(Some("api_access_token=abc")), PROVIDER_ORIGIN, &FakeSource::window(1));

    assert!(matches!(result, Err(ControllerError::Storage(_))));
    assert_eq!(controller.state(), AuthState::Failed);
    assert!(controller.trigger_enabled());
    assert!(controller.identity().is_none());
    assert!(controller.host().cookies.is_empty());
    assert_eq!(controller.status().message, "Authentication failed: Could not save data");
}

#[test]
fn test_closed_provider_cancels_attempt() {
    let mut controller = awaiting();
    assert!(!controller.poll_provider());

    controller.host().window(0).set(true);
    assert!(controller.poll_provider());

    assert_eq!(controller.state(), AuthState::Idle);
    assert!(controller.trigger_enabled());
    assert_eq!(controller.status().message, "Authentication cancelled");

    // poller is done once the window is gone
    assert!(!controller.poll_provider());
}

#[test]
fn test_late_message_after_cancel_is_ignored() {
    let mut controller = awaiting();
    controller.host().window(0).set(true);
    controller.poll_provider();

    let outcome = deliver(&mut controller, &auth_success(None), PROVIDER_ORIGIN, &FakeSource::window(1)).unwrap();
    assert_eq!(outcome, MessageOutcome::Ignored(IgnoreReason::NotAwaitingProvider));
}

#[test]
fn test_restart_closes_previous_window() {
    let mut controller = awaiting();
    controller.host().window(0).set(true);
    controller.poll_provider();

    controller.start_auth().unwrap();
    assert_eq!(controller.host().opened.len(), 2);

    // only the new window may speak
    let old = deliver(&mut controller, &auth_success(None), PROVIDER_ORIGIN, &FakeSource::window(1)).unwrap();
    assert_eq!(old, MessageOutcome::Ignored(IgnoreReason::UnexpectedSource));
    let new = deliver(&mut controller, &auth_success(None), PROVIDER_ORIGIN, &FakeSource::window(2)).unwrap();
    assert_eq!(new, MessageOutcome::Authenticated);
}

#[test]
fn test_load_resumes_from_storage() {
    let mut store = MemoryStore::default();
    store.entries.insert(STORAGE_KEY.to_string(), identity_json().to_string());

    let controller = AuthPageController::load(controller_config(ProviderMode::Popup), FakeHost::default(), store);

    assert_eq!(controller.state(), AuthState::Authenticated);
    assert_eq!(controller.identity(), Some(&IdentityAndKeyManager::from_value(&identity_json()).unwrap()));
    assert_eq!(controller.status().message, "Loaded existing authentication data");
    assert!(controller.trigger_enabled());
}

#[test]
fn test_load_ignores_malformed_storage() {
    let mut store = MemoryStore::default();
    store.entries.insert(STORAGE_KEY.to_string(), "{not json".to_string());

    let controller = AuthPageController::load(controller_config(ProviderMode::Popup), FakeHost::default(), store);

    assert_eq!(controller.state(), AuthState::Idle);
    assert!(controller.identity().is_none());
    assert_eq!(controller.status().message, "Click the button below to start authentication");
}

#[test]
fn test_clear_forgets_identity() {
    let mut controller = awaiting();
    deliver(&mut controller, &auth_success(None), PROVIDER_ORIGIN, &FakeSource::window(1)).unwrap();

    controller.clear().unwrap();

    assert_eq!(controller.state(), AuthState::Idle);
    assert!(controller.identity().is_none());
    assert!(controller.trigger_enabled());
    assert!(!controller.store().entries.contains_key(STORAGE_KEY));
    assert_eq!(controller.status().message, "Cleared stored authentication data");
}

#[test]
fn test_decode_result_is_shown() {
    let mut controller = awaiting();
    deliver(&mut controller, &auth_success(None), PROVIDER_ORIGIN, &FakeSource::window(1)).unwrap();

    let ticket = controller.begin_decode();
    assert_eq!(controller.status().message, "Decoding JWT...");
    assert!(controller.finish_decode(ticket, Ok(json!({"accountId": "acct-1"}))));

    assert_eq!(controller.last_response(), Some(&json!({"accountId": "acct-1"})));
    assert_eq!(controller.status().message, "JWT decoded successfully!");
}

#[test]
fn test_decode_failure_is_reported() {
    let mut controller = controller();

    let ticket = controller.begin_decode();
    let failure = ClientError::Status {
        endpoint: "/decode",
        status: 401,
    };
    assert!(controller.finish_decode(ticket, Err(failure)));

    assert_eq!(controller.status().message, "JWT decode failed: /decode request failed: 401");
    assert_eq!(controller.status().kind, StatusKind::Error);
    assert!(controller.last_response().is_none());
}

#[test]
fn test_stale_results_are_discarded() {
    let mut controller = awaiting();
    deliver(&mut controller, &auth_success(None), PROVIDER_ORIGIN, &FakeSource::window(1)).unwrap();

    let decode = controller.begin_decode();
    let query = controller.begin_query();
    controller.clear().unwrap();

    assert!(!controller.finish_decode(decode, Ok(json!({"accountId": "acct-1"}))));
    let envelope = GraphqlEnvelope {
        status: 200,
        status_text: "OK".to_string(),
        data: json!({"data": {}}),
        headers: Default::default(),
    };
    assert!(!controller.finish_query(query, Ok(envelope)));

    assert!(controller.last_response().is_none());
    assert_eq!(controller.status().message, "Cleared stored authentication data");
}

#[test]
fn test_query_result_is_shown() {
    let mut controller = controller();
    let ticket = controller.begin_query();
    let envelope = GraphqlEnvelope {
        status: 200,
        status_text: "OK".to_string(),
        data: json!({"data": {"me": {"id": "1"}}}),
        headers: Default::default(),
    };

    assert!(controller.finish_query(ticket, Ok(envelope)));

    assert_eq!(controller.last_response().unwrap()["statusText"], json!("OK"));
    assert_eq!(controller.last_response().unwrap()["data"]["data"]["me"]["id"], json!("1"));
}
