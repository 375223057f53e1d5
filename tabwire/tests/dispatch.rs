use std::{
    collections::VecDeque,
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use tabwire::{
    Client, ClientConfig, Codec, Command, DataColumn, DataRow, DataSet, DataTable, DecodePolicy,
    ErrorKind, ParamBinding, PoolConfig, ServiceRequest, ServiceResponse, Status, UserInfo,
    ValueKind,
    crypto::{Cipher, CryptoError},
    envelope::LoginRequest,
    transport::{HttpRequest, HttpResponse, Transport},
};

enum Outcome {
    Fail,
    Hang,
    Respond(HttpResponse),
}

#[derive(Default)]
struct Mock {
    script: Mutex<VecDeque<Outcome>>,
    seen: Mutex<Vec<HttpRequest>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Mock {
    fn script(outcomes: impl IntoIterator<Item = Outcome>) -> Arc<Mock> {
        Arc::new(Mock {
            script: Mutex::new(outcomes.into_iter().collect()),
            ..Default::default()
        })
    }

    fn seen(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }

    fn push(&self, outcome: Outcome) {
        self.script.lock().unwrap().push_back(outcome);
    }
}

impl Transport for Mock {
    async fn send(&self, request: HttpRequest) -> io::Result<HttpResponse> {
        self.seen.lock().unwrap().push(request);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Outcome::Fail) => Err(io::Error::from(io::ErrorKind::ConnectionReset)),
            Some(Outcome::Hang) => std::future::pending().await,
            Some(Outcome::Respond(response)) => Ok(response),
            None => Ok(ok_response()),
        }
    }
}

/// Reversible cipher which keeps its inputs visible.
struct TagCipher;

impl Cipher for TagCipher {
    fn encrypt(&self, plaintext: &str, key: &str, context: &str) -> Result<String, CryptoError> {
        Ok(format!("{context}|{key}|{plaintext}"))
    }

    fn decrypt(&self, ciphertext: &str, key: &str, context: &str) -> Result<String, CryptoError> {
        ciphertext
            .strip_prefix(&format!("{context}|{key}|"))
            .map(str::to_owned)
            .ok_or_else(|| CryptoError::custom("wrong key"))
    }
}

fn result_set() -> DataSet {
    let mut users = DataTable::new("users")
        .with_column(DataColumn::new("id", "System.Int32")).unwrap()
        .with_column(DataColumn::new("name", "System.String")).unwrap();
    users.push_row(DataRow::new().with("id", 1i32).with("name", "foo")).unwrap();

    DataSet::new("result").with_table(users).unwrap()
}

fn ok_response() -> HttpResponse {
    HttpResponse::new(200, Codec::default().encode(&ServiceResponse::ok(Some(result_set()))))
}

fn config() -> ClientConfig {
    ClientConfig::default()
        .project_token("project")
        .crypto_context("ctx")
        .timeout(Duration::from_secs(5))
}

fn client(mock: &Arc<Mock>, config: ClientConfig) -> (Client<Arc<Mock>, TagCipher>, Arc<AtomicUsize>) {
    let connects = Arc::new(AtomicUsize::new(0));
    let counter = connects.clone();
    let mock = mock.clone();
    let client = Client::with_connector(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, io::Error>(mock.clone())
        },
        TagCipher,
        config,
    );
    (client, connects)
}

fn select() -> ServiceRequest {
    ServiceRequest::new("UserService")
        .token("user-token")
        .command("users", Command::new("main", "select id, name from users"))
}

#[tokio::test]
async fn execute_decodes_dataset() {
    let mock = Arc::new(Mock::default());
    let (client, _) = client(&mock, config());

    let data = client.execute(&select()).await.unwrap();
    assert_eq!(data, Some(result_set()));

    let seen = mock.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path, "api/Service");
    assert_eq!(seen[0].header_value("token"), Some("user-token"));

    let sent = Codec::new(DecodePolicy::Strict).decode::<ServiceRequest>(&seen[0].body).unwrap();
    assert_eq!(sent, select());
}

#[tokio::test]
async fn three_failures_then_success() {
    let mock = Mock::script([Outcome::Fail, Outcome::Fail, Outcome::Fail]);
    let (client, connects) = client(&mock, config());

    client.execute(&select()).await.unwrap();
    assert_eq!(mock.seen().len(), 4);
    // each failed handle is discarded
    assert_eq!(connects.load(Ordering::SeqCst), 4);

    // the attempt counter belongs to one call only
    for _ in 0..3 {
        mock.push(Outcome::Fail);
    }
    client.execute(&select()).await.unwrap();
    assert_eq!(mock.seen().len(), 8);
}

#[tokio::test]
async fn four_failures_are_fatal() {
    let mock = Mock::script([Outcome::Fail, Outcome::Fail, Outcome::Fail, Outcome::Fail]);
    let (client, _) = client(&mock, config());

    let err = client.execute(&select()).await.unwrap_err();
    let ErrorKind::Exhausted(exhausted) = err.kind() else {
        panic!("expected exhausted, found {err}");
    };
    assert_eq!(exhausted.attempts(), 4);
    assert!(matches!(exhausted.last_error().kind(), ErrorKind::Transport(_)));
    assert_eq!(mock.seen().len(), 4);
}

#[tokio::test]
async fn timeout_and_bad_status_are_retried() {
    let mock = Mock::script([Outcome::Hang, Outcome::Respond(HttpResponse::new(503, "busy"))]);
    let (client, _) = client(&mock, config().timeout(Duration::from_millis(50)));

    client.execute(&select()).await.unwrap();
    assert_eq!(mock.seen().len(), 3);
}

#[tokio::test]
async fn dangling_chain_fails_before_network() {
    let mock = Arc::new(Mock::default());
    let (client, connects) = client(&mock, config());

    let request = ServiceRequest::new("UserService").command(
        "insert",
        Command::procedure("main", "usp_insert_user")
            .param("id", ParamBinding::new(ValueKind::Int32).chain_to("detail", "user_id")),
    );

    let err = client.execute(&request).await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Config(_)), "{err}");
    assert!(mock.seen().is_empty());
    assert_eq!(connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn protocol_and_service_errors_are_not_retried() {
    let mock = Mock::script([Outcome::Respond(HttpResponse::new(200, "{\"st\":"))]);
    let (client, _) = client(&mock, config());

    let err = client.execute(&select()).await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Protocol(_)), "{err}");
    assert_eq!(mock.seen().len(), 1);

    let failed = ServiceResponse { status: Status::Error, message: Some("deadlock".into()), data: None };
    mock.push(Outcome::Respond(HttpResponse::new(200, Codec::default().encode(&failed))));

    let err = client.execute(&select()).await.unwrap_err();
    let ErrorKind::Service(e) = err.kind() else {
        panic!("expected service error, found {err}");
    };
    assert_eq!(e.message(), "deadlock");
    assert_eq!(mock.seen().len(), 2);
}

#[tokio::test]
async fn empty_status_has_no_data() {
    let empty = ServiceResponse { status: Status::Empty, ..Default::default() };
    let mock = Mock::script([Outcome::Respond(HttpResponse::new(200, Codec::default().encode(&empty)))]);
    let (client, _) = client(&mock, config());

    assert_eq!(client.execute(&select()).await.unwrap(), None);
}

#[tokio::test]
async fn login_chains_credential() {
    let info = UserInfo {
        status: Status::Ok,
        message: None,
        token: Some("user-token".into()),
        data: None,
    };
    let body = Codec::default().encode(&info);
    let mock = Mock::script([
        Outcome::Respond(HttpResponse::new(200, body.clone())),
        Outcome::Respond(HttpResponse::new(200, body)),
    ]);
    let (client, connects) = client(&mock, config());

    assert_eq!(client.login("a@example.com", "secret").await.unwrap(), info);
    client.login("b@example.com", "secret").await.unwrap();

    let seen = mock.seen();
    assert_eq!(seen[0].path, "api/Login");
    assert_eq!(seen[0].header_value("token"), Some("project"));

    let codec = Codec::default();
    let a = codec.decode::<LoginRequest>(&seen[0].body).unwrap();
    let b = codec.decode::<LoginRequest>(&seen[1].body).unwrap();

    assert_eq!(a.email, "ctx|project|a@example.com");
    assert_eq!(a.password, format!("ctx|{}|{}", a.email, TagCipher.hash("secret").unwrap()));
    assert_ne!(a.password, b.password);

    // handle used by a successful login is not reused
    assert_eq!(connects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rejected_login_is_auth_error() {
    let mock = Mock::script([Outcome::Respond(HttpResponse::new(401, ""))]);
    let (client, _) = client(&mock, config());

    let err = client.login("a@example.com", "wrong").await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Auth(_)), "{err}");
    assert_eq!(mock.seen().len(), 1);

    let denied = UserInfo { status: Status::Error, message: Some("bad password".into()), ..Default::default() };
    mock.push(Outcome::Respond(HttpResponse::new(200, Codec::default().encode(&denied))));

    let err = client.login("a@example.com", "wrong").await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Auth(_)), "{err}");
}

#[tokio::test]
async fn access_code_round_trip() {
    let mock = Mock::script([
        Outcome::Respond(HttpResponse::new(200, "JOIN|project|123456")),
        Outcome::Respond(HttpResponse::new(200, "RESET|other|654321\n")),
    ]);
    let (client, _) = client(&mock, config());

    assert_eq!(client.join_access_code("a@example.com").await.unwrap(), "123456");
    assert_eq!(client.access_code("other", "a@example.com", "RESET").await.unwrap(), "654321");

    let seen = mock.seen();
    assert_eq!(seen[0].path, "api/AccessCode");
    assert_eq!(seen[0].query_value("email"), Some("JOIN|project|a@example.com"));
    assert_eq!(seen[0].header_value("accessGroup"), Some("JOIN"));
    assert_eq!(seen[1].header_value("token"), Some("other"));
    assert_eq!(seen[1].header_value("accessGroup"), Some("RESET"));
}

#[tokio::test]
async fn single_handle_serializes_calls() {
    let mock = Arc::new(Mock {
        delay: Some(Duration::from_millis(10)),
        ..Default::default()
    });
    let (client, connects) = client(&mock, config().pool(PoolConfig::default().max_count(1)));

    let calls = (0..4).map(|_| {
        let client = client.clone();
        tokio::spawn(async move { client.execute(&select()).await.map(|_| ()) })
    });
    for call in calls.collect::<Vec<_>>() {
        call.await.unwrap().unwrap();
    }

    assert_eq!(mock.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancelled_calls_release_their_handle() {
    let mock = Mock::script([Outcome::Hang]);
    let (client, connects) = client(&mock, config().pool(PoolConfig::default().max_count(1)));

    // holds the only handle on a stalled send
    let stalled = tokio::spawn({
        let client = client.clone();
        async move { client.execute(&select()).await.map(|_| ()) }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    // waits in the acquire queue, then gives up
    let queued = tokio::time::timeout(Duration::from_millis(30), client.execute(&select())).await;
    assert!(queued.is_err());

    stalled.abort();
    assert!(stalled.await.unwrap_err().is_cancelled());

    let data = tokio::time::timeout(Duration::from_secs(1), client.execute(&select())).await;
    assert_eq!(data.unwrap().unwrap(), Some(result_set()));

    assert_eq!(connects.load(Ordering::SeqCst), 1);
    assert_eq!(mock.seen().len(), 2);
}
