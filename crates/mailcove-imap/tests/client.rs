//! End-to-end client tests against a scripted mock server.
//!
//! The mock releases each canned response only once the client has
//! written the expected bytes, so continuation handshakes, IDLE
//! preemption and multi-command flows run exactly as they would against
//! a real server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mailcove_imap::{
    AuthConfig, CollectingHandler, Config, Error, EventHandler, ExistsEvent, FetchOptions,
    FetchQuery, ImapClient, ImapStream, MailboxEvent, ProtocolState, SequenceSet, Session,
    StoreItems, StoreOperation, StoreOptions,
};

/// One step of the server script.
enum Step {
    /// Bytes the mock serves to the client.
    Read(Vec<u8>),
    /// Hold further reads until the client has written this substring.
    ExpectWrite(String),
}

struct ScriptInner {
    steps: VecDeque<Step>,
    sent: Vec<u8>,
    waker: Option<Waker>,
}

/// Shared handle to inspect the script from the test body.
#[derive(Clone)]
struct ScriptHandle(Arc<Mutex<ScriptInner>>);

impl ScriptHandle {
    fn new(steps: Vec<Step>) -> (Self, ScriptedStream) {
        let inner = Arc::new(Mutex::new(ScriptInner {
            steps: steps.into(),
            sent: Vec::new(),
            waker: None,
        }));
        (Self(Arc::clone(&inner)), ScriptedStream(inner))
    }

    fn sent(&self) -> Vec<u8> {
        self.0.lock().unwrap().sent.clone()
    }

    fn sent_contains(&self, needle: &str) -> bool {
        contains(&self.sent(), needle)
    }

    async fn wait_for_write(&self, needle: &str) {
        for _ in 0..200 {
            if self.sent_contains(needle) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("client never wrote {needle:?}");
    }
}

/// The stream half handed to the client.
struct ScriptedStream(Arc<Mutex<ScriptInner>>);

fn contains(haystack: &[u8], needle: &str) -> bool {
    let needle = needle.as_bytes();
    !needle.is_empty()
        && haystack
            .windows(needle.len())
            .any(|window| window == needle)
}

impl AsyncRead for ScriptedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut inner = self.0.lock().unwrap();

        loop {
            let gated = match inner.steps.front() {
                Some(Step::ExpectWrite(pattern)) => Some(pattern.clone()),
                _ => None,
            };

            if let Some(pattern) = gated {
                if contains(&inner.sent, &pattern) {
                    inner.steps.pop_front();
                    continue;
                }
                inner.waker = Some(cx.waker().clone());
                return Poll::Pending;
            }

            match inner.steps.front_mut() {
                // Script exhausted: EOF
                None => return Poll::Ready(Ok(())),
                Some(Step::Read(data)) => {
                    let n = data.len().min(buf.remaining());
                    buf.put_slice(&data[..n]);
                    if n == data.len() {
                        inner.steps.pop_front();
                    } else {
                        data.drain(..n);
                    }
                    return Poll::Ready(Ok(()));
                }
                Some(Step::ExpectWrite(_)) => unreachable!(),
            }
        }
    }
}

impl AsyncWrite for ScriptedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut inner = self.0.lock().unwrap();
        inner.sent.extend_from_slice(buf);
        if let Some(waker) = inner.waker.take() {
            waker.wake();
        }
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn read(data: &str) -> Step {
    Step::Read(data.as_bytes().to_vec())
}

fn after(pattern: &str) -> Step {
    Step::ExpectWrite(pattern.to_string())
}

async fn client_with(steps: Vec<Step>) -> (ScriptHandle, ImapClient) {
    let (handle, stream) = ScriptHandle::new(steps);
    let config = Config::new("imap.test.example");
    let client = ImapClient::from_stream(config, ImapStream::plain(Box::new(stream)))
        .await
        .expect("greeting");
    (handle, client)
}

/// Steps for a PREAUTH greeting plus LIST/LSUB/SELECT of INBOX.
fn select_inbox_steps(capabilities: &str, exists: u32, uidvalidity: u64) -> Vec<Step> {
    vec![
        read(&format!(
            "* PREAUTH [CAPABILITY {capabilities}] Logged in\r\n"
        )),
        after("C1 LIST"),
        read("* LIST (\\HasNoChildren) \"/\" \"INBOX\"\r\nC1 OK LIST completed\r\n"),
        after("C2 LSUB"),
        read("* LSUB () \"/\" \"INBOX\"\r\nC2 OK LSUB completed\r\n"),
        after("C3 SELECT INBOX"),
        read(&format!(
            "* {exists} EXISTS\r\n* 0 RECENT\r\n* FLAGS (\\Seen \\Flagged \\Deleted)\r\n* OK [PERMANENTFLAGS (\\Seen \\Flagged \\Deleted \\*)] Flags permitted\r\n* OK [UIDVALIDITY {uidvalidity}] UIDs valid\r\n* OK [UIDNEXT 200] Predicted next UID\r\nC3 OK [READ-WRITE] SELECT completed\r\n"
        )),
    ]
}

/// A handler that shares collected events with the test body.
#[derive(Clone, Default)]
struct SharedHandler(Arc<Mutex<CollectingHandler>>);

impl EventHandler for SharedHandler {
    fn on_exists(&mut self, event: &ExistsEvent) {
        self.0.lock().unwrap().on_exists(event);
    }

    fn on_expunge(&mut self, event: &mailcove_imap::ExpungeEvent) {
        self.0.lock().unwrap().on_expunge(event);
    }

    fn on_flags(&mut self, event: &mailcove_imap::FlagsEvent) {
        self.0.lock().unwrap().on_flags(event);
    }
}

#[tokio::test]
async fn greeting_without_preauth_stays_unauthenticated() {
    let (_handle, client) = client_with(vec![read(
        "* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] Server ready\r\n",
    )])
    .await;

    assert_eq!(client.state(), ProtocolState::NotAuthenticated);
    assert!(client.supports_auth("PLAIN"));
}

#[tokio::test]
async fn login_updates_state_and_capabilities() {
    let (handle, mut client) = client_with(vec![
        read("* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] ready\r\n"),
        after("C1 LOGIN user \"pass word\""),
        read("C1 OK [CAPABILITY IMAP4rev1 IDLE MOVE] Logged in\r\n"),
    ])
    .await;

    client.login("user", "pass word").await.expect("login");

    assert_eq!(client.state(), ProtocolState::Authenticated);
    assert!(client.has_capability(&mailcove_imap::Capability::Move));
    assert!(handle.sent_contains("C1 LOGIN"));
}

#[tokio::test]
async fn login_when_authenticated_raises_wrong_state() {
    let (_handle, mut client) =
        client_with(vec![read("* PREAUTH [CAPABILITY IMAP4rev1] hi\r\n")]).await;

    let err = client.login("user", "pass").await.unwrap_err();
    assert!(matches!(err, Error::WrongState(_)));
}

#[tokio::test]
async fn authenticate_plain_uses_sasl_ir() {
    let (handle, mut client) = client_with(vec![
        read("* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN SASL-IR] ready\r\n"),
        after("C1 AUTHENTICATE PLAIN AHVzZXIAaHVudGVyMg=="),
        read("C1 OK [CAPABILITY IMAP4rev1] Logged in\r\n"),
    ])
    .await;

    let auth = AuthConfig::password("user", "hunter2");
    let identity = client.authenticate(&auth).await.expect("authenticate");

    assert_eq!(identity, "user");
    assert_eq!(client.state(), ProtocolState::Authenticated);
    // The initial response rides on the command line
    assert!(handle.sent_contains("AUTHENTICATE PLAIN AHVzZXIAaHVudGVyMg=="));
}

#[tokio::test]
async fn authenticate_login_answers_both_prompts() {
    let (handle, mut client) = client_with(vec![
        read("* OK [CAPABILITY IMAP4rev1 AUTH=LOGIN] ready\r\n"),
        after("C1 AUTHENTICATE LOGIN"),
        read("+ VXNlcm5hbWU6\r\n"),
        // base64("user")
        after("dXNlcg=="),
        read("+ UGFzc3dvcmQ6\r\n"),
        // base64("hunter2")
        after("aHVudGVyMg=="),
        read("C1 OK Logged in\r\n"),
    ])
    .await;

    let auth = AuthConfig::password("user", "hunter2");
    client.authenticate(&auth).await.expect("authenticate");

    assert!(handle.sent_contains("dXNlcg=="));
    assert!(handle.sent_contains("aHVudGVyMg=="));
}

#[tokio::test]
async fn authenticate_xoauth2_surfaces_oauth_error() {
    // base64 of {"status":"401","schemes":"bearer"}
    let error_blob = "eyJzdGF0dXMiOiI0MDEiLCJzY2hlbWVzIjoiYmVhcmVyIn0=";
    let (_handle, mut client) = client_with(vec![
        read("* OK [CAPABILITY IMAP4rev1 AUTH=XOAUTH2 SASL-IR] ready\r\n"),
        after("C1 AUTHENTICATE XOAUTH2"),
        read(&format!("+ {error_blob}\r\n")),
        after("\r\n"),
        read("C1 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n"),
    ])
    .await;

    let auth = AuthConfig::access_token("user@example.com", "expired-token");
    let err = client.authenticate(&auth).await.unwrap_err();

    match err {
        Error::AuthenticationFailed { oauth_error, .. } => {
            let oauth = oauth_error.expect("oauth error payload");
            assert_eq!(oauth.status, "401");
        }
        other => panic!("expected AuthenticationFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn authenticate_without_usable_mechanism_fails() {
    let (_handle, mut client) = client_with(vec![read(
        "* OK [CAPABILITY IMAP4rev1 LOGINDISABLED] ready\r\n",
    )])
    .await;

    let auth = AuthConfig::password("user", "pass");
    let err = client.authenticate(&auth).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedAuthMechanism));
}

#[tokio::test]
async fn enable_filters_and_records_extensions() {
    let (handle, mut client) = client_with(vec![
        read("* PREAUTH [CAPABILITY IMAP4rev1 ENABLE CONDSTORE QRESYNC] hi\r\n"),
        after("C1 ENABLE QRESYNC CONDSTORE"),
        read("* ENABLED QRESYNC CONDSTORE\r\nC1 OK Enabled\r\n"),
    ])
    .await;

    let enabled = client
        .enable(&["QRESYNC", "CONDSTORE", "UTF8=ACCEPT"])
        .await
        .expect("enable");

    // UTF8=ACCEPT was not advertised and must not reach the wire
    assert!(!handle.sent_contains("UTF8=ACCEPT"));
    assert_eq!(enabled, vec!["QRESYNC", "CONDSTORE"]);
    assert!(client.qresync_enabled());
}

#[tokio::test]
async fn select_populates_the_mailbox_cache() {
    let (_handle, mut client) =
        client_with(select_inbox_steps("IMAP4rev1", 3, 1)).await;

    let mailbox = client
        .mailbox_open("INBOX", &Default::default())
        .await
        .expect("select");

    assert_eq!(mailbox.path, "INBOX");
    assert_eq!(mailbox.exists, 3);
    assert_eq!(mailbox.uid_validity.map(|v| v.get()), Some(1));
    assert_eq!(mailbox.uid_next.map(|u| u.get()), Some(200));
    assert!(mailbox.permanent_flags.allows_any());
    assert!(!mailbox.read_only);
    assert_eq!(client.state(), ProtocolState::Selected);
}

#[tokio::test]
async fn select_and_fetch_flags() {
    // Scenario: EXISTS=3, then FETCH 1:3 (UID FLAGS)
    let mut steps = select_inbox_steps("IMAP4rev1", 3, 1);
    steps.push(after("C4 FETCH 1:3 (UID FLAGS)"));
    steps.push(read(
        "* 1 FETCH (UID 100 FLAGS (\\Seen))\r\n* 2 FETCH (UID 101 FLAGS ())\r\n* 3 FETCH (UID 102 FLAGS (\\Flagged))\r\nC4 OK FETCH completed\r\n",
    ));

    let (_handle, mut client) = client_with(steps).await;
    client
        .mailbox_open("INBOX", &Default::default())
        .await
        .expect("select");

    let range = SequenceSet::range(1, 3).unwrap();
    let messages = client
        .fetch(&range, &FetchQuery::uid_flags(), &FetchOptions::default())
        .await
        .expect("fetch");

    assert_eq!(messages.len(), 3);
    let uids: Vec<u32> = messages.iter().filter_map(|m| m.uid.map(|u| u.get())).collect();
    assert_eq!(uids, vec![100, 101, 102]);
    assert!(messages[0].flags().unwrap().is_seen());
    assert!(messages[1].flags().unwrap().is_empty());
    assert!(messages[2].flags().unwrap().is_flagged());
}

#[tokio::test]
async fn fetch_before_select_is_rejected() {
    let (_handle, mut client) =
        client_with(vec![read("* PREAUTH [CAPABILITY IMAP4rev1] hi\r\n")]).await;

    let range = SequenceSet::range(1, 3).unwrap();
    let err = client
        .fetch(&range, &FetchQuery::uid_flags(), &FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::WrongState(_)));
}

#[tokio::test(start_paused = true)]
async fn fetch_retries_after_throttle() {
    let mut steps = select_inbox_steps("IMAP4rev1", 3, 1);
    steps.push(after("C4 FETCH"));
    steps.push(read("C4 NO [THROTTLED] Slow down\r\n"));
    steps.push(after("C5 FETCH"));
    steps.push(read(
        "* 1 FETCH (UID 100 FLAGS ())\r\nC5 OK FETCH completed\r\n",
    ));

    let (_handle, mut client) = client_with(steps).await;
    client
        .mailbox_open("INBOX", &Default::default())
        .await
        .expect("select");

    let range = SequenceSet::single(1).unwrap();
    let messages = client
        .fetch(&range, &FetchQuery::uid_flags(), &FetchOptions::default())
        .await
        .expect("fetch after retry");
    assert_eq!(messages.len(), 1);
}

#[tokio::test]
async fn copy_returns_the_uid_map() {
    // Scenario: COPY 1:3 Archive with COPYUID 12345 1:3 100:102
    let mut steps = select_inbox_steps("IMAP4rev1", 3, 1);
    steps.push(after("C4 COPY 1:3 Archive"));
    steps.push(read("C4 OK [COPYUID 12345 1:3 100:102] Done\r\n"));

    let (_handle, mut client) = client_with(steps).await;
    client
        .mailbox_open("INBOX", &Default::default())
        .await
        .expect("select");

    let range = SequenceSet::range(1, 3).unwrap();
    let result = client.copy(&range, "Archive", false).await.expect("copy");

    assert_eq!(result.uid_validity.map(|v| v.get()), Some(12_345));
    let map = result.uid_map.expect("uid map");
    assert_eq!(map.len(), 3);
    assert_eq!(map.get(&1), Some(&100));
    assert_eq!(map.get(&2), Some(&101));
    assert_eq!(map.get(&3), Some(&102));
}

#[tokio::test]
async fn move_falls_back_to_copy_store() {
    // Scenario: no MOVE capability; COPY then STORE +FLAGS.SILENT \Deleted
    let mut steps = select_inbox_steps("IMAP4rev1", 3, 1);
    steps.push(after("C4 COPY 1:3 Archive"));
    steps.push(read("C4 OK [COPYUID 12345 1:3 100:102] Done\r\n"));
    steps.push(after("C5 STORE 1:3 +FLAGS.SILENT (\\Deleted)"));
    steps.push(read("C5 OK STORE completed\r\n"));

    let (handle, mut client) = client_with(steps).await;
    client
        .mailbox_open("INBOX", &Default::default())
        .await
        .expect("select");

    let range = SequenceSet::range(1, 3).unwrap();
    let result = client.r#move(&range, "Archive", false).await.expect("move");

    assert!(handle.sent_contains("C4 COPY 1:3 Archive"));
    assert!(handle.sent_contains("C5 STORE 1:3 +FLAGS.SILENT (\\Deleted)"));
    // The returned object carries the COPYUID map from the COPY step
    assert_eq!(result.uid_map.map(|m| m.len()), Some(3));
}

#[tokio::test]
async fn move_uses_move_when_advertised() {
    let mut steps = select_inbox_steps("IMAP4rev1 MOVE", 3, 1);
    steps.push(after("C4 MOVE 1:3 Archive"));
    steps.push(read(
        "* OK [COPYUID 12345 1:3 100:102] Moved\r\n* 3 EXPUNGE\r\n* 2 EXPUNGE\r\n* 1 EXPUNGE\r\nC4 OK MOVE completed\r\n",
    ));

    let (handle, mut client) = client_with(steps).await;
    client
        .mailbox_open("INBOX", &Default::default())
        .await
        .expect("select");

    let range = SequenceSet::range(1, 3).unwrap();
    let result = client.r#move(&range, "Archive", false).await.expect("move");

    assert!(!handle.sent_contains("COPY 1:3"));
    // COPYUID arrived on an untagged OK
    assert_eq!(result.uid_map.map(|m| m.len()), Some(3));
}

#[tokio::test]
async fn store_add_with_no_permitted_flags_skips_the_wire() {
    // PERMANENTFLAGS without \* and without $Custom
    let steps = vec![
        read("* PREAUTH [CAPABILITY IMAP4rev1] hi\r\n"),
        after("C1 LIST"),
        read("* LIST () \"/\" \"INBOX\"\r\nC1 OK done\r\n"),
        after("C2 LSUB"),
        read("C2 OK done\r\n"),
        after("C3 SELECT INBOX"),
        read(
            "* 3 EXISTS\r\n* FLAGS (\\Seen)\r\n* OK [PERMANENTFLAGS (\\Seen)] ok\r\nC3 OK [READ-WRITE] done\r\n",
        ),
    ];

    let (handle, mut client) = client_with(steps).await;
    client
        .mailbox_open("INBOX", &Default::default())
        .await
        .expect("select");

    let range = SequenceSet::single(1).unwrap();
    let stored = client
        .store(
            &range,
            StoreOperation::Add,
            StoreItems::Flags(vec![mailcove_imap::Flag::Keyword("$Custom".to_string())]),
            &StoreOptions::default(),
        )
        .await
        .expect("store");

    assert!(!stored);
    assert!(!handle.sent_contains("STORE"));
}

#[tokio::test]
async fn store_set_with_empty_flags_still_runs() {
    let mut steps = select_inbox_steps("IMAP4rev1", 3, 1);
    steps.push(after("C4 STORE 1 FLAGS ()"));
    steps.push(read("C4 OK STORE completed\r\n"));

    let (handle, mut client) = client_with(steps).await;
    client
        .mailbox_open("INBOX", &Default::default())
        .await
        .expect("select");

    let range = SequenceSet::single(1).unwrap();
    let stored = client
        .store(
            &range,
            StoreOperation::Set,
            StoreItems::Flags(Vec::new()),
            &StoreOptions::default(),
        )
        .await
        .expect("store");

    assert!(stored);
    assert!(handle.sent_contains("C4 STORE 1 FLAGS ()"));
}

#[tokio::test]
async fn search_results_are_sorted_and_unique() {
    let mut steps = select_inbox_steps("IMAP4rev1", 10, 1);
    steps.push(after("C4 UID SEARCH"));
    steps.push(read(
        "* SEARCH 8 3 13 3 1\r\nC4 OK SEARCH completed\r\n",
    ));

    let (_handle, mut client) = client_with(steps).await;
    client
        .mailbox_open("INBOX", &Default::default())
        .await
        .expect("select");

    let query = mailcove_imap::SearchQuery {
        unseen: Some(true),
        ..Default::default()
    };
    let ids = client.search(&query, true).await.expect("search");
    assert_eq!(ids, vec![1, 3, 8, 13]);
}

#[tokio::test]
async fn append_discovers_sequence_via_noop() {
    // Scenario: APPEND to the selected mailbox; the server withholds
    // EXISTS but reports APPENDUID; NOOP then reveals the new count
    let mut steps = select_inbox_steps("IMAP4rev1", 10, 5);
    steps.push(after("APPEND INBOX"));
    steps.push(read("+ Ready for literal\r\n"));
    steps.push(after("test message body"));
    steps.push(read("C4 OK [APPENDUID 5 99] APPEND completed\r\n"));
    steps.push(after("C5 NOOP"));
    steps.push(read("* 11 EXISTS\r\nC5 OK NOOP completed\r\n"));

    let (_handle, mut client) = client_with(steps).await;
    client
        .mailbox_open("INBOX", &Default::default())
        .await
        .expect("select");

    let events = SharedHandler::default();
    client.set_handler(events.clone());

    let message = b"Subject: hi\r\n\r\ntest message body";
    let result = client
        .append("INBOX", message, None, None)
        .await
        .expect("append");

    assert_eq!(result.destination, "INBOX");
    assert_eq!(result.uid_validity.map(|v| v.get()), Some(5));
    assert_eq!(result.uid.map(|u| u.get()), Some(99));
    assert_eq!(result.seq, Some(11));

    let events = events.0.lock().unwrap().events.clone();
    let exists: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            MailboxEvent::Exists(event) => Some(event.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(exists.len(), 1);
    assert_eq!(exists[0].count, 11);
    assert_eq!(exists[0].prev_count, 10);
}

#[tokio::test]
async fn append_over_the_limit_fails_before_the_wire() {
    let (handle, mut client) = client_with(vec![read(
        "* PREAUTH [CAPABILITY IMAP4rev1 APPENDLIMIT=16] hi\r\n",
    )])
    .await;

    let err = client
        .append("INBOX", b"this message is longer than sixteen bytes", None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::CommandRejected { .. }));
    assert!(!handle.sent_contains("APPEND"));
}

#[tokio::test]
async fn create_reports_already_exists() {
    let (_handle, mut client) = client_with(vec![
        read("* PREAUTH [CAPABILITY IMAP4rev1] hi\r\n"),
        after("C1 CREATE Archive"),
        read("C1 NO [ALREADYEXISTS] Mailbox exists\r\n"),
    ])
    .await;

    let created = client.mailbox_create("Archive").await.expect("create");
    assert_eq!(created.path, "Archive");
    assert!(!created.created);
}

#[tokio::test]
async fn create_subscribes_on_success() {
    let (handle, mut client) = client_with(vec![
        read("* PREAUTH [CAPABILITY IMAP4rev1] hi\r\n"),
        after("C1 CREATE Archive"),
        read("C1 OK CREATE completed\r\n"),
        after("C2 SUBSCRIBE Archive"),
        read("C2 OK SUBSCRIBE completed\r\n"),
    ])
    .await;

    let created = client.mailbox_create("Archive").await.expect("create");
    assert!(created.created);
    assert!(handle.sent_contains("C2 SUBSCRIBE Archive"));
}

#[tokio::test]
async fn status_feeds_the_selected_mailbox() {
    let mut steps = select_inbox_steps("IMAP4rev1", 3, 1);
    steps.push(after("C4 STATUS INBOX"));
    steps.push(read(
        "* STATUS INBOX (MESSAGES 5 UIDNEXT 201 UNSEEN 2)\r\nC4 OK STATUS completed\r\n",
    ));

    let (_handle, mut client) = client_with(steps).await;
    client
        .mailbox_open("INBOX", &Default::default())
        .await
        .expect("select");

    let status = client
        .status(
            "INBOX",
            &[
                mailcove_imap::StatusAttribute::Messages,
                mailcove_imap::StatusAttribute::UidNext,
                mailcove_imap::StatusAttribute::Unseen,
                // Filtered out: CONDSTORE is not available
                mailcove_imap::StatusAttribute::HighestModSeq,
            ],
        )
        .await
        .expect("status");

    assert_eq!(status.messages, Some(5));
    assert_eq!(status.unseen, Some(2));
    // The STATUS values flowed into the selected-mailbox cache
    assert_eq!(client.selected_mailbox().unwrap().exists, 5);
}

#[tokio::test]
async fn close_returns_to_authenticated() {
    let mut steps = select_inbox_steps("IMAP4rev1", 3, 1);
    steps.push(after("C4 CLOSE"));
    steps.push(read("C4 OK CLOSE completed\r\n"));

    let (_handle, mut client) = client_with(steps).await;
    client
        .mailbox_open("INBOX", &Default::default())
        .await
        .expect("select");

    assert!(client.close().await.expect("close"));
    assert_eq!(client.state(), ProtocolState::Authenticated);
    assert!(client.selected_mailbox().is_none());

    // A second close is a no-op
    assert!(!client.close().await.expect("close again"));
}

#[tokio::test]
async fn vanished_pushes_emit_uid_expunges() {
    let mut steps = select_inbox_steps("IMAP4rev1 ENABLE CONDSTORE QRESYNC", 10, 1);
    steps.push(after("C4 NOOP"));
    steps.push(read(
        "* VANISHED 300:302\r\nC4 OK NOOP completed\r\n",
    ));

    let (_handle, mut client) = client_with(steps).await;
    client
        .mailbox_open("INBOX", &Default::default())
        .await
        .expect("select");

    let events = SharedHandler::default();
    client.set_handler(events.clone());
    client.noop().await.expect("noop");

    let events = events.0.lock().unwrap().events.clone();
    let expunges: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            MailboxEvent::Expunge(event) => Some(event.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(expunges.len(), 3);
    assert!(expunges.iter().all(|e| e.vanished && !e.earlier));
    assert_eq!(
        expunges.iter().filter_map(|e| e.uid.map(|u| u.get())).collect::<Vec<_>>(),
        vec![300, 301, 302]
    );
}

#[tokio::test]
async fn idle_is_preempted_by_other_operations() {
    // Scenario: IDLE holds the wire; a NOOP wakes it, DONE completes the
    // idle, then the NOOP runs
    let mut steps = select_inbox_steps("IMAP4rev1 IDLE", 3, 1);
    steps.push(after("C4 IDLE"));
    steps.push(read("+ idling\r\n"));
    steps.push(after("DONE"));
    steps.push(read("C4 OK IDLE terminated\r\n"));
    steps.push(after("C5 NOOP"));
    steps.push(read("C5 OK NOOP completed\r\n"));

    let (handle, mut client) = client_with(steps).await;
    client
        .mailbox_open("INBOX", &Default::default())
        .await
        .expect("select");

    let session = Session::new(client);
    let idle_session = session.clone();
    let idle_task = tokio::spawn(async move { idle_session.idle().await });

    // Wait for the idle window to open before preempting it
    handle.wait_for_write("C4 IDLE").await;

    let mut client = session.client().await;
    assert!(client.noop().await.expect("noop"));
    drop(client);

    tokio::time::timeout(Duration::from_secs(5), idle_task)
        .await
        .expect("idle preempted in time")
        .expect("idle task")
        .expect("idle result");

    let sent = String::from_utf8(handle.sent()).unwrap();
    let idle_pos = sent.find("C4 IDLE").unwrap();
    let done_pos = sent.find("DONE").unwrap();
    let noop_pos = sent.find("C5 NOOP").unwrap();
    assert!(idle_pos < done_pos && done_pos < noop_pos);
}

#[tokio::test]
async fn mailbox_lock_serialises_selection() {
    let mut steps = select_inbox_steps("IMAP4rev1", 3, 1);
    steps.push(after("C4 NOOP"));
    steps.push(read("C4 OK NOOP completed\r\n"));

    let (_handle, client) = client_with(steps).await;
    let session = Session::new(client);

    let lock = session
        .mailbox_lock("INBOX", &Default::default())
        .await
        .expect("lock");
    assert_eq!(lock.path(), "INBOX");
    assert_eq!(lock.selected_mailbox().unwrap().exists, 3);

    // A second lock request for the same mailbox must wait until release
    let session2 = session.clone();
    let waiter = tokio::spawn(async move {
        let lock = session2
            .mailbox_lock("INBOX", &Default::default())
            .await
            .expect("second lock");
        lock.path().to_string()
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    lock.release();
    let path = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("lock released in time")
        .expect("waiter");
    assert_eq!(path, "INBOX");
}

#[tokio::test]
async fn logout_closes_the_connection() {
    let (_handle, mut client) = client_with(vec![
        read("* PREAUTH [CAPABILITY IMAP4rev1] hi\r\n"),
        after("C1 LOGOUT"),
        read("* BYE Logging out\r\nC1 OK LOGOUT completed\r\n"),
    ])
    .await;

    assert!(client.logout().await.expect("logout"));
    assert_eq!(client.state(), ProtocolState::Logout);

    // Logout is idempotent once the transport is gone
    assert!(client.logout().await.expect("logout again"));
}
