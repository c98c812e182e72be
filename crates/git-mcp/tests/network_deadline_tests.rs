//! A remote that accepts connections and never answers
//!
//! Kept in its own test binary: the libgit2 transfer timeouts are process-wide.

use std::net::TcpListener;
use std::time::{Duration, Instant};

use git_mcp::{DispatchRequest, Dispatcher, ErrorKind, ServerConfig};
use git_test_utils::TestRepo;
use serde_json::json;
use tokio::time::timeout;

/// Accept connections forever and keep them open without sending a byte.
fn silent_remote() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });
    format!("git://127.0.0.1:{port}/x.git")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stalled_transfer_times_out_and_releases_the_repository() {
    git_backend::set_transfer_timeout(Duration::from_secs(2)).unwrap();

    let repo = TestRepo::with_commit();
    repo.repo().remote("origin", &silent_remote()).unwrap();
    let path = repo.path_str();
    let dispatcher = Dispatcher::new(&ServerConfig {
        network_timeout_secs: 1,
        ..ServerConfig::default()
    });

    let fetch = timeout(
        Duration::from_secs(10),
        dispatcher.dispatch(DispatchRequest::new("fetch", path.clone(), json!({}))),
    )
    .await
    .expect("fetch hung past its deadline");
    assert_eq!(fetch.error().map(|e| e.kind), Some(ErrorKind::OperationTimedOut));

    let started = Instant::now();
    let push = timeout(
        Duration::from_secs(5),
        dispatcher.dispatch(DispatchRequest::new("push", path.clone(), json!({}))),
    )
    .await
    .expect("push hung behind the stalled fetch");
    assert_eq!(push.error().map(|e| e.kind), Some(ErrorKind::OperationTimedOut));
    assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());

    let status = timeout(
        Duration::from_secs(15),
        dispatcher.dispatch(DispatchRequest::new("status", path, json!({}))),
    )
    .await
    .expect("status never got the repository back");
    assert!(status.is_ok(), "{status:?}");
}
