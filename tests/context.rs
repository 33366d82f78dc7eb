use fission::engine::{ErrorType, RemoteAddr, MIME_JSON};
use fission::{handlers, Context, Failure, HandlerFunc, HandlerResult, State, StatusCode};

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::Request;
use parking_lot::Mutex;

type Log = Arc<Mutex<Vec<&'static str>>>;

fn context(uri: &str) -> Context {
    Context::new(Request::builder().uri(uri).body(Bytes::new()).unwrap())
}

/// A handler that records `name` and lets the chain go on implicitly.
fn mark(log: &Log, name: &'static str) -> HandlerFunc {
    let log = Arc::clone(log);
    Arc::new(move |_: &mut Context| -> HandlerResult {
        log.lock().push(name);
        Ok(())
    })
}

/// A middleware that records `name` around an explicit `next`.
fn around(log: &Log, name: &'static str, exit: &'static str) -> HandlerFunc {
    let log = Arc::clone(log);
    Arc::new(move |c: &mut Context| -> HandlerResult {
        log.lock().push(name);
        c.next()?;
        log.lock().push(exit);
        Ok(())
    })
}

#[test]
fn onion_ordering() {
    let log = Log::default();
    let mut c = context("/");
    c.set_handlers(vec![
        around(&log, "a in", "a out"),
        around(&log, "b in", "b out"),
        mark(&log, "handler"),
    ]);
    assert_eq!(c.state(), State::Created);

    c.next().unwrap();
    assert_eq!(*log.lock(), ["a in", "b in", "handler", "b out", "a out"]);
    assert_eq!(c.state(), State::Completed);
}

#[test]
fn abort_before_next() {
    let log = Log::default();
    let log2 = Arc::clone(&log);
    let second: HandlerFunc = Arc::new(move |c: &mut Context| -> HandlerResult {
        log2.lock().push("2");
        c.abort();
        c.next()
    });
    let mut c = context("/");
    c.set_handlers(vec![around(&log, "1 in", "1 out"), second, mark(&log, "3")]);

    c.next().unwrap();
    assert_eq!(*log.lock(), ["1 in", "2", "1 out"]);
    assert!(c.is_aborted());
    assert_eq!(c.state(), State::Aborted);
}

#[test]
fn abort_after_next() {
    let log = Log::default();
    let log2 = Arc::clone(&log);
    let second: HandlerFunc = Arc::new(move |c: &mut Context| -> HandlerResult {
        log2.lock().push("2 in");
        c.next()?;
        c.abort();
        c.next()?;
        log2.lock().push("2 out");
        Ok(())
    });
    let mut c = context("/");
    c.set_handlers(vec![
        around(&log, "1 in", "1 out"),
        second,
        mark(&log, "3"),
        mark(&log, "4"),
    ]);

    c.next().unwrap();
    assert_eq!(*log.lock(), ["1 in", "2 in", "3", "4", "2 out", "1 out"]);
    assert_eq!(c.state(), State::Aborted);

    // an aborted chain stays put
    c.next().unwrap();
    assert_eq!(log.lock().len(), 6);
}

#[test]
fn failure_stops_the_chain() {
    let log = Log::default();
    let failing: HandlerFunc = Arc::new(|_: &mut Context| -> HandlerResult {
        Err(Failure::new(StatusCode::CONFLICT, "stale"))
    });
    let mut c = context("/");
    c.set_handlers(vec![
        around(&log, "outer in", "outer out"),
        failing,
        mark(&log, "never"),
    ]);

    let failure = c.next().unwrap_err();
    assert_eq!(failure.status(), StatusCode::CONFLICT);
    assert_eq!(*log.lock(), ["outer in"]);
}

#[test]
fn abort_with_status() {
    let mut c = context("/");
    c.set_handlers(handlers![
        |c: &mut Context| -> HandlerResult {
            c.abort_with_status(StatusCode::UNAUTHORIZED);
            Ok(())
        },
        |c: &mut Context| c.string(StatusCode::OK, "secret"),
    ]);

    c.next().unwrap();
    let resp = c.take_response();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.body().is_empty());
}

#[test]
fn abort_with_status_json() {
    let mut c = context("/");
    c.abort_with_status_json(
        StatusCode::FORBIDDEN,
        &serde_json::json!({ "error": "forbidden" }),
    )
    .unwrap();
    assert!(c.is_aborted());

    let resp = c.take_response();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(resp.headers()["content-type"], MIME_JSON);
    assert_eq!(&resp.body()[..], br#"{"error":"forbidden"}"#);
}

#[test]
fn errors_are_collected() {
    let mut c = context("/");
    c.error(std::io::Error::new(std::io::ErrorKind::Other, "first"));
    c.abort_with_error(
        StatusCode::BAD_REQUEST,
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "second"),
    )
    .set_type(ErrorType::PUBLIC)
    .set_meta(serde_json::json!({ "field": "name" }));

    assert!(c.is_aborted());
    assert_eq!(c.writer().status(), StatusCode::BAD_REQUEST);
    assert_eq!(c.errors().messages(), ["first", "second"]);
    assert_eq!(c.errors().by_type(ErrorType::PUBLIC).len(), 1);
    assert_eq!(c.errors().last().unwrap().to_string(), "second");
}

#[test]
fn keys() {
    let c = context("/");
    c.set("name", "alice");
    c.set("owned", String::from("bob"));
    c.set("age", 42_i64);
    c.set("admin", true);
    c.set("ttl", Duration::from_secs(3));
    c.set("ratio", 0.5_f64);
    c.set("count", 7_u64);

    assert_eq!(c.get_string("name"), "alice");
    assert_eq!(c.get_string("owned"), "bob");
    assert_eq!(c.get_i64("age"), 42);
    assert!(c.get_bool("admin"));
    assert_eq!(c.get_duration("ttl"), Duration::from_secs(3));
    assert_eq!(c.get_f64("ratio"), 0.5);
    assert_eq!(c.get_u64("count"), 7);

    // wrong types and missing keys read as zero values
    assert_eq!(c.get_i64("name"), 0);
    assert_eq!(c.get_string("missing"), "");
    assert!(c.get("missing").is_none());

    assert_eq!(*c.get_as::<i64>("age").unwrap(), 42);
    assert!(c.get_as::<u8>("age").is_none());
    assert!(c.must_get("admin").downcast_ref::<bool>().is_some());
}

#[test]
fn keys_shared_with_helper_threads() {
    let c = context("/");
    c.set("base", 100_u64);

    std::thread::scope(|s| {
        for i in 0..8_u64 {
            let c = &c;
            s.spawn(move || {
                let base = c.get_u64("base");
                c.set(format!("part-{}", i), base + i);
            });
        }
    });

    let sum: u64 = (0..8).map(|i| c.get_u64(&format!("part-{}", i)) - 100).sum();
    assert_eq!(sum, 28);
}

#[test]
#[should_panic(expected = "does not exist")]
fn must_get_panics() {
    let c = context("/");
    c.must_get("missing");
}

#[test]
fn query_values() {
    let c = context("/search?q=rust+lang&tag=a&tag=b&empty=");

    assert_eq!(c.query("q"), "rust lang");
    assert_eq!(c.query_all("tag"), ["a", "b"]);
    assert_eq!(c.get_query("empty").as_deref(), Some(""));
    assert_eq!(c.get_query("missing"), None);
    assert_eq!(c.default_query("page", "1"), "1");
    assert_eq!(c.default_query("q", "x"), "rust lang");
    assert_eq!(c.path(), "/search");
}

#[test]
fn params_and_headers() {
    let mut req = Request::builder()
        .uri("/")
        .header("Content-Type", "application/json; charset=utf-8")
        .header("X-Token", "abc")
        .body(Bytes::new())
        .unwrap();
    req.extensions_mut()
        .insert(RemoteAddr("10.0.0.1:4000".parse().unwrap()));
    let mut c = Context::new(req);

    c.add_param("id", "7");
    assert_eq!(c.param("id"), "7");
    assert_eq!(c.param("missing"), "");
    assert_eq!(c.params().parse::<u32>("id"), Some(Ok(7)));

    assert_eq!(c.content_type(), "application/json");
    assert_eq!(c.get_header("x-token"), Some("abc"));
    assert_eq!(c.remote_addr().unwrap().port(), 4000);
    assert!(c.deadline().is_none());
}

#[test]
fn response_headers() {
    let mut c = context("/");
    c.header("Cache-Control", "no-store");
    c.header("X-Remove", "soon");
    c.header("X-Remove", "");
    c.header("Bad Header", "x");

    let resp = c.take_response();
    assert_eq!(resp.headers()["cache-control"], "no-store");
    assert!(resp.headers().get("x-remove").is_none());
}

#[test]
fn bodyless_statuses() {
    let mut c = context("/");
    c.string(StatusCode::NO_CONTENT, "ignored").unwrap();
    let resp = c.take_response();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(resp.body().is_empty());
}

#[test]
fn data_and_redirect() {
    let mut c = context("/");
    c.data(StatusCode::OK, "image/png", vec![0x89, b'P', b'N', b'G'])
        .unwrap();
    let resp = c.take_response();
    assert_eq!(resp.headers()["content-type"], "image/png");
    assert_eq!(resp.body().len(), 4);

    let mut c = context("/");
    c.redirect(StatusCode::FOUND, "/login").unwrap();
    let resp = c.take_response();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()["location"], "/login");

    let mut c = context("/");
    let failure = c.redirect(StatusCode::OK, "/login").unwrap_err();
    assert_eq!(failure.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(c.errors().by_type(ErrorType::RENDER).len(), 1);
}

#[test]
fn status_is_final_once_written() {
    let mut c = context("/");
    c.string(StatusCode::CREATED, "made").unwrap();
    c.status(StatusCode::NOT_FOUND);
    assert_eq!(c.writer().status(), StatusCode::CREATED);
    assert_eq!(c.writer().size(), 4);
}

fn named(c: &mut Context) -> HandlerResult {
    c.string(StatusCode::OK, "named")
}

#[test]
fn handler_names() {
    let mut c = context("/");
    assert_eq!(c.handler_name(), "");

    c.set_handlers(handlers![fission::engine::recovery(), named]);
    assert!(c.handler_name().ends_with("named"));
    let names = c.handler_names();
    assert_eq!(names.len(), 2);
    assert!(names[0].ends_with("recover"), "name = {}", names[0]);
    assert!(c.handler().is_some());
}
