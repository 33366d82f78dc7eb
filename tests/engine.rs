use fission::engine::RouteInfo;
use fission::{
    handlers, Context, Engine, EngineConfig, Failure, HandlerResult, Method, StatusCode,
};

use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use http::{Request, Response};

fn request(method: Method, uri: &str) -> Request<Bytes> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
}

fn send(engine: &Engine, method: Method, uri: &str) -> Response<Bytes> {
    engine.dispatch(request(method, uri)).unwrap()
}

fn body(resp: &Response<Bytes>) -> &str {
    std::str::from_utf8(resp.body()).unwrap()
}

fn header<'a>(resp: &'a Response<Bytes>, name: &str) -> Option<&'a str> {
    resp.headers().get(name).map(|v| v.to_str().unwrap())
}

fn index(c: &mut Context) -> HandlerResult {
    c.string(StatusCode::OK, "index")
}

fn hello(c: &mut Context) -> HandlerResult {
    c.string(StatusCode::OK, "hello")
}

fn hello_name(c: &mut Context) -> HandlerResult {
    let text = format!("hello {}", c.param("name"));
    c.string(StatusCode::OK, &text)
}

fn login(c: &mut Context) -> HandlerResult {
    c.string(StatusCode::OK, "login")
}

fn assets(c: &mut Context) -> HandlerResult {
    let text = c.param("filepath").to_owned();
    c.string(StatusCode::OK, &text)
}

fn scenario() -> Engine {
    let mut engine = Engine::new();
    engine
        .get("/", handlers![index])
        .get("/hello", handlers![hello])
        .post("/login", handlers![login])
        .get("/hello/:name", handlers![hello_name])
        .get("/assets/*filepath", handlers![assets]);
    engine
}

#[test]
fn end_to_end() {
    let engine = scenario();

    let resp = send(&engine, Method::GET, "/");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(&resp), "index");

    let resp = send(&engine, Method::GET, "/hello/alice");
    assert_eq!(body(&resp), "hello alice");
    assert_eq!(
        header(&resp, "content-type"),
        Some("text/plain; charset=utf-8")
    );

    let resp = send(&engine, Method::GET, "/assets/js/app.js");
    assert_eq!(body(&resp), "js/app.js");

    let resp = send(&engine, Method::POST, "/login");
    assert_eq!(body(&resp), "login");

    let resp = send(&engine, Method::GET, "/assets");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(&resp), "404 page not found");
}

#[test]
fn method_not_allowed() {
    let mut engine = scenario();

    let resp = send(&engine, Method::DELETE, "/hello");
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(header(&resp, "allow"), Some("GET"));
    assert_eq!(body(&resp), "405 method not allowed");

    engine.post("/hello", handlers![hello]);
    let resp = send(&engine, Method::DELETE, "/hello");
    assert_eq!(header(&resp, "allow"), Some("GET, POST"));

    engine.config_mut().handle_method_not_allowed = false;
    let resp = send(&engine, Method::DELETE, "/hello");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(header(&resp, "allow").is_none());
}

#[test]
fn static_route_wins() {
    let mut engine = Engine::new();
    engine
        .get("/user/:id", handlers![|c: &mut Context| {
            let text = format!("user {}", c.param("id"));
            c.string(StatusCode::OK, &text)
        }])
        .get("/user/new", handlers![|c: &mut Context| c.string(StatusCode::OK, "new user")]);

    assert_eq!(body(&send(&engine, Method::GET, "/user/new")), "new user");
    assert_eq!(body(&send(&engine, Method::GET, "/user/42")), "user 42");
}

#[test]
fn trailing_slash_redirect() {
    let mut engine = Engine::new();
    engine
        .get("/foo", handlers![hello])
        .post("/bar/", handlers![hello]);

    let resp = send(&engine, Method::GET, "/foo/");
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(header(&resp, "location"), Some("/foo"));

    let resp = send(&engine, Method::POST, "/bar");
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(header(&resp, "location"), Some("/bar/"));

    let resp = send(&engine, Method::GET, "/foo/?page=2");
    assert_eq!(header(&resp, "location"), Some("/foo?page=2"));

    let req = Request::builder()
        .uri("/foo/")
        .header("X-Forwarded-Prefix", "/api<script>/")
        .body(Bytes::new())
        .unwrap();
    let resp = engine.dispatch(req).unwrap();
    assert_eq!(header(&resp, "location"), Some("/apiscript/foo"));

    engine.config_mut().redirect_trailing_slash = false;
    let resp = send(&engine, Method::GET, "/foo/");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[test]
fn trailing_slash_redirect_stays_on_site() {
    let mut engine = Engine::new();
    engine.get("/:page", handlers![|c: &mut Context| {
        let text = c.param("page").to_owned();
        c.string(StatusCode::OK, &text)
    }]);
    engine.config_mut().remove_extra_slash = true;

    let resp = send(&engine, Method::GET, "//evil.com/");
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(header(&resp, "location"), Some("/evil.com"));

    let resp = send(&engine, Method::GET, "///evil.com/?next=1");
    assert_eq!(header(&resp, "location"), Some("/evil.com?next=1"));

    engine.config_mut().remove_extra_slash = false;
    let resp = send(&engine, Method::GET, "//evil.com/");
    if let Some(location) = header(&resp, "location") {
        assert!(!location.starts_with("//"), "location = {}", location);
    }
}

#[test]
fn fixed_path_redirect() {
    let config = EngineConfig {
        redirect_fixed_path: true,
        ..EngineConfig::default()
    };
    let mut engine = Engine::with_config(config);
    engine.get("/hello", handlers![hello]);

    let resp = send(&engine, Method::GET, "/HELLO");
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(header(&resp, "location"), Some("/hello"));

    let resp = send(&engine, Method::GET, "/a/../Hello");
    assert_eq!(header(&resp, "location"), Some("/hello"));

    let resp = send(&engine, Method::GET, "/goodbye");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[test]
fn remove_extra_slash() {
    let mut engine = Engine::new();
    engine.get("/a/hello", handlers![hello]);

    assert_eq!(
        send(&engine, Method::GET, "/a//hello").status(),
        StatusCode::NOT_FOUND
    );

    engine.config_mut().remove_extra_slash = true;
    let resp = send(&engine, Method::GET, "/a//hello");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(&resp), "hello");
}

#[test]
fn unescape_path_values() {
    let mut engine = Engine::new();
    engine.get("/hello/:name", handlers![hello_name]);

    let resp = send(&engine, Method::GET, "/hello/j%C3%BCrgen");
    assert_eq!(body(&resp), "hello jürgen");

    engine.config_mut().unescape_path_values = false;
    let resp = send(&engine, Method::GET, "/hello/j%C3%BCrgen");
    assert_eq!(body(&resp), "hello j%C3%BCrgen");
}

#[test]
fn custom_fallbacks() {
    let mut engine = scenario();
    engine
        .no_route(handlers![|c: &mut Context| c.string(StatusCode::NOT_FOUND, "nothing here")])
        .no_method(handlers![|c: &mut Context| -> HandlerResult {
            c.status(StatusCode::GONE);
            Ok(())
        }]);

    let resp = send(&engine, Method::GET, "/missing");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(&resp), "nothing here");

    let resp = send(&engine, Method::PUT, "/login");
    assert_eq!(resp.status(), StatusCode::GONE);
    assert_eq!(body(&resp), "");
}

#[test]
fn global_middleware_runs_for_fallbacks() {
    let mut engine = Engine::new();
    engine.use_middleware(handlers![|c: &mut Context| {
        c.header("X-Request-Id", "42");
        c.next()
    }]);
    engine.get("/hello", handlers![hello]);

    let resp = send(&engine, Method::GET, "/hello");
    assert_eq!(header(&resp, "x-request-id"), Some("42"));

    let resp = send(&engine, Method::GET, "/missing");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(header(&resp, "x-request-id"), Some("42"));
}

#[test]
fn recovery_catches_failures() {
    let mut engine = Engine::with_defaults();
    engine
        .get("/panic", handlers![|_: &mut Context| -> HandlerResult {
            panic!("boom")
        }])
        .get("/upstream", handlers![|_: &mut Context| -> HandlerResult {
            Err(Failure::new(StatusCode::BAD_GATEWAY, "upstream down"))
        }])
        .get("/partial", handlers![|c: &mut Context| -> HandlerResult {
            c.string(StatusCode::OK, "partial")?;
            Err(Failure::internal("late"))
        }])
        .get("/parse", handlers![|c: &mut Context| -> HandlerResult {
            let n: u32 = c.query("n").parse()?;
            c.string(StatusCode::OK, &n.to_string())
        }]);

    let resp = send(&engine, Method::GET, "/panic");
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body(&resp), "Internal Server Error");

    let resp = send(&engine, Method::GET, "/upstream");
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body(&resp), "Bad Gateway");

    // whatever the handler wrote before failing stays
    let resp = send(&engine, Method::GET, "/partial");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(&resp), "partial");

    let resp = send(&engine, Method::GET, "/parse?n=x");
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let resp = send(&engine, Method::GET, "/parse?n=7");
    assert_eq!(body(&resp), "7");

    // the engine keeps serving after a panic
    let resp = send(&engine, Method::GET, "/parse?n=8");
    assert_eq!(body(&resp), "8");
}

#[test]
fn failures_reach_the_caller_without_recovery() {
    let mut engine = Engine::new();
    engine.get("/fail", handlers![|_: &mut Context| -> HandlerResult {
        Err(Failure::new(StatusCode::SERVICE_UNAVAILABLE, "maintenance"))
    }]);

    let failure = engine.dispatch(request(Method::GET, "/fail")).unwrap_err();
    assert_eq!(failure.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(failure.message(), "maintenance");
}

#[test]
fn routes_introspection() {
    let engine = scenario();
    let routes = engine.routes();

    assert_eq!(routes.len(), 5);
    let RouteInfo {
        method,
        path,
        handler,
    } = &routes[0];
    assert_eq!(*method, Method::GET);
    assert_eq!(path, "/");
    assert!(handler.ends_with("index"), "handler = {}", handler);

    assert!(routes
        .iter()
        .any(|r| r.method == Method::POST && r.path == "/login"));
}

#[test]
#[should_panic(expected = "handlers are already registered")]
fn duplicate_route_panics() {
    let mut engine = scenario();
    engine.get("/hello", handlers![hello]);
}

#[test]
fn contexts_are_recycled_cleanly() {
    let mut engine = Engine::new();
    engine
        .get("/set", handlers![|c: &mut Context| {
            c.set("user", "alice");
            c.error(std::io::Error::new(std::io::ErrorKind::Other, "noted"));
            c.string(StatusCode::CREATED, "set")
        }])
        .get("/check", handlers![|c: &mut Context| {
            let text = format!(
                "{}|{}|{}",
                c.get_string("user"),
                c.errors().len(),
                c.full_path()
            );
            c.string(StatusCode::OK, &text)
        }]);

    assert_eq!(send(&engine, Method::GET, "/set").status(), StatusCode::CREATED);
    let resp = send(&engine, Method::GET, "/check");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(&resp), "|0|/check");
}

#[test]
fn config_deserializes_with_defaults() {
    let config: EngineConfig =
        serde_json::from_str(r#"{"redirect_fixed_path": true, "max_idle_contexts": 8}"#).unwrap();
    assert!(config.redirect_fixed_path);
    assert_eq!(config.max_idle_contexts, 8);
    assert!(config.redirect_trailing_slash);
    assert!(config.handle_method_not_allowed);
    assert!(!config.remove_extra_slash);
    assert!(config.unescape_path_values);
}

#[test]
fn concurrent_dispatch() {
    let mut engine = scenario();
    engine.use_middleware(handlers![|c: &mut Context| {
        let id = c.param("name").to_owned();
        c.set("id", id);
        c.next()
    }]);
    engine.get("/echo/:name", handlers![|c: &mut Context| {
        let text = format!("{}:{}", c.param("name"), c.get_string("id"));
        c.string(StatusCode::OK, &text)
    }]);
    let engine = Arc::new(engine);

    let workers: Vec<_> = (0..8)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..200 {
                    let name = format!("t{}r{}", t, i);
                    let resp = send(&engine, Method::GET, &format!("/echo/{}", name));
                    assert_eq!(body(&resp), format!("{}:{}", name, name));

                    let resp = send(&engine, Method::GET, "/hello/alice");
                    assert_eq!(body(&resp), "hello alice");
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
}
