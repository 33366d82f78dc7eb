use fission::binding::{
    BindError, Binding, NoopValidator, Validate, ValidationError, MIME_JSON, MIME_POST_FORM,
};
use fission::engine::ErrorType;
use fission::{handlers, Context, Engine, HandlerResult, Method, StatusCode};

use bytes::Bytes;
use http::Request;
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq)]
struct Login {
    user: String,
    password: String,
}

impl Validate for Login {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.password.len() < 4 {
            return Err(ValidationError::field("password", "too short"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, PartialEq)]
struct Page {
    page: u32,
    #[serde(default)]
    size: Option<u32>,
}

impl Validate for Page {}

fn context(method: Method, uri: &str, content_type: &str, body: &str) -> Context {
    let mut builder = Request::builder().method(method).uri(uri);
    if !content_type.is_empty() {
        builder = builder.header("Content-Type", content_type);
    }
    Context::new(builder.body(Bytes::from(body.to_owned())).unwrap())
}

#[test]
fn default_binding() {
    let pick = |method: Method, ct: &str| Binding::default_for(&method, ct).map(Binding::name);

    assert_eq!(pick(Method::GET, MIME_JSON).unwrap(), "form");
    assert_eq!(pick(Method::POST, MIME_JSON).unwrap(), "json");
    assert_eq!(pick(Method::POST, MIME_POST_FORM).unwrap(), "form");
    assert_eq!(pick(Method::PUT, "").unwrap(), "form");
    assert!(matches!(
        pick(Method::POST, "application/x-yaml"),
        Err(BindError::UnsupportedContentType(_))
    ));
}

#[test]
fn bind_json_body() {
    let c = context(
        Method::POST,
        "/login",
        "application/json; charset=utf-8",
        r#"{"user":"alice","password":"secret"}"#,
    );

    let login: Login = c.should_bind().unwrap();
    assert_eq!(login.user, "alice");
    let again: Login = c.should_bind_json().unwrap();
    assert_eq!(login, again);
}

#[test]
fn bind_form_body_and_query() {
    let c = context(
        Method::POST,
        "/login?user=ignored",
        MIME_POST_FORM,
        "user=bob&password=hunter2",
    );
    let login: Login = c.should_bind().unwrap();
    assert_eq!(login.user, "bob");
    assert_eq!(login.password, "hunter2");

    let c = context(Method::GET, "/list?page=3", "", "");
    let page: Page = c.should_bind().unwrap();
    assert_eq!(page, Page { page: 3, size: None });
    let page: Page = c.should_bind_query().unwrap();
    assert_eq!(page.page, 3);
    let page: Page = c.should_bind_form().unwrap();
    assert_eq!(page.page, 3);
}

#[test]
fn bind_uri_params() {
    let mut c = context(Method::GET, "/list", "", "");
    c.add_param("page", "9");
    c.add_param("size", "20");
    let page: Page = c.should_bind_uri().unwrap();
    assert_eq!(page, Page { page: 9, size: Some(20) });
}

#[test]
fn decode_errors() {
    let c = context(Method::POST, "/login", MIME_JSON, "{not json");
    assert!(matches!(
        c.should_bind::<Login>(),
        Err(BindError::Json(_))
    ));

    let c = context(Method::GET, "/list?page=many", "", "");
    assert!(matches!(c.should_bind::<Page>(), Err(BindError::Form(_))));

    let c = context(Method::POST, "/login", "application/xml", "<login/>");
    assert!(matches!(
        c.should_bind::<Login>(),
        Err(BindError::UnsupportedContentType(ref ct)) if ct == "application/xml"
    ));
}

#[test]
fn validation() {
    let c = context(
        Method::POST,
        "/login",
        MIME_JSON,
        r#"{"user":"alice","password":"abc"}"#,
    );
    let err = c.should_bind::<Login>().unwrap_err();
    assert!(matches!(
        err,
        BindError::Validation(ValidationError::Field { ref field, .. }) if field == "password"
    ));
}

#[test]
fn slice_validation_reports_every_index() {
    let c = context(
        Method::POST,
        "/batch",
        MIME_JSON,
        r#"[
            {"user":"a","password":"x"},
            {"user":"b","password":"long enough"},
            {"user":"c","password":"y"}
        ]"#,
    );
    let err = c.should_bind::<Vec<Login>>().unwrap_err();
    match err {
        BindError::Validation(ValidationError::Slice(errors)) => {
            let indices: Vec<usize> = errors.errors().iter().map(|(i, _)| *i).collect();
            assert_eq!(indices, [0, 2]);
            assert_eq!(
                errors.to_string(),
                "[0]: field \"password\": too short\n[2]: field \"password\": too short"
            );
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn bind_aborts_with_bad_request() {
    let mut c = context(Method::POST, "/login", MIME_JSON, r#"{"user":"alice"}"#);

    let login: Option<Login> = c.bind();
    assert!(login.is_none());
    assert!(c.is_aborted());
    assert_eq!(c.writer().status(), StatusCode::BAD_REQUEST);
    assert_eq!(c.errors().by_type(ErrorType::BIND).len(), 1);

    let mut c = context(
        Method::POST,
        "/login",
        MIME_JSON,
        r#"{"user":"alice","password":"secret"}"#,
    );
    let login: Option<Login> = c.bind_json();
    assert_eq!(login.unwrap().user, "alice");
    assert!(!c.is_aborted());
}

fn login(c: &mut Context) -> HandlerResult {
    match c.bind::<Login>() {
        Some(login) => c.string(StatusCode::OK, &login.user),
        None => Ok(()),
    }
}

#[test]
fn engine_validator_is_replaceable() {
    let mut engine = Engine::new();
    engine.post("/login", handlers![login]);

    let request = || {
        Request::builder()
            .method(Method::POST)
            .uri("/login")
            .header("Content-Type", MIME_JSON)
            .body(Bytes::from_static(br#"{"user":"eve","password":"1"}"#))
            .unwrap()
    };

    let resp = engine.dispatch(request()).unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    engine.set_validator(NoopValidator);
    let resp = engine.dispatch(request()).unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&resp.body()[..], b"eve");
}
