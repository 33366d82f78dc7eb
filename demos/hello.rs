use fission::{handlers, Context, Engine, HandlerResult, StatusCode};

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

fn hello(c: &mut Context) -> HandlerResult {
    let text = format!("hello, {}!", c.param("name"));
    c.string(StatusCode::OK, &text)
}

fn file(c: &mut Context) -> HandlerResult {
    let text = format!("access file: {}", c.param("filepath"));
    c.string(StatusCode::OK, &text)
}

#[derive(Deserialize)]
struct Greeting {
    name: String,
}

impl fission::binding::Validate for Greeting {}

#[derive(Serialize)]
struct Reply {
    message: String,
}

fn greet(c: &mut Context) -> HandlerResult {
    if let Some(greeting) = c.bind::<Greeting>() {
        let reply = Reply {
            message: format!("hello, {}!", greeting.name),
        };
        c.json(StatusCode::OK, &reply)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut engine = Engine::with_defaults();
    engine
        .get("/hello/:name", handlers![hello])
        .post("/greet", handlers![greet])
        .nest("/api/v1", handlers![], |api| {
            api.get("/file/*filepath", handlers![file]);
        });

    let addr = "127.0.0.1:3000";
    println!("hello: http://{}/hello/world", addr);
    println!("api: http://{}/api/v1/file/path/to/public/file", addr);
    println!("404: http://{}/other/path", addr);

    engine.run(addr).await
}
