use sparrow::config::Config;
use sparrow::http::request::Method;
use sparrow::http::response::{Response, ResponseBuilder, StatusCode};
use sparrow::{PathParams, Request, Router, Server, handler_fn};

async fn home(_req: Request, _params: PathParams) -> anyhow::Result<Response> {
    Ok(ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Type", "text/html")
        .body("<html><body><b>test</b></body></html>")
        .build())
}

async fn welcome(_req: Request, params: PathParams) -> anyhow::Result<String> {
    let name = params.get("name").map_or("", String::as_str);
    Ok(format!("Welcome {name}"))
}

async fn login(req: Request, _params: PathParams) -> anyhow::Result<String> {
    if req.method == Some(Method::GET) {
        return Ok("form".to_string());
    }

    let name = req.form_value("name").unwrap_or_default();
    let password = req.form_value("password").unwrap_or_default();
    Ok(format!("{name}:{password}"))
}

fn routes() -> anyhow::Result<Router> {
    let mut router = Router::new();
    router.add_routes([
        ("/welcome/{name}", handler_fn(welcome)),
        ("/", handler_fn(home)),
        ("/login", handler_fn(login)),
    ])?;
    Ok(router)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(cfg.logging.max_level()?)
        .init();

    let server = Server::new(routes()?, cfg.server.clone());

    tokio::select! {
        res = server.run() => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
