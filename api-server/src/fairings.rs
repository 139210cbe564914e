use log::info;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::{Data, Request, Response};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Clone, Copy)]
struct StartedAt(Option<Instant>);

/// Logs one line per request: `METHOD uri -> status (Nms)`.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _: &mut Data<'_>) {
        req.local_cache(|| StartedAt(Some(Instant::now())));
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let elapsed = req
            .local_cache(|| StartedAt(None))
            .0
            .map(|started| started.elapsed().as_millis())
            .unwrap_or_default();
        info!(
            "{} {} -> {} ({}ms)",
            req.method(),
            req.uri(),
            res.status().code,
            elapsed
        );
    }
}

/// Permissive CORS for the browser client.
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "CORS headers",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _: &'r Request<'_>, res: &mut Response<'r>) {
        res.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        res.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PATCH, DELETE, OPTIONS",
        ));
        res.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Authorization, Content-Type",
        ));
    }
}

/// Answers CORS preflight requests for every path.
#[rocket::options("/<_path..>")]
pub fn preflight(_path: PathBuf) -> Status {
    Status::NoContent
}
