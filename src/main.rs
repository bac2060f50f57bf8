use std::env;

use log::*;
use warp::filters::log::Info;
use warp::Filter;

#[tokio::main]
async fn main() {
	if env::var("RUST_LOG").is_err() {
		env::set_var("RUST_LOG", "info");
	}
	pretty_env_logger::init();

	let log = warp::log::custom(|info: Info| {
		info!(
			target: "loan_office::api",
			"\"{} {} {:?}\" \t{} {} {:?}",
			info.method(),
			info.path(),
			info.version(),
			info.status().canonical_reason().unwrap_or_else(|| "-"),
			info.status().as_u16(),
			info.elapsed(),
		);
	});

	let health = warp::path("health").map(|| "ok");
	let routes = health.with(log);
	warp::serve(routes).run(([127, 0, 0, 1], 3030)).await;
}
