use std::sync::{Mutex, MutexGuard};

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{delete, get, post, put, web, App, HttpResponse, HttpServer, Responder};

use serde::Deserialize;
use markov_core::model::generator::Generator;
use markov_core::store::FileStore;
use markov_core::{Ingestion, Markov, MarkovError, Settings, TokenMode};

/// Body of `POST /v1/messages`.
///
/// `guild` and `channel` are only used for scope filtering; a message
/// without a guild (direct message) is always eligible.
#[derive(Deserialize)]
struct MessageBody {
	user: String,
	content: String,
	guild: Option<String>,
	channel: Option<String>,
}

/// Query of `GET /v1/generate`.
///
/// `guild` and `channel` name where the request was made; nothing is
/// generated in a channel that is not observed.
#[derive(Deserialize)]
struct GenerateParams {
	user: String,
	guild: Option<String>,
	channel: Option<String>,
}

#[derive(Deserialize)]
struct ConfigParams {
	mode: Option<String>,
	depth: Option<usize>,
}

struct SharedData {
	markov: Markov<FileStore>,
}

/// Every handler goes through this lock, so read-modify-write cycles on the
/// store never interleave.
fn lock(data: &web::Data<Mutex<SharedData>>) -> Result<MutexGuard<'_, SharedData>, HttpResponse> {
	data.lock().map_err(|_| HttpResponse::InternalServerError().body("Model lock failed"))
}

/// Maps a core error to a response carrying a user-facing sentence.
fn error_response(error: &MarkovError, user: &str) -> HttpResponse {
	let body = error.user_message(user);
	match error {
		MarkovError::ModelAbsent { .. } | MarkovError::EmptyGeneration { .. } => HttpResponse::NotFound().body(body),
		MarkovError::ModelIncomplete { .. } => HttpResponse::Conflict().body(body),
		MarkovError::Configuration(_) => HttpResponse::BadRequest().body(body),
		MarkovError::Storage(_) => {
			log::warn!("rejected request for {user:?}: {error}");
			HttpResponse::BadRequest().body(body)
		}
		_ => {
			log::error!("request for {user} failed: {error}");
			HttpResponse::InternalServerError().body(body)
		}
	}
}

/// Cuts `text` to at most `max` characters.
fn truncate(text: &str, max: usize) -> String {
	text.chars().take(max).collect()
}

/// HTTP POST endpoint `/v1/messages`
///
/// Observes one message. Always answers 202: an ingestion problem drops the
/// message, it never fails the request.
#[post("/v1/messages")]
async fn post_message(data: web::Data<Mutex<SharedData>>, body: web::Json<MessageBody>) -> impl Responder {
	let mut shared_data = match lock(&data) {
		Ok(m) => m,
		Err(response) => return response,
	};

	match shared_data.markov.is_eligible(body.guild.as_deref(), body.channel.as_deref()) {
		Ok(true) => (),
		Ok(false) => return HttpResponse::Accepted().body("out of scope"),
		Err(e) => {
			log::warn!("scope lookup failed for {:?}: {e}", body.guild);
			return HttpResponse::Accepted().body("dropped");
		}
	}

	let outcome = match shared_data.markov.observe(&body.user, &body.content) {
		Ingestion::Recorded { .. } => "recorded",
		Ingestion::Disabled => "disabled",
		Ingestion::Dropped => "dropped",
		Ingestion::Ignored => "ignored",
	};
	HttpResponse::Accepted().body(outcome)
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates a text from the user's chain, truncated to `max_length` characters.
/// Answers 403 when asked from a channel that is not observed.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<Mutex<SharedData>>, query: web::Query<GenerateParams>) -> impl Responder {
	let shared_data = match lock(&data) {
		Ok(m) => m,
		Err(response) => return response,
	};

	let generated = shared_data.markov.generate_in(
		&query.user,
		query.guild.as_deref(),
		query.channel.as_deref(),
		&mut Generator::new(),
	);
	match generated {
		Ok(Some(text)) => HttpResponse::Ok().body(truncate(&text, shared_data.markov.settings().max_length)),
		Ok(None) => HttpResponse::Forbidden().body("out of scope"),
		Err(e) => error_response(&e, &query.user),
	}
}

#[get("/v1/users")]
async fn get_users(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match lock(&data) {
		Ok(m) => m,
		Err(response) => return response,
	};
	match shared_data.markov.entities() {
		Ok(users) => HttpResponse::Ok().body(users.join("\n")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list users"),
	}
}

#[get("/v1/users/{user}/config")]
async fn get_config(data: web::Data<Mutex<SharedData>>, user: web::Path<String>) -> impl Responder {
	let shared_data = match lock(&data) {
		Ok(m) => m,
		Err(response) => return response,
	};
	match shared_data.markov.config(&user) {
		Ok(config) => HttpResponse::Ok().json(config),
		Err(e) => error_response(&e, &user),
	}
}

#[put("/v1/users/{user}/enable")]
async fn put_enable(data: web::Data<Mutex<SharedData>>, user: web::Path<String>) -> impl Responder {
	let mut shared_data = match lock(&data) {
		Ok(m) => m,
		Err(response) => return response,
	};
	match shared_data.markov.enable(&user) {
		Ok(()) => HttpResponse::Ok().body("Markov modeling enabled"),
		Err(e) => error_response(&e, &user),
	}
}

/// Disabling also forgets the chain.
#[put("/v1/users/{user}/disable")]
async fn put_disable(data: web::Data<Mutex<SharedData>>, user: web::Path<String>) -> impl Responder {
	let mut shared_data = match lock(&data) {
		Ok(m) => m,
		Err(response) => return response,
	};
	match shared_data.markov.disable(&user) {
		Ok(()) => HttpResponse::Ok().body("Markov modeling disabled"),
		Err(e) => error_response(&e, &user),
	}
}

/// HTTP PUT endpoint `/v1/users/{user}/config`
///
/// Changes token mode and/or depth. The answer carries an advisory when the
/// existing chain was built with another shape and should be reset.
#[put("/v1/users/{user}/config")]
async fn put_config(data: web::Data<Mutex<SharedData>>, user: web::Path<String>, query: web::Query<ConfigParams>) -> impl Responder {
	let mode = match query.mode.as_deref().map(str::parse::<TokenMode>).transpose() {
		Ok(mode) => mode,
		Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
	};

	let mut shared_data = match lock(&data) {
		Ok(m) => m,
		Err(response) => return response,
	};
	match shared_data.markov.configure(&user, mode, query.depth) {
		Ok(Some(advisory)) => HttpResponse::Ok().body(format!("Configuration updated, but the {}", advisory.message())),
		Ok(None) => HttpResponse::Ok().body("Configuration updated"),
		Err(e) => error_response(&e, &user),
	}
}

#[delete("/v1/users/{user}/chain")]
async fn delete_chain(data: web::Data<Mutex<SharedData>>, user: web::Path<String>) -> impl Responder {
	let mut shared_data = match lock(&data) {
		Ok(m) => m,
		Err(response) => return response,
	};
	match shared_data.markov.reset(&user) {
		Ok(()) => HttpResponse::Ok().body("Markov chain reset"),
		Err(e) => error_response(&e, &user),
	}
}

#[get("/v1/guilds/{guild}/channels")]
async fn get_channels(data: web::Data<Mutex<SharedData>>, guild: web::Path<String>) -> impl Responder {
	let shared_data = match lock(&data) {
		Ok(m) => m,
		Err(response) => return response,
	};
	match shared_data.markov.scope(&guild) {
		Ok(scope) => match scope.restricted_channels {
			Some(channels) => HttpResponse::Ok().body(channels.into_iter().collect::<Vec<_>>().join("\n")),
			None => HttpResponse::Ok().body("unrestricted"),
		},
		Err(e) => error_response(&e, &guild),
	}
}

#[put("/v1/guilds/{guild}/channels/{channel}")]
async fn put_channel(data: web::Data<Mutex<SharedData>>, path: web::Path<(String, String)>) -> impl Responder {
	let (guild, channel) = path.into_inner();
	let mut shared_data = match lock(&data) {
		Ok(m) => m,
		Err(response) => return response,
	};
	match shared_data.markov.enable_channel(&guild, &channel) {
		Ok(_) => HttpResponse::Ok().body(format!("Channel {channel} observed")),
		Err(e) => error_response(&e, &guild),
	}
}

#[delete("/v1/guilds/{guild}/channels/{channel}")]
async fn delete_channel(data: web::Data<Mutex<SharedData>>, path: web::Path<(String, String)>) -> impl Responder {
	let (guild, channel) = path.into_inner();
	let mut shared_data = match lock(&data) {
		Ok(m) => m,
		Err(response) => return response,
	};
	match shared_data.markov.disable_channel(&guild, &channel) {
		Ok(true) => HttpResponse::Ok().body(format!("Channel {channel} no longer observed")),
		Ok(false) => HttpResponse::NotFound().body(format!("Channel {channel} was not observed")),
		Err(e) => error_response(&e, &guild),
	}
}

#[delete("/v1/guilds/{guild}/channels")]
async fn delete_channels(data: web::Data<Mutex<SharedData>>, guild: web::Path<String>) -> impl Responder {
	let mut shared_data = match lock(&data) {
		Ok(m) => m,
		Err(response) => return response,
	};
	match shared_data.markov.clear_scope(&guild) {
		Ok(()) => HttpResponse::Ok().body("Channel restriction lifted"),
		Err(e) => error_response(&e, &guild),
	}
}

/// Main entry point for the server.
///
/// Loads settings (`MARKOV_CONFIG`, default `markov.toml`), opens the file
/// store and serves the endpoints with the service behind a `Mutex`.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

	let settings = Settings::load(None).map_err(|e| std::io::Error::other(e.to_string()))?;
	let store = FileStore::open(&settings.data_dir, settings.store_format)
		.map_err(|e| std::io::Error::other(e.to_string()))?;
	let address = (settings.bind.clone(), settings.port);
	log::info!("serving chains from {} on {}:{}", store.root().display(), address.0, address.1);

	let shared_data = SharedData {
		markov: Markov::new(store, settings),
	};
	let shared_model = web::Data::new(Mutex::new(shared_data));

	HttpServer::new(move || {
		App::new()
			.wrap(Logger::default())
			.wrap(Cors::permissive())
			.app_data(shared_model.clone())
			.service(post_message)
			.service(get_generated)
			.service(get_users)
			.service(get_config)
			.service(put_enable)
			.service(put_disable)
			.service(put_config)
			.service(delete_chain)
			.service(get_channels)
			.service(put_channel)
			.service(delete_channel)
			.service(delete_channels)
	})
		.bind(address)?
		.run()
		.await
}
