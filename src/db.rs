use std::{env, fmt};

use diesel::r2d2::{ConnectionManager, Pool, PoolError, PooledConnection};
use diesel::result::DatabaseErrorKind::UniqueViolation;
use diesel::result::Error::{DatabaseError, NotFound};
use diesel::PgConnection;
use dotenv::dotenv;

pub type Result<T> = std::result::Result<T, Error>;
pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConn = PooledConnection<ConnectionManager<PgConnection>>;

/// Get a pooled connection to the underlying PostgreSQL database
///
/// `DATABASE_URL` must be set in the environment
/// Loads `.env` file in the environment's directory
pub fn pg_connection() -> PgPool {
	dotenv().ok();
	let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

	let manager = ConnectionManager::<PgConnection>::new(&database_url);

	Pool::builder().build(manager)
		.expect("Failed to create pool.")
}

/// Error that can occur when querying against the database
#[derive(Debug, PartialEq)]
pub enum Error {
	RecordAlreadyExists,
	RecordNotFound,
	Connection(String),
	/// Catch-all for any other diesel error
	DatabaseError(diesel::result::Error),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::RecordAlreadyExists => write!(f, "record violates a unique constraint"),
			Error::RecordNotFound => write!(f, "record does not exist"),
			Error::Connection(e) => write!(f, "opening database connection: {}", e),
			Error::DatabaseError(e) => write!(f, "database error: {:?}", e),
		}
	}
}

impl std::error::Error for Error {}

impl From<diesel::result::Error> for Error {
	fn from(e: diesel::result::Error) -> Self {
		match e {
			NotFound => Error::RecordNotFound,
			DatabaseError(UniqueViolation, _) => Error::RecordAlreadyExists,
			other => Error::DatabaseError(other),
		}
	}
}

impl From<PoolError> for Error {
	fn from(e: PoolError) -> Self {
		Error::Connection(e.to_string())
	}
}
