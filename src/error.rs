use std::error;
use std::fmt;

use crate::db;
use crate::types::Id;

pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur while operating the back office
#[derive(Debug, PartialEq)]
pub struct Error {
	kind: Kind,
}

impl Error {
	pub fn new(kind: Kind) -> Error {
		Error { kind }
	}

	pub fn kind(&self) -> &Kind {
		&self.kind
	}
}

/// The kind of an error that can occur.
#[derive(Debug, PartialEq)]
pub enum Kind {
	Database(db::Error),
	/// The running-number generator lost every retry to concurrent writers
	RetriesExhausted { category: String, attempts: u32 },
	UserNotFound(Id),
	UserInactive(Id),
	InstallmentNotFound(Id),
	/// A customer with the same IC or passport already exists
	DuplicateIdentity(String),
	InvalidDate(String),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match &self.kind {
			Kind::Database(e) => write!(f, "db error: {}", e),
			Kind::RetriesExhausted { category, attempts } => {
				write!(f, "generating running number for '{}' failed after {} attempts", category, attempts)
			}
			Kind::UserNotFound(id) => write!(f, "user {} not found", id),
			Kind::UserInactive(id) => write!(f, "user {} account is inactive", id),
			Kind::InstallmentNotFound(id) => write!(f, "installment {} not found", id),
			Kind::DuplicateIdentity(msg) => write!(f, "{}", msg),
			Kind::InvalidDate(msg) => write!(f, "invalid date: {}", msg),
		}
	}
}

impl error::Error for Error {}

impl From<db::Error> for Error {
	fn from(e: db::Error) -> Self {
		Error::new(Kind::Database(e))
	}
}

impl From<diesel::result::Error> for Error {
	fn from(e: diesel::result::Error) -> Self {
		Error::new(Kind::Database(db::Error::from(e)))
	}
}

impl From<diesel::r2d2::PoolError> for Error {
	fn from(e: diesel::r2d2::PoolError) -> Self {
		Error::new(Kind::Database(db::Error::from(e)))
	}
}
