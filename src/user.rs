use std::io::Write;
use std::str::FromStr;

use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::{AsExpression, FromSqlRow};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Varchar;
use strum_macros::{Display, EnumString};

use crate::db;
use crate::schema::users;
use crate::types::{Id, Time};

/// Back-office operator: agents originate loans, leads supervise agents,
/// admins supervise leads
#[derive(Queryable, Identifiable, Debug, Clone, PartialEq)]
pub struct User {
	pub id: Id,
	pub generate_id: String,
	pub name: String,
	pub email: String,
	pub role: Role,
	pub supervisor: Option<Id>,
	pub status: bool,
	pub deleted: bool,
	pub created_at: Time,
}

impl User {
	pub fn is_active(&self) -> bool {
		self.status && !self.deleted
	}
}

#[derive(AsExpression, FromSqlRow, EnumString, Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[diesel(sql_type = Varchar)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
	SuperAdmin,
	Admin,
	Lead,
	Agent,
}

impl ToSql<Varchar, Pg> for Role {
	fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
		out.write_all(self.to_string().as_bytes())?;
		Ok(IsNull::No)
	}
}

impl FromSql<Varchar, Pg> for Role {
	fn from_sql(value: PgValue) -> deserialize::Result<Self> {
		let s = std::str::from_utf8(value.as_bytes())?;
		Role::from_str(s).map_err(|_| format!("unrecognized role: {}", s).into())
	}
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
	pub generate_id: &'a str,
	pub name: &'a str,
	pub email: &'a str,
	pub role: Role,
	pub supervisor: Option<Id>,
	pub status: bool,
}

/// Data store implementation for operating on users in the database
pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	pub fn create(&self, new_user: NewUser) -> db::Result<User> {
		let conn = &mut self.db.get()?;
		diesel::insert_into(users::table)
			.values(&new_user)
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_id(&self, id: &Id) -> db::Result<User> {
		let conn = &mut self.db.get()?;
		users::table
			.find(id)
			.first(conn)
			.map_err(Into::into)
	}

	pub fn find_by_email(&self, email: &str) -> db::Result<User> {
		let conn = &mut self.db.get()?;
		users::table
			.filter(users::email.eq(email))
			.first(conn)
			.map_err(Into::into)
	}

	/// Every user that is neither deleted nor deactivated.
	/// The hierarchy walks operate over this roster.
	pub fn list_active(&self) -> db::Result<Vec<User>> {
		let conn = &mut self.db.get()?;
		users::table
			.filter(users::deleted.eq(false))
			.filter(users::status.eq(true))
			.load(conn)
			.map_err(Into::into)
	}

	pub fn find_by_ids(&self, ids: &[Id]) -> db::Result<Vec<User>> {
		let conn = &mut self.db.get()?;
		users::table
			.filter(users::id.eq_any(ids))
			.load(conn)
			.map_err(Into::into)
	}

	pub fn search(&self, key: &str) -> db::Result<Vec<User>> {
		let conn = &mut self.db.get()?;
		let pattern = format!("%{}%", key);
		users::table
			.filter(users::deleted.eq(false))
			.filter(users::name.ilike(pattern.clone()).or(users::email.ilike(pattern)))
			.order(users::name.asc())
			.load(conn)
			.map_err(Into::into)
	}
}
