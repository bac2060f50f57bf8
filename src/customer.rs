use diesel::dsl::now;
use diesel::prelude::*;

use crate::db;
use crate::schema::customers;
use crate::types::{Id, Page, Time};

/// Borrower on file. IC and passport identify a person across loans.
#[derive(Queryable, Identifiable, Debug, Clone, PartialEq)]
pub struct Customer {
	pub id: Id,
	pub generate_id: String,
	pub name: String,
	pub email: Option<String>,
	pub ic: Option<String>,
	pub passport: Option<String>,
	pub remark: Option<String>,
	pub created_by: Option<Id>,
	pub created_at: Time,
	pub deleted_at: Option<Time>,
}

#[derive(Insertable)]
#[diesel(table_name = customers)]
pub struct NewCustomer<'a> {
	pub generate_id: &'a str,
	pub name: &'a str,
	pub email: Option<&'a str>,
	pub ic: Option<&'a str>,
	pub passport: Option<&'a str>,
	pub remark: Option<&'a str>,
	pub created_by: Option<Id>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = customers)]
pub struct CustomerChanges<'a> {
	pub name: Option<&'a str>,
	pub email: Option<&'a str>,
	pub ic: Option<&'a str>,
	pub passport: Option<&'a str>,
	pub remark: Option<&'a str>,
}

/// Data store implementation for operating on customers in the database
pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	pub fn create(&self, new_customer: NewCustomer) -> db::Result<Customer> {
		let conn = &mut self.db.get()?;
		diesel::insert_into(customers::table)
			.values(&new_customer)
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_id(&self, id: &Id) -> db::Result<Customer> {
		let conn = &mut self.db.get()?;
		customers::table
			.find(id)
			.first(conn)
			.map_err(Into::into)
	}

	pub fn find_by_ids(&self, ids: &[Id]) -> db::Result<Vec<Customer>> {
		let conn = &mut self.db.get()?;
		customers::table
			.filter(customers::id.eq_any(ids))
			.load(conn)
			.map_err(Into::into)
	}

	pub fn find_by_ic(&self, ic: &str) -> db::Result<Option<Customer>> {
		let conn = &mut self.db.get()?;
		customers::table
			.filter(customers::deleted_at.is_null())
			.filter(customers::ic.eq(ic))
			.first(conn)
			.optional()
			.map_err(Into::into)
	}

	pub fn find_by_passport(&self, passport: &str) -> db::Result<Option<Customer>> {
		let conn = &mut self.db.get()?;
		customers::table
			.filter(customers::deleted_at.is_null())
			.filter(customers::passport.eq(passport))
			.first(conn)
			.optional()
			.map_err(Into::into)
	}

	pub fn update(&self, id: &Id, changes: CustomerChanges) -> db::Result<Customer> {
		let conn = &mut self.db.get()?;
		diesel::update(customers::table.find(id))
			.set(&changes)
			.get_result(conn)
			.map_err(Into::into)
	}

	/// Newest first, optionally filtered by name/email/ic/passport
	pub fn search(&self, page: i64, limit: i64, filter: Option<&str>) -> db::Result<Page<Customer>> {
		let conn = &mut self.db.get()?;

		let data = Self::filtered(filter)
			.order(customers::created_at.desc())
			.offset((page - 1) * limit)
			.limit(limit)
			.load(conn)?;
		let total = Self::filtered(filter)
			.count()
			.get_result(conn)?;

		Ok(Page { data, total, page, limit })
	}

	/// Live customer ids matching the filter, for scoping loan searches
	pub fn matching_ids(&self, filter: &str) -> db::Result<Vec<Id>> {
		let conn = &mut self.db.get()?;
		Self::filtered(Some(filter))
			.select(customers::id)
			.load(conn)
			.map_err(Into::into)
	}

	pub fn soft_delete(&self, id: &Id) -> db::Result<Customer> {
		let conn = &mut self.db.get()?;
		diesel::update(customers::table.find(id))
			.set(customers::deleted_at.eq(now))
			.get_result(conn)
			.map_err(Into::into)
	}

	fn filtered(filter: Option<&str>) -> customers::BoxedQuery<'static, diesel::pg::Pg> {
		let mut query = customers::table
			.filter(customers::deleted_at.is_null())
			.into_boxed();
		if let Some(key) = filter {
			let pattern = format!("%{}%", key);
			query = query.filter(
				customers::name
					.ilike(pattern.clone())
					.or(customers::email.ilike(pattern.clone()))
					.or(customers::ic.ilike(pattern.clone()))
					.or(customers::passport.ilike(pattern)),
			);
		}
		query
	}
}
