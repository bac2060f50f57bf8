use bigdecimal::{BigDecimal, Zero};
use diesel::prelude::*;

use crate::db;
use crate::schema::expenses;
use crate::types::{Id, Time};

/// Operating costs a user books against a calendar year, one column
/// per month
#[derive(Queryable, Identifiable, Debug, Clone, PartialEq)]
pub struct Expense {
	pub id: Id,
	pub user_id: Id,
	pub year: i16,
	pub jan: BigDecimal,
	pub feb: BigDecimal,
	pub mar: BigDecimal,
	pub apr: BigDecimal,
	pub may: BigDecimal,
	pub jun: BigDecimal,
	pub jul: BigDecimal,
	pub aug: BigDecimal,
	pub sep: BigDecimal,
	pub oct: BigDecimal,
	pub nov: BigDecimal,
	pub dec: BigDecimal,
	pub deleted: bool,
	pub created_at: Time,
}

impl Expense {
	/// Amount booked for a 1-based month number
	pub fn amount_for_month(&self, month: u32) -> BigDecimal {
		match month {
			1 => self.jan.clone(),
			2 => self.feb.clone(),
			3 => self.mar.clone(),
			4 => self.apr.clone(),
			5 => self.may.clone(),
			6 => self.jun.clone(),
			7 => self.jul.clone(),
			8 => self.aug.clone(),
			9 => self.sep.clone(),
			10 => self.oct.clone(),
			11 => self.nov.clone(),
			12 => self.dec.clone(),
			_ => BigDecimal::zero(),
		}
	}
}

#[derive(Insertable)]
#[diesel(table_name = expenses)]
pub struct NewExpense {
	pub user_id: Id,
	pub year: i16,
}

/// Month columns an update may overwrite
#[derive(AsChangeset, Default)]
#[diesel(table_name = expenses)]
pub struct ExpenseChanges {
	pub jan: Option<BigDecimal>,
	pub feb: Option<BigDecimal>,
	pub mar: Option<BigDecimal>,
	pub apr: Option<BigDecimal>,
	pub may: Option<BigDecimal>,
	pub jun: Option<BigDecimal>,
	pub jul: Option<BigDecimal>,
	pub aug: Option<BigDecimal>,
	pub sep: Option<BigDecimal>,
	pub oct: Option<BigDecimal>,
	pub nov: Option<BigDecimal>,
	pub dec: Option<BigDecimal>,
}

/// Data store implementation for operating on expenses in the database
pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	pub fn create(&self, new_expense: NewExpense) -> db::Result<Expense> {
		let conn = &mut self.db.get()?;
		diesel::insert_into(expenses::table)
			.values(&new_expense)
			.get_result(conn)
			.map_err(Into::into)
	}

	/// The user's expense row for a year, created with zeroed months when
	/// it does not exist yet
	pub fn find_or_create(&self, user_id: &Id, year: i16) -> db::Result<Expense> {
		match self.find_for_year(user_id, year)? {
			Some(expense) => Ok(expense),
			None => self.create(NewExpense { user_id: *user_id, year }),
		}
	}

	/// Live rows for a year, newest first
	pub fn list_for_year(&self, year: i16) -> db::Result<Vec<Expense>> {
		let conn = &mut self.db.get()?;
		expenses::table
			.filter(expenses::deleted.eq(false))
			.filter(expenses::year.eq(year))
			.order(expenses::created_at.desc())
			.load(conn)
			.map_err(Into::into)
	}

	pub fn find_for_year(&self, user_id: &Id, year: i16) -> db::Result<Option<Expense>> {
		let conn = &mut self.db.get()?;
		expenses::table
			.filter(expenses::deleted.eq(false))
			.filter(expenses::user_id.eq(user_id))
			.filter(expenses::year.eq(year))
			.first(conn)
			.optional()
			.map_err(Into::into)
	}

	pub fn update(&self, id: &Id, changes: ExpenseChanges) -> db::Result<Expense> {
		let conn = &mut self.db.get()?;
		diesel::update(expenses::table.find(id))
			.set(&changes)
			.get_result(conn)
			.map_err(Into::into)
	}

	/// Expense rows for the given users across the given years, for
	/// performance reporting
	pub fn find_for_users_years(&self, user_ids: &[Id], years: &[i16]) -> db::Result<Vec<Expense>> {
		let conn = &mut self.db.get()?;
		expenses::table
			.filter(expenses::deleted.eq(false))
			.filter(expenses::user_id.eq_any(user_ids))
			.filter(expenses::year.eq_any(years))
			.load(conn)
			.map_err(Into::into)
	}
}
