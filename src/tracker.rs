use std::thread;
use std::time::Duration;

use chrono::Datelike;
use diesel::prelude::*;
use log::warn;

use crate::db;
use crate::error::{Error, Kind, Result};
use crate::schema::trackers;
use crate::types::{Calendar, Id};

/// Counter row backing the running-number sequence for one (category, year)
#[derive(Queryable, Identifiable, Debug, PartialEq)]
pub struct Tracker {
	pub id: Id,
	pub category: String,
	pub year: i16,
	pub last_number: i32,
}

#[derive(Insertable)]
#[diesel(table_name = trackers)]
struct NewTracker<'a> {
	category: &'a str,
	year: i16,
	last_number: i32,
}

/// Storage operations the running-number generator needs.
///
/// The conditional update is the whole trick: a writer only advances the
/// counter if nobody else advanced it since the read, so a number is never
/// issued twice.
pub trait CounterStore {
	fn find(&self, category: &str, year: i16) -> db::Result<Option<(Id, i32)>>;

	/// Insert the first counter row for (category, year) with value 1.
	/// Returns false when a concurrent writer created the row first.
	fn insert_first(&self, category: &str, year: i16) -> db::Result<bool>;

	/// Advance the counter only if it still holds `expected`.
	/// Returns false when the guard no longer matches.
	fn compare_and_swap(&self, id: &Id, expected: i32, next: i32) -> db::Result<bool>;
}

/// Data store implementation for operating on trackers in the database
pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}
}

impl CounterStore for Repo {
	fn find(&self, category: &str, year: i16) -> db::Result<Option<(Id, i32)>> {
		let conn = &mut self.db.get()?;
		trackers::table
			.filter(trackers::category.eq(category))
			.filter(trackers::year.eq(year))
			.select((trackers::id, trackers::last_number))
			.first(conn)
			.optional()
			.map_err(Into::into)
	}

	fn insert_first(&self, category: &str, year: i16) -> db::Result<bool> {
		let conn = &mut self.db.get()?;
		let inserted = diesel::insert_into(trackers::table)
			.values(NewTracker { category, year, last_number: 1 })
			.on_conflict((trackers::category, trackers::year))
			.do_nothing()
			.execute(conn)?;
		Ok(inserted == 1)
	}

	fn compare_and_swap(&self, id: &Id, expected: i32, next: i32) -> db::Result<bool> {
		let conn = &mut self.db.get()?;
		let updated = diesel::update(trackers::table)
			.filter(trackers::id.eq(id))
			.filter(trackers::last_number.eq(expected))
			.set(trackers::last_number.eq(next))
			.execute(conn)?;
		Ok(updated == 1)
	}
}

pub const MAX_ATTEMPTS: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_millis(20);

/// Generates human-readable sequential identifiers like `CT2500001`,
/// scoped to a category and the calendar year
pub struct Generator<'a> {
	store: &'a dyn CounterStore,
	calendar: &'a dyn Calendar,
}

impl<'a> Generator<'a> {
	pub fn new(store: &'a dyn CounterStore, calendar: &'a dyn Calendar) -> Self {
		Generator { store, calendar }
	}

	/// Issue the next number for `category`, formatted `{CATEGORY}{YY}{NNNNN}`.
	///
	/// Losing a compare-and-swap race means another writer took the number;
	/// the read/advance cycle is retried up to `MAX_ATTEMPTS` times before
	/// giving up.
	pub fn generate(&self, category: &str) -> Result<String> {
		let category = category.to_uppercase();
		let year = (self.calendar.current_date().year() % 100) as i16;

		for attempt in 1..=MAX_ATTEMPTS {
			match self.store.find(&category, year)? {
				None => {
					if self.store.insert_first(&category, year)? {
						return Ok(format_number(&category, year, 1));
					}
				}
				Some((id, last)) => {
					let next = last + 1;
					if self.store.compare_and_swap(&id, last, next)? {
						return Ok(format_number(&category, year, next));
					}
				}
			}

			warn!(
				"running number conflict on {}{:02}, attempt {}/{}",
				category, year, attempt, MAX_ATTEMPTS,
			);
			if attempt < MAX_ATTEMPTS {
				thread::sleep(RETRY_DELAY);
			}
		}

		Err(Error::new(Kind::RetriesExhausted { category, attempts: MAX_ATTEMPTS }))
	}
}

fn format_number(category: &str, year: i16, number: i32) -> String {
	format!("{}{:02}{:05}", category, year, number)
}
