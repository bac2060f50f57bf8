use std::io::Write;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::{AsExpression, FromSqlRow};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Varchar;
use strum_macros::{Display, EnumString};

use crate::db;
use crate::schema::installments;
use crate::types::{Date, DateExt, Id, Time};

#[derive(Queryable, Identifiable, Debug, Clone, PartialEq)]
pub struct Installment {
	pub id: Id,
	pub generate_id: String,
	pub loan_id: Id,
	pub installment_date: Date,
	pub due_amount: Option<BigDecimal>,
	pub status: Option<InstallmentStatus>,
	pub receiving_date: Option<Date>,
	pub deleted: bool,
	pub created_at: Time,
}

impl Installment {
	/// The date delinquency is measured against: the recorded receiving
	/// date when one exists, the scheduled date otherwise.
	pub fn reference_date(&self) -> Date {
		self.receiving_date.unwrap_or(self.installment_date)
	}
}

#[derive(AsExpression, FromSqlRow, EnumString, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[diesel(sql_type = Varchar)]
pub enum InstallmentStatus {
	Paid,
	Unpaid,
}

impl ToSql<Varchar, Pg> for InstallmentStatus {
	fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
		out.write_all(self.to_string().as_bytes())?;
		Ok(IsNull::No)
	}
}

impl FromSql<Varchar, Pg> for InstallmentStatus {
	fn from_sql(value: PgValue) -> deserialize::Result<Self> {
		let s = std::str::from_utf8(value.as_bytes())?;
		InstallmentStatus::from_str(s)
			.map_err(|_| format!("unrecognized installment status: {}", s).into())
	}
}

/// Repayment cadence unit, stored on the loan
#[derive(AsExpression, FromSqlRow, EnumString, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[diesel(sql_type = Varchar)]
#[strum(serialize_all = "lowercase")]
pub enum Period {
	Day,
	Week,
	Month,
	Year,
}

impl ToSql<Varchar, Pg> for Period {
	fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
		out.write_all(self.to_string().as_bytes())?;
		Ok(IsNull::No)
	}
}

impl FromSql<Varchar, Pg> for Period {
	fn from_sql(value: PgValue) -> deserialize::Result<Self> {
		let s = std::str::from_utf8(value.as_bytes())?;
		Period::from_str(s).map_err(|_| format!("unrecognized period: {}", s).into())
	}
}

/// Due dates for a repayment plan. The first installment falls one
/// interval after the start date, not on the start date itself.
pub fn schedule(start: Date, unit: Period, interval: u32, term: u32) -> Vec<Date> {
	let mut dates = Vec::with_capacity(term as usize);
	let mut current = start;
	for _ in 0..term {
		current = match unit {
			Period::Day => current.add_days(interval),
			Period::Week => current.add_weeks(interval),
			Period::Month => current.add_months(interval),
			Period::Year => current.add_years(interval),
		};
		dates.push(current);
	}
	dates
}

/// Earliest scheduled date still awaiting payment
pub fn next_due_date(installments: &[Installment]) -> Option<Date> {
	installments
		.iter()
		.filter(|i| !i.deleted && i.status == Some(InstallmentStatus::Unpaid))
		.map(|i| i.installment_date)
		.min()
}

#[derive(Insertable)]
#[diesel(table_name = installments)]
pub struct NewInstallment<'a> {
	pub generate_id: &'a str,
	pub loan_id: Id,
	pub installment_date: Date,
	pub due_amount: Option<BigDecimal>,
	pub status: Option<InstallmentStatus>,
}

/// Data store implementation for operating on installments in the database
pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	pub fn create_batch(&self, new_installments: &[NewInstallment]) -> db::Result<Vec<Installment>> {
		let conn = &mut self.db.get()?;
		diesel::insert_into(installments::table)
			.values(new_installments)
			.get_results(conn)
			.map_err(Into::into)
	}

	pub fn find_by_id(&self, id: &Id) -> db::Result<Installment> {
		let conn = &mut self.db.get()?;
		installments::table
			.find(id)
			.first(conn)
			.map_err(Into::into)
	}

	pub fn find_by_loan(&self, loan_id: &Id) -> db::Result<Vec<Installment>> {
		let conn = &mut self.db.get()?;
		installments::table
			.filter(installments::deleted.eq(false))
			.filter(installments::loan_id.eq(loan_id))
			.order(installments::installment_date.asc())
			.load(conn)
			.map_err(Into::into)
	}

	pub fn find_by_loan_ids(&self, loan_ids: &[Id]) -> db::Result<Vec<Installment>> {
		let conn = &mut self.db.get()?;
		installments::table
			.filter(installments::deleted.eq(false))
			.filter(installments::loan_id.eq_any(loan_ids))
			.load(conn)
			.map_err(Into::into)
	}

	pub fn mark_paid(&self, id: &Id, receiving_date: Date) -> db::Result<Installment> {
		let conn = &mut self.db.get()?;
		diesel::update(installments::table.find(id))
			.set((
				installments::status.eq(InstallmentStatus::Paid),
				installments::receiving_date.eq(receiving_date),
			))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn soft_delete_by_loan(&self, loan_id: &Id) -> db::Result<usize> {
		let conn = &mut self.db.get()?;
		diesel::update(installments::table.filter(installments::loan_id.eq(loan_id)))
			.set(installments::deleted.eq(true))
			.execute(conn)
			.map_err(Into::into)
	}
}
