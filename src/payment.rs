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
use crate::schema::payments;
use crate::types::{Date, Id, Time};

/// Money movement against a loan. `In` rows are repayments, `Out` rows
/// are disbursements.
#[derive(Queryable, Identifiable, Debug, Clone, PartialEq)]
pub struct Payment {
	pub id: Id,
	pub generate_id: String,
	pub loan_id: Id,
	pub installment_id: Option<Id>,
	pub payment_type: PaymentType,
	pub amount: BigDecimal,
	pub balance: Option<BigDecimal>,
	pub account_details: Option<String>,
	pub remarks: Option<String>,
	pub payment_date: Date,
	pub created_by: Option<Id>,
	pub created_at: Time,
}

#[derive(AsExpression, FromSqlRow, EnumString, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[diesel(sql_type = Varchar)]
pub enum PaymentType {
	In,
	Out,
}

impl ToSql<Varchar, Pg> for PaymentType {
	fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
		out.write_all(self.to_string().as_bytes())?;
		Ok(IsNull::No)
	}
}

impl FromSql<Varchar, Pg> for PaymentType {
	fn from_sql(value: PgValue) -> deserialize::Result<Self> {
		let s = std::str::from_utf8(value.as_bytes())?;
		PaymentType::from_str(s).map_err(|_| format!("unrecognized payment type: {}", s).into())
	}
}

#[derive(Insertable)]
#[diesel(table_name = payments)]
pub struct NewPayment<'a> {
	pub generate_id: &'a str,
	pub loan_id: Id,
	pub installment_id: Option<Id>,
	pub payment_type: PaymentType,
	pub amount: BigDecimal,
	pub balance: Option<BigDecimal>,
	pub account_details: Option<&'a str>,
	pub remarks: Option<&'a str>,
	pub payment_date: Date,
	pub created_by: Option<Id>,
}

/// Fields a resubmitted payment row may overwrite
#[derive(AsChangeset)]
#[diesel(table_name = payments)]
pub struct PaymentChanges<'a> {
	pub amount: Option<BigDecimal>,
	pub balance: Option<BigDecimal>,
	pub account_details: Option<&'a str>,
	pub remarks: Option<&'a str>,
	pub payment_date: Option<Date>,
}

/// Data store implementation for operating on payments in the database
pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	pub fn create(&self, new_payment: NewPayment) -> db::Result<Payment> {
		let conn = &mut self.db.get()?;
		diesel::insert_into(payments::table)
			.values(&new_payment)
			.get_result(conn)
			.map_err(Into::into)
	}

	/// Payment rows are keyed by their running number so a resubmitted
	/// batch updates in place instead of duplicating.
	pub fn find_by_generate_id(&self, generate_id: &str) -> db::Result<Option<Payment>> {
		let conn = &mut self.db.get()?;
		payments::table
			.filter(payments::generate_id.eq(generate_id))
			.first(conn)
			.optional()
			.map_err(Into::into)
	}

	pub fn update_by_generate_id(
		&self,
		generate_id: &str,
		changes: PaymentChanges,
	) -> db::Result<Payment> {
		let conn = &mut self.db.get()?;
		diesel::update(payments::table.filter(payments::generate_id.eq(generate_id)))
			.set(&changes)
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_loan(&self, loan_id: &Id) -> db::Result<Vec<Payment>> {
		let conn = &mut self.db.get()?;
		payments::table
			.filter(payments::loan_id.eq(loan_id))
			.order(payments::payment_date.asc())
			.load(conn)
			.map_err(Into::into)
	}

	pub fn find_by_loan_ids(&self, loan_ids: &[Id]) -> db::Result<Vec<Payment>> {
		let conn = &mut self.db.get()?;
		payments::table
			.filter(payments::loan_id.eq_any(loan_ids))
			.load(conn)
			.map_err(Into::into)
	}

	pub fn in_date_range(&self, from: Option<Date>, to: Option<Date>) -> db::Result<Vec<Payment>> {
		let conn = &mut self.db.get()?;
		let mut query = payments::table.into_boxed();
		if let Some(from) = from {
			query = query.filter(payments::payment_date.ge(from));
		}
		if let Some(to) = to {
			query = query.filter(payments::payment_date.le(to));
		}
		query
			.order(payments::payment_date.asc())
			.load(conn)
			.map_err(Into::into)
	}
}
