use std::io::Write;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use diesel::deserialize::{self, FromSql};
use diesel::dsl::count_star;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::{AsExpression, FromSqlRow};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Varchar;
use strum_macros::{Display, EnumString};

use crate::db;
use crate::installment::{Installment, InstallmentStatus, Period};
use crate::payment::{Payment, PaymentType};
use crate::schema::loans;
use crate::types::{Date, Id, Page, Time};

#[derive(Queryable, Identifiable, Debug, Clone, PartialEq)]
pub struct Loan {
	pub id: Id,
	pub generate_id: String,
	pub customer_id: Id,
	pub agent_id: Id,
	pub agent_2_id: Option<Id>,
	pub principal_amount: BigDecimal,
	pub deposit_amount: BigDecimal,
	pub application_fee: BigDecimal,
	pub interest: BigDecimal,
	pub unit_of_date: Period,
	pub date_period: i16,
	pub repayment_term: i16,
	pub repayment_date: Date,
	pub loan_date: Date,
	pub status: LoanStatus,
	pub payment_per_term: Option<BigDecimal>,
	pub estimated_profit: Option<BigDecimal>,
	pub actual_profit: Option<BigDecimal>,
	pub remark: Option<String>,
	pub created_by: Id,
	pub created_at: Time,
	pub deleted: bool,
}

impl Loan {
	/// Cash leaving the vault at disbursement time
	pub fn disbursed_amount(&self) -> BigDecimal {
		&self.principal_amount - (&self.deposit_amount + &self.application_fee)
	}
}

/// Loan status is derived from installment/payment state, never set by hand.
/// See [`derive_status`].
#[derive(AsExpression, FromSqlRow, EnumString, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[diesel(sql_type = Varchar)]
pub enum LoanStatus {
	#[strum(serialize = "Normal")]
	Normal,
	#[strum(serialize = "Completed")]
	Completed,
	#[strum(serialize = "Bad Debt")]
	BadDebt,
	#[strum(serialize = "Bad Debt Completed")]
	BadDebtCompleted,
}

impl Default for LoanStatus {
	fn default() -> Self {
		LoanStatus::Normal
	}
}

impl ToSql<Varchar, Pg> for LoanStatus {
	fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
		out.write_all(self.to_string().as_bytes())?;
		Ok(IsNull::No)
	}
}

impl FromSql<Varchar, Pg> for LoanStatus {
	fn from_sql(value: PgValue) -> deserialize::Result<Self> {
		let s = std::str::from_utf8(value.as_bytes())?;
		LoanStatus::from_str(s).map_err(|_| format!("unrecognized loan status: {}", s).into())
	}
}

/// Days an unpaid installment may age before the loan turns delinquent
pub const DELINQUENCY_DAYS: i64 = 14;

/// Recompute a loan's status from its installments and payments.
///
/// Transitions:
/// - received covers the disbursement: `Completed`, or `Bad Debt Completed`
///   when the loan had already gone delinquent;
/// - an unpaid installment more than [`DELINQUENCY_DAYS`] past its reference
///   date turns `Normal` into `Bad Debt`;
/// - everything else keeps its status. Bad debt does not revert by aging.
pub fn derive_status(
	current: LoanStatus,
	installments: &[Installment],
	payments: &[Payment],
	today: Date,
) -> LoanStatus {
	let mut received = BigDecimal::zero();
	let mut disbursed = BigDecimal::zero();
	for payment in payments {
		match payment.payment_type {
			PaymentType::In => received += &payment.amount,
			PaymentType::Out => disbursed += &payment.amount,
		}
	}
	let paid_off = disbursed > BigDecimal::zero() && received >= disbursed;

	let overdue = installments.iter().any(|inst| {
		!inst.deleted
			&& inst.status == Some(InstallmentStatus::Unpaid)
			&& (today - inst.reference_date()).num_days() > DELINQUENCY_DAYS
	});

	match current {
		LoanStatus::BadDebt | LoanStatus::BadDebtCompleted if paid_off => LoanStatus::BadDebtCompleted,
		_ if paid_off => LoanStatus::Completed,
		LoanStatus::Normal if overdue => LoanStatus::BadDebt,
		other => other,
	}
}

#[derive(Insertable)]
#[diesel(table_name = loans)]
pub struct NewLoan<'a> {
	pub generate_id: &'a str,
	pub customer_id: Id,
	pub agent_id: Id,
	pub agent_2_id: Option<Id>,
	pub principal_amount: BigDecimal,
	pub deposit_amount: BigDecimal,
	pub application_fee: BigDecimal,
	pub interest: BigDecimal,
	pub unit_of_date: Period,
	pub date_period: i16,
	pub repayment_term: i16,
	pub repayment_date: Date,
	pub loan_date: Date,
	pub status: LoanStatus,
	pub payment_per_term: Option<BigDecimal>,
	pub estimated_profit: Option<BigDecimal>,
	pub remark: Option<&'a str>,
	pub created_by: Id,
}

/// Parameters for the scoped, paginated loan listing
pub struct ListParams {
	pub page: i64,
	pub limit: i64,
	/// Pattern matched against the loan's own running number
	pub number_filter: Option<String>,
	/// Customers already matched by the text filter
	pub customer_ids: Option<Vec<Id>>,
	/// None means unrestricted (super admin / admin)
	pub visible_to: Option<Vec<Id>>,
}

/// Loan counts per status for one customer
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StatusCounts {
	pub normal: i64,
	pub completed: i64,
	pub bad_debt: i64,
	pub bad_debt_completed: i64,
}

/// Data store implementation for operating on loans in the database
pub struct Repo {
	db: db::PgPool,
}

impl Repo {
	pub fn new(db: db::PgPool) -> Self {
		Repo { db }
	}

	pub fn create(&self, new_loan: NewLoan) -> db::Result<Loan> {
		let conn = &mut self.db.get()?;
		diesel::insert_into(loans::table)
			.values(&new_loan)
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn find_by_id(&self, id: &Id) -> db::Result<Loan> {
		let conn = &mut self.db.get()?;
		loans::table
			.find(id)
			.first(conn)
			.map_err(Into::into)
	}

	pub fn find_by_generate_id(&self, generate_id: &str) -> db::Result<Loan> {
		let conn = &mut self.db.get()?;
		loans::table
			.filter(loans::generate_id.eq(generate_id))
			.filter(loans::deleted.eq(false))
			.first(conn)
			.map_err(Into::into)
	}

	pub fn set_status(&self, id: &Id, status: LoanStatus) -> db::Result<Loan> {
		let conn = &mut self.db.get()?;
		diesel::update(loans::table.find(id))
			.set(loans::status.eq(status))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn set_actual_profit(&self, id: &Id, actual_profit: &BigDecimal) -> db::Result<Loan> {
		let conn = &mut self.db.get()?;
		diesel::update(loans::table.find(id))
			.set(loans::actual_profit.eq(actual_profit))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn soft_delete(&self, id: &Id) -> db::Result<Loan> {
		let conn = &mut self.db.get()?;
		diesel::update(loans::table.find(id))
			.set(loans::deleted.eq(true))
			.get_result(conn)
			.map_err(Into::into)
	}

	pub fn list(&self, params: &ListParams) -> db::Result<Page<Loan>> {
		let conn = &mut self.db.get()?;

		let data = Self::filtered(params)
			.order(loans::created_at.desc())
			.offset((params.page - 1) * params.limit)
			.limit(params.limit)
			.load(conn)?;
		let total = Self::filtered(params)
			.count()
			.get_result(conn)?;

		Ok(Page { data, total, page: params.page, limit: params.limit })
	}

	pub fn by_ids(&self, ids: &[Id]) -> db::Result<Vec<Loan>> {
		let conn = &mut self.db.get()?;
		loans::table
			.filter(loans::id.eq_any(ids))
			.load(conn)
			.map_err(Into::into)
	}

	pub fn by_customer_ids(&self, customer_ids: &[Id]) -> db::Result<Vec<Loan>> {
		let conn = &mut self.db.get()?;
		loans::table
			.filter(loans::deleted.eq(false))
			.filter(loans::customer_id.eq_any(customer_ids))
			.load(conn)
			.map_err(Into::into)
	}

	/// Live loans created by or assigned to any of the given users
	pub fn by_agents(&self, agents: &[Id]) -> db::Result<Vec<Loan>> {
		let conn = &mut self.db.get()?;
		let optional: Vec<Option<Id>> = agents.iter().copied().map(Some).collect();
		loans::table
			.filter(loans::deleted.eq(false))
			.filter(
				loans::created_by
					.eq_any(agents)
					.or(loans::agent_id.eq_any(agents))
					.or(loans::agent_2_id.eq_any(optional)),
			)
			.load(conn)
			.map_err(Into::into)
	}

	pub fn in_date_range(&self, from: Option<Date>, to: Option<Date>) -> db::Result<Vec<Loan>> {
		let conn = &mut self.db.get()?;
		let mut query = loans::table
			.filter(loans::deleted.eq(false))
			.into_boxed();
		if let Some(from) = from {
			query = query.filter(loans::loan_date.ge(from));
		}
		if let Some(to) = to {
			query = query.filter(loans::loan_date.le(to));
		}
		query
			.order(loans::loan_date.asc())
			.load(conn)
			.map_err(Into::into)
	}

	pub fn status_counts(&self, customer_id: &Id) -> db::Result<StatusCounts> {
		let conn = &mut self.db.get()?;
		let rows: Vec<(LoanStatus, i64)> = loans::table
			.filter(loans::deleted.eq(false))
			.filter(loans::customer_id.eq(customer_id))
			.group_by(loans::status)
			.select((loans::status, count_star()))
			.load(conn)?;

		let mut counts = StatusCounts::default();
		for (status, count) in rows {
			match status {
				LoanStatus::Normal => counts.normal = count,
				LoanStatus::Completed => counts.completed = count,
				LoanStatus::BadDebt => counts.bad_debt = count,
				LoanStatus::BadDebtCompleted => counts.bad_debt_completed = count,
			}
		}
		Ok(counts)
	}

	fn filtered(params: &ListParams) -> loans::BoxedQuery<'static, Pg> {
		let mut query = loans::table
			.filter(loans::deleted.eq(false))
			.into_boxed();

		if let Some(visible) = &params.visible_to {
			let optional: Vec<Option<Id>> = visible.iter().copied().map(Some).collect();
			query = query.filter(
				loans::created_by
					.eq_any(visible.clone())
					.or(loans::agent_id.eq_any(visible.clone()))
					.or(loans::agent_2_id.eq_any(optional)),
			);
		}

		match (&params.number_filter, &params.customer_ids) {
			(Some(filter), Some(customer_ids)) => {
				let pattern = format!("%{}%", filter);
				query = query.filter(
					loans::generate_id
						.ilike(pattern)
						.or(loans::customer_id.eq_any(customer_ids.clone())),
				);
			}
			(Some(filter), None) => {
				let pattern = format!("%{}%", filter);
				query = query.filter(loans::generate_id.ilike(pattern));
			}
			_ => {}
		}

		query
	}
}
