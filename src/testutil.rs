//! Builders for in-memory model values used across the unit tests

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};

use crate::expense::Expense;
use crate::installment::{Installment, InstallmentStatus};
use crate::payment::{Payment, PaymentType};
use crate::types::{Calendar, Date, Id};
use crate::user::{Role, User};

/// Calendar pinned to a fixed date
pub struct FrozenCalendar {
	today: Date,
}

impl FrozenCalendar {
	pub fn at(year: i32, month: u32, day: u32) -> Self {
		let today = NaiveDate::from_ymd_opt(year, month, day).unwrap();
		FrozenCalendar { today }
	}
}

impl Calendar for FrozenCalendar {
	fn current_date(&self) -> Date {
		self.today
	}
}

/// Deterministic ids for a five-person roster
pub struct RosterIds {
	pub sa: Id,
	pub admin: Id,
	pub lead: Id,
	pub agent_1: Id,
	pub agent_2: Id,
}

impl Default for RosterIds {
	fn default() -> Self {
		RosterIds {
			sa: Id::from_u128(1),
			admin: Id::from_u128(2),
			lead: Id::from_u128(3),
			agent_1: Id::from_u128(4),
			agent_2: Id::from_u128(5),
		}
	}
}

pub fn user_with_id(id: Id, role: Role, supervisor: Option<Id>) -> User {
	User {
		id,
		generate_id: format!("US25{:05}", id.as_u128() as u32),
		name: format!("user-{}", id.as_u128()),
		email: format!("user-{}@example.com", id.as_u128()),
		role,
		supervisor,
		status: true,
		deleted: false,
		created_at: Utc::now(),
	}
}

pub fn installment_due(installment_date: Date) -> Installment {
	Installment {
		id: Id::new_v4(),
		generate_id: "IN2500001".to_string(),
		loan_id: Id::from_u128(10),
		installment_date,
		due_amount: Some(BigDecimal::from(100)),
		status: Some(InstallmentStatus::Unpaid),
		receiving_date: None,
		deleted: false,
		created_at: Utc::now(),
	}
}

pub fn paid_installment(receiving_date: Date) -> Installment {
	Installment {
		status: Some(InstallmentStatus::Paid),
		receiving_date: Some(receiving_date),
		..installment_due(receiving_date)
	}
}

pub fn loan_payment(payment_type: PaymentType, amount: i64) -> Payment {
	loan_payment_on(payment_type, amount, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
}

pub fn loan_payment_on(payment_type: PaymentType, amount: i64, payment_date: Date) -> Payment {
	Payment {
		id: Id::new_v4(),
		generate_id: "PM2500001".to_string(),
		loan_id: Id::from_u128(10),
		installment_id: None,
		payment_type,
		amount: BigDecimal::from(amount),
		balance: None,
		account_details: None,
		remarks: None,
		payment_date,
		created_by: None,
		created_at: Utc::now(),
	}
}

/// An expense row with a single month filled in
pub fn expense_row(year: i16, month: u32, amount: i64) -> Expense {
	let mut expense = Expense {
		id: Id::new_v4(),
		user_id: Id::from_u128(4),
		year,
		jan: BigDecimal::from(0),
		feb: BigDecimal::from(0),
		mar: BigDecimal::from(0),
		apr: BigDecimal::from(0),
		may: BigDecimal::from(0),
		jun: BigDecimal::from(0),
		jul: BigDecimal::from(0),
		aug: BigDecimal::from(0),
		sep: BigDecimal::from(0),
		oct: BigDecimal::from(0),
		nov: BigDecimal::from(0),
		dec: BigDecimal::from(0),
		deleted: false,
		created_at: Utc::now(),
	};
	let amount = BigDecimal::from(amount);
	match month {
		1 => expense.jan = amount,
		2 => expense.feb = amount,
		3 => expense.mar = amount,
		4 => expense.apr = amount,
		5 => expense.may = amount,
		6 => expense.jun = amount,
		7 => expense.jul = amount,
		8 => expense.aug = amount,
		9 => expense.sep = amount,
		10 => expense.oct = amount,
		11 => expense.nov = amount,
		12 => expense.dec = amount,
		_ => {}
	}
	expense
}
