use std::collections::HashMap;

use bigdecimal::{BigDecimal, Zero};
use chrono::Datelike;
use serde::Serialize;

use crate::customer::{self, Customer};
use crate::error::{Error, Kind, Result};
use crate::expense::{self, Expense};
use crate::installment::{self, Installment};
use crate::loan::{self, Loan};
use crate::payment::{self, Payment, PaymentType};
use crate::types::{Date, Id};
use crate::user::{self, User};

/// Read-only aggregation over the lending data for the monthly reports
pub struct Service<'a> {
	users: &'a user::Repo,
	customers: &'a customer::Repo,
	loans: &'a loan::Repo,
	installments: &'a installment::Repo,
	payments: &'a payment::Repo,
	expenses: &'a expense::Repo,
}

/// Date windows for the loan report: which loans to include and which
/// payments count toward the received total
pub struct LoanReportRange {
	pub loan_from: Option<Date>,
	pub loan_to: Option<Date>,
	pub payment_from: Option<Date>,
	pub payment_to: Option<Date>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LoanReportRow {
	pub loan_number: String,
	pub customer_name: String,
	pub agent_name: String,
	pub loan_date: Date,
	pub principal_amount: BigDecimal,
	pub deposit_amount: BigDecimal,
	/// Principal less deposit, the amount that actually went out
	pub out_amount: BigDecimal,
	pub next_installment_date: Option<Date>,
	pub next_installment_amount: Option<BigDecimal>,
	pub total_in: BigDecimal,
	pub estimated_profit: Option<BigDecimal>,
	pub actual_profit: Option<BigDecimal>,
	pub status: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PaymentReportRow {
	pub payment_number: String,
	pub loan_number: String,
	pub customer_name: String,
	pub agent_name: String,
	pub in_amount: Option<BigDecimal>,
	pub out_amount: Option<BigDecimal>,
	pub account_details: Option<String>,
	pub remarks: Option<String>,
	pub payment_date: Date,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PaymentReport {
	pub rows: Vec<PaymentReportRow>,
	pub total_in: BigDecimal,
	pub total_out: BigDecimal,
}

/// Cumulative totals carried across the months of a performance report
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct RunningTotals {
	pub total_in: BigDecimal,
	pub total_out: BigDecimal,
	pub balance: BigDecimal,
	pub expense: BigDecimal,
	pub final_balance: BigDecimal,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MonthlyBreakdown {
	/// Formatted `YYYY-MM`
	pub month: String,
	pub total_in: BigDecimal,
	pub total_out: BigDecimal,
	pub balance: BigDecimal,
	pub expense: BigDecimal,
	pub final_balance: BigDecimal,
	pub summary: RunningTotals,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AgentPerformance {
	pub agent_id: Id,
	pub agent_name: String,
	pub months: Vec<MonthlyBreakdown>,
}

impl<'a> Service<'a> {
	pub fn new(
		users: &'a user::Repo,
		customers: &'a customer::Repo,
		loans: &'a loan::Repo,
		installments: &'a installment::Repo,
		payments: &'a payment::Repo,
		expenses: &'a expense::Repo,
	) -> Self {
		Service { users, customers, loans, installments, payments, expenses }
	}

	/// Loans disbursed in the range, with the money received against each
	/// and the next outstanding installment
	pub fn loan_report(&self, range: &LoanReportRange) -> Result<Vec<LoanReportRow>> {
		let loans = self.loans.in_date_range(range.loan_from, range.loan_to)?;
		let loan_ids: Vec<Id> = loans.iter().map(|l| l.id).collect();

		let customer_names = self.customer_names(&loans)?;
		let agent_names = self.agent_names(&loans)?;

		let mut received: HashMap<Id, BigDecimal> = HashMap::new();
		for payment in self.payments.find_by_loan_ids(&loan_ids)? {
			if payment.payment_type != PaymentType::In {
				continue;
			}
			if !within(payment.payment_date, range.payment_from, range.payment_to) {
				continue;
			}
			*received.entry(payment.loan_id).or_default() += &payment.amount;
		}

		let mut schedule_by_loan: HashMap<Id, Vec<Installment>> = HashMap::new();
		for inst in self.installments.find_by_loan_ids(&loan_ids)? {
			schedule_by_loan.entry(inst.loan_id).or_default().push(inst);
		}

		Ok(loans
			.into_iter()
			.map(|loan| {
				let schedule = schedule_by_loan.remove(&loan.id).unwrap_or_default();
				let next_installment_date = installment::next_due_date(&schedule);
				let next_installment_amount = next_installment_date.and_then(|date| {
					schedule
						.iter()
						.find(|i| i.installment_date == date)
						.and_then(|i| i.due_amount.clone())
				});

				LoanReportRow {
					customer_name: customer_names.get(&loan.customer_id).cloned().unwrap_or_default(),
					agent_name: agent_names.get(&loan.agent_id).cloned().unwrap_or_default(),
					loan_date: loan.loan_date,
					out_amount: &loan.principal_amount - &loan.deposit_amount,
					principal_amount: loan.principal_amount,
					deposit_amount: loan.deposit_amount,
					next_installment_date,
					next_installment_amount,
					total_in: received.remove(&loan.id).unwrap_or_default(),
					estimated_profit: loan.estimated_profit,
					actual_profit: loan.actual_profit,
					status: loan.status.to_string(),
					loan_number: loan.generate_id,
				}
			})
			.collect())
	}

	/// Every payment in the range, flattened with loan, customer and agent
	/// context, plus in/out totals
	pub fn payment_report(&self, from: Option<Date>, to: Option<Date>) -> Result<PaymentReport> {
		let payments = self.payments.in_date_range(from, to)?;
		let loan_ids: Vec<Id> = payments.iter().map(|p| p.loan_id).collect();
		let loans = self.loans.by_ids(&loan_ids)?;

		let customer_names = self.customer_names(&loans)?;
		let agent_names = self.agent_names(&loans)?;
		let by_loan: HashMap<Id, &Loan> = loans.iter().map(|l| (l.id, l)).collect();

		let mut total_in = BigDecimal::zero();
		let mut total_out = BigDecimal::zero();
		let rows = payments
			.into_iter()
			.map(|payment| {
				let (in_amount, out_amount) = match payment.payment_type {
					PaymentType::In => {
						total_in += &payment.amount;
						(Some(payment.amount), None)
					}
					PaymentType::Out => {
						total_out += &payment.amount;
						(None, Some(payment.amount))
					}
				};
				let loan = by_loan.get(&payment.loan_id);
				PaymentReportRow {
					payment_number: payment.generate_id,
					loan_number: loan.map(|l| l.generate_id.clone()).unwrap_or_default(),
					customer_name: loan
						.and_then(|l| customer_names.get(&l.customer_id).cloned())
						.unwrap_or_default(),
					agent_name: loan
						.and_then(|l| agent_names.get(&l.agent_id).cloned())
						.unwrap_or_default(),
					in_amount,
					out_amount,
					account_details: payment.account_details,
					remarks: payment.remarks,
					payment_date: payment.payment_date,
				}
			})
			.collect();

		Ok(PaymentReport { rows, total_in, total_out })
	}

	/// Month-by-month cash movement per agent across the range, expenses
	/// deducted, with cumulative totals alongside each month
	pub fn agent_performance(
		&self,
		agent_ids: &[Id],
		from: Date,
		to: Date,
	) -> Result<Vec<AgentPerformance>> {
		if from > to {
			return Err(Error::new(Kind::InvalidDate(format!(
				"range start {} is after its end {}",
				from, to,
			))));
		}

		let months = month_span(from, to);
		let years: Vec<i16> = {
			let mut years: Vec<i16> = months.iter().map(|(y, _)| *y as i16).collect();
			years.dedup();
			years
		};

		let agents = self.users.find_by_ids(agent_ids)?;
		let expense_rows = self.expenses.find_for_users_years(agent_ids, &years)?;

		agents
			.into_iter()
			.map(|agent| {
				let loans = self.loans.by_agents(&[agent.id])?;
				let loan_ids: Vec<Id> = loans.iter().map(|l| l.id).collect();
				let payments = self.payments.find_by_loan_ids(&loan_ids)?;
				let expenses: Vec<&Expense> =
					expense_rows.iter().filter(|e| e.user_id == agent.id).collect();

				let breakdown = monthly_breakdown(&months, &payments, &expenses);
				Ok(AgentPerformance {
					agent_id: agent.id,
					agent_name: agent.name,
					months: breakdown,
				})
			})
			.collect()
	}

	fn customer_names(&self, loans: &[Loan]) -> Result<HashMap<Id, String>> {
		let ids: Vec<Id> = loans.iter().map(|l| l.customer_id).collect();
		let names = self
			.customers
			.find_by_ids(&ids)?
			.into_iter()
			.map(|c: Customer| (c.id, c.name))
			.collect();
		Ok(names)
	}

	fn agent_names(&self, loans: &[Loan]) -> Result<HashMap<Id, String>> {
		let ids: Vec<Id> = loans.iter().map(|l| l.agent_id).collect();
		let names = self
			.users
			.find_by_ids(&ids)?
			.into_iter()
			.map(|u: User| (u.id, u.name))
			.collect();
		Ok(names)
	}
}

fn within(date: Date, from: Option<Date>, to: Option<Date>) -> bool {
	from.map_or(true, |f| date >= f) && to.map_or(true, |t| date <= t)
}

fn monthly_breakdown(
	months: &[(i32, u32)],
	payments: &[Payment],
	expenses: &[&Expense],
) -> Vec<MonthlyBreakdown> {
	let mut summary = RunningTotals::default();

	months
		.iter()
		.map(|&(year, month)| {
			let mut total_in = BigDecimal::zero();
			let mut total_out = BigDecimal::zero();
			for payment in payments {
				if payment.payment_date.year() != year || payment.payment_date.month() != month {
					continue;
				}
				match payment.payment_type {
					PaymentType::In => total_in += &payment.amount,
					PaymentType::Out => total_out += &payment.amount,
				}
			}

			let expense: BigDecimal = expenses
				.iter()
				.filter(|e| e.year as i32 == year)
				.map(|e| e.amount_for_month(month))
				.sum();

			let balance = &total_in - &total_out;
			let final_balance = &balance - &expense;

			summary.total_in += &total_in;
			summary.total_out += &total_out;
			summary.balance += &balance;
			summary.expense += &expense;
			summary.final_balance += &final_balance;

			MonthlyBreakdown {
				month: format!("{:04}-{:02}", year, month),
				total_in,
				total_out,
				balance,
				expense,
				final_balance,
				summary: summary.clone(),
			}
		})
		.collect()
}

/// Every (year, month) pair from `from`'s month through `to`'s month
fn month_span(from: Date, to: Date) -> Vec<(i32, u32)> {
	let mut months = Vec::new();
	let (mut year, mut month) = (from.year(), from.month());
	let end = (to.year(), to.month());
	loop {
		months.push((year, month));
		if (year, month) == end {
			break;
		}
		if month == 12 {
			year += 1;
			month = 1;
		} else {
			month += 1;
		}
	}
	months
}
