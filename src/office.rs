use std::collections::HashMap;

use bigdecimal::BigDecimal;
use log::info;

use crate::customer::{self, Customer, NewCustomer};
use crate::db;
use crate::error::{Error, Kind, Result};
use crate::hierarchy;
use crate::installment::{self, Installment, InstallmentStatus, NewInstallment, Period};
use crate::loan::{self, derive_status, ListParams, Loan, LoanStatus, NewLoan};
use crate::payment::{self, NewPayment, Payment, PaymentChanges, PaymentType};
use crate::tracker::{CounterStore, Generator};
use crate::types::{Calendar, Date, Id, Page};
use crate::user::{self, Role};

const CUSTOMER_CATEGORY: &str = "CT";
const LOAN_CATEGORY: &str = "LN";
const INSTALLMENT_CATEGORY: &str = "IN";
const PAYMENT_CATEGORY: &str = "PM";

const DISBURSEMENT_DETAILS: &str = "Loan Disbursement";

pub struct NewService<'a> {
	pub counters: &'a dyn CounterStore,
	pub users: &'a user::Repo,
	pub customers: &'a customer::Repo,
	pub loans: &'a loan::Repo,
	pub installments: &'a installment::Repo,
	pub payments: &'a payment::Repo,
	pub calendar: &'a dyn Calendar,
}

/// The lending workflows: onboarding customers, originating loans,
/// recording payments and keeping loan status in line with them
pub struct Service<'a> {
	counters: &'a dyn CounterStore,
	users: &'a user::Repo,
	customers: &'a customer::Repo,
	loans: &'a loan::Repo,
	installments: &'a installment::Repo,
	payments: &'a payment::Repo,
	calendar: &'a dyn Calendar,
}

pub struct RegisterCustomer<'a> {
	pub name: &'a str,
	pub email: Option<&'a str>,
	pub ic: Option<&'a str>,
	pub passport: Option<&'a str>,
	pub remark: Option<&'a str>,
	pub created_by: Option<Id>,
}

pub struct CreateLoan<'a> {
	pub customer_id: Id,
	pub agent_id: Id,
	pub agent_2_id: Option<Id>,
	pub principal_amount: BigDecimal,
	pub deposit_amount: BigDecimal,
	pub application_fee: BigDecimal,
	pub interest: BigDecimal,
	pub unit_of_date: Period,
	pub date_period: u32,
	pub repayment_term: u32,
	pub loan_date: Date,
	pub payment_per_term: Option<BigDecimal>,
	pub estimated_profit: Option<BigDecimal>,
	pub remark: Option<&'a str>,
	pub created_by: Id,
}

/// Everything written when a loan is originated
pub struct LoanBundle {
	pub loan: Loan,
	pub installments: Vec<Installment>,
	pub disbursement: Payment,
}

pub struct RecordPayment<'a> {
	/// Resubmitting with the same number updates the earlier row
	pub generate_id: Option<&'a str>,
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

/// A loan row for listings, annotated with its next outstanding due date
pub struct LoanSummary {
	pub loan: Loan,
	pub next_due_date: Option<Date>,
}

/// A customer row for listings, annotated with loan counts per status
pub struct CustomerSummary {
	pub customer: Customer,
	pub loan_counts: loan::StatusCounts,
}

impl<'a> Service<'a> {
	pub fn new(params: NewService<'a>) -> Self {
		Service {
			counters: params.counters,
			users: params.users,
			customers: params.customers,
			loans: params.loans,
			installments: params.installments,
			payments: params.payments,
			calendar: params.calendar,
		}
	}

	fn generator(&self) -> Generator<'_> {
		Generator::new(self.counters, self.calendar)
	}

	/// Register a borrower. IC and passport numbers identify a person, so a
	/// live customer holding either one blocks the registration.
	pub fn register_customer(&self, request: RegisterCustomer) -> Result<Customer> {
		if let Some(ic) = request.ic {
			if self.customers.find_by_ic(ic)?.is_some() {
				return Err(Error::new(Kind::DuplicateIdentity(format!(
					"customer with IC {} already exists",
					ic,
				))));
			}
		}
		if let Some(passport) = request.passport {
			if self.customers.find_by_passport(passport)?.is_some() {
				return Err(Error::new(Kind::DuplicateIdentity(format!(
					"customer with passport {} already exists",
					passport,
				))));
			}
		}

		let number = self.generator().generate(CUSTOMER_CATEGORY)?;
		let customer = self.customers.create(NewCustomer {
			generate_id: &number,
			name: request.name,
			email: request.email,
			ic: request.ic,
			passport: request.passport,
			remark: request.remark,
			created_by: request.created_by,
		})?;
		info!("registered customer {} ({})", customer.generate_id, customer.name);
		Ok(customer)
	}

	pub fn customer_loan_counts(&self, customer_id: &Id) -> Result<loan::StatusCounts> {
		self.loans.status_counts(customer_id).map_err(Into::into)
	}

	/// Paginated customer listing, each row annotated with that customer's
	/// loan counts per status
	pub fn list_customers(
		&self,
		page: i64,
		limit: i64,
		filter: Option<&str>,
	) -> Result<Page<CustomerSummary>> {
		let listed = self.customers.search(page, limit, filter)?;
		let data = listed
			.data
			.into_iter()
			.map(|customer| {
				let loan_counts = self.loans.status_counts(&customer.id)?;
				Ok(CustomerSummary { customer, loan_counts })
			})
			.collect::<Result<_>>()?;
		Ok(Page { data, total: listed.total, page: listed.page, limit: listed.limit })
	}

	/// Originate a loan: one loan row, `repayment_term` installment rows and
	/// the disbursement payment, each carrying a pre-generated running number.
	///
	/// The writes are sequential and independent. A failure partway through
	/// leaves earlier rows in place for the operator to clean up.
	pub fn create_loan(&self, request: CreateLoan) -> Result<LoanBundle> {
		let generator = self.generator();
		let loan_number = generator.generate(LOAN_CATEGORY)?;
		let installment_numbers: Vec<String> = (0..request.repayment_term)
			.map(|_| generator.generate(INSTALLMENT_CATEGORY))
			.collect::<Result<_>>()?;
		let payment_number = generator.generate(PAYMENT_CATEGORY)?;

		let dates = installment::schedule(
			request.loan_date,
			request.unit_of_date,
			request.date_period,
			request.repayment_term,
		);
		let repayment_date = match dates.first() {
			Some(first) => *first,
			None => {
				return Err(Error::new(Kind::InvalidDate(format!(
					"repayment term of {} produces no installments",
					request.repayment_term,
				))))
			}
		};

		let loan = self.loans.create(NewLoan {
			generate_id: &loan_number,
			customer_id: request.customer_id,
			agent_id: request.agent_id,
			agent_2_id: request.agent_2_id,
			principal_amount: request.principal_amount.clone(),
			deposit_amount: request.deposit_amount.clone(),
			application_fee: request.application_fee.clone(),
			interest: request.interest.clone(),
			unit_of_date: request.unit_of_date,
			date_period: request.date_period as i16,
			repayment_term: request.repayment_term as i16,
			repayment_date,
			loan_date: request.loan_date,
			status: LoanStatus::default(),
			payment_per_term: request.payment_per_term.clone(),
			estimated_profit: request.estimated_profit.clone(),
			remark: request.remark,
			created_by: request.created_by,
		})?;

		let new_installments: Vec<NewInstallment> = dates
			.iter()
			.zip(&installment_numbers)
			.map(|(date, number)| NewInstallment {
				generate_id: number,
				loan_id: loan.id,
				installment_date: *date,
				due_amount: request.payment_per_term.clone(),
				status: Some(InstallmentStatus::Unpaid),
			})
			.collect();
		let installments = self.installments.create_batch(&new_installments)?;

		let disbursement = self.payments.create(NewPayment {
			generate_id: &payment_number,
			loan_id: loan.id,
			installment_id: None,
			payment_type: PaymentType::Out,
			amount: loan.disbursed_amount(),
			balance: Some(&loan.principal_amount - &loan.deposit_amount),
			account_details: Some(DISBURSEMENT_DETAILS),
			remarks: None,
			payment_date: loan.loan_date,
			created_by: Some(request.created_by),
		})?;

		info!(
			"originated loan {} for customer {} with {} installments",
			loan.generate_id,
			loan.customer_id,
			installments.len(),
		);
		Ok(LoanBundle { loan, installments, disbursement })
	}

	/// Record one payment and bring the loan's status up to date.
	///
	/// A payment resubmitted under a number already on file updates that row
	/// instead of inserting a duplicate.
	pub fn record_payment(&self, request: RecordPayment) -> Result<Payment> {
		if let Some(installment_id) = request.installment_id {
			match self.installments.find_by_id(&installment_id) {
				Ok(_) => {}
				Err(db::Error::RecordNotFound) => {
					return Err(Error::new(Kind::InstallmentNotFound(installment_id)))
				}
				Err(e) => return Err(e.into()),
			}
		}

		let payment = match request.generate_id {
			Some(number) if self.payments.find_by_generate_id(number)?.is_some() => {
				self.payments.update_by_generate_id(
					number,
					PaymentChanges {
						amount: Some(request.amount.clone()),
						balance: request.balance.clone(),
						account_details: request.account_details,
						remarks: request.remarks,
						payment_date: Some(request.payment_date),
					},
				)?
			}
			provided => {
				let number = match provided {
					Some(number) => number.to_string(),
					None => self.generator().generate(PAYMENT_CATEGORY)?,
				};
				self.payments.create(NewPayment {
					generate_id: &number,
					loan_id: request.loan_id,
					installment_id: request.installment_id,
					payment_type: request.payment_type,
					amount: request.amount.clone(),
					balance: request.balance.clone(),
					account_details: request.account_details,
					remarks: request.remarks,
					payment_date: request.payment_date,
					created_by: request.created_by,
				})?
			}
		};

		if let Some(installment_id) = request.installment_id {
			if request.payment_type == PaymentType::In {
				self.installments.mark_paid(&installment_id, request.payment_date)?;
			}
		}

		self.reconcile(&request.loan_id)?;
		Ok(payment)
	}

	pub fn record_payments(&self, requests: Vec<RecordPayment>) -> Result<Vec<Payment>> {
		requests.into_iter().map(|r| self.record_payment(r)).collect()
	}

	/// Recompute the loan's derived status from its installments and
	/// payments, persisting only when it changed
	pub fn reconcile(&self, loan_id: &Id) -> Result<Loan> {
		let loan = self.loans.find_by_id(loan_id)?;
		let installments = self.installments.find_by_loan(loan_id)?;
		let payments = self.payments.find_by_loan(loan_id)?;

		let next = derive_status(loan.status, &installments, &payments, self.calendar.current_date());
		if next == loan.status {
			return Ok(loan);
		}

		info!("loan {} status {} -> {}", loan.generate_id, loan.status, next);
		self.loans.set_status(loan_id, next).map_err(Into::into)
	}

	/// Loans the requester may see, newest first. Admin roles see everything;
	/// leads and agents are scoped to loans touching their hierarchy.
	pub fn list_loans(
		&self,
		requester_id: &Id,
		page: i64,
		limit: i64,
		filter: Option<&str>,
	) -> Result<Page<LoanSummary>> {
		let resolved = hierarchy::Service::new(self.users).resolve(requester_id)?;
		let visible_to = match resolved.requester.role {
			Role::SuperAdmin | Role::Admin => None,
			Role::Lead | Role::Agent => Some(resolved.user_ids()),
		};

		let customer_ids = match filter {
			Some(key) => Some(self.customers.matching_ids(key)?),
			None => None,
		};

		let listed = self.loans.list(&ListParams {
			page,
			limit,
			number_filter: filter.map(str::to_string),
			customer_ids,
			visible_to,
		})?;

		let loan_ids: Vec<Id> = listed.data.iter().map(|l| l.id).collect();
		let mut by_loan: HashMap<Id, Vec<Installment>> = HashMap::new();
		for inst in self.installments.find_by_loan_ids(&loan_ids)? {
			by_loan.entry(inst.loan_id).or_default().push(inst);
		}

		let data = listed
			.data
			.into_iter()
			.map(|loan| {
				let next_due_date = by_loan
					.get(&loan.id)
					.map(|group| installment::next_due_date(group))
					.unwrap_or(None);
				LoanSummary { loan, next_due_date }
			})
			.collect();

		Ok(Page { data, total: listed.total, page: listed.page, limit: listed.limit })
	}

	pub fn record_actual_profit(&self, loan_id: &Id, actual_profit: &BigDecimal) -> Result<Loan> {
		self.loans.set_actual_profit(loan_id, actual_profit).map_err(Into::into)
	}

	/// Soft-delete the loan and its installment schedule. Payment rows stay
	/// on file for the money trail.
	pub fn delete_loan(&self, loan_id: &Id) -> Result<Loan> {
		self.installments.soft_delete_by_loan(loan_id)?;
		self.loans.soft_delete(loan_id).map_err(Into::into)
	}

	pub fn delete_customer(&self, customer_id: &Id) -> Result<Customer> {
		self.customers.soft_delete(customer_id).map_err(Into::into)
	}
}
