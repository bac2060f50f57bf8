use bigdecimal::BigDecimal;
use chrono::NaiveDate;

mod common;

use common::{Fixture, FixedCalendar, Suite as RepoSuite};
use loan_office::error::Kind;
use loan_office::office::{CreateLoan, NewService, RecordPayment, RegisterCustomer, Service};
use loan_office::*;

struct Suite<'a> {
	pub repos: RepoSuite,
	pub fixture: &'a Fixture,
	pub calendar: FixedCalendar,
}

impl<'a> Suite<'a> {
	pub fn setup(fixture: &'a Fixture) -> Self {
		let repo_suite = RepoSuite::setup();

		Suite {
			repos: repo_suite,
			fixture,
			calendar: FixedCalendar(date(2025, 1, 1)),
		}
	}

	pub fn office(&self) -> Service {
		Service::new(NewService {
			counters: &self.repos.tracker_repo,
			users: &self.repos.user_repo,
			customers: &self.repos.customer_repo,
			loans: &self.repos.loan_repo,
			installments: &self.repos.installment_repo,
			payments: &self.repos.payment_repo,
			calendar: &self.calendar,
		})
	}

	fn loan_request(&self, customer: &Customer, agent: &User) -> CreateLoan<'static> {
		CreateLoan {
			customer_id: customer.id,
			agent_id: agent.id,
			agent_2_id: None,
			principal_amount: BigDecimal::from(1000),
			deposit_amount: BigDecimal::from(100),
			application_fee: BigDecimal::from(50),
			interest: BigDecimal::from(10),
			unit_of_date: Period::Month,
			date_period: 1,
			repayment_term: 3,
			loan_date: date(2025, 1, 1),
			payment_per_term: Some(BigDecimal::from(350)),
			estimated_profit: Some(BigDecimal::from(50)),
			remark: None,
			created_by: agent.id,
		}
	}
}

fn date(y: i32, m: u32, d: u32) -> Date {
	NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
#[ignore = "needs a postgres database"]
fn register_customer_assigns_sequential_numbers() {
	let f = Fixture::new();
	let s = Suite::setup(&f);
	let office = s.office();

	let first = office
		.register_customer(RegisterCustomer {
			name: "Maya",
			email: None,
			ic: Some("900101-10-1234"),
			passport: None,
			remark: None,
			created_by: None,
		})
		.unwrap();
	let second = office
		.register_customer(RegisterCustomer {
			name: "Ben",
			email: None,
			ic: None,
			passport: Some("A1234567"),
			remark: None,
			created_by: None,
		})
		.unwrap();

	assert_eq!(first.generate_id, "CT2500001");
	assert_eq!(second.generate_id, "CT2500002");
}

#[test]
#[ignore = "needs a postgres database"]
fn register_customer_rejects_duplicate_ic() {
	let f = Fixture::new();
	let s = Suite::setup(&f);
	let office = s.office();

	f.customer_factory.maya();

	let err = office
		.register_customer(RegisterCustomer {
			name: "Maya Again",
			email: None,
			ic: Some("900101-10-1234"),
			passport: None,
			remark: None,
			created_by: None,
		})
		.unwrap_err();

	match err.kind() {
		Kind::DuplicateIdentity(_) => {}
		other => panic!("want DuplicateIdentity, got {:?}", other),
	}
}

#[test]
#[ignore = "needs a postgres database"]
fn create_loan_writes_schedule_and_disbursement() {
	let f = Fixture::new();
	let s = Suite::setup(&f);
	let office = s.office();

	let agent = f.user_factory.agent(None);
	let maya = f.customer_factory.maya();

	let bundle = office.create_loan(s.loan_request(&maya, &agent)).unwrap();

	assert_eq!(bundle.installments.len(), 3);
	assert_eq!(bundle.loan.repayment_date, date(2025, 2, 1));
	let dates: Vec<Date> = bundle.installments.iter().map(|i| i.installment_date).collect();
	assert_eq!(dates, vec![date(2025, 2, 1), date(2025, 3, 1), date(2025, 4, 1)]);
	for installment in &bundle.installments {
		assert_eq!(installment.status, Some(InstallmentStatus::Unpaid));
		assert_eq!(installment.due_amount, Some(BigDecimal::from(350)));
	}

	// principal minus deposit and fee leaves the vault
	assert_eq!(bundle.disbursement.payment_type, PaymentType::Out);
	assert_eq!(bundle.disbursement.amount, BigDecimal::from(850));
	assert_eq!(bundle.disbursement.balance, Some(BigDecimal::from(900)));
	assert_eq!(bundle.disbursement.account_details.as_deref(), Some("Loan Disbursement"));
}

#[test]
#[ignore = "needs a postgres database"]
fn resubmitted_payment_updates_instead_of_duplicating() {
	let f = Fixture::new();
	let s = Suite::setup(&f);
	let office = s.office();

	let agent = f.user_factory.agent(None);
	let maya = f.customer_factory.maya();
	let bundle = office.create_loan(s.loan_request(&maya, &agent)).unwrap();

	let request = |amount: i64| RecordPayment {
		generate_id: Some("PM2590001"),
		loan_id: bundle.loan.id,
		installment_id: Some(bundle.installments[0].id),
		payment_type: PaymentType::In,
		amount: BigDecimal::from(amount),
		balance: None,
		account_details: None,
		remarks: None,
		payment_date: date(2025, 2, 1),
		created_by: Some(agent.id),
	};

	office.record_payment(request(300)).unwrap();
	let updated = office.record_payment(request(350)).unwrap();
	assert_eq!(updated.amount, BigDecimal::from(350));

	let payments = s.repos.payment_repo.find_by_loan(&bundle.loan.id).unwrap();
	// the disbursement plus exactly one repayment row
	assert_eq!(payments.len(), 2);

	let installment = s.repos.installment_repo.find_by_id(&bundle.installments[0].id).unwrap();
	assert_eq!(installment.status, Some(InstallmentStatus::Paid));
	assert_eq!(installment.receiving_date, Some(date(2025, 2, 1)));
}

#[test]
#[ignore = "needs a postgres database"]
fn payment_against_unknown_installment_is_rejected() {
	let f = Fixture::new();
	let s = Suite::setup(&f);
	let office = s.office();

	let agent = f.user_factory.agent(None);
	let maya = f.customer_factory.maya();
	let bundle = office.create_loan(s.loan_request(&maya, &agent)).unwrap();

	let missing = Id::new_v4();
	let err = office
		.record_payment(RecordPayment {
			generate_id: None,
			loan_id: bundle.loan.id,
			installment_id: Some(missing),
			payment_type: PaymentType::In,
			amount: BigDecimal::from(350),
			balance: None,
			account_details: None,
			remarks: None,
			payment_date: date(2025, 2, 1),
			created_by: Some(agent.id),
		})
		.unwrap_err();

	assert_eq!(*err.kind(), Kind::InstallmentNotFound(missing));
}

#[test]
#[ignore = "needs a postgres database"]
fn repaying_the_disbursement_completes_the_loan() {
	let f = Fixture::new();
	let s = Suite::setup(&f);
	let office = s.office();

	let agent = f.user_factory.agent(None);
	let maya = f.customer_factory.maya();
	let bundle = office.create_loan(s.loan_request(&maya, &agent)).unwrap();

	office
		.record_payment(RecordPayment {
			generate_id: None,
			loan_id: bundle.loan.id,
			installment_id: Some(bundle.installments[0].id),
			payment_type: PaymentType::In,
			amount: BigDecimal::from(850),
			balance: None,
			account_details: None,
			remarks: None,
			payment_date: date(2025, 2, 1),
			created_by: Some(agent.id),
		})
		.unwrap();

	let loan = s.repos.loan_repo.find_by_id(&bundle.loan.id).unwrap();
	assert_eq!(loan.status, LoanStatus::Completed);
}

#[test]
#[ignore = "needs a postgres database"]
fn aged_unpaid_installment_reconciles_to_bad_debt() {
	let f = Fixture::new();
	let s = Suite::setup(&f);

	let agent = f.user_factory.agent(None);
	let maya = f.customer_factory.maya();
	let bundle = s.office().create_loan(s.loan_request(&maya, &agent)).unwrap();

	// first installment due 2025-02-01, look again 16 days later
	let later = Suite {
		repos: RepoSuite::attach(f.pool()),
		fixture: &f,
		calendar: FixedCalendar(date(2025, 2, 17)),
	};

	let loan = later.office().reconcile(&bundle.loan.id).unwrap();
	assert_eq!(loan.status, LoanStatus::BadDebt);
}

#[test]
#[ignore = "needs a postgres database"]
fn loan_listing_scopes_agents_to_their_hierarchy() {
	let f = Fixture::new();
	let s = Suite::setup(&f);
	let office = s.office();

	let admin = f.user_factory.admin();
	let lead = f.user_factory.lead(Some(admin.id));
	let agent = f.user_factory.agent(Some(lead.id));
	let maya = f.customer_factory.maya();

	let mine = office.create_loan(s.loan_request(&maya, &agent)).unwrap();
	let mut other_request = s.loan_request(&maya, &lead);
	other_request.created_by = admin.id;
	other_request.agent_id = admin.id;
	office.create_loan(other_request).unwrap();

	let page = office.list_loans(&agent.id, 1, 10, None).unwrap();
	let numbers: Vec<&str> = page.data.iter().map(|row| row.loan.generate_id.as_str()).collect();
	assert!(numbers.contains(&mine.loan.generate_id.as_str()));

	let page = office.list_loans(&admin.id, 1, 10, None).unwrap();
	assert_eq!(page.total, 2);
}

#[test]
#[ignore = "needs a postgres database"]
fn listing_annotates_the_next_unpaid_due_date() {
	let f = Fixture::new();
	let s = Suite::setup(&f);
	let office = s.office();

	let agent = f.user_factory.agent(None);
	let maya = f.customer_factory.maya();
	let bundle = office.create_loan(s.loan_request(&maya, &agent)).unwrap();

	office
		.record_payment(RecordPayment {
			generate_id: None,
			loan_id: bundle.loan.id,
			installment_id: Some(bundle.installments[0].id),
			payment_type: PaymentType::In,
			amount: BigDecimal::from(350),
			balance: None,
			account_details: None,
			remarks: None,
			payment_date: date(2025, 2, 1),
			created_by: Some(agent.id),
		})
		.unwrap();

	let page = office.list_loans(&agent.id, 1, 10, None).unwrap();
	let summary = page
		.data
		.iter()
		.find(|s| s.loan.id == bundle.loan.id)
		.expect("loan listed");
	assert_eq!(summary.next_due_date, Some(date(2025, 3, 1)));
}

#[test]
#[ignore = "needs a postgres database"]
fn deleting_a_loan_hides_its_schedule_but_keeps_payments() {
	let f = Fixture::new();
	let s = Suite::setup(&f);
	let office = s.office();

	let agent = f.user_factory.agent(None);
	let maya = f.customer_factory.maya();
	let bundle = office.create_loan(s.loan_request(&maya, &agent)).unwrap();

	let deleted = office.delete_loan(&bundle.loan.id).unwrap();
	assert!(deleted.deleted);

	let installments = s.repos.installment_repo.find_by_loan(&bundle.loan.id).unwrap();
	assert!(installments.is_empty());

	let payments = s.repos.payment_repo.find_by_loan(&bundle.loan.id).unwrap();
	assert_eq!(payments.len(), 1, "the money trail survives");
}
