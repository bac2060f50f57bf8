pub use diesel::prelude::*;

pub use loan_office::schema::*;
pub use loan_office::*;

/// Calendar pinned to a fixed date so status transitions are reproducible
pub struct FixedCalendar(pub Date);

impl Calendar for FixedCalendar {
	fn current_date(&self) -> Date {
		self.0
	}
}

pub struct Fixture {
	pub pool: PgPool,
	pub user_factory: UserFactory,
	pub customer_factory: CustomerFactory,
}

impl Fixture {
	pub fn new() -> Self {
		let pool = pg_connection();
		let user_factory = UserFactory::new(pool.clone());
		let customer_factory = CustomerFactory::new(pool.clone());
		Fixture {
			pool,
			user_factory,
			customer_factory,
		}
	}

	pub fn pool(&self) -> PgPool {
		self.pool.clone()
	}

	pub fn conn(&self) -> PgPooledConn {
		self.pool.get().unwrap()
	}

	pub fn teardown(&self) {
		let tables = vec![
			"payments",
			"installments",
			"loans",
			"expenses",
			"customers",
			"users",
			"trackers",
		];
		println!("\n--- clean up ---");
		for table in tables {
			diesel::sql_query(format!("DELETE FROM {}", table))
				.execute(&mut self.conn())
				.map(|n| println!("deleting {} from '{}' table", n, table))
				.expect("deleting db table");
		}
	}
}

pub struct Suite {
	pub tracker_repo: tracker::Repo,
	pub user_repo: user::Repo,
	pub customer_repo: customer::Repo,
	pub loan_repo: loan::Repo,
	pub installment_repo: installment::Repo,
	pub payment_repo: payment::Repo,
	pub expense_repo: expense::Repo,
}

impl Suite {
	pub fn setup() -> Self {
		let fixture = Fixture::new();
		fixture.teardown();
		Suite::attach(fixture.pool())
	}

	/// Repos over an existing pool, without wiping the tables
	pub fn attach(pool: PgPool) -> Self {
		Suite {
			tracker_repo: tracker::Repo::new(pool.clone()),
			user_repo: user::Repo::new(pool.clone()),
			customer_repo: customer::Repo::new(pool.clone()),
			loan_repo: loan::Repo::new(pool.clone()),
			installment_repo: installment::Repo::new(pool.clone()),
			payment_repo: payment::Repo::new(pool.clone()),
			expense_repo: expense::Repo::new(pool),
		}
	}
}

#[test]
#[ignore = "needs a postgres database"]
fn test_suite_setup() {
	let _suite = Suite::setup();
}

pub struct UserFactory {
	pool: PgPool,
}

impl<'a> UserFactory {
	fn new(pool: PgPool) -> Self {
		UserFactory { pool }
	}

	pub fn defaults() -> NewUser<'a> {
		NewUser {
			generate_id: "US2500001",
			name: "Default",
			email: "default@example.com",
			role: Role::Agent,
			supervisor: None,
			status: true,
		}
	}

	pub fn user(&self, new_user: NewUser) -> User {
		diesel::insert_into(users::table)
			.values(new_user)
			.get_result::<User>(&mut self.pool.get().unwrap())
			.unwrap()
	}

	pub fn admin(&self) -> User {
		self.user(NewUser {
			generate_id: "US2500010",
			name: "Ada",
			email: "ada@example.com",
			role: Role::Admin,
			..UserFactory::defaults()
		})
	}

	pub fn lead(&self, supervisor: Option<Id>) -> User {
		self.user(NewUser {
			generate_id: "US2500011",
			name: "Lena",
			email: "lena@example.com",
			role: Role::Lead,
			supervisor,
			..UserFactory::defaults()
		})
	}

	pub fn agent(&self, supervisor: Option<Id>) -> User {
		self.user(NewUser {
			generate_id: "US2500012",
			name: "Amir",
			email: "amir@example.com",
			role: Role::Agent,
			supervisor,
			..UserFactory::defaults()
		})
	}
}

pub struct CustomerFactory {
	pool: PgPool,
}

impl<'a> CustomerFactory {
	pub fn new(pool: PgPool) -> Self {
		CustomerFactory { pool }
	}

	pub fn defaults() -> NewCustomer<'a> {
		NewCustomer {
			generate_id: "CT2500001",
			name: "Default Customer",
			email: None,
			ic: None,
			passport: None,
			remark: None,
			created_by: None,
		}
	}

	pub fn customer(&self, new_customer: NewCustomer) -> Customer {
		diesel::insert_into(customers::table)
			.values(new_customer)
			.get_result::<Customer>(&mut self.pool.get().unwrap())
			.unwrap()
	}

	pub fn maya(&self) -> Customer {
		self.customer(NewCustomer {
			generate_id: "CT2500002",
			name: "Maya",
			ic: Some("900101-10-1234"),
			..CustomerFactory::defaults()
		})
	}
}
