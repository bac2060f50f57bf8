pub mod schema;
pub mod db;
pub mod types;
pub mod error;
pub mod tracker;
pub mod user;
pub mod hierarchy;
pub mod customer;
pub mod loan;
pub mod installment;
pub mod payment;
pub mod expense;
pub mod office;
pub mod report;

#[cfg(test)]
mod testutil;

pub use crate::db::{pg_connection, PgPool, PgPooledConn};
pub use crate::error::{Error, Kind, Result};
pub use crate::types::{Calendar, Date, Id, SystemCalendar, Time};
pub use crate::user::{NewUser, Role, User};
pub use crate::customer::{Customer, NewCustomer};
pub use crate::loan::{Loan, LoanStatus};
pub use crate::installment::{Installment, InstallmentStatus, Period};
pub use crate::payment::{Payment, PaymentType};
