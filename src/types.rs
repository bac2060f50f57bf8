use chrono::{DateTime, Datelike, NaiveDate, Utc};

pub type Id = uuid::Uuid;
pub type Time = DateTime<Utc>;
pub type Date = NaiveDate;

/// Source of "today" for schedule generation and delinquency checks
pub trait Calendar {
	fn current_date(&self) -> Date {
		Utc::now().date_naive()
	}
}

/// Calendar backed by the system clock
pub struct SystemCalendar;

impl Calendar for SystemCalendar {}

/// One page of a listing, with the total row count for the same filter
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
	pub data: Vec<T>,
	pub total: i64,
	pub page: i64,
	pub limit: i64,
}

pub trait DateExt {
	fn add_days(&self, num_days: u32) -> Date;
	fn add_weeks(&self, num_weeks: u32) -> Date;
	fn add_months(&self, num_months: u32) -> Date;
	fn add_years(&self, num_years: u32) -> Date;
}

impl DateExt for Date {
	fn add_days(&self, num_days: u32) -> Date {
		*self + chrono::Duration::days(num_days as i64)
	}

	fn add_weeks(&self, num_weeks: u32) -> Date {
		self.add_days(num_weeks * 7)
	}

	fn add_months(&self, num_months: u32) -> Date {
		let total = self.year() * 12 + (self.month() as i32 - 1) + num_months as i32;
		let year = total.div_euclid(12);
		let month = (total.rem_euclid(12) + 1) as u32;
		// clamp to the last day of the target month (e.g. Jan 31 + 1 month = Feb 28)
		let day = self.day().min(days_in_month(year, month));
		NaiveDate::from_ymd_opt(year, month, day).expect("clamped day is always valid")
	}

	fn add_years(&self, num_years: u32) -> Date {
		self.add_months(num_years * 12)
	}
}

fn days_in_month(year: i32, month: u32) -> u32 {
	let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
	NaiveDate::from_ymd_opt(next_year, next_month, 1)
		.and_then(|d| d.pred_opt())
		.expect("first of month is always valid")
		.day()
}
