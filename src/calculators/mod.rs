pub mod age;
pub mod units;
