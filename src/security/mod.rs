pub mod crypt;
pub mod generator;
pub mod password;
