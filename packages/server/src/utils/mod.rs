pub mod catalog;
pub mod otp;
pub mod ownership;
pub mod password;
pub mod url;
