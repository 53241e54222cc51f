pub mod review;
pub mod study;
