pub mod conditional;
pub mod desugarer;
pub mod loops;
