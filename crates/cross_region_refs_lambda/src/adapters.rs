pub mod parameters;
pub mod ssm;
