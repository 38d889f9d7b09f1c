pub mod abi;
pub mod math;
pub mod rate_limit;
pub mod validation;
