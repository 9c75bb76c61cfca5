pub mod investigation;
pub mod policy;
pub mod retrieval;
pub mod tools;
