pub mod name;
pub mod run;
pub mod synthesize;
