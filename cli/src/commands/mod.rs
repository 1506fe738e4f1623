pub mod cli;
pub mod run;
