pub mod ast;
pub mod cfg;
pub mod dfg;
