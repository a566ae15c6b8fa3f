pub mod run;
pub mod test_rpc;
