//! # coldroom
//!
//! Back-office command line for Coldroom POS. Startup lives in the library
//! (`coldroom_backoffice::run`) so it can be tested.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    coldroom_backoffice::run(std::env::args_os()).await
}
