//! Command Handlers module
//!
//! Orchestrates business operations over the ledger: the transfer engine,
//! the payment request workflow and account registration.

mod account_handler;
mod commands;
mod request_workflow;
mod transfer_engine;


pub use account_handler::AccountHandler;
pub use commands::*;
pub use request_workflow::RequestWorkflow;
pub use transfer_engine::TransferEngine;
