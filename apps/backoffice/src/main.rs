//! # Caja Back-Office Monitor Entry Point
//!
//! Headless admin monitor: logs the open cash sessions of the configured
//! branch and re-logs them on every change until Ctrl-C.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  main.rs ────► tokio runtime                                           │
//! │  lib.rs  ────► logging, config, database, watch loop                   │
//! │                                                                         │
//! │  CAJA_BRANCH_ID=sucursal-centro CAJA_DB_PATH=./caja_dev.db backoffice  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The actual setup is in lib.rs for better testability
    caja_backoffice::run().await
}
