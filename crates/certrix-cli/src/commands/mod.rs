//! Command implementations.
//!
//! Each command borrows the [`certrix_pki::Certrix`] service, writes its
//! artifacts to disk and reports a summary through [`crate::output`].

mod generate;
mod preview;
mod renew;
mod renew_bulk;

pub use generate::GenerateCommand;
pub use preview::PreviewCommand;
pub use renew::RenewCommand;
pub use renew_bulk::RenewBulkCommand;
