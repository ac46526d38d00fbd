//! Wallet linking for authenticated principals

mod events;
mod label;
mod linker;

pub use events::{WalletEvent, WalletEvents};
pub use label::{LabelError, LabelResolver, NameServiceResolver, NoLabelResolver};
pub use linker::{WalletError, WalletLinker};
