pub mod ledger;
pub mod position_sizer;

pub use ledger::{
    append, attest, can_delete, chain_from, ensure_attestable, ensure_deletable, Appended, LedgerError,
};
pub use position_sizer::{compute_edge, edge_percentage, recommended_size, size_position, Calculated};
