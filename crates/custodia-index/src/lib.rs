//! Secondary-index engine: canonical numeric encoding, composite-key row
//! maintenance and range scans, and the encrypted/off-chain index table
//! modes (spec §4.E).

pub mod encode;
pub mod secret;
pub mod table;

pub use encode::{encode_number, encode_value};
pub use secret::TableSecret;
pub use table::{
    delete_row, get_rows_by_partial_key, get_rows_by_range, get_rows_by_range_with_keys, get_table,
    put_row, put_table, successor_key,
};
