#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::op_ref
)]

//! Street instance assignment: splits every street name in a road network
//! into its physically separate pieces, numbers them, and gives each a
//! readable id.

pub mod benchmark;
pub mod config;
pub mod connectivity;
pub mod continuity;
pub mod error;
pub mod geojson_io;
pub mod grid;
pub mod naming;
pub mod pipeline;
pub mod projection;
pub mod segment;
pub mod stitch;
pub mod street_key;
pub mod summary;
pub mod union_find;
