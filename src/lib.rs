#![allow(clippy::comparison_chain)]
#![allow(clippy::too_many_arguments)]
extern crate num;
#[macro_use]
extern crate num_derive;
pub mod binary_reader;
pub mod binary_writer;
pub mod bit_reader;
pub mod bit_writer;
#[cfg(test)]
mod cabac_decoder;
pub mod cabac_contexts;
pub mod cabac_encoder;
pub mod cabac_tables;
pub mod common;
pub mod config;
pub mod encoder;
pub mod error;
pub mod nal;
pub mod nal_escape;
pub mod picture;
pub mod pps;
pub mod pps_encoder;
pub mod rd_cost;
pub mod sei_encoder;
pub mod slice_encoder;
pub mod slice_header;
pub mod sps;
pub mod sps_encoder;
