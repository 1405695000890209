/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Incremental reassembly of CRLF-terminated lines from arbitrarily fragmented byte chunks.

mod assembler;

pub use assembler::LineAssembler;
