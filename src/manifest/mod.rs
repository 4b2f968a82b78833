// ABOUTME: Experiment manifest module for turning GENI RSpec documents into node records
// ABOUTME: Only the node/vnode structure is inspected; the rest of the manifest is ignored

pub mod parser;

pub use parser::{NodeRecord, parse_manifest};
