// corank: keyword co-ranking analysis for SEO.
//
// This is the library root. `analysis` is the clique analyzer pipeline,
// `semgroup` the exact SERP-signature grouper; the rest is the plumbing
// around them (input tables, config, errors, output).

pub mod analysis;
pub mod config;
pub mod error;
pub mod output;
pub mod semgroup;
pub mod table;
