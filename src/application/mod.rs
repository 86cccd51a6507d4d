// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one goal at a time:
//
//   split_use_case.rs : compute and store a fold assignment
//   load_use_case.rs  : build the data loaders for one fold
//   seed_search_use_case.rs : rank split seeds by label balance
//
// Rules for this layer:
//   - No assignment or cleaning logic here (that's Layer 4)
//   - No printing here (that's Layer 1)
//   - Only workflow coordination, with anyhow context on errors

pub mod split_use_case;

pub mod load_use_case;

pub mod seed_search_use_case;
