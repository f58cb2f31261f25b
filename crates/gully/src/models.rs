//! These models represent the objects passed around by the agent.
//!
//! There are a few related formats we need to interact with:
//! - openai messages/tools, sent from the agent to the reasoning oracle
//! - capability requests, sent from the agent to the statistics store
//! - the internal transcript, the append-only record of one run
//!
//! Wire formats are converted at the provider boundary (see
//! `providers::utils`); everything inside the loop uses the structs here.
pub mod message;
pub mod role;
pub mod tool;
