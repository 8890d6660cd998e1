//! These models represent the conversation objects exchanged with the chat client
//!
//! The client posts its whole conversation as a list of messages made of ordered parts,
//! the same shape the browser chat surface keeps in memory. Only the last message of a
//! submission drives the research pipeline; the rest is history.
pub mod message;
