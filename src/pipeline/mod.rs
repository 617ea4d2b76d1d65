pub mod privacy; // Client-side PHI redaction
pub mod extraction;
pub mod analysis;
pub mod processor; // Extraction → analysis state machine
