// PHI audit: static analysis tests that scan every Rust source file for
// tracing calls carrying document text or identifying fields. Log lengths,
// counts and ids instead.
