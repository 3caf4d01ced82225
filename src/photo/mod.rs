/// Photo upload handling module
///
/// This module handles:
/// - Checking uploads against the accept policy (declared type + payload)
/// - Encoding accepted payloads into storable data URIs

pub mod ingest;
