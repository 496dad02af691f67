//! Constants used throughout the study core crate.

/// Default directory holding protocol definitions when none is configured.
pub const DEFAULT_PROTOCOL_DIR: &str = "protocols";

/// Default directory receiving completed answer logs when none is configured.
pub const DEFAULT_ANSWER_DIR: &str = "answers";

/// File extension for protocol definitions.
pub const PROTOCOL_FILE_EXTENSION: &str = "yaml";

/// File extension for persisted answer logs.
pub const ANSWER_FILE_EXTENSION: &str = "json";
