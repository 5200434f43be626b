/// Application name, used for platform directories and the user agent.
pub const APP_NAME: &str = "confkit";

/// Reserved top-level key carrying provenance metadata. Never hashed or diffed.
pub const METADATA_KEY: &str = "_metadata";

/// Prefix of every formatted configuration hash.
pub const HASH_PREFIX: &str = "sha256:";

/// Number of hex characters following [`HASH_PREFIX`].
pub const HASH_HEX_LEN: usize = 64;

/// Config version suggested when a document has none.
pub const CURRENT_CONFIG_VERSION: &str = "1.0";

/// Wildcard path reported when there is no previous document to diff against.
pub const ALL_PATHS_WILDCARD: &str = "*";

/// Default port for `confkit serve` and the default API URL.
pub const DEFAULT_PORT: u16 = 8787;

/// Instance used when none is configured.
pub const DEFAULT_INSTANCE: &str = "default";
