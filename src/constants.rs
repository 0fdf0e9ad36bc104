pub const MEMORY_DB_PATH: &str = ":memory:";

/// Database name used when nothing else identifies the catalog.
pub const MEMORY_DATABASE: &str = "memory";

/// Catalog name for a MotherDuck connection string without an explicit database.
pub const MOTHERDUCK_DEFAULT_DATABASE: &str = "my_db";

pub const REMOTE_DEFAULT_DATABASE: &str = MEMORY_DATABASE;

pub const MOTHERDUCK_SCHEMES: &[&str] = &["md", "motherduck"];

pub const DEFAULT_SCHEMA: &str = "main";
pub const DEFAULT_EXTERNAL_ROOT: &str = ".";

pub const CERTIFICATE_SUFFIX: &str = ".pem";

pub const AWS_PROVIDER: &str = "aws";

pub const S3_ACCESS_KEY_ID: &str = "s3_access_key_id";
pub const S3_SECRET_ACCESS_KEY: &str = "s3_secret_access_key";
pub const S3_SESSION_TOKEN: &str = "s3_session_token";
pub const S3_REGION: &str = "s3_region";

/// Secret fields whose values are masked in `Debug` output and logs.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "secret",
    "session_token",
    "client_secret",
    "connection_string",
    "token",
    "bearer_token",
    "http_proxy_password",
    "password",
];

pub const DEFAULT_COMPRESSION: &str = "ZSTD";
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 9;

pub const FULL_VERSION: &str = env!("CARGO_PKG_VERSION");
