use std::env;

#[derive(Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub listen_addr: String,
    pub jwt_secret: String,
    /// 32-byte hex key for encrypting webhook signing secrets at rest.
    pub webhook_encryption_key: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let listen_addr = env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set".to_string())?;

        let webhook_encryption_key = env::var("WEBHOOK_ENCRYPTION_KEY")
            .map_err(|_| "WEBHOOK_ENCRYPTION_KEY must be set".to_string())?;

        Ok(ServerConfig {
            database_url,
            listen_addr,
            jwt_secret,
            webhook_encryption_key,
        })
    }
}
