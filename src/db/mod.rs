pub mod models;
pub mod services;

use sqlx::PgPool;

/// Create the control-plane tables if they do not exist yet. Safe to run on
/// every start.
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(
        r#"
        CREATE TABLE IF NOT EXISTS admin_permissions (
            id          VARCHAR(36) PRIMARY KEY,
            name        VARCHAR(100) NOT NULL UNIQUE,
            description VARCHAR(255),
            resource    VARCHAR(50) NOT NULL,
            action      VARCHAR(50) NOT NULL
        );

        CREATE TABLE IF NOT EXISTS admin_roles (
            id          VARCHAR(36) PRIMARY KEY,
            name        VARCHAR(50) NOT NULL UNIQUE,
            description VARCHAR(255),
            is_builtin  BOOLEAN NOT NULL DEFAULT FALSE,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );

        CREATE TABLE IF NOT EXISTS admin_role_permissions (
            role_id       VARCHAR(36) NOT NULL REFERENCES admin_roles(id) ON DELETE CASCADE,
            permission_id VARCHAR(36) NOT NULL REFERENCES admin_permissions(id) ON DELETE CASCADE,
            PRIMARY KEY (role_id, permission_id)
        );

        CREATE TABLE IF NOT EXISTS admin_users (
            id            VARCHAR(36) PRIMARY KEY,
            username      VARCHAR(50) NOT NULL UNIQUE,
            password_hash VARCHAR(255) NOT NULL,
            role_id       VARCHAR(36) REFERENCES admin_roles(id),
            is_active     BOOLEAN NOT NULL DEFAULT TRUE,
            last_login    TIMESTAMPTZ,
            created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );

        CREATE TABLE IF NOT EXISTS webhooks (
            id                  VARCHAR(36) PRIMARY KEY,
            url                 VARCHAR(500) NOT NULL,
            name                VARCHAR(100) NOT NULL,
            description         VARCHAR(255),
            events              JSONB NOT NULL DEFAULT '[]',
            secret              VARCHAR(512) NOT NULL,
            enabled             BOOLEAN NOT NULL DEFAULT TRUE,
            retry_enabled       BOOLEAN NOT NULL DEFAULT TRUE,
            retry_max_attempts  INTEGER NOT NULL DEFAULT 3,
            retry_delay_seconds INTEGER NOT NULL DEFAULT 60,
            total_calls         BIGINT NOT NULL DEFAULT 0,
            failed_calls        BIGINT NOT NULL DEFAULT 0,
            last_called_at      TIMESTAMPTZ,
            last_error          TEXT,
            created_by          VARCHAR(50),
            created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        CREATE INDEX IF NOT EXISTS idx_webhooks_enabled ON webhooks(enabled);

        CREATE TABLE IF NOT EXISTS webhook_logs (
            id               VARCHAR(36) PRIMARY KEY,
            webhook_id       VARCHAR(36) NOT NULL,
            event_type       VARCHAR(100) NOT NULL,
            event_timestamp  TIMESTAMPTZ NOT NULL,
            request_url      VARCHAR(500),
            request_headers  JSONB,
            request_body     JSONB,
            status_code      INTEGER,
            response_body    TEXT,
            response_time_ms INTEGER,
            attempt          INTEGER NOT NULL DEFAULT 1,
            success          BOOLEAN NOT NULL DEFAULT FALSE,
            error_message    TEXT,
            created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        CREATE INDEX IF NOT EXISTS idx_webhook_logs_webhook_id ON webhook_logs(webhook_id);
        CREATE INDEX IF NOT EXISTS idx_webhook_logs_created_at ON webhook_logs(created_at);
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
