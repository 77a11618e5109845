//! 应用设置数据库操作（单行表，id 固定为 1）

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{AppSettings, Language};
use crate::storage::{format_datetime, parse_datetime, StorageError, StorageResult};

pub struct SettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SettingsRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 读取设置，记录不存在时返回 `None`
    pub fn load(&self) -> StorageResult<Option<AppSettings>> {
        let row = self
            .conn
            .query_row(
                "SELECT current_language, last_sync_at, user_id FROM app_settings WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((language, last_sync_at, user_id)) = row else {
            return Ok(None);
        };

        let current_language = language
            .parse::<Language>()
            .map_err(StorageError::Serialization)?;
        let last_sync_date = last_sync_at.as_deref().map(parse_datetime).transpose()?;

        Ok(Some(AppSettings {
            current_language,
            last_sync_date,
            user_id,
        }))
    }

    /// 读取设置，不存在时写入默认值并返回
    pub fn load_or_init(&self) -> StorageResult<AppSettings> {
        if let Some(settings) = self.load()? {
            return Ok(settings);
        }

        let settings = AppSettings::default();
        self.save(&settings)?;
        Ok(settings)
    }

    pub fn save(&self, settings: &AppSettings) -> StorageResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO app_settings (id, current_language, last_sync_at, user_id, updated_at)
            VALUES (1, ?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                current_language = excluded.current_language,
                last_sync_at = excluded.last_sync_at,
                user_id = excluded.user_id,
                updated_at = excluded.updated_at
            "#,
            params![
                settings.current_language.code(),
                settings.last_sync_date.map(format_datetime),
                settings.user_id,
                format_datetime(Utc::now()),
            ],
        )?;

        Ok(())
    }

    pub fn clear(&self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM app_settings", [])?;
        Ok(())
    }
}
