//! Settings database access
//!
//! Read/write settings from the settings table (key-value store): the
//! last-known position record, master volume and rate, and the reactive
//! player preferences. All settings are global, not per-user.

use crate::error::{Error, Result};
use segue_common::fade_curves::FadeCurve;
use segue_common::params::{EqBand, PlayerPrefs};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use uuid::Uuid;

/// Last-known playback position, written on every meaningful state change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionRecord {
    pub track_id: Uuid,
    pub position_ms: u64,
    pub playing: bool,
}

/// Persist the position record, or clear it entirely when no track is current
pub async fn save_position(db: &Pool<Sqlite>, record: Option<PositionRecord>) -> Result<()> {
    match record {
        Some(rec) => {
            set_setting(db, "last_track_id", rec.track_id.to_string()).await?;
            set_setting(db, "last_position_ms", rec.position_ms).await?;
            set_setting(db, "last_playing", rec.playing).await?;
            Ok(())
        }
        None => {
            // No current track clears the record rather than storing nulls
            for key in ["last_track_id", "last_position_ms", "last_playing"] {
                sqlx::query("DELETE FROM settings WHERE key = ?")
                    .bind(key)
                    .execute(db)
                    .await?;
            }
            Ok(())
        }
    }
}

/// Load the position record persisted by the previous run
pub async fn load_position(db: &Pool<Sqlite>) -> Result<Option<PositionRecord>> {
    let Some(id_str) = get_setting::<String>(db, "last_track_id").await? else {
        return Ok(None);
    };

    let track_id = Uuid::parse_str(&id_str)
        .map_err(|e| Error::Config(format!("Invalid UUID in last_track_id: {}", e)))?;
    let position_ms = get_setting::<u64>(db, "last_position_ms").await?.unwrap_or(0);
    let playing = get_setting::<bool>(db, "last_playing").await?.unwrap_or(false);

    Ok(Some(PositionRecord {
        track_id,
        position_ms,
        playing,
    }))
}

/// Get master volume (0.0-1.0)
pub async fn get_volume(db: &Pool<Sqlite>) -> Result<f32> {
    match get_setting::<f32>(db, "volume_level").await? {
        Some(vol) => Ok(vol.clamp(0.0, 1.0)),
        None => {
            set_volume(db, 1.0).await?;
            Ok(1.0)
        }
    }
}

/// Set master volume (0.0-1.0)
pub async fn set_volume(db: &Pool<Sqlite>, volume: f32) -> Result<()> {
    set_setting(db, "volume_level", volume.clamp(0.0, 1.0)).await
}

/// Get playback rate (0.25-2.0)
pub async fn get_playback_rate(db: &Pool<Sqlite>) -> Result<f32> {
    match get_setting::<f32>(db, "playback_rate").await? {
        Some(rate) => Ok(segue_common::params::clamp_rate(rate)),
        None => Ok(1.0),
    }
}

/// Set playback rate (0.25-2.0)
pub async fn set_playback_rate(db: &Pool<Sqlite>, rate: f32) -> Result<()> {
    set_setting(db, "playback_rate", segue_common::params::clamp_rate(rate)).await
}

/// Load player preferences, installing defaults on first read
pub async fn load_prefs(db: &Pool<Sqlite>) -> Result<PlayerPrefs> {
    let defaults = PlayerPrefs::default();

    let resume_on_load = get_setting::<bool>(db, "resume_on_load")
        .await?
        .unwrap_or(defaults.resume_on_load);
    let crossfade_enabled = get_setting::<bool>(db, "crossfade_enabled")
        .await?
        .unwrap_or(defaults.crossfade_enabled);
    let crossfade_ms = get_setting::<u64>(db, "crossfade_ms")
        .await?
        .unwrap_or(defaults.crossfade_ms);
    let fade_curve = get_setting::<FadeCurve>(db, "fade_curve")
        .await?
        .unwrap_or(defaults.fade_curve);
    let gapless_enabled = get_setting::<bool>(db, "gapless_enabled")
        .await?
        .unwrap_or(defaults.gapless_enabled);
    let eq_enabled = get_setting::<bool>(db, "eq_enabled")
        .await?
        .unwrap_or(defaults.eq_enabled);
    let eq_bands = match get_setting::<String>(db, "eq_bands").await? {
        Some(json) => serde_json::from_str::<Vec<EqBand>>(&json)
            .map_err(|e| Error::Config(format!("Invalid eq_bands JSON: {}", e)))?,
        None => defaults.eq_bands,
    };

    Ok(PlayerPrefs {
        resume_on_load,
        crossfade_enabled,
        crossfade_ms,
        fade_curve,
        gapless_enabled,
        eq_enabled,
        eq_bands,
    })
}

/// Persist the full preference set
pub async fn save_prefs(db: &Pool<Sqlite>, prefs: &PlayerPrefs) -> Result<()> {
    set_setting(db, "resume_on_load", prefs.resume_on_load).await?;
    set_setting(db, "crossfade_enabled", prefs.crossfade_enabled).await?;
    set_setting(db, "crossfade_ms", prefs.crossfade_ms).await?;
    set_setting(db, "fade_curve", prefs.fade_curve.as_str()).await?;
    set_setting(db, "gapless_enabled", prefs.gapless_enabled).await?;
    set_setting(db, "eq_enabled", prefs.eq_enabled).await?;

    let bands_json = serde_json::to_string(&prefs.eq_bands)
        .map_err(|e| Error::Config(format!("Failed to serialize eq_bands: {}", e)))?;
    set_setting(db, "eq_bands", bands_json).await?;

    Ok(())
}

/// Generic setting getter
///
/// Returns None if the key doesn't exist. Parses the stored string using
/// FromStr.
pub async fn get_setting<T: FromStr>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match value {
        Some(s) => match s.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic setting setter (upsert)
pub async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    let value_str = value.to_string();

    sqlx::query(
        r#"
        INSERT INTO settings (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value_str)
    .execute(db)
    .await?;

    Ok(())
}
