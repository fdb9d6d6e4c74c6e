// DDL constants for the progression database.

pub const ACTIVITY_EVENTS_DDL: &str = "\
CREATE TABLE IF NOT EXISTS activity_events (
    id           TEXT    PRIMARY KEY,
    user_id      TEXT    NOT NULL,
    event_type   TEXT    NOT NULL,
    subject_id   TEXT,
    points       INTEGER NOT NULL CHECK (points >= 0),
    ts           TEXT    NOT NULL,
    ts_epoch_ms  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_ae_user_epoch ON activity_events(user_id, ts_epoch_ms);
";

pub const USER_PROGRESSION_DDL: &str = "\
CREATE TABLE IF NOT EXISTS user_progression (
    user_id             TEXT    PRIMARY KEY,
    total_points        INTEGER NOT NULL DEFAULT 0,
    achievement_points  INTEGER NOT NULL DEFAULT 0,
    current_streak_days INTEGER NOT NULL DEFAULT 0,
    labs_completed      TEXT    NOT NULL DEFAULT '[]',
    tools_used          TEXT    NOT NULL DEFAULT '[]',
    skill_level         TEXT    NOT NULL DEFAULT 'Beginner',
    last_activity_at    TEXT,
    timezone            TEXT,
    revision            INTEGER NOT NULL DEFAULT 0,
    updated_at          TEXT    NOT NULL
);
";

pub const USER_ACHIEVEMENTS_DDL: &str = "\
CREATE TABLE IF NOT EXISTS user_achievements (
    user_id         TEXT    NOT NULL,
    achievement_id  TEXT    NOT NULL,
    points_awarded  INTEGER NOT NULL,
    earned_at       TEXT    NOT NULL,
    PRIMARY KEY (user_id, achievement_id)
);
";

pub const PRAGMAS: &str = "\
PRAGMA journal_mode = WAL;
PRAGMA synchronous  = NORMAL;
PRAGMA cache_size   = -2000;
PRAGMA temp_store   = MEMORY;
";
