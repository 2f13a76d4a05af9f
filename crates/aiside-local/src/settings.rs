//! Course defaults and unit overrides for whether summaries are shown.
//!
//! Two stores: `MemorySettings` for tests and one-shot runs, `FileSettings` for a JSON file
//! that survives between CLI invocations. The free functions on top are what callers use;
//! they turn missing rows into `Error::SettingsNotFound` and resolve unit-over-course.

use aiside_core::{
    CourseKey, Error, FeatureFlags, Result, SettingsRecord, SettingsStore, Timestamp, UsageKey,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Both settings tables. This is also the on-disk shape of `FileSettings`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsTables {
    #[serde(default)]
    pub courses: BTreeMap<CourseKey, SettingsRecord>,
    #[serde(default)]
    pub units: BTreeMap<CourseKey, BTreeMap<UsageKey, SettingsRecord>>,
}

fn upsert<K: Ord>(
    table: &mut BTreeMap<K, SettingsRecord>,
    key: K,
    enabled: bool,
    now: Timestamp,
) -> SettingsRecord {
    *table
        .entry(key)
        .and_modify(|r| {
            r.enabled = enabled;
            r.modified = now;
        })
        .or_insert(SettingsRecord {
            enabled,
            created: now,
            modified: now,
        })
}

impl SettingsTables {
    fn set_course(&mut self, course: &CourseKey, enabled: bool) -> SettingsRecord {
        upsert(&mut self.courses, course.clone(), enabled, chrono::Utc::now())
    }

    fn unit(&self, course: &CourseKey, unit: &UsageKey) -> Option<SettingsRecord> {
        self.units.get(course).and_then(|u| u.get(unit)).copied()
    }

    fn set_unit(&mut self, course: &CourseKey, unit: &UsageKey, enabled: bool) -> SettingsRecord {
        let units = self.units.entry(course.clone()).or_default();
        upsert(units, unit.clone(), enabled, chrono::Utc::now())
    }

    fn delete_unit(&mut self, course: &CourseKey, unit: &UsageKey) -> bool {
        let Some(units) = self.units.get_mut(course) else {
            return false;
        };
        let removed = units.remove(unit).is_some();
        if units.is_empty() {
            self.units.remove(course);
        }
        removed
    }

    fn reset_course_units(&mut self, course: &CourseKey) -> usize {
        self.units.remove(course).map_or(0, |u| u.len())
    }
}

#[derive(Debug, Default)]
pub struct MemorySettings {
    tables: RwLock<SettingsTables>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SettingsTables {
        self.tables.read().clone()
    }
}

impl SettingsStore for MemorySettings {
    fn course(&self, course: &CourseKey) -> Result<Option<SettingsRecord>> {
        Ok(self.tables.read().courses.get(course).copied())
    }

    fn set_course(&self, course: &CourseKey, enabled: bool) -> Result<SettingsRecord> {
        Ok(self.tables.write().set_course(course, enabled))
    }

    fn delete_course(&self, course: &CourseKey) -> Result<bool> {
        Ok(self.tables.write().courses.remove(course).is_some())
    }

    fn unit(&self, course: &CourseKey, unit: &UsageKey) -> Result<Option<SettingsRecord>> {
        Ok(self.tables.read().unit(course, unit))
    }

    fn set_unit(
        &self,
        course: &CourseKey,
        unit: &UsageKey,
        enabled: bool,
    ) -> Result<SettingsRecord> {
        Ok(self.tables.write().set_unit(course, unit, enabled))
    }

    fn delete_unit(&self, course: &CourseKey, unit: &UsageKey) -> Result<bool> {
        Ok(self.tables.write().delete_unit(course, unit))
    }

    fn reset_course_units(&self, course: &CourseKey) -> Result<usize> {
        Ok(self.tables.write().reset_course_units(course))
    }
}

/// Settings kept in a JSON file. Every write replaces the file through a temp file in the
/// same directory, so readers never see a partial document.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty store.
    pub fn load(&self) -> Result<SettingsTables> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Error::Store(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SettingsTables::default()),
            Err(e) => Err(Error::Store(format!("read {}: {e}", self.path.display()))),
        }
    }

    fn save(&self, tables: &SettingsTables) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let io_err = |e: std::io::Error| Error::Store(format!("write {}: {e}", self.path.display()));
        std::fs::create_dir_all(dir).map_err(io_err)?;
        let body = serde_json::to_vec_pretty(tables).map_err(|e| Error::Store(e.to_string()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&body).map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&SettingsTables) -> T) -> Result<T> {
        let _guard = self.lock.lock();
        Ok(f(&self.load()?))
    }

    fn update<T>(&self, f: impl FnOnce(&mut SettingsTables) -> T) -> Result<T> {
        let _guard = self.lock.lock();
        let mut tables = self.load()?;
        let out = f(&mut tables);
        self.save(&tables)?;
        Ok(out)
    }
}

impl SettingsStore for FileSettings {
    fn course(&self, course: &CourseKey) -> Result<Option<SettingsRecord>> {
        self.read(|t| t.courses.get(course).copied())
    }

    fn set_course(&self, course: &CourseKey, enabled: bool) -> Result<SettingsRecord> {
        self.update(|t| t.set_course(course, enabled))
    }

    fn delete_course(&self, course: &CourseKey) -> Result<bool> {
        self.update(|t| t.courses.remove(course).is_some())
    }

    fn unit(&self, course: &CourseKey, unit: &UsageKey) -> Result<Option<SettingsRecord>> {
        self.read(|t| t.unit(course, unit))
    }

    fn set_unit(
        &self,
        course: &CourseKey,
        unit: &UsageKey,
        enabled: bool,
    ) -> Result<SettingsRecord> {
        self.update(|t| t.set_unit(course, unit, enabled))
    }

    fn delete_unit(&self, course: &CourseKey, unit: &UsageKey) -> Result<bool> {
        self.update(|t| t.delete_unit(course, unit))
    }

    fn reset_course_units(&self, course: &CourseKey) -> Result<usize> {
        self.update(|t| t.reset_course_units(course))
    }
}

/// The externally visible part of a settings row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledSettings {
    pub enabled: bool,
}

impl From<SettingsRecord> for EnabledSettings {
    fn from(r: SettingsRecord) -> Self {
        Self { enabled: r.enabled }
    }
}

fn course_not_found(course: &CourseKey) -> Error {
    Error::SettingsNotFound(format!("course {course}"))
}

fn unit_not_found(course: &CourseKey, unit: &UsageKey) -> Error {
    Error::SettingsNotFound(format!("unit {unit} in course {course}"))
}

pub fn get_course_settings(
    store: &dyn SettingsStore,
    course: &CourseKey,
) -> Result<EnabledSettings> {
    store
        .course(course)?
        .map(EnabledSettings::from)
        .ok_or_else(|| course_not_found(course))
}

pub fn set_course_settings(
    store: &dyn SettingsStore,
    course: &CourseKey,
    enabled: bool,
) -> Result<EnabledSettings> {
    store.set_course(course, enabled).map(EnabledSettings::from)
}

/// Removes the course row and every unit override of the course. Unit overrides are dropped
/// even when the course row turns out not to exist.
pub fn delete_course_settings(store: &dyn SettingsStore, course: &CourseKey) -> Result<()> {
    store.reset_course_units(course)?;
    if !store.delete_course(course)? {
        return Err(course_not_found(course));
    }
    Ok(())
}

pub fn get_unit_settings(
    store: &dyn SettingsStore,
    course: &CourseKey,
    unit: &UsageKey,
) -> Result<EnabledSettings> {
    store
        .unit(course, unit)?
        .map(EnabledSettings::from)
        .ok_or_else(|| unit_not_found(course, unit))
}

pub fn set_unit_settings(
    store: &dyn SettingsStore,
    course: &CourseKey,
    unit: &UsageKey,
    enabled: bool,
) -> Result<EnabledSettings> {
    store
        .set_unit(course, unit, enabled)
        .map(EnabledSettings::from)
}

pub fn delete_unit_settings(
    store: &dyn SettingsStore,
    course: &CourseKey,
    unit: &UsageKey,
) -> Result<()> {
    if !store.delete_unit(course, unit)? {
        return Err(unit_not_found(course, unit));
    }
    Ok(())
}

pub fn reset_course_unit_settings(store: &dyn SettingsStore, course: &CourseKey) -> Result<usize> {
    store.reset_course_units(course)
}

pub fn is_course_settings_present(store: &dyn SettingsStore, course: &CourseKey) -> Result<bool> {
    Ok(store.course(course)?.is_some())
}

/// May this course configure summaries at all?
pub fn is_summary_config_enabled(flags: &dyn FeatureFlags, course: &CourseKey) -> bool {
    flags.summaries_configuration_enabled(course)
}

/// Effective enable state: a unit override wins over the course default, and with neither
/// present summaries are off. Always off while the configuration flag is off.
pub fn is_summary_enabled(
    flags: &dyn FeatureFlags,
    store: &dyn SettingsStore,
    course: &CourseKey,
    unit: Option<&UsageKey>,
) -> Result<bool> {
    if !flags.summaries_configuration_enabled(course) {
        return Ok(false);
    }
    if let Some(unit) = unit {
        if let Some(record) = store.unit(course, unit)? {
            return Ok(record.enabled);
        }
    }
    Ok(store.course(course)?.is_some_and(|r| r.enabled))
}

/// Body of a settings write: `{"enabled": bool, "reset": bool?}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub enabled: bool,
    /// Course updates only: also drop every unit override.
    #[serde(default)]
    pub reset: bool,
}

impl SettingsUpdate {
    pub fn from_json(v: &serde_json::Value) -> Result<Self> {
        Self::deserialize(v).map_err(|e| Error::InvalidSettings(e.to_string()))
    }
}

pub fn apply_course_update(
    store: &dyn SettingsStore,
    course: &CourseKey,
    update: &SettingsUpdate,
) -> Result<EnabledSettings> {
    let settings = set_course_settings(store, course, update.enabled)?;
    if update.reset {
        reset_course_unit_settings(store, course)?;
    }
    Ok(settings)
}

pub fn apply_unit_update(
    store: &dyn SettingsStore,
    course: &CourseKey,
    unit: &UsageKey,
    update: &SettingsUpdate,
) -> Result<EnabledSettings> {
    set_unit_settings(store, course, unit, update.enabled)
}

/// Course-app view: whether the app shows up at all for the course.
pub fn is_available(flags: &dyn FeatureFlags, course: &CourseKey) -> bool {
    is_summary_config_enabled(flags, course)
}

/// Course-app view: the course-level enable state.
pub fn is_enabled(
    flags: &dyn FeatureFlags,
    store: &dyn SettingsStore,
    course: &CourseKey,
) -> Result<bool> {
    is_summary_enabled(flags, store, course, None)
}

/// Course-app view: set the course-level enable state and return it.
pub fn set_enabled(store: &dyn SettingsStore, course: &CourseKey, enabled: bool) -> Result<bool> {
    set_course_settings(store, course, enabled).map(|s| s.enabled)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedOperations {
    pub configure: bool,
    pub enable: bool,
}

/// Course staff and instructors may toggle the app; nobody configures it.
pub fn allowed_operations(role: Option<&str>) -> AllowedOperations {
    AllowedOperations {
        configure: false,
        enable: matches!(role, Some("staff" | "instructor")),
    }
}
