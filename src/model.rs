use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Keys owned by `Shortcut` itself; never carried in the pass-through map.
const RESERVED_KEYS: [&str; 6] = ["name", "path", "type", "icon", "createdAt", "updatedAt"];

/// What a shortcut does when executed. Tags this build does not know are kept
/// verbatim so older builds can round-trip newer files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShortcutKind {
    Url,
    App,
    Command,
    Folder,
    Unknown(String),
}

impl Default for ShortcutKind {
    fn default() -> Self {
        ShortcutKind::Unknown(String::new())
    }
}

impl ShortcutKind {
    pub fn as_str(&self) -> &str {
        match self {
            ShortcutKind::Url => "url",
            ShortcutKind::App => "app",
            ShortcutKind::Command => "command",
            ShortcutKind::Folder => "folder",
            ShortcutKind::Unknown(tag) => tag,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ShortcutKind::Url => "Website",
            ShortcutKind::App => "Application",
            ShortcutKind::Command => "Command",
            ShortcutKind::Folder => "Folder",
            ShortcutKind::Unknown(tag) => tag,
        }
    }
}

impl From<String> for ShortcutKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "url" => ShortcutKind::Url,
            "app" => ShortcutKind::App,
            "command" => ShortcutKind::Command,
            "folder" => ShortcutKind::Folder,
            _ => ShortcutKind::Unknown(tag),
        }
    }
}

impl From<&str> for ShortcutKind {
    fn from(tag: &str) -> Self {
        ShortcutKind::from(tag.to_string())
    }
}

impl From<ShortcutKind> for String {
    fn from(kind: ShortcutKind) -> Self {
        match kind {
            ShortcutKind::Unknown(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ShortcutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted shortcut. Position in the store is its only identity.
///
/// Reading never fails: a known key whose value has the wrong shape stays in
/// `extra` under its own name and is written back as it was read, until an
/// update replaces it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shortcut {
    pub name: String,
    pub path: String,
    pub kind: ShortcutKind,
    pub icon: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    // Fields written by other tools or newer builds
    pub extra: Map<String, Value>,
    /// A list element that was not an object at all.
    pub opaque: Option<Value>,
}

impl Shortcut {
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self { opaque: Some(value), ..Default::default() };
        };

        Self {
            name: take_string(&mut fields, "name").unwrap_or_default(),
            path: take_string(&mut fields, "path").unwrap_or_default(),
            kind: take_string(&mut fields, "type").map(ShortcutKind::from).unwrap_or_default(),
            icon: take_string(&mut fields, "icon"),
            created_at: take_timestamp(&mut fields, "createdAt"),
            updated_at: take_timestamp(&mut fields, "updatedAt"),
            extra: fields,
            opaque: None,
        }
    }
}

/// Removes `key` only when it holds a string.
fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::String(_)) => match fields.remove(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        },
        _ => None,
    }
}

/// Removes `key` only when it holds an RFC 3339 timestamp.
fn take_timestamp(fields: &mut Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let parsed = fields
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))?;
    fields.remove(key);
    Some(parsed)
}

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl<'de> Deserialize<'de> for Shortcut {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Shortcut::from_value)
    }
}

impl Serialize for Shortcut {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Some(opaque) = &self.opaque {
            return opaque.serialize(serializer);
        }

        let mut map = serializer.serialize_map(None)?;
        // A raw value kept in `extra` wins over the empty typed default.
        if !self.extra.contains_key("name") {
            map.serialize_entry("name", &self.name)?;
        }
        if !self.extra.contains_key("path") {
            map.serialize_entry("path", &self.path)?;
        }
        if !self.extra.contains_key("type") {
            map.serialize_entry("type", self.kind.as_str())?;
        }
        if let Some(icon) = self.icon.as_ref().filter(|_| !self.extra.contains_key("icon")) {
            map.serialize_entry("icon", icon)?;
        }
        if let Some(at) = self.created_at.as_ref().filter(|_| !self.extra.contains_key("createdAt")) {
            map.serialize_entry("createdAt", &format_timestamp(at))?;
        }
        if let Some(at) = self.updated_at.as_ref().filter(|_| !self.extra.contains_key("updatedAt")) {
            map.serialize_entry("updatedAt", &format_timestamp(at))?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Fields supplied when adding a shortcut.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShortcutInput {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ShortcutKind,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial update for a shortcut; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShortcutPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<ShortcutKind>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Shortcut {
    /// Builds a new record from user input, stamping `createdAt` and deriving
    /// the icon when none was given.
    pub fn create(input: ShortcutInput, now: DateTime<Utc>) -> Self {
        let icon = input
            .icon
            .filter(|icon| !icon.is_empty())
            .unwrap_or_else(|| derive_icon(&input.name));

        Self {
            name: input.name,
            path: input.path,
            kind: input.kind,
            icon: Some(icon),
            created_at: Some(now),
            updated_at: None,
            extra: strip_reserved(input.extra),
            opaque: None,
        }
    }

    /// Last write wins per field. Pass-through keys are merged one by one.
    pub fn merge(&mut self, patch: ShortcutPatch, now: DateTime<Utc>) {
        // Merging into a non-object element starts a fresh record.
        self.opaque = None;
        if let Some(name) = patch.name {
            self.name = name;
            self.extra.remove("name");
        }
        if let Some(path) = patch.path {
            self.path = path;
            self.extra.remove("path");
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
            self.extra.remove("type");
        }
        if let Some(icon) = patch.icon {
            self.icon = Some(icon);
            self.extra.remove("icon");
        }
        self.extra.extend(strip_reserved(patch.extra));
        self.updated_at = Some(now);
        self.extra.remove("updatedAt");
    }

    pub fn display_icon(&self) -> String {
        match &self.icon {
            Some(icon) if !icon.is_empty() => icon.clone(),
            _ => derive_icon(&self.name),
        }
    }
}

/// Uppercased first character of `name`, or empty for an empty name.
pub fn derive_icon(name: &str) -> String {
    name.chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

fn strip_reserved(mut extra: Map<String, Value>) -> Map<String, Value> {
    for key in RESERVED_KEYS {
        extra.remove(key);
    }
    extra
}

fn starter(name: &str, path: &str, kind: ShortcutKind, icon: &str, now: DateTime<Utc>) -> Shortcut {
    Shortcut {
        name: name.to_string(),
        path: path.to_string(),
        kind,
        icon: Some(icon.to_string()),
        created_at: Some(now),
        updated_at: None,
        extra: Map::new(),
        opaque: None,
    }
}

#[cfg(target_os = "windows")]
fn platform_starter(now: DateTime<Utc>) -> Shortcut {
    starter("Notepad", "notepad.exe", ShortcutKind::App, "N", now)
}

#[cfg(target_os = "macos")]
fn platform_starter(now: DateTime<Utc>) -> Shortcut {
    starter("TextEdit", "/System/Applications/TextEdit.app", ShortcutKind::App, "T", now)
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn platform_starter(now: DateTime<Utc>) -> Shortcut {
    starter("Terminal", "x-terminal-emulator", ShortcutKind::App, "$", now)
}

/// Starter set written when there is no usable shortcuts file.
pub fn default_shortcuts(now: DateTime<Utc>) -> Vec<Shortcut> {
    vec![
        starter("Google", "https://www.google.com", ShortcutKind::Url, "G", now),
        starter("GitHub", "https://github.com", ShortcutKind::Url, "GH", now),
        platform_starter(now),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub theme: String,
    pub start_at_login: bool,
    pub max_results: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_theme() -> String { "dark".to_string() }
fn default_max_results() -> u32 { 10 }

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            start_at_login: true,
            max_results: default_max_results(),
            extra: Map::new(),
        }
    }
}

impl<'de> Deserialize<'de> for Settings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Settings::from_map)
    }
}

/// Known settings a caller may change. Unknown keys only ever come from disk.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub theme: Option<String>,
    pub start_at_login: Option<bool>,
    pub max_results: Option<u32>,
}

impl Settings {
    /// Overlays persisted keys on the defaults. A known key holding the wrong
    /// type is dropped in favour of its default; unknown keys pass through.
    pub fn from_map(mut fields: Map<String, Value>) -> Self {
        let mut settings = Settings::default();

        match fields.remove("theme") {
            Some(Value::String(theme)) => settings.theme = theme,
            Some(other) => log::warn!("Ignoring invalid theme setting: {}", other),
            None => {}
        }
        match fields.remove("startAtLogin") {
            Some(Value::Bool(start_at_login)) => settings.start_at_login = start_at_login,
            Some(other) => log::warn!("Ignoring invalid startAtLogin setting: {}", other),
            None => {}
        }
        if let Some(value) = fields.remove("maxResults") {
            match value.as_u64().and_then(|n| u32::try_from(n).ok()) {
                Some(max_results) => settings.max_results = max_results,
                None => log::warn!("Ignoring invalid maxResults setting: {}", value),
            }
        }

        settings.extra = fields;
        settings
    }

    pub fn merge(&mut self, patch: SettingsPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(start_at_login) = patch.start_at_login {
            self.start_at_login = start_at_login;
        }
        if let Some(max_results) = patch.max_results {
            self.max_results = max_results;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(name: &str, path: &str, kind: &str) -> ShortcutInput {
        ShortcutInput {
            name: name.to_string(),
            path: path.to_string(),
            kind: kind.into(),
            ..Default::default()
        }
    }

    #[test]
    fn unknown_kind_survives_round_trip() {
        let raw = json!({ "name": "Notes", "path": "notes://", "type": "snippet" });
        let shortcut: Shortcut = serde_json::from_value(raw).unwrap();
        assert_eq!(shortcut.kind, ShortcutKind::Unknown("snippet".to_string()));

        let back = serde_json::to_value(&shortcut).unwrap();
        assert_eq!(back["type"], "snippet");
    }

    #[test]
    fn known_kinds_parse() {
        for (tag, kind) in [
            ("url", ShortcutKind::Url),
            ("app", ShortcutKind::App),
            ("command", ShortcutKind::Command),
            ("folder", ShortcutKind::Folder),
        ] {
            assert_eq!(ShortcutKind::from(tag), kind);
            assert_eq!(String::from(kind), tag);
        }
    }

    #[test]
    fn create_derives_icon_from_name() {
        let shortcut = Shortcut::create(input("github", "https://github.com", "url"), Utc::now());
        assert_eq!(shortcut.icon.as_deref(), Some("G"));
        assert!(shortcut.created_at.is_some());
        assert!(shortcut.updated_at.is_none());
    }

    #[test]
    fn create_keeps_supplied_icon_but_not_empty_one() {
        let mut with_icon = input("docs", "~/docs", "folder");
        with_icon.icon = Some("📁".to_string());
        assert_eq!(Shortcut::create(with_icon, Utc::now()).icon.as_deref(), Some("📁"));

        let mut empty_icon = input("docs", "~/docs", "folder");
        empty_icon.icon = Some(String::new());
        assert_eq!(Shortcut::create(empty_icon, Utc::now()).icon.as_deref(), Some("D"));
    }

    #[test]
    fn empty_name_gives_empty_icon() {
        assert_eq!(derive_icon(""), "");
        assert_eq!(derive_icon("ßtraße"), "SS");
    }

    #[test]
    fn merge_replaces_only_given_fields() {
        let created = Utc::now();
        let mut shortcut = Shortcut::create(input("Build", "make", "command"), created);
        let patch = ShortcutPatch {
            path: Some("make -j8".to_string()),
            ..Default::default()
        };
        let now = Utc::now();
        shortcut.merge(patch, now);

        assert_eq!(shortcut.name, "Build");
        assert_eq!(shortcut.path, "make -j8");
        assert_eq!(shortcut.kind, ShortcutKind::Command);
        assert_eq!(shortcut.created_at, Some(created));
        assert_eq!(shortcut.updated_at, Some(now));
    }

    #[test]
    fn patch_extras_pass_through_without_timestamps() {
        let created = Utc::now();
        let mut shortcut = Shortcut::create(input("Mail", "mailto:", "url"), created);
        let patch: ShortcutPatch = serde_json::from_value(json!({
            "color": "teal",
            "createdAt": "1999-01-01T00:00:00Z"
        }))
        .unwrap();
        shortcut.merge(patch, Utc::now());

        assert_eq!(shortcut.extra.get("color"), Some(&json!("teal")));
        assert!(!shortcut.extra.contains_key("createdAt"));
        assert_eq!(shortcut.created_at, Some(created));

        // one "createdAt" key on disk
        let text = serde_json::to_string(&shortcut).unwrap();
        assert_eq!(text.matches("createdAt").count(), 1);
    }

    #[test]
    fn missing_record_fields_are_tolerated() {
        let shortcut: Shortcut = serde_json::from_value(json!({ "name": "Orphan" })).unwrap();
        assert_eq!(shortcut.path, "");
        assert_eq!(shortcut.kind, ShortcutKind::Unknown(String::new()));
        assert_eq!(shortcut.display_icon(), "O");
    }

    #[test]
    fn wrongly_typed_fields_are_written_back_unchanged() {
        let raw = json!({
            "name": null,
            "path": "https://x",
            "type": 7,
            "createdAt": 1700000000000u64,
            "updatedAt": "last tuesday"
        });
        let shortcut: Shortcut = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(shortcut.name, "");
        assert_eq!(shortcut.path, "https://x");
        assert!(shortcut.created_at.is_none());
        assert_eq!(shortcut.extra.get("createdAt"), Some(&json!(1700000000000u64)));

        assert_eq!(serde_json::to_value(&shortcut).unwrap(), raw);
    }

    #[test]
    fn non_object_element_is_kept_as_is() {
        let shortcut: Shortcut = serde_json::from_value(json!(["odd", 1])).unwrap();
        assert_eq!(shortcut.kind, ShortcutKind::Unknown(String::new()));
        assert_eq!(serde_json::to_value(&shortcut).unwrap(), json!(["odd", 1]));
    }

    #[test]
    fn merge_replaces_raw_values() {
        let mut shortcut: Shortcut =
            serde_json::from_value(json!({ "name": null, "path": "p", "updatedAt": 5 })).unwrap();
        let now = Utc::now();
        shortcut.merge(ShortcutPatch { name: Some("Named".to_string()), ..Default::default() }, now);

        let back = serde_json::to_value(&shortcut).unwrap();
        assert_eq!(back["name"], "Named");
        assert_eq!(shortcut.updated_at, Some(now));
        assert!(!shortcut.extra.contains_key("updatedAt"));
    }

    #[test]
    fn timestamps_round_trip_exactly() {
        let shortcut = Shortcut::create(input("Clock", "x", "url"), Utc::now());
        let text = serde_json::to_string(&shortcut).unwrap();
        let back: Shortcut = serde_json::from_str(&text).unwrap();
        assert_eq!(back, shortcut);
    }

    #[test]
    fn defaults_have_two_urls_and_one_app() {
        let defaults = default_shortcuts(Utc::now());
        assert_eq!(defaults.len(), 3);
        assert_eq!(defaults[0].name, "Google");
        assert_eq!(defaults[1].name, "GitHub");
        assert_eq!(defaults[2].kind, ShortcutKind::App);
        assert!(defaults.iter().all(|s| s.created_at.is_some()));
    }

    #[test]
    fn settings_fill_missing_keys_and_keep_unknown_ones() {
        let settings: Settings =
            serde_json::from_value(json!({ "theme": "light", "accent": "orange" })).unwrap();
        assert_eq!(settings.theme, "light");
        assert!(settings.start_at_login);
        assert_eq!(settings.max_results, 10);
        assert_eq!(settings.extra.get("accent"), Some(&json!("orange")));

        let back = serde_json::to_value(&settings).unwrap();
        assert_eq!(back["accent"], "orange");
        assert_eq!(back["maxResults"], 10);
    }

    #[test]
    fn settings_with_one_bad_key_keep_the_rest() {
        let settings: Settings = serde_json::from_value(json!({
            "theme": "light",
            "maxResults": "20",
            "accent": "teal"
        }))
        .unwrap();
        assert_eq!(settings.theme, "light");
        assert_eq!(settings.max_results, 10);
        assert_eq!(settings.extra.get("accent"), Some(&json!("teal")));
        assert!(!settings.extra.contains_key("maxResults"));
    }

    #[test]
    fn settings_merge_touches_known_fields_only() {
        let mut settings = Settings::default();
        settings.extra.insert("accent".to_string(), json!("orange"));
        settings.merge(SettingsPatch {
            max_results: Some(25),
            ..Default::default()
        });
        assert_eq!(settings.max_results, 25);
        assert_eq!(settings.theme, "dark");
        assert_eq!(settings.extra.get("accent"), Some(&json!("orange")));
    }
}
