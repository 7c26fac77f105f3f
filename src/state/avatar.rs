/// The in-memory avatar: gender, style, and the per-category selections
/// that get sent back to the avatar service.
///
/// Constructed from a successful fetch, mutated in place by applying
/// accessories, replaced wholesale only by a new fetch.
use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::EditorError;

/// The five customization slots the editor knows about.
///
/// This is a closed set on purpose: selection keys are typed, never raw
/// strings, so an unknown key cannot sneak into a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Hats,
    Tops,
    Bottoms,
    Outerwear,
    Outfits,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Hats,
        Category::Tops,
        Category::Bottoms,
        Category::Outerwear,
        Category::Outfits,
    ];

    /// Plural display form, also used as the key in the registry record.
    pub fn label(self) -> &'static str {
        match self {
            Category::Hats => "hats",
            Category::Tops => "tops",
            Category::Bottoms => "bottoms",
            Category::Outerwear => "outerwear",
            Category::Outfits => "outfits",
        }
    }

    /// Singular request-parameter form used by the avatar service.
    ///
    /// "outfits" maps to "outfit"; the rest drop their trailing plural "s"
    /// ("outerwear" has none to drop and stays as-is).
    pub fn request_key(self) -> &'static str {
        match self {
            Category::Hats => "hat",
            Category::Tops => "top",
            Category::Bottoms => "bottom",
            Category::Outerwear => "outerwear",
            Category::Outfits => "outfit",
        }
    }

    /// Resolve a category from either its plural label or its singular
    /// request key. Anything else is not a category.
    pub fn from_key(key: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|c| c.label() == key || c.request_key() == key)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A slot's value: either a concrete option identifier or the service's
/// "nothing selected" sentinel, which is the number -1 on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Unset,
    Id(String),
}

impl Selection {
    pub fn id(&self) -> Option<&str> {
        match self {
            Selection::Unset => None,
            Selection::Id(id) => Some(id),
        }
    }

    /// Lenient wire decoding: the service sends numbers for built-in values
    /// and we send strings back for user-entered ones. -1 means unset.
    fn from_value(value: &Value) -> Option<Selection> {
        match value {
            Value::Number(n) if n.as_i64() == Some(-1) => Some(Selection::Unset),
            Value::Number(n) => Some(Selection::Id(n.to_string())),
            Value::String(s) => Some(Selection::Id(s.clone())),
            _ => None,
        }
    }
}

impl Serialize for Selection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Selection::Unset => serializer.serialize_i64(-1),
            Selection::Id(id) => serializer.serialize_str(id),
        }
    }
}

/// A gender/style attribute. The service uses numbers, but we don't care:
/// the value is opaque, fixed at fetch time, and echoed back verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attr {
    Num(i64),
    Text(String),
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attr::Num(n) => write!(f, "{}", n),
            Attr::Text(s) => f.write_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Selection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Selection::from_value(&value)
            .ok_or_else(|| de::Error::custom(format!("not an option id: {}", value)))
    }
}

/// The avatar as last seen by (or about to be sent to) the service.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarState {
    /// Opaque identifier shaped `{base}_{session}-s{version}`; the session
    /// number advances on every successful save.
    pub id: String,
    pub gender: Attr,
    pub style: Attr,
    /// Per-category selections, keyed by the closed category set.
    pub selections: BTreeMap<Category, Selection>,
}

impl AvatarState {
    /// Build an avatar from the service's fetch response.
    ///
    /// `gender`, `style`, `option_ids` and `id` are required. Keys of
    /// `option_ids` that aren't one of our five categories are dropped:
    /// the selection map is typed, not an open string map.
    pub fn from_remote(payload: &Value) -> Result<AvatarState, EditorError> {
        let gender = attr_field(payload, "gender")?;
        let style = attr_field(payload, "style")?;

        let id = payload
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| schema_error("id"))?
            .to_string();

        let option_ids = payload
            .get("option_ids")
            .and_then(Value::as_object)
            .ok_or_else(|| schema_error("option_ids"))?;

        let mut selections = BTreeMap::new();
        for (key, value) in option_ids {
            let Some(category) = Category::from_key(key) else {
                continue;
            };
            let Some(selection) = Selection::from_value(value) else {
                return Err(EditorError::RemoteSchema(format!(
                    "option id for {:?} is not a number or string",
                    key
                )));
            };
            selections.insert(category, selection);
        }

        Ok(AvatarState {
            id,
            gender,
            style,
            selections,
        })
    }

    /// Select an accessory. Purely local; the identifier is trusted as-is
    /// (the service is the only judge of whether it exists).
    pub fn apply(&mut self, category: Category, identifier: impl Into<String>) {
        self.selections
            .insert(category, Selection::Id(identifier.into()));
    }

    /// Ordered query parameters for the composed-avatar preview endpoints:
    /// the fixed params first, then every set selection in map order.
    /// Unset slots are omitted entirely.
    pub fn request_params(&self, scale: &str) -> Vec<(String, String)> {
        let mut params = vec![
            ("scale".to_string(), scale.to_string()),
            ("gender".to_string(), self.gender.to_string()),
            ("style".to_string(), self.style.to_string()),
            ("rotation".to_string(), "0".to_string()),
            ("version".to_string(), "0".to_string()),
        ];

        for (category, selection) in &self.selections {
            if let Some(id) = selection.id() {
                params.push((category.request_key().to_string(), id.to_string()));
            }
        }

        params
    }

    /// JSON body for the edit POST. Unset slots serialize back to -1.
    pub fn save_payload(&self) -> Value {
        let option_ids: serde_json::Map<String, Value> = self
            .selections
            .iter()
            .map(|(category, selection)| {
                let value = serde_json::to_value(selection).unwrap_or(Value::from(-1));
                (category.request_key().to_string(), value)
            })
            .collect();

        json!({
            "gender": self.gender,
            "style": self.style,
            "mode": "edit",
            "option_ids": option_ids,
        })
    }

    /// After a successful save the service renders the avatar under the next
    /// session number. The identifier grammar is `base "_" session "-s"
    /// version`: split on the last underscore, then the tail on the first
    /// "-s", and the session part must be an integer.
    ///
    /// A malformed identifier is fatal to the save flow's confirmation step
    /// (the save itself already landed remotely).
    pub fn advance_session_version(&mut self) -> Result<(), EditorError> {
        let malformed = || EditorError::MalformedIdentifier(self.id.clone());

        let (base, tail) = self.id.rsplit_once('_').ok_or_else(malformed)?;
        let (session, version) = tail.split_once("-s").ok_or_else(malformed)?;

        if base.is_empty() || version.is_empty() {
            return Err(malformed());
        }

        let session: u64 = session.parse().map_err(|_| malformed())?;

        self.id = format!("{}_{}-s{}", base, session + 1, version);
        Ok(())
    }
}

fn attr_field(payload: &Value, field: &str) -> Result<Attr, EditorError> {
    payload
        .get(field)
        .and_then(|v| serde_json::from_value::<Attr>(v.clone()).ok())
        .ok_or_else(|| schema_error(field))
}

fn schema_error(field: &str) -> EditorError {
    EditorError::RemoteSchema(format!("missing or invalid field {:?}", field))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AvatarState {
        AvatarState::from_remote(&json!({
            "gender": "m",
            "style": "1",
            "option_ids": { "hat": -1 },
            "id": "u_1-s0",
        }))
        .unwrap()
    }

    #[test]
    fn test_from_remote_reads_required_fields() {
        let avatar = sample();
        assert_eq!(avatar.id, "u_1-s0");
        assert_eq!(avatar.gender, Attr::Text("m".to_string()));
        assert_eq!(
            avatar.selections.get(&Category::Hats),
            Some(&Selection::Unset)
        );
    }

    #[test]
    fn test_from_remote_rejects_missing_fields() {
        for missing in ["gender", "style", "option_ids", "id"] {
            let mut payload = json!({
                "gender": 2,
                "style": 5,
                "option_ids": {},
                "id": "u_1-s0",
            });
            payload.as_object_mut().unwrap().remove(missing);

            let err = AvatarState::from_remote(&payload).unwrap_err();
            assert!(matches!(err, EditorError::RemoteSchema(_)), "{}", missing);
        }
    }

    #[test]
    fn test_from_remote_drops_unknown_option_keys() {
        let avatar = AvatarState::from_remote(&json!({
            "gender": 2,
            "style": 5,
            "option_ids": { "hat": 123, "beard": 9, "eyelash": -1 },
            "id": "u_1-s0",
        }))
        .unwrap();

        assert_eq!(avatar.selections.len(), 1);
        assert_eq!(
            avatar.selections.get(&Category::Hats),
            Some(&Selection::Id("123".to_string()))
        );
    }

    #[test]
    fn test_apply_normalizes_category_keys() {
        let mut avatar = sample();
        avatar.apply(Category::Outfits, "42");
        avatar.apply(Category::Hats, "7");

        let payload = avatar.save_payload();
        assert_eq!(payload["option_ids"]["outfit"], json!("42"));
        assert_eq!(payload["option_ids"]["hat"], json!("7"));
    }

    #[test]
    fn test_outerwear_key_is_not_truncated() {
        assert_eq!(Category::Outerwear.request_key(), "outerwear");
    }

    #[test]
    fn test_request_params_omit_unset_selections() {
        let mut avatar = sample();
        avatar.apply(Category::Tops, "88");

        let params = avatar.request_params("2");
        assert_eq!(
            params[..5],
            [
                ("scale".to_string(), "2".to_string()),
                ("gender".to_string(), "m".to_string()),
                ("style".to_string(), "1".to_string()),
                ("rotation".to_string(), "0".to_string()),
                ("version".to_string(), "0".to_string()),
            ]
        );
        // hat is unset and must not appear
        assert_eq!(params[5..], [("top".to_string(), "88".to_string())]);
    }

    #[test]
    fn test_save_payload_shape() {
        let avatar = sample();
        let payload = avatar.save_payload();

        assert_eq!(payload["mode"], json!("edit"));
        assert_eq!(payload["gender"], json!("m"));
        assert_eq!(payload["style"], json!("1"));
        assert_eq!(payload["option_ids"], json!({ "hat": -1 }));
    }

    #[test]
    fn test_advance_session_version() {
        let mut avatar = sample();
        avatar.id = "abc_12-s3".to_string();

        avatar.advance_session_version().unwrap();
        assert_eq!(avatar.id, "abc_13-s3");
    }

    #[test]
    fn test_advance_session_version_rejects_malformed_ids() {
        for bad in ["abc-12", "abc_12", "abc_x-s3", "_12-s3", "abc_12-s"] {
            let mut avatar = sample();
            avatar.id = bad.to_string();

            let err = avatar.advance_session_version().unwrap_err();
            assert_eq!(err, EditorError::MalformedIdentifier(bad.to_string()));
        }
    }

    #[test]
    fn test_edit_session_scenario() {
        // Fetch, apply a hat, save, advance: the full edit loop.
        let mut avatar = sample();
        assert_eq!(
            avatar.selections.get(&Category::Hats),
            Some(&Selection::Unset)
        );

        avatar.apply(Category::Hats, "55");
        assert_eq!(
            avatar.selections.get(&Category::Hats),
            Some(&Selection::Id("55".to_string()))
        );

        avatar.advance_session_version().unwrap();
        assert_eq!(avatar.id, "u_2-s0");
    }

    #[test]
    fn test_selection_deserializes_sentinel_numbers_and_strings() {
        let unset: Selection = serde_json::from_value(json!(-1)).unwrap();
        assert_eq!(unset, Selection::Unset);

        let numeric: Selection = serde_json::from_value(json!(123)).unwrap();
        assert_eq!(numeric, Selection::Id("123".to_string()));

        let textual: Selection = serde_json::from_value(json!("55")).unwrap();
        assert_eq!(textual, Selection::Id("55".to_string()));

        assert!(serde_json::from_value::<Selection>(json!(["nope"])).is_err());
    }

    #[test]
    fn test_from_remote_accepts_string_option_ids() {
        let avatar = AvatarState::from_remote(&json!({
            "gender": "m",
            "style": "1",
            "option_ids": { "top": "88" },
            "id": "u_1-s0",
        }))
        .unwrap();

        assert_eq!(
            avatar.selections.get(&Category::Tops),
            Some(&Selection::Id("88".to_string()))
        );
    }

    #[test]
    fn test_attr_round_trips_numbers_and_strings() {
        let n: Attr = serde_json::from_value(json!(2)).unwrap();
        assert_eq!(serde_json::to_value(&n).unwrap(), json!(2));
        assert_eq!(n.to_string(), "2");

        let s: Attr = serde_json::from_value(json!("m")).unwrap();
        assert_eq!(serde_json::to_value(&s).unwrap(), json!("m"));
        assert_eq!(s.to_string(), "m");
    }

    #[test]
    fn test_category_key_resolution() {
        assert_eq!(Category::from_key("hats"), Some(Category::Hats));
        assert_eq!(Category::from_key("hat"), Some(Category::Hats));
        assert_eq!(Category::from_key("outfit"), Some(Category::Outfits));
        assert_eq!(Category::from_key("beard"), None);
    }
}
