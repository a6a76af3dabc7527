use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::animations::snippet::{sanitize_rate, sanitize_scale, unique_name};
use crate::animations::{BlendMode, Keyframe, Snippet, SnippetCategory};
use crate::errors::Error;

/// Any field of the wrong type reads as absent instead of failing the whole document.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// The authoring (and persistence) form of a snippet, as found in JSON files.
///
/// ```json
/// {
///   "name": "surprise",
///   "loop": false,
///   "snippetCategory": "auSnippet",
///   "snippetPriority": 5,
///   "curves": { "1": [{ "time": 0, "intensity": 0 }, { "t": 0.3, "v": 80 }] },
///   "au": [{ "t": 0.2, "id": 5, "v": 0.6 }],
///   "viseme": [{ "t": 0.1, "key": "aa", "v": 1 }]
/// }
/// ```
/// Every field is optional; see [`normalize`] for the defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetSource {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        rename = "loop",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub looping: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub snippet_category: Option<SnippetCategory>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub snippet_priority: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub snippet_playback_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub snippet_intensity_scale: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub snippet_blend_mode: Option<BlendMode>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub snippet_jaw_scale: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub snippet_balance: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub snippet_balance_map: Option<BTreeMap<String, f64>>,
    /// Channel id to `[{time|t, intensity|v, inherit?}]`.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub curves: Option<BTreeMap<String, Value>>,
    /// Action Unit keyframes: `[{t, id, v}]`.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub au: Option<Vec<Value>>,
    /// Viseme keyframes: `[{t, key, v}]`.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub viseme: Option<Vec<Value>>,
}

impl SnippetSource {
    /// Parses the JSON source format.
    ///
    /// # Errors
    /// * `JsonError`: the document is not JSON at all (or not an object). Garbled fields inside a
    ///   valid object never fail: they normalize to an empty contribution.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes back to the JSON source format.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<SnippetSource> for Snippet {
    fn from(source: SnippetSource) -> Self {
        normalize(source)
    }
}

impl From<&Snippet> for SnippetSource {
    fn from(snippet: &Snippet) -> Self {
        let curves = snippet
            .get_curves()
            .iter()
            .map(|(channel, curve)| (channel.clone(), json!(curve)))
            .collect();
        SnippetSource {
            name: Some(snippet.get_name().to_string()),
            looping: Some(snippet.is_loop()),
            snippet_category: Some(snippet.get_category()),
            snippet_priority: Some(snippet.get_priority() as f64),
            snippet_playback_rate: Some(snippet.get_playback_rate()),
            snippet_intensity_scale: Some(snippet.get_intensity_scale()),
            snippet_blend_mode: Some(snippet.get_blend_mode()),
            snippet_jaw_scale: Some(snippet.get_jaw_scale()),
            snippet_balance: snippet.balance,
            snippet_balance_map: match snippet.balance_map.is_empty() {
                true => None,
                false => Some(snippet.balance_map.clone()),
            },
            curves: Some(curves),
            au: None,
            viseme: None,
        }
    }
}

impl Snippet {
    /// Parses and normalizes a snippet from its JSON source format.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        SnippetSource::from_json(json).map(normalize)
    }

    /// Returns the authoring form of the snippet (channels in the curves form).
    pub fn to_source(&self) -> SnippetSource {
        SnippetSource::from(self)
    }

    /// Serializes the snippet into its JSON source format.
    pub fn to_json(&self) -> Result<String, Error> {
        self.to_source().to_json()
    }
}

/// Reads a number that may be written as a JSON number or a numeric string.
fn as_number(value: Option<&Value>) -> Option<f64> {
    let number: Option<f64> = match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(string) => string.trim().parse().ok(),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}

/// Reads a channel id written either as a JSON number or as a string.
fn as_channel_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(number) => match number.as_u64() {
            Some(integer) => Some(integer.to_string()),
            None => number.as_f64().map(|float| float.to_string()),
        },
        Value::String(string) if !string.is_empty() => Some(string.clone()),
        _ => None,
    }
}

/// Reads one `{time|t, intensity|v, inherit?}` point. Anything else is skipped.
fn parse_point(value: &Value) -> Option<Keyframe> {
    let object = value.as_object()?;
    let time = as_number(object.get("time").or(object.get("t")))?;
    let intensity = as_number(object.get("intensity").or(object.get("v")))?;
    let inherit = object
        .get("inherit")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Some(Keyframe::new(time, intensity).set_inherit(inherit))
}

/// Reads one `{t, <id_key>, v}` point of the parallel `au` / `viseme` lists.
fn parse_keyed_point(value: &Value, id_key: &str) -> Option<(String, Keyframe)> {
    let channel = as_channel_id(value.get(id_key))?;
    let keyframe = parse_point(value)?;
    Some((channel, keyframe))
}

/// Converts an authoring-form snippet into its canonical form.
///
/// - a missing name gets a process-unique one,
/// - intensities above 1 are read as percentages (÷100),
/// - each channel curve is sorted by time; `inherit` flags are preserved,
/// - `au` / `viseme` lists are merged into the channel curves,
/// - a missing category is inferred from the lists provided (visemes only: `visemeSnippet`,
///   AUs and visemes: `combined`, otherwise `default`),
/// - invalid tuning is clamped: rate → 1, scale → max(0, scale).
///
/// Never fails: malformed points are skipped and empty curves dropped, so a garbled snippet is an
/// empty (no-op) one.
pub fn normalize(source: SnippetSource) -> Snippet {
    let mut points: BTreeMap<String, Vec<Keyframe>> = BTreeMap::new();

    for (channel, curve) in source.curves.unwrap_or_default() {
        let parsed: Vec<Keyframe> = curve
            .as_array()
            .map(|array| array.iter().filter_map(parse_point).collect())
            .unwrap_or_default();
        points.entry(channel).or_default().extend(parsed);
    }

    let au = source.au.unwrap_or_default();
    let viseme = source.viseme.unwrap_or_default();
    for (channel, keyframe) in au
        .iter()
        .filter_map(|point| parse_keyed_point(point, "id"))
        .chain(viseme.iter().filter_map(|point| parse_keyed_point(point, "key")))
    {
        points.entry(channel).or_default().push(keyframe);
    }

    let category = source
        .snippet_category
        .unwrap_or(match (au.is_empty(), viseme.is_empty()) {
            (true, false) => SnippetCategory::VisemeSnippet,
            (false, false) => SnippetCategory::Combined,
            _ => SnippetCategory::Default,
        });

    let mut snippet = Snippet::new(source.name.unwrap_or_else(unique_name))
        .set_loop(source.looping.unwrap_or(false))
        .set_category(category)
        .set_priority(source.snippet_priority.map(|p| p.round() as i32).unwrap_or(0))
        .set_playback_rate(sanitize_rate(source.snippet_playback_rate.unwrap_or(1.0)))
        .set_intensity_scale(sanitize_scale(source.snippet_intensity_scale.unwrap_or(1.0)))
        .set_blend_mode(source.snippet_blend_mode.unwrap_or_default())
        .set_jaw_scale(source.snippet_jaw_scale.filter(|s| s.is_finite()).unwrap_or(1.0));
    if let Some(balance) = source.snippet_balance.filter(|b| b.is_finite()) {
        snippet = snippet.set_balance(balance);
    }
    for (channel, balance) in source.snippet_balance_map.unwrap_or_default() {
        snippet = snippet.with_balance(channel, balance);
    }
    for (channel, curve) in points {
        snippet = snippet.with_curve(channel, curve);
    }
    snippet
}
