//! JSON view of object graphs.
//!
//! Used by tooling to print decoded messages and to build values from
//! hand-written JSON. Non-JSON types use tagged objects:
//!
//! | Value | JSON |
//! |---|---|
//! | date | `{"$date": "2024-01-01T00:00:00Z"}` |
//! | byte array | `{"$bytes": "<hex>"}` |
//! | XML | `{"$xml": "<a/>"}` |
//! | typed object | `{"$class": "org.Foo", ...members}` |
//! | vector | `{"$vector": "int", "fixed": false, "items": [...]}` |
//!
//! Nodes already on the current path are rendered as `{"$circular": "<kind>"}`.

use crate::date::Date;
use crate::error::CoreError;
use crate::object::{AsObject, Properties};
use crate::value::{ObjectVector, Value, Vector};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Number};
use std::collections::HashSet;

const CLASS_KEY: &str = "$class";

/// Renders a value as JSON.
pub fn to_json(value: &Value) -> serde_json::Value {
    let mut path = HashSet::new();
    render(value, &mut path)
}

fn render(value: &Value, path: &mut HashSet<usize>) -> serde_json::Value {
    let identity = value.identity();
    if let Some(id) = identity {
        if !path.insert(id) {
            return json!({ "$circular": value.kind().name() });
        }
    }

    let rendered = match value {
        Value::Null => serde_json::Value::Null,
        Value::Unsupported => json!({ "$unsupported": true }),
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => json!(i),
        Value::Number(n) => Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::Xml(s) => json!({ "$xml": s.to_string() }),
        Value::Date(d) => json!({ "$date": d.to_utc().to_rfc3339_opts(SecondsFormat::Millis, true) }),
        Value::ByteArray(b) => json!({ "$bytes": hex::encode(b.as_slice()) }),
        Value::Array(items) => {
            let items = items.read().clone();
            serde_json::Value::Array(items.iter().map(|v| render(v, path)).collect())
        }
        Value::Map(map) => {
            let map = map.read().clone();
            serde_json::Value::Object(render_properties(None, &map, path))
        }
        Value::Object(object) => {
            let object = object.read().clone();
            let class = object.is_typed().then(|| object.type_name().to_string());
            serde_json::Value::Object(render_properties(class, object.properties(), path))
        }
        Value::Typed(object) => {
            let (class, members) = {
                let guard = object.read();
                let members: Properties = guard
                    .members()
                    .into_iter()
                    .filter(|m| !m.transient)
                    .filter_map(|m| guard.get_member(&m.name).map(|v| (m.name, v)))
                    .collect();
                (guard.class_name().to_string(), members)
            };
            serde_json::Value::Object(render_properties(Some(class), &members, path))
        }
        Value::IntVector(v) => render_vector("int", &v.read()),
        Value::UIntVector(v) => render_vector("uint", &v.read()),
        Value::DoubleVector(v) => {
            let v = v.read();
            json!({ "$vector": "double", "fixed": v.fixed, "items": v.items })
        }
        Value::ObjectVector(v) => {
            let vector = v.read().clone();
            let items: Vec<serde_json::Value> =
                vector.items.iter().map(|item| render(item, path)).collect();
            json!({
                "$vector": "object",
                "type": vector.type_name,
                "fixed": vector.fixed,
                "items": items,
            })
        }
    };

    if let Some(id) = identity {
        path.remove(&id);
    }
    rendered
}

fn render_vector<T: serde::Serialize>(kind: &str, vector: &Vector<T>) -> serde_json::Value {
    json!({ "$vector": kind, "fixed": vector.fixed, "items": vector.items })
}

fn render_properties(
    class: Option<String>,
    properties: &Properties,
    path: &mut HashSet<usize>,
) -> Map<String, serde_json::Value> {
    let mut out = Map::new();
    if let Some(class) = class {
        out.insert(CLASS_KEY.to_string(), serde_json::Value::String(class));
    }
    for (key, value) in properties.iter() {
        out.insert(key.to_string(), render(value, path));
    }
    out
}

/// Builds a value from JSON. Integral numbers inside the 32-bit range become
/// integers; tagged objects are recognised as described in the module docs.
pub fn from_json(json: &serde_json::Value) -> Result<Value, CoreError> {
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => match n.as_i64().map(i32::try_from) {
            Some(Ok(i)) => Value::Integer(i),
            _ => Value::Number(
                n.as_f64()
                    .ok_or_else(|| CoreError::InvalidJson(format!("number out of range: {}", n)))?,
            ),
        },
        serde_json::Value::String(s) => Value::string(s),
        serde_json::Value::Array(items) => Value::array(
            items
                .iter()
                .map(from_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        serde_json::Value::Object(map) => from_json_object(map)?,
    })
}

fn tagged_str<'a>(map: &'a Map<String, serde_json::Value>, key: &str) -> Result<&'a str, CoreError> {
    map.get(key)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| CoreError::InvalidJson(format!("'{}' must be a string", key)))
}

fn from_json_object(map: &Map<String, serde_json::Value>) -> Result<Value, CoreError> {
    if map.contains_key("$date") {
        let text = tagged_str(map, "$date")?;
        let instant = DateTime::parse_from_rfc3339(text)
            .map_err(|e| CoreError::InvalidJson(format!("invalid date '{}': {}", text, e)))?;
        return Ok(Value::Date(Date::from_utc(instant.with_timezone(&Utc))));
    }
    if map.contains_key("$bytes") {
        let text = tagged_str(map, "$bytes")?;
        let bytes = hex::decode(text)
            .map_err(|e| CoreError::InvalidJson(format!("invalid hex bytes: {}", e)))?;
        return Ok(Value::byte_array(bytes));
    }
    if map.contains_key("$xml") {
        return Ok(Value::xml(tagged_str(map, "$xml")?));
    }
    if map.contains_key("$vector") {
        return from_json_vector(map);
    }

    let mut object = match map.get(CLASS_KEY) {
        Some(serde_json::Value::String(class)) => AsObject::typed(class.clone()),
        Some(_) => return Err(CoreError::InvalidJson("'$class' must be a string".to_string())),
        None => AsObject::new(),
    };
    for (key, value) in map.iter().filter(|(k, _)| k.as_str() != CLASS_KEY) {
        object.insert(key.clone(), from_json(value)?);
    }
    Ok(Value::object(object))
}

fn from_json_vector(map: &Map<String, serde_json::Value>) -> Result<Value, CoreError> {
    let kind = tagged_str(map, "$vector")?;
    let fixed = map.get("fixed").and_then(serde_json::Value::as_bool).unwrap_or(false);
    let items: Vec<serde_json::Value> = match map.get("items") {
        Some(serde_json::Value::Array(items)) => items.clone(),
        None => Vec::new(),
        Some(_) => return Err(CoreError::InvalidJson("'items' must be an array".to_string())),
    };
    let bad = |item: &serde_json::Value| CoreError::InvalidJson(format!("invalid {} vector item: {}", kind, item));

    let value = match kind {
        "int" => {
            let items = items
                .iter()
                .map(|i| i.as_i64().and_then(|n| i32::try_from(n).ok()).ok_or_else(|| bad(i)))
                .collect::<Result<Vec<_>, _>>()?;
            Value::int_vector(Vector { fixed, items })
        }
        "uint" => {
            let items = items
                .iter()
                .map(|i| i.as_u64().and_then(|n| u32::try_from(n).ok()).ok_or_else(|| bad(i)))
                .collect::<Result<Vec<_>, _>>()?;
            Value::uint_vector(Vector { fixed, items })
        }
        "double" => {
            let items = items
                .iter()
                .map(|i| i.as_f64().ok_or_else(|| bad(i)))
                .collect::<Result<Vec<_>, _>>()?;
            Value::double_vector(Vector { fixed, items })
        }
        "object" => {
            let type_name = map.get("type").and_then(serde_json::Value::as_str).unwrap_or("");
            let items = items.iter().map(from_json).collect::<Result<Vec<_>, _>>()?;
            Value::object_vector(ObjectVector {
                type_name: type_name.to_string(),
                fixed,
                items,
            })
        }
        other => return Err(CoreError::InvalidJson(format!("unknown vector kind '{}'", other))),
    };
    Ok(value)
}
