//! GraphSON 3.0 decoding.
//!
//! Turns the typed JSON returned by a Gremlin Server HTTP endpoint into the
//! closed [`RawElement`] model. Typed values look like
//! `{"@type": "g:Int64", "@value": 1}`; untyped JSON is accepted as well and
//! decodes to lists, maps and scalars.

use serde_json::{Map, Value as JsonValue};
use crate::common::error::{Result, WorkbenchError};
use crate::common::value::{MapKey, RawEdge, RawElement, RawProperties, RawVertex};
use crate::graphson_ensure;

const TYPE_KEY: &str = "@type";
const VALUE_KEY: &str = "@value";

/// Decode a full Gremlin Server response body into its result items.
///
/// A non-2xx `status.code` becomes a query error carrying the server message.
pub fn decode_response(body: &JsonValue) -> Result<Vec<RawElement>> {
    if let Some(status) = body.get("status") {
        let code = status.get("code").and_then(JsonValue::as_u64).unwrap_or(200);
        if !(200..300).contains(&code) {
            let message = status
                .get("message")
                .and_then(JsonValue::as_str)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("server responded with status {}", code));
            return Err(WorkbenchError::query(message));
        }
    }

    let data = match body.get("result").and_then(|r| r.get("data")) {
        Some(data) => data,
        None => return Ok(Vec::new()),
    };

    match decode(data)? {
        RawElement::List(items) => Ok(items),
        RawElement::Scalar(JsonValue::Null) => Ok(Vec::new()),
        single => Ok(vec![single]),
    }
}

/// Decode one GraphSON value
pub fn decode(value: &JsonValue) -> Result<RawElement> {
    match value {
        JsonValue::Object(obj) => match typed_parts(obj) {
            Some((type_name, inner)) => decode_typed(type_name, inner),
            None => {
                let mut entries = Vec::with_capacity(obj.len());
                for (key, v) in obj {
                    entries.push((MapKey::plain(key.clone()), decode(v)?));
                }
                Ok(RawElement::Map(entries))
            }
        },
        JsonValue::Array(items) => Ok(RawElement::List(decode_all(items)?)),
        scalar => Ok(RawElement::Scalar(scalar.clone())),
    }
}

/// Decode a value and flatten it to plain JSON (property values, ids)
pub fn decode_plain(value: &JsonValue) -> Result<JsonValue> {
    Ok(decode(value)?.to_plain_json())
}

fn typed_parts(obj: &Map<String, JsonValue>) -> Option<(&str, &JsonValue)> {
    let type_name = obj.get(TYPE_KEY)?.as_str()?;
    let inner = obj.get(VALUE_KEY).unwrap_or(&JsonValue::Null);
    Some((type_name, inner))
}

fn decode_all(items: &[JsonValue]) -> Result<Vec<RawElement>> {
    items.iter().map(decode).collect()
}

fn decode_typed(type_name: &str, inner: &JsonValue) -> Result<RawElement> {
    match type_name {
        "g:Vertex" => Ok(RawElement::Vertex(decode_vertex(inner)?)),
        "g:Edge" => Ok(RawElement::Edge(decode_edge(inner)?)),
        "g:Path" => {
            let objects = inner.get("objects").unwrap_or(&JsonValue::Null);
            match decode(objects)? {
                RawElement::List(items) => Ok(RawElement::Path(items)),
                RawElement::Scalar(JsonValue::Null) => Ok(RawElement::Path(Vec::new())),
                other => Ok(RawElement::Path(vec![other])),
            }
        }
        "g:List" | "g:Set" => match inner {
            JsonValue::Array(items) => Ok(RawElement::List(decode_all(items)?)),
            JsonValue::Null => Ok(RawElement::List(Vec::new())),
            _ => Err(WorkbenchError::graphson(format!("{} payload is not an array", type_name))),
        },
        "g:BulkSet" => decode_bulk_set(inner),
        "g:Map" => decode_map(inner),
        "g:T" | "g:Direction" => Ok(RawElement::Scalar(inner.clone())),
        "g:VertexProperty" | "g:Property" => {
            decode(inner.get("value").unwrap_or(&JsonValue::Null))
        }
        // g:Int32, g:Int64, g:Double, g:UUID, g:Date and friends
        _ => decode(inner),
    }
}

fn decode_bulk_set(inner: &JsonValue) -> Result<RawElement> {
    let flat = inner.as_array().map(Vec::as_slice).unwrap_or(&[]);
    graphson_ensure!(flat.len() % 2 == 0, "g:BulkSet payload has odd length {}", flat.len());

    let mut items = Vec::new();
    for pair in flat.chunks(2) {
        let item = decode(&pair[0])?;
        let bulk = decode_plain(&pair[1])?.as_u64().unwrap_or(1);
        for _ in 0..bulk {
            items.push(item.clone());
        }
    }
    Ok(RawElement::List(items))
}

fn decode_map(inner: &JsonValue) -> Result<RawElement> {
    let flat = inner.as_array().map(Vec::as_slice).unwrap_or(&[]);
    graphson_ensure!(flat.len() % 2 == 0, "g:Map payload has odd length {}", flat.len());

    let mut entries = Vec::with_capacity(flat.len() / 2);
    for pair in flat.chunks(2) {
        entries.push((decode_map_key(&pair[0])?, decode(&pair[1])?));
    }
    Ok(RawElement::Map(entries))
}

fn decode_map_key(key: &JsonValue) -> Result<MapKey> {
    if let JsonValue::Object(obj) = key {
        if let Some((type_name @ ("g:T" | "g:Direction"), inner)) = typed_parts(obj) {
            let name = inner
                .as_str()
                .ok_or_else(|| WorkbenchError::graphson(format!("{} key is not a string", type_name)))?;
            return Ok(MapKey::reserved(name));
        }
    }

    Ok(match decode(key)? {
        RawElement::Scalar(JsonValue::String(s)) => MapKey::Plain(s),
        other => MapKey::Plain(other.to_plain_json().to_string()),
    })
}

fn decode_vertex(inner: &JsonValue) -> Result<RawVertex> {
    graphson_ensure!(inner.is_object(), "g:Vertex payload is not an object");

    let mut properties = RawProperties::new();
    if let Some(JsonValue::Object(props)) = inner.get("properties") {
        for (key, values) in props {
            let decoded = match values {
                JsonValue::Array(list) => list.iter().map(property_value).collect::<Result<Vec<_>>>()?,
                single => vec![property_value(single)?],
            };
            properties.insert(key.clone(), decoded);
        }
    }

    Ok(RawVertex {
        id: decode_plain(inner.get("id").unwrap_or(&JsonValue::Null))?,
        label: label_of(inner, "label", "vertex"),
        properties,
    })
}

fn decode_edge(inner: &JsonValue) -> Result<RawEdge> {
    graphson_ensure!(inner.is_object(), "g:Edge payload is not an object");

    let mut properties = RawProperties::new();
    if let Some(JsonValue::Object(props)) = inner.get("properties") {
        for (key, value) in props {
            let decoded = match value {
                JsonValue::Array(list) => list.iter().map(property_value).collect::<Result<Vec<_>>>()?,
                single => vec![property_value(single)?],
            };
            properties.insert(key.clone(), decoded);
        }
    }

    Ok(RawEdge {
        id: decode_plain(inner.get("id").unwrap_or(&JsonValue::Null))?,
        label: label_of(inner, "label", "edge"),
        out_v: endpoint(inner, "outV", "outVLabel")?,
        in_v: endpoint(inner, "inV", "inVLabel")?,
        properties,
    })
}

fn endpoint(inner: &JsonValue, id_key: &str, label_key: &str) -> Result<RawVertex> {
    Ok(RawVertex {
        id: decode_plain(inner.get(id_key).unwrap_or(&JsonValue::Null))?,
        label: label_of(inner, label_key, "vertex"),
        properties: RawProperties::new(),
    })
}

fn label_of(inner: &JsonValue, key: &str, default: &str) -> String {
    inner
        .get(key)
        .and_then(JsonValue::as_str)
        .unwrap_or(default)
        .to_string()
}

// VertexProperty and Property both carry the payload under "value"
fn property_value(prop: &JsonValue) -> Result<JsonValue> {
    match prop {
        JsonValue::Object(obj) => match typed_parts(obj) {
            Some((_, inner)) if inner.get("value").is_some() => decode_plain(&inner["value"]),
            Some(_) => decode_plain(prop),
            None => match obj.get("value") {
                Some(v) => decode_plain(v),
                None => decode_plain(prop),
            },
        },
        other => decode_plain(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn int64(n: i64) -> JsonValue {
        json!({"@type": "g:Int64", "@value": n})
    }

    fn vertex(id: i64, label: &str) -> JsonValue {
        json!({
            "@type": "g:Vertex",
            "@value": {
                "id": int64(id),
                "label": label,
                "properties": {
                    "name": [
                        {"@type": "g:VertexProperty", "@value": {"id": int64(100), "value": "marko", "label": "name"}},
                        {"@type": "g:VertexProperty", "@value": {"id": int64(101), "value": "mark", "label": "name"}}
                    ]
                }
            }
        })
    }

    fn edge(id: i64, out_v: i64, in_v: i64) -> JsonValue {
        json!({
            "@type": "g:Edge",
            "@value": {
                "id": int64(id),
                "label": "knows",
                "inVLabel": "person",
                "outVLabel": "person",
                "inV": int64(in_v),
                "outV": int64(out_v),
                "properties": {
                    "weight": {"@type": "g:Property", "@value": {"key": "weight", "value": {"@type": "g:Double", "@value": 0.5}}}
                }
            }
        })
    }

    fn response(items: Vec<JsonValue>) -> JsonValue {
        json!({
            "requestId": "8f4c0d1e",
            "status": {"message": "", "code": 200, "attributes": {}},
            "result": {"data": {"@type": "g:List", "@value": items}, "meta": {}}
        })
    }

    #[test]
    fn test_decode_vertex() {
        let decoded = decode(&vertex(1, "person")).unwrap();
        let RawElement::Vertex(v) = decoded else { panic!("expected vertex") };
        assert_eq!(v.id, json!(1));
        assert_eq!(v.label, "person");
        assert_eq!(v.properties["name"], vec![json!("marko"), json!("mark")]);
    }

    #[test]
    fn test_decode_edge_endpoints() {
        let RawElement::Edge(e) = decode(&edge(7, 1, 2)).unwrap() else { panic!("expected edge") };
        assert_eq!(e.id, json!(7));
        assert_eq!(e.out_v.id, json!(1));
        assert_eq!(e.in_v.id, json!(2));
        assert_eq!(e.in_v.label, "person");
        assert_eq!(e.properties["weight"], vec![json!(0.5)]);
    }

    #[test]
    fn test_decode_element_map_keys() {
        let row = json!({
            "@type": "g:Map",
            "@value": [
                {"@type": "g:T", "@value": "id"}, int64(1),
                {"@type": "g:T", "@value": "label"}, "person",
                "name", "marko"
            ]
        });
        let RawElement::Map(entries) = decode(&row).unwrap() else { panic!("expected map") };
        assert_eq!(entries[0].0, MapKey::reserved("id"));
        assert_eq!(entries[0].1, RawElement::scalar(1));
        assert_eq!(entries[1].0, MapKey::reserved("label"));
        assert_eq!(entries[2].0, MapKey::plain("name"));
    }

    #[test]
    fn test_decode_path_and_bulk_set() {
        let path = json!({
            "@type": "g:Path",
            "@value": {
                "labels": {"@type": "g:List", "@value": []},
                "objects": {"@type": "g:List", "@value": [vertex(1, "person"), vertex(2, "person")]}
            }
        });
        assert!(matches!(decode(&path).unwrap(), RawElement::Path(items) if items.len() == 2));

        let bulk = json!({"@type": "g:BulkSet", "@value": ["a", int64(2), "b", int64(1)]});
        let RawElement::List(items) = decode(&bulk).unwrap() else { panic!("expected list") };
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_decode_response_items() {
        let body = response(vec![vertex(1, "person"), edge(7, 1, 2), int64(42)]);
        let items = decode_response(&body).unwrap();
        assert_eq!(items.len(), 3);
        assert!(items[0].is_vertex());
        assert!(items[1].is_edge());
        assert_eq!(items[2], RawElement::scalar(42));
    }

    #[test]
    fn test_decode_response_error_status() {
        let body = json!({
            "status": {"message": "No such property: foo", "code": 597},
            "result": {"data": null}
        });
        let err = decode_response(&body).unwrap_err();
        assert!(matches!(err, WorkbenchError::Query(ref m) if m == "No such property: foo"));
    }

    #[test]
    fn test_decode_empty_result() {
        let body = json!({"status": {"code": 204, "message": ""}, "result": {"data": null}});
        assert!(decode_response(&body).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_map_rejected() {
        let row = json!({"@type": "g:Map", "@value": ["dangling"]});
        assert!(matches!(decode(&row), Err(WorkbenchError::Graphson(_))));
    }
}
