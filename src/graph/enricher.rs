//! Batched property lookups for vertices discovered during assembly.

use std::collections::BTreeMap;
use serde_json::Value as JsonValue;
use crate::common::error::Result;
use crate::common::value::{identity_string, MapKey, RawElement};
use crate::traversal::client::{json_id_list, TraversalConnection};
use super::assembler::Assembly;
use super::model::{GraphBuilder, GraphMode, Properties};

/// Properties keyed by element id
pub type PropertyMap = BTreeMap<String, Properties>;

/// Follow-up query fetching the element maps of all ids in one round trip
pub fn vertex_properties_query(ids: &[JsonValue]) -> String {
    format!("g.V({}).elementMap()", json_id_list(ids))
}

/// Split `elementMap()` rows into properties keyed by each row's own id.
/// Rows without an id token are ignored.
pub fn parse_property_rows(rows: &[RawElement]) -> PropertyMap {
    let mut map = PropertyMap::new();
    for row in rows {
        let RawElement::Map(entries) = row else {
            continue;
        };

        let mut node_id = None;
        let mut properties = Properties::new();
        for (key, value) in entries {
            match key {
                MapKey::Reserved(name) if name == "id" => {
                    node_id = Some(identity_string(&value.to_plain_json()));
                }
                MapKey::Reserved(_) => {}
                MapKey::Plain(name) => {
                    properties.insert(name.clone(), value.to_plain_json());
                }
            }
        }

        if let Some(id) = node_id {
            map.insert(id, properties);
        }
    }
    map
}

/// Fetch properties for a set of vertices. An empty id set makes no call.
pub async fn query_vertex_properties(
    connection: &dyn TraversalConnection,
    ids: &[JsonValue],
) -> Result<PropertyMap> {
    if ids.is_empty() {
        return Ok(PropertyMap::new());
    }
    let rows = connection.submit(&vertex_properties_query(ids)).await?;
    Ok(parse_property_rows(&rows))
}

/// Edge property lookup. The compute engine cannot batch-read edge properties,
/// so this always yields an empty map.
pub async fn query_edge_properties(
    _connection: &dyn TraversalConnection,
    _ids: &[JsonValue],
) -> Result<PropertyMap> {
    Ok(PropertyMap::new())
}

/// Merge fetched properties onto known nodes. Ids without a node are dropped.
/// Returns the number of nodes updated.
pub fn merge_vertex_properties(builder: &mut GraphBuilder, properties: PropertyMap) -> usize {
    let mut merged = 0;
    for (id, props) in properties {
        match builder.node_mut(&id) {
            Some(node) => {
                node.properties.extend(props);
                merged += 1;
            }
            None => tracing::debug!("Dropping properties for unknown vertex {}", id),
        }
    }
    merged
}

/// Fill in vertex properties for a graph-mode assembly
pub async fn enrich(connection: &dyn TraversalConnection, assembly: &mut Assembly) -> Result<()> {
    if assembly.mode() != GraphMode::Graph {
        return Ok(());
    }
    let ids = assembly.vertex_ids().to_vec();
    let properties = query_vertex_properties(connection, &ids).await?;
    let merged = merge_vertex_properties(assembly.builder_mut(), properties);
    tracing::debug!("Merged properties for {} of {} vertices", merged, ids.len());
    Ok(())
}
