//! React Flow mind maps of a lesson.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use super::parse_json_object;
use super::prompts::{self, MINDMAP_PROMPT, MINDMAP_SYSTEM_PROMPT};
use crate::actors::traits::LlmActor;
use crate::error::AppError;
use crate::models::CompletionRequest;

/// Returned in place of a mind map the model failed to produce.
pub const MINDMAP_ERROR: &str = "Không thể tạo sơ đồ tư duy cho bài học này.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindMapNode {
    pub id: String,
    #[serde(rename = "type", default = "default_node_type")]
    pub node_type: String,
    pub data: NodeData,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindMapEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub animated: bool,
}

/// The React Flow graph the frontend renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MindMap {
    #[serde(default)]
    pub nodes: Vec<MindMapNode>,
    #[serde(default)]
    pub edges: Vec<MindMapEdge>,
}

fn default_node_type() -> String {
    "default".to_string()
}

impl MindMap {
    /// Edges whose endpoints are not nodes of the map.
    pub fn dangling_edges(&self) -> Vec<&MindMapEdge> {
        self.edges
            .iter()
            .filter(|e| {
                !self.nodes.iter().any(|n| n.id == e.source) || !self.nodes.iter().any(|n| n.id == e.target)
            })
            .collect()
    }
}

/// Generates the mind map for `topic` from the lesson `context`.
///
/// The model's JSON is passed through as-is apart from defaulting missing
/// `nodes`/`edges` to empty lists. A reply that is not a JSON object yields
/// `{"error": ...}`. Errors from the model call itself are returned.
#[instrument(skip(llm, context), fields(context_len = context.len()))]
pub async fn generate<L>(llm: &L, model: &str, topic: &str, context: &str) -> Result<Value, AppError>
where
    L: LlmActor + ?Sized,
{
    let prompt = prompts::render(MINDMAP_PROMPT, &[("context", context), ("topic", topic)]);
    let request = CompletionRequest::new(model, prompt)
        .with_system(MINDMAP_SYSTEM_PROMPT)
        .json();

    let reply = llm.complete(request).await?;
    Ok(normalize(&reply))
}

fn normalize(reply: &str) -> Value {
    let mut object = match parse_json_object(reply) {
        Ok(object) => object,
        Err(e) => {
            warn!("Mind map reply is not a JSON object: {}", e);
            return json!({ "error": MINDMAP_ERROR });
        }
    };

    object.entry("nodes").or_insert_with(|| json!([]));
    object.entry("edges").or_insert_with(|| json!([]));
    let value = Value::Object(object);

    match serde_json::from_value::<MindMap>(value.clone()) {
        Ok(map) => {
            let dangling = map.dangling_edges().len();
            if dangling > 0 {
                warn!(dangling, "Mind map has edges to unknown nodes");
            }
            debug!(nodes = map.nodes.len(), edges = map.edges.len(), "Mind map generated");
        }
        Err(e) => warn!("Mind map does not follow the React Flow schema: {}", e),
    }

    value
}
