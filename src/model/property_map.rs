//! PropertyMap: the key-value store on nodes and edges.

/// A map of property names to JSON values.
///
/// The engine never reads properties itself; they are there for weight
/// functions, selectors and collectors that key on domain attributes.
pub type PropertyMap = hashbrown::HashMap<String, serde_json::Value>;
