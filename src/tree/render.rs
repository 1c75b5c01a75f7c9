use super::document::{ConfigMap, ConfigNode};

/// First line of every generated provisioning file.
pub const CONFIG_HEADER: &str = "#!version:1.0.0.1";

/// Render a merged document as `dotted.key = value` lines under the version
/// header, in document order.
pub fn render_config_file(config: &ConfigMap) -> String {
    let mut out = String::from(CONFIG_HEADER);
    out.push('\n');
    write_entries(&mut out, "", config);
    out
}

fn write_entries(out: &mut String, prefix: &str, map: &ConfigMap) {
    for (key, node) in map.iter() {
        let full_key = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        };
        match node {
            ConfigNode::Scalar(value) => {
                out.push_str(&full_key);
                out.push_str(" = ");
                out.push_str(value);
                out.push('\n');
            }
            ConfigNode::Map(child) => write_entries(out, &full_key, child),
        }
    }
}
