//! Entity shapes for the SendGrid v3 transactional-template API.

use serde::{Deserialize, Serialize};

/// Template generation synchronized by this tool. Legacy templates are never
/// listed or touched.
pub const TEMPLATE_GENERATION: &str = "dynamic";

/// A remote template as returned by the list/create/rename endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Template {
    /// Remote template id.
    pub id: String,
    /// Remote template name, including the configured prefix.
    pub name: String,
    /// Generation tag ("dynamic" or "legacy").
    #[serde(default)]
    pub generation: String,
    /// Version history, newest not necessarily last; version names carry the
    /// ordering (`v1`, `v2`, ...).
    #[serde(default)]
    pub versions: Vec<TemplateVersion>,
}

/// A single immutable version of a remote template.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemplateVersion {
    /// Remote version id.
    pub id: String,
    /// Version label, generated sequentially as `v<N>`.
    pub name: String,
    /// Whether this version is the active one (1) or not (0).
    #[serde(default)]
    pub active: u8,
}

/// Body for the create-version endpoint. Versions are created active and are
/// never mutated afterwards, only deleted.
#[derive(Debug, Clone, Serialize)]
pub struct NewTemplateVersion {
    /// Version label (`v<N>`).
    pub name: String,
    /// Subject line template.
    pub subject: String,
    /// 1 to activate the version on creation.
    pub active: u8,
    /// Rendered HTML content.
    pub html_content: String,
    /// Plain-text content; always empty for synced templates.
    pub plain_content: String,
}

/// Response wrapper for the list-templates endpoint.
#[derive(Debug, Deserialize)]
pub struct TemplateList {
    /// Templates of the requested generation.
    pub templates: Vec<Template>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_deserializes_without_versions() {
        let template: Template =
            serde_json::from_str(r#"{"id":"tid","name":"welcome","generation":"dynamic"}"#)
                .unwrap();
        assert_eq!(template.id, "tid");
        assert!(template.versions.is_empty());
    }

    #[test]
    fn test_list_response_shape() {
        let body = r#"{"templates":[{"id":"t1","name":"a","generation":"dynamic",
            "versions":[{"id":"v-id","name":"v1","active":1}]}]}"#;
        let list: TemplateList = serde_json::from_str(body).unwrap();
        assert_eq!(list.templates.len(), 1);
        assert_eq!(list.templates[0].versions[0].name, "v1");
    }
}
