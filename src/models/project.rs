use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub key: String,
    pub name: String,
    #[serde(rename = "self")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_url: Option<String>,
    #[serde(rename = "projectTypeKey")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_deserialization() {
        let json_data = json!({
            "id": "10000",
            "key": "PROJ",
            "name": "Example Project",
            "self": "https://jira.example.com/rest/api/2/project/10000",
            "projectTypeKey": "software",
            "avatarUrls": {"48x48": "https://jira.example.com/avatar.png"}
        });

        let project: Project = serde_json::from_value(json_data).unwrap();

        assert_eq!(project.key, "PROJ");
        assert_eq!(project.project_type_key, Some("software".to_string()));
    }
}
