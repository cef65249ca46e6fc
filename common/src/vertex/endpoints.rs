// URL builders for the regional Vertex AI endpoints

use crate::errors::ValidationError;

/// Base URL overrides; `None` means the public Google endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoints {
    vertex_base_url: Option<String>,
    storage_base_url: Option<String>,
}

impl Endpoints {
    pub fn new(vertex_base_url: Option<String>, storage_base_url: Option<String>) -> Self {
        let trim = |url: String| url.trim_end_matches('/').to_string();
        Self {
            vertex_base_url: vertex_base_url.map(trim),
            storage_base_url: storage_base_url.map(trim),
        }
    }

    pub fn storage_base_url(&self) -> Option<String> {
        self.storage_base_url.clone()
    }

    pub fn vertex_base(&self, region: &str) -> String {
        match &self.vertex_base_url {
            Some(base) => base.clone(),
            None => format!("https://{}-aiplatform.googleapis.com", region),
        }
    }

    pub fn parent(project: &str, region: &str) -> String {
        format!("projects/{}/locations/{}", project, region)
    }

    pub fn ui_config(&self, project: &str, region: &str) -> String {
        format!(
            "{}/ui/{}/uiConfig",
            self.vertex_base(region),
            Self::parent(project, region)
        )
    }

    pub fn schedules(&self, project: &str, region: &str) -> String {
        format!(
            "{}/v1/{}/schedules",
            self.vertex_base(region),
            Self::parent(project, region)
        )
    }

    pub fn schedule(&self, project: &str, region: &str, schedule_id: &str) -> String {
        format!("{}/{}", self.schedules(project, region), schedule_id)
    }

    /// `…/schedules/{id}:pause`, `…:resume`
    pub fn schedule_action(
        &self,
        project: &str,
        region: &str,
        schedule_id: &str,
        action: &str,
    ) -> String {
        format!("{}:{}", self.schedule(project, region, schedule_id), action)
    }

    pub fn notebook_execution_jobs(&self, project: &str, region: &str) -> String {
        format!(
            "{}/v1/{}/notebookExecutionJobs",
            self.vertex_base(region),
            Self::parent(project, region)
        )
    }

    /// Resource name used in execution-job filters
    pub fn schedule_name(project: &str, region: &str, schedule_id: &str) -> String {
        format!("{}/schedules/{}", Self::parent(project, region), schedule_id)
    }
}

/// Regions end up in the host name, so only `[a-z0-9-]` is accepted
pub fn validate_region(region: &str) -> Result<(), ValidationError> {
    let valid = !region.is_empty()
        && region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidFieldValue {
            field: "region_id".to_string(),
            reason: format!("'{}' is not a region name", region),
        })
    }
}

pub fn validate_schedule_id(schedule_id: &str) -> Result<(), ValidationError> {
    let valid = !schedule_id.is_empty()
        && schedule_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidFieldValue {
            field: "schedule_id".to_string(),
            reason: format!("'{}' is not a schedule id", schedule_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints_are_regional() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.schedule_action("demo", "europe-west4", "42", "pause"),
            "https://europe-west4-aiplatform.googleapis.com/v1/projects/demo/locations/europe-west4/schedules/42:pause"
        );
        assert_eq!(
            endpoints.ui_config("demo", "us-central1"),
            "https://us-central1-aiplatform.googleapis.com/ui/projects/demo/locations/us-central1/uiConfig"
        );
    }

    #[test]
    fn test_override_strips_trailing_slash() {
        let endpoints = Endpoints::new(Some("http://127.0.0.1:9000/".to_string()), None);
        assert_eq!(
            endpoints.notebook_execution_jobs("demo", "us-central1"),
            "http://127.0.0.1:9000/v1/projects/demo/locations/us-central1/notebookExecutionJobs"
        );
        assert_eq!(endpoints.storage_base_url(), None);
    }

    #[test]
    fn test_region_and_id_validation() {
        assert!(validate_region("us-central1").is_ok());
        assert!(validate_region("").is_err());
        assert!(validate_region("evil.com/x").is_err());
        assert!(validate_schedule_id("1234567890").is_ok());
        assert!(validate_schedule_id("../other").is_err());
        assert!(validate_schedule_id("42:pause").is_err());
    }
}
