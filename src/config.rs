//! Process-level configuration
//!
//! All configuration is read once at startup from the environment-backed CLI
//! surface and frozen into a [`Settings`] value that the controller context
//! carries for the life of the process. Reconciliation passes never consult
//! mutable global state.

/// Immutable operator configuration
///
/// Built once in `main` and injected into the controller [`Context`] at
/// construction time.
///
/// [`Context`]: crate::controller::Context
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Settings {
    /// IAM role ARN attached to registration secrets for EKS control planes
    pub role_arn: Option<String>,

    /// Argo CD project names whose destination lists track managed clusters
    pub projects: Vec<String>,
}

impl Settings {
    /// Build settings from the raw environment values
    ///
    /// `project` is the comma-separated project list from the `PROJECT`
    /// environment variable. Whitespace around entries is trimmed and empty
    /// segments are dropped, so `""` yields an empty list rather than a list
    /// containing one empty name.
    pub fn new(role_arn: Option<String>, project: &str) -> Self {
        let projects = project
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        // An empty ARN means "not configured", same as an unset variable.
        let role_arn = role_arn.filter(|arn| !arn.is_empty());

        Self { role_arn, projects }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_list_is_split_on_commas() {
        let settings = Settings::new(None, "team-a,team-b");
        assert_eq!(settings.projects, vec!["team-a", "team-b"]);
    }

    #[test]
    fn whitespace_around_project_names_is_trimmed() {
        let settings = Settings::new(None, " team-a , team-b ");
        assert_eq!(settings.projects, vec!["team-a", "team-b"]);
    }

    #[test]
    fn empty_project_value_yields_no_projects() {
        let settings = Settings::new(None, "");
        assert!(settings.projects.is_empty());
    }

    #[test]
    fn trailing_comma_does_not_add_an_empty_project() {
        let settings = Settings::new(None, "team-a,");
        assert_eq!(settings.projects, vec!["team-a"]);
    }

    #[test]
    fn empty_role_arn_is_treated_as_unset() {
        let settings = Settings::new(Some(String::new()), "team-a");
        assert_eq!(settings.role_arn, None);

        let settings = Settings::new(Some("arn:aws:iam::123:role/y".to_string()), "team-a");
        assert_eq!(settings.role_arn.as_deref(), Some("arn:aws:iam::123:role/y"));
    }
}
