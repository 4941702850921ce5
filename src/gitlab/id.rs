//! Group identifiers
//!
//! GitLab accepts a group either by numeric ID or by its full path
//! (`parent/child`). Both resolve to a single URL path segment.

use super::error::{ApiError, Result};
use std::fmt;
use std::str::FromStr;

/// A group reference, by numeric ID or by full namespace path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupId {
    Numeric(u64),
    Path(String),
}

impl GroupId {
    /// Resolve to a URL-safe path segment.
    ///
    /// Paths are percent-encoded as one segment, so `/` becomes `%2F`.
    /// `.` and `..` are rejected: URL resolution would drop them and the
    /// request would leave `groups/`.
    pub fn to_path_segment(&self) -> Result<String> {
        match self {
            GroupId::Numeric(id) => Ok(id.to_string()),
            GroupId::Path(path) => {
                let trimmed = path.trim();
                if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
                    return Err(ApiError::InvalidIdentifier(path.clone()));
                }
                Ok(urlencoding::encode(path).into_owned())
            }
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupId::Numeric(id) => write!(f, "{}", id),
            GroupId::Path(path) => f.write_str(path),
        }
    }
}

impl From<u64> for GroupId {
    fn from(id: u64) -> Self {
        GroupId::Numeric(id)
    }
}

impl From<&str> for GroupId {
    fn from(path: &str) -> Self {
        GroupId::Path(path.to_string())
    }
}

impl From<String> for GroupId {
    fn from(path: String) -> Self {
        GroupId::Path(path)
    }
}

impl From<&GroupId> for GroupId {
    fn from(id: &GroupId) -> Self {
        id.clone()
    }
}

/// Parses all-digit input as a numeric ID, anything else as a path
impl FromStr for GroupId {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ApiError::InvalidIdentifier(s.to_string()));
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = s.parse::<u64>() {
                return Ok(GroupId::Numeric(id));
            }
        }
        Ok(GroupId::Path(s.trim_matches('/').to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_is_verbatim() {
        assert_eq!(GroupId::from(1234u64).to_path_segment().unwrap(), "1234");
    }

    #[test]
    fn test_path_is_escaped() {
        let id = GroupId::from("my-org/platform team");
        assert_eq!(id.to_path_segment().unwrap(), "my-org%2Fplatform%20team");
    }

    #[test]
    fn test_empty_path_is_rejected() {
        assert!(matches!(
            GroupId::from("").to_path_segment(),
            Err(ApiError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            GroupId::from("   ").to_path_segment(),
            Err(ApiError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_dot_segments_are_rejected() {
        for path in [".", "..", " .. "] {
            assert!(matches!(
                GroupId::from(path).to_path_segment(),
                Err(ApiError::InvalidIdentifier(_))
            ));
        }
        assert!(matches!(
            "/../".parse::<GroupId>().unwrap().to_path_segment(),
            Err(ApiError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_dots_inside_a_path_stay_in_one_segment() {
        assert_eq!(
            GroupId::from("../admin").to_path_segment().unwrap(),
            "..%2Fadmin"
        );
        assert_eq!(GroupId::from("...").to_path_segment().unwrap(), "...");
        assert_eq!(GroupId::from("my.org").to_path_segment().unwrap(), "my.org");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("26".parse::<GroupId>().unwrap(), GroupId::Numeric(26));
        assert_eq!(
            "gitlab-org/charts".parse::<GroupId>().unwrap(),
            GroupId::Path("gitlab-org/charts".to_string())
        );
        assert_eq!(
            "/gitlab-org/".parse::<GroupId>().unwrap(),
            GroupId::Path("gitlab-org".to_string())
        );
        assert!("".parse::<GroupId>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(GroupId::from(7u64).to_string(), "7");
        assert_eq!(GroupId::from("a/b").to_string(), "a/b");
    }
}
